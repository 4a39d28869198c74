use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
#[cfg(feature = "serde")]
use crate::error::EnvError;

/// Phase-duration parameters, all in the same unit as [`TaskConfig::dt`] (ms).
///
/// The stimulus length of each trial is drawn from an exponential with mean
/// `stimulus_mean`, truncated to `[max(stimulus_min, dt), stimulus_max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timing {
    pub fixation: f64,
    pub stimulus_min: f64,
    pub stimulus_mean: f64,
    pub stimulus_max: f64,
    pub decision: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            fixation: 500.0,
            stimulus_min: 80.0,
            stimulus_mean: 330.0,
            stimulus_max: 1500.0,
            decision: 500.0,
        }
    }
}

/// `(fixation, stimulus_min, stimulus_mean, stimulus_max, decision)`
impl From<(f64, f64, f64, f64, f64)> for Timing {
    fn from(t: (f64, f64, f64, f64, f64)) -> Self {
        Self {
            fixation: t.0,
            stimulus_min: t.1,
            stimulus_mean: t.2,
            stimulus_max: t.3,
            decision: t.4,
        }
    }
}

/// Reward constants.
///
/// `fail` and `miss` default to the same value but stay separate so the two
/// policies can be told apart.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RewardSchedule {
    /// Terminal action equal to the ground truth.
    pub correct: f32,
    /// Terminal action different from the ground truth.
    pub fail: f32,
    /// Any action during fixation or stimulus.
    pub aborted: f32,
    /// No action by the end of the decision window.
    pub miss: f32,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            correct: 1.0,
            fail: 0.0,
            aborted: -0.1,
            miss: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TaskConfig {
    /// Duration of one step (ms).
    pub dt: f64,
    pub timing: Timing,
    /// Competing alternatives; action 0 is reserved for "hold fixation".
    pub num_choices: usize,
    /// Base coherence levels in percent, scaled by `stim_ev`.
    pub coherences: Vec<f32>,
    /// Global evidence-strength multiplier.
    pub stim_ev: f32,
    /// Input noise scale; the per-step standard deviation is `noise_sigma / sqrt(dt)`.
    pub noise_sigma: f32,
    pub rewards: RewardSchedule,
    /// When set, an abort ends the trial. Otherwise it is only penalized.
    pub abort_ends_trial: bool,
    /// Experiment length: the episode is done once the trial counter exceeds it.
    pub num_trials: u64,
    pub seed: Option<u64>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            dt: 100.0,
            timing: Timing::default(),
            num_choices: 3,
            coherences: vec![0.0, 6.4, 12.8, 25.6, 51.2],
            stim_ev: 1.0,
            noise_sigma: (2.0f32 * 100.0 * 0.01).sqrt(),
            rewards: RewardSchedule::default(),
            abort_ends_trial: false,
            num_trials: 10_000_000,
            seed: None,
        }
    }
}

impl TaskConfig {
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_timing(mut self, timing: impl Into<Timing>) -> Self {
        self.timing = timing.into();
        self
    }

    pub fn with_num_choices(mut self, num_choices: usize) -> Self {
        self.num_choices = num_choices;
        self
    }

    pub fn with_stim_ev(mut self, stim_ev: f32) -> Self {
        self.stim_ev = stim_ev;
        self
    }

    pub fn with_rewards(mut self, rewards: RewardSchedule) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_abort_ends_trial(mut self, abort_ends_trial: bool) -> Self {
        self.abort_ends_trial = abort_ends_trial;
        self
    }

    pub fn with_num_trials(mut self, num_trials: u64) -> Self {
        self.num_trials = num_trials;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load a configuration from JSON. Missing fields keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(s: &str) -> Result<Self, EnvError> {
        let cfg: Self = serde_json::from_str(s)?;
        Ok(cfg)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::Timestep(self.dt));
        }
        let t = &self.timing;
        for (name, value) in [
            ("fixation", t.fixation),
            ("stimulus_mean", t.stimulus_mean),
            ("stimulus_max", t.stimulus_max),
            ("decision", t.decision),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::PhaseDuration { name, value });
            }
        }
        if !t.stimulus_min.is_finite() || t.stimulus_min < 0.0 {
            return Err(ConfigError::StimulusMin(t.stimulus_min));
        }
        if t.stimulus_max < t.stimulus_min {
            return Err(ConfigError::StimulusBounds {
                min: t.stimulus_min,
                max: t.stimulus_max,
            });
        }
        if self.num_choices < 2 {
            return Err(ConfigError::TooFewChoices(self.num_choices));
        }
        if self.coherences.is_empty() {
            return Err(ConfigError::NoCoherences);
        }
        if let Some(&c) = self
            .coherences
            .iter()
            .find(|c| !c.is_finite() || **c < 0.0)
        {
            return Err(ConfigError::Coherence(c));
        }
        if !self.stim_ev.is_finite() || self.stim_ev < 0.0 {
            return Err(ConfigError::StimEv(self.stim_ev));
        }
        if !self.noise_sigma.is_finite() || self.noise_sigma < 0.0 {
            return Err(ConfigError::NoiseSigma(self.noise_sigma));
        }
        if self.num_trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        Ok(())
    }

    /// Lower bound actually used for stimulus sampling.
    pub fn effective_stimulus_min(&self) -> f64 {
        self.timing.stimulus_min.max(self.dt)
    }

    /// Coherence levels after applying `stim_ev`.
    pub fn evidence_levels(&self) -> Vec<f32> {
        self.coherences.iter().map(|c| c * self.stim_ev).collect()
    }

    /// Per-step standard deviation of the injected input noise.
    pub fn noise_sd(&self) -> f32 {
        self.noise_sigma / (self.dt as f32).sqrt()
    }

    pub fn mean_trial_duration(&self) -> f64 {
        self.timing.fixation + self.timing.stimulus_mean + self.timing.decision
    }

    pub fn max_trial_duration(&self) -> f64 {
        self.timing.fixation + self.timing.stimulus_max + self.timing.decision
    }

    /// Number of whole steps in the longest possible trial.
    pub fn max_steps(&self) -> usize {
        (self.max_trial_duration() / self.dt) as usize
    }

    /// Observation vector length: fixation cue plus one entry per choice.
    pub fn obs_size(&self) -> usize {
        self.num_choices + 1
    }
}

impl fmt::Display for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str = "XXXXXXXXXXXXXXXXXXXXXX";
        let t = &self.timing;
        if t.fixation == 0.0 || t.decision == 0.0 || t.stimulus_mean == 0.0 {
            writeln!(f, "{RULE}")?;
            writeln!(f, "the duration of all periods must be larger than 0")?;
            writeln!(f, "{RULE}")?;
        }
        writeln!(f, "{RULE}")?;
        writeln!(f, "Random Dots Motion Task ({} choices)", self.num_choices)?;
        writeln!(f, "Mean Fixation: {}", t.fixation)?;
        writeln!(f, "Min Stimulus Duration: {}", self.effective_stimulus_min())?;
        writeln!(f, "Mean Stimulus Duration: {}", t.stimulus_mean)?;
        writeln!(f, "Max Stimulus Duration: {}", t.stimulus_max)?;
        writeln!(f, "Decision: {}", t.decision)?;
        writeln!(f, "(time step: {})", self.dt)?;
        writeln!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = TaskConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.obs_size(), 4);
        assert_eq!(cfg.max_trial_duration(), 2500.0);
        assert_eq!(cfg.mean_trial_duration(), 1330.0);
        assert_eq!(cfg.max_steps(), 25);
        assert_eq!(cfg.effective_stimulus_min(), 100.0);
    }

    #[test]
    fn zero_phase_is_rejected() {
        let cfg = TaskConfig::default().with_timing((0.0, 80.0, 330.0, 1500.0, 500.0));
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PhaseDuration {
                name: "fixation",
                value: 0.0
            })
        );

        let cfg = TaskConfig::default().with_timing((500.0, 80.0, 330.0, 1500.0, -1.0));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PhaseDuration { name: "decision", .. })
        ));
    }

    #[test]
    fn too_few_choices_is_rejected() {
        let cfg = TaskConfig::default().with_num_choices(1);
        assert_eq!(cfg.validate(), Err(ConfigError::TooFewChoices(1)));
    }

    #[test]
    fn inverted_stimulus_bounds_are_rejected() {
        let cfg = TaskConfig::default().with_timing((500.0, 900.0, 330.0, 800.0, 500.0));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::StimulusBounds { .. })
        ));
    }

    #[test]
    fn evidence_levels_are_scaled() {
        let cfg = TaskConfig::default().with_stim_ev(0.5);
        assert_eq!(cfg.evidence_levels(), vec![0.0, 3.2, 6.4, 12.8, 25.6]);
    }

    #[test]
    fn display_warns_on_zero_period() {
        let ok = TaskConfig::default().to_string();
        assert!(!ok.contains("must be larger than 0"));
        assert!(ok.contains("Decision: 500"));

        let bad = TaskConfig::default()
            .with_timing((0.0, 80.0, 330.0, 1500.0, 500.0))
            .to_string();
        assert!(bad.contains("must be larger than 0"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = TaskConfig::from_json_str(
            r#"{ "num_choices": 5, "timing": { "fixation": 200.0 }, "seed": 9 }"#,
        )
        .unwrap();
        assert_eq!(cfg.num_choices, 5);
        assert_eq!(cfg.timing.fixation, 200.0);
        assert_eq!(cfg.timing.decision, 500.0);
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(cfg.rewards, RewardSchedule::default());

        assert!(TaskConfig::from_json_str("{ not json").is_err());
    }
}
