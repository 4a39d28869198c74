//! Trial generation: phase timing, target/coherence sampling and observation synthesis.
//!
//! A trial is laid out on trial-local time as three contiguous half-open intervals:
//!
//! ```text
//! fixation [0, f) | stimulus [f, f+s) | decision [f+s, f+s+d)
//! ```
//!
//! The full observation sequence is synthesized up front, one vector of length
//! `num_choices + 1` per timestep. Index 0 is the fixation cue, indices
//! `1..=num_choices` carry evidence for each choice during the stimulus.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::TaskConfig;
use crate::error::EnvError;
use crate::prng::Prng;

/// Phase of the trial at a given trial-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    Fixation,
    Stimulus,
    Decision,
    /// Past the end of the decision window.
    Expired,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Fixation => "fixation",
            Phase::Stimulus => "stimulus",
            Phase::Decision => "decision",
            Phase::Expired => "expired",
        }
    }

    /// Whether the agent is expected to hold (action 0) in this phase.
    pub fn expects_hold(self) -> bool {
        matches!(self, Phase::Fixation | Phase::Stimulus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Durations {
    pub fixation: f64,
    pub stimulus: f64,
    pub decision: f64,
}

impl Durations {
    pub fn new(fixation: f64, stimulus: f64, decision: f64) -> Self {
        Self {
            fixation,
            stimulus,
            decision,
        }
    }

    pub fn total(&self) -> f64 {
        self.fixation + self.stimulus + self.decision
    }
}

/// Per-trial overrides. Anything left as `None` is sampled.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrialOverrides {
    /// Replaces all three phase durations at once.
    pub durations: Option<Durations>,
    pub ground_truth: Option<usize>,
    /// Coherence in percent, used as-is (not scaled by `stim_ev`).
    pub coherence: Option<f32>,
}

impl TrialOverrides {
    pub fn with_durations(mut self, fixation: f64, stimulus: f64, decision: f64) -> Self {
        self.durations = Some(Durations::new(fixation, stimulus, decision));
        self
    }

    pub fn with_ground_truth(mut self, ground_truth: usize) -> Self {
        self.ground_truth = Some(ground_truth);
        self
    }

    pub fn with_coherence(mut self, coherence: f32) -> Self {
        self.coherence = Some(coherence);
        self
    }

    fn validate(&self, num_choices: usize) -> Result<(), EnvError> {
        if let Some(d) = &self.durations {
            for (name, v) in [
                ("fixation", d.fixation),
                ("stimulus", d.stimulus),
                ("decision", d.decision),
            ] {
                if !v.is_finite() || v < 0.0 {
                    return Err(EnvError::InvalidOverride(format!(
                        "{name} duration must be finite and >= 0 (got {v})"
                    )));
                }
            }
            if d.total() <= 0.0 {
                return Err(EnvError::InvalidOverride(
                    "total trial duration must be > 0".to_string(),
                ));
            }
        }
        if let Some(gt) = self.ground_truth {
            if gt == 0 || gt > num_choices {
                return Err(EnvError::InvalidOverride(format!(
                    "ground_truth {gt} outside 1..={num_choices}"
                )));
            }
        }
        if let Some(c) = self.coherence {
            if !c.is_finite() || c < 0.0 {
                return Err(EnvError::InvalidOverride(format!(
                    "coherence must be finite and >= 0 (got {c})"
                )));
            }
        }
        Ok(())
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Number of timesteps needed to cover `total` with steps of `dt`,
/// i.e. `ceil(total / dt)` with float noise from exact multiples ignored.
/// A positive total always yields at least one step.
pub fn num_steps(total: f64, dt: f64) -> usize {
    if total <= 0.0 {
        return 0;
    }
    let n = total / dt;
    let r = n.round();
    let steps = if (n - r).abs() <= 1e-9 * r.max(1.0) {
        r as usize
    } else {
        n.ceil() as usize
    };
    steps.max(1)
}

#[derive(Debug, Clone)]
pub struct Trial {
    ground_truth: usize,
    coherence: f32,
    durations: Durations,
    fixation: Interval,
    stimulus: Interval,
    decision: Interval,
    num_choices: usize,
    dt: f64,
    observations: Vec<Vec<f32>>,
    /// Index of the timestep the clock points at; time is always `step * dt`.
    step: usize,
}

impl Trial {
    /// Draw a new trial from `cfg`, honoring `overrides`.
    ///
    /// Overrides are checked before any random draw, so a rejected call leaves
    /// `rng` untouched.
    pub fn generate(
        cfg: &TaskConfig,
        rng: &mut Prng,
        overrides: &TrialOverrides,
    ) -> Result<Self, EnvError> {
        overrides.validate(cfg.num_choices)?;

        let durations = match overrides.durations {
            Some(d) => d,
            None => Durations {
                fixation: cfg.timing.fixation,
                stimulus: rng.trunc_exp(
                    cfg.timing.stimulus_mean,
                    cfg.effective_stimulus_min(),
                    cfg.timing.stimulus_max,
                ),
                decision: cfg.timing.decision,
            },
        };

        let ground_truth = match overrides.ground_truth {
            Some(gt) => gt,
            None => rng.gen_range_usize(1, cfg.num_choices + 1),
        };
        let coherence = match overrides.coherence {
            Some(c) => c,
            None => {
                let levels = cfg.evidence_levels();
                rng.choose(&levels).copied().unwrap_or(0.0)
            }
        };

        let f = durations.fixation;
        let s = durations.stimulus;
        let d = durations.decision;
        let mut trial = Self {
            ground_truth,
            coherence,
            durations,
            fixation: Interval { start: 0.0, end: f },
            stimulus: Interval {
                start: f,
                end: f + s,
            },
            decision: Interval {
                start: f + s,
                end: f + s + d,
            },
            num_choices: cfg.num_choices,
            dt: cfg.dt,
            observations: Vec::new(),
            step: 0,
        };

        let degenerate = trial.degenerate_phases();
        if !degenerate.is_empty() {
            tracing::warn!(
                ?degenerate,
                ?durations,
                "trial has zero-length phases; the remaining phases are still generated"
            );
        }

        trial.synthesize(cfg.noise_sd(), rng);
        Ok(trial)
    }

    fn synthesize(&mut self, noise_sd: f32, rng: &mut Prng) {
        let n = num_steps(self.total_duration(), self.dt);
        let mut observations = Vec::with_capacity(n);
        for k in 0..n {
            let t = k as f64 * self.dt;
            let mut row = self.expected_at(t);
            if self.stimulus.contains(t) {
                for x in &mut row[1..] {
                    *x += rng.next_gaussian() as f32 * noise_sd;
                }
            }
            observations.push(row);
        }
        self.observations = observations;
    }

    /// Noise-free observation at trial-local time `t`.
    fn expected_at(&self, t: f64) -> Vec<f32> {
        let mut row = vec![0.0f32; self.num_choices + 1];
        match self.phase_at(t) {
            Phase::Fixation => row[0] = 1.0,
            Phase::Stimulus => {
                row[0] = 1.0;
                let c = self.coherence / 100.0;
                for x in &mut row[1..] {
                    *x = (1.0 - c) / 2.0;
                }
                row[self.ground_truth] = (1.0 + c) / 2.0;
            }
            Phase::Decision | Phase::Expired => {}
        }
        row
    }

    /// Noise-free observation for timestep `step`.
    pub fn expected_observation(&self, step: usize) -> Vec<f32> {
        self.expected_at(step as f64 * self.dt)
    }

    /// Classify trial-local time `t`.
    pub fn phase_at(&self, t: f64) -> Phase {
        if self.fixation.contains(t) {
            Phase::Fixation
        } else if self.stimulus.contains(t) {
            Phase::Stimulus
        } else if self.decision.contains(t) {
            Phase::Decision
        } else {
            Phase::Expired
        }
    }

    /// Phases whose interval is empty.
    pub fn degenerate_phases(&self) -> Vec<Phase> {
        [
            (Phase::Fixation, self.fixation),
            (Phase::Stimulus, self.stimulus),
            (Phase::Decision, self.decision),
        ]
        .into_iter()
        .filter(|(_, iv)| iv.is_empty())
        .map(|(p, _)| p)
        .collect()
    }

    pub fn ground_truth(&self) -> usize {
        self.ground_truth
    }

    pub fn coherence(&self) -> f32 {
        self.coherence
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    pub fn interval(&self, phase: Phase) -> Option<Interval> {
        match phase {
            Phase::Fixation => Some(self.fixation),
            Phase::Stimulus => Some(self.stimulus),
            Phase::Decision => Some(self.decision),
            Phase::Expired => None,
        }
    }

    pub fn total_duration(&self) -> f64 {
        self.decision.end
    }

    pub fn num_steps(&self) -> usize {
        self.observations.len()
    }

    pub fn observations(&self) -> &[Vec<f32>] {
        &self.observations
    }

    /// Trial-local time of the current timestep, on the same grid the
    /// observations were synthesized on.
    pub fn elapsed(&self) -> f64 {
        self.step as f64 * self.dt
    }

    /// Index of the timestep the clock currently points at.
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// Phase of the current timestep.
    pub fn current_phase(&self) -> Phase {
        self.phase_at(self.elapsed())
    }

    /// Observation at the current clock position, clamped to the last timestep.
    pub(crate) fn current_observation(&self) -> &[f32] {
        let last = self.observations.len().saturating_sub(1);
        &self.observations[self.step_index().min(last)]
    }

    /// Whether the step at the current clock position is the last one of the trial.
    pub(crate) fn at_final_step(&self) -> bool {
        self.step_index() + 1 >= self.observations.len()
    }

    pub(crate) fn tick(&mut self) {
        self.step += 1;
    }
}
