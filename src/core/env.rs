//! The step state machine and the environment that owns the current trial.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::TaskConfig;
use crate::error::EnvError;
use crate::policy::{self, Outcome};
use crate::prng::Prng;
use crate::trial::{Phase, Trial, TrialOverrides};

/// Host-framework contract: anything that can be driven one discrete action at a time.
pub trait Env {
    /// Advance by one action. `done` in the returned [`Step`] marks the end of the episode.
    fn step(&mut self, action: usize) -> Result<Step, EnvError>;

    /// Start a fresh episode and return its first observation.
    fn reset(&mut self) -> Result<Vec<f32>, EnvError>;

    /// Size of the observation vector.
    fn obs_size(&self) -> usize;

    /// Number of discrete actions.
    fn action_size(&self) -> usize;
}

/// Diagnostics attached to every step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepInfo {
    /// The current trial ended on this step.
    pub new_trial: bool,
    /// One-hot over `0..=num_choices` marking the expected action.
    pub ground_truth: Vec<f32>,
    pub phase: Phase,
    pub outcome: Outcome,
    /// Trial counter value the step belonged to.
    pub trial: u64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Step {
    pub observation: Vec<f32>,
    pub reward: f32,
    /// Episode finished: the trial counter exceeds the configured experiment length.
    pub done: bool,
    pub info: StepInfo,
}

/// N-alternative random-dots decision task.
///
/// Only the current trial is held. The trial counter starts at zero and the
/// first trial is generated lazily on the first step (or by [`Env::reset`] /
/// [`RdmEnv::generate_trial`]).
#[derive(Debug, Clone)]
pub struct RdmEnv {
    cfg: TaskConfig,
    rng: Prng,
    trial: Option<Trial>,
    trial_counter: u64,
}

impl RdmEnv {
    pub fn new(cfg: TaskConfig) -> Result<Self, EnvError> {
        cfg.validate()?;
        let rng = Prng::new(cfg.seed.unwrap_or(Prng::DEFAULT_SEED));
        Ok(Self {
            cfg,
            rng,
            trial: None,
            trial_counter: 0,
        })
    }

    pub fn config(&self) -> &TaskConfig {
        &self.cfg
    }

    pub fn trial(&self) -> Option<&Trial> {
        self.trial.as_ref()
    }

    pub fn trial_counter(&self) -> u64 {
        self.trial_counter
    }

    pub fn episode_done(&self) -> bool {
        self.trial_counter > self.cfg.num_trials
    }

    /// Replace the current trial with a new one.
    ///
    /// Anything not pinned by `overrides` is sampled. On error the current trial
    /// and the counter are left as they were.
    pub fn generate_trial(&mut self, overrides: Option<TrialOverrides>) -> Result<&Trial, EnvError> {
        let trial = self.next_trial(&overrides.unwrap_or_default())?;
        Ok(self.trial.insert(trial))
    }

    fn next_trial(&mut self, overrides: &TrialOverrides) -> Result<Trial, EnvError> {
        let trial = Trial::generate(&self.cfg, &mut self.rng, overrides)?;
        self.trial_counter += 1;
        tracing::debug!(
            trial = self.trial_counter,
            ground_truth = trial.ground_truth(),
            coherence = trial.coherence(),
            durations = ?trial.durations(),
            steps = trial.num_steps(),
            "new trial"
        );
        Ok(trial)
    }

    fn check_action(&self, action: usize) -> Result<(), EnvError> {
        if action > self.cfg.num_choices {
            return Err(EnvError::InvalidAction {
                action,
                num_choices: self.cfg.num_choices,
            });
        }
        Ok(())
    }

    /// Trial-level transition: score `action` against the current trial and move
    /// its clock forward by one timestep.
    ///
    /// Never regenerates the trial; `info.new_trial` tells the caller it ended.
    /// `done` reports the episode status for the current counter.
    pub fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        self.check_action(action)?;
        let trial = match self.trial.take() {
            Some(trial) => trial,
            None => self.next_trial(&TrialOverrides::default())?,
        };
        let trial_counter = self.trial_counter;
        let done = self.episode_done();
        let trial = self.trial.insert(trial);

        let phase = trial.current_phase();
        let ground_truth = trial.ground_truth();
        let scored = policy::score(
            phase,
            action,
            ground_truth,
            &self.cfg.rewards,
            self.cfg.abort_ends_trial,
        );
        let scored = policy::apply_deadline(scored, trial.at_final_step(), &self.cfg.rewards);

        let observation = trial.current_observation().to_vec();
        tracing::trace!(
            trial = trial_counter,
            t = trial.elapsed(),
            phase = phase.as_str(),
            action,
            reward = scored.reward,
            outcome = scored.outcome.as_str(),
            "step"
        );
        trial.tick();

        Ok(Step {
            observation,
            reward: scored.reward,
            done,
            info: StepInfo {
                new_trial: scored.ends_trial,
                ground_truth: policy::one_hot(
                    policy::expected_action(phase, ground_truth),
                    self.cfg.num_choices,
                ),
                phase,
                outcome: scored.outcome,
                trial: trial_counter,
            },
        })
    }

    /// [`step`](Self::step), then start the next trial if this one ended.
    /// `done` is evaluated after the regeneration.
    pub fn advance(&mut self, action: usize) -> Result<Step, EnvError> {
        let mut step = self.step(action)?;
        if step.info.new_trial {
            self.generate_trial(None)?;
        }
        step.done = self.episode_done();
        Ok(step)
    }
}

impl Env for RdmEnv {
    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        self.advance(action)
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        self.trial_counter = 0;
        self.trial = None;
        let trial = self.generate_trial(None)?;
        Ok(trial.current_observation().to_vec())
    }

    fn obs_size(&self) -> usize {
        self.cfg.obs_size()
    }

    fn action_size(&self) -> usize {
        self.cfg.num_choices + 1
    }
}
