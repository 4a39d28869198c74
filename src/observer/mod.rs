#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::env::{RdmEnv, Step};
use crate::policy::Outcome;
use crate::stats::OutcomeTally;
use crate::trial::{Durations, Phase};

/// A read-only snapshot of where the environment is.
///
/// Design intent:
/// - Observers cannot mutate or steer the environment.
/// - Snapshotting is on-demand and can allocate; the step loop stays unchanged.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct EnvSnapshot {
    pub trial_counter: u64,
    pub episode_done: bool,
    /// `None` until the first trial exists.
    pub trial: Option<TrialSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TrialSnapshot {
    pub ground_truth: usize,
    pub coherence: f32,
    pub durations: Durations,
    pub elapsed: f64,
    pub phase: Phase,
    pub steps: usize,
}

pub struct EnvAdapter<'a> {
    env: &'a RdmEnv,
}

impl<'a> EnvAdapter<'a> {
    pub fn new(env: &'a RdmEnv) -> Self {
        Self { env }
    }

    pub fn snapshot(&self) -> EnvSnapshot {
        EnvSnapshot {
            trial_counter: self.env.trial_counter(),
            episode_done: self.env.episode_done(),
            trial: self.env.trial().map(|t| TrialSnapshot {
                ground_truth: t.ground_truth(),
                coherence: t.coherence(),
                durations: t.durations(),
                elapsed: t.elapsed(),
                phase: t.current_phase(),
                steps: t.num_steps(),
            }),
        }
    }
}

/// One row of an episode trace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepRecord {
    pub index: usize,
    pub action: usize,
    pub observation: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    pub new_trial: bool,
    /// Expected action (argmax of the one-hot ground truth).
    pub expected: usize,
    pub phase: Phase,
    pub outcome: Outcome,
    pub trial: u64,
}

/// Collects the steps a driver produced, for rendering after the fact.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    records: Vec<StepRecord>,
    tally: OutcomeTally,
    total_reward: f64,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: usize, step: &Step) -> &StepRecord {
        let expected = step
            .info
            .ground_truth
            .iter()
            .position(|&x| x > 0.5)
            .unwrap_or(0);
        self.tally.record(step.info.outcome, step.info.new_trial);
        self.total_reward += step.reward as f64;
        let index = self.records.len();
        self.records.push(StepRecord {
            index,
            action,
            observation: step.observation.clone(),
            reward: step.reward,
            done: step.done,
            new_trial: step.info.new_trial,
            expected,
            phase: step.info.phase,
            outcome: step.info.outcome,
            trial: step.info.trial,
        });
        &self.records[index]
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn tally(&self) -> &OutcomeTally {
        &self.tally
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;
    use crate::trial::TrialOverrides;

    #[test]
    fn snapshot_tracks_the_clock() {
        let mut env = RdmEnv::new(TaskConfig::default().with_seed(1)).unwrap();
        assert_eq!(EnvAdapter::new(&env).snapshot().trial, None);

        env.generate_trial(Some(
            TrialOverrides::default()
                .with_durations(100.0, 100.0, 100.0)
                .with_ground_truth(3)
                .with_coherence(12.8),
        ))
        .unwrap();
        env.step(0).unwrap();

        let snap = EnvAdapter::new(&env).snapshot();
        assert_eq!(snap.trial_counter, 1);
        assert!(!snap.episode_done);
        let trial = snap.trial.unwrap();
        assert_eq!(trial.ground_truth, 3);
        assert_eq!(trial.coherence, 12.8);
        assert_eq!(trial.elapsed, 100.0);
        assert_eq!(trial.phase, Phase::Stimulus);
        assert_eq!(trial.steps, 3);
    }

    #[test]
    fn recorder_accumulates_trace() {
        let cfg = TaskConfig::default()
            .with_abort_ends_trial(true)
            .with_seed(2);
        let mut env = RdmEnv::new(cfg).unwrap();
        let mut rec = TraceRecorder::new();

        let step = env.advance(1).unwrap();
        let row = rec.record(1, &step);
        assert_eq!(row.index, 0);
        assert_eq!(row.expected, 0);
        assert_eq!(row.outcome, Outcome::Aborted);

        let step = env.advance(0).unwrap();
        rec.record(0, &step);

        assert_eq!(rec.len(), 2);
        assert_eq!(rec.tally().aborted, 1);
        assert_eq!(rec.tally().trials, 1);
        assert!((rec.total_reward() - (-0.1f32) as f64).abs() < 1e-9);
    }
}
