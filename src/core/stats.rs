#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::policy::Outcome;

/// Running counts of how trials ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutcomeTally {
    pub correct: u32,
    pub failed: u32,
    pub aborted: u32,
    pub missed: u32,
    /// Trials that ended, whatever the reason.
    pub trials: u32,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one step's outcome. Non-terminal aborts are counted but do not
    /// close a trial.
    pub fn record(&mut self, outcome: Outcome, ended_trial: bool) {
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Aborted => self.aborted += 1,
            Outcome::Missed => self.missed += 1,
            Outcome::Pending => {}
        }
        if ended_trial {
            self.trials += 1;
        }
    }

    /// Fraction of committed decisions that were correct.
    pub fn accuracy(&self) -> f32 {
        let total = self.correct + self.failed;
        if total == 0 {
            0.0
        } else {
            self.correct as f32 / total as f32
        }
    }

    /// Fraction of ended trials that ended in a decision (correct or not).
    pub fn response_rate(&self) -> f32 {
        if self.trials == 0 {
            0.0
        } else {
            (self.correct + self.failed) as f32 / self.trials as f32
        }
    }
}
