//! Reward policy: what a (phase, action) pair is worth and whether it ends the trial.
//!
//! Phase classification lives on [`Trial::phase_at`](crate::trial::Trial::phase_at);
//! this module only maps an already-classified phase to a reward.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::RewardSchedule;
use crate::trial::Phase;

/// How a single step was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Outcome {
    /// Nothing notable happened (holding when a hold was expected).
    Pending,
    Correct,
    Failed,
    Aborted,
    Missed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Correct => "correct",
            Outcome::Failed => "failed",
            Outcome::Aborted => "aborted",
            Outcome::Missed => "missed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub reward: f32,
    pub ends_trial: bool,
    pub outcome: Outcome,
}

impl Scored {
    const PENDING: Scored = Scored {
        reward: 0.0,
        ends_trial: false,
        outcome: Outcome::Pending,
    };
}

/// The action the agent should emit in `phase`.
pub fn expected_action(phase: Phase, ground_truth: usize) -> usize {
    match phase {
        Phase::Decision => ground_truth,
        Phase::Fixation | Phase::Stimulus | Phase::Expired => 0,
    }
}

/// One-hot vector over `0..=num_choices` marking the expected action.
pub fn one_hot(index: usize, num_choices: usize) -> Vec<f32> {
    let mut v = vec![0.0; num_choices + 1];
    if let Some(x) = v.get_mut(index) {
        *x = 1.0;
    }
    v
}

/// Phase-specific reward for `action`.
pub fn score(
    phase: Phase,
    action: usize,
    ground_truth: usize,
    rewards: &RewardSchedule,
    abort_ends_trial: bool,
) -> Scored {
    match phase {
        Phase::Fixation | Phase::Stimulus => {
            if action == 0 {
                Scored::PENDING
            } else {
                Scored {
                    reward: rewards.aborted,
                    ends_trial: abort_ends_trial,
                    outcome: Outcome::Aborted,
                }
            }
        }
        Phase::Decision => {
            if action == 0 {
                Scored::PENDING
            } else if action == ground_truth {
                Scored {
                    reward: rewards.correct,
                    ends_trial: true,
                    outcome: Outcome::Correct,
                }
            } else {
                Scored {
                    reward: rewards.fail,
                    ends_trial: true,
                    outcome: Outcome::Failed,
                }
            }
        }
        Phase::Expired => Scored {
            reward: rewards.miss,
            ends_trial: true,
            outcome: Outcome::Missed,
        },
    }
}

/// Deadline rule applied after [`score`]: if this step exhausts the trial and
/// nothing has ended it yet, the step becomes a miss.
pub fn apply_deadline(scored: Scored, final_step: bool, rewards: &RewardSchedule) -> Scored {
    if final_step && !scored.ends_trial {
        Scored {
            reward: rewards.miss,
            ends_trial: true,
            outcome: Outcome::Missed,
        }
    } else {
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewards() -> RewardSchedule {
        RewardSchedule {
            correct: 1.0,
            fail: -0.5,
            aborted: -0.1,
            miss: -0.25,
        }
    }

    #[test]
    fn holding_is_free_before_decision() {
        for phase in [Phase::Fixation, Phase::Stimulus] {
            let s = score(phase, 0, 2, &rewards(), true);
            assert_eq!(s.reward, 0.0);
            assert!(!s.ends_trial);
            assert_eq!(s.outcome, Outcome::Pending);
        }
    }

    #[test]
    fn early_action_is_an_abort() {
        for phase in [Phase::Fixation, Phase::Stimulus] {
            let s = score(phase, 1, 2, &rewards(), false);
            assert_eq!(s.reward, -0.1);
            assert_eq!(s.outcome, Outcome::Aborted);
            assert!(!s.ends_trial);

            let s = score(phase, 1, 2, &rewards(), true);
            assert!(s.ends_trial);
        }
    }

    #[test]
    fn decision_actions() {
        let r = rewards();
        let correct = score(Phase::Decision, 2, 2, &r, false);
        assert_eq!((correct.reward, correct.ends_trial), (1.0, true));
        assert_eq!(correct.outcome, Outcome::Correct);

        let wrong = score(Phase::Decision, 3, 2, &r, false);
        assert_eq!((wrong.reward, wrong.ends_trial), (-0.5, true));
        assert_eq!(wrong.outcome, Outcome::Failed);

        let hold = score(Phase::Decision, 0, 2, &r, false);
        assert_eq!((hold.reward, hold.ends_trial), (0.0, false));
    }

    #[test]
    fn expired_is_a_miss() {
        let s = score(Phase::Expired, 0, 1, &rewards(), false);
        assert_eq!(s.outcome, Outcome::Missed);
        assert_eq!(s.reward, -0.25);
        assert!(s.ends_trial);
    }

    #[test]
    fn deadline_only_overrides_open_trials() {
        let r = rewards();
        let hold = score(Phase::Decision, 0, 2, &r, false);
        let missed = apply_deadline(hold, true, &r);
        assert_eq!(missed.outcome, Outcome::Missed);
        assert_eq!(missed.reward, -0.25);

        let correct = score(Phase::Decision, 2, 2, &r, false);
        assert_eq!(apply_deadline(correct, true, &r), correct);
        assert_eq!(apply_deadline(hold, false, &r), hold);
    }

    #[test]
    fn expected_action_and_one_hot() {
        assert_eq!(expected_action(Phase::Fixation, 3), 0);
        assert_eq!(expected_action(Phase::Stimulus, 3), 0);
        assert_eq!(expected_action(Phase::Decision, 3), 3);
        assert_eq!(expected_action(Phase::Expired, 3), 0);
        assert_eq!(one_hot(2, 3), vec![0.0, 0.0, 1.0, 0.0]);
    }
}
