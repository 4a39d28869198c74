//! # rdm_env
//!
//! An N-alternative random-dots perceptual decision task, stepped one timestep
//! at a time, for generating training and evaluation episodes.
//!
//! Each trial runs fixation → stimulus → decision. During the stimulus the
//! agent sees noisy evidence favoring the correct choice; it must hold (action
//! `0`) until the decision window and then pick a choice in `1..=num_choices`.
//!
//! ## Quick Start
//!
//! ```
//! use rdm_env::prelude::*;
//!
//! let cfg = TaskConfig::default().with_num_choices(3).with_seed(42);
//! let mut env = RdmEnv::new(cfg).unwrap();
//!
//! let step = env.advance(0).unwrap();
//! assert_eq!(step.observation.len(), 4);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Serialization of configs, overrides and step records
//! - `cli` (default): The `rdm` demo/trace binary
//!
//! ## Modules
//!
//! - [`config`]: Task configuration and validation
//! - [`trial`]: Trial generation and observation synthesis
//! - [`policy`]: Reward policy per phase
//! - [`env`]: Step state machine and episode bookkeeping
//! - [`observer`]: Read-only snapshots and trace recording

#[path = "core/config.rs"]
pub mod config;

#[path = "core/env.rs"]
pub mod env;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/policy.rs"]
pub mod policy;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/stats.rs"]
pub mod stats;

#[path = "core/trial.rs"]
pub mod trial;

pub mod observer;

/// Prelude module for convenient imports.
///
/// ```
/// use rdm_env::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RewardSchedule, TaskConfig, Timing};
    pub use crate::env::{Env, RdmEnv, Step, StepInfo};
    pub use crate::error::{ConfigError, EnvError};
    pub use crate::policy::Outcome;
    pub use crate::trial::{Durations, Phase, Trial, TrialOverrides};
}
