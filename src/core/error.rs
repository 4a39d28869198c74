use thiserror::Error;

/// Reasons a [`TaskConfig`](crate::config::TaskConfig) is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("timestep must be finite and > 0 (got {0})")]
    Timestep(f64),
    #[error("{name} duration must be finite and > 0 (got {value})")]
    PhaseDuration { name: &'static str, value: f64 },
    #[error("stimulus_min must be finite and >= 0 (got {0})")]
    StimulusMin(f64),
    #[error("stimulus_max ({max}) must be >= stimulus_min ({min})")]
    StimulusBounds { min: f64, max: f64 },
    #[error("num_choices must be >= 2 (got {0})")]
    TooFewChoices(usize),
    #[error("at least one coherence level is required")]
    NoCoherences,
    #[error("coherence levels must be finite and >= 0 (got {0})")]
    Coherence(f32),
    #[error("stim_ev must be finite and >= 0 (got {0})")]
    StimEv(f32),
    #[error("noise_sigma must be finite and >= 0 (got {0})")]
    NoiseSigma(f32),
    #[error("num_trials must be >= 1")]
    NoTrials,
}

/// Failures surfaced by the environment.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("action {action} outside 0..={num_choices}")]
    InvalidAction { action: usize, num_choices: usize },

    #[error("invalid trial override: {0}")]
    InvalidOverride(String),

    #[cfg(feature = "serde")]
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
