pub mod agent;
pub mod coding;
pub mod config;
pub mod ctw;
pub mod environment;
pub mod error;
pub mod search;

/// dimensional analysis types
pub type Action = u64;
pub type Observation = u64;
pub type Reward = u64;
pub type Probability = f64;
pub type Utility = f64;

/// a single bit of agent/environment interaction.
/// everything the model sees is a stream of these.
pub type Symbol = bool;

/// ln(1/2), the mixture weight at every internal context tree node
pub(crate) const LN_HALF: f64 = -std::f64::consts::LN_2;

/// how far above zero a cached log probability may drift
/// before we consider the model numerically broken
pub(crate) const LOG_TOLERANCE: f64 = 1e-10;

/// ucb exploration weight used when none is configured
pub const DEFAULT_EXPLORATION: Utility = 2.0;

/// sampling probability of heads used when none is configured
pub const DEFAULT_COIN_FLIP_P: Probability = 0.7;

/// listen accuracy used when none is configured
pub const DEFAULT_TIGER_LISTEN_P: Probability = 0.85;
