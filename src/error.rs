use crate::Action;

/// everything that can go wrong inside the agent, its model,
/// or its planner. errors are propagated to the caller of the
/// agent loop; nothing is swallowed in the predictor or planner.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("action {0} is not in the environment's action set")]
    InvalidAction(Action),
    #[error("{0} update arrived out of sequence")]
    WrongUpdateOrder(&'static str),
    #[error("cannot revert {requested} symbols from a history of {available}")]
    InsufficientHistory { requested: usize, available: usize },
    #[error("expected a field of {expected} symbols, got {got}")]
    MalformedSymbols { expected: usize, got: usize },
    #[error("configuration key '{key}': {reason}")]
    Config { key: &'static str, reason: String },
    #[error("log probability {0} exceeds zero beyond tolerance")]
    NumericInstability(f64),
}

pub type Result<T> = std::result::Result<T, Error>;
