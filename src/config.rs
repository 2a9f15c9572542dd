use crate::DEFAULT_COIN_FLIP_P;
use crate::DEFAULT_EXPLORATION;
use crate::DEFAULT_TIGER_LISTEN_P;
use crate::Probability;
use crate::Utility;
use crate::error::Error;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;

/// everything the agent and the experiment driver can be told.
/// files use kebab-case keys (`agent-horizon: 8`); the driver merges
/// file values with command-line overrides before validating.
///
/// `agent-horizon`, `ct-depth` and `mc-simulations` are required;
/// the zero default of the first and last lies outside their domain,
/// so leaving them unset fails validation, while a context tree of
/// depth zero is a legal (if memoryless) model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// planning depth in cycles, at least 1
    pub agent_horizon: u64,
    /// maximum context length in bits
    pub ct_depth: u64,
    /// rho-UCT iterations per decision, at least 1
    pub mc_simulations: u64,
    /// cycles after which model counts freeze; 0 learns forever
    pub learning_period: u64,
    /// ucb exploration weight
    pub exploration_constant: Utility,
    /// seed for every stream of randomness the agent draws on;
    /// unset seeds from the operating system
    pub random_seed: Option<u64>,
    /// driver-level cycle cap; 0 runs unbounded
    pub terminate_age: u64,
    /// probability the coin-flip environment lands heads
    pub coin_flip_p: Probability,
    /// probability a listen reveals the tiger truthfully
    pub tiger_listen_p: Probability,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_horizon: 0,
            ct_depth: 0,
            mc_simulations: 0,
            learning_period: 0,
            exploration_constant: DEFAULT_EXPLORATION,
            random_seed: None,
            terminate_age: 0,
            coin_flip_p: DEFAULT_COIN_FLIP_P,
            tiger_listen_p: DEFAULT_TIGER_LISTEN_P,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.agent_horizon < 1 {
            return Err(Error::Config {
                key: "agent-horizon",
                reason: "required, must be at least 1".into(),
            });
        }
        if self.mc_simulations < 1 {
            return Err(Error::Config {
                key: "mc-simulations",
                reason: "required, must be at least 1".into(),
            });
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant <= 0.0 {
            return Err(Error::Config {
                key: "exploration-constant",
                reason: format!("{} is not a positive finite weight", self.exploration_constant),
            });
        }
        if !(0.0..=1.0).contains(&self.coin_flip_p) {
            return Err(Error::Config {
                key: "coin-flip-p",
                reason: format!("{} is not a probability", self.coin_flip_p),
            });
        }
        if !(0.0..=1.0).contains(&self.tiger_listen_p) {
            return Err(Error::Config {
                key: "tiger-listen-p",
                reason: format!("{} is not a probability", self.tiger_listen_p),
            });
        }
        Ok(())
    }
}
