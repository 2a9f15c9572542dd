pub mod cheese_maze;
pub use cheese_maze::*;

pub mod coin_flip;
pub use coin_flip::*;

pub mod extended_tiger;
pub use extended_tiger::*;

pub mod kuhn_poker;
pub use kuhn_poker::*;

use crate::Action;
use crate::Observation;
use crate::Reward;
use crate::coding;
use crate::error::Result;

/// the capability set the agent requires of any world it lives in.
/// actions, observations and rewards are all small non-negative
/// integers; an environment whose natural reward is signed must add
/// a positive bias so every encoded value is non-negative, since the
/// planner normalises returns by the [minimum, maximum] reward range.
///
/// field widths are derived from the valid value sets and are fixed
/// for the environment's lifetime. `is_finished` is sticky: once an
/// environment reports the interaction over, it stays over.
pub trait Environment {
    /// the finite set of legal actions, in ascending order
    fn valid_actions(&self) -> Vec<Action>;
    /// the finite set of possible observations
    fn valid_observations(&self) -> Vec<Observation>;
    /// the finite set of possible rewards
    fn valid_rewards(&self) -> Vec<Reward>;
    /// the current observation (the initial one before any action)
    fn observation(&self) -> Observation;
    /// the current reward (the initial one before any action)
    fn reward(&self) -> Reward;
    /// advance the world by one agent action
    fn perform_action(&mut self, action: Action) -> Result<(Observation, Reward)>;
    fn is_finished(&self) -> bool {
        false
    }

    fn action_bits(&self) -> usize {
        width(&self.valid_actions())
    }
    fn observation_bits(&self) -> usize {
        width(&self.valid_observations())
    }
    fn reward_bits(&self) -> usize {
        width(&self.valid_rewards())
    }
    fn percept_bits(&self) -> usize {
        self.reward_bits() + self.observation_bits()
    }
    fn minimum_reward(&self) -> Reward {
        self.valid_rewards().into_iter().min().unwrap_or(0)
    }
    fn maximum_reward(&self) -> Reward {
        self.valid_rewards().into_iter().max().unwrap_or(0)
    }
}

/// bits needed for the widest value in a field's valid set
fn width(values: &[u64]) -> usize {
    values
        .iter()
        .copied()
        .map(coding::bits_required)
        .max()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Toy;
    impl Environment for Toy {
        fn valid_actions(&self) -> Vec<Action> {
            vec![0, 1, 2, 3]
        }
        fn valid_observations(&self) -> Vec<Observation> {
            vec![5, 7, 8, 9, 10, 12]
        }
        fn valid_rewards(&self) -> Vec<Reward> {
            vec![0, 9, 29]
        }
        fn observation(&self) -> Observation {
            10
        }
        fn reward(&self) -> Reward {
            0
        }
        fn perform_action(&mut self, _: Action) -> Result<(Observation, Reward)> {
            Ok((10, 9))
        }
    }

    #[test]
    fn widths_derive_from_valid_sets() {
        let toy = Toy;
        assert_eq!(toy.action_bits(), 2);
        assert_eq!(toy.observation_bits(), 4);
        assert_eq!(toy.reward_bits(), 5);
        assert_eq!(toy.percept_bits(), 9);
        assert_eq!(toy.minimum_reward(), 0);
        assert_eq!(toy.maximum_reward(), 29);
    }
}
