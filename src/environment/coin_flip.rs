use super::Environment;
use crate::Action;
use crate::Observation;
use crate::Probability;
use crate::Reward;
use crate::error::Error;
use crate::error::Result;
use rand::Rng;
use rand::rngs::SmallRng;

/// a biased coin is flipped every cycle and the agent calls the
/// outcome. observation is the side the coin landed on (1 = heads),
/// reward is 1 for a correct call and 0 otherwise. the single
/// learnable regularity is the bias.
pub struct CoinFlip {
    p: Probability,
    observation: Observation,
    reward: Reward,
    rng: SmallRng,
}

impl CoinFlip {
    pub fn new(p: Probability, mut rng: SmallRng) -> Self {
        let observation = rng.random::<f64>() < p;
        Self {
            p,
            observation: observation as Observation,
            reward: 0,
            rng,
        }
    }
}

impl Environment for CoinFlip {
    fn valid_actions(&self) -> Vec<Action> {
        vec![0, 1]
    }
    fn valid_observations(&self) -> Vec<Observation> {
        vec![0, 1]
    }
    fn valid_rewards(&self) -> Vec<Reward> {
        vec![0, 1]
    }
    fn observation(&self) -> Observation {
        self.observation
    }
    fn reward(&self) -> Reward {
        self.reward
    }
    fn perform_action(&mut self, action: Action) -> Result<(Observation, Reward)> {
        if !self.valid_actions().contains(&action) {
            return Err(Error::InvalidAction(action));
        }
        self.observation = (self.rng.random::<f64>() < self.p) as Observation;
        self.reward = (action == self.observation) as Reward;
        Ok((self.observation, self.reward))
    }
}
