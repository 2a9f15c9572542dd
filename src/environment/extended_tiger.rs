use super::Environment;
use crate::Action;
use crate::Observation;
use crate::Probability;
use crate::Reward;
use crate::error::Error;
use crate::error::Result;
use rand::Rng;
use rand::rngs::SmallRng;

const STAND: Action = 0;
const LISTEN: Action = 1;
const OPEN_LEFT: Action = 2;
const OPEN_RIGHT: Action = 3;

const LEFT: Observation = 0;
const RIGHT: Observation = 1;
const VOID: Observation = 2;

/// rewards carry a +100 bias so the encoded values stay non-negative:
/// being eaten is -100, an illegal opening -10, stand/listen -1, and
/// the pot of gold +30 on the natural scale.
const EATEN: Reward = 0;
const PENALTY: Reward = 90;
const NORMAL: Reward = 99;
const GOLD: Reward = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Posture {
    Sitting,
    Standing,
}

/// a tiger and a pot of gold sit behind two doors. the agent starts
/// seated: it may listen for the tiger (accurate with probability
/// `listen_p`, and only while seated) or stand up. only a standing
/// agent can open a door; opening onto the gold pays out, opening
/// onto the tiger is the worst outcome there is, and either way a
/// fresh game begins with the tiger relocated.
pub struct ExtendedTiger {
    listen_p: Probability,
    posture: Posture,
    tiger: Observation,
    observation: Observation,
    reward: Reward,
    rng: SmallRng,
}

impl ExtendedTiger {
    pub fn new(listen_p: Probability, mut rng: SmallRng) -> Self {
        let tiger = if rng.random::<bool>() { LEFT } else { RIGHT };
        Self {
            listen_p,
            posture: Posture::Sitting,
            tiger,
            observation: VOID,
            reward: 0,
            rng,
        }
    }

    fn restart(&mut self) {
        self.posture = Posture::Sitting;
        self.tiger = if self.rng.random::<bool>() { LEFT } else { RIGHT };
        self.observation = VOID;
    }

    fn open(&mut self, door: Observation) {
        self.reward = if self.tiger == door { EATEN } else { GOLD };
        self.restart();
    }
}

impl Environment for ExtendedTiger {
    fn valid_actions(&self) -> Vec<Action> {
        vec![STAND, LISTEN, OPEN_LEFT, OPEN_RIGHT]
    }
    fn valid_observations(&self) -> Vec<Observation> {
        vec![LEFT, RIGHT, VOID]
    }
    fn valid_rewards(&self) -> Vec<Reward> {
        vec![EATEN, PENALTY, NORMAL, GOLD]
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
        match self.posture {
            Posture::Sitting => match action {
                STAND => {
                    self.reward = NORMAL;
                    self.posture = Posture::Standing;
                }
                LISTEN => {
                    self.reward = NORMAL;
                    self.observation = if self.rng.random::<f64>() < self.listen_p {
                        self.tiger
                    } else {
                        self.tiger ^ 1
                    };
                }
                _ => self.reward = PENALTY,
            },
            Posture::Standing => match action {
                OPEN_LEFT => self.open(LEFT),
                OPEN_RIGHT => self.open(RIGHT),
                _ => self.reward = PENALTY,
            },
        }
        Ok((self.observation, self.reward))
    }
}
