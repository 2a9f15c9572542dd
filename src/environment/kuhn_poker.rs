use super::Environment;
use crate::Action;
use crate::Observation;
use crate::Probability;
use crate::Reward;
use crate::error::Error;
use crate::error::Result;
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

const PASS: Action = 0;
const BET: Action = 1;

const JACK: u64 = 0;
const QUEEN: u64 = 1;
const KING: u64 = 2;

/// winnings ride on a +3 bias so every settled pot encodes into
/// three bits: losing a called bet lands at 1, folding at 2, and
/// winning a called bet at 7.
const BIAS: Reward = 3;

/// one hand of Kuhn poker per cycle against a fixed opponent playing
/// a Nash betting strategy parameterised by a mixing weight drawn at
/// construction. the agent sees its own card and the opponent's
/// opening move, acts once, and collects the settled pot.
pub struct KuhnPoker {
    alpha: Probability,
    agent_card: u64,
    opponent_card: u64,
    opponent_bet: bool,
    pot_opponent: Reward,
    pot_agent: Reward,
    observation: Observation,
    reward: Reward,
    rng: SmallRng,
}

impl KuhnPoker {
    pub fn new(mut rng: SmallRng) -> Self {
        let alpha = rng.random::<f64>() / 3.0;
        let mut hand = Self {
            alpha,
            agent_card: JACK,
            opponent_card: QUEEN,
            opponent_bet: false,
            pot_opponent: 1,
            pot_agent: 1,
            observation: 0,
            reward: 0,
            rng,
        };
        hand.deal();
        hand
    }

    /// start a fresh hand: new cards, fresh antes, and the
    /// opponent's opening move under its Nash mix: betting jacks as
    /// a bluff with weight alpha, checking queens, betting kings
    /// with weight 3 alpha
    fn deal(&mut self) {
        self.reward = BIAS;
        self.agent_card = *[JACK, QUEEN, KING].choose(&mut self.rng).expect("nonempty");
        self.opponent_card = *[JACK, QUEEN, KING]
            .iter()
            .copied()
            .filter(|&card| card != self.agent_card)
            .collect::<Vec<u64>>()
            .choose(&mut self.rng)
            .expect("two cards remain");
        self.pot_opponent = 1;
        self.pot_agent = 1;
        self.opponent_bet = match self.opponent_card {
            JACK => self.rng.random::<f64>() < self.alpha,
            QUEEN => false,
            _ => self.rng.random::<f64>() < 3.0 * self.alpha,
        };
        if self.opponent_bet {
            self.pot_opponent += 1;
        }
        self.observation = self.agent_card * 2 + (!self.opponent_bet) as Observation;
    }

    fn showdown(&mut self) {
        if self.opponent_card > self.agent_card {
            self.reward -= self.pot_agent;
        } else {
            self.reward += self.pot_opponent + self.pot_agent;
        }
    }
}

impl Environment for KuhnPoker {
    fn valid_actions(&self) -> Vec<Action> {
        vec![PASS, BET]
    }
    fn valid_observations(&self) -> Vec<Observation> {
        (0..6).collect()
    }
    fn valid_rewards(&self) -> Vec<Reward> {
        (0..8).collect()
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
        if action == BET {
            self.pot_agent += 1;
            if self.opponent_bet {
                self.showdown();
            } else {
                // facing a raise after checking, the opponent folds
                // jacks, calls with kings, and mixes on queens
                match self.opponent_card {
                    JACK => self.reward += self.pot_opponent + self.pot_agent,
                    QUEEN if self.rng.random::<f64>() < self.alpha + 1.0 / 3.0 => {
                        self.pot_opponent += 1;
                        self.showdown();
                    }
                    QUEEN => self.reward += self.pot_opponent + self.pot_agent,
                    _ => {
                        self.pot_opponent += 1;
                        self.showdown();
                    }
                }
            }
        } else if self.opponent_bet {
            self.reward -= self.pot_agent;
        } else {
            self.showdown();
        }
        let settled = self.reward;
        self.deal();
        Ok((self.observation, settled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn poker() -> KuhnPoker {
        KuhnPoker::new(SmallRng::seed_from_u64(13))
    }

    #[test]
    fn observation_reveals_card_and_opening() {
        let poker = poker();
        let expected = poker.agent_card * 2 + (!poker.opponent_bet) as u64;
        assert_eq!(poker.observation(), expected);
    }

    #[test]
    fn cards_are_distinct() {
        let mut poker = poker();
        for _ in 0..100 {
            assert_ne!(poker.agent_card, poker.opponent_card);
            poker.perform_action(PASS).unwrap();
        }
    }

    #[test]
    fn rewards_stay_in_three_bits() {
        let mut poker = poker();
        for i in 0..500 {
            let (observation, reward) = poker.perform_action(i % 2).unwrap();
            assert!(observation < 6);
            assert!(reward < 8);
        }
    }

    #[test]
    fn checked_pots_settle_by_showdown() {
        let mut poker = poker();
        for _ in 0..10_000 {
            if !poker.opponent_bet {
                let winning = poker.agent_card > poker.opponent_card;
                let (_, reward) = poker.perform_action(PASS).unwrap();
                match winning {
                    true => assert_eq!(reward, BIAS + 2),
                    false => assert_eq!(reward, BIAS - 1),
                }
                return;
            }
            poker.perform_action(PASS).unwrap();
        }
        panic!("opponent never checked");
    }

    #[test]
    fn folding_to_a_bet_loses_the_ante() {
        let mut poker = poker();
        for _ in 0..10_000 {
            if poker.opponent_bet {
                let (_, reward) = poker.perform_action(PASS).unwrap();
                assert_eq!(reward, BIAS - 1);
                return;
            }
            poker.perform_action(PASS).unwrap();
        }
        panic!("opponent never bet");
    }

    #[test]
    fn field_widths() {
        let poker = poker();
        assert_eq!(poker.action_bits(), 1);
        assert_eq!(poker.observation_bits(), 3);
        assert_eq!(poker.reward_bits(), 3);
        assert_eq!(poker.percept_bits(), 6);
    }
}
