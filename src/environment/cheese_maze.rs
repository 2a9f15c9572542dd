use super::Environment;
use crate::Action;
use crate::Observation;
use crate::Reward;
use crate::error::Error;
use crate::error::Result;

const UP: Action = 0;
const DOWN: Action = 1;
const LEFT: Action = 2;
const RIGHT: Action = 3;

const WALL_REWARD: Reward = 0;
const MOVE_REWARD: Reward = 9;
const CHEESE_REWARD: Reward = 29;

/// cell observations of the 7x5 maze; 0 marks a wall. several free
/// cells share an observation, so a single percept is ambiguous and
/// the agent has to disambiguate location from history.
#[rustfmt::skip]
const MAZE: [[Observation; 7]; 5] = [
    [0, 0,  0, 0,  0,  0, 0],
    [0, 9, 10, 8, 10, 12, 0],
    [0, 5,  0, 5,  0,  5, 0],
    [0, 7,  0, 7,  0,  7, 0],
    [0, 0,  0, 0,  0,  0, 0],
];

const START: (usize, usize) = (1, 2);
const CHEESE: (usize, usize) = (3, 3);

/// a mouse hunts a piece of cheese through an aliased maze. walking
/// into a wall costs everything (reward 0 on the biased scale), a
/// step into a free cell pays 9, and reaching the cheese pays 29 and
/// restarts the hunt from the top corridor.
pub struct CheeseMaze {
    mouse: (usize, usize),
    observation: Observation,
    reward: Reward,
}

impl Default for CheeseMaze {
    fn default() -> Self {
        Self::new()
    }
}

impl CheeseMaze {
    pub fn new() -> Self {
        Self {
            mouse: START,
            observation: MAZE[START.0][START.1],
            reward: 0,
        }
    }

    fn restart(&mut self) {
        self.mouse = START;
        self.observation = MAZE[START.0][START.1];
    }
}

impl Environment for CheeseMaze {
    fn valid_actions(&self) -> Vec<Action> {
        vec![UP, DOWN, LEFT, RIGHT]
    }
    fn valid_observations(&self) -> Vec<Observation> {
        vec![5, 7, 8, 9, 10, 12]
    }
    fn valid_rewards(&self) -> Vec<Reward> {
        vec![WALL_REWARD, MOVE_REWARD, CHEESE_REWARD]
    }
    fn observation(&self) -> Observation {
        self.observation
    }
    fn reward(&self) -> Reward {
        self.reward
    }
    fn perform_action(&mut self, action: Action) -> Result<(Observation, Reward)> {
        let (y, x) = self.mouse;
        let target = match action {
            UP => (y - 1, x),
            DOWN => (y + 1, x),
            LEFT => (y, x - 1),
            RIGHT => (y, x + 1),
            wide => return Err(Error::InvalidAction(wide)),
        };
        if MAZE[target.0][target.1] == 0 {
            self.reward = WALL_REWARD;
        } else {
            self.mouse = target;
            self.observation = MAZE[target.0][target.1];
            self.reward = MOVE_REWARD;
            if target == CHEESE {
                self.reward = CHEESE_REWARD;
                self.restart();
            }
        }
        Ok((self.observation, self.reward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walls_block_and_penalise() {
        let mut maze = CheeseMaze::new();
        let before = maze.observation();
        assert_eq!(maze.perform_action(UP).unwrap(), (before, WALL_REWARD));
    }

    #[test]
    fn moves_pay_and_relocate() {
        let mut maze = CheeseMaze::new();
        // start (1,2) -> left to (1,1), observation 9
        assert_eq!(maze.perform_action(LEFT).unwrap(), (9, MOVE_REWARD));
        // down to (2,1), observation 5
        assert_eq!(maze.perform_action(DOWN).unwrap(), (5, MOVE_REWARD));
    }

    #[test]
    fn cheese_pays_and_restarts() {
        let mut maze = CheeseMaze::new();
        // (1,2) -> (1,3) -> (2,3) -> cheese at (3,3), then restart
        assert_eq!(maze.perform_action(RIGHT).unwrap(), (8, MOVE_REWARD));
        assert_eq!(maze.perform_action(DOWN).unwrap(), (5, MOVE_REWARD));
        let (observation, reward) = maze.perform_action(DOWN).unwrap();
        assert_eq!(reward, CHEESE_REWARD);
        assert_eq!(observation, MAZE[START.0][START.1]);
    }

    #[test]
    fn observations_alias_locations() {
        let maze = CheeseMaze::new();
        assert_eq!(maze.observation_bits(), 4);
        assert_eq!(maze.reward_bits(), 5);
        assert_eq!(maze.action_bits(), 2);
    }
}
