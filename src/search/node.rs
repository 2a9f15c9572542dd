use crate::Action;
use crate::Utility;
use crate::agent::Agent;
use crate::error::Result;
use std::collections::BTreeMap;

/// whether a node's children are reached by agent choices or by
/// environmental outcomes. the two kinds strictly alternate down
/// the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Decision,
    Chance,
}

/// one node of the rho-UCT search tree. a decision node's children
/// are chance nodes keyed by action; a chance node's children are
/// decision nodes keyed by the percept index drawn from the model.
/// each node tracks how often sampling passed through it and the
/// running mean of the returns accumulated below it.
///
/// the tree lives for a single planning decision: it is built by
/// `sample_iterations`, read once by `best_action`, and dropped.
#[derive(Debug, Clone)]
pub struct SearchNode {
    kind: Kind,
    visits: u64,
    mean: Utility,
    children: BTreeMap<u64, SearchNode>,
}

impl SearchNode {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            visits: 0,
            mean: 0.0,
            children: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
    pub fn visits(&self) -> u64 {
        self.visits
    }
    pub fn mean(&self) -> Utility {
        self.mean
    }
    pub fn child(&self, key: u64) -> Option<&SearchNode> {
        self.children.get(&key)
    }

    /// run `n` sampled futures through this (root) node. every
    /// iteration mutates the agent's model with its simulated
    /// trajectory, so each runs inside a savestate scope; when this
    /// returns, the agent is bitwise identical to its entry state
    /// and only the search tree has accumulated statistics.
    pub fn sample_iterations(&mut self, agent: &mut Agent, horizon: usize, n: usize) -> Result<()> {
        for _ in 0..n {
            agent.preserving(|agent| self.sample(agent, horizon))?;
        }
        Ok(())
    }

    /// one root-to-leaf traversal: returns the reward accumulated
    /// from here to the horizon, leaving the simulated trajectory
    /// applied to the agent's model. the caller owns the surrounding
    /// savestate scope.
    ///
    /// chance nodes consume one cycle (they draw the percept that
    /// completes it), so they recurse with one less step; decision
    /// nodes pass the horizon through untouched.
    pub fn sample(&mut self, agent: &mut Agent, horizon: usize) -> Result<Utility> {
        if horizon == 0 {
            return Ok(0.0);
        }
        let reward = match self.kind {
            Kind::Chance => {
                let (observation, reward) = agent.sample_percept_and_apply()?;
                let key = agent.percept_index(observation, reward);
                let child = self
                    .children
                    .entry(key)
                    .or_insert_with(|| SearchNode::new(Kind::Decision));
                reward as Utility + child.sample(agent, horizon - 1)?
            }
            Kind::Decision if self.visits == 0 => agent.playout(horizon)?,
            Kind::Decision => {
                let action = self.select_action(agent);
                agent.update_action(action)?;
                let child = self
                    .children
                    .get_mut(&action)
                    .expect("selection creates the chance child");
                child.sample(agent, horizon)?
            }
        };
        self.mean = (reward + self.mean * self.visits as Utility) / (self.visits + 1) as Utility;
        self.visits += 1;
        Ok(reward)
    }

    /// upper-confidence action choice. unexplored actions come
    /// first, uniformly at random; otherwise the action maximising
    ///
    ///   mean / (H * R) + C * sqrt(ln(visits) / visits(a))
    ///
    /// where R spans the per-cycle reward range, so the exploitation
    /// term lives in [0, 1] over an H-cycle return.
    fn select_action(&mut self, agent: &mut Agent) -> Action {
        let actions = agent.environment().valid_actions();
        let unexplored = actions
            .iter()
            .copied()
            .filter(|action| !self.children.contains_key(action))
            .collect::<Vec<Action>>();
        if let Some(&action) = agent.choose(&unexplored) {
            self.children.insert(action, SearchNode::new(Kind::Chance));
            action
        } else {
            let scale = agent.horizon() as Utility * agent.reward_range() as Utility;
            let exploration = agent.exploration();
            let discovery = (self.visits as Utility).ln();
            actions
                .iter()
                .copied()
                .map(|action| (action, self.children.get(&action).expect("all explored")))
                .map(|(action, child)| {
                    let exploit = child.mean / scale;
                    let explore = exploration * (discovery / child.visits as Utility).sqrt();
                    (action, exploit + explore)
                })
                .fold(None, |best: Option<(Action, Utility)>, (action, ucb)| {
                    match best {
                        Some((_, top)) if ucb <= top => best,
                        _ => Some((action, ucb)),
                    }
                })
                .map(|(action, _)| action)
                .expect("environments expose at least one action")
        }
    }

    /// the action whose chance child carries the highest sampled
    /// mean return. ties resolve to the lowest action index. a root
    /// with no children yet (possible only for a single-simulation
    /// budget) yields nothing and the agent falls back to a random
    /// legal action.
    pub fn best_action(&self) -> Option<Action> {
        self.children
            .iter()
            .fold(None, |best: Option<(Action, Utility)>, (&action, child)| {
                match best {
                    Some((_, top)) if child.mean <= top => best,
                    _ => Some((action, child.mean)),
                }
            })
            .map(|(action, _)| action)
    }
}
