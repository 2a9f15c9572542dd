use crate::Action;
use crate::Observation;
use crate::Probability;
use crate::Reward;
use crate::Symbol;
use crate::Utility;
use crate::coding;
use crate::config::Config;
use crate::ctw::ContextTree;
use crate::ctw::Snapshot;
use crate::environment::Environment;
use crate::error::Error;
use crate::error::Result;
use crate::search::Kind;
use crate::search::SearchNode;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

/// which half of the interaction cycle most recently touched the
/// model. updates strictly alternate, starting from `Action` so the
/// environment's initial percept slots in as the answer to a
/// notional null starting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    Action,
    Percept,
}

/// everything needed to put the agent back exactly where it was:
/// the interaction counters plus an opaque model snapshot.
#[derive(Clone)]
pub struct SaveState {
    age: u64,
    total_reward: Utility,
    last_update: Update,
    model: Snapshot,
}

/// the agent couples a context tree model of its history with a
/// rho-UCT planner over that model. every cycle it plans an action,
/// commits the action to its history, then absorbs the percept the
/// environment answers with. rewards accumulate; the model keeps
/// learning until the configured learning period ends.
pub struct Agent {
    age: u64,
    total_reward: Utility,
    horizon: usize,
    simulations: usize,
    learning_period: u64,
    exploration: Utility,
    last_update: Update,
    model: ContextTree,
    savestate: SaveState,
    environment: Box<dyn Environment>,
    rng: SmallRng,
}

impl Agent {
    pub fn new(environment: Box<dyn Environment>, config: &Config) -> Result<Self> {
        config.validate()?;
        let model = ContextTree::new(config.ct_depth as usize);
        let savestate = SaveState {
            age: 0,
            total_reward: 0.0,
            last_update: Update::Action,
            model: model.snapshot(),
        };
        Ok(Self {
            age: 0,
            total_reward: 0.0,
            horizon: config.agent_horizon as usize,
            simulations: config.mc_simulations as usize,
            learning_period: config.learning_period,
            exploration: config.exploration_constant,
            last_update: Update::Action,
            model,
            savestate,
            environment,
            rng: match config.random_seed {
                Some(seed) => SmallRng::seed_from_u64(seed),
                None => SmallRng::from_os_rng(),
            },
        })
    }

    pub fn age(&self) -> u64 {
        self.age
    }
    pub fn total_reward(&self) -> Utility {
        self.total_reward
    }
    pub fn average_reward(&self) -> Utility {
        match self.age {
            0 => 0.0,
            age => self.total_reward / age as Utility,
        }
    }
    pub fn horizon(&self) -> usize {
        self.horizon
    }
    pub fn exploration(&self) -> Utility {
        self.exploration
    }
    pub fn last_update(&self) -> Update {
        self.last_update
    }
    pub fn history_size(&self) -> usize {
        self.model.history_len()
    }
    pub fn model_size(&self) -> usize {
        self.model.size()
    }
    pub fn model(&self) -> &ContextTree {
        &self.model
    }
    pub fn model_mut(&mut self) -> &mut ContextTree {
        &mut self.model
    }
    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }
    pub fn environment_mut(&mut self) -> &mut dyn Environment {
        self.environment.as_mut()
    }
    /// span of the per-cycle reward, the planner's return normaliser
    pub fn reward_range(&self) -> u64 {
        self.environment.maximum_reward() - self.environment.minimum_reward() + 1
    }

    /// forget everything: empty model, zeroed counters, ready for
    /// the initial percept
    pub fn reset(&mut self) {
        self.model.clear();
        self.age = 0;
        self.total_reward = 0.0;
        self.last_update = Update::Action;
        self.set_savestate();
    }

    /// commit a real (or simulated) action to the history. the model
    /// conditions on its own actions but does not predict them, so
    /// only the history grows, never the counts.
    pub fn update_action(&mut self, action: Action) -> Result<()> {
        if !self.environment.valid_actions().contains(&action) {
            return Err(Error::InvalidAction(action));
        }
        if self.last_update != Update::Percept {
            return Err(Error::WrongUpdateOrder("action"));
        }
        let symbols = coding::encode(action, self.environment.action_bits());
        self.model.update_history(&symbols);
        self.age += 1;
        self.last_update = Update::Action;
        Ok(())
    }

    /// absorb a percept from the environment. within the learning
    /// period the model learns from it; afterwards the percept is
    /// only tracked as context.
    pub fn update_percept(&mut self, observation: Observation, reward: Reward) -> Result<()> {
        if self.last_update != Update::Action {
            return Err(Error::WrongUpdateOrder("percept"));
        }
        let symbols = self.encode_percept(observation, reward);
        if self.learning_period == 0 || self.age <= self.learning_period {
            self.model.update(&symbols)?;
        } else {
            self.model.update_history(&symbols);
        }
        self.total_reward += reward as Utility;
        self.last_update = Update::Percept;
        Ok(())
    }

    /// draw a percept from the model and keep it, exactly as if the
    /// environment had produced it. simulation trajectories learn on
    /// purpose: the mixture conditions later draws on earlier ones.
    pub fn sample_percept_and_apply(&mut self) -> Result<(Observation, Reward)> {
        if self.last_update != Update::Action {
            return Err(Error::WrongUpdateOrder("percept"));
        }
        let count = self.environment.percept_bits();
        let symbols = self.model.sample_and_update(count, &mut self.rng)?;
        let (observation, reward) = self.decode_percept(&symbols)?;
        self.total_reward += reward as Utility;
        self.last_update = Update::Percept;
        Ok((observation, reward))
    }

    /// draw an action from the model of the agent's own past
    /// behaviour, leaving the model untouched. a debugging and
    /// behaviour-cloning aid, not part of the planning loop.
    pub fn sample_action(&mut self) -> Result<Action> {
        if self.last_update != Update::Percept {
            return Err(Error::WrongUpdateOrder("action"));
        }
        let count = self.environment.action_bits();
        let symbols = self.model.sample(count, &mut self.rng)?;
        coding::decode(&symbols, count)
    }

    /// probability the model assigns to choosing `action` next
    pub fn action_probability(&mut self, action: Action) -> Result<Probability> {
        let symbols = coding::encode(action, self.environment.action_bits());
        self.model.predict(&symbols, &mut self.rng)
    }

    /// probability the model assigns to receiving this percept next
    pub fn percept_probability(
        &mut self,
        observation: Observation,
        reward: Reward,
    ) -> Result<Probability> {
        let symbols = self.encode_percept(observation, reward);
        self.model.predict(&symbols, &mut self.rng)
    }

    /// a uniformly random legal action
    pub fn random_action(&mut self) -> Action {
        *self
            .environment
            .valid_actions()
            .choose(&mut self.rng)
            .expect("environments expose at least one action")
    }

    /// uniform pick among candidates, if any
    pub(crate) fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// roll the model forward `horizon` cycles under uniformly
    /// random actions and model-sampled percepts, then put
    /// everything back. returns the accumulated simulated reward;
    /// an environment that finishes mid-rollout just ends it early.
    pub fn playout(&mut self, horizon: usize) -> Result<Utility> {
        self.preserving(|agent| {
            let mut accumulated = 0.0;
            for _ in 0..horizon {
                if agent.environment.is_finished() {
                    break;
                }
                let action = agent.random_action();
                agent.update_action(action)?;
                let (_, reward) = agent.sample_percept_and_apply()?;
                accumulated += reward as Utility;
            }
            Ok(accumulated)
        })
    }

    /// plan the next action: grow a fresh rho-UCT tree over the
    /// configured horizon and simulation budget, then commit to the
    /// child with the best sampled return. the model comes out of
    /// planning bitwise identical to how it went in.
    pub fn search(&mut self) -> Result<Action> {
        let mut root = SearchNode::new(Kind::Decision);
        root.sample_iterations(self, self.horizon, self.simulations)?;
        let action = match root.best_action() {
            Some(action) => action,
            None => self.random_action(),
        };
        log::debug!(
            "age {:>6} | action {} after {} simulations",
            self.age,
            action,
            self.simulations
        );
        Ok(action)
    }

    /// capture the agent's observable state
    pub fn save(&self) -> SaveState {
        SaveState {
            age: self.age,
            total_reward: self.total_reward,
            last_update: self.last_update,
            model: self.model.snapshot(),
        }
    }

    /// return to a captured state
    pub fn restore(&mut self, state: &SaveState) {
        self.age = state.age;
        self.total_reward = state.total_reward;
        self.last_update = state.last_update;
        self.model.restore(&state.model);
    }

    /// refresh the held savestate to the current state
    pub fn set_savestate(&mut self) {
        self.savestate = self.save();
    }

    /// return to the held savestate
    pub fn restore_savestate(&mut self) {
        let state = self.savestate.clone();
        self.restore(&state);
    }

    /// run `body` inside a savestate scope: whatever it does to the
    /// agent, the entry state is restored on the way out, on the
    /// error path and during unwinding included.
    pub fn preserving<T>(&mut self, body: impl FnOnce(&mut Agent) -> Result<T>) -> Result<T> {
        struct Scope<'a> {
            agent: &'a mut Agent,
            state: Option<SaveState>,
        }
        impl Drop for Scope<'_> {
            fn drop(&mut self) {
                if let Some(state) = self.state.take() {
                    self.agent.restore(&state);
                }
            }
        }
        let state = self.save();
        let mut scope = Scope {
            agent: self,
            state: Some(state),
        };
        body(&mut *scope.agent)
    }

    /// percepts keyed as single integers for the search tree:
    /// the value of the encoded reward-then-observation field pair
    pub fn percept_index(&self, observation: Observation, reward: Reward) -> u64 {
        (reward << self.environment.observation_bits()) | observation
    }

    /// reward field first, observation field second
    pub fn encode_percept(&self, observation: Observation, reward: Reward) -> Vec<Symbol> {
        let mut symbols = coding::encode(reward, self.environment.reward_bits());
        symbols.extend(coding::encode(observation, self.environment.observation_bits()));
        symbols
    }

    pub fn decode_percept(&self, symbols: &[Symbol]) -> Result<(Observation, Reward)> {
        let reward_bits = self.environment.reward_bits();
        let observation_bits = self.environment.observation_bits();
        if symbols.len() < reward_bits + observation_bits {
            return Err(Error::MalformedSymbols {
                expected: reward_bits + observation_bits,
                got: symbols.len(),
            });
        }
        let reward = coding::decode(&symbols[..reward_bits], reward_bits)?;
        let observation = coding::decode(&symbols[reward_bits..], observation_bits)?;
        Ok((observation, reward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::CoinFlip;
    use crate::environment::ExtendedTiger;

    fn config() -> Config {
        Config {
            agent_horizon: 3,
            ct_depth: 8,
            mc_simulations: 16,
            random_seed: Some(41),
            ..Config::default()
        }
    }

    fn agent() -> Agent {
        let environment = CoinFlip::new(crate::DEFAULT_COIN_FLIP_P, SmallRng::seed_from_u64(7));
        Agent::new(Box::new(environment), &config()).unwrap()
    }

    /// a few real interaction cycles to give the model some history
    fn warm_up(agent: &mut Agent, cycles: usize) {
        if agent.last_update() == Update::Action {
            agent.update_percept(1, 0).unwrap();
        }
        for _ in 0..cycles {
            let action = agent.random_action();
            agent.update_action(action).unwrap();
            let (observation, reward) = agent.environment_mut().perform_action(action).unwrap();
            agent.update_percept(observation, reward).unwrap();
        }
    }

    #[test]
    fn first_percept_bypasses_alternation() {
        let mut agent = agent();
        assert_eq!(agent.last_update(), Update::Action);
        agent.update_percept(1, 0).unwrap();
        assert_eq!(agent.last_update(), Update::Percept);
    }

    #[test]
    fn updates_must_alternate() {
        let mut agent = agent();
        agent.update_percept(0, 0).unwrap();
        agent.update_action(1).unwrap();
        assert!(matches!(
            agent.update_action(1),
            Err(Error::WrongUpdateOrder("action"))
        ));
        agent.update_percept(1, 1).unwrap();
        assert!(matches!(
            agent.update_percept(1, 1),
            Err(Error::WrongUpdateOrder("percept"))
        ));
    }

    #[test]
    fn rejects_foreign_actions() {
        let mut agent = agent();
        agent.update_percept(0, 0).unwrap();
        assert!(matches!(
            agent.update_action(2),
            Err(Error::InvalidAction(2))
        ));
    }

    #[test]
    fn actions_extend_history_without_learning() {
        let mut agent = agent();
        warm_up(&mut agent, 6);
        let size = agent.model_size();
        let history = agent.history_size();
        agent.update_action(1).unwrap();
        assert_eq!(agent.model_size(), size);
        assert_eq!(agent.history_size(), history + agent.environment().action_bits());
    }

    #[test]
    fn learning_period_freezes_counts() {
        let environment = CoinFlip::new(0.5, SmallRng::seed_from_u64(3));
        let config = Config {
            learning_period: 2,
            ..config()
        };
        let mut agent = Agent::new(Box::new(environment), &config).unwrap();
        warm_up(&mut agent, 4);
        assert!(agent.age() > 2);
        let size = agent.model_size();
        agent.update_action(0).unwrap();
        agent.update_percept(1, 0).unwrap();
        assert_eq!(agent.model_size(), size);
        assert!(agent.total_reward() >= 0.0);
    }

    #[test]
    fn sampled_percepts_apply_to_the_model() {
        let mut agent = agent();
        warm_up(&mut agent, 10);
        agent.update_action(0).unwrap();
        let history = agent.history_size();
        let (observation, reward) = agent.sample_percept_and_apply().unwrap();
        assert!(observation <= 1);
        assert!(reward <= 1);
        assert_eq!(agent.last_update(), Update::Percept);
        assert_eq!(
            agent.history_size(),
            history + agent.environment().percept_bits()
        );
    }

    #[test]
    fn playout_is_neutral() {
        let mut agent = agent();
        warm_up(&mut agent, 10);
        let model = agent.model().clone();
        let age = agent.age();
        let total = agent.total_reward();
        let reward = agent.playout(10).unwrap();
        assert!(reward >= 0.0);
        assert_eq!(agent.model(), &model);
        assert_eq!(agent.age(), age);
        assert_eq!(agent.total_reward(), total);
        assert_eq!(agent.last_update(), Update::Percept);
    }

    #[test]
    fn playout_restores_on_error() {
        let mut agent = agent();
        warm_up(&mut agent, 4);
        let model = agent.model().clone();
        let failed = agent.preserving(|agent| {
            agent.update_action(0)?;
            agent.update_action(0)
        });
        assert!(failed.is_err());
        assert_eq!(agent.model(), &model);
        assert_eq!(agent.last_update(), Update::Percept);
    }

    #[test]
    fn search_is_neutral() {
        let mut agent = agent();
        warm_up(&mut agent, 8);
        let model = agent.model().clone();
        let age = agent.age();
        let total = agent.total_reward();
        let action = agent.search().unwrap();
        assert!(action <= 1);
        assert_eq!(agent.model(), &model);
        assert_eq!(agent.age(), age);
        assert_eq!(agent.total_reward(), total);
    }

    #[test]
    fn savestate_round_trips() {
        let mut agent = agent();
        warm_up(&mut agent, 5);
        agent.set_savestate();
        let model = agent.model().clone();
        warm_up(&mut agent, 3);
        assert_ne!(agent.model(), &model);
        agent.restore_savestate();
        assert_eq!(agent.model(), &model);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut agent = agent();
        warm_up(&mut agent, 5);
        agent.reset();
        assert_eq!(agent.age(), 0);
        assert_eq!(agent.total_reward(), 0.0);
        assert_eq!(agent.history_size(), 0);
        assert_eq!(agent.model_size(), 1);
        assert_eq!(agent.last_update(), Update::Action);
    }

    #[test]
    fn percept_codec_round_trips() {
        let environment = ExtendedTiger::new(
            crate::DEFAULT_TIGER_LISTEN_P,
            SmallRng::seed_from_u64(11),
        );
        let agent = Agent::new(Box::new(environment), &config()).unwrap();
        for (observation, reward) in [(0, 0), (1, 90), (2, 99), (0, 130)] {
            let symbols = agent.encode_percept(observation, reward);
            assert_eq!(symbols.len(), agent.environment().percept_bits());
            assert_eq!(agent.decode_percept(&symbols).unwrap(), (observation, reward));
        }
    }

    #[test]
    fn model_queries_are_transient() {
        let mut agent = agent();
        warm_up(&mut agent, 6);
        let history = agent.history_size();
        let percepts = [(0, 0), (0, 1), (1, 0), (1, 1)]
            .into_iter()
            .map(|(observation, reward)| agent.percept_probability(observation, reward).unwrap())
            .sum::<f64>();
        assert!((percepts - 1.0).abs() < 1e-6);
        let actions = agent.action_probability(0).unwrap() + agent.action_probability(1).unwrap();
        assert!((actions - 1.0).abs() < 1e-6);
        let action = agent.sample_action().unwrap();
        assert!(action <= 1);
        assert_eq!(agent.history_size(), history);
        assert_eq!(agent.last_update(), Update::Percept);
    }

    #[test]
    fn average_reward_tracks_age() {
        let mut agent = agent();
        assert_eq!(agent.average_reward(), 0.0);
        warm_up(&mut agent, 4);
        assert!(agent.average_reward() >= 0.0);
        assert!(agent.average_reward() <= 1.0);
    }

    #[test]
    fn learns_to_call_a_biased_coin() {
        let environment = CoinFlip::new(0.7, SmallRng::seed_from_u64(99));
        let config = Config {
            agent_horizon: 2,
            ct_depth: 4,
            mc_simulations: 100,
            random_seed: Some(1729),
            ..Config::default()
        };
        let mut agent = Agent::new(Box::new(environment), &config).unwrap();
        agent.update_percept(1, 0).unwrap();
        let cycles = 200;
        let mut heads = 0usize;
        for cycle in 0..cycles {
            let action = agent.search().unwrap();
            if cycle >= cycles / 3 && action == 1 {
                heads += 1;
            }
            agent.update_action(action).unwrap();
            let (observation, reward) = agent.environment_mut().perform_action(action).unwrap();
            agent.update_percept(observation, reward).unwrap();
        }
        let frequency = heads as f64 / (cycles - cycles / 3) as f64;
        assert!(frequency > 0.6, "heads frequency {frequency} after {cycles} cycles");
    }

    #[test]
    #[ignore = "full-scale convergence run, several minutes"]
    fn coin_flip_convergence_full_scale() {
        let environment = CoinFlip::new(0.7, SmallRng::seed_from_u64(5));
        let config = Config {
            agent_horizon: 5,
            ct_depth: 32,
            mc_simulations: 500,
            random_seed: Some(5),
            ..Config::default()
        };
        let mut agent = Agent::new(Box::new(environment), &config).unwrap();
        agent.update_percept(1, 0).unwrap();
        let cycles = 500;
        let mut heads = 0usize;
        for _ in 0..cycles {
            let action = agent.search().unwrap();
            if action == 1 {
                heads += 1;
            }
            agent.update_action(action).unwrap();
            let (observation, reward) = agent.environment_mut().perform_action(action).unwrap();
            agent.update_percept(observation, reward).unwrap();
        }
        let frequency = heads as f64 / cycles as f64;
        assert!(frequency > 0.9, "heads frequency {frequency}");
    }

    #[test]
    #[ignore = "full-scale convergence run, hours at depth 96"]
    fn extended_tiger_beats_blind_opening() {
        // baseline: opening the left door forever while sitting is a
        // flat penalty of 90 per cycle (biased scale)
        let environment = ExtendedTiger::new(0.85, SmallRng::seed_from_u64(17));
        let config = Config {
            agent_horizon: 8,
            ct_depth: 96,
            mc_simulations: 1000,
            random_seed: Some(17),
            ..Config::default()
        };
        let mut agent = Agent::new(Box::new(environment), &config).unwrap();
        agent.update_percept(2, 0).unwrap();
        let cycles = 10_000;
        let mut rewards = Vec::with_capacity(cycles);
        for _ in 0..cycles {
            let action = agent.search().unwrap();
            agent.update_action(action).unwrap();
            let (observation, reward) = agent.environment_mut().perform_action(action).unwrap();
            agent.update_percept(observation, reward).unwrap();
            rewards.push(reward as f64);
        }
        let mean = rewards.iter().sum::<f64>() / cycles as f64;
        let variance = rewards.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / cycles as f64;
        let standard_error = (variance / cycles as f64).sqrt();
        let baseline = 90.0;
        assert!(
            mean > baseline + standard_error,
            "average reward {mean} vs baseline {baseline} (se {standard_error})"
        );
    }
}
