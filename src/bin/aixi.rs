//! Experiment driver: wires one agent to one environment and runs
//! the interaction loop, logging one block of lines per cycle for
//! the analysis scripts to scrape.

use anyhow::Context;
use clap::Parser;
use mcaixi::agent::Agent;
use mcaixi::config::Config;
use mcaixi::environment::CheeseMaze;
use mcaixi::environment::CoinFlip;
use mcaixi::environment::Environment;
use mcaixi::environment::ExtendedTiger;
use mcaixi::environment::KuhnPoker;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::Path;
use std::path::PathBuf;

/// keeps the environment's randomness decoupled from the agent's
/// when both derive from the one configured seed
const WORLD_SALT: u64 = 0x9e3779b97f4a7c15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum World {
    CoinFlip,
    CheeseMaze,
    ExtendedTiger,
    KuhnPoker,
}

#[derive(Parser)]
#[command(author, version, about = "run a MC-AIXI-CTW agent against an environment")]
struct Args {
    /// environment the agent lives in
    #[arg(long, value_enum)]
    environment: World,
    /// json configuration file; the flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// planning horizon in cycles
    #[arg(long)]
    horizon: Option<u64>,
    /// context tree depth in bits
    #[arg(long)]
    depth: Option<u64>,
    /// rho-UCT iterations per decision
    #[arg(long)]
    simulations: Option<u64>,
    /// cycles before the model freezes; 0 learns forever
    #[arg(long)]
    learning_period: Option<u64>,
    /// ucb exploration weight
    #[arg(long)]
    exploration: Option<f64>,
    /// seed for agent and environment randomness
    #[arg(long)]
    seed: Option<u64>,
    /// stop after this many cycles; 0 runs unbounded
    #[arg(long)]
    cycles: Option<u64>,
    /// mirror the log into this file at debug verbosity
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// terminal log verbosity
    #[arg(long, default_value = "info")]
    level: log::LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = configure(&args)?;
    logging(args.level, args.log_file.as_deref())?;
    let environment = world(args.environment, &config);
    let mut agent = Agent::new(environment, &config)?;
    log::info!(
        "{:?} | horizon {} depth {} simulations {}",
        args.environment,
        config.agent_horizon,
        config.ct_depth,
        config.mc_simulations
    );
    run(&mut agent, config.terminate_age)
}

fn configure(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read configuration {}", path.display()))?;
            serde_json::from_str::<Config>(&text)
                .with_context(|| format!("parse configuration {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(value) = args.horizon {
        config.agent_horizon = value;
    }
    if let Some(value) = args.depth {
        config.ct_depth = value;
    }
    if let Some(value) = args.simulations {
        config.mc_simulations = value;
    }
    if let Some(value) = args.learning_period {
        config.learning_period = value;
    }
    if let Some(value) = args.exploration {
        config.exploration_constant = value;
    }
    if let Some(value) = args.seed {
        config.random_seed = Some(value);
    }
    if let Some(value) = args.cycles {
        config.terminate_age = value;
    }
    config.validate()?;
    Ok(config)
}

fn world(world: World, config: &Config) -> Box<dyn Environment> {
    let rng = match config.random_seed {
        Some(seed) => SmallRng::seed_from_u64(seed ^ WORLD_SALT),
        None => SmallRng::from_os_rng(),
    };
    match world {
        World::CoinFlip => Box::new(CoinFlip::new(config.coin_flip_p, rng)),
        World::CheeseMaze => Box::new(CheeseMaze::new()),
        World::ExtendedTiger => Box::new(ExtendedTiger::new(config.tiger_listen_p, rng)),
        World::KuhnPoker => Box::new(KuhnPoker::new(rng)),
    }
}

fn logging(level: log::LevelFilter, file: Option<&Path>) -> anyhow::Result<()> {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![simplelog::TermLogger::new(
        level,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];
    if let Some(path) = file {
        loggers.push(simplelog::WriteLogger::new(
            log::LevelFilter::Debug,
            config,
            std::fs::File::create(path)
                .with_context(|| format!("create log file {}", path.display()))?,
        ));
    }
    simplelog::CombinedLogger::init(loggers).context("initialize logger")?;
    Ok(())
}

fn run(agent: &mut Agent, cycles: u64) -> anyhow::Result<()> {
    let observation = agent.environment().observation();
    let reward = agent.environment().reward();
    agent.update_percept(observation, reward)?;
    let mut cycle = 0u64;
    while !agent.environment().is_finished() {
        if cycles > 0 && cycle >= cycles {
            break;
        }
        cycle += 1;
        let action = agent.search()?;
        agent.update_action(action)?;
        let (observation, reward) = agent.environment_mut().perform_action(action)?;
        agent.update_percept(observation, reward)?;
        log::info!("cycle: {}", cycle);
        log::info!(
            "action: {}, observation: {}, reward: {}",
            action,
            observation,
            reward
        );
        log::info!("average reward: {:.6}", agent.average_reward());
    }
    log::info!(
        "lived {} cycles | total reward {} | average reward {:.6} | model size {}",
        agent.age(),
        agent.total_reward(),
        agent.average_reward(),
        agent.model_size()
    );
    Ok(())
}
