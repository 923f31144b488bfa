use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use curvelab::config::ConfigManager;
use curvelab::services::{AutoExplorer, ExploreMode, ExplorerUpdate};
use curvelab::{DiscoveryEngine, RegimeKind};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Parser, Debug)]
#[command(name = "curvelab", version, about = "AMM liquidity curve discovery")]
struct Args {
    /// TOML config file; CURVELAB_* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Explorer steps to run
    #[arg(short, long, default_value = "10")]
    steps: u64,

    #[arg(short, long, value_enum, default_value = "alternating")]
    mode: ModeArg,

    /// Where the archive JSON is written
    #[arg(short, long, default_value = "archive.json")]
    out: PathBuf,

    /// Hand-authored mechanism JSON to evaluate before exploring
    #[arg(long, requires = "import_regime")]
    import: Option<PathBuf>,

    /// Regime the imported mechanism is evaluated in
    #[arg(long, value_enum)]
    import_regime: Option<RegimeArg>,

    /// Print the config manifest and exit
    #[arg(long)]
    manifest: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Generations,
    Allocation,
    Alternating,
}

impl From<ModeArg> for ExploreMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Generations => ExploreMode::Generations,
            ModeArg::Allocation => ExploreMode::Allocation,
            ModeArg::Alternating => ExploreMode::Alternating,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RegimeArg {
    LowVolatility,
    HighVolatility,
    JumpDiffusion,
    Trending,
}

impl From<RegimeArg> for RegimeKind {
    fn from(regime: RegimeArg) -> Self {
        match regime {
            RegimeArg::LowVolatility => RegimeKind::LowVolatility,
            RegimeArg::HighVolatility => RegimeKind::HighVolatility,
            RegimeArg::JumpDiffusion => RegimeKind::JumpDiffusion,
            RegimeArg::Trending => RegimeKind::Trending,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let manager = ConfigManager::new();
    manager
        .load_layered(args.config.as_ref())
        .context("failed to load configuration")?;
    let config = manager.get();

    if args.manifest {
        println!("{}", serde_json::to_string_pretty(&config.manifests())?);
        return Ok(());
    }

    let seed = config.engine.seed.unwrap_or_else(rand::random);
    log::info!("master seed {}", seed);

    let engine = Arc::new(DiscoveryEngine::new(config)?);
    let state = engine.initial_state();

    if let (Some(path), Some(regime)) = (&args.import, args.import_regime) {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
        let candidate = engine
            .import_mechanism_json(&state, &json, regime.into(), &mut rng)
            .with_context(|| format!("rejected import of {}", path.display()))?;
        log::info!("imported {} with score {:.5}", candidate.id, candidate.score);
    }

    let state = Arc::new(Mutex::new(state));
    let explorer = AutoExplorer::start(
        Arc::clone(&engine),
        Arc::clone(&state),
        args.mode.into(),
        Some(args.steps),
        seed,
    )?;
    while !explorer.is_finished() {
        while let Some(update) = explorer.poll_progress() {
            report(&update);
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    while let Some(update) = explorer.poll_progress() {
        report(&update);
    }
    let steps = explorer.join()?;

    let state = state
        .lock()
        .map_err(|_| anyhow!("engine state lock poisoned"))?;
    for champion in state.champions() {
        log::info!(
            "champion {}: score {:.5}, LP/HODL {:.4}",
            champion.regime.kind,
            champion.score,
            champion.metrics.lp_hodl
        );
    }
    for (id, priority) in state.allocator.priorities().iter().take(3) {
        log::info!("top branch {}: priority {:.4}", id, priority.total);
    }

    state
        .archive
        .save_json(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    let summary = state.archive.summary();
    println!(
        "{} steps, {} candidates archived, best score {:?} -> {}",
        steps,
        summary.total,
        summary.best_score,
        args.out.display()
    );

    Ok(())
}

fn report(update: &ExplorerUpdate) {
    match update {
        ExplorerUpdate::Generation { step, stats } => {
            for s in stats {
                log::debug!(
                    "step {}: {} best {:.5} mean {:.5}",
                    step,
                    s.regime,
                    s.best_score,
                    s.mean_score
                );
            }
        }
        ExplorerUpdate::Allocation { step, event } => {
            log::debug!("step {}: branch {} improvement {:.5}", step, event.branch_id, event.improvement);
        }
        ExplorerUpdate::StepFailed { step, error } => log::warn!("step {} failed: {}", step, error),
        ExplorerUpdate::Finished { steps, cancelled } => {
            log::debug!("explorer finished after {} steps (cancelled: {})", steps, cancelled)
        }
    }
}
