//! OFTRL Cache Simulator
//!
//! Replays a request sequence against the online cache-decision engine and
//! reports hits, cost and regret.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OFTRL Cache Simulator                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   Catalog    │───▶│    Engine    │───▶│   Results    │       │
//! │  │  (names →    │    │  (blocking   │    │  (text/JSON, │       │
//! │  │   one-hot)   │    │    task)     │    │   metrics)   │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oftrl_cache::{
    Catalog, Checkpoint, EngineConfig, EngineMetrics, Error, Forecaster, ForecasterKind,
    LearningRate, OftrlCache, Regularizer, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RegularizerArg {
    Entropic,
    Euclidean,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ForecasterArg {
    Uniform,
    Frequency,
    Ewma,
}

/// OFTRL Cache - online cache decisions with regret accounting
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog item names, comma separated
    #[arg(
        long,
        env = "OFTRL_LIBRARY",
        value_delimiter = ',',
        default_value = "a,b,c,d,e,f,g,h,i,j,k,l,m,n,o,p,q,r,s,t,u,v,w,x,y,z"
    )]
    library: Vec<String>,

    /// Requested item names in order, comma separated
    #[arg(
        long,
        env = "OFTRL_REQUESTS",
        value_delimiter = ',',
        default_value = "a,b,c,d,e,f,g"
    )]
    requests: Vec<String>,

    /// Cache capacity [default: 5]
    #[arg(long, env = "OFTRL_CAPACITY")]
    capacity: Option<usize>,

    /// YAML engine configuration; flags below override it
    #[arg(long, env = "OFTRL_CONFIG")]
    config: Option<PathBuf>,

    /// Regularizer
    #[arg(long, value_enum)]
    regularizer: Option<RegularizerArg>,

    /// Base learning rate (η_t = eta0 / √t)
    #[arg(long)]
    eta0: Option<f64>,

    /// Use a constant learning rate instead of eta0 / √t
    #[arg(long)]
    constant_eta: bool,

    /// Rounding seed
    #[arg(long, env = "OFTRL_SEED")]
    seed: Option<u64>,

    /// Cost of a single miss
    #[arg(long)]
    miss_cost: Option<f64>,

    /// Demand forecaster
    #[arg(long, value_enum, default_value = "uniform")]
    forecaster: ForecasterArg,

    /// EWMA smoothing parameter
    #[arg(long, default_value = "0.2")]
    ewma_alpha: f64,

    /// Resume from a checkpoint file
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Write a checkpoint file after the run
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    print_metrics: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

const DEFAULT_CAPACITY: usize = 5;

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting OFTRL cache simulation");
    info!("  Catalog size: {}", args.library.len());
    info!("  Requests: {}", args.requests.len());

    let catalog = Catalog::new(args.library.iter().cloned())?;
    let requests = args
        .requests
        .iter()
        .map(|name| catalog.request(name).map(|r| r.to_dense()))
        .collect::<Result<Vec<_>>>()?;

    let kind = match args.forecaster {
        ForecasterArg::Uniform => ForecasterKind::Uniform,
        ForecasterArg::Frequency => ForecasterKind::Frequency,
        ForecasterArg::Ewma => ForecasterKind::Ewma {
            alpha: args.ewma_alpha,
        },
    };
    let metrics = EngineMetrics::new()?;

    let engine = match &args.resume {
        Some(path) => {
            let checkpoint = Checkpoint::load(path)?;
            check_resume(&args, &checkpoint, catalog.len())?;
            info!("  Capacity: {} (from checkpoint)", checkpoint.capacity);
            let forecaster = kind.build(checkpoint.capacity, catalog.len())?;
            OftrlCache::restore(forecaster, checkpoint)?
        }
        None => {
            let capacity = args.capacity.unwrap_or(DEFAULT_CAPACITY);
            info!("  Capacity: {}", capacity);
            let base = match &args.config {
                Some(path) => EngineConfig::from_yaml_file(path)?,
                None => EngineConfig::default(),
            };
            let config = apply_overrides(&args, base)?;
            let forecaster = kind.build(capacity, catalog.len())?;
            OftrlCache::with_config(forecaster, capacity, catalog.len(), config)?
        }
    }
    .with_metrics(metrics);

    // Ctrl-C stops the run between rounds
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current round");
            signal_token.cancel();
        }
    });

    let (engine, processed) = tokio::task::spawn_blocking(move || run(engine, requests, cancel))
        .await
        .map_err(|e| Error::Internal(format!("simulation task failed: {}", e)))??;

    info!("Processed {} rounds", processed);

    let results = engine.results();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for outcome in &results.outcomes {
            let cached: Vec<&str> = outcome
                .cache_set
                .items()
                .iter()
                .filter_map(|&i| catalog.name(i))
                .collect();
            println!(
                "round {:>4}: request {:<8} cache {:?} {}",
                outcome.round,
                catalog.name(outcome.requested).unwrap_or("?"),
                cached,
                if outcome.hit { "HIT" } else { "miss" }
            );
        }
        println!("{}", results);
    }

    if args.print_metrics {
        if let Some(metrics) = engine.metrics() {
            print!("{}", metrics.encode()?);
        }
    }

    if let Some(path) = &args.checkpoint {
        engine.checkpoint().save(path)?;
    }

    info!("Simulation complete");
    Ok(())
}

fn run<F: Forecaster>(
    mut engine: OftrlCache<F>,
    requests: Vec<Vec<f64>>,
    cancel: CancellationToken,
) -> Result<(OftrlCache<F>, usize)> {
    match engine.get_all_cancellable(&requests, &cancel) {
        Ok(processed) => Ok((engine, processed)),
        Err(e) => {
            error!("Simulation aborted: {}", e);
            Err(e)
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Apply command-line overrides on top of `config`.
fn apply_overrides(args: &Args, mut config: EngineConfig) -> Result<EngineConfig> {
    if let Some(regularizer) = args.regularizer {
        config.regularizer = match regularizer {
            RegularizerArg::Entropic => Regularizer::Entropic,
            RegularizerArg::Euclidean => Regularizer::Euclidean,
        };
    }
    if let Some(eta0) = args.eta0 {
        config.learning_rate = if args.constant_eta {
            LearningRate::Constant { eta: eta0 }
        } else {
            LearningRate::InverseSqrt { eta0 }
        };
    } else if args.constant_eta {
        config.learning_rate = LearningRate::Constant {
            eta: config.learning_rate.base(),
        };
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(miss_cost) = args.miss_cost {
        config.miss_cost = miss_cost;
    }

    config.validate()?;
    Ok(config)
}

/// A resumed run keeps the checkpoint's capacity and configuration; flags
/// that contradict them are rejected.
fn check_resume(args: &Args, checkpoint: &Checkpoint, catalog_size: usize) -> Result<()> {
    if checkpoint.catalog_size != catalog_size {
        return Err(Error::config(format!(
            "checkpoint was taken for {} items, catalog has {}",
            checkpoint.catalog_size, catalog_size
        )));
    }
    if let Some(capacity) = args.capacity.filter(|&c| c != checkpoint.capacity) {
        return Err(Error::config(format!(
            "--capacity {} disagrees with checkpoint capacity {}",
            capacity, checkpoint.capacity
        )));
    }
    if args.config.is_some() {
        warn!("--config is ignored when resuming; the checkpoint configuration is used");
    }

    let requested = apply_overrides(args, checkpoint.config.clone())?;
    if requested != checkpoint.config {
        return Err(Error::config(format!(
            "command-line flags disagree with the checkpoint configuration {:?}",
            checkpoint.config
        )));
    }
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oftrl_cache::UniformForecaster;

    fn args(flags: &[&str]) -> Args {
        Args::parse_from(std::iter::once("oftrl-cache").chain(flags.iter().copied()))
    }

    fn checkpoint() -> Checkpoint {
        let config = EngineConfig::euclidean().with_seed(7);
        let mut engine =
            OftrlCache::with_config(UniformForecaster::new(2, 4), 2, 4, config).unwrap();
        engine.get_all_indices(&[0, 1, 3]).unwrap();
        engine.checkpoint()
    }

    #[test]
    fn test_resume_accepts_matching_flags() {
        let checkpoint = checkpoint();
        assert!(check_resume(&args(&[]), &checkpoint, 4).is_ok());
        let flags = args(&["--capacity", "2", "--regularizer", "euclidean", "--seed", "7"]);
        assert!(check_resume(&flags, &checkpoint, 4).is_ok());
    }

    #[test]
    fn test_resume_rejects_conflicting_flags() {
        let checkpoint = checkpoint();
        for flags in [
            &["--capacity", "3"][..],
            &["--regularizer", "entropic"],
            &["--seed", "8"],
            &["--miss-cost", "2.5"],
            &["--eta0", "0.5"],
            &["--constant-eta"],
        ] {
            let err = check_resume(&args(flags), &checkpoint, 4).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{:?}", flags);
        }
    }

    #[test]
    fn test_resume_rejects_other_catalog() {
        let err = check_resume(&args(&[]), &checkpoint(), 5).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_overrides_apply_on_top_of_base() {
        let config = apply_overrides(
            &args(&["--eta0", "0.5", "--constant-eta", "--miss-cost", "3"]),
            EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(config.learning_rate, LearningRate::Constant { eta: 0.5 });
        assert_eq!(config.miss_cost, 3.0);
        assert_eq!(config.regularizer, Regularizer::Entropic);
    }
}
