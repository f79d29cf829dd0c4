use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use tfbump::breaking::advisory::{BreakingChangeAdvisor, NoopAdvisor, OpenAiAdvisor};
use tfbump::breaking::schema::SchemaComparator;
use tfbump::check::Checker;
use tfbump::config::{AdvisoryConfig, CacheConfig, Config};
use tfbump::dependency::DependencyRecord;
use tfbump::filter::UpdatePolicyFilter;
use tfbump::plan::parse_plan_json;
use tfbump::version::cache::RepositoryTagCache;
use tfbump::version::registries::{GitHubRegistry, TerraformRegistry};
use tfbump::version::resolver::VersionResolver;

const LOG_ENV: &str = "TFBUMP_LOG";

#[derive(Parser)]
#[command(name = "tfbump")]
#[command(version, about = "Find Terraform module and provider updates and flag breaking ones")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve updates for the dependencies in a JSON file and print verdicts
    Check {
        /// Dependency records produced by the scanner
        #[arg(long)]
        dependencies: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// `terraform show -json` output of the upgrade plan
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Include up-to-date dependencies
        #[arg(long)]
        all: bool,
    },
    /// Manage the persistent tag cache
    Cache {
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    Stats,
    Clear,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_json, cli.log_file.as_deref())?;

    match cli.command {
        Command::Check {
            dependencies,
            config,
            plan,
            all,
        } => {
            let config = load_config(config.as_deref())?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(run_check(config, &dependencies, plan.as_deref(), all))
        }
        Command::Cache { config, action } => {
            let config = load_config(config.as_deref())?;
            run_cache(&config.cache, action)
        }
    }
}

/// Install the global subscriber; the returned guard flushes the log file on drop
fn init_tracing(json: bool, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    debug!("Loaded config: {:?}", config);
    Ok(config)
}

fn open_cache(config: &CacheConfig) -> RepositoryTagCache {
    if config.persistent {
        RepositoryTagCache::persistent(&config.db_path(), config.ttl())
    } else {
        RepositoryTagCache::ephemeral(config.ttl())
    }
}

fn build_advisor(config: &AdvisoryConfig) -> anyhow::Result<Arc<dyn BreakingChangeAdvisor>> {
    if !config.enabled {
        return Ok(Arc::new(NoopAdvisor));
    }

    match config.api_key.as_deref() {
        Some(api_key) => Ok(Arc::new(OpenAiAdvisor::new(
            api_key,
            &config.model,
            &config.base_url,
        )?)),
        None => {
            warn!("Advisory is enabled but no API key is configured, continuing without it");
            Ok(Arc::new(NoopAdvisor))
        }
    }
}

async fn run_check(
    config: Config,
    dependencies_path: &Path,
    plan_path: Option<&Path>,
    all: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(dependencies_path).with_context(|| {
        format!(
            "failed to read dependencies file {}",
            dependencies_path.display()
        )
    })?;
    let dependencies: Vec<DependencyRecord> =
        serde_json::from_str(&content).with_context(|| {
            format!(
                "failed to parse dependencies file {}",
                dependencies_path.display()
            )
        })?;

    let plan = match plan_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read plan file {}", path.display()))?;
            Some(
                parse_plan_json(&content)
                    .with_context(|| format!("failed to parse plan file {}", path.display()))?,
            )
        }
        None => None,
    };

    let terraform = Arc::new(TerraformRegistry::new(&config.registry.base_url));
    let github =
        Arc::new(GitHubRegistry::new(&config.github.base_url).with_token(config.github.token.clone()));
    let cache = Arc::new(open_cache(&config.cache));

    let resolver = VersionResolver::new(
        terraform.clone(),
        github,
        cache,
        config.version_check.policy(),
    );
    let checker = Checker::new(
        resolver,
        SchemaComparator::new(terraform),
        build_advisor(&config.advisory)?,
    );

    info!("Checking {} dependencies", dependencies.len());
    let mut report = checker.check(&dependencies, plan.as_deref()).await;

    let filter = UpdatePolicyFilter::new(
        &config.version_check.display_filter,
        &config.advisory.min_confidence,
    );
    report.verdicts.retain(|verdict| {
        if !verdict.outdated {
            return all;
        }
        let shown = filter.should_display(verdict);
        if !shown {
            debug!(
                "Filtered out {} {} -> {}",
                verdict.dependency.name, verdict.current_version, verdict.latest_version
            );
        }
        shown
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_cache(config: &CacheConfig, action: CacheAction) -> anyhow::Result<()> {
    let path = config.db_path();
    let cache = RepositoryTagCache::open(&path, config.ttl())
        .with_context(|| format!("failed to open tag cache at {}", path.display()))?;

    match action {
        CacheAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&cache.stats())?);
        }
        CacheAction::Clear => {
            cache.clear()?;
            info!("Cleared tag cache at {}", path.display());
        }
    }
    Ok(())
}
