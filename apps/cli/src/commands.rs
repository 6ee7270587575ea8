//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use matrikkel_codes::{
    CodeResolver, EXCLUDED_BUILDING_STATUS_CODE_IDS, INCLUDED_BUILDING_STATUS_CODE_IDS,
};
use matrikkel_core::pipeline::{
    CacheOutcome, DatasetBundle, Pipeline, PipelineConfig, ProgressReporter, SilentProgress,
};
use matrikkel_locator::{LocateResult, locate, scan};
use matrikkel_shared::{AppConfig, DataSource, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// matrikkel: municipality property registry enrichment.
#[derive(Parser)]
#[command(
    name = "matrikkel",
    version,
    about = "Build enriched datasets of municipality-owned buildings from Kartverket workbooks.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub paths: PathOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Directory overrides that take precedence over the config file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct PathOverrides {
    /// Directory holding `*_Properties.xlsx` workbooks.
    #[arg(long, env = "MATRIKKEL_RAW_DIR", global = true)]
    pub raw_dir: Option<String>,

    /// Directory holding `*_Properties_Imputed.xlsx` workbooks.
    #[arg(long, env = "MATRIKKEL_IMPUTED_DIR", global = true)]
    pub imputed_dir: Option<String>,

    /// Cache directory for raw builds.
    #[arg(long, env = "MATRIKKEL_CACHE_DIR", global = true)]
    pub cache_dir: Option<String>,

    /// Cache directory for imputed builds.
    #[arg(long, env = "MATRIKKEL_IMPUTED_CACHE_DIR", global = true)]
    pub imputed_cache_dir: Option<String>,

    /// JSON file with a `code_to_category` map replacing the bundled one.
    #[arg(long, env = "MATRIKKEL_CLASSIFICATION_FILE", global = true)]
    pub classification_file: Option<String>,
}

impl PathOverrides {
    fn apply(&self, config: &mut AppConfig) {
        let paths = &mut config.paths;
        for (flag, slot) in [
            (&self.raw_dir, &mut paths.raw_dir),
            (&self.imputed_dir, &mut paths.imputed_dir),
            (&self.cache_dir, &mut paths.cache_dir),
            (&self.imputed_cache_dir, &mut paths.imputed_cache_dir),
        ] {
            if let Some(value) = flag {
                *slot = value.clone();
            }
        }
        if self.classification_file.is_some() {
            paths.classification_file = self.classification_file.clone();
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build (or load from cache) the dataset for one municipality.
    Build {
        /// Municipality name, e.g. "Bergen" or "Nord-Aurdal".
        kommune: String,

        /// Data source: raw or imputed (defaults to config).
        #[arg(short, long)]
        source: Option<DataSource>,
    },

    /// Build every workbook found in the source directory.
    BuildAll {
        /// Data source: raw or imputed (defaults to config).
        #[arg(short, long)]
        source: Option<DataSource>,

        /// Maximum parallel builds (defaults to config).
        #[arg(short = 'j', long)]
        concurrency: Option<u32>,
    },

    /// Show which workbook a municipality name resolves to.
    Locate {
        /// Municipality name.
        kommune: String,

        /// Data source: raw or imputed (defaults to config).
        #[arg(short, long)]
        source: Option<DataSource>,
    },

    /// Look up building, status and ownership codes.
    Codes {
        /// Internal building-type id from the registry export.
        #[arg(long, conflicts_with = "code")]
        internal_id: Option<i64>,

        /// Three-digit SSB building-type code.
        #[arg(long)]
        code: Option<u32>,

        /// Building-status code id.
        #[arg(long)]
        status: Option<i64>,

        /// Ownership role code.
        #[arg(long)]
        ownership: Option<i64>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "matrikkel=info",
        1 => "matrikkel=debug",
        _ => "matrikkel=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build { kommune, source } => cmd_build(&cli.paths, &kommune, source).await,
        Command::BuildAll {
            source,
            concurrency,
        } => cmd_build_all(&cli.paths, source, concurrency).await,
        Command::Locate { kommune, source } => cmd_locate(&cli.paths, &kommune, source).await,
        Command::Codes {
            internal_id,
            code,
            status,
            ownership,
        } => cmd_codes(&cli.paths, internal_id, code, status, ownership).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&cli.paths).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Config file merged with flag and environment overrides.
fn resolved_config(overrides: &PathOverrides) -> Result<AppConfig> {
    let mut config = load_config()?;
    overrides.apply(&mut config);
    Ok(config)
}

fn resolve_source(config: &AppConfig, flag: Option<DataSource>) -> Result<DataSource> {
    match flag {
        Some(source) => Ok(source),
        None => Ok(config.default_source()?),
    }
}

fn code_resolver(config: &AppConfig) -> Result<Arc<CodeResolver>> {
    let resolver = match &config.paths.classification_file {
        Some(path) => CodeResolver::load(&PathBuf::from(path))?,
        None => CodeResolver::bundled()?,
    };
    Ok(Arc::new(resolver))
}

fn pipeline(config: &AppConfig) -> Result<Pipeline> {
    Ok(Pipeline::new(PipelineConfig::from(config), code_resolver(config)?))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _bundle: &DatasetBundle) {
        self.spinner.finish_and_clear();
    }
}

fn describe_outcome(outcome: &CacheOutcome) -> String {
    match outcome {
        CacheOutcome::Hit => "hit".into(),
        CacheOutcome::Miss => "miss (built)".into(),
        CacheOutcome::Rebuilt { reason } => format!("rebuilt ({reason})"),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(
    overrides: &PathOverrides,
    kommune: &str,
    source: Option<DataSource>,
) -> Result<()> {
    let config = resolved_config(overrides)?;
    let source = resolve_source(&config, source)?;
    let pipeline = pipeline(&config)?;

    info!(kommune, %source, "building dataset");
    let start = Instant::now();
    let kommune_owned = kommune.to_string();
    let bundle = tokio::task::spawn_blocking(move || {
        let reporter = CliProgress::new();
        let result = pipeline.build(&kommune_owned, source, &reporter);
        reporter.spinner.finish_and_clear();
        result
    })
    .await??;

    let Some(bundle) = bundle else {
        let dir = match source {
            DataSource::Raw => &config.paths.raw_dir,
            DataSource::Imputed => &config.paths.imputed_dir,
        };
        return Err(eyre!("no {source} workbook found for '{kommune}' in '{dir}'"));
    };

    let stats = &bundle.statistics;
    println!();
    println!("  Dataset ready for {}", bundle.kommune);
    println!("  Workbook:      {}", bundle.path.display());
    println!("  Cache:         {}", describe_outcome(&bundle.cache));
    println!("  Cache file:    {}", bundle.cache_path.display());
    println!("  File hash:     {}", stats.file_hash);
    println!("  Source rows:   {}", stats.source_rows);
    println!("  Owned:         {}", stats.total_rows);
    println!(
        "  Included:      {} ({} after merging duplicates)",
        bundle.filtered.len(),
        stats.deduplicated_rows
    );
    println!(
        "  Excluded:      {} by status ({} after merging duplicates)",
        stats.excluded_status_rows, stats.excluded_status_deduplicated_rows
    );
    println!("  Unfiltered:    {}", stats.unfiltered_rows);
    println!("  Backfilled:    {} alternate addresses", stats.address_backfilled_rows);
    println!("  Time:          {:.1}s", start.elapsed().as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_build_all(
    overrides: &PathOverrides,
    source: Option<DataSource>,
    concurrency: Option<u32>,
) -> Result<()> {
    let config = resolved_config(overrides)?;
    let source = resolve_source(&config, source)?;
    let dir = PathBuf::from(match source {
        DataSource::Raw => &config.paths.raw_dir,
        DataSource::Imputed => &config.paths.imputed_dir,
    });

    let files = scan(&dir)?;
    if files.is_empty() {
        println!("No workbooks found in {}", dir.display());
        return Ok(());
    }

    let limit = concurrency.unwrap_or(config.defaults.build_concurrency).max(1) as usize;
    info!(count = files.len(), limit, dir = %dir.display(), "building all workbooks");

    let pipeline = Arc::new(pipeline(&config)?);
    let semaphore = Arc::new(Semaphore::new(limit));
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let start = Instant::now();
    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let pipeline = Arc::clone(&pipeline);
        let bar = bar.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = pipeline.build_workbook(&file, &SilentProgress);
            bar.set_message(file.kommune.clone());
            bar.inc(1);
            (file.kommune, result)
        }));
    }

    let mut built = 0usize;
    let mut failed = Vec::new();
    for handle in handles {
        let (kommune, result) = handle.await?;
        match result {
            Ok(bundle) => {
                built += 1;
                info!(
                    kommune = %bundle.kommune,
                    rows = bundle.filtered.len(),
                    cache = %describe_outcome(&bundle.cache),
                    "built"
                );
            }
            Err(e) => {
                warn!(kommune = %kommune, error = %e, "build failed");
                failed.push(kommune);
            }
        }
    }
    bar.finish_and_clear();

    println!();
    println!("  Built:   {built}");
    println!("  Failed:  {}", failed.len());
    println!("  Time:    {:.1}s", start.elapsed().as_secs_f64());
    println!();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(eyre!("{} build(s) failed: {}", failed.len(), failed.join(", ")))
    }
}

async fn cmd_locate(
    overrides: &PathOverrides,
    kommune: &str,
    source: Option<DataSource>,
) -> Result<()> {
    let config = resolved_config(overrides)?;
    let source = resolve_source(&config, source)?;
    let dir = PathBuf::from(match source {
        DataSource::Raw => &config.paths.raw_dir,
        DataSource::Imputed => &config.paths.imputed_dir,
    });

    match locate(kommune, &dir)? {
        LocateResult::Found { path, source } => {
            println!("{} ({source})", path.display());
            Ok(())
        }
        LocateResult::NotFound => Err(eyre!(
            "no workbook for '{kommune}' in '{}'",
            dir.display()
        )),
    }
}

async fn cmd_codes(
    overrides: &PathOverrides,
    internal_id: Option<i64>,
    code: Option<u32>,
    status: Option<i64>,
    ownership: Option<i64>,
) -> Result<()> {
    let config = resolved_config(overrides)?;
    let resolver = code_resolver(&config)?;

    let code = match internal_id {
        Some(id) => {
            let resolved = CodeResolver::code_for_internal_id(id);
            println!("Internal id {id}: {}", CodeResolver::building_type_name(id));
            match resolved {
                Some(c) => println!("  SSB code:    {c}"),
                None => println!("  SSB code:    (unmapped)"),
            }
            resolved
        }
        None => code,
    };

    if internal_id.is_some() || code.is_some() {
        let category = resolver.category_for_code(code);
        let show = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
        if let Some(c) = code {
            println!("Code {c}");
        }
        println!("  Main group:  {}", show(&category.hierarchy.main_group));
        println!("  Group:       {}", show(&category.hierarchy.group));
        println!("  Type:        {}", show(&category.hierarchy.type_name));
        println!("  Simplified:  {}", category.simplified);
    }

    if let Some(s) = status {
        let included = INCLUDED_BUILDING_STATUS_CODE_IDS.contains(&s);
        println!(
            "Status {s}: {} ({})",
            CodeResolver::status_name(s),
            if included { "included" } else { "excluded" }
        );
    }

    if let Some(o) = ownership {
        println!("Ownership {o}: {}", CodeResolver::ownership_type_name(o));
    }

    if internal_id.is_none() && code.is_none() && status.is_none() && ownership.is_none() {
        println!("Simplified categories mapped: {} codes", resolver.mapped_codes());
        println!("Included building statuses:");
        for s in INCLUDED_BUILDING_STATUS_CODE_IDS {
            println!("  {s:>3}  {}", CodeResolver::status_name(*s));
        }
        println!("Excluded building statuses:");
        for s in EXCLUDED_BUILDING_STATUS_CODE_IDS {
            println!("  {s:>3}  {}", CodeResolver::status_name(*s));
        }
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(overrides: &PathOverrides) -> Result<()> {
    let config = resolved_config(overrides)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
