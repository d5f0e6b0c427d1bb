//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use accelerator_core::{
    AutoAccept, EngineOptions, EngineReport, InstallOptions, Prompter, ProgressReporter,
    RunOptions, RunResult, StdinPrompter, run_engine_from_config, run_pipeline, run_preprocess,
    select_inputs, setup_paths, stage_one,
};
use accelerator_discovery::{DialectScope, is_first_time_setup, setup_folders};
use accelerator_shared::{
    AcceleratorConfig, AcceleratorError, ConfigWrite, Dialect, ProjectLayout, StepRecord,
    init_config, load_config_from,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Lakebridge accelerator: migrate SQL scripts to Databricks notebooks.
#[derive(Parser)]
#[command(
    name = "accelerator",
    version,
    about = "Analyze, transpile, format, and publish SQL scripts with Databricks Lakebridge.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Project root holding input/, output/, config/, and dialects/.
    #[arg(long, default_value = ".", global = true, env = "ACCELERATOR_ROOT")]
    pub root: PathBuf,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline: install checks, paths, preprocess, engine.
    Run {
        /// Accept every default without prompting.
        #[arg(short, long)]
        yes: bool,
    },

    /// Stage 1 only: preflight, install, and verify the CLI.
    Install,

    /// Create the project folder structure.
    Init {
        /// Create input/output folders for every supported dialect.
        #[arg(long)]
        all_dialects: bool,
    },

    /// Pick a dialect and input files interactively; prints the selection.
    Select,

    /// Run the dialect preprocessor hook over the input scripts.
    Preprocess {
        /// Config file (defaults to <root>/config/config.yaml).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Analyze, transpile, format, and upload.
    Engine {
        /// Config file (defaults to <root>/config/config.yaml).
        #[arg(long)]
        config: Option<PathBuf>,
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
    /// Confirm or change the source and target paths.
    Paths {
        /// Accept the default paths without prompting.
        #[arg(short, long)]
        yes: bool,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "accelerator=info",
        1 => "accelerator=debug",
        _ => "accelerator=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit code for a failed command.
///
/// Errors that did not come from the pipeline exit with 1.
pub(crate) fn exit_code(report: &Report) -> i32 {
    report
        .downcast_ref::<AcceleratorError>()
        .map_or(accelerator_shared::error::EXIT_STEP_FAILED, AcceleratorError::exit_code)
}

/// Captured stderr of the external command that failed, if any.
pub(crate) fn failed_command_stderr(report: &Report) -> Option<&str> {
    match report.downcast_ref::<AcceleratorError>() {
        Some(AcceleratorError::CommandFailed { stderr, .. }) if !stderr.trim().is_empty() => {
            Some(stderr.trim_end())
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let root = std::path::absolute(&cli.root)
        .wrap_err_with(|| format!("cannot resolve project root {}", cli.root.display()))?;
    let layout = ProjectLayout::new(root);

    match cli.command {
        Command::Run { yes } => cmd_run(&layout, yes).await,
        Command::Install => cmd_install(&layout).await,
        Command::Init { all_dialects } => cmd_init(&layout, all_dialects),
        Command::Select => cmd_select(&layout),
        Command::Preprocess { config } => cmd_preprocess(&layout, config.as_deref()),
        Command::Engine { config } => cmd_engine(&layout, config.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&layout),
            ConfigAction::Show => cmd_config_show(&layout),
            ConfigAction::Paths { yes } => cmd_config_paths(&layout, yes),
        },
    }
}

/// The config at the default location, or the defaults if there is none yet.
fn config_or_default(layout: &ProjectLayout) -> Result<AcceleratorConfig> {
    match load_config_from(&layout.config_file()) {
        Ok(config) => Ok(config),
        Err(AcceleratorError::ConfigNotFound { .. }) => Ok(AcceleratorConfig::default()),
        Err(e) => Err(e.into()),
    }
}

fn prompter(yes: bool) -> Box<dyn Prompter> {
    if yes {
        Box::new(AutoAccept::default())
    } else {
        Box::new(StdinPrompter)
    }
}

fn config_path(layout: &ProjectLayout, config: Option<&Path>) -> PathBuf {
    config.map_or_else(|| layout.config_file(), |p| layout.resolve(p))
}

async fn cmd_run(layout: &ProjectLayout, yes: bool) -> Result<()> {
    let config = config_or_default(layout)?;
    let opts = RunOptions {
        layout: layout.clone(),
        config_file: layout.config_file(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        install: InstallOptions::from_config(&config),
    };

    info!(root = %layout.root().display(), "starting accelerator run");

    let reporter = CliProgress::new();
    let mut prompter = prompter(yes);
    let result = run_pipeline(&opts, prompter.as_mut(), &reporter).await?;

    print_engine_report(&result.report);
    println!("  Run ID:   {}", result.run_id);
    println!("  Manifest: {}", result.manifest_path.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();
    Ok(())
}

async fn cmd_install(layout: &ProjectLayout) -> Result<()> {
    let config = config_or_default(layout)?;
    let reporter = CliProgress::new();
    stage_one(layout, &InstallOptions::from_config(&config), &reporter).await?;
    reporter.finish();

    println!("System is ready for Stage 2");
    Ok(())
}

fn cmd_init(layout: &ProjectLayout, all_dialects: bool) -> Result<()> {
    if is_first_time_setup(layout.root()) {
        println!("First-time setup in {}", layout.root().display());
    }

    let scope = if all_dialects {
        DialectScope::All
    } else {
        let config = config_or_default(layout)?;
        DialectScope::Single(Dialect::new(&config.dialect))
    };

    for (folder, state) in setup_folders(layout, &scope)? {
        println!("  {state:<8} {}", folder.display());
    }
    Ok(())
}

fn cmd_select(layout: &ProjectLayout) -> Result<()> {
    let selection = select_inputs(layout, &mut StdinPrompter)?;
    println!("{}", serde_json::to_string_pretty(&selection)?);
    Ok(())
}

fn cmd_preprocess(layout: &ProjectLayout, config: Option<&Path>) -> Result<()> {
    let config_file = config_path(layout, config);
    let reporter = CliProgress::new();
    reporter.phase("Preprocessing");
    let output = run_preprocess(layout, &config_file, &reporter)?;
    reporter.finish();

    println!(
        "Preprocessed {} file(s) into {}",
        output.processed_files.len(),
        output.staging_folder.display()
    );
    Ok(())
}

async fn cmd_engine(layout: &ProjectLayout, config: Option<&Path>) -> Result<()> {
    let config_file = config_path(layout, config);
    let reporter = CliProgress::new();
    let report =
        run_engine_from_config(&config_file, layout, &EngineOptions::default(), &reporter).await?;
    reporter.finish();

    print_engine_report(&report);
    Ok(())
}

fn cmd_config_init(layout: &ProjectLayout) -> Result<()> {
    let path = layout.config_file();
    match init_config(&path)? {
        ConfigWrite::Kept => println!("Config already exists at: {}", path.display()),
        _ => println!("Config initialized at: {}", path.display()),
    }
    Ok(())
}

fn cmd_config_show(layout: &ProjectLayout) -> Result<()> {
    let config = load_config_from(&layout.config_file())?;
    let yaml = serde_yaml::to_string(&config)?;
    println!("{yaml}");
    Ok(())
}

fn cmd_config_paths(layout: &ProjectLayout, yes: bool) -> Result<()> {
    let mut prompter = prompter(yes);
    let selection = setup_paths(layout, &layout.config_file(), prompter.as_mut())?;
    println!("  Source: {}", selection.source_root.display());
    println!("  Target: {}", selection.target_root.display());
    Ok(())
}

fn print_engine_report(report: &EngineReport) {
    println!();
    println!("  Dialect:  {}", report.dialect);
    println!("  Scripts:  {}", report.scripts.len());
    println!("  Failed:   {}", report.failed_scripts());
    println!("  Outputs:  {}", report.target_folder.display());
    println!("  Summary:  {}", report.summary_csv.display());
    println!("  Log:      {}", report.log_file.display());
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
///
/// The spinner only redraws when the pipeline reports progress, so the
/// interactive PowerShell scripts and prompts keep a quiet terminal.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.println(format!("==> {name}"));
        self.spinner.set_message(name.to_string());
    }

    fn file_progress(&self, name: &str, current: usize, total: usize) {
        self.spinner.set_message(format!("[{current}/{total}] {name}"));
        self.spinner.tick();
    }

    fn step_finished(&self, record: &StepRecord) {
        self.spinner.println(format!(
            "    {:<10} {} ({} ms)",
            record.name, record.status, record.elapsed_ms
        ));
    }

    fn done(&self, _result: &RunResult) {
        self.finish();
    }
}
