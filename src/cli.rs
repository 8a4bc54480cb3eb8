//! Command-line interface.
//!
//! `run` generates, assembles, executes and reports. `list` prints the case product with each
//! case's oracle status. `check` validates an expectation resource against the product.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::HarnessConfig;
use crate::errors::MatrixResult;
use crate::expectations::ExpectationStore;
use crate::generator::{fingerprint, CombinationGenerator};
use crate::pipe::{EachInsertFactory, Pipe};
use crate::runner::SuiteRunner;
use crate::suite::{SuiteAssembler, TestSuite};

pub mod output;

use output::ListedCase;

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "pipematrix",
    version,
    about = "Generate and verify pipe-assembly conformance cases across platforms."
)]
pub struct MatrixArgs {
    /// YAML configuration file (defaults to ./pipematrix.yaml when present).
    #[arg(long, global = true, env = "PIPEMATRIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate, assemble and execute every defined case.
    Run,
    /// List every case name in the product with its oracle status.
    List,
    /// Validate the expectation resource against the case product.
    Check,
}

/// Flags that override the configuration file and environment.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Directory searched for the expectation resource.
    #[arg(long, global = true)]
    pub expectations_root: Option<PathBuf>,

    /// Expectation resource name, e.g. op.properties.
    #[arg(short, long, global = true)]
    pub expectations: Option<String>,

    /// Axis set: op, lhs or rhs.
    #[arg(short, long, global = true)]
    pub axes: Option<String>,

    /// Prefix prepended to every case name as `<prefix>.`.
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Platforms to build cases for, in order. Repeatable.
    #[arg(long = "platform", global = true)]
    pub platforms: Vec<String>,

    /// Only bind cases to these platforms. Repeatable, case-insensitive.
    #[arg(long = "include", global = true)]
    pub includes: Vec<String>,

    /// Generate only this case name.
    #[arg(long, global = true)]
    pub run_only: Option<String>,

    /// Worker threads for `run`.
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Only execute cases whose display name matches this regex.
    #[arg(long, global = true)]
    pub filter: Option<String>,

    #[arg(long, global = true)]
    pub dataset: Option<String>,

    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub dot_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, config: &mut HarnessConfig) {
        if let Some(root) = self.expectations_root {
            config.expectations_root = root;
        }
        if let Some(expectations) = self.expectations {
            config.expectations = expectations;
        }
        if let Some(axes) = self.axes {
            config.axes = axes;
        }
        if self.prefix.is_some() {
            config.prefix = self.prefix;
        }
        if !self.platforms.is_empty() {
            config.platforms = self.platforms;
        }
        if !self.includes.is_empty() {
            config.includes = self.includes;
        }
        if self.run_only.is_some() {
            config.run_only = self.run_only;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if self.filter.is_some() {
            config.filter = self.filter;
        }
        if let Some(dataset) = self.dataset {
            config.dataset = dataset;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(dir) = self.dot_dir {
            config.dot_dir = dir;
        }
    }
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

pub fn run() -> ExitCode {
    let args = MatrixArgs::parse();
    init_logging(args.verbose);

    match execute(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{:?}", miette::Report::new(error));
            ExitCode::FAILURE
        }
    }
}

/// `pipematrix=info` unless `RUST_LOG` says otherwise; `-v` forces debug.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pipematrix=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pipematrix=info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve configuration and dispatch. `Ok(false)` means the command ran but found failures.
pub fn execute(args: MatrixArgs) -> MatrixResult<bool> {
    let mut config = HarnessConfig::load(args.config.as_deref())?;
    config.apply_env();
    args.overrides.apply(&mut config);

    match args.command {
        Command::Run => run_suite(&config, args.json),
        Command::List => list_cases(&config, args.json),
        Command::Check => check_expectations(&config, args.json),
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_suite(config: &HarnessConfig, json: bool) -> MatrixResult<bool> {
    let store = config.load_expectations()?;
    let generator = build_generator(config, &store)?;

    let base = Pipe::head(generator.axes().name);
    let cases = generator.generate(&store, &base, &EachInsertFactory)?;

    let factories = config.platform_factories()?;
    let includes = config.platform_includes();
    let mut suite = TestSuite::new(store.resource());
    SuiteAssembler::new(&factories, &includes).assemble(&store, &cases, &mut suite)?;

    let run = SuiteRunner::new(config.executor())
        .with_jobs(config.jobs)
        .with_filter(config.filter_regex()?)
        .run(&suite);

    if json {
        output::print_run_json(&run)?;
    } else {
        output::print_run(&run);
    }
    Ok(run.is_success())
}

fn list_cases(config: &HarnessConfig, json: bool) -> MatrixResult<bool> {
    let store = config.load_expectations()?;
    let generator = build_generator(config, &store)?;

    let names = generator.names();
    let listed: Vec<ListedCase> = names
        .iter()
        .map(|name| ListedCase {
            name: name.clone(),
            status: case_status(&generator, &store, name),
        })
        .collect();
    let fingerprint = fingerprint(names.iter().map(String::as_str));

    if json {
        output::print_listing_json(generator.axes().name, &listed, &fingerprint)?;
    } else {
        output::print_listing(&listed, &fingerprint);
    }
    Ok(true)
}

fn check_expectations(config: &HarnessConfig, json: bool) -> MatrixResult<bool> {
    let store = config.load_expectations()?;
    let generator = build_generator(config, &store)?;
    let report = store.check(&generator.names());

    if json {
        output::print_check_json(store.resource(), &report)?;
    } else {
        output::print_check(store.resource(), &report);
    }
    Ok(report.is_clean())
}

// ============================================================================
// HELPERS
// ============================================================================

fn build_generator(
    config: &HarnessConfig,
    store: &ExpectationStore,
) -> MatrixResult<CombinationGenerator<'static>> {
    Ok(CombinationGenerator::new(config.axis_set()?)
        .with_prefix(config.prefix.clone())
        .with_run_only(config.effective_run_only(store)))
}

fn case_status(
    generator: &CombinationGenerator<'_>,
    store: &ExpectationStore,
    name: &str,
) -> &'static str {
    if generator.is_filtered(name) {
        "filtered"
    } else if store.is_error(name) {
        "expect-error"
    } else if store.tuple(name).is_some() {
        "defined"
    } else {
        "undefined"
    }
}
