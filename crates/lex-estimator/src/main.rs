//! CLI for inspecting foreign estimators through the estimator protocol.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use lex_estimator::{Args, EcosystemConfig, Estimator, ForeignEstimator, Operation, Value};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Inspect and configure scikit-learn estimators",
    long_about = "Constructs foreign estimators through the estimator protocol and \
                  prints their (deep) parameters.\n\n\
                  EXAMPLES:\n  \
                  # Deep parameters of a default SVC\n  \
                  lex-estimator params sklearn.svm SVC\n\n  \
                  # Nested parameters of a bagging ensemble, as JSON\n  \
                  lex-estimator params sklearn.ensemble BaggingClassifier --set n_estimators=5 --json\n\n  \
                  # Native to foreign operation names\n  \
                  lex-estimator operations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Ecosystem configuration file (JSON); defaults to scikit-learn
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Construct an estimator and print its parameters
    Params {
        /// Module holding the estimator class, e.g. `sklearn.svm`
        module: String,

        /// Estimator class name, e.g. `SVC`
        class: String,

        /// Parameter to set after construction, as `key=value`
        ///
        /// Values are parsed as JSON when possible (`C=10`, `fit_intercept=false`)
        /// and taken as strings otherwise (`kernel=linear`). Nested keys such as
        /// `estimator__C=2` are allowed. May be repeated.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Only the estimator's own parameters, without nested ones
        #[arg(long)]
        shallow: bool,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the native to foreign operation table
    Operations,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so that stdout only
/// contains the JSON document.
fn init_logging(level: &str, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", raw))?;
    let value = serde_json::from_str::<serde_json::Value>(value)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}

fn load_config(path: Option<&str>) -> Result<EcosystemConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read config file {path}"))?;
            Ok(EcosystemConfig::from_json_str(&json)?)
        }
        None => Ok(EcosystemConfig::default()),
    }
}

fn run_params(module: &str, class: &str, set: &[String], shallow: bool, json: bool) -> Result<()> {
    let assignments = set
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>>>()?;

    info!("Constructing {}.{}", module, class);
    let mut estimator = ForeignEstimator::construct(module, class, Args::new())?;

    if !assignments.is_empty() {
        lex_estimator::set_params(&mut estimator, assignments)?;
    }

    let params = estimator.get_params(!shallow)?;

    if json {
        let document = Value::Map(params).to_json();
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("{} ({})", estimator.name(), if shallow { "shallow" } else { "deep" });
    let width = params.keys().map(String::len).max().unwrap_or(0);
    for (key, value) in &params {
        println!("  {key:<width$}  {value}");
    }
    println!(
        "  classifier: {}, pairwise: {}",
        lex_estimator::is_classifier(&estimator)?,
        lex_estimator::is_pairwise(&estimator)?
    );
    Ok(())
}

fn run_operations() {
    println!("{:<20} {:<20} mutates", "native", "foreign");
    for op in Operation::all() {
        println!(
            "{:<20} {:<20} {}",
            op.native_name(),
            op.foreign_name(),
            if op.is_mutating() { "yes" } else { "no" }
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_output = matches!(cli.command, Command::Params { json: true, .. });
    init_logging(&cli.log_level, json_output);

    match cli.command {
        Command::Operations => {
            run_operations();
            Ok(())
        }
        Command::Params {
            module,
            class,
            set,
            shallow,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            lex_estimator::initialize(config)?;
            run_params(&module, &class, &set, shallow, json)
        }
    }
}
