//! `vortex-script` binary.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vortex_domain::ScriptMode;
use vortex_infrastructure::{QuickJsScriptEngine, ReqwestHttpExecutor};
use vortex_script::{RunError, apply_timeout_override, load_settings, run_script, substitute};

#[derive(Parser, Debug)]
#[command(name = "vortex-script", version, about = "Run Postman-style scripts in a sandbox")]
struct Cli {
    /// Settings file (defaults to <config dir>/vortex/script.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a script and print the result as JSON.
    Run {
        /// Which entry point to use.
        #[arg(long, value_enum)]
        mode: Mode,
        /// Script file.
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
        /// Input document; `-` reads stdin.
        #[arg(long, value_name = "FILE", default_value = "-")]
        input: PathBuf,
        /// Overrides the configured wall-clock budget.
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
    /// Substitute `{{variables}}` in a template.
    Substitute {
        /// Template text.
        template: String,
        /// Scope document with environment, collection_variables and extracted.
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Print the effective settings.
    Settings,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Pre,
    Post,
}

impl From<Mode> for ScriptMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Pre => Self::PreRequest,
            Mode::Post => Self::PostResponse,
        }
    }
}

fn read_source(path: &Path) -> Result<String, RunError> {
    let io_error = |source| RunError::Io {
        path: path.display().to_string(),
        source,
    };
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map_err(io_error)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).map_err(io_error)
    }
}

async fn execute(cli: Cli) -> Result<serde_json::Value, RunError> {
    let settings = load_settings(cli.config.as_deref())?;
    match cli.command {
        Command::Run {
            mode,
            script,
            input,
            timeout_ms,
        } => {
            let settings = apply_timeout_override(settings, timeout_ms)?;
            let source = read_source(&script)?;
            let input = read_source(&input)?;
            let engine =
                QuickJsScriptEngine::new(Arc::new(ReqwestHttpExecutor::new()?), settings);
            info!(script = %script.display(), ?mode, "running script");
            run_script(&engine, mode.into(), &source, &input).await
        }
        Command::Substitute { template, input } => {
            let scopes = match input {
                Some(path) => read_source(&path)?,
                None => String::new(),
            };
            let output = substitute(&template, &scopes, settings.max_nesting_depth)?;
            Ok(serde_json::to_value(output)?)
        }
        Command::Settings => Ok(serde_json::to_value(settings)?),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match execute(Cli::parse()).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            eprintln!("{:#}", e.report());
            ExitCode::from(e.exit_code())
        }
    }
}
