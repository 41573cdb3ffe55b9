use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use xjc_driver::cli::{Cli, VerbosityLevel};
use xjc_driver::config::ConfigManager;
use xjc_driver::error_reporter::ErrorReporter;
use xjc_driver::output::Output;
use xjc_driver::XjcCompiler;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let verbosity = cli.verbosity();
    init_tracing(verbosity);

    match run(cli, verbosity).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `XJC_LOG` takes precedence over the -v/-q derived level
fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_env("XJC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli, verbosity: VerbosityLevel) -> anyhow::Result<bool> {
    let reporter = ErrorReporter::new(verbosity);

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        return Ok(false);
    }

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            reporter.report_config_error(&e);
            return Ok(false);
        }
    };

    // file and environment may raise or lower verbosity too
    let verbosity = VerbosityLevel::from_flags(config.output.verbose, config.output.quiet);
    let reporter = ErrorReporter::new(verbosity);

    let compiler = XjcCompiler::from_config(&config).context("failed to set up xjc")?;
    let report = match compiler.compile(&config.command).await {
        Ok(report) => report,
        Err(e) => {
            reporter.report_error(&e);
            return Ok(false);
        }
    };

    let output = Output::new(verbosity, config.output.format.into());
    let rendered = output
        .format_report(&report)
        .context("failed to render report")?;
    if !rendered.is_empty() {
        print!("{}", rendered);
        if !rendered.ends_with('\n') {
            println!();
        }
    }

    Ok(true)
}
