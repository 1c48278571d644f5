mod collectors;
mod config;
mod driver;
mod quotes;
mod render;
mod report;
mod severity;

use clap::Parser;
use config::Config;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "motdstat")]
#[command(version, about = "Prints a system status summary at login")]
struct Cli {
    #[arg(long, env = "MOTDSTAT_CONFIG", default_value = "/etc/motdstat/config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return ExitCode::SUCCESS;
    }

    let cfg = match Config::load_or_default(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            eprintln!("motdstat: {err}");
            return ExitCode::FAILURE;
        }
    };

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            error!(error = %err, "failed to start runtime");
            eprintln!("motdstat: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = runtime.block_on(driver::collect(&cfg));
    info!(generated_at = %report.generated_at, "report collected");

    let text = render::render_to_string(&report, &cfg);
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
        // A closed stdout (e.g. piped into `head`) is not worth a failing login.
        error!(error = %err, "failed to write report");
    }
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
