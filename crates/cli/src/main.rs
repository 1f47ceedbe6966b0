// donelist CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod exit_code;
mod output;

#[derive(Parser)]
#[command(name = "donelist", about = "Todo list with optimistic sync")]
struct Cli {
    /// Log request activity to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = cli.command.output_format();
    match commands::run(cli.command).await {
        Ok(()) => exit_code::ExitCode::Success.into(),
        Err(error) => {
            output::print_anyhow_error(format, &error);
            exit_code::ExitCode::from_error(&error).into()
        }
    }
}

/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output for
/// the donelist crates.
fn init_tracing(verbose: bool) {
    let default = if verbose { "donelist_client=debug,donelist_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
