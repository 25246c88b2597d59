use crate::check::{run_check, run_inspect, run_status, CheckArgs, StatusArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use condusef_monitor::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "CONDUSEF Monitor",
    about = "Alert once per newly published CONDUSEF SOFIPO reporting period",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one freshness check (default command)
    Check(CheckArgs),
    /// Print the stored last known period
    Status(StatusArgs),
    /// Fetch and parse every tracked listing without touching state
    Inspect,
    /// Serve the read-only period feed for the dashboard
    Feed(ServeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Check(CheckArgs::default()));

    match command {
        Command::Check(args) => run_check(args).await,
        Command::Status(args) => run_status(args),
        Command::Inspect => run_inspect().await,
        Command::Feed(args) => server::run(args).await,
    }
}
