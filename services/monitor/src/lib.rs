mod check;
mod cli;
mod infra;
mod routes;
mod server;

use condusef_monitor::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
