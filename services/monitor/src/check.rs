use crate::infra::portal_source;
use clap::Args;
use condusef_monitor::config::AppConfig;
use condusef_monitor::error::AppError;
use condusef_monitor::monitor::{
    EmailNotifier, FeedService, FileStateStore, Notifier, PortalSource, RunController, RunMode,
    RunOutcome, SmtpMailTransport, StateStore,
};
use condusef_monitor::telemetry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct CheckArgs {
    /// Fetch, parse and compare only. Nothing is sent and the state file is left alone.
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Override MONITOR_STATE_FILE
    #[arg(long)]
    pub(crate) state_file: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StatusArgs {
    /// Override MONITOR_STATE_FILE
    #[arg(long)]
    pub(crate) state_file: Option<PathBuf>,
}

pub(crate) async fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let CheckArgs {
        dry_run,
        state_file,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(path) = state_file {
        config.state.path = path;
    }
    telemetry::init(&config.telemetry)?;

    let source = portal_source(&config)?;
    let store = Arc::new(FileStateStore::new(config.state.path.clone()));
    let transport = Arc::new(SmtpMailTransport::from_config(&config.mail));
    let notifier = Arc::new(EmailNotifier::new(
        transport,
        config.mail.recipients.clone(),
    ));
    let mode = if dry_run {
        RunMode::DryRun
    } else {
        RunMode::Live
    };
    let controller =
        RunController::new(source, store, notifier, config.roster.clone()).with_mode(mode);

    info!(
        ?config.environment,
        state_file = %config.state.path.display(),
        "starting freshness check"
    );
    let outcome = execute(controller).await?;

    render_outcome(&outcome);
    Ok(())
}

/// Runs one cycle off the async workers. Any `Ok` outcome, including a
/// listing nothing could be parsed from, leaves the process exit status at 0.
pub(crate) async fn execute<P, S, N>(
    controller: RunController<P, S, N>,
) -> Result<RunOutcome, AppError>
where
    P: PortalSource + 'static,
    S: StateStore + 'static,
    N: Notifier + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || controller.run())
        .await
        .map_err(std::io::Error::from)??;
    Ok(outcome)
}

pub(crate) fn run_status(args: StatusArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = args.state_file.unwrap_or(config.state.path);
    let record = FileStateStore::new(path).load()?;

    let rendered = serde_json::to_string_pretty(&record).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) async fn run_inspect() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let service = FeedService::new(portal_source(&config)?, config.roster.clone());
    let snapshot = tokio::task::spawn_blocking(move || service.snapshot())
        .await
        .map_err(std::io::Error::from)?;

    let rendered = serde_json::to_string_pretty(&snapshot).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

fn render_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::NoChange { baseline, latest } => match latest {
            Some(latest) => {
                println!("No new period: stored {baseline}, portal lists up to {latest}")
            }
            None => println!("No new period: stored {baseline}, portal listed no periods"),
        },
        RunOutcome::Notified {
            previous,
            record,
            reports,
        } => {
            println!(
                "Alert sent for {} (previous {previous})",
                record.last_known_period.label()
            );
            for report in reports {
                println!("- {}", report.institution);
            }
        }
        RunOutcome::DryRun {
            baseline,
            period,
            reports,
        } => {
            println!(
                "Dry run: {} is newer than stored {baseline}; no alert sent, state unchanged",
                period.label()
            );
            for report in reports {
                println!("- {}", report.institution);
            }
        }
    }
}
