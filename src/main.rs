use pos_cache::cli::Cli;
use pos_cache::client::leaderboard::LeaderboardClient;
use pos_cache::config::Settings;
use pos_cache::core::notifier::Notifier;
use pos_cache::core::refresh::{RefreshCoordinator, RefreshPolicy};
use pos_cache::messaging::console;
use pos_cache::messaging::service::CacheService;
use pos_cache::scheduler::{JobProcess, Scheduler};
use pos_cache::storage::{MemoryStore, SledStore, Store};

use clap::Parser;
use std::sync::Arc;
use tokio::io::{self, BufReader};
use tracing::{error, info};

// Capacity of 64 should be more than plenty to handle all the requests
const REQUEST_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::new(&cli)?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(settings.get_trace_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store: Arc<dyn Store> = match settings.ephemeral {
        true => {
            info!("Ephemeral mode, rankings are kept in memory only.");
            Arc::new(MemoryStore::new())
        }
        false => {
            info!(path = ?settings.data_dir, "Opening rankings database.");
            Arc::new(SledStore::open(&settings.data_dir)?)
        }
    };

    let notifier = Arc::new(Notifier::new());
    let (_, notifications) = notifier.subscribe();
    tokio::spawn(console::announce(notifications, io::stdout()));

    let coordinator = Arc::new(RefreshCoordinator::new(
        store.clone(),
        Arc::new(LeaderboardClient::from_settings(&settings)?),
        notifier.clone(),
        RefreshPolicy::from_settings(&settings),
    )?);
    let handle = CacheService::new(coordinator, store.clone()).spawn(REQUEST_QUEUE_CAPACITY);

    let sched = Scheduler::new(handle.clone()).await?;
    let mut jobs = vec![
        JobProcess::ScheduledRefresh(&settings.refresh_schedule),
        JobProcess::StatusHeartbeat(&settings.heartbeat_schedule),
    ];
    if settings.refresh_on_start {
        jobs.push(JobProcess::RefreshOnStartup); // only ran once, at startup.
    }
    for job in jobs {
        sched.add_job(job).await?;
    }

    info!("Starting scheduler.");
    sched.start().await?;

    info!("Ready, type !help for the list of commands.");
    let input = tokio::spawn(console::run(
        handle,
        BufReader::new(io::stdin()),
        io::stdout(),
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested."),
        result = input => {
            match result {
                Ok(Ok(())) => info!("Console closed, still serving scheduled jobs."),
                Ok(Err(e)) => error!("Console stopped. {e}"),
                Err(e) => error!("Console task failed. {e}"),
            }
            tokio::signal::ctrl_c().await?;
            info!("Shutdown requested.");
        }
    }

    store.flush().await?;
    info!("Rankings flushed to storage, bye.");

    Ok(())
}
