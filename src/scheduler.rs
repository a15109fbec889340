use tokio_cron_scheduler::{Job, JobScheduler};

use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::CacheResult;
use crate::messaging::models::{RefreshResponse, Request, Response};
use crate::messaging::service::ServiceHandle;

pub struct Scheduler {
    scheduler: JobScheduler,
    handle: ServiceHandle, // communication to the cache service
}

pub enum JobProcess<'schedule> {
    RefreshOnStartup,
    ScheduledRefresh(&'schedule str),
    StatusHeartbeat(&'schedule str),
}

impl Scheduler {
    pub async fn new(handle: ServiceHandle) -> CacheResult<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Scheduler { scheduler, handle })
    }

    pub async fn add_job(&self, job_process: JobProcess<'_>) -> CacheResult<uuid::Uuid> {
        let job = match job_process {
            JobProcess::RefreshOnStartup => refresh_on_startup_job(self.handle.clone()).await?,
            JobProcess::ScheduledRefresh(schedule) => {
                scheduled_refresh_job(schedule, self.handle.clone()).await?
            }
            JobProcess::StatusHeartbeat(schedule) => {
                status_heartbeat_job(schedule, self.handle.clone()).await?
            }
        };
        Ok(self.scheduler.add(job).await?)
    }

    pub async fn start(&self) -> CacheResult<()> {
        Ok(self.scheduler.start().await?)
    }
}

//////////////////
// Jobs definition
//////////////////

async fn refresh(handle: &ServiceHandle) {
    match handle.request(Request::Refresh).await {
        Ok(Response::Refresh(RefreshResponse::Success { total, .. })) => {
            info!(total, "Scheduled refresh completed")
        }
        Ok(Response::Refresh(RefreshResponse::Cooldown { time_remaining_ms })) => {
            info!(time_remaining_ms, "Scheduled refresh skipped, cooldown active")
        }
        Ok(Response::Refresh(RefreshResponse::AlreadyInProgress)) => {
            info!("Scheduled refresh skipped, a refresh is already running")
        }
        Ok(Response::Refresh(RefreshResponse::Error { detail })) => {
            error!("Scheduled refresh failed. {detail}")
        }
        Ok(other) => warn!(?other, "Unexpected response to a refresh request"),
        Err(e) => error!("{e}"),
    }
}

async fn refresh_on_startup_job(handle: ServiceHandle) -> CacheResult<Job> {
    let job = Job::new_one_shot_async(Duration::from_secs(0), move |_uuid, _l| {
        let handle = handle.clone();
        Box::pin(async move {
            refresh(&handle).await;
        })
    })?;
    Ok(job)
}

async fn scheduled_refresh_job(schedule: &str, handle: ServiceHandle) -> CacheResult<Job> {
    let job = Job::new_async(schedule, move |uuid, mut l| {
        let handle = handle.clone();
        Box::pin(async move {
            refresh(&handle).await;

            // Query the next execution time for this job
            let next_tick = l.next_tick_for_job(uuid).await;
            match next_tick {
                Ok(Some(ts)) => info!("Next scheduled refresh at {:?}", ts),
                _ => error!("Could not get next tick for scheduled refresh job"),
            }
        })
    })?;
    Ok(job)
}

async fn status_heartbeat_job(schedule: &str, handle: ServiceHandle) -> CacheResult<Job> {
    let job = Job::new_async(schedule, move |_uuid, _l| {
        let handle = handle.clone();
        Box::pin(async move {
            match handle.request(Request::Status).await {
                Ok(Response::Status(status)) => info!(
                    cache_count = status.cache_count,
                    initialized = status.initialized,
                    refreshing = status.refreshing,
                    last_refresh_at = ?status.last_refresh_at,
                    "Cache heartbeat"
                ),
                Ok(other) => warn!(?other, "Cache heartbeat could not read status"),
                Err(e) => error!("{e}"),
            }
        })
    })?;
    Ok(job)
}
