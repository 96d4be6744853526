//! Cron triggers for the trade and check jobs.
//!
//! Each trigger is a one-shot job on the [`JobScheduler`], armed for the
//! next fire time computed in the configured zone. After the job runs it
//! arms the following occurrence, so local fire times survive daylight
//! saving changes and a trigger never has two runs in flight.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use options_bot_core::CronSchedule;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::bot::OptionsBot;

/// The two scheduled jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    TradeOptions,
    CheckValue,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TradeOptions => "trade_options",
            Self::CheckValue => "check_value",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Trigger {
    kind: JobKind,
    schedule: CronSchedule,
    tz: Tz,
    bot: Arc<OptionsBot>,
}

impl Trigger {
    async fn fire(&self) {
        match self.kind {
            JobKind::TradeOptions => self.bot.run_trade_options().await,
            JobKind::CheckValue => self.bot.run_check_value().await,
        }
    }
}

/// First fire time of `schedule` in `tz` strictly after `after`.
///
/// # Errors
/// Returns an error if the schedule never matches again.
pub fn next_run(schedule: &CronSchedule, tz: Tz, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    schedule
        .next_after(&after.with_timezone(&tz))
        .map(|at| at.with_timezone(&Utc))
        .with_context(|| format!("schedule '{schedule}' has no future run in {tz}"))
}

type ArmFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Adds a one-shot job for the first occurrence after `after`.
fn arm(scheduler: JobScheduler, trigger: Arc<Trigger>, after: DateTime<Utc>) -> ArmFuture {
    Box::pin(async move {
        let now = Utc::now();
        let at = next_run(&trigger.schedule, trigger.tz, after.max(now))?;
        let delay = (at - now).to_std().unwrap_or_default();
        info!(
            "Next {} run at {} ({})",
            trigger.kind,
            at.with_timezone(&trigger.tz),
            trigger.tz
        );

        let fired = trigger.clone();
        let job = Job::new_one_shot_async(delay, move |_uuid, scheduler| {
            let trigger = fired.clone();
            Box::pin(async move {
                trigger.fire().await;
                // Never earlier than this occurrence, even if the tick came early.
                if let Err(e) = arm(scheduler, trigger.clone(), at).await {
                    error!("Failed to schedule next {} run: {:#}", trigger.kind, e);
                }
            })
        })
        .with_context(|| format!("failed to create {} job", trigger.kind))?;

        scheduler
            .add(job)
            .await
            .with_context(|| format!("failed to add {} job", trigger.kind))?;
        Ok(())
    })
}

/// Arms the trade and check jobs on a new, not yet started scheduler.
///
/// # Errors
/// Returns an error if the settings schedules are invalid or the scheduler
/// rejects a job.
pub async fn build_scheduler(bot: Arc<OptionsBot>) -> Result<JobScheduler> {
    let settings = bot.settings();
    let tz = settings.tz()?;
    let triggers = [
        (JobKind::TradeOptions, settings.trade_cron()?),
        (JobKind::CheckValue, settings.check_cron()?),
    ];

    let scheduler = JobScheduler::new()
        .await
        .context("failed to create job scheduler")?;

    for (kind, schedule) in triggers {
        info!("Schedule {}: '{}' ({})", kind, schedule, tz);
        let trigger = Arc::new(Trigger {
            kind,
            schedule,
            tz,
            bot: bot.clone(),
        });
        arm(scheduler.clone(), trigger, Utc::now()).await?;
    }

    Ok(scheduler)
}

/// Announces the bot, runs both jobs on schedule, and stops on Ctrl-C.
///
/// # Errors
/// Returns an error if the scheduler cannot be built or started.
pub async fn run(bot: Arc<OptionsBot>) -> Result<()> {
    bot.announce().await;

    let mut scheduler = build_scheduler(bot).await?;
    scheduler
        .start()
        .await
        .context("failed to start job scheduler")?;
    info!("Scheduler started, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("Shutting down scheduler");
    scheduler
        .shutdown()
        .await
        .context("failed to shut down job scheduler")?;
    Ok(())
}
