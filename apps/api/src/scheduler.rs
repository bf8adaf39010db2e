//! Daily trigger for the summary pipeline.
//!
//! Fires once a day on a cron schedule in a fixed timezone and summarises the
//! previous calendar day for every category, one after another. A failing
//! category is logged and counted; the rest still run. Nothing is retried and
//! no run state is stored: re-running a day relies on the upsert semantics.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::ScheduleConfig;
use crate::models::summary::Category;
use crate::summaries::service::SummaryService;

/// Counters for one run. Observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub target_date: NaiveDate,
    /// Categories whose pipeline completed, including those that stored a
    /// sentinel or kept prior data after a failed generation call.
    pub succeeded: usize,
    /// Categories whose pipeline raised (storage errors).
    pub failed: usize,
    /// Subset of `succeeded` where the generation call itself failed.
    pub generation_failures: usize,
}

/// Always the day before the trigger date.
pub fn target_date_for(trigger_date: NaiveDate) -> NaiveDate {
    trigger_date - Days::new(1)
}

pub struct DailySummaryScheduler {
    service: SummaryService,
    cron: String,
    timezone: Tz,
}

impl DailySummaryScheduler {
    pub fn new(service: SummaryService, config: &ScheduleConfig) -> Self {
        Self {
            service,
            cron: config.cron.clone(),
            timezone: config.timezone,
        }
    }

    /// Today's date in the scheduler's timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Summarises the day before `trigger_date` for every category.
    pub async fn run(&self, trigger_date: NaiveDate) -> RunReport {
        let target_date = target_date_for(trigger_date);
        info!("===== Daily summary run started (target date: {target_date}) =====");

        let mut report = RunReport {
            target_date,
            succeeded: 0,
            failed: 0,
            generation_failures: 0,
        };

        for category in Category::ALL {
            match self.service.generate_and_save(target_date, category).await {
                Ok(outcome) => {
                    report.succeeded += 1;
                    if outcome.is_generation_failure() {
                        report.generation_failures += 1;
                    }
                    info!(
                        "[run] {} summary done: {}",
                        category.display_name(),
                        outcome.record().title
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!("[run] {} summary failed: {e}", category.display_name());
                }
            }
        }

        info!(
            "===== Daily summary run finished (success: {}, failure: {}, generation failures: {}) =====",
            report.succeeded, report.failed, report.generation_failures
        );
        report
    }

    pub async fn run_now(&self) -> RunReport {
        self.run(self.today()).await
    }

    /// Registers the daily job and starts the cron scheduler. The returned
    /// handle must be kept alive for the job to keep firing.
    pub async fn start(self: Arc<Self>) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create job scheduler: {e:?}"))?;

        let runner = Arc::clone(&self);
        let job = Job::new_async_tz(self.cron.as_str(), self.timezone, move |_id, _lock| {
            let runner = Arc::clone(&runner);
            Box::pin(async move {
                runner.run_now().await;
            })
        })
        .map_err(|e| anyhow!("Invalid summary cron '{}': {e:?}", self.cron))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to register daily summary job: {e:?}"))?;
        scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start job scheduler: {e:?}"))?;

        info!(
            "Daily summary job scheduled ('{}' in {})",
            self.cron, self.timezone
        );
        Ok(scheduler)
    }
}
