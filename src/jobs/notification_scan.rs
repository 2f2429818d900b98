use chrono::Local;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::services::{mailer::Mailer, notifier, overdue};

/// One unattended pass: overdue sweep first, then the notification scan.
///
/// The sweep runs first so payments that went past due since the last tick
/// are already Overdue when the scan selects overdue notices. Uses the local
/// calendar date; both steps are idempotent and safe on any cadence. Errors
/// are logged, never propagated — a background tick must not take the
/// process down.
pub async fn run(pool: &PgPool, mailer: Arc<dyn Mailer>, config: &Config) {
    let today = Local::now().date_naive();

    match overdue::sweep_overdue(pool, today).await {
        Ok(stats) => {
            if stats.transitioned > 0 || stats.failures > 0 {
                tracing::info!(
                    checked = stats.checked,
                    transitioned = stats.transitioned,
                    failures = stats.failures,
                    "Overdue sweep completed"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Overdue sweep failed");
        }
    }

    match notifier::scan_notifications(
        pool,
        mailer.as_ref(),
        &config.school_name,
        today,
        config.reminder_lead_days,
    )
    .await
    {
        Ok(_stats) => {}
        Err(e) => {
            tracing::error!(error = %e, "Notification scan failed");
        }
    }
}
