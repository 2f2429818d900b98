use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::PaymentRecord;

#[derive(Debug, Default)]
pub struct SweepStats {
    pub checked: usize,
    pub transitioned: usize,
    pub failures: usize,
}

/// Transitions Pending payments whose due date is strictly before `today`
/// into Overdue.
///
/// Monotonic: the sweep never moves a payment out of Overdue, and the guard
/// in `mark_overdue` skips anything paid between the read and the update.
/// One failed update does not abort the rest of the sweep.
pub async fn sweep_overdue(pool: &PgPool, today: NaiveDate) -> Result<SweepStats, sqlx::Error> {
    let mut stats = SweepStats::default();

    let past_due = PaymentRecord::find_pending_past_due(pool, today).await?;
    stats.checked = past_due.len();

    for payment in past_due {
        match PaymentRecord::mark_overdue(pool, payment.id).await {
            Ok(true) => {
                stats.transitioned += 1;
                tracing::info!(
                    payment_id = %payment.id,
                    due_date = ?payment.due_date,
                    "Payment transitioned to overdue"
                );
            }
            Ok(false) => {
                // Paid or already swept since the read; nothing to do.
            }
            Err(e) => {
                stats.failures += 1;
                tracing::error!(
                    payment_id = %payment.id,
                    error = %e,
                    "Failed to mark payment overdue"
                );
            }
        }
    }

    Ok(stats)
}
