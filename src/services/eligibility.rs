use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgConnection;

use crate::error::AppError;
use crate::models::{CashCut, PaymentRecord};

/// Inclusive date range, start <= end.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.start_date > self.end_date {
            return Err(AppError::Validation(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

/// True when any issued cut's range covers `paid_date`. Overlapping cuts are
/// all exclusionary, not just the most recent one.
fn covered_by_any_cut(paid_date: NaiveDate, cut_ranges: &[(NaiveDate, NaiveDate)]) -> bool {
    cut_ranges
        .iter()
        .any(|&(start, end)| start <= paid_date && paid_date <= end)
}

/// Drops candidates already covered by an issued cut and orders the
/// survivors by `paid_date` descending. A payment without a `paid_date`
/// cannot prove it belongs to the window and is dropped.
pub fn filter_eligible(
    candidates: Vec<PaymentRecord>,
    cut_ranges: &[(NaiveDate, NaiveDate)],
) -> Vec<PaymentRecord> {
    let mut eligible: Vec<PaymentRecord> = candidates
        .into_iter()
        .filter(|p| match p.paid_date {
            Some(paid) => !covered_by_any_cut(paid, cut_ranges),
            None => false,
        })
        .collect();

    eligible.sort_by(|a, b| b.paid_date.cmp(&a.paid_date));
    eligible
}

/// Loads the Paid payments in `range` that no existing cut covers.
///
/// Both reads go through the same executor so `perform_cut` can run this
/// inside its transaction and see a single snapshot of cuts + payments. A
/// failed read aborts the whole computation: "could not load cuts" is never
/// interpreted as "no cuts exist", which would double-count.
pub async fn list_eligible(
    conn: &mut PgConnection,
    range: DateRange,
) -> Result<Vec<PaymentRecord>, AppError> {
    range.validate()?;

    let cut_ranges = CashCut::list_ranges(&mut *conn).await?;
    let candidates =
        PaymentRecord::find_paid_in_range(&mut *conn, range.start_date, range.end_date).await?;

    Ok(filter_eligible(candidates, &cut_ranges))
}
