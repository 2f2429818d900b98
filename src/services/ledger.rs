use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    cash_cut::{CashCut, CreateCashCutData},
    PaymentRecord,
};
use crate::services::eligibility::{self, DateRange};

/// Outcome of a performed cut: the persisted record plus the payments it
/// resolved to, for receipt/PDF generation by the caller. The cut row is the
/// source of truth; anything built on top of this is best-effort.
#[derive(Debug, Serialize)]
pub struct CutReceipt {
    pub cut: CashCut,
    pub payments: Vec<PaymentRecord>,
    pub breakdown: BTreeMap<String, Decimal>,
}

/// Per-concept sums over the included payments, for the cut receipt.
pub fn concept_breakdown(payments: &[PaymentRecord]) -> BTreeMap<String, Decimal> {
    let mut breakdown: BTreeMap<String, Decimal> = BTreeMap::new();
    for payment in payments {
        *breakdown.entry(payment.concept.clone()).or_default() += payment.amount;
    }
    breakdown
}

pub async fn list_eligible_payments(
    pool: &PgPool,
    range: DateRange,
) -> Result<Vec<PaymentRecord>> {
    let mut conn = pool.acquire().await?;
    eligibility::list_eligible(&mut *conn, range).await
}

/// Issues a new cut over `range`.
///
/// Runs in a single REPEATABLE READ transaction, so the cut ranges, the
/// candidate payments, and `MAX(cut_number)` are all read from one snapshot.
/// Two concurrent cuts therefore compute the same next cut_number; the
/// UNIQUE constraint rejects the later insert, which surfaces as Conflict
/// and the caller retries against the now-reduced eligible set. At the
/// default READ COMMITTED level each statement would get a fresh snapshot
/// and a racing cut could observe the winner's number without having seen
/// its range, slipping past the constraint.
pub async fn perform_cut(pool: &PgPool, range: DateRange) -> Result<CutReceipt> {
    range.validate()?;

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await?;

    let eligible = eligibility::list_eligible(&mut *tx, range).await?;
    if eligible.is_empty() {
        return Err(AppError::NothingToCut);
    }

    let total_amount: Decimal = eligible.iter().map(|p| p.amount).sum();
    let breakdown = concept_breakdown(&eligible);
    let next_number = CashCut::next_cut_number(&mut *tx).await?;

    let cut = CashCut::create(
        &mut *tx,
        CreateCashCutData {
            cut_number: next_number,
            start_date: range.start_date,
            end_date: range.end_date,
            total_amount,
            payment_count: eligible.len() as i32,
        },
    )
    .await
    .map_err(|e| match &e {
        // Unique violation on cut_number, or a repeatable-read
        // serialization failure: either way a concurrent cut won the race.
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.code().as_deref() == Some("40001") =>
        {
            AppError::Conflict(
                "another cut was issued concurrently, retry the operation".to_string(),
            )
        }
        _ => AppError::Database(e),
    })?;

    tx.commit().await?;

    tracing::info!(
        cut_id = %cut.id,
        cut_number = cut.cut_number,
        total = %cut.total_amount,
        payments = cut.payment_count,
        "Cash cut issued"
    );

    Ok(CutReceipt {
        cut,
        payments: eligible,
        breakdown,
    })
}

/// Deletes a cut, implicitly releasing the payments in its range back into
/// eligibility. There is no cached cut list anywhere: every eligibility read
/// re-queries the store, so the release is visible immediately after commit.
pub async fn delete_cut(pool: &PgPool, cut_id: Uuid) -> Result<()> {
    let deleted = CashCut::delete(pool, cut_id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("cash cut {} not found", cut_id)));
    }

    tracing::info!(cut_id = %cut_id, "Cash cut deleted, range released");
    Ok(())
}

pub async fn list_recent_cuts(pool: &PgPool, limit: i64) -> Result<Vec<CashCut>> {
    let cuts = CashCut::list_recent(pool, limit).await?;
    Ok(cuts)
}
