use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// A reconciliation record over an inclusive date range.
///
/// Membership is derived: a payment belongs to a cut when its `paid_date`
/// falls inside `[start_date, end_date]`. There is no foreign key from
/// payments to cuts, so deleting a cut releases its payments with no extra
/// bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashCut {
    pub id: Uuid,
    pub cut_number: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_amount: Decimal,
    pub payment_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCashCutData {
    pub cut_number: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_amount: Decimal,
    pub payment_count: i32,
}

impl CashCut {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateCashCutData,
    ) -> Result<Self, sqlx::Error> {
        let cut = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO cash_cuts (cut_number, start_date, end_date, total_amount, payment_count)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.cut_number)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.total_amount)
        .bind(data.payment_count)
        .fetch_one(executor)
        .await?;

        Ok(cut)
    }

    /// Every issued cut's date range. The eligibility filter treats each of
    /// these as exclusionary, overlapping or not.
    pub async fn list_ranges(
        executor: impl PgExecutor<'_>,
    ) -> Result<Vec<(NaiveDate, NaiveDate)>, sqlx::Error> {
        let ranges = sqlx::query_as::<_, (NaiveDate, NaiveDate)>(
            r#"
            SELECT start_date, end_date FROM cash_cuts
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(ranges)
    }

    pub async fn list_recent(
        executor: impl PgExecutor<'_>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let cuts = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cash_cuts ORDER BY created_at DESC LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(cuts)
    }

    /// Next sequential cut number: max + 1, starting at 1.
    pub async fn next_cut_number(executor: impl PgExecutor<'_>) -> Result<i32, sqlx::Error> {
        let (next,): (i32,) = sqlx::query_as(
            r#"
            SELECT COALESCE(MAX(cut_number), 0) + 1 FROM cash_cuts
            "#,
        )
        .fetch_one(executor)
        .await?;

        Ok(next)
    }

    /// Deletes a cut. Returns false when it was already gone (double-delete
    /// is a no-op failure for the caller, not a crash).
    pub async fn delete(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM cash_cuts WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
