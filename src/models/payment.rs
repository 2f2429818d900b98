use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
}

/// A single billable charge against a student.
///
/// `paid_date` is set exactly when `status` is `Paid` (enforced by a CHECK
/// constraint and by `mark_paid`). All business dates are calendar dates with
/// no time component, so range comparisons can never be split by time-of-day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub concept: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub debt_amount: Option<Decimal>,
    pub debt_description: Option<String>,
    pub reminder_sent: Option<DateTime<Utc>>,
    pub overdue_notification_sent: Option<DateTime<Utc>>,
    pub confirmation_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentData {
    pub student_id: Uuid,
    pub concept: String,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub debt_amount: Option<Decimal>,
    pub debt_description: Option<String>,
}

impl PaymentRecord {
    /// Registers a new charge, always in Pending state.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreatePaymentData,
    ) -> Result<Self, sqlx::Error> {
        let payment = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO payments (student_id, concept, amount, due_date, debt_amount, debt_description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.student_id)
        .bind(&data.concept)
        .bind(data.amount)
        .bind(data.due_date)
        .bind(data.debt_amount)
        .bind(&data.debt_description)
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let payment = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payments WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(payment)
    }

    pub async fn list_by_student(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payments WHERE student_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    /// Transitions a Pending or Overdue payment to Paid and stamps
    /// `paid_date`. Returns None when the payment does not exist or is
    /// already Paid (Paid is terminal for this transition).
    pub async fn mark_paid(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        paid_date: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let payment = sqlx::query_as::<_, Self>(
            r#"
            UPDATE payments
            SET status = 'paid', paid_date = $2
            WHERE id = $1 AND status IN ('pending', 'overdue')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(paid_date)
        .fetch_optional(executor)
        .await?;

        Ok(payment)
    }

    /// Paid payments whose `paid_date` falls inside the inclusive range.
    /// Most recent first, for operator review before a cut.
    pub async fn find_paid_in_range(
        executor: impl PgExecutor<'_>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payments
            WHERE status = 'paid' AND paid_date >= $1 AND paid_date <= $2
            ORDER BY paid_date DESC, created_at DESC
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    /// Pending payments whose due date has already passed.
    pub async fn find_pending_past_due(
        executor: impl PgExecutor<'_>,
        today: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payments
            WHERE status = 'pending' AND due_date IS NOT NULL AND due_date < $1
            "#,
        )
        .bind(today)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    /// Sweep transition: Pending -> Overdue. Guarded so it never touches a
    /// payment that was paid (or already swept) in the meantime.
    pub async fn mark_overdue(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET status = 'overdue'
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Pending payments due exactly on `target_due_date` that have not had a
    /// reminder yet.
    pub async fn find_needing_reminder(
        executor: impl PgExecutor<'_>,
        target_due_date: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payments
            WHERE status = 'pending'
              AND reminder_sent IS NULL
              AND due_date = $1
            "#,
        )
        .bind(target_due_date)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    /// Past-due payments that have not had an overdue notice yet. Matches
    /// both Pending and Overdue so the scan does not depend on whether the
    /// overdue sweep ran first.
    pub async fn find_overdue_unnotified(
        executor: impl PgExecutor<'_>,
        today: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payments
            WHERE status IN ('pending', 'overdue')
              AND overdue_notification_sent IS NULL
              AND due_date IS NOT NULL AND due_date < $1
            "#,
        )
        .bind(today)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    /// Claims the reminder marker if and only if it is still unset and the
    /// payment is still Pending, so two overlapping scans cannot both
    /// dispatch for the same payment and a payment paid since selection is
    /// not reminded.
    pub async fn claim_reminder(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET reminder_sent = NOW()
            WHERE id = $1 AND reminder_sent IS NULL AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Releases a reminder claim after a failed dispatch so the next scan
    /// retries the payment.
    pub async fn release_reminder(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payments SET reminder_sent = NULL WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn claim_overdue_notification(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET overdue_notification_sent = NOW()
            WHERE id = $1 AND overdue_notification_sent IS NULL
              AND status IN ('pending', 'overdue')
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn release_overdue_notification(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payments SET overdue_notification_sent = NULL WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn claim_confirmation(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET confirmation_sent = NOW()
            WHERE id = $1 AND confirmation_sent IS NULL AND status = 'paid'
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn release_confirmation(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payments SET confirmation_sent = NULL WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(())
    }
}
