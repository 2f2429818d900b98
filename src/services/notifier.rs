use chrono::{Days, NaiveDate};
use sqlx::PgPool;

use crate::models::{PaymentRecord, Student};
use crate::services::{emails, mailer::Mailer};

#[derive(Debug, Default)]
pub struct ScanStats {
    pub reminders_sent: usize,
    pub overdue_notices_sent: usize,
    pub skipped_no_email: usize,
    pub skipped_already_claimed: usize,
    pub dispatch_failures: usize,
    pub record_errors: usize,
}

enum NotificationKind {
    Reminder,
    OverdueNotice,
}

enum Outcome {
    Sent,
    NoEmail,
    AlreadyClaimed,
    DispatchFailed,
}

enum NotifyError {
    Database(sqlx::Error),
    Render(askama::Error),
}

/// One pass over payments needing a reminder or an overdue notice.
///
/// Reminders go to Pending payments due exactly `lead_days` from `today`;
/// overdue notices to past-due payments (Pending or Overdue) not yet
/// notified. Records are processed sequentially so marking stays ordered
/// relative to dispatching for the same payment. A failure on one payment is
/// counted and the scan moves on.
pub async fn scan_notifications(
    pool: &PgPool,
    mailer: &dyn Mailer,
    school_name: &str,
    today: NaiveDate,
    lead_days: i64,
) -> Result<ScanStats, sqlx::Error> {
    let mut stats = ScanStats::default();

    let reminder_date = today
        .checked_add_days(Days::new(lead_days.max(0) as u64))
        .unwrap_or(today);

    let reminders = PaymentRecord::find_needing_reminder(pool, reminder_date).await?;
    let overdue = PaymentRecord::find_overdue_unnotified(pool, today).await?;

    tracing::info!(
        reminders = reminders.len(),
        overdue = overdue.len(),
        "Starting notification scan"
    );

    for payment in reminders {
        record_outcome(
            &mut stats,
            NotificationKind::Reminder,
            notify_one(pool, mailer, school_name, &payment, NotificationKind::Reminder).await,
            &payment,
        );
    }

    for payment in overdue {
        record_outcome(
            &mut stats,
            NotificationKind::OverdueNotice,
            notify_one(pool, mailer, school_name, &payment, NotificationKind::OverdueNotice).await,
            &payment,
        );
    }

    tracing::info!(?stats, "Notification scan completed");
    Ok(stats)
}

fn record_outcome(
    stats: &mut ScanStats,
    kind: NotificationKind,
    result: Result<Outcome, NotifyError>,
    payment: &PaymentRecord,
) {
    match result {
        Ok(Outcome::Sent) => match kind {
            NotificationKind::Reminder => stats.reminders_sent += 1,
            NotificationKind::OverdueNotice => stats.overdue_notices_sent += 1,
        },
        Ok(Outcome::NoEmail) => stats.skipped_no_email += 1,
        Ok(Outcome::AlreadyClaimed) => stats.skipped_already_claimed += 1,
        Ok(Outcome::DispatchFailed) => stats.dispatch_failures += 1,
        Err(NotifyError::Database(e)) => {
            stats.record_errors += 1;
            tracing::error!(payment_id = %payment.id, error = %e, "Database error during notification");
        }
        Err(NotifyError::Render(e)) => {
            stats.record_errors += 1;
            tracing::error!(payment_id = %payment.id, error = %e, "Template render error");
        }
    }
}

/// Claim-before-send: the idempotency marker is taken with a conditional
/// update before dispatching, so a second overlapping scan cannot pick up
/// the same payment. A failed dispatch releases the claim; the marker is
/// never left set for an email that did not go out.
async fn notify_one(
    pool: &PgPool,
    mailer: &dyn Mailer,
    school_name: &str,
    payment: &PaymentRecord,
    kind: NotificationKind,
) -> Result<Outcome, NotifyError> {
    let student = Student::find_by_id(pool, payment.student_id)
        .await
        .map_err(NotifyError::Database)?;

    let Some(student) = student else {
        tracing::warn!(
            payment_id = %payment.id,
            student_id = %payment.student_id,
            "Payment references a missing student, skipping"
        );
        return Ok(Outcome::NoEmail);
    };

    let Some(email) = student.email.clone().filter(|e| !e.trim().is_empty()) else {
        tracing::warn!(
            payment_id = %payment.id,
            student_id = %student.id,
            "Student has no email address, skipping notification"
        );
        return Ok(Outcome::NoEmail);
    };

    let claimed = match kind {
        NotificationKind::Reminder => PaymentRecord::claim_reminder(pool, payment.id).await,
        NotificationKind::OverdueNotice => {
            PaymentRecord::claim_overdue_notification(pool, payment.id).await
        }
    }
    .map_err(NotifyError::Database)?;

    if !claimed {
        return Ok(Outcome::AlreadyClaimed);
    }

    let message = match kind {
        NotificationKind::Reminder => emails::reminder_email(school_name, &student, payment, email),
        NotificationKind::OverdueNotice => {
            emails::overdue_email(school_name, &student, payment, email)
        }
    };

    let message = match message {
        Ok(m) => m,
        Err(e) => {
            release_claim(pool, payment, &kind).await?;
            return Err(NotifyError::Render(e));
        }
    };

    match mailer.send(&message).await {
        Ok(receipt) => {
            tracing::info!(
                payment_id = %payment.id,
                provider_id = %receipt.id,
                "Notification dispatched"
            );
            Ok(Outcome::Sent)
        }
        Err(e) => {
            tracing::error!(
                payment_id = %payment.id,
                error = %e,
                "Email dispatch failed, releasing claim"
            );
            release_claim(pool, payment, &kind).await?;
            Ok(Outcome::DispatchFailed)
        }
    }
}

async fn release_claim(
    pool: &PgPool,
    payment: &PaymentRecord,
    kind: &NotificationKind,
) -> Result<(), NotifyError> {
    match kind {
        NotificationKind::Reminder => PaymentRecord::release_reminder(pool, payment.id).await,
        NotificationKind::OverdueNotice => {
            PaymentRecord::release_overdue_notification(pool, payment.id).await
        }
    }
    .map_err(NotifyError::Database)
}

/// Best-effort payment confirmation after a mark-paid. Idempotent via
/// `confirmation_sent`; a dispatch failure is logged and never fails the
/// operation that triggered it.
pub async fn send_payment_confirmation(
    pool: &PgPool,
    mailer: &dyn Mailer,
    school_name: &str,
    payment: &PaymentRecord,
) {
    let result = async {
        let student = Student::find_by_id(pool, payment.student_id)
            .await
            .map_err(NotifyError::Database)?;

        let Some(student) = student else {
            return Ok(Outcome::NoEmail);
        };
        let Some(email) = student.email.clone().filter(|e| !e.trim().is_empty()) else {
            tracing::warn!(
                payment_id = %payment.id,
                "Student has no email address, skipping confirmation"
            );
            return Ok(Outcome::NoEmail);
        };

        if !PaymentRecord::claim_confirmation(pool, payment.id)
            .await
            .map_err(NotifyError::Database)?
        {
            return Ok(Outcome::AlreadyClaimed);
        }

        let message = match emails::receipt_email(school_name, &student, payment, email) {
            Ok(m) => m,
            Err(e) => {
                PaymentRecord::release_confirmation(pool, payment.id)
                    .await
                    .map_err(NotifyError::Database)?;
                return Err(NotifyError::Render(e));
            }
        };

        match mailer.send(&message).await {
            Ok(_) => Ok(Outcome::Sent),
            Err(e) => {
                tracing::error!(
                    payment_id = %payment.id,
                    error = %e,
                    "Confirmation dispatch failed, releasing claim"
                );
                PaymentRecord::release_confirmation(pool, payment.id)
                    .await
                    .map_err(NotifyError::Database)?;
                Ok(Outcome::DispatchFailed)
            }
        }
    }
    .await;

    match result {
        Ok(Outcome::Sent) => {
            tracing::info!(payment_id = %payment.id, "Payment confirmation sent");
        }
        Ok(_) => {}
        Err(NotifyError::Database(e)) => {
            tracing::error!(payment_id = %payment.id, error = %e, "Confirmation failed");
        }
        Err(NotifyError::Render(e)) => {
            tracing::error!(payment_id = %payment.id, error = %e, "Confirmation template failed");
        }
    }
}
