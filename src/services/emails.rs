use askama::Template;

use crate::models::{PaymentRecord, Student};
use crate::services::mailer::EmailMessage;

#[derive(Template)]
#[template(path = "payment_reminder.html")]
struct ReminderTemplate<'a> {
    school_name: &'a str,
    student_name: &'a str,
    concept: &'a str,
    amount: String,
    due_date: String,
}

#[derive(Template)]
#[template(path = "overdue_notice.html")]
struct OverdueTemplate<'a> {
    school_name: &'a str,
    student_name: &'a str,
    concept: &'a str,
    amount: String,
    due_date: String,
}

#[derive(Template)]
#[template(path = "payment_receipt.html")]
struct ReceiptTemplate<'a> {
    school_name: &'a str,
    student_name: &'a str,
    concept: &'a str,
    amount: String,
    paid_date: String,
}

fn format_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn reminder_email(
    school_name: &str,
    student: &Student,
    payment: &PaymentRecord,
    to: String,
) -> Result<EmailMessage, askama::Error> {
    let student_name = student.full_name();
    let html = ReminderTemplate {
        school_name,
        student_name: &student_name,
        concept: &payment.concept,
        amount: payment.amount.to_string(),
        due_date: format_date(payment.due_date),
    }
    .render()?;

    Ok(EmailMessage {
        to,
        subject: format!("Payment reminder: {}", payment.concept),
        html,
    })
}

pub fn overdue_email(
    school_name: &str,
    student: &Student,
    payment: &PaymentRecord,
    to: String,
) -> Result<EmailMessage, askama::Error> {
    let student_name = student.full_name();
    let html = OverdueTemplate {
        school_name,
        student_name: &student_name,
        concept: &payment.concept,
        amount: payment.amount.to_string(),
        due_date: format_date(payment.due_date),
    }
    .render()?;

    Ok(EmailMessage {
        to,
        subject: format!("Overdue payment: {}", payment.concept),
        html,
    })
}

pub fn receipt_email(
    school_name: &str,
    student: &Student,
    payment: &PaymentRecord,
    to: String,
) -> Result<EmailMessage, askama::Error> {
    let student_name = student.full_name();
    let html = ReceiptTemplate {
        school_name,
        student_name: &student_name,
        concept: &payment.concept,
        amount: payment.amount.to_string(),
        paid_date: format_date(payment.paid_date),
    }
    .render()?;

    Ok(EmailMessage {
        to,
        subject: format!("Payment received: {}", payment.concept),
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn student() -> Student {
        Student {
            id: Uuid::new_v4(),
            first_name: "Ana".to_string(),
            last_name: "Torres".to_string(),
            email: Some("ana@example.com".to_string()),
            course: None,
            created_at: Utc::now(),
        }
    }

    fn payment() -> PaymentRecord {
        PaymentRecord {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            concept: "Tuition".to_string(),
            amount: dec!(500.00),
            status: PaymentStatus::Pending,
            due_date: Some("2025-08-15".parse().unwrap()),
            paid_date: None,
            debt_amount: None,
            debt_description: None,
            reminder_sent: None,
            overdue_notification_sent: None,
            confirmation_sent: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reminder_email_renders_payment_details() {
        let email = reminder_email("Colegio Norte", &student(), &payment(), "ana@example.com".into())
            .unwrap();

        assert_eq!(email.to, "ana@example.com");
        assert!(email.subject.contains("Tuition"));
        assert!(email.html.contains("Ana Torres"));
        assert!(email.html.contains("500.00"));
        assert!(email.html.contains("2025-08-15"));
        assert!(email.html.contains("Colegio Norte"));
    }

    #[test]
    fn receipt_email_uses_paid_date() {
        let mut paid = payment();
        paid.status = PaymentStatus::Paid;
        paid.paid_date = Some("2025-08-10".parse().unwrap());

        let email =
            receipt_email("Colegio Norte", &student(), &paid, "ana@example.com".into()).unwrap();
        assert!(email.html.contains("2025-08-10"));
        assert!(email.subject.contains("Payment received"));
    }
}
