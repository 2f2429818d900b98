//! End-to-end flow tests against a live Postgres instance.
//!
//! Run with a disposable database:
//!   DATABASE_URL=postgres://localhost/caja_test cargo test -- --ignored

use chrono::{Days, Local, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use caja::db;
use caja::error::AppError;
use caja::models::cash_cut::{CashCut, CreateCashCutData};
use caja::models::payment::{CreatePaymentData, PaymentRecord, PaymentStatus};
use caja::models::student::{CreateStudentData, Student};
use caja::services::eligibility::{self, DateRange};
use caja::services::{ledger, overdue};

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = db::create_pool(&url).await.expect("connect");
    db::run_migrations(&pool).await.expect("migrate");
    sqlx::query("TRUNCATE payments, cash_cuts, students CASCADE")
        .execute(&pool)
        .await
        .expect("truncate");
    pool
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange {
        start_date: date(start),
        end_date: date(end),
    }
}

async fn student(pool: &PgPool) -> Student {
    Student::create(
        pool,
        CreateStudentData {
            first_name: "Ana".to_string(),
            last_name: "Torres".to_string(),
            email: Some("ana@example.com".to_string()),
            course: None,
        },
    )
    .await
    .unwrap()
}

async fn paid_payment(
    pool: &PgPool,
    student_id: Uuid,
    concept: &str,
    amount: Decimal,
    paid: &str,
) -> PaymentRecord {
    let payment = PaymentRecord::create(
        pool,
        CreatePaymentData {
            student_id,
            concept: concept.to_string(),
            amount,
            due_date: None,
            debt_amount: None,
            debt_description: None,
        },
    )
    .await
    .unwrap();

    PaymentRecord::mark_paid(pool, payment.id, date(paid))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
#[ignore] // Requires live Postgres
async fn cut_lifecycle_matches_worked_example() {
    let pool = test_pool().await;
    let s = student(&pool).await;

    let p1 = paid_payment(&pool, s.id, "Tuition", dec!(500), "2025-07-05").await;
    let p2 = paid_payment(&pool, s.id, "Lab Fee", dec!(300), "2025-07-20").await;
    let p3 = paid_payment(&pool, s.id, "Tuition", dec!(500), "2025-08-02").await;

    // July window sees P2, P1 (most recent first).
    let july = range("2025-07-01", "2025-07-31");
    let eligible = ledger::list_eligible_payments(&pool, july).await.unwrap();
    assert_eq!(
        eligible.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![p2.id, p1.id]
    );

    let receipt = ledger::perform_cut(&pool, july).await.unwrap();
    assert_eq!(receipt.cut.cut_number, 1);
    assert_eq!(receipt.cut.total_amount, dec!(800));
    assert_eq!(receipt.cut.payment_count, 2);
    assert_eq!(receipt.breakdown["Tuition"], dec!(500));
    assert_eq!(receipt.breakdown["Lab Fee"], dec!(300));

    // Wider window now only offers P3: P1 and P2 are covered by cut 1.
    let wide = range("2025-07-01", "2025-08-31");
    let eligible = ledger::list_eligible_payments(&pool, wide).await.unwrap();
    assert_eq!(eligible.iter().map(|p| p.id).collect::<Vec<_>>(), vec![p3.id]);

    // Cut numbers are monotonic.
    let receipt2 = ledger::perform_cut(&pool, range("2025-08-01", "2025-08-31"))
        .await
        .unwrap();
    assert_eq!(receipt2.cut.cut_number, 2);

    // Deleting a cut releases its range.
    ledger::delete_cut(&pool, receipt.cut.id).await.unwrap();
    let eligible = ledger::list_eligible_payments(&pool, wide).await.unwrap();
    assert_eq!(
        eligible.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![p2.id, p1.id]
    );

    // Double-delete is NotFound, not a crash.
    let err = ledger::delete_cut(&pool, receipt.cut.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore] // Requires live Postgres
async fn empty_eligible_set_rejects_cut_distinctly() {
    let pool = test_pool().await;

    let err = ledger::perform_cut(&pool, range("2030-01-01", "2030-01-31"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NothingToCut));

    // An empty eligible listing is a valid state, not an error.
    let eligible = ledger::list_eligible_payments(&pool, range("2030-01-01", "2030-01-31"))
        .await
        .unwrap();
    assert!(eligible.is_empty());
}

#[tokio::test]
#[ignore] // Requires live Postgres
async fn concurrent_overlapping_cuts_cannot_double_count() {
    let pool = test_pool().await;
    let s = student(&pool).await;

    let p1 = paid_payment(&pool, s.id, "Tuition", dec!(500), "2025-07-05").await;
    let p2 = paid_payment(&pool, s.id, "Lab Fee", dec!(300), "2025-07-20").await;
    let july = range("2025-07-01", "2025-07-31");

    // First cutter: same steps perform_cut takes, held open before commit so
    // a second cutter can read eligibility while this cut is still invisible.
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await
        .unwrap();
    let eligible = eligibility::list_eligible(&mut *tx, july).await.unwrap();
    assert_eq!(eligible.len(), 2);
    let number = CashCut::next_cut_number(&mut *tx).await.unwrap();
    CashCut::create(
        &mut *tx,
        CreateCashCutData {
            cut_number: number,
            start_date: july.start_date,
            end_date: july.end_date,
            total_amount: dec!(800),
            payment_count: 2,
        },
    )
    .await
    .unwrap();

    // Second cutter races on another connection. It sees the same eligible
    // set and the same next number; its insert blocks on the in-flight
    // unique index entry until the first cutter commits.
    let race = tokio::spawn({
        let pool = pool.clone();
        async move { ledger::perform_cut(&pool, july).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    tx.commit().await.unwrap();

    let second = race.await.unwrap();
    assert!(matches!(second.unwrap_err(), AppError::Conflict(_)));

    // Retrying after the conflict sees the committed cut: nothing left.
    let retry = ledger::perform_cut(&pool, july).await;
    assert!(matches!(retry.unwrap_err(), AppError::NothingToCut));

    // Exactly one cut exists and it covers P1/P2 exactly once.
    let cuts = ledger::list_recent_cuts(&pool, 10).await.unwrap();
    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].total_amount, dec!(800));

    let eligible = ledger::list_eligible_payments(&pool, july).await.unwrap();
    assert!(!eligible.iter().any(|p| p.id == p1.id || p.id == p2.id));
}

#[tokio::test]
#[ignore] // Requires live Postgres
async fn overdue_sweep_is_monotonic() {
    let pool = test_pool().await;
    let s = student(&pool).await;
    let today = Local::now().date_naive();

    let past_due = PaymentRecord::create(
        &pool,
        CreatePaymentData {
            student_id: s.id,
            concept: "Tuition".to_string(),
            amount: dec!(500),
            due_date: Some(today.checked_sub_days(Days::new(5)).unwrap()),
            debt_amount: None,
            debt_description: None,
        },
    )
    .await
    .unwrap();

    let not_due = PaymentRecord::create(
        &pool,
        CreatePaymentData {
            student_id: s.id,
            concept: "Tuition".to_string(),
            amount: dec!(500),
            due_date: Some(today.checked_add_days(Days::new(5)).unwrap()),
            debt_amount: None,
            debt_description: None,
        },
    )
    .await
    .unwrap();

    let stats = overdue::sweep_overdue(&pool, today).await.unwrap();
    assert_eq!(stats.transitioned, 1);

    let swept = PaymentRecord::find_by_id(&pool, past_due.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(swept.status, PaymentStatus::Overdue);

    let untouched = PaymentRecord::find_by_id(&pool, not_due.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.status, PaymentStatus::Pending);

    // A second sweep changes nothing: Overdue is never reverted.
    let stats = overdue::sweep_overdue(&pool, today).await.unwrap();
    assert_eq!(stats.transitioned, 0);

    // Only an explicit mark-paid moves it out of Overdue.
    let paid = PaymentRecord::mark_paid(&pool, past_due.id, today)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert_eq!(paid.paid_date, Some(today));

    // Paid is terminal for mark_paid as well.
    assert!(PaymentRecord::mark_paid(&pool, past_due.id, today)
        .await
        .unwrap()
        .is_none());
}
