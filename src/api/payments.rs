use axum::{
    extract::{Path, Query, State},
    routing::post,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::jobs::notification_scan;
use crate::models::payment::{CreatePaymentData, PaymentRecord};
use crate::services::notifier;

async fn create_payment(
    State(state): State<AppState>,
    Json(data): Json<CreatePaymentData>,
) -> Result<Json<PaymentRecord>> {
    if data.amount <= rust_decimal::Decimal::ZERO {
        return Err(AppError::Validation("amount must be positive".to_string()));
    }
    if data.concept.trim().is_empty() {
        return Err(AppError::Validation("concept must not be empty".to_string()));
    }

    let payment = PaymentRecord::create(&state.pool, data).await?;
    tracing::info!(payment_id = %payment.id, "Payment registered");

    Ok(Json(payment))
}

#[derive(Deserialize)]
struct ListPaymentsQuery {
    student_id: Uuid,
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<Vec<PaymentRecord>>> {
    let payments = PaymentRecord::list_by_student(&state.pool, query.student_id).await?;
    Ok(Json(payments))
}

#[derive(Deserialize)]
struct MarkPaidBody {
    paid_date: Option<NaiveDate>,
}

/// Marks a payment paid and dispatches the confirmation receipt
/// best-effort: a provider failure is logged, the payment stays paid.
async fn mark_paid(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(body): Json<MarkPaidBody>,
) -> Result<Json<PaymentRecord>> {
    let paid_date = body.paid_date.unwrap_or_else(|| Local::now().date_naive());

    let payment = PaymentRecord::mark_paid(&state.pool, payment_id, paid_date)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "payment {} not found or already paid",
                payment_id
            ))
        })?;

    tracing::info!(payment_id = %payment.id, paid_date = %paid_date, "Payment marked paid");

    notifier::send_payment_confirmation(
        &state.pool,
        state.mailer.as_ref(),
        &state.config.school_name,
        &payment,
    )
    .await;

    Ok(Json(payment))
}

/// One-shot interactive trigger of the same sweep + scan the scheduler runs.
async fn trigger_scan(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    notification_scan::run(&state.pool, state.mailer.clone(), &state.config).await;
    Ok(Json(serde_json::json!({ "status": "completed" })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments", post(create_payment).get(list_payments))
        .route("/payments/:id/paid", post(mark_paid))
        .route("/jobs/notification-scan", post(trigger_scan))
}
