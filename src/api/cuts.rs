use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::Result;
use crate::models::{CashCut, PaymentRecord};
use crate::services::eligibility::DateRange;
use crate::services::ledger::{self, CutReceipt};

async fn list_eligible(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<PaymentRecord>>> {
    let payments = ledger::list_eligible_payments(&state.pool, range).await?;
    Ok(Json(payments))
}

async fn perform_cut(
    State(state): State<AppState>,
    Json(range): Json<DateRange>,
) -> Result<Json<CutReceipt>> {
    let receipt = ledger::perform_cut(&state.pool, range).await?;
    Ok(Json(receipt))
}

async fn delete_cut(
    State(state): State<AppState>,
    Path(cut_id): Path<Uuid>,
) -> Result<StatusCode> {
    ledger::delete_cut(&state.pool, cut_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct RecentCutsQuery {
    limit: Option<i64>,
}

async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentCutsQuery>,
) -> Result<Json<Vec<CashCut>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let cuts = ledger::list_recent_cuts(&state.pool, limit).await?;
    Ok(Json(cuts))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cuts", get(list_recent).post(perform_cut))
        .route("/cuts/eligible", get(list_eligible))
        .route("/cuts/:id", axum::routing::delete(delete_cut))
}
