use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde_json::{json, Value};

use super::{components::filter, AppState};
use crate::{
    errors::{ApiError, ValidationError},
    models::{CategorySummary, DailyBalance, MonthlyBalance, NewTransaction, Transaction},
};

pub async fn add_transaction(
    State(s): State<AppState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(t) = payload.map_err(|err| ValidationError::Body(err.body_text()))?;
    let id = s.ledger.append(&t).await?;

    Ok(Json(json!({
        "message": "Transaction added successfully",
        "id": id,
    })))
}

pub async fn get_transactions(
    State(s): State<AppState>,
    Query(q): Query<filter::Query>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let filter = q.normalize()?;
    Ok(Json(s.ledger.list(&filter).await?))
}

pub async fn get_daily_balance(
    State(s): State<AppState>,
) -> Result<Json<Vec<DailyBalance>>, ApiError> {
    Ok(Json(s.ledger.daily_balance().await?))
}

pub async fn get_monthly_balance(
    State(s): State<AppState>,
) -> Result<Json<Vec<MonthlyBalance>>, ApiError> {
    Ok(Json(s.ledger.monthly_balance().await?))
}

pub async fn get_summary(
    State(s): State<AppState>,
) -> Result<Json<Vec<CategorySummary>>, ApiError> {
    Ok(Json(s.ledger.category_summary().await?))
}
