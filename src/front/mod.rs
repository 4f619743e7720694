pub mod api;
pub mod components;
pub mod import;
pub mod template;

use std::path::Path;

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::{
    errors::ApiError,
    ledger::Ledger,
    models::{
        CategorySummary, DailyBalance, MonthlyBalance, NewTransaction, RawTransaction,
        Transaction,
    },
};
use components::filter;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub t: template::Template,
}

pub fn router(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/transactions/new", post(add_transaction_form))
        .route("/transactions/import", post(import::import_form))
        .route("/add_transaction", post(api::add_transaction))
        .route("/get_transactions", get(api::get_transactions))
        .route("/get_daily_balance", get(api::get_daily_balance))
        .route("/get_monthly_balance", get(api::get_monthly_balance))
        .route("/get_summary", get(api::get_summary))
        .route("/api/import", post(import::api_import))
        .nest_service("/public", ServeDir::new(public_dir))
        .with_state(state)
}

/// Serves until Ctrl-C, then lets in-flight requests finish.
pub async fn start_web_server(
    listener: TcpListener,
    state: AppState,
    public_dir: &Path,
) -> anyhow::Result<()> {
    log::info!("open website at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state, public_dir))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("cannot listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    log::info!("shutdown requested");
}

async fn index(
    State(s): State<AppState>,
    Query(q): Query<filter::Query>,
) -> Result<Html<String>, ApiError> {
    let filter = q.normalize()?;

    #[derive(Serialize)]
    struct Ctx {
        filter: filter::Query,
        transactions: Vec<Transaction>,
        summary: Vec<CategorySummary>,
        daily: Vec<DailyBalance>,
        monthly: Vec<MonthlyBalance>,
    }

    let ctx = Ctx {
        transactions: s.ledger.list(&filter).await?,
        summary: s.ledger.category_summary().await?,
        daily: s.ledger.daily_balance().await?,
        monthly: s.ledger.monthly_balance().await?,
        filter: q,
    };

    Ok(s.t.render("index.hbs", &ctx)?)
}

#[axum::debug_handler]
async fn add_transaction_form(
    State(s): State<AppState>,
    Form(raw): Form<RawTransaction>,
) -> Result<Redirect, ApiError> {
    let t = NewTransaction::try_from(raw)?;
    s.ledger.append(&t).await?;
    Ok(Redirect::to("/"))
}
