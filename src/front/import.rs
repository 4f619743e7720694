use std::io;

use axum::{
    extract::{Multipart, State},
    response::Redirect,
    Json,
};
use serde_json::{json, Value};

use super::AppState;
use crate::{
    errors::{ApiError, ValidationError},
    models::{NewTransaction, RawTransaction},
};

/// Reads transactions from csv with a
/// `type,category,amount,date,installment_count,interest` header.
/// The first invalid row fails the whole input.
pub fn parse_csv(s: impl io::Read) -> Result<Vec<NewTransaction>, ValidationError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(s);

    let csv_error = |err: csv::Error| ValidationError::Csv {
        line: err.position().map_or(0, |p| p.line()),
        message: err.to_string(),
    };

    let headers = rdr.headers().map_err(csv_error)?.clone();
    let mut transactions = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        let line = record.position().map_or(0, |p| p.line());

        let raw: RawTransaction = record.deserialize(Some(&headers)).map_err(csv_error)?;
        let t = NewTransaction::try_from(raw).map_err(|err| ValidationError::Csv {
            line,
            message: err.to_string(),
        })?;
        transactions.push(t);
    }

    Ok(transactions)
}

/// Parses every file field of the upload. Nothing is stored.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<NewTransaction>, ValidationError> {
    let mut batch = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ValidationError::Upload(err.body_text()))?
    {
        let file_name = field.file_name().unwrap_or("<unnamed>").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ValidationError::Upload(err.body_text()))?;

        let parsed = parse_csv(bytes.as_ref())?;
        log::info!("parsed {} transactions from {}", parsed.len(), file_name);
        batch.extend(parsed);
    }

    Ok(batch)
}

async fn store(s: &AppState, multipart: Multipart) -> Result<usize, ApiError> {
    let batch = read_upload(multipart).await?;
    let ids = s.ledger.append_all(&batch).await?;
    log::info!("{} records were loaded to the ledger", ids.len());
    Ok(ids.len())
}

#[axum_macros::debug_handler]
pub async fn api_import(
    State(s): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let imported = store(&s, multipart).await?;
    Ok(Json(json!({ "imported": imported })))
}

/// Dashboard variant of [`api_import`], sends the browser back to `/`.
pub async fn import_form(
    State(s): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, ApiError> {
    store(&s, multipart).await?;
    Ok(Redirect::to("/"))
}
