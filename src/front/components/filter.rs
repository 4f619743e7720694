use serde::{Deserialize, Serialize};

use crate::{
    errors::ValidationError,
    models::{parse_date, Kind, TransactionFilter},
};

/// Filter parameters as sent by the dashboard form and the json api.
/// Empty values mean "no restriction".
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Query {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Query {
    pub fn normalize(&self) -> Result<TransactionFilter, ValidationError> {
        Ok(TransactionFilter {
            kind: non_empty(&self.kind).map(str::parse::<Kind>).transpose()?,
            category: non_empty(&self.category).map(str::to_string),
            start_date: non_empty(&self.start_date).map(parse_date).transpose()?,
            end_date: non_empty(&self.end_date).map(parse_date).transpose()?,
        })
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
