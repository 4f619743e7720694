use std::{fmt, str::FromStr};

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MONTH_FORMAT: &str = "%Y-%m";

/// Direction of a transaction. Income adds to the balance, expense subtracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Receita,
    Despesa,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Receita => "receita",
            Kind::Despesa => "despesa",
        }
    }

    /// `amount` as it contributes to the running balance.
    pub fn signed(&self, amount: &BigDecimal) -> BigDecimal {
        match self {
            Kind::Receita => amount.clone(),
            Kind::Despesa => -amount.clone(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "receita" => Ok(Kind::Receita),
            "despesa" => Ok(Kind::Despesa),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        String::deserialize(d)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub category: String,
    #[serde(with = "decimal")]
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub installment_count: Option<i64>,
    #[serde(default, with = "decimal::option")]
    pub interest: Option<BigDecimal>,
}

/// A transaction as submitted by a client, before the ledger assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: Kind,
    #[serde(deserialize_with = "trimmed")]
    pub category: String,
    #[serde(with = "decimal")]
    pub amount: BigDecimal,
    pub date: NaiveDate,
    #[serde(default, with = "count")]
    pub installment_count: Option<i64>,
    #[serde(default, with = "decimal::option")]
    pub interest: Option<BigDecimal>,
}

impl NewTransaction {
    pub fn new(kind: Kind, category: impl Into<String>, amount: BigDecimal, date: NaiveDate) -> Self {
        Self {
            kind,
            category: category.into(),
            amount,
            date,
            installment_count: None,
            interest: None,
        }
    }
}

/// Untyped transaction fields as they come from html forms and csv files,
/// where an empty string stands for an absent value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub installment_count: String,
    #[serde(default)]
    pub interest: String,
}

impl TryFrom<RawTransaction> for NewTransaction {
    type Error = ValidationError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let kind = required("type", &raw.kind)?.parse::<Kind>()?;
        let category = required("category", &raw.category)?.to_string();
        let amount = decimal::parse("amount", required("amount", &raw.amount)?)?;
        let date = parse_date(required("date", &raw.date)?)?;

        let installment_count = match raw.installment_count.trim() {
            "" => None,
            v => Some(v.parse::<i64>().map_err(|_| ValidationError::InvalidNumber {
                field: "installment_count",
                value: v.to_string(),
            })?),
        };
        let interest = match raw.interest.trim() {
            "" => None,
            v => Some(decimal::parse("interest", v)?),
        };

        Ok(Self {
            kind,
            category,
            amount,
            date,
            installment_count,
            interest,
        })
    }
}

fn trimmed<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(String::deserialize(d)?.trim().to_string())
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    match value.trim() {
        "" => Err(ValidationError::MissingField(field)),
        v => Ok(v),
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

/// Restricts a transaction listing. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<Kind>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Cumulative balance after the last transaction of `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBalance {
    pub date: NaiveDate,
    #[serde(with = "decimal")]
    pub balance: BigDecimal,
}

/// Cumulative balance after the last transaction of `month` (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub month: String,
    #[serde(with = "decimal")]
    pub balance: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    #[serde(with = "decimal")]
    pub receita_total: BigDecimal,
    #[serde(with = "decimal")]
    pub despesa_total: BigDecimal,
}

impl CategorySummary {
    pub fn empty(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            receita_total: BigDecimal::zero(),
            despesa_total: BigDecimal::zero(),
        }
    }
}

/// Serde glue for `BigDecimal` amounts: written as json numbers, read from
/// json numbers or numeric strings.
pub mod decimal {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};

    use crate::errors::ValidationError;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(serde_json::Number),
        Text(String),
    }

    /// Largest accepted number of integer digits.
    const MAX_INTEGER_DIGITS: i64 = 15;
    /// Largest accepted number of fractional digits.
    const MAX_SCALE: i64 = 20;

    /// Parses a decimal that is written back as a json number, so it must
    /// stay well inside the f64 range and carry a bounded number of digits.
    pub fn parse(field: &'static str, s: &str) -> Result<BigDecimal, ValidationError> {
        let invalid = || ValidationError::InvalidNumber {
            field,
            value: s.to_string(),
        };

        let value = BigDecimal::from_str(s.trim()).map_err(|_| invalid())?;
        let (int, scale) = value.as_bigint_and_exponent();
        let digits = int.magnitude().to_string().len() as i64;

        if scale > MAX_SCALE || digits - scale > MAX_INTEGER_DIGITS {
            return Err(invalid());
        }
        Ok(value)
    }

    pub fn serialize<S: Serializer>(value: &BigDecimal, s: S) -> Result<S::Ok, S::Error> {
        serde_json::Number::from_str(&value.to_string())
            .map_err(ser::Error::custom)?
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigDecimal, D::Error> {
        let text = match Raw::deserialize(d)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(t) => t,
        };
        parse("amount", &text).map_err(de::Error::custom)
    }

    pub mod option {
        use bigdecimal::BigDecimal;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        use super::Raw;

        struct Json<'a>(&'a BigDecimal);

        impl Serialize for Json<'_> {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                super::serialize(self.0, s)
            }
        }

        pub fn serialize<S: Serializer>(value: &Option<BigDecimal>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => s.serialize_some(&Json(v)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<BigDecimal>, D::Error> {
            let text = match Option::<Raw>::deserialize(d)? {
                None => return Ok(None),
                Some(Raw::Number(n)) => n.to_string(),
                Some(Raw::Text(t)) if t.trim().is_empty() => return Ok(None),
                Some(Raw::Text(t)) => t,
            };
            super::parse("interest", &text)
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}

/// Serde glue for optional integer fields that browsers send as strings.
mod count {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Integer(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
        value.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Integer(v)) => Ok(Some(v)),
            Some(Raw::Text(t)) if t.trim().is_empty() => Ok(None),
            Some(Raw::Text(t)) => t
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid installment count `{t}`"))),
        }
    }
}
