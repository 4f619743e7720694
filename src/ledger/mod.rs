pub mod aggregate;

use std::{str::FromStr, time::Duration};

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Pool, QueryBuilder, Sqlite,
};
use uuid::Uuid;

use crate::{
    errors::StoreError,
    models::{
        CategorySummary, DailyBalance, Kind, MonthlyBalance, NewTransaction, Transaction,
        TransactionFilter,
    },
};

const COLUMNS: &str = "id, kind, category, amount, date, installment_count, interest";

/// Append-only transaction ledger backed by SQLite.
///
/// Cloning is cheap and shares the underlying pool. The handle is opened once
/// at startup and must be released with [`Ledger::close`] on shutdown.
#[derive(Clone)]
pub struct Ledger {
    p: Pool<Sqlite>,
}

#[derive(sqlx::FromRow)]
struct Row {
    id: Uuid,
    kind: String,
    category: String,
    amount: String,
    date: NaiveDate,
    installment_count: Option<i64>,
    interest: Option<String>,
}

impl TryFrom<Row> for Transaction {
    type Error = StoreError;

    fn try_from(r: Row) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt { id: r.id, reason };

        let kind = Kind::from_str(&r.kind).map_err(|e| corrupt(e.to_string()))?;
        let amount = BigDecimal::from_str(&r.amount)
            .map_err(|e| corrupt(format!("amount `{}`: {}", r.amount, e)))?;
        let interest = match &r.interest {
            Some(v) => Some(
                BigDecimal::from_str(v).map_err(|e| corrupt(format!("interest `{}`: {}", v, e)))?,
            ),
            None => None,
        };

        Ok(Transaction {
            id: r.id,
            kind,
            category: r.category,
            amount,
            date: r.date,
            installment_count: r.installment_count,
            interest,
        })
    }
}

impl Ledger {
    /// Connects to the database at `url`, creating the file when missing.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // every connection to an in-memory database gets its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let p = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        log::info!("opened ledger at {}", url);
        Ok(Self { p })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.p
    }

    pub async fn close(&self) {
        self.p.close().await;
        log::info!("ledger closed");
    }

    pub async fn append(&self, t: &NewTransaction) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        insert(&self.p, id, t).await?;
        log::info!(
            "appended {} {} {} on {} as {}",
            t.kind,
            t.category,
            t.amount,
            t.date,
            id
        );
        Ok(id)
    }

    /// Appends every record or none of them.
    pub async fn append_all(&self, ts: &[NewTransaction]) -> Result<Vec<Uuid>, StoreError> {
        let mut tx = self.p.begin().await?;
        let mut ids = Vec::with_capacity(ts.len());

        for t in ts {
            let id = Uuid::new_v4();
            insert(&mut *tx, id, t).await?;
            ids.push(id);
        }

        tx.commit().await?;
        log::info!("appended {} transactions in one batch", ids.len());
        Ok(ids)
    }

    pub async fn list_all(&self) -> Result<Vec<Transaction>, StoreError> {
        self.list(&TransactionFilter::default()).await
    }

    /// Stored transactions matching `filter`, in storage order.
    pub async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        let mut q = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM ledger_entry WHERE 1 = 1",
            COLUMNS
        ));

        if let Some(kind) = filter.kind {
            q.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(category) = &filter.category {
            q.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(start) = filter.start_date {
            q.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            q.push(" AND date <= ").push_bind(end);
        }
        q.push(" ORDER BY seq");

        let rows = q.build_query_as::<Row>().fetch_all(&self.p).await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    pub async fn daily_balance(&self) -> Result<Vec<DailyBalance>, StoreError> {
        Ok(aggregate::daily_balance(&self.chronological().await?))
    }

    pub async fn monthly_balance(&self) -> Result<Vec<MonthlyBalance>, StoreError> {
        Ok(aggregate::monthly_balance(&self.chronological().await?))
    }

    pub async fn category_summary(&self) -> Result<Vec<CategorySummary>, StoreError> {
        Ok(aggregate::category_summary(&self.list_all().await?))
    }

    async fn chronological(&self) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query_as::<_, Row>(&format!(
            "SELECT {} FROM ledger_entry ORDER BY date, seq",
            COLUMNS
        ))
        .fetch_all(&self.p)
        .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }
}

async fn insert<'e, E>(e: E, id: Uuid, t: &NewTransaction) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO ledger_entry (id, kind, category, amount, date, installment_count, interest)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(t.kind.as_str())
    .bind(t.category.clone())
    .bind(t.amount.to_string())
    .bind(t.date)
    .bind(t.installment_count)
    .bind(t.interest.as_ref().map(|v| v.to_string()))
    .execute(e)
    .await?;
    Ok(())
}
