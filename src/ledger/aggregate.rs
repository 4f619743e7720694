//! Folds over the stored transactions.
//!
//! The balance folds expect their input ordered by date, ties in storage
//! order. They report the global running balance as it stands after the last
//! transaction of each period, never a per-period delta.

use std::{collections::HashMap, hash::Hash};

use bigdecimal::{BigDecimal, Zero};

use crate::models::{
    CategorySummary, DailyBalance, Kind, MonthlyBalance, Transaction, MONTH_FORMAT,
};

pub fn daily_balance(transactions: &[Transaction]) -> Vec<DailyBalance> {
    cumulative_by(transactions, |t| t.date)
        .into_iter()
        .map(|(date, balance)| DailyBalance { date, balance })
        .collect()
}

pub fn monthly_balance(transactions: &[Transaction]) -> Vec<MonthlyBalance> {
    cumulative_by(transactions, |t| t.date.format(MONTH_FORMAT).to_string())
        .into_iter()
        .map(|(month, balance)| MonthlyBalance { month, balance })
        .collect()
}

/// Income and expense totals per category, in order of first appearance.
pub fn category_summary(transactions: &[Transaction]) -> Vec<CategorySummary> {
    let mut rows: Vec<CategorySummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for t in transactions {
        let i = *index.entry(t.category.as_str()).or_insert_with(|| {
            rows.push(CategorySummary::empty(&t.category));
            rows.len() - 1
        });

        let row = &mut rows[i];
        match t.kind {
            Kind::Receita => row.receita_total += t.amount.clone(),
            Kind::Despesa => row.despesa_total += t.amount.clone(),
        }
    }

    rows
}

/// Running signed sum, sampled at the last transaction of each key. A later
/// transaction with an already seen key overwrites that key's sample.
fn cumulative_by<K, F>(transactions: &[Transaction], key: F) -> Vec<(K, BigDecimal)>
where
    K: Eq + Hash + Clone,
    F: Fn(&Transaction) -> K,
{
    let mut samples: Vec<(K, BigDecimal)> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut balance = BigDecimal::zero();

    for t in transactions {
        balance += t.kind.signed(&t.amount);
        let k = key(t);
        match index.get(&k) {
            Some(&i) => samples[i].1 = balance.clone(),
            None => {
                index.insert(k.clone(), samples.len());
                samples.push((k, balance.clone()));
            }
        }
    }

    samples
}
