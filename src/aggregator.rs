use crate::error::{ReconciliationError, Result};
use crate::schema::{AggregatedExpenses, MonthlyAggregate, Transaction, WeeklyCategoryTotal};
use crate::utils::{week_start, MonthKey};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub struct TransactionAggregator {
    default_category: String,
}

impl TransactionAggregator {
    pub fn new(default_category: impl Into<String>) -> Self {
        Self {
            default_category: default_category.into(),
        }
    }

    fn category_for<'a>(&'a self, txn: &'a Transaction) -> &'a str {
        let trimmed = txn.category.trim();
        if trimmed.is_empty() {
            &self.default_category
        } else {
            trimmed
        }
    }

    pub fn aggregate(&self, transactions: &[Transaction]) -> Result<AggregatedExpenses> {
        validate_amounts(transactions)?;

        // BTreeMap keyed by MonthKey iterates in calendar order
        let mut by_month: BTreeMap<MonthKey, Decimal> = BTreeMap::new();
        let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();

        // Month and category totals never exceed the grand total
        let mut grand_total = Decimal::ZERO;

        for (index, txn) in transactions.iter().enumerate() {
            grand_total = grand_total
                .checked_add(txn.amount)
                .ok_or_else(|| overflow_at(index, txn))?;
            accumulate(&mut by_month, MonthKey::from_date(txn.date), txn.amount)
                .ok_or_else(|| overflow_at(index, txn))?;
            accumulate(&mut by_category, self.category_for(txn).to_string(), txn.amount)
                .ok_or_else(|| overflow_at(index, txn))?;
        }

        debug!(
            "Aggregated {} transactions into {} months and {} categories",
            transactions.len(),
            by_month.len(),
            by_category.len()
        );

        Ok(AggregatedExpenses {
            monthly: by_month
                .into_iter()
                .map(|(month, total_expense)| MonthlyAggregate {
                    month,
                    total_expense,
                })
                .collect(),
            by_category,
        })
    }

    /// Spend per (Sunday-starting week, category), ordered by week then category.
    pub fn weekly_category_totals(
        &self,
        transactions: &[Transaction],
    ) -> Result<Vec<WeeklyCategoryTotal>> {
        validate_amounts(transactions)?;

        let mut grid: BTreeMap<(NaiveDate, String), Decimal> = BTreeMap::new();
        for (index, txn) in transactions.iter().enumerate() {
            let key = (week_start(txn.date), self.category_for(txn).to_string());
            accumulate(&mut grid, key, txn.amount).ok_or_else(|| overflow_at(index, txn))?;
        }

        Ok(grid
            .into_iter()
            .map(|((week_start, category), total)| WeeklyCategoryTotal {
                week_start,
                category,
                total,
            })
            .collect())
    }
}

impl Default for TransactionAggregator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CATEGORY)
    }
}

fn validate_amounts(transactions: &[Transaction]) -> Result<()> {
    for (index, txn) in transactions.iter().enumerate() {
        if txn.amount < Decimal::ZERO {
            return Err(ReconciliationError::InvalidRecord {
                index,
                reason: format!("negative amount {}", txn.amount),
            });
        }
    }
    Ok(())
}

fn accumulate<K: Ord>(totals: &mut BTreeMap<K, Decimal>, key: K, amount: Decimal) -> Option<()> {
    let total = totals.entry(key).or_default();
    *total = total.checked_add(amount)?;
    Some(())
}

fn overflow_at(index: usize, txn: &Transaction) -> ReconciliationError {
    ReconciliationError::InvalidRecord {
        index,
        reason: format!("amount {} overflows the running expense total", txn.amount),
    }
}

pub fn aggregate_transactions(transactions: &[Transaction]) -> Result<AggregatedExpenses> {
    TransactionAggregator::default().aggregate(transactions)
}
