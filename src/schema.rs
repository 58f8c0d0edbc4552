use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Diagnostic, ReconciliationError};
use crate::utils::{checked_sum, MonthKey};

/// A single expense as read from the persistence snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub date: NaiveDate,
    #[serde(default)]
    pub category: String,
    /// Expense magnitude. Negative values are rejected by the aggregator.
    pub amount: Decimal,
}

/// Summed category spend over the whole snapshot.
pub type CategoryTotals = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyAggregate {
    pub month: MonthKey,
    pub total_expense: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyCategoryTotal {
    /// Sunday that starts the week.
    pub week_start: NaiveDate,
    pub category: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AggregatedExpenses {
    pub monthly: Vec<MonthlyAggregate>,
    pub by_category: CategoryTotals,
}

impl AggregatedExpenses {
    /// `None` if the monthly totals overflow when summed, which
    /// `TransactionAggregator::aggregate` never produces.
    pub fn total_expenses(&self) -> Option<Decimal> {
        checked_sum(self.monthly.iter().map(|m| m.total_expense))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlySavings {
    pub month: MonthKey,
    /// `income - total_expense`; negative when the month overspent.
    pub value: Decimal,
}

/// Row of the "savings vs expenses" comparison for the most recent months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsComparison {
    pub month: MonthKey,
    pub savings: Decimal,
    pub expenses: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PointKind {
    /// Derived from recorded transactions
    Past,
    /// Produced by the forecasting collaborator
    Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsPoint {
    pub month: MonthKey,
    pub kind: PointKind,
    pub value: Decimal,
}

/// Past and forecast savings in strictly ascending calendar order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ReconciledSeries {
    points: Vec<SavingsPoint>,
}

impl ReconciledSeries {
    /// Callers must supply points already sorted with unique months.
    pub(crate) fn from_sorted(points: Vec<SavingsPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[SavingsPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavingsPoint> {
        self.points.iter()
    }

    pub fn past(&self) -> impl Iterator<Item = &SavingsPoint> {
        self.points.iter().filter(|p| p.kind == PointKind::Past)
    }

    pub fn forecast(&self) -> impl Iterator<Item = &SavingsPoint> {
        self.points.iter().filter(|p| p.kind == PointKind::Forecast)
    }

    pub fn get(&self, month: MonthKey) -> Option<&SavingsPoint> {
        self.points
            .binary_search_by(|p| p.month.cmp(&month))
            .ok()
            .map(|idx| &self.points[idx])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsMetrics {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_savings: Decimal,
    /// Sum of the first forecast points, at most the configured window.
    pub forecast_sum: Decimal,
    /// How many forecast points `forecast_sum` covers.
    pub forecast_points: usize,
    pub summary: String,
    pub advice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl std::str::FromStr for RiskProfile {
    type Err = ReconciliationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(ReconciliationError::InvalidConfig(format!(
                "Unknown risk profile '{}'. Expected Conservative, Balanced or Aggressive",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssetAllocation {
    pub name: String,
    pub amount: Decimal,
    /// Share of the class allocation, 0 when the allocation is 0.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllocationClass {
    pub name: String,
    pub allocation_amount: Decimal,
    pub top_assets: Vec<AssetAllocation>,
}

impl AllocationClass {
    /// `None` if the asset amounts overflow when summed.
    pub fn asset_total(&self) -> Option<Decimal> {
        checked_sum(self.top_assets.iter().map(|a| a.amount))
    }
}

/// Node of the class/asset tree used by hierarchical charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllocationNode {
    pub name: String,
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AllocationNode>,
}

impl AllocationNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassShare {
    pub name: String,
    pub allocation_amount: Decimal,
    /// Share of the grand total across all classes.
    pub share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllocationReport {
    pub breakdown: Vec<AllocationClass>,
    pub hierarchy: AllocationNode,
    pub class_totals: Vec<ClassShare>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AllocationReport {
    pub fn total_allocation(&self) -> Decimal {
        self.hierarchy.value
    }

    pub fn is_consistent(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AllocationReport)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsOverview {
    pub monthly_expenses: Vec<MonthlyAggregate>,
    pub expense_by_category: CategoryTotals,
    pub weekly_category_totals: Vec<WeeklyCategoryTotal>,
    pub past_savings: Vec<MonthlySavings>,
    pub recent_comparison: Vec<SavingsComparison>,
    pub series: ReconciledSeries,
    pub metrics: SavingsMetrics,
    pub diagnostics: Vec<Diagnostic>,
}

impl SavingsOverview {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SavingsOverview)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
