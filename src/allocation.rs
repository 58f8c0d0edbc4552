use crate::collaborators::ClassAllocation;
use crate::error::{Diagnostic, ReconciliationError, Result, Severity};
use crate::schema::{AllocationClass, AllocationNode, AllocationReport, AssetAllocation, ClassShare};
use crate::utils::checked_sum;
use log::warn;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub const HIERARCHY_ROOT: &str = "Portfolio";

/// Turns an optimizer class map into an annotated breakdown plus chart views.
pub struct AllocationReconciler {
    tolerance: Decimal,
}

impl AllocationReconciler {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    /// Values outside the `Decimal` range (negative amounts, totals or
    /// percentages that overflow) make the payload `AllocationUnavailable`.
    pub fn reconcile(&self, allocations: &BTreeMap<String, ClassAllocation>) -> Result<AllocationReport> {
        validate_non_negative(allocations)?;

        let mut diagnostics = Vec::new();
        let mut breakdown = Vec::with_capacity(allocations.len());
        for (name, class) in allocations {
            let annotated = annotate_class(name, class)?;
            if let Some(diagnostic) = self.check_consistency(&annotated)? {
                diagnostics.push(diagnostic);
            }
            breakdown.push(annotated);
        }

        breakdown.sort_by(|a, b| {
            b.allocation_amount
                .cmp(&a.allocation_amount)
                .then_with(|| a.name.cmp(&b.name))
        });

        let hierarchy = build_hierarchy(&breakdown)?;
        let class_totals = flatten_classes(&breakdown)?;

        Ok(AllocationReport {
            breakdown,
            hierarchy,
            class_totals,
            diagnostics,
        })
    }

    /// Top assets may be truncated but must not exceed the class allocation.
    fn check_consistency(&self, class: &AllocationClass) -> Result<Option<Diagnostic>> {
        let asset_total = class.asset_total().ok_or_else(|| {
            ReconciliationError::AllocationUnavailable(format!(
                "top assets of class '{}' overflow when summed",
                class.name
            ))
        })?;

        // A limit beyond the Decimal range cannot be exceeded
        let limit = Decimal::ONE
            .checked_add(self.tolerance)
            .and_then(|factor| factor.checked_mul(class.allocation_amount));
        let within_limit = match limit {
            Some(limit) => asset_total <= limit,
            None => true,
        };
        if within_limit {
            return Ok(None);
        }

        warn!(
            "Allocation class '{}' top assets sum to {} which exceeds allocation {}",
            class.name, asset_total, class.allocation_amount
        );
        let err = ReconciliationError::AllocationInconsistent {
            class: class.name.clone(),
            asset_total,
            allocation: class.allocation_amount,
        };
        Ok(Some(err.to_diagnostic(Severity::Warning)))
    }
}

impl Default for AllocationReconciler {
    fn default() -> Self {
        Self::new(Decimal::new(1, 6))
    }
}

fn validate_non_negative(allocations: &BTreeMap<String, ClassAllocation>) -> Result<()> {
    for (name, class) in allocations {
        if class.allocation < Decimal::ZERO {
            return Err(ReconciliationError::AllocationUnavailable(format!(
                "class '{}' has negative allocation {}",
                name, class.allocation
            )));
        }
        if let Some((asset, amount)) = class.top_assets.iter().find(|(_, v)| **v < Decimal::ZERO) {
            return Err(ReconciliationError::AllocationUnavailable(format!(
                "asset '{}' in class '{}' has negative amount {}",
                asset, name, amount
            )));
        }
    }
    Ok(())
}

/// `amount` as a percentage of `whole`: 0 when `whole` is 0, `None` when the
/// ratio does not fit in a `Decimal`.
pub fn percentage_of(amount: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return Some(Decimal::ZERO);
    }
    amount
        .checked_div(whole)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

fn annotate_class(name: &str, class: &ClassAllocation) -> Result<AllocationClass> {
    let mut top_assets = Vec::with_capacity(class.top_assets.len());
    for (asset, amount) in &class.top_assets {
        let percentage = percentage_of(*amount, class.allocation).ok_or_else(|| {
            ReconciliationError::AllocationUnavailable(format!(
                "asset '{}' ({}) is out of range against class '{}' allocation {}",
                asset, amount, name, class.allocation
            ))
        })?;
        top_assets.push(AssetAllocation {
            name: asset.clone(),
            amount: *amount,
            percentage,
        });
    }

    top_assets.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));

    Ok(AllocationClass {
        name: name.to_string(),
        allocation_amount: class.allocation,
        top_assets,
    })
}

fn grand_total(breakdown: &[AllocationClass]) -> Result<Decimal> {
    checked_sum(breakdown.iter().map(|c| c.allocation_amount)).ok_or_else(|| {
        ReconciliationError::AllocationUnavailable(
            "class allocations overflow when summed".to_string(),
        )
    })
}

/// Root value and class node values are class allocations, so the tree total
/// always equals the flattened view's total. Leaves carry asset amounts.
pub fn build_hierarchy(breakdown: &[AllocationClass]) -> Result<AllocationNode> {
    let children: Vec<AllocationNode> = breakdown
        .iter()
        .map(|class| AllocationNode {
            name: class.name.clone(),
            value: class.allocation_amount,
            children: class
                .top_assets
                .iter()
                .map(|asset| AllocationNode {
                    name: asset.name.clone(),
                    value: asset.amount,
                    children: Vec::new(),
                })
                .collect(),
        })
        .collect();

    Ok(AllocationNode {
        name: HIERARCHY_ROOT.to_string(),
        value: grand_total(breakdown)?,
        children,
    })
}

pub fn flatten_classes(breakdown: &[AllocationClass]) -> Result<Vec<ClassShare>> {
    let total = grand_total(breakdown)?;
    breakdown
        .iter()
        .map(|class| {
            let share = percentage_of(class.allocation_amount, total).ok_or_else(|| {
                ReconciliationError::AllocationUnavailable(format!(
                    "share of class '{}' is out of range",
                    class.name
                ))
            })?;
            Ok(ClassShare {
                name: class.name.clone(),
                allocation_amount: class.allocation_amount,
                share,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReasonCode;
    use rust_decimal_macros::dec;

    fn class(allocation: Decimal, assets: &[(&str, Decimal)]) -> ClassAllocation {
        ClassAllocation {
            allocation,
            top_assets: assets
                .iter()
                .map(|(name, amount)| (name.to_string(), *amount))
                .collect(),
        }
    }

    fn asset<'a>(report: &'a AllocationReport, class: &str, asset: &str) -> &'a AssetAllocation {
        report
            .breakdown
            .iter()
            .find(|c| c.name == class)
            .and_then(|c| c.top_assets.iter().find(|a| a.name == asset))
            .unwrap()
    }

    #[test]
    fn test_overshoot_flagged_but_breakdown_kept() {
        let mut input = BTreeMap::new();
        input.insert(
            "stocks".to_string(),
            class(dec!(1000), &[("AAPL", dec!(600)), ("MSFT", dec!(500))]),
        );

        let report = AllocationReconciler::default().reconcile(&input).unwrap();

        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].code, ReasonCode::AllocationInconsistent);
        assert_eq!(report.diagnostics[0].severity, Severity::Warning);
        assert!(!report.is_consistent());

        // Percentages are relative to the class allocation, not the asset sum
        assert_eq!(asset(&report, "stocks", "AAPL").percentage, dec!(60));
        assert_eq!(asset(&report, "stocks", "MSFT").percentage, dec!(50));
        assert_eq!(asset(&report, "stocks", "AAPL").amount, dec!(600));
    }

    #[test]
    fn test_truncated_top_assets_are_consistent() {
        let mut input = BTreeMap::new();
        input.insert(
            "bonds".to_string(),
            class(dec!(750), &[("BND", dec!(300)), ("AGG", dec!(150))]),
        );

        let report = AllocationReconciler::default().reconcile(&input).unwrap();
        assert!(report.is_consistent());
        assert_eq!(asset(&report, "bonds", "BND").percentage, dec!(40));
        assert_eq!(asset(&report, "bonds", "AGG").percentage, dec!(20));
    }

    #[test]
    fn test_rounding_slack_within_tolerance() {
        let mut input = BTreeMap::new();
        input.insert(
            "crypto".to_string(),
            class(dec!(1000.00), &[("BTC", dec!(666.67)), ("ETH", dec!(333.3305))]),
        );

        let report = AllocationReconciler::default().reconcile(&input).unwrap();
        assert!(report.is_consistent());
    }

    #[test]
    fn test_zero_allocation_reports_zero_percent() {
        let mut input = BTreeMap::new();
        input.insert("gold".to_string(), class(Decimal::ZERO, &[("GLD", Decimal::ZERO)]));

        let report = AllocationReconciler::default().reconcile(&input).unwrap();
        assert_eq!(asset(&report, "gold", "GLD").percentage, Decimal::ZERO);
        assert!(report.is_consistent());

        // Positive assets under a zero allocation still get 0%, but are flagged
        let mut input = BTreeMap::new();
        input.insert("gold".to_string(), class(Decimal::ZERO, &[("GLD", dec!(5))]));
        let report = AllocationReconciler::default().reconcile(&input).unwrap();
        assert_eq!(asset(&report, "gold", "GLD").percentage, Decimal::ZERO);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_views_share_the_same_total() {
        let mut input = BTreeMap::new();
        input.insert(
            "stocks".to_string(),
            class(dec!(1750), &[("AAPL", dec!(900)), ("NVDA", dec!(850))]),
        );
        input.insert("gold".to_string(), class(dec!(500), &[("GLD", dec!(500))]));
        input.insert(
            "bonds".to_string(),
            class(dec!(750), &[("BND", dec!(400))]),
        );

        let report = AllocationReconciler::default().reconcile(&input).unwrap();

        let flattened_total: Decimal = report.class_totals.iter().map(|c| c.allocation_amount).sum();
        assert_eq!(report.hierarchy.value, flattened_total);
        assert_eq!(report.total_allocation(), dec!(3000));

        assert_eq!(report.hierarchy.name, HIERARCHY_ROOT);
        assert_eq!(report.hierarchy.children.len(), 3);
        assert!(report.hierarchy.children[0].children.iter().all(|n| n.is_leaf()));

        let shares: Decimal = report.class_totals.iter().map(|c| c.share).sum();
        assert_eq!(shares.round_dp(10), dec!(100));
    }

    #[test]
    fn test_ordering_by_amount_then_name() {
        let mut input = BTreeMap::new();
        input.insert("mutual".to_string(), class(dec!(500), &[]));
        input.insert("bonds".to_string(), class(dec!(500), &[]));
        input.insert(
            "stocks".to_string(),
            class(dec!(900), &[("MSFT", dec!(300)), ("AAPL", dec!(300)), ("NVDA", dec!(400))]),
        );

        let report = AllocationReconciler::default().reconcile(&input).unwrap();
        let names: Vec<&str> = report.breakdown.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["stocks", "bonds", "mutual"]);

        let assets: Vec<&str> = report.breakdown[0]
            .top_assets
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(assets, vec!["NVDA", "AAPL", "MSFT"]);
    }

    #[test]
    fn test_negative_values_are_rejected() {
        let mut input = BTreeMap::new();
        input.insert("stocks".to_string(), class(dec!(-1), &[]));
        let err = AllocationReconciler::default().reconcile(&input).unwrap_err();
        assert_eq!(err.code(), ReasonCode::AllocationUnavailable);

        let mut input = BTreeMap::new();
        input.insert("stocks".to_string(), class(dec!(100), &[("AAPL", dec!(-3))]));
        let err = AllocationReconciler::default().reconcile(&input).unwrap_err();
        assert_eq!(err.code(), ReasonCode::AllocationUnavailable);
    }

    #[test]
    fn test_tiny_class_allocation_is_unavailable() {
        let mut input = BTreeMap::new();
        input.insert(
            "stocks".to_string(),
            class(Decimal::new(1, 20), &[("AAPL", dec!(10000000000))]),
        );

        let err = AllocationReconciler::default().reconcile(&input).unwrap_err();
        assert_eq!(err.code(), ReasonCode::AllocationUnavailable);
        assert!(err.to_string().contains("AAPL"));
    }

    #[test]
    fn test_oversized_totals_are_unavailable() {
        let mut input = BTreeMap::new();
        input.insert("stocks".to_string(), class(Decimal::MAX, &[]));
        input.insert("bonds".to_string(), class(Decimal::MAX, &[]));
        let err = AllocationReconciler::default().reconcile(&input).unwrap_err();
        assert_eq!(err.code(), ReasonCode::AllocationUnavailable);

        let mut input = BTreeMap::new();
        input.insert(
            "crypto".to_string(),
            class(Decimal::MAX, &[("BTC", Decimal::MAX), ("ETH", Decimal::MAX)]),
        );
        let err = AllocationReconciler::default().reconcile(&input).unwrap_err();
        assert_eq!(err.code(), ReasonCode::AllocationUnavailable);
    }

    #[test]
    fn test_limit_beyond_range_is_consistent() {
        let mut input = BTreeMap::new();
        input.insert(
            "stocks".to_string(),
            class(Decimal::MAX, &[("VTI", Decimal::MAX)]),
        );
        let report = AllocationReconciler::default().reconcile(&input).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.breakdown[0].top_assets[0].percentage, dec!(100));
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(dec!(25), dec!(200)), Some(dec!(12.5)));
        assert_eq!(percentage_of(dec!(25), Decimal::ZERO), Some(Decimal::ZERO));
        assert_eq!(percentage_of(Decimal::MAX, Decimal::new(1, 20)), None);
    }

    #[test]
    fn test_empty_response() {
        let report = AllocationReconciler::default().reconcile(&BTreeMap::new()).unwrap();
        assert!(report.breakdown.is_empty());
        assert_eq!(report.hierarchy.value, Decimal::ZERO);
        assert!(report.class_totals.is_empty());
    }
}
