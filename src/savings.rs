use crate::error::{ReconciliationError, Result};
use crate::schema::{MonthlyAggregate, MonthlySavings, SavingsComparison};
use rust_decimal::Decimal;

/// Derives monthly savings from a fixed monthly income.
#[derive(Debug, Clone, Copy)]
pub struct SavingsCalculator {
    income: Decimal,
}

impl SavingsCalculator {
    /// Fails with `MissingIncome` unless the income is present and positive.
    pub fn new(income: Option<Decimal>) -> Result<Self> {
        match income {
            None => Err(ReconciliationError::MissingIncome(
                "no income recorded for user".to_string(),
            )),
            Some(value) if value <= Decimal::ZERO => Err(ReconciliationError::MissingIncome(
                format!("income must be positive, got {}", value),
            )),
            Some(income) => Ok(Self { income }),
        }
    }

    pub fn income(&self) -> Decimal {
        self.income
    }

    pub fn calculate(&self, monthly: &[MonthlyAggregate]) -> Vec<MonthlySavings> {
        monthly
            .iter()
            .map(|m| MonthlySavings {
                month: m.month,
                value: self.income - m.total_expense,
            })
            .collect()
    }

    /// Up to `months` trailing rows pairing each month's savings with its expenses.
    pub fn recent_comparison(
        &self,
        monthly: &[MonthlyAggregate],
        months: usize,
    ) -> Vec<SavingsComparison> {
        let skip = monthly.len().saturating_sub(months);
        monthly
            .iter()
            .skip(skip)
            .map(|m| SavingsComparison {
                month: m.month,
                savings: self.income - m.total_expense,
                expenses: m.total_expense,
            })
            .collect()
    }
}

pub fn calculate_savings(
    income: Option<Decimal>,
    monthly: &[MonthlyAggregate],
) -> Result<Vec<MonthlySavings>> {
    Ok(SavingsCalculator::new(income)?.calculate(monthly))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MonthKey;
    use rust_decimal_macros::dec;

    fn aggregate(year: i32, month: u32, total: Decimal) -> MonthlyAggregate {
        MonthlyAggregate {
            month: MonthKey::new(year, month).unwrap(),
            total_expense: total,
        }
    }

    #[test]
    fn test_savings_not_clamped() {
        let monthly = vec![aggregate(2024, 11, dec!(3000)), aggregate(2024, 12, dec!(6500))];
        let savings = calculate_savings(Some(dec!(5000)), &monthly).unwrap();

        assert_eq!(savings.len(), 2);
        assert_eq!(savings[0].value, dec!(2000));
        assert_eq!(savings[1].value, dec!(-1500));
        assert_eq!(savings[1].month, MonthKey::new(2024, 12).unwrap());
    }

    #[test]
    fn test_missing_or_non_positive_income() {
        assert!(matches!(
            SavingsCalculator::new(None),
            Err(ReconciliationError::MissingIncome(_))
        ));
        assert!(matches!(
            SavingsCalculator::new(Some(Decimal::ZERO)),
            Err(ReconciliationError::MissingIncome(_))
        ));
        assert!(matches!(
            SavingsCalculator::new(Some(dec!(-10))),
            Err(ReconciliationError::MissingIncome(_))
        ));
    }

    #[test]
    fn test_recent_comparison_keeps_trailing_months() {
        let monthly: Vec<MonthlyAggregate> = (1..=8)
            .map(|m| aggregate(2024, m, Decimal::from(m * 100)))
            .collect();
        let calculator = SavingsCalculator::new(Some(dec!(1000))).unwrap();

        let recent = calculator.recent_comparison(&monthly, 6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].month, MonthKey::new(2024, 3).unwrap());
        assert_eq!(recent[5].expenses, dec!(800));
        assert_eq!(recent[5].savings, dec!(200));

        assert_eq!(calculator.recent_comparison(&monthly[..2], 6).len(), 2);
        assert!(calculator.recent_comparison(&monthly, 0).is_empty());
    }
}
