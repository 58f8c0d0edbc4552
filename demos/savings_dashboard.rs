use chrono::Local;
use dotenv::dotenv;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use savings_reconciler::*;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

/// Stands in for the portfolio optimizer when no service is configured.
struct StaticOptimizer;

#[async_trait::async_trait]
impl Optimizer for StaticOptimizer {
    async fn optimize(&self, request: &InvestmentRequest) -> Result<OptimizerResponse> {
        let weights: Vec<(&str, Decimal, Vec<(&str, Decimal)>)> =
            match request.risk_profile {
                RiskProfile::Conservative => vec![
                    ("bonds", dec!(0.6), vec![("BND", dec!(0.6))]),
                    ("stocks", dec!(0.3), vec![("VTI", dec!(0.2)), ("AAPL", dec!(0.1))]),
                    ("gold", dec!(0.1), vec![("GLD", dec!(0.1))]),
                ],
                RiskProfile::Balanced => vec![
                    ("stocks", dec!(0.5), vec![("AAPL", dec!(0.2)), ("MSFT", dec!(0.2))]),
                    ("bonds", dec!(0.35), vec![("BND", dec!(0.35))]),
                    ("crypto", dec!(0.15), vec![("BTC", dec!(0.1)), ("ETH", dec!(0.05))]),
                ],
                RiskProfile::Aggressive => vec![
                    ("stocks", dec!(0.6), vec![("NVDA", dec!(0.3)), ("AAPL", dec!(0.2))]),
                    ("crypto", dec!(0.4), vec![("BTC", dec!(0.25)), ("ETH", dec!(0.15))]),
                ],
            };

        let allocations = weights
            .iter()
            .map(|(class, weight, assets)| {
                let top_assets = assets
                    .iter()
                    .map(|(asset, share)| (asset.to_string(), request.amount * *share))
                    .collect::<BTreeMap<_, _>>();
                (
                    class.to_string(),
                    ClassAllocation {
                        allocation: request.amount * *weight,
                        top_assets,
                    },
                )
            })
            .collect();

        Ok(OptimizerResponse {
            amount: Some(request.amount),
            risk_profile: Some(request.risk_profile),
            allocations,
        })
    }
}

fn sample_snapshot() -> UserSnapshot {
    UserSnapshot {
        income: Some(dec!(5000)),
        transactions: vec![
            RawTransaction::new("2024-09-01", "Rent", dec!(1800)),
            RawTransaction::new("2024-09-12", "Food and Groceries", dec!(540.25)),
            RawTransaction::new("2024-10-01", "Rent", dec!(1800)),
            RawTransaction::new("2024-10-19", "Shopping", dec!(1210)),
            RawTransaction::new("2024-11-01", "Rent", dec!(1800)),
            RawTransaction::new("2024-11-09", "Food and Groceries", dec!(650)),
            RawTransaction::new("2024-11-23", "Transport", dec!(550)),
            RawTransaction::new("2024-12-01", "Rent", dec!(1800)),
            RawTransaction::new("2024-12-14T18:30:00Z", "Shopping", dec!(1900)),
            RawTransaction::new("2024-12-20", "Food and Groceries", dec!(800)),
        ],
    }
}

#[cfg(feature = "http")]
fn forecaster() -> std::result::Result<Arc<dyn Forecaster>, Box<dyn Error>> {
    if std::env::var("FORECAST_SERVICE_URL").is_ok() {
        let endpoints = CollaboratorEndpoints::from_env();
        println!("🌐 Using forecast service at {}", endpoints.forecast_url);
        return Ok(Arc::new(HttpForecaster::new(&endpoints)?));
    }
    Ok(Arc::new(MovingAverageForecaster::default()))
}

#[cfg(not(feature = "http"))]
fn forecaster() -> std::result::Result<Arc<dyn Forecaster>, Box<dyn Error>> {
    Ok(Arc::new(MovingAverageForecaster::default()))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    dotenv().ok();

    println!("💰 Savings Dashboard");
    println!("═══════════════════════════════════════════════════════════════\n");

    let engine = ReconciliationEngine::new(
        EngineConfig::default(),
        forecaster()?,
        Arc::new(StaticOptimizer),
    )?;
    let today = Local::now().date_naive();

    let overview = engine.savings_overview(&sample_snapshot(), today).await?;
    for diagnostic in &overview.diagnostics {
        println!("⚠️  [{}] {}", diagnostic.code, diagnostic.message);
    }

    println!("📅 Savings series (reference {}):", today);
    for point in overview.series.iter() {
        println!(
            "   {} {:<8} {:>10.2}",
            point.month,
            format!("{:?}", point.kind),
            point.value
        );
    }

    let metrics = &overview.metrics;
    println!(
        "\n📊 Income {} | Expenses {} | Net {}",
        metrics.total_income, metrics.total_expenses, metrics.net_savings
    );
    println!(
        "🔮 Next {} months forecast to save {} (window of {})",
        metrics.forecast_points,
        metrics.forecast_sum,
        engine.config().forecast_metric_window
    );
    if !metrics.summary.is_empty() {
        println!("   {}", metrics.summary);
    }
    if !metrics.advice.is_empty() {
        println!("   {}", metrics.advice);
    }

    let plan = engine
        .investment_plan(&InvestmentRequest {
            amount: dec!(10000),
            risk_profile: RiskProfile::Balanced,
        })
        .await?;

    println!("\n📈 Balanced plan for {}:", plan.total_allocation());
    for share in &plan.class_totals {
        println!(
            "   {:<8} {:>10.2} ({:.1}%)",
            share.name, share.allocation_amount, share.share
        );
    }

    println!("\n🧾 Full allocation report:");
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
