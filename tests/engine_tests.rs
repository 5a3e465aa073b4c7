//! End-to-end engine tests against in-memory market data.

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use lotbook::engine::PortfolioEngine;
use lotbook::ledger::selector::CostBasisMethod;
use lotbook::pricing::memory::StaticQuotes;
use lotbook::reports::performance::Period;
use lotbook::LedgerError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn days_ago(days: u64) -> NaiveDate {
    Utc::now().date_naive() - Days::new(days)
}

fn engine_with(quotes: StaticQuotes) -> PortfolioEngine<StaticQuotes, StaticQuotes, StaticQuotes> {
    PortfolioEngine::new(quotes.clone(), quotes.clone(), quotes)
}

/// Two lots of 10 at $10 and $20, a month apart.
fn seed_two_lots(engine: &PortfolioEngine<StaticQuotes, StaticQuotes, StaticQuotes>) {
    engine
        .record_purchase("aapl", dec!(10), dec!(10), date(2025, 1, 1))
        .unwrap();
    engine
        .record_purchase("aapl", dec!(10), dec!(20), date(2025, 1, 31))
        .unwrap();
}

#[tokio::test]
async fn fifo_and_lifo_pick_opposite_lots() {
    init_tracing();
    let fifo_engine = engine_with(StaticQuotes::new());
    seed_two_lots(&fifo_engine);
    let fifo = fifo_engine
        .record_sale(
            "aapl",
            "AAPL",
            dec!(10),
            dec!(25),
            date(2025, 3, 1),
            CostBasisMethod::Fifo,
            None,
        )
        .unwrap();
    assert_eq!(fifo.cost_basis, dec!(100));
    assert_eq!(fifo.realized_gain, dec!(150));

    let lifo_engine = engine_with(StaticQuotes::new());
    seed_two_lots(&lifo_engine);
    let lifo = lifo_engine
        .record_sale(
            "aapl",
            "AAPL",
            dec!(10),
            dec!(25),
            date(2025, 3, 1),
            CostBasisMethod::Lifo,
            None,
        )
        .unwrap();
    assert_eq!(lifo.cost_basis, dec!(200));
    assert_eq!(lifo.realized_gain, dec!(50));
}

#[tokio::test]
async fn specific_id_sale_consumes_named_lots() {
    let engine = engine_with(StaticQuotes::new());
    seed_two_lots(&engine);
    let lots = engine.open_lots("aapl").unwrap();
    let second_id = lots[1].id;

    let record = engine
        .record_sale(
            "aapl",
            "AAPL",
            dec!(10),
            dec!(25),
            date(2025, 3, 1),
            CostBasisMethod::SpecificId,
            Some(&[second_id]),
        )
        .unwrap();
    assert_eq!(record.cost_basis, dec!(200));
    assert_eq!(record.lot_ids, vec![second_id]);
}

#[tokio::test]
async fn specific_id_sale_with_repeated_lot_fails_cleanly() {
    let engine = engine_with(StaticQuotes::new());
    engine
        .record_purchase("aapl", dec!(10), dec!(10), date(2025, 1, 1))
        .unwrap();
    let lot_id = engine.open_lots("aapl").unwrap()[0].id;

    // Repeating the lot id must not let the sale exceed the open quantity.
    let err = engine
        .record_sale(
            "aapl",
            "AAPL",
            dec!(15),
            dec!(25),
            date(2025, 3, 1),
            CostBasisMethod::SpecificId,
            Some(&[lot_id, lot_id]),
        )
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InvalidInput(_))
    ));

    assert!(engine.realized_records().is_empty());
    let open: Decimal = engine
        .open_lots("aapl")
        .unwrap()
        .iter()
        .map(|l| l.quantity)
        .sum();
    assert_eq!(open, dec!(10));
}

#[tokio::test]
async fn quantity_is_conserved_across_sales() {
    let engine = engine_with(StaticQuotes::new());
    seed_two_lots(&engine);
    engine
        .record_sale(
            "aapl",
            "AAPL",
            dec!(13),
            dec!(25),
            date(2025, 3, 1),
            CostBasisMethod::Fifo,
            None,
        )
        .unwrap();

    let open: Decimal = engine
        .open_lots("aapl")
        .unwrap()
        .iter()
        .map(|l| l.quantity)
        .sum();
    let sold: Decimal = engine
        .realized_records()
        .iter()
        .map(|r| r.quantity)
        .sum();
    assert_eq!(open + sold, dec!(20));
    assert_eq!(open, dec!(7));
}

#[tokio::test]
async fn failed_sale_changes_nothing() {
    let engine = engine_with(StaticQuotes::new());
    seed_two_lots(&engine);

    let err = engine
        .record_sale(
            "aapl",
            "AAPL",
            dec!(25),
            dec!(25),
            date(2025, 3, 1),
            CostBasisMethod::Fifo,
            None,
        )
        .unwrap_err();
    match err.downcast_ref::<LedgerError>() {
        Some(LedgerError::InsufficientLots { shortfall, .. }) => {
            assert_eq!(*shortfall, dec!(5));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(engine.realized_records().is_empty());
    let open: Decimal = engine
        .open_lots("aapl")
        .unwrap()
        .iter()
        .map(|l| l.quantity)
        .sum();
    assert_eq!(open, dec!(20));
}

#[tokio::test]
async fn round_trip_sale_is_gain_neutral() {
    let engine = engine_with(StaticQuotes::new());
    engine
        .record_purchase("msft", dec!(4), dec!(50), date(2025, 1, 1))
        .unwrap();
    let record = engine
        .record_sale(
            "msft",
            "MSFT",
            dec!(4),
            dec!(50),
            date(2025, 1, 2),
            CostBasisMethod::Fifo,
            None,
        )
        .unwrap();
    assert_eq!(record.realized_gain, dec!(0));

    let report = engine.generate_tax_report(2025);
    assert_eq!(report.net_realized_gains, dec!(0));
}

#[tokio::test]
async fn tax_report_totals_add_up() {
    let engine = engine_with(StaticQuotes::new());
    engine
        .record_purchase("aapl", dec!(10), dec!(100), date(2023, 1, 1))
        .unwrap();
    engine
        .record_purchase("msft", dec!(10), dec!(300), date(2024, 1, 10))
        .unwrap();

    // Long-term gain on AAPL, short-term loss on MSFT, same tax year.
    engine
        .record_sale(
            "aapl",
            "AAPL",
            dec!(10),
            dec!(150),
            date(2024, 6, 1),
            CostBasisMethod::Fifo,
            None,
        )
        .unwrap();
    engine
        .record_sale(
            "msft",
            "MSFT",
            dec!(10),
            dec!(250),
            date(2024, 7, 1),
            CostBasisMethod::Fifo,
            None,
        )
        .unwrap();

    let report = engine.generate_tax_report(2024);
    assert_eq!(report.long_term_gains, dec!(500));
    assert_eq!(report.short_term_losses, dec!(500));
    assert_eq!(report.net_realized_gains, dec!(0));
    assert_eq!(report.wash_sales, dec!(0));

    let by_asset_net: Decimal = report.by_asset.values().map(|s| s.net_gains).sum();
    assert_eq!(by_asset_net, report.net_realized_gains);

    let rows = engine.generate_1099b(2024);
    assert_eq!(rows.len(), 2);
    assert!(!rows[0].short_term);
    assert_eq!(rows[0].date_acquired, date(2023, 1, 1));
    assert!(rows[1].short_term);

    // Other years stay empty.
    assert!(engine.generate_1099b(2022).is_empty());
}

#[tokio::test]
async fn unrealized_positions_skip_unpriced_assets() {
    let quotes = StaticQuotes::new()
        .with_asset("aapl", "AAPL")
        .with_asset("msft", "MSFT")
        .with_price("AAPL", dec!(120));
    // MSFT has a symbol but no quote; "mystery" has no symbol at all.
    let engine = engine_with(quotes);
    engine
        .record_purchase("aapl", dec!(10), dec!(100), days_ago(30))
        .unwrap();
    engine
        .record_purchase("msft", dec!(5), dec!(300), days_ago(30))
        .unwrap();
    engine
        .record_purchase("mystery", dec!(1), dec!(1), days_ago(30))
        .unwrap();

    let positions = engine.calculate_unrealized_gains().await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].symbol, "AAPL");
    assert_eq!(positions[0].unrealized_gain, dec!(200));
    assert_eq!(positions[0].unrealized_gain_percent, dec!(20));
}

#[tokio::test]
async fn price_outage_degrades_to_skip() {
    let quotes = StaticQuotes::new()
        .with_asset("aapl", "AAPL")
        .with_price("AAPL", dec!(120))
        .with_failure("AAPL");
    let engine = engine_with(quotes);
    engine
        .record_purchase("aapl", dec!(10), dec!(100), days_ago(30))
        .unwrap();

    let positions = engine.calculate_unrealized_gains().await.unwrap();
    assert!(positions.is_empty());
}

#[tokio::test]
async fn harvesting_suggests_only_short_term_losses() {
    let quotes = StaticQuotes::new()
        .with_asset("loser", "LOSR")
        .with_asset("winner", "WINR")
        .with_asset("oldloser", "OLDL")
        .with_price("LOSR", dec!(50))
        .with_price("WINR", dec!(150))
        .with_price("OLDL", dec!(50));
    let engine = engine_with(quotes);
    engine
        .record_purchase("loser", dec!(10), dec!(100), days_ago(90))
        .unwrap();
    engine
        .record_purchase("winner", dec!(10), dec!(100), days_ago(90))
        .unwrap();
    engine
        .record_purchase("oldloser", dec!(10), dec!(100), days_ago(800))
        .unwrap();

    let candidates = engine.suggest_tax_loss_harvesting().await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].symbol, "LOSR");
    assert_eq!(candidates[0].current_loss, dec!(500));
    assert!(candidates[0].suggested_action.contains("LOSR"));
}

#[tokio::test]
async fn dividend_yield_annualizes_partial_history() {
    let quotes = StaticQuotes::new()
        .with_asset("aapl", "AAPL")
        .with_price("AAPL", dec!(100))
        .with_dividend("AAPL", dec!(1), days_ago(95));
    let engine = engine_with(quotes);
    engine
        .record_purchase("aapl", dec!(10), dec!(80), days_ago(400))
        .unwrap();

    let result = engine.calculate_dividend_yield("aapl").await.unwrap();
    // One payment ~3 months back scales to roughly 4 a year.
    let annual = result.annual_dividend.unwrap();
    assert!(annual > dec!(3.5));
    assert!(annual < dec!(4.5));
    assert!(result.dividend_yield.unwrap() > dec!(3.5));
    assert!(result.yield_on_cost.unwrap() > result.dividend_yield.unwrap());
}

#[tokio::test]
async fn dividend_yield_survives_price_outage() {
    let quotes = StaticQuotes::new()
        .with_asset("aapl", "AAPL")
        .with_dividend("AAPL", dec!(1), days_ago(95));
    // Only the price source fails; dividends keep flowing.
    let failing_prices = quotes.clone().with_failure("AAPL");
    let engine = PortfolioEngine::new(failing_prices, quotes.clone(), quotes);
    engine
        .record_purchase("aapl", dec!(10), dec!(80), days_ago(400))
        .unwrap();

    let result = engine.calculate_dividend_yield("aapl").await.unwrap();
    assert!(result.dividend_yield.is_none());
    assert!(result.yield_on_cost.unwrap() > Decimal::ZERO);
}

#[tokio::test]
async fn dividend_outage_omits_all_dividend_fields() {
    let quotes = StaticQuotes::new()
        .with_asset("aapl", "AAPL")
        .with_price("AAPL", dec!(100))
        .with_dividend("AAPL", dec!(1), days_ago(95));
    // Only the dividend source fails; prices keep working.
    let failing_dividends = quotes.clone().with_failure("AAPL");
    let engine = PortfolioEngine::new(quotes.clone(), failing_dividends, quotes);
    engine
        .record_purchase("aapl", dec!(10), dec!(80), days_ago(400))
        .unwrap();

    let result = engine.calculate_dividend_yield("aapl").await.unwrap();
    assert!(result.annual_dividend.is_none());
    assert!(result.dividend_yield.is_none());
    assert!(result.yield_on_cost.is_none());
}

#[tokio::test]
async fn performance_metrics_without_history_keep_returns_only() {
    let quotes = StaticQuotes::new()
        .with_asset("aapl", "AAPL")
        .with_price("AAPL", dec!(110));
    let engine = engine_with(quotes);
    engine
        .record_purchase("aapl", dec!(10), dec!(100), days_ago(365))
        .unwrap();

    let metrics = engine
        .calculate_performance_metrics(Period::OneYear, None)
        .await
        .unwrap();
    assert_eq!(metrics.total_return, dec!(100));
    assert_eq!(metrics.total_return_percent, dec!(10));
    assert!(metrics.sharpe_ratio.is_none());
    assert!(metrics.volatility.is_none());
    assert!(metrics.var_95.is_none());
}

#[tokio::test]
async fn performance_metrics_with_benchmark() {
    let bench_returns = vec![0.01, -0.02, 0.015, 0.005, -0.01];
    let asset_returns: Vec<f64> = bench_returns.iter().map(|r| r * 2.0).collect();
    let quotes = StaticQuotes::new()
        .with_asset("aapl", "AAPL")
        .with_price("AAPL", dec!(110))
        .with_returns("AAPL", asset_returns)
        .with_returns("SPY", bench_returns);
    let engine = engine_with(quotes);
    engine
        .record_purchase("aapl", dec!(10), dec!(100), days_ago(365))
        .unwrap();

    let metrics = engine
        .calculate_performance_metrics(Period::OneYear, Some("SPY"))
        .await
        .unwrap();
    assert!(metrics.volatility.unwrap() > 0.0);
    assert!(metrics.sharpe_ratio.is_some());
    assert!((metrics.beta.unwrap() - 2.0).abs() < 1e-9);
    assert!(metrics.alpha.is_some());
}

#[tokio::test]
async fn benchmark_outage_omits_alpha_and_beta() {
    let quotes = StaticQuotes::new()
        .with_asset("aapl", "AAPL")
        .with_price("AAPL", dec!(110))
        .with_returns("AAPL", vec![0.01, -0.02, 0.015])
        .with_failure("SPY");
    let engine = engine_with(quotes);
    engine
        .record_purchase("aapl", dec!(10), dec!(100), days_ago(365))
        .unwrap();

    let metrics = engine
        .calculate_performance_metrics(Period::OneYear, Some("SPY"))
        .await
        .unwrap();
    assert!(metrics.volatility.is_some());
    assert!(metrics.alpha.is_none());
    assert!(metrics.beta.is_none());
}

#[tokio::test]
async fn tax_report_serializes_to_json() {
    let engine = engine_with(StaticQuotes::new());
    engine
        .record_purchase("aapl", dec!(2), dec!(100), date(2024, 1, 1))
        .unwrap();
    engine
        .record_sale(
            "aapl",
            "AAPL",
            dec!(2),
            dec!(150),
            date(2024, 6, 1),
            CostBasisMethod::Fifo,
            None,
        )
        .unwrap();

    let report = engine.generate_tax_report(2024);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["year"], 2024);
    assert_eq!(json["net_realized_gains"], "100");
    assert_eq!(json["records"][0]["symbol"], "AAPL");
}

#[tokio::test]
async fn concurrent_sales_never_double_spend() {
    init_tracing();
    let engine = std::sync::Arc::new(engine_with(StaticQuotes::new()));
    engine
        .record_purchase("aapl", dec!(10), dec!(10), date(2025, 1, 1))
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        handles.push(std::thread::spawn(move || {
            engine.record_sale(
                "aapl",
                "AAPL",
                dec!(4),
                dec!(20),
                date(2025, 3, 1),
                CostBasisMethod::Fifo,
                None,
            )
        }));
    }
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("seller thread panicked"))
        .collect();

    // 10 shares cover exactly two 4-share sales; the rest fail cleanly.
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 2);

    let sold: Decimal = engine.realized_records().iter().map(|r| r.quantity).sum();
    let open: Decimal = engine
        .open_lots("aapl")
        .unwrap()
        .iter()
        .map(|l| l.quantity)
        .sum();
    assert_eq!(sold, dec!(8));
    assert_eq!(open + sold, dec!(10));
}
