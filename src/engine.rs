//! Portfolio engine
//!
//! Facade over the ledger, tax reporting and analytics modules. Owns the
//! lot ledger and the realized-gain history, and talks to market data
//! through the injected [`PriceSource`], [`DividendSource`] and
//! [`AssetRegistry`] collaborators.
//!
//! Sales on the same asset are serialized by a per-asset lock held across
//! the select-then-close unit, so concurrent sellers cannot plan against
//! the same lots. Read-side reports work from cloned snapshots and never
//! block sales on other assets.

use chrono::{Days, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::selector::{select_lots, CostBasisMethod};
use crate::ledger::{TaxLot, TaxLotLedger};
use crate::pricing::{AssetRegistry, DividendSource, PriceSource};
use crate::reports::benchmark;
use crate::reports::dividends::{trailing_yield, DividendYield};
use crate::reports::performance::{analyze, PerformanceMetrics, Period};
use crate::reports::unrealized::{position_from_lots, UnrealizedPosition};
use crate::tax::harvesting::{suggest_candidates, HarvestCandidate};
use crate::tax::realized::{record_sale, RealizedGainRecord};
use crate::tax::report::{generate_1099b, generate_tax_report, Form1099BRow, TaxReport};

/// Cost-basis and performance engine for one portfolio.
pub struct PortfolioEngine<P, D, R> {
    config: EngineConfig,
    ledger: TaxLotLedger,
    records: Mutex<Vec<RealizedGainRecord>>,
    next_record_id: AtomicU64,
    /// Per-asset sale serialization; see module docs.
    sale_locks: DashMap<String, Arc<Mutex<()>>>,
    prices: P,
    dividends: D,
    registry: R,
}

impl<P, D, R> PortfolioEngine<P, D, R>
where
    P: PriceSource,
    D: DividendSource,
    R: AssetRegistry,
{
    pub fn new(prices: P, dividends: D, registry: R) -> Self {
        Self::with_config(EngineConfig::default(), prices, dividends, registry)
    }

    pub fn with_config(config: EngineConfig, prices: P, dividends: D, registry: R) -> Self {
        Self {
            config,
            ledger: TaxLotLedger::new(),
            records: Mutex::new(Vec::new()),
            next_record_id: AtomicU64::new(1),
            sale_locks: DashMap::new(),
            prices,
            dividends,
            registry,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, Vec<RealizedGainRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a purchase as a new open tax lot.
    pub fn record_purchase(
        &self,
        asset_id: &str,
        quantity: Decimal,
        price: Decimal,
        purchase_date: NaiveDate,
    ) -> Result<TaxLot> {
        let lot = self
            .ledger
            .add_lot(asset_id, quantity, price, purchase_date, Self::today())?;
        Ok(lot)
    }

    /// Record a sale: select lots by `method`, close them, and append the
    /// realized-gain record to the history.
    ///
    /// The per-asset lock makes plan selection and application one atomic
    /// unit; a failure at any step leaves both the ledger and the record
    /// history untouched.
    pub fn record_sale(
        &self,
        asset_id: &str,
        symbol: &str,
        quantity: Decimal,
        sale_price: Decimal,
        sale_date: NaiveDate,
        method: CostBasisMethod,
        specific_lot_ids: Option<&[u64]>,
    ) -> Result<RealizedGainRecord> {
        let lock = self
            .sale_locks
            .entry(asset_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let open = self.ledger.open_lots(asset_id)?;
        let plan = select_lots(asset_id, &open, quantity, method, specific_lot_ids)?;

        let record_id = self.next_record_id.fetch_add(1, Ordering::SeqCst);
        let record = record_sale(
            &self.ledger,
            &plan,
            record_id,
            symbol,
            sale_price,
            sale_date,
            self.config.long_term_threshold_days,
        )?;

        info!(
            asset_id,
            symbol,
            %quantity,
            %sale_price,
            realized_gain = %record.realized_gain,
            method = method.as_str(),
            "recorded sale"
        );
        self.lock_records().push(record.clone());
        Ok(record)
    }

    /// Full realized-gain history, oldest first.
    pub fn realized_records(&self) -> Vec<RealizedGainRecord> {
        self.lock_records().clone()
    }

    /// Every lot ever created, open and closed.
    pub fn snapshot_lots(&self) -> Vec<TaxLot> {
        self.ledger.all_lots()
    }

    /// Open lots for one asset.
    pub fn open_lots(&self, asset_id: &str) -> Result<Vec<TaxLot>> {
        Ok(self.ledger.open_lots(asset_id)?)
    }

    /// Aggregate tax report for `year`.
    pub fn generate_tax_report(&self, year: i32) -> TaxReport {
        generate_tax_report(&self.lock_records(), year)
    }

    /// 1099-B style listing for `year`.
    pub fn generate_1099b(&self, year: i32) -> Vec<Form1099BRow> {
        generate_1099b(&self.lock_records(), year)
    }

    /// Mark open positions to market.
    ///
    /// Assets without a registry symbol or a usable price are skipped
    /// with a warning rather than valued at zero.
    pub async fn calculate_unrealized_gains(&self) -> Result<Vec<UnrealizedPosition>> {
        let as_of = Self::today();
        let mut positions = Vec::new();

        for (asset_id, lots) in self.ledger.open_snapshot() {
            let Some(symbol) = self.registry.symbol(&asset_id) else {
                warn!(asset_id, "no symbol registered, skipping valuation");
                continue;
            };
            let price = match self.prices.current_price(&symbol).await {
                Ok(Some(price)) => price,
                Ok(None) => {
                    warn!(asset_id, symbol, "no current price, skipping valuation");
                    continue;
                }
                Err(err) => {
                    warn!(asset_id, symbol, %err, "price lookup failed, skipping valuation");
                    continue;
                }
            };
            if let Some(position) = position_from_lots(
                &asset_id,
                &symbol,
                &lots,
                price,
                as_of,
                self.config.long_term_threshold_days,
            ) {
                positions.push(position);
            }
        }

        Ok(positions)
    }

    /// Short-term unrealized losses worth harvesting, largest first.
    pub async fn suggest_tax_loss_harvesting(&self) -> Result<Vec<HarvestCandidate>> {
        let positions = self.calculate_unrealized_gains().await?;
        Ok(suggest_candidates(&positions))
    }

    /// Trailing dividend yield for one asset over the last 365 days.
    ///
    /// Fails for an unknown asset. Collaborator outages degrade instead:
    /// a missing price only omits the price-relative yield, and a failed
    /// dividend lookup omits every dividend-derived field.
    pub async fn calculate_dividend_yield(&self, asset_id: &str) -> Result<DividendYield> {
        let symbol = self
            .registry
            .symbol(asset_id)
            .ok_or_else(|| LedgerError::AssetNotFound(asset_id.to_string()))?;
        let open = self.ledger.open_lots(asset_id)?;

        let quantity: Decimal = open.iter().map(|l| l.quantity).sum();
        let cost_basis: Decimal = open.iter().map(|l| l.quantity * l.purchase_price).sum();
        let average_cost = if quantity > Decimal::ZERO {
            cost_basis / quantity
        } else {
            Decimal::ZERO
        };

        let as_of = Self::today();
        let since = as_of.checked_sub_days(Days::new(365)).unwrap_or(as_of);
        let events = match self.dividends.events(&symbol, since).await {
            Ok(events) => events,
            Err(err) => {
                warn!(asset_id, symbol, %err, "dividend lookup failed, omitting dividend yield");
                return Ok(DividendYield::unavailable());
            }
        };

        let current_price = match self.prices.current_price(&symbol).await {
            Ok(price) => price,
            Err(err) => {
                warn!(asset_id, symbol, %err, "price lookup failed, omitting dividend yield");
                None
            }
        };

        Ok(trailing_yield(&events, current_price, average_cost, as_of))
    }

    /// Portfolio-level performance over `period`, optionally benchmarked.
    ///
    /// The portfolio return series is a value-weighted blend of the
    /// per-asset historical series, truncated to the shortest series so
    /// every blended point covers every asset. Assets without a symbol,
    /// price or history drop out of the blend with a warning.
    pub async fn calculate_performance_metrics(
        &self,
        period: Period,
        benchmark_symbol: Option<&str>,
    ) -> Result<PerformanceMetrics> {
        let mut total_cost_basis = Decimal::ZERO;
        let mut total_value = Decimal::ZERO;
        // (current value, return series) per blendable asset
        let mut components: Vec<(f64, Vec<f64>)> = Vec::new();

        for (asset_id, lots) in self.ledger.open_snapshot() {
            let cost_basis: Decimal = lots.iter().map(|l| l.quantity * l.purchase_price).sum();
            let quantity: Decimal = lots.iter().map(|l| l.quantity).sum();

            let Some(symbol) = self.registry.symbol(&asset_id) else {
                warn!(asset_id, "no symbol registered, excluding from performance");
                continue;
            };
            let price = match self.prices.current_price(&symbol).await {
                Ok(Some(price)) => price,
                Ok(None) => {
                    warn!(asset_id, symbol, "no current price, excluding from performance");
                    continue;
                }
                Err(err) => {
                    warn!(asset_id, symbol, %err, "price lookup failed, excluding from performance");
                    continue;
                }
            };

            let value = price * quantity;
            total_cost_basis += cost_basis;
            total_value += value;

            match self.prices.historical_returns(&symbol, period).await {
                Ok(series) if !series.is_empty() => {
                    components.push((value.to_f64().unwrap_or(0.0), series));
                }
                Ok(_) => {
                    debug!(asset_id, symbol, "no return history, excluded from blend");
                }
                Err(err) => {
                    warn!(asset_id, symbol, %err, "history lookup failed, excluded from blend");
                }
            }
        }

        let blended = blend_weighted_returns(&components);
        let mut metrics = analyze(
            total_cost_basis,
            total_value,
            period,
            blended.as_deref(),
            &self.config,
        );

        if let (Some(benchmark_symbol), Some(portfolio_returns)) = (benchmark_symbol, &blended) {
            match self.prices.historical_returns(benchmark_symbol, period).await {
                Ok(bench) => {
                    if let Some(comparison) =
                        benchmark::compare(portfolio_returns, &bench, benchmark_symbol)
                    {
                        metrics.alpha = Some(comparison.alpha);
                        metrics.beta = comparison.beta;
                    }
                }
                Err(err) => {
                    warn!(benchmark_symbol, %err, "benchmark lookup failed, omitting alpha/beta");
                }
            }
        }

        Ok(metrics)
    }
}

/// Blend per-asset return series into one portfolio series, weighting by
/// current value and truncating to the shortest series.
///
/// Returns `None` when no component has history or all weights are zero.
fn blend_weighted_returns(components: &[(f64, Vec<f64>)]) -> Option<Vec<f64>> {
    let shortest = components.iter().map(|(_, s)| s.len()).min()?;
    if shortest == 0 {
        return None;
    }
    let total_weight: f64 = components.iter().map(|(w, _)| w).sum();
    if total_weight <= 0.0 {
        return None;
    }

    let mut blended = vec![0.0; shortest];
    for (weight, series) in components {
        // Keep the most recent points when truncating.
        let tail = &series[series.len() - shortest..];
        for (b, r) in blended.iter_mut().zip(tail) {
            *b += weight / total_weight * r;
        }
    }
    Some(blended)
}
