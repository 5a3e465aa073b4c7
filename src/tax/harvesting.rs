//! Tax-loss harvesting advisor
//!
//! Scans unrealized positions for harvestable losses. Only short-term
//! losses are suggested: short-term losses offset short-term gains
//! preferentially under US tax rules, so long-term losses are excluded
//! here and this is not configurable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::reports::unrealized::UnrealizedPosition;

/// A position worth selling to realize its loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestCandidate {
    pub asset_id: String,
    pub symbol: String,
    /// Positive magnitude of the unrealized loss.
    pub current_loss: Decimal,
    /// Positive magnitude of the loss in percent of cost basis.
    pub current_loss_percent: Decimal,
    pub suggested_action: String,
}

/// Rank short-term unrealized losses, largest loss first.
pub fn suggest_candidates(positions: &[UnrealizedPosition]) -> Vec<HarvestCandidate> {
    let mut candidates: Vec<HarvestCandidate> = positions
        .iter()
        .filter(|p| p.unrealized_gain < Decimal::ZERO && !p.is_long_term)
        .map(|p| {
            let loss = p.unrealized_gain.abs();
            let loss_percent = p.unrealized_gain_percent.abs();
            HarvestCandidate {
                asset_id: p.asset_id.clone(),
                symbol: p.symbol.clone(),
                current_loss: loss,
                current_loss_percent: loss_percent,
                suggested_action: format!(
                    "Sell {} {} to realize a short-term loss of {:.2} ({:.2}%)",
                    p.quantity.normalize(),
                    p.symbol,
                    loss,
                    loss_percent
                ),
            }
        })
        .collect();

    candidates.sort_by(|a, b| b.current_loss.cmp(&a.current_loss));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, gain: Decimal, is_long_term: bool) -> UnrealizedPosition {
        let cost_basis = dec!(1000);
        UnrealizedPosition {
            asset_id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            quantity: dec!(10),
            cost_basis,
            current_value: cost_basis + gain,
            unrealized_gain: gain,
            unrealized_gain_percent: gain / cost_basis * dec!(100),
            holding_period_days: if is_long_term { dec!(500) } else { dec!(90) },
            is_long_term,
        }
    }

    #[test]
    fn test_only_short_term_losses_ranked_by_size() {
        let positions = vec![
            position("AAPL", dec!(-50), false),
            position("MSFT", dec!(-300), false),
            position("GOOG", dec!(200), false),   // gain, excluded
            position("TSLA", dec!(-900), true),   // long-term, excluded
        ];

        let candidates = suggest_candidates(&positions);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].symbol, "MSFT");
        assert_eq!(candidates[0].current_loss, dec!(300));
        assert_eq!(candidates[0].current_loss_percent, dec!(30));
        assert_eq!(candidates[1].symbol, "AAPL");
    }

    #[test]
    fn test_suggested_action_mentions_position() {
        let candidates = suggest_candidates(&[position("AAPL", dec!(-50), false)]);
        assert!(candidates[0].suggested_action.contains("AAPL"));
        assert!(candidates[0].suggested_action.contains("short-term"));
    }

    #[test]
    fn test_no_candidates_for_all_gains() {
        let positions = vec![position("AAPL", dec!(10), false)];
        assert!(suggest_candidates(&positions).is_empty());
    }
}
