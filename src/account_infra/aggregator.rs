use std::time::Duration;
use serde::Serialize;
use crate::account_infra::connector::ConnectorStatus;
use crate::account_infra::{ConnectionState, ConnectorKind};
use crate::error::InvariantViolation;
use crate::types::{AccountBalance, Position, Timestamp};

/// Per-source line of a snapshot, so consumers can see which sources are stale.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub kind: ConnectorKind,
    pub state: ConnectionState,
    pub balance: AccountBalance,
    pub last_fetch_at: Option<Timestamp>,
    pub is_stale: bool,
}

/// Immutable aggregated view produced once per round.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregatedSnapshot {
    pub total_balance: f64,
    pub total_available: f64,
    pub total_unrealized_pnl: f64,
    pub positions: Vec<Position>,
    pub sources: Vec<SourceSummary>,
    pub generated_at: Timestamp,
}

impl AggregatedSnapshot {
    pub fn empty(generated_at: Timestamp) -> Self {
        AggregatedSnapshot {
            total_balance: 0.0,
            total_available: 0.0,
            total_unrealized_pnl: 0.0,
            positions: Vec::new(),
            sources: Vec::new(),
            generated_at,
        }
    }

    pub fn connected_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.state == ConnectionState::Connected)
            .count()
    }

    pub fn has_stale_sources(&self) -> bool {
        self.sources.iter().any(|s| s.is_stale)
    }
}

/// Folds the connector states of one round into an `AggregatedSnapshot`.
///
/// Only connected sources contribute, and they contribute their last good
/// values even when this round's fetch failed. Balances are summed as-is:
/// every source reports in the same quote currency.
pub struct AccountAggregator {
    stale_after: Duration,
}

impl AccountAggregator {
    pub fn new(stale_after: Duration) -> Self {
        AccountAggregator { stale_after }
    }

    pub fn aggregate(
        &self,
        statuses: &[ConnectorStatus],
        generated_at: Timestamp,
    ) -> Result<AggregatedSnapshot, InvariantViolation> {
        let contributing: Vec<&ConnectorStatus> = statuses
            .iter()
            .filter(|s| s.state == ConnectionState::Connected)
            .collect();

        let totals: AccountBalance = contributing.iter().map(|s| s.balance).sum();
        if !totals.is_finite() {
            return Err(InvariantViolation {
                invariant: "finite_totals",
                details: format!("aggregated balance is not finite: {:?}", totals),
            });
        }

        let positions: Vec<Position> = contributing
            .iter()
            .flat_map(|s| s.positions.iter().cloned())
            .collect();

        if let Some(bad) = positions.iter().find(|p| p.quantity.is_nan() || p.quantity <= 0.0) {
            return Err(InvariantViolation {
                invariant: "positive_quantity",
                details: format!("{} {} has quantity {}", bad.source, bad.symbol, bad.quantity),
            });
        }

        let sources = statuses
            .iter()
            .map(|s| SourceSummary {
                name: s.name.clone(),
                kind: s.kind,
                state: s.state,
                balance: s.balance,
                last_fetch_at: s.last_fetch_at,
                is_stale: self.is_stale(s.last_fetch_at, generated_at),
            })
            .collect();

        Ok(AggregatedSnapshot {
            total_balance: totals.total,
            total_available: totals.available,
            total_unrealized_pnl: totals.unrealized_pnl,
            positions,
            sources,
            generated_at,
        })
    }

    fn is_stale(&self, last_fetch_at: Option<Timestamp>, now: Timestamp) -> bool {
        match last_fetch_at {
            Some(fetched) => now - fetched > self.stale_after,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn position(source: &str, symbol: &str, quantity: f64) -> Position {
        Position {
            source: source.to_string(),
            symbol: symbol.to_string(),
            side: Side::Long,
            quantity,
            entry_price: 10.0,
            mark_price: 12.0,
            unrealized_pnl: 2.0,
        }
    }

    fn status(
        name: &str,
        state: ConnectionState,
        total: f64,
        positions: Vec<Position>,
        last_fetch_at: Option<Timestamp>,
    ) -> ConnectorStatus {
        ConnectorStatus {
            name: name.to_string(),
            kind: ConnectorKind::Binance,
            state,
            balance: AccountBalance::new(total, total, 0.0),
            positions,
            last_fetch_at,
        }
    }

    #[test]
    fn sums_connected_sources_in_order() {
        let now = Timestamp::from_millis(10_000);
        let fetched = Some(Timestamp::from_millis(9_000));
        let aggregator = AccountAggregator::new(Duration::from_secs(5));
        let snapshot = aggregator
            .aggregate(
                &[
                    status("A", ConnectionState::Connected, 100.0, vec![], fetched),
                    status("B", ConnectionState::Connected, 200.0, vec![position("B", "SYM", 1.0)], fetched),
                ],
                now,
            )
            .unwrap();

        assert_eq!(snapshot.total_balance, 300.0);
        assert_eq!(snapshot.positions, vec![position("B", "SYM", 1.0)]);
        assert_eq!(snapshot.generated_at, now);
        assert!(!snapshot.has_stale_sources());
    }

    #[test]
    fn disconnected_and_failed_contribute_nothing() {
        let aggregator = AccountAggregator::new(Duration::from_secs(5));
        let snapshot = aggregator
            .aggregate(
                &[
                    status("A", ConnectionState::Connected, 100.0, vec![position("A", "X", 1.0)], None),
                    status("B", ConnectionState::Disconnected, 200.0, vec![position("B", "Y", 1.0)], None),
                    status("C", ConnectionState::Failed, 300.0, vec![position("C", "Z", 1.0)], None),
                    status("D", ConnectionState::Connecting, 400.0, vec![], None),
                ],
                Timestamp::from_millis(1),
            )
            .unwrap();

        assert_eq!(snapshot.total_balance, 100.0);
        assert_eq!(snapshot.positions.len(), 1);
        assert_eq!(snapshot.sources.len(), 4);
        assert_eq!(snapshot.connected_sources(), 1);
    }

    #[test]
    fn marks_sources_stale_past_threshold() {
        let aggregator = AccountAggregator::new(Duration::from_secs(5));
        let snapshot = aggregator
            .aggregate(
                &[
                    status("fresh", ConnectionState::Connected, 1.0, vec![], Some(Timestamp::from_millis(8_000))),
                    status("old", ConnectionState::Connected, 1.0, vec![], Some(Timestamp::from_millis(1_000))),
                    status("never", ConnectionState::Connected, 0.0, vec![], None),
                ],
                Timestamp::from_millis(10_000),
            )
            .unwrap();

        let stale: Vec<bool> = snapshot.sources.iter().map(|s| s.is_stale).collect();
        assert_eq!(stale, vec![false, true, true]);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let aggregator = AccountAggregator::new(Duration::from_secs(5));
        let err = aggregator
            .aggregate(
                &[status("A", ConnectionState::Connected, 1.0, vec![position("A", "X", 0.0)], None)],
                Timestamp::from_millis(1),
            )
            .unwrap_err();
        assert_eq!(err.invariant, "positive_quantity");
    }

    #[test]
    fn rejects_non_finite_totals() {
        let aggregator = AccountAggregator::new(Duration::from_secs(5));
        let err = aggregator
            .aggregate(
                &[status("A", ConnectionState::Connected, f64::INFINITY, vec![], None)],
                Timestamp::from_millis(1),
            )
            .unwrap_err();
        assert_eq!(err.invariant, "finite_totals");
    }

    #[test]
    fn no_sources_yields_empty_snapshot() {
        let aggregator = AccountAggregator::new(Duration::from_secs(5));
        let at = Timestamp::from_millis(5);
        assert_eq!(aggregator.aggregate(&[], at).unwrap(), AggregatedSnapshot::empty(at));
    }
}
