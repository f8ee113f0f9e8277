use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn abbrev(&self) -> &'static str {
        match self {
            Side::Long => "L",
            Side::Short => "S",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// An open position as held by one source.
///
/// Positions are only built through `account_infra::connectors::normalize`,
/// which guarantees `quantity > 0` and a non-empty symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub source: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,  // Magnitude, always > 0
    pub entry_price: f64,
    pub mark_price: f64,
    pub unrealized_pnl: f64,
}

impl Position {
    /// Price move relative to entry, in percent, signed in the position's favour.
    /// Zero when the entry price is not positive.
    pub fn pnl_percent(&self) -> f64 {
        pnl_percent(self.side, self.entry_price, self.mark_price)
    }
}

pub fn pnl_percent(side: Side, entry_price: f64, mark_price: f64) -> f64 {
    if entry_price <= 0.0 {
        return 0.0;
    }

    match side {
        Side::Long => (mark_price - entry_price) / entry_price * 100.0,
        Side::Short => (entry_price - mark_price) / entry_price * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_gains_when_mark_above_entry() {
        assert!((pnl_percent(Side::Long, 10.0, 12.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn short_gains_when_mark_below_entry() {
        assert!((pnl_percent(Side::Short, 10.0, 8.0) - 20.0).abs() < 1e-9);
        assert!((pnl_percent(Side::Short, 10.0, 12.0) + 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_entry_yields_zero_percent() {
        assert_eq!(pnl_percent(Side::Long, 0.0, 10.0), 0.0);
        assert_eq!(pnl_percent(Side::Short, -1.0, 10.0), 0.0);
    }

    #[test]
    fn side_abbreviations() {
        assert_eq!(Side::Long.abbrev(), "L");
        assert_eq!(Side::Short.abbrev(), "S");
    }
}
