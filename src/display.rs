//! Text view-model for a snapshot consumer. Nothing here renders; a UI picks
//! fonts and colors from these values on its own thread.

use serde::{Deserialize, Serialize};
use crate::account_infra::aggregator::AggregatedSnapshot;
use crate::types::Position;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub show_balance: bool,
    pub show_pnl_percent: bool,
    pub show_pnl_usd: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            show_balance: true,
            show_pnl_percent: true,
            show_pnl_usd: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionLine {
    pub text: String,
    /// PnL is zero or better; the consumer picks its color from this.
    pub positive: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotView {
    pub balance: Option<String>,
    pub positions: Vec<PositionLine>,
    pub stale_sources: Vec<String>,
}

/// `$1,234.56`
pub fn format_balance(total: f64) -> String {
    format!("${}", format_amount(total, false))
}

/// `BTCUSDT L  +1.23%  $+2.00`, parts omitted per `options`.
pub fn format_position(position: &Position, options: &DisplayOptions) -> PositionLine {
    let mut parts = vec![format!("{} {}", position.symbol, position.side.abbrev())];
    if options.show_pnl_percent {
        parts.push(format!("{:+.2}%", position.pnl_percent()));
    }
    if options.show_pnl_usd {
        parts.push(format!("${}", format_amount(position.unrealized_pnl, true)));
    }

    PositionLine {
        text: parts.join("  "),
        positive: position.unrealized_pnl >= 0.0,
    }
}

pub fn format_snapshot(snapshot: &AggregatedSnapshot, options: &DisplayOptions) -> SnapshotView {
    SnapshotView {
        balance: options.show_balance.then(|| format_balance(snapshot.total_balance)),
        positions: snapshot
            .positions
            .iter()
            .map(|p| format_position(p, options))
            .collect(),
        stale_sources: snapshot
            .sources
            .iter()
            .filter(|s| s.is_stale)
            .map(|s| s.name.clone())
            .collect(),
    }
}

/// Two decimals with comma thousands separators.
fn format_amount(value: f64, force_sign: bool) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 {
        "-"
    } else if force_sign {
        "+"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, fraction)
}
