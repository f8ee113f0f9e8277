//! Source-independent normalization applied to every fetch result.
//!
//! Each adapter hands back `RawPosition`s with whatever side token and signed
//! quantity the exchange used; this module maps them onto `Position` the same
//! way for every source.

use crate::account_infra::{AccountData, RawAccountData, RawPosition};
use crate::error::FetchError;
use crate::types::{Position, Side};

/// Resolve a side from an exchange token, falling back to the quantity sign.
///
/// Tokens containing "buy" or "long" (any case) are `Long`, "sell" or
/// "short" are `Short`. Anything else ("BOTH", "", "N/A") defers to
/// `quantity > 0`.
pub fn normalize_side(token: Option<&str>, signed_quantity: f64) -> Side {
    if let Some(token) = token {
        let token = token.to_ascii_lowercase();
        if token.contains("buy") || token.contains("long") {
            return Side::Long;
        }
        if token.contains("sell") || token.contains("short") {
            return Side::Short;
        }
    }

    if signed_quantity > 0.0 { Side::Long } else { Side::Short }
}

/// Map one raw position. `None` for flat or unusable entries.
pub fn normalize_position(source: &str, raw: &RawPosition) -> Option<Position> {
    let symbol = raw.symbol.trim();
    if symbol.is_empty() {
        tracing::debug!(source, "Dropping position without symbol");
        return None;
    }

    if !raw.quantity.is_finite() || raw.quantity == 0.0 {
        return None;
    }

    Some(Position {
        source: source.to_string(),
        symbol: symbol.to_string(),
        side: normalize_side(raw.side_token.as_deref(), raw.quantity),
        quantity: raw.quantity.abs(),
        entry_price: non_negative(raw.entry_price),
        mark_price: non_negative(raw.mark_price),
        unrealized_pnl: if raw.unrealized_pnl.is_finite() { raw.unrealized_pnl } else { 0.0 },
    })
}

pub fn normalize_positions(source: &str, raw: &[RawPosition]) -> Vec<Position> {
    raw.iter()
        .filter_map(|p| normalize_position(source, p))
        .collect()
}

pub fn normalize_account(source: &str, raw: RawAccountData) -> Result<AccountData, FetchError> {
    if !raw.balance.is_finite() {
        return Err(FetchError::MalformedResponse(format!(
            "non-finite balance reported: {:?}",
            raw.balance
        )));
    }

    Ok(AccountData {
        balance: raw.balance,
        positions: normalize_positions(source, &raw.positions),
    })
}

/// Parse an exchange decimal string. Exchanges send "" for absent values,
/// which reads as zero.
pub fn parse_amount(field: &str, value: &str) -> Result<f64, FetchError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0.0);
    }

    value.parse::<f64>().map_err(|_| {
        FetchError::MalformedResponse(format!("field {} is not a number: {:?}", field, value))
    })
}

fn non_negative(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 { price } else { 0.0 }
}
