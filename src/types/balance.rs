use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

/// Quote-currency balance of one account (USDT for every supported source).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub total: f64,
    pub available: f64,
    pub unrealized_pnl: f64,
}

impl AccountBalance {
    pub fn new(total: f64, available: f64, unrealized_pnl: f64) -> Self {
        AccountBalance {
            total,
            available,
            unrealized_pnl,
        }
    }

    pub fn zero() -> Self {
        AccountBalance::default()
    }

    pub fn is_finite(&self) -> bool {
        self.total.is_finite() && self.available.is_finite() && self.unrealized_pnl.is_finite()
    }
}

impl Add for AccountBalance {
    type Output = AccountBalance;
    fn add(self, other: AccountBalance) -> AccountBalance {
        AccountBalance {
            total: self.total + other.total,
            available: self.available + other.available,
            unrealized_pnl: self.unrealized_pnl + other.unrealized_pnl,
        }
    }
}

impl Sum for AccountBalance {
    fn sum<I: Iterator<Item = AccountBalance>>(iter: I) -> Self {
        iter.fold(AccountBalance::zero(), Add::add)
    }
}
