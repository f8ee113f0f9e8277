pub mod balance;
pub mod position;
pub mod timestamp;

pub use balance::AccountBalance;
pub use position::{Position, Side};
pub use timestamp::Timestamp;
