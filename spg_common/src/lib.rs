mod coin_amount;

pub mod helpers;
pub mod op;
mod secret;

pub use coin_amount::{CoinAmount, CoinAmountError, ATOMS_PER_COIN, COIN_DECIMALS};
pub use secret::Secret;
