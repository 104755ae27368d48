pub mod time_utils;
pub mod units;

pub use time_utils::*;
pub use units::{gwei_to_wei, to_base_units, UnitError, GWEI_DECIMALS};
