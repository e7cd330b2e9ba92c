// 2.0 wire.rs: boundary rendering. the HTTP layer (out of scope) ships
// decimals as strings so nothing crosses the wire as binary floating point.
// precision by domain: prices 2dp, token amounts 6dp, staking rewards 18dp.
// rounding is always toward zero. the protocol never rounds in its own favor.

use rust_decimal::Decimal;

pub const PRICE_DP: u32 = 2;
pub const AMOUNT_DP: u32 = 6;
pub const REWARD_DP: u32 = 18;

// truncate to `dp` decimal places, then pad with zeros to exactly `dp`.
pub fn fixed(value: Decimal, dp: u32) -> String {
    let truncated = value.trunc_with_scale(dp);
    format!("{truncated:.prec$}", prec = dp as usize)
}

pub fn price_str(value: Decimal) -> String {
    fixed(value, PRICE_DP)
}

pub fn amount_str(value: Decimal) -> String {
    fixed(value, AMOUNT_DP)
}

pub fn reward_str(value: Decimal) -> String {
    fixed(value, REWARD_DP)
}
