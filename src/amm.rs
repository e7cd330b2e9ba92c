//! Constant-product AMM quoting and swap execution.
//!
//! A pool holds explicit reserves of two tokens. Quotes are pure reads;
//! swaps mutate both reserves and append an immutable trade record in one
//! critical section. The swap fee stays in the pool, so the product of
//! reserves never decreases across a swap.

use crate::types::{Address, Amount, PoolId, Timestamp, Version};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub token_a: String,
    pub token_b: String,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    // fraction of amount_in kept as fee, in [0, 1). 0.003 = 0.3%
    pub fee_rate: Decimal,
    pub volume_24h: Decimal,
    pub version: Version,
}

impl Pool {
    pub fn new(
        id: PoolId,
        token_a: impl Into<String>,
        token_b: impl Into<String>,
        reserve_a: Decimal,
        reserve_b: Decimal,
        fee_rate: Decimal,
    ) -> Result<Self, AmmError> {
        if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
            return Err(AmmError::InvalidFeeRate(fee_rate));
        }
        if reserve_a < Decimal::ZERO || reserve_b < Decimal::ZERO {
            return Err(AmmError::NegativeReserve);
        }
        Ok(Self {
            id,
            token_a: token_a.into(),
            token_b: token_b.into(),
            reserve_a,
            reserve_b,
            fee_rate,
            volume_24h: Decimal::ZERO,
            version: Version::initial(),
        })
    }

    // order-independent pair match. token symbols are case-sensitive.
    pub fn matches_pair(&self, token_in: &str, token_out: &str) -> bool {
        (self.token_a == token_in && self.token_b == token_out)
            || (self.token_a == token_out && self.token_b == token_in)
    }

    // (reserve_in, reserve_out) oriented for a token_in → token_out trade
    pub fn oriented_reserves(&self, token_in: &str) -> (Decimal, Decimal) {
        if self.token_a == token_in {
            (self.reserve_a, self.reserve_b)
        } else {
            (self.reserve_b, self.reserve_a)
        }
    }

    // reserve_in * reserve_out. must not decrease across a swap.
    pub fn invariant(&self) -> Decimal {
        self.reserve_a * self.reserve_b
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    pub pool_id: PoolId,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee: Decimal,
    // percent gap between spot price and execution price
    pub price_impact: Decimal,
    // pool version the quote was computed against; swap checks it
    pub pool_version: Version,
}

// immutable record of an executed swap. append-only, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub user: Address,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee: Decimal,
    // amount_out / amount_in
    pub price: Decimal,
    pub executed_at: Timestamp,
}

// 3.1: the pricing formula. fee off the top, then constant product:
//   amount_out = after_fee * reserve_out / (reserve_in + after_fee)
// fee = amount_in * fee_rate, exact. output is always strictly less than
// reserve_out, so the pool can never be drained by a single swap.
pub fn quote_swap(
    pool: &Pool,
    token_in: &str,
    amount_in: Amount,
) -> Result<SwapQuote, AmmError> {
    if pool.token_a != token_in && pool.token_b != token_in {
        return Err(AmmError::TokenNotInPool {
            token: token_in.to_string(),
            pool_id: pool.id,
        });
    }
    let (reserve_in, reserve_out) = pool.oriented_reserves(token_in);
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(AmmError::InsufficientLiquidity(pool.id));
    }

    let amount_in = amount_in.value();
    let fee = amount_in * pool.fee_rate;
    let after_fee = amount_in - fee;
    let amount_out = after_fee * reserve_out / (reserve_in + after_fee);

    // spot price before the trade vs the price actually paid
    let spot = reserve_out / reserve_in;
    let execution = amount_out / after_fee;
    let price_impact = (Decimal::ONE - execution / spot) * dec!(100);

    let token_out = if pool.token_a == token_in {
        pool.token_b.clone()
    } else {
        pool.token_a.clone()
    };

    Ok(SwapQuote {
        pool_id: pool.id,
        token_in: token_in.to_string(),
        token_out,
        amount_in,
        amount_out,
        fee,
        price_impact,
        pool_version: pool.version,
    })
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AmmError {
    #[error("No pool for pair {token_in}/{token_out}")]
    PoolNotFound { token_in: String, token_out: String },

    #[error("Pool {0:?} has an empty reserve")]
    InsufficientLiquidity(PoolId),

    #[error("Token {token} is not in pool {pool_id:?}")]
    TokenNotInPool { token: String, pool_id: PoolId },

    #[error("Fee rate {0} outside [0, 1)")]
    InvalidFeeRate(Decimal),

    #[error("Pool reserves must be non-negative")]
    NegativeReserve,

    #[error("Quote is stale: pool at {current}, quoted at {quoted}. re-quote and retry once")]
    StaleQuote { quoted: Version, current: Version },
}

#[derive(Debug, Clone)]
pub struct SwapResult {
    pub quote: SwapQuote,
    pub pool_version: Version,
}

/// All AMM state: pools plus the append-only trade log.
/// Single-writer: every mutation goes through `&mut self`, so updates to a
/// pool and its trade record land atomically.
#[derive(Debug, Default)]
pub struct AmmEngine {
    pools: HashMap<PoolId, Pool>,
    trades: Vec<TradeRecord>,
    next_pool_id: u32,
}

impl AmmEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pool(
        &mut self,
        token_a: impl Into<String>,
        token_b: impl Into<String>,
        reserve_a: Decimal,
        reserve_b: Decimal,
        fee_rate: Decimal,
    ) -> Result<PoolId, AmmError> {
        self.next_pool_id += 1;
        let id = PoolId(self.next_pool_id);
        let pool = Pool::new(id, token_a, token_b, reserve_a, reserve_b, fee_rate)?;
        self.pools.insert(id, pool);
        Ok(id)
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    pub fn get_pool(&self, id: PoolId) -> Option<&Pool> {
        self.pools.get(&id)
    }

    pub fn find_pool(&self, token_in: &str, token_out: &str) -> Result<&Pool, AmmError> {
        self.pools
            .values()
            .find(|p| p.matches_pair(token_in, token_out))
            .ok_or_else(|| AmmError::PoolNotFound {
                token_in: token_in.to_string(),
                token_out: token_out.to_string(),
            })
    }

    /// Pure read. No state is touched; quoting twice with the same inputs
    /// and no intervening swap returns identical results.
    pub fn quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Amount,
    ) -> Result<SwapQuote, AmmError> {
        let pool = self.find_pool(token_in, token_out)?;
        quote_swap(pool, token_in, amount_in)
    }

    /// Execute a previously obtained quote. Fails with `StaleQuote` when the
    /// pool has moved since the quote was taken (the caller's lost update);
    /// the caller re-quotes and retries once.
    pub fn swap(
        &mut self,
        user: Address,
        quote: &SwapQuote,
        now: Timestamp,
    ) -> Result<SwapResult, AmmError> {
        let pool = self
            .pools
            .get_mut(&quote.pool_id)
            .ok_or_else(|| AmmError::PoolNotFound {
                token_in: quote.token_in.clone(),
                token_out: quote.token_out.clone(),
            })?;

        if pool.version != quote.pool_version {
            return Err(AmmError::StaleQuote {
                quoted: quote.pool_version,
                current: pool.version,
            });
        }

        // reserve_in grows by the full amount_in (fee included),
        // reserve_out shrinks by amount_out. k never decreases.
        if pool.token_a == quote.token_in {
            pool.reserve_a += quote.amount_in;
            pool.reserve_b -= quote.amount_out;
        } else {
            pool.reserve_b += quote.amount_in;
            pool.reserve_a -= quote.amount_out;
        }
        pool.volume_24h += quote.amount_in;
        pool.version.bump();
        let pool_version = pool.version;

        self.trades.push(TradeRecord {
            user,
            token_in: quote.token_in.clone(),
            token_out: quote.token_out.clone(),
            amount_in: quote.amount_in,
            amount_out: quote.amount_out,
            fee: quote.fee,
            price: quote.amount_out / quote.amount_in,
            executed_at: now,
        });

        Ok(SwapResult {
            quote: quote.clone(),
            pool_version,
        })
    }

    pub fn trades_for(&self, user: &Address) -> Vec<&TradeRecord> {
        self.trades.iter().filter(|t| &t.user == user).collect()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eth_usdc_engine() -> AmmEngine {
        let mut engine = AmmEngine::new();
        // 2000 ETH / 5,000,000 USDC, spot 2500, 0.3% fee
        engine
            .add_pool("ETH", "USDC", dec!(2000), dec!(5000000), dec!(0.003))
            .unwrap();
        engine
    }

    #[test]
    fn fee_is_exact() {
        let engine = eth_usdc_engine();
        let quote = engine
            .quote("ETH", "USDC", Amount::new(dec!(100)).unwrap())
            .unwrap();

        // fee = 100 * 0.003 = 0.3, amount after fee = 99.7, exactly
        assert_eq!(quote.fee, dec!(0.3));
        assert_eq!(quote.amount_in - quote.fee, dec!(99.7));
    }

    #[test]
    fn constant_product_output() {
        let engine = eth_usdc_engine();
        let quote = engine
            .quote("ETH", "USDC", Amount::new(dec!(100)).unwrap())
            .unwrap();

        // 99.7 * 5000000 / (2000 + 99.7)
        let expected = dec!(99.7) * dec!(5000000) / dec!(2099.7);
        assert_eq!(quote.amount_out, expected);
        assert!(quote.amount_out < dec!(5000000));
        assert!(quote.price_impact > Decimal::ZERO);
    }

    #[test]
    fn pair_lookup_is_order_independent() {
        let engine = eth_usdc_engine();
        assert!(engine.find_pool("USDC", "ETH").is_ok());
        assert!(engine.find_pool("ETH", "USDC").is_ok());
    }

    #[test]
    fn unknown_pair_is_pool_not_found() {
        let engine = eth_usdc_engine();
        let err = engine
            .quote("ETH", "DOGE", Amount::new(dec!(1)).unwrap())
            .unwrap_err();
        assert!(matches!(err, AmmError::PoolNotFound { .. }));
    }

    #[test]
    fn quote_is_pure() {
        let engine = eth_usdc_engine();
        let a = engine
            .quote("ETH", "USDC", Amount::new(dec!(50)).unwrap())
            .unwrap();
        let b = engine
            .quote("ETH", "USDC", Amount::new(dec!(50)).unwrap())
            .unwrap();
        assert_eq!(a.amount_out, b.amount_out);
        assert_eq!(a.pool_version, b.pool_version);
    }

    #[test]
    fn swap_moves_reserves_and_records_trade() {
        let mut engine = eth_usdc_engine();
        let quote = engine
            .quote("ETH", "USDC", Amount::new(dec!(100)).unwrap())
            .unwrap();
        let k_before = engine.find_pool("ETH", "USDC").unwrap().invariant();

        let user = Address::new("0xabc");
        engine
            .swap(user.clone(), &quote, Timestamp::from_millis(0))
            .unwrap();

        let pool = engine.find_pool("ETH", "USDC").unwrap();
        assert_eq!(pool.reserve_a, dec!(2100));
        assert_eq!(pool.reserve_b, dec!(5000000) - quote.amount_out);
        // fee stays in the pool, so k grows
        assert!(pool.invariant() >= k_before);

        let trades = engine.trades_for(&user);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].amount_in, dec!(100));
    }

    #[test]
    fn stale_quote_is_rejected() {
        let mut engine = eth_usdc_engine();
        let quote_1 = engine
            .quote("ETH", "USDC", Amount::new(dec!(10)).unwrap())
            .unwrap();
        let quote_2 = engine
            .quote("ETH", "USDC", Amount::new(dec!(10)).unwrap())
            .unwrap();

        engine
            .swap(Address::new("0xaaa"), &quote_1, Timestamp::from_millis(0))
            .unwrap();

        // second swap was quoted against the pre-swap pool
        let err = engine
            .swap(Address::new("0xbbb"), &quote_2, Timestamp::from_millis(1))
            .unwrap_err();
        assert!(matches!(err, AmmError::StaleQuote { .. }));

        // retry with a fresh quote succeeds
        let fresh = engine
            .quote("ETH", "USDC", Amount::new(dec!(10)).unwrap())
            .unwrap();
        assert!(engine
            .swap(Address::new("0xbbb"), &fresh, Timestamp::from_millis(2))
            .is_ok());
    }

    #[test]
    fn invalid_fee_rate_rejected() {
        let mut engine = AmmEngine::new();
        let err = engine
            .add_pool("A", "B", dec!(1), dec!(1), dec!(1))
            .unwrap_err();
        assert!(matches!(err, AmmError::InvalidFeeRate(_)));
    }
}
