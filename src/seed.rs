// 7.0 seed.rs: explicit bootstrap state. every engine starts from a typed
// constructor called at process start; there is no ambient global store.
// the figures are the platform's demo dataset.

use crate::amm::AmmEngine;
use crate::bridge::{BridgeEngine, BridgeParams};
use crate::lending::{LendingEngine, Market};
use crate::perp::{PerpEngine, PerpMarket};
use crate::staking::{StakingEngine, StakingPool};
use crate::types::{Apy, Leverage, PoolId, Price};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// seeded AMM pools. aggregate liquidity is split into explicit reserves at
// the seeded prices (ETH 2500, stables at par), fee rates as fractions.
pub fn seed_amm() -> AmmEngine {
    let mut engine = AmmEngine::new();
    let add = |engine: &mut AmmEngine, a: &str, b: &str, ra: Decimal, rb: Decimal, fee: Decimal| {
        engine
            .add_pool(a, b, ra, rb, fee)
            .expect("seed pool parameters are valid");
    };
    add(&mut engine, "ETH", "USDC", dec!(2000), dec!(5000000), dec!(0.003));
    add(&mut engine, "ETH", "USDT", dec!(1600), dec!(4000000), dec!(0.003));
    add(&mut engine, "ETH", "DAI", dec!(1200), dec!(3000000), dec!(0.003));
    add(&mut engine, "USDC", "USDT", dec!(7500000), dec!(7500000), dec!(0.0005));
    engine
}

pub fn seed_lending() -> LendingEngine {
    let mut engine = LendingEngine::new();
    let markets = [
        ("ETH", dec!(3.5), dec!(5.2), dec!(0.80)),
        ("USDC", dec!(4.2), dec!(6.8), dec!(0.85)),
        ("USDT", dec!(4.0), dec!(6.5), dec!(0.85)),
        ("DAI", dec!(3.8), dec!(6.2), dec!(0.85)),
        ("WBTC", dec!(2.5), dec!(4.0), dec!(0.75)),
    ];
    for (asset, supply_apy, borrow_apy, collateral_factor) in markets {
        engine.add_market(
            Market::new(asset, supply_apy, borrow_apy, collateral_factor, dec!(0.85))
                .expect("seed collateral factors are valid"),
        );
    }
    engine
}

pub fn seed_staking() -> StakingEngine {
    let mut engine = StakingEngine::new();
    let pools = [
        ("ETH Flexible Pool", "ETH", "DFH", dec!(5.5), dec!(5000000), dec!(0.1), 0, false),
        ("ETH 30-Day Locked", "ETH", "DFH", dec!(9.2), dec!(10000000), dec!(0.5), 30, false),
        ("ETH Auto-Compound", "ETH", "ETH", dec!(12.8), dec!(15000000), dec!(1.0), 90, true),
        ("USDC Stable", "USDC", "DFH", dec!(8.5), dec!(20000000), dec!(100), 0, false),
        ("LP Farming", "ETH-USDC-LP", "DFH", dec!(45.0), dec!(8000000), dec!(10), 60, false),
        ("DFH Governance", "DFH", "DFH", dec!(25.0), dec!(3000000), dec!(100), 180, true),
    ];
    for (i, (name, token, reward_token, apy, tvl, min_stake, lock, compound)) in
        pools.into_iter().enumerate()
    {
        engine.add_pool(StakingPool {
            id: PoolId(i as u32 + 1),
            name: name.to_string(),
            token: token.to_string(),
            reward_token: reward_token.to_string(),
            apy: Apy::new(apy).expect("seed APYs are non-negative"),
            tvl,
            min_stake,
            lock_period_days: lock,
            auto_compound: compound,
        });
    }
    engine
}

pub fn seed_perp() -> PerpEngine {
    let mut engine = PerpEngine::new();
    let markets = [
        ("ETH-PERP", dec!(2500.00), dec!(2501.20), dec!(0.01)),
        ("BTC-PERP", dec!(45000.00), dec!(45050.00), dec!(0.008)),
        ("SOL-PERP", dec!(100.00), dec!(100.50), dec!(0.02)),
    ];
    for (symbol, index, mark, funding_rate) in markets {
        engine.add_market(PerpMarket {
            symbol: symbol.to_string(),
            index_price: Price::new_unchecked(index),
            mark_price: Price::new_unchecked(mark),
            funding_rate,
            open_interest: Decimal::ZERO,
            max_leverage: Leverage::new(dec!(50)).expect("seed leverage is valid"),
        });
    }
    engine
}

pub fn seed_bridge() -> BridgeEngine {
    let mut engine = BridgeEngine::new(BridgeParams::default());
    engine.add_chain("Ethereum", 1, "ETH");
    engine.add_chain("Polygon", 137, "MATIC");
    engine.add_chain("Arbitrum", 42161, "ETH");
    engine.add_chain("Optimism", 10, "ETH");
    engine.add_chain("BSC", 56, "BNB");
    engine.add_chain("Avalanche", 43114, "AVAX");
    engine
}
