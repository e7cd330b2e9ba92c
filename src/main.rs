//! DeFiHub core simulation.
//!
//! Walks every engine through its lifecycle: swaps against the seeded AMM,
//! a borrow rejected then accepted by the lending risk checks, staking
//! accrual and unstake, a perp liquidation sweep, and bridge settlement.

use defihub_core::*;
use rust_decimal_macros::dec;

fn main() {
    println!("DeFiHub Computation Core Simulation");
    println!("Deterministic decimal math, seeded demo state\n");

    scenario_1_amm_swaps();
    scenario_2_lending_risk();
    scenario_3_staking_accrual();
    scenario_4_perp_liquidation();
    scenario_5_bridge_settlement();

    println!("\nAll scenarios completed.");
}

/// Quote and execute swaps, including a stale-quote retry.
fn scenario_1_amm_swaps() {
    println!("Scenario 1: AMM Swaps\n");

    let mut amm = seed_amm();
    let alice = Address::new("0xalice");
    let now = Timestamp::now();

    let quote = amm
        .quote("ETH", "USDC", Amount::new(dec!(100)).unwrap())
        .unwrap();
    println!(
        "  100 ETH -> {} USDC (fee {} ETH, impact {}%)",
        wire::amount_str(quote.amount_out),
        wire::amount_str(quote.fee),
        wire::amount_str(quote.price_impact),
    );

    amm.swap(alice.clone(), &quote, now).unwrap();
    println!("  swap executed, {} trades on record", amm.trades().len());

    // a second swap against the same quote must re-quote
    let stale = amm.swap(alice.clone(), &quote, now);
    println!("  replaying the old quote: {}", stale.unwrap_err());
    let fresh = amm
        .quote("ETH", "USDC", Amount::new(dec!(100)).unwrap())
        .unwrap();
    amm.swap(alice, &fresh, now).unwrap();
    println!("  re-quoted and retried once: ok\n");
}

/// Borrow caps and health factors.
fn scenario_2_lending_risk() {
    println!("Scenario 2: Lending Risk\n");

    let mut lending = seed_lending();
    let bob = Address::new("0xbob");
    let now = Timestamp::now();

    lending
        .supply(Address::new("0xlp"), "USDC", Amount::new(dec!(100000)).unwrap())
        .unwrap();

    // 1000 ETH-value collateral at factor 0.80 caps the borrow at 800
    let rejected = lending.borrow(
        bob.clone(),
        "USDC",
        Amount::new(dec!(900)).unwrap(),
        "ETH",
        Amount::new(dec!(1000)).unwrap(),
        now,
    );
    println!("  borrow 900 vs cap 800: {}", rejected.unwrap_err());

    let accepted = lending
        .borrow(
            bob.clone(),
            "USDC",
            Amount::new(dec!(800)).unwrap(),
            "ETH",
            Amount::new(dec!(1000)).unwrap(),
            now,
        )
        .unwrap();
    println!(
        "  borrow 800 accepted, health factor {}",
        wire::amount_str(accepted.health_factor)
    );

    for market in lending.markets() {
        println!(
            "  {} utilization: {}%",
            market.asset,
            wire::price_str(market.utilization())
        );
    }
    println!();
}

/// Reward accrual plotted over a month, then unstake.
fn scenario_3_staking_accrual() {
    println!("Scenario 3: Staking Accrual\n");

    let mut staking = seed_staking();
    let carol = Address::new("0xcarol");
    let staked_at = Timestamp::from_millis(0);

    // pool 2 is the 30-day locked pool at 9.2%
    let stake_id = staking
        .stake(PoolId(2), carol, Amount::new(dec!(1000)).unwrap(), staked_at)
        .unwrap();

    for days in [1, 7, 30] {
        let report = staking.rewards(stake_id, staked_at.plus_days(days)).unwrap();
        println!(
            "  day {:>2}: {} {}",
            days,
            wire::reward_str(report.rewards),
            report.reward_token
        );
    }

    let locked = staking.unstake(stake_id, staked_at.plus_days(29));
    println!("  unstake on day 29: {}", locked.unwrap_err());
    let result = staking.unstake(stake_id, staked_at.plus_days(30)).unwrap();
    println!(
        "  unstake on day 30 pays {}\n",
        wire::reward_str(result.payout)
    );
}

/// Open long and short, push the mark through the long's trigger.
fn scenario_4_perp_liquidation() {
    println!("Scenario 4: Perp Liquidation Sweep\n");

    let mut perp = seed_perp();
    let dave = Address::new("0xdave");
    let now = Timestamp::now();

    perp.update_mark_price("ETH-PERP", Price::new_unchecked(dec!(2500)), now)
        .unwrap();
    let long = perp
        .open(
            dave.clone(),
            "ETH-PERP",
            Amount::new(dec!(1)).unwrap(),
            Side::Long,
            Leverage::new(dec!(10)).unwrap(),
            Amount::new(dec!(250)).unwrap(),
            now,
        )
        .unwrap();
    println!(
        "  long 1 ETH @ {} liquidates at {}",
        wire::price_str(long.entry_price.value()),
        wire::price_str(long.liquidation_price.value())
    );

    let sweep = perp
        .update_mark_price("ETH-PERP", Price::new_unchecked(dec!(2470)), now)
        .unwrap();
    println!(
        "  mark 2470.00 sweeps {} position(s); open positions left: {}\n",
        sweep.liquidated.len(),
        perp.positions_for(&dave).len()
    );
}

/// Transfer scheduling, cancellation, and settlement.
fn scenario_5_bridge_settlement() {
    println!("Scenario 5: Bridge Settlement\n");

    let mut bridge = seed_bridge();
    let eve = Address::new("0xeve");
    let t0 = Timestamp::from_millis(0);

    let kept = bridge
        .transfer(eve.clone(), ChainId(1), ChainId(2), "USDC", Amount::new(dec!(500)).unwrap(), t0)
        .unwrap();
    let dropped = bridge
        .transfer(eve.clone(), ChainId(1), ChainId(3), "USDC", Amount::new(dec!(200)).unwrap(), t0)
        .unwrap();
    println!("  scheduled transfers: {}", bridge.pending_count());

    bridge.cancel(dropped).unwrap();
    let completed = bridge.poll_due(t0.plus_millis(5 * 60 * 1000));
    println!(
        "  after the settlement delay: {} completed, {:?} stays {:?}",
        completed.len(),
        dropped,
        bridge.status(dropped).unwrap().status
    );
    assert_eq!(completed, vec![kept]);
}
