//! End-to-end scenarios over the seeded engines, with exact expected
//! values. Each scenario drives one engine the way its service boundary
//! would, including the failure paths.

use defihub_core::*;
use rust_decimal_macros::dec;

#[test]
fn amm_fee_breakdown_on_seeded_pool() {
    let amm = seed_amm();
    // ETH/USDC at 0.3%: fee on 100 ETH is exactly 0.3, leaving 99.7
    let quote = amm
        .quote("ETH", "USDC", Amount::new(dec!(100)).unwrap())
        .unwrap();
    assert_eq!(quote.fee, dec!(0.3));
    assert_eq!(quote.amount_in - quote.fee, dec!(99.7));
    // constant product against the seeded 2000/5,000,000 reserves
    assert_eq!(
        quote.amount_out,
        dec!(99.7) * dec!(5000000) / (dec!(2000) + dec!(99.7))
    );
}

#[test]
fn amm_quote_has_no_side_effects() {
    let amm = seed_amm();
    let before: Vec<(rust_decimal::Decimal, rust_decimal::Decimal)> = amm
        .pools()
        .map(|p| (p.reserve_a, p.reserve_b))
        .collect();

    for _ in 0..3 {
        amm.quote("ETH", "USDC", Amount::new(dec!(42)).unwrap())
            .unwrap();
    }

    let after: Vec<(rust_decimal::Decimal, rust_decimal::Decimal)> = amm
        .pools()
        .map(|p| (p.reserve_a, p.reserve_b))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn lending_rejected_borrow_changes_nothing() {
    let mut lending = seed_lending();
    lending
        .supply(Address::new("0xlp"), "USDC", Amount::new(dec!(100000)).unwrap())
        .unwrap();
    let user = Address::new("0xuser");
    let supplied_before = lending.get_market("USDC").unwrap().total_supplied;
    let borrowed_before = lending.get_market("USDC").unwrap().total_borrowed;

    // cap is 1000 * 0.80 = 800
    let err = lending
        .borrow(
            user.clone(),
            "USDC",
            Amount::new(dec!(1200)).unwrap(),
            "ETH",
            Amount::new(dec!(1000)).unwrap(),
            Timestamp::from_millis(0),
        )
        .unwrap_err();

    assert!(matches!(err, LendingError::InsufficientCollateral { .. }));
    let market = lending.get_market("USDC").unwrap();
    assert_eq!(market.total_supplied, supplied_before);
    assert_eq!(market.total_borrowed, borrowed_before);
    assert!(lending.position(&user, "USDC").is_none());
    assert!(lending.loans_for(&user).is_empty());
}

#[test]
fn lending_market_stays_solvent_through_loan_lifecycle() {
    // supply -> borrow -> withdraw -> repay, checking after every step that
    // the market never lends more than it holds and never goes negative
    let mut lending = seed_lending();
    let user = Address::new("0xuser");
    let solvent = |lending: &LendingEngine| {
        let market = lending.get_market("USDC").unwrap();
        assert!(market.total_borrowed >= rust_decimal::Decimal::ZERO);
        assert!(market.total_borrowed <= market.total_supplied);
    };

    lending
        .supply(user.clone(), "USDC", Amount::new(dec!(100)).unwrap())
        .unwrap();
    solvent(&lending);

    let loan = lending
        .borrow(
            user.clone(),
            "USDC",
            Amount::new(dec!(80)).unwrap(),
            "ETH",
            Amount::new(dec!(1000)).unwrap(),
            Timestamp::from_millis(0),
        )
        .unwrap();
    solvent(&lending);

    // the escrowed 1000 ETH collateral is not a withdrawable balance
    assert!(matches!(
        lending
            .withdraw(&user, "USDC", Amount::new(dec!(900)).unwrap())
            .unwrap_err(),
        LendingError::InsufficientBalance { .. }
    ));
    // and the supplied 100 is mostly lent out, so only 20 can leave
    assert!(matches!(
        lending
            .withdraw(&user, "USDC", Amount::new(dec!(100)).unwrap())
            .unwrap_err(),
        LendingError::InsufficientLiquidity { .. }
    ));
    lending
        .withdraw(&user, "USDC", Amount::new(dec!(20)).unwrap())
        .unwrap();
    solvent(&lending);

    lending.repay(loan.loan_id).unwrap();
    solvent(&lending);
    let position = lending.position(&user, "USDC").unwrap();
    assert_eq!(position.supplied, dec!(80));
    assert_eq!(position.collateral, dec!(0));
    assert_eq!(position.borrowed, dec!(0));
}

#[test]
fn staking_thirty_day_scenario() {
    let mut staking = seed_staking();
    let staked_at = Timestamp::from_millis(0);
    // pool 2: ETH 30-Day Locked, 9.2% APY
    let id = staking
        .stake(
            PoolId(2),
            Address::new("0xstaker"),
            Amount::new(dec!(1000)).unwrap(),
            staked_at,
        )
        .unwrap();

    let report = staking.rewards(id, staked_at.plus_days(30)).unwrap();
    assert_eq!(report.days_staked, 30);
    // 1000 * 0.092/365 * 30 truncated to 18dp
    let expected = (dec!(1000) * dec!(0.092) / dec!(365) * dec!(30)).trunc_with_scale(18);
    assert_eq!(report.rewards, expected);
    assert_eq!(wire::reward_str(report.rewards), "7.561643835616438356");
}

#[test]
fn perp_long_liquidation_scenario() {
    let mut perp = seed_perp();
    perp.update_mark_price("ETH-PERP", Price::new_unchecked(dec!(2500)), Timestamp::from_millis(0))
        .unwrap();

    let result = perp
        .open(
            Address::new("0xtrader"),
            "ETH-PERP",
            Amount::new(dec!(1)).unwrap(),
            Side::Long,
            Leverage::new(dec!(10)).unwrap(),
            Amount::new(dec!(250)).unwrap(),
            Timestamp::from_millis(0),
        )
        .unwrap();

    // distance = 250 / 1 / 10 = 25 → trigger 2475
    assert_eq!(result.liquidation_price.value(), dec!(2475));
    assert_eq!(wire::price_str(result.liquidation_price.value()), "2475.00");
}

#[test]
fn bridge_lifecycle_with_cancellation() {
    let mut bridge = seed_bridge();
    let user = Address::new("0xbridger");
    let t0 = Timestamp::from_millis(0);

    let first = bridge
        .transfer(user.clone(), ChainId(1), ChainId(2), "USDC", Amount::new(dec!(1000)).unwrap(), t0)
        .unwrap();
    let second = bridge
        .transfer(user.clone(), ChainId(1), ChainId(4), "USDC", Amount::new(dec!(1000)).unwrap(), t0)
        .unwrap();

    bridge.cancel(second).unwrap();
    let completed = bridge.poll_due(t0.plus_millis(5 * 60 * 1000));
    assert_eq!(completed, vec![first]);
    assert_eq!(bridge.status(first).unwrap().status, TransferStatus::Completed);
    assert_eq!(bridge.status(second).unwrap().status, TransferStatus::Cancelled);
    assert_eq!(bridge.transfers_for(&user).len(), 2);
}

#[test]
fn boundary_serialization_uses_strings() {
    // decimal fields must cross the wire as exact strings, never floats
    let amm = seed_amm();
    let quote = amm
        .quote("ETH", "USDC", Amount::new(dec!(100)).unwrap())
        .unwrap();

    let json = serde_json::to_value(&quote).unwrap();
    // 100 * 0.003, carrying the factors' combined scale
    assert_eq!(json["fee"], serde_json::json!("0.300"));
    assert!(json["amount_out"].is_string());
    assert_eq!(json["token_in"], serde_json::json!("ETH"));
}
