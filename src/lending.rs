//! Lending markets, user positions, and collateralization math.
//!
//! Collateral is valued in the common unit of account (no oracle). The two
//! risk parameters are distinct: collateral_factor caps new borrows,
//! liquidation_threshold drives the health factor. A position with
//! health factor below 1 is eligible for liquidation.
//!
//! Supplied balances enter the market's lendable pool; loan collateral is
//! escrowed on the position instead and never counted in total_supplied,
//! so 0 <= total_borrowed <= total_supplied holds across every operation.

use crate::types::{Address, Amount, LoanId, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub asset: String,
    pub total_supplied: Decimal,
    pub total_borrowed: Decimal,
    pub supply_apy: Decimal,
    pub borrow_apy: Decimal,
    // fraction of collateral value that may be borrowed against, in (0, 1]
    pub collateral_factor: Decimal,
    // fraction of collateral value counted when checking solvency
    pub liquidation_threshold: Decimal,
}

impl Market {
    pub fn new(
        asset: impl Into<String>,
        supply_apy: Decimal,
        borrow_apy: Decimal,
        collateral_factor: Decimal,
        liquidation_threshold: Decimal,
    ) -> Result<Self, LendingError> {
        if collateral_factor <= Decimal::ZERO || collateral_factor > Decimal::ONE {
            return Err(LendingError::InvalidCollateralFactor(collateral_factor));
        }
        Ok(Self {
            asset: asset.into(),
            total_supplied: Decimal::ZERO,
            total_borrowed: Decimal::ZERO,
            supply_apy,
            borrow_apy,
            collateral_factor,
            liquidation_threshold,
        })
    }

    /// Borrowed share of supply as a percent. A market with nothing supplied
    /// reports 0, never a divide-by-zero.
    pub fn utilization(&self) -> Decimal {
        if self.total_supplied.is_zero() {
            return Decimal::ZERO;
        }
        self.total_borrowed / self.total_supplied * dec!(100)
    }
}

// one per (user, asset). supplied balance, escrowed collateral, and debt
// are tracked separately: `supplied` is money deposited into the market and
// withdrawable, `collateral` is escrowed against active loans and released
// only by repay or liquidation. both count toward the health factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPosition {
    pub user: Address,
    pub asset: String,
    pub supplied: Decimal,
    pub collateral: Decimal,
    pub borrowed: Decimal,
    pub health_factor: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Repaid,
    Liquidated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub user: Address,
    pub asset: String,
    pub amount: Decimal,
    pub collateral_asset: String,
    pub collateral_amount: Decimal,
    pub interest_rate: Decimal,
    pub status: LoanStatus,
    pub created_at: Timestamp,
}

// 4.1: health = collateral * liquidation_threshold / borrowed.
// no debt means nothing can liquidate you, reported as Decimal::MAX.
pub fn health_factor(
    collateral_value: Decimal,
    liquidation_threshold: Decimal,
    borrowed_value: Decimal,
) -> Decimal {
    if borrowed_value.is_zero() {
        return Decimal::MAX;
    }
    collateral_value * liquidation_threshold / borrowed_value
}

pub fn max_borrow(collateral_value: Decimal, collateral_factor: Decimal) -> Decimal {
    collateral_value * collateral_factor
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LendingError {
    #[error("No market for asset {0}")]
    MarketNotFound(String),

    #[error("Loan {0:?} not found")]
    LoanNotFound(LoanId),

    #[error("No position for {user} in {asset}")]
    PositionNotFound { user: Address, asset: String },

    #[error("Collateral factor {0} outside (0, 1]")]
    InvalidCollateralFactor(Decimal),

    #[error("Requested {requested} exceeds max borrow {max_borrow} for collateral {collateral}")]
    InsufficientCollateral {
        requested: Decimal,
        max_borrow: Decimal,
        collateral: Decimal,
    },

    #[error("Market {asset} has {available} available, requested {requested}")]
    InsufficientLiquidity {
        asset: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Withdrawal of {requested} would leave position unhealthy (health {resulting_health})")]
    WithdrawalUnsafe {
        requested: Decimal,
        resulting_health: Decimal,
    },

    #[error("Withdrawal of {requested} exceeds supplied balance {supplied}")]
    InsufficientBalance {
        requested: Decimal,
        supplied: Decimal,
    },

    #[error("Loan {0:?} is not active")]
    LoanNotActive(LoanId),

    #[error("Position health {0} is above liquidation threshold")]
    PositionHealthy(Decimal),
}

#[derive(Debug, Clone)]
pub struct BorrowResult {
    pub loan_id: LoanId,
    pub borrowed: Decimal,
    pub health_factor: Decimal,
}

#[derive(Debug, Clone)]
pub struct LiquidationOutcome {
    pub loan_id: LoanId,
    pub debt_repaid: Decimal,
    pub collateral_seized: Decimal,
}

/// All lending state. Every mutation runs inside one `&mut self` call, so a
/// position and its market are always updated together (single-writer
/// critical section); validation happens before any write.
#[derive(Debug, Default)]
pub struct LendingEngine {
    markets: HashMap<String, Market>,
    positions: HashMap<(Address, String), AccountPosition>,
    loans: Vec<Loan>,
    next_loan_id: u64,
}

impl LendingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_market(&mut self, market: Market) {
        self.markets.insert(market.asset.clone(), market);
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn get_market(&self, asset: &str) -> Result<&Market, LendingError> {
        self.markets
            .get(asset)
            .ok_or_else(|| LendingError::MarketNotFound(asset.to_string()))
    }

    pub fn position(&self, user: &Address, asset: &str) -> Option<&AccountPosition> {
        self.positions.get(&(user.clone(), asset.to_string()))
    }

    pub fn positions_for(&self, user: &Address) -> Vec<&AccountPosition> {
        self.positions
            .values()
            .filter(|p| &p.user == user)
            .collect()
    }

    pub fn loans_for(&self, user: &Address) -> Vec<&Loan> {
        self.loans
            .iter()
            .filter(|l| &l.user == user && l.status == LoanStatus::Active)
            .collect()
    }

    pub fn loan(&self, id: LoanId) -> Result<&Loan, LendingError> {
        self.loans
            .iter()
            .find(|l| l.id == id)
            .ok_or(LendingError::LoanNotFound(id))
    }

    /// Deposit `amount` of `asset` into the market. The balance is lendable
    /// to borrowers and counts toward the depositor's health factor.
    pub fn supply(
        &mut self,
        user: Address,
        asset: &str,
        amount: Amount,
    ) -> Result<Decimal, LendingError> {
        if !self.markets.contains_key(asset) {
            return Err(LendingError::MarketNotFound(asset.to_string()));
        }

        let position = self.upsert_position(&user, asset);
        position.supplied += amount.value();
        self.recompute_health(&user, asset);

        let market = self.markets.get_mut(asset).expect("market checked above");
        market.total_supplied += amount.value();

        Ok(self
            .position(&user, asset)
            .map(|p| p.health_factor)
            .unwrap_or(Decimal::MAX))
    }

    /// Withdraw previously supplied balance. Escrowed loan collateral is not
    /// withdrawable; the request is further bounded by the market's unlent
    /// liquidity and rejected when it would push the position's health
    /// factor below 1.
    pub fn withdraw(
        &mut self,
        user: &Address,
        asset: &str,
        amount: Amount,
    ) -> Result<(), LendingError> {
        let market = self.get_market(asset)?;
        let threshold = market.liquidation_threshold;
        let available = market.total_supplied - market.total_borrowed;

        let position = self
            .positions
            .get(&(user.clone(), asset.to_string()))
            .ok_or_else(|| LendingError::PositionNotFound {
                user: user.clone(),
                asset: asset.to_string(),
            })?;

        if amount.value() > position.supplied {
            return Err(LendingError::InsufficientBalance {
                requested: amount.value(),
                supplied: position.supplied,
            });
        }

        // supplied funds may already be lent out; the market can only pay
        // out what is not backing a loan
        if amount.value() > available {
            return Err(LendingError::InsufficientLiquidity {
                asset: asset.to_string(),
                available,
                requested: amount.value(),
            });
        }

        let resulting = health_factor(
            position.supplied - amount.value() + position.collateral,
            threshold,
            position.borrowed,
        );
        if resulting < Decimal::ONE {
            return Err(LendingError::WithdrawalUnsafe {
                requested: amount.value(),
                resulting_health: resulting,
            });
        }

        let position = self
            .positions
            .get_mut(&(user.clone(), asset.to_string()))
            .expect("position checked above");
        position.supplied -= amount.value();
        self.recompute_health(user, asset);

        let market = self.markets.get_mut(asset).expect("market checked above");
        market.total_supplied -= amount.value();
        Ok(())
    }

    /// Borrow `amount` of `asset` against `collateral_amount` of
    /// `collateral_asset`. The collateral is escrowed on the position until
    /// repay or liquidation. Checked against both the collateral cap and the
    /// market's available liquidity before any state is written; a rejected
    /// borrow leaves everything untouched.
    pub fn borrow(
        &mut self,
        user: Address,
        asset: &str,
        amount: Amount,
        collateral_asset: &str,
        collateral_amount: Amount,
        now: Timestamp,
    ) -> Result<BorrowResult, LendingError> {
        let collateral_market = self.get_market(collateral_asset)?;
        let cap = max_borrow(collateral_amount.value(), collateral_market.collateral_factor);
        if amount.value() > cap {
            return Err(LendingError::InsufficientCollateral {
                requested: amount.value(),
                max_borrow: cap,
                collateral: collateral_amount.value(),
            });
        }

        let market = self.get_market(asset)?;
        let available = market.total_supplied - market.total_borrowed;
        if amount.value() > available {
            return Err(LendingError::InsufficientLiquidity {
                asset: asset.to_string(),
                available,
                requested: amount.value(),
            });
        }
        let interest_rate = market.borrow_apy;

        // validation done. commit: loan, position, market, in that order,
        // all inside this call.
        self.next_loan_id += 1;
        let loan_id = LoanId(self.next_loan_id);
        self.loans.push(Loan {
            id: loan_id,
            user: user.clone(),
            asset: asset.to_string(),
            amount: amount.value(),
            collateral_asset: collateral_asset.to_string(),
            collateral_amount: collateral_amount.value(),
            interest_rate,
            status: LoanStatus::Active,
            created_at: now,
        });

        let position = self.upsert_position(&user, asset);
        position.collateral += collateral_amount.value();
        position.borrowed += amount.value();
        self.recompute_health(&user, asset);

        let market = self.markets.get_mut(asset).expect("market checked above");
        market.total_borrowed += amount.value();

        let health = self
            .position(&user, asset)
            .map(|p| p.health_factor)
            .unwrap_or(Decimal::MAX);

        Ok(BorrowResult {
            loan_id,
            borrowed: amount.value(),
            health_factor: health,
        })
    }

    /// Repay an active loan in full: debt cleared, collateral released,
    /// loan transitions to `repaid`.
    pub fn repay(&mut self, loan_id: LoanId) -> Result<(), LendingError> {
        let loan = self
            .loans
            .iter_mut()
            .find(|l| l.id == loan_id)
            .ok_or(LendingError::LoanNotFound(loan_id))?;
        if loan.status != LoanStatus::Active {
            return Err(LendingError::LoanNotActive(loan_id));
        }
        loan.status = LoanStatus::Repaid;
        let (user, asset, amount, collateral_amount) = (
            loan.user.clone(),
            loan.asset.clone(),
            loan.amount,
            loan.collateral_amount,
        );

        if let Some(position) = self.positions.get_mut(&(user.clone(), asset.clone())) {
            position.borrowed -= amount;
            position.collateral -= collateral_amount.min(position.collateral);
        }
        self.recompute_health(&user, &asset);

        if let Some(market) = self.markets.get_mut(&asset) {
            market.total_borrowed -= amount;
        }
        Ok(())
    }

    /// Seize collateral on an underwater loan. Only permitted when the
    /// owning position's health factor is below 1; the loan transitions to
    /// `liquidated` and the market/position pair is updated in the same
    /// critical section.
    pub fn liquidate(&mut self, loan_id: LoanId) -> Result<LiquidationOutcome, LendingError> {
        let loan = self
            .loans
            .iter()
            .find(|l| l.id == loan_id)
            .ok_or(LendingError::LoanNotFound(loan_id))?;
        if loan.status != LoanStatus::Active {
            return Err(LendingError::LoanNotActive(loan_id));
        }
        let (user, asset) = (loan.user.clone(), loan.asset.clone());

        let health = self
            .position(&user, &asset)
            .map(|p| p.health_factor)
            .unwrap_or(Decimal::MAX);
        if health >= Decimal::ONE {
            return Err(LendingError::PositionHealthy(health));
        }

        let loan = self
            .loans
            .iter_mut()
            .find(|l| l.id == loan_id)
            .expect("loan located above");
        loan.status = LoanStatus::Liquidated;
        let (amount, collateral_amount) = (loan.amount, loan.collateral_amount);

        if let Some(position) = self.positions.get_mut(&(user.clone(), asset.clone())) {
            position.borrowed -= amount;
            position.collateral -= collateral_amount.min(position.collateral);
        }
        self.recompute_health(&user, &asset);

        // collateral was escrowed with the loan, not lent into the market,
        // so only the extinguished debt moves the market totals
        if let Some(market) = self.markets.get_mut(&asset) {
            market.total_borrowed -= amount;
        }

        Ok(LiquidationOutcome {
            loan_id,
            debt_repaid: amount,
            collateral_seized: collateral_amount,
        })
    }

    fn upsert_position(&mut self, user: &Address, asset: &str) -> &mut AccountPosition {
        self.positions
            .entry((user.clone(), asset.to_string()))
            .or_insert_with(|| AccountPosition {
                user: user.clone(),
                asset: asset.to_string(),
                supplied: Decimal::ZERO,
                collateral: Decimal::ZERO,
                borrowed: Decimal::ZERO,
                health_factor: Decimal::MAX,
            })
    }

    // recomputed on every mutation, per position
    fn recompute_health(&mut self, user: &Address, asset: &str) {
        let threshold = self
            .markets
            .get(asset)
            .map(|m| m.liquidation_threshold)
            .unwrap_or(Decimal::ONE);
        if let Some(position) = self.positions.get_mut(&(user.clone(), asset.to_string())) {
            position.health_factor = health_factor(
                position.supplied + position.collateral,
                threshold,
                position.borrowed,
            );
        }
    }

    // test hook: force a position's escrowed collateral down, as an oracle
    // repricing would, so liquidation paths can be exercised deterministically.
    #[cfg(test)]
    pub(crate) fn write_down_collateral(&mut self, user: &Address, asset: &str, new_collateral: Decimal) {
        if let Some(position) = self.positions.get_mut(&(user.clone(), asset.to_string())) {
            position.collateral = new_collateral;
        }
        self.recompute_health(user, asset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn engine_with_markets() -> LendingEngine {
        let mut engine = LendingEngine::new();
        engine.add_market(
            Market::new("ETH", dec!(3.5), dec!(5.2), dec!(0.80), dec!(0.85)).unwrap(),
        );
        engine.add_market(
            Market::new("USDC", dec!(4.2), dec!(6.8), dec!(0.85), dec!(0.85)).unwrap(),
        );
        engine
    }

    fn alice() -> Address {
        Address::new("0xalice")
    }

    #[test]
    fn health_factor_formula() {
        // 1000 collateral, 0.85 threshold, 500 debt → 1.7
        assert_eq!(health_factor(dec!(1000), dec!(0.85), dec!(500)), dec!(1.7));
        // no debt → MAX
        assert_eq!(health_factor(dec!(1000), dec!(0.85), dec!(0)), Decimal::MAX);
    }

    #[test]
    fn utilization_zero_supply_is_zero() {
        let market = Market::new("X", dec!(1), dec!(2), dec!(0.5), dec!(0.6)).unwrap();
        assert_eq!(market.utilization(), dec!(0));
    }

    #[test]
    fn supply_updates_position_and_market() {
        let mut engine = engine_with_markets();
        engine
            .supply(alice(), "ETH", Amount::new(dec!(10)).unwrap())
            .unwrap();

        let position = engine.position(&alice(), "ETH").unwrap();
        assert_eq!(position.supplied, dec!(10));
        assert_eq!(engine.get_market("ETH").unwrap().total_supplied, dec!(10));
    }

    #[test]
    fn supply_unknown_market_fails() {
        let mut engine = engine_with_markets();
        let err = engine
            .supply(alice(), "DOGE", Amount::new(dec!(1)).unwrap())
            .unwrap_err();
        assert!(matches!(err, LendingError::MarketNotFound(_)));
    }

    #[test]
    fn borrow_within_cap() {
        let mut engine = engine_with_markets();
        // someone must supply the liquidity being borrowed
        engine
            .supply(Address::new("0xlp"), "USDC", Amount::new(dec!(10000)).unwrap())
            .unwrap();

        // 1000 ETH collateral at 0.80 factor → cap 800
        let result = engine
            .borrow(
                alice(),
                "USDC",
                Amount::new(dec!(800)).unwrap(),
                "ETH",
                Amount::new(dec!(1000)).unwrap(),
                Timestamp::from_millis(0),
            )
            .unwrap();

        assert_eq!(result.borrowed, dec!(800));
        let loan = engine.loan(result.loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(engine.get_market("USDC").unwrap().total_borrowed, dec!(800));

        // collateral is escrowed on the position, not deposited into the market
        let position = engine.position(&alice(), "USDC").unwrap();
        assert_eq!(position.collateral, dec!(1000));
        assert_eq!(position.supplied, dec!(0));
        assert_eq!(engine.get_market("USDC").unwrap().total_supplied, dec!(10000));
    }

    #[test]
    fn borrow_over_cap_leaves_state_untouched() {
        let mut engine = engine_with_markets();
        engine
            .supply(Address::new("0xlp"), "USDC", Amount::new(dec!(10000)).unwrap())
            .unwrap();
        let borrowed_before = engine.get_market("USDC").unwrap().total_borrowed;

        let err = engine
            .borrow(
                alice(),
                "USDC",
                Amount::new(dec!(801)).unwrap(),
                "ETH",
                Amount::new(dec!(1000)).unwrap(),
                Timestamp::from_millis(0),
            )
            .unwrap_err();

        assert!(matches!(err, LendingError::InsufficientCollateral { .. }));
        assert_eq!(
            engine.get_market("USDC").unwrap().total_borrowed,
            borrowed_before
        );
        assert!(engine.position(&alice(), "USDC").is_none());
        assert!(engine.loans_for(&alice()).is_empty());
    }

    #[test]
    fn borrow_cannot_exceed_market_liquidity() {
        let mut engine = engine_with_markets();
        engine
            .supply(Address::new("0xlp"), "USDC", Amount::new(dec!(100)).unwrap())
            .unwrap();

        // plenty of collateral, but market only holds 100
        let err = engine
            .borrow(
                alice(),
                "USDC",
                Amount::new(dec!(500)).unwrap(),
                "ETH",
                Amount::new(dec!(1000)).unwrap(),
                Timestamp::from_millis(0),
            )
            .unwrap_err();
        assert!(matches!(err, LendingError::InsufficientLiquidity { .. }));
    }

    #[test]
    fn repay_clears_debt() {
        let mut engine = engine_with_markets();
        engine
            .supply(Address::new("0xlp"), "USDC", Amount::new(dec!(10000)).unwrap())
            .unwrap();
        let result = engine
            .borrow(
                alice(),
                "USDC",
                Amount::new(dec!(500)).unwrap(),
                "ETH",
                Amount::new(dec!(1000)).unwrap(),
                Timestamp::from_millis(0),
            )
            .unwrap();

        engine.repay(result.loan_id).unwrap();

        let loan = engine.loan(result.loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Repaid);
        let position = engine.position(&alice(), "USDC").unwrap();
        assert_eq!(position.borrowed, dec!(0));
        assert_eq!(position.collateral, dec!(0));
        assert_eq!(position.health_factor, Decimal::MAX);
        // repaid loans are terminal
        assert!(matches!(
            engine.repay(result.loan_id).unwrap_err(),
            LendingError::LoanNotActive(_)
        ));
    }

    #[test]
    fn liquidation_requires_unhealthy_position() {
        let mut engine = engine_with_markets();
        engine
            .supply(Address::new("0xlp"), "USDC", Amount::new(dec!(10000)).unwrap())
            .unwrap();
        let result = engine
            .borrow(
                alice(),
                "USDC",
                Amount::new(dec!(800)).unwrap(),
                "ETH",
                Amount::new(dec!(1000)).unwrap(),
                Timestamp::from_millis(0),
            )
            .unwrap();

        // healthy: 1000 * 0.85 / 800 = 1.0625
        let err = engine.liquidate(result.loan_id).unwrap_err();
        assert!(matches!(err, LendingError::PositionHealthy(_)));

        // collateral collapses; health = 900 * 0.85 / 800 < 1
        engine.write_down_collateral(&alice(), "USDC", dec!(900));
        let outcome = engine.liquidate(result.loan_id).unwrap();
        assert_eq!(outcome.debt_repaid, dec!(800));
        assert_eq!(
            engine.loan(result.loan_id).unwrap().status,
            LoanStatus::Liquidated
        );
        assert_eq!(engine.get_market("USDC").unwrap().total_borrowed, dec!(0));
    }

    #[test]
    fn withdraw_guarded_by_health() {
        let mut engine = engine_with_markets();
        engine
            .supply(Address::new("0xlp"), "USDC", Amount::new(dec!(10000)).unwrap())
            .unwrap();
        engine
            .supply(alice(), "USDC", Amount::new(dec!(200)).unwrap())
            .unwrap();
        engine
            .borrow(
                alice(),
                "USDC",
                Amount::new(dec!(800)).unwrap(),
                "ETH",
                Amount::new(dec!(1000)).unwrap(),
                Timestamp::from_millis(0),
            )
            .unwrap();

        // collateral collapses to 900; the supplied 200 is now load-bearing
        engine.write_down_collateral(&alice(), "USDC", dec!(900));

        // pulling all 200 leaves (0 + 900) * 0.85 / 800 = 0.956 < 1
        let err = engine
            .withdraw(&alice(), "USDC", Amount::new(dec!(200)).unwrap())
            .unwrap_err();
        assert!(matches!(err, LendingError::WithdrawalUnsafe { .. }));

        // a small withdrawal that keeps health >= 1 passes:
        // (150 + 900) * 0.85 / 800 = 1.115...
        engine
            .withdraw(&alice(), "USDC", Amount::new(dec!(50)).unwrap())
            .unwrap();
    }

    #[test]
    fn withdraw_cannot_touch_escrowed_collateral() {
        let mut engine = engine_with_markets();
        engine
            .supply(alice(), "USDC", Amount::new(dec!(100)).unwrap())
            .unwrap();
        engine
            .borrow(
                alice(),
                "USDC",
                Amount::new(dec!(80)).unwrap(),
                "ETH",
                Amount::new(dec!(1000)).unwrap(),
                Timestamp::from_millis(0),
            )
            .unwrap();

        // 1000 escrowed + 100 supplied, but only the supplied 100 is a balance
        let err = engine
            .withdraw(&alice(), "USDC", Amount::new(dec!(900)).unwrap())
            .unwrap_err();
        assert!(matches!(err, LendingError::InsufficientBalance { .. }));

        let market = engine.get_market("USDC").unwrap();
        assert_eq!(market.total_supplied, dec!(100));
        assert_eq!(market.total_borrowed, dec!(80));
    }

    #[test]
    fn withdraw_capped_by_market_liquidity() {
        let mut engine = engine_with_markets();
        engine
            .supply(alice(), "USDC", Amount::new(dec!(100)).unwrap())
            .unwrap();
        engine
            .borrow(
                alice(),
                "USDC",
                Amount::new(dec!(80)).unwrap(),
                "ETH",
                Amount::new(dec!(1000)).unwrap(),
                Timestamp::from_millis(0),
            )
            .unwrap();

        // 80 of the 100 supplied is lent out; only 20 can leave the market
        let err = engine
            .withdraw(&alice(), "USDC", Amount::new(dec!(100)).unwrap())
            .unwrap_err();
        assert!(matches!(err, LendingError::InsufficientLiquidity { .. }));

        engine
            .withdraw(&alice(), "USDC", Amount::new(dec!(20)).unwrap())
            .unwrap();
        let market = engine.get_market("USDC").unwrap();
        assert_eq!(market.total_supplied, dec!(80));
        assert_eq!(market.total_borrowed, dec!(80));
    }
}
