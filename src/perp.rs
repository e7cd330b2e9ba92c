//! Perpetual futures: leveraged positions, liquidation prices, PnL.
//!
//! The liquidation distance is one formula for both sides,
//! margin / (size * leverage); longs liquidate below entry, shorts above.
//! Liquidation itself is mark-price driven: every mark-price update sweeps
//! open positions and closes the ones whose trigger was crossed.

use crate::types::{Address, Amount, Leverage, PositionId, Price, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpMarket {
    pub symbol: String,
    pub index_price: Price,
    pub mark_price: Price,
    pub funding_rate: Decimal,
    // notional sum of open positions
    pub open_interest: Decimal,
    pub max_leverage: Leverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
    Liquidated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpPosition {
    pub id: PositionId,
    pub user: Address,
    pub symbol: String,
    pub size: Decimal,
    pub side: Side,
    pub entry_price: Price,
    pub leverage: Leverage,
    pub margin: Decimal,
    pub liquidation_price: Price,
    pub status: PositionStatus,
    pub opened_at: Timestamp,
    // set when the position leaves `open`, by close or by liquidation
    pub closed_at: Option<Timestamp>,
}

impl PerpPosition {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

// 6.1: distance from entry to the liquidation trigger. the same expression
// serves both sides; only the direction it is applied in differs.
pub fn liquidation_distance(margin: Decimal, size: Decimal, leverage: Leverage) -> Decimal {
    margin / size / leverage.value()
}

pub fn liquidation_price(
    entry_price: Price,
    margin: Decimal,
    size: Decimal,
    leverage: Leverage,
    side: Side,
) -> Price {
    let distance = liquidation_distance(margin, size, leverage);
    let raw = match side {
        Side::Long => entry_price.value() - distance,
        Side::Short => entry_price.value() + distance,
    };
    // a distance wider than the entry price itself floors near zero
    Price::new_unchecked(raw.max(Decimal::new(1, 4)))
}

// 6.2: paper pnl. (mark - entry) * size, negated for shorts.
pub fn unrealized_pnl(size: Decimal, side: Side, entry_price: Price, mark_price: Price) -> Decimal {
    (mark_price.value() - entry_price.value()) * size * side.sign()
}

// true when the mark has crossed the trigger in the losing direction
pub fn is_liquidated(side: Side, mark_price: Price, trigger: Price) -> bool {
    match side {
        Side::Long => mark_price <= trigger,
        Side::Short => mark_price >= trigger,
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PerpError {
    #[error("No perp market for symbol {0}")]
    MarketNotFound(String),

    #[error("Position {0:?} not found")]
    PositionNotFound(PositionId),

    #[error("Position {id:?} is {status:?}, not open")]
    PositionNotOpen { id: PositionId, status: PositionStatus },

    #[error("Leverage {requested} exceeds market maximum {maximum}")]
    LeverageTooHigh {
        requested: Leverage,
        maximum: Leverage,
    },
}

#[derive(Debug, Clone)]
pub struct OpenResult {
    pub position_id: PositionId,
    pub entry_price: Price,
    pub liquidation_price: Price,
}

#[derive(Debug, Clone)]
pub struct CloseResult {
    pub realized_pnl: Decimal,
    pub margin_returned: Decimal,
}

#[derive(Debug, Clone)]
pub struct SweepResult {
    pub liquidated: Vec<PositionId>,
}

#[derive(Debug, Default)]
pub struct PerpEngine {
    markets: HashMap<String, PerpMarket>,
    positions: HashMap<PositionId, PerpPosition>,
    next_position_id: u64,
}

impl PerpEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_market(&mut self, market: PerpMarket) {
        self.markets.insert(market.symbol.clone(), market);
    }

    pub fn markets(&self) -> impl Iterator<Item = &PerpMarket> {
        self.markets.values()
    }

    pub fn get_market(&self, symbol: &str) -> Result<&PerpMarket, PerpError> {
        self.markets
            .get(symbol)
            .ok_or_else(|| PerpError::MarketNotFound(symbol.to_string()))
    }

    pub fn get_position(&self, id: PositionId) -> Result<&PerpPosition, PerpError> {
        self.positions.get(&id).ok_or(PerpError::PositionNotFound(id))
    }

    // open positions only; closed and liquidated are history
    pub fn positions_for(&self, user: &Address) -> Vec<&PerpPosition> {
        self.positions
            .values()
            .filter(|p| &p.user == user && p.is_open())
            .collect()
    }

    /// Open a position at the market's current mark price. Size, margin,
    /// and leverage arrive pre-validated as positive by their types;
    /// leverage is additionally bounded by the market maximum.
    pub fn open(
        &mut self,
        user: Address,
        symbol: &str,
        size: Amount,
        side: Side,
        leverage: Leverage,
        margin: Amount,
        now: Timestamp,
    ) -> Result<OpenResult, PerpError> {
        let market = self
            .markets
            .get_mut(symbol)
            .ok_or_else(|| PerpError::MarketNotFound(symbol.to_string()))?;
        if leverage.value() > market.max_leverage.value() {
            return Err(PerpError::LeverageTooHigh {
                requested: leverage,
                maximum: market.max_leverage,
            });
        }

        let entry_price = market.mark_price;
        let trigger = liquidation_price(entry_price, margin.value(), size.value(), leverage, side);
        market.open_interest += size.value() * entry_price.value();

        self.next_position_id += 1;
        let id = PositionId(self.next_position_id);
        self.positions.insert(
            id,
            PerpPosition {
                id,
                user,
                symbol: symbol.to_string(),
                size: size.value(),
                side,
                entry_price,
                leverage,
                margin: margin.value(),
                liquidation_price: trigger,
                status: PositionStatus::Open,
                opened_at: now,
                closed_at: None,
            },
        );

        Ok(OpenResult {
            position_id: id,
            entry_price,
            liquidation_price: trigger,
        })
    }

    /// Unrealized PnL at current mark. Only open positions have one.
    pub fn position_pnl(&self, id: PositionId) -> Result<Decimal, PerpError> {
        let position = self.get_position(id)?;
        if !position.is_open() {
            return Err(PerpError::PositionNotOpen {
                id,
                status: position.status,
            });
        }
        let market = self.get_market(&position.symbol)?;
        Ok(unrealized_pnl(
            position.size,
            position.side,
            position.entry_price,
            market.mark_price,
        ))
    }

    /// Close at current mark: realize PnL, return margin net of losses.
    pub fn close(&mut self, id: PositionId, now: Timestamp) -> Result<CloseResult, PerpError> {
        let pnl = self.position_pnl(id)?;
        let position = self
            .positions
            .get_mut(&id)
            .expect("position checked by position_pnl");
        position.status = PositionStatus::Closed;
        position.closed_at = Some(now);
        let (symbol, notional) = (
            position.symbol.clone(),
            position.size * position.entry_price.value(),
        );
        let margin_returned = (position.margin + pnl).max(Decimal::ZERO);

        if let Some(market) = self.markets.get_mut(&symbol) {
            market.open_interest -= notional;
        }

        Ok(CloseResult {
            realized_pnl: pnl,
            margin_returned,
        })
    }

    /// Move the mark price and run the liquidation sweep: any open position
    /// whose trigger the new mark crosses unfavorably transitions to
    /// `liquidated` and drops out of PnL queries. Price update and sweep
    /// happen in the same critical section, so no query can observe the new
    /// mark with a stale position set.
    pub fn update_mark_price(
        &mut self,
        symbol: &str,
        mark: Price,
        now: Timestamp,
    ) -> Result<SweepResult, PerpError> {
        let market = self
            .markets
            .get_mut(symbol)
            .ok_or_else(|| PerpError::MarketNotFound(symbol.to_string()))?;
        market.mark_price = mark;

        let mut liquidated = Vec::new();
        let mut freed_notional = Decimal::ZERO;
        for position in self.positions.values_mut() {
            if position.symbol == symbol
                && position.is_open()
                && is_liquidated(position.side, mark, position.liquidation_price)
            {
                position.status = PositionStatus::Liquidated;
                position.closed_at = Some(now);
                freed_notional += position.size * position.entry_price.value();
                liquidated.push(position.id);
            }
        }
        if !freed_notional.is_zero() {
            if let Some(market) = self.markets.get_mut(symbol) {
                market.open_interest -= freed_notional;
            }
        }

        Ok(SweepResult { liquidated })
    }
}
