// defihub-core: the financial computation layer of a demo DeFi platform.
// decimal-exact arithmetic over token quantities, no floating point, no I/O.
// each engine is independent and single-writer; callers supply timestamps
// so every computation is deterministic and replayable.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Amount, Price, Apy, Leverage, Side, Timestamp
//   2.x  wire.rs: fixed-precision string rendering for the HTTP boundary
//   3.x  amm.rs: constant-product swap quoting and execution
//   4.x  lending.rs: markets, health factors, borrow caps, liquidation
//   5.x  staking.rs: lazy reward accrual, lock periods, auto-compound
//   6.x  perp.rs: leveraged positions, liquidation prices, mark-price sweep
//   7.x  seed.rs: explicit bootstrap state for all engines
//   8.x  bridge.rs: transfer lifecycle with cancellable scheduled settlement

pub mod amm;
pub mod bridge;
pub mod lending;
pub mod perp;
pub mod seed;
pub mod staking;
pub mod types;
pub mod wire;

pub use amm::{AmmEngine, AmmError, Pool, SwapQuote, TradeRecord};
pub use bridge::{BridgeEngine, BridgeError, BridgeParams, Chain, Transfer, TransferStatus};
pub use lending::{
    AccountPosition, LendingEngine, LendingError, Loan, LoanStatus, Market,
};
pub use perp::{PerpEngine, PerpError, PerpMarket, PerpPosition, PositionStatus};
pub use seed::{seed_amm, seed_bridge, seed_lending, seed_perp, seed_staking};
pub use staking::{Stake, StakingEngine, StakingError, StakingPool};
pub use types::*;
