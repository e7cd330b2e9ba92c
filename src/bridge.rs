//! Cross-chain transfer simulation with scheduled settlement.
//!
//! A transfer starts in `processing` and completes after a fixed settlement
//! delay. The delay is not a timer: completion is queued by due time and
//! applied when the driver calls `poll_due` with the current clock, so
//! pending settlements are cancellable and dropping the engine leaves
//! nothing dangling.

use crate::types::{Address, Amount, ChainId, Timestamp, TransferId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub id: ChainId,
    pub name: String,
    // the network's own numeric id (1 = Ethereum mainnet, 137 = Polygon...)
    pub network_id: u64,
    pub native_token: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Processing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub user: Address,
    pub from_chain: ChainId,
    pub to_chain: ChainId,
    pub token: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub status: TransferStatus,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeQuote {
    pub amount_out: Decimal,
    pub fee: Decimal,
    pub settlement_delay_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeParams {
    // fraction of the amount taken as the bridge fee
    pub base_fee_rate: Decimal,
    // flat network-cost estimate added on top
    pub gas_fee: Decimal,
    pub settlement_delay_ms: i64,
}

impl Default for BridgeParams {
    fn default() -> Self {
        Self {
            base_fee_rate: dec!(0.001),
            gas_fee: dec!(0.005),
            settlement_delay_ms: 5 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error("Chain {0:?} not found")]
    ChainNotFound(ChainId),

    #[error("Chain {0:?} is not active")]
    ChainInactive(ChainId),

    #[error("Transfer {0:?} not found")]
    TransferNotFound(TransferId),

    #[error("Transfer {id:?} is {status:?}, cannot cancel")]
    NotCancellable {
        id: TransferId,
        status: TransferStatus,
    },

    #[error("Amount {amount} does not cover the {fee} fee")]
    AmountBelowFee { amount: Decimal, fee: Decimal },
}

#[derive(Debug, Default)]
pub struct BridgeEngine {
    params: BridgeParams,
    chains: HashMap<ChainId, Chain>,
    transfers: HashMap<TransferId, Transfer>,
    // settlements ordered by due time. BTreeMap so poll_due walks them in
    // order and cancel can remove an entry without scanning.
    pending: BTreeMap<(Timestamp, TransferId), ()>,
    next_transfer_id: u64,
    next_chain_id: u32,
}

impl BridgeEngine {
    pub fn new(params: BridgeParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn add_chain(
        &mut self,
        name: impl Into<String>,
        network_id: u64,
        native_token: impl Into<String>,
    ) -> ChainId {
        self.next_chain_id += 1;
        let id = ChainId(self.next_chain_id);
        self.chains.insert(
            id,
            Chain {
                id,
                name: name.into(),
                network_id,
                native_token: native_token.into(),
                active: true,
            },
        );
        id
    }

    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.values().filter(|c| c.active)
    }

    pub fn set_chain_active(&mut self, id: ChainId, active: bool) -> Result<(), BridgeError> {
        let chain = self
            .chains
            .get_mut(&id)
            .ok_or(BridgeError::ChainNotFound(id))?;
        chain.active = active;
        Ok(())
    }

    fn active_chain(&self, id: ChainId) -> Result<&Chain, BridgeError> {
        let chain = self.chains.get(&id).ok_or(BridgeError::ChainNotFound(id))?;
        if !chain.active {
            return Err(BridgeError::ChainInactive(id));
        }
        Ok(chain)
    }

    /// Pure fee quote: fee = amount * base_fee_rate + gas_fee.
    pub fn quote(
        &self,
        from_chain: ChainId,
        to_chain: ChainId,
        amount: Amount,
    ) -> Result<BridgeQuote, BridgeError> {
        self.active_chain(from_chain)?;
        self.active_chain(to_chain)?;

        let fee = amount.value() * self.params.base_fee_rate + self.params.gas_fee;
        if fee >= amount.value() {
            return Err(BridgeError::AmountBelowFee {
                amount: amount.value(),
                fee,
            });
        }
        Ok(BridgeQuote {
            amount_out: amount.value() - fee,
            fee,
            settlement_delay_ms: self.params.settlement_delay_ms,
        })
    }

    /// Record a transfer and schedule its completion one settlement delay
    /// out. Nothing moves until `poll_due` reaches the due time.
    pub fn transfer(
        &mut self,
        user: Address,
        from_chain: ChainId,
        to_chain: ChainId,
        token: impl Into<String>,
        amount: Amount,
        now: Timestamp,
    ) -> Result<TransferId, BridgeError> {
        let quote = self.quote(from_chain, to_chain, amount)?;

        self.next_transfer_id += 1;
        let id = TransferId(self.next_transfer_id);
        self.transfers.insert(
            id,
            Transfer {
                id,
                user,
                from_chain,
                to_chain,
                token: token.into(),
                amount: amount.value(),
                fee: quote.fee,
                status: TransferStatus::Processing,
                created_at: now,
                completed_at: None,
            },
        );
        let due = now.plus_millis(self.params.settlement_delay_ms);
        self.pending.insert((due, id), ());
        Ok(id)
    }

    /// Complete every transfer whose due time has passed. Called by the
    /// driver loop with its current clock; idempotent between clock moves.
    pub fn poll_due(&mut self, now: Timestamp) -> Vec<TransferId> {
        let due: Vec<(Timestamp, TransferId)> = self
            .pending
            .range(..=(now, TransferId(u64::MAX)))
            .map(|(k, _)| *k)
            .collect();

        let mut completed = Vec::with_capacity(due.len());
        for key in due {
            self.pending.remove(&key);
            if let Some(transfer) = self.transfers.get_mut(&key.1) {
                transfer.status = TransferStatus::Completed;
                transfer.completed_at = Some(now);
                completed.push(transfer.id);
            }
        }
        completed
    }

    /// Cancel a still-processing transfer: its scheduled settlement is
    /// removed, so a later `poll_due` cannot resurrect it.
    pub fn cancel(&mut self, id: TransferId) -> Result<(), BridgeError> {
        let transfer = self
            .transfers
            .get_mut(&id)
            .ok_or(BridgeError::TransferNotFound(id))?;
        if transfer.status != TransferStatus::Processing {
            return Err(BridgeError::NotCancellable {
                id,
                status: transfer.status,
            });
        }
        transfer.status = TransferStatus::Cancelled;
        self.pending.retain(|&(_, tid), _| tid != id);
        Ok(())
    }

    pub fn status(&self, id: TransferId) -> Result<&Transfer, BridgeError> {
        self.transfers.get(&id).ok_or(BridgeError::TransferNotFound(id))
    }

    pub fn transfers_for(&self, user: &Address) -> Vec<&Transfer> {
        self.transfers
            .values()
            .filter(|t| &t.user == user)
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
