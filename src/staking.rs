//! Staking pools and reward accrual.
//!
//! Rewards are never stored incrementally. A stake keeps only its immutable
//! metadata (amount, staked_at) and rewards are recomputed from scratch on
//! every read against a caller-supplied as-of time, so the stored state can
//! never drift from the formula. All reward values truncate to 18 decimal
//! places, the token-amount convention.

use crate::types::{Address, Amount, Apy, PoolId, StakeId, Timestamp};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const REWARD_SCALE: u32 = 18;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakingPool {
    pub id: PoolId,
    pub name: String,
    pub token: String,
    pub reward_token: String,
    pub apy: Apy,
    pub tvl: Decimal,
    pub min_stake: Decimal,
    pub lock_period_days: i64,
    pub auto_compound: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stake {
    pub id: StakeId,
    pub pool_id: PoolId,
    pub user: Address,
    pub amount: Decimal,
    pub staked_at: Timestamp,
    pub unlock_at: Timestamp,
}

// 5.1: simple accrual. amount * apy/100/365 * days, truncated to 18dp.
// linear in days_staked: accrued(2d) is exactly twice accrued(1d).
pub fn accrued_rewards(amount: Decimal, apy: Apy, days_staked: i64) -> Decimal {
    let rewards = amount * apy.daily_rate() * Decimal::from(days_staked);
    rewards.trunc_with_scale(REWARD_SCALE)
}

// 5.2: auto-compound pools fold rewards back into the principal at each
// daily accrual boundary instead of paying out separately:
//   amount * ((1 + daily)^days - 1)
pub fn compounded_rewards(amount: Decimal, apy: Apy, days_staked: i64) -> Decimal {
    if days_staked <= 0 {
        return Decimal::ZERO;
    }
    let growth = (Decimal::ONE + apy.daily_rate()).powi(days_staked);
    (amount * (growth - Decimal::ONE)).trunc_with_scale(REWARD_SCALE)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardReport {
    pub stake_id: StakeId,
    pub days_staked: i64,
    pub rewards: Decimal,
    pub reward_token: String,
}

#[derive(Debug, Clone)]
pub struct UnstakeResult {
    pub principal: Decimal,
    pub rewards: Decimal,
    pub payout: Decimal,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StakingError {
    #[error("Pool {0:?} not found")]
    PoolNotFound(PoolId),

    #[error("Stake {0:?} not found")]
    StakeNotFound(StakeId),

    #[error("Stake of {amount} below pool minimum {min_stake}")]
    BelowMinimum { amount: Decimal, min_stake: Decimal },

    #[error("Stake locked until {unlock_at:?}")]
    StakeLocked { unlock_at: Timestamp },
}

#[derive(Debug, Default)]
pub struct StakingEngine {
    pools: HashMap<PoolId, StakingPool>,
    stakes: HashMap<StakeId, Stake>,
    next_stake_id: u64,
}

impl StakingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pool(&mut self, pool: StakingPool) {
        self.pools.insert(pool.id, pool);
    }

    pub fn get_pool(&self, id: PoolId) -> Result<&StakingPool, StakingError> {
        self.pools.get(&id).ok_or(StakingError::PoolNotFound(id))
    }

    // highest APY first, the order the dashboard shows pools in
    pub fn pools_by_apy(&self) -> Vec<&StakingPool> {
        let mut pools: Vec<&StakingPool> = self.pools.values().collect();
        pools.sort_by(|a, b| b.apy.value().cmp(&a.apy.value()));
        pools
    }

    pub fn get_stake(&self, id: StakeId) -> Result<&Stake, StakingError> {
        self.stakes.get(&id).ok_or(StakingError::StakeNotFound(id))
    }

    pub fn stakes_for(&self, user: &Address) -> Vec<&Stake> {
        self.stakes.values().filter(|s| &s.user == user).collect()
    }

    pub fn stake(
        &mut self,
        pool_id: PoolId,
        user: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<StakeId, StakingError> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(StakingError::PoolNotFound(pool_id))?;
        if amount.value() < pool.min_stake {
            return Err(StakingError::BelowMinimum {
                amount: amount.value(),
                min_stake: pool.min_stake,
            });
        }

        self.next_stake_id += 1;
        let id = StakeId(self.next_stake_id);
        self.stakes.insert(
            id,
            Stake {
                id,
                pool_id,
                user,
                amount: amount.value(),
                staked_at: now,
                unlock_at: now.plus_days(pool.lock_period_days),
            },
        );
        pool.tvl += amount.value();
        Ok(id)
    }

    /// Lazy accrual: recomputed from stake metadata on every call,
    /// idempotent for a fixed as-of time.
    pub fn rewards(&self, stake_id: StakeId, as_of: Timestamp) -> Result<RewardReport, StakingError> {
        let stake = self.get_stake(stake_id)?;
        let pool = self.get_pool(stake.pool_id)?;
        let days = stake.staked_at.elapsed_days(as_of);
        let rewards = if pool.auto_compound {
            compounded_rewards(stake.amount, pool.apy, days)
        } else {
            accrued_rewards(stake.amount, pool.apy, days)
        };
        Ok(RewardReport {
            stake_id,
            days_staked: days,
            rewards,
            reward_token: pool.reward_token.clone(),
        })
    }

    /// Return principal plus accrued rewards and remove the stake. Fails
    /// while a locked pool's unlock time has not passed.
    pub fn unstake(&mut self, stake_id: StakeId, now: Timestamp) -> Result<UnstakeResult, StakingError> {
        let stake = self.get_stake(stake_id)?;
        if stake.unlock_at > now {
            return Err(StakingError::StakeLocked {
                unlock_at: stake.unlock_at,
            });
        }
        let report = self.rewards(stake_id, now)?;

        let stake = self
            .stakes
            .remove(&stake_id)
            .expect("stake existed above");
        if let Some(pool) = self.pools.get_mut(&stake.pool_id) {
            pool.tvl -= stake.amount;
        }

        Ok(UnstakeResult {
            principal: stake.amount,
            rewards: report.rewards,
            payout: stake.amount + report.rewards,
        })
    }
}
