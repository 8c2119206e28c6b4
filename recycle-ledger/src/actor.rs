//! Actor-based concurrency for the ledger
//!
//! All mutating operations flow through one Tokio task that owns write access
//! to the shared state. This is the single-writer discipline the ledger
//! relies on: each message is applied as an atomic unit, so no operation ever
//! observes a partially-applied effect of another.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │             External request layer                    │
//! │          (HTTP routes, scripts, tests)               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   check preconditions → mutate → commit to RocksDB   │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::metrics::Metrics;
use crate::types::{Amount, Badge, Material, RewardRates, UserAccount, UserAddress};
use crate::{Error, Result, Storage};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Record a material deposit and credit the computed reward
    Deposit {
        material: Material,
        user: UserAddress,
        quantity: u64,
        response: oneshot::Sender<Result<()>>,
    },

    /// Manual owner credit
    RewardUser {
        user: UserAddress,
        amount: Amount,
        response: oneshot::Sender<Result<()>>,
    },

    /// Replace all three reward rates
    SetRewardRates {
        rates: RewardRates,
        response: oneshot::Sender<Result<()>>,
    },

    /// Fund the treasury
    DepositTreasury {
        amount: Amount,
        response: oneshot::Sender<Result<()>>,
    },

    /// Withdraw the caller's full balance
    Withdraw {
        caller: UserAddress,
        response: oneshot::Sender<Result<Amount>>,
    },

    /// Create a badge with the next sequential id
    CreateBadge {
        name: String,
        description: String,
        uri: String,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        metrics: Metrics,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            storage,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if matches!(msg, LedgerMessage::Shutdown) {
                break;
            }

            let start = Instant::now();
            self.handle_message(msg);
            self.metrics.record_op_duration(start.elapsed().as_secs_f64());
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Deposit {
                material,
                user,
                quantity,
                response,
            } => {
                let _ = response.send(self.apply_deposit(material, user, quantity));
            }

            LedgerMessage::RewardUser {
                user,
                amount,
                response,
            } => {
                let _ = response.send(self.apply_reward(user, amount));
            }

            LedgerMessage::SetRewardRates { rates, response } => {
                let _ = response.send(self.storage.put_rates(&rates));
            }

            LedgerMessage::DepositTreasury { amount, response } => {
                let _ = response.send(self.apply_treasury_deposit(amount));
            }

            LedgerMessage::Withdraw { caller, response } => {
                let _ = response.send(self.apply_withdraw(caller));
            }

            LedgerMessage::CreateBadge {
                name,
                description,
                uri,
                response,
            } => {
                let _ = response.send(self.apply_create_badge(name, description, uri));
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Material deposit: solvency check first, then counter + balance as one
    /// committed unit. A rejected deposit changes nothing.
    fn apply_deposit(&self, material: Material, user: UserAddress, quantity: u64) -> Result<()> {
        let rates = self.storage.rates()?;
        let rate = rates.rate_for(material);

        let reward = rate.checked_mul_quantity(quantity).ok_or_else(|| {
            Error::InvariantViolation(format!(
                "reward overflow: {} items of {} at {}",
                quantity, material, rate
            ))
        })?;

        // Solvency: the treasury must be able to cover the reward before any
        // state is touched.
        let treasury = self.storage.treasury()?;
        if treasury < reward {
            return Err(Error::InsufficientFunds {
                required: reward,
                available: treasury,
            });
        }

        let now = Utc::now();
        let mut account = self
            .storage
            .get_account(&user)?
            .unwrap_or_else(|| UserAccount::new(user.clone(), now));

        account.record_deposit(material, quantity, reward, now)?;
        self.storage.put_account(&account)?;

        self.metrics.record_deposit(material, reward);
        tracing::info!(
            user = %user,
            material = %material,
            quantity,
            reward = %reward,
            "Deposit recorded"
        );

        Ok(())
    }

    /// Manual credit. Not solvency-checked: solvency binds at deposit and at
    /// withdrawal settlement.
    fn apply_reward(&self, user: UserAddress, amount: Amount) -> Result<()> {
        let now = Utc::now();
        let mut account = self
            .storage
            .get_account(&user)?
            .unwrap_or_else(|| UserAccount::new(user.clone(), now));

        account.credit(amount, now)?;
        self.storage.put_account(&account)?;

        self.metrics.record_reward(amount);
        tracing::info!(user = %user, amount = %amount, "Manual reward credited");

        Ok(())
    }

    fn apply_treasury_deposit(&self, amount: Amount) -> Result<()> {
        let treasury = self.storage.treasury()?;
        let new_treasury = treasury.checked_add(amount).ok_or_else(|| {
            Error::InvariantViolation(format!("treasury overflow adding {}", amount))
        })?;

        self.storage.put_treasury(new_treasury)?;
        self.metrics.update_treasury(new_treasury);

        tracing::info!(amount = %amount, treasury = %new_treasury, "Treasury funded");
        Ok(())
    }

    /// Two-phase withdrawal.
    ///
    /// Phase 1 zeroes the balance and commits it, so a re-entrant call can
    /// only ever observe the zeroed balance. Phase 2 debits the treasury as a
    /// best-effort follow-up: if the treasury cannot cover the payout the
    /// balance stays zeroed and the caller gets `TransferFailed`.
    fn apply_withdraw(&self, caller: UserAddress) -> Result<Amount> {
        let now = Utc::now();
        let mut account = self
            .storage
            .get_account(&caller)?
            .ok_or_else(|| Error::NoBalance(caller.to_string()))?;

        if account.balance.is_zero() {
            return Err(Error::NoBalance(caller.to_string()));
        }

        // Phase 1: zero the balance, committed before any funds move.
        let amount = account.take_balance(now);
        self.storage.put_account(&account)?;

        // Phase 2: settle against the treasury.
        let treasury = self.storage.treasury()?;
        match treasury.checked_sub(amount) {
            Some(new_treasury) => {
                self.storage.put_treasury(new_treasury)?;
                self.metrics.record_withdrawal();
                self.metrics.update_treasury(new_treasury);

                tracing::info!(
                    user = %caller,
                    amount = %amount,
                    treasury = %new_treasury,
                    "Withdrawal settled"
                );
                Ok(amount)
            }
            None => {
                tracing::warn!(
                    user = %caller,
                    amount = %amount,
                    treasury = %treasury,
                    "Withdrawal transfer failed after balance was zeroed"
                );
                Err(Error::TransferFailed(format!(
                    "treasury {} cannot cover payout {} for {}",
                    treasury, amount, caller
                )))
            }
        }
    }

    fn apply_create_badge(&self, name: String, description: String, uri: String) -> Result<u64> {
        let id = self.storage.badge_count()?;
        let badge = Badge {
            id,
            name,
            description,
            uri,
            created_at: Utc::now(),
        };

        let new_count = id
            .checked_add(1)
            .ok_or_else(|| Error::InvariantViolation("badge id overflow".to_string()))?;
        self.storage.put_badge_atomic(&badge, new_count)?;
        self.metrics.record_badge_created(new_count);

        Ok(id)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        msg: LedgerMessage,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Record a material deposit
    pub async fn deposit(
        &self,
        material: Material,
        user: UserAddress,
        quantity: u64,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(
            LedgerMessage::Deposit {
                material,
                user,
                quantity,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Manually credit a user
    pub async fn reward_user(&self, user: UserAddress, amount: Amount) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(
            LedgerMessage::RewardUser {
                user,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Replace the reward rates
    pub async fn set_reward_rates(&self, rates: RewardRates) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(LedgerMessage::SetRewardRates { rates, response: tx }, rx)
            .await
    }

    /// Fund the treasury
    pub async fn deposit_treasury(&self, amount: Amount) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(LedgerMessage::DepositTreasury { amount, response: tx }, rx)
            .await
    }

    /// Withdraw the caller's full balance
    pub async fn withdraw(&self, caller: UserAddress) -> Result<Amount> {
        let (tx, rx) = oneshot::channel();
        self.request(LedgerMessage::Withdraw { caller, response: tx }, rx)
            .await
    }

    /// Create a badge
    pub async fn create_badge(
        &self,
        name: String,
        description: String,
        uri: String,
    ) -> Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.request(
            LedgerMessage::CreateBadge {
                name,
                description,
                uri,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(storage: Arc<Storage>, metrics: Metrics) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, metrics, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn test_setup() -> (Arc<Storage>, Metrics, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let storage = Arc::new(Storage::open(&config).unwrap());
        (storage, Metrics::new().unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (storage, metrics, _temp) = test_setup();
        let handle = spawn_ledger_actor(storage, metrics);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_deposit_requires_solvency() {
        let (storage, metrics, _temp) = test_setup();
        let handle = spawn_ledger_actor(storage.clone(), metrics);
        let user = UserAddress::new("0xuser1");

        // Empty treasury: any deposit reward is uncovered
        let err = handle
            .deposit(Material::Plastic, user.clone(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert!(storage.get_account(&user).unwrap().is_none());

        // Funded treasury: deposit succeeds
        handle
            .deposit_treasury(Amount::from_wei(crate::types::WEI_PER_UNIT))
            .await
            .unwrap();
        handle.deposit(Material::Plastic, user.clone(), 10).await.unwrap();

        let account = storage.get_account(&user).unwrap().unwrap();
        assert_eq!(account.plastic_count, 10);
        assert_eq!(account.balance, Amount::from_wei(1_657_000_000_000_000));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_withdraw_two_phase() {
        let (storage, metrics, _temp) = test_setup();
        let handle = spawn_ledger_actor(storage.clone(), metrics);
        let user = UserAddress::new("0xuser1");

        handle
            .deposit_treasury(Amount::from_wei(crate::types::WEI_PER_UNIT))
            .await
            .unwrap();
        handle.reward_user(user.clone(), Amount::from_wei(500)).await.unwrap();

        let paid = handle.withdraw(user.clone()).await.unwrap();
        assert_eq!(paid, Amount::from_wei(500));
        assert_eq!(
            storage.treasury().unwrap(),
            Amount::from_wei(crate::types::WEI_PER_UNIT - 500)
        );

        // Second withdrawal sees the zeroed balance
        let err = handle.withdraw(user).await.unwrap_err();
        assert!(matches!(err, Error::NoBalance(_)));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_transfer_failure_keeps_balance_zeroed() {
        let (storage, metrics, _temp) = test_setup();
        let handle = spawn_ledger_actor(storage.clone(), metrics);
        let user = UserAddress::new("0xuser1");

        // Credit more than the treasury holds (manual rewards are not
        // solvency-checked)
        handle.reward_user(user.clone(), Amount::from_wei(1000)).await.unwrap();
        handle.deposit_treasury(Amount::from_wei(10)).await.unwrap();

        let err = handle.withdraw(user.clone()).await.unwrap_err();
        assert!(matches!(err, Error::TransferFailed(_)));

        // Balance stays zeroed, treasury untouched
        let account = storage.get_account(&user).unwrap().unwrap();
        assert_eq!(account.balance, Amount::ZERO);
        assert_eq!(storage.treasury().unwrap(), Amount::from_wei(10));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_badges_sequential() {
        let (storage, metrics, _temp) = test_setup();
        let handle = spawn_ledger_actor(storage.clone(), metrics);

        for expected in 0..3u64 {
            let id = handle
                .create_badge(
                    format!("Badge{}", expected),
                    "desc".to_string(),
                    "ipfs://uri".to_string(),
                )
                .await
                .unwrap();
            assert_eq!(id, expected);
        }

        assert_eq!(storage.badge_count().unwrap(), 3);
        handle.shutdown().await.unwrap();
    }
}
