//! Main ledger orchestration layer
//!
//! Ties together storage, access control, and the single-writer actor into
//! the public operation set: material deposits, manual rewards, rate
//! changes, treasury funding, withdrawals, and the badge registry.
//!
//! # Example
//!
//! ```no_run
//! use recycle_ledger::{Config, Ledger, Material, UserAddress};
//!
//! #[tokio::main]
//! async fn main() -> recycle_ledger::Result<()> {
//!     let config = Config::default();
//!     let owner = UserAddress::new(config.owner.clone());
//!     let ledger = Ledger::open(config).await?;
//!
//!     let user = UserAddress::new("0xuser");
//!     ledger.deposit(&owner, Material::Plastic, user, 10).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    auth::OwnerGuard,
    metrics::Metrics,
    storage::StorageStats,
    types::{Amount, Badge, Material, RewardRates, UserAddress},
    Config, Error, Result, Storage,
};
use std::sync::Arc;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Owner guard
    guard: OwnerGuard,

    /// Metrics collector
    metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        if config.owner.trim().is_empty() {
            return Err(Error::Config("owner address must be set".to_string()));
        }

        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;
        metrics.update_treasury(storage.treasury()?);
        metrics.record_badge_created(storage.badge_count()?);

        let handle = spawn_ledger_actor(storage.clone(), metrics.clone());
        let guard = OwnerGuard::new(UserAddress::new(config.owner.clone()));

        tracing::info!(owner = %guard.owner(), "Ledger opened");

        Ok(Self {
            handle,
            storage,
            guard,
            metrics,
        })
    }

    /// The owner address
    pub fn owner(&self) -> &UserAddress {
        self.guard.owner()
    }

    // Owner-gated operations. The guard runs before any other precondition.

    /// Record a material deposit on behalf of a user and credit the reward
    ///
    /// Fails with `Unauthorized` for non-owner callers, `InvalidQuantity` for
    /// a zero quantity, `InsufficientFunds` if the treasury cannot cover the
    /// computed reward. A failed deposit changes nothing.
    pub async fn deposit(
        &self,
        caller: &UserAddress,
        material: Material,
        user: UserAddress,
        quantity: u64,
    ) -> Result<()> {
        self.guard.ensure_owner(caller)?;
        if quantity == 0 {
            return Err(Error::InvalidQuantity(
                "quantity must be a positive integer".to_string(),
            ));
        }

        self.handle.deposit(material, user, quantity).await
    }

    /// Manually credit a user's balance (owner only)
    pub async fn reward_user(
        &self,
        caller: &UserAddress,
        user: UserAddress,
        amount: Amount,
    ) -> Result<()> {
        self.guard.ensure_owner(caller)?;
        if amount.is_zero() {
            return Err(Error::InvalidQuantity(
                "reward amount must be positive".to_string(),
            ));
        }

        self.handle.reward_user(user, amount).await
    }

    /// Replace all three reward rates atomically (owner only)
    ///
    /// Applies only to deposits made after the change; accrued balances are
    /// unaffected.
    pub async fn set_reward_rates(
        &self,
        caller: &UserAddress,
        plastic: Amount,
        glass: Amount,
        metal: Amount,
    ) -> Result<()> {
        self.guard.ensure_owner(caller)?;

        self.handle
            .set_reward_rates(RewardRates {
                plastic,
                glass,
                metal,
            })
            .await
    }

    /// Create a badge with the next sequential id (owner only)
    pub async fn create_badge(
        &self,
        caller: &UserAddress,
        name: impl Into<String>,
        description: impl Into<String>,
        uri: impl Into<String>,
    ) -> Result<u64> {
        self.guard.ensure_owner(caller)?;

        self.handle
            .create_badge(name.into(), description.into(), uri.into())
            .await
    }

    // Open operations

    /// Fund the treasury
    ///
    /// Callable by anyone who can transfer value in; crediting a user's
    /// spendable balance still goes through the owner-gated operations.
    pub async fn deposit_treasury(&self, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::InvalidQuantity(
                "treasury deposit must be positive".to_string(),
            ));
        }

        self.handle.deposit_treasury(amount).await
    }

    /// Withdraw the caller's full balance
    ///
    /// Returns the amount transferred. Fails with `NoBalance` if the caller
    /// has nothing to withdraw.
    pub async fn withdraw(&self, caller: &UserAddress) -> Result<Amount> {
        self.handle.withdraw(caller.clone()).await
    }

    // Read accessors

    /// Badge by id; `BadgeNotFound` if the id was never assigned
    pub fn get_badge_info(&self, id: u64) -> Result<Badge> {
        self.storage.get_badge(id)
    }

    /// Number of badges created so far
    pub fn total_badge_types(&self) -> Result<u64> {
        self.storage.badge_count()
    }

    /// All badges, ordered by id
    pub fn all_badges(&self) -> Result<Vec<Badge>> {
        self.storage.all_badges()
    }

    /// Deposit counter for a user and material (zero if no account)
    pub fn material_count(&self, user: &UserAddress, material: Material) -> Result<u64> {
        Ok(self
            .storage
            .get_account(user)?
            .map(|a| a.count_for(material))
            .unwrap_or(0))
    }

    /// Withdrawable balance for a user (zero if no account)
    pub fn balance_of(&self, user: &UserAddress) -> Result<Amount> {
        Ok(self
            .storage
            .get_account(user)?
            .map(|a| a.balance)
            .unwrap_or(Amount::ZERO))
    }

    /// Current reward rates
    pub fn reward_rates(&self) -> Result<RewardRates> {
        self.storage.rates()
    }

    /// Current treasury balance
    pub fn treasury_balance(&self) -> Result<Amount> {
        self.storage.treasury()
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Metrics collector (for scrape endpoints)
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WEI_PER_UNIT;

    async fn create_test_ledger() -> (Ledger, UserAddress, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.owner = "0xowner".to_string();

        let ledger = Ledger::open(config).await.unwrap();
        let owner = ledger.owner().clone();
        (ledger, owner, temp_dir)
    }

    #[tokio::test]
    async fn test_ledger_open_and_shutdown() {
        let (ledger, _, _temp) = create_test_ledger().await;
        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_rejects_empty_owner() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.owner = "  ".to_string();

        let result = Ledger::open(config).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_deposit_credits_balance() {
        let (ledger, owner, _temp) = create_test_ledger().await;
        let user = UserAddress::new("0xuser1");

        ledger.deposit_treasury(Amount::from_wei(WEI_PER_UNIT)).await.unwrap();
        ledger
            .deposit(&owner, Material::Glass, user.clone(), 5)
            .await
            .unwrap();

        assert_eq!(ledger.material_count(&user, Material::Glass).unwrap(), 5);
        assert_eq!(
            ledger.balance_of(&user).unwrap(),
            ledger
                .reward_rates()
                .unwrap()
                .glass
                .checked_mul_quantity(5)
                .unwrap()
        );

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_deposit_guard_checked_before_quantity() {
        let (ledger, _, _temp) = create_test_ledger().await;
        let intruder = UserAddress::new("0xintruder");

        // Unauthorized wins over InvalidQuantity: the guard must not leak
        // other failure conditions.
        let err = ledger
            .deposit(&intruder, Material::Plastic, UserAddress::new("0xuser1"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_deposit_zero_quantity_rejected() {
        let (ledger, owner, _temp) = create_test_ledger().await;

        let err = ledger
            .deposit(&owner, Material::Metal, UserAddress::new("0xuser1"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuantity(_)));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_reward_rates_owner_only() {
        let (ledger, owner, _temp) = create_test_ledger().await;

        let err = ledger
            .set_reward_rates(
                &UserAddress::new("0xintruder"),
                Amount::from_wei(1000),
                Amount::from_wei(2000),
                Amount::from_wei(3000),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert_eq!(ledger.reward_rates().unwrap(), RewardRates::default());

        ledger
            .set_reward_rates(
                &owner,
                Amount::from_wei(1000),
                Amount::from_wei(2000),
                Amount::from_wei(3000),
            )
            .await
            .unwrap();

        let rates = ledger.reward_rates().unwrap();
        assert_eq!(rates.plastic, Amount::from_wei(1000));
        assert_eq!(rates.glass, Amount::from_wei(2000));
        assert_eq!(rates.metal, Amount::from_wei(3000));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reward_user_and_withdraw() {
        let (ledger, owner, _temp) = create_test_ledger().await;
        let user = UserAddress::new("0xuser1");

        ledger.deposit_treasury(Amount::from_wei(WEI_PER_UNIT)).await.unwrap();
        ledger
            .reward_user(&owner, user.clone(), Amount::from_wei(100_000_000_000_000_000))
            .await
            .unwrap();

        let paid = ledger.withdraw(&user).await.unwrap();
        assert_eq!(paid, Amount::from_wei(100_000_000_000_000_000));
        assert_eq!(ledger.balance_of(&user).unwrap(), Amount::ZERO);
        assert_eq!(
            ledger.treasury_balance().unwrap(),
            Amount::from_wei(WEI_PER_UNIT - 100_000_000_000_000_000)
        );

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_badge_registry() {
        let (ledger, owner, _temp) = create_test_ledger().await;

        let id = ledger
            .create_badge(&owner, "Badge1", "Description1", "ipfs://uri1")
            .await
            .unwrap();
        assert_eq!(id, 0);
        ledger
            .create_badge(&owner, "Badge2", "Description2", "ipfs://uri2")
            .await
            .unwrap();

        assert_eq!(ledger.total_badge_types().unwrap(), 2);
        let badges = ledger.all_badges().unwrap();
        assert_eq!(badges.len(), 2);
        assert_eq!(badges[1].name, "Badge2");

        let err = ledger.get_badge_info(2).unwrap_err();
        assert!(matches!(err, Error::BadgeNotFound(2)));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stats() {
        let (ledger, owner, _temp) = create_test_ledger().await;

        ledger.deposit_treasury(Amount::from_wei(123)).await.unwrap();
        ledger.create_badge(&owner, "b", "d", "u").await.unwrap();

        let stats = ledger.stats().unwrap();
        assert_eq!(stats.total_badges, 1);
        assert_eq!(stats.treasury, Amount::from_wei(123));

        ledger.shutdown().await.unwrap();
    }
}
