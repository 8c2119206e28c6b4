//! Core types for the recycling reward ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (unsigned wei, checked operations)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default reward per recycled item: 0.0001657 tokens, in wei.
///
/// Applies to all three materials until the owner calls `set_reward_rates`.
pub const DEFAULT_REWARD_PER_ITEM_WEI: u128 = 165_700_000_000_000;

/// Number of wei in one whole token unit.
pub const WEI_PER_UNIT: u128 = 1_000_000_000_000_000_000;

/// Address-like user identifier (hex account address, wallet address, etc.)
///
/// Addresses are compared case-insensitively; the constructor normalizes to
/// lowercase so map keys and owner checks never depend on input casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserAddress(String);

impl UserAddress {
    /// Create new user address (normalized to lowercase)
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into().to_ascii_lowercase())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recyclable material kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    /// Plastic items
    Plastic,
    /// Glass items
    Glass,
    /// Metal items
    Metal,
}

impl Material {
    /// Stable lowercase code (used for metric labels and log fields)
    pub fn code(&self) -> &'static str {
        match self {
            Material::Plastic => "plastic",
            Material::Glass => "glass",
            Material::Metal => "metal",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "plastic" => Some(Material::Plastic),
            "glass" => Some(Material::Glass),
            "metal" => Some(Material::Metal),
            _ => None,
        }
    }

    /// All material kinds
    pub fn all() -> [Material; 3] {
        [Material::Plastic, Material::Glass, Material::Metal]
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Reward amount in wei (smallest indivisible unit)
///
/// All ledger arithmetic happens on this type with checked operations; no
/// floating point, no rounding. `Decimal` conversion exists only for
/// human-readable output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    /// Zero amount
    pub const ZERO: Amount = Amount(0);

    /// Create from wei
    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    /// Raw wei value
    pub const fn as_wei(&self) -> u128 {
        self.0
    }

    /// Whether this amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Checked multiplication by an item quantity
    pub fn checked_mul_quantity(self, quantity: u64) -> Option<Amount> {
        self.0.checked_mul(quantity as u128).map(Amount)
    }

    /// Exact token-unit representation, if it fits in a `Decimal`
    pub fn units(&self) -> Option<Decimal> {
        let wei = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(wei, 18).ok()
    }

    /// Lossy token-unit representation (for gauges and log summaries)
    pub fn units_lossy(&self) -> f64 {
        self.0 as f64 / WEI_PER_UNIT as f64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

/// Per-material reward rates, in wei per item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRates {
    /// Reward per plastic item
    pub plastic: Amount,

    /// Reward per glass item
    pub glass: Amount,

    /// Reward per metal item
    pub metal: Amount,
}

impl RewardRates {
    /// Rate for a material kind
    pub fn rate_for(&self, material: Material) -> Amount {
        match material {
            Material::Plastic => self.plastic,
            Material::Glass => self.glass,
            Material::Metal => self.metal,
        }
    }
}

impl Default for RewardRates {
    fn default() -> Self {
        let rate = Amount::from_wei(DEFAULT_REWARD_PER_ITEM_WEI);
        Self {
            plastic: rate,
            glass: rate,
            metal: rate,
        }
    }
}

/// Per-user ledger account
///
/// Created lazily on first deposit or reward; counters only ever grow, the
/// balance grows on credits and drops to zero on withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Account owner address
    pub address: UserAddress,

    /// Plastic items deposited (monotonic)
    pub plastic_count: u64,

    /// Glass items deposited (monotonic)
    pub glass_count: u64,

    /// Metal items deposited (monotonic)
    pub metal_count: u64,

    /// Accrued, withdrawable reward balance
    pub balance: Amount,

    /// First interaction timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Create empty account
    pub fn new(address: UserAddress, now: DateTime<Utc>) -> Self {
        Self {
            address,
            plastic_count: 0,
            glass_count: 0,
            metal_count: 0,
            balance: Amount::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deposit counter for a material kind
    pub fn count_for(&self, material: Material) -> u64 {
        match material {
            Material::Plastic => self.plastic_count,
            Material::Glass => self.glass_count,
            Material::Metal => self.metal_count,
        }
    }

    /// Apply a successful material deposit: bump the counter and credit the
    /// reward as one in-memory unit. Nothing is applied on error.
    pub fn record_deposit(
        &mut self,
        material: Material,
        quantity: u64,
        reward: Amount,
        now: DateTime<Utc>,
    ) -> crate::Result<()> {
        let counter = match material {
            Material::Plastic => &mut self.plastic_count,
            Material::Glass => &mut self.glass_count,
            Material::Metal => &mut self.metal_count,
        };

        let new_count = counter.checked_add(quantity).ok_or_else(|| {
            crate::Error::InvariantViolation(format!(
                "{} counter overflow for {}",
                material, self.address
            ))
        })?;
        let new_balance = self.balance.checked_add(reward).ok_or_else(|| {
            crate::Error::InvariantViolation(format!("balance overflow for {}", self.address))
        })?;

        *counter = new_count;
        self.balance = new_balance;
        self.updated_at = now;
        Ok(())
    }

    /// Credit the balance (manual owner reward)
    pub fn credit(&mut self, amount: Amount, now: DateTime<Utc>) -> crate::Result<()> {
        self.balance = self.balance.checked_add(amount).ok_or_else(|| {
            crate::Error::InvariantViolation(format!("balance overflow for {}", self.address))
        })?;
        self.updated_at = now;
        Ok(())
    }

    /// Zero the balance and return what it held
    pub fn take_balance(&mut self, now: DateTime<Utc>) -> Amount {
        let amount = self.balance;
        self.balance = Amount::ZERO;
        self.updated_at = now;
        amount
    }
}

/// Immutable achievement record
///
/// Created only by the owner; ids are assigned sequentially starting at 0 and
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Sequential badge id
    pub id: u64,

    /// Badge name
    pub name: String,

    /// Badge description
    pub description: String,

    /// Opaque metadata reference (not validated for format)
    pub uri: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalized() {
        let a = UserAddress::new("0xAbCdEf");
        let b = UserAddress::new("0xabcdef");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0xabcdef");
    }

    #[test]
    fn test_material_from_str() {
        assert_eq!(Material::from_str("plastic"), Some(Material::Plastic));
        assert_eq!(Material::from_str("glass"), Some(Material::Glass));
        assert_eq!(Material::from_str("metal"), Some(Material::Metal));
        assert_eq!(Material::from_str("cardboard"), None);
    }

    #[test]
    fn test_amount_checked_math() {
        let rate = Amount::from_wei(DEFAULT_REWARD_PER_ITEM_WEI);
        let reward = rate.checked_mul_quantity(10).unwrap();
        assert_eq!(reward.as_wei(), 1_657_000_000_000_000);

        assert!(Amount::from_wei(u128::MAX).checked_add(Amount::from_wei(1)).is_none());
        assert!(Amount::ZERO.checked_sub(Amount::from_wei(1)).is_none());
    }

    #[test]
    fn test_amount_units() {
        let one = Amount::from_wei(WEI_PER_UNIT);
        assert_eq!(one.units().unwrap(), rust_decimal::Decimal::ONE);
        assert!((one.units_lossy() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_deposit_all_or_nothing() {
        let now = Utc::now();
        let mut account = UserAccount::new(UserAddress::new("0xuser"), now);
        account.plastic_count = u64::MAX;

        // Counter overflow must leave the balance untouched
        let result =
            account.record_deposit(Material::Plastic, 1, Amount::from_wei(100), now);
        assert!(result.is_err());
        assert_eq!(account.balance, Amount::ZERO);
        assert_eq!(account.plastic_count, u64::MAX);
    }

    #[test]
    fn test_take_balance() {
        let now = Utc::now();
        let mut account = UserAccount::new(UserAddress::new("0xuser"), now);
        account.credit(Amount::from_wei(500), now).unwrap();

        let taken = account.take_balance(now);
        assert_eq!(taken, Amount::from_wei(500));
        assert_eq!(account.balance, Amount::ZERO);
        assert_eq!(account.take_balance(now), Amount::ZERO);
    }

    #[test]
    fn test_default_rates() {
        let rates = RewardRates::default();
        for material in Material::all() {
            assert_eq!(
                rates.rate_for(material),
                Amount::from_wei(DEFAULT_REWARD_PER_ITEM_WEI)
            );
        }
    }
}
