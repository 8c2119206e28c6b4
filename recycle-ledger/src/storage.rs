//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Per-user accounts (key: normalized address bytes)
//! - `badges` - Append-only badge catalog (key: badge id, big-endian)
//! - `meta` - Singleton records: treasury, reward rates, badge count

use crate::{
    error::{Error, Result},
    types::{Amount, Badge, RewardRates, UserAccount, UserAddress},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, IteratorMode, Options, WriteBatch, DB,
};
use serde::Serialize;
use std::sync::Arc;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_BADGES: &str = "badges";
const CF_META: &str = "meta";

/// Meta keys
const META_TREASURY: &[u8] = b"treasury";
const META_RATES: &[u8] = b"rates";
const META_BADGE_COUNT: &[u8] = b"badge_count";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_BADGES, Self::cf_options_badges()),
            ColumnFamilyDescriptor::new(CF_META, Self::cf_options_meta()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Accounts are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_badges() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_meta() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Account operations

    /// Get account, if it exists
    pub fn get_account(&self, address: &UserAddress) -> Result<Option<UserAccount>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;

        match self.db.get_cf(cf, address.as_str().as_bytes())? {
            Some(value) => {
                let account: UserAccount = bincode::deserialize(&value)?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Put account (single atomic key write)
    pub fn put_account(&self, account: &UserAccount) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = bincode::serialize(account)?;

        self.db.put_cf(cf, account.address.as_str().as_bytes(), &value)?;

        tracing::debug!(
            address = %account.address,
            balance = %account.balance,
            "Account updated"
        );

        Ok(())
    }

    // Badge operations

    /// Get badge by id
    pub fn get_badge(&self, id: u64) -> Result<Badge> {
        let cf = self.cf_handle(CF_BADGES)?;
        let key = id.to_be_bytes();

        let value = self
            .db
            .get_cf(cf, key)?
            .ok_or(Error::BadgeNotFound(id))?;

        let badge: Badge = bincode::deserialize(&value)?;
        Ok(badge)
    }

    /// Current badge count (next id to assign)
    pub fn badge_count(&self) -> Result<u64> {
        let cf = self.cf_handle(CF_META)?;

        match self.db.get_cf(cf, META_BADGE_COUNT)? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(0),
        }
    }

    /// Store badge and bump the badge count in one atomic batch
    pub fn put_badge_atomic(&self, badge: &Badge, new_count: u64) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_badges = self.cf_handle(CF_BADGES)?;
        batch.put_cf(cf_badges, badge.id.to_be_bytes(), bincode::serialize(badge)?);

        let cf_meta = self.cf_handle(CF_META)?;
        batch.put_cf(cf_meta, META_BADGE_COUNT, bincode::serialize(&new_count)?);

        self.db.write(batch)?;

        tracing::info!(badge_id = badge.id, name = %badge.name, "Badge created");

        Ok(())
    }

    /// All badges, ordered by id
    pub fn all_badges(&self) -> Result<Vec<Badge>> {
        let cf = self.cf_handle(CF_BADGES)?;

        let mut badges = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            badges.push(bincode::deserialize(&value)?);
        }

        Ok(badges)
    }

    // Treasury operations

    /// Current treasury balance (zero if never funded)
    pub fn treasury(&self) -> Result<Amount> {
        let cf = self.cf_handle(CF_META)?;

        match self.db.get_cf(cf, META_TREASURY)? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(Amount::ZERO),
        }
    }

    /// Put treasury balance
    pub fn put_treasury(&self, treasury: Amount) -> Result<()> {
        let cf = self.cf_handle(CF_META)?;
        self.db.put_cf(cf, META_TREASURY, bincode::serialize(&treasury)?)?;
        Ok(())
    }

    // Reward rate operations

    /// Current reward rates (construction defaults if never set)
    pub fn rates(&self) -> Result<RewardRates> {
        let cf = self.cf_handle(CF_META)?;

        match self.db.get_cf(cf, META_RATES)? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(RewardRates::default()),
        }
    }

    /// Replace all three rates atomically (single key)
    pub fn put_rates(&self, rates: &RewardRates) -> Result<()> {
        let cf = self.cf_handle(CF_META)?;
        self.db.put_cf(cf, META_RATES, bincode::serialize(rates)?)?;

        tracing::info!(
            plastic = %rates.plastic,
            glass = %rates.glass,
            metal = %rates.metal,
            "Reward rates updated"
        );

        Ok(())
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;

        // Account count (approximate, fast)
        let total_accounts = self.approximate_count(cf_accounts)?;

        Ok(StorageStats {
            total_accounts,
            total_badges: self.badge_count()?,
            treasury: self.treasury()?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }
}

/// Storage statistics
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    /// Approximate number of user accounts
    pub total_accounts: u64,
    /// Number of badges created
    pub total_badges: u64,
    /// Current treasury balance
    pub treasury: Amount,
}
