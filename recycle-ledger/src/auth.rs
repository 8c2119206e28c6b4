//! Owner access control
//!
//! A single stateless predicate consulted by every owner-gated operation.
//! The guard runs before any other precondition so unauthorized callers
//! never learn about other failure conditions.

use crate::{types::UserAddress, Error, Result};

/// Owner guard, fixed at construction
#[derive(Debug, Clone)]
pub struct OwnerGuard {
    owner: UserAddress,
}

impl OwnerGuard {
    /// Create guard for the given owner
    pub fn new(owner: UserAddress) -> Self {
        Self { owner }
    }

    /// The owner address
    pub fn owner(&self) -> &UserAddress {
        &self.owner
    }

    /// Whether the caller is the owner
    pub fn is_owner(&self, caller: &UserAddress) -> bool {
        caller == &self.owner
    }

    /// Fail with `Unauthorized` unless the caller is the owner
    pub fn ensure_owner(&self, caller: &UserAddress) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(Error::Unauthorized(caller.to_string()))
        }
    }
}
