use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod address;
mod units;

pub use address::{AddressError, parse_address, short_address};
pub use alloy_primitives::{Address, U256};
pub use units::{UnitsError, format_ether, parse_ether};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingId(pub u64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a listing as recorded by the contract. The ordinal is the
/// on-chain encoding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
    Sold,
}

impl ListingStatus {
    pub fn from_ordinal(ordinal: u8) -> Result<Self, RecordError> {
        match ordinal {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Approved),
            2 => Ok(Self::Rejected),
            3 => Ok(Self::Sold),
            other => Err(RecordError::UnknownStatus(other)),
        }
    }

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
            Self::Sold => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Sold => "Sold",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown listing status ordinal {0}")]
    UnknownStatus(u8),
    #[error("listing id {0} does not fit in 64 bits")]
    IdOutOfRange(U256),
}

/// Listing details exactly as the contract returns them, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub id: U256,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: U256,
    pub owner: Address,
    pub status: u8,
    pub approved_by: Address,
}

/// A validated listing snapshot. `price` is a decimal string in the native
/// currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: String,
    pub owner: Address,
    pub status: ListingStatus,
    pub approved_by: Address,
}

impl TryFrom<ListingRecord> for Listing {
    type Error = RecordError;

    fn try_from(record: ListingRecord) -> Result<Self, Self::Error> {
        let id = u64::try_from(record.id).map_err(|_| RecordError::IdOutOfRange(record.id))?;
        Ok(Self {
            id: ListingId(id),
            title: record.title,
            description: record.description,
            location: record.location,
            price: format_ether(record.price),
            owner: record.owner,
            status: ListingStatus::from_ordinal(record.status)?,
            approved_by: record.approved_by,
        })
    }
}

/// Which contract interface the deployment exposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContractGeneration {
    /// `superAdmin()`, `isAdmin(address)`, `isUserRegistered(address)`.
    Current,
    /// A single `admin()`; every account counts as registered.
    Legacy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoleTier {
    SuperAdmin,
    Admin,
    RegisteredUser,
    Unregistered,
}

impl RoleTier {
    pub fn badge(self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::Admin => "Admin",
            Self::RegisteredUser => "User",
            Self::Unregistered => "Not Registered",
        }
    }
}

/// The caller's privileges. Fields are private so that every value obeys
/// `super_admin => admin => registered_user`.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RoleSet {
    is_super_admin: bool,
    is_admin: bool,
    is_registered_user: bool,
}

impl RoleSet {
    pub const NONE: RoleSet = RoleSet {
        is_super_admin: false,
        is_admin: false,
        is_registered_user: false,
    };

    /// Each tier implies the ones below it.
    pub fn compose(super_admin: bool, admin: bool, registered_user: bool) -> Self {
        let is_admin = admin || super_admin;
        Self {
            is_super_admin: super_admin,
            is_admin,
            is_registered_user: registered_user || is_admin,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn is_registered_user(&self) -> bool {
        self.is_registered_user
    }

    /// Registered but holding no admin rights.
    pub fn is_plain_user(&self) -> bool {
        self.is_registered_user && !self.is_admin
    }

    pub fn tier(&self) -> RoleTier {
        if self.is_super_admin {
            RoleTier::SuperAdmin
        } else if self.is_admin {
            RoleTier::Admin
        } else if self.is_registered_user {
            RoleTier::RegisteredUser
        } else {
            RoleTier::Unregistered
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub active_address: Option<Address>,
    pub connected: bool,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The wallet reports accounts most-recently-selected first.
    pub fn from_accounts(accounts: &[Address]) -> Self {
        match accounts.first() {
            Some(address) => Self {
                active_address: Some(*address),
                connected: true,
            },
            None => Self::empty(),
        }
    }
}
