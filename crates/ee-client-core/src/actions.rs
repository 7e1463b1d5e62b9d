use ee_api_types::{Address, ListingId, U256, parse_address, parse_ether};
use ee_chain_client::{ClientError, ClientResult, ContractCall};

use crate::state::PropertyForm;

pub const FILL_ALL_FIELDS: &str = "Please fill in all fields";
pub const INVALID_ADDRESS: &str = "Please enter a valid Ethereum address";

/// A ledger mutation the user can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    RegisterProperty,
    BuyProperty,
    ApproveProperty,
    RejectProperty,
    AddAdmin,
    RegisterUser,
    WithdrawEarnings,
}

/// Collections an action may have invalidated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Refresh {
    pub approved: bool,
    pub pending: bool,
    pub owned: bool,
    pub admin_balance: bool,
}

impl ActionKind {
    pub fn in_flight_text(self) -> &'static str {
        match self {
            Self::RegisterProperty => "Registering property... Please wait for transaction confirmation.",
            Self::BuyProperty => "Buying property... Please wait for transaction confirmation.",
            Self::ApproveProperty => "Approving property... Please wait for transaction confirmation.",
            Self::RejectProperty => "Rejecting property... Please wait for transaction confirmation.",
            Self::AddAdmin => "Adding admin... Please wait for transaction confirmation.",
            Self::RegisterUser => "Registering user... Please wait for transaction confirmation.",
            Self::WithdrawEarnings => "Withdrawing earnings... Please wait for transaction confirmation.",
        }
    }

    /// `subject` is the address an admin action targeted, if any.
    pub fn success_text(self, subject: Option<&Address>) -> String {
        let subject = subject.map(|address| address.to_checksum(None)).unwrap_or_default();
        match self {
            Self::RegisterProperty => "Property registered successfully! Waiting for admin approval.".to_owned(),
            Self::BuyProperty => "Property purchased successfully!".to_owned(),
            Self::ApproveProperty => "Property approved successfully!".to_owned(),
            Self::RejectProperty => "Property rejected successfully!".to_owned(),
            Self::AddAdmin => format!("Admin {subject} added successfully!"),
            Self::RegisterUser => format!("User {subject} registered successfully!"),
            Self::WithdrawEarnings => "Earnings withdrawn successfully!".to_owned(),
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::RegisterProperty => "register property",
            Self::BuyProperty => "buy property",
            Self::ApproveProperty => "approve property",
            Self::RejectProperty => "reject property",
            Self::AddAdmin => "add admin",
            Self::RegisterUser => "register user",
            Self::WithdrawEarnings => "withdraw earnings",
        }
    }

    pub fn failure_text(self, err: &ClientError) -> String {
        format!("Failed to {}: {}", self.verb(), err.diagnostic())
    }

    pub fn refreshes(self) -> Refresh {
        match self {
            Self::RegisterProperty => Refresh {
                owned: true,
                ..Refresh::default()
            },
            Self::BuyProperty => Refresh {
                approved: true,
                owned: true,
                ..Refresh::default()
            },
            Self::ApproveProperty => Refresh {
                approved: true,
                pending: true,
                ..Refresh::default()
            },
            Self::RejectProperty => Refresh {
                pending: true,
                ..Refresh::default()
            },
            Self::WithdrawEarnings => Refresh {
                admin_balance: true,
                ..Refresh::default()
            },
            Self::AddAdmin | Self::RegisterUser => Refresh::default(),
        }
    }
}

// ── Validation ──

/// All four fields filled and a positive price.
pub fn validate_property_form(form: &PropertyForm) -> ClientResult<ContractCall> {
    let fields = [&form.title, &form.description, &form.location, &form.price];
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(ClientError::validation(FILL_ALL_FIELDS));
    }
    let price = validate_price(&form.price)?;
    Ok(ContractCall::RegisterListing {
        title: form.title.clone(),
        description: form.description.clone(),
        location: form.location.clone(),
        price,
    })
}

pub fn validate_price(price: &str) -> ClientResult<U256> {
    let wei = parse_ether(price).map_err(|err| ClientError::validation(format!("Invalid price: {err}")))?;
    if wei.is_zero() {
        return Err(ClientError::validation("Price must be greater than zero"));
    }
    Ok(wei)
}

pub fn validate_address(input: &str) -> ClientResult<Address> {
    parse_address(input).map_err(|_| ClientError::validation(INVALID_ADDRESS))
}

pub fn validate_purchase(id: ListingId, price: &str) -> ClientResult<ContractCall> {
    Ok(ContractCall::BuyListing {
        id,
        value: validate_price(price)?,
    })
}

/// Whether `account` may buy a listing held by `owner`.
pub fn can_buy(connected: bool, registered: bool, account: Option<&Address>, owner: &Address) -> bool {
    connected && registered && account.is_some_and(|account| account != owner)
}

/// Whether the withdraw button should be enabled for a formatted balance.
pub fn can_withdraw(admin_balance: &str) -> bool {
    parse_ether(admin_balance).is_ok_and(|wei| !wei.is_zero())
}
