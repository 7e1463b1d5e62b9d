//! Solidity bindings for the PropertyRegistry call surface.

use alloy_sol_types::{SolCall, sol};
use ee_api_types::{ListingId, ListingRecord, U256};
use ee_chain_client::ContractCall;

sol! {
    interface PropertyRegistry {
        struct Property {
            uint256 id;
            string title;
            string description;
            string location;
            uint256 price;
            address owner;
            uint8 status;
            address approvedBy;
        }

        function getAllProperties() external view returns (uint256[]);
        function getPropertyDetails(uint256 propertyId) external view returns (Property);
        function getUserProperties(address user) external view returns (uint256[]);
        function getAdminBalance(address admin) external view returns (uint256);
        function superAdmin() external view returns (address);
        function isAdmin(address account) external view returns (bool);
        function isUserRegistered(address account) external view returns (bool);
        function admin() external view returns (address);

        function registerProperty(string title, string description, string location, uint256 price) external;
        function buyProperty(uint256 propertyId) external payable;
        function approveProperty(uint256 propertyId) external;
        function rejectProperty(uint256 propertyId) external;
        function addAdmin(address account) external;
        function registerUser(address user) external;
        function withdrawAdminBalance() external;
    }
}

pub use PropertyRegistry::*;

impl From<Property> for ListingRecord {
    fn from(property: Property) -> Self {
        Self {
            id: property.id,
            title: property.title,
            description: property.description,
            location: property.location,
            price: property.price,
            owner: property.owner,
            status: property.status,
            approved_by: property.approvedBy,
        }
    }
}

pub fn property_id(id: ListingId) -> U256 {
    U256::from(id.0)
}

/// Calldata for a write. The attached value travels separately.
pub fn encode_contract_call(call: &ContractCall) -> Vec<u8> {
    match call {
        ContractCall::RegisterListing {
            title,
            description,
            location,
            price,
        } => registerPropertyCall {
            title: title.clone(),
            description: description.clone(),
            location: location.clone(),
            price: *price,
        }
        .abi_encode(),
        ContractCall::BuyListing { id, .. } => buyPropertyCall {
            propertyId: property_id(*id),
        }
        .abi_encode(),
        ContractCall::ApproveListing(id) => approvePropertyCall {
            propertyId: property_id(*id),
        }
        .abi_encode(),
        ContractCall::RejectListing(id) => rejectPropertyCall {
            propertyId: property_id(*id),
        }
        .abi_encode(),
        ContractCall::AddAdmin(account) => addAdminCall { account: *account }.abi_encode(),
        ContractCall::RegisterUser(user) => registerUserCall { user: *user }.abi_encode(),
        ContractCall::WithdrawAdminBalance => withdrawAdminBalanceCall {}.abi_encode(),
    }
}
