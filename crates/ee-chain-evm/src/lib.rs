//! EVM backend for the property registry: Solidity bindings, JSON-RPC transports,
//! and the `RegistryReads`/`RegistryWrites`/`WalletProvider` adapters
//! built on them.

pub mod abi;
pub mod contract;
pub mod rpc;
pub mod wallet;

use ee_chain_client::{ContractAccessor, ContractConfig};
use std::rc::Rc;
use std::time::Duration;

pub use contract::EvmRegistry;
#[cfg(feature = "http")]
pub use rpc::HttpTransport;
pub use rpc::{JsonRpcTransport, RpcError};
pub use wallet::RpcWallet;

/// Wires wallet and registry over one transport. The wallet is returned as
/// well so the caller can forward account-change events into it.
pub fn accessor_over<T>(config: ContractConfig, transport: Rc<T>) -> (ContractAccessor, Rc<RpcWallet<T>>)
where
    T: JsonRpcTransport + 'static,
{
    let wallet = Rc::new(RpcWallet::new(transport.clone()));
    let registry = Rc::new(EvmRegistry::new(
        transport,
        config.address,
        Duration::from_millis(config.confirmation_poll_ms),
    ));
    let accessor = ContractAccessor::new(config, wallet.clone(), registry);
    (accessor, wallet)
}

/// Accessor for a node reachable over HTTP at `config.rpc_url`.
#[cfg(feature = "http")]
pub fn http_accessor(config: ContractConfig) -> (ContractAccessor, Rc<RpcWallet<HttpTransport>>) {
    let transport = Rc::new(HttpTransport::new(&config.rpc_url));
    accessor_over(config, transport)
}
