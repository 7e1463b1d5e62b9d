use alloy_primitives::{Bytes, U64};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use ee_api_types::{Address, ListingId, ListingRecord, U256};
use ee_chain_client::{
    ClientError, ClientResult, ContractCall, PendingTx, RegistryReads, RegistryWrites, TxReceipt,
};
use serde::Deserialize;
use serde_json::json;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::abi::{self, property_id};
use crate::rpc::JsonRpcTransport;

/// PropertyRegistry reached through `eth_call` / `eth_sendTransaction`.
pub struct EvmRegistry<T> {
    transport: Rc<T>,
    address: Address,
    poll_interval: Duration,
}

/// The fields of a transaction receipt the client relies on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptRecord {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    status: Option<U64>,
}

impl<T: JsonRpcTransport> EvmRegistry<T> {
    pub fn new(transport: Rc<T>, address: Address, poll_interval: Duration) -> Self {
        Self {
            transport,
            address,
            poll_interval,
        }
    }

    async fn call<C: SolCall>(&self, call: C) -> ClientResult<C::Return> {
        let params = json!([
            { "to": self.address, "data": Bytes::from(call.abi_encode()) },
            "latest"
        ]);
        let result = self
            .transport
            .request("eth_call", params)
            .await
            .map_err(ClientError::remote)?;
        let data: Bytes = serde_json::from_value(result)
            .map_err(|err| ClientError::remote(format!("{}: bad return data: {err}", C::SIGNATURE)))?;
        if data.is_empty() {
            return Err(ClientError::remote(format!("{}: call returned no data", C::SIGNATURE)));
        }
        C::abi_decode_returns(&data).map_err(|err| ClientError::remote(format!("{}: {err}", C::SIGNATURE)))
    }

    async fn call_ids<C: SolCall<Return = Vec<U256>>>(&self, call: C) -> ClientResult<Vec<ListingId>> {
        self.call(call)
            .await?
            .into_iter()
            .map(|id| {
                u64::try_from(id)
                    .map(ListingId)
                    .map_err(|_| ClientError::remote(format!("{}: id {id} out of range", C::SIGNATURE)))
            })
            .collect()
    }

    async fn receipt(&self, tx_hash: &str) -> ClientResult<Option<ReceiptRecord>> {
        let raw = self
            .transport
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await
            .map_err(ClientError::remote)?;
        if raw.is_null() {
            return Ok(None);
        }
        serde_json::from_value(raw)
            .map(Some)
            .map_err(|err| ClientError::remote(format!("malformed receipt: {err}")))
    }
}

#[async_trait(?Send)]
impl<T: JsonRpcTransport> RegistryReads for EvmRegistry<T> {
    async fn all_listing_ids(&self) -> ClientResult<Vec<ListingId>> {
        self.call_ids(abi::getAllPropertiesCall {}).await
    }

    async fn listing_details(&self, id: ListingId) -> ClientResult<ListingRecord> {
        let property = self
            .call(abi::getPropertyDetailsCall {
                propertyId: property_id(id),
            })
            .await?;
        Ok(ListingRecord::from(property))
    }

    async fn listing_ids_for_owner(&self, owner: &Address) -> ClientResult<Vec<ListingId>> {
        self.call_ids(abi::getUserPropertiesCall { user: *owner }).await
    }

    async fn admin_balance(&self, admin: &Address) -> ClientResult<U256> {
        self.call(abi::getAdminBalanceCall { admin: *admin }).await
    }

    async fn super_admin(&self) -> ClientResult<Address> {
        self.call(abi::superAdminCall {}).await
    }

    async fn is_admin(&self, account: &Address) -> ClientResult<bool> {
        self.call(abi::isAdminCall { account: *account }).await
    }

    async fn is_user_registered(&self, account: &Address) -> ClientResult<bool> {
        self.call(abi::isUserRegisteredCall { account: *account }).await
    }

    async fn legacy_admin(&self) -> ClientResult<Address> {
        self.call(abi::adminCall {}).await
    }
}

#[async_trait(?Send)]
impl<T: JsonRpcTransport> RegistryWrites for EvmRegistry<T> {
    async fn submit(&self, from: &Address, call: ContractCall) -> ClientResult<PendingTx> {
        let mut tx = json!({
            "from": from,
            "to": self.address,
            "data": Bytes::from(abi::encode_contract_call(&call)),
        });
        if !call.value().is_zero() {
            tx["value"] = json!(call.value());
        }

        let result = self
            .transport
            .request("eth_sendTransaction", json!([tx]))
            .await
            .map_err(|err| {
                if err.is_user_rejection() {
                    ClientError::AuthorizationDenied(err.to_string())
                } else {
                    ClientError::remote(err)
                }
            })?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| ClientError::remote(format!("eth_sendTransaction returned {result}")))?
            .to_owned();

        info!(tx_hash = %tx_hash, method = call.name(), "transaction submitted");
        Ok(PendingTx {
            tx_hash,
            from: *from,
            call,
        })
    }

    async fn wait_for_confirmation(&self, tx: &PendingTx) -> ClientResult<TxReceipt> {
        loop {
            let Some(receipt) = self.receipt(&tx.tx_hash).await? else {
                debug!(tx_hash = %tx.tx_hash, "receipt not available yet");
                self.transport.pause(self.poll_interval).await;
                continue;
            };

            let block_number = receipt.block_number.map(|number| number.to::<u64>());

            // Pre-Byzantium receipts carry no status; a mined one counts.
            if receipt.status == Some(U64::ZERO) {
                warn!(tx_hash = %receipt.transaction_hash, "transaction reverted");
                return Err(ClientError::remote(format!(
                    "transaction {} reverted",
                    receipt.transaction_hash
                )));
            }

            return Ok(TxReceipt {
                tx_hash: receipt.transaction_hash,
                block_number,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcError;
    use alloy_primitives::hex;
    use alloy_sol_types::SolValue;
    use ee_api_types::parse_ether;
    use serde_json::Value;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned responses and records requests.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: RefCell<VecDeque<Result<Value, RpcError>>>,
        requests: RefCell<Vec<(String, Value)>>,
        pauses: RefCell<usize>,
    }

    impl ScriptedTransport {
        fn push(&self, response: Result<Value, RpcError>) {
            self.responses.borrow_mut().push_back(response);
        }
    }

    #[async_trait(?Send)]
    impl JsonRpcTransport for ScriptedTransport {
        async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
            self.requests.borrow_mut().push((method.to_owned(), params));
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(RpcError::Transport("no scripted response".to_owned())))
        }

        async fn pause(&self, _duration: Duration) {
            *self.pauses.borrow_mut() += 1;
        }
    }

    fn registry(transport: Rc<ScriptedTransport>) -> EvmRegistry<ScriptedTransport> {
        EvmRegistry::new(transport, Address::repeat_byte(0xee), Duration::from_millis(1))
    }

    fn hex_data(bytes: Vec<u8>) -> Value {
        Value::String(hex::encode_prefixed(bytes))
    }

    #[tokio::test]
    async fn super_admin_is_read_with_eth_call() -> anyhow::Result<()> {
        let transport = Rc::new(ScriptedTransport::default());
        let admin = Address::repeat_byte(7);
        transport.push(Ok(hex_data(admin.abi_encode())));

        assert_eq!(registry(transport.clone()).super_admin().await?, admin);

        let requests = transport.requests.borrow();
        assert_eq!(requests[0].0, "eth_call");
        let data = requests[0].1[0]["data"].as_str().unwrap_or_default();
        assert_eq!(data, hex::encode_prefixed(abi::superAdminCall::SELECTOR));
        Ok(())
    }

    #[tokio::test]
    async fn large_admin_balance_is_read_in_full() -> anyhow::Result<()> {
        let transport = Rc::new(ScriptedTransport::default());
        let balance: U256 = (U256::from(1) << 128) + U256::from(1);
        transport.push(Ok(hex_data(balance.abi_encode())));

        assert_eq!(registry(transport).admin_balance(&Address::repeat_byte(2)).await?, balance);
        Ok(())
    }

    #[tokio::test]
    async fn ids_beyond_64_bits_are_rejected() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push(Ok(hex_data(vec![U256::from(1) << 64].abi_encode())));

        let err = registry(transport).all_listing_ids().await.unwrap_err();
        assert!(matches!(err, ClientError::RemoteCallFailed(message) if message.contains("out of range")));
    }

    #[tokio::test]
    async fn empty_return_data_is_a_remote_failure() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push(Ok(Value::String("0x".to_owned())));
        let err = registry(transport).legacy_admin().await.unwrap_err();
        assert!(matches!(err, ClientError::RemoteCallFailed(message) if message.contains("no data")));
    }

    #[tokio::test]
    async fn buy_attaches_value_and_polls_for_receipt() -> anyhow::Result<()> {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push(Ok(json!("0xabc")));
        transport.push(Ok(Value::Null));
        transport.push(Ok(json!({ "transactionHash": "0xabc", "blockNumber": "0x10", "status": "0x1" })));

        let registry = registry(transport.clone());
        let price = parse_ether("1.5")?;
        let pending = registry
            .submit(&Address::repeat_byte(1), ContractCall::BuyListing { id: ListingId(2), value: price })
            .await?;
        let receipt = registry.wait_for_confirmation(&pending).await?;

        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(*transport.pauses.borrow(), 1);
        let requests = transport.requests.borrow();
        assert_eq!(requests[0].1[0]["value"], json!("0x14d1120d7b160000"));
        Ok(())
    }

    #[tokio::test]
    async fn reverted_receipt_fails() -> anyhow::Result<()> {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push(Ok(json!("0xdead")));
        transport.push(Ok(json!({ "transactionHash": "0xdead", "blockNumber": "0x2", "status": "0x0" })));

        let registry = registry(transport);
        let pending = registry
            .submit(&Address::repeat_byte(1), ContractCall::WithdrawAdminBalance)
            .await?;
        assert!(registry.wait_for_confirmation(&pending).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn user_rejection_maps_to_authorization_denied() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push(Err(RpcError::Rpc {
            code: 4001,
            message: "User denied transaction signature.".to_owned(),
        }));
        let err = registry(transport)
            .submit(&Address::repeat_byte(1), ContractCall::ApproveListing(ListingId(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthorizationDenied(_)));
    }
}
