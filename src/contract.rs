//! Contract proxy: a typed handle bound to one deployed lottery contract.
//!
//! The proxy never retries and never interprets results; it issues the call,
//! waits for confirmation where a transaction is involved, and maps failures
//! into the domain taxonomy.

use crate::error::{
    ClientError,
    Result,
};
use alloy::{
    primitives::{
        Address,
        B256,
        U256,
    },
    providers::DynProvider,
    rpc::types::TransactionReceipt,
    sol,
};

sol! {
    #[sol(rpc)]
    contract Lottery {
        function manager() external view returns (address);
        function getPlayers() external view returns (address[] memory);
        function enter() external payable;
        function pickWinner() external;
    }
}

/// Confirmation summary distilled from the full RPC receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

impl TxReceipt {
    fn from_rpc(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait LotteryContract {
    /// The bound contract address. The pot balance query targets it.
    fn address(&self) -> Address;

    async fn read_manager(&self) -> Result<Address>;

    async fn read_players(&self) -> Result<Vec<Address>>;

    /// Sends the entry transaction with `stake` attached and waits for the
    /// confirmed receipt. Minimum-stake enforcement is on-chain and surfaces
    /// as [`ClientError::ContractRevert`].
    async fn submit_entry(&self, from: Address, stake: U256) -> Result<TxReceipt>;

    /// Non-manager callers surface as [`ClientError::ContractRevert`].
    async fn pick_winner(&self, from: Address) -> Result<TxReceipt>;
}

/// Live proxy over the shared provider.
#[derive(Clone)]
pub struct LotteryProxy {
    provider: DynProvider,
    address: Address,
}

impl LotteryProxy {
    pub fn new(provider: DynProvider, address: Address) -> Self {
        Self { provider, address }
    }
}

/// Reverts carry the contract's reason string; everything else at this
/// boundary is transport.
fn classify(err: impl std::fmt::Display, context: &str) -> ClientError {
    let text = err.to_string();
    if text.contains("revert") || text.contains("execution reverted") {
        ClientError::ContractRevert(format!("{context}: {text}"))
    } else {
        ClientError::Connectivity(format!("{context}: {text}"))
    }
}

impl LotteryContract for LotteryProxy {
    fn address(&self) -> Address {
        self.address
    }

    async fn read_manager(&self) -> Result<Address> {
        let lottery = Lottery::new(self.address, self.provider.clone());
        lottery
            .manager()
            .call()
            .await
            .map_err(|e| classify(e, "manager read"))
    }

    async fn read_players(&self) -> Result<Vec<Address>> {
        let lottery = Lottery::new(self.address, self.provider.clone());
        lottery
            .getPlayers()
            .call()
            .await
            .map_err(|e| classify(e, "players read"))
    }

    async fn submit_entry(&self, from: Address, stake: U256) -> Result<TxReceipt> {
        let lottery = Lottery::new(self.address, self.provider.clone());
        let pending = lottery
            .enter()
            .value(stake)
            .from(from)
            .send()
            .await
            .map_err(|e| classify(e, "enter"))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| classify(e, "enter confirmation"))?;
        Ok(TxReceipt::from_rpc(&receipt))
    }

    async fn pick_winner(&self, from: Address) -> Result<TxReceipt> {
        let lottery = Lottery::new(self.address, self.provider.clone());
        let pending = lottery
            .pickWinner()
            .from(from)
            .send()
            .await
            .map_err(|e| classify(e, "pickWinner"))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| classify(e, "pickWinner confirmation"))?;
        Ok(TxReceipt::from_rpc(&receipt))
    }
}
