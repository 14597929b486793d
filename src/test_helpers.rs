//! In-memory doubles for the chain adapter and the contract proxy.
//!
//! Compiled for unit tests and, behind the `test-helpers` feature, for the
//! integration suites under `tests/`. The mocks count every call and support
//! failure injection and read delays so the atomicity and ordering behavior
//! of the engine can be pinned down deterministically.

use crate::{
    chain::ChainClient,
    contract::{
        LotteryContract,
        TxReceipt,
    },
    error::{
        ClientError,
        Result,
    },
};
use alloy::primitives::{
    Address,
    B256,
    U256,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

/// 0.0001 ether, the contract's entry minimum.
pub const MIN_STAKE_WEI: u64 = 100_000_000_000_000;

#[derive(Clone)]
pub struct MockChain {
    inner: Arc<Mutex<ChainState>>,
}

struct ChainState {
    accounts: Vec<Address>,
    denied: Option<String>,
    balances: HashMap<Address, U256>,
    wallet_access_calls: usize,
}

impl MockChain {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChainState {
                accounts,
                denied: None,
                balances: HashMap::new(),
                wallet_access_calls: 0,
            })),
        }
    }

    /// A session whose wallet unlock was declined.
    pub fn denied(reason: &str) -> Self {
        let chain = Self::new(Vec::new());
        chain.inner.lock().unwrap().denied = Some(reason.to_string());
        chain
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.inner.lock().unwrap().balances.insert(address, balance);
    }

    pub fn wallet_access_calls(&self) -> usize {
        self.inner.lock().unwrap().wallet_access_calls
    }
}

impl ChainClient for MockChain {
    async fn request_wallet_access(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.wallet_access_calls += 1;
        if let Some(reason) = &state.denied {
            return Err(ClientError::UserRejected(reason.clone()));
        }
        if state.accounts.is_empty() {
            return Err(ClientError::UserRejected(String::from(
                "no unlocked wallet account in this session",
            )));
        }
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.inner.lock().unwrap().accounts.clone())
    }

    async fn balance_of(&self, address: Address) -> Result<U256> {
        let state = self.inner.lock().unwrap();
        Ok(state.balances.get(&address).copied().unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct MockLottery {
    inner: Arc<Mutex<LotteryState>>,
}

struct LotteryState {
    address: Address,
    manager: Address,
    players: Vec<Address>,
    min_stake: U256,
    fail_players_once: bool,
    fail_submit_once: bool,
    read_delay: Duration,
    read_calls: usize,
    submit_calls: usize,
    pick_calls: usize,
    next_tx: u8,
}

impl MockLottery {
    pub fn new(address: Address, manager: Address) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LotteryState {
                address,
                manager,
                players: Vec::new(),
                min_stake: U256::from(MIN_STAKE_WEI),
                fail_players_once: false,
                fail_submit_once: false,
                read_delay: Duration::ZERO,
                read_calls: 0,
                submit_calls: 0,
                pick_calls: 0,
                next_tx: 1,
            })),
        }
    }

    pub fn set_players(&self, players: Vec<Address>) {
        self.inner.lock().unwrap().players = players;
    }

    /// The next players read fails with a transport error.
    pub fn fail_players_once(&self) {
        self.inner.lock().unwrap().fail_players_once = true;
    }

    /// The next entry submission fails with a transport error before the
    /// transaction reaches the contract.
    pub fn fail_submit_once(&self) {
        self.inner.lock().unwrap().fail_submit_once = true;
    }

    /// Reads capture their result immediately, then hold it for `delay`
    /// before returning. Models a pass that observed the contract earlier
    /// but completes later.
    pub fn set_read_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().read_delay = delay;
    }

    pub fn read_calls(&self) -> usize {
        self.inner.lock().unwrap().read_calls
    }

    pub fn submit_calls(&self) -> usize {
        self.inner.lock().unwrap().submit_calls
    }

    pub fn pick_calls(&self) -> usize {
        self.inner.lock().unwrap().pick_calls
    }

    fn next_receipt(state: &mut LotteryState) -> TxReceipt {
        let receipt = TxReceipt {
            tx_hash: B256::with_last_byte(state.next_tx),
            block_number: Some(u64::from(state.next_tx)),
        };
        state.next_tx += 1;
        receipt
    }
}

impl LotteryContract for MockLottery {
    fn address(&self) -> Address {
        self.inner.lock().unwrap().address
    }

    async fn read_manager(&self) -> Result<Address> {
        let (manager, delay) = {
            let mut state = self.inner.lock().unwrap();
            state.read_calls += 1;
            (state.manager, state.read_delay)
        };
        tokio::time::sleep(delay).await;
        Ok(manager)
    }

    async fn read_players(&self) -> Result<Vec<Address>> {
        let (players, delay) = {
            let mut state = self.inner.lock().unwrap();
            state.read_calls += 1;
            if state.fail_players_once {
                state.fail_players_once = false;
                return Err(ClientError::Connectivity(String::from(
                    "players read: connection reset",
                )));
            }
            (state.players.clone(), state.read_delay)
        };
        tokio::time::sleep(delay).await;
        Ok(players)
    }

    async fn submit_entry(&self, from: Address, stake: U256) -> Result<TxReceipt> {
        let mut state = self.inner.lock().unwrap();
        state.submit_calls += 1;
        if state.fail_submit_once {
            state.fail_submit_once = false;
            return Err(ClientError::Connectivity(String::from(
                "enter: connection reset",
            )));
        }
        if stake < state.min_stake {
            return Err(ClientError::ContractRevert(String::from(
                "execution reverted: stake below the 0.0001 ether minimum",
            )));
        }
        state.players.push(from);
        Ok(Self::next_receipt(&mut state))
    }

    async fn pick_winner(&self, from: Address) -> Result<TxReceipt> {
        let mut state = self.inner.lock().unwrap();
        state.pick_calls += 1;
        if from != state.manager {
            return Err(ClientError::ContractRevert(String::from(
                "execution reverted: caller is not the manager",
            )));
        }
        state.players.clear();
        Ok(Self::next_receipt(&mut state))
    }
}
