//! Synchronization engine: pulls the contract's manager, player roster, and
//! pot balance concurrently and replaces the held snapshot in one step.
//!
//! Partial state is never visible. If any of the three reads fails the pass
//! is abandoned and the previous snapshot stays in place.

use crate::{
    chain::ChainClient,
    contract::LotteryContract,
    error::{
        ClientError,
        Result,
    },
};
use alloy::primitives::{
    Address,
    U256,
};
use futures::future::try_join3;
use tokio::sync::RwLock;
use tracing::debug;

/// One coherent observation of the contract. Starts empty; only a fully
/// successful pass may replace it, wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub manager: Address,
    /// On-chain join order, duplicates allowed.
    pub players: Vec<Address>,
    /// Pot balance in wei.
    pub balance: U256,
}

pub struct SyncEngine<C, L> {
    chain: C,
    proxy: L,
    snapshot: RwLock<ContractSnapshot>,
}

impl<C: ChainClient, L: LotteryContract> SyncEngine<C, L> {
    pub fn new(chain: C, proxy: L) -> Self {
        Self {
            chain,
            proxy,
            snapshot: RwLock::new(ContractSnapshot::default()),
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn proxy(&self) -> &L {
        &self.proxy
    }

    pub async fn snapshot(&self) -> ContractSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Runs one synchronization pass. Concurrent passes are allowed; the
    /// last pass to complete its full triple wins the replace.
    pub async fn refresh(&self) -> Result<ContractSnapshot> {
        let pot = self.proxy.address();
        let (manager, players, balance) = try_join3(
            self.proxy.read_manager(),
            self.proxy.read_players(),
            self.chain.balance_of(pot),
        )
        .await
        .map_err(|e| ClientError::SyncFailed(Box::new(e)))?;

        let next = ContractSnapshot {
            manager,
            players,
            balance,
        };
        debug!(players = next.players.len(), "snapshot replaced");
        *self.snapshot.write().await = next.clone();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        MockChain,
        MockLottery,
    };
    use std::{
        sync::Arc,
        time::Duration,
    };

    fn addr(last: u8) -> Address {
        Address::with_last_byte(last)
    }

    #[tokio::test]
    async fn refresh__replaces_the_snapshot_wholesale() {
        // given a contract with a manager, two players, and a funded pot
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        proxy.set_players(vec![addr(2), addr(3)]);
        chain.set_balance(addr(9), U256::from(500u64));
        let engine = SyncEngine::new(chain, proxy);

        // when a pass completes
        let observed = engine.refresh().await.unwrap();

        // then the held snapshot matches the full triple
        assert_eq!(observed, engine.snapshot().await);
        assert_eq!(observed.manager, addr(7));
        assert_eq!(observed.players, vec![addr(2), addr(3)]);
        assert_eq!(observed.balance, U256::from(500u64));
    }

    #[tokio::test]
    async fn refresh__failed_read_keeps_previous_snapshot() {
        // given a populated snapshot from an earlier pass
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        proxy.set_players(vec![addr(2)]);
        let engine = SyncEngine::new(chain, proxy);
        let before = engine.refresh().await.unwrap();

        // when the next pass fails mid-way (players read errors, manager and
        // balance would have produced new values)
        engine.proxy().set_players(vec![addr(2), addr(3)]);
        engine.proxy().fail_players_once();
        engine.chain().set_balance(addr(9), U256::from(999u64));
        let err = engine.refresh().await.unwrap_err();

        // then the error is SyncFailed and no partial state leaked
        assert!(matches!(err, ClientError::SyncFailed(_)));
        assert_eq!(engine.snapshot().await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh__last_completing_pass_wins_the_replace() {
        // given a slow pass that captured the old roster before a fast pass
        // observes the new one
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        proxy.set_players(vec![addr(2)]);
        proxy.set_read_delay(Duration::from_secs(5));
        let engine = Arc::new(SyncEngine::new(chain, proxy));

        let slow = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // when the roster changes and a fast pass runs to completion
        engine.proxy().set_players(vec![addr(2), addr(3)]);
        engine.proxy().set_read_delay(Duration::ZERO);
        engine.refresh().await.unwrap();

        // then the slow pass finishes last and its full (older) triple wins
        slow.await.unwrap().unwrap();
        assert_eq!(engine.snapshot().await.players, vec![addr(2)]);
    }
}
