//! Transaction workflow controller.
//!
//! Drives the enter / pick-winner / refresh operations as a busy-gated state
//! machine. While an operation is in flight no second state-changing
//! operation may start; the attempt is rejected immediately, not queued.
//! Every failure path clears the busy latch before returning.

use crate::{
    chain::{
        ChainClient,
        to_base_units,
    },
    contract::LotteryContract,
    error::{
        ClientError,
        Result,
    },
    sync::SyncEngine,
};
use alloy::primitives::{
    Address,
    U256,
};
use std::sync::Arc;
use tracing::{
    info,
    warn,
};

pub const ENTER_PROCESSING: &str =
    "Transaction is processing. This might take 12 to 30 seconds.";
pub const PICK_WINNER_PROCESSING: &str =
    "Transaction is processing. This might take 9 to 15 seconds.";
pub const ENTER_SUCCESS: &str = "You entered the lottery";
pub const PICK_WINNER_SUCCESS: &str = "Winner picked";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    RequestingWalletAccess,
    SubmittingTransaction,
    AwaitingConfirmation,
    Resyncing,
}

/// Read-only view of the controller's user-facing state.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub entry_amount: String,
    pub status: String,
    pub busy: bool,
    pub plugin_available: bool,
    pub phase: WorkflowPhase,
}

pub struct WorkflowController<C, L> {
    engine: Arc<SyncEngine<C, L>>,
    entry_amount: String,
    status: String,
    busy: bool,
    plugin_available: bool,
    phase: WorkflowPhase,
}

impl<C: ChainClient, L: LotteryContract> WorkflowController<C, L> {
    pub fn new(engine: Arc<SyncEngine<C, L>>, plugin_available: bool) -> Self {
        Self {
            engine,
            entry_amount: String::new(),
            status: String::new(),
            busy: false,
            plugin_available,
            phase: WorkflowPhase::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        WorkflowState {
            entry_amount: self.entry_amount.clone(),
            status: self.status.clone(),
            busy: self.busy,
            plugin_available: self.plugin_available,
            phase: self.phase,
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine<C, L>> {
        &self.engine
    }

    /// Amount editing is suspended while a workflow is in flight.
    pub fn amount_input_char(&mut self, c: char) {
        if self.busy {
            return;
        }
        if c.is_ascii_digit() || c == '.' {
            self.entry_amount.push(c);
        }
    }

    pub fn amount_input_backspace(&mut self) {
        if self.busy {
            return;
        }
        self.entry_amount.pop();
    }

    fn guard_ready(&mut self) -> bool {
        if !self.plugin_available {
            self.status = String::from("Wallet is not available in this session.");
            return false;
        }
        if self.busy {
            // Rejected, not queued.
            return false;
        }
        true
    }

    fn finish(&mut self, status: String) {
        self.status = status;
        self.busy = false;
        self.phase = WorkflowPhase::Idle;
    }

    async fn active_account(&self) -> Result<Address> {
        self.engine.chain().request_wallet_access().await?;
        let accounts = self.engine.chain().accounts().await?;
        accounts.first().copied().ok_or(ClientError::NoAccount)
    }

    /// Enter workflow: validate the stake locally, request wallet access,
    /// submit with the stake attached, await confirmation, resync.
    pub async fn submit_entry(&mut self) {
        if !self.guard_ready() {
            return;
        }
        let stake = match self.validate_entry_amount() {
            Ok(stake) => stake,
            Err(e) => {
                self.status = user_message(&e);
                return;
            }
        };
        self.busy = true;
        self.phase = WorkflowPhase::RequestingWalletAccess;
        self.status = String::from("Waiting on wallet approval...");

        match self.run_entry(stake).await {
            Ok(resync_warning) => {
                self.entry_amount.clear();
                let status = match resync_warning {
                    None => String::from(ENTER_SUCCESS),
                    Some(warning) => format!("{ENTER_SUCCESS} ({warning})"),
                };
                info!("entry confirmed");
                self.finish(status);
            }
            Err(e) => {
                // Entry amount is preserved for correction and retry.
                warn!(error = %e, "entry failed");
                self.finish(user_message(&e));
            }
        }
    }

    fn validate_entry_amount(&self) -> Result<U256> {
        let stake = to_base_units(&self.entry_amount)?;
        if stake.is_zero() {
            return Err(ClientError::MalformedAmount(String::from(
                "the stake must be greater than zero",
            )));
        }
        Ok(stake)
    }

    async fn run_entry(&mut self, stake: U256) -> Result<Option<String>> {
        let from = self.active_account().await?;
        self.phase = WorkflowPhase::SubmittingTransaction;
        self.status = String::from(ENTER_PROCESSING);
        self.phase = WorkflowPhase::AwaitingConfirmation;
        let receipt = self.engine.proxy().submit_entry(from, stake).await?;
        info!(tx = %receipt.tx_hash, "entry transaction confirmed");
        self.phase = WorkflowPhase::Resyncing;
        Ok(self.resync_warning().await)
    }

    /// Winner selection: same shape as entry, without amount handling. The
    /// manager-only gate is enforced on-chain.
    pub async fn pick_winner(&mut self) {
        if !self.guard_ready() {
            return;
        }
        self.busy = true;
        self.phase = WorkflowPhase::RequestingWalletAccess;
        self.status = String::from("Waiting on wallet approval...");

        match self.run_pick_winner().await {
            Ok(resync_warning) => {
                let status = match resync_warning {
                    None => String::from(PICK_WINNER_SUCCESS),
                    Some(warning) => format!("{PICK_WINNER_SUCCESS} ({warning})"),
                };
                info!("winner picked");
                self.finish(status);
            }
            Err(e) => {
                warn!(error = %e, "pick winner failed");
                self.finish(user_message(&e));
            }
        }
    }

    async fn run_pick_winner(&mut self) -> Result<Option<String>> {
        let from = self.active_account().await?;
        self.phase = WorkflowPhase::SubmittingTransaction;
        self.status = String::from(PICK_WINNER_PROCESSING);
        self.phase = WorkflowPhase::AwaitingConfirmation;
        let receipt = self.engine.proxy().pick_winner(from).await?;
        info!(tx = %receipt.tx_hash, "pick winner transaction confirmed");
        self.phase = WorkflowPhase::Resyncing;
        Ok(self.resync_warning().await)
    }

    /// The transaction already confirmed when this runs, so a resync failure
    /// must not be reported as an operation failure. It becomes a
    /// stale-state warning appended to the success message.
    async fn resync_warning(&self) -> Option<String> {
        match self.engine.refresh().await {
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "post-transaction resync failed");
                Some(format!("{e}; shown figures may be stale"))
            }
        }
    }

    /// Manual refresh. Not a transaction, so it skips the busy latch, but an
    /// unavailable session still never reaches the network.
    pub async fn refresh(&mut self) {
        if !self.plugin_available {
            return;
        }
        match self.engine.refresh().await {
            Ok(_) => self.status = String::from("State refreshed."),
            Err(e) => self.status = user_message(&e),
        }
    }

    /// Latches busy without starting a network call, so tests can observe
    /// what a second operation does while one is in flight.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn begin_busy_probe(&mut self) {
        self.busy = true;
        self.phase = WorkflowPhase::SubmittingTransaction;
    }
}

/// Connectivity details are node noise; the user gets a retry prompt.
/// Everything else displays its domain message.
fn user_message(err: &ClientError) -> String {
    match err {
        ClientError::Connectivity(_) => {
            String::from("Network request failed. Please try again.")
        }
        ClientError::SyncFailed(inner)
            if matches!(**inner, ClientError::Connectivity(_)) =>
        {
            String::from("Network request failed. Please try again.")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        MockChain,
        MockLottery,
    };

    fn addr(last: u8) -> Address {
        Address::with_last_byte(last)
    }

    fn controller(
        chain: MockChain,
        proxy: MockLottery,
    ) -> WorkflowController<MockChain, MockLottery> {
        WorkflowController::new(Arc::new(SyncEngine::new(chain, proxy)), true)
    }

    fn type_amount(ctl: &mut WorkflowController<MockChain, MockLottery>, s: &str) {
        for c in s.chars() {
            ctl.amount_input_char(c);
        }
    }

    #[tokio::test]
    async fn submit_entry__success_clears_amount_and_adds_player() {
        // given a funded account and a valid stake typed in
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        let mut ctl = controller(chain, proxy);
        type_amount(&mut ctl, "0.5");

        // when the entry runs to confirmation
        ctl.submit_entry().await;

        // then the input is cleared, busy released, and the roster grew
        let state = ctl.state();
        assert_eq!(state.status, ENTER_SUCCESS);
        assert!(state.entry_amount.is_empty());
        assert!(!state.busy);
        assert_eq!(state.phase, WorkflowPhase::Idle);
        assert_eq!(ctl.engine().snapshot().await.players, vec![addr(1)]);
    }

    #[tokio::test]
    async fn submit_entry__malformed_amount_never_reaches_the_network() {
        // given garbage in the amount field
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        let mut ctl = controller(chain, proxy);
        ctl.entry_amount = String::from("abc");

        // when submission is attempted
        ctl.submit_entry().await;

        // then validation failed locally with zero calls issued
        let state = ctl.state();
        assert!(state.status.contains("invalid amount"));
        assert!(!state.busy);
        assert_eq!(ctl.engine().chain().wallet_access_calls(), 0);
        assert_eq!(ctl.engine().proxy().submit_calls(), 0);
    }

    #[tokio::test]
    async fn submit_entry__below_minimum_revert_preserves_amount() {
        // given a stake under the contract's minimum
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        let mut ctl = controller(chain, proxy);
        type_amount(&mut ctl, "0.00001");

        // when the contract rejects the entry
        ctl.submit_entry().await;

        // then the revert reason is surfaced and the input kept for retry
        let state = ctl.state();
        assert!(state.status.contains("rejected the transaction"));
        assert_eq!(state.entry_amount, "0.00001");
        assert!(!state.busy);
        assert!(ctl.engine().snapshot().await.players.is_empty());
    }

    #[tokio::test]
    async fn submit_entry__rejected_while_busy_with_no_extra_calls() {
        // given an operation already in flight
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        let mut ctl = controller(chain, proxy);
        ctl.begin_busy_probe();
        type_amount(&mut ctl, "0.5");

        // when a second submission is attempted
        ctl.submit_entry().await;

        // then it was dropped outright
        assert_eq!(ctl.state().entry_amount, "");
        assert!(ctl.state().busy);
        assert_eq!(ctl.engine().chain().wallet_access_calls(), 0);
        assert_eq!(ctl.engine().proxy().submit_calls(), 0);
    }

    #[tokio::test]
    async fn submit_entry__wallet_rejection_surfaces_and_releases_busy() {
        // given a session whose wallet unlock was declined
        let chain = MockChain::denied("unlock declined");
        let proxy = MockLottery::new(addr(9), addr(7));
        let mut ctl = controller(chain, proxy);
        type_amount(&mut ctl, "0.5");

        // when submission is attempted
        ctl.submit_entry().await;

        // then the rejection is shown, busy cleared, nothing submitted
        let state = ctl.state();
        assert!(state.status.contains("wallet access rejected"));
        assert!(!state.busy);
        assert_eq!(ctl.engine().proxy().submit_calls(), 0);
    }

    #[tokio::test]
    async fn submit_entry__resync_failure_still_reports_success() {
        // given a contract that will confirm the entry but then refuse reads
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        let mut ctl = controller(chain, proxy);
        type_amount(&mut ctl, "0.5");
        ctl.engine().proxy().fail_players_once();

        // when the entry confirms and the follow-up resync fails
        ctl.submit_entry().await;

        // then success is reported with a stale-state warning appended
        let state = ctl.state();
        assert!(state.status.starts_with(ENTER_SUCCESS));
        assert!(state.status.contains("stale"));
        assert!(state.entry_amount.is_empty());
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn pick_winner__non_manager_caller_surfaces_revert() {
        // given an account that is not the contract manager
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        proxy.set_players(vec![addr(1)]);
        let mut ctl = controller(chain, proxy);

        // when winner selection is attempted
        ctl.pick_winner().await;

        // then the on-chain gate answers and busy is released
        let state = ctl.state();
        assert!(state.status.contains("rejected the transaction"));
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn pick_winner__manager_clears_the_roster() {
        // given the manager's own account
        let chain = MockChain::new(vec![addr(7)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        proxy.set_players(vec![addr(1), addr(2)]);
        let mut ctl = controller(chain, proxy);

        // when winner selection runs to confirmation
        ctl.pick_winner().await;

        // then the resynced roster is empty and success is reported
        assert_eq!(ctl.state().status, PICK_WINNER_SUCCESS);
        assert!(ctl.engine().snapshot().await.players.is_empty());
    }

    #[tokio::test]
    async fn workflows__unavailable_session_issues_zero_calls() {
        // given a session that failed the startup availability gate
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        let engine = Arc::new(SyncEngine::new(chain, proxy));
        let mut ctl = WorkflowController::new(engine, false);
        type_amount(&mut ctl, "0.5");

        // when every operation is attempted
        ctl.submit_entry().await;
        ctl.pick_winner().await;
        ctl.refresh().await;

        // then nothing reached the chain or the contract
        assert_eq!(ctl.engine().chain().wallet_access_calls(), 0);
        assert_eq!(ctl.engine().proxy().submit_calls(), 0);
        assert_eq!(ctl.engine().proxy().pick_calls(), 0);
        assert_eq!(ctl.engine().proxy().read_calls(), 0);
    }

    #[tokio::test]
    async fn refresh__connectivity_failure_shows_retry_prompt() {
        // given a proxy whose reads fail at the transport level
        let chain = MockChain::new(vec![addr(1)]);
        let proxy = MockLottery::new(addr(9), addr(7));
        proxy.fail_players_once();
        let mut ctl = controller(chain, proxy);

        // when a manual refresh is requested
        ctl.refresh().await;

        // then the user sees the generic retry message
        assert!(ctl.state().status.contains("try again"));
    }
}
