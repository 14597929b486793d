//! Application bootstrap and event loop.
//!
//! Startup resolves the contract config, the keystore wallet, and the RPC
//! provider into either a ready session or a terminal "unavailable" session.
//! Availability is decided once; a session that starts without a usable
//! provider or contract config stays unavailable until the process exits.

use crate::{
    chain::EvmChain,
    config::ContractConfig,
    contract::LotteryProxy,
    sync::{
        ContractSnapshot,
        SyncEngine,
    },
    ui::{
        self,
        UserEvent,
    },
    wallets,
    workflow::{
        WorkflowController,
        WorkflowState,
    },
};
use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{
        Provider,
        ProviderBuilder,
    },
};
use color_eyre::eyre::Result;
use std::{
    path::PathBuf,
    sync::Arc,
};
use tracing::{
    info,
    warn,
};

pub const DEFAULT_MAINNET_RPC_URL: &str = "https://eth.llamarpc.com";
pub const DEFAULT_SEPOLIA_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:8545";

#[derive(Clone, Debug)]
pub enum NetworkTarget {
    Mainnet { url: Option<String> },
    Sepolia { url: Option<String> },
    LocalNode { url: Option<String> },
}

impl NetworkTarget {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mainnet { .. } => "mainnet",
            Self::Sepolia { .. } => "sepolia",
            Self::LocalNode { .. } => "local",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            Self::Mainnet { .. } => DEFAULT_MAINNET_RPC_URL,
            Self::Sepolia { .. } => DEFAULT_SEPOLIA_RPC_URL,
            Self::LocalNode { .. } => DEFAULT_LOCAL_RPC_URL,
        }
    }

    /// CLI override first, then the contract config's endpoint, then the
    /// network default.
    pub fn resolve_url(&self, config_url: Option<&str>) -> String {
        let custom = match self {
            Self::Mainnet { url } | Self::Sepolia { url } | Self::LocalNode { url } => {
                url.as_deref()
            }
        };
        custom
            .or(config_url)
            .unwrap_or(self.default_url())
            .to_string()
    }
}

#[derive(Clone, Debug)]
pub enum WalletConfig {
    Keystore {
        /// Keystore filename; the first wallet in the directory when absent.
        name: Option<String>,
        dir: PathBuf,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallet: WalletConfig,
    pub contract_config_path: Option<String>,
}

/// Everything the view needs for one frame, assembled read-only.
pub struct AppView {
    pub snapshot: ContractSnapshot,
    pub workflow: WorkflowState,
    pub contract_address: Address,
    pub network_label: String,
}

pub struct AppController {
    workflow: WorkflowController<EvmChain, LotteryProxy>,
    contract_address: Address,
    network_label: String,
}

impl AppController {
    async fn view(&self) -> AppView {
        AppView {
            snapshot: self.workflow.engine().snapshot().await,
            workflow: self.workflow.state(),
            contract_address: self.contract_address,
            network_label: self.network_label.clone(),
        }
    }
}

enum Session {
    Ready(Box<AppController>),
    Unavailable { reason: String },
}

/// Unlocks the selected keystore wallet. A failed or declined unlock does
/// not abort the session; it becomes a read-only session that reports the
/// denial when a workflow asks for wallet access.
fn unlock_session_wallet(
    wallet: &WalletConfig,
) -> std::result::Result<alloy::signers::local::PrivateKeySigner, String> {
    let WalletConfig::Keystore { name, dir } = wallet;
    let descriptor = match name {
        Some(name) => wallets::find_wallet(dir, name).map_err(|e| e.to_string())?,
        None => wallets::list_wallets(dir)
            .map_err(|e| e.to_string())?
            .into_iter()
            .next()
            .ok_or_else(|| format!("No keystore wallet found in {}", dir.display()))?,
    };
    wallets::unlock_wallet(&descriptor).map_err(|e| e.to_string())
}

async fn establish_session(config: AppConfig) -> Session {
    let contract_config = match ContractConfig::load(config.contract_config_path.as_deref()) {
        Ok(record) => record,
        Err(e) => {
            return Session::Unavailable {
                reason: e.to_string(),
            };
        }
    };
    let contract_address = match contract_config.parsed_address() {
        Ok(address) => address,
        Err(e) => {
            return Session::Unavailable {
                reason: e.to_string(),
            };
        }
    };

    let url = config
        .network
        .resolve_url(contract_config.rpc_url.as_deref());
    let parsed_url = match url.parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            return Session::Unavailable {
                reason: format!("Invalid RPC URL '{url}': {e}"),
            };
        }
    };

    let (provider, accounts, denied) = match unlock_session_wallet(&config.wallet) {
        Ok(signer) => {
            let address = signer.address();
            let provider = ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(parsed_url)
                .erased();
            (provider, vec![address], None)
        }
        Err(reason) => {
            warn!(%reason, "continuing without a signer");
            let provider = ProviderBuilder::new().connect_http(parsed_url).erased();
            (provider, Vec::new(), Some(reason))
        }
    };

    let chain = EvmChain::new(provider.clone(), accounts, denied);
    match chain.probe().await {
        Ok(chain_id) => info!(chain_id, %url, "connected"),
        Err(e) => {
            return Session::Unavailable {
                reason: format!("Node at {url} is unreachable: {e}"),
            };
        }
    }

    let proxy = LotteryProxy::new(provider, contract_address);
    let engine = Arc::new(SyncEngine::new(chain, proxy));
    let workflow = WorkflowController::new(engine, true);
    Session::Ready(Box::new(AppController {
        workflow,
        contract_address,
        network_label: config.network.label().to_string(),
    }))
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    match establish_session(config).await {
        Session::Ready(mut app) => {
            app.workflow.refresh().await;
            run_ready(&mut app).await
        }
        Session::Unavailable { reason } => {
            warn!(%reason, "session unavailable");
            run_unavailable(&reason).await
        }
    }
}

async fn run_ready(app: &mut AppController) -> Result<()> {
    let mut ui = ui::terminal_enter()?;
    let result = run_loop(&mut ui, app).await;
    let restored = ui::terminal_exit(&mut ui);
    result.and(restored)
}

async fn run_loop(ui: &mut ui::UiState, app: &mut AppController) -> Result<()> {
    loop {
        let view = app.view().await;
        ui.draw(&view)?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = ui::next_event() => match event? {
                UserEvent::Quit => return Ok(()),
                UserEvent::Refresh => app.workflow.refresh().await,
                UserEvent::SubmitEntry => app.workflow.submit_entry().await,
                UserEvent::PickWinner => app.workflow.pick_winner().await,
                UserEvent::AmountChar(c) => app.workflow.amount_input_char(c),
                UserEvent::AmountBackspace => app.workflow.amount_input_backspace(),
                UserEvent::Redraw => {}
            }
        }
    }
}

async fn run_unavailable(reason: &str) -> Result<()> {
    let mut ui = ui::terminal_enter()?;
    let result = loop {
        if let Err(e) = ui.draw_unavailable(reason) {
            break Err(e);
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            event = ui::next_event() => match event {
                Ok(UserEvent::Quit) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
        }
    };
    let restored = ui::terminal_exit(&mut ui);
    result.and(restored)
}
