use color_eyre::eyre::{
    Result,
    eyre,
};
use lottery_client::{
    client,
    wallets,
};
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: lottery-client [--mainnet | --sepolia | --local] [--rpc-url <url>]\n\
         [--wallet <name>] [--wallet-dir <path>]\n\
         [--contract-config <path>]\n\
         \n\
         Flags:\n\
           --mainnet                Connect to Ethereum mainnet (default RPC {})\n\
           --sepolia                Connect to the Sepolia testnet (default RPC {})\n\
           --local                  Connect to a local node (default RPC {})\n\
           --rpc-url <url>          Override the RPC URL for the selected network\n\
           --wallet <name>          Keystore file to unlock for signing\n\
           --wallet-dir <path>      Override the keystore directory (defaults to ~/.ethereum/keystore)\n\
           --contract-config <path> Contract config record (defaults to .lottery/contract.json)",
        client::DEFAULT_MAINNET_RPC_URL,
        client::DEFAULT_SEPOLIA_RPC_URL,
        client::DEFAULT_LOCAL_RPC_URL,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    #[derive(Clone, Copy)]
    enum NetworkFlag {
        Mainnet,
        Sepolia,
        Local,
    }

    let mut args = std::env::args().skip(1);
    let mut network_flag: Option<NetworkFlag> = None;
    let mut custom_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut contract_config: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mainnet" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --mainnet/--sepolia/--local"
                    ));
                }
                network_flag = Some(NetworkFlag::Mainnet);
            }
            "--sepolia" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --mainnet/--sepolia/--local"
                    ));
                }
                network_flag = Some(NetworkFlag::Sepolia);
            }
            "--local" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --mainnet/--sepolia/--local"
                    ));
                }
                network_flag = Some(NetworkFlag::Local);
            }
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if custom_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                if network_flag.is_none() {
                    return Err(eyre!(
                        "--rpc-url must follow a network flag (--mainnet/--sepolia/--local)"
                    ));
                }
                custom_url = Some(url);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--contract-config" => {
                let path = args
                    .next()
                    .ok_or_else(|| eyre!("--contract-config requires a path argument"))?;
                if contract_config.is_some() {
                    return Err(eyre!("--contract-config may only be specified once"));
                }
                contract_config = Some(path);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let network = match network_flag {
        None => {
            return Err(eyre!(
                "Select a network with --mainnet, --sepolia, or --local"
            ));
        }
        Some(NetworkFlag::Mainnet) => client::NetworkTarget::Mainnet { url: custom_url },
        Some(NetworkFlag::Sepolia) => client::NetworkTarget::Sepolia { url: custom_url },
        Some(NetworkFlag::Local) => client::NetworkTarget::LocalNode { url: custom_url },
    };

    let dir = wallets::resolve_wallet_dir(wallet_dir.as_deref())?;
    let wallet = client::WalletConfig::Keystore {
        name: wallet_name,
        dir,
    };

    Ok(client::AppConfig {
        network,
        wallet,
        contract_config_path: contract_config,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to rolling files; stdout belongs to the TUI.
    let file_appender = tracing_appender::rolling::daily("logs", "lottery-client.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    color_eyre::install()?;
    tracing::info!("starting lottery client");
    let app_config = parse_cli_args()?;
    client::run_app(app_config).await
}
