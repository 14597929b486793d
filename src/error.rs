//! Error taxonomy shared by the chain adapter, the contract proxy, the
//! synchronization engine, and the workflow controller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The node or provider could not be reached. Never retried
    /// automatically; the user is told to try again.
    #[error("network request failed: {0}")]
    Connectivity(String),

    /// The wallet declined to grant access (keystore unlock refused or no
    /// signer attached to the session).
    #[error("wallet access rejected: {0}")]
    UserRejected(String),

    /// Local input validation failed before any network call was made.
    #[error("invalid amount: {0}")]
    MalformedAmount(String),

    /// An on-chain precondition failed and the transaction was rolled back.
    #[error("contract rejected the transaction: {0}")]
    ContractRevert(String),

    /// The wallet is connected but resolved no account.
    #[error("no account available in the connected wallet")]
    NoAccount,

    /// One or more of the synchronization reads failed; the previous
    /// snapshot is retained.
    #[error("state synchronization failed: {0}")]
    SyncFailed(#[source] Box<ClientError>),
}

pub type Result<T> = std::result::Result<T, ClientError>;
