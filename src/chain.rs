//! Chain client adapter: a thin capability layer over an Ethereum JSON-RPC
//! provider plus the accounts of a locally unlocked keystore wallet.
//!
//! The adapter holds no business state. Everything the rest of the client
//! needs from the chain boundary goes through [`ChainClient`] so the engine
//! and the workflow controller can be exercised against test doubles.

use crate::error::{
    ClientError,
    Result,
};
use alloy::{
    primitives::{
        Address,
        U256,
        utils::{
            ParseUnits,
            Unit,
            format_ether,
            parse_units,
        },
    },
    providers::{
        DynProvider,
        Provider,
    },
};

#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Verifies that the session may sign transactions. Fails with
    /// [`ClientError::UserRejected`] when the wallet unlock was declined.
    async fn request_wallet_access(&self) -> Result<()>;

    async fn accounts(&self) -> Result<Vec<Address>>;

    async fn balance_of(&self, address: Address) -> Result<U256>;
}

/// Converts a human decimal ether string into wei, exactly.
///
/// Empty, signed, non-numeric, and sub-wei (more than 18 fractional digits)
/// inputs are rejected rather than truncated.
pub fn to_base_units(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClientError::MalformedAmount(String::from(
            "enter an ether amount, e.g. 0.50",
        )));
    }
    if trimmed.starts_with('-') || trimmed.starts_with('+') {
        return Err(ClientError::MalformedAmount(format!(
            "'{trimmed}' must be an unsigned decimal number"
        )));
    }
    let parsed = parse_units(trimmed, Unit::ETHER.get()).map_err(|e| {
        ClientError::MalformedAmount(format!("'{trimmed}' is not a valid ether amount: {e}"))
    })?;
    match parsed {
        ParseUnits::U256(wei) => Ok(wei),
        ParseUnits::I256(_) => Err(ClientError::MalformedAmount(format!(
            "'{trimmed}' must not be negative"
        ))),
    }
}

/// Formats a wei amount as a decimal ether string, exactly (18 fractional
/// digits, no rounding). Inverse of [`to_base_units`].
pub fn to_decimal_units(wei: U256) -> String {
    format_ether(wei)
}

/// Live adapter over an `alloy` provider. Accounts are resolved once at
/// startup from the unlocked keystore; a session without a signer carries the
/// denial reason and reports it when a workflow requests wallet access.
#[derive(Clone)]
pub struct EvmChain {
    provider: DynProvider,
    accounts: Vec<Address>,
    denied: Option<String>,
}

impl EvmChain {
    pub fn new(provider: DynProvider, accounts: Vec<Address>, denied: Option<String>) -> Self {
        Self {
            provider,
            accounts,
            denied,
        }
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Startup reachability probe; the availability gate in
    /// [`crate::client`] treats a failure here as "no usable provider".
    pub async fn probe(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ClientError::Connectivity(format!("chain id query: {e}")))
    }
}

impl ChainClient for EvmChain {
    async fn request_wallet_access(&self) -> Result<()> {
        if let Some(reason) = &self.denied {
            return Err(ClientError::UserRejected(reason.clone()));
        }
        if self.accounts.is_empty() {
            return Err(ClientError::UserRejected(String::from(
                "no unlocked wallet account in this session",
            )));
        }
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.accounts.clone())
    }

    async fn balance_of(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| ClientError::Connectivity(format!("balance query: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn to_base_units__converts_whole_and_fractional_ether() {
        let one_ether = U256::from(10).pow(U256::from(18));
        assert_eq!(to_base_units("1").unwrap(), one_ether);
        assert_eq!(
            to_base_units("0.5").unwrap(),
            U256::from(500_000_000_000_000_000u64)
        );
        assert_eq!(
            to_base_units("0.00005").unwrap(),
            U256::from(50_000_000_000_000u64)
        );
        assert_eq!(to_base_units(" 0.0001 ").unwrap(), U256::from(100_000_000_000_000u64));
    }

    #[test]
    fn to_base_units__rejects_malformed_input() {
        for bad in ["", "   ", "abc", "-1", "+1", "1.2.3", "0x10", "1,5"] {
            let err = to_base_units(bad).unwrap_err();
            assert!(
                matches!(err, ClientError::MalformedAmount(_)),
                "expected MalformedAmount for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn to_base_units__rejects_sub_wei_precision() {
        // 19 fractional digits cannot be represented in wei.
        let err = to_base_units("0.0000000000000000001").unwrap_err();
        assert!(matches!(err, ClientError::MalformedAmount(_)));
    }

    #[test]
    fn to_decimal_units__formats_wei_exactly() {
        assert_eq!(
            to_decimal_units(U256::from(500_000_000_000_000_000u64)),
            "0.500000000000000000"
        );
    }

    proptest! {
        #[test]
        fn conversion_round_trips_for_any_wei_amount(limbs in any::<[u64; 4]>()) {
            let wei = U256::from_limbs(limbs);
            let decimal = to_decimal_units(wei);
            prop_assert_eq!(to_base_units(&decimal).unwrap(), wei);
        }
    }
}
