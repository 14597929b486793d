//! Static contract configuration.
//!
//! The client binds to exactly one deployed contract, described by a small
//! JSON record loaded once at startup. The record is never written by the
//! client; deployment tooling produces it.

use alloy::primitives::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::PathBuf,
};

pub const DEFAULT_CONFIG_PATH: &str = ".lottery/contract.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Checksummed or lowercase hex address of the deployed lottery.
    pub contract_address: String,
    /// Optional per-deployment RPC override; CLI flags take precedence.
    #[serde(default)]
    pub rpc_url: Option<String>,
}

impl ContractConfig {
    pub fn resolve_path(path: Option<&str>) -> PathBuf {
        let raw = path.unwrap_or(DEFAULT_CONFIG_PATH);
        PathBuf::from(shellexpand::tilde(raw).into_owned())
    }

    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path);
        let raw = fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read contract config {}", path.display()))?;
        serde_json::from_str(&raw)
            .wrap_err_with(|| format!("Malformed contract config {}", path.display()))
    }

    pub fn parsed_address(&self) -> Result<Address> {
        self.contract_address
            .parse()
            .map_err(|_| eyre!("'{}' is not a valid contract address", self.contract_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_address__accepts_hex_and_rejects_garbage() {
        let config = ContractConfig {
            contract_address: String::from("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            rpc_url: None,
        };
        assert!(config.parsed_address().is_ok());

        let bad = ContractConfig {
            contract_address: String::from("not-an-address"),
            rpc_url: None,
        };
        assert!(bad.parsed_address().is_err());
    }

    #[test]
    fn load__record_deserializes_without_optional_fields() {
        let record: ContractConfig =
            serde_json::from_str(r#"{ "contract_address": "0x00" }"#).unwrap();
        assert!(record.rpc_url.is_none());
    }
}
