use std::collections::HashSet;

use async_trait::async_trait;

use crate::blockchain::address::normalize_address;
use crate::blockchain::AddressMatcher;
use crate::config::WatchConfig;
use crate::error::Result;

/// In-memory `AddressMatcher` over three fixed address sets.
///
/// Entries are stored normalized and lowercased, so lookups are
/// case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    wallets: HashSet<String>,
    tokens: HashSet<String>,
    contracts: HashSet<String>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new()
            .with_wallets(&config.wallets)
            .with_tokens(&config.tokens)
            .with_contracts(&config.contracts)
    }

    pub fn with_wallets<S: AsRef<str>>(mut self, addresses: &[S]) -> Self {
        self.wallets.extend(addresses.iter().map(|a| lookup_key(a.as_ref())));
        self
    }

    pub fn with_tokens<S: AsRef<str>>(mut self, addresses: &[S]) -> Self {
        self.tokens.extend(addresses.iter().map(|a| lookup_key(a.as_ref())));
        self
    }

    pub fn with_contracts<S: AsRef<str>>(mut self, addresses: &[S]) -> Self {
        self.contracts.extend(addresses.iter().map(|a| lookup_key(a.as_ref())));
        self
    }

    pub fn len(&self) -> usize {
        self.wallets.len() + self.tokens.len() + self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lookup_key(address: &str) -> String {
    normalize_address(address.trim()).to_lowercase()
}

#[async_trait]
impl AddressMatcher for WatchList {
    async fn is_watch_wallet_address(&self, address: &str) -> Result<bool> {
        Ok(self.wallets.contains(&lookup_key(address)))
    }

    async fn is_watch_token_address(&self, address: &str) -> Result<bool> {
        Ok(self.tokens.contains(&lookup_key(address)))
    }

    async fn is_watch_contract_address(&self, address: &str) -> Result<bool> {
        Ok(self.contracts.contains(&lookup_key(address)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x05ec09c04e223ec0c07f0bbb4d19737bbefcf58361812f1405017c19ae5b175f";

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let list = WatchList::new().with_wallets(&[WALLET.to_uppercase().replace("0X", "0x")]);

        assert!(list.is_watch_wallet_address(WALLET).await.unwrap());
        assert!(!list.is_watch_token_address(WALLET).await.unwrap());
        assert!(!list.is_watch_contract_address(WALLET).await.unwrap());
    }

    #[tokio::test]
    async fn test_short_entries_are_normalized() {
        let short = format!("0x{}", &WALLET[3..]);
        let list = WatchList::new().with_tokens(&[short]);

        assert!(list.is_watch_token_address(WALLET).await.unwrap());
    }

    #[test]
    fn test_from_config() {
        let config = WatchConfig {
            wallets: vec![WALLET.to_string()],
            tokens: vec!["0x1".to_string(), "0x2".to_string()],
            contracts: vec![],
        };
        let list = WatchList::from_config(&config);
        assert_eq!(list.len(), 3);
        assert!(!list.is_empty());
    }
}
