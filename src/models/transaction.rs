use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Canonical transfer record emitted for a watched address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub chain_id: String,
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: BigDecimal,
    pub nonce: u64,
    pub block_hash: String,
    pub block_number: u64,
    pub transaction_index: u64,
    pub gas: u64,
    pub gas_price: u64,
    pub fee: BigDecimal,
    pub fee_token: String,
    pub input: String,
    pub symbol: String,
    pub token_address: String,
    pub status: TransactionStatus,
    pub timestamp: u64,
    /// Origin transaction fields other than its hash, plus `ext` for 12-word calldata
    pub extra: Map<String, Value>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    Fail,
    Pending,
}

/// Matched transactions grouped by lowercased address.
///
/// Keys keep first-match order and buckets keep detection order, so the map
/// iterates and serializes in block scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressMapTransactions(Vec<(String, Vec<Transaction>)>);

impl AddressMapTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group `(address, transaction)` pairs into buckets, lowercasing every key
    pub fn group_by_address<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Transaction)>,
    {
        entries.into_iter().fold(Self::new(), |mut acc, (address, tx)| {
            acc.push(address, tx);
            acc
        })
    }

    /// Append `tx` to the bucket of `address`, opening it after the existing ones
    pub fn push(&mut self, address: String, tx: Transaction) {
        let address = address.to_lowercase();
        match self.position(&address) {
            Some(index) => self.0[index].1.push(tx),
            None => self.0.push((address, vec![tx])),
        }
    }

    /// Append every bucket of `other` after the matching bucket of `self`
    pub fn merge(mut self, other: Self) -> Self {
        for (address, txs) in other.0 {
            match self.position(&address) {
                Some(index) => self.0[index].1.extend(txs),
                None => self.0.push((address, txs)),
            }
        }
        self
    }

    fn position(&self, address: &str) -> Option<usize> {
        self.0.iter().position(|(key, _)| key == address)
    }

    pub fn get(&self, address: &str) -> Option<&[Transaction]> {
        self.position(&address.to_lowercase()).map(|index| self.0[index].1.as_slice())
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(address, _)| address.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Transaction])> {
        self.0.iter().map(|(address, txs)| (address.as_str(), txs.as_slice()))
    }

    pub(crate) fn transactions_mut(&mut self) -> impl Iterator<Item = &mut Transaction> {
        self.0.iter_mut().flat_map(|(_, txs)| txs.iter_mut())
    }

    /// Number of distinct matched addresses
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn transaction_count(&self) -> usize {
        self.0.iter().map(|(_, txs)| txs.len()).sum()
    }

    pub fn into_inner(self) -> Vec<(String, Vec<Transaction>)> {
        self.0
    }
}

impl Serialize for AddressMapTransactions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(address, txs)| (address, txs)))
    }
}

/// Scan bounds returned by a block replay: `start` is the next unprocessed height
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplayCursor {
    pub start: u64,
    pub end: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    fn sample_transaction(hash: &str) -> Transaction {
        Transaction {
            chain_id: "SN_MAIN".to_string(),
            hash: hash.to_string(),
            from: "0x0abc".to_string(),
            to: "0x0def".to_string(),
            value: BigDecimal::from(1000),
            nonce: 7,
            block_hash: String::new(),
            block_number: 0,
            transaction_index: 0,
            gas: 0,
            gas_price: 0,
            fee: BigDecimal::zero(),
            fee_token: "ETH".to_string(),
            input: String::new(),
            symbol: "USDC".to_string(),
            token_address: "0x053c".to_string(),
            status: TransactionStatus::Fail,
            timestamp: 0,
            extra: Map::new(),
            source: "rpc".to_string(),
        }
    }

    #[test]
    fn test_transaction_serializes_camel_case() {
        let json = serde_json::to_value(sample_transaction("0x1")).expect("Failed to serialize");

        assert_eq!(json["chainId"], "SN_MAIN");
        assert_eq!(json["tokenAddress"], "0x053c");
        assert_eq!(json["feeToken"], "ETH");
        assert_eq!(json["status"], "Fail");
        assert_eq!(json["value"], "1000");
    }

    #[test]
    fn test_group_by_address_lowercases_and_keeps_order() {
        let map = AddressMapTransactions::group_by_address(vec![
            ("0xABC".to_string(), sample_transaction("0x1")),
            ("0xdef".to_string(), sample_transaction("0x2")),
            ("0xabc".to_string(), sample_transaction("0x3")),
        ]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.transaction_count(), 3);
        let bucket = map.get("0xabc").expect("bucket should exist");
        assert_eq!(bucket[0].hash, "0x1");
        assert_eq!(bucket[1].hash, "0x3");
    }

    #[test]
    fn test_merge_appends_buckets() {
        let first = AddressMapTransactions::group_by_address(vec![("0xa".to_string(), sample_transaction("0x1"))]);
        let second = AddressMapTransactions::group_by_address(vec![
            ("0xa".to_string(), sample_transaction("0x2")),
            ("0xb".to_string(), sample_transaction("0x3")),
        ]);

        let merged = first.merge(second);

        let hashes: Vec<&str> = merged.get("0xa").unwrap().iter().map(|tx| tx.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0x1", "0x2"]);
        assert_eq!(merged.get("0xb").unwrap().len(), 1);
        assert!(AddressMapTransactions::new().merge(AddressMapTransactions::new()).is_empty());
    }

    #[test]
    fn test_address_map_serializes_as_object() {
        let map = AddressMapTransactions::group_by_address(vec![("0xa".to_string(), sample_transaction("0x1"))]);
        let json = serde_json::to_value(&map).expect("Failed to serialize");
        assert_eq!(json["0xa"][0]["hash"], "0x1");
    }

    #[test]
    fn test_keys_keep_first_match_order() {
        let map = AddressMapTransactions::group_by_address(vec![
            ("0x0bbb".to_string(), sample_transaction("0x1")),
            ("0x0aaa".to_string(), sample_transaction("0x2")),
            ("0x0BBB".to_string(), sample_transaction("0x3")),
        ]);
        let merged = map.merge(AddressMapTransactions::group_by_address(vec![(
            "0x0999".to_string(),
            sample_transaction("0x4"),
        )]));

        assert_eq!(merged.addresses().collect::<Vec<_>>(), vec!["0x0bbb", "0x0aaa", "0x0999"]);
        let serialized = serde_json::to_string(&merged).expect("Failed to serialize");
        let bbb = serialized.find("\"0x0bbb\"").unwrap();
        let aaa = serialized.find("\"0x0aaa\"").unwrap();
        assert!(bbb < aaa);
    }
}
