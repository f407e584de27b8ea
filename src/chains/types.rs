use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of a transaction as reported by the chain or explorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
    Unknown,
}

/// Transaction as returned by a provider, value still in raw units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value_raw: String,
    pub timestamp: u64,
    pub status: TransactionStatus,
}

/// Fungible token holding as returned by a provider, amount still in raw units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTokenBalance {
    /// ERC-20 contract address or SPL mint
    pub contract: String,
    pub name: String,
    pub symbol: String,
    pub amount_raw: String,
    pub decimals: u32,
}

/// Native balance of a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub address: String,
    pub balance: String,
    pub symbol: String,
    pub network: String,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    /// Unix timestamp in seconds
    pub timestamp: u64,
    pub status: TransactionStatus,
}

/// Most recent transactions first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionList {
    pub address: String,
    pub transactions: Vec<Transaction>,
    pub network: String,
    pub cached: bool,
}

/// ERC-20 / SPL token balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    /// EVM contract address or Solana mint
    pub contract_address: String,
    pub name: String,
    pub symbol: String,
    pub balance: String,
    pub decimals: u32,
    pub network: String,
}

/// NFT item; `contract_address` is set on EVM, `mint` on Solana
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    pub name: String,
    pub symbol: String,
    pub network: String,
}

impl NftItem {
    pub fn evm(
        contract_address: String,
        token_id: Option<String>,
        name: String,
        symbol: String,
        network: &str,
    ) -> Self {
        Self {
            contract_address: Some(contract_address),
            mint: None,
            token_id,
            name,
            symbol,
            network: network.to_string(),
        }
    }

    pub fn solana(mint: String, name: String, symbol: String, network: &str) -> Self {
        Self {
            contract_address: None,
            mint: Some(mint),
            token_id: None,
            name,
            symbol,
            network: network.to_string(),
        }
    }
}

/// Upstream APIs disagree on whether numbers are JSON numbers or strings
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
        Null,
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) if s.trim().is_empty() => Ok(0),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        NumberOrString::Null => Ok(0),
    }
}

/// Like [`lenient_u64`] but keeps "absent" distinct from zero
pub(crate) fn lenient_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
        Null,
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(Some(n)),
        NumberOrString::String(s) if s.trim().is_empty() => Ok(None),
        NumberOrString::String(s) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
        NumberOrString::Null => Ok(None),
    }
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "lenient_u64", default)]
        value: u64,
        #[serde(deserialize_with = "lenient_string", default)]
        name: String,
    }

    #[test]
    fn test_lenient_number_parsing() {
        let a: Sample = serde_json::from_str(r#"{"value": 18, "name": "x"}"#).unwrap();
        let b: Sample = serde_json::from_str(r#"{"value": "9", "name": null}"#).unwrap();
        let c: Sample = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!((a.value, a.name.as_str()), (18, "x"));
        assert_eq!((b.value, b.name.as_str()), (9, ""));
        assert_eq!((c.value, c.name.as_str()), (0, ""));
    }

    #[test]
    fn test_nft_item_serializes_one_locator() {
        let evm = NftItem::evm(
            "0xabc".into(),
            Some("7".into()),
            "Punk".into(),
            "PNK".into(),
            "ethereum",
        );
        let json = serde_json::to_value(&evm).unwrap();
        assert_eq!(json["contractAddress"], "0xabc");
        assert_eq!(json["tokenId"], "7");
        assert!(json.get("mint").is_none());

        let sol = NftItem::solana("Mint111".into(), "Mad Lad".into(), "MAD".into(), "solana");
        let json = serde_json::to_value(&sol).unwrap();
        assert_eq!(json["mint"], "Mint111");
        assert!(json.get("contractAddress").is_none());
    }
}
