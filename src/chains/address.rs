use alloy::primitives::Address;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use super::network::ChainFamily;
use crate::errors::WalletError;

/// Returns true if the given string is a valid EVM address (0x + 40 hex).
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn is_valid_evm_address(address: &str) -> bool {
    let Some(hex_part) = address.strip_prefix("0x") else {
        return false;
    };
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(address, None).is_ok()
    } else {
        Address::from_str(address).is_ok()
    }
}

/// Returns true if the given string is a base58 encoded 32-byte Solana public key
pub fn is_valid_solana_address(address: &str) -> bool {
    address.parse::<Pubkey>().is_ok()
}

/// Returns true for a TON address in raw (`0:<64 hex>`) or user-friendly
/// (48 chars base64/base64url with CRC16 checksum) form
pub fn is_valid_ton_address(address: &str) -> bool {
    if let Some((workchain, hash)) = address.split_once(':') {
        return workchain.parse::<i32>().is_ok()
            && hash.len() == 64
            && hash.chars().all(|c| c.is_ascii_hexdigit());
    }

    if address.len() != 48 {
        return false;
    }

    let decoded = URL_SAFE
        .decode(address)
        .or_else(|_| STANDARD.decode(address));
    match decoded {
        Ok(bytes) if bytes.len() == 36 => {
            let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
            crc16_xmodem(&bytes[..34]) == expected
        }
        _ => false,
    }
}

/// Validate `address` for a chain family and return its canonical form.
///
/// Surrounding whitespace is dropped. EVM addresses are rewritten to their
/// EIP-55 checksum form so every casing of one account maps to the same key;
/// Solana and TON addresses are case-sensitive and kept as given.
pub fn normalize_address(family: ChainFamily, address: &str) -> Result<String, WalletError> {
    let address = address.trim();
    let valid = match family {
        ChainFamily::Evm => is_valid_evm_address(address),
        ChainFamily::Solana => is_valid_solana_address(address),
        ChainFamily::Ton => is_valid_ton_address(address),
    };

    if !valid {
        return Err(WalletError::InvalidAddress(format!(
            "'{}' is not a valid {} address",
            address, family
        )));
    }

    match family {
        ChainFamily::Evm => Address::from_str(address)
            .map(|parsed| parsed.to_checksum(None))
            .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e))),
        ChainFamily::Solana | ChainFamily::Ton => Ok(address.to_string()),
    }
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVM_CHECKSUMMED: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
    const SOLANA_ADDRESS: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const TON_FRIENDLY: &str = "EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N";

    #[test]
    fn test_evm_addresses() {
        assert!(is_valid_evm_address(EVM_CHECKSUMMED));
        assert!(is_valid_evm_address(&EVM_CHECKSUMMED.to_lowercase()));
        // Broken checksum: one letter flipped to lower case
        assert!(!is_valid_evm_address("0xd8da6BF26964aF9D7eEd9e03E53415D37aA96045"));
        assert!(!is_valid_evm_address("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045"));
        assert!(!is_valid_evm_address("0x1234"));
        assert!(!is_valid_evm_address("0xzz8dA6BF26964aF9D7eEd9e03E53415D37aA9604"));
    }

    #[test]
    fn test_solana_addresses() {
        assert!(is_valid_solana_address(SOLANA_ADDRESS));
        assert!(is_valid_solana_address("So11111111111111111111111111111111111111112"));
        assert!(!is_valid_solana_address(EVM_CHECKSUMMED));
        assert!(!is_valid_solana_address("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl"));
        assert!(!is_valid_solana_address("abc"));
    }

    #[test]
    fn test_ton_addresses() {
        assert!(is_valid_ton_address(TON_FRIENDLY));
        assert!(is_valid_ton_address(
            "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8"
        ));
        // Last character changed, checksum no longer matches
        assert!(!is_valid_ton_address(
            "EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2O"
        ));
        assert!(!is_valid_ton_address("0:1234"));
        assert!(!is_valid_ton_address(SOLANA_ADDRESS));
    }

    #[test]
    fn test_crc16_reference_vector() {
        assert_eq!(crc16_xmodem(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_normalize_rejects_other_families() {
        assert!(matches!(
            normalize_address(ChainFamily::Evm, SOLANA_ADDRESS),
            Err(WalletError::InvalidAddress(_))
        ));
        assert!(matches!(
            normalize_address(ChainFamily::Ton, EVM_CHECKSUMMED),
            Err(WalletError::InvalidAddress(_))
        ));
        assert!(matches!(
            normalize_address(ChainFamily::Solana, "  "),
            Err(WalletError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_normalize_canonicalizes_evm_casing_and_whitespace() {
        let lower = EVM_CHECKSUMMED.to_lowercase();
        let padded = format!("  {} ", EVM_CHECKSUMMED);
        for input in [EVM_CHECKSUMMED, lower.as_str(), padded.as_str()] {
            assert_eq!(normalize_address(ChainFamily::Evm, input).unwrap(), EVM_CHECKSUMMED);
        }
        assert_eq!(
            normalize_address(ChainFamily::Evm, &EVM_CHECKSUMMED.to_uppercase().replacen("0X", "0x", 1))
                .unwrap(),
            EVM_CHECKSUMMED
        );
    }

    #[test]
    fn test_normalize_keeps_case_sensitive_families() {
        assert_eq!(
            normalize_address(ChainFamily::Solana, &format!("{}\n", SOLANA_ADDRESS)).unwrap(),
            SOLANA_ADDRESS
        );
        assert_eq!(
            normalize_address(ChainFamily::Ton, &format!(" {}", TON_FRIENDLY)).unwrap(),
            TON_FRIENDLY
        );
    }
}
