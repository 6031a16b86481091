//! RFC 4648 base32与基于它的地址格式
//!
//! Stellar strkey：版本字节 + 公钥 + CRC16-XModem（小端）。
//! Algorand地址：公钥 + sha512/256校验和后4字节，58字符无填充base32。

use sha2::{Digest, Sha512_256};

use crate::error::WalletError;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// strkey版本字节：ed25519公钥（'G'开头）
const STRKEY_VERSION_ACCOUNT: u8 = 6 << 3;

/// 无填充base32编码
pub fn encode_nopad(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &byte in data {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[(acc >> bits) as usize & 0x1f] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[(acc << (5 - bits)) as usize & 0x1f] as char);
    }
    out
}

/// 无填充base32解码，多余的尾部比特必须为0
pub fn decode_nopad(s: &str) -> Result<Vec<u8>, WalletError> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for c in s.bytes() {
        let v = match c {
            b'A'..=b'Z' => c - b'A',
            b'2'..=b'7' => c - b'2' + 26,
            _ => {
                return Err(WalletError::InvalidAddress(format!(
                    "invalid base32 character {:?}",
                    c as char
                )))
            }
        };
        acc = (acc << 5) | u32::from(v);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    if acc & ((1 << bits) - 1) != 0 {
        return Err(WalletError::InvalidAddress(
            "non-zero trailing base32 bits".into(),
        ));
    }
    Ok(out)
}

/// CRC16-XModem（多项式0x1021，初值0）
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Stellar账户地址编码（strkey，G开头56字符）
pub fn stellar_encode_account(public_key: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(35);
    payload.push(STRKEY_VERSION_ACCOUNT);
    payload.extend_from_slice(public_key);
    let crc = crc16_xmodem(&payload);
    payload.extend_from_slice(&crc.to_le_bytes());
    encode_nopad(&payload)
}

/// Stellar账户地址解码，校验版本字节与CRC
pub fn stellar_decode_account(address: &str) -> Result<[u8; 32], WalletError> {
    let raw = decode_nopad(address)?;
    if raw.len() != 35 {
        return Err(WalletError::InvalidAddress(format!(
            "stellar address length {} != 35",
            raw.len()
        )));
    }
    if raw[0] != STRKEY_VERSION_ACCOUNT {
        return Err(WalletError::InvalidAddress(format!(
            "unexpected strkey version byte {:#x}",
            raw[0]
        )));
    }
    let expected = crc16_xmodem(&raw[..33]).to_le_bytes();
    if raw[33..] != expected {
        return Err(WalletError::InvalidAddress("strkey checksum mismatch".into()));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&raw[1..33]);
    Ok(key)
}

/// Algorand地址编码（公钥 + 4字节sha512/256校验和，58字符）
pub fn algorand_encode_address(public_key: &[u8; 32]) -> String {
    let digest = Sha512_256::digest(public_key);
    let mut payload = Vec::with_capacity(36);
    payload.extend_from_slice(public_key);
    payload.extend_from_slice(&digest[28..32]);
    encode_nopad(&payload)
}

/// Algorand地址解码，校验sha512/256校验和
pub fn algorand_decode_address(address: &str) -> Result<[u8; 32], WalletError> {
    let raw = decode_nopad(address)?;
    if raw.len() != 36 {
        return Err(WalletError::InvalidAddress(format!(
            "algorand address length {} != 36",
            raw.len()
        )));
    }
    let digest = Sha512_256::digest(&raw[..32]);
    if raw[32..] != digest[28..32] {
        return Err(WalletError::InvalidAddress(
            "algorand address checksum mismatch".into(),
        ));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&raw[..32]);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stellar_strkey_round_trip() {
        let pk = [0x11u8; 32];
        let addr = stellar_encode_account(&pk);
        assert_eq!(addr, "GAIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCF6M");
        assert_eq!(stellar_decode_account(&addr).unwrap(), pk);

        let pk = [0x22u8; 32];
        let addr = stellar_encode_account(&pk);
        assert_eq!(addr, "GARCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCFRVX");
    }

    #[test]
    fn test_stellar_strkey_rejects_corruption() {
        let pk = [0x11u8; 32];
        let addr = stellar_encode_account(&pk);
        // 改动一个字符破坏CRC
        let mut corrupted: Vec<char> = addr.chars().collect();
        corrupted[10] = if corrupted[10] == 'A' { 'B' } else { 'A' };
        let corrupted: String = corrupted.into_iter().collect();
        assert!(stellar_decode_account(&corrupted).is_err());
    }

    #[test]
    fn test_algorand_address_round_trip() {
        let pk = [0x33u8; 32];
        let addr = algorand_encode_address(&pk);
        assert_eq!(addr, "GMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZ6LH5CFA");
        assert_eq!(algorand_decode_address(&addr).unwrap(), pk);

        let pk = [0x44u8; 32];
        let addr = algorand_encode_address(&pk);
        assert_eq!(addr, "IRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCNZMCIQI");
    }

    #[test]
    fn test_algorand_address_rejects_bad_checksum() {
        // 末尾校验和字符被篡改
        assert!(
            algorand_decode_address("GMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZ6LH5CAA")
                .is_err()
        );
    }

    #[test]
    fn test_nopad_no_trailing_garbage() {
        // 52字符编码32字节（txid格式）
        let encoded = encode_nopad(&[0xFFu8; 32]);
        assert_eq!(encoded.len(), 52);
        assert_eq!(decode_nopad(&encoded).unwrap(), vec![0xFFu8; 32]);
    }
}
