//! Algorand交易构建：规范msgpack编码与签名摘要
//!
//! 轮次/TTL链：每次发送前拉取最新轮次，有效窗口[first, first+1000]。
//! 签名摘要 = b"TX" ‖ 规范msgpack(txn)，交易ID = base32(sha512/256(摘要))。

use sha2::{Digest, Sha512_256};

use crate::domain::amount::AmountType;
use crate::domain::transaction::{Transaction, TransactionParams};
use crate::error::WalletError;
use crate::utils::amount_converter::{amount_to_units, fee_to_units};
use crate::utils::base32::{algorand_decode_address, encode_nopad};
use crate::utils::msgpack::MsgpackWriter;

pub const ALGORAND_DECIMALS: u32 = 6;

/// 有效窗口长度（轮）
pub const ROUND_WINDOW: u64 = 1000;

/// 每次发送前从algod拉取的新鲜参数
#[derive(Debug, Clone)]
pub struct AlgorandBuildParams {
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    /// 当前轮，作为有效窗口起点
    pub first_round: u64,
    pub min_fee: u64,
}

/// 构建产物：txn的msgpack、签名摘要、交易ID
#[derive(Debug, Clone)]
pub struct AlgorandPreparedTransaction {
    pub txn_msgpack: Vec<u8>,
    pub digest: Vec<u8>,
    pub transaction_id: String,
}

pub struct AlgorandTransactionBuilder {
    public_key: [u8; 32],
}

impl AlgorandTransactionBuilder {
    /// 公钥必须能解压为有效的ed25519曲线点
    pub fn new(public_key: &[u8]) -> Result<Self, WalletError> {
        let public_key: [u8; 32] = public_key
            .try_into()
            .map_err(|_| WalletError::InvalidPublicKey("expected 32 bytes".into()))?;
        ed25519_dalek::VerifyingKey::from_bytes(&public_key)
            .map_err(|_| WalletError::InvalidPublicKey("not a valid ed25519 point".into()))?;
        Ok(Self { public_key })
    }

    /// 构建pay交易：字段按字典序、零值省略
    pub fn build_for_sign(
        &self,
        transaction: &Transaction,
        params: &AlgorandBuildParams,
    ) -> Result<AlgorandPreparedTransaction, WalletError> {
        if !matches!(transaction.amount.amount_type, AmountType::Coin) {
            return Err(WalletError::UnsupportedAmountType);
        }
        let receiver = algorand_decode_address(&transaction.destination_address)?;
        let amount = amount_to_units(transaction.amount.value, ALGORAND_DECIMALS)?;
        // 手续费向上取整后以协议最小费兜底
        let fee = fee_to_units(transaction.fee.amount.value, ALGORAND_DECIMALS)?.max(params.min_fee);
        let last_round = params.first_round + ROUND_WINDOW;
        let note = match &transaction.params {
            Some(TransactionParams::AlgorandNote(note)) => {
                if note.len() > 1000 {
                    return Err(WalletError::FailedToBuildTransaction(
                        "note exceeds 1000 bytes".into(),
                    ));
                }
                Some(note.as_slice())
            }
            Some(_) => {
                return Err(WalletError::FailedToBuildTransaction(
                    "unexpected transaction params for algorand".into(),
                ))
            }
            None => None,
        };

        // 非零字段计数（amt/fee可能为0并被省略）
        let mut field_count = 6; // fv, gh, lv, rcv, snd, type
        if amount > 0 {
            field_count += 1;
        }
        if fee > 0 {
            field_count += 1;
        }
        if !params.genesis_id.is_empty() {
            field_count += 1;
        }
        if note.is_some() {
            field_count += 1;
        }

        // 键按字典序：amt, fee, fv, gen, gh, lv, note, rcv, snd, type
        let mut w = MsgpackWriter::new();
        w.write_map_len(field_count);
        if amount > 0 {
            w.write_str("amt");
            w.write_uint(amount);
        }
        if fee > 0 {
            w.write_str("fee");
            w.write_uint(fee);
        }
        w.write_str("fv");
        w.write_uint(params.first_round);
        if !params.genesis_id.is_empty() {
            w.write_str("gen");
            w.write_str(&params.genesis_id);
        }
        w.write_str("gh");
        w.write_bin(&params.genesis_hash);
        w.write_str("lv");
        w.write_uint(last_round);
        if let Some(note) = note {
            w.write_str("note");
            w.write_bin(note);
        }
        w.write_str("rcv");
        w.write_bin(&receiver);
        w.write_str("snd");
        w.write_bin(&self.public_key);
        w.write_str("type");
        w.write_str("pay");

        let txn_msgpack = w.into_bytes();
        let mut digest = Vec::with_capacity(2 + txn_msgpack.len());
        digest.extend_from_slice(b"TX");
        digest.extend_from_slice(&txn_msgpack);
        let transaction_id = encode_nopad(&Sha512_256::digest(&digest));

        Ok(AlgorandPreparedTransaction {
            txn_msgpack,
            digest,
            transaction_id,
        })
    }

    /// 签名交易封包：{sig, txn}
    pub fn build_for_send(
        &self,
        prepared: &AlgorandPreparedTransaction,
        signature: &[u8],
    ) -> Result<Vec<u8>, WalletError> {
        if signature.len() != 64 {
            return Err(WalletError::FailedToBuildTransaction(format!(
                "ed25519 signature length {} != 64",
                signature.len()
            )));
        }
        let mut w = MsgpackWriter::new();
        w.write_map_len(2);
        w.write_str("sig");
        w.write_bin(signature);
        w.write_str("txn");
        w.write_raw(&prepared.txn_msgpack);
        Ok(w.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::amount::Amount;
    use crate::domain::transaction::Fee;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    // 0x44*32的Algorand地址
    const RECEIVER: &str = "IRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCNZMCIQI";

    fn builder() -> AlgorandTransactionBuilder {
        // 0x33*32是有效的ed25519曲线点
        AlgorandTransactionBuilder::new(&[0x33u8; 32]).unwrap()
    }

    fn build_params() -> AlgorandBuildParams {
        AlgorandBuildParams {
            genesis_id: "mainnet-v1.0".into(),
            genesis_hash: [0x55u8; 32],
            first_round: 41_000_000,
            min_fee: 1000,
        }
    }

    fn transfer(amount: &str, fee: &str) -> Transaction {
        Transaction {
            amount: Amount::coin("ALGO", Decimal::from_str(amount).unwrap(), 6),
            fee: Fee::new(Amount::coin("ALGO", Decimal::from_str(fee).unwrap(), 6)),
            source_address: "GMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZTGMZ6LH5CFA".into(),
            destination_address: RECEIVER.into(),
            contract_address: None,
            params: None,
        }
    }

    /// 固定转账的规范msgpack编码与交易ID
    #[test]
    fn test_pay_golden_bytes() {
        let prepared = builder()
            .build_for_sign(&transfer("1.5", "0.001"), &build_params())
            .unwrap();

        assert_eq!(
            hex::encode(&prepared.txn_msgpack),
            "89a3616d74ce0016e360a3666565cd03e8a26676ce02719c40a367656eac6d61696e6e65742d76312e30a26768c4205555555555555555555555555555555555555555555555555555555555555555a26c76ce0271a028a3726376c4204444444444444444444444444444444444444444444444444444444444444444a3736e64c4203333333333333333333333333333333333333333333333333333333333333333a474797065a3706179"
        );
        assert_eq!(&prepared.digest[..2], b"TX");
        assert_eq!(
            prepared.transaction_id,
            "XG7UAZAJL3OXOETK2XGVRFOLEZNMNH7RBUP36KPDBSGOKUIGDJYA"
        );
    }

    /// 签名封包：sig在前txn在后，txn与签名摘要中的编码逐字节一致
    #[test]
    fn test_signed_envelope_embeds_identical_txn() {
        let b = builder();
        let prepared = b
            .build_for_sign(&transfer("1.5", "0.001"), &build_params())
            .unwrap();
        let signed = b.build_for_send(&prepared, &[0x99u8; 64]).unwrap();

        // 82 a3 "sig" c4 40 <64字节> a3 "txn" <txn msgpack>
        assert_eq!(signed[0], 0x82);
        let txn_offset = 1 + 4 + 2 + 64 + 4;
        assert_eq!(&signed[txn_offset..], prepared.txn_msgpack.as_slice());
    }

    /// 手续费低于协议最小费时取最小费
    #[test]
    fn test_fee_floored_at_min_fee() {
        let prepared = builder()
            .build_for_sign(&transfer("1.5", "0.0001"), &build_params())
            .unwrap();
        // fee=100会被抬到1000：cd03e8
        assert!(hex::encode(&prepared.txn_msgpack).contains("a3666565cd03e8"));
    }

    /// 无效的ed25519公钥在构建器创建时即被拒绝
    #[test]
    fn test_invalid_public_key_rejected() {
        assert!(matches!(
            AlgorandTransactionBuilder::new(&[0x44u8; 32]),
            Err(WalletError::InvalidPublicKey(_))
        ));
    }

    /// 代币金额类型不支持
    #[test]
    fn test_unsupported_amount_type() {
        let mut tx = transfer("1", "0.001");
        tx.amount = Amount::reserve("ALGO", Decimal::ONE, 6);
        assert!(matches!(
            builder().build_for_sign(&tx, &build_params()),
            Err(WalletError::UnsupportedAmountType)
        ));
    }
}
