//! Stellar交易构建：XDR封包与签名摘要
//!
//! 序列号链：builder保存账户当前序列号（每次update刷新），构建时用
//! sequence + 1。签名摘要 = sha256(network id ‖ ENVELOPE_TYPE_TX ‖ 交易XDR)。

use sha2::{Digest, Sha256};

use crate::domain::amount::AmountType;
use crate::domain::transaction::{StellarMemo, Transaction, TransactionParams};
use crate::error::WalletError;
use crate::utils::amount_converter::{amount_to_units, fee_to_units};
use crate::utils::base32::stellar_decode_account;
use crate::utils::xdr::XdrWriter;

const MAINNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// XDR联合体判别值
const ENVELOPE_TYPE_TX: u32 = 2;
const MEMO_NONE: u32 = 0;
const MEMO_TEXT: u32 = 1;
const MEMO_ID: u32 = 2;
const OP_CREATE_ACCOUNT: u32 = 0;
const OP_PAYMENT: u32 = 1;
const ASSET_TYPE_NATIVE: u32 = 0;
const ASSET_TYPE_ALPHANUM4: u32 = 1;
const ASSET_TYPE_ALPHANUM12: u32 = 2;

/// 交易有效窗口：now ± 60秒
const TIME_BOUNDS_HALF_WINDOW: i64 = 60;

pub const STELLAR_DECIMALS: u32 = 7;

/// 构建产物：交易XDR与签名摘要，build_for_send复用同一份XDR
#[derive(Debug, Clone)]
pub struct StellarPreparedTransaction {
    pub transaction_xdr: Vec<u8>,
    pub digest: [u8; 32],
}

pub struct StellarTransactionBuilder {
    public_key: [u8; 32],
    sequence: Option<i64>,
    network_id: [u8; 32],
}

impl StellarTransactionBuilder {
    pub fn new(public_key: &[u8], testnet: bool) -> Result<Self, WalletError> {
        let public_key: [u8; 32] = public_key
            .try_into()
            .map_err(|_| WalletError::InvalidPublicKey("expected 32 bytes".into()))?;
        let passphrase = if testnet {
            TESTNET_PASSPHRASE
        } else {
            MAINNET_PASSPHRASE
        };
        Ok(Self {
            public_key,
            sequence: None,
            network_id: Sha256::digest(passphrase.as_bytes()).into(),
        })
    }

    /// update()成功后写入账户当前序列号
    pub fn set_sequence(&mut self, sequence: i64) {
        self.sequence = Some(sequence);
    }

    pub fn sequence(&self) -> Option<i64> {
        self.sequence
    }

    /// 构建未签名交易与签名摘要
    ///
    /// destination_exists决定操作类型：已存在走PaymentOp，不存在且转
    /// 原生币走CreateAccountOp；代币转给未创建账户直接失败。
    pub fn build_for_sign(
        &self,
        transaction: &Transaction,
        destination_exists: bool,
        now: i64,
    ) -> Result<StellarPreparedTransaction, WalletError> {
        let sequence = self.sequence.ok_or(WalletError::SequenceNotLoaded)?;
        let destination = stellar_decode_account(&transaction.destination_address)?;
        let amount_stroops = i64::try_from(amount_to_units(
            transaction.amount.value,
            STELLAR_DECIMALS,
        )?)
        .map_err(|_| {
            WalletError::FailedToBuildTransaction(format!(
                "amount {} exceeds stellar range",
                transaction.amount.value
            ))
        })?;
        // 封包的fee字段是u32，超出范围必须显式失败而不是回绕少付
        let fee_stroops = u32::try_from(fee_to_units(
            transaction.fee.amount.value,
            STELLAR_DECIMALS,
        )?)
        .map_err(|_| {
            WalletError::FailedToBuildTransaction(format!(
                "fee {} exceeds stellar fee range",
                transaction.fee.amount.value
            ))
        })?;

        let mut w = XdrWriter::new();

        // 1. 源账户（MuxedAccount, KEY_TYPE_ED25519）
        w.write_u32(0);
        w.write_opaque_fixed(&self.public_key);

        // 2. 手续费与序列号（当前序列号+1）
        w.write_u32(fee_stroops);
        w.write_i64(sequence + 1);

        // 3. 时间窗
        w.write_bool(true);
        w.write_u64((now - TIME_BOUNDS_HALF_WINDOW) as u64);
        w.write_u64((now + TIME_BOUNDS_HALF_WINDOW) as u64);

        // 4. 备注
        match &transaction.params {
            Some(TransactionParams::StellarMemo(StellarMemo::Text(text))) => {
                if text.len() > 28 {
                    return Err(WalletError::FailedToBuildTransaction(
                        "memo text exceeds 28 bytes".into(),
                    ));
                }
                w.write_u32(MEMO_TEXT);
                w.write_string(text);
            }
            Some(TransactionParams::StellarMemo(StellarMemo::Id(id))) => {
                w.write_u32(MEMO_ID);
                w.write_u64(*id);
            }
            Some(_) => {
                return Err(WalletError::FailedToBuildTransaction(
                    "unexpected transaction params for stellar".into(),
                ))
            }
            None => w.write_u32(MEMO_NONE),
        }

        // 5. 操作列表（单操作，无独立操作源账户）
        w.write_u32(1);
        w.write_bool(false);
        match &transaction.amount.amount_type {
            AmountType::Coin if destination_exists => {
                w.write_u32(OP_PAYMENT);
                w.write_u32(0);
                w.write_opaque_fixed(&destination);
                w.write_u32(ASSET_TYPE_NATIVE);
                w.write_i64(amount_stroops);
            }
            AmountType::Coin => {
                w.write_u32(OP_CREATE_ACCOUNT);
                w.write_u32(0);
                w.write_opaque_fixed(&destination);
                w.write_i64(amount_stroops);
            }
            AmountType::Token(token) if destination_exists => {
                w.write_u32(OP_PAYMENT);
                w.write_u32(0);
                w.write_opaque_fixed(&destination);
                Self::write_asset(&mut w, &token.contract_address)?;
                w.write_i64(amount_stroops);
            }
            AmountType::Token(_) => {
                return Err(WalletError::FailedToBuildTransaction(
                    "token payment to a non-created account".into(),
                ))
            }
            _ => return Err(WalletError::UnsupportedAmountType),
        }

        // 6. 扩展字段
        w.write_u32(0);

        let transaction_xdr = w.into_bytes();
        let digest = self.digest(&transaction_xdr);
        Ok(StellarPreparedTransaction {
            transaction_xdr,
            digest,
        })
    }

    /// 组装已签名封包，返回base64（Horizon提交格式）
    pub fn build_for_send(
        &self,
        prepared: &StellarPreparedTransaction,
        signature: &[u8],
    ) -> Result<String, WalletError> {
        if signature.len() != 64 {
            return Err(WalletError::FailedToBuildTransaction(format!(
                "ed25519 signature length {} != 64",
                signature.len()
            )));
        }
        let mut w = XdrWriter::new();
        w.write_opaque_fixed(&prepared.transaction_xdr);
        // DecoratedSignature数组：hint为公钥后4字节
        w.write_u32(1);
        w.write_opaque_fixed(&self.public_key[28..]);
        w.write_opaque_var(signature);

        use base64::Engine;
        Ok(base64::engine::general_purpose::STANDARD.encode(w.into_bytes()))
    }

    /// 交易哈希（十六进制摘要），广播后用作pending记录的hash
    pub fn transaction_hash(prepared: &StellarPreparedTransaction) -> String {
        hex::encode(prepared.digest)
    }

    fn digest(&self, transaction_xdr: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.network_id);
        hasher.update(ENVELOPE_TYPE_TX.to_be_bytes());
        hasher.update(transaction_xdr);
        hasher.finalize().into()
    }

    /// 资产标识"CODE:ISSUER"编码为alphanum4/12
    fn write_asset(w: &mut XdrWriter, contract: &str) -> Result<(), WalletError> {
        let (code, issuer) = contract.split_once(':').ok_or_else(|| {
            WalletError::FailedToBuildTransaction(format!(
                "stellar asset identifier must be CODE:ISSUER, got {contract}"
            ))
        })?;
        let issuer_key = stellar_decode_account(issuer)?;
        match code.len() {
            1..=4 => {
                w.write_u32(ASSET_TYPE_ALPHANUM4);
                let mut padded = [0u8; 4];
                padded[..code.len()].copy_from_slice(code.as_bytes());
                w.write_opaque_fixed(&padded);
            }
            5..=12 => {
                w.write_u32(ASSET_TYPE_ALPHANUM12);
                let mut padded = [0u8; 12];
                padded[..code.len()].copy_from_slice(code.as_bytes());
                w.write_opaque_fixed(&padded);
            }
            _ => {
                return Err(WalletError::FailedToBuildTransaction(format!(
                    "asset code length {} out of range",
                    code.len()
                )))
            }
        }
        w.write_u32(0);
        w.write_opaque_fixed(&issuer_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::amount::Amount;
    use crate::domain::transaction::Fee;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const SOURCE: &str = "GAIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCF6M";
    const DESTINATION: &str = "GARCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCFRVX";

    // 封包里的序列号是账户当前值+1：golden字节编码103_720_918_407_102_568
    fn builder_with_sequence() -> StellarTransactionBuilder {
        let mut builder = StellarTransactionBuilder::new(&[0x11u8; 32], false).unwrap();
        builder.set_sequence(103_720_918_407_102_567);
        builder
    }

    fn payment_tx(amount: &str, fee: &str) -> Transaction {
        Transaction {
            amount: Amount::coin("XLM", Decimal::from_str(amount).unwrap(), 7),
            fee: Fee::new(Amount::coin("XLM", Decimal::from_str(fee).unwrap(), 7)),
            source_address: SOURCE.into(),
            destination_address: DESTINATION.into(),
            contract_address: None,
            params: None,
        }
    }

    /// 固定支付的XDR与摘要对照主网线格式
    #[test]
    fn test_payment_golden_bytes() {
        let builder = builder_with_sequence();
        let tx = payment_tx("10.5", "0.00001");
        let prepared = builder.build_for_sign(&tx, true, 1_690_000_060).unwrap();

        assert_eq!(
            hex::encode(&prepared.transaction_xdr),
            "0000000011111111111111111111111111111111111111111111111111111111111111110000006401707da0316ec068000000010000000064bb5a800000000064bb5af800000000000000010000000000000001000000002222222222222222222222222222222222222222222222222222222222222222000000000000000006422c4000000000"
        );
        assert_eq!(
            hex::encode(prepared.digest),
            "a7db65b2bfcb04fa82fae8b5329981808c72eb283d8e73333b9ca39ad5e72cbf"
        );
    }

    /// 编码的序列号必须是set_sequence写入值+1
    #[test]
    fn test_sequence_incremented_in_wire_format() {
        let mut builder = StellarTransactionBuilder::new(&[0x11u8; 32], false).unwrap();
        builder.set_sequence(0x0100);
        let prepared = builder
            .build_for_sign(&payment_tx("1", "0.00001"), true, 1_690_000_060)
            .unwrap();
        // 序列号字段：源账户(36) + fee(4)之后的8字节大端
        assert_eq!(&prepared.transaction_xdr[40..48], &0x0101u64.to_be_bytes());
    }

    /// 签名封包base64与Horizon提交格式一致
    #[test]
    fn test_envelope_golden_base64() {
        let builder = builder_with_sequence();
        let tx = payment_tx("10.5", "0.00001");
        let prepared = builder.build_for_sign(&tx, true, 1_690_000_060).unwrap();
        let envelope = builder.build_for_send(&prepared, &[0x77u8; 64]).unwrap();
        assert_eq!(
            envelope,
            "AAAAABERERERERERERERERERERERERERERERERERERERERERAAAAZAFwfaAxbsBoAAAAAQAAAABku1qAAAAAAGS7WvgAAAAAAAAAAQAAAAAAAAABAAAAACIiIiIiIiIiIiIiIiIiIiIiIiIiIiIiIiIiIiIiIiIiAAAAAAAAAAAGQixAAAAAAAAAAAERERERAAAAQHd3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3d3c="
        );
    }

    /// 未创建的目标账户 + 原生币 → CreateAccountOp
    #[test]
    fn test_create_account_selected_for_missing_destination() {
        let builder = builder_with_sequence();
        let tx = payment_tx("2", "0.00001");
        let prepared = builder.build_for_sign(&tx, false, 1_690_000_060).unwrap();
        // 操作类型字段在固定偏移：ops之后的body判别值
        let payment = builder.build_for_sign(&tx, true, 1_690_000_060).unwrap();
        assert_ne!(prepared.transaction_xdr, payment.transaction_xdr);
        // CreateAccountOp判别值为0：两份XDR只在op body处分叉
        let hex_create = hex::encode(&prepared.transaction_xdr);
        assert!(hex_create.contains("0000000000000000222222"));
    }

    /// 代币转给未创建账户必须失败
    #[test]
    fn test_token_to_missing_destination_fails() {
        use crate::domain::amount::Token;
        let builder = builder_with_sequence();
        let mut tx = payment_tx("1", "0.00001");
        tx.amount = Amount::token(
            Token {
                symbol: "USDC".into(),
                contract_address: format!("USDC:{SOURCE}"),
                decimals: 7,
            },
            Decimal::ONE,
        );
        let result = builder.build_for_sign(&tx, false, 1_690_000_060);
        assert!(matches!(
            result,
            Err(WalletError::FailedToBuildTransaction(_))
        ));
    }

    /// 超出u32范围的手续费必须报错而不是回绕编码
    #[test]
    fn test_oversized_fee_rejected() {
        let builder = builder_with_sequence();
        // 430 XLM = 4_300_000_000 stroops > u32::MAX
        let tx = payment_tx("1", "430");
        assert!(matches!(
            builder.build_for_sign(&tx, true, 1_690_000_060),
            Err(WalletError::FailedToBuildTransaction(_))
        ));
    }

    /// 序列号未加载时拒绝构建
    #[test]
    fn test_missing_sequence_fails() {
        let builder = StellarTransactionBuilder::new(&[0x11u8; 32], false).unwrap();
        let tx = payment_tx("1", "0.00001");
        assert!(matches!(
            builder.build_for_sign(&tx, true, 1_690_000_060),
            Err(WalletError::SequenceNotLoaded)
        ));
    }

    /// 不支持的金额类型报构建错误而不是产出空载荷
    #[test]
    fn test_unsupported_amount_type() {
        let builder = builder_with_sequence();
        let mut tx = payment_tx("1", "0.00001");
        tx.amount = Amount::reserve("XLM", Decimal::ONE, 7);
        assert!(matches!(
            builder.build_for_sign(&tx, true, 1_690_000_060),
            Err(WalletError::UnsupportedAmountType)
        ));
    }
}
