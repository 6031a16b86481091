//! Sui可编程交易构建（BCS编码）
//!
//! 账户模型但gas是独立的coin对象：builder保留update时拉到的gas coin
//! 与token coin对象集合。签名摘要 = blake2b-256(intent [0,0,0] ‖ BCS字节)，
//! 提交签名 = base64(0x00 ‖ ed25519签名 ‖ 公钥)。

use base64::Engine;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::Serialize;

use crate::domain::amount::AmountType;
use crate::domain::transaction::Transaction;
use crate::error::WalletError;
use crate::utils::amount_converter::amount_to_units;

pub const SUI_DECIMALS: u32 = 9;
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// gas预算（MIST），按交易类型取固定值
pub const COIN_TRANSFER_GAS_BUDGET: u64 = 3_000_000;
pub const TOKEN_TRANSFER_GAS_BUDGET: u64 = 10_000_000;

type Blake2b256 = Blake2b<U32>;

/// coin对象，身份由(object_id, version, digest)决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiCoinObject {
    pub object_id: [u8; 32],
    pub version: u64,
    /// 对象摘要（32字节，JSON里是base58）
    pub digest: Vec<u8>,
    pub balance: u64,
    pub coin_type: String,
}

/// 构建产物：BCS字节与签名摘要
#[derive(Debug, Clone)]
pub struct SuiPreparedTransaction {
    pub tx_bytes: Vec<u8>,
    pub digest: [u8; 32],
}

/// 提交载荷：base64交易字节与base64序列化签名
#[derive(Debug, Clone)]
pub struct SuiSignedTransaction {
    pub tx_bytes_b64: String,
    pub signature_b64: String,
}

// ---- Sui交易的BCS模型，变体顺序与字段顺序是线格式的一部分 ----

#[derive(Serialize)]
enum TransactionData {
    V1(TransactionDataV1),
}

#[derive(Serialize)]
struct TransactionDataV1 {
    kind: TransactionKind,
    sender: [u8; 32],
    gas_data: GasData,
    expiration: TransactionExpiration,
}

#[derive(Serialize)]
enum TransactionKind {
    ProgrammableTransaction(ProgrammableTransaction),
}

#[derive(Serialize)]
struct ProgrammableTransaction {
    inputs: Vec<CallArg>,
    commands: Vec<Command>,
}

#[derive(Serialize)]
enum CallArg {
    Pure(Vec<u8>),
    Object(ObjectArg),
}

#[derive(Serialize)]
enum ObjectArg {
    ImmOrOwnedObject(ObjectRef),
}

#[derive(Serialize)]
struct ObjectRef {
    object_id: [u8; 32],
    version: u64,
    digest: Vec<u8>,
}

#[derive(Serialize)]
#[allow(dead_code)]
enum Command {
    // 变体0占位，保持与协议一致的变体编号
    MoveCall(()),
    TransferObjects(Vec<Argument>, Argument),
    SplitCoins(Argument, Vec<Argument>),
    MergeCoins(Argument, Vec<Argument>),
}

#[derive(Serialize)]
#[allow(dead_code)]
enum Argument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

#[derive(Serialize)]
struct GasData {
    payment: Vec<ObjectRef>,
    owner: [u8; 32],
    price: u64,
    budget: u64,
}

#[derive(Serialize)]
#[allow(dead_code)]
enum TransactionExpiration {
    None,
    Epoch(u64),
}

pub struct SuiTransactionBuilder {
    public_key: [u8; 32],
    address: [u8; 32],
    gas_coins: Vec<SuiCoinObject>,
    token_coins: Vec<SuiCoinObject>,
}

impl SuiTransactionBuilder {
    pub fn new(public_key: &[u8]) -> Result<Self, WalletError> {
        let public_key: [u8; 32] = public_key
            .try_into()
            .map_err(|_| WalletError::InvalidPublicKey("expected 32 bytes".into()))?;
        Ok(Self {
            public_key,
            address: derive_address(&public_key),
            gas_coins: Vec::new(),
            token_coins: Vec::new(),
        })
    }

    /// 本钱包地址（0x前缀hex）
    pub fn address(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }

    /// 替换coin对象集合，按类型分拣
    pub fn set_coins(&mut self, coins: Vec<SuiCoinObject>) {
        let (gas, tokens): (Vec<_>, Vec<_>) = coins
            .into_iter()
            .partition(|c| c.coin_type == SUI_COIN_TYPE);
        self.gas_coins = gas;
        self.token_coins = tokens;
    }

    pub fn gas_balance(&self) -> u64 {
        self.gas_coins.iter().map(|c| c.balance).sum()
    }

    pub fn token_balance(&self, coin_type: &str) -> u64 {
        self.token_coins
            .iter()
            .filter(|c| c.coin_type == coin_type)
            .map(|c| c.balance)
            .sum()
    }

    /// gas coin总额是否覆盖预算（碎片化的gas对象会在这里暴露）
    pub fn has_sufficient_gas_balance(&self, budget: u64) -> bool {
        self.gas_balance() >= budget
    }

    pub fn build_for_sign(
        &self,
        transaction: &Transaction,
        gas_price: u64,
    ) -> Result<SuiPreparedTransaction, WalletError> {
        let amount = amount_to_units(transaction.amount.value, transaction.amount.decimals)?;
        let recipient = parse_address(&transaction.destination_address)?;

        let data = match &transaction.amount.amount_type {
            AmountType::Coin => self.coin_transfer(amount, recipient, gas_price)?,
            AmountType::Token(token) => {
                self.token_transfer(&token.contract_address, amount, recipient, gas_price)?
            }
            _ => return Err(WalletError::UnsupportedAmountType),
        };

        let tx_bytes = bcs::to_bytes(&data).map_err(|e| {
            WalletError::FailedToBuildTransaction(format!("bcs encoding failed: {e}"))
        })?;
        let mut hasher = Blake2b256::new();
        // intent: TransactionData / V0 / Sui
        hasher.update([0u8, 0, 0]);
        hasher.update(&tx_bytes);
        let digest: [u8; 32] = hasher.finalize().into();
        Ok(SuiPreparedTransaction { tx_bytes, digest })
    }

    /// 原生币转账：从gas coin拆出金额，gas对象同时支付转账额与预算
    fn coin_transfer(
        &self,
        amount: u64,
        recipient: [u8; 32],
        gas_price: u64,
    ) -> Result<TransactionData, WalletError> {
        let budget = COIN_TRANSFER_GAS_BUDGET;
        let required = amount.checked_add(budget).ok_or_else(|| {
            WalletError::FailedToBuildTransaction("amount + budget overflows".into())
        })?;
        if self.gas_balance() < required {
            return Err(WalletError::InsufficientGasBalance {
                required,
                available: self.gas_balance(),
            });
        }

        let amount_bytes = bcs::to_bytes(&amount).map_err(|e| {
            WalletError::FailedToBuildTransaction(format!("bcs encoding failed: {e}"))
        })?;
        let inputs = vec![
            CallArg::Pure(amount_bytes),
            CallArg::Pure(recipient.to_vec()),
        ];
        let commands = vec![
            Command::SplitCoins(Argument::GasCoin, vec![Argument::Input(0)]),
            Command::TransferObjects(vec![Argument::Result(0)], Argument::Input(1)),
        ];
        Ok(self.assemble(inputs, commands, &self.gas_coins, gas_price, budget))
    }

    /// 代币转账：合并token coin对象后拆分，gas对象只付预算
    fn token_transfer(
        &self,
        coin_type: &str,
        amount: u64,
        recipient: [u8; 32],
        gas_price: u64,
    ) -> Result<TransactionData, WalletError> {
        let budget = TOKEN_TRANSFER_GAS_BUDGET;
        let token_coins: Vec<&SuiCoinObject> = self
            .token_coins
            .iter()
            .filter(|c| c.coin_type == coin_type)
            .collect();
        let token_balance: u64 = token_coins.iter().map(|c| c.balance).sum();
        if token_balance < amount {
            return Err(WalletError::InsufficientFunds {
                available: crate::utils::amount_converter::units_to_amount(
                    token_balance,
                    SUI_DECIMALS,
                ),
                requested: crate::utils::amount_converter::units_to_amount(
                    amount,
                    SUI_DECIMALS,
                ),
            });
        }
        // 碎片化的gas对象凑不够预算是gas余额问题，不是资金问题
        if !self.has_sufficient_gas_balance(budget) {
            return Err(WalletError::InsufficientGasBalance {
                required: budget,
                available: self.gas_balance(),
            });
        }
        if token_coins.is_empty() {
            return Err(WalletError::FailedToBuildTransaction(format!(
                "no coin objects for type {coin_type}"
            )));
        }

        let amount_bytes = bcs::to_bytes(&amount).map_err(|e| {
            WalletError::FailedToBuildTransaction(format!("bcs encoding failed: {e}"))
        })?;
        let mut inputs: Vec<CallArg> = token_coins
            .iter()
            .map(|c| CallArg::Object(ObjectArg::ImmOrOwnedObject(object_ref(c))))
            .collect();
        let amount_input = inputs.len() as u16;
        inputs.push(CallArg::Pure(amount_bytes));
        let recipient_input = inputs.len() as u16;
        inputs.push(CallArg::Pure(recipient.to_vec()));

        let mut commands = Vec::new();
        if token_coins.len() > 1 {
            commands.push(Command::MergeCoins(
                Argument::Input(0),
                (1..token_coins.len() as u16).map(Argument::Input).collect(),
            ));
        }
        let split_command = commands.len() as u16;
        commands.push(Command::SplitCoins(
            Argument::Input(0),
            vec![Argument::Input(amount_input)],
        ));
        commands.push(Command::TransferObjects(
            vec![Argument::Result(split_command)],
            Argument::Input(recipient_input),
        ));
        Ok(self.assemble(inputs, commands, &self.gas_coins, gas_price, budget))
    }

    fn assemble(
        &self,
        inputs: Vec<CallArg>,
        commands: Vec<Command>,
        payment: &[SuiCoinObject],
        gas_price: u64,
        budget: u64,
    ) -> TransactionData {
        TransactionData::V1(TransactionDataV1 {
            kind: TransactionKind::ProgrammableTransaction(ProgrammableTransaction {
                inputs,
                commands,
            }),
            sender: self.address,
            gas_data: GasData {
                payment: payment.iter().map(object_ref).collect(),
                owner: self.address,
                price: gas_price,
                budget,
            },
            expiration: TransactionExpiration::None,
        })
    }

    /// 序列化签名：scheme标志(ed25519=0x00) ‖ 签名 ‖ 公钥
    pub fn build_for_send(
        &self,
        prepared: &SuiPreparedTransaction,
        signature: &[u8],
    ) -> Result<SuiSignedTransaction, WalletError> {
        if signature.len() != 64 {
            return Err(WalletError::FailedToBuildTransaction(format!(
                "ed25519 signature length {} != 64",
                signature.len()
            )));
        }
        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(0x00);
        serialized.extend_from_slice(signature);
        serialized.extend_from_slice(&self.public_key);
        let engine = base64::engine::general_purpose::STANDARD;
        Ok(SuiSignedTransaction {
            tx_bytes_b64: engine.encode(&prepared.tx_bytes),
            signature_b64: engine.encode(serialized),
        })
    }
}

/// Sui地址 = blake2b-256(scheme标志 ‖ 公钥)
fn derive_address(public_key: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update([0x00]);
    hasher.update(public_key);
    hasher.finalize().into()
}

fn parse_address(address: &str) -> Result<[u8; 32], WalletError> {
    hex::decode(address.trim_start_matches("0x"))
        .ok()
        .and_then(|v| v.try_into().ok())
        .ok_or_else(|| WalletError::InvalidAddress(format!("bad sui address {address}")))
}

fn object_ref(coin: &SuiCoinObject) -> ObjectRef {
    ObjectRef {
        object_id: coin.object_id,
        version: coin.version,
        digest: coin.digest.clone(),
    }
}
