//! Chia spend bundle构建
//!
//! UTXO链：builder保留update时拉到的未花费coin集合（金额降序，
//! 最多15个，受批量签名上限约束），花费时一次用掉全部保留的coin。
//! 第一个coin spend携带真实的CREATE_COIN条件，其余coin用无操作的
//! REMARK solution占位。每个coin的签名消息 = 条件树哈希 ‖ coin id ‖
//! AGG_SIG_ME附加数据（创世挑战）。

use sha2::{Digest, Sha256};

use crate::domain::amount::AmountType;
use crate::domain::transaction::Transaction;
use crate::error::WalletError;
use crate::utils::amount_converter::{amount_to_units, fee_to_units, units_to_amount};
use crate::utils::clvm::ClvmProgram;

pub const CHIA_DECIMALS: u32 = 12;

/// 保留的最大输入数（下游批量签名上限）
pub const MAX_INPUT_COUNT: usize = 15;

/// CREATE_COIN条件码
const CONDITION_CREATE_COIN: u64 = 51;
/// REMARK条件码
const CONDITION_REMARK: u64 = 1;

/// AGG_SIG_ME附加数据：网络创世挑战
const MAINNET_GENESIS_CHALLENGE: &str =
    "ccd5bb71183532bff220ba46c268991a3ff07eb358e8255a65c30a2dce0e5fbb";
const TESTNET_GENESIS_CHALLENGE: &str =
    "ae83525ba8d1dd3f09b277de18ca3e43fc0af20d20c4b3e92ef2a48bd291ccb2";

/// 标准p2_delegated_puzzle_or_hidden_puzzle封装：前缀 + BLS公钥(96 hex) + 后缀
const PUZZLE_REVEAL_PREFIX: &str = "ff02ffff01ff02ffff01ff04ffff04ff04ffff04ff05ffff04ffff02ff06ffff04ff02ffff04ff0bff80808080ff80808080ff0b80ffff04ffff01ff32ff02ffff03ffff07ff0580ffff01ff0bffff0102ffff02ff06ffff04ff02ffff04ff09ff80808080ffff02ff06ffff04ff02ffff04ff0dff8080808080ffff01ff0bffff0101ff058080ff0180ff018080ffff04ffff01b0";
const PUZZLE_REVEAL_SUFFIX: &str = "ff018080";

/// CLVM cost估算：每个coin spend的程序执行与AGG_SIG_ME
pub const COST_PER_COIN_SPEND: u64 = 6_000_000;
/// 每个CREATE_COIN条件的协议cost
pub const COST_PER_CREATED_COIN: u64 = 1_800_000;

/// 未花费coin，身份由(parent, puzzle_hash, amount)决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChiaUnspentCoin {
    pub parent_coin_info: [u8; 32],
    pub puzzle_hash: [u8; 32],
    pub amount: u64,
}

impl ChiaUnspentCoin {
    /// coin id = sha256(parent ‖ puzzle_hash ‖ clvm最小整数编码(amount))
    pub fn coin_id(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.parent_coin_info);
        hasher.update(self.puzzle_hash);
        hasher.update(ClvmProgram::int_bytes(self.amount));
        hasher.finalize().into()
    }
}

#[derive(Debug, Clone)]
pub struct ChiaCoinSpend {
    pub coin: ChiaUnspentCoin,
    pub puzzle_reveal: Vec<u8>,
    pub solution: Vec<u8>,
}

/// 构建产物：coin spends与每个coin的签名消息（顺序一致）
#[derive(Debug, Clone)]
pub struct ChiaPreparedSpendBundle {
    pub spends: Vec<ChiaCoinSpend>,
    pub signing_messages: Vec<Vec<u8>>,
}

/// 签名后的spend bundle，provider序列化为push_tx请求
#[derive(Debug, Clone)]
pub struct ChiaSignedSpendBundle {
    pub spends: Vec<ChiaCoinSpend>,
    pub aggregated_signature: [u8; 96],
}

impl ChiaSignedSpendBundle {
    /// 本地合成的bundle标识，用作pending记录的hash
    pub fn local_id(&self) -> String {
        let mut hasher = Sha256::new();
        for spend in &self.spends {
            hasher.update(spend.coin.coin_id());
        }
        hasher.update(self.aggregated_signature);
        hex::encode(hasher.finalize())
    }
}

pub struct ChiaTransactionBuilder {
    puzzle_reveal: Vec<u8>,
    puzzle_hash: [u8; 32],
    genesis_challenge: [u8; 32],
    address_prefix: &'static str,
    coins: Vec<ChiaUnspentCoin>,
}

impl ChiaTransactionBuilder {
    /// 公钥必须是有效的BLS12-381 G1点（48字节压缩格式）
    pub fn new(public_key: &[u8], testnet: bool) -> Result<Self, WalletError> {
        blst::min_pk::PublicKey::key_validate(public_key)
            .map_err(|e| WalletError::InvalidPublicKey(format!("not a valid bls key: {e:?}")))?;
        let puzzle_reveal = Self::puzzle_reveal_for_key(public_key)?;
        let puzzle_hash = ClvmProgram::deserialize(&puzzle_reveal)?.tree_hash();
        let genesis = if testnet {
            TESTNET_GENESIS_CHALLENGE
        } else {
            MAINNET_GENESIS_CHALLENGE
        };
        let genesis_challenge: [u8; 32] = hex::decode(genesis)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| WalletError::InvalidPublicKey("bad genesis challenge".into()))?;
        Ok(Self {
            puzzle_reveal,
            puzzle_hash,
            genesis_challenge,
            address_prefix: if testnet { "txch" } else { "xch" },
            coins: Vec::new(),
        })
    }

    fn puzzle_reveal_for_key(public_key: &[u8]) -> Result<Vec<u8>, WalletError> {
        if public_key.len() != 48 {
            return Err(WalletError::InvalidPublicKey("expected 48 bytes".into()));
        }
        let reveal_hex = format!(
            "{PUZZLE_REVEAL_PREFIX}{}{PUZZLE_REVEAL_SUFFIX}",
            hex::encode(public_key)
        );
        hex::decode(reveal_hex)
            .map_err(|e| WalletError::InvalidPublicKey(format!("bad puzzle reveal: {e}")))
    }

    /// 本钱包的puzzle hash（找零地址）
    pub fn puzzle_hash(&self) -> [u8; 32] {
        self.puzzle_hash
    }

    /// 本钱包的bech32m地址
    pub fn address(&self) -> Result<String, WalletError> {
        address_from_puzzle_hash(&self.puzzle_hash, self.address_prefix)
    }

    /// 替换未花费coin集合：金额降序，最多保留15个
    pub fn set_unspent(&mut self, mut coins: Vec<ChiaUnspentCoin>) {
        coins.sort_by(|a, b| b.amount.cmp(&a.amount));
        coins.truncate(MAX_INPUT_COUNT);
        self.coins = coins;
    }

    /// 保留coin的总额（mojo）
    pub fn available_amount(&self) -> u64 {
        self.coins.iter().map(|c| c.amount).sum()
    }

    pub fn input_count(&self) -> usize {
        self.coins.len()
    }

    /// 交易CLVM cost估算：输入×每spend成本 + 输出×每CREATE_COIN成本
    pub fn transaction_cost(&self, with_change: bool) -> u64 {
        let outputs = if with_change { 2 } else { 1 };
        self.coins.len() as u64 * COST_PER_COIN_SPEND + outputs * COST_PER_CREATED_COIN
    }

    /// 构建spend bundle：花掉全部保留coin，不足额在任何网络调用前失败
    pub fn build_for_sign(
        &self,
        transaction: &Transaction,
    ) -> Result<ChiaPreparedSpendBundle, WalletError> {
        if !matches!(transaction.amount.amount_type, AmountType::Coin) {
            return Err(WalletError::UnsupportedAmountType);
        }
        if self.coins.is_empty() {
            return Err(WalletError::FailedToBuildTransaction(
                "no unspent coins loaded".into(),
            ));
        }
        let amount = amount_to_units(transaction.amount.value, CHIA_DECIMALS)?;
        let fee = fee_to_units(transaction.fee.amount.value, CHIA_DECIMALS)?;
        let total_input = self.available_amount();
        let requested = amount.checked_add(fee).ok_or_else(|| {
            WalletError::FailedToBuildTransaction("amount + fee overflows".into())
        })?;
        if requested > total_input {
            return Err(WalletError::InsufficientFunds {
                available: units_to_amount(total_input, CHIA_DECIMALS),
                requested: units_to_amount(requested, CHIA_DECIMALS),
            });
        }

        let destination_hash =
            puzzle_hash_from_address(&transaction.destination_address, self.address_prefix)?;
        let change = total_input - amount - fee;

        // 第一个coin承载真实条件，找零回到本钱包puzzle hash
        let mut conditions = vec![ClvmProgram::from_list(vec![
            ClvmProgram::from_int(CONDITION_CREATE_COIN),
            ClvmProgram::Atom(destination_hash.to_vec()),
            ClvmProgram::from_int(amount),
        ])];
        if change > 0 {
            conditions.push(ClvmProgram::from_list(vec![
                ClvmProgram::from_int(CONDITION_CREATE_COIN),
                ClvmProgram::Atom(self.puzzle_hash.to_vec()),
                ClvmProgram::from_int(change),
            ]));
        }
        let remark_conditions =
            vec![ClvmProgram::from_list(vec![ClvmProgram::from_int(
                CONDITION_REMARK,
            )])];

        let mut spends = Vec::with_capacity(self.coins.len());
        let mut signing_messages = Vec::with_capacity(self.coins.len());
        for (i, coin) in self.coins.iter().enumerate() {
            let coin_conditions = if i == 0 {
                conditions.clone()
            } else {
                remark_conditions.clone()
            };
            let conditions_program = ClvmProgram::from_list(coin_conditions);
            let solution =
                ClvmProgram::from_list(vec![conditions_program.clone()]).serialize();

            let mut message =
                Vec::with_capacity(32 + 32 + self.genesis_challenge.len());
            message.extend_from_slice(&conditions_program.tree_hash());
            message.extend_from_slice(&coin.coin_id());
            message.extend_from_slice(&self.genesis_challenge);
            signing_messages.push(message);

            spends.push(ChiaCoinSpend {
                coin: coin.clone(),
                puzzle_reveal: self.puzzle_reveal.clone(),
                solution,
            });
        }

        Ok(ChiaPreparedSpendBundle {
            spends,
            signing_messages,
        })
    }

    /// 聚合逐coin的BLS签名，组装最终spend bundle
    pub fn build_for_send(
        &self,
        prepared: ChiaPreparedSpendBundle,
        signatures: &[Vec<u8>],
    ) -> Result<ChiaSignedSpendBundle, WalletError> {
        if signatures.len() != prepared.spends.len() {
            return Err(WalletError::FailedToBuildTransaction(format!(
                "signature count {} != spend count {}",
                signatures.len(),
                prepared.spends.len()
            )));
        }
        let parsed: Vec<blst::min_pk::Signature> = signatures
            .iter()
            .map(|s| {
                blst::min_pk::Signature::from_bytes(s).map_err(|e| {
                    WalletError::FailedToBuildTransaction(format!("bad bls signature: {e:?}"))
                })
            })
            .collect::<Result<_, _>>()?;
        let refs: Vec<&blst::min_pk::Signature> = parsed.iter().collect();
        let aggregated = blst::min_pk::AggregateSignature::aggregate(&refs, true)
            .map_err(|e| {
                WalletError::FailedToBuildTransaction(format!("bls aggregation failed: {e:?}"))
            })?
            .to_signature()
            .to_bytes();

        Ok(ChiaSignedSpendBundle {
            spends: prepared.spends,
            aggregated_signature: aggregated,
        })
    }
}

/// bech32m地址 → puzzle hash，校验网络前缀
pub fn puzzle_hash_from_address(
    address: &str,
    expected_prefix: &str,
) -> Result<[u8; 32], WalletError> {
    use bech32::primitives::decode::CheckedHrpstring;
    let checked = CheckedHrpstring::new::<bech32::Bech32m>(address)
        .map_err(|e| WalletError::InvalidAddress(format!("bad bech32m: {e}")))?;
    if checked.hrp().as_str() != expected_prefix {
        return Err(WalletError::InvalidAddress(format!(
            "address prefix {} does not match network {expected_prefix}",
            checked.hrp()
        )));
    }
    let bytes: Vec<u8> = checked.byte_iter().collect();
    bytes
        .try_into()
        .map_err(|_| WalletError::InvalidAddress("puzzle hash must be 32 bytes".into()))
}

/// puzzle hash → bech32m地址
pub fn address_from_puzzle_hash(
    puzzle_hash: &[u8; 32],
    prefix: &str,
) -> Result<String, WalletError> {
    let hrp = bech32::Hrp::parse(prefix)
        .map_err(|e| WalletError::InvalidAddress(format!("bad prefix: {e}")))?;
    bech32::encode::<bech32::Bech32m>(hrp, puzzle_hash)
        .map_err(|e| WalletError::InvalidAddress(format!("bech32m encoding failed: {e}")))
}
