//! CLVM程序的序列化与树哈希（Chia）
//!
//! Chia的puzzle/solution是CLVM（ChiaLisp虚拟机）程序。SDK只需要
//! 三种能力：把条件列表编码为solution、解析固定的puzzle reveal模板、
//! 计算程序树哈希以派生puzzle hash与签名消息。

use sha2::{Digest, Sha256};

use crate::error::WalletError;

/// CLVM节点：原子或序对
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClvmProgram {
    Atom(Vec<u8>),
    Pair(Box<ClvmProgram>, Box<ClvmProgram>),
}

impl ClvmProgram {
    pub fn nil() -> Self {
        Self::Atom(Vec::new())
    }

    /// 非负整数的最小有符号大端编码
    /// 最高位为1时需前置0x00保持符号为正
    pub fn int_bytes(value: u64) -> Vec<u8> {
        if value == 0 {
            return Vec::new();
        }
        let mut bytes = value.to_be_bytes().to_vec();
        while bytes.len() > 1 && bytes[0] == 0 {
            bytes.remove(0);
        }
        if bytes[0] & 0x80 != 0 {
            bytes.insert(0, 0);
        }
        bytes
    }

    pub fn from_int(value: u64) -> Self {
        Self::Atom(Self::int_bytes(value))
    }

    /// 从元素列表构造proper list：(a . (b . (c . nil)))
    pub fn from_list(items: Vec<ClvmProgram>) -> Self {
        let mut node = Self::nil();
        for item in items.into_iter().rev() {
            node = Self::Pair(Box::new(item), Box::new(node));
        }
        node
    }

    /// 线格式序列化
    /// 原子：nil=0x80；单字节<=0x7f原样；<=0x3f字节前缀0x80|len；
    /// <=0x1fff字节前缀0xc0|hi,lo。序对：0xff + left + right。
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize_into(&mut out);
        out
    }

    fn serialize_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Atom(bytes) => {
                if bytes.is_empty() {
                    out.push(0x80);
                } else if bytes.len() == 1 && bytes[0] <= 0x7f {
                    out.push(bytes[0]);
                } else if bytes.len() <= 0x3f {
                    out.push(0x80 | bytes.len() as u8);
                    out.extend_from_slice(bytes);
                } else {
                    debug_assert!(bytes.len() <= 0x1fff);
                    out.push(0xc0 | (bytes.len() >> 8) as u8);
                    out.push(bytes.len() as u8);
                    out.extend_from_slice(bytes);
                }
            }
            Self::Pair(left, right) => {
                out.push(0xff);
                left.serialize_into(out);
                right.serialize_into(out);
            }
        }
    }

    /// 解析线格式（puzzle reveal模板使用，长度超过0x1fff的原子不支持）
    pub fn deserialize(bytes: &[u8]) -> Result<Self, WalletError> {
        let (node, consumed) = Self::parse_at(bytes, 0)?;
        if consumed != bytes.len() {
            return Err(WalletError::FailedToBuildTransaction(
                "trailing bytes in clvm program".into(),
            ));
        }
        Ok(node)
    }

    fn parse_at(bytes: &[u8], pos: usize) -> Result<(Self, usize), WalletError> {
        let truncated =
            || WalletError::FailedToBuildTransaction("truncated clvm program".into());
        let first = *bytes.get(pos).ok_or_else(truncated)?;
        match first {
            0xff => {
                let (left, pos) = Self::parse_at(bytes, pos + 1)?;
                let (right, pos) = Self::parse_at(bytes, pos)?;
                Ok((Self::Pair(Box::new(left), Box::new(right)), pos))
            }
            0x80 => Ok((Self::nil(), pos + 1)),
            b if b <= 0x7f => Ok((Self::Atom(vec![b]), pos + 1)),
            b if b <= 0xbf => {
                let len = (b & 0x3f) as usize;
                let end = pos + 1 + len;
                let data = bytes.get(pos + 1..end).ok_or_else(truncated)?;
                Ok((Self::Atom(data.to_vec()), end))
            }
            b if b <= 0xdf => {
                let len = (((b & 0x1f) as usize) << 8) | *bytes.get(pos + 1).ok_or_else(truncated)? as usize;
                let end = pos + 2 + len;
                let data = bytes.get(pos + 2..end).ok_or_else(truncated)?;
                Ok((Self::Atom(data.to_vec()), end))
            }
            b => Err(WalletError::FailedToBuildTransaction(format!(
                "unsupported clvm atom prefix {b:#x}"
            ))),
        }
    }

    /// 标准树哈希：atom -> sha256(0x01 || atom)，pair -> sha256(0x02 || h(l) || h(r))
    pub fn tree_hash(&self) -> [u8; 32] {
        match self {
            Self::Atom(bytes) => {
                let mut hasher = Sha256::new();
                hasher.update([0x01]);
                hasher.update(bytes);
                hasher.finalize().into()
            }
            Self::Pair(left, right) => {
                let mut hasher = Sha256::new();
                hasher.update([0x02]);
                hasher.update(left.tree_hash());
                hasher.update(right.tree_hash());
                hasher.finalize().into()
            }
        }
    }
}
