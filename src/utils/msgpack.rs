//! 规范msgpack编码器（Algorand canonical encoding）
//!
//! Algorand要求交易的msgpack编码是规范的：map键按字典序排列、
//! 零值字段省略、整数使用最短编码。通用msgpack库不保证字段顺序，
//! 因此这里实现一个只写不读的最小编码器，字段顺序由调用方控制。

/// 规范msgpack写入缓冲
#[derive(Debug, Default)]
pub struct MsgpackWriter {
    buf: Vec<u8>,
}

impl MsgpackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// map头：条目数必须与后续写入的键值对数量一致，键须已按字典序排列
    pub fn write_map_len(&mut self, len: usize) {
        debug_assert!(len < 16, "fixmap only");
        self.buf.push(0x80 | len as u8);
    }

    /// 短字符串（fixstr，<32字节，覆盖所有Algorand字段名）
    pub fn write_str(&mut self, s: &str) {
        debug_assert!(s.len() < 32, "fixstr only");
        self.buf.push(0xa0 | s.len() as u8);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// 二进制数据（bin8，<256字节，覆盖公钥/哈希/签名）
    pub fn write_bin(&mut self, data: &[u8]) {
        debug_assert!(data.len() < 256, "bin8 only");
        self.buf.push(0xc4);
        self.buf.push(data.len() as u8);
        self.buf.extend_from_slice(data);
    }

    /// 无符号整数最短编码
    pub fn write_uint(&mut self, v: u64) {
        if v < 0x80 {
            self.buf.push(v as u8);
        } else if v <= u64::from(u8::MAX) {
            self.buf.push(0xcc);
            self.buf.push(v as u8);
        } else if v <= u64::from(u16::MAX) {
            self.buf.push(0xcd);
            self.buf.extend_from_slice(&(v as u16).to_be_bytes());
        } else if v <= u64::from(u32::MAX) {
            self.buf.push(0xce);
            self.buf.extend_from_slice(&(v as u32).to_be_bytes());
        } else {
            self.buf.push(0xcf);
            self.buf.extend_from_slice(&v.to_be_bytes());
        }
    }

    /// 嵌入已编码的msgpack片段（用于signed tx内嵌txn map）
    pub fn write_raw(&mut self, raw: &[u8]) {
        self.buf.extend_from_slice(raw);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_shortest_encoding() {
        let cases: [(u64, &str); 5] = [
            (5, "05"),
            (200, "ccc8"),
            (1000, "cd03e8"),
            (1_500_000, "ce0016e360"),
            (41_000_000_000, "cf000000098bca5a00"),
        ];
        for (v, expected) in cases {
            let mut w = MsgpackWriter::new();
            w.write_uint(v);
            assert_eq!(hex::encode(w.as_bytes()), expected, "value {v}");
        }
    }

    #[test]
    fn test_map_str_bin() {
        let mut w = MsgpackWriter::new();
        w.write_map_len(1);
        w.write_str("gh");
        w.write_bin(&[0x55; 4]);
        assert_eq!(hex::encode(w.as_bytes()), "81a26768c40455555555");
    }
}
