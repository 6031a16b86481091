//! XDR编码器（RFC 4506子集）
//!
//! Stellar交易封包使用XDR线格式：大端整数、4字节对齐的不透明数据、
//! u32判别值的联合体。这里只实现写入方向，解码不在SDK职责内。

/// 追加写入的XDR字节缓冲
#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// 布尔/可选项存在标志
    pub fn write_bool(&mut self, v: bool) {
        self.write_u32(u32::from(v));
    }

    /// 固定长度不透明数据（调用方保证长度为4的倍数或自行约定）
    pub fn write_opaque_fixed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        self.pad();
    }

    /// 变长不透明数据：u32长度 + 数据 + 0填充到4字节边界
    pub fn write_opaque_var(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.buf.extend_from_slice(data);
        self.pad();
    }

    /// XDR string与变长opaque编码相同
    pub fn write_string(&mut self, s: &str) {
        self.write_opaque_var(s.as_bytes());
    }

    fn pad(&mut self) {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
