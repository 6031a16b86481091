pub mod amount_converter;
pub mod base32;
pub mod clvm;
pub mod msgpack;
pub mod xdr;
