pub mod amount;
pub mod transaction;
pub mod wallet;
pub mod signer;
