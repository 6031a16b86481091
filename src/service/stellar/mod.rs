pub mod network_provider;
pub mod transaction_builder;
pub mod wallet_manager;

pub use network_provider::StellarNetworkProvider;
pub use transaction_builder::StellarTransactionBuilder;
pub use wallet_manager::StellarWalletManager;
