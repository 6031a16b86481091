pub mod network_provider;
pub mod transaction_builder;
pub mod wallet_manager;

pub use network_provider::ChiaNetworkProvider;
pub use transaction_builder::ChiaTransactionBuilder;
pub use wallet_manager::ChiaWalletManager;
