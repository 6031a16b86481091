pub mod network_provider;
pub mod transaction_builder;
pub mod wallet_manager;

pub use network_provider::SuiNetworkProvider;
pub use transaction_builder::SuiTransactionBuilder;
pub use wallet_manager::SuiWalletManager;
