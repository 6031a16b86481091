pub mod network_provider;
pub mod transaction_builder;
pub mod wallet_manager;

pub use network_provider::AlgorandNetworkProvider;
pub use transaction_builder::AlgorandTransactionBuilder;
pub use wallet_manager::AlgorandWalletManager;
