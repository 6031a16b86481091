pub mod failover;
pub mod http;
pub mod logging;
