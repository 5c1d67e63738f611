pub mod config;
pub mod gateway;
pub mod identity;
pub mod logger;
pub mod transport;

pub use gateway::GatewayError;
pub use transport::TransportError;
