mod client;
mod error;
mod transport;
