mod challenge;
mod config;
mod connect;
mod correlator;
mod endpoint;
mod fanout;
mod frames;
mod identity;
mod keepalive;
mod logger;
mod sequence;
