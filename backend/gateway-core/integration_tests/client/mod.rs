mod events;
pub mod helpers;
mod keepalive;
mod lifecycle;
mod requests;
