//! Typed key-value storage over volatile and durable backends.
//!
//! - [`storage`] - The [`Storage`](storage::Storage) contract, the in-process
//!   [`VolatileStore`](storage::VolatileStore) and the networked
//!   [`DurableStore`](storage::DurableStore)
//! - [`codec`] - Value serialization for the durable backend
//! - [`remote`] - Client side of the external key-value service
//! - [`server`] - Reference key-value service served by `stowage serve`
//! - [`config`] - TOML configuration and store construction

pub mod codec;
pub mod config;
pub mod constants;
pub mod remote;
pub mod server;
pub mod storage;
