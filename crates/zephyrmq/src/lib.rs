#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::pedantic
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::large_enum_variant,
    clippy::missing_errors_doc
)]
#![forbid(unsafe_code)]

pub mod config;
pub mod implementations;
pub mod service;
pub mod utils;

#[cfg(feature = "router")]
#[cfg_attr(docsrs, doc(cfg(feature = "router")))]
pub mod api;

#[cfg(feature = "router")]
#[cfg_attr(docsrs, doc(cfg(feature = "router")))]
pub mod request_tracing;

#[cfg(test)]
mod tests;

pub use config::CONFIG;
pub use service::{
    CatalogueEntry, CatalogueOps, ClaimId, ClaimMeta, ClaimOps, ClientUuid, Clock,
    CreateClaimRequest, Driver, ErrorModel, FrozenClock, ListCatalogueQuery, ListMessagesQuery,
    ListQueuesQuery, Marker, Message, MessageOps, MessageSpec, Metadata, MsgId, Page, Partition,
    PartitionOps, ProjectId, ProxyDriver, QueueName, QueueOps, QueueRecord, QueueStats, Result,
    SharedClock, SystemClock, ZephyrError, DEFAULT_LIMIT,
};

pub use async_trait;
pub use axum;
#[cfg(feature = "sqlx-postgres")]
pub use sqlx;
pub use tokio;
#[cfg(feature = "router")]
#[cfg_attr(docsrs, doc(cfg(feature = "router")))]
pub use tower;
#[cfg(feature = "router")]
#[cfg_attr(docsrs, doc(cfg(feature = "router")))]
pub use tower_http;
pub use tracing;
