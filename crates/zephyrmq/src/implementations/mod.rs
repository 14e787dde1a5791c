//! Concrete backends for the storage contracts in [`crate::service`].

#[cfg(feature = "sqlx-postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlx-postgres")))]
pub mod postgres;

#[cfg(any(test, feature = "memory-store"))]
#[cfg_attr(docsrs, doc(cfg(feature = "memory-store")))]
pub mod memory;
