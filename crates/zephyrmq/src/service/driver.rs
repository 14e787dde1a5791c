//! `spec.md` §9: re-expresses the four dynamic-base-class controllers of
//! the original as capability interfaces plus a `Driver` grouping. A
//! concrete backend (Postgres, in-memory) implements these traits directly
//! on its own marker type; callers depend on the trait objects, never on
//! the concrete backend.

use super::{catalogue::CatalogueOps, claim::ClaimOps, message::MessageOps, partition::PartitionOps, queue::QueueOps};

/// A storage driver capable of serving queues, messages, and claims —
/// the "primary" backend a deployment talks to directly.
pub trait Driver: QueueOps + MessageOps + ClaimOps {}

impl<T: QueueOps + MessageOps + ClaimOps + ?Sized> Driver for T {}

/// A proxy driver capable of routing requests via the catalogue/partition
/// layer (`spec.md` §4.4-§4.5), mirroring the original's `DriverBase`
/// grouping `partitions_controller`/`catalogue_controller`.
pub trait ProxyDriver: CatalogueOps + PartitionOps {}

impl<T: CatalogueOps + PartitionOps + ?Sized> ProxyDriver for T {}
