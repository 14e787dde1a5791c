//! Maps `sqlx::Error` to [`ZephyrError`], same split the teacher draws in
//! `implementations/postgres/dbutils.rs`: unique-violation becomes a
//! taxonomy error the caller already expected (handled at the call site,
//! not here); everything else becomes `BackendUnavailable` so driver
//! internals never leak past the storage contract boundary.

use crate::service::ZephyrError;

pub(crate) trait DbErrorHandler {
    fn into_zephyr_error(self, context: &str) -> ZephyrError;

    /// `true` for Postgres error codes that indicate the transaction
    /// lost a race (serialization failure, deadlock) and is safe to retry.
    fn is_concurrent_modification(&self) -> bool;
}

impl DbErrorHandler for sqlx::Error {
    fn into_zephyr_error(self, context: &str) -> ZephyrError {
        if self.is_concurrent_modification() {
            return ZephyrError::wrap_backend(
                format!("{context}: lost a race against a concurrent writer, retry: {self}"),
                self,
            );
        }
        ZephyrError::wrap_backend(format!("{context}: {self}"), self)
    }

    fn is_concurrent_modification(&self) -> bool {
        match self {
            Self::Database(db) => matches!(
                db.code().as_deref(),
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                Some("40001" | "40P01" | "40000")
            ),
            _ => false,
        }
    }
}
