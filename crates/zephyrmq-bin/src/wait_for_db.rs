use anyhow::anyhow;
use zephyrmq::{
    implementations::postgres::{connect_pool, migrate},
    CONFIG,
};

/// Polls the database until a connection succeeds (and, optionally, until
/// every migration has been applied), retrying up to `retries` times with a
/// fixed `backoff` between attempts.
pub(crate) async fn wait_for_db(
    check_migrations: bool,
    retries: u32,
    backoff: u64,
    check_db: bool,
) -> Result<(), anyhow::Error> {
    if !check_db {
        return Ok(());
    }

    let mut attempt = 0u32;
    loop {
        match connect_pool(
            &CONFIG.database_url,
            1,
            std::time::Duration::from_secs(5),
        )
        .await
        {
            Ok(pool) => {
                if check_migrations {
                    let pending = migrate(&pool).await;
                    if let Err(e) = pending {
                        if attempt >= retries {
                            return Err(anyhow!(e).context("migrations did not apply cleanly"));
                        }
                        tracing::warn!("migration check failed, retrying: {e}");
                    } else {
                        tracing::info!("database is reachable and migrated");
                        return Ok(());
                    }
                } else {
                    tracing::info!("database is reachable");
                    return Ok(());
                }
            }
            Err(e) => {
                if attempt >= retries {
                    return Err(anyhow!(e).context("database did not become reachable"));
                }
                tracing::warn!("database not yet reachable, retrying: {e}");
            }
        }

        attempt += 1;
        tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
    }
}
