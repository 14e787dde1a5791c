use anyhow::anyhow;
use zephyrmq::{implementations::postgres::connect_pool, CONFIG};

/// Exits non-zero (via the returned `Err`) if a requested check fails, so
/// this doubles as a container `HEALTHCHECK` command.
pub(crate) async fn health(check_db: bool, check_server: bool) -> Result<(), anyhow::Error> {
    if check_db {
        connect_pool(
            &CONFIG.database_url,
            1,
            std::time::Duration::from_secs(5),
        )
        .await
        .map_err(|e| anyhow!(e).context("database health check failed"))?;
        println!("database: ok");
    }

    if check_server {
        let bind_addr: std::net::SocketAddr = CONFIG
            .bind_address
            .parse()
            .map_err(|e| anyhow!("invalid bind_address {}: {e}", CONFIG.bind_address))?;
        tokio::net::TcpStream::connect(bind_addr)
            .await
            .map_err(|e| anyhow!(e).context("server health check failed"))?;
        println!("server: ok");
    }

    Ok(())
}
