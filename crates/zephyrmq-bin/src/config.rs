//! Bin-level debug knobs, layered the same way as the library's
//! [`zephyrmq::config`]: serialized defaults, then `ZEPHYRMQ__`/
//! `ZEPHYRMQ_TEST__`-prefixed environment variables merged on top.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

pub(crate) static CONFIG_BIN: LazyLock<DynBinConfig> = LazyLock::new(get_config);

#[derive(Clone, Deserialize, Serialize, Debug, Default)]
pub(crate) struct DynBinConfig {
    pub(crate) debug: DebugConfig,
}

#[derive(Clone, Deserialize, Serialize, Debug, Default)]
pub(crate) struct DebugConfig {
    /// Run migrations before serving requests. Convenient in development;
    /// not recommended when multiple instances start concurrently.
    pub(crate) migrate_before_serve: bool,
    /// Run the `serve` command when no subcommand is given.
    pub(crate) auto_serve: bool,
    /// Emit file/line fields on every log event.
    pub(crate) extended_logs: bool,
}

fn get_config() -> DynBinConfig {
    let defaults = figment::providers::Serialized::defaults(DynBinConfig::default());

    #[cfg(not(test))]
    let prefixes = &["ZEPHYRMQ__"];
    #[cfg(test)]
    let prefixes = &["ZEPHYRMQ_TEST__"];

    let mut config = figment::Figment::from(defaults);
    for prefix in prefixes {
        let env = figment::providers::Env::prefixed(prefix).split("__");
        config = config.merge(env);
    }

    match config.extract::<DynBinConfig>() {
        Ok(c) => c,
        Err(e) => panic!("failed to extract zephyrmq binary config: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_serve_env_var() {
        figment::Jail::expect_with(|_jail| {
            let config = get_config();
            assert!(!config.debug.auto_serve);
            Ok(())
        });

        figment::Jail::expect_with(|jail| {
            jail.set_env("ZEPHYRMQ_TEST__DEBUG__AUTO_SERVE", "true");
            let config = get_config();
            assert!(config.debug.auto_serve);
            Ok(())
        });
    }
}
