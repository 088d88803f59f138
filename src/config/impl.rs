use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Read the process-wide configuration.
///
/// Hands back an `Arc` snapshot; callers keep it for the duration of one
/// operation, so a concurrent [`reload_config`] never changes values
/// mid-request.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Load configuration once at startup.
///
/// Reads `config.toml` from the working directory, then applies
/// `MONETA__`-prefixed environment overrides; missing file means pure
/// defaults. Subsequent calls are no-ops.
///
/// # Examples
/// ```no_run
/// use moneta::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load()));
}

/// Re-read configuration in place (SIGHUP handler).
///
/// In-flight operations keep the snapshot they already loaded.
pub fn reload_config() {
    if let Some(slot) = CONFIG.get() {
        slot.store(Arc::new(StaticConfig::load()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_swaps_without_breaking_readers() {
        // 初始化前 reload 是空操作
        reload_config();

        init_config();
        let before = get_config();
        reload_config();
        let after = get_config();

        // 同一份 config.toml / 默认值，重载后读到一致的内容
        assert_eq!(before.payout.minimum_amount, after.payout.minimum_amount);
        assert_eq!(before.server.port, after.server.port);
    }
}
