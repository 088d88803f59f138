//! 供应商凭据解析缓存
//!
//! 进程内缓存解析后的凭据与模式，带显式 TTL；管理端修改供应商配置
//! 后必须调用 `invalidate()`。陈旧缓存把错误模式的凭据发出去是资损
//! 级故障，不是性能问题。
//!
//! 模式与凭据前缀错配（live 模式配 test 密钥，或反过来）按未配置
//! 处理，绝不带错模式继续工作。

use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, warn};

use super::client::ProviderError;

const CACHE_KEY: &str = "provider";

/// test/live 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Test,
    Live,
}

/// 解析完成、校验通过的供应商配置
#[derive(Debug, Clone)]
pub struct ResolvedProviderConfig {
    pub api_base: String,
    pub secret_key: String,
    pub mode: ProviderMode,
    pub timeout: Duration,
}

/// 带 TTL 的凭据解析器
#[derive(Clone)]
pub struct ProviderConfigResolver {
    cache: Cache<&'static str, ResolvedProviderConfig>,
}

impl ProviderConfigResolver {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_live(ttl).max_capacity(1).build();
        Self { cache }
    }

    /// 取解析后的配置，命中缓存则不重新校验
    pub async fn resolve(&self) -> Result<ResolvedProviderConfig, ProviderError> {
        if let Some(cached) = self.cache.get(CACHE_KEY).await {
            return Ok(cached);
        }

        let resolved = resolve_from_config()?;
        self.cache.insert(CACHE_KEY, resolved.clone()).await;
        debug!(
            "Provider credentials resolved (mode: {:?}, base: {})",
            resolved.mode, resolved.api_base
        );
        Ok(resolved)
    }

    /// 配置变更后的显式失效钩子
    pub async fn invalidate(&self) {
        self.cache.invalidate(CACHE_KEY).await;
        debug!("Provider credential cache invalidated");
    }
}

/// 从静态配置解析并校验凭据
///
/// 模式与密钥前缀不一致时 fail closed。
fn resolve_from_config() -> Result<ResolvedProviderConfig, ProviderError> {
    let config = crate::config::get_config();
    let provider = &config.provider;

    if provider.secret_key.is_empty() {
        return Err(ProviderError::Unconfigured(
            "no provider secret key configured".to_string(),
        ));
    }

    let mode = match provider.mode.as_str() {
        "test" => ProviderMode::Test,
        "live" => ProviderMode::Live,
        other => {
            return Err(ProviderError::Unconfigured(format!(
                "unknown provider mode '{}'",
                other
            )));
        }
    };

    let key_matches_mode = match mode {
        ProviderMode::Test => provider.secret_key.starts_with("sk_test_"),
        ProviderMode::Live => provider.secret_key.starts_with("sk_live_"),
    };
    if !key_matches_mode {
        warn!(
            "Provider mode is '{}' but the secret key prefix disagrees, refusing to operate",
            provider.mode
        );
        return Err(ProviderError::Unconfigured(format!(
            "secret key does not match configured mode '{}'",
            provider.mode
        )));
    }

    Ok(ResolvedProviderConfig {
        api_base: provider.api_base.trim_end_matches('/').to_string(),
        secret_key: provider.secret_key.clone(),
        mode,
        timeout: Duration::from_secs(provider.timeout_secs),
    })
}
