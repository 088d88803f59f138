//! 静态配置结构定义
//!
//! 启动时从 TOML 文件 + 环境变量加载，进程内只读。
//! 优先级：ENV > config.toml > 默认值。

use serde::{Deserialize, Serialize};

/// 应用静态配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
    #[serde(default)]
    pub commission: CommissionConfig,
    #[serde(default)]
    pub payout: PayoutConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// ENV 前缀：MONETA，分隔符：__
    /// 示例：MONETA__SERVER__PORT=9999
    pub fn load() -> Self {
        use config::{Config, Environment, File};

        let path = "config.toml";

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 MONETA，分隔符 __
            .add_source(
                Environment::with_prefix("MONETA")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// 归因配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionConfig {
    /// 归因窗口（天），首次点击在窗口内胜出
    #[serde(default = "default_attribution_window_days")]
    pub window_days: i64,
    /// IP 哈希加盐，部署时必须覆盖默认值
    #[serde(default = "default_ip_hash_salt")]
    pub ip_hash_salt: String,
}

/// 返佣配置
///
/// 佣金比例/固定额来自联盟成员行，这里只管审批节奏。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionConfig {
    /// 审批窗口（天），覆盖订单自身的退款窗口
    #[serde(default = "default_approval_window_days")]
    pub approval_window_days: i64,
}

/// 批量支付配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// 最低起付金额（最小货币单位）
    #[serde(default = "default_minimum_payout")]
    pub minimum_amount: i64,
    #[serde(default = "default_payout_currency")]
    pub currency: String,
}

/// 支付供应商配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_api_base")]
    pub api_base: String,
    /// test 或 live
    #[serde(default = "default_provider_mode")]
    pub mode: String,
    #[serde(default)]
    pub secret_key: String,
    /// 供应商调用超时（秒）
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
    /// 解析后凭据缓存 TTL（秒）
    #[serde(default = "default_provider_cache_ttl")]
    pub cache_ttl_secs: u64,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "moneta.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_attribution_window_days() -> i64 {
    30
}

fn default_ip_hash_salt() -> String {
    "moneta-dev-salt".to_string()
}

fn default_approval_window_days() -> i64 {
    30
}

fn default_minimum_payout() -> i64 {
    1000
}

fn default_payout_currency() -> String {
    "USD".to_string()
}

fn default_provider_api_base() -> String {
    "https://api.payments.example".to_string()
}

fn default_provider_mode() -> String {
    "test".to_string()
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_provider_cache_ttl() -> u64 {
    300
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            window_days: default_attribution_window_days(),
            ip_hash_salt: default_ip_hash_salt(),
        }
    }
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            approval_window_days: default_approval_window_days(),
        }
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            minimum_amount: default_minimum_payout(),
            currency: default_payout_currency(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_provider_api_base(),
            mode: default_provider_mode(),
            secret_key: String::new(),
            timeout_secs: default_provider_timeout(),
            cache_ttl_secs: default_provider_cache_ttl(),
        }
    }
}
