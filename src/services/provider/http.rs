//! HTTP 供应商实现
//!
//! 同步 ureq 请求放在 spawn_blocking 中执行，Agent 进程级复用，
//! 全局超时有界。超时映射为 `ProviderError::Timeout`（结果未知），
//! 与供应商拒绝严格区分。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde_json::json;
use tracing::warn;
use ureq::Agent;

use super::client::{
    CreateRefundParams, CreateTransferParams, PaymentProvider, ProviderError, ProviderRefund,
    ProviderTransfer,
};
use super::config_cache::{ProviderConfigResolver, ResolvedProviderConfig};

/// 全局 HTTP Agent 连同构建它时的超时
///
/// Agent 内部是 Arc，克隆共享同一个连接池。超时来自可重载的
/// 供应商配置，配置变更后用新超时重建 Agent 而不是沿用首次值。
struct AgentEntry {
    timeout: Duration,
    agent: Agent,
}

static HTTP_AGENT: OnceLock<ArcSwap<AgentEntry>> = OnceLock::new();

fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

fn agent_for(timeout: Duration) -> Agent {
    let slot = HTTP_AGENT.get_or_init(|| {
        ArcSwap::from_pointee(AgentEntry {
            timeout,
            agent: build_agent(timeout),
        })
    });

    let current = slot.load();
    if current.timeout == timeout {
        return current.agent.clone();
    }

    let rebuilt = build_agent(timeout);
    slot.store(Arc::new(AgentEntry {
        timeout,
        agent: rebuilt.clone(),
    }));
    rebuilt
}

/// 对接真实供应商 API 的实现
pub struct HttpPaymentProvider {
    resolver: ProviderConfigResolver,
}

impl HttpPaymentProvider {
    pub fn new(resolver: ProviderConfigResolver) -> Self {
        Self { resolver }
    }

    /// 同步 POST（在 spawn_blocking 中调用）
    fn post_sync(
        config: &ResolvedProviderConfig,
        path: &str,
        idempotency_key: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}{}", config.api_base, path);
        let agent = agent_for(config.timeout);

        let resp = agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", config.secret_key))
            .header("Idempotency-Key", idempotency_key)
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::Timeout(reason) => ProviderError::Timeout(reason.to_string()),
                ureq::Error::StatusCode(status) => ProviderError::Rejected {
                    status,
                    message: format!("HTTP {} from {}", status, url),
                },
                ureq::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::TimedOut => {
                    ProviderError::Timeout(io_err.to_string())
                }
                other => ProviderError::Transport(other.to_string()),
            })?;

        resp.into_body()
            .read_json()
            .map_err(|e| ProviderError::Transport(format!("response parse failed: {}", e)))
    }

    async fn post(
        &self,
        path: &'static str,
        idempotency_key: String,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let config = self.resolver.resolve().await?;

        tokio::task::spawn_blocking(move || {
            Self::post_sync(&config, path, &idempotency_key, body)
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Provider spawn_blocking failed: {}", e);
            Err(ProviderError::Transport(e.to_string()))
        })
    }
}

/// 从供应商响应中取 `{id, status}`
fn parse_id_status(json: &serde_json::Value) -> Result<(String, String), ProviderError> {
    let id = json["id"]
        .as_str()
        .ok_or_else(|| ProviderError::Transport("provider response missing 'id'".to_string()))?;
    let status = json["status"].as_str().ok_or_else(|| {
        ProviderError::Transport("provider response missing 'status'".to_string())
    })?;
    Ok((id.to_string(), status.to_string()))
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn create_refund(
        &self,
        params: CreateRefundParams,
    ) -> Result<ProviderRefund, ProviderError> {
        let body = json!({
            "payment_reference": params.payment_ref,
            "amount": params.amount,
            "reason": params.reason_code.map(|r| r.as_ref().to_string()),
        });

        let json = self.post("/v1/refunds", params.idempotency_key, body).await?;
        let (id, status) = parse_id_status(&json)?;
        Ok(ProviderRefund { id, status })
    }

    async fn create_transfer(
        &self,
        params: CreateTransferParams,
    ) -> Result<ProviderTransfer, ProviderError> {
        let body = json!({
            "amount": params.amount,
            "currency": params.currency,
            "destination": params.destination_account,
            "metadata": params.metadata,
        });

        let json = self
            .post("/v1/transfers", params.idempotency_key, body)
            .await?;
        let (id, status) = parse_id_status(&json)?;
        Ok(ProviderTransfer { id, status })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_rebuilt_when_timeout_changes() {
        let _ = agent_for(Duration::from_secs(5));
        assert_eq!(
            HTTP_AGENT.get().unwrap().load().timeout,
            Duration::from_secs(5)
        );

        // 配置重载带来新超时：Agent 必须重建，不能沿用首次值
        let _ = agent_for(Duration::from_secs(9));
        assert_eq!(
            HTTP_AGENT.get().unwrap().load().timeout,
            Duration::from_secs(9)
        );

        // 同超时复用同一个 entry
        let _ = agent_for(Duration::from_secs(9));
        assert_eq!(
            HTTP_AGENT.get().unwrap().load().timeout,
            Duration::from_secs(9)
        );
    }
}
