//! Attribution tracker
//!
//! Records storefront clicks against affiliate codes and carries the
//! attribution window client-side as an opaque base64 JSON cookie.
//! The cookie is deliberately unsigned: it is trusted for nothing more
//! than "which affiliate gets credit for a completed purchase", and
//! hardening it is an explicit product decision, not ours to make here.
//! First click wins inside the window, never last click.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::MonetaError;
use crate::storage::backend::NewClick;
use crate::storage::models::AffiliateStatus;
use crate::storage::SeaOrmStorage;
use crate::utils;

/// Sub-code prefix for "referred" family codes: `reALICE` resolves to
/// the affiliate behind `ALICE` when no affiliate owns `reALICE` itself.
const REFERRED_PREFIX: &str = "re";

/// Typed click-tracking failure.
#[derive(Debug, Clone)]
pub struct TrackError {
    pub code: &'static str,
    pub status: u16,
    pub message: String,
}

impl TrackError {
    pub fn invalid_code(code: &str) -> Self {
        Self {
            code: "INVALID_CODE",
            status: 404,
            message: format!("unknown affiliate code '{}'", code),
        }
    }

    pub fn not_active(code: &str) -> Self {
        Self {
            code: "NOT_ACTIVE",
            status: 422,
            message: format!("affiliate behind code '{}' is not active", code),
        }
    }
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for TrackError {}

impl From<MonetaError> for TrackError {
    fn from(err: MonetaError) -> Self {
        Self {
            code: "INTERNAL",
            status: 500,
            message: err.format_simple(),
        }
    }
}

/// Request-side context for a click.
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub ip: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

/// Cookie payload: opaque base64 of this JSON. `expires_at` is epoch
/// milliseconds, matching what the storefront scripts already read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributionCookie {
    #[serde(rename = "affiliateId")]
    pub affiliate_id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl AttributionCookie {
    pub fn encode(&self) -> String {
        // 结构固定，序列化不会失败
        let json = serde_json::to_vec(self).unwrap_or_default();
        BASE64.encode(json)
    }

    /// Absence or decode failure is "no attribution", never an error.
    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = BASE64.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Result of a tracked click, including the cookie the caller should
/// set if no live attribution cookie is already present.
#[derive(Debug, Clone)]
pub struct TrackedClick {
    pub affiliate_id: String,
    pub session_id: String,
    pub cookie: AttributionCookie,
}

pub struct AttributionService {
    storage: Arc<SeaOrmStorage>,
}

impl AttributionService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// Record a click against an affiliate code.
    ///
    /// Click row and affiliate click counter commit in one transaction
    /// in the storage layer. The raw IP never reaches the database.
    pub async fn track_click(
        &self,
        code: &str,
        context: &ClickContext,
    ) -> Result<TrackedClick, TrackError> {
        let affiliate = self.resolve_code(code).await?;
        if affiliate.status != AffiliateStatus::Active {
            return Err(TrackError::not_active(code));
        }

        let config = crate::config::get_config();
        let session_id = utils::new_session_id();
        let ip_hash = context
            .ip
            .as_deref()
            .map(|ip| utils::hash_ip(&config.attribution.ip_hash_salt, ip));

        self.storage
            .record_click(&NewClick {
                affiliate_id: affiliate.id.clone(),
                session_id: session_id.clone(),
                ip_hash,
                utm_source: context.utm_source.clone(),
                utm_medium: context.utm_medium.clone(),
                utm_campaign: context.utm_campaign.clone(),
            })
            .await?;

        let expires_at = Utc::now() + Duration::days(config.attribution.window_days);
        let cookie = AttributionCookie {
            affiliate_id: affiliate.id.clone(),
            session_id: session_id.clone(),
            expires_at: expires_at.timestamp_millis(),
        };

        debug!(
            "Click tracked for affiliate {} (code '{}', session {})",
            affiliate.id, code, session_id
        );

        Ok(TrackedClick {
            affiliate_id: affiliate.id,
            session_id,
            cookie,
        })
    }

    /// First-click-wins: an existing unexpired cookie is kept as-is and
    /// the new click's cookie is discarded.
    pub fn cookie_to_set(
        existing: Option<&str>,
        tracked: &TrackedClick,
    ) -> Option<String> {
        let now_ms = Utc::now().timestamp_millis();
        if let Some(raw) = existing {
            if let Some(cookie) = AttributionCookie::decode(raw) {
                if !cookie.is_expired(now_ms) {
                    return None;
                }
            }
        }
        Some(tracked.cookie.encode())
    }

    /// Read the attribution carried by a request, if any.
    pub fn current_attribution(raw_cookie: Option<&str>) -> Option<AttributionCookie> {
        let cookie = AttributionCookie::decode(raw_cookie?)?;
        if cookie.is_expired(Utc::now().timestamp_millis()) {
            return None;
        }
        Some(cookie)
    }

    /// Exact code first, then the referred-prefix remap.
    async fn resolve_code(
        &self,
        code: &str,
    ) -> Result<crate::storage::models::Affiliate, TrackError> {
        if let Some(affiliate) = self.storage.find_affiliate_by_code(code).await? {
            return Ok(affiliate);
        }

        if let Some(base) = code.strip_prefix(REFERRED_PREFIX) {
            if !base.is_empty() {
                if let Some(affiliate) = self.storage.find_affiliate_by_code(base).await? {
                    return Ok(affiliate);
                }
            }
        }

        Err(TrackError::invalid_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_round_trip() {
        let cookie = AttributionCookie {
            affiliate_id: "af_1".into(),
            session_id: "sess_1".into(),
            expires_at: 1_900_000_000_000,
        };
        let decoded = AttributionCookie::decode(&cookie.encode()).unwrap();
        assert_eq!(decoded, cookie);
    }

    #[test]
    fn test_cookie_decode_failure_is_none() {
        assert!(AttributionCookie::decode("!!not-base64!!").is_none());
        assert!(AttributionCookie::decode(&BASE64.encode(b"not json")).is_none());
    }

    #[test]
    fn test_cookie_payload_uses_storefront_field_names() {
        let cookie = AttributionCookie {
            affiliate_id: "af_1".into(),
            session_id: "sess_1".into(),
            expires_at: 42,
        };
        let json = String::from_utf8(BASE64.decode(cookie.encode()).unwrap()).unwrap();
        assert!(json.contains("\"affiliateId\""));
        assert!(json.contains("\"sessionId\""));
        assert!(json.contains("\"expiresAt\""));
    }

    #[test]
    fn test_first_click_wins() {
        let tracked = TrackedClick {
            affiliate_id: "af_2".into(),
            session_id: "sess_2".into(),
            cookie: AttributionCookie {
                affiliate_id: "af_2".into(),
                session_id: "sess_2".into(),
                expires_at: chrono::Utc::now().timestamp_millis() + 86_400_000,
            },
        };

        // 没有已有 cookie：写入新 cookie
        assert!(AttributionService::cookie_to_set(None, &tracked).is_some());

        // 已有未过期 cookie：保持原样
        let live = AttributionCookie {
            affiliate_id: "af_1".into(),
            session_id: "sess_1".into(),
            expires_at: chrono::Utc::now().timestamp_millis() + 86_400_000,
        }
        .encode();
        assert!(AttributionService::cookie_to_set(Some(&live), &tracked).is_none());

        // 已过期 cookie：被新 cookie 替换
        let stale = AttributionCookie {
            affiliate_id: "af_1".into(),
            session_id: "sess_1".into(),
            expires_at: 1,
        }
        .encode();
        assert!(AttributionService::cookie_to_set(Some(&stale), &tracked).is_some());

        // 坏 cookie：按无归因处理，写入新 cookie
        assert!(AttributionService::cookie_to_set(Some("garbage"), &tracked).is_some());
    }
}
