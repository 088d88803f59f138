//! Refund orchestrator
//!
//! Two entry points share one validation pipeline: processor refunds go
//! through the external provider with a deterministic idempotency key,
//! manual refunds create a pending row an operator settles out-of-band.
//! Budget enforcement and the refund insert are one transactional unit
//! in the storage layer; the processor path pre-checks the budget before
//! calling out, since a provider-side refund must always be recorded
//! once it exists.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use super::provider::{CreateRefundParams, PaymentProvider, ProviderError};
use crate::errors::MonetaError;
use crate::ledger;
use crate::storage::backend::RefundWriteOutcome;
use crate::storage::models::{
    Order, PaymentStatus, Refund, RefundReason, RefundSource, RefundStatus,
};
use crate::storage::SeaOrmStorage;
use crate::utils;

/// Typed refund failure with a stable code and an HTTP-equivalent status.
#[derive(Debug, Clone)]
pub struct RefundError {
    pub code: &'static str,
    pub status: u16,
    pub message: String,
}

impl RefundError {
    fn new(code: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
        }
    }

    pub fn order_not_found(order_id: &str) -> Self {
        Self::new("ORDER_NOT_FOUND", 404, format!("order {} not found", order_id))
    }

    pub fn not_processor_paid() -> Self {
        Self::new(
            "NOT_PROCESSOR_PAID",
            422,
            "order carries no payment reference, use a manual refund instead",
        )
    }

    pub fn order_not_paid() -> Self {
        Self::new("ORDER_NOT_PAID", 422, "order is not in a paid state")
    }

    pub fn invalid_amount() -> Self {
        Self::new("INVALID_AMOUNT", 400, "refund amount must be a positive integer")
    }

    pub fn invalid_reason_code(raw: &str) -> Self {
        Self::new(
            "INVALID_REASON_CODE",
            400,
            format!("unknown refund reason code '{}'", raw),
        )
    }

    pub fn exceeds_refundable(refundable: i64) -> Self {
        Self::new(
            "EXCEEDS_REFUNDABLE",
            422,
            format!("requested amount exceeds refundable budget ({})", refundable),
        )
    }

    pub fn provider(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout(_) => Self::new("PROVIDER_TIMEOUT", 504, err.to_string()),
            ProviderError::Unconfigured(_) => {
                Self::new("PROVIDER_UNCONFIGURED", 503, err.to_string())
            }
            _ => Self::new("PROVIDER_ERROR", 502, err.to_string()),
        }
    }
}

impl std::fmt::Display for RefundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RefundError {}

impl From<MonetaError> for RefundError {
    fn from(err: MonetaError) -> Self {
        Self::new("INTERNAL", 500, err.format_simple())
    }
}

/// Refund creation request (both entry points).
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub order_id: String,
    pub amount: i64,
    pub reason_code: Option<String>,
    /// Operator or system identity, recorded in the audit trail.
    pub actor: String,
}

/// What the orchestrator hands back on success.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub refund: Refund,
    pub payment_status: PaymentStatus,
}

pub struct RefundService {
    storage: Arc<SeaOrmStorage>,
    provider: Arc<dyn PaymentProvider>,
}

impl RefundService {
    pub fn new(storage: Arc<SeaOrmStorage>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { storage, provider }
    }

    /// Shared validation steps. Returns the order and the parsed reason.
    async fn validate(
        &self,
        request: &RefundRequest,
        require_payment_ref: bool,
    ) -> Result<(Order, Option<RefundReason>), RefundError> {
        let order = self
            .storage
            .get_order(&request.order_id)
            .await?
            .ok_or_else(|| RefundError::order_not_found(&request.order_id))?;

        if require_payment_ref && order.payment_ref.is_none() {
            return Err(RefundError::not_processor_paid());
        }
        if !order.status.is_paid_equivalent() {
            return Err(RefundError::order_not_paid());
        }
        if request.amount <= 0 {
            return Err(RefundError::invalid_amount());
        }

        let reason = match &request.reason_code {
            Some(raw) => Some(
                RefundReason::from_str(raw)
                    .map_err(|_| RefundError::invalid_reason_code(raw))?,
            ),
            None => None,
        };

        Ok((order, reason))
    }

    /// Refund through the external processor.
    ///
    /// The idempotency key is derived from the request itself, so a
    /// retry after a timeout reuses the provider-side refund instead of
    /// creating a second one. No local row is written if the provider
    /// call fails: the row always carries the provider's refund id.
    pub async fn create_processor_refund(
        &self,
        request: RefundRequest,
    ) -> Result<RefundOutcome, RefundError> {
        let (order, reason) = self.validate(&request, true).await?;

        // 外呼前的额度预检。供应商侧退款一旦创建就必须落库，
        // 事务内不再二次拦截，这个窗口是已记录的取舍。
        let refunds = self.storage.load_refunds(&order.id).await?;
        let refundable = ledger::refundable_amount(&order, &refunds);
        if request.amount > refundable {
            return Err(RefundError::exceeds_refundable(refundable));
        }

        let requested_at = Utc::now();
        let idempotency_key = format!(
            "re_{}_{}_{}",
            order.id,
            request.amount,
            requested_at.timestamp()
        );

        let payment_ref = order
            .payment_ref
            .clone()
            .ok_or_else(RefundError::not_processor_paid)?;

        let provider_refund = self
            .provider
            .create_refund(CreateRefundParams {
                payment_ref,
                amount: request.amount,
                reason_code: reason,
                idempotency_key: idempotency_key.clone(),
            })
            .await
            .map_err(|e| {
                warn!(
                    "Provider refund for order {} failed: {} (idempotency key {})",
                    order.id, e, idempotency_key
                );
                RefundError::provider(e)
            })?;

        let status = normalize_provider_status(&provider_refund.status);
        let refund = Refund {
            id: utils::prefixed_id("rf_"),
            order_id: order.id.clone(),
            amount: request.amount,
            status,
            source: RefundSource::Processor,
            provider_ref: Some(provider_refund.id.clone()),
            reason_code: reason,
            raw_provider_status: Some(provider_refund.status.clone()),
            created_at: requested_at,
        };

        let outcome = self
            .storage
            .create_refund_guarded(&order, &refund, false)
            .await?;
        let (refund, payment_status) = match outcome {
            RefundWriteOutcome::Written {
                refund,
                new_payment_status,
            } => (refund, new_payment_status),
            RefundWriteOutcome::ExceedsBudget { refundable } => {
                // enforce_budget=false 时不可达
                return Err(RefundError::exceeds_refundable(refundable));
            }
        };

        self.write_audit(
            &request.actor,
            "refund.create_processor",
            &order.id,
            json!({
                "refund_id": refund.id,
                "amount": refund.amount,
                "provider_ref": provider_refund.id,
                "raw_provider_status": provider_refund.status,
                "normalized_status": refund.status.as_ref(),
                "idempotency_key": idempotency_key,
            }),
        )
        .await;

        if refund.status == RefundStatus::Processed {
            self.notify_conversion_adjustment(&order.id, payment_status);
        }

        Ok(RefundOutcome {
            refund,
            payment_status,
        })
    }

    /// Manual refund: same validation, pending row, no provider call.
    ///
    /// The budget check runs inside the insert transaction against
    /// freshly re-read refund rows, so two racing manual refunds can
    /// never jointly exceed the refundable amount.
    pub async fn create_manual_refund(
        &self,
        request: RefundRequest,
    ) -> Result<RefundOutcome, RefundError> {
        let (order, reason) = self.validate(&request, false).await?;

        let refund = Refund {
            id: utils::prefixed_id("rf_"),
            order_id: order.id.clone(),
            amount: request.amount,
            status: RefundStatus::Pending,
            source: RefundSource::Manual,
            provider_ref: None,
            reason_code: reason,
            raw_provider_status: None,
            created_at: Utc::now(),
        };

        let outcome = self
            .storage
            .create_refund_guarded(&order, &refund, true)
            .await?;
        let (refund, payment_status) = match outcome {
            RefundWriteOutcome::Written {
                refund,
                new_payment_status,
            } => (refund, new_payment_status),
            RefundWriteOutcome::ExceedsBudget { refundable } => {
                return Err(RefundError::exceeds_refundable(refundable));
            }
        };

        self.write_audit(
            &request.actor,
            "refund.create_manual",
            &order.id,
            json!({
                "refund_id": refund.id,
                "amount": refund.amount,
                "normalized_status": refund.status.as_ref(),
            }),
        )
        .await;

        Ok(RefundOutcome {
            refund,
            payment_status,
        })
    }

    /// Apply an asynchronous settlement event delivered by webhook.
    ///
    /// Callers must have deduplicated the event id already. Only pending
    /// refunds settle; a repeat delivery finds no row and returns None.
    pub async fn apply_settlement(
        &self,
        provider_ref: &str,
        raw_provider_status: &str,
    ) -> Result<Option<RefundOutcome>, RefundError> {
        let status = normalize_provider_status(raw_provider_status);
        if status == RefundStatus::Pending {
            // 过渡状态事件不推动任何行
            return Ok(None);
        }

        let Some(refund) = self
            .storage
            .settle_refund_by_provider_ref(provider_ref, status, raw_provider_status)
            .await?
        else {
            return Ok(None);
        };

        let order = self
            .storage
            .get_order(&refund.order_id)
            .await?
            .ok_or_else(|| RefundError::order_not_found(&refund.order_id))?;

        self.write_audit(
            "webhook",
            "refund.settle",
            &refund.order_id,
            json!({
                "refund_id": refund.id,
                "provider_ref": provider_ref,
                "raw_provider_status": raw_provider_status,
                "normalized_status": refund.status.as_ref(),
            }),
        )
        .await;

        if refund.status == RefundStatus::Processed {
            self.notify_conversion_adjustment(&order.id, order.payment_status);
        }

        Ok(Some(RefundOutcome {
            refund,
            payment_status: order.payment_status,
        }))
    }

    /// Fire-and-forget: a fully refunded order reverses its referral.
    /// Failure here never fails the refund itself.
    fn notify_conversion_adjustment(&self, order_id: &str, payment_status: PaymentStatus) {
        if payment_status != PaymentStatus::Refunded {
            return;
        }
        let storage = Arc::clone(&self.storage);
        let order_id = order_id.to_string();
        tokio::spawn(async move {
            match storage.reverse_referral_for_order(&order_id).await {
                Ok(true) => info!("Referral for order {} reversed after full refund", order_id),
                Ok(false) => {}
                Err(e) => warn!(
                    "Conversion adjustment for order {} failed: {}",
                    order_id,
                    e.format_simple()
                ),
            }
        });
    }

    /// Audit writes are best-effort: a failed audit insert is logged,
    /// never propagated into the refund result.
    async fn write_audit(
        &self,
        actor: &str,
        action: &str,
        subject_id: &str,
        detail: serde_json::Value,
    ) {
        if let Err(e) = self
            .storage
            .insert_audit_log(actor, action, subject_id, Some(detail))
            .await
        {
            warn!("Audit log write failed for {}: {}", subject_id, e.format_simple());
        }
    }
}

/// Provider status → local four-state enumeration.
///
/// succeeded→processed, pending|requires_action→pending,
/// failed|canceled→failed. Anything unknown is kept pending so the
/// asynchronous settlement path can still resolve it.
pub fn normalize_provider_status(raw: &str) -> RefundStatus {
    match raw {
        "succeeded" => RefundStatus::Processed,
        "pending" | "requires_action" => RefundStatus::Pending,
        "failed" | "canceled" => RefundStatus::Failed,
        other => {
            warn!("Unknown provider refund status '{}', treating as pending", other);
            RefundStatus::Pending
        }
    }
}
