//! Payout batch processor
//!
//! One batch run scans eligible affiliates and issues at most one
//! transfer per affiliate, idempotent on `(batch_id, affiliate_id)`
//! both locally (unique payout row) and at the provider (idempotency
//! key). A re-run of the same batch id re-issues nothing. Runs with
//! distinct batch ids (overlapping customer requests) are serialized
//! by the referral claim inside `insert_payout_claiming`: whichever
//! payout row claims the referrals first gets to call the provider,
//! the other loses the claim and backs off before any transfer.
//! Per-affiliate failures are recorded and the batch continues; a
//! failed transfer releases the claim so the referrals stay approved
//! for the next run.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::provider::{CreateTransferParams, PaymentProvider, ProviderError};
use crate::errors::{MonetaError, Result};
use crate::storage::models::{Affiliate, AffiliatePayout, AffiliateReferral, PayoutStatus};
use crate::storage::SeaOrmStorage;
use crate::utils;

/// Batch trigger options.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub dry_run: bool,
    pub initiator: String,
    /// Reuse a batch id to retry a timed-out run; a fresh id is
    /// generated when absent.
    pub batch_id: Option<String>,
}

/// What a batch run hands back.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub total_payouts: usize,
    pub total_amount: i64,
    pub success_count: usize,
    pub failure_count: usize,
    pub dry_run: bool,
}

/// Batch lookup: rows plus aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct BatchLookup {
    pub batch_id: String,
    pub payouts: Vec<AffiliatePayout>,
    pub total_amount: i64,
    pub success_count: usize,
    pub failure_count: usize,
}

pub struct PayoutService {
    storage: Arc<SeaOrmStorage>,
    provider: Arc<dyn PaymentProvider>,
}

impl PayoutService {
    pub fn new(storage: Arc<SeaOrmStorage>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { storage, provider }
    }

    /// Run one payout batch over every eligible affiliate.
    pub async fn run_payout_batch(&self, options: BatchOptions) -> Result<BatchSummary> {
        let batch_id = options
            .batch_id
            .clone()
            .unwrap_or_else(|| utils::prefixed_id("po_"));

        let mut summary = BatchSummary {
            batch_id: batch_id.clone(),
            total_payouts: 0,
            total_amount: 0,
            success_count: 0,
            failure_count: 0,
            dry_run: options.dry_run,
        };

        let candidates = self.storage.payout_enabled_affiliates().await?;
        info!(
            "Payout batch {} started by {} ({} candidate affiliates, dry_run: {})",
            batch_id,
            options.initiator,
            candidates.len(),
            options.dry_run
        );

        for affiliate in candidates {
            if !self.is_eligible(&affiliate) {
                continue;
            }

            match self
                .pay_one_affiliate(&batch_id, &affiliate, &options)
                .await
            {
                Ok(Some((amount, succeeded))) => {
                    summary.total_payouts += 1;
                    summary.total_amount += amount;
                    if succeeded {
                        summary.success_count += 1;
                    } else {
                        summary.failure_count += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // 单个成员失败不终止整批
                    warn!(
                        "Payout for affiliate {} in batch {} errored: {}",
                        affiliate.id,
                        batch_id,
                        e.format_simple()
                    );
                    summary.total_payouts += 1;
                    summary.failure_count += 1;
                }
            }
        }

        info!(
            "Payout batch {} finished: {} payouts, {} total, {} ok / {} failed",
            batch_id,
            summary.total_payouts,
            summary.total_amount,
            summary.success_count,
            summary.failure_count
        );
        Ok(summary)
    }

    /// Customer-initiated single payout outside an admin batch.
    pub async fn request_payout(&self, affiliate_id: &str, initiator: &str) -> Result<BatchSummary> {
        let affiliate = self
            .storage
            .get_affiliate(affiliate_id)
            .await?
            .ok_or_else(|| {
                MonetaError::not_found(format!("affiliate {} not found", affiliate_id))
            })?;

        if !self.is_eligible(&affiliate) {
            return Err(MonetaError::validation(format!(
                "affiliate {} is not eligible for a payout",
                affiliate_id
            )));
        }

        let batch_id = utils::prefixed_id("por_");
        let options = BatchOptions {
            dry_run: false,
            initiator: initiator.to_string(),
            batch_id: Some(batch_id.clone()),
        };

        let mut summary = BatchSummary {
            batch_id: batch_id.clone(),
            total_payouts: 0,
            total_amount: 0,
            success_count: 0,
            failure_count: 0,
            dry_run: false,
        };

        if let Some((amount, succeeded)) = self
            .pay_one_affiliate(&batch_id, &affiliate, &options)
            .await?
        {
            summary.total_payouts = 1;
            summary.total_amount = amount;
            if succeeded {
                summary.success_count = 1;
            } else {
                summary.failure_count = 1;
            }
        }

        Ok(summary)
    }

    /// All payout rows for a batch plus aggregates.
    pub async fn get_batch(&self, batch_id: &str) -> Result<BatchLookup> {
        let payouts = self.storage.payouts_by_batch(batch_id).await?;
        let total_amount = payouts.iter().map(|p| p.amount).sum();
        let success_count = payouts
            .iter()
            .filter(|p| p.status == PayoutStatus::Paid)
            .count();
        let failure_count = payouts
            .iter()
            .filter(|p| matches!(p.status, PayoutStatus::Rejected | PayoutStatus::Failed))
            .count();

        Ok(BatchLookup {
            batch_id: batch_id.to_string(),
            payouts,
            total_amount,
            success_count,
            failure_count,
        })
    }

    fn is_eligible(&self, affiliate: &Affiliate) -> bool {
        let config = crate::config::get_config();
        let minimum = affiliate
            .min_payout_override
            .unwrap_or(config.payout.minimum_amount);
        affiliate.payouts_enabled
            && affiliate.payout_account.is_some()
            && affiliate.approved_unpaid_balance() >= minimum
            && affiliate.approved_unpaid_balance() > 0
    }

    /// Pay out one affiliate within a batch.
    ///
    /// Returns `Some((amount, succeeded))` when an attempt was counted,
    /// `None` when the affiliate was skipped (nothing selectable, or
    /// the batch already holds a row for this pairing).
    async fn pay_one_affiliate(
        &self,
        batch_id: &str,
        affiliate: &Affiliate,
        options: &BatchOptions,
    ) -> Result<Option<(i64, bool)>> {
        // 本地幂等锚点：该批次已有行就绝不再外呼
        if let Some(existing) = self
            .storage
            .find_payout_by_batch_affiliate(batch_id, &affiliate.id)
            .await?
        {
            info!(
                "Batch {} already holds payout {} for affiliate {} ({:?}), skipping",
                batch_id, existing.id, affiliate.id, existing.status
            );
            return Ok(None);
        }

        let referrals = self.select_referrals(affiliate).await?;
        let amount: i64 = referrals.iter().map(|r| r.commission_amount).sum();
        if referrals.is_empty() || amount <= 0 {
            return Ok(None);
        }

        if options.dry_run {
            info!(
                "Dry run: affiliate {} would receive {} across {} referrals",
                affiliate.id,
                amount,
                referrals.len()
            );
            return Ok(Some((amount, true)));
        }

        let destination = affiliate
            .payout_account
            .clone()
            .ok_or_else(|| MonetaError::validation("affiliate has no payout account"))?;

        // 先落 pending 行并锁定返佣：转账超时后重跑批次能看到这一次
        // 尝试，并发的另一次支付也拿不走同一批返佣
        let payout = AffiliatePayout {
            id: utils::prefixed_id("pt_"),
            affiliate_id: affiliate.id.clone(),
            batch_id: batch_id.to_string(),
            amount,
            status: PayoutStatus::Pending,
            transfer_ref: None,
            failure_reason: None,
            initiator: options.initiator.clone(),
            created_at: Utc::now(),
        };
        if !self
            .storage
            .insert_payout_claiming(&payout, &referrals)
            .await?
        {
            info!(
                "Referrals for affiliate {} already claimed by a concurrent payout, skipping",
                affiliate.id
            );
            return Ok(None);
        }

        let config = crate::config::get_config();
        let transfer_result = self
            .provider
            .create_transfer(CreateTransferParams {
                amount,
                currency: config.payout.currency.clone(),
                destination_account: destination,
                metadata: json!({
                    "batch_id": batch_id,
                    "affiliate_id": affiliate.id,
                    "referral_count": referrals.len(),
                }),
                idempotency_key: format!("tr_{}_{}", batch_id, affiliate.id),
            })
            .await;

        match transfer_result {
            Ok(transfer) => {
                self.storage
                    .mark_payout_paid(&payout.id, &transfer.id, &referrals)
                    .await?;
                Ok(Some((amount, true)))
            }
            Err(err) => {
                let status = match err {
                    ProviderError::Rejected { .. } => PayoutStatus::Rejected,
                    _ => PayoutStatus::Failed,
                };
                warn!(
                    "Transfer for affiliate {} in batch {} did not complete: {}",
                    affiliate.id, batch_id, err
                );
                self.storage
                    .mark_payout_failed(&payout.id, status, &err.to_string())
                    .await?;
                Ok(Some((amount, false)))
            }
        }
    }

    /// Oldest approved referrals first, capped at the affiliate's
    /// approved-unpaid balance.
    async fn select_referrals(&self, affiliate: &Affiliate) -> Result<Vec<AffiliateReferral>> {
        let available = affiliate.approved_unpaid_balance();
        let all = self.storage.approved_unpaid_referrals(&affiliate.id).await?;

        let mut selected = Vec::new();
        let mut running: i64 = 0;
        for referral in all {
            if running + referral.commission_amount > available {
                break;
            }
            running += referral.commission_amount;
            selected.push(referral);
        }
        Ok(selected)
    }
}
