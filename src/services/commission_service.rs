//! Commission ledger
//!
//! One referral per order, created when a paid, attributed order comes
//! in. The commission amount is a contract frozen at creation time:
//! later rate changes never touch existing referrals. Duplicate
//! conversion events (webhooks redeliver) are idempotent no-ops.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::errors::{MonetaError, Result};
use crate::storage::backend::ReferralCreateOutcome;
use crate::storage::models::{Affiliate, AffiliateReferral, ReferralStatus};
use crate::storage::SeaOrmStorage;
use crate::utils;

/// Conversion recording result.
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    Recorded(AffiliateReferral),
    /// The order already has a referral; nothing changed.
    Duplicate(AffiliateReferral),
}

impl ConversionOutcome {
    pub fn referral(&self) -> &AffiliateReferral {
        match self {
            Self::Recorded(r) | Self::Duplicate(r) => r,
        }
    }
}

pub struct CommissionService {
    storage: Arc<SeaOrmStorage>,
}

impl CommissionService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// Record a conversion for an attributed, paid order.
    ///
    /// Safe to call from an at-least-once webhook consumer: the unique
    /// order index makes repeats no-ops.
    pub async fn record_conversion(
        &self,
        order_id: &str,
        affiliate_id: &str,
    ) -> Result<ConversionOutcome> {
        let order = self
            .storage
            .get_order(order_id)
            .await?
            .ok_or_else(|| MonetaError::not_found(format!("order {} not found", order_id)))?;

        if !order.status.is_paid_equivalent() {
            return Err(MonetaError::validation(format!(
                "order {} is not paid, no commission accrues",
                order_id
            )));
        }

        let affiliate = self
            .storage
            .get_affiliate(affiliate_id)
            .await?
            .ok_or_else(|| {
                MonetaError::not_found(format!("affiliate {} not found", affiliate_id))
            })?;

        let commission_amount = commission_for(&affiliate, order.total_amount);
        let referral = AffiliateReferral {
            id: utils::prefixed_id("ref_"),
            affiliate_id: affiliate.id.clone(),
            order_id: order.id.clone(),
            order_amount: order.total_amount,
            commission_rate: affiliate.commission_rate,
            commission_amount,
            status: ReferralStatus::Pending,
            payout_id: None,
            created_at: Utc::now(),
            approved_at: None,
        };

        match self.storage.create_referral_idempotent(&referral).await? {
            ReferralCreateOutcome::Created(r) => Ok(ConversionOutcome::Recorded(r)),
            ReferralCreateOutcome::AlreadyExists(r) => {
                debug!("Conversion for order {} already recorded", order_id);
                Ok(ConversionOutcome::Duplicate(r))
            }
        }
    }

    /// Approve every pending referral older than the configured
    /// approval window. Returns how many were approved.
    pub async fn approve_due_referrals(&self) -> Result<usize> {
        let config = crate::config::get_config();
        let cutoff = Utc::now() - Duration::days(config.commission.approval_window_days);
        let approved = self.storage.approve_due_referrals(cutoff).await?;
        if approved > 0 {
            info!("Approved {} referrals past the approval window", approved);
        }
        Ok(approved)
    }

    /// Manual admin approval of a single referral.
    pub async fn approve_referral(&self, referral_id: &str) -> Result<bool> {
        self.storage.approve_referral(referral_id).await
    }

    /// Reverse the referral behind a refunded order, if one exists and
    /// is still outstanding.
    pub async fn reverse_for_order(&self, order_id: &str) -> Result<bool> {
        self.storage.reverse_referral_for_order(order_id).await
    }

    /// Approved-but-unpaid balance, derived from the three counters.
    pub async fn approved_unpaid_balance(&self, affiliate_id: &str) -> Result<i64> {
        let affiliate = self
            .storage
            .get_affiliate(affiliate_id)
            .await?
            .ok_or_else(|| {
                MonetaError::not_found(format!("affiliate {} not found", affiliate_id))
            })?;
        Ok(affiliate.approved_unpaid_balance())
    }
}

/// Commission for an order at the affiliate's current terms: a flat
/// amount if configured, otherwise `round(amount × rate / 100)`.
pub fn commission_for(affiliate: &Affiliate, order_amount: i64) -> i64 {
    if let Some(flat) = affiliate.commission_flat {
        return flat;
    }
    (order_amount as f64 * affiliate.commission_rate / 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::AffiliateStatus;

    fn affiliate(rate: f64, flat: Option<i64>) -> Affiliate {
        Affiliate {
            id: "af_1".into(),
            code: "ALICE".into(),
            display_name: "Alice".into(),
            status: AffiliateStatus::Active,
            commission_rate: rate,
            commission_flat: flat,
            total_earnings: 0,
            pending_balance: 0,
            paid_balance: 0,
            click_count: 0,
            payout_account: None,
            payouts_enabled: true,
            min_payout_override: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_percentage_commission_rounds() {
        assert_eq!(commission_for(&affiliate(10.0, None), 10000), 1000);
        // 2.5% of 999 = 24.975 → 25
        assert_eq!(commission_for(&affiliate(2.5, None), 999), 25);
        // 10% of 5 = 0.5 → 1 (round half away from zero)
        assert_eq!(commission_for(&affiliate(10.0, None), 5), 1);
    }

    #[test]
    fn test_flat_commission_wins_over_rate() {
        assert_eq!(commission_for(&affiliate(10.0, Some(700)), 10000), 700);
    }
}
