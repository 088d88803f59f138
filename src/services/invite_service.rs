//! Invite redemption engine
//!
//! Redemption is one conditional UPDATE in the storage layer whose
//! affected-row count is the only success signal; this service adds the
//! identity pre-check for locked invites and classifies the "row not
//! updated" outcome for the caller. Exhaustion and expiry are routine
//! concurrent outcomes, logged at debug, never as errors.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::errors::Result;
use crate::storage::backend::RedeemRowOutcome;
use crate::storage::models::AffiliateInvite;
use crate::storage::SeaOrmStorage;

/// Redeeming identity, matched against locked invites before any
/// counter is touched. Email comparison is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RedeemIdentity {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Tagged redemption outcome. Failure variants are expected results,
/// not errors: callers branch on them instead of catching anything.
#[derive(Debug, Clone)]
pub enum RedeemOutcome {
    Redeemed(AffiliateInvite),
    NotFound,
    /// All uses consumed (possibly by a concurrent request).
    Exhausted,
    Expired,
    /// Locked invite, identity does not match. No use was consumed.
    IdentityMismatch,
}

impl RedeemOutcome {
    pub fn is_redeemed(&self) -> bool {
        matches!(self, Self::Redeemed(_))
    }

    /// Stable caller-facing code for the failure variants.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redeemed(_) => "REDEEMED",
            Self::NotFound => "INVITE_NOT_FOUND",
            Self::Exhausted => "INVITE_EXHAUSTED",
            Self::Expired => "INVITE_EXPIRED",
            Self::IdentityMismatch => "INVITE_IDENTITY_MISMATCH",
        }
    }
}

pub struct InviteService {
    storage: Arc<SeaOrmStorage>,
}

impl InviteService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// Redeem one use of an invite for an affiliate signup.
    ///
    /// At-most-N guarantee: with `max_uses = N`, any number of
    /// concurrent calls yields at most `N - times_used` redemptions;
    /// the losers get `Exhausted`, not an exception.
    pub async fn redeem_invite(
        &self,
        invite_id: &str,
        affiliate_id: &str,
        identity: &RedeemIdentity,
        metadata: Option<&str>,
    ) -> Result<RedeemOutcome> {
        let Some(invite) = self.storage.get_invite(invite_id).await? else {
            return Ok(RedeemOutcome::NotFound);
        };

        // 身份预检在原子自增之前，失败的身份校验绝不消耗次数
        if !identity_matches(&invite, identity) {
            debug!(
                "Invite {} identity mismatch for affiliate {}",
                invite_id, affiliate_id
            );
            return Ok(RedeemOutcome::IdentityMismatch);
        }

        match self
            .storage
            .redeem_invite_row(invite_id, affiliate_id, metadata)
            .await?
        {
            RedeemRowOutcome::Redeemed(updated) => Ok(RedeemOutcome::Redeemed(updated)),
            RedeemRowOutcome::NotUpdated => Ok(self.classify_not_updated(invite_id).await?),
        }
    }

    /// Convenience lookup-by-code entry point for the signup flow.
    pub async fn redeem_by_code(
        &self,
        invite_code: &str,
        affiliate_id: &str,
        identity: &RedeemIdentity,
        metadata: Option<&str>,
    ) -> Result<RedeemOutcome> {
        let Some(invite) = self.storage.find_invite_by_code(invite_code).await? else {
            return Ok(RedeemOutcome::NotFound);
        };
        self.redeem_invite(&invite.id, affiliate_id, identity, metadata)
            .await
    }

    /// The conditional update matched no row: work out which gate
    /// closed. The re-read races with other writers, which is fine —
    /// both classifications describe an unavailable invite.
    async fn classify_not_updated(&self, invite_id: &str) -> Result<RedeemOutcome> {
        let Some(invite) = self.storage.get_invite(invite_id).await? else {
            return Ok(RedeemOutcome::NotFound);
        };

        if let Some(expires_at) = invite.expires_at {
            if expires_at <= Utc::now() {
                debug!("Invite {} expired at {}", invite_id, expires_at);
                return Ok(RedeemOutcome::Expired);
            }
        }

        debug!(
            "Invite {} no longer available ({} of {:?} uses consumed)",
            invite_id, invite.times_used, invite.max_uses
        );
        Ok(RedeemOutcome::Exhausted)
    }
}

fn identity_matches(invite: &AffiliateInvite, identity: &RedeemIdentity) -> bool {
    if let Some(target_email) = &invite.target_email {
        match &identity.email {
            Some(email) if email.eq_ignore_ascii_case(target_email) => {}
            _ => return false,
        }
    }
    if let Some(target_phone) = &invite.target_phone {
        match &identity.phone {
            Some(phone) if phone == target_phone => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite_locked_to(email: Option<&str>, phone: Option<&str>) -> AffiliateInvite {
        AffiliateInvite {
            id: "inv_1".into(),
            invite_code: "WELCOME".into(),
            target_email: email.map(String::from),
            target_phone: phone.map(String::from),
            max_uses: Some(1),
            times_used: 0,
            expires_at: None,
            used_by_affiliate_id: None,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unlocked_invite_matches_anyone() {
        let invite = invite_locked_to(None, None);
        assert!(identity_matches(&invite, &RedeemIdentity::default()));
    }

    #[test]
    fn test_email_lock_is_case_insensitive() {
        let invite = invite_locked_to(Some("Alice@Example.com"), None);
        let ok = RedeemIdentity {
            email: Some("alice@example.COM".into()),
            phone: None,
        };
        let wrong = RedeemIdentity {
            email: Some("bob@example.com".into()),
            phone: None,
        };
        assert!(identity_matches(&invite, &ok));
        assert!(!identity_matches(&invite, &wrong));
        assert!(!identity_matches(&invite, &RedeemIdentity::default()));
    }

    #[test]
    fn test_phone_lock_is_exact() {
        let invite = invite_locked_to(None, Some("+15550000001"));
        let ok = RedeemIdentity {
            email: None,
            phone: Some("+15550000001".into()),
        };
        let wrong = RedeemIdentity {
            email: None,
            phone: Some("+15550000002".into()),
        };
        assert!(identity_matches(&invite, &ok));
        assert!(!identity_matches(&invite, &wrong));
    }
}
