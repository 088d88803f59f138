pub mod affiliate;
pub mod affiliate_click;
pub mod affiliate_invite;
pub mod affiliate_payout;
pub mod affiliate_referral;
pub mod audit_log;
pub mod invite_usage;
pub mod order;
pub mod payout_referral;
pub mod refund;
pub mod webhook_event;

pub use affiliate::Entity as AffiliateEntity;
pub use affiliate_click::Entity as AffiliateClickEntity;
pub use affiliate_invite::Entity as AffiliateInviteEntity;
pub use affiliate_payout::Entity as AffiliatePayoutEntity;
pub use affiliate_referral::Entity as AffiliateReferralEntity;
pub use audit_log::Entity as AuditLogEntity;
pub use invite_usage::Entity as InviteUsageEntity;
pub use order::Entity as OrderEntity;
pub use payout_referral::Entity as PayoutReferralEntity;
pub use refund::Entity as RefundEntity;
pub use webhook_event::Entity as WebhookEventEntity;
