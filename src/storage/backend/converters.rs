//! Entity <-> domain model conversion
//!
//! Status columns are stored as strings and parsed back into closed
//! enums here; an unparseable value is a data corruption signal and is
//! surfaced as a database operation error, not silently defaulted.

use std::fmt::Display;
use std::str::FromStr;

use sea_orm::ActiveValue::Set;

use crate::errors::{MonetaError, Result};
use crate::storage::models::{
    Affiliate, AffiliateClick, AffiliateInvite, AffiliatePayout, AffiliateReferral, Order, Refund,
};
use migration::entities::{
    affiliate, affiliate_click, affiliate_invite, affiliate_payout, affiliate_referral, order,
    refund,
};

fn parse_enum<T>(value: &str, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    T::from_str(value).map_err(|e| {
        MonetaError::database_operation(format!(
            "Corrupt enum value '{}' in column {}: {}",
            value, column, e
        ))
    })
}

pub fn order_model_to_domain(m: order::Model) -> Result<Order> {
    Ok(Order {
        status: parse_enum(&m.status, "orders.status")?,
        payment_status: parse_enum(&m.payment_status, "orders.payment_status")?,
        id: m.id,
        total_amount: m.total_amount,
        currency: m.currency,
        payment_ref: m.payment_ref,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

pub fn order_to_active_model(o: &Order) -> order::ActiveModel {
    order::ActiveModel {
        id: Set(o.id.clone()),
        status: Set(o.status.as_ref().to_string()),
        payment_status: Set(o.payment_status.as_ref().to_string()),
        total_amount: Set(o.total_amount),
        currency: Set(o.currency.clone()),
        payment_ref: Set(o.payment_ref.clone()),
        created_at: Set(o.created_at),
        updated_at: Set(o.updated_at),
    }
}

pub fn refund_model_to_domain(m: refund::Model) -> Result<Refund> {
    Ok(Refund {
        status: parse_enum(&m.status, "refunds.status")?,
        source: parse_enum(&m.source, "refunds.source")?,
        reason_code: m
            .reason_code
            .as_deref()
            .map(|r| parse_enum(r, "refunds.reason_code"))
            .transpose()?,
        id: m.id,
        order_id: m.order_id,
        amount: m.amount,
        provider_ref: m.provider_ref,
        raw_provider_status: m.raw_provider_status,
        created_at: m.created_at,
    })
}

pub fn refund_to_active_model(r: &Refund) -> refund::ActiveModel {
    refund::ActiveModel {
        id: Set(r.id.clone()),
        order_id: Set(r.order_id.clone()),
        amount: Set(r.amount),
        status: Set(r.status.as_ref().to_string()),
        source: Set(r.source.as_ref().to_string()),
        provider_ref: Set(r.provider_ref.clone()),
        reason_code: Set(r.reason_code.map(|c| c.as_ref().to_string())),
        raw_provider_status: Set(r.raw_provider_status.clone()),
        created_at: Set(r.created_at),
    }
}

pub fn affiliate_model_to_domain(m: affiliate::Model) -> Result<Affiliate> {
    Ok(Affiliate {
        status: parse_enum(&m.status, "affiliates.status")?,
        id: m.id,
        code: m.code,
        display_name: m.display_name,
        commission_rate: m.commission_rate,
        commission_flat: m.commission_flat,
        total_earnings: m.total_earnings,
        pending_balance: m.pending_balance,
        paid_balance: m.paid_balance,
        click_count: m.click_count,
        payout_account: m.payout_account,
        payouts_enabled: m.payouts_enabled,
        min_payout_override: m.min_payout_override,
        created_at: m.created_at,
    })
}

pub fn affiliate_to_active_model(a: &Affiliate) -> affiliate::ActiveModel {
    affiliate::ActiveModel {
        id: Set(a.id.clone()),
        code: Set(a.code.clone()),
        display_name: Set(a.display_name.clone()),
        status: Set(a.status.as_ref().to_string()),
        commission_rate: Set(a.commission_rate),
        commission_flat: Set(a.commission_flat),
        total_earnings: Set(a.total_earnings),
        pending_balance: Set(a.pending_balance),
        paid_balance: Set(a.paid_balance),
        click_count: Set(a.click_count),
        payout_account: Set(a.payout_account.clone()),
        payouts_enabled: Set(a.payouts_enabled),
        min_payout_override: Set(a.min_payout_override),
        created_at: Set(a.created_at),
    }
}

pub fn click_model_to_domain(m: affiliate_click::Model) -> AffiliateClick {
    AffiliateClick {
        id: m.id,
        affiliate_id: m.affiliate_id,
        session_id: m.session_id,
        ip_hash: m.ip_hash,
        utm_source: m.utm_source,
        utm_medium: m.utm_medium,
        utm_campaign: m.utm_campaign,
        created_at: m.created_at,
    }
}

pub fn invite_model_to_domain(m: affiliate_invite::Model) -> AffiliateInvite {
    AffiliateInvite {
        id: m.id,
        invite_code: m.invite_code,
        target_email: m.target_email,
        target_phone: m.target_phone,
        max_uses: m.max_uses,
        times_used: m.times_used,
        expires_at: m.expires_at,
        used_by_affiliate_id: m.used_by_affiliate_id,
        used_at: m.used_at,
        created_at: m.created_at,
    }
}

pub fn invite_to_active_model(i: &AffiliateInvite) -> affiliate_invite::ActiveModel {
    affiliate_invite::ActiveModel {
        id: Set(i.id.clone()),
        invite_code: Set(i.invite_code.clone()),
        target_email: Set(i.target_email.clone()),
        target_phone: Set(i.target_phone.clone()),
        max_uses: Set(i.max_uses),
        times_used: Set(i.times_used),
        expires_at: Set(i.expires_at),
        used_by_affiliate_id: Set(i.used_by_affiliate_id.clone()),
        used_at: Set(i.used_at),
        created_at: Set(i.created_at),
    }
}

pub fn referral_model_to_domain(m: affiliate_referral::Model) -> Result<AffiliateReferral> {
    Ok(AffiliateReferral {
        status: parse_enum(&m.status, "affiliate_referrals.status")?,
        id: m.id,
        affiliate_id: m.affiliate_id,
        order_id: m.order_id,
        order_amount: m.order_amount,
        commission_rate: m.commission_rate,
        commission_amount: m.commission_amount,
        payout_id: m.payout_id,
        created_at: m.created_at,
        approved_at: m.approved_at,
    })
}

pub fn referral_to_active_model(r: &AffiliateReferral) -> affiliate_referral::ActiveModel {
    affiliate_referral::ActiveModel {
        id: Set(r.id.clone()),
        affiliate_id: Set(r.affiliate_id.clone()),
        order_id: Set(r.order_id.clone()),
        order_amount: Set(r.order_amount),
        commission_rate: Set(r.commission_rate),
        commission_amount: Set(r.commission_amount),
        status: Set(r.status.as_ref().to_string()),
        payout_id: Set(r.payout_id.clone()),
        created_at: Set(r.created_at),
        approved_at: Set(r.approved_at),
    }
}

pub fn payout_model_to_domain(m: affiliate_payout::Model) -> Result<AffiliatePayout> {
    Ok(AffiliatePayout {
        status: parse_enum(&m.status, "affiliate_payouts.status")?,
        id: m.id,
        affiliate_id: m.affiliate_id,
        batch_id: m.batch_id,
        amount: m.amount,
        transfer_ref: m.transfer_ref,
        failure_reason: m.failure_reason,
        initiator: m.initiator,
        created_at: m.created_at,
    })
}

pub fn payout_to_active_model(p: &AffiliatePayout) -> affiliate_payout::ActiveModel {
    affiliate_payout::ActiveModel {
        id: Set(p.id.clone()),
        affiliate_id: Set(p.affiliate_id.clone()),
        batch_id: Set(p.batch_id.clone()),
        amount: Set(p.amount),
        status: Set(p.status.as_ref().to_string()),
        transfer_ref: Set(p.transfer_ref.clone()),
        failure_reason: Set(p.failure_reason.clone()),
        initiator: Set(p.initiator.clone()),
        created_at: Set(p.created_at),
    }
}
