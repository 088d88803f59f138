//! 返佣台账集成测试
//!
//! 验证每单一行的幂等创建、计数器四类变动与一经写入不可变的佣金合同。

use std::sync::{Arc, Once};

use chrono::Utc;
use tempfile::TempDir;

use moneta::config::init_config;
use moneta::services::{CommissionService, ConversionOutcome};
use moneta::storage::backend::SeaOrmStorage;
use moneta::storage::models::{
    Affiliate, AffiliateStatus, Order, OrderStatus, PaymentStatus, ReferralStatus,
};

static INIT: Once = Once::new();

fn init_static_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn setup() -> (TempDir, Arc<SeaOrmStorage>) {
    init_static_config();
    let temp_dir = TempDir::new().expect("创建临时目录失败");
    let db_path = temp_dir.path().join("commission_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("创建存储失败"),
    );
    (temp_dir, storage)
}

fn affiliate(id: &str, rate: f64) -> Affiliate {
    Affiliate {
        id: id.to_string(),
        code: format!("CODE-{}", id),
        display_name: id.to_string(),
        status: AffiliateStatus::Active,
        commission_rate: rate,
        commission_flat: None,
        total_earnings: 0,
        pending_balance: 0,
        paid_balance: 0,
        click_count: 0,
        payout_account: None,
        payouts_enabled: false,
        min_payout_override: None,
        created_at: Utc::now(),
    }
}

fn paid_order(id: &str, total: i64) -> Order {
    Order {
        id: id.to_string(),
        status: OrderStatus::Paid,
        payment_status: PaymentStatus::Paid,
        total_amount: total,
        currency: "USD".to_string(),
        payment_ref: Some(format!("pi_{}", id)),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_conversion_creates_one_referral_and_moves_counters() {
    let (_dir, storage) = setup().await;
    storage.insert_affiliate(&affiliate("af_1", 10.0)).await.unwrap();
    storage.insert_order(&paid_order("o1", 10000)).await.unwrap();

    let service = CommissionService::new(storage.clone());
    let outcome = service.record_conversion("o1", "af_1").await.unwrap();

    let referral = match outcome {
        ConversionOutcome::Recorded(r) => r,
        other => panic!("expected Recorded, got {:?}", other),
    };
    assert_eq!(referral.commission_amount, 1000);
    assert_eq!(referral.status, ReferralStatus::Pending);

    let af = storage.get_affiliate("af_1").await.unwrap().unwrap();
    assert_eq!(af.total_earnings, 1000);
    assert_eq!(af.pending_balance, 1000);
    assert_eq!(af.paid_balance, 0);
    assert_eq!(af.approved_unpaid_balance(), 0);
}

#[tokio::test]
async fn test_duplicate_conversion_is_idempotent_noop() {
    let (_dir, storage) = setup().await;
    storage.insert_affiliate(&affiliate("af_2", 10.0)).await.unwrap();
    storage.insert_order(&paid_order("o2", 5000)).await.unwrap();

    let service = CommissionService::new(storage.clone());
    let first = service.record_conversion("o2", "af_2").await.unwrap();
    assert!(matches!(&first, ConversionOutcome::Recorded(_)));

    // webhook 重复投递：相同订单的第二次记录不报错、不重复计数
    let second = service.record_conversion("o2", "af_2").await.unwrap();
    assert!(matches!(&second, ConversionOutcome::Duplicate(_)));
    assert_eq!(
        first.referral().commission_amount,
        second.referral().commission_amount
    );

    let af = storage.get_affiliate("af_2").await.unwrap().unwrap();
    assert_eq!(af.total_earnings, 500);
    assert_eq!(af.pending_balance, 500);
}

#[tokio::test]
async fn test_commission_is_immutable_after_rate_change() {
    let (_dir, storage) = setup().await;
    storage.insert_affiliate(&affiliate("af_3", 10.0)).await.unwrap();
    storage.insert_order(&paid_order("o3", 10000)).await.unwrap();

    let service = CommissionService::new(storage.clone());
    let outcome = service.record_conversion("o3", "af_3").await.unwrap();
    let referral_id = outcome.referral().id.clone();
    assert_eq!(outcome.referral().commission_amount, 1000);

    // 改费率后历史返佣不变
    storage.update_affiliate_rate("af_3", 50.0).await.unwrap();
    let row = storage.get_referral(&referral_id).await.unwrap().unwrap();
    assert_eq!(row.commission_amount, 1000);
    assert_eq!(row.commission_rate, 10.0);
}

#[tokio::test]
async fn test_approval_reclassifies_without_touching_earnings() {
    let (_dir, storage) = setup().await;
    storage.insert_affiliate(&affiliate("af_4", 10.0)).await.unwrap();
    storage.insert_order(&paid_order("o4", 20000)).await.unwrap();

    let service = CommissionService::new(storage.clone());
    let referral_id = service
        .record_conversion("o4", "af_4")
        .await
        .unwrap()
        .referral()
        .id
        .clone();

    assert!(service.approve_referral(&referral_id).await.unwrap());

    let af = storage.get_affiliate("af_4").await.unwrap().unwrap();
    assert_eq!(af.total_earnings, 2000);
    assert_eq!(af.pending_balance, 0);
    assert_eq!(af.approved_unpaid_balance(), 2000);

    // 二次批准是 no-op
    assert!(!service.approve_referral(&referral_id).await.unwrap());
    let af = storage.get_affiliate("af_4").await.unwrap().unwrap();
    assert_eq!(af.pending_balance, 0);

    let row = storage.get_referral(&referral_id).await.unwrap().unwrap();
    assert_eq!(row.status, ReferralStatus::Approved);
    assert!(row.approved_at.is_some());
}

#[tokio::test]
async fn test_reversal_rolls_back_outstanding_commission() {
    let (_dir, storage) = setup().await;
    storage.insert_affiliate(&affiliate("af_5", 10.0)).await.unwrap();
    storage.insert_order(&paid_order("o5", 10000)).await.unwrap();
    storage.insert_order(&paid_order("o6", 10000)).await.unwrap();

    let service = CommissionService::new(storage.clone());
    service.record_conversion("o5", "af_5").await.unwrap();
    let approved_id = service
        .record_conversion("o6", "af_5")
        .await
        .unwrap()
        .referral()
        .id
        .clone();
    service.approve_referral(&approved_id).await.unwrap();

    // pending 行冲销：total_earnings 和 pending_balance 一起回退
    assert!(service.reverse_for_order("o5").await.unwrap());
    let af = storage.get_affiliate("af_5").await.unwrap().unwrap();
    assert_eq!(af.total_earnings, 1000);
    assert_eq!(af.pending_balance, 0);

    // approved 行冲销：仅 total_earnings 回退
    assert!(service.reverse_for_order("o6").await.unwrap());
    let af = storage.get_affiliate("af_5").await.unwrap().unwrap();
    assert_eq!(af.total_earnings, 0);
    assert_eq!(af.pending_balance, 0);
    assert_eq!(af.approved_unpaid_balance(), 0);

    // reversed 行不可再次冲销
    assert!(!service.reverse_for_order("o6").await.unwrap());
}

#[tokio::test]
async fn test_unpaid_order_earns_nothing() {
    let (_dir, storage) = setup().await;
    storage.insert_affiliate(&affiliate("af_6", 10.0)).await.unwrap();
    let mut pending = paid_order("o7", 1000);
    pending.status = OrderStatus::Pending;
    storage.insert_order(&pending).await.unwrap();

    let service = CommissionService::new(storage.clone());
    assert!(service.record_conversion("o7", "af_6").await.is_err());
}
