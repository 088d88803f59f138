//! 批量支付集成测试
//!
//! 验证批次幂等（重跑不重复转账）、失败转账不消耗返佣、
//! 以及 paid 转移对三个余额计数器的精确影响。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use moneta::config::init_config;
use moneta::services::provider::{
    CreateRefundParams, CreateTransferParams, PaymentProvider, ProviderError, ProviderRefund,
    ProviderTransfer,
};
use moneta::services::{BatchOptions, CommissionService, PayoutService};
use moneta::storage::backend::SeaOrmStorage;
use moneta::storage::models::{
    Affiliate, AffiliatePayout, AffiliateStatus, Order, OrderStatus, PaymentStatus, PayoutStatus,
    ReferralStatus,
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
    let db_path = temp_dir.path().join("payout_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("创建存储失败"),
    );
    (temp_dir, storage)
}

struct MockTransferProvider {
    calls: AtomicUsize,
    fail_with: Mutex<Option<ProviderError>>,
    last_idempotency_key: Mutex<Option<String>>,
}

impl MockTransferProvider {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
            last_idempotency_key: Mutex::new(None),
        })
    }

    fn failing(err: ProviderError) -> Arc<Self> {
        let provider = Self::succeeding();
        *provider.fail_with.lock().unwrap() = Some(err);
        provider
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for MockTransferProvider {
    async fn create_refund(
        &self,
        _params: CreateRefundParams,
    ) -> Result<ProviderRefund, ProviderError> {
        unreachable!("payout tests never refund")
    }

    async fn create_transfer(
        &self,
        params: CreateTransferParams,
    ) -> Result<ProviderTransfer, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_idempotency_key.lock().unwrap() = Some(params.idempotency_key.clone());
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(ProviderTransfer {
            id: format!("tr_mock_{}", self.call_count()),
            status: "paid".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "mock-transfer"
    }
}

fn affiliate(id: &str) -> Affiliate {
    Affiliate {
        id: id.to_string(),
        code: format!("CODE-{}", id),
        display_name: id.to_string(),
        status: AffiliateStatus::Active,
        commission_rate: 10.0,
        commission_flat: None,
        total_earnings: 0,
        pending_balance: 0,
        paid_balance: 0,
        click_count: 0,
        payout_account: Some(format!("acct_{}", id)),
        payouts_enabled: true,
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

/// 造出 total_earnings=5000 / pending=2000 / paid=0 的联盟成员：
/// 30000 订单的返佣（3000）批准，20000 订单的返佣（2000）保持 pending。
async fn seed_scenario(storage: &Arc<SeaOrmStorage>, affiliate_id: &str) {
    storage.insert_affiliate(&affiliate(affiliate_id)).await.unwrap();
    let o_approved = format!("o_{}_approved", affiliate_id);
    let o_pending = format!("o_{}_pending", affiliate_id);
    storage.insert_order(&paid_order(&o_approved, 30000)).await.unwrap();
    storage.insert_order(&paid_order(&o_pending, 20000)).await.unwrap();

    let commissions = CommissionService::new(storage.clone());
    let approved_id = commissions
        .record_conversion(&o_approved, affiliate_id)
        .await
        .unwrap()
        .referral()
        .id
        .clone();
    commissions
        .record_conversion(&o_pending, affiliate_id)
        .await
        .unwrap();
    commissions.approve_referral(&approved_id).await.unwrap();
}

fn batch(dry_run: bool, batch_id: Option<&str>) -> BatchOptions {
    BatchOptions {
        dry_run,
        initiator: "test-admin".to_string(),
        batch_id: batch_id.map(String::from),
    }
}

#[tokio::test]
async fn test_successful_batch_moves_balances_exactly() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_1").await;

    let before = storage.get_affiliate("af_1").await.unwrap().unwrap();
    assert_eq!(before.total_earnings, 5000);
    assert_eq!(before.pending_balance, 2000);
    assert_eq!(before.approved_unpaid_balance(), 3000);

    let provider = MockTransferProvider::succeeding();
    let service = PayoutService::new(storage.clone(), provider.clone());

    let summary = service.run_payout_batch(batch(false, None)).await.unwrap();
    assert_eq!(summary.total_payouts, 1);
    assert_eq!(summary.total_amount, 3000);
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.failure_count, 0);
    assert_eq!(provider.call_count(), 1);

    // paid_balance 恰好增加支付额，approved-unpaid 归零，pending 不动
    let after = storage.get_affiliate("af_1").await.unwrap().unwrap();
    assert_eq!(after.paid_balance, 3000);
    assert_eq!(after.pending_balance, 2000);
    assert_eq!(after.approved_unpaid_balance(), 0);

    // 幂等键绑定 (batch_id, affiliate_id)
    let key = provider.last_idempotency_key.lock().unwrap().clone().unwrap();
    assert_eq!(key, format!("tr_{}_af_1", summary.batch_id));

    // 批次查询返回 paid 行与覆盖的返佣
    let lookup = service.get_batch(&summary.batch_id).await.unwrap();
    assert_eq!(lookup.payouts.len(), 1);
    assert_eq!(lookup.payouts[0].status, PayoutStatus::Paid);
    assert!(lookup.payouts[0].transfer_ref.is_some());

    let covered = storage
        .referrals_for_payout(&lookup.payouts[0].id)
        .await
        .unwrap();
    assert_eq!(covered.len(), 1);
    assert_eq!(covered[0].status, ReferralStatus::Paid);
}

#[tokio::test]
async fn test_rerun_of_same_batch_id_issues_no_transfer() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_2").await;

    let provider = MockTransferProvider::succeeding();
    let service = PayoutService::new(storage.clone(), provider.clone());

    let summary = service
        .run_payout_batch(batch(false, Some("batch_fixed")))
        .await
        .unwrap();
    assert_eq!(summary.success_count, 1);
    assert_eq!(provider.call_count(), 1);

    // 操作员超时重跑同一批次：本地 payout 行挡住第二次外呼
    let rerun = service
        .run_payout_batch(batch(false, Some("batch_fixed")))
        .await
        .unwrap();
    assert_eq!(rerun.total_payouts, 0);
    assert_eq!(provider.call_count(), 1);

    let after = storage.get_affiliate("af_2").await.unwrap().unwrap();
    assert_eq!(after.paid_balance, 3000);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_3").await;

    let provider = MockTransferProvider::succeeding();
    let service = PayoutService::new(storage.clone(), provider.clone());

    let summary = service
        .run_payout_batch(batch(true, Some("batch_dry")))
        .await
        .unwrap();
    assert_eq!(summary.total_payouts, 1);
    assert_eq!(summary.total_amount, 3000);
    assert!(summary.dry_run);
    assert_eq!(provider.call_count(), 0);

    let lookup = service.get_batch("batch_dry").await.unwrap();
    assert!(lookup.payouts.is_empty());

    let after = storage.get_affiliate("af_3").await.unwrap().unwrap();
    assert_eq!(after.paid_balance, 0);
    assert_eq!(after.approved_unpaid_balance(), 3000);
}

#[tokio::test]
async fn test_failed_transfer_keeps_referrals_approved() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_4").await;

    let provider =
        MockTransferProvider::failing(ProviderError::Timeout("deadline".to_string()));
    let service = PayoutService::new(storage.clone(), provider.clone());

    let summary = service
        .run_payout_batch(batch(false, Some("batch_fail")))
        .await
        .unwrap();
    assert_eq!(summary.total_payouts, 1);
    assert_eq!(summary.success_count, 0);
    assert_eq!(summary.failure_count, 1);

    // 失败有记录：failed 行留在批次里
    let lookup = service.get_batch("batch_fail").await.unwrap();
    assert_eq!(lookup.payouts.len(), 1);
    assert_eq!(lookup.payouts[0].status, PayoutStatus::Failed);
    assert!(lookup.payouts[0].failure_reason.is_some());

    // 返佣保持 approved，余额不动，等待下一批
    let after = storage.get_affiliate("af_4").await.unwrap().unwrap();
    assert_eq!(after.paid_balance, 0);
    assert_eq!(after.approved_unpaid_balance(), 3000);
    let approved = storage.approved_unpaid_referrals("af_4").await.unwrap();
    assert_eq!(approved.len(), 1);
}

#[tokio::test]
async fn test_rejected_transfer_recorded_as_rejected() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_5").await;

    let provider = MockTransferProvider::failing(ProviderError::Rejected {
        status: 402,
        message: "account disabled".to_string(),
    });
    let service = PayoutService::new(storage.clone(), provider.clone());

    let summary = service
        .run_payout_batch(batch(false, Some("batch_rej")))
        .await
        .unwrap();
    assert_eq!(summary.failure_count, 1);

    let lookup = service.get_batch("batch_rej").await.unwrap();
    assert_eq!(lookup.payouts[0].status, PayoutStatus::Rejected);
}

#[tokio::test]
async fn test_below_minimum_balance_is_skipped() {
    let (_dir, storage) = setup().await;
    // 500 的已批准余额低于默认起付线 1000
    storage.insert_affiliate(&affiliate("af_6")).await.unwrap();
    storage.insert_order(&paid_order("o_small", 5000)).await.unwrap();
    let commissions = CommissionService::new(storage.clone());
    let referral_id = commissions
        .record_conversion("o_small", "af_6")
        .await
        .unwrap()
        .referral()
        .id
        .clone();
    commissions.approve_referral(&referral_id).await.unwrap();

    let provider = MockTransferProvider::succeeding();
    let service = PayoutService::new(storage.clone(), provider.clone());

    let summary = service.run_payout_batch(batch(false, None)).await.unwrap();
    assert_eq!(summary.total_payouts, 0);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_overlapping_customer_requests_issue_one_transfer() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_race").await;

    let provider = MockTransferProvider::succeeding();
    let service = Arc::new(PayoutService::new(storage.clone(), provider.clone()));

    // 两个不同 batch id 的并发请求争夺同一笔 3000 的已批准余额；
    // 返佣锁定保证只有一方走到转账
    let first = {
        let service = service.clone();
        async move { service.request_payout("af_race", "customer").await }
    };
    let second = {
        let service = service.clone();
        async move { service.request_payout("af_race", "customer").await }
    };
    let (first, second) = tokio::join!(first, second);

    // 输家要么拿到空结果（锁定失败），要么因余额已支付而不再符合
    // 资格；两种交错下都只允许一次转账
    let totals = [first, second]
        .into_iter()
        .filter_map(|r| r.ok())
        .fold((0, 0, 0), |acc, s| {
            (
                acc.0 + s.success_count,
                acc.1 + s.total_payouts,
                acc.2 + s.total_amount,
            )
        });

    assert_eq!(provider.call_count(), 1);
    assert_eq!(totals.0, 1);
    assert_eq!(totals.1, 1);
    assert_eq!(totals.2, 3000);

    let after = storage.get_affiliate("af_race").await.unwrap().unwrap();
    assert_eq!(after.paid_balance, 3000);
    assert_eq!(after.approved_unpaid_balance(), 0);
}

#[tokio::test]
async fn test_failed_payout_releases_claim_for_next_batch() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_rel").await;

    let failing = MockTransferProvider::failing(ProviderError::Transport("conn reset".into()));
    let service = PayoutService::new(storage.clone(), failing.clone());
    let summary = service
        .run_payout_batch(batch(false, Some("batch_rel_1")))
        .await
        .unwrap();
    assert_eq!(summary.failure_count, 1);

    // 失败释放锁定，下一批（新 batch id）重试并成功
    let succeeding = MockTransferProvider::succeeding();
    let service = PayoutService::new(storage.clone(), succeeding.clone());
    let retry = service
        .run_payout_batch(batch(false, Some("batch_rel_2")))
        .await
        .unwrap();
    assert_eq!(retry.success_count, 1);
    assert_eq!(succeeding.call_count(), 1);

    let after = storage.get_affiliate("af_rel").await.unwrap().unwrap();
    assert_eq!(after.paid_balance, 3000);
}

#[tokio::test]
async fn test_referral_reversed_before_settlement_stays_reversed() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_rev").await;

    let referrals = storage.approved_unpaid_referrals("af_rev").await.unwrap();
    assert_eq!(referrals.len(), 1);

    let payout = AffiliatePayout {
        id: "pt_rev_1".to_string(),
        affiliate_id: "af_rev".to_string(),
        batch_id: "batch_rev_race".to_string(),
        amount: 3000,
        status: PayoutStatus::Pending,
        transfer_ref: None,
        failure_reason: None,
        initiator: "test-admin".to_string(),
        created_at: Utc::now(),
    };
    assert!(storage
        .insert_payout_claiming(&payout, &referrals)
        .await
        .unwrap());

    // 转账在途时订单被全额退款，返佣被冲销
    let order_id = format!("o_{}_approved", "af_rev");
    assert!(storage.reverse_referral_for_order(&order_id).await.unwrap());

    // 结算不得把 reversed 翻回 paid
    storage
        .mark_payout_paid(&payout.id, "tr_rev_1", &referrals)
        .await
        .unwrap();
    let row = storage
        .get_referral(&referrals[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, ReferralStatus::Reversed);

    // 未翻转的返佣也不进 payout_referrals 关联表
    let covered = storage.referrals_for_payout(&payout.id).await.unwrap();
    assert!(covered.is_empty());
}

#[tokio::test]
async fn test_request_payout_single_affiliate() {
    let (_dir, storage) = setup().await;
    seed_scenario(&storage, "af_7").await;

    let provider = MockTransferProvider::succeeding();
    let service = PayoutService::new(storage.clone(), provider.clone());

    let summary = service.request_payout("af_7", "customer").await.unwrap();
    assert_eq!(summary.total_payouts, 1);
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.total_amount, 3000);

    let after = storage.get_affiliate("af_7").await.unwrap().unwrap();
    assert_eq!(after.paid_balance, 3000);
}
