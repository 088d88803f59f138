//! 退款编排集成测试
//!
//! 用 mock 供应商驱动 processor 路径，验证校验顺序、额度保护、
//! 状态归一化与异步结算的幂等性。

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
use moneta::services::{RefundRequest, RefundService};
use moneta::storage::backend::SeaOrmStorage;
use moneta::storage::models::{
    Order, OrderStatus, PaymentStatus, RefundSource, RefundStatus,
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
    let db_path = temp_dir.path().join("refund_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("创建存储失败"),
    );
    (temp_dir, storage)
}

/// 可编程 mock 供应商
struct MockProvider {
    /// 每次退款调用返回的状态；空则返回 "succeeded"
    refund_status: Mutex<Option<String>>,
    /// 为 Some 时退款调用直接返回该错误
    fail_with: Mutex<Option<ProviderError>>,
    calls: AtomicUsize,
    last_idempotency_key: Mutex<Option<String>>,
}

impl MockProvider {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            refund_status: Mutex::new(None),
            fail_with: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last_idempotency_key: Mutex::new(None),
        })
    }

    fn with_status(status: &str) -> Arc<Self> {
        let provider = Self::succeeding();
        *provider.refund_status.lock().unwrap() = Some(status.to_string());
        provider
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
impl PaymentProvider for MockProvider {
    async fn create_refund(
        &self,
        params: CreateRefundParams,
    ) -> Result<ProviderRefund, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_idempotency_key.lock().unwrap() = Some(params.idempotency_key.clone());
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        let status = self
            .refund_status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "succeeded".to_string());
        Ok(ProviderRefund {
            id: format!("re_mock_{}", self.call_count()),
            status,
        })
    }

    async fn create_transfer(
        &self,
        _params: CreateTransferParams,
    ) -> Result<ProviderTransfer, ProviderError> {
        unreachable!("refund tests never transfer")
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

fn paid_order(id: &str, total: i64, payment_ref: Option<&str>) -> Order {
    Order {
        id: id.to_string(),
        status: OrderStatus::Paid,
        payment_status: PaymentStatus::Paid,
        total_amount: total,
        currency: "USD".to_string(),
        payment_ref: payment_ref.map(String::from),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn request(order_id: &str, amount: i64) -> RefundRequest {
    RefundRequest {
        order_id: order_id.to_string(),
        amount,
        reason_code: Some("requested_by_customer".to_string()),
        actor: "test-operator".to_string(),
    }
}

#[tokio::test]
async fn test_processor_refund_happy_path() {
    let (_dir, storage) = setup().await;
    storage
        .insert_order(&paid_order("o1", 10000, Some("pi_1")))
        .await
        .unwrap();

    let provider = MockProvider::succeeding();
    let service = RefundService::new(storage.clone(), provider.clone());

    let outcome = service.create_processor_refund(request("o1", 3000)).await.unwrap();
    assert_eq!(outcome.refund.amount, 3000);
    assert_eq!(outcome.refund.status, RefundStatus::Processed);
    assert_eq!(outcome.refund.source, RefundSource::Processor);
    assert_eq!(outcome.payment_status, PaymentStatus::PartiallyRefunded);
    assert_eq!(provider.call_count(), 1);

    // 幂等键由 (order, amount, timestamp) 决定性构造
    let key = provider.last_idempotency_key.lock().unwrap().clone().unwrap();
    assert!(key.starts_with("re_o1_3000_"));

    // 订单上的派生状态已持久化
    let order = storage.get_order("o1").await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::PartiallyRefunded);
}

#[tokio::test]
async fn test_validation_rejects_before_any_call() {
    let (_dir, storage) = setup().await;
    storage
        .insert_order(&paid_order("o2", 10000, Some("pi_2")))
        .await
        .unwrap();
    let mut unpaid = paid_order("o3", 5000, Some("pi_3"));
    unpaid.status = OrderStatus::Pending;
    storage.insert_order(&unpaid).await.unwrap();
    storage.insert_order(&paid_order("o4", 5000, None)).await.unwrap();

    let provider = MockProvider::succeeding();
    let service = RefundService::new(storage.clone(), provider.clone());

    let err = service
        .create_processor_refund(request("missing", 100))
        .await
        .unwrap_err();
    assert_eq!(err.code, "ORDER_NOT_FOUND");

    let err = service
        .create_processor_refund(request("o3", 100))
        .await
        .unwrap_err();
    assert_eq!(err.code, "ORDER_NOT_PAID");

    let err = service
        .create_processor_refund(request("o4", 100))
        .await
        .unwrap_err();
    assert_eq!(err.code, "NOT_PROCESSOR_PAID");

    let err = service
        .create_processor_refund(request("o2", 0))
        .await
        .unwrap_err();
    assert_eq!(err.code, "INVALID_AMOUNT");

    let mut bad_reason = request("o2", 100);
    bad_reason.reason_code = Some("because".to_string());
    let err = service.create_processor_refund(bad_reason).await.unwrap_err();
    assert_eq!(err.code, "INVALID_REASON_CODE");

    // 超额请求在任何写入/外呼之前被拒
    let err = service
        .create_processor_refund(request("o2", 15000))
        .await
        .unwrap_err();
    assert_eq!(err.code, "EXCEEDS_REFUNDABLE");

    assert_eq!(provider.call_count(), 0);
    assert!(storage.load_refunds("o2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_failure_leaves_no_partial_state() {
    let (_dir, storage) = setup().await;
    storage
        .insert_order(&paid_order("o5", 10000, Some("pi_5")))
        .await
        .unwrap();

    let provider = MockProvider::failing(ProviderError::Timeout("deadline".to_string()));
    let service = RefundService::new(storage.clone(), provider.clone());

    let err = service
        .create_processor_refund(request("o5", 2000))
        .await
        .unwrap_err();
    assert_eq!(err.code, "PROVIDER_TIMEOUT");
    assert_eq!(err.status, 504);

    // 供应商抛错前没有退款行，订单状态不变
    assert!(storage.load_refunds("o5").await.unwrap().is_empty());
    let order = storage.get_order("o5").await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_pending_provider_status_maps_to_refund_pending() {
    let (_dir, storage) = setup().await;
    storage
        .insert_order(&paid_order("o6", 10000, Some("pi_6")))
        .await
        .unwrap();

    let provider = MockProvider::with_status("requires_action");
    let service = RefundService::new(storage.clone(), provider.clone());

    let outcome = service.create_processor_refund(request("o6", 4000)).await.unwrap();
    assert_eq!(outcome.refund.status, RefundStatus::Pending);
    assert_eq!(outcome.payment_status, PaymentStatus::RefundPending);
    assert_eq!(
        outcome.refund.raw_provider_status.as_deref(),
        Some("requires_action")
    );
}

#[tokio::test]
async fn test_manual_refund_enforces_budget_transactionally() {
    let (_dir, storage) = setup().await;
    storage.insert_order(&paid_order("o7", 10000, None)).await.unwrap();

    let provider = MockProvider::succeeding();
    let service = RefundService::new(storage.clone(), provider.clone());

    let outcome = service.create_manual_refund(request("o7", 7000)).await.unwrap();
    assert_eq!(outcome.refund.status, RefundStatus::Pending);
    assert_eq!(outcome.refund.source, RefundSource::Manual);
    assert!(outcome.refund.provider_ref.is_none());

    // 剩余额度 3000：4000 的第二笔被事务内校验拦截
    let err = service.create_manual_refund(request("o7", 4000)).await.unwrap_err();
    assert_eq!(err.code, "EXCEEDS_REFUNDABLE");

    assert_eq!(storage.load_refunds("o7").await.unwrap().len(), 1);
    // manual 路径从不外呼
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_settlement_is_idempotent_per_provider_ref() {
    let (_dir, storage) = setup().await;
    storage
        .insert_order(&paid_order("o8", 10000, Some("pi_8")))
        .await
        .unwrap();

    let provider = MockProvider::with_status("pending");
    let service = RefundService::new(storage.clone(), provider.clone());

    let outcome = service
        .create_processor_refund(request("o8", 10000))
        .await
        .unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::RefundPending);
    let provider_ref = outcome.refund.provider_ref.clone().unwrap();

    // 第一次结算推进 pending → processed
    let settled = service
        .apply_settlement(&provider_ref, "succeeded")
        .await
        .unwrap()
        .expect("first settlement settles the row");
    assert_eq!(settled.refund.status, RefundStatus::Processed);
    assert_eq!(settled.payment_status, PaymentStatus::Refunded);

    // 重复投递找不到 pending 行，是 no-op
    let repeat = service
        .apply_settlement(&provider_ref, "succeeded")
        .await
        .unwrap();
    assert!(repeat.is_none());

    let order = storage.get_order("o8").await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Refunded);
}
