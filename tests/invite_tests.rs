//! 邀请兑换集成测试
//!
//! 核心验证并发下的 at-most-N 保证：条件 UPDATE 是唯一的成功信号。

use std::sync::Arc;
use std::sync::Once;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use moneta::config::init_config;
use moneta::services::{InviteService, RedeemIdentity, RedeemOutcome};
use moneta::storage::backend::SeaOrmStorage;
use moneta::storage::models::AffiliateInvite;

static INIT: Once = Once::new();

fn init_static_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn setup() -> (TempDir, Arc<SeaOrmStorage>) {
    init_static_config();
    let temp_dir = TempDir::new().expect("创建临时目录失败");
    let db_path = temp_dir.path().join("invite_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("创建存储失败"),
    );
    (temp_dir, storage)
}

fn invite(id: &str, max_uses: Option<i32>) -> AffiliateInvite {
    AffiliateInvite {
        id: id.to_string(),
        invite_code: format!("CODE-{}", id),
        target_email: None,
        target_phone: None,
        max_uses,
        times_used: 0,
        expires_at: None,
        used_by_affiliate_id: None,
        used_at: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_single_use_invite_under_concurrency() {
    let (_dir, storage) = setup().await;
    storage.insert_invite(&invite("inv_race", Some(1))).await.unwrap();

    let service = Arc::new(InviteService::new(storage.clone()));

    // maxUses=1，10 个并发兑换：恰好 1 个成功
    let mut handles = Vec::new();
    for i in 0..10 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .redeem_invite(
                    "inv_race",
                    &format!("af_{}", i),
                    &RedeemIdentity::default(),
                    None,
                )
                .await
                .unwrap()
        }));
    }

    let mut redeemed = 0;
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            RedeemOutcome::Redeemed(_) => redeemed += 1,
            RedeemOutcome::Exhausted => exhausted += 1,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(redeemed, 1);
    assert_eq!(exhausted, 9);

    let row = storage.get_invite("inv_race").await.unwrap().unwrap();
    assert_eq!(row.times_used, 1);
    assert!(row.used_by_affiliate_id.is_some());

    // 成功的兑换留下恰好一条审计行
    assert_eq!(storage.count_invite_usages("inv_race").await.unwrap(), 1);
}

#[tokio::test]
async fn test_multi_use_invite_caps_at_max() {
    let (_dir, storage) = setup().await;
    storage.insert_invite(&invite("inv_3", Some(3))).await.unwrap();

    let service = Arc::new(InviteService::new(storage.clone()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .redeem_invite("inv_3", &format!("af_{}", i), &RedeemIdentity::default(), None)
                .await
                .unwrap()
        }));
    }

    let mut redeemed = 0;
    for handle in handles {
        if handle.await.unwrap().is_redeemed() {
            redeemed += 1;
        }
    }
    assert_eq!(redeemed, 3);

    let row = storage.get_invite("inv_3").await.unwrap().unwrap();
    assert_eq!(row.times_used, 3);
    assert_eq!(storage.count_invite_usages("inv_3").await.unwrap(), 3);
}

#[tokio::test]
async fn test_unlimited_invite_never_exhausts() {
    let (_dir, storage) = setup().await;
    storage.insert_invite(&invite("inv_inf", None)).await.unwrap();

    let service = InviteService::new(storage.clone());
    for i in 0..5 {
        let outcome = service
            .redeem_invite("inv_inf", &format!("af_{}", i), &RedeemIdentity::default(), None)
            .await
            .unwrap();
        assert!(outcome.is_redeemed());
    }

    let row = storage.get_invite("inv_inf").await.unwrap().unwrap();
    assert_eq!(row.times_used, 5);
}

#[tokio::test]
async fn test_expired_invite_is_classified() {
    let (_dir, storage) = setup().await;
    let mut expired = invite("inv_old", Some(5));
    expired.expires_at = Some(Utc::now() - Duration::hours(1));
    storage.insert_invite(&expired).await.unwrap();

    let service = InviteService::new(storage.clone());
    let outcome = service
        .redeem_invite("inv_old", "af_1", &RedeemIdentity::default(), None)
        .await
        .unwrap();

    assert!(matches!(outcome, RedeemOutcome::Expired));
    let row = storage.get_invite("inv_old").await.unwrap().unwrap();
    assert_eq!(row.times_used, 0);
}

#[tokio::test]
async fn test_identity_mismatch_consumes_no_use() {
    let (_dir, storage) = setup().await;
    let mut locked = invite("inv_lock", Some(1));
    locked.target_email = Some("alice@example.com".to_string());
    storage.insert_invite(&locked).await.unwrap();

    let service = InviteService::new(storage.clone());

    let wrong = RedeemIdentity {
        email: Some("bob@example.com".to_string()),
        phone: None,
    };
    let outcome = service
        .redeem_invite("inv_lock", "af_bob", &wrong, None)
        .await
        .unwrap();
    assert!(matches!(outcome, RedeemOutcome::IdentityMismatch));

    // 身份失败不消耗次数，正确身份仍可兑换（大小写不敏感）
    let row = storage.get_invite("inv_lock").await.unwrap().unwrap();
    assert_eq!(row.times_used, 0);

    let right = RedeemIdentity {
        email: Some("ALICE@Example.COM".to_string()),
        phone: None,
    };
    let outcome = service
        .redeem_invite("inv_lock", "af_alice", &right, None)
        .await
        .unwrap();
    assert!(outcome.is_redeemed());
}

#[tokio::test]
async fn test_unknown_invite_is_not_found() {
    let (_dir, storage) = setup().await;
    let service = InviteService::new(storage.clone());
    let outcome = service
        .redeem_invite("missing", "af_1", &RedeemIdentity::default(), None)
        .await
        .unwrap();
    assert!(matches!(outcome, RedeemOutcome::NotFound));
}

#[tokio::test]
async fn test_redeem_by_code() {
    let (_dir, storage) = setup().await;
    storage.insert_invite(&invite("inv_code", Some(2))).await.unwrap();

    let service = InviteService::new(storage.clone());
    let outcome = service
        .redeem_by_code("CODE-inv_code", "af_1", &RedeemIdentity::default(), Some("{\"src\":\"test\"}"))
        .await
        .unwrap();
    assert!(outcome.is_redeemed());

    let outcome = service
        .redeem_by_code("NOPE", "af_1", &RedeemIdentity::default(), None)
        .await
        .unwrap();
    assert!(matches!(outcome, RedeemOutcome::NotFound));
}
