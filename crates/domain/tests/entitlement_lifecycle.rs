//! End-to-end lifecycle scenarios run against the in-memory store.

use std::sync::Arc;

use chrono::Duration;
use domain::models::invite_code::INVITE_CODE_REGEX;
use domain::services::{EntitlementPolicy, RecordingActivityLog};
use domain::store::{EntitlementStore, InMemoryStore};
use domain::{EntitlementEngine, EntitlementError};
use uuid::Uuid;

struct Harness {
    store: InMemoryStore,
    engine: EntitlementEngine,
    activity: Arc<RecordingActivityLog>,
    admin_id: Uuid,
}

fn harness() -> Harness {
    let store = InMemoryStore::new();
    let activity = Arc::new(RecordingActivityLog::new());
    let engine = EntitlementEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        activity.clone(),
        EntitlementPolicy::default(),
    );
    Harness {
        store,
        engine,
        activity,
        admin_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn license_key_extend_revoke_reactivate() {
    let h = harness();
    let product = h.store.add_product("fatality", "Fatality").await;
    let user = h.store.add_user("u").await;

    let key = h
        .engine
        .license_keys
        .generate(product.id, 30, h.admin_id)
        .await
        .unwrap();
    let activated_at = h.store.clock_now();
    let activation = h.engine.license_keys.activate(&key.code, user.id).await.unwrap();
    assert_eq!(activation.end_date, activated_at + Duration::days(30));

    let extended = h
        .engine
        .subscriptions
        .extend(user.id, product.id, 10, h.admin_id)
        .await
        .unwrap();
    assert_eq!(extended.end_date, activated_at + Duration::days(40));

    h.engine
        .subscriptions
        .revoke(user.id, product.id, h.admin_id)
        .await
        .unwrap();
    let revoked = h
        .store
        .find_subscription(user.id, product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!revoked.is_active);
    assert_eq!(revoked.end_date, activated_at + Duration::days(40));

    h.store.advance_clock(Duration::hours(1));
    let reactivated_at = h.store.clock_now();
    let fresh_key = h
        .engine
        .license_keys
        .generate(product.id, 30, h.admin_id)
        .await
        .unwrap();
    let fresh = h
        .engine
        .license_keys
        .activate(&fresh_key.code, user.id)
        .await
        .unwrap();
    assert!(!fresh.extended);
    assert_eq!(fresh.start_date, reactivated_at);
    assert_eq!(fresh.end_date, reactivated_at + Duration::days(30));

    let row = h
        .store
        .find_subscription(user.id, product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.id, revoked.id, "the pair keeps a single row");
    assert!(row.is_active);
}

#[tokio::test]
async fn invite_codes_are_single_use() {
    let h = harness();

    let codes = h.engine.invites.generate(5, h.admin_id).await.unwrap();
    assert_eq!(codes.len(), 5);
    for invite in &codes {
        assert!(INVITE_CODE_REGEX.is_match(&invite.code));
    }
    let mut distinct: Vec<_> = codes.iter().map(|c| c.code.as_str()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 5);

    let code = &codes[0].code;
    let first = Uuid::new_v4();
    assert!(h.engine.invites.validate(code).await.unwrap());
    assert!(h.engine.invites.consume(code, first).await.unwrap());

    // A second registration with the same code.
    assert!(!h.engine.invites.validate(code).await.unwrap());
    assert!(!h.engine.invites.consume(code, Uuid::new_v4()).await.unwrap());
    let stored = h.store.find_invite_code(code).await.unwrap().unwrap();
    assert_eq!(stored.used_by, Some(first));
}

#[tokio::test]
async fn concurrent_activation_exactly_one_succeeds() {
    let h = harness();
    let product = h.store.add_product("fatality", "Fatality").await;
    let a = h.store.add_user("a").await;
    let b = h.store.add_user("b").await;
    let key = h
        .engine
        .license_keys
        .generate(product.id, 30, h.admin_id)
        .await
        .unwrap();
    h.store.interleave_lookups(true);

    let (a_id, b_id) = (a.id, b.id);
    let engine_a = h.engine.clone();
    let engine_b = h.engine.clone();
    let code_a = key.code.clone();
    let code_b = key.code.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { engine_a.license_keys.activate(&code_a, a_id).await }),
        tokio::spawn(async move { engine_b.license_keys.activate(&code_b, b_id).await }),
    );
    let results = [ra.unwrap(), rb.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(EntitlementError::AlreadyUsed { .. })))
            .count(),
        1
    );
    assert_eq!(h.store.missed_conditional_writes(), 1);

    let mut subscribed = 0;
    for user_id in [a_id, b_id] {
        if h.store
            .find_subscription(user_id, product.id)
            .await
            .unwrap()
            .is_some()
        {
            subscribed += 1;
        }
    }
    assert_eq!(subscribed, 1, "the losing activation left no subscription");
}

#[tokio::test]
async fn hwid_cooldown_cycle() {
    let h = harness();
    let user = h.store.add_user("u").await;

    let first = h.store.clock_now();
    h.engine.hwid.self_reset(user.id).await.unwrap();

    match h.engine.hwid.self_reset(user.id).await {
        Err(EntitlementError::Throttled { next_eligible_at }) => {
            assert_eq!(next_eligible_at, first + Duration::days(14))
        }
        other => panic!("expected Throttled, got {:?}", other),
    }

    h.store.advance_clock(Duration::days(14) + Duration::seconds(1));
    h.engine.hwid.self_reset(user.id).await.unwrap();

    let status = h.engine.hwid.status(user.id).await.unwrap();
    assert_eq!(status.reset_count, 2);
    assert!(!status.can_reset);
}

#[tokio::test]
async fn download_token_lifecycle() {
    let h = harness();
    let product = h.store.add_product("fatality", "Fatality").await;
    h.store
        .add_loader(product.id, "fatality", "loader.exe", Some(vec![1, 2, 3, 4]))
        .await;
    let owner = h.store.add_user("owner").await;
    let intruder = h.store.add_user("intruder").await;

    let issued = h
        .engine
        .downloads
        .issue("fatality", owner.id, Some("203.0.113.7".into()), None)
        .await
        .unwrap();
    let again = h
        .engine
        .downloads
        .issue("fatality", owner.id, None, None)
        .await
        .unwrap();
    assert!(again.reused);
    assert_eq!(again.token, issued.token);
    assert_eq!(h.store.download_token_count().await, 1);

    assert!(matches!(
        h.engine.downloads.consume(&issued.token, intruder.id).await,
        Err(EntitlementError::SecurityViolation)
    ));
    assert_eq!(
        h.activity
            .actions("download_token.identity_mismatch")
            .len(),
        1
    );

    let payload = h
        .engine
        .downloads
        .consume(&issued.token, owner.id)
        .await
        .unwrap();
    assert_eq!(payload.payload, vec![1, 2, 3, 4]);
    assert_eq!(payload.filename, "loader.exe");

    assert!(matches!(
        h.engine.downloads.consume(&issued.token, owner.id).await,
        Err(EntitlementError::InvalidOrExpired)
    ));

    let stale = h
        .engine
        .downloads
        .issue("fatality", owner.id, None, None)
        .await
        .unwrap();
    assert!(!stale.reused);
    h.store.advance_clock(Duration::minutes(31));
    assert!(matches!(
        h.engine.downloads.consume(&stale.token, owner.id).await,
        Err(EntitlementError::InvalidOrExpired)
    ));
    assert_eq!(h.engine.downloads.cleanup().await.unwrap(), 2);
}
