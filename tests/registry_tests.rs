// SPDX-License-Identifier: MIT

//! Registry contract: snapshot semantics and no-op mutations on unknown IDs.

use chrono::{Duration, Utc};

use graph_watch::models::{SubscriptionRecord, TokenSet};
use graph_watch::registry::{MemoryRegistry, UserRegistry};

mod common;
use common::user_record;

#[tokio::test]
async fn list_all_returns_a_point_in_time_snapshot() {
    let registry = MemoryRegistry::new();
    registry
        .save_user(user_record("u1", Duration::hours(1), &[]))
        .await;

    let snapshot = registry.list_all().await;
    assert_eq!(snapshot.len(), 1);

    // Mutations after the call do not affect the returned sequence.
    registry.remove_user("u1").await;
    registry
        .save_user(user_record("u2", Duration::hours(1), &[]))
        .await;

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].user_id, "u1");
}

#[tokio::test]
async fn save_user_replaces_existing_record() {
    let registry = MemoryRegistry::new();
    registry
        .save_user(user_record("u1", Duration::hours(1), &[("s1", Duration::hours(1))]))
        .await;
    registry
        .save_user(user_record("u1", Duration::hours(2), &[]))
        .await;

    let all = registry.list_all().await;
    assert_eq!(all.len(), 1);
    assert!(all[0].subscriptions.is_empty());
}

#[tokio::test]
async fn mutations_on_unknown_ids_are_no_ops() {
    let registry = MemoryRegistry::new();
    let record = user_record("present", Duration::hours(1), &[("s1", Duration::hours(1))]);
    let tokens = TokenSet {
        access_token: "new".to_string(),
        expires_at: Utc::now() + Duration::hours(2),
        account: record.account.clone(),
    };
    registry.save_user(record).await;

    // None of these may fail the caller.
    registry.update_credential("absent", &tokens).await;
    registry
        .add_subscription(
            "absent",
            SubscriptionRecord {
                id: "sx".to_string(),
                resource: "/me/messages".to_string(),
                expires_at: Utc::now(),
            },
        )
        .await;
    registry
        .update_subscription_expiry("absent", "s1", Utc::now())
        .await;
    registry
        .update_subscription_expiry("present", "unknown-sub", Utc::now())
        .await;
    registry.remove_subscription("absent", "s1").await;
    registry.remove_subscription("present", "unknown-sub").await;
    assert!(!registry.remove_user("absent").await);

    // The present record is untouched by the unknown-ID calls.
    let user = registry.get_user("present").await.unwrap();
    assert_eq!(user.access_token, "at-present");
    assert_eq!(user.subscriptions.len(), 1);
}

#[tokio::test]
async fn update_credential_touches_only_token_fields() {
    let registry = MemoryRegistry::new();
    let record = user_record("u1", Duration::minutes(5), &[("s1", Duration::hours(1))]);
    let sub_expiry = record.subscriptions[0].expires_at;
    let account = record.account.clone();
    registry.save_user(record).await;

    let new_expiry = Utc::now() + Duration::hours(1);
    registry
        .update_credential(
            "u1",
            &TokenSet {
                access_token: "fresh".to_string(),
                expires_at: new_expiry,
                account,
            },
        )
        .await;

    let user = registry.get_user("u1").await.unwrap();
    assert_eq!(user.access_token, "fresh");
    assert_eq!(user.token_expires_at, new_expiry);
    // Renewing the credential never implicitly renews a subscription.
    assert_eq!(user.subscriptions[0].expires_at, sub_expiry);
}

#[tokio::test]
async fn update_subscription_expiry_targets_one_record() {
    let registry = MemoryRegistry::new();
    let record = user_record(
        "u1",
        Duration::hours(1),
        &[("s1", Duration::minutes(30)), ("s2", Duration::minutes(40))],
    );
    let s2_expiry = record.subscriptions[1].expires_at;
    let token_expiry = record.token_expires_at;
    registry.save_user(record).await;

    let new_expiry = Utc::now() + Duration::minutes(4230);
    registry
        .update_subscription_expiry("u1", "s1", new_expiry)
        .await;

    let user = registry.get_user("u1").await.unwrap();
    assert_eq!(user.subscriptions[0].expires_at, new_expiry);
    assert_eq!(user.subscriptions[1].expires_at, s2_expiry);
    // Renewing a subscription never implicitly renews the credential.
    assert_eq!(user.token_expires_at, token_expiry);
}

#[tokio::test]
async fn remove_subscription_drops_only_the_target() {
    let registry = MemoryRegistry::new();
    registry
        .save_user(user_record(
            "u1",
            Duration::hours(1),
            &[("s1", Duration::hours(1)), ("s2", Duration::hours(1))],
        ))
        .await;

    registry.remove_subscription("u1", "s1").await;

    let user = registry.get_user("u1").await.unwrap();
    assert_eq!(user.subscriptions.len(), 1);
    assert_eq!(user.subscriptions[0].id, "s2");
}
