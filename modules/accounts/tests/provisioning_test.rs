//! Profile reconciliation against a migrated SQLite store.

mod common;

use accounts::contract::model::{ProfileDefaults, ProvisionReport};
use accounts::domain::events::AccountOutcome;
use accounts::domain::service::ServiceConfig;
use common::{Fault, FaultyStore, RendezvousStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

#[tokio::test]
async fn provisions_only_users_without_profile() {
    let t = common::setup().await;
    common::seed_users(&t.db, &[1, 2, 3]).await;
    common::seed_profile(&t.db, 1, "dark").await;
    let (service, _) = common::service(&t.db);

    let report = service.reconcile_profiles().await.unwrap();

    assert_eq!(
        report,
        ProvisionReport {
            provisioned: vec![2, 3],
            already_existed: vec![],
            dry_run: false,
        }
    );
    assert_eq!(common::profile_user_ids(&t.db).await, vec![1, 2, 3]);

    // The pre-existing profile is left alone.
    let profiles = common::profiles(&t.db).await;
    assert_eq!(profiles[0].theme, "dark");
    assert_eq!(profiles[0].timezone, "Europe/Berlin");
}

#[tokio::test]
async fn new_profiles_get_default_settings() {
    let t = common::setup().await;
    common::seed_users(&t.db, &[10, 11]).await;
    let (service, _) = common::service(&t.db);

    service.reconcile_profiles().await.unwrap();

    for p in common::profiles(&t.db).await {
        assert_eq!(p.timezone, "UTC");
        assert_eq!(p.language, "en");
        assert_eq!(p.theme, "system");
        assert_eq!(p.created_at, p.updated_at);
    }
}

#[tokio::test]
async fn configured_defaults_are_applied() {
    let t = common::setup().await;
    common::seed_users(&t.db, &[1]).await;
    let config = ServiceConfig {
        profile_defaults: ProfileDefaults {
            timezone: "America/New_York".to_string(),
            language: "fr".to_string(),
            theme: "dark".to_string(),
        },
        ..Default::default()
    };
    let (service, _) = common::service_with(common::sea_store(&t.db), config);

    service.reconcile_profiles().await.unwrap();

    let p = &common::profiles(&t.db).await[0];
    assert_eq!(p.timezone, "America/New_York");
    assert_eq!(p.language, "fr");
    assert_eq!(p.theme, "dark");
}

#[tokio::test]
async fn second_run_is_a_noop() {
    let t = common::setup().await;
    common::seed_users(&t.db, &[1, 2, 3, 4]).await;
    let (service, sink) = common::service(&t.db);

    let first = service.reconcile_profiles().await.unwrap();
    assert_eq!(first.provisioned, vec![1, 2, 3, 4]);
    let before = common::profiles(&t.db).await;

    let second = service.reconcile_profiles().await.unwrap();
    assert!(second.is_noop());
    assert_eq!(common::profiles(&t.db).await, before);

    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        outcomes[1],
        AccountOutcome::ProfilesReconciled {
            provisioned: 0,
            skipped: 0,
            ..
        }
    ));
}

#[tokio::test]
async fn empty_user_set_yields_empty_report() {
    let t = common::setup().await;
    let (service, _) = common::service(&t.db);

    let report = service.reconcile_profiles().await.unwrap();

    assert!(report.is_noop());
    assert!(common::profiles(&t.db).await.is_empty());
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let t = common::setup().await;
    common::seed_users(&t.db, &[1, 2, 3]).await;
    common::seed_profile(&t.db, 1, "light").await;
    let config = ServiceConfig {
        dry_run: true,
        ..Default::default()
    };
    let (service, sink) = common::service_with(common::sea_store(&t.db), config);

    let report = service.reconcile_profiles().await.unwrap();

    assert_eq!(report.provisioned, vec![2, 3]);
    assert!(report.dry_run);
    assert_eq!(common::profile_user_ids(&t.db).await, vec![1]);
    assert!(matches!(
        sink.outcomes()[0],
        AccountOutcome::ProfilesReconciled {
            provisioned: 2,
            dry_run: true,
            ..
        }
    ));
}

#[tokio::test]
async fn lost_uniqueness_race_is_reported_not_fatal() {
    let t = common::setup().await;
    common::seed_users(&t.db, &[1, 2, 3]).await;
    common::seed_profile(&t.db, 2, "dark").await;
    // The scan still believes user 2 needs a profile.
    let store = FaultyStore::wrap(common::sea_store(&t.db), Fault::StaleScan(vec![2]));
    let (service, sink) = common::service_with(store, ServiceConfig::default());

    let report = service.reconcile_profiles().await.unwrap();

    assert_eq!(report.provisioned, vec![1, 3]);
    assert_eq!(report.already_existed, vec![2]);
    assert_eq!(common::profile_user_ids(&t.db).await, vec![1, 2, 3]);
    assert_eq!(common::profiles(&t.db).await[1].theme, "dark");
    assert!(matches!(
        sink.outcomes()[0],
        AccountOutcome::ProfilesReconciled {
            provisioned: 2,
            skipped: 1,
            ..
        }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_passes_both_succeed() {
    let t = common::setup().await;
    common::seed_users(&t.db, &[1, 2, 3]).await;
    let barrier = Arc::new(Barrier::new(2));
    let patience = Duration::from_millis(300);
    let (a, _) = common::service_with(
        RendezvousStore::wrap(common::sea_store(&t.db), barrier.clone(), patience),
        ServiceConfig::default(),
    );
    let (b, _) = common::service_with(
        RendezvousStore::wrap(common::sea_store(&t.db), barrier, patience),
        ServiceConfig::default(),
    );

    let (ra, rb) = tokio::join!(a.reconcile_profiles(), b.reconcile_profiles());

    let ra = ra.unwrap();
    let rb = rb.unwrap();
    let mut provisioned: Vec<i64> = ra
        .provisioned
        .iter()
        .chain(&rb.provisioned)
        .copied()
        .collect();
    provisioned.sort_unstable();
    assert_eq!(provisioned, vec![1, 2, 3], "each user provisioned exactly once");
    let mut covered: Vec<i64> = provisioned
        .iter()
        .chain(&ra.already_existed)
        .chain(&rb.already_existed)
        .copied()
        .collect();
    covered.sort_unstable();
    covered.dedup();
    assert_eq!(covered, vec![1, 2, 3]);
    assert_eq!(common::profile_user_ids(&t.db).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn store_failure_mid_pass_leaves_no_partial_profiles() {
    let t = common::setup().await;
    common::seed_users(&t.db, &[1, 2, 3]).await;
    let store = FaultyStore::wrap(common::sea_store(&t.db), Fault::InsertProfile(2));
    let (service, sink) = common::service_with(store, ServiceConfig::default());

    let err = service.reconcile_profiles().await.unwrap_err();

    assert!(err.is_store());
    assert!(err.to_string().contains("user 3"), "{err}");
    assert!(common::profiles(&t.db).await.is_empty());
    assert!(sink.outcomes()[0].is_failure());

    // A clean rerun completes the job.
    let (service, _) = common::service(&t.db);
    let report = service.reconcile_profiles().await.unwrap();
    assert_eq!(report.provisioned, vec![1, 2, 3]);
}
