mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{state_key, FaultyStore, Faults, Stores, APP};
use statekeeper::backup::{list_backups, BackupEngine, BackupStatus};
use statekeeper::recovery::RecoveryEngine;
use statekeeper::store::ObjectStore;
use statekeeper::{CommandOutcome, Environment, StateError};

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap()
}

#[test]
fn invalid_identifier_is_rejected_before_any_io() {
    let stores = Stores::new();
    let live = FaultyStore::new(stores.live.clone());
    let backups = FaultyStore::new(stores.backups.clone());
    let backend = stores.backend();

    let result = BackupEngine::new(APP, &live, &backups).backup_at(&["prod"], at());
    assert!(matches!(
        result.failed()[0].1,
        StateError::InvalidEnvironment(_)
    ));

    let recovery = RecoveryEngine::new(APP, &live, &backups, &backend);
    assert!(matches!(
        recovery.list_backups("Staging"),
        Err(StateError::InvalidEnvironment(_))
    ));

    assert_eq!(live.calls.get(), 0);
    assert_eq!(backups.calls.get(), 0);
}

#[test]
fn same_second_backups_share_one_record() {
    let stores = Stores::new();
    stores.live.put(&state_key("production"), b"v1").unwrap();
    let engine = BackupEngine::new(APP, &stores.live, &stores.backups);

    engine.backup_at(&["production"], at());
    stores.live.put(&state_key("production"), b"v2").unwrap();
    engine.backup_at(&["production"], at() + Duration::milliseconds(999));

    let records = list_backups(&stores.backups, APP, Environment::Production).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "shop-production-20250601-083000");
}

#[test]
fn one_failing_environment_does_not_stop_the_batch() {
    let stores = Stores::new();
    for env in ["development", "staging", "production"] {
        stores.live.put(&state_key(env), env.as_bytes()).unwrap();
    }
    let live = FaultyStore::with_faults(
        stores.live.clone(),
        Faults {
            head: vec!["shop/staging/".into()],
            ..Default::default()
        },
    );

    let result = BackupEngine::new(APP, &live, &stores.backups).backup_at(&[], at());

    assert_eq!(result.entries.len(), 3);
    assert_eq!(result.success_count(), 2);
    assert_eq!(result.failure_count(), 1);
    let failed = result.failed();
    assert_eq!(failed[0].0, "staging");
    assert!(matches!(failed[0].1, StateError::TransientIo { .. }));
    assert_eq!(result.outcome(), CommandOutcome::PartialFailure);
    assert_eq!(result.outcome().exit_code(), 2);

    let backed_up: Vec<&str> = result
        .entries
        .iter()
        .filter(|e| matches!(e.status, BackupStatus::BackedUp(_)))
        .map(|e| e.identifier.as_str())
        .collect();
    assert_eq!(backed_up, vec!["development", "production"]);
}

#[test]
fn failed_copy_into_backup_store_is_reported() {
    let stores = Stores::new();
    stores.live.put(&state_key("staging"), b"S0").unwrap();
    let backups = FaultyStore::with_faults(
        stores.backups.clone(),
        Faults {
            put: vec!["backups/".into()],
            ..Default::default()
        },
    );

    let result = BackupEngine::new(APP, &stores.live, &backups).backup_at(&["staging"], at());

    assert_eq!(result.outcome(), CommandOutcome::HardFailure);
    assert!(stores.backups.list("").unwrap().is_empty());
}

#[test]
fn listing_is_empty_or_newest_first() {
    let stores = Stores::new();
    let engine = BackupEngine::new(APP, &stores.live, &stores.backups);
    let recovery_backend = stores.backend();
    let recovery = RecoveryEngine::new(APP, &stores.live, &stores.backups, &recovery_backend);

    assert!(recovery.list_backups("development").unwrap().is_empty());

    stores.live.put(&state_key("development"), b"S").unwrap();
    for hours in [0, 2, 1] {
        engine.backup_at(&["development"], at() + Duration::hours(hours));
    }

    let records = recovery.list_backups("development").unwrap();
    let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "shop-development-20250601-103000",
            "shop-development-20250601-093000",
            "shop-development-20250601-083000",
        ]
    );
    assert!(records.windows(2).all(|w| w[0].captured_at > w[1].captured_at));
}

#[test]
fn listing_failure_is_transient_io() {
    let stores = Stores::new();
    let backups = FaultyStore::with_faults(
        stores.backups.clone(),
        Faults {
            list: true,
            ..Default::default()
        },
    );
    let backend = stores.backend();

    let err = RecoveryEngine::new(APP, &stores.live, &backups, &backend)
        .list_backups("staging")
        .unwrap_err();
    assert!(matches!(err, StateError::TransientIo { .. }));
}
