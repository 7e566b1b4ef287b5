//! Registry integration tests against the file-backed store.
//! Layout: ~/.appmgr/registry.yaml (flat key → value mapping)

use appmgr_core::{
    registry::{self, RegistryClient},
    store::registry_path_at,
    AppName, ConfigStore, InstanceType, Priority, StoreError, YamlStore,
};
use assert_fs::prelude::*;
use predicates::prelude::predicate;
use std::fs;

fn clock() -> AppName {
    AppName::new("clock").expect("valid")
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn corrupt_registry_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = registry_path_at(home.path());
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(&path, b": : corrupt : yaml : !!!\n  - broken: [unclosed").expect("write");

    let client = RegistryClient::new(YamlStore::open_at(home.path()));
    let err = client.app_id(&clock()).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("registry.yaml"));
}

#[test]
fn wrong_value_type_is_a_mismatch_not_a_default() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".appmgr/registry.yaml")
        .write_str("/appmgr/clock/info/AppID: not-a-number\n")
        .expect("write");

    let client = RegistryClient::new(YamlStore::open_at(home.path()));
    let err = client.app_id(&clock()).unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Shared-store semantics
// ---------------------------------------------------------------------------

#[test]
fn values_written_by_another_handle_are_observed() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let reader = RegistryClient::new(YamlStore::open_at(home.path()));
    assert!(!reader.shutdown_flag().expect("flag"));

    let mut writer = RegistryClient::new(YamlStore::open_at(home.path()));
    writer.set_shutdown_flag(true).expect("set flag");

    assert!(reader.shutdown_flag().expect("flag"));
}

#[test]
fn registration_metadata_lands_in_registry_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut client = RegistryClient::new(YamlStore::open_at(home.path()));
    client.set_pid(&clock(), 4242).expect("pid");
    client.set_priority(&clock(), Priority::CRITICAL).expect("prio");
    client.set_visibility(&clock(), false).expect("vis");

    home.child(".appmgr/registry.yaml")
        .assert(predicate::str::contains("/appmgr/clock/info/PID: 4242"));
    assert_eq!(client.list_apps().expect("apps"), vec![clock()]);
    assert_eq!(client.priority_for_pid(4242).expect("prio"), Some(Priority::CRITICAL));
}

#[test]
fn multi_instance_flag_is_keyed_by_app_id() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut store = YamlStore::open_at(home.path());
    store
        .set_int(&registry::app_id_key(&clock()), 7)
        .expect("app id");
    store
        .set_bool(&registry::multi_instance_key(7), true)
        .expect("flag");

    let client = RegistryClient::new(store);
    let app_id = client.app_id(&clock()).expect("id");
    assert_eq!(app_id, 7);
    assert_eq!(
        client.instance_type(app_id).expect("type"),
        Some(InstanceType::Multiple)
    );
}
