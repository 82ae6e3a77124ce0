//! Login-attempt reset before login scenarios

use storefront_e2e::config::DatabaseConfig;
use storefront_e2e::db::LoginAttemptStore;
use tempfile::TempDir;

const VALID_EMAIL: &str = "validEmail@gmail.com";

#[test]
fn reset_removes_only_the_given_email() {
    let store = LoginAttemptStore::open_memory("oc_customer_login").unwrap();
    store.record_attempt(VALID_EMAIL, "127.0.0.1").unwrap();
    store.record_attempt(VALID_EMAIL, "127.0.0.1").unwrap();
    store.record_attempt("other@example.com", "10.0.0.2").unwrap();

    assert_eq!(store.reset_login_attempts(VALID_EMAIL).unwrap(), 2);
    assert_eq!(store.attempts(VALID_EMAIL).unwrap(), 0);
    assert_eq!(store.attempts("other@example.com").unwrap(), 1);
}

#[test]
fn reset_is_a_no_op_without_records() {
    let store = LoginAttemptStore::open_memory("oc_customer_login").unwrap();
    assert_eq!(store.reset_login_attempts(VALID_EMAIL).unwrap(), 0);
}

#[test]
fn email_is_bound_not_interpolated() {
    let store = LoginAttemptStore::open_memory("oc_customer_login").unwrap();
    store.record_attempt(VALID_EMAIL, "127.0.0.1").unwrap();

    assert_eq!(store.reset_login_attempts("' OR '1'='1").unwrap(), 0);
    assert_eq!(store.attempts(VALID_EMAIL).unwrap(), 1);
}

#[test]
fn records_persist_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let config = DatabaseConfig {
        path: tmp.path().join("opencart.db"),
        ..Default::default()
    };

    {
        let store = LoginAttemptStore::from_config(&config).unwrap();
        store.record_attempt(VALID_EMAIL, "127.0.0.1").unwrap();
    }

    let store = LoginAttemptStore::from_config(&config).unwrap();
    assert_eq!(store.attempts(VALID_EMAIL).unwrap(), 1);
    assert_eq!(store.reset_login_attempts(VALID_EMAIL).unwrap(), 1);
}
