// SPDX-License-Identifier: MIT

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn port_defaults_to_8080() {
    std::env::remove_var("PORT");
    assert_eq!(port(), 8080);
}

#[test]
#[serial]
fn port_parses_override() {
    std::env::set_var("PORT", "9999");
    assert_eq!(port(), 9999);
    std::env::remove_var("PORT");
}

#[test]
#[serial]
fn cors_origins_splits_and_trims() {
    std::env::set_var("CORS_ORIGINS", "https://a.example, https://b.example");
    assert_eq!(cors_origins(), vec!["https://a.example", "https://b.example"]);
    std::env::remove_var("CORS_ORIGINS");
}

#[test]
#[serial]
fn cors_origins_empty_when_unset() {
    std::env::remove_var("CORS_ORIGINS");
    assert!(cors_origins().is_empty());
}

#[test]
#[serial]
fn auth_disabled_recognizes_true_and_one() {
    std::env::set_var("AUTH_DISABLED", "true");
    assert!(auth_disabled());
    std::env::set_var("AUTH_DISABLED", "1");
    assert!(auth_disabled());
    std::env::remove_var("AUTH_DISABLED");
    assert!(!auth_disabled());
}
