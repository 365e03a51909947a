// SPDX-License-Identifier: MIT

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn port_defaults_to_9090() {
    std::env::remove_var("PORT");
    assert_eq!(port(), 9090);
}

#[test]
#[serial]
fn capacity_defaults_to_50() {
    std::env::remove_var("CAPACITY");
    assert_eq!(capacity(), 50);
}

#[test]
#[serial]
fn capacity_parses_override() {
    std::env::set_var("CAPACITY", "4");
    assert_eq!(capacity(), 4);
    std::env::remove_var("CAPACITY");
}

#[test]
#[serial]
fn agent_token_empty_when_unset() {
    std::env::remove_var("AGENT_TOKEN");
    assert_eq!(agent_token(), "");
}

#[test]
#[serial]
fn bridge_ip_defaults_to_spec_value() {
    std::env::remove_var("BRIDGE_IP");
    assert_eq!(bridge_ip(), "192.168.100.1/24");
}

#[test]
#[serial]
fn tunnel_bin_defaults_to_cloudflared() {
    std::env::remove_var("TUNNEL_BIN");
    assert_eq!(tunnel_bin(), "cloudflared");
}

#[test]
#[serial]
fn tunnel_host_defaults_to_trycloudflare() {
    std::env::remove_var("TUNNEL_HOST");
    assert_eq!(tunnel_host(), "trycloudflare.com");
}

#[test]
#[serial]
fn dev_mode_recognizes_true_and_one() {
    std::env::set_var("DEV_MODE", "true");
    assert!(dev_mode());
    std::env::set_var("DEV_MODE", "1");
    assert!(dev_mode());
    std::env::remove_var("DEV_MODE");
    assert!(!dev_mode());
}
