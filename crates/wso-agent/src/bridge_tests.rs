// SPDX-License-Identifier: MIT

//! Process-invoking `ensure_bridge` needs root and a real `ip` binary, so it
//! is exercised operationally rather than unit tested here; only the pure
//! parsing helper is covered.

use super::*;

#[test]
fn host_part_strips_prefix_length() {
    assert_eq!(host_part("192.168.100.1/24"), "192.168.100.1");
}

#[test]
fn host_part_passes_through_bare_address() {
    assert_eq!(host_part("192.168.100.1"), "192.168.100.1");
}
