// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn empty_remainder_becomes_files_root() {
    assert_eq!(rewrite_path("/proxy/wsh-1/3", "wsh-1", 3), "/files");
}

#[test]
fn nested_path_is_preserved_after_the_prefix() {
    assert_eq!(rewrite_path("/proxy/wsh-1/3/notebooks/a.ipynb", "wsh-1", 3), "/notebooks/a.ipynb");
}

#[test]
fn mismatched_prefix_falls_back_to_files_root() {
    assert_eq!(rewrite_path("/something/else", "wsh-1", 3), "/files");
}
