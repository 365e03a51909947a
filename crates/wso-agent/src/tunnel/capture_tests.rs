// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn scan_line_matches_a_trycloudflare_url() {
    let pattern = url_pattern("trycloudflare.com");
    let line = "2026-07-28T00:00:00Z INF |  https://calm-breeze-1234.trycloudflare.com  |";
    assert_eq!(scan_line(line, &pattern).as_deref(), Some("https://calm-breeze-1234.trycloudflare.com"));
}

#[test]
fn scan_line_ignores_unrelated_hosts() {
    let pattern = url_pattern("trycloudflare.com");
    assert_eq!(scan_line("https://example.com/health", &pattern), None);
}

#[test]
fn url_pattern_escapes_dots_in_the_host_suffix() {
    let pattern = url_pattern("trycloudflare.com");
    // "trycloudflareXcom" must not match even though "." would match "X" if
    // the dot were left unescaped.
    assert_eq!(scan_line("https://abc.trycloudflareXcom", &pattern), None);
}

#[tokio::test]
async fn wait_for_url_finds_a_match_on_stdout() {
    let pattern = url_pattern("trycloudflare.com");
    let stdout = std::io::Cursor::new(b"starting up\nhttps://abc-def.trycloudflare.com\n".to_vec());
    let stderr = std::io::Cursor::new(Vec::new());
    let url = wait_for_url(stdout, stderr, &pattern, std::time::Duration::from_secs(2)).await;
    assert_eq!(url.as_deref(), Some("https://abc-def.trycloudflare.com"));
}

#[tokio::test]
async fn wait_for_url_finds_a_match_on_stderr() {
    let pattern = url_pattern("trycloudflare.com");
    let stdout = std::io::Cursor::new(Vec::new());
    let stderr = std::io::Cursor::new(b"warn: retrying\nhttps://zzz-111.trycloudflare.com\n".to_vec());
    let url = wait_for_url(stdout, stderr, &pattern, std::time::Duration::from_secs(2)).await;
    assert_eq!(url.as_deref(), Some("https://zzz-111.trycloudflare.com"));
}

#[tokio::test]
async fn wait_for_url_times_out_when_no_url_appears() {
    let pattern = url_pattern("trycloudflare.com");
    let stdout = std::io::Cursor::new(b"still booting\n".to_vec());
    let stderr = std::io::Cursor::new(Vec::new());
    let url = wait_for_url(stdout, stderr, &pattern, std::time::Duration::from_millis(50)).await;
    assert_eq!(url, None);
}
