// SPDX-License-Identifier: MIT

//! URL capture (spec.md §4.7 step 3): scan stdout and stderr lines from the
//! tunnel subprocess for the first `https://<slug>.<tunnel-host>` match.

use regex::Regex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Build the capture regex for a given tunnel host suffix. `tunnel_host` is
/// trusted configuration (an env var), not attacker input, but dots are
/// still escaped so a host like `trycloudflare.com` doesn't let `.` match
/// an arbitrary character.
pub fn url_pattern(tunnel_host: &str) -> Regex {
    const FALLBACK: &str = r"https://[a-z0-9-]+\.invalid";
    let escaped = regex::escape(tunnel_host);
    Regex::new(&format!(r"https://[a-z0-9-]+\.{escaped}"))
        .unwrap_or_else(|_| Regex::new(FALLBACK).unwrap_or_else(|_| unreachable!("fallback pattern is a fixed valid literal")))
}

/// Scan one line for the first URL match.
pub fn scan_line(line: &str, pattern: &Regex) -> Option<String> {
    pattern.find(line).map(|m| m.as_str().to_string())
}

/// Race two readers line-by-line until `pattern` matches in either, or
/// `deadline` elapses (spec.md §4.7 step 3: "first match wins; further
/// matches are ignored"). Both streams are scanned to completion in the
/// background regardless of which wins; only the first successful match is
/// read off the channel.
pub async fn wait_for_url<R1, R2>(stdout: R1, stderr: R2, pattern: &Regex, deadline: Duration) -> Option<String>
where
    R1: AsyncRead + Unpin + Send + 'static,
    R2: AsyncRead + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(2);

    let pattern_out = pattern.clone();
    let tx_out = tx.clone();
    tokio::spawn(async move {
        if let Some(url) = scan_stream(stdout, &pattern_out).await {
            let _ = tx_out.send(url).await;
        }
    });

    let pattern_err = pattern.clone();
    tokio::spawn(async move {
        if let Some(url) = scan_stream(stderr, &pattern_err).await {
            let _ = tx.send(url).await;
        }
    });

    tokio::time::timeout(deadline, rx.recv()).await.ok().flatten()
}

async fn scan_stream<R: AsyncRead + Unpin>(reader: R, pattern: &Regex) -> Option<String> {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(url) = scan_line(&line, pattern) {
            return Some(url);
        }
    }
    None
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
