// SPDX-License-Identifier: MIT

use super::*;
use tokio::net::TcpListener;

#[tokio::test]
async fn probe_port_succeeds_against_a_listening_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    assert!(probe_port("127.0.0.1", port).await);
}

#[tokio::test]
async fn probe_port_fails_against_a_closed_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    assert!(!probe_port("127.0.0.1", port).await);
}
