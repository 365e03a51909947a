// SPDX-License-Identifier: MIT

//! `bridge` dials a real backend over a real socket, so only the pure
//! message-conversion helpers are unit tested here.

use super::*;

#[test]
fn binary_messages_survive_the_round_trip_unchanged() {
    let original = AxumMessage::Binary(vec![0u8, 1, 2, 255]);
    let tung = to_tungstenite(original.clone());
    let back = to_axum(tung);
    assert_eq!(back, AxumMessage::Binary(vec![0u8, 1, 2, 255]));
}

#[test]
fn text_messages_survive_the_round_trip_unchanged() {
    let original = AxumMessage::Text("hello terminal".to_string());
    let tung = to_tungstenite(original);
    let back = to_axum(tung);
    assert_eq!(back, AxumMessage::Text("hello terminal".to_string()));
}

#[test]
fn close_frame_preserves_code_and_reason() {
    let original = AxumMessage::Close(Some(AxumCloseFrame { code: 1000, reason: "bye".into() }));
    let tung = to_tungstenite(original);
    if let TungMessage::Close(Some(frame)) = &tung {
        assert_eq!(u16::from(frame.code), 1000);
        assert_eq!(frame.reason.as_str(), "bye");
    } else {
        panic!("expected a close frame");
    }
}
