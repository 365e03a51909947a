// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn new_seat_is_pending() {
    let seat = Seat::new_pending(WorkshopId::new(), 1);
    assert_eq!(seat.status, SeatStatus::Pending);
    assert!(seat.ip.is_none());
}

#[test]
fn mark_ready_sets_ip_and_status() {
    let mut seat = Seat::new_pending(WorkshopId::new(), 1);
    seat.mark_ready("34.1.2.3");
    assert_eq!(seat.status, SeatStatus::Ready);
    assert_eq!(seat.ip.as_deref(), Some("34.1.2.3"));
}

#[test]
fn mark_occupied_sets_learner_name() {
    let mut seat = Seat::new_pending(WorkshopId::new(), 1);
    seat.mark_ready("34.1.2.3");
    seat.mark_occupied(Some("ada".to_string()));
    assert_eq!(seat.status, SeatStatus::Occupied);
    assert_eq!(seat.learner_name.as_deref(), Some("ada"));
}

#[test]
fn seat_key_display_is_workshop_slash_seat() {
    let wid = WorkshopId::from_string("wsh-abc");
    let key = SeatKey::new(wid, 2);
    assert_eq!(key.to_string(), "wsh-abc/2");
}
