// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn new_registration_is_registered_with_no_seat() {
    let reg = Registration::new(WorkshopId::new(), Some("ada@example.com".into()));
    assert_eq!(reg.status, RegistrationStatus::Registered);
    assert!(reg.seat_id.is_none());
}

#[test]
fn access_code_matches_format() {
    let reg = Registration::new(WorkshopId::new(), None);
    let parts: Vec<&str> = reg.access_code.split('-').collect();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].len(), 3);
    assert_eq!(parts[1].len(), 4);
}

#[test]
fn access_code_excludes_ambiguous_characters() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let code = generate_access_code(&mut rng);
        for ch in code.chars().filter(|c| *c != '-') {
            assert!(!matches!(ch, '0' | 'O' | '1' | 'I'), "ambiguous char {ch} in {code}");
        }
    }
}

#[test]
fn workshop_code_is_nine_chars() {
    let mut rng = rand::thread_rng();
    let code = generate_workshop_code(&mut rng);
    assert_eq!(code.len(), 9);
}

#[test]
fn redeem_assigns_seat_and_activates() {
    let mut reg = Registration::new(WorkshopId::new(), Some("ada@example.com".into()));
    reg.redeem(2);
    assert_eq!(reg.seat_id, Some(2));
    assert_eq!(reg.status, RegistrationStatus::Active);
}
