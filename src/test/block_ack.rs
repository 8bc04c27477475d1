use crate::mac::{BaBitmap, BaRecord, BaUpdate, block_ack_length, update_ba_bitmap};

fn acked(r: &BaRecord) -> Vec<u16> {
    r.acked_seqs()
}

#[test]
fn in_window_sequences_are_marked() {
    let mut r = BaRecord::new(0, 64);
    let u = update_ba_bitmap(&mut r, &[0, 1, 2]);
    assert_eq!(u, BaUpdate::default());
    assert_eq!(r.ssn, 0);
    assert_eq!(acked(&r), vec![0, 1, 2]);
    assert!(!r.is_acked(3));
}

#[test]
fn window_advances_to_highest_sequence() {
    let mut r = BaRecord::new(0, 64);
    update_ba_bitmap(&mut r, &[40, 50]);
    let u = update_ba_bitmap(&mut r, &[70]);
    assert_eq!(u.shifted, 7);
    assert_eq!(r.ssn, 7);
    // 仍在窗口内的位保留
    assert!(r.bitmap.get(33));
    assert!(r.bitmap.get(43));
    assert!(r.bitmap.get(63));
    assert_eq!(acked(&r), vec![40, 50, 70]);
}

#[test]
fn large_jump_clears_old_bits() {
    let mut r = BaRecord::new(0, 64);
    update_ba_bitmap(&mut r, &[0, 1, 2]);
    let u = update_ba_bitmap(&mut r, &[200]);
    assert_eq!(u.shifted, 137);
    assert_eq!(r.ssn, 137);
    assert_eq!(r.bitmap.count_ones(), 1);
    assert_eq!(acked(&r), vec![200]);
}

#[test]
fn stale_sequences_do_not_change_state() {
    let mut r = BaRecord::new(100, 64);
    update_ba_bitmap(&mut r, &[105]);
    let before = r.clone();
    let u = update_ba_bitmap(&mut r, &[90]);
    assert_eq!(u.stale, 1);
    assert_eq!(u.shifted, 0);
    assert_eq!(r, before);
    // 窗口之后的序列号视为早已确认
    assert!(r.is_acked(90));
}

#[test]
fn older_update_never_unmarks() {
    let mut r = BaRecord::new(0, 64);
    update_ba_bitmap(&mut r, &[5]);
    update_ba_bitmap(&mut r, &[3]);
    assert!(r.is_acked(5));
    assert!(r.is_acked(3));
    assert!(!r.is_acked(4));
}

#[test]
fn window_wraps_around_modulo() {
    let mut r = BaRecord::new(4090, 64);
    update_ba_bitmap(&mut r, &[4095, 0, 3]);
    assert_eq!(r.ssn, 4090);
    assert!(r.bitmap.get(5));
    assert!(r.bitmap.get(6));
    assert!(r.bitmap.get(9));

    let u = update_ba_bitmap(&mut r, &[60]);
    assert_eq!(u.shifted, 3);
    assert_eq!(r.ssn, 4093);
    assert!(r.is_acked(4095));
    assert!(r.is_acked(0));
    assert!(r.is_acked(3));
    assert!(r.is_acked(60));
    assert!(!r.is_acked(61));
}

#[test]
fn sequences_ahead_of_window_are_not_acked() {
    let r = BaRecord::new(10, 64);
    assert!(!r.is_acked(10));
    assert!(!r.is_acked(74));
    assert!(!r.is_acked(1000));
}

#[test]
fn bitmap_shift_and_lengths() {
    let mut b = BaBitmap::new(256);
    assert_eq!(b.byte_len(), 32);
    b.set(0);
    b.set(100);
    b.set(255);
    b.set(256);
    assert_eq!(b.count_ones(), 3);
    b.shift_down(100);
    assert_eq!(b.ones().collect::<Vec<_>>(), vec![0, 155]);
    b.shift_down(256);
    assert_eq!(b.count_ones(), 0);

    assert_eq!(BaBitmap::new(64).byte_len(), 8);
    assert_eq!(block_ack_length(256) - block_ack_length(64), 24);
}
