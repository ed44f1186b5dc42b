//! Segment integrity code.
//!
//! The checksum stored in a segment is the bitwise complement of a plain sum
//! over `(seq, ack, payload)`.  Because `x + !x == -1` for any `i32`, a
//! receiver recomputes the sum, adds the stored checksum, and treats anything
//! other than `-1` as corruption.  All arithmetic wraps at 32 bits so the
//! builder and the verifier always agree, whatever the inputs.
//!
//! # Character values
//!
//! ASCII digits contribute their decimal value (`'7'` → 7).  Every other
//! character contributes its Unicode scalar value plus 10, which keeps the
//! mapping injective: replacing any single character always changes the sum.

use crate::packet::Segment;

/// Offset added to non-digit characters so they never collide with `0..=9`.
const NON_DIGIT_OFFSET: i32 = 10;

/// Contribution of one payload character to the sum.
#[inline]
fn char_value(c: char) -> i32 {
    match c.to_digit(10) {
        Some(d) => d as i32,
        None => (c as i32).wrapping_add(NON_DIGIT_OFFSET),
    }
}

/// Sum over every payload character, plus `seq` and `ack`.
pub fn compute_sum(seq: i32, ack: i32, payload: &str) -> i32 {
    payload
        .chars()
        .fold(0i32, |sum, c| sum.wrapping_add(char_value(c)))
        .wrapping_add(seq)
        .wrapping_add(ack)
}

/// Checksum to store in a freshly built segment.
pub fn build_checksum(seq: i32, ack: i32, payload: &str) -> i32 {
    !compute_sum(seq, ack, payload)
}

/// `true` when the segment's fields no longer match its checksum.
pub fn is_corrupted(segment: &Segment) -> bool {
    let sum = compute_sum(segment.seq, segment.ack, &segment.payload);
    let total = segment.checksum.wrapping_add(sum);
    log::trace!(
        "checksum check seq={} stored={} sum={} total={}",
        segment.seq,
        segment.checksum,
        sum,
        total
    );
    total != -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seg(seq: i32, ack: i32, payload: &str) -> Segment {
        Segment {
            seq,
            ack,
            checksum: build_checksum(seq, ack, payload),
            payload: payload.to_owned(),
        }
    }

    #[test]
    fn digits_count_by_value() {
        assert_eq!(compute_sum(0, 0, "123"), 6);
        assert_eq!(compute_sum(4, 1, "0"), 5);
    }

    #[test]
    fn letters_are_offset_code_points() {
        assert_eq!(compute_sum(0, 0, "A"), 65 + 10);
        assert_eq!(compute_sum(1, 0, "AB7"), 75 + 76 + 7 + 1);
    }

    #[test]
    fn fresh_segment_verifies() {
        assert!(!is_corrupted(&seg(1, 0, "AB7")));
        assert!(!is_corrupted(&seg(0, 1, "")));
    }

    #[test]
    fn flipped_payload_byte_is_detected() {
        let mut s = seg(1, 0, "AB7");
        s.payload = "AB8".into();
        assert!(is_corrupted(&s));

        let mut s = seg(1, 0, "AB7");
        s.payload = "?B7".into();
        assert!(is_corrupted(&s));
    }

    #[test]
    fn mutated_header_is_detected() {
        let mut s = seg(3, 0, "hello");
        s.seq = 999_999;
        assert!(is_corrupted(&s));

        let mut s = seg(3, 0, "hello");
        s.ack = 999_999;
        assert!(is_corrupted(&s));

        let mut s = seg(3, 0, "hello");
        s.checksum ^= 1;
        assert!(is_corrupted(&s));
    }

    #[test]
    fn extreme_values_wrap_consistently() {
        assert!(!is_corrupted(&seg(i32::MAX, 1, "99999")));
        assert!(!is_corrupted(&seg(i32::MIN, 0, "zz")));
    }

    proptest! {
        #[test]
        fn any_segment_round_trips(
            seq in 0i32..1_000_000,
            ack in 0i32..=1,
            payload in "\\PC{0,20}",
        ) {
            prop_assert!(!is_corrupted(&seg(seq, ack, &payload)));
        }

        #[test]
        fn single_character_substitution_is_detected(
            payload in "[a-zA-Z0-9]{1,20}",
            idx in any::<prop::sample::Index>(),
            replacement in any::<char>(),
        ) {
            let mut chars: Vec<char> = payload.chars().collect();
            let i = idx.index(chars.len());
            prop_assume!(chars[i] != replacement);

            let mut s = seg(7, 0, &payload);
            chars[i] = replacement;
            s.payload = chars.into_iter().collect();
            prop_assert!(is_corrupted(&s));
        }

        #[test]
        fn header_mutation_is_detected(
            seq in 0i32..1_000_000,
            delta in 1i32..1_000_000,
            payload in "[a-z]{0,20}",
        ) {
            let mut s = seg(seq, 0, &payload);
            s.seq = s.seq.wrapping_add(delta);
            prop_assert!(is_corrupted(&s));

            let mut s = seg(seq, 0, &payload);
            s.ack = 1;
            prop_assert!(is_corrupted(&s));
        }
    }
}
