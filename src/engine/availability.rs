use chrono::{NaiveDateTime, TimeDelta};

use crate::model::Slot;

// ── Free-interval computation ─────────────────────────────────────

/// Compute the free slots of one table within a service window.
///
/// `booked` must be sorted ascending by start. Emits the gap before the first
/// booking, each gap between consecutive bookings, and the gap after the last,
/// clipped to `[window_start, window_end)` and kept only when at least
/// `min_duration` long. No bookings → the whole window (if long enough).
/// Inverted or zero-length windows yield nothing.
pub fn free_slots(
    booked: &[Slot],
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
    min_duration: TimeDelta,
) -> Vec<Slot> {
    let mut free = Vec::new();
    if window_start >= window_end {
        return free;
    }

    let mut cursor = window_start;
    for b in booked {
        push_gap(&mut free, cursor, b.start, window_start, window_end, min_duration);
        cursor = cursor.max(b.end);
    }
    push_gap(&mut free, cursor, window_end, window_start, window_end, min_duration);

    free
}

/// Clip `[gap_start, gap_end)` to the window and keep it if long enough.
fn push_gap(
    out: &mut Vec<Slot>,
    gap_start: NaiveDateTime,
    gap_end: NaiveDateTime,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
    min_duration: TimeDelta,
) {
    let start = gap_start.max(window_start);
    let end = gap_end.min(window_end);
    if start < end && end - start >= min_duration {
        out.push(Slot::new(start, end));
    }
}

/// True if any slot in `a` overlaps any slot in `b`.
pub fn slots_overlap(a: &[Slot], b: &[Slot]) -> bool {
    a.iter().any(|x| b.iter().any(|y| x.overlaps(y)))
}

/// Pairwise intersections of two slot sets, positive-length only.
pub fn intersect_slots(a: &[Slot], b: &[Slot]) -> Vec<Slot> {
    let mut out = Vec::new();
    for x in a {
        for y in b {
            if let Some(s) = x.intersect(y) {
                out.push(s);
            }
        }
    }
    out
}

/// Fold `intersect_slots` across every member's free slots.
/// Empty input → empty; short-circuits once the intersection vanishes.
pub fn common_slots(slot_sets: &[&[Slot]]) -> Vec<Slot> {
    let Some((first, rest)) = slot_sets.split_first() else {
        return Vec::new();
    };
    let mut intersection = first.to_vec();
    for set in rest {
        intersection = intersect_slots(&intersection, set);
        if intersection.is_empty() {
            break;
        }
    }
    intersection
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 22)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn mins(n: i64) -> TimeDelta {
        TimeDelta::minutes(n)
    }

    #[test]
    fn empty_bookings_whole_window() {
        let free = free_slots(&[], dt(20, 0), dt(23, 45), mins(45));
        assert_eq!(free, vec![Slot::new(dt(20, 0), dt(23, 45))]);
    }

    #[test]
    fn window_too_short_for_duration() {
        let free = free_slots(&[], dt(20, 0), dt(20, 30), mins(45));
        assert!(free.is_empty());
    }

    #[test]
    fn inverted_window_yields_nothing() {
        let free = free_slots(&[], dt(22, 0), dt(20, 0), mins(15));
        assert!(free.is_empty());
        let free = free_slots(&[], dt(20, 0), dt(20, 0), mins(15));
        assert!(free.is_empty());
    }

    #[test]
    fn gap_before_between_after() {
        let booked = vec![
            Slot::new(dt(21, 0), dt(21, 45)),
            Slot::new(dt(22, 30), dt(23, 0)),
        ];
        let free = free_slots(&booked, dt(20, 0), dt(23, 45), mins(45));
        assert_eq!(
            free,
            vec![
                Slot::new(dt(20, 0), dt(21, 0)),
                Slot::new(dt(21, 45), dt(22, 30)),
                Slot::new(dt(23, 0), dt(23, 45)),
            ]
        );
    }

    #[test]
    fn short_gaps_dropped() {
        let booked = vec![
            Slot::new(dt(20, 30), dt(21, 0)),
            Slot::new(dt(21, 20), dt(23, 0)),
        ];
        // 20:00-20:30 and 21:00-21:20 are both under 45 minutes
        let free = free_slots(&booked, dt(20, 0), dt(23, 45), mins(45));
        assert_eq!(free, vec![Slot::new(dt(23, 0), dt(23, 45))]);
    }

    #[test]
    fn booking_extending_beyond_window_clips_output() {
        let booked = vec![Slot::new(dt(23, 0), dt(23, 59))];
        let free = free_slots(&booked, dt(20, 0), dt(23, 45), mins(45));
        assert_eq!(free, vec![Slot::new(dt(20, 0), dt(23, 0))]);
    }

    #[test]
    fn booking_starting_before_window() {
        let booked = vec![Slot::new(dt(19, 0), dt(20, 30))];
        let free = free_slots(&booked, dt(20, 0), dt(23, 45), mins(45));
        assert_eq!(free, vec![Slot::new(dt(20, 30), dt(23, 45))]);
    }

    #[test]
    fn booking_covering_whole_window() {
        let booked = vec![Slot::new(dt(19, 0), dt(23, 59))];
        let free = free_slots(&booked, dt(20, 0), dt(23, 45), mins(15));
        assert!(free.is_empty());
    }

    #[test]
    fn free_never_overlaps_booked() {
        let booked = vec![
            Slot::new(dt(20, 15), dt(21, 0)),
            Slot::new(dt(21, 30), dt(22, 0)),
            Slot::new(dt(22, 45), dt(23, 15)),
        ];
        let free = free_slots(&booked, dt(20, 0), dt(23, 45), mins(15));
        for f in &free {
            for b in &booked {
                assert!(!f.overlaps(b), "free {f:?} overlaps booked {b:?}");
            }
            assert!(f.duration_minutes() >= 15);
        }
    }

    #[test]
    fn overlap_detection_across_sets() {
        let a = vec![Slot::new(dt(20, 0), dt(21, 0))];
        let b = vec![Slot::new(dt(20, 30), dt(22, 0))];
        let c = vec![Slot::new(dt(21, 0), dt(22, 0))];
        assert!(slots_overlap(&a, &b));
        assert!(!slots_overlap(&a, &c));
        assert!(!slots_overlap(&a, &[]));
    }

    #[test]
    fn intersect_sets() {
        let a = vec![
            Slot::new(dt(20, 0), dt(21, 0)),
            Slot::new(dt(22, 0), dt(23, 0)),
        ];
        let b = vec![Slot::new(dt(20, 30), dt(22, 30))];
        assert_eq!(
            intersect_slots(&a, &b),
            vec![
                Slot::new(dt(20, 30), dt(21, 0)),
                Slot::new(dt(22, 0), dt(22, 30)),
            ]
        );
    }

    #[test]
    fn common_slots_across_three_sets() {
        let a = vec![Slot::new(dt(20, 0), dt(23, 0))];
        let b = vec![Slot::new(dt(21, 0), dt(23, 45))];
        let c = vec![Slot::new(dt(20, 0), dt(22, 0))];
        let sets: Vec<&[Slot]> = vec![&a, &b, &c];
        assert_eq!(common_slots(&sets), vec![Slot::new(dt(21, 0), dt(22, 0))]);
    }

    #[test]
    fn common_slots_empty_when_disjoint() {
        let a = vec![Slot::new(dt(20, 0), dt(21, 0))];
        let b = vec![Slot::new(dt(22, 0), dt(23, 0))];
        let sets: Vec<&[Slot]> = vec![&a, &b];
        assert!(common_slots(&sets).is_empty());
        assert!(common_slots(&[]).is_empty());
    }
}
