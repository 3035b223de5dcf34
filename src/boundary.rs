//! Boundary Inference
//!
//! Computes a sorted set of partition split points from the key ranges of
//! the discovered files. Used only to size a brand-new target table before
//! any load begins; once the table exists the live partition map is the
//! sole authority.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Infer partition boundaries from file key ranges.
///
/// Each range contributes a +1 event at its first key and a -1 event at its
/// last key to an ordered multiset. Scanning in key order with a running
/// sum, every return to zero closes a covered run, and the start of each run
/// after the first becomes a boundary. At equal keys the -1 events apply
/// before the +1 events, so two abutting ranges close one run and open the
/// next at their shared key, which makes that key a boundary. Single-key
/// ranges open and close a degenerate run at their own key.
pub fn infer_boundaries<I>(ranges: I) -> Vec<Bytes>
where
    I: IntoIterator<Item = (Bytes, Bytes)>,
{
    // key → (end events, start events)
    let mut events: BTreeMap<Bytes, (i64, i64)> = BTreeMap::new();
    for (first, last) in ranges {
        events.entry(first).or_insert((0, 0)).1 += 1;
        events.entry(last).or_insert((0, 0)).0 += 1;
    }

    let mut run_starts: Vec<Bytes> = Vec::new();
    let mut running: i64 = 0;

    for (key, (ends, starts)) in events {
        if running == 0 {
            // No run is open. End events here can only come from
            // single-key ranges, which open and close at this same key.
            if starts > 0 {
                run_starts.push(key);
                running = starts - ends;
            }
        } else {
            running -= ends;
            if running <= 0 {
                // Run closed at this key. Any overshoot is from single-key
                // ranges whose start events pair off against it.
                let paired_off = -running;
                let reopening = starts - paired_off;
                if reopening > 0 {
                    run_starts.push(key);
                    running = reopening;
                } else {
                    running = 0;
                }
            } else {
                running += starts;
            }
        }
    }

    // The first run's start is the start of the whole key space, never a
    // boundary.
    if run_starts.is_empty() {
        Vec::new()
    } else {
        run_starts.split_off(1)
    }
}
