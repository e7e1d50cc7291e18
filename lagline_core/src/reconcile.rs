//! Sequence reconciliation
//!
//! A run is captured twice, once at each end of the link under test. Each
//! capture is a list of (sequence number, timestamp) observations and
//! neither list is guaranteed complete, sorted or aligned with the other.
//! This module joins the two captures by sequence number, derives a latency
//! for every datagram seen at both ends and aggregates those latencies into
//! run-level statistics.

use average::{Estimate, Max, Min, Variance, concatenate};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::debug;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Errors produced by this module.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// One or both captures contain no timestamp records. The run cannot be
    /// evaluated and must be skipped by the caller.
    #[error("timestamp records unavailable for this run")]
    EmptyInput,
    /// No sequence number was observed at both ends, so there is nothing to
    /// aggregate. Total loss is reported this way rather than as zeroed
    /// statistics.
    #[error("no matched sequence numbers to aggregate")]
    EmptyStatistics,
}

/// A wall-clock instant split into whole seconds and nanoseconds, exactly as
/// captured by the observation points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// Whole seconds.
    pub secs: u64,
    /// Nanosecond remainder, less than one second's worth.
    pub nanos: u32,
}

impl Timestamp {
    /// Seconds elapsed from `earlier` to `self`, borrowing across the
    /// seconds boundary when the nanosecond component underflows. Negative
    /// when `self` precedes `earlier`.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        let mut secs = self.secs as i64 - earlier.secs as i64;
        let mut nanos = i64::from(self.nanos) - i64::from(earlier.nanos);
        if nanos < 0 {
            secs -= 1;
            nanos += NANOS_PER_SEC;
        }
        secs as f64 + nanos as f64 / NANOS_PER_SEC as f64
    }
}

/// One observation of a sequence-numbered datagram at one observation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampRecord {
    /// Sequence number carried by the datagram.
    pub sequence: u64,
    /// Time the datagram was observed.
    pub time: Timestamp,
}

/// The reconciled result for one sequence number observed at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyRecord {
    /// Sequence number of the matched pair.
    pub sequence: u64,
    /// Destination observation time minus origin observation time, in
    /// seconds.
    pub latency: f64,
}

/// Everything `reconcile` derives from one pair of captures.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// True when the two captures disagree on how many datagrams were seen.
    pub packet_loss: bool,
    /// True when the destination saw sequence numbers in non-decreasing
    /// order of arrival.
    pub in_order: bool,
    /// Matched latencies in ascending sequence order.
    pub latencies: Vec<LatencyRecord>,
}

/// Aggregate over the latencies of a run, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation. The captures cover the whole run, not
    /// a sample of it, so the sum of squared deviations is divided by `n`.
    pub std_dev: f64,
    /// Smallest observed latency.
    pub min: f64,
    /// Largest observed latency.
    pub max: f64,
    /// `max - min`.
    pub range: f64,
    /// Mean absolute deviation from the mean, reported downstream as
    /// jitter.
    pub mean_abs_deviation: f64,
}

/// The per-run summary handed to the report layer: the two capture-level
/// classifications plus the latency aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStatistics {
    /// True when the two captures disagree on datagram counts.
    pub packet_loss: bool,
    /// True when the destination capture arrived in sequence order.
    pub in_order: bool,
    /// Latency aggregates.
    #[serde(flatten)]
    pub latency: LatencyStats,
}

/// Join two captures of the same run by sequence number.
///
/// `origin` is the sending end, `destination` the receiving end. Neither
/// input needs to be sorted; matching is by key, never by position. A
/// sequence number present on only one side is dropped from the latency
/// list, not zero-filled. When a sequence number repeats within one side
/// the first occurrence wins on both sides, keeping the join 1:1 and
/// deterministic.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] when either capture is empty; the caller
/// must skip the run rather than compute garbage statistics.
pub fn reconcile(
    origin: &[TimestampRecord],
    destination: &[TimestampRecord],
) -> Result<Reconciliation, Error> {
    if origin.is_empty() || destination.is_empty() {
        return Err(Error::EmptyInput);
    }

    let packet_loss = origin.len() != destination.len();

    // Order must be judged on the raw arrival order. Sorting first and then
    // comparing would report every run as in-order.
    let in_order = destination
        .windows(2)
        .all(|pair| pair[0].sequence <= pair[1].sequence);
    if !in_order {
        let inversions = destination
            .windows(2)
            .filter(|pair| pair[0].sequence > pair[1].sequence)
            .count();
        debug!(inversions, "destination sequence numbers arrived out of order");
    }

    let mut arrivals: FxHashMap<u64, Timestamp> = FxHashMap::default();
    for record in destination {
        arrivals.entry(record.sequence).or_insert(record.time);
    }

    let mut matched: FxHashSet<u64> = FxHashSet::default();
    let mut latencies = Vec::with_capacity(origin.len().min(destination.len()));
    for record in origin {
        if !matched.insert(record.sequence) {
            continue;
        }
        if let Some(arrival) = arrivals.get(&record.sequence) {
            latencies.push(LatencyRecord {
                sequence: record.sequence,
                latency: arrival.seconds_since(record.time),
            });
        }
    }
    latencies.sort_unstable_by_key(|record| record.sequence);

    Ok(Reconciliation {
        packet_loss,
        in_order,
        latencies,
    })
}

/// Aggregate matched latencies into [`LatencyStats`].
///
/// # Errors
///
/// Returns [`Error::EmptyStatistics`] when `latencies` is empty. Statistics
/// over zero records are undefined and are never reported as zeros or NaN.
pub fn statistics(latencies: &[LatencyRecord]) -> Result<LatencyStats, Error> {
    if latencies.is_empty() {
        return Err(Error::EmptyStatistics);
    }

    concatenate!(
        Estimator,
        [Variance, variance, mean, population_variance],
        [Min, min, min],
        [Max, max, max]
    );

    let estimate: Estimator = latencies.iter().map(|record| record.latency).collect();
    let mean = estimate.mean();
    let mean_abs_deviation = latencies
        .iter()
        .map(|record| (record.latency - mean).abs())
        .sum::<f64>()
        / latencies.len() as f64;

    Ok(LatencyStats {
        mean,
        std_dev: estimate.population_variance().sqrt(),
        min: estimate.min(),
        max: estimate.max(),
        range: estimate.max() - estimate.min(),
        mean_abs_deviation,
    })
}

/// Reconcile two captures and aggregate the result in one call.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] when either capture is empty and
/// [`Error::EmptyStatistics`] when no sequence number matched across the
/// two captures. Both mean "skip this run", never "abort the batch".
pub fn reconcile_and_summarize(
    origin: &[TimestampRecord],
    destination: &[TimestampRecord],
) -> Result<RunStatistics, Error> {
    let reconciliation = reconcile(origin, destination)?;
    let latency = statistics(&reconciliation.latencies)?;
    Ok(RunStatistics {
        packet_loss: reconciliation.packet_loss,
        in_order: reconciliation.in_order,
        latency,
    })
}

#[cfg(test)]
mod test {
    use proptest::{collection, prelude::*};
    use rustc_hash::FxHashSet;

    use super::{Error, LatencyRecord, Timestamp, TimestampRecord, reconcile, statistics};

    fn record(sequence: u64, secs: u64, nanos: u32) -> TimestampRecord {
        TimestampRecord {
            sequence,
            time: Timestamp { secs, nanos },
        }
    }

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let some = vec![record(0, 1, 0)];
        assert_eq!(reconcile(&[], &some), Err(Error::EmptyInput));
        assert_eq!(reconcile(&some, &[]), Err(Error::EmptyInput));
        assert_eq!(reconcile(&[], &[]), Err(Error::EmptyInput));
        assert_eq!(statistics(&[]), Err(Error::EmptyStatistics));
    }

    #[test]
    fn borrow_across_the_second_boundary() {
        let origin = vec![record(7, 10, 900_000_000)];
        let destination = vec![record(7, 11, 100_000_000)];
        let result = reconcile(&origin, &destination).unwrap();
        assert_eq!(result.latencies.len(), 1);
        assert!(
            close(result.latencies[0].latency, 0.2),
            "got {}",
            result.latencies[0].latency
        );
    }

    #[test]
    fn negative_latency_is_representable() {
        // Clock skew between observation points can put the destination
        // stamp before the origin stamp.
        let origin = vec![record(1, 20, 100_000_000)];
        let destination = vec![record(1, 19, 900_000_000)];
        let result = reconcile(&origin, &destination).unwrap();
        assert!(close(result.latencies[0].latency, -0.2));
    }

    #[test]
    fn loss_is_a_count_mismatch() {
        let origin = vec![record(0, 1, 0), record(1, 2, 0)];
        let destination = vec![record(0, 1, 500), record(1, 2, 500)];
        assert!(!reconcile(&origin, &destination).unwrap().packet_loss);

        let short = vec![record(0, 1, 500)];
        assert!(reconcile(&origin, &short).unwrap().packet_loss);

        // Equal counts with different content is not counted as loss, the
        // counts are all the capture-level check sees. Matching still drops
        // the unpaired sequence numbers.
        let different = vec![record(0, 1, 500), record(9, 2, 500)];
        let result = reconcile(&origin, &different).unwrap();
        assert!(!result.packet_loss);
        assert_eq!(result.latencies.len(), 1);
        assert_eq!(result.latencies[0].sequence, 0);
    }

    #[test]
    fn order_check_uses_arrival_order() {
        let origin = vec![record(3, 1, 0), record(4, 2, 0), record(5, 3, 0)];
        // Logically out of order even though the set of numbers is complete;
        // sorting before the check would hide this.
        let destination = vec![record(5, 3, 100), record(3, 1, 100), record(4, 2, 100)];
        let result = reconcile(&origin, &destination).unwrap();
        assert!(!result.in_order);
        assert_eq!(result.latencies.len(), 3);

        let sorted = vec![record(3, 1, 100), record(4, 2, 100), record(5, 3, 100)];
        assert!(reconcile(&origin, &sorted).unwrap().in_order);
    }

    #[test]
    fn repeated_sequence_numbers_allowed_by_order_check() {
        let origin = vec![record(1, 1, 0), record(2, 2, 0)];
        let destination = vec![record(1, 1, 100), record(1, 1, 200), record(2, 2, 100)];
        assert!(reconcile(&origin, &destination).unwrap().in_order);
    }

    #[test]
    fn unmatched_sequences_are_excluded() {
        let origin = vec![record(0, 1, 0), record(1, 2, 0), record(2, 3, 0)];
        let destination = vec![record(2, 3, 900), record(0, 1, 900)];
        let result = reconcile(&origin, &destination).unwrap();
        let sequences: Vec<u64> = result.latencies.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 2]);
    }

    #[test]
    fn first_occurrence_wins_on_duplicates() {
        let origin = vec![record(5, 10, 0), record(5, 99, 0)];
        let destination = vec![record(5, 11, 0), record(5, 98, 0)];
        let result = reconcile(&origin, &destination).unwrap();
        assert_eq!(result.latencies.len(), 1);
        // 11s - 10s, not any pairing involving the later duplicates.
        assert!(close(result.latencies[0].latency, 1.0));
    }

    #[test]
    fn output_is_deterministic_across_input_orderings() {
        let origin = vec![record(2, 4, 0), record(0, 1, 0), record(1, 2, 0)];
        let destination = vec![record(1, 3, 0), record(2, 5, 0), record(0, 2, 0)];

        let mut origin_rev = origin.clone();
        origin_rev.reverse();

        let forward = reconcile(&origin, &destination).unwrap();
        let backward = reconcile(&origin_rev, &destination).unwrap();
        assert_eq!(forward.latencies, backward.latencies);

        let sequences: Vec<u64> = forward.latencies.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn statistics_on_a_known_set() {
        let latencies = vec![
            LatencyRecord {
                sequence: 0,
                latency: 0.1,
            },
            LatencyRecord {
                sequence: 1,
                latency: 0.2,
            },
            LatencyRecord {
                sequence: 2,
                latency: 0.3,
            },
        ];
        let stats = statistics(&latencies).unwrap();
        assert!(close(stats.mean, 0.2));
        assert!((stats.std_dev - 0.081_649_658).abs() < 1e-6);
        assert!(close(stats.min, 0.1));
        assert!(close(stats.max, 0.3));
        assert!(close(stats.range, 0.2));
        assert!((stats.mean_abs_deviation - 0.066_666_667).abs() < 1e-6);
    }

    #[test]
    fn statistics_on_a_single_record() {
        let latencies = vec![LatencyRecord {
            sequence: 0,
            latency: 0.5,
        }];
        let stats = statistics(&latencies).unwrap();
        assert!(close(stats.mean, 0.5));
        assert!(close(stats.std_dev, 0.0));
        assert!(close(stats.range, 0.0));
        assert!(close(stats.mean_abs_deviation, 0.0));
    }

    fn records(max_sequence: u64) -> impl Strategy<Value = Vec<TimestampRecord>> {
        collection::vec(
            (0..max_sequence, 0u64..1_000, 0u32..1_000_000_000).prop_map(
                |(sequence, secs, nanos)| TimestampRecord {
                    sequence,
                    time: Timestamp { secs, nanos },
                },
            ),
            1..100,
        )
    }

    proptest! {
        // Every emitted record pairs a sequence number present on both
        // sides, exactly once, in ascending order.
        #[test]
        fn matching_is_an_ordered_one_to_one_join(
            origin in records(64),
            destination in records(64),
        ) {
            let result = reconcile(&origin, &destination).unwrap();

            let origin_sequences: FxHashSet<u64> =
                origin.iter().map(|r| r.sequence).collect();
            let destination_sequences: FxHashSet<u64> =
                destination.iter().map(|r| r.sequence).collect();

            let mut emitted: FxHashSet<u64> = FxHashSet::default();
            for pair in result.latencies.windows(2) {
                prop_assert!(pair[0].sequence < pair[1].sequence);
            }
            for record in &result.latencies {
                prop_assert!(origin_sequences.contains(&record.sequence));
                prop_assert!(destination_sequences.contains(&record.sequence));
                prop_assert!(emitted.insert(record.sequence));
            }

            let expected = origin_sequences.intersection(&destination_sequences).count();
            prop_assert_eq!(result.latencies.len(), expected);
        }
    }
}
