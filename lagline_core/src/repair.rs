//! Monotonic counter repair
//!
//! During a run the sending side emits small status polls carrying the
//! cumulative loss counter. The polls travel without delivery guarantees,
//! so the recorded series can appear to decrease even though the underlying
//! counter never does. This module restores monotonicity, anchors the
//! series to the authoritative end-of-run totals and bounds its length for
//! downstream consumers.

use serde::Serialize;

/// Ceiling on the corrected series length. Longer series are repeatedly
/// halved until they fit.
pub const MAX_SERIES_POINTS: usize = 5_000;

/// One poll of the cumulative loss counter, as received. Arrival order is
/// the position in the input slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSample {
    /// Losses observed so far according to this poll.
    pub cumulative_value: u64,
    /// Datagrams sent so far according to this poll. Carried through
    /// untouched for the series output.
    pub observed_total: u64,
    /// Seconds since run start at which this poll was recorded.
    pub elapsed_time: f64,
}

/// One entry of the repaired, non-decreasing series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrectedCounterPoint {
    /// Corrected cumulative loss counter.
    pub cumulative_value: u64,
    /// Datagrams sent so far, carried over from the source poll.
    pub observed_total: u64,
    /// Increment since the previous point. The first point's delta is its
    /// own cumulative value.
    pub delta: u64,
    /// Seconds since run start, carried over from the source poll.
    pub elapsed_time: f64,
}

/// Repair a polled loss-counter series.
///
/// Appends one synthetic final sample built from the authoritative
/// end-of-run totals, then drives the series to a fixed point: while any
/// adjacent delta is negative, the first offending sample reveals that
/// every earlier sample with a higher value was recorded out of order, so
/// those are clamped down to the offender's value and the affected deltas
/// recomputed. Each pass strictly lowers at least one sample, so the loop
/// terminates. Once no negative delta remains the series is halved --
/// keeping even-indexed entries -- until it is at most
/// [`MAX_SERIES_POINTS`] long. Deltas are not recomputed across the points
/// removed by halving; a surviving point keeps the increment it had in the
/// full series.
///
/// An empty input produces an empty output with no synthetic final point.
/// The input is never mutated; the repair works on an owned copy.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
#[must_use]
pub fn repair_counter_series(
    samples: &[PollSample],
    final_loss_count: u64,
    final_total: u64,
    duration: f64,
) -> Vec<CorrectedCounterPoint> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut points: Vec<CorrectedCounterPoint> = samples
        .iter()
        .map(|sample| CorrectedCounterPoint {
            cumulative_value: sample.cumulative_value,
            observed_total: sample.observed_total,
            delta: 0,
            elapsed_time: sample.elapsed_time,
        })
        .collect();
    points.push(CorrectedCounterPoint {
        cumulative_value: final_loss_count,
        observed_total: final_total,
        delta: 0,
        elapsed_time: duration,
    });

    // Working deltas are signed; negative entries are exactly what the
    // fixed point below hunts down.
    let mut deltas: Vec<i64> = Vec::with_capacity(points.len());
    for (idx, point) in points.iter().enumerate() {
        let value = point.cumulative_value as i64;
        if idx == 0 {
            deltas.push(value);
        } else {
            deltas.push(value - points[idx - 1].cumulative_value as i64);
        }
    }

    while let Some(offender) = deltas.iter().position(|delta| *delta < 0) {
        // A lower value arriving later proves every earlier, higher value
        // was itself out of order: the counter had not reached it yet.
        let ceiling = points[offender].cumulative_value;
        for point in &mut points[..offender] {
            if point.cumulative_value > ceiling {
                point.cumulative_value = ceiling;
            }
        }
        // Only values before the offender changed, so only deltas up to and
        // including it can be stale.
        for idx in 0..=offender {
            let value = points[idx].cumulative_value as i64;
            deltas[idx] = if idx == 0 {
                value
            } else {
                value - points[idx - 1].cumulative_value as i64
            };
        }
    }

    for (point, delta) in points.iter_mut().zip(&deltas) {
        point.delta = *delta as u64;
    }

    while points.len() > MAX_SERIES_POINTS {
        let mut position = 0_usize;
        points.retain(|_| {
            let keep = position % 2 == 0;
            position += 1;
            keep
        });
    }

    points
}
