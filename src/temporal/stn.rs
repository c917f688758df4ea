//! Simple Temporal Network
//!
//! Time points are opaque string identifiers; a constraint between an
//! ordered pair `(p, q)` is a closed interval `[lo, hi]` meaning
//! `lo <= t(q) - t(p) <= hi`. The network is consistent iff the
//! shortest-path closure over the distance matrix derives no interval with
//! `lo > hi` (equivalently, no negative cycle).

use crate::core::StateValue;
use crate::error::{PlannerError, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Conventional name for the schedule origin time point
pub const ORIGIN_POINT: &str = "t0";

/// Default number of time points per segment when solving in parallel
pub const DEFAULT_SEGMENT_SIZE: usize = 5;

/// Effectively-infinite bound; kept well under `i64::MAX` so closure
/// additions cannot overflow.
pub(crate) const INF: i64 = i64::MAX / 4;

/// A closed interval `[lo, hi]` on the difference of two time points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    pub lo: i64,
    pub hi: i64,
}

impl Bound {
    /// A bound with both ends given
    pub fn new(lo: i64, hi: i64) -> Self {
        Self { lo, hi }
    }

    /// The wide default `[-inf, +inf]`
    pub fn wide() -> Self {
        Self { lo: -INF, hi: INF }
    }

    /// `[value, value]`
    pub fn exact(value: i64) -> Self {
        Self { lo: value, hi: value }
    }

    /// `[lo, +inf]`
    pub fn at_least(lo: i64) -> Self {
        Self { lo, hi: INF }
    }

    /// `[-inf, hi]`
    pub fn at_most(hi: i64) -> Self {
        Self { lo: -INF, hi }
    }

    /// Intersection of two bounds; empty when `lo > hi`
    pub fn intersect(&self, other: &Bound) -> Bound {
        Bound {
            lo: self.lo.max(other.lo),
            hi: self.hi.min(other.hi),
        }
    }

    /// Whether the interval contains no value
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lo = if self.lo <= -INF { "-inf".to_string() } else { self.lo.to_string() };
        let hi = if self.hi >= INF { "+inf".to_string() } else { self.hi.to_string() };
        write!(f, "[{lo}, {hi}]")
    }
}

/// A convenience grouping of a start point, end point, and a duration
/// constraint between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub id: String,
    pub start: String,
    pub end: String,
    pub duration_lo: i64,
    pub duration_hi: i64,
    #[serde(default)]
    pub metadata: IndexMap<String, StateValue>,
}

impl Interval {
    /// Create a new interval with the given duration bounds
    pub fn new(
        id: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        duration_lo: i64,
        duration_hi: i64,
    ) -> Self {
        Self {
            id: id.into(),
            start: start.into(),
            end: end.into(),
            duration_lo,
            duration_hi,
            metadata: IndexMap::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: StateValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A sub-network produced by segmentation
#[derive(Debug, Clone)]
pub struct StnSegment {
    pub index: usize,
    pub points: Vec<String>,
    pub stn: Stn,
}

/// Distance-matrix Simple Temporal Network with lazy closure and cached
/// consistency.
#[derive(Debug, Clone, Default)]
pub struct Stn {
    points: IndexSet<String>,
    constraints: IndexMap<(String, String), Bound>,
    intervals: IndexMap<String, Interval>,
    /// Set when some constraint intersection came up empty
    infeasible: bool,
    /// Cached consistency verdict; cleared on every mutation
    cached: Option<bool>,
    /// Solved times populated from an external solver response
    solved_times: IndexMap<String, i64>,
}

impl Stn {
    /// Create a new empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a time point. Points carry the trivial self-constraint
    /// `[0, 0]` via the matrix diagonal. Returns true if the point is new.
    pub fn add_time_point(&mut self, point: impl Into<String>) -> bool {
        let added = self.points.insert(point.into());
        if added {
            self.cached = None;
        }
        added
    }

    /// Whether the network knows a time point
    pub fn has_time_point(&self, point: &str) -> bool {
        self.points.contains(point)
    }

    /// All time points, in insertion order
    pub fn time_points(&self) -> Vec<&String> {
        self.points.iter().collect()
    }

    /// Number of time points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the network has no time points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a constraint `bound.lo <= t(q) - t(p) <= bound.hi`, intersecting
    /// with any existing bound for the same ordered pair. An empty
    /// intersection marks the network inconsistent. Unknown points are
    /// inserted.
    pub fn add_constraint(&mut self, p: impl Into<String>, q: impl Into<String>, bound: Bound) -> Result<()> {
        let p = p.into();
        let q = q.into();
        self.add_time_point(p.clone());
        self.add_time_point(q.clone());

        let key = (p, q);
        let merged = match self.constraints.get(&key) {
            Some(existing) => existing.intersect(&bound),
            None => bound,
        };
        if merged.is_empty() {
            self.infeasible = true;
        }
        self.constraints.insert(key, merged);
        self.cached = None;
        Ok(())
    }

    /// The stored bound for `(p, q)`, combining an explicit constraint with
    /// any interval whose endpoints are exactly `(p, q)`. Wide default when
    /// nothing constrains the pair.
    pub fn get_constraint(&self, p: &str, q: &str) -> Bound {
        let mut bound = self
            .constraints
            .get(&(p.to_string(), q.to_string()))
            .copied()
            .unwrap_or_else(Bound::wide);
        for interval in self.intervals.values() {
            if interval.start == p && interval.end == q {
                bound = bound.intersect(&Bound::new(interval.duration_lo, interval.duration_hi));
            }
        }
        bound
    }

    /// Add an interval: inserts its points and the duration constraint
    /// `duration_lo <= end - start <= duration_hi`.
    pub fn add_interval(&mut self, interval: Interval) -> Result<()> {
        if self.intervals.contains_key(&interval.id) {
            return Err(PlannerError::malformed_input(format!(
                "interval '{}' already exists",
                interval.id
            )));
        }
        if interval.duration_lo > interval.duration_hi {
            self.infeasible = true;
        }
        self.add_time_point(interval.start.clone());
        self.add_time_point(interval.end.clone());
        self.intervals.insert(interval.id.clone(), interval);
        self.cached = None;
        Ok(())
    }

    /// Remove an interval and its duration constraint. Its time points stay;
    /// other constraints may still mention them.
    pub fn remove_interval(&mut self, id: &str) -> Option<Interval> {
        let removed = self.intervals.shift_remove(id);
        if removed.is_some() {
            self.cached = None;
            // An empty duration interval may have been the only infeasibility
            self.infeasible = self.intervals.values().any(|iv| iv.duration_lo > iv.duration_hi)
                || self.constraints.values().any(|b| b.is_empty());
        }
        removed
    }

    /// Look up an interval by id
    pub fn get_interval(&self, id: &str) -> Option<&Interval> {
        self.intervals.get(id)
    }

    /// All intervals, in insertion order
    pub fn intervals(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.values()
    }

    /// Every effective constraint: explicit pairs plus interval durations
    fn effective_constraints(&self) -> Vec<(&str, &str, Bound)> {
        let mut all: Vec<(&str, &str, Bound)> = self
            .constraints
            .iter()
            .map(|((p, q), b)| (p.as_str(), q.as_str(), *b))
            .collect();
        for interval in self.intervals.values() {
            all.push((
                interval.start.as_str(),
                interval.end.as_str(),
                Bound::new(interval.duration_lo, interval.duration_hi),
            ));
        }
        all
    }

    /// Shortest-path closure over the distance matrix. Returns the matrix of
    /// upper bounds `d[i][j]` on `t(j) - t(i)` and the consistency verdict.
    fn closure(&self) -> (Vec<Vec<i64>>, bool) {
        let n = self.points.len();
        let mut d = vec![vec![INF; n]; n];
        for (i, row) in d.iter_mut().enumerate() {
            row[i] = 0;
        }

        for (p, q, bound) in self.effective_constraints() {
            // Both endpoints are registered by add_constraint/add_interval
            let (Some(i), Some(j)) = (self.points.get_index_of(p), self.points.get_index_of(q))
            else {
                continue;
            };
            d[i][j] = d[i][j].min(bound.hi);
            d[j][i] = d[j][i].min(bound.lo.saturating_neg());
        }

        for k in 0..n {
            for i in 0..n {
                if d[i][k] >= INF {
                    continue;
                }
                for j in 0..n {
                    let via = d[i][k].saturating_add(d[k][j]);
                    if via < d[i][j] {
                        d[i][j] = via;
                    }
                }
            }
        }

        let consistent = (0..n).all(|i| d[i][i] >= 0);
        (d, consistent)
    }

    /// Whether the network is consistent. The verdict is cached and
    /// recomputed lazily after mutations.
    pub fn consistent(&mut self) -> bool {
        if self.infeasible {
            self.cached = Some(false);
            return false;
        }
        if let Some(cached) = self.cached {
            return cached;
        }
        let (_, consistent) = self.closure();
        self.cached = Some(consistent);
        consistent
    }

    /// The tightest derivable bound on `t(q) - t(p)`, or `None` when either
    /// point is unknown.
    pub fn derived_constraint(&self, p: &str, q: &str) -> Option<Bound> {
        let i = self.points.get_index_of(p)?;
        let j = self.points.get_index_of(q)?;
        let (d, _) = self.closure();
        Some(Bound::new(d[j][i].saturating_neg(), d[i][j]))
    }

    /// An earliest-time assignment relative to the first time point, or
    /// `None` when the network is inconsistent.
    pub fn schedule_times(&mut self) -> Option<IndexMap<String, i64>> {
        if self.infeasible || self.points.is_empty() {
            return if self.points.is_empty() { Some(IndexMap::new()) } else { None };
        }
        let (d, consistent) = self.closure();
        self.cached = Some(consistent);
        if !consistent {
            return None;
        }
        let times = self
            .points
            .iter()
            .enumerate()
            .map(|(i, point)| (point.clone(), d[i][0].saturating_neg()))
            .collect();
        Some(times)
    }

    /// Solved times recorded from an external solver response
    pub fn solved_times(&self) -> &IndexMap<String, i64> {
        &self.solved_times
    }

    pub(crate) fn record_solution(&mut self, times: IndexMap<String, i64>, consistent: bool) {
        self.solved_times = times;
        self.cached = Some(consistent);
    }

    /// Partition the time points into segments of at most `max_points`
    /// (in insertion order) and build one sub-network per segment holding
    /// only the constraints whose endpoints both lie inside it.
    ///
    /// Boundary-crossing constraints are NOT represented in any segment;
    /// they must be reconciled in a merge pass.
    pub fn segment(&self, max_points: usize) -> Vec<StnSegment> {
        let max_points = max_points.max(1);
        let points: Vec<&String> = self.points.iter().collect();
        points
            .chunks(max_points)
            .enumerate()
            .map(|(index, chunk)| {
                let members: IndexSet<&String> = chunk.iter().copied().collect();
                let mut stn = Stn::new();
                for point in chunk {
                    stn.add_time_point((*point).clone());
                }
                for ((p, q), bound) in &self.constraints {
                    if members.contains(p) && members.contains(q) {
                        let _ = stn.add_constraint(p.clone(), q.clone(), *bound);
                    }
                }
                for interval in self.intervals.values() {
                    if members.contains(&interval.start) && members.contains(&interval.end) {
                        let _ = stn.add_interval(interval.clone());
                    }
                }
                StnSegment {
                    index,
                    points: chunk.iter().map(|p| (*p).clone()).collect(),
                    stn,
                }
            })
            .collect()
    }

    /// Whether any constraint crosses a segment boundary for the given
    /// segment size
    fn has_crossing_constraints(&self, max_points: usize) -> bool {
        let max_points = max_points.max(1);
        let segment_of = |point: &str| self.points.get_index_of(point).map(|i| i / max_points);
        self.effective_constraints()
            .into_iter()
            .any(|(p, q, _)| segment_of(p) != segment_of(q))
    }

    /// [`Stn::consistent_segmented`] with the default segment size
    pub fn consistent_parallel(&mut self) -> bool {
        self.consistent_segmented(DEFAULT_SEGMENT_SIZE)
    }

    /// Consistency via segmentation: each segment is solved independently on
    /// a worker thread; boundary-crossing constraints are then reconciled in
    /// a merge pass over the full network.
    pub fn consistent_segmented(&mut self, max_points: usize) -> bool {
        if self.infeasible {
            self.cached = Some(false);
            return false;
        }

        let segments = self.segment(max_points);
        let verdicts: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = segments
                .into_iter()
                .map(|mut segment| scope.spawn(move || segment.stn.consistent()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(false))
                .collect()
        });

        if verdicts.iter().any(|ok| !ok) {
            self.cached = Some(false);
            return false;
        }

        // Merge pass: segmentation preserves solvability only for
        // intra-segment constraints, so crossing constraints force a full
        // re-closure.
        if self.has_crossing_constraints(max_points) {
            self.cached = None;
            self.consistent()
        } else {
            self.cached = Some(true);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single_point() {
        let mut stn = Stn::new();
        assert!(stn.is_empty());
        assert!(stn.consistent());

        stn.add_time_point("only");
        assert_eq!(stn.len(), 1);
        // A single time point is always consistent
        assert!(stn.consistent());
        assert_eq!(stn.derived_constraint("only", "only"), Some(Bound::exact(0)));
    }

    #[test]
    fn test_chain_consistent() {
        let mut stn = Stn::new();
        stn.add_constraint("start", "middle", Bound::new(0, 10)).unwrap();
        stn.add_constraint("middle", "end", Bound::new(5, 15)).unwrap();
        stn.add_constraint("start", "end", Bound::new(5, 25)).unwrap();
        assert!(stn.consistent());

        let derived = stn.derived_constraint("start", "end").unwrap();
        assert_eq!(derived, Bound::new(5, 25));
    }

    #[test]
    fn test_chain_inconsistent() {
        let mut stn = Stn::new();
        stn.add_constraint("start", "middle", Bound::exact(5)).unwrap();
        stn.add_constraint("middle", "end", Bound::exact(5)).unwrap();
        // The chain forces end - start = 10, which contradicts 15
        stn.add_constraint("start", "end", Bound::exact(15)).unwrap();
        assert!(!stn.consistent());
    }

    #[test]
    fn test_forward_backward_contradiction() {
        let mut stn = Stn::new();
        stn.add_constraint("p", "q", Bound::exact(10)).unwrap();
        stn.add_constraint("q", "p", Bound::exact(10)).unwrap();
        // The two differences must sum to zero
        assert!(!stn.consistent());
    }

    #[test]
    fn test_empty_intersection_marks_inconsistent() {
        let mut stn = Stn::new();
        stn.add_constraint("p", "q", Bound::new(0, 5)).unwrap();
        stn.add_constraint("p", "q", Bound::new(10, 20)).unwrap();
        assert!(!stn.consistent());
    }

    #[test]
    fn test_get_constraint_defaults_wide() {
        let mut stn = Stn::new();
        stn.add_time_point("a");
        stn.add_time_point("b");
        assert_eq!(stn.get_constraint("a", "b"), Bound::wide());

        stn.add_constraint("a", "b", Bound::new(3, 7)).unwrap();
        assert_eq!(stn.get_constraint("a", "b"), Bound::new(3, 7));
    }

    #[test]
    fn test_intervals() {
        let mut stn = Stn::new();
        stn.add_interval(Interval::new("iv1", "a_start", "a_end", 10, 20)).unwrap();
        assert!(stn.has_time_point("a_start"));
        assert!(stn.has_time_point("a_end"));
        assert!(stn.consistent());
        assert_eq!(stn.get_constraint("a_start", "a_end"), Bound::new(10, 20));

        // Duplicate ids are rejected
        let err = stn
            .add_interval(Interval::new("iv1", "b_start", "b_end", 0, 0))
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_input");
    }

    #[test]
    fn test_remove_interval_restores_consistency() {
        let mut stn = Stn::new();
        stn.add_constraint("a", "b", Bound::at_most(5)).unwrap();
        stn.add_interval(Interval::new("iv", "a", "b", 10, 10)).unwrap();
        assert!(!stn.consistent());

        assert!(stn.remove_interval("iv").is_some());
        assert!(stn.consistent());
        assert!(stn.remove_interval("iv").is_none());
    }

    #[test]
    fn test_consistency_cache_invalidation() {
        let mut stn = Stn::new();
        stn.add_constraint("a", "b", Bound::new(0, 10)).unwrap();
        assert!(stn.consistent());
        assert!(stn.consistent());

        stn.add_constraint("b", "a", Bound::new(1, 5)).unwrap();
        // b - a in [0,10] and a - b in [1,5] cannot both hold
        assert!(!stn.consistent());
    }

    #[test]
    fn test_schedule_times() {
        let mut stn = Stn::new();
        stn.add_constraint("t0", "a", Bound::new(2, 10)).unwrap();
        stn.add_constraint("a", "b", Bound::new(3, 5)).unwrap();

        let times = stn.schedule_times().unwrap();
        let t0 = times["t0"];
        let a = times["a"];
        let b = times["b"];
        assert!((2..=10).contains(&(a - t0)));
        assert!((3..=5).contains(&(b - a)));
    }

    #[test]
    fn test_segmentation_sizes() {
        let mut stn = Stn::new();
        for i in 0..12 {
            stn.add_time_point(format!("p{i}"));
        }
        let segments = stn.segment(5);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].points.len(), 5);
        assert_eq!(segments[2].points.len(), 2);
    }

    #[test]
    fn test_segmented_consistency_intra_segment() {
        let mut stn = Stn::new();
        // Two independent clusters of three points each
        for cluster in ["x", "y"] {
            stn.add_constraint(format!("{cluster}0"), format!("{cluster}1"), Bound::new(0, 5)).unwrap();
            stn.add_constraint(format!("{cluster}1"), format!("{cluster}2"), Bound::new(0, 5)).unwrap();
        }
        assert!(stn.consistent_segmented(3));

        // Break one cluster
        stn.add_constraint("y2", "y1", Bound::exact(20)).unwrap();
        stn.add_constraint("y1", "y2", Bound::exact(20)).unwrap();
        assert!(!stn.consistent_segmented(3));
    }

    #[test]
    fn test_segmented_consistency_crossing_constraint() {
        let mut stn = Stn::new();
        for i in 0..6 {
            stn.add_time_point(format!("p{i}"));
        }
        // Contradiction whose endpoints land in different segments of size 3
        stn.add_constraint("p0", "p5", Bound::exact(10)).unwrap();
        stn.add_constraint("p5", "p0", Bound::exact(10)).unwrap();
        // Each segment alone is fine, the merge pass catches the conflict
        assert!(!stn.consistent_segmented(3));
    }
}
