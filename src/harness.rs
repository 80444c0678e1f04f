//! Drives one index variant through the benchmark protocol: a timed build,
//! a timed query phase over sampled anchors, then release of the handle.

use std::{
    hint::black_box,
    time::{Duration, Instant},
};

use rand::{Rng, RngCore};
use tracing::{debug, info};

use crate::{
    dataset::Dataset,
    distance::euclidean,
    error::IndexError,
    index::{Point, SpatialIndex},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Build,
    Query,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingSample {
    pub phase: Phase,
    pub elapsed_seconds: f64,
}

impl TimingSample {
    fn new(phase: Phase, elapsed: Duration) -> Self {
        TimingSample {
            phase,
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunParams {
    pub lookups: usize,
    pub nearest: usize,
    /// Keep every query's result for cross-variant validation.
    pub retain_results: bool,
}

impl RunParams {
    /// Counts below one are raised to one.
    #[must_use]
    pub fn new(lookups: usize, nearest: usize) -> Self {
        RunParams {
            lookups: lookups.max(1),
            nearest: nearest.max(1),
            retain_results: false,
        }
    }

    #[must_use]
    pub fn retaining_results(mut self, retain: bool) -> Self {
        self.retain_results = retain;
        self
    }
}

/// Pre-sampled query anchors, replayed identically for every variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryWorkload {
    anchors: Vec<usize>,
}

impl QueryWorkload {
    /// Draw `max(1, lookups)` uniform anchor positions into `dataset`.
    pub fn sample<R: RngCore + ?Sized>(dataset: &Dataset, lookups: usize, rng: &mut R) -> Self {
        let anchors = (0..lookups.max(1))
            .map(|_| rng.gen_range(0..dataset.len()))
            .collect();
        QueryWorkload { anchors }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    #[must_use]
    pub fn anchors(&self) -> &[usize] {
        &self.anchors
    }
}

/// Where the query phase takes its anchors from.
pub enum Anchors<'a> {
    /// Draw each anchor from the generator inside the timed loop.
    Draw(&'a mut dyn RngCore),
    /// Replay a workload sampled beforehand.
    Replay(&'a QueryWorkload),
}

impl Anchors<'_> {
    /// A replayed workload must hold exactly one anchor per lookup.
    fn check(&self, lookups: usize) -> Result<(), IndexError> {
        match self {
            Anchors::Replay(workload) if workload.len() != lookups => {
                Err(IndexError::Workload {
                    anchors: workload.len(),
                    lookups,
                })
            }
            _ => Ok(()),
        }
    }

    fn next(&mut self, lookup: usize, dataset_len: usize) -> Option<usize> {
        match self {
            Anchors::Draw(rng) => Some(rng.gen_range(0..dataset_len)),
            Anchors::Replay(workload) => workload.anchors.get(lookup).copied(),
        }
    }
}

/// Timings (and optionally results) of one variant's run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub variant: String,
    pub build: TimingSample,
    pub query: TimingSample,
    pub results: Option<Vec<Vec<usize>>>,
}

impl RunReport {
    #[must_use]
    pub fn samples(&self) -> [TimingSample; 2] {
        [self.build, self.query]
    }
}

/// Owns a built handle and gives it back to its index when dropped, whether
/// the run finished, returned early with an error, or is unwinding.
pub struct IndexGuard<'a, I: SpatialIndex> {
    index: &'a mut I,
    handle: Option<I::Handle>,
}

impl<'a, I: SpatialIndex> IndexGuard<'a, I> {
    pub fn new(index: &'a mut I, handle: I::Handle) -> Self {
        IndexGuard {
            index,
            handle: Some(handle),
        }
    }

    pub fn nearest_k(&self, query: &Point, k: usize) -> Result<Vec<usize>, IndexError> {
        match &self.handle {
            Some(handle) => self.index.nearest_k(handle, query, k),
            None => Err(IndexError::Query("index handle already released".to_owned())),
        }
    }
}

impl<I: SpatialIndex> Drop for IndexGuard<'_, I> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.index.release(handle);
            debug!(variant = self.index.name(), "released index handle");
        }
    }
}

/// Run the full protocol for one variant.
///
/// A replayed workload whose length differs from `params.lookups` is
/// rejected before anything is built. Converting records to points happens before the build timer starts. The
/// handle is released before this returns, on every path.
pub fn run<I: SpatialIndex>(
    index: &mut I,
    dataset: &Dataset,
    params: &RunParams,
    mut anchors: Anchors<'_>,
) -> Result<RunReport, IndexError> {
    anchors.check(params.lookups)?;
    let variant = index.name().to_owned();
    let points = dataset.points();
    info!(
        variant = %variant,
        points = points.len(),
        lookups = params.lookups,
        nearest = params.nearest,
        "starting benchmark run"
    );

    let start = Instant::now();
    let handle = index.build(&points)?;
    let build = TimingSample::new(Phase::Build, start.elapsed());
    let guard = IndexGuard::new(index, handle);
    info!(variant = %variant, seconds = build.elapsed_seconds, "built index");

    let mut results = params
        .retain_results
        .then(|| Vec::with_capacity(params.lookups));
    let start = Instant::now();
    for lookup in 0..params.lookups {
        let query = anchors
            .next(lookup, points.len())
            .and_then(|anchor| points.get(anchor))
            .ok_or_else(|| IndexError::Query(format!("lookup {lookup} has no anchor")))?;
        let neighbors = guard.nearest_k(query, params.nearest)?;
        match results.as_mut() {
            Some(results) => results.push(neighbors),
            None => {
                black_box(neighbors);
            }
        }
    }
    let query = TimingSample::new(Phase::Query, start.elapsed());
    info!(variant = %variant, seconds = query.elapsed_seconds, "finished queries");

    drop(guard);
    Ok(RunReport {
        variant,
        build,
        query,
        results,
    })
}

/// Outcome of comparing two runs over the same workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validation {
    pub compared: usize,
    pub mismatches: usize,
}

/// Compare two runs query by query. Results are compared on distances, since
/// equidistant points may come back in a different order or selection.
#[must_use]
pub fn validate(dataset: &Dataset, workload: &QueryWorkload, a: &RunReport, b: &RunReport) -> Validation {
    let (Some(left), Some(right)) = (&a.results, &b.results) else {
        return Validation {
            compared: 0,
            mismatches: 0,
        };
    };
    let distances = |anchor: usize, ids: &[usize]| -> Vec<f64> {
        let query = dataset[anchor].point();
        ids.iter()
            .map(|&id| euclidean(&dataset[id].point(), &query))
            .collect()
    };

    let mut validation = Validation {
        compared: 0,
        mismatches: 0,
    };
    for ((&anchor, l), r) in workload.anchors().iter().zip(left).zip(right) {
        validation.compared += 1;
        let l = distances(anchor, l.as_slice());
        let r = distances(anchor, r.as_slice());
        let same = l.len() == r.len() && l.iter().zip(&r).all(|(x, y)| (x - y).abs() <= 1e-9);
        if !same {
            validation.mismatches += 1;
        }
    }
    validation
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rand::{rngs::StdRng, SeedableRng};

    use super::{run, validate, Anchors, Phase, QueryWorkload, RunParams};
    use crate::{
        dataset::{random_cities, CityRecord, Dataset},
        error::IndexError,
        index::{Point, SpatialIndex},
        BucketIndex, VpTree,
    };

    /// Counts every call and optionally fails the query numbered `fail_at`.
    #[derive(Default)]
    struct Scripted {
        builds: usize,
        releases: usize,
        queries: Cell<usize>,
        requested: Cell<Vec<usize>>,
        fail_at: Option<usize>,
        fail_build: bool,
    }

    impl SpatialIndex for Scripted {
        type Handle = usize;

        fn name(&self) -> &str {
            "Scripted"
        }

        fn build(&mut self, points: &[Point]) -> Result<usize, IndexError> {
            if self.fail_build {
                return Err(IndexError::Build("refused".to_owned()));
            }
            self.builds += 1;
            Ok(points.len())
        }

        fn nearest_k(&self, len: &usize, _: &Point, k: usize) -> Result<Vec<usize>, IndexError> {
            let call = self.queries.get();
            self.queries.set(call + 1);
            let mut requested = self.requested.take();
            requested.push(k);
            self.requested.set(requested);
            if self.fail_at == Some(call) {
                return Err(IndexError::Query("boom".to_owned()));
            }
            Ok((0..k.min(*len)).collect())
        }

        fn release(&mut self, _: usize) {
            self.releases += 1;
        }
    }

    fn three_points() -> Dataset {
        let city = |latitude, longitude| CityRecord {
            country: String::new(),
            name: String::new(),
            latitude,
            longitude,
        };
        Dataset::new(vec![city(0.0, 0.0), city(10.0, 10.0), city(-5.0, 20.0)])
            .expect("non-empty")
    }

    #[test]
    fn query_phase_issues_exactly_lookups_calls() {
        let dataset = three_points();
        let mut rng = StdRng::seed_from_u64(0);
        let mut scripted = Scripted::default();
        let report = run(
            &mut scripted,
            &dataset,
            &RunParams::new(5, 2),
            Anchors::Draw(&mut rng),
        )
        .expect("scripted run");

        assert_eq!(scripted.builds, 1);
        assert_eq!(scripted.releases, 1);
        assert_eq!(scripted.queries.get(), 5);
        assert_eq!(scripted.requested.take(), vec![2; 5]);
        assert_eq!(report.build.phase, Phase::Build);
        assert_eq!(report.query.phase, Phase::Query);
        assert!(report.build.elapsed_seconds >= 0.0);
        assert!(report.query.elapsed_seconds >= 0.0);
        assert!(report.results.is_none());
    }

    #[test]
    fn release_runs_once_when_query_fails() {
        let dataset = three_points();
        let mut rng = StdRng::seed_from_u64(0);
        let mut scripted = Scripted {
            fail_at: Some(2),
            ..Scripted::default()
        };
        let err = run(
            &mut scripted,
            &dataset,
            &RunParams::new(5, 2),
            Anchors::Draw(&mut rng),
        )
        .unwrap_err();

        assert_eq!(err, IndexError::Query("boom".to_owned()));
        assert_eq!(scripted.queries.get(), 3);
        assert_eq!(scripted.releases, 1);
    }

    #[test]
    fn failed_build_releases_nothing() {
        let dataset = three_points();
        let mut rng = StdRng::seed_from_u64(0);
        let mut scripted = Scripted {
            fail_build: true,
            ..Scripted::default()
        };
        let result = run(
            &mut scripted,
            &dataset,
            &RunParams::new(5, 2),
            Anchors::Draw(&mut rng),
        );
        assert!(matches!(result, Err(IndexError::Build(_))));
        assert_eq!(scripted.queries.get(), 0);
        assert_eq!(scripted.releases, 0);
    }

    #[test]
    fn params_are_clamped() {
        let params = RunParams::new(0, 0);
        assert_eq!(params.lookups, 1);
        assert_eq!(params.nearest, 1);
        assert!(!params.retain_results);
    }

    #[test]
    fn workload_is_reproducible() {
        let dataset = random_cities(100, &mut StdRng::seed_from_u64(7));
        let a = QueryWorkload::sample(&dataset, 50, &mut StdRng::seed_from_u64(1));
        let b = QueryWorkload::sample(&dataset, 50, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.anchors().iter().all(|&anchor| anchor < dataset.len()));
    }

    #[test]
    fn replayed_workload_is_identical_across_variants() {
        let dataset = random_cities(500, &mut StdRng::seed_from_u64(3));
        let workload = QueryWorkload::sample(&dataset, 40, &mut StdRng::seed_from_u64(4));
        let params = RunParams::new(40, 5).retaining_results(true);

        let mut bucket = BucketIndex::default();
        let mut tree = VpTree::new();
        let a = run(&mut bucket, &dataset, &params, Anchors::Replay(&workload)).expect("bucket");
        let b = run(&mut tree, &dataset, &params, Anchors::Replay(&workload)).expect("vp-tree");
        assert_eq!(bucket.live_handles(), 0);
        assert_eq!(tree.live_handles(), 0);

        let results = a.results.as_ref().expect("retained");
        assert_eq!(results.len(), 40);
        assert!(results.iter().all(|ids| ids.len() == 5));

        let validation = validate(&dataset, &workload, &a, &b);
        assert_eq!(validation.compared, 40);
        assert_eq!(validation.mismatches, 0);
    }

    #[test]
    fn workload_length_must_match_lookups() {
        let dataset = three_points();
        let workload = QueryWorkload::sample(&dataset, 2, &mut StdRng::seed_from_u64(0));
        let mut scripted = Scripted::default();
        let err = run(
            &mut scripted,
            &dataset,
            &RunParams::new(5, 1),
            Anchors::Replay(&workload),
        )
        .unwrap_err();

        assert_eq!(
            err,
            IndexError::Workload {
                anchors: 2,
                lookups: 5
            }
        );
        assert_eq!(scripted.builds, 0);
        assert_eq!(scripted.queries.get(), 0);
        assert_eq!(scripted.releases, 0);
    }

    #[test]
    fn validate_without_results_compares_nothing() {
        let dataset = three_points();
        let workload = QueryWorkload::sample(&dataset, 3, &mut StdRng::seed_from_u64(0));
        let mut scripted = Scripted::default();
        let report = run(
            &mut scripted,
            &dataset,
            &RunParams::new(3, 1),
            Anchors::Replay(&workload),
        )
        .expect("scripted run");
        let validation = validate(&dataset, &workload, &report, &report);
        assert_eq!(validation.compared, 0);
    }
}
