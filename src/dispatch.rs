//! Wires dataset, harness and report together for one invocation: the
//! bucket index runs first, then the VP-tree, over the same dataset and
//! counts.

use std::io::Write;

use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};

use crate::{
    bucket::BucketIndex,
    cli::{Invocation, Source},
    config::{AnchorPolicy, Config},
    dataset::{load_cities, random_cities, Dataset},
    error::BenchError,
    harness::{self, Anchors, QueryWorkload, RunParams, RunReport, Validation},
    index::SpatialIndex,
    report::Report,
    vptree::VpTree,
};

/// Everything one invocation measured.
#[derive(Clone, Debug)]
pub struct Summary {
    pub runs: Vec<RunReport>,
    pub validation: Option<Validation>,
}

/// Obtain the dataset, run both variants and write the report to `out`.
///
/// Dataset errors surface before any index is built or timer started.
pub fn execute<W: Write>(
    invocation: &Invocation,
    config: &Config,
    out: W,
) -> Result<Summary, BenchError> {
    info!(seed = config.seed, anchors = ?config.anchors, "starting geobench");
    let mut rng = StdRng::seed_from_u64(config.seed);

    let dataset = match invocation.source {
        Source::Random { size } => random_cities(size, &mut rng),
        Source::Cities => load_cities(&config.cities_path)?,
    };

    let workload = match config.anchors {
        AnchorPolicy::Shared => Some(QueryWorkload::sample(
            &dataset,
            invocation.lookups,
            &mut rng,
        )),
        AnchorPolicy::Independent => None,
    };
    let validate = config.validate && workload.is_some();
    if config.validate && !validate {
        warn!("validation needs shared anchors; skipping it");
    }
    let params = RunParams::new(invocation.lookups, invocation.nearest).retaining_results(validate);

    let mut report = Report::new(out);
    let bucket = run_variant(
        &mut BucketIndex::default(),
        &dataset,
        &params,
        workload.as_ref(),
        &mut rng,
    )?;
    report.section(&bucket)?;
    let vptree = run_variant(
        &mut VpTree::new(),
        &dataset,
        &params,
        workload.as_ref(),
        &mut rng,
    )?;
    report.section(&vptree)?;

    let validation = match (&workload, validate) {
        (Some(workload), true) => {
            let validation = harness::validate(&dataset, workload, &bucket, &vptree);
            if validation.mismatches > 0 {
                warn!(
                    mismatches = validation.mismatches,
                    compared = validation.compared,
                    "variants disagree"
                );
            } else {
                info!(compared = validation.compared, "variants agree");
            }
            report.validation(&validation)?;
            Some(validation)
        }
        _ => None,
    };

    Ok(Summary {
        runs: vec![bucket, vptree],
        validation,
    })
}

fn run_variant<I: SpatialIndex>(
    index: &mut I,
    dataset: &Dataset,
    params: &RunParams,
    workload: Option<&QueryWorkload>,
    rng: &mut StdRng,
) -> Result<RunReport, BenchError> {
    let anchors = match workload {
        Some(workload) => Anchors::Replay(workload),
        None => Anchors::Draw(rng),
    };
    let name = index.name().to_owned();
    harness::run(index, dataset, params, anchors).map_err(|err| BenchError::index(&name, err))
}
