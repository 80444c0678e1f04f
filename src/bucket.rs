//! Bucket-based geo index.
//!
//! Points are hashed into square cells of `cell_degrees` on a side. A query
//! scans rings of cells of growing radius around its own cell and stops as
//! soon as nothing outside the scanned square can beat the current `k`-th
//! candidate, so results are exact.

use std::collections::HashMap;

use conv::{ConvUtil, RoundToNegInf};
use tracing::debug;

use crate::{
    distance::euclidean,
    error::IndexError,
    index::{Point, SpatialIndex},
    neighbors::Neighbors,
};

pub const DEFAULT_CELL_DEGREES: f64 = 1.0;

/// Cell keys beyond this magnitude are refused, which keeps ring arithmetic
/// between any two keys far from `i64` overflow.
const MAX_CELL_KEY: i64 = 1 << 40;

type CellKey = (i64, i64);

#[derive(Debug)]
pub struct BucketIndex {
    cell_degrees: f64,
    live: usize,
}

/// Built bucket grid. Owns a copy of the points and the cell table.
pub struct BucketGrid {
    cell_degrees: f64,
    points: Vec<Point>,
    cells: HashMap<CellKey, Vec<usize>>,
    min_key: CellKey,
    max_key: CellKey,
}

impl BucketIndex {
    /// Returns `None` unless `cell_degrees` is a positive finite number.
    #[must_use]
    pub fn new(cell_degrees: f64) -> Option<Self> {
        if !cell_degrees.is_finite() || cell_degrees <= 0.0 {
            return None;
        }
        Some(BucketIndex {
            cell_degrees,
            live: 0,
        })
    }

    /// Number of grids built and not yet released.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.live
    }
}

impl Default for BucketIndex {
    fn default() -> Self {
        BucketIndex {
            cell_degrees: DEFAULT_CELL_DEGREES,
            live: 0,
        }
    }
}

fn cell_key(cell_degrees: f64, point: &Point) -> Option<CellKey> {
    let axis = |degrees: f64| {
        (degrees / cell_degrees)
            .approx_as_by::<i64, RoundToNegInf>()
            .ok()
            .filter(|key| (-MAX_CELL_KEY..=MAX_CELL_KEY).contains(key))
    };
    Some((axis(point[0])?, axis(point[1])?))
}

impl BucketGrid {
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn scan_cell(&self, key: CellKey, query: &Point, neighbors: &mut Neighbors) {
        if let Some(ids) = self.cells.get(&key) {
            for &id in ids {
                neighbors.push(euclidean(&self.points[id], query), id);
            }
        }
    }

    fn scan_ring(&self, center: CellKey, radius: i64, query: &Point, neighbors: &mut Neighbors) {
        let (row, column) = center;
        if radius == 0 {
            self.scan_cell(center, query, neighbors);
            return;
        }
        for dc in -radius..=radius {
            self.scan_cell((row - radius, column + dc), query, neighbors);
            self.scan_cell((row + radius, column + dc), query, neighbors);
        }
        for dr in (1 - radius)..radius {
            self.scan_cell((row + dr, column - radius), query, neighbors);
            self.scan_cell((row + dr, column + radius), query, neighbors);
        }
    }

    /// Distance from `query` to the edge of the square of cells within
    /// `radius` of `center`. Every unscanned point is at least this far away.
    fn scanned_reach(&self, center: CellKey, radius: i64, query: &Point) -> f64 {
        let cell = self.cell_degrees;
        let (row, column) = center;
        // i64 -> f64 is exact for any cell key reachable from finite degrees.
        #[allow(clippy::cast_precision_loss)]
        let edges = [
            query[0] - (row - radius) as f64 * cell,
            (row + radius + 1) as f64 * cell - query[0],
            query[1] - (column - radius) as f64 * cell,
            (column + radius + 1) as f64 * cell - query[1],
        ];
        edges.into_iter().fold(f64::INFINITY, f64::min).max(0.0)
    }

    /// Largest ring radius around `center` that can still hold a point.
    fn max_radius(&self, center: CellKey) -> i64 {
        let (row, column) = center;
        let reach = row
            .abs_diff(self.min_key.0)
            .max(row.abs_diff(self.max_key.0))
            .max(column.abs_diff(self.min_key.1))
            .max(column.abs_diff(self.max_key.1));
        i64::try_from(reach).unwrap_or(i64::MAX)
    }
}

impl SpatialIndex for BucketIndex {
    type Handle = BucketGrid;

    fn name(&self) -> &str {
        "Bucket index"
    }

    fn build(&mut self, points: &[Point]) -> Result<BucketGrid, IndexError> {
        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        let mut min_key = (i64::MAX, i64::MAX);
        let mut max_key = (i64::MIN, i64::MIN);
        for (id, point) in points.iter().enumerate() {
            let key = cell_key(self.cell_degrees, point).ok_or_else(|| {
                IndexError::Build(format!("point {id} has no bucket: {point:?}"))
            })?;
            min_key = (min_key.0.min(key.0), min_key.1.min(key.1));
            max_key = (max_key.0.max(key.0), max_key.1.max(key.1));
            cells.entry(key).or_default().push(id);
        }
        debug!(
            points = points.len(),
            cells = cells.len(),
            cell_degrees = self.cell_degrees,
            "built bucket grid"
        );
        self.live += 1;
        Ok(BucketGrid {
            cell_degrees: self.cell_degrees,
            points: points.to_vec(),
            cells,
            min_key,
            max_key,
        })
    }

    fn nearest_k(
        &self,
        grid: &BucketGrid,
        query: &Point,
        k: usize,
    ) -> Result<Vec<usize>, IndexError> {
        let k = k.min(grid.len());
        if k == 0 {
            return Ok(Vec::new());
        }
        let center = cell_key(grid.cell_degrees, query)
            .ok_or_else(|| IndexError::Query(format!("query has no bucket: {query:?}")))?;

        let mut neighbors = Neighbors::new(k);
        for radius in 0..=grid.max_radius(center) {
            grid.scan_ring(center, radius, query, &mut neighbors);
            if neighbors.is_full()
                && neighbors.kth_distance() <= grid.scanned_reach(center, radius, query)
            {
                break;
            }
        }
        Ok(neighbors.into_ids())
    }

    fn release(&mut self, grid: BucketGrid) {
        self.live -= 1;
        debug!(cells = grid.cell_count(), "released bucket grid");
        drop(grid);
    }
}
