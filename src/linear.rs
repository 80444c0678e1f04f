use crate::{
    distance::euclidean,
    error::IndexError,
    index::{Point, SpatialIndex},
    neighbors::Neighbors,
};

/// Brute-force index: every query scans every point. Slow, but trivially
/// correct, so it serves as the oracle for the other variants.
#[derive(Debug, Default)]
pub struct LinearIndex {
    live: usize,
}

pub struct LinearHandle {
    data: Vec<Point>,
}

impl LinearIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles built and not yet released.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.live
    }
}

impl SpatialIndex for LinearIndex {
    type Handle = LinearHandle;

    fn name(&self) -> &str {
        "Linear scan"
    }

    fn build(&mut self, points: &[Point]) -> Result<LinearHandle, IndexError> {
        self.live += 1;
        Ok(LinearHandle {
            data: points.to_vec(),
        })
    }

    fn nearest_k(
        &self,
        handle: &LinearHandle,
        query: &Point,
        k: usize,
    ) -> Result<Vec<usize>, IndexError> {
        let mut neighbors = Neighbors::new(k.min(handle.data.len()));
        for (id, point) in handle.data.iter().enumerate() {
            neighbors.push(euclidean(point, query), id);
        }
        Ok(neighbors.into_ids())
    }

    fn release(&mut self, handle: LinearHandle) {
        self.live -= 1;
        drop(handle);
    }
}
