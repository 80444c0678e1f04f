use crate::error::IndexError;

/// `[latitude, longitude]` in degrees.
pub type Point = [f64; 2];

/// Capability every benchmarked index provides.
///
/// `build` hands out a handle that owns the built structure. Point `i` of the
/// input slice is known to the index as identifier `i`. The handle goes back
/// through `release` exactly once, which is why it is taken by value.
pub trait SpatialIndex {
    type Handle;

    /// Human-readable variant name used in reports and logs.
    fn name(&self) -> &str;

    fn build(&mut self, points: &[Point]) -> Result<Self::Handle, IndexError>;

    /// Up to `k` identifiers ordered by non-decreasing distance to `query`.
    /// Returns `min(k, N)` distinct identifiers for an index of `N` points.
    fn nearest_k(
        &self,
        handle: &Self::Handle,
        query: &Point,
        k: usize,
    ) -> Result<Vec<usize>, IndexError>;

    fn release(&mut self, handle: Self::Handle);
}
