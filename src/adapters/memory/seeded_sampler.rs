//! In-memory candidate sampler over fixed pools, reproducible by seed.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::models::{CandidateRef, ClippedRegion};
use crate::domain::ports::{CandidateSampler, SpatialError};

/// Draws uniformly without replacement from a fixed pool per region.
///
/// Pools are keyed by [`ClippedRegion::index`], and only candidates inside
/// the region's geometry are eligible. Each call draws
/// independently, so repeated calls may return the same candidate; the
/// engine's dedup handles that the same way it does for the database.
pub struct SeededCandidateSampler {
    pools: HashMap<usize, Vec<CandidateRef>>,
    rng: Mutex<StdRng>,
}

impl SeededCandidateSampler {
    pub fn new(pools: HashMap<usize, Vec<CandidateRef>>, seed: u64) -> Self {
        Self {
            pools,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Pools given in region order, indexed from zero.
    pub fn from_pools(pools: Vec<Vec<CandidateRef>>, seed: u64) -> Self {
        Self::new(pools.into_iter().enumerate().collect(), seed)
    }

    pub fn pool_size(&self, region: usize) -> usize {
        self.pools.get(&region).map_or(0, Vec::len)
    }
}

#[async_trait]
impl CandidateSampler for SeededCandidateSampler {
    async fn sample(
        &self,
        region: &ClippedRegion,
        count: usize,
    ) -> Result<Vec<CandidateRef>, SpatialError> {
        let Some(pool) = self.pools.get(&region.index) else {
            return Ok(Vec::new());
        };

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SpatialError::Query("sampler state poisoned".to_string()))?;

        let inside: Vec<&CandidateRef> = pool
            .iter()
            .filter(|candidate| region.geometry.contains_point(candidate.lon, candidate.lat))
            .collect();

        Ok(inside
            .choose_multiple(&mut *rng, count)
            .map(|&candidate| candidate.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Geometry;
    use std::collections::HashSet;

    fn region(index: usize) -> ClippedRegion {
        ClippedRegion {
            index,
            geometry: Geometry::Polygon(vec![vec![
                [-1.0, 51.0],
                [1.0, 51.0],
                [1.0, 52.0],
                [-1.0, 52.0],
                [-1.0, 51.0],
            ]]),
        }
    }

    fn pool(prefix: &str, len: usize) -> Vec<CandidateRef> {
        (0..len)
            .map(|i| CandidateRef::new(format!("{prefix}{i}"), 51.5, -0.1))
            .collect()
    }

    #[tokio::test]
    async fn test_same_seed_same_draws() {
        let a = SeededCandidateSampler::from_pools(vec![pool("a", 50)], 7);
        let b = SeededCandidateSampler::from_pools(vec![pool("a", 50)], 7);

        let first = a.sample(&region(0), 5).await.unwrap();
        let second = b.sample(&region(0), 5).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_draw_without_replacement_within_call() {
        let sampler = SeededCandidateSampler::from_pools(vec![pool("a", 20)], 1);
        let drawn = sampler.sample(&region(0), 20).await.unwrap();

        let unique: HashSet<_> = drawn.iter().map(|c| c.id.clone()).collect();
        assert_eq!(unique.len(), 20);
    }

    #[tokio::test]
    async fn test_sparse_region_yields_fewer() {
        let sampler = SeededCandidateSampler::from_pools(vec![pool("a", 3)], 1);
        assert_eq!(sampler.sample(&region(0), 10).await.unwrap().len(), 3);
        assert_eq!(sampler.pool_size(0), 3);
    }

    #[tokio::test]
    async fn test_unknown_region_is_empty() {
        let sampler = SeededCandidateSampler::from_pools(vec![pool("a", 3)], 1);
        assert!(sampler.sample(&region(4), 2).await.unwrap().is_empty());
        assert_eq!(sampler.pool_size(4), 0);
    }

    #[tokio::test]
    async fn test_candidates_outside_region_are_never_drawn() {
        let mut candidates = pool("in", 4);
        candidates.push(CandidateRef::new("out", 55.0, -0.1));
        let sampler = SeededCandidateSampler::from_pools(vec![candidates], 3);

        let drawn = sampler.sample(&region(0), 10).await.unwrap();
        assert_eq!(drawn.len(), 4);
        assert!(drawn.iter().all(|c| c.id.as_str().starts_with("in")));
        assert_eq!(sampler.pool_size(0), 5);
    }
}
