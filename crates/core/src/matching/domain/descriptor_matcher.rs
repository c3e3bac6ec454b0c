use super::feature_set::{Descriptors, FeatureSet};
use super::matching_error::MatchingError;

/// A frame↔slide descriptor pairing that survived the ratio test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correspondence {
    /// Row in the query (frame) descriptors.
    pub query_idx: usize,
    /// Row in the train (slide) descriptors.
    pub train_idx: usize,
    pub distance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub train_idx: usize,
    pub distance: f32,
}

/// k=2 nearest-neighbour search. For every query row, returns up to two
/// train rows ordered closest first.
pub trait NearestNeighbors: Send + Sync {
    fn knn2(&self, query: &Descriptors, train: &Descriptors) -> Result<Vec<Vec<Neighbor>>, MatchingError>;
}

/// Exhaustive Hamming search over packed binary descriptors.
pub struct HammingNeighbors;

impl NearestNeighbors for HammingNeighbors {
    fn knn2(&self, query: &Descriptors, train: &Descriptors) -> Result<Vec<Vec<Neighbor>>, MatchingError> {
        let (
            Descriptors::Binary { width: qw, .. },
            Descriptors::Binary { width: tw, .. },
        ) = (query, train)
        else {
            return Err(MatchingError::Other(
                "Hamming search needs binary descriptors".into(),
            ));
        };
        if qw != tw && !query.is_empty() && !train.is_empty() {
            return Err(MatchingError::Other(format!(
                "descriptor widths differ: {qw} vs {tw} bytes"
            )));
        }

        let mut result = Vec::with_capacity(query.len());
        for q in 0..query.len() {
            let Some(q_row) = query.binary_row(q) else {
                continue;
            };
            let mut best: Option<Neighbor> = None;
            let mut second: Option<Neighbor> = None;
            for t in 0..train.len() {
                let Some(t_row) = train.binary_row(t) else {
                    continue;
                };
                let candidate = Neighbor {
                    train_idx: t,
                    distance: hamming(q_row, t_row) as f32,
                };
                // Strict comparisons keep the earliest row on ties.
                if best.map_or(true, |b| candidate.distance < b.distance) {
                    second = best;
                    best = Some(candidate);
                } else if second.map_or(true, |s| candidate.distance < s.distance) {
                    second = Some(candidate);
                }
            }
            result.push(best.into_iter().chain(second).collect());
        }
        Ok(result)
    }
}

/// Number of differing bits between two equal-length byte strings.
pub fn hamming(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Lowe's ratio test: keep a pair only when the best neighbour is clearly
/// closer than the runner-up. Queries with fewer than two neighbours are dropped.
pub fn ratio_test(neighbors: &[Vec<Neighbor>], ratio: f32) -> Vec<Correspondence> {
    neighbors
        .iter()
        .enumerate()
        .filter_map(|(query_idx, pair)| match pair.as_slice() {
            [best, second, ..] if best.distance < ratio * second.distance => Some(Correspondence {
                query_idx,
                train_idx: best.train_idx,
                distance: best.distance,
            }),
            _ => None,
        })
        .collect()
}

/// Routes descriptors to the right neighbour search (Hamming for binary,
/// approximate L2 for float) and applies the ratio test.
pub struct DescriptorMatcher {
    binary: Box<dyn NearestNeighbors>,
    float: Box<dyn NearestNeighbors>,
}

impl DescriptorMatcher {
    pub fn new(binary: Box<dyn NearestNeighbors>, float: Box<dyn NearestNeighbors>) -> Self {
        Self { binary, float }
    }

    pub fn match_features(
        &self,
        query: &FeatureSet,
        train: &FeatureSet,
        ratio: f32,
    ) -> Result<Vec<Correspondence>, MatchingError> {
        if query.detector != train.detector {
            return Err(MatchingError::DescriptorMismatch {
                query: query.detector,
                train: train.detector,
            });
        }
        if query.is_empty() || train.len() < 2 {
            return Ok(Vec::new());
        }
        let search = if query.detector.is_binary() {
            &self.binary
        } else {
            &self.float
        };
        let neighbors = search.knn2(&query.descriptors, &train.descriptors)?;
        Ok(ratio_test(&neighbors, ratio))
    }
}
