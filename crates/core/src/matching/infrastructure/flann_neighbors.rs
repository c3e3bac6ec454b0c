use opencv::core::{DMatch, Mat, Vector};
use opencv::features2d::FlannBasedMatcher;
use opencv::prelude::*;

use super::mat_convert::descriptors_to_mat;
use crate::matching::domain::descriptor_matcher::{NearestNeighbors, Neighbor};
use crate::matching::domain::feature_set::Descriptors;
use crate::matching::domain::matching_error::MatchingError;

/// Approximate L2 k-NN over float descriptors using a FLANN KD-tree index.
pub struct FlannNeighbors;

impl NearestNeighbors for FlannNeighbors {
    fn knn2(&self, query: &Descriptors, train: &Descriptors) -> Result<Vec<Vec<Neighbor>>, MatchingError> {
        let (Descriptors::Float { dim: qd, .. }, Descriptors::Float { dim: td, .. }) = (query, train)
        else {
            return Err(MatchingError::Other(
                "FLANN search needs float descriptors".into(),
            ));
        };
        if query.is_empty() || train.is_empty() {
            return Ok(vec![Vec::new(); query.len()]);
        }
        if qd != td {
            return Err(MatchingError::Other(format!(
                "descriptor dimensions differ: {qd} vs {td}"
            )));
        }

        let query_mat = descriptors_to_mat(query)?;
        let train_mat = descriptors_to_mat(train)?;
        let matcher = FlannBasedMatcher::new_def()?;
        let mut matches = Vector::<Vector<DMatch>>::new();
        matcher.knn_train_match(&query_mat, &train_mat, &mut matches, 2, &Mat::default(), false)?;

        Ok(matches
            .iter()
            .map(|pair| {
                pair.iter()
                    .map(|m| Neighbor {
                        train_idx: m.train_idx as usize,
                        distance: m.distance,
                    })
                    .collect()
            })
            .collect())
    }
}
