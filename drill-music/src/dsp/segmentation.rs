//! Contiguous agglomerative clustering
//!
//! Frames start as singleton clusters joined only to their temporal
//! neighbours. The adjacent pair with the smallest Ward cost
//! `n_a * n_b / (n_a + n_b) * |mean_a - mean_b|^2` is merged until the
//! requested number of clusters remains. Because only neighbours can merge,
//! every cluster is a contiguous run of frames.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;

/// Segmentation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentationError {
    #[error("segment count must be positive")]
    ZeroSegments,

    #[error("cannot split {frames} frames into {segments} segments")]
    TooFewFrames { frames: usize, segments: usize },

    #[error("feature frames have inconsistent dimensions")]
    RaggedFeatures,
}

#[derive(Debug, Clone)]
struct Cluster {
    start: usize,
    count: usize,
    sum: Vec<f64>,
    prev: Option<usize>,
    next: Option<usize>,
    alive: bool,
    version: u64,
}

impl Cluster {
    fn ward_cost(&self, other: &Cluster) -> f64 {
        let (na, nb) = (self.count as f64, other.count as f64);
        let distance: f64 = self
            .sum
            .iter()
            .zip(other.sum.iter())
            .map(|(a, b)| (a / na - b / nb).powi(2))
            .sum();
        na * nb / (na + nb) * distance
    }
}

/// Candidate merge of `left` with its right neighbour
#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    cost: f64,
    left: usize,
    right: usize,
    left_version: u64,
    right_version: u64,
}

impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    // Reversed so the max-heap pops the cheapest, left-most merge first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.left.cmp(&self.left))
    }
}

fn candidate(clusters: &[Cluster], left: usize, right: usize) -> MergeCandidate {
    MergeCandidate {
        cost: clusters[left].ward_cost(&clusters[right]),
        left,
        right,
        left_version: clusters[left].version,
        right_version: clusters[right].version,
    }
}

/// First frame of each of `segments` contiguous clusters, starting with 0
///
/// # Errors
/// * [`SegmentationError::ZeroSegments`] - `segments == 0`
/// * [`SegmentationError::TooFewFrames`] - fewer frames than segments
/// * [`SegmentationError::RaggedFeatures`] - frames of different lengths
pub fn agglomerative_boundaries<F: AsRef<[f32]>>(
    features: &[F],
    segments: usize,
) -> Result<Vec<usize>, SegmentationError> {
    if segments == 0 {
        return Err(SegmentationError::ZeroSegments);
    }
    if features.len() < segments {
        return Err(SegmentationError::TooFewFrames {
            frames: features.len(),
            segments,
        });
    }

    let dims = features[0].as_ref().len();
    if features.iter().any(|f| f.as_ref().len() != dims) {
        return Err(SegmentationError::RaggedFeatures);
    }

    let n = features.len();
    let mut clusters: Vec<Cluster> = features
        .iter()
        .enumerate()
        .map(|(i, f)| Cluster {
            start: i,
            count: 1,
            sum: f.as_ref().iter().map(|v| *v as f64).collect(),
            prev: i.checked_sub(1),
            next: if i + 1 < n { Some(i + 1) } else { None },
            alive: true,
            version: 0,
        })
        .collect();

    let mut heap: BinaryHeap<MergeCandidate> =
        (0..n.saturating_sub(1)).map(|i| candidate(&clusters, i, i + 1)).collect();

    let mut remaining = n;
    while remaining > segments {
        let Some(merge) = heap.pop() else {
            break;
        };
        let (left, right) = (merge.left, merge.right);
        if !clusters[left].alive
            || !clusters[right].alive
            || clusters[left].version != merge.left_version
            || clusters[right].version != merge.right_version
        {
            continue;
        }

        let absorbed = std::mem::take(&mut clusters[right].sum);
        let absorbed_count = clusters[right].count;
        let after = clusters[right].next;
        clusters[right].alive = false;

        let target = &mut clusters[left];
        for (acc, v) in target.sum.iter_mut().zip(absorbed.iter()) {
            *acc += v;
        }
        target.count += absorbed_count;
        target.next = after;
        target.version += 1;

        if let Some(after) = after {
            clusters[after].prev = Some(left);
            heap.push(candidate(&clusters, left, after));
        }
        if let Some(before) = clusters[left].prev {
            heap.push(candidate(&clusters, before, left));
        }
        remaining -= 1;
    }

    let mut boundaries = Vec::with_capacity(segments);
    let mut cursor = Some(0);
    while let Some(idx) = cursor {
        boundaries.push(clusters[idx].start);
        cursor = clusters[idx].next;
    }

    Ok(boundaries)
}
