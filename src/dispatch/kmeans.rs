use crate::math::Point2d;
use cgmath::{EuclideanSpace, MetricSpace, Vector2};
use itertools::Itertools;
use log::{debug, warn};
use rand::Rng;
use std::cmp::Ordering;

/// The outcome of a k-means clustering.
#[derive(Clone, Debug)]
pub struct KMeansResult {
    /// The cluster centres.
    pub centroids: Vec<Point2d>,
    /// The index of the centroid nearest each point.
    pub assignments: Vec<usize>,
    /// The number of refinement iterations performed.
    pub iterations: usize,
    /// Whether the centroids settled before the iteration limit.
    pub converged: bool,
}

/// Clusters `points` into `k` groups, seeding the centroids with
/// `k` distinct points chosen at random.
///
/// When there are fewer than `k` points, each point becomes its own cluster.
pub fn kmeans<R: Rng + ?Sized>(
    points: &[Point2d],
    k: usize,
    max_iterations: usize,
    threshold: f64,
    rng: &mut R,
) -> KMeansResult {
    let k = k.min(points.len());
    let initial = rand::seq::index::sample(rng, points.len(), k)
        .iter()
        .map(|idx| points[idx])
        .collect();
    kmeans_from(points, initial, max_iterations, threshold)
}

/// Clusters `points` by refining the given initial centroids.
///
/// Refinement stops once no centroid moves further than `threshold`,
/// or after `max_iterations`. A centroid with no points assigned to it stays put.
pub fn kmeans_from(
    points: &[Point2d],
    mut centroids: Vec<Point2d>,
    max_iterations: usize,
    threshold: f64,
) -> KMeansResult {
    let mut iterations = 0;
    let mut converged = false;

    if !centroids.is_empty() {
        while iterations < max_iterations {
            iterations += 1;

            let mut sums = vec![(Vector2::new(0.0, 0.0), 0usize); centroids.len()];
            for point in points {
                let (sum, count) = &mut sums[nearest(&centroids, *point)];
                *sum += point.to_vec();
                *count += 1;
            }

            let mut max_shift: f64 = 0.0;
            for (centroid, (sum, count)) in centroids.iter_mut().zip(sums) {
                if count == 0 {
                    continue;
                }
                let updated = Point2d::from_vec(sum / count as f64);
                max_shift = max_shift.max(centroid.distance(updated));
                *centroid = updated;
            }

            if max_shift <= threshold {
                converged = true;
                break;
            }
        }
    }

    if converged {
        debug!("k-means converged after {} iterations", iterations);
    } else if !centroids.is_empty() {
        warn!(
            "k-means did not converge within {} iterations",
            max_iterations
        );
    }

    let assignments = points.iter().map(|p| nearest(&centroids, *p)).collect();
    KMeansResult {
        centroids,
        assignments,
        iterations,
        converged,
    }
}

/// The index of the centroid nearest `point`. Ties go to the lowest index.
fn nearest(centroids: &[Point2d], point: Point2d) -> usize {
    centroids
        .iter()
        .map(|c| c.distance2(point))
        .position_min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0)
}
