//! Deterministic k-means used to split band profiles into subpopulations.

use serde::{Deserialize, Serialize};

/// Lloyd iterations allowed before a clustering is declared unconverged.
pub const MAX_ITERATIONS: usize = 100;

/// Result of one k-means run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    pub centers: Vec<Vec<f64>>,
    /// Cluster index of every point, in input order.
    pub assignments: Vec<usize>,
    /// Within-cluster sum of squared distances.
    pub sse: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centers: &[Vec<f64>]) -> (usize, f64) {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// Farthest-point seeding starting from the first point.
fn seed_centers(points: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut centers = vec![points[0].clone()];
    while centers.len() < k {
        let (idx, _) = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, nearest(p, &centers).1))
            .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        centers.push(points[idx].clone());
    }
    centers
}

/// Cluster `points` into `k` groups.
///
/// Callers guarantee `1 <= k <= points.len()` and equal dimensions. Empty
/// clusters keep their previous center.
pub fn kmeans(points: &[Vec<f64>], k: usize) -> Clustering {
    let dim = points.first().map_or(0, Vec::len);
    let mut centers = seed_centers(points, k);
    let mut assignments: Vec<usize> = points.iter().map(|p| nearest(p, &centers).0).collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < MAX_ITERATIONS {
        iterations += 1;

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (p, &a) in points.iter().zip(&assignments) {
            counts[a] += 1;
            for (s, v) in sums[a].iter_mut().zip(p) {
                *s += v;
            }
        }
        for ((center, sum), &count) in centers.iter_mut().zip(sums).zip(&counts) {
            if count > 0 {
                *center = sum.into_iter().map(|s| s / count as f64).collect();
            }
        }

        let next: Vec<usize> = points.iter().map(|p| nearest(p, &centers).0).collect();
        if next == assignments {
            converged = true;
            break;
        }
        assignments = next;
    }

    let sse = points
        .iter()
        .zip(&assignments)
        .map(|(p, &a)| squared_distance(p, &centers[a]))
        .sum();

    Clustering {
        centers,
        assignments,
        sse,
        iterations,
        converged,
    }
}
