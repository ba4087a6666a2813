//! A simplified HDBSCAN* over cosine distance.
//!
//! No pack example imports a real HDBSCAN crate (see DESIGN.md), so this is
//! hand-rolled in the teacher's own DBSCAN idiom
//! ([`crate::clustering`]'s `region_query`/`expand_cluster` shape mirrors
//! the teacher's `patterns::dbscan::algorithms`) rather than pulled from an
//! unvetted dependency. It is a deliberate simplification of full HDBSCAN*:
//! core-distance plus mutual-reachability distance feed a DBSCAN pass at a
//! single adaptively-chosen radius, with no condensed tree or cluster
//! stability extraction. This is documented, not hidden, behavior.

/// Label assigned to a point that was never grouped into a stable cluster.
pub const NOISE_LABEL: i64 = -1;
const UNVISITED: i64 = -2;

/// Cosine distance (`1 - cosine_similarity`), clamped to `[0, 2]`.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let similarity = crate::embeddings::cosine_similarity(a, b);
    f64::from(1.0 - similarity).clamp(0.0, 2.0)
}

/// The core distance of point `i`: the distance to its `min_samples`-th
/// nearest neighbor (HDBSCAN's density estimate at that point).
fn core_distances(points: &[Vec<f32>], min_samples: usize) -> Vec<f64> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut distances: Vec<f64> = points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, q)| cosine_distance(p, q))
                .collect();
            distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let k = min_samples.saturating_sub(1).min(distances.len().saturating_sub(1));
            distances.get(k).copied().unwrap_or(0.0)
        })
        .collect()
}

/// Mutual reachability distance: `max(core(a), core(b), dist(a, b))`.
fn mutual_reachability(core: &[f64], points: &[Vec<f32>], i: usize, j: usize) -> f64 {
    cosine_distance(&points[i], &points[j]).max(core[i]).max(core[j])
}

/// Chooses the DBSCAN radius as the median mutual-reachability distance to
/// each point's `min_samples`-th neighbor (grounded in the teacher's
/// `calculate_adaptive_eps` median-of-kth-distances heuristic).
fn adaptive_radius(core: &[f64], points: &[Vec<f32>], min_samples: usize) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    let mut kth: Vec<f64> = (0..n)
        .map(|i| {
            let mut dists: Vec<f64> = (0..n)
                .filter(|&j| j != i)
                .map(|j| mutual_reachability(core, points, i, j))
                .collect();
            dists.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let k = min_samples.saturating_sub(1).min(dists.len().saturating_sub(1));
            dists.get(k).copied().unwrap_or(0.0)
        })
        .collect();
    kth.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = kth.len() / 2;
    if kth.len() % 2 == 0 && mid > 0 {
        (kth[mid - 1] + kth[mid]) / 2.0
    } else {
        kth[mid]
    }
}

fn region_query(core: &[f64], points: &[Vec<f32>], i: usize, radius: f64) -> Vec<usize> {
    (0..points.len())
        .filter(|&j| j != i && mutual_reachability(core, points, i, j) <= radius)
        .collect()
}

fn expand_cluster(
    core: &[f64],
    points: &[Vec<f32>],
    seed: usize,
    neighbors: &[usize],
    cluster_id: i64,
    radius: f64,
    min_samples: usize,
    labels: &mut [i64],
) {
    let mut queue: Vec<usize> = neighbors.to_vec();
    labels[seed] = cluster_id;

    while let Some(p) = queue.pop() {
        if labels[p] != UNVISITED {
            if labels[p] == NOISE_LABEL {
                labels[p] = cluster_id;
            }
            continue;
        }
        labels[p] = cluster_id;
        let p_neighbors = region_query(core, points, p, radius);
        if p_neighbors.len() >= min_samples {
            for n in p_neighbors {
                if labels[n] == UNVISITED || labels[n] == NOISE_LABEL {
                    queue.push(n);
                }
            }
        }
    }
}

/// Runs the clustering pass, returning one label per input point:
/// `NOISE_LABEL` (-1) for points not in any cluster of at least
/// `min_cluster_size` members, `0..k` for stable cluster membership.
#[must_use]
pub fn cluster(points: &[Vec<f32>], min_cluster_size: usize, min_samples: usize) -> Vec<i64> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let core = core_distances(points, min_samples);
    let radius = adaptive_radius(&core, points, min_samples);

    let mut labels = vec![UNVISITED; n];
    let mut next_cluster_id = 0i64;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }
        let neighbors = region_query(&core, points, i, radius);
        if neighbors.len() < min_samples {
            labels[i] = NOISE_LABEL;
        } else {
            expand_cluster(&core, points, i, &neighbors, next_cluster_id, radius, min_samples, &mut labels);
            next_cluster_id += 1;
        }
    }

    relabel_small_clusters_as_noise(&mut labels, min_cluster_size);
    labels
}

/// Post-hoc pass: any cluster with fewer than `min_cluster_size` members is
/// folded into noise (spec.md §4.4).
fn relabel_small_clusters_as_noise(labels: &mut [i64], min_cluster_size: usize) {
    use std::collections::HashMap;
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &label in labels.iter() {
        if label != NOISE_LABEL {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    let small: std::collections::HashSet<i64> = counts
        .into_iter()
        .filter(|&(_, count)| count < min_cluster_size)
        .map(|(label, _)| label)
        .collect();
    for label in labels.iter_mut() {
        if small.contains(label) {
            *label = NOISE_LABEL;
        }
    }
}
