//! Series Clustering
//!
//! Location series in the same sentence usually describe one spatially
//! coherent area. The cluster check flags top candidates that sit far
//! from the series centroid relative to how spread out the siblings are.
//! Outliers are flagged, never discarded.

use crate::spatial::distance::haversine_km;

/// Flag cluster outliers among the top candidates of sibling LOCATION
/// nodes.
///
/// A point is an outlier when its distance to the centroid exceeds the
/// median inter-sibling distance plus `margin_km`. Fewer than three
/// points never produce outliers.
pub fn flag_cluster_outliers(points: &[(f64, f64)], margin_km: f64) -> Vec<bool> {
    if points.len() < 3 {
        return vec![false; points.len()];
    }

    let n = points.len() as f64;
    let centroid_lat = points.iter().map(|p| p.0).sum::<f64>() / n;
    let centroid_lon = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut pairwise = Vec::new();
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            pairwise.push(haversine_km(a.0, a.1, b.0, b.1));
        }
    }
    let threshold = median(&mut pairwise) + margin_km;

    points
        .iter()
        .map(|p| haversine_km(p.0, p.1, centroid_lat, centroid_lon) > threshold)
        .collect()
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
