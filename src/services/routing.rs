//! Visit-order suggestion for a set of BIM coordinates.
//!
//! Greedy nearest-neighbor over great-circle distances, starting from the
//! first point. A heuristic to hand a sensible stop order to the directions
//! API, not a TSP solver.

use serde::Serialize;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance in meters (haversine).
pub fn haversine_m(a: Point, b: Point) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Permutation of `points` indices: start at index 0, then repeatedly hop to
/// the nearest unvisited point. O(N²) distance evaluations, no improvement
/// pass. One or zero points come back unchanged.
pub fn nearest_neighbor_order(points: &[Point]) -> Vec<usize> {
    if points.len() <= 1 {
        return (0..points.len()).collect();
    }

    let mut order = Vec::with_capacity(points.len());
    let mut visited = vec![false; points.len()];
    let mut current = 0usize;
    visited[0] = true;
    order.push(0);

    while order.len() < points.len() {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in points.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let d = haversine_m(points[current], *p);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        let (next, _) = best.expect("unvisited point remains");
        visited[next] = true;
        order.push(next);
        current = next;
    }
    order
}

/// Total length of a tour given as an index permutation (open path, no
/// return leg).
pub fn tour_length_m(points: &[Point], order: &[usize]) -> f64 {
    order.windows(2).map(|w| haversine_m(points[w[0]], points[w[1]])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> Point {
        Point { lat, lon }
    }

    #[test]
    fn haversine_known_distance() {
        // La Serena to Coquimbo is roughly 10-12 km.
        let d = haversine_m(p(-29.9027, -71.2520), p(-29.9533, -71.3395));
        assert!((8_000.0..15_000.0).contains(&d), "got {}", d);
        assert_eq!(haversine_m(p(10.0, 20.0), p(10.0, 20.0)), 0.0);
    }

    #[test]
    fn single_point_is_unchanged() {
        assert_eq!(nearest_neighbor_order(&[p(1.0, 1.0)]), vec![0]);
        assert!(nearest_neighbor_order(&[]).is_empty());
    }

    #[test]
    fn two_points_keep_stated_start() {
        assert_eq!(nearest_neighbor_order(&[p(0.0, 0.0), p(1.0, 1.0)]), vec![0, 1]);
    }

    #[test]
    fn picks_nearest_first() {
        // From the origin, the middle point is closer than the far one.
        let pts = [p(0.0, 0.0), p(0.0, 2.0), p(0.0, 0.5)];
        assert_eq!(nearest_neighbor_order(&pts), vec![0, 2, 1]);
    }

    #[test]
    fn square_tour_is_no_shorter_than_optimal() {
        // Unit square (in degrees, small enough to be near-planar). Optimal
        // open path visits three sides.
        let pts = [p(0.0, 0.0), p(0.0, 0.1), p(0.1, 0.1), p(0.1, 0.0)];
        let side = haversine_m(pts[0], pts[1]);
        let optimal = 3.0 * side;

        let order = nearest_neighbor_order(&pts);
        let length = tour_length_m(&pts, &order);
        assert!(length >= optimal * 0.999, "greedy {} vs optimal {}", length, optimal);
    }
}
