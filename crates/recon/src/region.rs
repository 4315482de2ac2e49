//! Footprint of a partial scan: concave hull of the floor-plan projection
//! plus a vertical band.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::RegionConfig;
use crate::error::ReconError;
use crate::geometry::{Bounds, Point2, Point3, Polygon};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionOfInterest {
    /// Raw concave hull of the downsampled (x, y) projection.
    pub hull: Polygon,
    /// Outward growth applied to the hull on every membership test.
    pub hull_buffer: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl RegionOfInterest {
    /// Build the region from a full-area scan.
    ///
    /// The vertical band is the raw cloud's z range shifted down by
    /// `z_offset`, so the slab of the floor above falls outside it while
    /// wall bases at the scanned floor stay inside.
    pub fn build(points: &[Point3], config: &RegionConfig) -> Result<Self, ReconError> {
        let bounds = Bounds::of(points).ok_or_else(|| ReconError::EmptyPointSet {
            name: "region".into(),
        })?;

        let sampled = voxel_downsample(points, config.voxel_size);
        let plan: Vec<Point2> = sampled.iter().map(Point3::xy).collect();
        let hull = concave_hull(&plan, config.alpha);
        log::info!(
            "region: {} points -> {} after downsampling, hull with {} vertices",
            points.len(),
            sampled.len(),
            hull.vertices.len()
        );

        Ok(Self {
            hull,
            hull_buffer: config.hull_buffer,
            z_min: bounds.min.z - config.z_offset,
            z_max: bounds.max.z - config.z_offset,
        })
    }

    /// Closed membership test. The z band and the buffered 2D hull are
    /// checked independently.
    pub fn within(&self, point: &Point3, buffer: f64) -> bool {
        self.within_band(point.z) && self.hull.contains_buffered(point.xy(), self.hull_buffer + buffer)
    }

    pub fn within_band(&self, z: f64) -> bool {
        z >= self.z_min && z <= self.z_max
    }
}

/// Keep the first point falling into each voxel, in input order.
pub fn voxel_downsample(points: &[Point3], voxel_size: f64) -> Vec<Point3> {
    let Some(bounds) = Bounds::of(points) else {
        return Vec::new();
    };
    let origin = bounds.min;
    let mut seen: HashSet<(i64, i64, i64)> = HashSet::new();
    let mut kept = Vec::new();
    for p in points {
        let key = (
            ((p.x - origin.x) / voxel_size).floor() as i64,
            ((p.y - origin.y) / voxel_size).floor() as i64,
            ((p.z - origin.z) / voxel_size).floor() as i64,
        );
        if seen.insert(key) {
            kept.push(*p);
        }
    }
    kept
}

// ---------------------------------------------------------------------------
// Alpha shape
// ---------------------------------------------------------------------------

/// Concave hull of a planar point set as an alpha shape.
///
/// Delaunay triangles whose circumradius is below `1 / alpha` are kept and
/// the outer ring of their union is returned counter-clockwise. `alpha <= 0`
/// gives the convex hull, as does a set in which every triangle is rejected.
pub fn concave_hull(points: &[Point2], alpha: f64) -> Polygon {
    let mut seen = HashSet::new();
    let points: Vec<Point2> = points
        .iter()
        .copied()
        .filter(|p| seen.insert((p.x.to_bits(), p.y.to_bits())))
        .collect();
    let points = points.as_slice();
    if points.len() < 3 {
        return Polygon::new(points.to_vec());
    }

    let input: Vec<delaunator::Point> = points
        .iter()
        .map(|p| delaunator::Point { x: p.x, y: p.y })
        .collect();
    let triangulation = delaunator::triangulate(&input);

    if triangulation.triangles.is_empty() {
        // Collinear input: keep the two extremes so the buffered test still works.
        return collinear_extremes(points);
    }

    let convex = || {
        let mut ring = Polygon::new(triangulation.hull.iter().map(|&i| points[i]).collect());
        if ring.signed_area() < 0.0 {
            ring.vertices.reverse();
        }
        ring
    };

    if alpha <= 0.0 {
        return convex();
    }

    let max_radius = 1.0 / alpha;
    let triangle_count = triangulation.triangles.len() / 3;
    let kept: Vec<bool> = (0..triangle_count)
        .map(|t| {
            let a = points[triangulation.triangles[3 * t]];
            let b = points[triangulation.triangles[3 * t + 1]];
            let c = points[triangulation.triangles[3 * t + 2]];
            circumradius(a, b, c) < max_radius
        })
        .collect();

    if !kept.iter().any(|&k| k) {
        log::warn!("alpha {alpha} rejects every triangle; using the convex hull");
        return convex();
    }

    // Directed boundary half-edges of the kept union.
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut edges: Vec<(usize, usize)> = Vec::new();
    for e in 0..triangulation.triangles.len() {
        if !kept[e / 3] {
            continue;
        }
        let twin = triangulation.halfedges[e];
        if twin != delaunator::EMPTY && kept[twin / 3] {
            continue;
        }
        let from = triangulation.triangles[e];
        let to = triangulation.triangles[delaunator::next_halfedge(e)];
        outgoing.entry(from).or_default().push(edges.len());
        edges.push((from, to));
    }

    let rings = walk_rings(&edges, &mut outgoing);
    let mut best = rings
        .into_iter()
        .map(|ring| Polygon::new(ring.into_iter().map(|i| points[i]).collect()))
        .max_by(|a, b| a.signed_area().abs().total_cmp(&b.signed_area().abs()))
        .unwrap_or_else(convex);
    if best.signed_area() < 0.0 {
        best.vertices.reverse();
    }
    best
}

/// Chain directed edges into closed vertex rings.
fn walk_rings(edges: &[(usize, usize)], outgoing: &mut HashMap<usize, Vec<usize>>) -> Vec<Vec<usize>> {
    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let (start, mut at) = edges[first];
        let mut ring = vec![start];
        while at != start {
            ring.push(at);
            let next = outgoing
                .get_mut(&at)
                .and_then(|candidates| {
                    let pos = candidates.iter().position(|&e| !used[e])?;
                    Some(candidates.swap_remove(pos))
                });
            match next {
                Some(e) => {
                    used[e] = true;
                    at = edges[e].1;
                }
                None => break,
            }
        }
        if ring.len() >= 3 {
            rings.push(ring);
        }
    }
    rings
}

fn circumradius(a: Point2, b: Point2, c: Point2) -> f64 {
    let ab = a.distance(&b);
    let bc = b.distance(&c);
    let ca = c.distance(&a);
    let area2 = ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs();
    if area2 == 0.0 {
        return f64::INFINITY;
    }
    ab * bc * ca / (2.0 * area2)
}

fn collinear_extremes(points: &[Point2]) -> Polygon {
    let key = |p: &&Point2| (p.x, p.y);
    let lo = points
        .iter()
        .min_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal));
    let hi = points
        .iter()
        .max_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal));
    match (lo, hi) {
        (Some(lo), Some(hi)) => Polygon::new(vec![*lo, *hi]),
        _ => Polygon::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(x_max: f64, y_max: f64, step: f64, skip: impl Fn(f64, f64) -> bool) -> Vec<Point3> {
        let mut pts = Vec::new();
        let nx = (x_max / step).round() as usize;
        let ny = (y_max / step).round() as usize;
        for i in 0..=nx {
            for j in 0..=ny {
                let (x, y) = (i as f64 * step, j as f64 * step);
                if !skip(x, y) {
                    pts.push(Point3::new(x, y, 0.0));
                    pts.push(Point3::new(x, y, 3.0));
                }
            }
        }
        pts
    }

    fn config(hull_buffer: f64) -> RegionConfig {
        RegionConfig {
            hull_buffer,
            membership_buffer: 0.0,
            ..RegionConfig::default()
        }
    }

    #[test]
    fn buffer_includes_near_points_and_excludes_far_ones() {
        let pts = grid(10.0, 10.0, 0.5, |_, _| false);
        let region = RegionOfInterest::build(&pts, &config(0.70)).unwrap();

        assert!(region.within(&Point3::new(5.0, 5.0, 0.0), 0.0));
        assert!(region.within(&Point3::new(10.65, 5.0, 0.0), 0.0));
        assert!(!region.within(&Point3::new(10.80, 5.0, 0.0), 0.0));
        assert!(region.within(&Point3::new(5.0, -0.65, 0.0), 0.0));
        assert!(!region.within(&Point3::new(5.0, -0.80, 0.0), 0.0));
    }

    #[test]
    fn membership_buffer_adds_to_hull_buffer() {
        let pts = grid(10.0, 10.0, 0.5, |_, _| false);
        let region = RegionOfInterest::build(&pts, &config(0.4)).unwrap();
        let p = Point3::new(11.0, 5.0, 0.0);
        assert!(!region.within(&p, 0.5));
        assert!(region.within(&p, 0.7));
    }

    #[test]
    fn vertical_band_is_shifted_down() {
        let pts = grid(4.0, 4.0, 0.5, |_, _| false);
        let region = RegionOfInterest::build(&pts, &config(0.0)).unwrap();
        assert!((region.z_min + 0.3).abs() < 1e-12);
        assert!((region.z_max - 2.7).abs() < 1e-12);

        let inside_xy = |z| Point3::new(2.0, 2.0, z);
        assert!(region.within(&inside_xy(0.0), 0.0));
        assert!(region.within(&inside_xy(region.z_min), 0.0), "band is closed");
        assert!(!region.within(&inside_xy(2.9), 0.0), "slab above is excluded");
    }

    #[test]
    fn concave_notch_is_excluded() {
        // L-shape: the upper-right 6x6 quadrant of a 10x10 square is empty.
        let pts = grid(10.0, 10.0, 0.5, |x, y| x > 4.0 && y > 4.0);
        let plan: Vec<Point2> = pts.iter().map(Point3::xy).collect();

        let concave = concave_hull(&plan, 0.5);
        assert!(concave.contains(Point2::new(2.0, 8.0)));
        assert!(concave.contains(Point2::new(8.0, 2.0)));
        assert!(!concave.contains(Point2::new(8.0, 8.0)));

        let convex = concave_hull(&plan, 0.0);
        assert!(convex.contains(Point2::new(8.0, 8.0)));
        assert!(convex.signed_area() > concave.signed_area());
    }

    #[test]
    fn hull_ring_is_counter_clockwise() {
        let pts = grid(3.0, 2.0, 0.5, |_, _| false);
        let plan: Vec<Point2> = pts.iter().map(Point3::xy).collect();
        let hull = concave_hull(&plan, 0.5);
        assert!(hull.signed_area() > 0.0);
        assert!((hull.signed_area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn downsample_keeps_first_point_per_voxel() {
        let pts = vec![
            Point3::new(0.1, 0.1, 0.0),
            Point3::new(0.2, 0.2, 0.1),
            Point3::new(0.8, 0.1, 0.0),
        ];
        let kept = voxel_downsample(&pts, 0.5);
        assert_eq!(kept, vec![pts[0], pts[2]]);
    }

    #[test]
    fn collinear_scan_still_yields_a_corridor() {
        let pts: Vec<Point3> = (0..10).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        let region = RegionOfInterest::build(
            &pts,
            &RegionConfig {
                hull_buffer: 0.5,
                membership_buffer: 0.0,
                z_offset: 0.0,
                ..RegionConfig::default()
            },
        )
        .unwrap();
        assert!(region.within(&Point3::new(4.0, 0.4, 0.0), 0.0));
        assert!(!region.within(&Point3::new(4.0, 0.6, 0.0), 0.0));
    }

    #[test]
    fn empty_scan_is_an_error() {
        assert!(RegionOfInterest::build(&[], &RegionConfig::default()).is_err());
    }
}
