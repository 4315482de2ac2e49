use crate::config::{ReconConfig, ScanMode};
use crate::element::ElementKind;
use crate::error::ReconError;
use crate::geometry::{mean, Bounds, Point3};
use crate::scan::{
    CeilingScan, ColumnScan, ScanPrimitive, ScanShape, SegmentedCloud, WallOrientation, WallScan,
};

/// Turn every segmented cloud into a descriptor, preserving input order.
pub fn extract_all(
    clouds: &[SegmentedCloud],
    config: &ReconConfig,
) -> Result<Vec<ScanPrimitive>, ReconError> {
    clouds.iter().map(|c| extract(c, config)).collect()
}

pub fn extract(cloud: &SegmentedCloud, config: &ReconConfig) -> Result<ScanPrimitive, ReconError> {
    let empty = || ReconError::EmptyPointSet {
        name: cloud.name.clone(),
    };
    let shape = match cloud.kind {
        ElementKind::Wall => {
            let relaxed = config.mode == ScanMode::RegionOfInterest;
            ScanShape::Wall(
                extract_wall(&cloud.points, config.thickness_threshold(), relaxed).ok_or_else(empty)?,
            )
        }
        ElementKind::Column => ScanShape::Column(extract_column(&cloud.points).ok_or_else(empty)?),
        ElementKind::Ceiling => ScanShape::Ceiling(
            extract_ceiling(&cloud.points, config.extraction.ceiling_sample_offset)
                .ok_or_else(empty)?,
        ),
        ElementKind::Opening => {
            return Err(ReconError::ConfigValidation(format!(
                "scan '{}': openings are not scanned elements",
                cloud.name
            )))
        }
    };
    log::debug!("extracted {} '{}'", cloud.kind, cloud.name);
    Ok(ScanPrimitive {
        name: cloud.name.clone(),
        shape,
    })
}

/// Classify a wall by its thin horizontal axis.
///
/// Strict mode takes the first axis under `threshold`. Relaxed mode also
/// requires that axis to be the smaller of the two.
pub fn extract_wall(points: &[Point3], threshold: f64, relaxed: bool) -> Option<WallScan> {
    let b = Bounds::of(points)?;
    let centre = mean(points)?;
    let (dx, dy, dz) = (b.dx(), b.dy(), b.dz());

    let thin_x = dx <= threshold && (!relaxed || dx < dy);
    let thin_y = dy <= threshold && (!relaxed || dy < dx);

    let wall = if thin_x {
        WallScan {
            orientation: WallOrientation::Vertical,
            base: Point3::new(centre.x, b.min.y, b.min.z),
            end: Point3::new(centre.x, b.max.y, b.min.z),
            thickness: dx,
            length: dy,
            height: dz,
        }
    } else if thin_y {
        WallScan {
            orientation: WallOrientation::Horizontal,
            base: Point3::new(b.min.x, centre.y, b.min.z),
            end: Point3::new(b.max.x, centre.y, b.min.z),
            thickness: dy,
            length: dx,
            height: dz,
        }
    } else {
        WallScan {
            orientation: WallOrientation::Diagonal,
            base: b.min,
            end: Point3::new(b.max.x, b.max.y, b.min.z),
            thickness: dx.min(dy),
            length: dx.hypot(dy),
            height: dz,
        }
    };
    Some(wall)
}

pub fn extract_column(points: &[Point3]) -> Option<ColumnScan> {
    let b = Bounds::of(points)?;
    let z = b.min.z;
    Some(ColumnScan {
        centroid: Point3::new((b.max.x + b.min.x) / 2.0, (b.max.y + b.min.y) / 2.0, z),
        vertices: [
            Point3::new(b.min.x, b.max.y, z),
            Point3::new(b.max.x, b.max.y, z),
            Point3::new(b.min.x, b.min.y, z),
            Point3::new(b.max.x, b.min.y, z),
        ],
        profile_x: b.dx(),
        profile_y: b.dy(),
        height: b.dz(),
    })
}

pub fn extract_ceiling(points: &[Point3], offset: f64) -> Option<CeilingScan> {
    let c = mean(points)?;
    let at = |dx: f64, dy: f64| Point3::new(c.x + dx, c.y + dy, c.z);
    Some(CeilingScan {
        centroid: c,
        sample_ring: [
            at(offset, 0.0),
            at(-offset, 0.0),
            at(0.0, offset),
            at(0.0, -offset),
            at(offset, offset),
            at(-offset, -offset),
            at(offset, -offset),
            at(-offset, offset),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points on the faces of an axis-aligned slab.
    fn slab(min: Point3, max: Point3, step: f64) -> Vec<Point3> {
        let mut pts = Vec::new();
        let nx = ((max.x - min.x) / step).round() as usize;
        let ny = ((max.y - min.y) / step).round() as usize;
        let nz = ((max.z - min.z) / step).round() as usize;
        for i in 0..=nx {
            for j in 0..=ny {
                for k in 0..=nz {
                    pts.push(Point3::new(
                        min.x + (max.x - min.x) * i as f64 / nx.max(1) as f64,
                        min.y + (max.y - min.y) * j as f64 / ny.max(1) as f64,
                        min.z + (max.z - min.z) * k as f64 / nz.max(1) as f64,
                    ));
                }
            }
        }
        pts
    }

    #[test]
    fn horizontal_wall_descriptor() {
        let pts = slab(Point3::new(0.0, -0.1, 0.0), Point3::new(5.0, 0.1, 3.0), 0.1);
        let w = extract_wall(&pts, 0.22, false).unwrap();
        assert_eq!(w.orientation, WallOrientation::Horizontal);
        assert!((w.base.x - 0.0).abs() < 1e-12);
        assert!(w.base.y.abs() < 1e-9);
        assert!((w.end.x - 5.0).abs() < 1e-12);
        assert!((w.thickness - 0.2).abs() < 1e-9);
        assert!((w.length - 5.0).abs() < 1e-12);
        assert!((w.height - 3.0).abs() < 1e-12);
    }

    #[test]
    fn vertical_wall_descriptor() {
        let pts = slab(Point3::new(2.0, 1.0, 0.5), Point3::new(2.2, 4.0, 3.0), 0.1);
        let w = extract_wall(&pts, 0.22, false).unwrap();
        assert_eq!(w.orientation, WallOrientation::Vertical);
        assert!((w.base.x - 2.1).abs() < 1e-9);
        assert_eq!(w.base.y, 1.0);
        assert_eq!(w.end.y, 4.0);
        assert_eq!(w.base.z, 0.5);
    }

    #[test]
    fn thick_wall_is_diagonal_in_strict_mode_but_not_relaxed() {
        let pts = slab(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.5, 3.0), 0.25);
        let strict = extract_wall(&pts, 0.22, false).unwrap();
        assert_eq!(strict.orientation, WallOrientation::Diagonal);

        let relaxed = extract_wall(&pts, 0.78, true).unwrap();
        assert_eq!(relaxed.orientation, WallOrientation::Horizontal);
        assert!((relaxed.thickness - 0.5).abs() < 1e-12);
    }

    #[test]
    fn relaxed_mode_needs_smaller_axis() {
        // Short stub: both extents under the relaxed threshold; the smaller wins.
        let pts = slab(Point3::new(0.0, 0.0, 0.0), Point3::new(0.7, 0.3, 3.0), 0.1);
        let w = extract_wall(&pts, 0.78, true).unwrap();
        assert_eq!(w.orientation, WallOrientation::Horizontal);
    }

    #[test]
    fn sloped_cloud_is_diagonal() {
        let pts: Vec<Point3> = (0..50)
            .map(|i| {
                let t = i as f64 * 0.1;
                Point3::new(t, t, (i % 3) as f64)
            })
            .collect();
        let w = extract_wall(&pts, 0.22, false).unwrap();
        assert_eq!(w.orientation, WallOrientation::Diagonal);
    }

    #[test]
    fn column_descriptor() {
        let pts = slab(Point3::new(9.8, 9.8, 0.0), Point3::new(10.2, 10.2, 3.0), 0.1);
        let c = extract_column(&pts).unwrap();
        assert!((c.centroid.x - 10.0).abs() < 1e-12);
        assert!((c.centroid.y - 10.0).abs() < 1e-12);
        assert_eq!(c.centroid.z, 0.0);
        assert!((c.height - 3.0).abs() < 1e-12);
        assert!(c.vertices[0].max_axis_delta(&Point3::new(9.8, 10.2, 0.0)) < 1e-9);
        assert!(c.vertices[3].max_axis_delta(&Point3::new(10.2, 9.8, 0.0)) < 1e-9);
    }

    #[test]
    fn ceiling_star_uses_offset() {
        let pts = vec![
            Point3::new(0.0, 0.0, 2.5),
            Point3::new(2.0, 0.0, 3.5),
            Point3::new(2.0, 2.0, 2.5),
            Point3::new(0.0, 2.0, 3.5),
        ];
        let c = extract_ceiling(&pts, 0.6).unwrap();
        assert_eq!(c.centroid, Point3::new(1.0, 1.0, 3.0));
        assert_eq!(c.samples().count(), 9);
        assert!(c.sample_ring.iter().all(|p| p.z == 3.0));
        assert!(c.sample_ring[0].max_axis_delta(&Point3::new(1.6, 1.0, 3.0)) < 1e-12);
        assert!(c.sample_ring[5].max_axis_delta(&Point3::new(0.4, 0.4, 3.0)) < 1e-12);
    }

    #[test]
    fn empty_cloud_is_an_error() {
        let cloud = SegmentedCloud {
            name: "wall7".into(),
            kind: ElementKind::Wall,
            points: vec![],
        };
        let err = extract(&cloud, &ReconConfig::named("t")).unwrap_err();
        assert!(matches!(err, ReconError::EmptyPointSet { ref name } if name == "wall7"));
    }

    #[test]
    fn extraction_is_pure() {
        let cloud = SegmentedCloud {
            name: "column1".into(),
            kind: ElementKind::Column,
            points: slab(Point3::new(0.0, 0.0, 0.0), Point3::new(0.4, 0.4, 3.0), 0.2),
        };
        let config = ReconConfig::named("t");
        assert_eq!(extract(&cloud, &config).unwrap(), extract(&cloud, &config).unwrap());
    }
}
