//! Element synthesis: new walls and columns cloned from a template, then
//! wall endpoints settled against their neighbours.

use std::collections::HashSet;

use crate::config::{ColumnConfig, SynthesisConfig};
use crate::element::{
    authoritative_position, Axis, Direction, ElementGeometry, ElementId, ElementKind, FloorId,
    ModelElement, Placement, Profile,
};
use crate::error::ReconError;
use crate::geometry::Point3;
use crate::matcher::WallCandidate;
use crate::model::{Status, SynthesisReport};
use crate::scan::{ColumnScan, ScanPrimitive, WallOrientation, WallScan};
use crate::store::ModelStore;

/// Result of synthesizing one scan primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(ElementId),
    Skipped(Status),
}

/// Template and geometry for a new element, computed without touching the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    pub template: ElementId,
    pub geometry: ElementGeometry,
}

// ---------------------------------------------------------------------------
// Walls: planning
// ---------------------------------------------------------------------------

fn scan_axis(orientation: WallOrientation) -> Option<Axis> {
    match orientation {
        WallOrientation::Horizontal => Some(Axis::X),
        WallOrientation::Vertical => Some(Axis::Y),
        WallOrientation::Diagonal => None,
    }
}

fn in_box(p: &Point3, centre: &Point3, half: &[f64; 3]) -> bool {
    (p.x - centre.x).abs() <= half[0]
        && (p.y - centre.y).abs() <= half[1]
        && (p.z - centre.z).abs() <= half[2]
}

/// Existing rectangular, axis-aligned walls with their global endpoints.
fn existing_walls<'s, S: ModelStore>(
    store: &'s S,
    exclude: &HashSet<ElementId>,
) -> Vec<(&'s ModelElement, WallCandidate)> {
    store
        .elements(ElementKind::Wall)
        .into_iter()
        .filter(|e| !exclude.contains(&e.id))
        .filter_map(|e| WallCandidate::from_element(store, e).map(|c| (e, c)))
        .collect()
}

/// Elect a template wall: same axis, thickness within tolerance, near either
/// scan endpoint. Falls back to the closest thickness anywhere in the model.
pub fn elect_wall_template<S: ModelStore>(
    store: &S,
    scan: &WallScan,
    exclude: &HashSet<ElementId>,
    config: &SynthesisConfig,
) -> Option<ElementId> {
    let axis = scan_axis(scan.orientation)?;
    let walls = existing_walls(store, exclude);
    let diff = |c: &WallCandidate| (c.thickness - scan.thickness).abs();

    let local = walls
        .iter()
        .filter(|(e, _)| e.direction().axis() == Some(axis))
        .filter(|(_, c)| diff(c) <= config.template_thickness_tolerance)
        .filter(|(_, c)| {
            [&c.start, &c.end].iter().any(|p| {
                in_box(p, &scan.base, &config.template_search_box)
                    || in_box(p, &scan.end, &config.template_search_box)
            })
        })
        .min_by(|a, b| diff(&a.1).total_cmp(&diff(&b.1)));
    if let Some((e, _)) = local {
        return Some(e.id.clone());
    }

    let bound = config.global_thickness_tolerance.unwrap_or(f64::INFINITY);
    walls
        .iter()
        .filter(|(_, c)| diff(c) <= bound)
        .min_by(|a, b| diff(&a.1).total_cmp(&diff(&b.1)))
        .map(|(e, _)| e.id.clone())
}

/// Host floor and floor-relative base height for a new wall, plus the
/// neighbour height to snap to when close enough.
fn host_floor<S: ModelStore>(
    store: &S,
    scan: &WallScan,
    exclude: &HashSet<ElementId>,
    config: &SynthesisConfig,
) -> Option<(Option<FloorId>, f64, f64)> {
    let neighbour = existing_walls(store, exclude)
        .into_iter()
        .find(|(_, c)| (c.start.z - scan.base.z).abs() <= config.floor_elevation_tolerance);
    if let Some((e, _)) = neighbour {
        let height = if (e.geometry.height - scan.height).abs() <= config.height_snap_tolerance {
            e.geometry.height
        } else {
            scan.height
        };
        return Some((e.geometry.floor.clone(), authoritative_position(e).z, height));
    }

    store
        .floors()
        .iter()
        .filter(|f| (f.elevation - scan.base.z).abs() <= config.floor_elevation_tolerance)
        .min_by(|a, b| {
            (a.elevation - scan.base.z)
                .abs()
                .total_cmp(&(b.elevation - scan.base.z).abs())
        })
        .map(|f| (Some(f.id.clone()), scan.base.z - f.elevation, scan.height))
}

/// Work out everything a new wall needs before any mutation happens.
pub fn plan_wall<S: ModelStore>(
    store: &S,
    scan: &ScanPrimitive,
    exclude: &HashSet<ElementId>,
    config: &SynthesisConfig,
) -> Result<Blueprint, Status> {
    let wall = scan.as_wall().ok_or(Status::Unsupported)?;
    if wall.orientation == WallOrientation::Diagonal {
        return Err(Status::Diagonal);
    }
    let template = elect_wall_template(store, wall, exclude, config).ok_or(Status::NoTemplate)?;
    let (floor, rel_z, height) = host_floor(store, wall, exclude, config).ok_or(Status::NoFloor)?;

    let direction = match wall.orientation {
        WallOrientation::Vertical => Direction::AlongYPositive,
        _ => Direction::Unset,
    };
    Ok(Blueprint {
        template,
        geometry: ElementGeometry {
            floor,
            placement: Placement {
                location: Point3::new(wall.base.x, wall.base.y, rel_z),
                ref_direction: direction.to_ratios(),
            },
            mapped_origin: None,
            axis_length: Some(wall.length),
            profile: Profile::Rectangle {
                x_dim: wall.length,
                y_dim: wall.thickness,
            },
            height,
        },
    })
}

// ---------------------------------------------------------------------------
// Walls: synthesis
// ---------------------------------------------------------------------------

/// Create every plannable wall, then run the alignment loop over the batch.
pub fn synthesize_walls<S: ModelStore>(
    store: &mut S,
    scans: &[(usize, &ScanPrimitive)],
    config: &SynthesisConfig,
) -> Result<(Vec<(usize, Outcome)>, SynthesisReport), ReconError> {
    let mut created: Vec<ElementId> = Vec::new();
    let mut fresh: HashSet<ElementId> = HashSet::new();
    let mut outcomes = Vec::new();

    for (idx, scan) in scans {
        match plan_wall(&*store, scan, &fresh, config) {
            Ok(blueprint) => {
                let id = store.clone_element(&blueprint.template, &scan.name)?;
                store.set_geometry(&id, blueprint.geometry)?;
                log::info!("created wall {id} from '{}' (template {})", scan.name, blueprint.template);
                fresh.insert(id.clone());
                created.push(id.clone());
                outcomes.push((*idx, Outcome::Created(id)));
            }
            Err(status) => {
                log::warn!("wall '{}' not synthesized: {status}", scan.name);
                outcomes.push((*idx, Outcome::Skipped(status)));
            }
        }
    }

    let mut report = SynthesisReport {
        created: created.clone(),
        ..SynthesisReport::default()
    };
    if created.is_empty() {
        report.converged = true;
        return Ok((outcomes, report));
    }

    let mut segments = segments_from_store(&*store, &fresh);
    let (sweeps, converged, final_delta) = align(&mut segments, config);
    if !converged {
        log::warn!("wall alignment stopped after {sweeps} sweeps (last delta {final_delta:.2e})");
    }
    write_back(store, &segments)?;

    report.sweeps = sweeps;
    report.converged = converged;
    report.final_delta = final_delta;
    Ok((outcomes, report))
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Plain-value view of a wall axis for the alignment passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: ElementId,
    pub axis: Axis,
    /// Global start point.
    pub start: Point3,
    pub length: f64,
    /// +1 when the wall runs toward increasing coordinate along its axis.
    pub sign: f64,
    pub thickness: f64,
    pub floor: Option<FloorId>,
    /// Created in this run.
    pub fresh: bool,
}

impl Segment {
    pub fn end(&self) -> Point3 {
        match self.axis {
            Axis::X => Point3::new(self.start.x + self.sign * self.length, self.start.y, self.start.z),
            Axis::Y => Point3::new(self.start.x, self.start.y + self.sign * self.length, self.start.z),
        }
    }

    fn along(&self, p: &Point3) -> f64 {
        match self.axis {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    /// Nearer endpoint to `p`, with whether it is this segment's start.
    fn nearer_end(&self, p: &Point3) -> (Point3, bool, f64) {
        let end = self.end();
        let ds = p.distance(&self.start);
        let de = p.distance(&end);
        if ds <= de {
            (self.start, true, ds)
        } else {
            (end, false, de)
        }
    }
}

fn segments_from_store<S: ModelStore>(store: &S, fresh: &HashSet<ElementId>) -> Vec<Segment> {
    store
        .elements(ElementKind::Wall)
        .into_iter()
        .filter_map(|e| {
            let direction = e.direction();
            let (ux, uy) = direction.unit()?;
            let axis = direction.axis()?;
            let candidate = WallCandidate::from_element(store, e)?;
            Some(Segment {
                id: e.id.clone(),
                axis,
                start: candidate.start,
                length: e.axis_length()?,
                sign: if ux + uy >= 0.0 { 1.0 } else { -1.0 },
                thickness: candidate.thickness,
                floor: e.geometry.floor.clone(),
                fresh: fresh.contains(&e.id),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Against {
    Existing,
    Fresh,
}

fn neighbours(segments: &[Segment], i: usize, against: Against) -> Vec<usize> {
    (0..segments.len())
        .filter(|&j| j != i)
        .filter(|&j| segments[j].fresh == (against == Against::Fresh))
        .filter(|&j| segments[j].floor == segments[i].floor)
        .collect()
}

/// Snap each fresh segment's start onto its nearest compatible neighbour.
/// Collinear neighbours win over orthogonal ones.
fn start_pass(segments: &mut [Segment], against: Against, config: &SynthesisConfig) {
    for i in 0..segments.len() {
        if !segments[i].fresh {
            continue;
        }
        let tolerance = config.start_snap.at(segments[i].thickness);
        let start = segments[i].start;
        let mut best_same: Option<(f64, usize, Point3, bool)> = None;
        let mut best_cross: Option<(f64, usize, Point3, bool)> = None;
        for j in neighbours(segments, i, against) {
            let (pt, is_start, d) = segments[j].nearer_end(&start);
            if d > tolerance {
                continue;
            }
            let slot = if segments[j].axis == segments[i].axis {
                &mut best_same
            } else {
                &mut best_cross
            };
            if slot.map_or(true, |(bd, ..)| d < bd) {
                *slot = Some((d, j, pt, is_start));
            }
        }

        let Some((_, j, pt, is_start)) = best_same.or(best_cross) else {
            continue;
        };
        let me = &segments[i];
        let other = &segments[j];
        let snapped = if other.axis == me.axis {
            Point3::new(pt.x, pt.y, start.z)
        } else {
            match me.axis {
                // Run through to the neighbour's far face.
                Axis::X => Point3::new(pt.x - me.sign * other.thickness / 2.0, pt.y, start.z),
                // Sit on the neighbour's axis, inset by our own half thickness.
                Axis::Y => {
                    let away = if is_start { other.sign } else { -other.sign };
                    Point3::new(pt.x + away * me.thickness / 2.0, pt.y, start.z)
                }
            }
        };
        segments[i].start = snapped;
    }
}

/// Re-derive each fresh segment's length from its nearest neighbour at the
/// far end. The start never moves here.
fn end_pass(segments: &mut [Segment], against: Against, config: &SynthesisConfig) {
    for i in 0..segments.len() {
        if !segments[i].fresh {
            continue;
        }
        let tolerance = config.end_snap.at(segments[i].thickness);
        let end = segments[i].end();
        let best = neighbours(segments, i, against)
            .into_iter()
            .filter_map(|j| {
                let (pt, _, d) = segments[j].nearer_end(&end);
                (d <= tolerance).then_some((d, j, pt))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));
        let Some((_, j, pt)) = best else {
            continue;
        };

        let me = &segments[i];
        let other = &segments[j];
        let mut length = me.sign * (me.along(&pt) - me.along(&me.start));
        if other.axis != me.axis {
            length += other.thickness / 2.0;
        }
        if length >= config.min_length {
            segments[i].length = length;
        }
    }
}

/// Run start/end passes against existing then fresh walls until the largest
/// movement drops below epsilon, after at least `min_sweeps` sweeps.
///
/// Returns (sweeps run, converged, last sweep's largest movement).
pub fn align(segments: &mut [Segment], config: &SynthesisConfig) -> (usize, bool, f64) {
    let mut delta = 0.0;
    for sweep in 1..=config.max_sweeps {
        let before: Vec<(Point3, f64)> = segments.iter().map(|s| (s.start, s.length)).collect();

        start_pass(segments, Against::Existing, config);
        end_pass(segments, Against::Existing, config);
        start_pass(segments, Against::Fresh, config);
        end_pass(segments, Against::Fresh, config);

        delta = segments
            .iter()
            .zip(&before)
            .map(|(s, (start, length))| s.start.distance(start).max((s.length - length).abs()))
            .fold(0.0, f64::max);
        log::debug!("alignment sweep {sweep}: max movement {delta:.3e}");
        if sweep >= config.min_sweeps && delta <= config.convergence_epsilon {
            return (sweep, true, delta);
        }
    }
    (config.max_sweeps, false, delta)
}

/// Where wall `id` settles when placed at `start` (global) with `length`
/// and snapped against every other wall in the store.
///
/// Returns `None` for walls the alignment passes cannot represent.
pub fn settle_wall<S: ModelStore>(
    store: &S,
    id: &ElementId,
    start: Point3,
    length: f64,
    config: &SynthesisConfig,
) -> Option<(Point3, f64)> {
    let mut segments = segments_from_store(store, &HashSet::new());
    let idx = segments.iter().position(|s| &s.id == id)?;
    segments[idx].start = start;
    segments[idx].length = length;
    segments[idx].fresh = true;
    align(&mut segments, config);
    Some((segments[idx].start, segments[idx].length))
}

fn write_back<S: ModelStore>(store: &mut S, segments: &[Segment]) -> Result<(), ReconError> {
    for seg in segments.iter().filter(|s| s.fresh) {
        let element = store
            .element(&seg.id)
            .ok_or_else(|| ReconError::UnknownElement(seg.id.to_string()))?;
        let elevation = store.elevation_of(element);
        let mut geometry = element.geometry.clone();
        geometry.placement.location = Point3::new(seg.start.x, seg.start.y, seg.start.z - elevation);
        geometry.axis_length = Some(seg.length);
        if let Profile::Rectangle { x_dim, .. } = &mut geometry.profile {
            *x_dim = seg.length;
        }
        store.set_geometry(&seg.id, geometry)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Template column on a floor near the scan base, closest in section size.
pub fn plan_column<S: ModelStore>(
    store: &S,
    scan: &ColumnScan,
    config: &ColumnConfig,
) -> Result<Blueprint, Status> {
    let section_diff = |e: &ModelElement| match e.geometry.profile.rectangle_dims() {
        Some((x, y)) => (x - scan.profile_x).abs() + (y - scan.profile_y).abs(),
        None => f64::INFINITY,
    };
    let template = store
        .elements(ElementKind::Column)
        .into_iter()
        .filter(|e| {
            (store.elevation_of(e) - scan.centroid.z).abs() <= config.template_elevation_tolerance
        })
        .min_by(|a, b| section_diff(a).total_cmp(&section_diff(b)))
        .ok_or(Status::NoTemplate)?;

    let elevation = store.elevation_of(template);
    let mut geometry = template.geometry.clone();
    let position = Point3::new(scan.centroid.x, scan.centroid.y, scan.centroid.z - elevation);
    match geometry.mapped_origin {
        Some(origin) if !origin.is_origin() => geometry.mapped_origin = Some(position),
        _ => geometry.placement.location = position,
    }
    geometry.height = scan.height;
    Ok(Blueprint {
        template: template.id.clone(),
        geometry,
    })
}

pub fn synthesize_columns<S: ModelStore>(
    store: &mut S,
    scans: &[(usize, &ScanPrimitive)],
    config: &ColumnConfig,
) -> Result<Vec<(usize, Outcome)>, ReconError> {
    let mut outcomes = Vec::new();
    for (idx, scan) in scans {
        let planned = match scan.as_column() {
            Some(column) => plan_column(&*store, column, config),
            None => Err(Status::Unsupported),
        };
        match planned {
            Ok(blueprint) => {
                let id = store.clone_element(&blueprint.template, &scan.name)?;
                store.set_geometry(&id, blueprint.geometry)?;
                log::info!("created column {id} from '{}'", scan.name);
                outcomes.push((*idx, Outcome::Created(id)));
            }
            Err(status) => {
                log::warn!("column '{}' not synthesized: {status}", scan.name);
                outcomes.push((*idx, Outcome::Skipped(status)));
            }
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Floor;
    use crate::scan::ScanShape;
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;

    fn config() -> SynthesisConfig {
        SynthesisConfig::default()
    }

    fn seg(id: &str, axis: Axis, start: (f64, f64), length: f64, thickness: f64, fresh: bool) -> Segment {
        Segment {
            id: ElementId::new(id),
            axis,
            start: Point3::new(start.0, start.1, 0.0),
            length,
            sign: 1.0,
            thickness,
            floor: None,
            fresh,
        }
    }

    fn model_wall(id: &str, start: (f64, f64), direction: Option<[f64; 3]>, length: f64, thickness: f64) -> ModelElement {
        ModelElement {
            id: ElementId::new(id),
            name: format!("Basic Wall:{id}"),
            kind: ElementKind::Wall,
            type_ref: Some("Generic 200".into()),
            properties: BTreeMap::new(),
            openings: vec![],
            geometry: ElementGeometry {
                floor: Some(FloorId::new("L1")),
                placement: Placement {
                    location: Point3::new(start.0, start.1, 0.0),
                    ref_direction: direction,
                },
                mapped_origin: None,
                axis_length: Some(length),
                profile: Profile::Rectangle { x_dim: length, y_dim: thickness },
                height: 3.0,
            },
        }
    }

    fn wall_scan(name: &str, orientation: WallOrientation, base: Point3, length: f64, thickness: f64) -> ScanPrimitive {
        let end = match orientation {
            WallOrientation::Vertical => Point3::new(base.x, base.y + length, base.z),
            _ => Point3::new(base.x + length, base.y, base.z),
        };
        ScanPrimitive {
            name: name.into(),
            shape: ScanShape::Wall(WallScan {
                orientation,
                base,
                end,
                thickness,
                length,
                height: 2.9,
            }),
        }
    }

    fn store_with(walls: Vec<ModelElement>) -> MemoryStore {
        let mut store = MemoryStore {
            floors: vec![Floor {
                id: FloorId::new("L1"),
                name: "Level 1".into(),
                elevation: 0.0,
            }],
            ..MemoryStore::default()
        };
        for w in walls {
            store.insert(w).unwrap();
        }
        store
    }

    #[test]
    fn vertical_wall_meeting_end_of_positive_x_wall_insets_backwards() {
        let mut segments = vec![
            seg("h", Axis::X, (0.0, 0.0), 5.0, 0.25, false),
            seg("v", Axis::Y, (5.05, 0.05), 3.0, 0.25, true),
        ];
        let (_, converged, _) = align(&mut segments, &config());
        assert!(converged);
        assert_eq!(segments[1].start, Point3::new(4.875, 0.0, 0.0));
        assert_eq!(segments[0].start, Point3::new(0.0, 0.0, 0.0), "existing walls never move");
    }

    #[test]
    fn vertical_walls_meeting_negative_x_wall_inset_toward_its_interior() {
        let mut n = seg("n", Axis::X, (5.0, 0.0), 5.0, 0.25, false);
        n.sign = -1.0;
        let mut segments = vec![
            n,
            seg("at_start", Axis::Y, (4.95, 0.05), 3.0, 0.25, true),
            seg("at_end", Axis::Y, (0.05, 0.05), 3.0, 0.25, true),
        ];
        let (_, converged, _) = align(&mut segments, &config());
        assert!(converged);
        assert_eq!(segments[0].end(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(segments[1].start, Point3::new(4.875, 0.0, 0.0));
        assert_eq!(segments[2].start, Point3::new(0.125, 0.0, 0.0));
    }

    #[test]
    fn perpendicular_fresh_walls_share_exact_corner() {
        let mut segments = vec![
            seg("h", Axis::X, (0.0, 0.0), 5.0, 0.25, true),
            seg("v", Axis::Y, (0.25, 0.125), 4.0, 0.25, true),
        ];
        let (sweeps, converged, _) = align(&mut segments, &config());
        assert!(converged);
        assert!(sweeps >= 3);

        let (h, v) = (&segments[0], &segments[1]);
        assert_eq!(h.start.y, v.start.y, "vertical wall starts on the horizontal axis");
        assert_eq!(h.start.x + 0.125, v.start.x, "horizontal wall reaches the far face");
    }

    #[test]
    fn collinear_neighbour_takes_priority() {
        let mut segments = vec![
            seg("existing_h", Axis::X, (-4.0, 0.0), 4.0, 0.2, false),
            seg("existing_v", Axis::Y, (0.1, -3.0), 3.2, 0.2, false),
            seg("new", Axis::X, (0.2, 0.1), 3.0, 0.2, true),
        ];
        align(&mut segments, &config());
        // Snapped onto the collinear wall's end, not the orthogonal face.
        assert_eq!(segments[2].start, Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn end_pass_extends_to_orthogonal_far_face() {
        let mut segments = vec![
            seg("existing_v", Axis::Y, (5.0, 0.0), 4.0, 0.3, false),
            seg("new", Axis::X, (0.0, 0.0), 4.6, 0.2, true),
        ];
        align(&mut segments, &config());
        assert_eq!(segments[1].start, Point3::new(0.0, 0.0, 0.0));
        assert!((segments[1].length - 5.15).abs() < 1e-12);
    }

    #[test]
    fn end_pass_snaps_length_to_collinear_neighbour() {
        let mut segments = vec![
            seg("existing", Axis::X, (6.0, 0.0), 3.0, 0.2, false),
            seg("new", Axis::X, (0.0, 0.0), 5.5, 0.2, true),
        ];
        align(&mut segments, &config());
        assert_eq!(segments[1].length, 6.0);
    }

    #[test]
    fn alignment_is_a_fixed_point() {
        let mut segments = vec![
            seg("existing_v", Axis::Y, (5.0, 0.0), 4.0, 0.3, false),
            seg("h", Axis::X, (0.05, 0.0), 4.7, 0.2, true),
            seg("v", Axis::Y, (0.1, 0.1), 3.8, 0.2, true),
        ];
        align(&mut segments, &config());
        let settled = segments.clone();
        let (sweeps, converged, delta) = align(&mut segments, &config());
        assert!(converged);
        assert_eq!(sweeps, 3);
        assert_eq!(delta, 0.0);
        assert_eq!(segments, settled);
    }

    #[test]
    fn far_walls_are_left_alone() {
        let mut segments = vec![
            seg("existing", Axis::X, (20.0, 20.0), 3.0, 0.2, false),
            seg("new", Axis::X, (0.0, 0.0), 5.0, 0.2, true),
        ];
        let before = segments.clone();
        align(&mut segments, &config());
        assert_eq!(segments, before);
    }

    #[test]
    fn template_prefers_local_same_axis_wall() {
        let store = store_with(vec![
            model_wall("far", (50.0, 50.0), None, 4.0, 0.2),
            model_wall("near_v", (0.0, 0.0), Some([0.0, 1.0, 0.0]), 4.0, 0.2),
            model_wall("near_h", (0.0, 0.0), None, 4.0, 0.22),
        ]);
        let scan = wall_scan("wall1", WallOrientation::Horizontal, Point3::new(0.5, 0.0, 0.0), 3.0, 0.2);
        let id = elect_wall_template(&store, scan.as_wall().unwrap(), &HashSet::new(), &config());
        assert_eq!(id, Some(ElementId::new("near_h")));
    }

    #[test]
    fn template_falls_back_to_closest_thickness() {
        let store = store_with(vec![
            model_wall("thin", (50.0, 50.0), None, 4.0, 0.1),
            model_wall("thick", (60.0, 50.0), None, 4.0, 0.35),
        ]);
        let scan = wall_scan("wall1", WallOrientation::Horizontal, Point3::ORIGIN, 3.0, 0.3);
        let id = elect_wall_template(&store, scan.as_wall().unwrap(), &HashSet::new(), &config());
        assert_eq!(id, Some(ElementId::new("thick")));

        let bounded = SynthesisConfig {
            global_thickness_tolerance: Some(0.01),
            ..config()
        };
        assert_eq!(elect_wall_template(&store, scan.as_wall().unwrap(), &HashSet::new(), &bounded), None);
    }

    #[test]
    fn plan_reports_missing_template_and_diagonal() {
        let store = store_with(vec![]);
        let scan = wall_scan("wall1", WallOrientation::Horizontal, Point3::ORIGIN, 3.0, 0.2);
        assert_eq!(plan_wall(&store, &scan, &HashSet::new(), &config()), Err(Status::NoTemplate));

        let diag = wall_scan("wall2", WallOrientation::Diagonal, Point3::ORIGIN, 3.0, 0.2);
        assert_eq!(plan_wall(&store, &diag, &HashSet::new(), &config()), Err(Status::Diagonal));
    }

    #[test]
    fn plan_builds_canonical_geometry() {
        let store = store_with(vec![model_wall("w", (0.0, 0.0), None, 4.0, 0.2)]);
        let scan = wall_scan("wall1", WallOrientation::Vertical, Point3::new(1.0, 0.5, 0.1), 3.0, 0.18);
        let bp = plan_wall(&store, &scan, &HashSet::new(), &config()).unwrap();
        assert_eq!(bp.template, ElementId::new("w"));
        let g = bp.geometry;
        assert_eq!(g.floor, Some(FloorId::new("L1")));
        assert_eq!(g.placement.location, Point3::new(1.0, 0.5, 0.0));
        assert_eq!(g.placement.direction(), Direction::AlongYPositive);
        assert_eq!(g.axis_length, Some(3.0));
        assert_eq!(g.profile, Profile::Rectangle { x_dim: 3.0, y_dim: 0.18 });
        assert_eq!(g.height, 3.0, "snapped to the neighbour's height");
    }

    #[test]
    fn synthesize_creates_and_aligns() {
        let mut store = store_with(vec![model_wall("existing", (0.0, 0.0), Some([0.0, 1.0, 0.0]), 4.0, 0.2)]);
        let scan = wall_scan("wall7", WallOrientation::Horizontal, Point3::new(0.2, 0.1, 0.0), 4.0, 0.2);
        let scans = vec![(0usize, &scan)];
        let (outcomes, report) = synthesize_walls(&mut store, &scans, &config()).unwrap();

        let Outcome::Created(id) = &outcomes[0].1 else {
            panic!("expected creation, got {:?}", outcomes[0].1);
        };
        assert_eq!(report.created, vec![id.clone()]);
        assert!(report.converged);

        let created = store.element(id).unwrap();
        assert_eq!(created.type_ref.as_deref(), Some("Generic 200"));
        assert_eq!(created.direction(), Direction::Unset);
        // Start pulled onto the existing wall's start, moved to its far face.
        assert_eq!(created.geometry.placement.location, Point3::new(-0.1, 0.0, 0.0));
    }

    #[test]
    fn column_plan_uses_nearest_section_on_matching_floor() {
        let mut store = store_with(vec![]);
        store.floors.push(Floor {
            id: FloorId::new("L2"),
            name: "Level 2".into(),
            elevation: 3.2,
        });
        let mut small = model_wall("small", (0.0, 0.0), None, 0.3, 0.3);
        small.kind = ElementKind::Column;
        small.geometry.mapped_origin = Some(Point3::new(2.0, 2.0, 0.0));
        let mut big = model_wall("big", (4.0, 0.0), None, 0.6, 0.6);
        big.kind = ElementKind::Column;
        let mut upper = model_wall("upper", (4.0, 0.0), None, 0.4, 0.4);
        upper.kind = ElementKind::Column;
        upper.geometry.floor = Some(FloorId::new("L2"));
        for c in [small, big, upper] {
            store.insert(c).unwrap();
        }

        let scan = ColumnScan {
            centroid: Point3::new(8.0, 8.0, 0.1),
            vertices: [Point3::ORIGIN; 4],
            profile_x: 0.35,
            profile_y: 0.35,
            height: 2.8,
        };
        let bp = plan_column(&store, &scan, &ColumnConfig::default()).unwrap();
        assert_eq!(bp.template, ElementId::new("small"));
        assert_eq!(bp.geometry.mapped_origin, Some(Point3::new(8.0, 8.0, 0.1)));
        assert_eq!(bp.geometry.height, 2.8);

        let high = ColumnScan {
            centroid: Point3::new(8.0, 8.0, 3.3),
            ..scan
        };
        let bp = plan_column(&store, &high, &ColumnConfig::default()).unwrap();
        assert_eq!(bp.template, ElementId::new("upper"));
        assert!((bp.geometry.placement.location.z - 0.1).abs() < 1e-12);
    }
}
