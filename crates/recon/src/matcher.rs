use std::collections::HashSet;

use crate::config::{AssignmentStrategy, ColumnConfig};
use crate::element::{authoritative_position, ElementId, ElementKind, ModelElement};
use crate::geometry::{Point2, Point3, Polygon};
use crate::model::{Match, MatchOutput};
use crate::region::RegionOfInterest;
use crate::scan::{CeilingScan, ColumnScan, ScanPrimitive, WallOrientation, WallScan};
use crate::store::ModelStore;

// ---------------------------------------------------------------------------
// Candidate pools
// ---------------------------------------------------------------------------

/// Region plus the membership buffer it is tested with.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub region: &'a RegionOfInterest,
    pub buffer: f64,
}

impl Scope<'_> {
    pub fn contains(&self, p: &Point3) -> bool {
        self.region.within(p, self.buffer)
    }

    /// Plan-only membership, for elements that sit above the vertical band.
    pub fn contains_plan(&self, p: Point2) -> bool {
        self.region
            .hull
            .contains_buffered(p, self.region.hull_buffer + self.buffer)
    }
}

/// Model elements of one kind split by eligibility.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    pub eligible: Vec<T>,
    pub outside: Vec<ElementId>,
    /// Geometry the matcher cannot evaluate (oblique or polygon walls).
    pub unsupported: Vec<ElementId>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            eligible: Vec::new(),
            outside: Vec::new(),
            unsupported: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WallCandidate {
    pub id: ElementId,
    pub start: Point3,
    pub end: Point3,
    pub thickness: f64,
}

impl WallCandidate {
    pub fn from_element<S: ModelStore>(store: &S, element: &ModelElement) -> Option<Self> {
        let thickness = element.thickness()?;
        let (start, end) = element.wall_endpoints(store.elevation_of(element))?;
        Some(Self {
            id: element.id.clone(),
            start,
            end,
            thickness,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCandidate {
    pub id: ElementId,
    /// Global base position.
    pub position: Point3,
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CeilingCandidate {
    pub id: ElementId,
    pub footprint: Polygon,
    /// Global underside height.
    pub height: f64,
}

pub fn wall_pool<S: ModelStore>(store: &S, scope: Option<Scope<'_>>) -> Pool<WallCandidate> {
    let mut pool = Pool::default();
    for element in store.elements(ElementKind::Wall) {
        let Some(candidate) = WallCandidate::from_element(store, element) else {
            log::debug!("wall {}: no axis-aligned rectangular geometry", element.id);
            pool.unsupported.push(element.id.clone());
            continue;
        };
        let inside = scope.map_or(true, |s| s.contains(&candidate.start) && s.contains(&candidate.end));
        if inside {
            pool.eligible.push(candidate);
        } else {
            pool.outside.push(element.id.clone());
        }
    }
    pool
}

pub fn column_pool<S: ModelStore>(
    store: &S,
    corridors: &[Corridor],
    config: &ColumnConfig,
    scope: Option<Scope<'_>>,
) -> Pool<ColumnCandidate> {
    let mut pool = Pool::default();
    for element in store.elements(ElementKind::Column) {
        let position = global_position(store, element);
        if !scope.map_or(true, |s| s.contains(&position)) {
            pool.outside.push(element.id.clone());
            continue;
        }
        pool.eligible.push(ColumnCandidate {
            id: element.id.clone(),
            position,
            embedded: is_embedded(&position, corridors, config),
        });
    }
    pool
}

pub fn ceiling_pool<S: ModelStore>(store: &S, scope: Option<Scope<'_>>) -> Pool<CeilingCandidate> {
    let mut pool = Pool::default();
    for element in store.elements(ElementKind::Ceiling) {
        let position = global_position(store, element);
        if !scope.map_or(true, |s| s.contains_plan(position.xy())) {
            pool.outside.push(element.id.clone());
            continue;
        }
        pool.eligible.push(CeilingCandidate {
            id: element.id.clone(),
            footprint: element.footprint(),
            height: position.z,
        });
    }
    pool
}

/// Authoritative position lifted into the global frame.
pub fn global_position<S: ModelStore>(store: &S, element: &ModelElement) -> Point3 {
    let p = authoritative_position(element);
    Point3::new(p.x, p.y, p.z + store.elevation_of(element))
}

// ---------------------------------------------------------------------------
// Embedded test
// ---------------------------------------------------------------------------

/// Plan-view band around a wall inside which a column counts as enclosed.
#[derive(Debug, Clone, PartialEq)]
pub struct Corridor {
    pub min: Point2,
    pub max: Point2,
    /// Global base height of the wall.
    pub z: f64,
}

impl Corridor {
    pub fn around(wall: &WallCandidate, margin: f64) -> Self {
        let grow = wall.thickness / 2.0 + margin;
        Self {
            min: Point2::new(wall.start.x.min(wall.end.x) - grow, wall.start.y.min(wall.end.y) - grow),
            max: Point2::new(wall.start.x.max(wall.end.x) + grow, wall.start.y.max(wall.end.y) + grow),
            z: wall.start.z,
        }
    }

    pub fn contains(&self, p: &Point3, vertical_tolerance: f64) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && (p.z - self.z).abs() <= vertical_tolerance
    }
}

pub fn corridors(walls: &[WallCandidate], margin: f64) -> Vec<Corridor> {
    walls.iter().map(|w| Corridor::around(w, margin)).collect()
}

pub fn is_embedded(position: &Point3, corridors: &[Corridor], config: &ColumnConfig) -> bool {
    corridors
        .iter()
        .any(|c| c.contains(position, config.corridor_vertical_tolerance))
}

// ---------------------------------------------------------------------------
// Acceptance predicates
// ---------------------------------------------------------------------------

/// Symmetric endpoint test. Returns the worst per-axis delta of the accepted
/// pairing and whether the scan base paired with the model end.
pub fn walls_match(
    scan_base: &Point3,
    scan_end: &Point3,
    model_start: &Point3,
    model_end: &Point3,
    tolerance: f64,
) -> Option<(f64, bool)> {
    let direct = scan_base.max_axis_delta(model_start).max(scan_end.max_axis_delta(model_end));
    if direct <= tolerance {
        return Some((direct, false));
    }
    let swapped = scan_base.max_axis_delta(model_end).max(scan_end.max_axis_delta(model_start));
    if swapped <= tolerance {
        return Some((swapped, true));
    }
    None
}

/// Nine-sample ceiling membership count.
pub fn ceiling_hits(scan: &CeilingScan, candidate: &CeilingCandidate, vertical_band: f64) -> usize {
    scan.samples()
        .filter(|p| {
            (p.z - candidate.height).abs() <= vertical_band && candidate.footprint.contains(p.xy())
        })
        .count()
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Bind scans to candidates under `strategy`.
///
/// `accept(scan, candidate)` returns the acceptance distance and reversal
/// flag, or `None` when the pair is outside tolerance.
pub fn assign<F>(
    scans: &[(usize, &ScanPrimitive)],
    candidates: &[ElementId],
    strategy: AssignmentStrategy,
    mut accept: F,
) -> MatchOutput
where
    F: FnMut(&ScanPrimitive, usize) -> Option<(f64, bool)>,
{
    let mut matched = Vec::new();
    match strategy {
        AssignmentStrategy::FirstFound => {
            for (scan_idx, scan) in scans {
                let hit = (0..candidates.len()).find_map(|c| accept(scan, c).map(|a| (c, a)));
                if let Some((c, (distance, reversed))) = hit {
                    matched.push(Match {
                        scan: *scan_idx,
                        scan_name: scan.name.clone(),
                        element: candidates[c].clone(),
                        distance,
                        tie_break: c,
                        reversed,
                    });
                }
            }
        }
        AssignmentStrategy::BestDistance => {
            let mut edges = Vec::new();
            for (order, (_, scan)) in scans.iter().enumerate() {
                for c in 0..candidates.len() {
                    if let Some((distance, reversed)) = accept(scan, c) {
                        edges.push((distance, order, c, reversed));
                    }
                }
            }
            edges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
            let mut scan_taken = vec![false; scans.len()];
            let mut cand_taken = vec![false; candidates.len()];
            for (distance, order, c, reversed) in edges {
                if scan_taken[order] || cand_taken[c] {
                    continue;
                }
                scan_taken[order] = true;
                cand_taken[c] = true;
                let (scan_idx, scan) = scans[order];
                matched.push(Match {
                    scan: scan_idx,
                    scan_name: scan.name.clone(),
                    element: candidates[c].clone(),
                    distance,
                    tie_break: c,
                    reversed,
                });
            }
            matched.sort_by_key(|m| m.scan);
        }
    }

    let bound_scans: HashSet<usize> = matched.iter().map(|m| m.scan).collect();
    let claimed: HashSet<&ElementId> = matched.iter().map(|m| &m.element).collect();
    let unmatched_scans = scans
        .iter()
        .map(|(i, _)| *i)
        .filter(|i| !bound_scans.contains(i))
        .collect();
    let unmatched_elements = candidates
        .iter()
        .filter(|id| !claimed.contains(id))
        .cloned()
        .collect();

    MatchOutput {
        matched,
        unmatched_scans,
        unmatched_elements,
    }
}

pub fn match_walls(
    scans: &[(usize, &ScanPrimitive)],
    pool: &[WallCandidate],
    tolerance: impl Fn(f64) -> f64,
    strategy: AssignmentStrategy,
) -> MatchOutput {
    let ids: Vec<ElementId> = pool.iter().map(|c| c.id.clone()).collect();
    assign(scans, &ids, strategy, |scan, c| {
        let wall: &WallScan = scan.as_wall()?;
        if wall.orientation == WallOrientation::Diagonal {
            return None;
        }
        let cand = &pool[c];
        walls_match(&wall.base, &wall.end, &cand.start, &cand.end, tolerance(cand.thickness))
    })
}

pub fn match_columns(
    scans: &[(usize, &ScanPrimitive)],
    pool: &[ColumnCandidate],
    config: &ColumnConfig,
    strategy: AssignmentStrategy,
) -> MatchOutput {
    let ids: Vec<ElementId> = pool.iter().map(|c| c.id.clone()).collect();
    assign(scans, &ids, strategy, |scan, c| {
        let column: &ColumnScan = scan.as_column()?;
        let cand = &pool[c];
        let radius = if cand.embedded {
            config.embedded_radius
        } else {
            config.free_radius
        };
        let d = column.centroid.distance(&cand.position);
        (d <= radius).then_some((d, false))
    })
}

pub fn match_ceilings(
    scans: &[(usize, &ScanPrimitive)],
    pool: &[CeilingCandidate],
    vertical_band: f64,
    min_hits: usize,
    strategy: AssignmentStrategy,
) -> MatchOutput {
    let ids: Vec<ElementId> = pool.iter().map(|c| c.id.clone()).collect();
    assign(scans, &ids, strategy, |scan, c| {
        let ceiling = scan.as_ceiling()?;
        let hits = ceiling_hits(ceiling, &pool[c], vertical_band);
        (hits >= min_hits).then_some(((9 - hits) as f64, false))
    })
}
