//! Lifecycle resolution: every model element and every scan primitive gets
//! exactly one decision, and the store mutations behind them are planned.

use std::collections::{HashMap, HashSet};

use crate::config::{ColumnConfig, ReconConfig};
use crate::element::{authoritative_position, ElementId, ElementKind, ModelElement, Profile};
use crate::error::ReconError;
use crate::geometry::{Point3, EPSILON};
use crate::matcher::{
    ceiling_pool, column_pool, corridors, global_position, is_embedded, match_ceilings,
    match_columns, match_walls, wall_pool, Corridor, Pool, Scope,
};
use crate::model::{Action, Decision, Match, MatchOutput, Status, Subject};
use crate::region::RegionOfInterest;
use crate::scan::{ColumnScan, ScanPrimitive};
use crate::store::ModelStore;
use crate::synth::settle_wall;

/// A scan column counts as enclosed when its centre or any footprint corner
/// falls inside a wall corridor.
fn footprint_embedded(column: &ColumnScan, bands: &[Corridor], cfg: &ColumnConfig) -> bool {
    std::iter::once(&column.centroid)
        .chain(column.vertices.iter())
        .any(|p| is_embedded(p, bands, cfg))
}

/// Largest change a reposition would make to `element`.
fn reposition_delta(element: &ModelElement, position: Point3, height: Option<f64>, length: Option<f64>) -> f64 {
    let mut d = authoritative_position(element).max_axis_delta(&position);
    if let Some(h) = height {
        d = d.max((h - element.geometry.height).abs());
    }
    if let (Some(len), Some(old)) = (length, element.axis_length()) {
        d = d.max((len - old).abs());
    }
    d
}

/// New floor-relative position (and optionally height and axis length) for
/// a matched element.
#[derive(Debug, Clone, PartialEq)]
pub struct Reposition {
    pub id: ElementId,
    pub position: Point3,
    pub height: Option<f64>,
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub repositions: Vec<Reposition>,
    pub deletes: Vec<ElementId>,
    /// Scan indices that should become new walls.
    pub wall_creates: Vec<usize>,
    /// Scan indices that should become new columns.
    pub column_creates: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub decisions: Vec<Decision>,
    pub matches: Vec<Match>,
    pub plan: Plan,
    pub advisories: Vec<String>,
    /// Model elements claimed by more than one scan primitive.
    pub duplicate_claims: usize,
    /// Decision index of each scan primitive, by scan index.
    pub scan_slots: HashMap<usize, usize>,
}

/// Accumulates per-kind decisions before they are laid out in store and
/// scan order.
struct Resolver<'a, S: ModelStore> {
    store: &'a S,
    scans: &'a [ScanPrimitive],
    config: &'a ReconConfig,
    changed: Status,
    elements: HashMap<ElementId, Decision>,
    scan_decisions: Vec<Option<Decision>>,
    matches: Vec<Match>,
    plan: Plan,
    advisories: Vec<String>,
    duplicates: HashSet<ElementId>,
}

impl<'a, S: ModelStore> Resolver<'a, S> {
    fn indexed(&self, kind: ElementKind) -> Vec<(usize, &'a ScanPrimitive)> {
        let scans = self.scans;
        scans
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind() == kind)
            .collect()
    }

    fn element_decision(
        &mut self,
        id: &ElementId,
        kind: ElementKind,
        action: Action,
        status: Status,
        counterpart: Option<String>,
        delta: Option<f64>,
    ) {
        let element = self.store.element(id);
        let position = element
            .map(|e| global_position(self.store, e))
            .unwrap_or_default();
        let name = element.map(|e| e.name.clone()).unwrap_or_default();
        self.elements.insert(
            id.clone(),
            Decision {
                subject: Subject::Element(id.clone()),
                name,
                kind,
                action,
                status,
                counterpart,
                position,
                delta,
            },
        );
    }

    fn scan_decision(&mut self, idx: usize, action: Action, status: Status, counterpart: Option<String>) {
        let scan = &self.scans[idx];
        self.scan_decisions[idx] = Some(Decision {
            subject: Subject::Scan(scan.name.clone()),
            name: scan.name.clone(),
            kind: scan.kind(),
            action,
            status,
            counterpart,
            position: scan.anchor(),
            delta: None,
        });
    }

    fn park<T>(&mut self, kind: ElementKind, pool: &Pool<T>) {
        for id in &pool.outside {
            self.element_decision(id, kind, Action::KeepUnchanged, Status::OutsideRegion, None, None);
        }
        for id in &pool.unsupported {
            self.element_decision(id, kind, Action::KeepUnchanged, Status::Unsupported, None, None);
            self.advisories
                .push(format!("{kind} {id}: oblique or non-rectangular geometry was not evaluated"));
        }
    }

    /// Record matched pairs. The first claimant of an element drives its
    /// reposition; later claimants only reference it.
    fn bind(&mut self, kind: ElementKind, output: &MatchOutput, reposition: impl Fn(&Match) -> Option<Reposition>) {
        let mut claimed: HashSet<ElementId> = HashSet::new();
        for m in &output.matched {
            self.matches.push(m.clone());
            if !claimed.insert(m.element.clone()) {
                log::warn!("{kind} {} claimed again by '{}'", m.element, m.scan_name);
                self.duplicates.insert(m.element.clone());
                self.scan_decision(m.scan, Action::KeepUnchanged, Status::Duplicate, Some(m.element.to_string()));
                continue;
            }

            let current = self.store.element(&m.element).cloned();
            let planned = reposition(m);
            let delta = match (current, &planned) {
                (Some(el), Some(r)) => {
                    let raw = reposition_delta(&el, r.position, r.height, r.length);
                    match kind {
                        ElementKind::Wall if raw > EPSILON => {
                            self.settled_delta(&el, r).map_or(raw, |d| d.min(raw))
                        }
                        _ => raw,
                    }
                }
                _ => 0.0,
            };

            let (action, status) = if delta <= EPSILON {
                (Action::KeepUnchanged, Status::Confirmed)
            } else {
                (Action::KeepReposition, self.changed)
            };
            if let (Action::KeepReposition, Some(r)) = (action, planned) {
                self.plan.repositions.push(r);
            }
            self.element_decision(&m.element, kind, action, status, Some(m.scan_name.clone()), Some(delta));
            self.scan_decision(m.scan, action, status, Some(m.element.to_string()));
        }
    }

    /// Distance between a wall and its planned geometry once that geometry
    /// is snapped against the neighbouring walls. A wall aligned by an
    /// earlier run sits exactly there.
    fn settled_delta(&self, element: &ModelElement, r: &Reposition) -> Option<f64> {
        let length = r.length?;
        let elevation = self.store.elevation_of(element);
        let start = Point3::new(r.position.x, r.position.y, r.position.z + elevation);
        let (settled, settled_length) =
            settle_wall(self.store, &element.id, start, length, &self.config.synthesis)?;
        let position = Point3::new(settled.x, settled.y, settled.z - elevation);
        Some(reposition_delta(element, position, r.height, Some(settled_length)))
    }

    fn delete(&mut self, id: &ElementId, kind: ElementKind) {
        self.element_decision(id, kind, Action::Delete, self.changed, None, None);
        self.plan.deletes.push(id.clone());
    }

    fn advise_ratio(&mut self, kind: ElementKind, scans: usize, model: usize) {
        if model == 0 {
            return;
        }
        let ratio = scans as f64 / model as f64;
        if ratio < self.config.advisory.min_detection_ratio {
            self.advisories.push(format!(
                "{kind}: {scans} scan primitives for {model} model elements in scope ({:.0}%); review unmatched {kind}s manually",
                ratio * 100.0
            ));
        }
    }

    // -- walls ---------------------------------------------------------------

    fn walls(&mut self, scope: Option<Scope<'_>>) {
        let scans = self.indexed(ElementKind::Wall);
        let pool = wall_pool(self.store, scope);
        self.park(ElementKind::Wall, &pool);

        let threshold = self.config.wall_threshold();
        let output = match_walls(&scans, &pool.eligible, |t| threshold.at(t), self.config.assignment);
        let store = self.store;
        let all_scans = self.scans;
        self.bind(ElementKind::Wall, &output, |m| {
            let wall = all_scans[m.scan].as_wall()?;
            let loc = authoritative_position(store.element(&m.element)?);
            let start = if m.reversed { wall.end } else { wall.base };
            Some(Reposition {
                id: m.element.clone(),
                position: Point3::new(start.x, start.y, loc.z),
                height: Some(wall.height),
                length: Some(wall.length),
            })
        });

        for id in &output.unmatched_elements {
            self.delete(id, ElementKind::Wall);
        }
        let mut diagonal = 0;
        for &idx in &output.unmatched_scans {
            let scan = &all_scans[idx];
            if scan.is_diagonal_wall() {
                diagonal += 1;
                self.advisories
                    .push(format!("wall scan '{}' is diagonal; model it manually", scan.name));
                self.scan_decision(idx, Action::Create, Status::Diagonal, None);
            } else {
                self.scan_decision(idx, Action::Create, self.changed, None);
                self.plan.wall_creates.push(idx);
            }
        }
        self.advise_ratio(ElementKind::Wall, scans.len() - diagonal, pool.eligible.len());
    }

    // -- columns -------------------------------------------------------------

    fn columns(&mut self, scope: Option<Scope<'_>>) {
        let scans = self.indexed(ElementKind::Column);
        let config = self.config;
        let cfg = &config.columns;
        let walls = wall_pool(self.store, None).eligible;
        let bands: Vec<Corridor> = corridors(&walls, cfg.corridor_margin);
        let pool = column_pool(self.store, &bands, cfg, scope);
        self.park(ElementKind::Column, &pool);

        let output = match_columns(&scans, &pool.eligible, cfg, self.config.assignment);
        let store = self.store;
        let all_scans = self.scans;
        self.bind(ElementKind::Column, &output, |m| {
            let column = all_scans[m.scan].as_column()?;
            let elevation = store.elevation_of(store.element(&m.element)?);
            let c = column.centroid;
            Some(Reposition {
                id: m.element.clone(),
                position: Point3::new(c.x, c.y, c.z - elevation),
                height: Some(column.height),
                length: None,
            })
        });

        let embedded: HashSet<&ElementId> = pool.eligible.iter().filter(|c| c.embedded).map(|c| &c.id).collect();
        for id in &output.unmatched_elements {
            if embedded.contains(id) {
                self.element_decision(id, ElementKind::Column, Action::KeepUnchanged, Status::Embedded, None, None);
            } else {
                self.delete(id, ElementKind::Column);
            }
        }

        let mut free_scans = 0;
        for &(idx, scan) in &scans {
            let bound_to_embedded = output
                .matched
                .iter()
                .any(|m| m.scan == idx && embedded.contains(&m.element));
            let enclosed = scan
                .as_column()
                .is_some_and(|c| footprint_embedded(c, &bands, cfg));
            if !bound_to_embedded && !enclosed {
                free_scans += 1;
            }
        }
        for &idx in &output.unmatched_scans {
            let enclosed = self.scans[idx]
                .as_column()
                .is_some_and(|c| footprint_embedded(c, &bands, cfg));
            if enclosed {
                self.scan_decision(idx, Action::Create, Status::Embedded, None);
            } else {
                self.scan_decision(idx, Action::Create, self.changed, None);
                self.plan.column_creates.push(idx);
            }
        }
        let free_model = pool.eligible.len() - embedded.len();
        self.advise_ratio(ElementKind::Column, free_scans, free_model);
    }

    // -- ceilings ------------------------------------------------------------

    fn ceilings(&mut self, scope: Option<Scope<'_>>) {
        let scans = self.indexed(ElementKind::Ceiling);
        let config = self.config;
        let cfg = &config.ceilings;
        let pool = ceiling_pool(self.store, scope);
        self.park(ElementKind::Ceiling, &pool);

        let output = match_ceilings(&scans, &pool.eligible, cfg.vertical_band, cfg.min_hits, self.config.assignment);
        let store = self.store;
        let all_scans = self.scans;
        self.bind(ElementKind::Ceiling, &output, |m| {
            let ceiling = all_scans[m.scan].as_ceiling()?;
            let element = store.element(&m.element)?;
            let loc = authoritative_position(element);
            Some(Reposition {
                id: m.element.clone(),
                position: Point3::new(loc.x, loc.y, ceiling.centroid.z - store.elevation_of(element)),
                height: None,
                length: None,
            })
        });

        let delete_unmatched = cfg.delete_unmatched;
        for id in &output.unmatched_elements {
            if delete_unmatched {
                self.delete(id, ElementKind::Ceiling);
            } else {
                self.element_decision(id, ElementKind::Ceiling, Action::KeepUnchanged, Status::Retained, None, None);
            }
        }
        for &idx in &output.unmatched_scans {
            self.scan_decision(idx, Action::Create, Status::Unsupported, None);
        }
        self.advise_ratio(ElementKind::Ceiling, scans.len(), pool.eligible.len());
    }

    // -- openings ------------------------------------------------------------

    /// Openings follow their host: deleted with it, otherwise retained.
    fn openings(&mut self) {
        let store = self.store;
        let deleted: HashSet<&ElementId> = self.plan.deletes.iter().collect();
        let mut doomed: HashMap<ElementId, Status> = HashMap::new();
        for kind in [ElementKind::Wall, ElementKind::Column, ElementKind::Ceiling] {
            for host in store.elements(kind) {
                if deleted.contains(&host.id) {
                    for opening in &host.openings {
                        doomed.insert(opening.clone(), self.changed);
                    }
                }
            }
        }
        for opening in store.elements(ElementKind::Opening) {
            let id = opening.id.clone();
            match doomed.get(&id) {
                Some(&status) => self.element_decision(&id, ElementKind::Opening, Action::Delete, status, None, None),
                None => self.element_decision(&id, ElementKind::Opening, Action::KeepUnchanged, Status::Retained, None, None),
            }
        }
    }

    fn finish(self) -> Resolution {
        let Resolver {
            store,
            mut elements,
            scan_decisions,
            matches,
            plan,
            advisories,
            duplicates,
            ..
        } = self;

        let mut decisions = Vec::new();
        for kind in [ElementKind::Wall, ElementKind::Column, ElementKind::Ceiling, ElementKind::Opening] {
            for element in store.elements(kind) {
                if let Some(d) = elements.remove(&element.id) {
                    decisions.push(d);
                }
            }
        }
        let mut scan_slots = HashMap::new();
        for (idx, decision) in scan_decisions.into_iter().enumerate() {
            if let Some(d) = decision {
                scan_slots.insert(idx, decisions.len());
                decisions.push(d);
            }
        }

        Resolution {
            decisions,
            matches,
            plan,
            advisories,
            duplicate_claims: duplicates.len(),
            scan_slots,
        }
    }
}

/// Match every kind against the store and decide the fate of each element
/// and scan primitive. Nothing is written; see [`apply_plan`].
pub fn resolve<S: ModelStore>(
    store: &S,
    scans: &[ScanPrimitive],
    region: Option<&RegionOfInterest>,
    config: &ReconConfig,
    apply: bool,
) -> Resolution {
    let scope = region.map(|region| Scope {
        region,
        buffer: config.region.membership_buffer,
    });
    let mut resolver = Resolver {
        store,
        scans,
        config,
        changed: if apply { Status::Applied } else { Status::Pending },
        elements: HashMap::new(),
        scan_decisions: vec![None; scans.len()],
        matches: Vec::new(),
        plan: Plan::default(),
        advisories: Vec::new(),
        duplicates: HashSet::new(),
    };
    resolver.walls(scope);
    resolver.columns(scope);
    resolver.ceilings(scope);
    resolver.openings();
    resolver.finish()
}

/// Write repositions, then deletions, to the store.
pub fn apply_plan<S: ModelStore>(store: &mut S, plan: &Plan) -> Result<(), ReconError> {
    for r in &plan.repositions {
        store.set_position(&r.id, r.position)?;
        if let Some(height) = r.height {
            store.set_height(&r.id, height)?;
        }
        if let Some(length) = r.length {
            let element = store
                .element(&r.id)
                .ok_or_else(|| ReconError::UnknownElement(r.id.to_string()))?;
            let mut geometry = element.geometry.clone();
            geometry.axis_length = Some(length);
            if let Profile::Rectangle { x_dim, .. } = &mut geometry.profile {
                *x_dim = length;
            }
            store.set_geometry(&r.id, geometry)?;
        }
    }
    for id in &plan.deletes {
        log::info!("deleting {id}");
        store.delete_element(id)?;
    }
    Ok(())
}
