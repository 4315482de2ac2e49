//! The model store seam.
//!
//! Matching and resolution work on values; only the lifecycle, synthesis and
//! connectivity stages mutate, and always through [`ModelStore`].

use serde::{Deserialize, Serialize};

use crate::element::{
    set_authoritative_position, ElementGeometry, ElementId, ElementKind, Floor, FloorId,
    ModelElement,
};
use crate::error::ReconError;
use crate::geometry::Point3;

/// Which end of a wall's axis a connection attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathEnd {
    AtStart,
    AtEnd,
}

impl std::fmt::Display for PathEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AtStart => write!(f, "at_start"),
            Self::AtEnd => write!(f, "at_end"),
        }
    }
}

/// Explicit endpoint adjacency between two elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    pub relating: ElementId,
    pub related: ElementId,
    pub relating_end: PathEnd,
    pub related_end: PathEnd,
}

impl ConnectionEdge {
    pub fn joins(&self, a: &ElementId, b: &ElementId) -> bool {
        (&self.relating == a && &self.related == b) || (&self.relating == b && &self.related == a)
    }
}

pub trait ModelStore {
    /// Floors in store order.
    fn floors(&self) -> &[Floor];

    /// Elements of one kind in insertion order.
    fn elements(&self, kind: ElementKind) -> Vec<&ModelElement>;

    fn element(&self, id: &ElementId) -> Option<&ModelElement>;

    fn connections(&self) -> &[ConnectionEdge];

    /// Overwrite the authoritative floor-relative position.
    fn set_position(&mut self, id: &ElementId, position: Point3) -> Result<(), ReconError>;

    fn set_height(&mut self, id: &ElementId, height: f64) -> Result<(), ReconError>;

    /// Replace an element's whole geometry record.
    fn set_geometry(&mut self, id: &ElementId, geometry: ElementGeometry) -> Result<(), ReconError>;

    /// Copy `template` under a fresh identity derived from `seed`. Openings
    /// are not copied. A seed whose identity is taken is retried with a
    /// counter, so the result never collides with an existing element.
    fn clone_element(&mut self, template: &ElementId, seed: &str) -> Result<ElementId, ReconError>;

    /// Remove an element after its dependent openings.
    fn delete_element(&mut self, id: &ElementId) -> Result<(), ReconError>;

    fn connect(&mut self, edge: ConnectionEdge) -> Result<(), ReconError>;

    fn floor(&self, id: &FloorId) -> Option<&Floor> {
        self.floors().iter().find(|f| &f.id == id)
    }

    /// Elevation of an element's floor; 0 when it has none.
    fn elevation_of(&self, element: &ModelElement) -> f64 {
        element
            .geometry
            .floor
            .as_ref()
            .and_then(|f| self.floor(f))
            .map(|f| f.elevation)
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Vec-backed store that doubles as the persisted model document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pub floors: Vec<Floor>,
    #[serde(default)]
    pub elements: Vec<ModelElement>,
    #[serde(default)]
    pub connections: Vec<ConnectionEdge>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_floor(mut self, id: &str, elevation: f64) -> Self {
        self.floors.push(Floor {
            id: FloorId::new(id),
            name: id.to_string(),
            elevation,
        });
        self
    }

    pub fn insert(&mut self, element: ModelElement) -> Result<(), ReconError> {
        if self.elements.iter().any(|e| e.id == element.id) {
            return Err(ReconError::DuplicateElement(element.id.to_string()));
        }
        if let Some(floor) = &element.geometry.floor {
            if !self.floors.iter().any(|f| &f.id == floor) {
                return Err(ReconError::UnknownFloor(floor.to_string()));
            }
        }
        self.elements.push(element);
        Ok(())
    }

    /// Check cross references: floors, openings and connection endpoints.
    pub fn validate(&self) -> Result<(), ReconError> {
        let mut ids = std::collections::HashSet::new();
        for e in &self.elements {
            if !ids.insert(&e.id) {
                return Err(ReconError::DuplicateElement(e.id.to_string()));
            }
            if let Some(floor) = &e.geometry.floor {
                if self.floor(floor).is_none() {
                    return Err(ReconError::UnknownFloor(floor.to_string()));
                }
            }
        }
        for e in &self.elements {
            if let Some(missing) = e.openings.iter().find(|o| !ids.contains(o)) {
                return Err(ReconError::UnknownElement(missing.to_string()));
            }
        }
        for c in &self.connections {
            for id in [&c.relating, &c.related] {
                if !ids.contains(id) {
                    return Err(ReconError::UnknownElement(id.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Decode a model document and check its cross references.
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let store: MemoryStore =
            serde_json::from_str(input).map_err(|e| ReconError::ModelFormat(e.to_string()))?;
        store.validate()?;
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::ModelFormat(e.to_string()))
    }

    fn get_mut(&mut self, id: &ElementId) -> Result<&mut ModelElement, ReconError> {
        self.elements
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| ReconError::UnknownElement(id.to_string()))
    }

    fn remove(&mut self, id: &ElementId) {
        self.elements.retain(|e| &e.id != id);
        self.connections.retain(|c| &c.relating != id && &c.related != id);
    }
}

impl ModelStore for MemoryStore {
    fn floors(&self) -> &[Floor] {
        &self.floors
    }

    fn elements(&self, kind: ElementKind) -> Vec<&ModelElement> {
        self.elements.iter().filter(|e| e.kind == kind).collect()
    }

    fn element(&self, id: &ElementId) -> Option<&ModelElement> {
        self.elements.iter().find(|e| &e.id == id)
    }

    fn connections(&self) -> &[ConnectionEdge] {
        &self.connections
    }

    fn set_position(&mut self, id: &ElementId, position: Point3) -> Result<(), ReconError> {
        set_authoritative_position(self.get_mut(id)?, position);
        Ok(())
    }

    fn set_height(&mut self, id: &ElementId, height: f64) -> Result<(), ReconError> {
        self.get_mut(id)?.geometry.height = height;
        Ok(())
    }

    fn set_geometry(&mut self, id: &ElementId, geometry: ElementGeometry) -> Result<(), ReconError> {
        if let Some(floor) = &geometry.floor {
            if self.floor(floor).is_none() {
                return Err(ReconError::UnknownFloor(floor.to_string()));
            }
        }
        self.get_mut(id)?.geometry = geometry;
        Ok(())
    }

    fn clone_element(&mut self, template: &ElementId, seed: &str) -> Result<ElementId, ReconError> {
        let source = self
            .element(template)
            .ok_or_else(|| ReconError::UnknownElement(template.to_string()))?;
        let mint = |name: String| {
            ElementId::new(uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes()).to_string())
        };
        // Scan names repeat across surveys; count up until the id is free.
        let id = std::iter::once(mint(format!("{template}/{seed}")))
            .chain((1..).map(|n| mint(format!("{template}/{seed}/{n}"))))
            .find(|id| self.element(id).is_none())
            .ok_or_else(|| ReconError::DuplicateElement(format!("{template}/{seed}")))?;
        let mut copy = source.clone();
        copy.id = id.clone();
        copy.openings.clear();
        self.insert(copy)?;
        Ok(id)
    }

    fn delete_element(&mut self, id: &ElementId) -> Result<(), ReconError> {
        let openings = self
            .element(id)
            .ok_or_else(|| ReconError::UnknownElement(id.to_string()))?
            .openings
            .clone();
        for opening in &openings {
            self.remove(opening);
        }
        self.remove(id);
        Ok(())
    }

    fn connect(&mut self, edge: ConnectionEdge) -> Result<(), ReconError> {
        for id in [&edge.relating, &edge.related] {
            if self.element(id).is_none() {
                return Err(ReconError::UnknownElement(id.to_string()));
            }
        }
        self.connections.push(edge);
        Ok(())
    }
}
