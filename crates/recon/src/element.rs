//! Model-side element records as held by a [`ModelStore`](crate::store::ModelStore).
//!
//! Positions are floor-relative. Anything that compares against scan data must
//! first lift them into the global frame with the owning floor's elevation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point2, Point3, Polygon};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorId(pub String);

impl FloorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for FloorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A storey: the vertical datum its elements are positioned against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub id: FloorId,
    #[serde(default)]
    pub name: String,
    pub elevation: f64,
}

// ---------------------------------------------------------------------------
// Kind + Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Wall,
    Column,
    Ceiling,
    /// Dependent sub-element (door or window void) owned by a host element.
    Opening,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wall => write!(f, "wall"),
            Self::Column => write!(f, "column"),
            Self::Ceiling => write!(f, "ceiling"),
            Self::Opening => write!(f, "opening"),
        }
    }
}

/// Local-to-global axis mapping of an element's placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// No reference direction recorded; behaves as `AlongX`.
    Unset,
    AlongX,
    AlongXNegative,
    AlongYPositive,
    AlongYNegative,
    /// Any other ratio tuple. Flagged, never used for endpoint derivation.
    Oblique,
}

impl Direction {
    /// Classify raw direction ratios. Only exact axis-aligned unit tuples map
    /// onto an axis; ratios are compared after normalisation.
    pub fn from_ratios(ratios: Option<[f64; 3]>) -> Self {
        let Some([x, y, z]) = ratios else {
            return Self::Unset;
        };
        let len = (x * x + y * y + z * z).sqrt();
        if len == 0.0 {
            return Self::Unset;
        }
        let (x, y, z) = (x / len, y / len, z / len);
        let near = |a: f64, b: f64| (a - b).abs() < 1e-9;
        if !near(z, 0.0) {
            return Self::Oblique;
        }
        match (x, y) {
            (x, y) if near(x, 1.0) && near(y, 0.0) => Self::AlongX,
            (x, y) if near(x, -1.0) && near(y, 0.0) => Self::AlongXNegative,
            (x, y) if near(x, 0.0) && near(y, 1.0) => Self::AlongYPositive,
            (x, y) if near(x, 0.0) && near(y, -1.0) => Self::AlongYNegative,
            _ => Self::Oblique,
        }
    }

    pub fn to_ratios(self) -> Option<[f64; 3]> {
        match self {
            Self::Unset | Self::Oblique => None,
            Self::AlongX => Some([1.0, 0.0, 0.0]),
            Self::AlongXNegative => Some([-1.0, 0.0, 0.0]),
            Self::AlongYPositive => Some([0.0, 1.0, 0.0]),
            Self::AlongYNegative => Some([0.0, -1.0, 0.0]),
        }
    }

    /// Unit step in the plane, `None` for oblique placements.
    pub fn unit(self) -> Option<(f64, f64)> {
        match self {
            Self::Unset | Self::AlongX => Some((1.0, 0.0)),
            Self::AlongXNegative => Some((-1.0, 0.0)),
            Self::AlongYPositive => Some((0.0, 1.0)),
            Self::AlongYNegative => Some((0.0, -1.0)),
            Self::Oblique => None,
        }
    }

    pub fn axis(self) -> Option<Axis> {
        match self {
            Self::Unset | Self::AlongX | Self::AlongXNegative => Some(Axis::X),
            Self::AlongYPositive | Self::AlongYNegative => Some(Axis::Y),
            Self::Oblique => None,
        }
    }

    /// True when the local profile X runs along global Y.
    pub fn swaps_profile_axes(self) -> bool {
        matches!(self, Self::AlongYPositive | Self::AlongYNegative)
    }
}

/// Horizontal axis an element runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub location: Point3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_direction: Option<[f64; 3]>,
}

impl Placement {
    pub fn direction(&self) -> Direction {
        Direction::from_ratios(self.ref_direction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Profile {
    Rectangle { x_dim: f64, y_dim: f64 },
    Polygon { points: Vec<Point2> },
}

impl Profile {
    pub fn is_rectangle(&self) -> bool {
        matches!(self, Self::Rectangle { .. })
    }

    pub fn rectangle_dims(&self) -> Option<(f64, f64)> {
        match self {
            Self::Rectangle { x_dim, y_dim } => Some((*x_dim, *y_dim)),
            Self::Polygon { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementGeometry {
    #[serde(default)]
    pub floor: Option<FloorId>,
    pub placement: Placement,
    /// Position inherited from a shared type definition, when the element has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_origin: Option<Point3>,
    /// Length of the axis polyline (walls).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_length: Option<f64>,
    pub profile: Profile,
    /// Extrusion depth.
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelElement {
    pub id: ElementId,
    #[serde(default)]
    pub name: String,
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Dependent sub-elements removed together with this element.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub openings: Vec<ElementId>,
    pub geometry: ElementGeometry,
}

// ---------------------------------------------------------------------------
// Position resolution
// ---------------------------------------------------------------------------

/// Which field holds an element's authoritative floor-relative position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    Placement,
    MappedOrigin,
}

/// A non-zero mapped origin wins over the element's own placement.
pub fn position_source(element: &ModelElement) -> PositionSource {
    match element.geometry.mapped_origin {
        Some(origin) if !origin.is_origin() => PositionSource::MappedOrigin,
        _ => PositionSource::Placement,
    }
}

/// Floor-relative position of an element, resolved once for every caller.
pub fn authoritative_position(element: &ModelElement) -> Point3 {
    match (position_source(element), element.geometry.mapped_origin) {
        (PositionSource::MappedOrigin, Some(origin)) => origin,
        _ => element.geometry.placement.location,
    }
}

/// Write `position` to whichever field [`authoritative_position`] reads.
pub fn set_authoritative_position(element: &mut ModelElement, position: Point3) {
    match position_source(element) {
        PositionSource::MappedOrigin => element.geometry.mapped_origin = Some(position),
        PositionSource::Placement => element.geometry.placement.location = position,
    }
}

// ---------------------------------------------------------------------------
// Wall helpers
// ---------------------------------------------------------------------------

impl ModelElement {
    pub fn direction(&self) -> Direction {
        self.geometry.placement.direction()
    }

    /// Wall thickness: the rectangle's local Y dimension.
    pub fn thickness(&self) -> Option<f64> {
        self.geometry.profile.rectangle_dims().map(|(_, y)| y)
    }

    pub fn axis_length(&self) -> Option<f64> {
        self.geometry
            .axis_length
            .or_else(|| self.geometry.profile.rectangle_dims().map(|(x, _)| x))
    }

    /// Global start and end of a wall's axis, given its floor elevation.
    ///
    /// `None` for oblique placements and elements without an axis length.
    pub fn wall_endpoints(&self, elevation: f64) -> Option<(Point3, Point3)> {
        let (ux, uy) = self.direction().unit()?;
        let length = self.axis_length()?;
        let loc = authoritative_position(self);
        let start = Point3::new(loc.x, loc.y, elevation + loc.z);
        let end = Point3::new(start.x + ux * length, start.y + uy * length, start.z);
        Some((start, end))
    }

    /// Global 2D footprint of a ceiling body.
    ///
    /// Rectangle profiles are centred on the body location with dimensions
    /// swapped when the placement runs along Y. Polygon points are offset by
    /// the location and rotated a quarter turn for Y placements.
    pub fn footprint(&self) -> Polygon {
        let loc = authoritative_position(self);
        let direction = self.direction();
        match &self.geometry.profile {
            Profile::Rectangle { x_dim, y_dim } => {
                let (w, d) = if direction.swaps_profile_axes() {
                    (*y_dim, *x_dim)
                } else {
                    (*x_dim, *y_dim)
                };
                Polygon::rectangle(loc.xy(), w, d)
            }
            Profile::Polygon { points } => {
                let sign = match direction {
                    Direction::AlongYNegative => -1.0,
                    _ => 1.0,
                };
                let vertices = points
                    .iter()
                    .map(|p| {
                        if direction.swaps_profile_axes() {
                            Point2::new(loc.x - sign * p.y, loc.y + sign * p.x)
                        } else {
                            Point2::new(loc.x + p.x, loc.y + p.y)
                        }
                    })
                    .collect();
                Polygon::new(vertices)
            }
        }
    }
}
