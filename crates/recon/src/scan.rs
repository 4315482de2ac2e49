//! Scan-side descriptors: one segmented point cloud, one structural element.

use serde::{Deserialize, Serialize};

use crate::element::ElementKind;
use crate::geometry::Point3;

/// Points of one pre-segmented file, as handed over by the reader.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedCloud {
    pub name: String,
    pub kind: ElementKind,
    pub points: Vec<Point3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallOrientation {
    /// Runs along X (thin in Y).
    Horizontal,
    /// Runs along Y (thin in X).
    Vertical,
    Diagonal,
}

impl std::fmt::Display for WallOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
            Self::Diagonal => write!(f, "diagonal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallScan {
    pub orientation: WallOrientation,
    /// Left / bottom end of the centreline at the wall's base. For diagonal
    /// walls, the minimum bounding corner.
    pub base: Point3,
    pub end: Point3,
    pub thickness: f64,
    pub length: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScan {
    /// Footprint centre at the column base.
    pub centroid: Point3,
    /// Bounding corners at the base: (xmin,ymax), (xmax,ymax), (xmin,ymin), (xmax,ymin).
    pub vertices: [Point3; 4],
    pub profile_x: f64,
    pub profile_y: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CeilingScan {
    pub centroid: Point3,
    /// Eight offsets around the centroid at the mean height.
    pub sample_ring: [Point3; 8],
}

impl CeilingScan {
    /// Centroid followed by the ring: the nine membership samples.
    pub fn samples(&self) -> impl Iterator<Item = &Point3> {
        std::iter::once(&self.centroid).chain(self.sample_ring.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanShape {
    Wall(WallScan),
    Column(ColumnScan),
    Ceiling(CeilingScan),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPrimitive {
    pub name: String,
    pub shape: ScanShape,
}

impl ScanPrimitive {
    pub fn kind(&self) -> ElementKind {
        match self.shape {
            ScanShape::Wall(_) => ElementKind::Wall,
            ScanShape::Column(_) => ElementKind::Column,
            ScanShape::Ceiling(_) => ElementKind::Ceiling,
        }
    }

    pub fn as_wall(&self) -> Option<&WallScan> {
        match &self.shape {
            ScanShape::Wall(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnScan> {
        match &self.shape {
            ScanShape::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_ceiling(&self) -> Option<&CeilingScan> {
        match &self.shape {
            ScanShape::Ceiling(c) => Some(c),
            _ => None,
        }
    }

    /// Representative point for reports: wall base, column or ceiling centroid.
    pub fn anchor(&self) -> Point3 {
        match &self.shape {
            ScanShape::Wall(w) => w.base,
            ScanShape::Column(c) => c.centroid,
            ScanShape::Ceiling(c) => c.centroid,
        }
    }

    pub fn is_diagonal_wall(&self) -> bool {
        matches!(&self.shape, ScanShape::Wall(w) if w.orientation == WallOrientation::Diagonal)
    }
}
