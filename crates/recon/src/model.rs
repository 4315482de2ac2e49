use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{AssignmentStrategy, ScanMode};
use crate::element::{ElementId, ElementKind};
use crate::geometry::Point3;
use crate::scan::SegmentedCloud;
use crate::store::ConnectionEdge;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pre-loaded scan data for one run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    /// Segmented element clouds, in the order they should be judged.
    pub clouds: Vec<SegmentedCloud>,
    /// Full-area cloud of a partial scan; required in region-of-interest mode.
    pub region: Option<Vec<Point3>>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// One scan primitive bound to one model element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Index into the run's scan primitives.
    pub scan: usize,
    pub scan_name: String,
    pub element: ElementId,
    /// Acceptance distance; lower is better. Per-axis delta for walls,
    /// centroid distance for columns, missed samples for ceilings.
    pub distance: f64,
    /// Candidate order within the pool; lower wins ties.
    pub tie_break: usize,
    /// Scan base paired with the model end (walls only).
    pub reversed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchOutput {
    pub matched: Vec<Match>,
    /// Scan indices with no accepted candidate.
    pub unmatched_scans: Vec<usize>,
    /// Eligible model elements nobody claimed.
    pub unmatched_elements: Vec<ElementId>,
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    KeepUnchanged,
    KeepReposition,
    Delete,
    Create,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepUnchanged => write!(f, "keep_unchanged"),
            Self::KeepReposition => write!(f, "keep_reposition"),
            Self::Delete => write!(f, "delete"),
            Self::Create => write!(f, "create"),
        }
    }
}

/// What became of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Scan agrees with the model within floating-point tolerance.
    Confirmed,
    /// Mutation written to the store.
    Applied,
    /// Dry run: mutation computed but not written.
    Pending,
    /// Outside the region of interest; not judged.
    OutsideRegion,
    /// Column enclosed by a wall; reported only.
    Embedded,
    /// Non-axis-aligned wall; needs manual modelling.
    Diagonal,
    /// No same-kind template within thickness tolerance.
    NoTemplate,
    /// No floor to host the new element.
    NoFloor,
    /// Element geometry the engine cannot reason about (oblique, polygon wall,
    /// ceiling creation).
    Unsupported,
    /// Unmatched but kept by configuration.
    Retained,
    /// Scan matched an element already claimed by an earlier scan.
    Duplicate,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Confirmed => "confirmed",
            Self::Applied => "applied",
            Self::Pending => "pending",
            Self::OutsideRegion => "outside_region",
            Self::Embedded => "embedded",
            Self::Diagonal => "diagonal",
            Self::NoTemplate => "no_template",
            Self::NoFloor => "no_floor",
            Self::Unsupported => "unsupported",
            Self::Retained => "retained",
            Self::Duplicate => "duplicate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Subject {
    Element(ElementId),
    Scan(String),
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Element(id) => write!(f, "{id}"),
            Self::Scan(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub subject: Subject,
    /// Element name, or the scan name for scan-side decisions.
    pub name: String,
    pub kind: ElementKind,
    pub action: Action,
    pub status: Status,
    /// Matched scan name, matched element id, or created element id.
    pub counterpart: Option<String>,
    /// Global position before the run (model) or scan anchor (scan).
    pub position: Point3,
    /// Positional change written by a reposition.
    pub delta: Option<f64>,
}

impl Decision {
    pub fn is_scan(&self) -> bool {
        matches!(self.subject, Subject::Scan(_))
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SynthesisReport {
    pub created: Vec<ElementId>,
    pub sweeps: usize,
    pub converged: bool,
    /// Largest endpoint movement in the final sweep.
    pub final_delta: f64,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    pub scan_primitives: usize,
    pub model_elements: usize,
    /// Scan primitives bound to a model element.
    pub matched: usize,
    pub keep_unchanged: usize,
    pub keep_reposition: usize,
    pub delete: usize,
    pub create: usize,
    /// Create decisions actually written to the store.
    pub created: usize,
    pub not_synthesized: usize,
    pub diagonal: usize,
    pub embedded: usize,
    pub outside_region: usize,
    /// Model elements claimed by more than one scan primitive.
    pub duplicate_claims: usize,
    pub connections: usize,
    /// Keyed `source.kind.decision`, source being `model` or `scan`.
    pub bucket_counts: BTreeMap<String, usize>,
    /// Keyed by status.
    pub status_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub decisions: Vec<Decision>,
    pub matches: Vec<Match>,
    pub synthesis: SynthesisReport,
    pub connections: Vec<ConnectionEdge>,
    pub advisories: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub mode: ScanMode,
    pub assignment: AssignmentStrategy,
    pub engine_version: String,
    pub run_at: String,
    /// False for dry runs.
    pub applied: bool,
}

/// One line of the match report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub source: &'static str,
    pub subject: String,
    pub name: String,
    pub kind: ElementKind,
    pub decision: Action,
    pub status: Status,
    pub matched_with: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
