use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    #[serde(default)]
    pub mode: ScanMode,
    #[serde(default)]
    pub assignment: AssignmentStrategy,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub region: RegionConfig,
    #[serde(default)]
    pub walls: WallConfig,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub ceilings: CeilingConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub advisory: AdvisoryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl ReconConfig {
    /// Config with every table at its default, for callers that build runs in code.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: ScanMode::default(),
            assignment: AssignmentStrategy::default(),
            extraction: ExtractionConfig::default(),
            region: RegionConfig::default(),
            walls: WallConfig::default(),
            columns: ColumnConfig::default(),
            ceilings: CeilingConfig::default(),
            synthesis: SynthesisConfig::default(),
            connectivity: ConnectivityConfig::default(),
            advisory: AdvisoryConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Wall matching threshold for the configured mode.
    pub fn wall_threshold(&self) -> DynamicThreshold {
        match self.mode {
            ScanMode::WholeBuilding => self.walls.whole_building,
            ScanMode::RegionOfInterest => self.walls.region,
        }
    }

    /// Thickness below which a horizontal extent counts as a wall's thin axis.
    pub fn thickness_threshold(&self) -> f64 {
        match self.mode {
            ScanMode::WholeBuilding => self.extraction.thickness_threshold,
            ScanMode::RegionOfInterest => self.extraction.region_thickness_threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// Mode + Assignment
// ---------------------------------------------------------------------------

/// Whether the scan covers the whole building or only part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    WholeBuilding,
    RegionOfInterest,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WholeBuilding => write!(f, "whole_building"),
            Self::RegionOfInterest => write!(f, "region_of_interest"),
        }
    }
}

/// How scan primitives are bound to model candidates.
///
/// `FirstFound` accepts the first candidate inside tolerance and leaves it in
/// the pool, so several scans can claim one element. `BestDistance` accepts
/// pairs in ascending distance order and binds each side at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    #[default]
    FirstFound,
    BestDistance,
}

impl std::fmt::Display for AssignmentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstFound => write!(f, "first_found"),
            Self::BestDistance => write!(f, "best_distance"),
        }
    }
}

// ---------------------------------------------------------------------------
// Dynamic threshold
// ---------------------------------------------------------------------------

/// `max(floor, factor * thickness)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DynamicThreshold {
    pub floor: f64,
    pub factor: f64,
}

impl DynamicThreshold {
    pub const fn new(floor: f64, factor: f64) -> Self {
        Self { floor, factor }
    }

    pub fn at(&self, thickness: f64) -> f64 {
        self.floor.max(self.factor * thickness)
    }

    fn validate(&self, label: &str) -> Result<(), ReconError> {
        if !(self.floor > 0.0) || self.factor < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "{label}: floor must be > 0 and factor >= 0 (got floor={}, factor={})",
                self.floor, self.factor
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Extraction + Region
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub thickness_threshold: f64,
    pub region_thickness_threshold: f64,
    pub ceiling_sample_offset: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            thickness_threshold: 0.22,
            region_thickness_threshold: 0.78,
            ceiling_sample_offset: 0.6,
        }
    }
}

/// Region-of-interest parameters.
///
/// The two buffers add up: a point belongs to the region when it lies within
/// `hull_buffer + membership_buffer` of the raw hull (1.1 with defaults).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Concavity; 0 yields the convex hull.
    pub alpha: f64,
    pub voxel_size: f64,
    /// Outward growth applied when the hull is built.
    pub hull_buffer: f64,
    /// Extra growth applied at each membership test.
    pub membership_buffer: f64,
    pub z_offset: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            voxel_size: 0.5,
            hull_buffer: 0.4,
            membership_buffer: 0.7,
            z_offset: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-kind matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    pub whole_building: DynamicThreshold,
    pub region: DynamicThreshold,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            whole_building: DynamicThreshold::new(0.55, 2.5),
            region: DynamicThreshold::new(0.65, 2.5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub embedded_radius: f64,
    pub free_radius: f64,
    /// Horizontal margin around a wall's footprint that counts as "inside" it.
    pub corridor_margin: f64,
    pub corridor_vertical_tolerance: f64,
    pub template_elevation_tolerance: f64,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            embedded_radius: 1.1,
            free_radius: 1.2,
            corridor_margin: 0.35,
            corridor_vertical_tolerance: 0.25,
            template_elevation_tolerance: 0.4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CeilingConfig {
    pub vertical_band: f64,
    pub min_hits: usize,
    pub delete_unmatched: bool,
}

impl Default for CeilingConfig {
    fn default() -> Self {
        Self {
            vertical_band: 0.5,
            min_hits: 6,
            delete_unmatched: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesis + Connectivity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub template_thickness_tolerance: f64,
    /// Half-extents (x, y, z) of the template search box around each scan endpoint.
    pub template_search_box: [f64; 3],
    /// Bound for the whole-model fallback search; unbounded when absent.
    pub global_thickness_tolerance: Option<f64>,
    pub floor_elevation_tolerance: f64,
    pub height_snap_tolerance: f64,
    pub start_snap: DynamicThreshold,
    pub end_snap: DynamicThreshold,
    pub min_sweeps: usize,
    pub max_sweeps: usize,
    pub convergence_epsilon: f64,
    pub min_length: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            template_thickness_tolerance: 0.06,
            template_search_box: [2.0, 2.0, 0.3],
            global_thickness_tolerance: None,
            floor_elevation_tolerance: 0.35,
            height_snap_tolerance: 0.3,
            start_snap: DynamicThreshold::new(0.55, 2.5),
            end_snap: DynamicThreshold::new(0.75, 2.8),
            min_sweeps: 3,
            max_sweeps: 12,
            convergence_epsilon: 1e-6,
            min_length: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub threshold: DynamicThreshold,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            threshold: DynamicThreshold::new(0.55, 2.2),
        }
    }
}

// ---------------------------------------------------------------------------
// Advisory + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Scan-to-model count ratio below which a kind is flagged for manual review.
    pub min_detection_ratio: f64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            min_detection_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub model_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        positive("extraction.thickness_threshold", self.extraction.thickness_threshold)?;
        positive(
            "extraction.region_thickness_threshold",
            self.extraction.region_thickness_threshold,
        )?;
        positive("extraction.ceiling_sample_offset", self.extraction.ceiling_sample_offset)?;

        positive("region.voxel_size", self.region.voxel_size)?;
        non_negative("region.alpha", self.region.alpha)?;
        non_negative("region.hull_buffer", self.region.hull_buffer)?;
        non_negative("region.membership_buffer", self.region.membership_buffer)?;
        non_negative("region.z_offset", self.region.z_offset)?;

        self.walls.whole_building.validate("walls.whole_building")?;
        self.walls.region.validate("walls.region")?;

        positive("columns.embedded_radius", self.columns.embedded_radius)?;
        positive("columns.free_radius", self.columns.free_radius)?;
        non_negative("columns.corridor_margin", self.columns.corridor_margin)?;

        positive("ceilings.vertical_band", self.ceilings.vertical_band)?;
        if !(1..=9).contains(&self.ceilings.min_hits) {
            return Err(ReconError::ConfigValidation(format!(
                "ceilings.min_hits must be within 1..=9, got {}",
                self.ceilings.min_hits
            )));
        }

        let s = &self.synthesis;
        positive("synthesis.template_thickness_tolerance", s.template_thickness_tolerance)?;
        positive("synthesis.floor_elevation_tolerance", s.floor_elevation_tolerance)?;
        non_negative("synthesis.height_snap_tolerance", s.height_snap_tolerance)?;
        positive("synthesis.convergence_epsilon", s.convergence_epsilon)?;
        if let Some(t) = s.global_thickness_tolerance {
            positive("synthesis.global_thickness_tolerance", t)?;
        }
        s.start_snap.validate("synthesis.start_snap")?;
        s.end_snap.validate("synthesis.end_snap")?;
        if s.min_sweeps < 3 {
            return Err(ReconError::ConfigValidation(format!(
                "synthesis.min_sweeps must be at least 3, got {}",
                s.min_sweeps
            )));
        }
        if s.max_sweeps < s.min_sweeps {
            return Err(ReconError::ConfigValidation(format!(
                "synthesis.max_sweeps ({}) must be >= min_sweeps ({})",
                s.max_sweeps, s.min_sweeps
            )));
        }

        self.connectivity.threshold.validate("connectivity.threshold")?;
        non_negative("advisory.min_detection_ratio", self.advisory.min_detection_ratio)?;

        Ok(())
    }
}

fn positive(label: &str, value: f64) -> Result<(), ReconError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ReconError::ConfigValidation(format!("{label} must be > 0, got {value}")))
    }
}

fn non_negative(label: &str, value: f64) -> Result<(), ReconError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ReconError::ConfigValidation(format!("{label} must be >= 0, got {value}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
