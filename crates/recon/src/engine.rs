use std::collections::HashSet;

use crate::config::{ReconConfig, ScanMode};
use crate::connect::repair_connectivity;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::extract::extract_all;
use crate::lifecycle::{apply_plan, resolve, Resolution};
use crate::model::{ReconInput, ReconMeta, ReconResult, Status, SynthesisReport};
use crate::region::RegionOfInterest;
use crate::scan::ScanPrimitive;
use crate::store::ModelStore;
use crate::synth::{plan_column, plan_wall, synthesize_columns, synthesize_walls, Outcome};

/// Run reconciliation per config against `store`.
///
/// With `apply` false the store is only read: decisions carry `pending`
/// where a mutation would have been written, and creations are previewed.
pub fn run<S: ModelStore>(
    config: &ReconConfig,
    input: &ReconInput,
    store: &mut S,
    apply: bool,
) -> Result<ReconResult, ReconError> {
    let region = match (config.mode, &input.region) {
        (ScanMode::RegionOfInterest, Some(points)) => {
            Some(RegionOfInterest::build(points, &config.region)?)
        }
        (ScanMode::RegionOfInterest, None) => return Err(ReconError::MissingRegion),
        (ScanMode::WholeBuilding, Some(_)) => {
            log::warn!("region scan ignored in whole_building mode");
            None
        }
        (ScanMode::WholeBuilding, None) => None,
    };

    let scans = extract_all(&input.clouds, config)?;
    log::info!("{}: {} scan primitives, mode {}", config.name, scans.len(), config.mode);

    let mut resolution = resolve(&*store, &scans, region.as_ref(), config, apply);

    let mut synthesis = SynthesisReport::default();
    let mut connections = Vec::new();
    if apply {
        apply_plan(store, &resolution.plan)?;

        let walls = indexed(&scans, &resolution.plan.wall_creates);
        let (outcomes, report) = synthesize_walls(store, &walls, &config.synthesis)?;
        record(&mut resolution, outcomes);
        synthesis = report;

        let columns = indexed(&scans, &resolution.plan.column_creates);
        let outcomes = synthesize_columns(store, &columns, &config.columns)?;
        record(&mut resolution, outcomes);

        connections = repair_connectivity(store, &synthesis.created, &config.connectivity)?;
    } else {
        preview(&*store, &scans, &mut resolution, config);
    }

    let summary = compute_summary(
        &resolution.decisions,
        resolution.matches.len(),
        resolution.duplicate_claims,
        connections.len(),
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            mode: config.mode,
            assignment: config.assignment,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            applied: apply,
        },
        summary,
        decisions: resolution.decisions,
        matches: resolution.matches,
        synthesis,
        connections,
        advisories: resolution.advisories,
    })
}

fn indexed<'s>(scans: &'s [ScanPrimitive], indices: &[usize]) -> Vec<(usize, &'s ScanPrimitive)> {
    indices.iter().map(|&i| (i, &scans[i])).collect()
}

/// Fold synthesis outcomes back into the matching scan decisions.
fn record(resolution: &mut Resolution, outcomes: Vec<(usize, Outcome)>) {
    for (idx, outcome) in outcomes {
        let Some(&slot) = resolution.scan_slots.get(&idx) else {
            continue;
        };
        let decision = &mut resolution.decisions[slot];
        match outcome {
            Outcome::Created(id) => decision.counterpart = Some(id.to_string()),
            Outcome::Skipped(status) => decision.status = status,
        }
    }
}

/// Dry-run counterpart of synthesis: report which creations would fail.
fn preview<S: ModelStore>(
    store: &S,
    scans: &[ScanPrimitive],
    resolution: &mut Resolution,
    config: &ReconConfig,
) {
    let none = HashSet::new();
    let mut outcomes = Vec::new();
    for &idx in &resolution.plan.wall_creates {
        if let Err(status) = plan_wall(store, &scans[idx], &none, &config.synthesis) {
            outcomes.push((idx, Outcome::Skipped(status)));
        }
    }
    for &idx in &resolution.plan.column_creates {
        let planned = match scans[idx].as_column() {
            Some(column) => plan_column(store, column, &config.columns).map(|_| ()),
            None => Err(Status::Unsupported),
        };
        if let Err(status) = planned {
            outcomes.push((idx, Outcome::Skipped(status)));
        }
    }
    record(resolution, outcomes);
}
