use std::collections::BTreeMap;

use crate::model::{Action, Decision, ReconResult, ReconSummary, ReportRow, Status};

fn source(d: &Decision) -> &'static str {
    if d.is_scan() {
        "scan"
    } else {
        "model"
    }
}

/// Compute summary statistics from the decision list.
///
/// Keep and delete counts come from model-side decisions, create counts from
/// scan-side ones, so a matched pair is not counted twice.
pub fn compute_summary(
    decisions: &[Decision],
    matched: usize,
    duplicate_claims: usize,
    connections: usize,
) -> ReconSummary {
    let mut summary = ReconSummary {
        matched,
        duplicate_claims,
        connections,
        bucket_counts: BTreeMap::new(),
        status_counts: BTreeMap::new(),
        ..ReconSummary::default()
    };

    for d in decisions {
        *summary
            .bucket_counts
            .entry(format!("{}.{}.{}", source(d), d.kind, d.action))
            .or_insert(0) += 1;
        *summary.status_counts.entry(d.status.to_string()).or_insert(0) += 1;

        if d.is_scan() {
            summary.scan_primitives += 1;
            if d.action == Action::Create {
                summary.create += 1;
                match d.status {
                    Status::Applied => summary.created += 1,
                    Status::NoTemplate | Status::NoFloor => summary.not_synthesized += 1,
                    _ => {}
                }
            }
        } else {
            summary.model_elements += 1;
            match d.action {
                Action::KeepUnchanged => summary.keep_unchanged += 1,
                Action::KeepReposition => summary.keep_reposition += 1,
                Action::Delete => summary.delete += 1,
                Action::Create => {}
            }
        }

        match d.status {
            Status::Diagonal => summary.diagonal += 1,
            Status::Embedded => summary.embedded += 1,
            Status::OutsideRegion => summary.outside_region += 1,
            _ => {}
        }
    }
    summary
}

/// Flatten a result into report rows: model decisions first, then scans.
/// Scan rows without a counterpart read `no match`.
pub fn build_report(result: &ReconResult) -> Vec<ReportRow> {
    result
        .decisions
        .iter()
        .map(|d| ReportRow {
            source: source(d),
            subject: d.subject.to_string(),
            name: d.name.clone(),
            kind: d.kind,
            decision: d.action,
            status: d.status,
            matched_with: match (&d.counterpart, d.is_scan()) {
                (Some(c), _) => c.clone(),
                (None, true) => "no match".to_string(),
                (None, false) => String::new(),
            },
            x: d.position.x,
            y: d.position.y,
            z: d.position.z,
        })
        .collect()
}
