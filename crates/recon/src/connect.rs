//! Endpoint connectivity for newly created walls.

use crate::config::ConnectivityConfig;
use crate::element::{ElementId, ElementKind, FloorId};
use crate::error::ReconError;
use crate::geometry::Point3;
use crate::matcher::WallCandidate;
use crate::store::{ConnectionEdge, ModelStore, PathEnd};

fn nearer(p: &Point3, wall: &WallCandidate) -> (f64, PathEnd) {
    let ds = p.distance(&wall.start);
    let de = p.distance(&wall.end);
    if ds <= de {
        (ds, PathEnd::AtStart)
    } else {
        (de, PathEnd::AtEnd)
    }
}

/// Record one edge per new wall and neighbour whose endpoints lie within the
/// neighbour's threshold. The new wall is always the related side.
///
/// Pairs already connected in the store are skipped, so repeated runs add
/// nothing.
pub fn repair_connectivity<S: ModelStore>(
    store: &mut S,
    created: &[ElementId],
    config: &ConnectivityConfig,
) -> Result<Vec<ConnectionEdge>, ReconError> {
    let walls: Vec<(WallCandidate, Option<FloorId>)> = store
        .elements(ElementKind::Wall)
        .into_iter()
        .filter_map(|e| WallCandidate::from_element(&*store, e).map(|c| (c, e.geometry.floor.clone())))
        .collect();

    let mut edges: Vec<ConnectionEdge> = Vec::new();
    for id in created {
        let Some((new, floor)) = walls.iter().find(|(c, _)| &c.id == id) else {
            log::debug!("new wall {id} has no axis-aligned geometry; no connections");
            continue;
        };
        for (other, other_floor) in &walls {
            if &other.id == id || other_floor != floor {
                continue;
            }
            if store
                .connections()
                .iter()
                .chain(&edges)
                .any(|e| e.joins(&new.id, &other.id))
            {
                continue;
            }
            let threshold = config.threshold.at(other.thickness);
            let (d_start, end_at_start) = nearer(&new.start, other);
            let (d_end, end_at_end) = nearer(&new.end, other);

            let (d, edge) = if d_start <= d_end {
                (d_start, (PathEnd::AtStart, end_at_start))
            } else {
                (d_end, (PathEnd::AtEnd, end_at_end))
            };
            if d >= threshold {
                continue;
            }
            let edge = ConnectionEdge {
                relating: other.id.clone(),
                related: new.id.clone(),
                relating_end: edge.1,
                related_end: edge.0,
            };
            log::debug!("connect {} ({}) -> {} ({})", edge.related, edge.related_end, edge.relating, edge.relating_end);
            edges.push(edge);
        }
    }

    for edge in &edges {
        store.connect(edge.clone())?;
    }
    Ok(edges)
}
