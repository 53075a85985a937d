use gdal::vector::{Layer, LayerAccess};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::collections::HashSet;

use crate::error::{EliminateError, Result};
use crate::geom;
use crate::index::SpatialIndex;
use crate::node::{FeatureNode, Fid, NodeArena, NodeKind};

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("Loading features");
    pb
}

/// Stream the source layer once, building a [`FeatureNode`] per feature and
/// classifying each as keep or victim. Features without usable polygonal
/// geometry are dropped with a warning. Returns the arena together with a
/// bulk-loaded spatial index over it.
pub fn load(
    layer: &mut Layer,
    victim_fids: &[Fid],
    progress: bool,
) -> Result<(NodeArena, SpatialIndex)> {
    let layer_name = layer.name();
    let geom_columns = layer.defn().geom_fields().count();
    if geom_columns == 0 {
        return Err(EliminateError::MissingGeometryColumn(layer_name));
    }
    if geom_columns > 1 {
        return Err(EliminateError::MultipleGeometryColumns(
            layer_name,
            geom_columns,
        ));
    }

    let mut pending: HashSet<Fid> = victim_fids.iter().copied().collect();
    let mut arena = NodeArena::default();
    let pb = progress_bar(layer.feature_count(), progress);

    for feature in layer.features() {
        pb.inc(1);
        let Some(fid) = feature.fid() else {
            warn!("skipping a feature without a valid id");
            continue;
        };
        let Some(gdal_geom) = feature.geometry() else {
            warn!("feature {fid} has no geometry, skipping");
            continue;
        };
        let raw = match gdal_geom.to_geo() {
            Ok(geom) => geom,
            Err(e) => {
                warn!("feature {fid}: failed to read geometry: {e}");
                continue;
            }
        };
        let Some(polygonal) = geom::to_polygonal(raw) else {
            warn!("feature {fid} is not polygonal, skipping");
            continue;
        };

        let kind = if pending.remove(&fid) {
            NodeKind::Victim
        } else {
            NodeKind::Keep
        };
        let fields = feature.fields().collect();
        arena.push(FeatureNode::new(fid, kind, fields, polygonal));
    }
    pb.finish_and_clear();

    let mut missing: Vec<Fid> = pending.into_iter().collect();
    missing.sort_unstable();
    for fid in missing {
        warn!("feature {fid} was selected but is not present in the source layer");
    }

    info!(
        "loaded {} features from '{layer_name}' ({} victims, {} kept)",
        arena.len(),
        arena.victims.len(),
        arena.keep.len()
    );
    debug!("building spatial index over {} features", arena.len());
    let index = SpatialIndex::bulk_load(&arena);
    Ok((arena, index))
}
