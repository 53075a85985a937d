use gdal::Dataset;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    Feature, FieldDefn, Geometry as GdalGeometry, Layer, LayerAccess, LayerOptions,
    OGRwkbGeometryType,
};
use geo::unary_union;
use geo_types::MultiPolygon;
use log::{debug, info, warn};
use wkt::ToWkt;

use crate::collapse::MergeGroups;
use crate::error::{EliminateError, Result};
use crate::node::{FeatureNode, NodeArena};

/// Counts for one completed run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    /// Output features written.
    pub emitted: usize,
    /// Victims merged into an emitted feature.
    pub absorbed: usize,
    /// Victims that ended up in no emitted feature.
    pub dropped: usize,
}

/// Create the destination layer: source SRS verbatim, declared geometry type
/// polygon, attribute field definitions cloned in source order.
pub fn prepare_destination<'a>(
    dst: &'a mut Dataset,
    name: &str,
    src_layer: &Layer,
) -> Result<Layer<'a>> {
    let srs = src_layer.spatial_ref();
    let out_layer = dst
        .create_layer(LayerOptions {
            name,
            srs: srs.as_ref(),
            ty: OGRwkbGeometryType::wkbPolygon,
            ..Default::default()
        })
        .map_err(|source| EliminateError::CreateLayerFailed {
            name: name.to_string(),
            source,
        })?;

    for field in src_layer.defn().fields() {
        let field_name = field.name();
        let defn = FieldDefn::new(&field_name, field.field_type()).map_err(|source| {
            EliminateError::CreateFieldFailed {
                name: field_name.clone(),
                source,
            }
        })?;
        defn.add_to_layer(&out_layer)
            .map_err(|source| EliminateError::CreateFieldFailed {
                name: field_name,
                source,
            })?;
    }

    Ok(out_layer)
}

fn to_gdal_geometry(
    mp: &MultiPolygon<f64>,
    srs: Option<&SpatialRef>,
) -> gdal::errors::Result<GdalGeometry> {
    // Single-part results go out as plain polygons to match the layer's
    // declared geometry type.
    let wkt = if mp.0.len() == 1 {
        mp.0[0].wkt_string()
    } else {
        mp.wkt_string()
    };
    let mut geom = GdalGeometry::from_wkt(&wkt)?;
    if let Some(srs) = srs {
        geom.set_spatial_ref(srs.clone());
    }
    Ok(geom)
}

fn write_feature(
    out_layer: &Layer,
    node: &FeatureNode,
    geom: &MultiPolygon<f64>,
    srs: Option<&SpatialRef>,
) -> gdal::errors::Result<()> {
    let geom = to_gdal_geometry(geom, srs)?;
    let mut feature = Feature::new(out_layer.defn())?;
    feature.set_geometry(geom)?;
    for (name, value) in &node.fields {
        if let Some(value) = value {
            let idx = feature.field_index(name)?;
            feature.set_field(idx, value)?;
        }
    }
    feature.create(out_layer)?;
    Ok(())
}

/// Emit one feature per survivor, in loader order, carrying the survivor's
/// attributes. Survivors with absorbed victims get the unary union of the
/// whole merge group; a per-feature failure is logged and skipped without
/// aborting the run.
pub fn emit(arena: &NodeArena, groups: &MergeGroups, out_layer: &Layer) -> RunSummary {
    let srs = out_layer.spatial_ref();
    let mut summary = RunSummary::default();

    for &s in &arena.keep {
        let node = &arena.nodes[s];
        let victims = &groups.absorbed[s];

        let merged: MultiPolygon<f64>;
        let geom: &MultiPolygon<f64> = if victims.is_empty() {
            &node.geom
        } else {
            let mut parts: Vec<&MultiPolygon<f64>> = Vec::with_capacity(victims.len() + 1);
            parts.push(&node.geom);
            parts.extend(victims.iter().map(|&v| &arena.nodes[v].geom));
            merged = unary_union(parts);
            debug!(
                "feature {}: unioned {} absorbed victims",
                node.fid,
                victims.len()
            );
            &merged
        };

        match write_feature(out_layer, node, geom, srs.as_ref()) {
            Ok(()) => {
                summary.emitted += 1;
                summary.absorbed += victims.len();
            }
            Err(e) => warn!("failed to write feature {}: {e}", node.fid),
        }
    }

    summary.dropped = arena.victims.len() - summary.absorbed;
    if summary.dropped > 0 {
        info!("{} victims had no surviving neighbor and were dropped", summary.dropped);
    }
    summary
}
