//! Polygon elimination for OGR vector layers.
//!
//! Removes a selected set of "victim" polygons from a layer by merging each
//! one into a chosen touching neighbor. Victim attributes are discarded;
//! victim geometry is absorbed into the surviving feature. The usual client
//! is sliver cleanup after overlay or generalization.
//!
//! The pipeline runs in five stages: select victims ([`selector`]), load the
//! layer into an in-memory arena with a spatial index ([`load`]), pick one
//! touching neighbor per victim ([`resolver`]), collapse victim-to-victim
//! chains onto survivors ([`collapse`]), and write the unioned result
//! ([`emit`]). [`eliminate`] wires the stages together.

pub mod collapse;
pub mod emit;
pub mod error;
pub mod geom;
pub mod index;
pub mod load;
pub mod node;
pub mod resolver;
pub mod selector;

use gdal::Dataset;
use gdal::vector::{Layer, LayerAccess};
use log::info;

pub use emit::RunSummary;
pub use error::{EliminateError, Result};
pub use resolver::MergePolicy;

/// How the victims of a run are chosen.
pub enum VictimSpec {
    /// An attribute filter in the source layer's dialect; every matching
    /// feature becomes a victim.
    Where(String),
    /// Feature ids as decimal strings, e.g. straight off a command line.
    Fids(Vec<String>),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EliminateOptions {
    pub policy: MergePolicy,
    /// Show a progress bar while loading. Off by default for library use.
    pub progress: bool,
}

fn resolve_source_layer<'a>(dataset: &'a Dataset, name: Option<&str>) -> Result<Layer<'a>> {
    match name {
        Some(name) => Ok(dataset.layer_by_name(name)?),
        None => {
            let count = dataset.layer_count();
            if count != 1 {
                return Err(EliminateError::AmbiguousLayer(count));
            }
            Ok(dataset.layer(0)?)
        }
    }
}

/// Run the whole elimination pipeline from `src` into `dst`.
///
/// `src_layer` is required when the source dataset has more than one layer;
/// `dst_layer` defaults to the source layer's name. Per-feature problems
/// (missing geometry, no touching neighbor, an unresolvable victim cycle, a
/// failed write) are logged and do not fail the run.
pub fn eliminate(
    src: &Dataset,
    src_layer: Option<&str>,
    dst: &mut Dataset,
    dst_layer: Option<&str>,
    victims: &VictimSpec,
    options: &EliminateOptions,
) -> Result<RunSummary> {
    let mut source = resolve_source_layer(src, src_layer)?;
    let driver_name = src.driver().short_name();

    let victim_fids = match victims {
        VictimSpec::Where(predicate) if !predicate.trim().is_empty() => {
            selector::select_by_filter(&mut source, predicate, &driver_name)?
        }
        VictimSpec::Fids(raw) if !raw.is_empty() => selector::parse_fid_list(raw),
        _ => return Err(EliminateError::NoVictimsSpecified),
    };
    info!("{} victim features selected", victim_fids.len());

    let (arena, index) = load::load(&mut source, &victim_fids, options.progress)?;
    let assignments = resolver::resolve(&arena, &index, options.policy);
    let groups = collapse::collapse(&arena, &assignments);

    let source_name = source.name();
    let out_name = dst_layer.unwrap_or(&source_name);
    let out_layer = emit::prepare_destination(dst, out_name, &source)?;
    let summary = emit::emit(&arena, &groups, &out_layer);

    info!(
        "wrote {} features to '{out_name}' ({} victims absorbed, {} dropped)",
        summary.emitted, summary.absorbed, summary.dropped
    );
    Ok(summary)
}
