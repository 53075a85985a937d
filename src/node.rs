use std::cell::OnceCell;

use gdal::vector::FieldValue;
use geo::Area;
use geo_types::MultiPolygon;

/// Feature identifier as assigned by the source layer. Zero is valid.
pub type Fid = u64;

/// Whether a feature survives the run or is merged away. Fixed at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Keep,
    Victim,
}

/// One source feature held in memory for the duration of a run: its stable
/// FID, an attribute snapshot in source field order, and its geometry coerced
/// to polygonal form.
pub struct FeatureNode {
    pub fid: Fid,
    pub kind: NodeKind,
    pub fields: Vec<(String, Option<FieldValue>)>,
    pub geom: MultiPolygon<f64>,
    area: OnceCell<f64>,
}

impl FeatureNode {
    pub fn new(
        fid: Fid,
        kind: NodeKind,
        fields: Vec<(String, Option<FieldValue>)>,
        geom: MultiPolygon<f64>,
    ) -> Self {
        Self {
            fid,
            kind,
            fields,
            geom,
            area: OnceCell::new(),
        }
    }

    /// Polygon area in CRS units, computed on first use. A degenerate
    /// geometry yields 0.
    pub fn area(&self) -> f64 {
        *self.area.get_or_init(|| {
            let area = self.geom.unsigned_area();
            if area.is_finite() { area } else { 0.0 }
        })
    }
}

/// All nodes of one run in loader order, with the keep/victim partition.
/// The spatial index and the merge graph refer to entries by index into
/// `nodes`, so the arena must stay append-only once loading finishes.
#[derive(Default)]
pub struct NodeArena {
    pub nodes: Vec<FeatureNode>,
    pub keep: Vec<usize>,
    pub victims: Vec<usize>,
}

impl NodeArena {
    pub fn push(&mut self, node: FeatureNode) -> usize {
        let idx = self.nodes.len();
        match node.kind {
            NodeKind::Keep => self.keep.push(idx),
            NodeKind::Victim => self.victims.push(idx),
        }
        self.nodes.push(node);
        idx
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
