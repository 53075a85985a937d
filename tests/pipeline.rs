//! End-to-end runs through in-memory OGR datasets.

use gdal::vector::{Feature, FieldValue, Geometry, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType};
use gdal::{Dataset, DriverManager};
use geo::Area;

use eliminate::{EliminateError, EliminateOptions, MergePolicy, VictimSpec, eliminate};

fn memory_dataset(name: &str) -> Dataset {
    let driver = DriverManager::get_driver_by_name("Memory")
        .or_else(|_| DriverManager::get_driver_by_name("MEM"))
        .expect("in-memory vector driver");
    driver.create_vector_only(name).expect("create dataset")
}

/// Build a single-layer dataset of named polygons. FIDs are assigned in
/// insertion order starting at 0.
fn polygon_dataset(name: &str, cells: &[(&str, &str)]) -> Dataset {
    let mut ds = memory_dataset(name);
    {
        let layer = ds
            .create_layer(LayerOptions {
                name: "cells",
                ty: OGRwkbGeometryType::wkbPolygon,
                ..Default::default()
            })
            .expect("create layer");
        let name_field =
            gdal::vector::FieldDefn::new("name", OGRFieldType::OFTString).expect("field defn");
        name_field.add_to_layer(&layer).expect("add field");

        for (cell_name, wkt) in cells {
            let mut feature = Feature::new(layer.defn()).expect("new feature");
            feature
                .set_geometry(Geometry::from_wkt(wkt).expect("parse wkt"))
                .expect("set geometry");
            let name_idx = feature.field_index("name").expect("field index");
            feature
                .set_field(name_idx, &FieldValue::StringValue(cell_name.to_string()))
                .expect("set field");
            feature.create(&layer).expect("create feature");
        }
    }
    ds
}

fn output_rows(ds: &Dataset) -> Vec<(Option<String>, f64)> {
    let mut layer = ds.layer(0).expect("output layer");
    let mut rows = Vec::new();
    for feature in layer.features() {
        let name = feature
            .field_index("name")
            .ok()
            .and_then(|idx| feature.field(idx).ok())
            .flatten()
            .and_then(|value| value.into_string());
        let area = feature
            .geometry()
            .and_then(|geom| geom.to_geo().ok())
            .map(|geom| match geom {
                geo_types::Geometry::Polygon(p) => p.unsigned_area(),
                geo_types::Geometry::MultiPolygon(mp) => mp.unsigned_area(),
                _ => 0.0,
            })
            .unwrap_or(0.0);
        rows.push((name, area));
    }
    rows
}

fn run(
    src: &Dataset,
    victims: VictimSpec,
    policy: MergePolicy,
) -> (Dataset, eliminate::RunSummary) {
    let mut dst = memory_dataset("out");
    let summary = eliminate(
        src,
        None,
        &mut dst,
        None,
        &victims,
        &EliminateOptions { policy, progress: false },
    )
    .expect("eliminate");
    (dst, summary)
}

const UNIT_1: &str = "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))";
const UNIT_2: &str = "POLYGON ((1 0, 2 0, 2 1, 1 1, 1 0))";
const UNIT_3: &str = "POLYGON ((2 0, 3 0, 3 1, 2 1, 2 0))";

#[test]
fn three_in_a_row_strip_merges_left_on_tie() {
    let src = polygon_dataset("strip", &[("p1", UNIT_1), ("p2", UNIT_2), ("p3", UNIT_3)]);
    let (dst, summary) = run(
        &src,
        VictimSpec::Fids(vec!["1".into()]),
        MergePolicy::LargestArea,
    );

    assert_eq!(summary.emitted, 2);
    assert_eq!(summary.absorbed, 1);
    assert_eq!(summary.dropped, 0);

    let rows = output_rows(&dst);
    assert_eq!(rows.len(), 2);
    // Equal-area neighbors tie-break to the earlier feature: p1 absorbs p2.
    let p1 = rows.iter().find(|(n, _)| n.as_deref() == Some("p1")).unwrap();
    let p3 = rows.iter().find(|(n, _)| n.as_deref() == Some("p3")).unwrap();
    assert!((p1.1 - 2.0).abs() < 1e-9, "p1 area {}", p1.1);
    assert!((p3.1 - 1.0).abs() < 1e-9, "p3 area {}", p3.1);
    // No row carries the victim's attributes.
    assert!(rows.iter().all(|(n, _)| n.as_deref() != Some("p2")));
}

#[test]
fn victim_chain_collapses_onto_the_larger_survivor() {
    // keep | victim | victim | keep, with the right keep twice as large.
    let src = polygon_dataset(
        "chain",
        &[
            ("p1", UNIT_1),
            ("p2", UNIT_2),
            ("p3", UNIT_3),
            ("p4", "POLYGON ((3 0, 5 0, 5 1, 3 1, 3 0))"),
        ],
    );
    let (dst, summary) = run(
        &src,
        VictimSpec::Fids(vec!["1".into(), "2".into()]),
        MergePolicy::LargestArea,
    );

    assert_eq!(summary.emitted, 2);
    assert_eq!(summary.absorbed, 2);

    let rows = output_rows(&dst);
    // p2 ties between p1 and p3 (area 1 each) and falls to p1; p3 prefers
    // the larger p4. Both survivors grow by one victim.
    let p1 = rows.iter().find(|(n, _)| n.as_deref() == Some("p1")).unwrap();
    let p4 = rows.iter().find(|(n, _)| n.as_deref() == Some("p4")).unwrap();
    assert!((p1.1 - 2.0).abs() < 1e-9, "p1 area {}", p1.1);
    assert!((p4.1 - 3.0).abs() < 1e-9, "p4 area {}", p4.1);
    let total: f64 = rows.iter().map(|(_, a)| a).sum();
    assert!((total - 5.0).abs() < 1e-9, "area must be conserved, got {total}");
}

#[test]
fn isolated_victim_is_dropped_and_run_succeeds() {
    let src = polygon_dataset(
        "island",
        &[
            ("p1", UNIT_1),
            ("far", "POLYGON ((10 10, 11 10, 11 11, 10 11, 10 10))"),
        ],
    );
    let (dst, summary) = run(
        &src,
        VictimSpec::Fids(vec!["1".into()]),
        MergePolicy::LargestArea,
    );

    assert_eq!(summary.emitted, 1);
    assert_eq!(summary.absorbed, 0);
    assert_eq!(summary.dropped, 1);

    let rows = output_rows(&dst);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0.as_deref(), Some("p1"));
}

#[test]
fn unknown_fid_is_ignored_with_success() {
    let src = polygon_dataset("unknown", &[("p1", UNIT_1), ("p2", UNIT_2)]);
    let (dst, summary) = run(
        &src,
        VictimSpec::Fids(vec!["1".into(), "9999".into()]),
        MergePolicy::LargestArea,
    );

    assert_eq!(summary.emitted, 1);
    assert_eq!(summary.absorbed, 1);
    let rows = output_rows(&dst);
    assert_eq!(rows.len(), 1);
    assert!((rows[0].1 - 2.0).abs() < 1e-9);
}

#[test]
fn where_filter_selects_small_polygons() {
    let src = polygon_dataset(
        "filtered",
        &[
            ("big", "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))"),
            ("sliver", "POLYGON ((10 0, 10.1 0, 10.1 1, 10 1, 10 0))"),
        ],
    );
    let (dst, summary) = run(
        &src,
        VictimSpec::Where("OGR_GEOM_AREA < 0.5".into()),
        MergePolicy::LargestArea,
    );

    assert_eq!(summary.emitted, 1);
    assert_eq!(summary.absorbed, 1);
    let rows = output_rows(&dst);
    assert_eq!(rows[0].0.as_deref(), Some("big"));
    assert!((rows[0].1 - 100.1).abs() < 1e-6);

    // Re-running the same filter on the output selects no victims, so the
    // second pass is a plain copy.
    let (again, summary) = run(
        &dst,
        VictimSpec::Where("OGR_GEOM_AREA < 0.5".into()),
        MergePolicy::LargestArea,
    );
    assert_eq!(summary.emitted, 1);
    assert_eq!(summary.absorbed, 0);
    let rows = output_rows(&again);
    assert_eq!(rows[0].0.as_deref(), Some("big"));
    assert!((rows[0].1 - 100.1).abs() < 1e-6);
}

#[test]
fn attributes_survive_verbatim_for_untouched_features() {
    let src = polygon_dataset("plain", &[("p1", UNIT_1), ("p2", UNIT_2)]);
    let (dst, _) = run(
        &src,
        VictimSpec::Fids(vec!["0".into()]),
        MergePolicy::LargestArea,
    );

    let rows = output_rows(&dst);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0.as_deref(), Some("p2"));
}

#[test]
fn source_srs_is_copied_onto_output_geometries() {
    let srs = gdal::spatial_ref::SpatialRef::from_epsg(32633).expect("srs");
    let mut src = memory_dataset("georef");
    {
        let layer = src
            .create_layer(LayerOptions {
                name: "cells",
                srs: Some(&srs),
                ty: OGRwkbGeometryType::wkbPolygon,
                ..Default::default()
            })
            .expect("create layer");
        for wkt in [UNIT_1, UNIT_2] {
            let mut feature = Feature::new(layer.defn()).expect("new feature");
            feature
                .set_geometry(Geometry::from_wkt(wkt).expect("parse wkt"))
                .expect("set geometry");
            feature.create(&layer).expect("create feature");
        }
    }

    let (dst, summary) = run(
        &src,
        VictimSpec::Fids(vec!["1".into()]),
        MergePolicy::LargestArea,
    );
    assert_eq!(summary.emitted, 1);

    let mut layer = dst.layer(0).expect("output layer");
    let layer_srs = layer.spatial_ref().expect("output layer srs");
    assert_eq!(layer_srs.auth_code().expect("auth code"), 32633);
    for feature in layer.features() {
        let geom_srs = feature
            .geometry()
            .expect("output geometry")
            .spatial_ref()
            .expect("geometry srs");
        assert_eq!(geom_srs.auth_code().expect("auth code"), 32633);
    }
}

#[test]
fn empty_victim_spec_is_a_config_error() {
    let src = polygon_dataset("none", &[("p1", UNIT_1)]);
    let mut dst = memory_dataset("out");
    let err = eliminate(
        &src,
        None,
        &mut dst,
        None,
        &VictimSpec::Fids(Vec::new()),
        &EliminateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EliminateError::NoVictimsSpecified));
}

#[test]
fn bad_filter_is_rejected() {
    let src = polygon_dataset("badfilter", &[("p1", UNIT_1)]);
    let mut dst = memory_dataset("out");
    let err = eliminate(
        &src,
        None,
        &mut dst,
        None,
        &VictimSpec::Where("no such syntax ===".into()),
        &EliminateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EliminateError::InvalidFilter(_)));
}
