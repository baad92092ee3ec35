//! Unit tests for the monitoring library
//!
//! These tests exercise the field model, CF time handling, selection and
//! aggregation, axis repair, weight derivation and the reductions on small
//! in-memory fields.

use monitor_index::assemble::IndexCollection;
use monitor_index::axes::{repair_horizontal_axes, repair_sea_ice_axes, repair_time_axis};
use monitor_index::config::{MonitorSettings, RunContext, StreamPatterns};
use monitor_index::errors::{ErrorKind, MonitorError, Stage, StageContext};
use monitor_index::field::{
    AuxiliaryCoordinate, AxisKind, CellMeasure, DimensionCoordinate, DomainAxis, Field,
    MeasureKind, Properties,
};
use monitor_index::ingest::{
    aggregate, aggregate_one, monthly_mean, select, select_by_properties, stash_short_code,
    Aggregation, FragmentSet, IdentityMatch, VariableSelector,
};
use monitor_index::notify::{
    error_report, notify_best_effort, CommandNotifier, LogNotifier, Notifier,
};
use monitor_index::parallel::ParallelConfig;
use monitor_index::pipeline::atm::{atmosphere_from, FallbackStreams};
use monitor_index::pipeline::ice::sea_ice_area;
use monitor_index::pipeline::ocean::{amoc_index, volume_means};
use monitor_index::reduce::{
    area_mean, collapse, sea_ice_area_integrals, soil_moisture_total, toa_net_flux, volume_mean,
    AxisReduction, CollapseMethod, Hemisphere,
};
use monitor_index::section::{extract_amoc_45n, LatitudeLineTable};
use monitor_index::time::{Calendar, CfDate, TimeUnits};
use monitor_index::weights::{
    attach_volume, resolve_area, squeeze_measure, volume_measure, AreaSource,
};
use ndarray::{Array1, ArrayD, IxDyn};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
}

fn time_axis(ncdim: &str, values: &[f64], units: &str) -> DomainAxis {
    DomainAxis::new(ncdim, values.len()).with_coordinate(
        DimensionCoordinate::new(Array1::from(values.to_vec()))
            .with_property("standard_name", "time")
            .with_property("axis", "T")
            .with_property("units", units),
    )
}

fn latitude_axis(values: &[f64]) -> DomainAxis {
    DomainAxis::new("latitude", values.len()).with_coordinate(
        DimensionCoordinate::new(Array1::from(values.to_vec()))
            .with_property("standard_name", "latitude")
            .with_property("units", "degrees_north"),
    )
}

fn longitude_axis(values: &[f64]) -> DomainAxis {
    DomainAxis::new("longitude", values.len()).with_coordinate(
        DimensionCoordinate::new(Array1::from(values.to_vec()))
            .with_property("standard_name", "longitude")
            .with_property("units", "degrees_east"),
    )
}

/// Two-site series whose values are the time values (and time + 0.5)
fn fragment(ncvar: &str, times: &[f64], units: &str) -> Field {
    let values: Vec<f64> = times.iter().flat_map(|&t| [t, t + 0.5]).collect();
    let data = ArrayD::from_shape_vec(IxDyn(&[times.len(), 2]), values).unwrap();
    Field::new(
        ncvar,
        data,
        vec![time_axis("time", times, units), DomainAxis::new("site", 2)],
    )
    .unwrap()
    .with_property("standard_name", "air_temperature")
    .with_property("units", "K")
}

fn time_values(field: &Field) -> Vec<f64> {
    field.time_coordinate().unwrap().values.to_vec()
}

// ---------------------------------------------------------------------------
// Errors and reporting
// ---------------------------------------------------------------------------

#[test]
fn test_exit_codes_follow_error_kind() {
    assert_eq!(MonitorError::missing("ocean grid_T data").exit_code(), 99);
    let ambiguous = MonitorError::AmbiguousAggregation {
        variable: "m01s03i236".to_string(),
        groups: 2,
    };
    assert_eq!(ambiguous.exit_code(), 98);
    assert_eq!(MonitorError::axis("aice", "can't find T axis").exit_code(), 97);
    assert_eq!(MonitorError::weight("thetao", "no area").exit_code(), 96);
    assert_eq!(MonitorError::UnknownResolution { ysize: 100 }.exit_code(), 95);
    assert_eq!(
        MonitorError::MissingContext("CYLC_VERSION is not set".to_string()).exit_code(),
        2
    );
    assert_eq!(MonitorError::Reduction("bad axis".to_string()).exit_code(), 1);
}

#[test]
fn test_stage_keeps_innermost_annotation() {
    let err = MonitorError::weight("sea_water_salinity", "no area measure")
        .at(Stage::DeriveWeights)
        .at(Stage::Reduce);
    assert_eq!(err.stage(), Some(Stage::DeriveWeights));
    assert_eq!(err.kind(), ErrorKind::WeightResolution);
    assert_eq!(err.exit_code(), 96);

    let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "read-only",
    ));
    let staged = io.stage(Stage::Assemble).unwrap_err();
    assert_eq!(staged.stage(), Some(Stage::Assemble));
    assert_eq!(staged.kind(), ErrorKind::Other);
}

#[test]
fn test_error_report_includes_context_and_cause() {
    let patterns = StreamPatterns {
        atmosphere: "a.pm".to_string(),
        sea_ice: "i.1m".to_string(),
        ocean: "o_1m_".to_string(),
        ocean_t_grid: "grid_T".to_string(),
        ocean_diaptr: "diaptr".to_string(),
    };
    let ctx = RunContext::new(
        "u-cn134",
        "19880101T0000Z",
        "/data/u-cn134/19880101T0000Z",
        patterns,
        MonitorSettings::default(),
    );
    let err = MonitorError::UnknownResolution { ysize: 100 }.at(Stage::Reduce);

    let report = error_report(&err, Some(&ctx));
    assert!(report.contains("cn134 19880101T0000Z"));
    assert!(report.contains("/data/u-cn134/19880101T0000Z"));
    assert!(report.contains("Stage: reduce"));
    assert!(report.contains("caused by: Unrecognised model resolution"));

    let bare = error_report(&MonitorError::missing("atmosphere data"), None);
    assert!(bare.contains("run context unavailable"));
    assert!(!bare.contains("Stage:"));
}

#[test]
fn test_notifiers() {
    assert!(LogNotifier.notify("report").is_ok());

    let missing = CommandNotifier::new("/nonexistent/notify-command", Vec::new());
    let err = missing.notify("report").unwrap_err();
    assert!(matches!(err, MonitorError::Notification(_)));

    // Delivery failures are swallowed
    notify_best_effort(&missing, "report");

    let cat = CommandNotifier::new("cat", Vec::new());
    assert!(cat.notify("report").is_ok());
}

#[test]
fn test_notifier_reports_unread_payload() {
    // More than a pipe buffer, to a command that never reads its input
    let report = "x".repeat(1 << 20);
    let deaf = CommandNotifier::new("true", Vec::new());
    let err = deaf.notify(&report).unwrap_err();
    assert!(matches!(err, MonitorError::Notification(_)));
    assert!(err.to_string().contains("cannot write to 'true'"));

    // The notifier stays usable after a failed delivery
    let cat = CommandNotifier::new("cat", Vec::new());
    assert!(cat.notify(&report).is_ok());
}

#[test]
fn test_default_thread_pool_setup() {
    assert!(ParallelConfig::new(None).setup_global_pool().is_ok());
    assert_eq!(ParallelConfig::default().num_threads, None);
}

// ---------------------------------------------------------------------------
// Field model
// ---------------------------------------------------------------------------

#[test]
fn test_field_rejects_mismatched_axes() {
    let data = ArrayD::zeros(IxDyn(&[2, 3]));
    let err = Field::new("tas", data, vec![DomainAxis::new("y", 3), DomainAxis::new("x", 2)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AxisResolution);
}

#[test]
fn test_identity_and_short_code() {
    let data = ArrayD::zeros(IxDyn(&[1]));
    let field = Field::new("m01s03i236_2", data, vec![DomainAxis::new("t", 1)]).unwrap();
    assert_eq!(field.identity(), "ncvar%m01s03i236_2");
    assert_eq!(field.short_code(), "m01s03i236");

    let field = field.with_property("long_name", "TEMPERATURE AT 1.5M");
    assert_eq!(field.identity(), "TEMPERATURE AT 1.5M");
    let field = field.with_property("standard_name", "air_temperature");
    assert_eq!(field.identity(), "air_temperature");

    let plain = Field::new("thkcello", ArrayD::zeros(IxDyn(&[1])), vec![DomainAxis::new("t", 1)])
        .unwrap();
    assert_eq!(plain.short_code(), "thkcello");
    let odd = Field::new("_12", ArrayD::zeros(IxDyn(&[1])), vec![DomainAxis::new("t", 1)]).unwrap();
    assert_eq!(odd.short_code(), "_12");
}

#[test]
fn test_set_measure_checks_axes_and_replaces() {
    let data = ArrayD::zeros(IxDyn(&[2, 3]));
    let axes = vec![DomainAxis::new("nj", 2), DomainAxis::new("ni", 3)];
    let mut field = Field::new("aice", data, axes).unwrap();

    let foreign = CellMeasure::new(
        MeasureKind::Area,
        vec!["y".to_string()],
        ArrayD::ones(IxDyn(&[2])),
    );
    let err = field.set_measure(foreign).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WeightResolution);

    let misshaped = CellMeasure::new(
        MeasureKind::Area,
        vec!["nj".to_string(), "ni".to_string()],
        ArrayD::ones(IxDyn(&[3, 2])),
    );
    assert!(field.set_measure(misshaped).is_err());

    let names = vec!["nj".to_string(), "ni".to_string()];
    field
        .set_measure(CellMeasure::new(
            MeasureKind::Area,
            names.clone(),
            ArrayD::ones(IxDyn(&[2, 3])),
        ))
        .unwrap();
    field
        .set_measure(
            CellMeasure::new(MeasureKind::Area, names, ArrayD::from_elem(IxDyn(&[2, 3]), 4.0))
                .with_units("m2"),
        )
        .unwrap();

    // One area measure, the latest
    assert_eq!(field.measures_of(MeasureKind::Area).count(), 1);
    assert!(field.measure(MeasureKind::Area).unwrap().is_square_metres());
}

#[test]
fn test_squeeze_axis_updates_constructs() {
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![1.0, 2.0]).unwrap();
    let mut field = Field::new("area", data, vec![DomainAxis::new("t", 1), DomainAxis::new("x", 2)])
        .unwrap()
        .with_aux(AuxiliaryCoordinate::new(
            "lon",
            vec!["t".to_string(), "x".to_string()],
            ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.0, 180.0]).unwrap(),
        ));

    field.squeeze_axis(0).unwrap();
    assert_eq!(field.shape(), &[2]);
    assert_eq!(field.aux("lon").unwrap().axes, vec!["x".to_string()]);
    assert_eq!(field.aux("lon").unwrap().values.shape(), &[2]);

    // Only degenerate axes can be squeezed
    assert!(field.squeeze_axis(0).is_err());
}

#[test]
fn test_properties_match_numbers_and_text() {
    let mut properties = Properties::new();
    properties.set("lbproc", 128.0);
    properties.set("interval_write", "1 month");

    assert!(properties.matches("lbproc", "128"));
    assert!(!properties.matches("lbproc", "122"));
    assert!(properties.matches("interval_write", "1 month"));
    assert!(!properties.matches("lbtim", "122"));

    properties.push_cell_method("time: mean");
    properties.push_cell_method("area: mean");
    assert_eq!(properties.text("cell_methods"), Some("time: mean area: mean"));
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

#[test]
fn test_time_units_rebase_standard_calendar() {
    let january = TimeUnits::parse("days since 1988-01-01", None).unwrap();
    let february = TimeUnits::parse("days since 1988-02-01 00:00:00", Some("gregorian")).unwrap();

    assert!(close(february.rebase(0.0, &january).unwrap(), 31.0));
    assert!(close(january.rebase(31.5, &february).unwrap(), 0.5));

    let hours = TimeUnits::parse("hours since 1988-01-01", None).unwrap();
    assert!(close(hours.rebase(36.0, &january).unwrap(), 1.5));
}

#[test]
fn test_time_units_360_day_calendar() {
    let units = TimeUnits::parse("days since 1988-01-01", Some("360_day")).unwrap();
    assert_eq!(units.calendar, Calendar::Day360);
    assert_eq!(units.year_month(15.0).unwrap(), (1988, 1));
    assert_eq!(units.year_month(45.0).unwrap(), (1988, 2));
    assert_eq!(units.year_month(359.5).unwrap(), (1988, 12));
    assert_eq!(units.year_month(360.0).unwrap(), (1989, 1));

    let date = CfDate::from_days(units.absolute_days(45.0).unwrap(), Calendar::Day360).unwrap();
    assert_eq!((date.month, date.day), (2, 16));
}

#[test]
fn test_time_units_errors() {
    assert!(TimeUnits::parse("metres", None).is_err());
    assert!(TimeUnits::parse("fortnights since 1988-01-01", None).is_err());
    assert!(TimeUnits::parse("days since 1988-01-01", Some("julian_lunar")).is_err());
    assert!(TimeUnits::parse("days since 1988-13-01", None).is_err());
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[test]
fn test_stash_short_codes() {
    assert_eq!(stash_short_code(1201), "m01s01i201");
    assert_eq!(stash_short_code(23), "m01s00i023");
    assert_eq!(stash_short_code(16222), "m01s16i222");
}

#[test]
fn test_stash_selector_tolerates_suffixes() {
    let selector = VariableSelector::stash(3236).unwrap();
    let fields = vec![
        fragment("m01s03i236", &[0.0], "days since 2000-01-01"),
        fragment("m01s03i236_2", &[1.0], "days since 2000-01-01"),
        fragment("m01s03i2361", &[2.0], "days since 2000-01-01"),
        fragment("m01s03i237", &[3.0], "days since 2000-01-01"),
    ];
    let selected = select(&fields, &selector);
    let names: Vec<&str> = selected.iter().map(|f| f.ncvar.as_str()).collect();
    assert_eq!(names, vec!["m01s03i236", "m01s03i236_2"]);

    assert!(VariableSelector::pattern("m01s03i236(").is_err());
}

#[test]
fn test_select_by_properties() {
    let monthly = fragment("m01s03i236", &[0.0], "days since 2000-01-01")
        .with_property("lbtim", 122.0)
        .with_property("lbproc", 128.0);
    let instantaneous = fragment("m01s03i236", &[0.0], "days since 2000-01-01")
        .with_property("lbtim", 122.0)
        .with_property("lbproc", 0.0);

    let selected = select_by_properties(
        &[monthly.clone(), instantaneous],
        &[("lbtim", "122"), ("lbproc", "128")],
    );
    assert_eq!(selected, vec![monthly]);
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[test]
fn test_aggregation_is_order_independent() {
    let units = "days since 2000-01-01";
    let a = fragment("tas", &[0.0, 1.0], units);
    let b = fragment("tas", &[2.0, 3.0], units);
    let c = fragment("tas", &[4.0, 5.0], units);

    let reference = aggregate(&[a.clone(), b.clone(), c.clone()], IdentityMatch::Strict).unwrap();
    assert_eq!(reference.len(), 1);
    assert_eq!(time_values(&reference[0]), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(reference[0].shape(), &[6, 2]);

    for permutation in [
        vec![c.clone(), a.clone(), b.clone()],
        vec![b.clone(), c.clone(), a.clone()],
        vec![c.clone(), b.clone(), a.clone()],
    ] {
        let merged = aggregate(&permutation, IdentityMatch::Strict).unwrap();
        assert_eq!(merged, reference);
    }
}

#[test]
fn test_aggregation_rebases_time_references() {
    let early = fragment("tas", &[0.0, 1.0], "days since 2000-01-01");
    let late = fragment("tas", &[0.0, 1.0], "days since 2000-01-03");

    let merged = aggregate_one(&[late, early], IdentityMatch::Strict)
        .unwrap()
        .into_field("tas")
        .unwrap()
        .unwrap();
    // Expressed in the earliest fragment's units
    assert_eq!(merged.time_coordinate().unwrap().units(), Some("days since 2000-01-01"));
    assert_eq!(time_values(&merged), vec![0.0, 1.0, 2.0, 3.0]);
    // Data follows its time step
    assert_eq!(merged.data[[2, 0]], 0.0);
    assert_eq!(merged.data[[1, 0]], 1.0);
}

#[test]
fn test_aggregation_sorts_interleaved_fragments() {
    let units = "days since 2000-01-01";
    let odd = fragment("tas", &[1.0, 3.0], units);
    let even = fragment("tas", &[0.0, 2.0], units);

    let merged = aggregate(&[odd, even], IdentityMatch::Strict).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(time_values(&merged[0]), vec![0.0, 1.0, 2.0, 3.0]);
    let first_site: Vec<f64> = merged[0]
        .data
        .index_axis(ndarray::Axis(1), 0)
        .iter()
        .copied()
        .collect();
    assert_eq!(first_site, vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_overlapping_fragments_are_ambiguous() {
    let units = "days since 2000-01-01";
    let a = fragment("tas", &[0.0, 1.0], units);
    let b = fragment("tas", &[1.0, 2.0], units);

    let aggregation = aggregate_one(&[a, b], IdentityMatch::Strict).unwrap();
    assert!(matches!(&aggregation, Aggregation::Ambiguous(groups) if groups.len() == 2));
    let err = aggregation.into_field("tas").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousAggregation);
    assert_eq!(err.exit_code(), 98);
}

#[test]
fn test_relaxed_match_with_incompatible_shapes_is_ambiguous() {
    let units = "days since 2000-01-01";
    let two_sites = fragment("m01s03i236", &[0.0], units);
    let three_sites = Field::new(
        "m01s03i236_2",
        ArrayD::zeros(IxDyn(&[1, 3])),
        vec![time_axis("time", &[1.0], units), DomainAxis::new("site", 3)],
    )
    .unwrap()
    .with_property("units", "K");

    let aggregation = aggregate_one(&[two_sites, three_sites], IdentityMatch::Relaxed).unwrap();
    match aggregation.into_field("m01s03i236") {
        Err(MonitorError::AmbiguousAggregation { variable, groups }) => {
            assert_eq!(variable, "m01s03i236");
            assert_eq!(groups, 2);
        }
        other => panic!("expected ambiguous aggregation, got {other:?}"),
    }
}

#[test]
fn test_relaxed_match_ignores_naming_metadata() {
    let units = "days since 2000-01-01";
    let a = fragment("m01s03i236", &[0.0, 1.0], units)
        .with_property("long_name", "TEMPERATURE AT 1.5M");
    let b = fragment("m01s03i236_1", &[2.0, 3.0], units)
        .with_property("long_name", "air temperature");

    // Different declared names do not merge strictly
    let mut b_strict = b.clone();
    b_strict.properties.remove("standard_name");
    let mut a_strict = a.clone();
    a_strict.properties.remove("standard_name");
    assert_eq!(aggregate(&[a_strict, b_strict], IdentityMatch::Strict).unwrap().len(), 2);

    let merged = aggregate(&[a, b], IdentityMatch::Relaxed).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].shape(), &[4, 2]);
    // Only properties shared by every fragment survive
    assert_eq!(merged[0].long_name(), None);
    assert_eq!(merged[0].units(), Some("K"));
}

#[test]
fn test_static_fragments_collapse_and_absent_is_reported() {
    let area = Field::new("area", ArrayD::from_elem(IxDyn(&[2, 2]), 100.0), vec![
        DomainAxis::new("y", 2),
        DomainAxis::new("x", 2),
    ])
    .unwrap()
    .with_property("standard_name", "cell_area");
    let copy = area.clone().with_property("source_file", "b.nc");
    let first = area.with_property("source_file", "a.nc");

    let merged = aggregate(&[first, copy], IdentityMatch::Strict).unwrap();
    assert_eq!(merged.len(), 1);
    assert!(!merged[0].properties.contains("source_file"));

    let absent = aggregate_one(&[], IdentityMatch::Relaxed).unwrap();
    assert!(absent.is_absent());
    assert_eq!(absent.into_field("thkcello").unwrap(), None);
}

// ---------------------------------------------------------------------------
// Axis repair
// ---------------------------------------------------------------------------

fn nemo_field() -> Field {
    let data = ArrayD::from_elem(IxDyn(&[2, 2, 3]), 1.0);
    let counter = DomainAxis::new("time_counter", 2).with_coordinate(
        DimensionCoordinate::new(Array1::from(vec![0.0, 1.0]))
            .with_property("axis", "T")
            .with_property("units", "seconds since 1900-01-01"),
    );
    Field::new(
        "thetao",
        data,
        vec![counter, DomainAxis::new("y", 2), DomainAxis::new("x", 3)],
    )
    .unwrap()
    .with_property("standard_name", "sea_water_potential_temperature")
    .with_aux(
        AuxiliaryCoordinate::new(
            "time_centered",
            vec!["time_counter".to_string()],
            ArrayD::from_shape_vec(IxDyn(&[2]), vec![43_200.0, 129_600.0]).unwrap(),
        )
        .with_property("standard_name", "time")
        .with_property("units", "seconds since 1900-01-01"),
    )
    .with_aux(
        AuxiliaryCoordinate::new(
            "nav_lat",
            vec!["y".to_string(), "x".to_string()],
            ArrayD::zeros(IxDyn(&[2, 3])),
        )
        .with_property("standard_name", "latitude"),
    )
    .with_aux(
        AuxiliaryCoordinate::new(
            "nav_lon",
            vec!["y".to_string(), "x".to_string()],
            ArrayD::zeros(IxDyn(&[2, 3])),
        )
        .with_property("standard_name", "longitude"),
    )
}

#[test]
fn test_repair_time_axis_is_idempotent() {
    let mut field = nemo_field();
    repair_time_axis(&mut field).unwrap();

    assert_eq!(time_values(&field), vec![43_200.0, 129_600.0]);
    assert!(field.aux("time").is_none());
    assert_eq!(field.axis_position(AxisKind::T), Some(0));

    let once = field.clone();
    repair_time_axis(&mut field).unwrap();
    assert_eq!(field, once);
}

#[test]
fn test_repair_time_axis_needs_declared_axis() {
    let mut field = nemo_field();
    if let Some(coord) = field.axes[0].coordinate.as_mut() {
        coord.properties.remove("axis");
    }
    let err = repair_time_axis(&mut field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AxisResolution);
    assert!(err.to_string().contains("can't find T axis"));
}

#[test]
fn test_repair_horizontal_axes_is_idempotent() {
    let mut field = nemo_field();
    repair_time_axis(&mut field).unwrap();
    repair_horizontal_axes(&mut field).unwrap();

    assert_eq!(field.axis_position(AxisKind::Y), Some(1));
    assert_eq!(field.axis_position(AxisKind::X), Some(2));
    assert_eq!(
        field.axes[2].coordinate.as_ref().unwrap().values.to_vec(),
        vec![0.0, 1.0, 2.0]
    );

    let once = field.clone();
    repair_horizontal_axes(&mut field).unwrap();
    assert_eq!(field, once);
}

#[test]
fn test_repair_horizontal_axes_rejects_unknown_auxiliary() {
    let mut field = nemo_field().with_aux(
        AuxiliaryCoordinate::new("depth_2d", vec!["y".to_string()], ArrayD::zeros(IxDyn(&[2])))
            .with_property("standard_name", "depth"),
    );
    let err = repair_horizontal_axes(&mut field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AxisResolution);
}

fn cice_field(areas: [f64; 4]) -> Vec<Field> {
    let data = ArrayD::from_elem(IxDyn(&[1, 4, 1]), 0.5);
    let time = DomainAxis::new("time", 1).with_coordinate(
        DimensionCoordinate::new(Array1::from(vec![15.5]))
            .with_property("units", "days since 1850-01-01"),
    );
    let aice = Field::new(
        "aice",
        data,
        vec![time, DomainAxis::new("nj", 4), DomainAxis::new("ni", 1)],
    )
    .unwrap()
    .with_property("units", "1")
    .with_aux(
        AuxiliaryCoordinate::new(
            "TLAT",
            vec!["nj".to_string(), "ni".to_string()],
            ArrayD::from_shape_vec(IxDyn(&[4, 1]), vec![-60.0, -20.0, 20.0, 60.0]).unwrap(),
        )
        .with_property("long_name", "T grid center latitude")
        .with_property("units", "degrees_north"),
    );
    let tarea = Field::new(
        "tarea",
        ArrayD::from_shape_vec(IxDyn(&[4, 1]), areas.to_vec()).unwrap(),
        vec![DomainAxis::new("nj", 4), DomainAxis::new("ni", 1)],
    )
    .unwrap()
    .with_property("units", "m^2");
    vec![aice, tarea]
}

#[test]
fn test_repair_sea_ice_axes() {
    let mut aice = cice_field([100.0; 4]).remove(0);
    repair_sea_ice_axes(&mut aice).unwrap();

    assert_eq!(aice.axis_position(AxisKind::T), Some(0));
    assert_eq!(aice.time_coordinate().unwrap().standard_name(), Some("time"));
    assert_eq!(aice.declared_axis_position(AxisKind::Y), Some(1));
    assert_eq!(aice.declared_axis_position(AxisKind::X), Some(2));
    assert!(aice.aux("latitude").is_some());

    let once = aice.clone();
    repair_sea_ice_axes(&mut aice).unwrap();
    assert_eq!(aice, once);

    let mut no_grid = Field::new(
        "aice",
        ArrayD::zeros(IxDyn(&[2, 2])),
        vec![DomainAxis::new("a", 2), DomainAxis::new("b", 2)],
    )
    .unwrap();
    let err = repair_sea_ice_axes(&mut no_grid).unwrap_err();
    assert!(err.to_string().contains("can't find NI axis"));
}

// ---------------------------------------------------------------------------
// Weights and reductions
// ---------------------------------------------------------------------------

fn ocean_axes() -> Vec<DomainAxis> {
    vec![
        time_axis("time_counter", &[0.0, 1.0], "days since 1988-01-01"),
        DomainAxis::new("deptht", 2),
        DomainAxis::new("y", 2),
        DomainAxis::new("x", 2),
    ]
}

/// Thickness 10 m in the top level and 30 m below, 100 m² cells
fn ocean_weights() -> (Field, Field) {
    let thickness =
        ArrayD::from_shape_fn(IxDyn(&[2, 2, 2, 2]), |ix| if ix[1] == 0 { 10.0 } else { 30.0 });
    let thickness = Field::new("thkcello", thickness, ocean_axes())
        .unwrap()
        .with_property("standard_name", "cell_thickness")
        .with_property("units", "m");
    let area = Field::new(
        "area",
        ArrayD::from_elem(IxDyn(&[2, 2]), 100.0),
        vec![DomainAxis::new("y", 2), DomainAxis::new("x", 2)],
    )
    .unwrap()
    .with_property("standard_name", "cell_area")
    .with_property("units", "m2");
    (thickness, area)
}

/// Top level 1, lower level 5 at the first step; 2 everywhere at the second
fn temperature() -> Field {
    let data = ArrayD::from_shape_fn(IxDyn(&[2, 2, 2, 2]), |ix| match (ix[0], ix[1]) {
        (0, 0) => 1.0,
        (0, _) => 5.0,
        _ => 2.0,
    });
    Field::new("thetao", data, ocean_axes())
        .unwrap()
        .with_property("standard_name", "sea_water_potential_temperature")
        .with_property("units", "degC")
}

#[test]
fn test_resolve_area_search_order() {
    let (mut thickness, area) = ocean_weights();

    let (measure, source) = resolve_area(&[area.clone()], &thickness).unwrap();
    assert_eq!(source, AreaSource::ExplicitField);
    assert_eq!(measure.axes, vec!["y".to_string(), "x".to_string()]);

    let err = resolve_area(&[], &thickness).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WeightResolution);

    thickness.measures.push(
        CellMeasure::new(
            MeasureKind::Area,
            vec!["y".to_string(), "x".to_string()],
            area.data.clone(),
        )
        .with_units("m2"),
    );
    let (_, source) = resolve_area(&[], &thickness).unwrap();
    assert_eq!(source, AreaSource::AttachedMeasure);
}

#[test]
fn test_squeeze_measure_only_drops_degenerate_foreign_axes() {
    let measure = CellMeasure::new(
        MeasureKind::Area,
        vec!["time".to_string(), "y".to_string(), "x".to_string()],
        ArrayD::ones(IxDyn(&[1, 2, 2])),
    );
    let squeezed = squeeze_measure(&measure, &["y".to_string(), "x".to_string()]);
    assert_eq!(squeezed.axes, vec!["y".to_string(), "x".to_string()]);

    let kept = squeeze_measure(&measure, &["time".to_string(), "y".to_string(), "x".to_string()]);
    assert_eq!(kept.axes.len(), 3);
}

#[test]
fn test_volume_weighted_mean() {
    let (thickness, area) = ocean_weights();
    let (area, _) = resolve_area(&[area], &thickness).unwrap();
    let volume = volume_measure(&thickness, &area).unwrap();
    assert_eq!(volume.units.as_deref(), Some("m3"));

    let mut field = temperature();
    attach_volume(&mut field, volume).unwrap();
    let mean = volume_mean(&field, "cn134").unwrap();

    assert_eq!(mean.shape(), &[2]);
    // (1 * 10 + 5 * 30) / 40 = 4 at the first step
    assert!(close(mean.data[[0]], 4.0));
    assert!(close(mean.data[[1]], 2.0));
    assert_eq!(mean.standard_name(), Some("global_mean_sea_water_potential_temperature"));
    assert_eq!(mean.units(), Some("degC"));
    assert!(mean.properties.matches("job", "cn134"));
    assert!(mean.measures.is_empty());
}

#[test]
fn test_volume_mean_skips_missing_cells() {
    let (thickness, area) = ocean_weights();
    let (area, _) = resolve_area(&[area], &thickness).unwrap();
    let volume = volume_measure(&thickness, &area).unwrap();

    let mut field = temperature();
    // Land in the whole lower level
    field.data.index_axis_mut(ndarray::Axis(1), 1).fill(f64::NAN);
    attach_volume(&mut field, volume).unwrap();
    let mean = volume_mean(&field, "cn134").unwrap();
    assert!(close(mean.data[[0]], 1.0));
}

#[test]
fn test_volume_mean_requires_measure() {
    let err = volume_mean(&temperature(), "cn134").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WeightResolution);
}

#[test]
fn test_volume_means_from_stream() {
    let (thickness, area) = ocean_weights();
    let salinity = temperature()
        .with_property("standard_name", "sea_water_salinity")
        .with_property("units", "1e-3");
    let mut renamed = salinity;
    renamed.ncvar = "so".to_string();
    let fields = vec![thickness.clone(), area, temperature(), renamed];

    let variables = vec![
        "sea_water_potential_temperature".to_string(),
        "sea_water_salinity".to_string(),
    ];
    let means = volume_means(&fields, &variables, "cn134").unwrap();
    assert_eq!(means.len(), 2);
    assert_eq!(means[1].standard_name(), Some("global_mean_sea_water_salinity"));

    let err = volume_means(&[temperature()], &variables, "cn134").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingData);
    assert_eq!(err.stage(), Some(Stage::Ingest));

    let err = volume_means(&[thickness], &variables, "cn134").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WeightResolution);
    assert_eq!(err.stage(), Some(Stage::DeriveWeights));
}

#[test]
fn test_sea_ice_hemispheric_split() {
    let integrals = sea_ice_area(&cice_field([100.0; 4]), "cn134").unwrap();
    assert_eq!(integrals.len(), Hemisphere::ALL.len());

    let value = |name: &str| {
        let field = integrals
            .iter()
            .find(|f| f.standard_name() == Some(name))
            .unwrap();
        assert_eq!(field.units(), Some("Mm2"));
        assert_eq!(field.shape(), &[1]);
        field.data[[0]]
    };
    // 0.5 of 4 cells of 100 m², in units of 10^12 m²
    let global = value("global_sea_ice_area");
    let north = value("northern_sea_ice_area");
    let south = value("southern_sea_ice_area");
    assert!((global - 200.0e-12).abs() < 1e-24);
    assert!((north - 100.0e-12).abs() < 1e-24);
    assert!((south - 100.0e-12).abs() < 1e-24);
    assert!((north + south - global).abs() < 1e-24);
}

#[test]
fn test_sea_ice_zero_area_cells_are_missing() {
    let integrals = sea_ice_area(&cice_field([100.0, 0.0, 100.0, 100.0]), "cn134").unwrap();
    assert!((integrals[0].data[[0]] - 150.0e-12).abs() < 1e-24);
    assert!((integrals[2].data[[0]] - 50.0e-12).abs() < 1e-24);

    // The value held by a zero-area cell never reaches the integral
    let mut fields = cice_field([100.0, 0.0, 100.0, 100.0]);
    fields[0].data[[0, 1, 0]] = 7.0;
    let integrals = sea_ice_area(&fields, "cn134").unwrap();
    assert!((integrals[0].data[[0]] - 150.0e-12).abs() < 1e-24);
    assert!((integrals[2].data[[0]] - 50.0e-12).abs() < 1e-24);

    // Without the zero area the same data integrates differently
    let mut fields = cice_field([100.0, 100.0, 100.0, 100.0]);
    fields[0].data[[0, 1, 0]] = 7.0;
    let unmasked = sea_ice_area(&fields, "cn134").unwrap();
    assert!((unmasked[0].data[[0]] - 850.0e-12).abs() < 1e-24);
}

#[test]
fn test_sea_ice_empty_hemisphere_integrates_to_zero() {
    let integrals = sea_ice_area(&cice_field([0.0, 0.0, 100.0, 100.0]), "cn134").unwrap();
    let global = integrals[0].data[[0]];
    let north = integrals[1].data[[0]];
    let south = integrals[2].data[[0]];

    assert!((global - 100.0e-12).abs() < 1e-24);
    assert!((north - 100.0e-12).abs() < 1e-24);
    assert_eq!(south, 0.0);
    assert!((north + south - global).abs() < 1e-24);
}

#[test]
fn test_sea_ice_needs_square_metre_area() {
    let mut fields = cice_field([100.0; 4]);
    fields[1].properties.set("units", "km2");
    let mut aice = fields.remove(0);
    aice.measures.push(
        CellMeasure::new(
            MeasureKind::Area,
            vec!["nj".to_string(), "ni".to_string()],
            fields[0].data.clone(),
        )
        .with_units("km2"),
    );
    repair_sea_ice_axes(&mut aice).unwrap();
    let err = sea_ice_area_integrals(&aice, "cn134").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WeightResolution);

    let err = sea_ice_area(&[], "cn134").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingData);
}

#[test]
fn test_area_mean_of_uniform_field() {
    let data = ArrayD::from_elem(IxDyn(&[2, 3, 4]), 287.5);
    let field = Field::new(
        "m01s03i236",
        data,
        vec![
            time_axis("time", &[15.0, 45.0], "days since 1988-01-01"),
            latitude_axis(&[-60.0, 0.0, 60.0]),
            longitude_axis(&[0.0, 90.0, 180.0, 270.0]),
        ],
    )
    .unwrap()
    .with_property("standard_name", "air_temperature");

    let mean = area_mean(&field, "cn134").unwrap();
    assert_eq!(mean.shape(), &[2]);
    assert!(close(mean.data[[0]], 287.5));
    assert_eq!(mean.properties.text("cell_methods"), Some("area: mean"));
    assert!(mean.properties.matches("job", "cn134"));
}

#[test]
fn test_area_mean_weights_by_latitude() {
    // Equatorial cells carry more area than polar ones
    let data = ArrayD::from_shape_fn(IxDyn(&[2, 1]), |ix| if ix[0] == 0 { 0.0 } else { 1.0 });
    let field = Field::new(
        "tas",
        data,
        vec![latitude_axis(&[5.0, 85.0]), longitude_axis(&[0.0])],
    )
    .unwrap();
    let mean = area_mean(&field, "cn134").unwrap();
    assert_eq!(mean.ndim(), 0);
    let value = mean.data.iter().next().copied().unwrap();
    assert!(value > 0.0 && value < 0.5);
}

#[test]
fn test_collapse_methods_skip_missing_values() {
    let data = ArrayD::from_shape_vec(
        IxDyn(&[2, 3]),
        vec![1.0, f64::NAN, 3.0, f64::NAN, f64::NAN, f64::NAN],
    )
    .unwrap();
    let mean = data.collapse_axes(&[1], CollapseMethod::Mean, None).unwrap();
    assert_eq!(mean[[0]], 2.0);
    assert!(mean[[1]].is_nan());

    let max = data.collapse_axes(&[1], CollapseMethod::Maximum, None).unwrap();
    assert_eq!(max[[0]], 3.0);

    let weights = ArrayD::from_elem(IxDyn(&[2, 3]), 2.0);
    let integral = data
        .collapse_axes(&[1], CollapseMethod::Integral, Some(&weights))
        .unwrap();
    assert_eq!(integral[[0]], 8.0);
    assert_eq!(integral[[1]], 0.0);

    let sum = data.collapse_axes(&[1], CollapseMethod::Sum, None).unwrap();
    assert!(sum[[1]].is_nan());

    assert!(data.collapse_axes(&[2], CollapseMethod::Sum, None).is_err());
}

#[test]
fn test_collapse_drops_spanning_constructs() {
    let field = nemo_field();
    let collapsed = collapse(&field, &[1, 2], CollapseMethod::Mean, None, "area").unwrap();
    assert_eq!(collapsed.shape(), &[2]);
    // nav_lat/nav_lon span the collapsed axes; time_centered does not
    assert_eq!(collapsed.aux_coords.len(), 1);
    assert!(collapsed.aux("time").is_some());
}

// ---------------------------------------------------------------------------
// AMOC
// ---------------------------------------------------------------------------

fn overturning(ny: usize, nx: usize) -> Field {
    let mut data = ArrayD::from_elem(IxDyn(&[2, 3, ny, nx]), f64::NAN);
    if let Some(line) = LatitudeLineTable.line_for(ny) {
        let column = if nx > 1 { 1 } else { 0 };
        for (zi, value) in [1.0, 7.0, 3.0].into_iter().enumerate() {
            data[[0, zi, line, column]] = value;
        }
        for (zi, value) in [2.0, 4.0, 9.0].into_iter().enumerate() {
            data[[1, zi, line, column]] = value;
        }
    }
    Field::new(
        "zomsfatl",
        data,
        vec![
            time_axis("time_counter", &[15.0, 45.0], "days since 1988-01-01"),
            DomainAxis::new("depthw", 3),
            DomainAxis::new("y", ny),
            DomainAxis::new("x", nx),
        ],
    )
    .unwrap()
}

#[test]
fn test_latitude_line_table() {
    let table = LatitudeLineTable;
    assert_eq!(table.line_for(332), Some(251));
    assert_eq!(table.line_for(1207), Some(886));
    assert_eq!(table.line_for(3606), Some(2647));
    assert_eq!(table.line_for(100), None);
    assert!(table.resolutions().all(|ysize| table.line_for(ysize).is_some()));
}

#[test]
fn test_amoc_extracts_at_every_known_resolution() {
    let table = LatitudeLineTable;
    for ysize in table.resolutions() {
        let field = overturning(ysize, 2);
        let amoc = extract_amoc_45n(&field, &table, "cn134").unwrap();
        assert_eq!(amoc.shape(), &[field.shape()[0]]);
        assert_eq!(amoc.data[[0]], 7.0);
        assert_eq!(amoc.data[[1]], 9.0);
    }
}

#[test]
fn test_amoc_uses_first_unmasked_column() {
    let amoc = extract_amoc_45n(&overturning(332, 3), &LatitudeLineTable, "cn134").unwrap();
    assert_eq!(amoc.shape(), &[2]);
    assert_eq!(amoc.data[[0]], 7.0);
    assert_eq!(amoc.data[[1]], 9.0);
    assert_eq!(amoc.units(), Some("Sv"));
    assert_eq!(amoc.standard_name(), Some("amoc_45n"));
    assert_eq!(amoc.ncvar, "amoc45n");
}

#[test]
fn test_amoc_single_column_and_failures() {
    let amoc = extract_amoc_45n(&overturning(332, 1), &LatitudeLineTable, "cn134").unwrap();
    assert_eq!(amoc.data[[1]], 9.0);

    let err = extract_amoc_45n(&overturning(100, 2), &LatitudeLineTable, "cn134").unwrap_err();
    assert!(matches!(err, MonitorError::UnknownResolution { ysize: 100 }));
    assert_eq!(err.exit_code(), 95);

    let mut masked = overturning(332, 3);
    masked.data.fill(f64::NAN);
    let err = extract_amoc_45n(&masked, &LatitudeLineTable, "cn134").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingData);
}

#[test]
fn test_amoc_index_from_fragments() {
    let first = overturning(332, 3);
    let mut second = overturning(332, 3);
    second.ncvar = "zomsfatl".to_string();
    if let Some(coord) = second.axes[0].coordinate.as_mut() {
        coord.values = Array1::from(vec![75.0, 105.0]);
    }

    let amoc = amoc_index(&[second, first], &LatitudeLineTable, "cn134").unwrap();
    assert_eq!(amoc.shape(), &[4]);
    let series: Vec<f64> = amoc.data.iter().copied().collect();
    assert_eq!(series, vec![7.0, 9.0, 7.0, 9.0]);

    let err = amoc_index(&[], &LatitudeLineTable, "cn134").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingData);
    assert_eq!(err.stage(), Some(Stage::Ingest));
}

// ---------------------------------------------------------------------------
// Atmosphere
// ---------------------------------------------------------------------------

fn monthly_field(ncvar: &str, standard_name: &str, value: f64) -> Field {
    Field::new(
        ncvar,
        ArrayD::from_elem(IxDyn(&[1, 2, 4]), value),
        vec![
            time_axis("time", &[15.0], "days since 1988-01-01"),
            latitude_axis(&[-45.0, 45.0]),
            longitude_axis(&[0.0, 90.0, 180.0, 270.0]),
        ],
    )
    .unwrap()
    .with_property("standard_name", standard_name)
    .with_property("units", "W m-2")
    .with_property("lbtim", 122.0)
    .with_property("lbproc", 128.0)
}

fn soil_layers() -> Field {
    let levels = DomainAxis::new("soil", 4).with_coordinate(
        DimensionCoordinate::new(Array1::from(vec![0.05, 0.225, 0.675, 2.0]))
            .with_property("standard_name", "depth")
            .with_property("units", "m"),
    );
    Field::new(
        "m01s08i223",
        ArrayD::from_elem(IxDyn(&[1, 4, 2, 4]), 10.0),
        vec![
            time_axis("time", &[15.0], "days since 1988-01-01"),
            levels,
            latitude_axis(&[-45.0, 45.0]),
            longitude_axis(&[0.0, 90.0, 180.0, 270.0]),
        ],
    )
    .unwrap()
    .with_property("standard_name", "moisture_content_of_soil_layer")
    .with_property("units", "kg m-2")
    .with_property("lbtim", 122.0)
    .with_property("lbproc", 128.0)
}

#[test]
fn test_atmosphere_indices_with_derived_fields() {
    let monthly = vec![
        monthly_field("m01s01i207", "toa_incoming_shortwave_flux", 340.0),
        monthly_field("m01s01i208", "toa_outgoing_shortwave_flux", 100.0),
        monthly_field("m01s02i205", "toa_outgoing_longwave_flux", 200.0),
        soil_layers(),
    ];
    let fallback = FallbackStreams::from_sets(Vec::new());
    let indices = atmosphere_from(&monthly, &fallback, &[1207, 1208, 2205, 8223, 1201], "cn134")
        .unwrap();

    // Four area means (1201 is not output) plus two derived indices
    assert_eq!(indices.len(), 6);
    let find = |name: &str| indices.iter().find(|f| f.standard_name() == Some(name)).unwrap();

    let net = find("toa_net_incoming_flux");
    assert!(close(net.data[[0]], 40.0));
    assert_eq!(net.ncvar, "toa_net");

    let soil = find("mass_content_of_water_in_soil");
    assert_eq!(soil.shape(), &[1]);
    assert!(close(soil.data[[0]], 40.0));
    assert!(indices.iter().all(|f| f.properties.matches("job", "cn134")));
}

#[test]
fn test_atmosphere_requires_monthly_means() {
    let mut daily = monthly_field("m01s01i207", "toa_incoming_shortwave_flux", 340.0);
    daily.properties.set("lbproc", 0.0);
    let fallback = FallbackStreams::from_sets(Vec::new());
    let err = atmosphere_from(&[daily], &fallback, &[1207], "cn134").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingData);
    assert_eq!(err.stage(), Some(Stage::Ingest));
}

fn daily_series() -> Field {
    let times: Vec<f64> = (0..60).map(|d| d as f64 + 0.5).collect();
    let time = DomainAxis::new("time", 60).with_coordinate(
        DimensionCoordinate::new(Array1::from(times))
            .with_property("standard_name", "time")
            .with_property("units", "days since 1988-01-01")
            .with_property("calendar", "360_day"),
    );
    Field::new(
        "m01s01i201",
        ArrayD::from_shape_fn(IxDyn(&[60, 2, 4]), |ix| ix[0] as f64),
        vec![time, latitude_axis(&[-45.0, 45.0]), longitude_axis(&[0.0, 90.0, 180.0, 270.0])],
    )
    .unwrap()
    .with_property("long_name", "NET DOWN SURFACE SW FLUX: CORRECTED")
}

#[test]
fn test_monthly_mean_of_daily_series() {
    let monthly = monthly_mean(&daily_series()).unwrap();
    assert_eq!(monthly.shape(), &[2, 2, 4]);
    assert_eq!(time_values(&monthly), vec![15.0, 45.0]);
    assert!(close(monthly.data[[0, 0, 0]], 14.5));
    assert!(close(monthly.data[[1, 1, 3]], 44.5));

    let bounds = monthly.time_coordinate().unwrap().bounds.clone().unwrap();
    assert_eq!(bounds.row(0).to_vec(), vec![0.5, 29.5]);
    assert_eq!(monthly.properties.text("cell_methods"), Some("time: mean"));
}

#[test]
fn test_missing_monthly_code_falls_back_to_daily() {
    let monthly = vec![monthly_field("m01s01i207", "toa_incoming_shortwave_flux", 340.0)];
    let fallback = FallbackStreams::from_sets(vec![
        FragmentSet::from_fields("day", vec![daily_series()]),
        FragmentSet::from_fields("1hr", Vec::new()),
    ]);
    let indices = atmosphere_from(&monthly, &fallback, &[1201], "cn134").unwrap();

    assert_eq!(indices.len(), 1);
    let flux = &indices[0];
    assert_eq!(flux.standard_name(), Some("NET_DOWN_SURFACE_SW_FLUX__CORRECTED"));
    assert_eq!(flux.shape(), &[2]);
    assert!(close(flux.data[[0]], 14.5));
    assert!(close(flux.data[[1]], 44.5));
}

#[test]
fn test_derived_indices_need_inputs() {
    assert!(soil_moisture_total(&[], "cn134").unwrap().is_none());
    let incoming = monthly_field("m01s01i207", "toa_incoming_shortwave_flux", 340.0);
    assert!(toa_net_flux(&[incoming], "cn134").unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

#[test]
fn test_index_collection_tags_and_orders() {
    let mut collection = IndexCollection::new("cn134", "19880101T0000Z");
    collection.push(monthly_field("m01s01i208", "toa_outgoing_shortwave_flux", 100.0));
    collection.push(monthly_field("m01s01i207", "toa_incoming_shortwave_flux", 340.0));
    assert_eq!(collection.len(), 2);

    let path = collection.output_path(std::path::Path::new("/out"));
    assert_eq!(path, std::path::PathBuf::from("/out/index_cn134_19880101T0000Z.nc"));

    let fields = collection.finish();
    let names: Vec<String> = fields.iter().map(Field::identity).collect();
    assert_eq!(names, vec!["toa_incoming_shortwave_flux", "toa_outgoing_shortwave_flux"]);
    assert!(fields.iter().all(|f| f.properties.matches("job", "cn134")));
}
