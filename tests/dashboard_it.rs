use heatpump_dashboard::{
    DashboardConfig, DashboardError, DashboardPage, NormalizedSeries, WeekReport,
    error::{DataError, IoError},
    io::OutputDir,
    render::page::{WeekLink, WeekNav, index_html, page_file_name},
};

mod common;

use common::{f64s, fixture, load_fixture};

/// Monday 2024-11-04, 10:00 Brussels: three native buckets, two of them with
/// the pump above the self-production threshold (37.5 % and 100 %).
#[test]
fn csv_log_to_first_week_report() {
    let cfg = DashboardConfig::default();
    let series = load_fixture("two_weeks.csv");

    assert!(
        !series
            .as_df()
            .get_column_names()
            .iter()
            .any(|n| n.as_str() == "mode")
    );

    let report = WeekReport::build(&series, cfg.weeks.get(0).unwrap(), cfg.autoprod_threshold_w)
        .unwrap();

    assert!(!report.is_empty());
    // the native grid runs on to the week-2 sample, so every day of week 1 is present
    assert_eq!(report.daily.as_df().height(), 7);
    assert_eq!(
        f64s(report.daily.as_df(), "autoprod").first(),
        Some(&Some(68.75))
    );
    assert_eq!(report.heatmaps.working.get(0, 10), 3.0);
    assert!((report.heatmaps.power.get(0, 10) - 1850.0 / 3.0).abs() < 1e-9);
    // P_conso = -P_grid_elec, floored at zero on the heatmap
    assert_eq!(report.heatmaps.consumption.get(1, 10), 200.0);
    assert_eq!(report.heatmaps.consumption.get(0, 10), 0.0);
}

/// The self-production chart plots hourly means: the three Monday 10:00
/// buckets (37.5 %, undefined, 100 %) collapse to one 68.75 % point.
#[test]
fn hourly_table_smooths_autoprod() {
    let cfg = DashboardConfig::default();
    let series = load_fixture("two_weeks.csv");
    let report = WeekReport::build(&series, cfg.weeks.get(0).unwrap(), cfg.autoprod_threshold_w)
        .unwrap();

    let detail = f64s(report.detail.as_df(), "autoprod");
    let hourly = f64s(report.hourly.as_df(), "autoprod");

    assert_eq!(&detail[..3], &[Some(37.5), None, Some(100.0)]);
    assert_eq!(hourly.first(), Some(&Some(68.75)));
    assert!(hourly.len() < detail.len());
}

#[test]
fn second_week_only_sees_its_own_rows() {
    let cfg = DashboardConfig::default();
    let series = load_fixture("two_weeks.csv");

    let report = WeekReport::build(&series, cfg.weeks.get(1).unwrap(), cfg.autoprod_threshold_w)
        .unwrap();

    assert_eq!(report.daily.as_df().height(), 2);
    assert_eq!(f64s(report.daily.as_df(), "autoprod"), vec![None, None]);
    assert_eq!(
        f64s(report.daily.as_df(), "P_conso"),
        vec![None, Some(300.0)]
    );
    assert_eq!(report.heatmaps.working.max(), 0.0);
}

#[test]
fn dashboard_page_has_every_section() {
    let cfg = DashboardConfig::default();
    let series = load_fixture("two_weeks.csv");
    let span = cfg.weeks.get(0).unwrap();
    let report = WeekReport::build(&series, span, cfg.autoprod_threshold_w).unwrap();

    let page = DashboardPage::build(&report, &cfg.chart).unwrap();
    let nav = WeekNav {
        links: cfg
            .weeks
            .iter()
            .enumerate()
            .map(|(i, w)| WeekLink {
                label: w.label(),
                href: page_file_name(i + 1),
            })
            .collect(),
        selected: 0,
    };
    let html = page.to_html(&nav);

    assert_eq!(page.sections.len(), 7);
    assert_eq!(
        page.sections.iter().map(|s| s.charts.len()).sum::<usize>(),
        8
    );
    assert!(html.contains("<h1>D0005 - Destore Analysis Dashboard</h1>"));
    assert_eq!(html.matches("<details>").count(), 7);
    assert_eq!(html.matches("<option ").count(), 13);
    assert!(html.contains("<option value=\"week-01.html\" selected>Du 04/11/2024 au 10/11/2024</option>"));
    assert!(html.contains("Bilan électrique"));
    assert!(html.contains("68.8%") || html.contains("68.7%"));
    assert!(html.contains("Lundi"));
}

#[test]
fn week_without_data_still_renders() {
    let cfg = DashboardConfig::default();
    let series = load_fixture("two_weeks.csv");
    let span = cfg.weeks.get(6).unwrap();

    let report = WeekReport::build(&series, span, cfg.autoprod_threshold_w).unwrap();
    assert!(report.is_empty());

    let page = DashboardPage::build(&report, &cfg.chart).unwrap();
    let html = page.to_html(&WeekNav::default());
    assert_eq!(html.matches("<details>").count(), 7);
    assert!(html.contains(&span.label()));
}

#[test]
fn spreadsheet_log_matches_csv_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("D0005_systemLogs.xlsx");

    let header = [
        "timestamp",
        "P_grid_elec",
        "P_HP_elec",
        "T_HP_flow",
        "T_HP_return",
        "T_house_actual",
        "mode",
    ];
    let rows: [(&str, [f64; 5], &str); 3] = [
        ("2024-11-04 10:00:00+01:00", [500.0, 800.0, 35.5, 30.0, 20.0], "heating"),
        ("2024-11-04 10:02:00+01:00", [500.0, 50.0, 35.0, 30.5, 21.0], "heating"),
        ("2024-11-04 10:04:00+01:00", [0.0, 1000.0, 36.0, 31.0, 21.0], "heating"),
    ];

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, name) in header.iter().enumerate() {
        sheet.write_string(0, c as u16, *name).unwrap();
    }
    for (r, (ts, values, mode)) in rows.iter().enumerate() {
        let r = r as u32 + 1;
        sheet.write_string(r, 0, *ts).unwrap();
        for (c, v) in values.iter().enumerate() {
            sheet.write_number(r, c as u16 + 1, *v).unwrap();
        }
        sheet.write_string(r, 6, *mode).unwrap();
    }
    workbook.save(&path).unwrap();

    let cfg = DashboardConfig::default();
    let series = NormalizedSeries::load(&path, &cfg).unwrap();
    let report = WeekReport::build(&series, cfg.weeks.get(0).unwrap(), cfg.autoprod_threshold_w)
        .unwrap();

    assert_eq!(
        f64s(report.daily.as_df(), "autoprod"),
        vec![Some(68.75)]
    );
    assert_eq!(report.heatmaps.working.get(0, 10), 3.0);
}

#[test]
fn decimal_after_long_integer_run_still_loads() {
    // 120 integer draws, then 812.5 on the last row
    let series = load_fixture("late_decimal.csv");
    let draw = f64s(series.as_df(), "P_HP_elec");

    assert_eq!(draw.len(), 121);
    assert_eq!(draw.first(), Some(&Some(800.0)));
    assert_eq!(draw.last(), Some(&Some(812.5)));
}

#[test]
fn missing_channel_is_reported_by_name() {
    let err = NormalizedSeries::load(fixture("missing_indoor.csv"), &DashboardConfig::default())
        .unwrap_err();

    match err {
        DashboardError::Data(DataError::MissingColumn(name)) => {
            assert_eq!(name, "T_house_actual")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unparseable_timestamp_names_the_row() {
    let err = NormalizedSeries::load(fixture("bad_timestamp.csv"), &DashboardConfig::default())
        .unwrap_err();

    assert!(
        matches!(
            err,
            DashboardError::Data(DataError::TimestampParse { row: 1, .. })
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn missing_input_file_is_fatal() {
    let err = NormalizedSeries::load(fixture("nope.xlsx"), &DashboardConfig::default())
        .unwrap_err();
    assert!(matches!(err, DashboardError::Io(IoError::NotFound(_))));
}

#[test]
fn writes_week_page_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let out = OutputDir::create(dir.path().join("dashboard")).unwrap();

    let cfg = DashboardConfig::default();
    let series = load_fixture("two_weeks.csv");
    let report = WeekReport::build(&series, cfg.weeks.get(0).unwrap(), cfg.autoprod_threshold_w)
        .unwrap();

    let page = DashboardPage::build(&report, &cfg.chart).unwrap();
    let page_path = out
        .write(&page_file_name(1), &page.to_html(&WeekNav::default()))
        .unwrap();
    out.write("index.html", &index_html(&page_file_name(1)))
        .unwrap();

    assert!(page_path.ends_with("week-01.html"));
    let index = std::fs::read_to_string(dir.path().join("dashboard/index.html")).unwrap();
    assert!(index.contains("url=week-01.html"));
}
