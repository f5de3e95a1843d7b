use crate::{
    config::ChartConfig,
    data::{
        column::{ChannelCol, DerivedCol},
        resample::timestamps_micros,
    },
    error::{DashboardResult, DataError, polars_err},
    metrics::week_report::WeekReport,
    render::{
        bar::DailyBars,
        heatmap::HeatmapChart,
        palette::{DAILY_BAR, FLOW_TEMP, RETURN_TEMP, TRACE_COLORS},
        timeseries::{TimeChart, Trace},
    },
};

pub const PAGE_TITLE: &str = "D0005 - Destore Analysis Dashboard";
pub const INTRO: &str = "Ce Dashboard temporaire a pour but de visualiser les différentes données disponibles concernant votre installation.";
pub const WEEK_PROMPT: &str = "Sélectionnez la semaine que vous souhaitez analyser";

const HEATMAP_POWER_SCALE: f64 = 3.0;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem auto;max-width:1280px;color:#222}\
nav{margin:1rem 0}select{font-size:1rem;padding:.2rem}\
section{margin:1.5rem 0}details{border:1px solid #ddd;border-radius:4px;padding:.5rem 1rem}\
summary{cursor:pointer;color:#555}svg{display:block;max-width:100%;height:auto;margin:.5rem 0}";

/// A collapsible block of the dashboard holding one or more charts.
#[derive(Debug, Clone)]
pub struct Section {
    pub heading: &'static str,
    pub charts: Vec<String>,
}

/// One entry of the week selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekLink {
    pub label: String,
    pub href: String,
}

/// Week selector of a page: every generated week and the one shown.
#[derive(Debug, Clone, Default)]
pub struct WeekNav {
    pub links: Vec<WeekLink>,
    pub selected: usize,
}

/// File name of the page for the 1-based catalogue position `number`.
pub fn page_file_name(number: usize) -> String {
    format!("week-{number:02}.html")
}

/// The rendered dashboard of one week.
#[derive(Debug, Clone)]
pub struct DashboardPage {
    pub week_label: String,
    pub sections: Vec<Section>,
}

impl DashboardPage {
    /// Draws every chart of `report`.
    #[tracing::instrument(skip_all, fields(week = %report.span.slug()))]
    pub fn build(report: &WeekReport, chart: &ChartConfig) -> DashboardResult<Self> {
        let size = (chart.width, chart.height);
        let heat_size = (chart.width, chart.heatmap_height);
        let (span, tz) = (&report.span, report.tz);
        let detail = report.detail.as_df();

        let mut balance = TimeChart::new("Bilan électrique", " W");
        let balance_columns = [
            ChannelCol::HeatPumpElec.as_str(),
            DerivedCol::Surplus.as_str(),
            DerivedCol::Consumption.as_str(),
        ];
        for (column, color) in balance_columns.into_iter().zip(TRACE_COLORS) {
            balance = balance.with_trace(Trace::from_column(detail, column, color)?.filled());
        }

        let temperatures = TimeChart::new(
            "Températures départ/retour de la pompe à chaleur (sondes Destore)",
            " °C",
        )
        .with_trace(
            Trace::from_column(detail, ChannelCol::HeatPumpReturnTemp.as_str(), RETURN_TEMP)?
                .smoothed(),
        )
        .with_trace(
            Trace::from_column(detail, ChannelCol::HeatPumpFlowTemp.as_str(), FLOW_TEMP)?
                .smoothed(),
        );

        let hourly = report.hourly.as_df();
        let indoor = TimeChart::new("Température intérieure", " °C")
            .with_y_floor(15.0)
            .without_legend()
            .with_trace(
                Trace::from_column(hourly, ChannelCol::IndoorTemp.as_str(), TRACE_COLORS[0])?
                    .smoothed(),
            );

        let autoprod = TimeChart::new("Autoproduction de la pompe à chaleur", " %").with_trace(
            Trace::from_column(hourly, DerivedCol::Autoprod.as_str(), TRACE_COLORS[0])?
                .filled()
                .smoothed(),
        );

        let daily = DailyBars::new(
            "Autoproduction moyenne journalière",
            DAILY_BAR,
            daily_values(report, DerivedCol::Autoprod.as_str())?,
        );

        let maps = &report.heatmaps;
        let power_map = HeatmapChart::auto(
            "Puissance moyenne horaire de la pompe à chaleur",
            maps.power.scaled(HEATMAP_POWER_SCALE),
        );
        let surplus_map = HeatmapChart::with_range(
            "Surplus horaire moyen",
            maps.consumption,
            (0.0, maps.consumption_peak),
        );
        let working_map = HeatmapChart::auto(
            "Minutes de fonctionnement horaire de la pompe à chaleur",
            maps.working,
        )
        .with_subtitle(format!(
            "Nombre d'intervalles de {} avec la pompe en marche par heure",
            report.bucket
        ));

        let sections = vec![
            Section {
                heading: "Bilan électrique",
                charts: vec![balance.render(span, tz, size)?],
            },
            Section {
                heading: "Température de la pompe à chaleur",
                charts: vec![temperatures.render(span, tz, size)?],
            },
            Section {
                heading: "Température intérieure",
                charts: vec![indoor.render(span, tz, size)?],
            },
            Section {
                heading: "Auto-production",
                charts: vec![autoprod.render(span, tz, size)?],
            },
            Section {
                heading: "Auto-production moyenne",
                charts: vec![daily.render(tz, size)?],
            },
            Section {
                heading: "Fonctionnement hebdomadaire",
                charts: vec![power_map.render(heat_size)?, surplus_map.render(heat_size)?],
            },
            Section {
                heading: "Minutes de fonctionnement",
                charts: vec![working_map.render(heat_size)?],
            },
        ];

        Ok(Self {
            week_label: span.label(),
            sections,
        })
    }

    /// The complete HTML document.
    pub fn to_html(&self, nav: &WeekNav) -> String {
        let mut html = String::with_capacity(
            self.sections
                .iter()
                .flat_map(|s| &s.charts)
                .map(String::len)
                .sum::<usize>()
                + 4096,
        );

        html.push_str(&format!(
            "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title} | {week}</title>\n<style>{style}</style>\n</head>\n<body>\n\
             <h1>{title}</h1>\n",
            title = escape(PAGE_TITLE),
            week = escape(&self.week_label),
            style = STYLE,
        ));

        html.push_str(&week_selector(nav, &self.week_label));
        html.push_str(&format!("<p>{}</p>\n", escape(INTRO)));

        for section in &self.sections {
            html.push_str(&format!(
                "<section>\n<h2>{}</h2>\n<details>\n<summary>Show more</summary>\n",
                escape(section.heading)
            ));
            for chart in &section.charts {
                html.push_str(chart);
                html.push('\n');
            }
            html.push_str("</details>\n</section>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Landing page forwarding to `target`.
pub fn index_html(target: &str) -> String {
    let target = escape(target);
    format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"0; url={target}\">\n\
         <title>{title}</title>\n</head>\n<body>\n\
         <p><a href=\"{target}\">{title}</a></p>\n</body>\n</html>\n",
        title = escape(PAGE_TITLE),
    )
}

fn week_selector(nav: &WeekNav, fallback_label: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<nav>\n<label for=\"week\">{}</label>\n\
         <select id=\"week\" onchange=\"window.location.href=this.value\">\n",
        escape(WEEK_PROMPT)
    ));

    if nav.links.is_empty() {
        out.push_str(&format!(
            "<option selected>{}</option>\n",
            escape(fallback_label)
        ));
    }
    for (i, link) in nav.links.iter().enumerate() {
        let selected = if i == nav.selected { " selected" } else { "" };
        out.push_str(&format!(
            "<option value=\"{}\"{selected}>{}</option>\n",
            escape(&link.href),
            escape(&link.label)
        ));
    }

    out.push_str("</select>\n</nav>\n");
    out
}

/// Day-start instants of the daily table with the values of `column`.
fn daily_values(report: &WeekReport, column: &str) -> DashboardResult<Vec<(i64, Option<f64>)>> {
    let df = report.daily.as_df();
    let days = timestamps_micros(df)?;
    let values = df
        .column(column)
        .map_err(|_| DataError::MissingColumn(column.to_string()))?
        .f64()
        .map_err(|e| polars_err(&format!("Column '{column}' is not Float64"), e))?;
    Ok(days.into_iter().zip(values).collect())
}

/// Escapes text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
