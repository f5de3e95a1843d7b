use std::{env, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueHint};
use heatpump_dashboard::{
    DashboardConfig, DashboardPage, NormalizedSeries, WeekReport,
    io::OutputDir,
    render::page::{WeekLink, WeekNav, index_html, page_file_name},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Weekly heat-pump energy dashboard", long_about = None)]
struct Cli {
    /// Monitoring log to read (.xlsx, .xls, .ods or .csv)
    #[arg(short, long, default_value = "D0005_systemLogs.xlsx", value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// JSON config file; built-in defaults otherwise
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// 1-based position of the week in the catalogue
    #[arg(short, long, default_value_t = 1, conflicts_with = "all_weeks")]
    week: usize,

    /// Render every week of the catalogue
    #[arg(long, action = ArgAction::SetTrue)]
    all_weeks: bool,

    /// Directory the HTML pages are written to
    #[arg(short, long, default_value = "dashboard", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Print the week catalogue and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_weeks: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DashboardConfig::default(),
    };

    if cli.list_weeks {
        for (i, span) in cfg.weeks.iter().enumerate() {
            println!("{:>2}  {}", i + 1, span.label());
        }
        return Ok(());
    }

    let selected = selected_weeks(&cli, &cfg)?;

    let series = NormalizedSeries::load(&cli.input, &cfg)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    let out = OutputDir::create(&cli.out_dir).context("Failed to prepare output directory")?;

    let links: Vec<WeekLink> = selected
        .iter()
        .map(|&index| -> Result<WeekLink> {
            Ok(WeekLink {
                label: cfg.weeks.get(index)?.label(),
                href: page_file_name(index + 1),
            })
        })
        .collect::<Result<_>>()?;

    for (position, &index) in selected.iter().enumerate() {
        let span = cfg.weeks.get(index)?;
        let report = WeekReport::build(&series, span, cfg.autoprod_threshold_w)
            .with_context(|| format!("Failed to prepare week {}", span.label()))?;

        let page = DashboardPage::build(&report, &cfg.chart)
            .with_context(|| format!("Failed to render week {}", span.label()))?;
        let nav = WeekNav {
            links: links.clone(),
            selected: position,
        };
        let path = out.write(&page_file_name(index + 1), &page.to_html(&nav))?;
        info!(week = %span.label(), path = %path.display(), "Wrote dashboard page");
    }

    if let Some(first) = links.first() {
        out.write("index.html", &index_html(&first.href))?;
    }

    info!(
        pages = selected.len(),
        dir = %out.path().display(),
        "Dashboard complete"
    );
    Ok(())
}

/// Zero-based catalogue indices to render.
fn selected_weeks(cli: &Cli, cfg: &DashboardConfig) -> Result<Vec<usize>> {
    if cfg.weeks.is_empty() {
        bail!("The week catalogue is empty");
    }
    if cli.all_weeks {
        return Ok((0..cfg.weeks.len()).collect());
    }

    let Some(index) = cli.week.checked_sub(1) else {
        bail!("--week is 1-based, got 0");
    };
    cfg.weeks.get(index)?;
    Ok(vec![index])
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing() {
    // Detect if running in container
    let in_container =
        env::var("CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if in_container {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
