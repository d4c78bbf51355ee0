use clap::{Parser, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use datagrid::config::Config;
use datagrid::core::models::Record;
use datagrid::grid::DataGrid;
use datagrid::services::{FilePreferences, InMemoryStore, LoggingHost};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Load records into an in-memory store and print the grid as TSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    /// JSON file holding an array of records; demo rows are used when omitted
    #[arg(long = "load", value_name = "PATH")]
    load: Option<PathBuf>,
    /// Exact filter, repeatable. Syntax: field=value1,value2
    #[arg(long = "filter", value_name = "FIELD=VALUES")]
    filter: Vec<String>,
    /// Substring filter, repeatable. Syntax: field=pattern
    #[arg(long = "like", value_name = "FIELD=PATTERN")]
    like: Vec<String>,
    /// Sort the page by this field
    #[arg(long = "sort", value_name = "FIELD")]
    sort: Option<String>,
    /// Sort descending
    #[arg(long = "desc", requires = "sort")]
    desc: bool,
    #[arg(long = "page", default_value_t = 1)]
    page: usize,
    #[arg(long = "page-size")]
    page_size: Option<usize>,
    /// Write the filtered CSV export into this directory
    #[arg(long = "export", value_name = "DIR")]
    export: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn split_pair(raw: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| eyre!("Expected FIELD=VALUE, got '{raw}'"))
}

fn demo_records() -> Vec<Record> {
    let customers = ["Acme", "Bolt", "Crane", "Delta"];
    let statuses = ["open", "held", "closed"];
    (1..=12)
        .map(|i: usize| {
            Record::new(None)
                .with("order_no", format!("SO-{:04}", 1000 + i))
                .with("customer", customers[i % customers.len()])
                .with("status", statuses[i % statuses.len()])
                .with("qty", (i * 7) % 25 + 1)
                .with("price", format!("{:.2}", 9.5 + i as f64 * 1.25))
                .with("created_at", format!("2024-03-{:02}", i))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let level = match args.logging {
        Some(LogLevel::Error) => Some(tracing::Level::ERROR),
        Some(LogLevel::Warn) => Some(tracing::Level::WARN),
        Some(LogLevel::Info) => Some(tracing::Level::INFO),
        Some(LogLevel::Debug) => Some(tracing::Level::DEBUG),
        Some(LogLevel::Trace) => Some(tracing::Level::TRACE),
        None => None,
    };
    datagrid::logging::init_with(None, level)?;

    let cfg = Config::from_path(args.config.as_ref())?;
    let records = match &args.load {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<Vec<Record>>(&raw)?
        }
        None => demo_records(),
    };
    info!("Starting with {} records", records.len());

    let store = Arc::new(InMemoryStore::with_records(records));
    store.set_columns(cfg.grid.fields.clone()).await;
    let mut grid = DataGrid::new(cfg.grid.clone(), store.clone(), Arc::new(LoggingHost))
        .with_color_store(store.clone())
        .with_alias_store(store.clone())
        .with_preferences(Arc::new(FilePreferences::in_data_dir()));

    for raw in &args.filter {
        let (field, values) = split_pair(raw)?;
        grid.set_exact_filter(&field, values.split(',').map(str::to_string).collect());
    }
    for raw in &args.like {
        let (field, pattern) = split_pair(raw)?;
        grid.set_fuzzy_filter(&field, &pattern);
    }
    grid.init().await?;
    if let Some(size) = args.page_size {
        grid.set_page_size(size).await?;
    }
    if args.page > 1 {
        grid.set_page(args.page).await?;
    }
    if let Some(field) = &args.sort {
        grid.toggle_sort(field)?;
        if args.desc {
            grid.toggle_sort(field)?;
        }
    }

    let fields = grid.layout().visible_names();
    let header: Vec<String> = fields.iter().map(|f| grid.alias(f)).collect();
    println!("{}", header.join("\t"));
    for record in grid.cache().rows() {
        let line: Vec<String> = fields.iter().map(|f| record.display(f)).collect();
        println!("{}", line.join("\t"));
    }
    eprintln!(
        "page {}/{} ({} records total)",
        grid.cache().page(),
        grid.page_count(),
        grid.cache().total()
    );

    if let Some(dir) = &args.export {
        let export = grid.export_csv().await?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&export.file_name);
        std::fs::write(&path, &export.bytes)?;
        debug!("Export written to {}", path.display());
        eprintln!("exported {}", path.display());
    }
    Ok(())
}
