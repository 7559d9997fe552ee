use bookquery::cli::{self as prog_cli, Command, OutputMode, Settings};
use bookquery::config::AppConfig;
use bookquery::engine::Engine;
use bookquery::logger;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Plain,
    Human,
    Json,
}

impl From<Format> for OutputMode {
    fn from(f: Format) -> Self {
        match f {
            Format::Plain => Self::Plain,
            Format::Human => Self::Human,
            Format::Json => Self::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "bookquery", version, about = "Run the books query catalog against fixture data", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML)")]
    config: Option<PathBuf>,
    #[arg(long, help = "Fixture file to seed from (JSON array, NDJSON or CSV)")]
    fixtures: Option<PathBuf>,
    #[arg(long, help = "Collection name (default: books)")]
    collection: Option<String>,
    #[arg(long, help = "Books per page for the page command (default: 5)")]
    page_size: Option<usize>,
    #[arg(long, help = "Write rolling log files to this directory instead of logging to stderr")]
    log_dir: Option<PathBuf>,
    #[arg(long, help = "error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[arg(long, value_enum, default_value = "plain")]
    format: Format,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "List catalog statements")]
    List,
    #[command(about = "Print a statement in mongo shell syntax")]
    Show {
        #[arg(help = "Statement name, e.g. find-by-genre")]
        name: String,
    },
    #[command(about = "Run one statement against freshly seeded fixtures")]
    Run {
        #[arg(help = "Statement name, e.g. top-author")]
        name: String,
    },
    #[command(name = "run-all", about = "Run every statement, each against fresh fixtures")]
    RunAll,
    #[command(about = "Ad-hoc find over the fixtures")]
    Find {
        #[arg(long, default_value = "{}", help = "Filter as JSON")]
        filter: String,
        #[arg(long, help = "Projection as JSON")]
        project: Option<String>,
        #[arg(long, help = "Sort as JSON, e.g. {\"price\": -1}")]
        sort: Option<String>,
        #[arg(long)]
        skip: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Ad-hoc aggregation pipeline over the fixtures")]
    Aggregate {
        #[arg(long, help = "Pipeline as a JSON array of stages")]
        pipeline: String,
    },
    #[command(about = "Print one page of books in natural order")]
    Page {
        #[arg(help = "Page number, starting at 1")]
        page: usize,
    },
}

impl From<Commands> for Command {
    fn from(c: Commands) -> Self {
        match c {
            Commands::List => Self::List,
            Commands::Show { name } => Self::Show { name },
            Commands::Run { name } => Self::Run { name },
            Commands::RunAll => Self::RunAll,
            Commands::Find { filter, project, sort, skip, limit } => {
                Self::Find { filter_json: filter, project, sort, skip, limit }
            }
            Commands::Aggregate { pipeline } => Self::Aggregate { pipeline_json: pipeline },
            Commands::Page { page } => Self::Page { page },
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = AppConfig {
        fixtures: cli.fixtures,
        collection: cli.collection,
        log_dir: cli.log_dir,
        log_level: cli.log_level,
        page_size: cli.page_size,
    };
    let resolved = AppConfig::load(cli.config.as_deref(), overrides)?;
    let cfg = resolved.config;
    match &cfg.log_dir {
        Some(dir) => logger::configure_logging(Some(dir), cfg.log_level.as_deref(), None)?,
        None => logger::init_console(Some(cfg.log_level.as_deref().unwrap_or("warn")))?,
    }
    for w in &resolved.warnings {
        log::warn!("{w}");
    }
    let settings = Settings::from_config(&cfg, cli.format.into())?;
    let engine = Engine::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    prog_cli::run_with(&engine, &settings, cli.command.into(), &mut out)
}
