use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use biomodels_cache::api::{BiomodelsClient, BiomodelsHttpClient};
use biomodels_cache::app::App;
use biomodels_cache::cache::CacheStore;
use biomodels_cache::domain::{DateRange, ModelId, RawRecord, SearchFilters};
use biomodels_cache::error::BiomodelsError;
use biomodels_cache::output::JsonOutput;

#[derive(Parser)]
#[command(name = "biomodels-cache")]
#[command(about = "Local cache for BioModels model metadata with offline search")]
#[command(version, author)]
struct Cli {
    /// Directory holding the cache file
    #[arg(long, global = true, default_value = "./cache")]
    cache_dir: Utf8PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create an empty cache file if none exists")]
    Init,
    #[command(about = "Fetch the full model list into the cache")]
    Populate,
    #[command(about = "Show a model, fetching it from BioModels on a cache miss")]
    Fetch(FetchArgs),
    #[command(about = "Search cached models by text and filters")]
    Search(SearchArgs),
    #[command(about = "Export the cache, or an explicit id list, to a JSON file")]
    Export(ExportArgs),
    #[command(about = "Import a JSON export")]
    Import(ImportArgs),
    #[command(about = "Download a model's primary file")]
    Download(DownloadArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Numeric or full model id, e.g. 1 or BIOMD0000000001
    id: String,
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text query; empty matches every cached model
    #[arg(default_value = "")]
    query: String,

    /// Match models with any of these authors
    #[arg(long = "author")]
    authors: Vec<String>,

    /// Match models published in any of these journals
    #[arg(long = "journal")]
    journals: Vec<String>,

    /// Start of the publication date range (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// End of the publication date range (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<String>,
}

#[derive(Args)]
struct ExportArgs {
    path: Utf8PathBuf,

    /// Comma-separated model ids; exports only these instead of the cache
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,
}

#[derive(Args)]
struct ImportArgs {
    path: Utf8PathBuf,

    /// Read an id-keyed model export instead of replacing the cache
    #[arg(long)]
    models: bool,
}

#[derive(Args)]
struct DownloadArgs {
    id: String,
    destination: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<BiomodelsError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BiomodelsError) -> u8 {
    match error {
        BiomodelsError::ModelNotFound(_) | BiomodelsError::ImportFileNotFound(_) => 2,
        BiomodelsError::Http(_) | BiomodelsError::Status { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = CacheStore::new(&cli.cache_dir).into_diagnostic()?;

    match cli.command {
        Commands::Init => {
            let outcome = InitOutcome {
                cache_file: store.cache_file().to_string(),
                models: store.len(),
            };
            JsonOutput::print_json(&outcome).into_diagnostic()
        }
        Commands::Populate => {
            let client = BiomodelsHttpClient::new().into_diagnostic()?;
            let mut app = App::new(store, client);
            let mut report = |done: usize, total: usize| {
                eprint!("Progress: {done}/{total} models processed\r");
            };
            let progress: &mut dyn FnMut(usize, usize) = &mut report;
            let outcome = app.populate(Some(progress)).into_diagnostic()?;
            eprintln!();
            JsonOutput::print_populate(&outcome).into_diagnostic()
        }
        Commands::Fetch(args) => {
            let client = BiomodelsHttpClient::new().into_diagnostic()?;
            let mut app = App::new(store, client);
            match app.get_model(&args.id).into_diagnostic()? {
                Some(record) => JsonOutput::print_record(&record).into_diagnostic(),
                None => Err(BiomodelsError::ModelNotFound(args.id)).into_diagnostic(),
            }
        }
        Commands::Search(args) => {
            let app = App::new(store, NopClient);
            let filters = build_filters(&args);
            let results = app.search(&args.query, filters.as_ref()).into_diagnostic()?;
            JsonOutput::print_records(&results).into_diagnostic()
        }
        Commands::Export(args) => {
            if args.ids.is_empty() {
                let app = App::new(store, NopClient);
                app.export_cache(&args.path).into_diagnostic()?;
                let outcome = CacheExportOutcome {
                    exported: app.store().len(),
                    path: args.path.to_string(),
                };
                JsonOutput::print_json(&outcome).into_diagnostic()
            } else {
                let client = BiomodelsHttpClient::new().into_diagnostic()?;
                let mut app = App::new(store, client);
                let outcome = app.export_models(&args.ids, &args.path).into_diagnostic()?;
                JsonOutput::print_export(&outcome).into_diagnostic()
            }
        }
        Commands::Import(args) => {
            let mut app = App::new(store, NopClient);
            if args.models {
                let import = app.import_models(&args.path).into_diagnostic()?;
                JsonOutput::print_import(&import).into_diagnostic()
            } else {
                app.import_cache(&args.path).into_diagnostic()?;
                let outcome = CacheImportOutcome {
                    imported: app.store().len(),
                    path: args.path.to_string(),
                };
                JsonOutput::print_json(&outcome).into_diagnostic()
            }
        }
        Commands::Download(args) => {
            let client = BiomodelsHttpClient::new().into_diagnostic()?;
            let app = App::new(store, client);
            let downloaded = app
                .download_model(&args.id, &args.destination)
                .into_diagnostic()?;
            let outcome = DownloadOutcome {
                model_id: args.id,
                destination: args.destination.display().to_string(),
                downloaded,
            };
            JsonOutput::print_json(&outcome).into_diagnostic()?;
            if downloaded {
                Ok(())
            } else {
                Err(BiomodelsError::Http("model download failed".to_string()))
                    .into_diagnostic()
            }
        }
    }
}

fn build_filters(args: &SearchArgs) -> Option<SearchFilters> {
    let date_range = match (&args.from, &args.to) {
        (Some(start), Some(end)) => Some(DateRange {
            start: start.clone(),
            end: end.clone(),
        }),
        _ => None,
    };
    if args.authors.is_empty() && args.journals.is_empty() && date_range.is_none() {
        return None;
    }
    Some(SearchFilters {
        authors: (!args.authors.is_empty()).then(|| args.authors.clone()),
        journals: (!args.journals.is_empty()).then(|| args.journals.clone()),
        date_range,
    })
}

#[derive(Serialize)]
struct InitOutcome {
    cache_file: String,
    models: usize,
}

#[derive(Serialize)]
struct CacheExportOutcome {
    exported: usize,
    path: String,
}

#[derive(Serialize)]
struct CacheImportOutcome {
    imported: usize,
    path: String,
}

#[derive(Serialize)]
struct DownloadOutcome {
    model_id: String,
    destination: String,
    downloaded: bool,
}

/// Placeholder client for commands that never touch the network.
#[derive(Clone, Copy)]
struct NopClient;

impl BiomodelsClient for NopClient {
    fn fetch_model(&self, _id: &ModelId) -> Result<RawRecord, BiomodelsError> {
        Err(BiomodelsError::Http(
            "BioModels client not configured".to_string(),
        ))
    }

    fn fetch_models(&self) -> Result<Vec<RawRecord>, BiomodelsError> {
        Err(BiomodelsError::Http(
            "BioModels client not configured".to_string(),
        ))
    }

    fn download_model(&self, _id: &ModelId, _destination: &std::path::Path) -> bool {
        false
    }
}
