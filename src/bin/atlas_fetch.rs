use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use atlas_fetch::app::HttpApp;
use atlas_fetch::config::SettingsLoader;
use atlas_fetch::domain::ATLAS_RESOURCE;
use atlas_fetch::error::ValidatorError;
use atlas_fetch::output::JsonOutput;
use atlas_fetch::sink::TracingSink;

const EXIT_UNRESOLVED: u8 = 2;
const EXIT_UNREACHABLE: u8 = 4;

#[derive(Parser)]
#[command(name = "atlas-fetch")]
#[command(about = "Remote lookups for Atlas metadata validation")]
#[command(version, author)]
struct Cli {
    /// Settings file (defaults to ./atlas-fetch.json, then the user config directory)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve organism names to NCBI taxonomy ids")]
    Taxon(TaxonArgs),
    #[command(about = "Check that a URL can be opened")]
    CheckUrl(CheckUrlArgs),
    #[command(about = "Print the controlled vocabulary for a category")]
    Vocab(VocabArgs),
}

#[derive(Args)]
struct TaxonArgs {
    #[arg(required = true)]
    organisms: Vec<String>,
}

#[derive(Args)]
struct CheckUrlArgs {
    url: String,

    #[arg(long)]
    retries: Option<u32>,
}

#[derive(Args)]
struct VocabArgs {
    category: String,

    #[arg(long, default_value = ATLAS_RESOURCE)]
    resource: String,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(error) = report.downcast_ref::<ValidatorError>() {
                return ExitCode::from(map_exit_code(error));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &ValidatorError) -> u8 {
    match error {
        ValidatorError::UnknownCategory(_)
        | ValidatorError::InvalidUrl { .. }
        | ValidatorError::InvalidTaxonId(_) => 2,
        ValidatorError::TaxonomyHttp(_)
        | ValidatorError::TaxonomyStatus { .. }
        | ValidatorError::VocabularyHttp(_)
        | ValidatorError::VocabularyStatus { .. }
        | ValidatorError::HttpClient(_)
        | ValidatorError::Unreachable { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = SettingsLoader::resolve(cli.config.as_deref())?;
    let mut app = HttpApp::from_settings(&settings)?;
    let sink = TracingSink;

    match cli.command {
        Commands::Taxon(args) => {
            let results = args
                .organisms
                .iter()
                .map(|organism| app.resolve_taxon(organism, &sink))
                .collect::<Vec<_>>();
            JsonOutput::print_taxa(&results).into_diagnostic()?;
            if results.iter().any(|result| result.taxon_id.is_none()) {
                return Ok(ExitCode::from(EXIT_UNRESOLVED));
            }
        }
        Commands::CheckUrl(args) => {
            let result = app.check_url(&args.url, args.retries, &sink)?;
            JsonOutput::print_url_check(&result).into_diagnostic()?;
            if !result.reachable {
                return Ok(ExitCode::from(EXIT_UNREACHABLE));
            }
        }
        Commands::Vocab(args) => {
            let result = app.vocabulary(&args.category, &args.resource, &sink)?;
            JsonOutput::print_vocabulary(&result).into_diagnostic()?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
