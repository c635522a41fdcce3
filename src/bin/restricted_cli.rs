use clap::{Args, Parser, Subcommand};
use log::{error, info};
use restricted_api::catalog::SearchQuery;
use restricted_api::logging::config::LogConfig;
use restricted_api::logging::LoggingSystem;
use restricted_api::memory::CatalogFixture;
use restricted_api::{load_config, LogMailer, RequestContext, RestrictedApi};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the JSON catalog fixture
    #[arg(short, long)]
    fixture: PathBuf,

    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the TOML logging configuration file
    #[arg(long)]
    log_config: Option<PathBuf>,

    /// Per-feature log level as FEATURE=LEVEL (for example redaction=DEBUG)
    #[arg(long = "feature-level", value_name = "FEATURE=LEVEL")]
    feature_levels: Vec<String>,

    /// Caller: a user id, a user name or a network address
    #[arg(short, long)]
    user: Option<String>,

    /// Endpoint the request arrived on (for example dataset.search)
    #[arg(long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SearchArgs {
    /// Free text query
    #[arg(short, long)]
    q: Option<String>,
    /// Maximum number of results
    #[arg(long)]
    rows: Option<usize>,
    /// Offset of the first result
    #[arg(long)]
    start: Option<usize>,
}

impl From<SearchArgs> for SearchQuery {
    fn from(args: SearchArgs) -> Self {
        SearchQuery {
            q: args.q,
            rows: args.rows,
            start: args.start,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the caller may view a resource
    CheckAccess {
        #[arg(long)]
        package_id: Option<String>,
        #[arg(long)]
        resource_id: Option<String>,
    },
    /// Show a package with restricted resources redacted
    PackageShow {
        id: String,
        /// Drop the resource list
        #[arg(long)]
        omit_resources: bool,
        /// Project resources to their always-safe fields
        #[arg(long)]
        lite: bool,
    },
    /// Search resources, redacting restricted results
    ResourceSearch(SearchArgs),
    /// Search packages, redacting restricted resources
    PackageSearch(SearchArgs),
    /// List the views of a resource
    ViewList {
        #[arg(long)]
        resource_id: Option<String>,
    },
    /// Ask a resource's maintainer for access
    RequestAccess {
        #[arg(long)]
        resource_id: Option<String>,
        #[arg(long)]
        package_id: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut log_config = match &cli.log_config {
        Some(path) => LogConfig::from_file(path)?,
        None => LogConfig::from_env()?,
    };
    for override_spec in &cli.feature_levels {
        let (feature, level) = override_spec
            .split_once('=')
            .ok_or_else(|| format!("expected FEATURE=LEVEL, got '{override_spec}'"))?;
        log_config.set_feature_level(feature.trim(), level.trim())?;
    }
    LoggingSystem::init_with_config(log_config).await?;

    let config = load_config(cli.config.as_deref())?;
    info!("Loading catalog fixture from: {}", cli.fixture.display());
    let (catalog, directory) = CatalogFixture::from_file(&cli.fixture)?.into_parts();
    let directory = Arc::new(directory);
    let api = RestrictedApi::new(
        config,
        Arc::new(catalog),
        directory.clone(),
        directory,
        Arc::new(LogMailer),
    );

    let mut ctx = RequestContext::new();
    ctx.user = cli.user;
    ctx.endpoint = cli.endpoint;

    let result = match cli.command {
        Commands::CheckAccess {
            package_id,
            resource_id,
        } => api
            .check_access(&mut ctx, package_id.as_deref(), resource_id.as_deref())
            .map(|verdict| print_json(&verdict)),
        Commands::PackageShow {
            id,
            omit_resources,
            lite,
        } => {
            ctx.omit_resources = omit_resources;
            ctx.lite_resources = lite;
            api.package_show(&mut ctx, &id).map(|package| print_json(&package))
        }
        Commands::ResourceSearch(args) => api
            .resource_search(&mut ctx, &args.into())
            .map(|response| print_json(&response)),
        Commands::PackageSearch(args) => api
            .package_search(&mut ctx, &args.into())
            .map(|response| print_json(&response)),
        Commands::ViewList { resource_id } => api
            .resource_view_list(&mut ctx, resource_id.as_deref())
            .map(|views| print_json(&views)),
        Commands::RequestAccess {
            resource_id,
            package_id,
        } => api
            .request_access(&mut ctx, resource_id.as_deref(), package_id.as_deref())
            .map(|()| print_json(&serde_json::json!({ "success": true }))),
    };

    match result {
        Ok(printed) => printed,
        Err(e) => {
            error!("[{}] request failed: {}", ctx.request_id, e);
            Err(e.into())
        }
    }
}
