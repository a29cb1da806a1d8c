use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

use municipal_portal::{
    DivisionInput, DivisionStore, HttpPortalApi, PageOutcome, PortalApi, PortalConfig,
    PortalSession, SqliteStorage, logging, slugify,
    core::{countries::CountryDirectory, search::DivisionSearch},
};

#[derive(Parser)]
#[command(name = "municipal-portal")]
#[command(about = "Inspect and drive the portal's active-division state")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Client storage file, overrides the configured one
    #[arg(long, value_name = "FILE")]
    storage: Option<PathBuf>,

    /// Backend base URL, overrides the configured one
    #[arg(long, value_name = "URL")]
    api: Option<String>,

    /// Bearer token of an authenticated user
    #[arg(long, env = "PORTAL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the stored current division
    Current,
    /// Store a division given as JSON
    Set {
        #[arg(value_name = "JSON")]
        division: String,
    },
    /// Forget the stored current division
    Clear,
    /// Resolve the default division URL
    Resolve,
    /// Record a page visit
    Visit { url: String },
    /// Log in and print the bearer token for `--token`
    Login {
        username: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Record a logout and clear the current division
    Logout,
    /// Decide between resuming the last page and going home
    Redirect {
        /// Home URL; resolved from the default division when omitted
        home: Option<String>,
    },
    /// Open a division page URL
    Open { url: String },
    /// List divisions bordering the active one
    Neighbors,
    /// Print the slug derived from a division name
    Slugify { name: String },
    /// Search divisions by name
    Search {
        query: String,
        #[arg(long)]
        country: Option<String>,
    },
    /// List (cached) countries, optionally filtered
    Countries { query: Option<String> },
    /// Look up and cache the anonymous IP location
    Locate,
    /// Wipe the navigation trace
    ResetNavigation,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    logging::init(args.verbose);

    if let Command::Slugify { name } = &args.command {
        println!("{}", slugify(name));
        return Ok(());
    }

    let mut config = PortalConfig::load(args.config.as_deref())?;
    if let Some(storage) = args.storage {
        config.storage_file = Some(storage);
    }
    if let Some(api) = args.api {
        config.api_base_url = api;
    }

    let storage = Arc::new(match &config.storage_file {
        Some(path) => SqliteStorage::open(path).await?,
        None => SqliteStorage::in_memory().await?,
    });
    let mut api = HttpPortalApi::new(&config.api_base_url, config.request_timeout())?;
    if let Some(token) = args.token {
        api = api.with_token(token);
    }
    let api = Arc::new(api);

    let user = match api.current_user().await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::debug!(error = %e, "continuing as anonymous");
            None
        }
    };

    let mut session = PortalSession::start(
        storage.clone(),
        api.clone(),
        config.fallback_division(),
        user,
    )
    .await;
    let store = DivisionStore::new(storage.clone());

    match args.command {
        Command::Current => match store.get_current().await {
            Some(division) => println!("{}", serde_json::to_string_pretty(&division)?),
            None => println!("No current division."),
        },
        Command::Set { division } => {
            let input: DivisionInput = serde_json::from_str(&division)?;
            let division = store.set_current(input).await;
            println!("{}", serde_json::to_string_pretty(&division)?);
        }
        Command::Clear => {
            store.clear_current().await;
            println!("Current division cleared.");
        }
        Command::Resolve => {
            let resolution = session.resolver().resolve_traced(session.user()).await;
            if args.verbose {
                for (tier, error) in &resolution.skipped {
                    println!("  skipped {tier}: {error}");
                }
                println!("  resolved by {}", resolution.tier);
            }
            println!("{}", resolution.route);
        }
        Command::Visit { url } => {
            let division = store.get_current().await;
            session.tracker().track_page_visit(&url, division.as_ref()).await?;
            println!("Visit to {url} recorded.");
        }
        Command::Login { username, password } => {
            let (token, outcome) = session.authenticate(&username, &password).await?;
            println!("token: {token}");
            println!("{} ({})", outcome.redirect.url, outcome.redirect.reason);
        }
        Command::Logout => {
            session.logout().await;
            println!("Logged out.");
        }
        Command::Redirect { home } => {
            let home = match home {
                Some(home) => home,
                None => session.home_url().await,
            };
            let redirect = session.tracker().smart_redirect_url(&home).await;
            println!("{} ({})", redirect.url, redirect.reason);
        }
        Command::Open { url } => match session.open_page(&url).await {
            PageOutcome::Show { route, division } => {
                println!("{route}: {} [{}]", division.name, division.id);
            }
            PageOutcome::Redirect { url, cause } => {
                println!("redirect to {url} ({cause:?})");
            }
        },
        Command::Neighbors => {
            let neighbors = session.neighbors().await?;
            if neighbors.is_empty() {
                println!("No neighboring divisions.");
            }
            for division in neighbors {
                println!("{}\t{}\t{}", division.id, division.name, division.slug);
            }
        }
        Command::Slugify { name } => println!("{}", slugify(&name)),
        Command::Search { query, country } => {
            let search = DivisionSearch::new(api.clone());
            match search.search(&query, country.as_deref()).await? {
                Some(results) if results.is_empty() => println!("No divisions found."),
                Some(results) => {
                    for input in results {
                        println!("{}\t{}\t{}", input.id, input.name, slugify(&input.name));
                    }
                }
                None => println!("Search superseded."),
            }
        }
        Command::Countries { query } => {
            let directory = CountryDirectory::new(storage.clone(), api.clone());
            let countries = directory.search(query.as_deref().unwrap_or_default()).await?;
            for country in countries {
                println!("{}\t{}", country.iso3, country.name);
            }
        }
        Command::Locate => {
            session.locate_anonymous().await?;
            match session.locations().get().await {
                Some(location) => println!("{}", serde_json::to_string_pretty(&location)?),
                None => println!("No anonymous location (authenticated session)."),
            }
        }
        Command::ResetNavigation => {
            session.tracker().clear_all_navigation_tracking().await?;
            println!("Navigation trace cleared.");
        }
    }

    storage.close().await?;
    Ok(())
}
