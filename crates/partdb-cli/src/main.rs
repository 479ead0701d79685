use anyhow::Result;
use clap::{ArgGroup, Parser};
use partdb_core::PartId;
use partdb_embed::Config;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "partdb", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/partdb/partdb.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Create the database, or bring an existing one up to date
    Init,

    /// Add a location, and optionally a part stored there
    ///
    /// Adding a location that already exists is not an error. New parts have
    /// no embedding until `partdb update-embeddings` runs; they are found by
    /// `partdb search --full-text` straight away.
    Add {
        /// Location name (a bin, drawer, box...)
        location: String,

        /// Description of a part to store at the location
        description: Option<String>,
    },

    /// Delete a part, or an empty location
    ///
    /// A location that still holds parts cannot be deleted; move or delete
    /// the parts first.
    #[command(group(ArgGroup::new("target").required(true).args(["location", "id"])))]
    Delete {
        /// Name of the location to delete
        #[arg(long)]
        location: Option<String>,

        /// Id of the part to delete
        #[arg(long)]
        id: Option<PartId>,
    },

    /// List parts, optionally at one location, or list locations
    List {
        /// List locations instead of parts
        #[arg(long)]
        locations: bool,

        /// Only list parts at this location
        location: Option<String>,
    },

    /// Move a part to another existing location
    Move {
        /// Id of the part
        id: PartId,

        /// Destination location
        location: String,
    },

    /// Replace a part's description
    ///
    /// The full-text index follows immediately. The part's embedding becomes
    /// stale until the next `partdb update-embeddings`.
    Update {
        /// Id of the part
        id: PartId,

        /// New description
        description: String,
    },

    /// Search parts by description
    ///
    /// Semantic search (the default) embeds the query and ranks parts by
    /// cosine similarity; `dist` is the cosine distance. Parts edited since
    /// the last `update-embeddings` are ranked by their previous description.
    ///
    /// Full-text search matches any query word against the descriptions and
    /// needs no embedding provider.
    ///
    /// Each hit shows the nearest empty locations before and after its own.
    Search {
        /// Use full-text search instead of semantic search
        #[arg(long)]
        full_text: bool,

        /// Maximum number of results (default from config: search_limit)
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// What to look for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Compute embeddings for new and edited parts
    ///
    /// Parts are embedded in batches, one provider request per batch. A
    /// failed batch is reported and skipped; the others are still stored.
    /// Running it again only picks up what is still missing or stale.
    /// Ctrl-C stops before the next batch.
    #[command(alias = "update_embeddings")]
    UpdateEmbeddings {
        /// Parts per provider request (default from config: batch_size)
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        batch_size: Option<usize>,
    },

    /// Show part, location, and embedding counts
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show the config file path
    Path,
    /// Create the config file with commented defaults
    Init,
    /// Print an example config file
    Example,
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(db: Option<PathBuf>) -> Result<Config> {
    match db {
        Some(path) => Config::load_with_db_path(path),
        None => Config::load(),
    }
}

fn run_config(action: ConfigAction, config: Result<Config>) -> Result<()> {
    match action {
        ConfigAction::Show => commands::config::show_config(&config?),
        ConfigAction::Path => commands::config::show_path(),
        ConfigAction::Init => commands::config::init_config(),
        ConfigAction::Example => commands::config::show_example(),
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match command {
        Commands::Init => commands::init::run_init(&config),
        Commands::Add {
            location,
            description,
        } => commands::add::run_add(&config, &location, description.as_deref()),
        Commands::Delete { location, id } => {
            commands::delete::run_delete(&config, location.as_deref(), id)
        }
        Commands::List {
            locations,
            location,
        } => commands::list::run_list(&config, locations, location.as_deref()),
        Commands::Move { id, location } => commands::update::run_move(&config, id, &location),
        Commands::Update { id, description } => {
            commands::update::run_update(&config, id, &description)
        }
        Commands::Search {
            full_text,
            limit,
            json,
            query,
        } => {
            let options = commands::search::SearchOptions {
                full_text,
                limit: limit.unwrap_or(config.search_limit),
                json,
            };
            commands::search::run_search(&config, &query.join(" "), &options).await
        }
        Commands::UpdateEmbeddings { batch_size } => {
            commands::embeddings::run_update_embeddings(&config, batch_size).await
        }
        Commands::Status => commands::status::show_status(&config),
        Commands::Config { action } => run_config(action, Ok(config)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.db);
    init_logging(config.as_ref().map_or("warn", |c| c.log_level.as_str()));

    match cli.command {
        // Config commands must work even when the config does not load.
        Commands::Config { action } => run_config(action, config),
        command => run(command, config?).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_delete_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["partdb", "delete"]).is_err());
        assert!(Cli::try_parse_from(["partdb", "delete", "--location", "a1", "--id", "3"]).is_err());
        let cli = Cli::try_parse_from(["partdb", "delete", "--id", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Delete { id: Some(id), location: None } if id == PartId::new(3)
        ));
    }

    #[test]
    fn test_search_joins_words() {
        let cli = Cli::try_parse_from(["partdb", "search", "--full-text", "red", "resistor"]).unwrap();
        match cli.command {
            Commands::Search {
                full_text, query, ..
            } => {
                assert!(full_text);
                assert_eq!(query.join(" "), "red resistor");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_update_embeddings_alias() {
        let cli = Cli::try_parse_from(["partdb", "update_embeddings", "--batch-size", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::UpdateEmbeddings {
                batch_size: Some(4)
            }
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(Cli::try_parse_from(["partdb", "update-embeddings", "--batch-size", "0"]).is_err());
        let cli = Cli::try_parse_from(["partdb", "update-embeddings", "--batch-size", "1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::UpdateEmbeddings {
                batch_size: Some(1)
            }
        ));
    }

    #[test]
    fn test_global_db_flag() {
        let cli = Cli::try_parse_from(["partdb", "status", "--db", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
    }
}
