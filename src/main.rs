use anyhow::{Context, Result};
use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use clap::{Parser, Subcommand};
use music_catalog::config::{AppConfig, CliConfig, FileConfig};
use music_catalog::ingestion::{AlbumRelease, SingleSong, SongRating};
use music_catalog::{IngestionService, QueryService, SqliteCatalogStore, YearRange};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version)]
struct CliArgs {
    /// Path to the SQLite catalog database file.
    #[clap(long, global = true, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Tracing filter used when LOG_LEVEL is not set.
    #[clap(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deletes every entity of the catalog.
    Reset,

    /// Loads singles from a JSON array and prints the rejected ones.
    LoadSingles { json: PathBuf },

    /// Loads albums from a JSON array and prints the rejected ones.
    LoadAlbums { json: PathBuf },

    /// Loads users from a JSON array of usernames and prints the taken ones.
    LoadUsers { json: PathBuf },

    /// Loads song ratings from a JSON array and prints the rejected ones.
    LoadRatings { json: PathBuf },

    /// Artists with the most singles released between two years.
    ProlificArtists { n: usize, start: i32, end: i32 },

    /// Artists whose last single came out in the given year.
    LastSingle { year: i32 },

    /// Genres with the most songs.
    TopGenres { n: usize },

    /// Artists with at least one album and one single.
    AlbumAndSingleArtists,

    /// Songs with the most ratings dated between two years.
    MostRatedSongs { start: i32, end: i32, n: usize },

    /// Users who rated the most songs between two years.
    MostEngagedUsers { start: i32, end: i32, n: usize },

    /// Prints how many rows each entity has.
    Stats,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse input file: {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Command, store: SqliteCatalogStore) -> Result<()> {
    let ingestion = IngestionService::new(store.clone());
    let queries = QueryService::new(store.clone());

    match command {
        Command::Reset => store.clear_all()?,
        Command::LoadSingles { json } => {
            let singles: Vec<SingleSong> = read_json(&json)?;
            print_json(&ingestion.load_single_songs(&singles)?)?;
        }
        Command::LoadAlbums { json } => {
            let albums: Vec<AlbumRelease> = read_json(&json)?;
            print_json(&ingestion.load_albums(&albums)?)?;
        }
        Command::LoadUsers { json } => {
            let usernames: Vec<String> = read_json(&json)?;
            print_json(&ingestion.load_users(&usernames)?)?;
        }
        Command::LoadRatings { json } => {
            let ratings: Vec<SongRating> = read_json(&json)?;
            print_json(&ingestion.load_song_ratings(&ratings)?)?;
        }
        Command::ProlificArtists { n, start, end } => {
            print_json(&queries.most_prolific_artists(n, YearRange::new(start, end))?)?;
        }
        Command::LastSingle { year } => {
            print_json(&queries.artists_last_single_in_year(year)?)?;
        }
        Command::TopGenres { n } => print_json(&queries.top_song_genres(n)?)?,
        Command::AlbumAndSingleArtists => print_json(&queries.album_and_single_artists()?)?,
        Command::MostRatedSongs { start, end, n } => {
            print_json(&queries.most_rated_songs(YearRange::new(start, end), n)?)?;
        }
        Command::MostEngagedUsers { start, end, n } => {
            print_json(&queries.most_engaged_users(YearRange::new(start, end), n)?)?;
        }
        Command::Stats => print_json(&store.counts()?)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db.clone(),
        log_level: cli_args.log_level.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let env_filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .try_init()
        .context("Failed to initialize logging")?;

    info!("Using catalog database {:?}", config.db_path);
    let store = SqliteCatalogStore::new(&config.db_path)?;
    run(cli_args.command, store)
}
