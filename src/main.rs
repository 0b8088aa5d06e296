use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use chopchoprss::catalog::{self, Catalog, CatalogError, NewFeed, NewItem, NewPodcast};
use chopchoprss::config::{self, Config, CATALOG_FILE, SETTINGS_FILE};
use chopchoprss::feed::{self, ScanError, ScanReport};
use chopchoprss::server;
use chopchoprss::util::{trim_trailing_slash, validate_base_url, UrlError};

#[derive(Parser, Debug)]
#[command(
    name = "chopchoprss",
    about = "ChopChopRSS is a simple CLI tool for managing RSS feeds",
    long_about = "A CLI tool that lets you create and manage multiple RSS feeds and \
                  directory-backed podcasts, and serve them over HTTP."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new RSS feed
    CreateFeed(CreateFeedArgs),
    /// Create a new entry in a feed
    CreateEntry(CreateEntryArgs),
    /// Delete an entry from a feed by its index
    DeleteEntry {
        /// Feed name
        #[arg(short, long)]
        feed: String,
        /// Entry index, as shown by list-entries
        #[arg(short, long)]
        index: usize,
    },
    /// Delete a feed and all of its entries
    DeleteFeed {
        /// Feed name
        #[arg(short, long)]
        name: String,
    },
    /// List all feeds
    ListFeeds,
    /// List the entries of a feed
    ListEntries {
        /// Feed name
        #[arg(short, long)]
        feed: String,
    },
    /// Create a podcast from a directory of audio files
    CreatePodcast(CreatePodcastArgs),
    /// Rescan a podcast's audio directory
    RefreshPodcast {
        /// Podcast name
        #[arg(short, long)]
        name: String,
    },
    /// Delete a podcast (audio files are left alone)
    DeletePodcast {
        /// Podcast name
        #[arg(short, long)]
        name: String,
    },
    /// List all podcasts
    ListPodcasts,
    /// Start the RSS feed server
    Serve {
        /// Server port (defaults to config.toml, then 8090)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args, Debug)]
struct CreateFeedArgs {
    /// Feed name
    #[arg(short, long)]
    name: String,
    /// Feed title
    #[arg(short, long)]
    title: String,
    /// Feed description
    #[arg(short, long, default_value = "")]
    description: String,
    /// Feed link
    #[arg(short, long, default_value = "")]
    link: String,
    /// Feed author
    #[arg(short, long, default_value = "")]
    author: String,
    /// Feed email
    #[arg(short, long, default_value = "")]
    email: String,
}

#[derive(Args, Debug)]
struct CreateEntryArgs {
    /// Feed name
    #[arg(short, long)]
    feed: String,
    /// Entry title
    #[arg(short, long)]
    title: String,
    /// Entry content
    #[arg(short, long)]
    content: String,
    /// Entry link
    #[arg(short, long, default_value = "")]
    link: String,
    /// Entry image URL
    #[arg(short, long)]
    image: Option<String>,
}

#[derive(Args, Debug)]
struct CreatePodcastArgs {
    /// Podcast name
    #[arg(short, long)]
    name: String,
    /// Podcast title
    #[arg(short, long)]
    title: String,
    /// Directory holding the audio files
    #[arg(short = 'a', long)]
    audio_dir: PathBuf,
    /// Public base URL the podcast is served under
    #[arg(short = 'b', long)]
    base_url: String,
    /// Podcast description
    #[arg(short, long, default_value = "")]
    description: String,
    /// Podcast website link
    #[arg(short, long, default_value = "")]
    link: String,
    /// Podcast author
    #[arg(long, default_value = "")]
    author: String,
    /// Owner email
    #[arg(short, long, default_value = "")]
    email: String,
    /// Cover image URL
    #[arg(short, long)]
    image: Option<String>,
    /// iTunes category
    #[arg(short, long)]
    category: Option<String>,
    /// Language code
    #[arg(long, default_value = "en")]
    language: String,
    /// Copyright notice
    #[arg(long)]
    copyright: Option<String>,
    /// Mark the podcast as explicit
    #[arg(long)]
    explicit: bool,
}

/// Data directory and the catalog file inside it.
struct Workspace {
    dir: PathBuf,
    catalog_path: PathBuf,
}

impl Workspace {
    fn open() -> Result<Self> {
        let dir = config::data_dir()?;
        if !dir.exists() {
            std::fs::create_dir_all(&dir).with_context(|| {
                format!("Failed to create config directory: {}", dir.display())
            })?;
        }

        // User-only access on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            if let Err(e) = std::fs::set_permissions(&dir, perms) {
                tracing::warn!(
                    path = %dir.display(),
                    error = %e,
                    "Failed to set config directory permissions to 0700"
                );
            }
        }

        let catalog_path = dir.join(CATALOG_FILE);
        Ok(Self { dir, catalog_path })
    }

    fn load(&self) -> Result<Catalog> {
        catalog::load(&self.catalog_path).context("Failed to load catalog")
    }

    fn save(&self, catalog: &Catalog) -> Result<()> {
        catalog::save(catalog, &self.catalog_path).context("Failed to save catalog")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chopchoprss=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let workspace = Workspace::open()?;

    match run(cli.command, &workspace).await {
        Ok(()) => Ok(()),
        Err(e) if is_user_error(&e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}

/// Failures the user can fix by changing their input. These get a one-line
/// message instead of an error chain.
fn is_user_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CatalogError>().is_some()
        || err.downcast_ref::<ScanError>().is_some()
        || err.downcast_ref::<UrlError>().is_some()
}

async fn run(command: Command, workspace: &Workspace) -> Result<()> {
    let mut catalog = workspace.load()?;

    match command {
        Command::CreateFeed(args) => {
            catalog.create_feed(
                &args.name,
                NewFeed {
                    title: args.title,
                    description: args.description,
                    link: args.link,
                    author: args.author,
                    email: args.email,
                },
            )?;
            workspace.save(&catalog)?;
            println!("Feed '{}' created successfully", args.name);
        }
        Command::CreateEntry(args) => {
            catalog.add_item(
                &args.feed,
                NewItem {
                    title: args.title.clone(),
                    content: args.content,
                    link: args.link,
                    image_url: args.image,
                },
            )?;
            workspace.save(&catalog)?;
            println!("Entry '{}' added to feed '{}'", args.title, args.feed);
        }
        Command::DeleteEntry { feed, index } => {
            let removed = catalog.delete_item(&feed, index)?;
            workspace.save(&catalog)?;
            println!("Entry '{}' deleted from feed '{}'", removed.title, feed);
        }
        Command::DeleteFeed { name } => {
            catalog.delete_feed(&name)?;
            workspace.save(&catalog)?;
            println!("Feed '{name}' deleted successfully");
        }
        Command::ListFeeds => list_feeds(&catalog),
        Command::ListEntries { feed } => list_entries(&catalog, &feed)?,
        Command::CreatePodcast(args) => create_podcast(&mut catalog, workspace, args)?,
        Command::RefreshPodcast { name } => {
            let podcast = catalog.podcast(&name)?;
            let report = feed::scan(&podcast.audio_dir, &podcast.base_url)?;
            report_skips(&report);
            let count = report.episodes.len();
            catalog.replace_episodes(&name, report.episodes)?;
            workspace.save(&catalog)?;
            println!("Podcast '{name}' refreshed: {count} episodes");
        }
        Command::DeletePodcast { name } => {
            catalog.delete_podcast(&name)?;
            workspace.save(&catalog)?;
            println!("Podcast '{name}' deleted successfully");
        }
        Command::ListPodcasts => list_podcasts(&catalog),
        Command::Serve { port } => serve(catalog, &workspace.dir, port).await?,
    }

    Ok(())
}

fn create_podcast(
    catalog: &mut Catalog,
    workspace: &Workspace,
    args: CreatePodcastArgs,
) -> Result<()> {
    if catalog.podcast(&args.name).is_ok() {
        return Err(CatalogError::PodcastExists(args.name).into());
    }
    validate_base_url(&args.base_url)?;

    // Episode paths and the stored directory share one canonical prefix.
    let audio_dir = feed::resolve_audio_dir(&args.audio_dir);

    // Scan before touching the catalog so a bad directory changes nothing.
    let report = feed::scan(&audio_dir, &args.base_url)?;
    report_skips(&report);
    let count = report.episodes.len();

    catalog.create_podcast(
        &args.name,
        NewPodcast {
            title: args.title,
            description: args.description,
            link: args.link,
            author: args.author,
            email: args.email,
            image_url: args.image,
            category: args.category,
            language: args.language,
            copyright: args.copyright,
            explicit: args.explicit,
            base_url: trim_trailing_slash(&args.base_url).to_string(),
            audio_dir,
        },
        report.episodes,
    )?;
    workspace.save(catalog)?;
    println!("Podcast '{}' created with {count} episodes", args.name);
    Ok(())
}

fn report_skips(report: &ScanReport) {
    for skipped in &report.skipped {
        eprintln!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }
}

fn list_feeds(catalog: &Catalog) {
    if catalog.feeds.is_empty() {
        println!("No feeds found");
        return;
    }

    println!("Available feeds:");
    for (name, feed) in catalog.feeds() {
        println!("- {}: {} ({} items)", name, feed.title, feed.items.len());
    }
}

fn list_entries(catalog: &Catalog, feed_name: &str) -> Result<()> {
    let feed = catalog.feed(feed_name)?;
    if feed.items.is_empty() {
        println!("Feed '{feed_name}' has no entries");
        return Ok(());
    }

    println!("Entries in '{feed_name}':");
    for (index, item) in feed.items.iter().enumerate() {
        println!(
            "[{index}] {} ({})",
            item.title,
            item.created.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn list_podcasts(catalog: &Catalog) {
    if catalog.podcasts.is_empty() {
        println!("No podcasts found");
        return;
    }

    println!("Available podcasts:");
    for (name, podcast) in catalog.podcasts() {
        println!(
            "- {}: {} ({} episodes)",
            name,
            podcast.title,
            podcast.episodes.len()
        );
    }
}

async fn serve(catalog: Catalog, data_dir: &Path, port: Option<u16>) -> Result<()> {
    let config =
        Config::load(&data_dir.join(SETTINGS_FILE)).context("Failed to load config.toml")?;
    let port = port.unwrap_or(config.port);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.bind_address))?;

    let origin = config.public_origin(port);
    println!("Starting server on {origin}");
    if !catalog.feeds.is_empty() {
        println!("Available feeds:");
        for (name, _) in catalog.feeds() {
            println!("- {origin}/{name}");
        }
    }
    if !catalog.podcasts.is_empty() {
        println!("Available podcasts:");
        for (name, _) in catalog.podcasts() {
            println!("- {origin}/{name}");
        }
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    server::serve(listener, Arc::new(RwLock::new(catalog)))
        .await
        .context("Server error")?;
    Ok(())
}
