use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use infopush::config::Config;
use infopush::discovery::{DiscoveryRelay, HttpDiscoveryRelay, SourceDiscovery};
use infopush::feed::{parse_feed_document, DEFAULT_ITEM_LIMIT};
use infopush::link::{is_http_url, HttpLinkResolver, LinkPreparer, PreparedLink};
use infopush::source::{
    GithubSearchProvider, HttpFeedFetcher, SourceDescriptor, SourceProbe, SourceType,
};
use infopush::util::{strip_control_chars, truncate_to_width};

/// Column width used for item titles in `collect` output.
const TITLE_WIDTH: usize = 60;

/// Get the config directory path (~/.config/infopush/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("infopush"))
}

#[derive(Parser, Debug)]
#[command(
    name = "infopush",
    about = "Probe, collect and discover information sources"
)]
struct Cli {
    /// Config file (default: ~/.config/infopush/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct SourceArgs {
    /// Source URL
    url: String,

    /// Declared source type: rss, github, social, or custom
    #[arg(long = "type", default_value = "custom")]
    source_type: SourceType,

    /// Source name
    #[arg(long)]
    name: Option<String>,

    /// Source tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl SourceArgs {
    fn descriptor(&self) -> SourceDescriptor {
        let mut d = SourceDescriptor::new(self.url.clone())
            .with_type(self.source_type)
            .with_tags(self.tags.iter().cloned());
        if let Some(name) = &self.name {
            d = d.with_name(name.clone());
        }
        d
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize and resolve a link, printing the result as JSON
    Link { url: String },

    /// Prepare a link and open it in the default browser
    Open { url: String },

    /// Check that a source currently yields items
    Probe(SourceArgs),

    /// Fetch items from one or more sources
    Collect {
        /// Source URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Declared type applied to every URL
        #[arg(long = "type", default_value = "custom")]
        source_type: SourceType,

        /// Tag applied to every URL (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Maximum items per source
        #[arg(long, default_value_t = DEFAULT_ITEM_LIMIT)]
        limit: usize,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Recommend sources for a query
    Discover {
        query: String,

        /// Number of recommendations (1-50)
        #[arg(long)]
        limit: Option<usize>,

        /// Probe each recommendation and include the outcome
        #[arg(long)]
        probe: bool,
    },

    /// Parse a local RSS/Atom document ("-" for stdin)
    Parse {
        file: PathBuf,

        #[arg(long, default_value_t = DEFAULT_ITEM_LIMIT)]
        limit: usize,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok(config.apply_env())
}

fn http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()
        .context("Failed to build HTTP client")
}

fn source_probe(config: &Config, client: &reqwest::Client) -> SourceProbe {
    let fetcher = HttpFeedFetcher::new(client.clone()).with_timeout(config.probe_timeout());
    let github = GithubSearchProvider::new(client.clone(), config.github_api_base.clone())
        .with_token(config.github_token())
        .with_timeout(config.probe_timeout());
    SourceProbe::new(Arc::new(fetcher)).with_trending(Arc::new(github))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

async fn prepare_link(config: &Config, url: &str) -> Result<PreparedLink> {
    let resolver = HttpLinkResolver::new(&config.user_agent).context("Failed to build resolver")?;
    Ok(LinkPreparer::new(Arc::new(resolver))
        .with_timeout(config.link_timeout())
        .prepare(url)
        .await)
}

fn read_document(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(config = ?config, "Configuration ready");

    match cli.command {
        Command::Link { url } => {
            let prepared = prepare_link(&config, &url).await?;
            print_json(&prepared)?;
            if matches!(prepared, PreparedLink::Invalid { .. }) {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Open { url } => {
            let prepared = prepare_link(&config, &url).await?;
            match prepared.target() {
                // Only http(s) targets ever reach the platform opener.
                Some(target) if is_http_url(target) => {
                    open::that(target).with_context(|| format!("Failed to open {target}"))?;
                    println!("Opened {target}");
                }
                _ => {
                    eprintln!("Error: invalid link: {url}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        Command::Probe(args) => {
            let client = http_client(&config)?;
            let outcome = source_probe(&config, &client).probe(&args.descriptor()).await;
            print_json(&outcome)?;
            if !outcome.ok {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Collect {
            urls,
            source_type,
            tags,
            limit,
            json,
        } => {
            let client = http_client(&config)?;
            let sources: Vec<SourceDescriptor> = urls
                .iter()
                .map(|u| {
                    SourceDescriptor::new(u.clone())
                        .with_type(source_type)
                        .with_tags(tags.iter().cloned())
                })
                .collect();
            let results = source_probe(&config, &client)
                .collect_all(&sources, limit)
                .await;

            let mut failed = false;
            if json {
                let report: Vec<serde_json::Value> = results
                    .iter()
                    .map(|r| match &r.result {
                        Ok(items) => serde_json::json!({"url": r.url, "items": items}),
                        Err(e) => serde_json::json!({
                            "url": r.url,
                            "error_code": e.code(),
                            "detail": e.detail(),
                            "message": e.message(),
                        }),
                    })
                    .collect();
                failed = results.iter().any(|r| r.result.is_err());
                print_json(&report)?;
            } else {
                for r in &results {
                    println!("# {}", r.url);
                    match &r.result {
                        Ok(items) => {
                            for item in items {
                                let title = strip_control_chars(&item.title);
                                println!(
                                    "{}  {}  {}",
                                    item.published_at.format("%Y-%m-%d"),
                                    truncate_to_width(&title, TITLE_WIDTH),
                                    item.url
                                );
                            }
                        }
                        Err(e) => {
                            failed = true;
                            println!("  {} ({})", e.message(), e.detail());
                            if let Some(hint) = e.hint() {
                                println!("  {hint}");
                            }
                        }
                    }
                }
            }
            if failed {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Discover {
            query,
            limit,
            probe,
        } => {
            let client = http_client(&config)?;
            let relay: Option<Arc<dyn DiscoveryRelay>> = config.relay_url().map(|url| {
                Arc::new(
                    HttpDiscoveryRelay::new(client.clone(), url)
                        .with_timeout(config.relay_timeout()),
                ) as Arc<dyn DiscoveryRelay>
            });
            let result = SourceDiscovery::new(relay)
                .discover(&query, Some(limit.unwrap_or(config.discovery_limit())))
                .await;

            if probe {
                let prober = source_probe(&config, &client);
                let mut report = Vec::with_capacity(result.items.len());
                for candidate in &result.items {
                    let outcome = prober.probe(&candidate.to_descriptor()).await;
                    report.push(serde_json::json!({
                        "candidate": candidate,
                        "probe": outcome,
                    }));
                }
                print_json(&serde_json::json!({"mode": result.mode, "items": report}))?;
            } else {
                print_json(&result)?;
            }
        }

        Command::Parse { file, limit } => {
            let document = read_document(&file)?;
            let items = parse_feed_document(&document, limit);
            tracing::info!(items = items.len(), "Parsed document");
            print_json(&items)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
