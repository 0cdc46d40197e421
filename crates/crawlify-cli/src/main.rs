//! Crawlify CLI - crawl pages, search the web, or serve both over MCP

mod mcp;

use clap::{Parser, Subcommand};
use crawlify::screenshot::prune_expired;
use crawlify::{CrawlRequest, ErrorBody, FormatKind, SearchRequest, Settings, Tool, ToolBuilder, TOOL_LLMTXT};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Crawlify - single-page web acquisition and web search
#[derive(Parser, Debug)]
#[command(name = "crawlify")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,

    /// Outbound proxy for page fetches and the browser
    #[arg(long, global = true, env = "CRAWL_HTTP_PROXY")]
    proxy: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as MCP (Model Context Protocol) server over stdio
    Mcp,
    /// Crawl a URL and print the result as JSON
    Crawl {
        /// URL to crawl
        url: String,

        /// Format to produce (repeatable): html, markdown, summary, links, screenshot
        #[arg(long = "format", short = 'f')]
        formats: Vec<FormatKind>,

        /// HTML to Markdown converter executable
        #[arg(long, env = "HTML2MARKDOWN_PATH")]
        converter: Option<PathBuf>,
    },
    /// Search the web and print the result as JSON
    Search {
        /// Search query
        query: String,

        /// Maximum number of results (1-10)
        #[arg(long, short)]
        limit: Option<usize>,

        /// Search backend: firecrawl, brave, tavily, searxng
        #[arg(long, env = "SEARCH_BACKEND")]
        backend: Option<String>,
    },
    /// Delete screenshots older than the configured TTL
    PruneScreenshots,
}

#[tokio::main]
async fn main() {
    // Variables already set in the environment take precedence over .env
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    let mut settings = Settings::from_env();
    if cli.proxy.is_some() {
        settings.proxy_url = cli.proxy.clone();
    }

    match cli.command {
        Some(Commands::Mcp) => {
            mcp::run_server(settings).await;
        }
        Some(Commands::Crawl {
            url,
            formats,
            converter,
        }) => {
            if let Some(path) = converter {
                settings.converter_path = path;
            }
            run_crawl(&settings, url, formats).await;
        }
        Some(Commands::Search {
            query,
            limit,
            backend,
        }) => {
            if backend.is_some() {
                settings.search.backend = backend;
            }
            run_search(&settings, query, limit).await;
        }
        Some(Commands::PruneScreenshots) => {
            run_prune(&settings).await;
        }
        None => {
            eprintln!("Usage: crawlify crawl <URL> [--format <FORMAT>]...");
            eprintln!("   or: crawlify search <QUERY> [--limit <N>]");
            eprintln!("   or: crawlify mcp");
            eprintln!("   or: crawlify --help");
            std::process::exit(1);
        }
    }
}

/// Log to stderr so stdout stays clean for JSON and MCP frames
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn build_tool(settings: &Settings) -> Tool {
    ToolBuilder::from_settings(settings).build()
}

async fn run_crawl(settings: &Settings, url: String, formats: Vec<FormatKind>) {
    let request = formats
        .into_iter()
        .fold(CrawlRequest::new(url), CrawlRequest::format);

    match build_tool(settings).crawl(request).await {
        Ok(result) => print_json(&result),
        Err(e) => fail(e.status_code(), e.body()),
    }
}

async fn run_search(settings: &Settings, query: String, limit: Option<usize>) {
    let mut request = SearchRequest::new(query);
    request.limit = limit;

    match build_tool(settings).search(request).await {
        Ok(result) => print_json(&result),
        Err(e) => fail(e.status_code(), e.body()),
    }
}

async fn run_prune(settings: &Settings) {
    let screenshots = &settings.screenshots;
    match prune_expired(&screenshots.directory, screenshots.ttl).await {
        Ok(removed) => {
            tracing::info!(dir = %screenshots.directory.display(), removed, "Pruned screenshots");
        }
        Err(e) => {
            eprintln!("Error: failed to clean screenshots directory: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing response: {}", e);
        std::process::exit(1);
    });
    writeln_safe(&json);
}

/// Print the error body and exit with a code derived from the HTTP-style status
fn fail(status: u16, body: ErrorBody) -> ! {
    print_json(&body);
    std::process::exit(exit_code(status));
}

fn exit_code(status: u16) -> i32 {
    match status {
        400..=499 => 2,
        _ => 1,
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
