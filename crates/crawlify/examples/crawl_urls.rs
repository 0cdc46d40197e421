//! Example: Crawl a few URLs and display the produced formats
//!
//! Run with: cargo run -p crawlify --example crawl_urls
//!
//! Reads settings from the environment, so set OPENROUTER_API_KEY for
//! summaries and HTML2MARKDOWN_PATH for markdown.

use crawlify::{CrawlRequest, CrawlResult, Crawler, FormatKind, FormatPayload, Settings};

/// Example case definition
struct Case {
    url: &'static str,
    description: &'static str,
    formats: &'static [FormatKind],
    expect_contains: Option<&'static str>,
}

const CASES: &[Case] = &[
    Case {
        url: "https://example.com",
        description: "Simple HTML page",
        formats: &[FormatKind::Html, FormatKind::Links],
        expect_contains: Some("Example Domain"),
    },
    Case {
        url: "https://httpbin.org/html",
        description: "Long static page with markdown and summary",
        formats: &[FormatKind::Markdown, FormatKind::Summary],
        expect_contains: None,
    },
    Case {
        url: "https://httpbin.org/json",
        description: "JSON endpoint (never rendered)",
        formats: &[FormatKind::Html],
        expect_contains: Some("slideshow"),
    },
];

#[tokio::main]
async fn main() {
    println!("Crawlify URL Examples");
    println!("=====================\n");

    let crawler = Crawler::from_settings(&Settings::from_env());
    let mut passed = 0;
    let mut failed = 0;

    for (i, case) in CASES.iter().enumerate() {
        println!("{}. {}", i + 1, case.description);
        println!("   URL: {}", case.url);

        let request = case
            .formats
            .iter()
            .fold(CrawlRequest::new(case.url), |req, kind| req.format(*kind));

        match crawler.crawl(request).await {
            Ok(result) => {
                print_result(&result);
                if check(case, &result) {
                    println!("   ✓ PASS\n");
                    passed += 1;
                } else {
                    println!("   ✗ FAIL (expectations not met)\n");
                    failed += 1;
                }
            }
            Err(e) => {
                println!("   Error: {} (status {})", e, e.status_code());
                println!("   ✗ FAIL\n");
                failed += 1;
            }
        }
    }

    println!("=====================");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn print_result(result: &CrawlResult) {
    println!("   Id: {}", result.id);
    for (kind, payload) in &result.formats {
        match payload {
            FormatPayload::Failed(failure) => println!("   {}: error: {}", kind, failure.message),
            FormatPayload::Content { content, .. } => {
                let preview = content.chars().take(80).collect::<String>().replace('\n', " ");
                println!("   {}: {}", kind, preview);
            }
            FormatPayload::Links { count, .. } => println!("   {}: {} links", kind, count),
            FormatPayload::Screenshot { url, .. } => println!("   {}: {}", kind, url),
        }
    }
}

fn check(case: &Case, result: &CrawlResult) -> bool {
    if result.formats.len() != case.formats.len() {
        println!("   Expected {} formats", case.formats.len());
        return false;
    }

    if let Some(expected) = case.expect_contains {
        let html = result
            .formats
            .get(&FormatKind::Html)
            .and_then(FormatPayload::content)
            .unwrap_or("");
        if !html.contains(expected) {
            println!("   Expected html to contain '{}'", expected);
            return false;
        }
    }

    true
}
