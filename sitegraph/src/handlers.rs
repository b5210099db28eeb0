use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use sitegraph_core::crawl::{CrawlOptions, execute_crawl, generate_crawl_report};
use sitegraph_core::export::{
    GraphMetadata, OutputFormat, load_graph_json, save_crawl, save_graph_json,
};
use sitegraph_scanner::InterruptPolicy;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_NODE_BUDGET: usize = 2000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// Helper functions for the command handlers

/// Parse a start URL, trying to add http:// if needed
pub fn parse_start_url(line: &str) -> Result<Url, String> {
    let line = line.trim();

    // Try to parse as-is
    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Ok(url);
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some() => Ok(url),
        _ => Err(format!("'{}' is not a valid http(s) URL", line)),
    }
}

pub fn parse_interrupt_policy(value: &str) -> Result<InterruptPolicy, String> {
    match value.to_lowercase().as_str() {
        "abort" => Ok(InterruptPolicy::Abort),
        "skip" | "skip-page" => Ok(InterruptPolicy::SkipPage),
        other => Err(format!(
            "Unknown interrupt policy '{}': expected abort or skip",
            other
        )),
    }
}

/// Expand a leading `~` to the user's home directory
pub fn resolve_output_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// An explicit `--format` wins, otherwise the file extension decides
pub fn resolve_format(explicit: Option<&str>, path: &Path) -> Result<OutputFormat, String> {
    match explicit {
        Some(name) => OutputFormat::parse(name)
            .ok_or_else(|| format!("Unknown output format '{}': expected json or sqlite", name)),
        None => Ok(OutputFormat::from_path(path)),
    }
}

/// Writes the first `n` discovered nodes of the graph in `input` to
/// `output`. Returns the subgraph's `(n, m)`.
pub fn write_subgraph(input: &Path, n: usize, output: &Path) -> Result<(usize, usize)> {
    let (metadata, graph) = load_graph_json(input).map_err(anyhow::Error::msg)?;
    let sub = graph
        .first_n_subgraph(n)
        .with_context(|| format!("Cannot cut a subgraph from {}", input.display()))?;
    save_graph_json(&sub, &metadata.for_subgraph(n), output).map_err(anyhow::Error::msg)?;
    Ok((sub.node_count(), sub.edge_count()))
}

/// Short description of a saved graph: its size and whatever run
/// metadata the file carries.
pub fn describe_graph_file(input: &Path) -> Result<String> {
    let (metadata, graph) = load_graph_json(input).map_err(anyhow::Error::msg)?;
    let mut out = String::new();
    out.push_str(&format!("n = {}\n", graph.node_count()));
    out.push_str(&format!("m = {}\n", graph.edge_count()));
    out.push_str(&describe_metadata(&metadata)?);
    Ok(out)
}

fn describe_metadata(metadata: &GraphMetadata) -> Result<String> {
    let rendered =
        serde_json::to_string_pretty(metadata).context("Failed to render graph metadata")?;
    Ok(format!("metadata: {}\n", rendered))
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let raw_url = sub_matches
        .get_one::<String>("url")
        .context("--url is required")?;
    let url = parse_start_url(raw_url).map_err(anyhow::Error::msg)?;
    let node_budget = sub_matches
        .get_one::<usize>("budget")
        .copied()
        .unwrap_or(DEFAULT_NODE_BUDGET);
    let scope = sub_matches.get_one::<String>("scope").cloned();
    let timeout_secs = sub_matches
        .get_one::<u64>("timeout")
        .copied()
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let interrupt_policy = match sub_matches.get_one::<String>("on-interrupt") {
        Some(value) => parse_interrupt_policy(value).map_err(anyhow::Error::msg)?,
        None => InterruptPolicy::default(),
    };

    // Resolve the destination before spending time on the crawl
    let output = match sub_matches.get_one::<PathBuf>("output") {
        Some(path) => {
            let path = resolve_output_path(path);
            let explicit = sub_matches.get_one::<String>("format").map(String::as_str);
            let format = resolve_format(explicit, &path).map_err(anyhow::Error::msg)?;
            Some((path, format))
        }
        None => None,
    };

    // Print crawl configuration
    if !quiet {
        let host = url.host_str().unwrap_or("unknown");
        println!("\n🕷️  Crawling {}", host.bright_white().bold());
        println!("Node budget: {}", node_budget);
        println!(
            "Scope: {}",
            scope.as_deref().unwrap_or("start host and its subdomains")
        );
        let policy = match interrupt_policy {
            InterruptPolicy::Abort => "Ctrl-C stops the crawl",
            InterruptPolicy::SkipPage => "Ctrl-C skips the current page",
        };
        println!("Interrupts: {}\n", policy);
    }

    let options = CrawlOptions {
        scope,
        timeout_secs,
        interrupt_policy,
        show_progress_bars: !quiet,
        handle_interrupts: true,
        ..CrawlOptions::new(url.as_str(), node_budget)
    };

    let outcome = execute_crawl(options, None)
        .await
        .map_err(|e| anyhow::anyhow!("Crawl failed: {}", e))?;

    if outcome.stats.interrupted {
        println!("\n{} Crawl interrupted, keeping partial graph\n", "⚠".yellow().bold());
    } else {
        println!("\n{} Crawl complete!\n", "✓".green().bold());
    }
    print!("{}", generate_crawl_report(&outcome));

    if let Some((path, format)) = output {
        let written = save_crawl(&outcome, &path, format).map_err(anyhow::Error::msg)?;
        println!(
            "{} Graph saved to {}",
            "✓".green().bold(),
            written.bright_white()
        );
    }

    Ok(())
}

pub fn handle_subgraph(sub_matches: &ArgMatches) -> Result<()> {
    let input = sub_matches
        .get_one::<PathBuf>("input")
        .context("--input is required")?;
    let output = sub_matches
        .get_one::<PathBuf>("output")
        .context("--output is required")?;
    let n = *sub_matches
        .get_one::<usize>("nodes")
        .context("--nodes is required")?;

    let input = resolve_output_path(input);
    let output = resolve_output_path(output);
    let (nodes, edges) = write_subgraph(&input, n, &output)?;

    println!(
        "{} Wrote first {} nodes of {} to {}",
        "✓".green().bold(),
        n,
        input.display(),
        output.display().to_string().bright_white()
    );
    println!("  n = {} m = {}", nodes, edges);
    Ok(())
}

pub fn handle_info(sub_matches: &ArgMatches) -> Result<()> {
    let input = sub_matches
        .get_one::<PathBuf>("input")
        .context("--input is required")?;
    let input = resolve_output_path(input);

    print_divider();
    println!("  {}", input.display().to_string().bright_white().bold());
    print_divider();
    print!("{}", describe_graph_file(&input)?);
    Ok(())
}
