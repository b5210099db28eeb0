use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitegraph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitegraph")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log every visited page and link decision").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site breadth-first from a start page, building a directed graph of \
                pages and the links between them.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to start crawling from"),
                )
                .arg(
                    arg!(-n --"budget" <NODES>)
                        .required(false)
                        .help("Maximum number of pages in the graph")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2000"),
                )
                .arg(
                    arg!(-s --"scope" <DOMAIN>)
                        .required(false)
                        .help("Only follow links to this domain and its subdomains (default: the start URL's host)"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the graph to file (default: only print the summary)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Graph file format (default: from the output file extension)")
                        .value_parser(["json", "sqlite"])
                        .requires("output"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"on-interrupt" <POLICY>)
                        .required(false)
                        .help("What Ctrl-C does: abort the crawl or skip the page being fetched")
                        .value_parser(["abort", "skip"])
                        .default_value("abort"),
                ),
        )
        .subcommand(
            command!("subgraph")
                .about("Save the subgraph made of the first N discovered pages of a JSON graph")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("JSON graph written by `sitegraph crawl`")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-n --"nodes" <N>)
                        .required(true)
                        .help("Number of nodes to keep, in discovery order")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(true)
                        .help("Where to write the subgraph")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("info")
                .about("Print the size and run metadata of a JSON graph")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("JSON graph written by `sitegraph crawl`")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
