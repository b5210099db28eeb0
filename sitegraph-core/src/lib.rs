pub mod crawl;
pub mod data;
pub mod export;

const BANNER: &str = r#"
      _ _                              _
  ___(_) |_ ___  __ _ _ __ __ _ _ __ | |__
 / __| | __/ _ \/ _` | '__/ _` | '_ \| '_ \
 \__ \ | ||  __/ (_| | | | (_| | |_) | | | |
 |___/_|\__\___|\__, |_|  \__,_| .__/|_| |_|
                |___/          |_|
"#;

pub fn print_banner() {
    println!("{}", BANNER);
    println!("  sitegraph v{} - crawl a site into a link graph\n", env!("CARGO_PKG_VERSION"));
}
