//! Inspect how the gateway treats a request: allow-list decision, cache key
//! and the canonical query forwarded upstream.

use std::path::PathBuf;

use clap::Parser;
use percent_encoding::percent_decode_str;

use scix_gateway::cache::{build_cache_key, canonical_query, flatten_params, RawParams};
use scix_gateway::config::load_config;
use scix_gateway::security::{has_encoded_delimiter, PathAllowlist};

#[derive(Parser)]
#[command(name = "cache-key")]
#[command(about = "Show the cache key and allow-list decision for a request", long_about = None)]
struct Cli {
    /// Upstream path, e.g. /search/query
    path: String,

    /// Query parameters as `name=value`; repeat a name for a list.
    params: Vec<String>,

    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Configuration file providing the allow-list.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let allowlist = PathAllowlist::new(config.allowlist.rules);

    let path = percent_decode_str(&cli.path).decode_utf8()?;
    let params = flatten_params(&RawParams::from_query(&cli.params.join("&")));
    let method = cli.method.to_ascii_uppercase();

    println!("path:      {}", path);
    let allowed = !has_encoded_delimiter(&cli.path) && allowlist.is_allowed(&path);
    println!("allowed:   {}", allowed);
    println!("cacheable: {}", method == "GET");
    println!("key:       {}", build_cache_key(&method, &path, &params));
    println!("forwarded: {}", canonical_query(&params));

    Ok(())
}
