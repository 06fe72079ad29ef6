use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// External hostname used to build absolute redirect targets
    #[arg(long)]
    pub public_host: Option<String>,

    /// Directory containing the pre-built static site
    #[arg(short, long)]
    pub root_dir: PathBuf,

    /// URL prefix the site is served under (no trailing slash)
    #[arg(long, default_value = "/docs")]
    pub doc_prefix: String,

    /// Liveness-check path
    #[arg(long, default_value = "/probe")]
    pub probe_path: String,

    /// Document served for unmatched paths under the prefix
    #[arg(long, default_value = "index.html")]
    pub fallback_document: PathBuf,

    /// Document served for 5xx-class failures
    #[arg(long, default_value = "50x.html")]
    pub error_document: PathBuf,

    #[arg(short, long, default_value = "3")]
    pub zstd_level: i32,

    #[arg(short, long, default_value = "6")]
    pub gzip_level: u32,

    /// Bodies shorter than this are never compressed
    #[arg(long, default_value = "1000")]
    pub min_compress_length: usize,

    /// Regex patterns for paths that must not be compressed
    #[arg(long = "no-compress", value_name = "PATTERN")]
    pub bypass_patterns: Vec<Regex>,
}
