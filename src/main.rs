//! Header Template CLI
//!
//! Usage:
//!   header-template [OPTIONS] [FILE]
//!
//! Options:
//!   -d, --data <FILE>     TOML file with template data
//!   -c, --config <FILE>   Parse configuration (TOML format)
//!   -m, --map             Print the reserved-key map instead of wire order
//!   -v, --verbose         More log output (repeatable)
//!   -h, --help            Print help

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use tracing::Level;

use header_template::{
    parse_header_template_with, ParseConfig, TemplateData, TextTemplate,
};

#[derive(Parser)]
#[command(name = "header-template")]
#[command(about = "Render an HTTP header template into ordered headers")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// TOML file whose top-level table becomes the template data
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Parse configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the single map with reserved order keys instead of wire order
    #[arg(short, long)]
    map: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => match ParseConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ParseConfig::default(),
    };

    // Load template data
    let data = match &cli.data {
        Some(path) => match load_data(path) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Error loading data '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => TemplateData::Table(Default::default()),
    };

    // Read template
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };
    tracing::info!(template = %filename, bytes = source.len(), "parsing header template");

    let headers = match parse_header_template_with(&TextTemplate::new(), &source, &data, &config) {
        Ok(headers) => headers,
        Err(e) => {
            eprintln!("{}", e.format(&source, &filename));
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.map {
        let map: BTreeMap<_, _> = headers.into_header_map().into_iter().collect();
        for (name, values) in map {
            println!("{}: {:?}", name, values);
        }
    } else {
        print!("{}", headers);
    }
}

fn load_data(path: &Path) -> Result<TemplateData, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content)?;
    Ok(TemplateData::Table(table))
}
