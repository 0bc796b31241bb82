//! vizspec CLI
//!
//! Usage:
//!   vizspec [OPTIONS] [FILE]
//!
//! FILE is a JSON document, or a TOML table holding a single spec when it
//! ends in `.toml`.
//!
//! Options:
//!   -c, --config <FILE>   Configuration file (TOML format)
//!       --canvas          Emit recorded canvas calls as JSON instead of SVG
//!       --width <PX>      Container width
//!       --height <PX>     Container height
//!       --compact         Single-line SVG without XML declaration
//!   -v, --verbose         Log resolution to stderr (repeat for more)
//!   -h, --help            Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::ops::Range;
use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vizspec::{render_document, render_document_to_canvas, PipelineError, RenderConfig, SvgConfig};

#[derive(Parser)]
#[command(name = "vizspec")]
#[command(about = "Render declarative visualization specs to SVG or canvas calls")]
struct Cli {
    /// Input document, JSON or TOML (reads JSON from stdin if not provided)
    input: Option<PathBuf>,

    /// Configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit recorded canvas calls as JSON
    #[arg(long)]
    canvas: bool,

    /// Container width in pixels
    #[arg(long)]
    width: Option<f64>,

    /// Container height in pixels
    #[arg(long)]
    height: Option<f64>,

    /// Single-line SVG without XML declaration
    #[arg(long)]
    compact: bool,

    /// Log resolution to stderr
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let mut config = match &cli.config {
        Some(path) => match RenderConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => RenderConfig::default(),
    };
    if cli.width.is_some() || cli.height.is_some() {
        let (width, height) = config.engine.default_container;
        config.engine = config.engine.with_default_container(
            cli.width.unwrap_or(width),
            cli.height.unwrap_or(height),
        );
    }
    if cli.compact {
        config.svg = SvgConfig::compact();
    }

    let (name, source) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (path.display().to_string(), content),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => ("<stdin>".to_string(), buffer),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let is_toml = cli
        .input
        .as_ref()
        .and_then(|path| path.extension())
        .map_or(false, |ext| ext == "toml");
    let document = if is_toml {
        match toml::from_str::<serde_json::Value>(&source) {
            Ok(document) => document,
            Err(e) => {
                eprintln!("Error parsing '{}': {}", name, e);
                std::process::exit(1);
            }
        }
    } else {
        match serde_json::from_str(&source) {
            Ok(document) => document,
            Err(e) => {
                report_json_error(&name, &source, &e);
                std::process::exit(1);
            }
        }
    };

    let output = if cli.canvas {
        render_document_to_canvas(document, &config)
    } else {
        render_document(document, &config)
    };
    match output {
        Ok(output) => println!("{}", output),
        Err(PipelineError::Json(e)) => {
            eprintln!("Error serializing output: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Byte range of the character serde_json stopped at
fn error_span(source: &str, line: usize, column: usize) -> Range<usize> {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    let start = (line_start + column.saturating_sub(1)).min(source.len());
    start..(start + 1).min(source.len()).max(start)
}

fn report_json_error(name: &str, source: &str, error: &serde_json::Error) {
    let span = error_span(source, error.line(), error.column());
    let printed = Report::build(ReportKind::Error, name, span.start)
        .with_message("invalid JSON document")
        .with_label(
            Label::new((name, span))
                .with_message(error.to_string())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((name, Source::from(source)));
    if printed.is_err() {
        eprintln!("Error: {}", error);
    }
}

fn print_intro() {
    println!(
        r#"vizspec - declarative visualization specs

USAGE:
    vizspec [OPTIONS] [FILE]
    echo '<json>' | vizspec

OPTIONS:
    -c, --config     Configuration file (TOML)
        --canvas     Emit canvas calls as JSON instead of SVG
        --width      Container width in pixels
        --height     Container height in pixels
        --compact    Single-line SVG
    -v, --verbose    Log resolution to stderr
    -h, --help       Print help

QUICK START:
    echo '{{"type": "rect", "width": 40, "height": 20}}' | vizspec > output.svg

A document is one spec or an array of specs. Types are added with
"define" specs that extend a built-in type:

    [
      {{"type": "define", "name": "badge", "extend": "circle",
        "properties": {{"r": {{"default": 8}}, "fill": {{"default": "tomato"}}}}}},
      {{"type": "badge", "cx": 20, "cy": 20}}
    ]

Built-in types: rect, circle, line, text, group, frame."#
    );
}
