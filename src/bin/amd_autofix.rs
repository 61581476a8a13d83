//! amd-autofix command line tool
//!
//! Reads an autofix input document (resources with their lint findings) as
//! JSON, applies the fixes and prints the output document.
//!
//! # Exit Codes
//!
//! - 0: every resource was processed
//! - 1: at least one resource failed and kept its original content
//! - 2: the input or configuration could not be read

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use amd_autofix::tracing_config::init_tracing;
use amd_autofix::{autofix, AutofixInput, AutofixOptions, AutofixOutput};

#[derive(Parser, Debug)]
#[command(
    name = "amd-autofix",
    version,
    about = "Apply lint fixes to sap.ui.define / sap.ui.require modules",
    long_about = "Apply lint fixes to sap.ui.define / sap.ui.require modules.\n\n\
The input is a JSON document mapping resource paths to their source (or a file to read it from) \
and lint findings with fix descriptors. The output maps every changed resource to its new text."
)]
struct Cli {
    /// Input JSON document; read from stdin when omitted
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// JSON file with options (maxLineLength, resourcePrefix, parallel)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Write fixed text back to each resource's `file`
    #[arg(short = 'w', long = "write", default_value_t = false)]
    write: bool,

    /// Write the output document here instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Log skipped constructs and dropped fixes
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

fn read_input(path: Option<&PathBuf>) -> Result<AutofixInput> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read input from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&text).context("Failed to parse input document")
}

fn write_back(input: &AutofixInput, output: &AutofixOutput) -> Result<()> {
    for (resource, text) in &output.resources {
        let Some(file) = input.resources.get(resource).and_then(|r| r.file.as_ref()) else {
            continue;
        };
        fs::write(file, text).with_context(|| format!("Failed to write {}", file.display()))?;
        info!(resource = %resource, file = %file.display(), "wrote fixed resource");
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<AutofixOutput> {
    let options = match &cli.config {
        Some(path) => AutofixOptions::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AutofixOptions::default(),
    };
    let input = read_input(cli.input.as_ref())?;
    let output = autofix(&input, &options);

    if cli.write {
        write_back(&input, &output)?;
    }
    let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
    match &cli.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write output file {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(output)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) if output.failures.is_empty() => {}
        Ok(output) => {
            for failure in &output.failures {
                eprintln!("amd-autofix: {}: {}", failure.resource, failure.message);
            }
            process::exit(1);
        }
        Err(e) => {
            eprintln!("amd-autofix: {e:#}");
            process::exit(2);
        }
    }
}
