//! labelsmith – command-line template preprocessor.
//!
//! Usage:
//!   labelsmith <document.xml> <records.json> [output.xml] [--pages pages.json] [--config config.json]
//!
//! Runs the record pipeline and template preprocessing, then writes the
//! rewritten body mark-up and the assembled page data as JSON. Substituting
//! the page data into the zip container is left to the external engine.
//!
//! `records.json` is either a bare array of records (objects mapping column
//! name to cell value) or an object `{"headers": [...], "records": [...]}`.

use std::{env, fs, path::PathBuf, process};

use serde::Deserialize;

use labelsmith::config::{Config, Limits};
use labelsmith::pipeline::prepare;
use labelsmith::record::{Record, Row};

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    Bare(Vec<Record>),
    WithHeaders {
        headers: Vec<String>,
        records: Vec<Record>,
    },
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut template_path: Option<PathBuf> = None;
    let mut records_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut pages_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--pages" | "-p" => match iter.next() {
                Some(v) => pages_path = Some(PathBuf::from(v)),
                None => {
                    eprintln!("Error: --pages requires a path.");
                    process::exit(1);
                }
            },
            "--config" | "-c" => match iter.next() {
                Some(v) => config_path = Some(PathBuf::from(v)),
                None => {
                    eprintln!("Error: --config requires a path.");
                    process::exit(1);
                }
            },
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                match positional {
                    0 => template_path = Some(PathBuf::from(path)),
                    1 => records_path = Some(PathBuf::from(path)),
                    2 => output_path = Some(PathBuf::from(path)),
                    _ => {
                        eprintln!("Unexpected argument: {path}");
                        print_usage(&args[0]);
                        process::exit(1);
                    }
                }
                positional += 1;
            }
        }
    }

    let (template, records) = match (template_path, records_path) {
        (Some(t), Some(r)) => (t, r),
        _ => {
            eprintln!("Error: need a template and a records file.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    // Default outputs: same directory + same stem as the template.
    let output = output_path.unwrap_or_else(|| {
        let mut o = template.clone();
        o.set_extension("out.xml");
        o
    });
    let pages_out = pages_path.unwrap_or_else(|| {
        let mut p = output.clone();
        p.set_file_name("pages.json");
        p
    });

    let body_xml = match fs::read_to_string(&template) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", template.display());
            process::exit(1);
        }
    };

    let records_text = match fs::read_to_string(&records) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", records.display());
            process::exit(1);
        }
    };
    let (headers, rows) = match parse_records(&records_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error parsing '{}': {e}", records.display());
            process::exit(1);
        }
    };

    let config = match config_path {
        Some(path) => match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Config>(&text) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error parsing '{}': {e}", path.display());
                    process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error reading '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    let result = prepare(
        &body_xml,
        &rows,
        &headers,
        &config,
        &Limits::default(),
        &mut |status: &str| eprintln!("{status}"),
    );

    match result {
        Ok(prepared) => {
            let pages_json = match serde_json::to_string_pretty(&prepared.pages) {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("Error serializing page data: {e}");
                    process::exit(1);
                }
            };
            if let Err(e) = fs::write(&output, &prepared.body_xml) {
                eprintln!("Error writing '{}': {e}", output.display());
                process::exit(1);
            }
            if let Err(e) = fs::write(&pages_out, &pages_json) {
                eprintln!("Error writing '{}': {e}", pages_out.display());
                process::exit(1);
            }
            eprintln!(
                "Wrote '{}' and '{}' ({} labels from {} records, {} page{} of {} slot{})",
                output.display(),
                pages_out.display(),
                prepared.total_labels,
                prepared.filtered_records,
                prepared.pages.len(),
                if prepared.pages.len() == 1 { "" } else { "s" },
                prepared.items_per_page,
                if prepared.items_per_page == 1 { "" } else { "s" },
            );
        }
        Err(e) => {
            eprintln!("Error preparing document: {e}");
            process::exit(1);
        }
    }
}

fn parse_records(text: &str) -> Result<(Vec<String>, Vec<Row>), serde_json::Error> {
    let parsed: RecordsFile = serde_json::from_str(text)?;
    let (headers, records) = match parsed {
        RecordsFile::WithHeaders { headers, records } => (headers, records),
        RecordsFile::Bare(records) => {
            // Header order follows the first record's column order.
            let mut headers: Vec<String> = Vec::new();
            for record in &records {
                for column in record.columns() {
                    if !headers.iter().any(|h| h == column) {
                        headers.push(column.to_string());
                    }
                }
            }
            (headers, records)
        }
    };

    // Spreadsheet rows are 1-indexed with the header on row 1.
    let rows = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| Row::with_source_row(record, i + 2))
        .collect();
    Ok((headers, rows))
}

fn print_usage(prog: &str) {
    eprintln!("labelsmith – label-document preprocessor");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <document.xml> <records.json> [output.xml] [--pages pages.json] [--config config.json]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <document.xml>  Template body mark-up (word/document.xml)");
    eprintln!("  <records.json>  Records as a JSON array of objects, or");
    eprintln!("                  {{\"headers\": [...], \"records\": [...]}}");
    eprintln!("  [output.xml]    Rewritten mark-up (default: template stem + .out.xml)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --pages, -p     Page-data output path (default: pages.json next to output)");
    eprintln!("  --config, -c    Pipeline configuration JSON (default: built-in defaults)");
    eprintln!("  --help          Print this message");
}
