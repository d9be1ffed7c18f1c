//! dmarc-decoder - DMARC record and aggregate report decoder
//!
//! The `record` command decodes a DMARC policy record as published in DNS.
//! The `report` command extracts aggregate reports from a ZIP, GZIP, XML or EML file,
//! decodes them, and shows the published policy, every record's evaluation and a
//! summary of dispositions.
//!
//! The tool outputs results in one of three formats: Table, CSV, or JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dmarc_decoder::models::{DkimAuthResult, ReportRecord, SpfAuthResult};
use dmarc_decoder::{decode_record, decode_report, extract_reports, Config, DispositionSummary, Record, Report};
use prettytable::{row, Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Decoder for DMARC policy records and aggregate reports",
    long_about = "dmarc-decoder validates DMARC policy records and decodes aggregate (RUA) \
                  feedback reports from ZIP, GZIP or XML files.\n\n\
                  USAGE:\n  dmarc-decoder record <TXT> [--output <table|json>]\n  \
                  dmarc-decoder report <FILE> [--output <table|csv|json>]"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format: table, csv, json
    #[arg(short, long, default_value = "table", global = true)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a DMARC policy record, e.g. "v=DMARC1; p=reject; rua=mailto:dmarc@example.com"
    Record {
        /// The TXT record value
        txt: String,
    },
    /// Decode aggregate reports from a ZIP, GZIP or XML file
    Report {
        /// Path to the report file (.zip, .gz, .xml or .eml)
        #[arg(value_parser)]
        file: PathBuf,
    },
}

/// Supported output formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// One CSV line per report record; nested results are flattened.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    report_id: &'a str,
    org_name: &'a str,
    source_ip: String,
    count: u32,
    disposition: &'a str,
    dkim_evaluated: &'a str,
    spf_evaluated: &'a str,
    header_from: &'a str,
    dkim: String,
    spf: String,
}

/// Formats a DKIM result into a clear, human-readable string.
/// If no signature is present, returns "No signature".
fn format_dkim(d: &DkimAuthResult) -> String {
    if d.domain.trim().is_empty() {
        "No signature".to_string()
    } else if d.selector.trim().is_empty() {
        format!("{}:{}", d.domain, d.result)
    } else {
        format!("{} (selector: {}): {}", d.domain, d.selector, d.result)
    }
}

/// Formats an SPF result into a clear, human-readable string.
/// If no SPF record is present, returns "No SPF record".
fn format_spf(spf: &SpfAuthResult) -> String {
    if spf.domain.trim().is_empty() {
        "No SPF record".to_string()
    } else {
        format!("{}:{}", spf.domain, spf.result)
    }
}

fn format_dkim_list(record: &ReportRecord) -> String {
    if record.auth_results.dkim.is_empty() {
        "No DKIM signature".to_string()
    } else {
        record.auth_results.dkim.iter().map(format_dkim).collect::<Vec<_>>().join(", ")
    }
}

fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn print_record(record: &Record, output: &OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => bail!("CSV output is only available for reports"),
        OutputFormat::Table => {
            if !record.is_dmarc1() {
                println!("{}", format!("Unexpected version: {}", record.version).yellow());
            }
            let fo: Vec<String> = record.effective_failure_options().iter().map(|o| o.to_string()).collect();
            let rf: Vec<String> = record.report_formats.iter().map(|f| f.to_string()).collect();
            let mut table = Table::new();
            table.add_row(row!["Tag", "Value"]);
            table.add_row(row!["v", record.version]);
            table.add_row(row!["p", record.policy]);
            table.add_row(row!["sp", record.effective_subdomain_policy()]);
            table.add_row(row!["adkim", record.dkim_alignment]);
            table.add_row(row!["aspf", record.spf_alignment]);
            table.add_row(row!["fo", fo.join(":")]);
            table.add_row(row!["pct", record.percent]);
            table.add_row(row!["rf", rf.join(":")]);
            table.add_row(row!["ri", format!("{}s", record.report_interval.as_secs())]);
            table.add_row(row!["rua", record.aggregate_report_uris.join("\n")]);
            table.add_row(row!["ruf", record.failure_report_uris.join("\n")]);
            table.printstd();
            println!("\n{}: {}", "Canonical".bold(), record);
        }
    }
    Ok(())
}

fn print_reports(reports: &[Report], output: &OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reports)?);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for report in reports {
                for record in &report.records {
                    wtr.serialize(CsvRow {
                        report_id: &report.report_metadata.report_id,
                        org_name: &report.report_metadata.org_name,
                        source_ip: record.row.source_ip.to_string(),
                        count: record.row.count,
                        disposition: &record.row.policy_evaluated.disposition,
                        dkim_evaluated: &record.row.policy_evaluated.dkim,
                        spf_evaluated: &record.row.policy_evaluated.spf,
                        header_from: &record.identifiers.header_from,
                        dkim: format_dkim_list(record),
                        spf: format_spf(&record.auth_results.spf),
                    })?;
                }
            }
            wtr.flush()?;
        }
        OutputFormat::Table => {
            for report in reports {
                print_report_table(report);
            }
        }
    }
    Ok(())
}

fn print_report_table(report: &Report) {
    let metadata = &report.report_metadata;
    let policy = &report.policy_published;
    println!("{}", "Report".bold().blue());
    println!("{}", "----------------------------".dimmed());
    println!("{}: {} <{}>", "Reporter".bold(), metadata.org_name, metadata.email);
    println!("{}: {}", "Report ID".bold(), metadata.report_id);
    println!(
        "{}: {} to {}\n",
        "Period".bold(),
        format_timestamp(metadata.date_range.begin),
        format_timestamp(metadata.date_range.end)
    );

    println!("{}", "DMARC Policy Information".bold().blue());
    println!("{}", "----------------------------".dimmed());
    println!("{}: {}", "Domain".bold(), policy.domain);
    println!("{}: {}", "SPF Alignment".bold(), or_dash(&policy.aspf));
    println!("{}: {}", "DKIM Alignment".bold(), or_dash(&policy.adkim));
    println!("{}: {}", "Policy".bold(), policy.p);
    println!("{}: {}", "Subdomain Policy".bold(), or_dash(&policy.sp));
    let pct = policy.pct.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
    println!("{}: {}\n", "Percentage Applied".bold(), pct);

    if report.records.is_empty() {
        println!("{}\n", "No DMARC records found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.add_row(row!["Source IP", "Count", "Disposition", "Header From", "SPF", "DKIM"]);
    for record in &report.records {
        table.add_row(Row::new(vec![
            Cell::new(&record.row.source_ip.to_string()),
            Cell::new(&record.row.count.to_string()),
            Cell::new(&record.row.policy_evaluated.disposition),
            Cell::new(&record.identifiers.header_from),
            Cell::new(&format_spf(&record.auth_results.spf)),
            Cell::new(&format_dkim_list(record)),
        ]));
    }
    table.printstd();

    let summary = DispositionSummary::from_report(report);
    println!(
        "{}: {} pass, {} quarantine, {} reject, {} other ({} messages)\n",
        "Dispositions".bold(),
        summary.pass.to_string().green(),
        summary.quarantine.to_string().yellow(),
        summary.reject.to_string().red(),
        summary.other,
        summary.total()
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity.
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    match &cli.command {
        Command::Record { txt } => {
            let record = decode_record(txt).context("Failed to decode DMARC record")?;
            print_record(&record, &cli.output)?;
        }
        Command::Report { file } => {
            log::info!("Processing file: {}", file.display());
            let config = Config::new().context("Failed to load configuration")?;
            let documents = extract_reports(file, &config).context("Failed to extract file")?;
            let reports = documents
                .iter()
                .map(|xml| decode_report(xml))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to decode aggregate report")?;
            log::info!("Decoded {} report(s)", reports.len());
            print_reports(&reports, &cli.output)?;
        }
    }
    Ok(())
}
