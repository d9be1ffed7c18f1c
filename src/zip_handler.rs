//! ZIP Handler Module
//!
//! This module extracts aggregate report documents from the files mail providers
//! send them in: ZIP archives, GZIP files, plain XML, or a whole `.eml` message
//! whose attachments hold any of those. It enforces file size limits, maximum
//! decompressed size, file count, compression ratio, filename length, and path
//! traversal prevention. The bytes it returns are fed unchanged to `decode_report`.
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use mailparse::{DispositionType, ParsedMail};
use zip::ZipArchive;

use crate::config::Config;
use crate::error::ArchiveError;

/// The container a report arrives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadKind {
    Zip,
    Gzip,
    Xml,
}

impl PayloadKind {
    fn from_file_name(name: &str) -> Option<Self> {
        match extension(name).as_str() {
            "zip" => Some(PayloadKind::Zip),
            "gz" => Some(PayloadKind::Gzip),
            "xml" => Some(PayloadKind::Xml),
            _ => None,
        }
    }

    fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type.to_ascii_lowercase().as_str() {
            "application/zip" | "application/x-zip-compressed" => Some(PayloadKind::Zip),
            "application/gzip" | "application/x-gzip" => Some(PayloadKind::Gzip),
            "text/xml" | "application/xml" => Some(PayloadKind::Xml),
            _ => None,
        }
    }
}

fn extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Extracts report documents from a ZIP, GZIP, XML, or EML file.
///
/// # Arguments
///
/// * `file_path` - The path to the input file.
/// * `config` - Configuration limits for extraction.
///
/// # Security Checks
///
/// - Verifies that the original file size does not exceed the maximum.
/// - For ZIP archives: verifies the number of files, checks for path traversal, file name length,
///   compression ratio, and decompressed size. Directory entries are skipped.
/// - For GZIP and XML files: checks the decompressed content size.
/// - For EML files: each report attachment goes through the same checks as a file of its kind.
pub fn extract_reports<P: AsRef<Path>>(file_path: P, config: &Config) -> Result<Vec<Vec<u8>>> {
    let file = File::open(&file_path).context("Failed to open file")?;
    let file_size = file.metadata()?.len();
    if file_size > config.max_file_size as u64 {
        return Err(ArchiveError::FileTooLarge(format!("{} bytes", file_size)).into());
    }
    let file_name = file_path.as_ref()
        .file_name()
        .map(|x| x.to_string_lossy().to_string())
        .unwrap_or_default();
    log::debug!("Extracting {} as .{}", file_name, extension(&file_name));
    if extension(&file_name) == "eml" {
        let raw = read_limited(BufReader::new(file), config.max_file_size)?;
        return extract_mail(&raw, config);
    }
    match PayloadKind::from_file_name(&file_name) {
        Some(kind) => extract_payload(kind, BufReader::new(file), config),
        None => Err(ArchiveError::UnsupportedFile(file_name).into()),
    }
}

fn extract_payload<R: Read + Seek>(kind: PayloadKind, reader: R, config: &Config) -> Result<Vec<Vec<u8>>> {
    match kind {
        PayloadKind::Zip => extract_zip(reader, config),
        PayloadKind::Gzip => Ok(vec![read_limited(GzDecoder::new(reader), config.max_decompressed_size)?]),
        PayloadKind::Xml => Ok(vec![read_limited(reader, config.max_file_size)?]),
    }
}

/// Extracts the reports attached to a mail message.
///
/// The container of each attachment is taken from its content type, falling back to
/// the extension of its file name. Attachments of any other type are skipped.
fn extract_mail(raw: &[u8], config: &Config) -> Result<Vec<Vec<u8>>> {
    let mail = mailparse::parse_mail(raw)
        .map_err(|e| ArchiveError::Format(format!("Failed to parse mail: {}", e)))?;
    let mut parts = Vec::new();
    collect_attachments(&mail, &mut parts);

    let mut extracted = Vec::new();
    for part in parts {
        let name = attachment_name(part);
        let mime_type = &part.ctype.mimetype;
        let Some(kind) = PayloadKind::from_mime_type(mime_type).or_else(|| PayloadKind::from_file_name(&name)) else {
            log::warn!("Skipping attachment '{}' of type {}", name, mime_type);
            continue;
        };
        let body = part.get_body_raw()
            .map_err(|e| ArchiveError::Format(format!("Failed to decode attachment '{}': {}", name, e)))?;
        log::debug!("Extracting attachment '{}' ({} bytes) as {:?}", name, body.len(), kind);
        let reports = extract_payload(kind, Cursor::new(body), config)
            .with_context(|| format!("Failed to extract attachment '{}'", name))?;
        extracted.extend(reports);
    }
    if extracted.is_empty() {
        return Err(ArchiveError::Format("No report attachments found in mail".to_string()).into());
    }
    Ok(extracted)
}

/// Collects the leaf parts that are either declared attachments or carry a report content type.
fn collect_attachments<'a, 'b>(part: &'b ParsedMail<'a>, out: &mut Vec<&'b ParsedMail<'a>>) {
    if !part.subparts.is_empty() {
        for subpart in &part.subparts {
            collect_attachments(subpart, out);
        }
        return;
    }
    let is_attachment = matches!(part.get_content_disposition().disposition, DispositionType::Attachment);
    if is_attachment || PayloadKind::from_mime_type(&part.ctype.mimetype).is_some() {
        out.push(part);
    }
}

fn attachment_name(part: &ParsedMail<'_>) -> String {
    part.get_content_disposition()
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .cloned()
        .unwrap_or_default()
}

fn extract_zip<R: Read + Seek>(reader: R, config: &Config) -> Result<Vec<Vec<u8>>> {
    let mut archive = ZipArchive::new(reader).map_err(ArchiveError::from)?;
    if archive.len() > config.max_files_in_zip {
        return Err(ArchiveError::Format(format!("Too many files in archive: {}", archive.len())).into());
    }
    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let file_in_zip = archive.by_index(i).map_err(ArchiveError::from)?;
        let inner_name = file_in_zip.name().to_string();
        // Prevent path traversal
        if inner_name.contains("..") || inner_name.starts_with('/') || inner_name.starts_with('\\') {
            return Err(ArchiveError::Format(format!("Path traversal attempt detected: {}", inner_name)).into());
        }
        if inner_name.len() > config.max_filename_length {
            return Err(ArchiveError::Format("Filename too long".to_string()).into());
        }
        if file_in_zip.is_dir() {
            continue;
        }
        let compressed_size = file_in_zip.compressed_size();
        let uncompressed_size = file_in_zip.size();
        if compressed_size > 0 {
            let compression_ratio = uncompressed_size as f64 / compressed_size as f64;
            if compression_ratio > config.max_compression_ratio {
                return Err(ArchiveError::Format(format!("Suspicious compression ratio: {:.2}", compression_ratio)).into());
            }
        }
        if uncompressed_size > config.max_decompressed_size as u64 {
            return Err(ArchiveError::FileTooLarge(format!("{} decompresses to {} bytes", inner_name, uncompressed_size)).into());
        }
        // The declared size can lie, so the read itself is capped too.
        let contents = read_limited(file_in_zip, config.max_decompressed_size)
            .with_context(|| format!("Failed to read {} from archive", inner_name))?;
        extracted.push(contents);
    }
    if extracted.is_empty() {
        return Err(ArchiveError::Format("No files found in ZIP archive".to_string()).into());
    }
    Ok(extracted)
}

/// Reads at most `limit` bytes, failing if the source holds more.
fn read_limited<R: Read>(reader: R, limit: usize) -> Result<Vec<u8>, ArchiveError> {
    let mut contents = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut contents)?;
    if contents.len() > limit {
        return Err(ArchiveError::FileTooLarge(format!("content exceeds {} bytes", limit)));
    }
    Ok(contents)
}
