//! XML Parser Module
//!
//! This module decodes DMARC aggregate (RUA) feedback reports into a `Report`.
//! Decoding is structural: leaf values are type-checked (counts, timestamps,
//! IP addresses) but not checked against the DMARC enumerations. Any problem
//! fails the whole document with `InvalidDocument`.
//!
//! Entities are never expanded. A DOCTYPE block that defines two or more entities
//! is rejected outright; any other DOCTYPE is ignored, and an entity reference it
//! would have resolved then fails as an unknown entity.

use crate::error::{DecodeError, Result};
use crate::models::{
    AuthResults, DateRange, DkimAuthResult, Identifiers, PolicyEvaluated, PolicyPublished,
    Report, ReportMetadata, ReportRecord, Row, SpfAuthResult,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fmt::Display;
use std::net::IpAddr;
use std::str::FromStr;

type XmlReader<'a> = Reader<&'a [u8]>;

fn invalid(reason: impl Display) -> DecodeError {
    DecodeError::InvalidDocument(reason.to_string())
}

/// Decodes an aggregate report from raw bytes.
///
/// # Errors
///
/// Returns `InvalidDocument` if the bytes are not UTF-8, the XML is not well formed,
/// a leaf value has the wrong type, or a record lacks its `row`/`source_ip`.
pub fn decode_report(bytes: &[u8]) -> Result<Report> {
    let text = std::str::from_utf8(bytes).map_err(invalid)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::DocType(doctype)) => {
                let entity_count = String::from_utf8_lossy(&doctype).matches("<!ENTITY").count();
                if entity_count >= 2 {
                    return Err(invalid("recursive entities detected"));
                }
                log::warn!("Ignoring DOCTYPE declaration in aggregate report");
            }
            Ok(Event::Start(_)) => {
                let report = parse_feedback(&mut reader)?;
                log::debug!(
                    "Decoded aggregate report '{}' with {} records",
                    report.report_metadata.report_id,
                    report.records.len()
                );
                return Ok(report);
            }
            Ok(Event::Empty(_)) => return Ok(Report::default()),
            Ok(Event::Eof) => return Err(invalid("document has no root element")),
            Ok(_) => {}
            Err(e) => return Err(invalid(e)),
        }
    }
}

/// Walks the children of the element whose start tag was just read, up to its end tag.
/// `on_child` must consume each child it is handed, end tag included.
fn read_children<'a, F>(reader: &mut XmlReader<'a>, mut on_child: F) -> Result<()>
where
    F: FnMut(&mut XmlReader<'a>, &BytesStart<'a>) -> Result<()>,
{
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => on_child(reader, e)?,
            Ok(Event::End(_)) => return Ok(()),
            Ok(Event::Eof) => return Err(invalid("unexpected end of document")),
            // Self-closing children carry no value.
            Ok(_) => {}
            Err(e) => return Err(invalid(e)),
        }
    }
}

fn skip(reader: &mut XmlReader<'_>, start: &BytesStart<'_>) -> Result<()> {
    reader.read_to_end(start.name()).map_err(invalid)?;
    Ok(())
}

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Reads the text content of a leaf element up to its end tag.
/// Character data and CDATA sections are joined; comments and processing
/// instructions are dropped. A nested element is an error.
fn read_string(reader: &mut XmlReader<'_>, start: &BytesStart<'_>) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => text.push_str(&e.unescape().map_err(invalid)?),
            Ok(Event::CData(e)) => text.push_str(std::str::from_utf8(&e.into_inner()).map_err(invalid)?),
            Ok(Event::End(_)) => return Ok(text.trim().to_string()),
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) => {
                return Err(invalid(format!("unexpected element inside <{}>", tag_name(start))))
            }
            Ok(Event::Eof) => return Err(invalid("unexpected end of document")),
            Ok(_) => {}
            Err(e) => return Err(invalid(e)),
        }
    }
}

fn read_value<T>(reader: &mut XmlReader<'_>, start: &BytesStart<'_>) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let text = read_string(reader, start)?;
    text.parse()
        .map_err(|e| invalid(format!("bad value '{}' in <{}>: {}", text, tag_name(start), e)))
}

fn parse_feedback(reader: &mut XmlReader<'_>) -> Result<Report> {
    let mut report = Report::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"report_metadata" => report.report_metadata = parse_report_metadata(reader)?,
            b"policy_published" => report.policy_published = parse_policy_published(reader)?,
            b"record" => report.records.push(parse_record(reader)?),
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(report)
}

/// Parses the `<report_metadata>` element.
fn parse_report_metadata(reader: &mut XmlReader<'_>) -> Result<ReportMetadata> {
    let mut metadata = ReportMetadata::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"org_name" => metadata.org_name = read_string(reader, e)?,
            b"email" => metadata.email = read_string(reader, e)?,
            b"extra_contact_info" => metadata.extra_contact_info = read_string(reader, e)?,
            b"report_id" => metadata.report_id = read_string(reader, e)?,
            b"date_range" => metadata.date_range = parse_date_range(reader)?,
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(metadata)
}

fn parse_date_range(reader: &mut XmlReader<'_>) -> Result<DateRange> {
    let mut range = DateRange::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"begin" => range.begin = read_value(reader, e)?,
            b"end" => range.end = read_value(reader, e)?,
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(range)
}

/// Parses the `<policy_published>` element.
fn parse_policy_published(reader: &mut XmlReader<'_>) -> Result<PolicyPublished> {
    let mut policy = PolicyPublished::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"domain" => policy.domain = read_string(reader, e)?,
            b"adkim" => policy.adkim = Some(read_string(reader, e)?),
            b"aspf" => policy.aspf = Some(read_string(reader, e)?),
            b"p" => policy.p = read_string(reader, e)?,
            b"sp" => policy.sp = Some(read_string(reader, e)?),
            b"pct" => policy.pct = Some(read_value(reader, e)?),
            b"np" => policy.np = Some(read_string(reader, e)?),
            b"fo" => policy.fo = Some(read_string(reader, e)?),
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(policy)
}

/// Parses one `<record>` element.
fn parse_record(reader: &mut XmlReader<'_>) -> Result<ReportRecord> {
    let mut row = None;
    let mut identifiers = Identifiers::default();
    let mut auth_results = AuthResults::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"row" => row = Some(parse_row(reader)?),
            b"identifiers" => identifiers = parse_identifiers(reader)?,
            b"auth_results" => auth_results = parse_auth_results(reader)?,
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(ReportRecord {
        row: row.ok_or_else(|| invalid("record is missing <row>"))?,
        identifiers,
        auth_results,
    })
}

fn parse_row(reader: &mut XmlReader<'_>) -> Result<Row> {
    let mut source_ip: Option<IpAddr> = None;
    // A row without <count> keeps 0.
    let mut count: u32 = 0;
    let mut policy_evaluated = PolicyEvaluated::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"source_ip" => source_ip = Some(read_value(reader, e)?),
            b"count" => count = read_value(reader, e)?,
            b"policy_evaluated" => policy_evaluated = parse_policy_evaluated(reader)?,
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(Row {
        source_ip: source_ip.ok_or_else(|| invalid("row is missing <source_ip>"))?,
        count,
        policy_evaluated,
    })
}

fn parse_policy_evaluated(reader: &mut XmlReader<'_>) -> Result<PolicyEvaluated> {
    let mut evaluated = PolicyEvaluated::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"disposition" => evaluated.disposition = read_string(reader, e)?,
            b"dkim" => evaluated.dkim = read_string(reader, e)?,
            b"spf" => evaluated.spf = read_string(reader, e)?,
            // <reason> entries are not carried.
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(evaluated)
}

fn parse_identifiers(reader: &mut XmlReader<'_>) -> Result<Identifiers> {
    let mut identifiers = Identifiers::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"header_from" => identifiers.header_from = read_string(reader, e)?,
            b"envelope_from" => identifiers.envelope_from = Some(read_string(reader, e)?),
            b"envelope_to" => identifiers.envelope_to = Some(read_string(reader, e)?),
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(identifiers)
}

fn parse_auth_results(reader: &mut XmlReader<'_>) -> Result<AuthResults> {
    let mut results = AuthResults::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"dkim" => results.dkim.push(parse_dkim(reader)?),
            b"spf" => results.spf = parse_spf(reader)?,
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(results)
}

/// Parses the `<dkim>` element of `<auth_results>`.
fn parse_dkim(reader: &mut XmlReader<'_>) -> Result<DkimAuthResult> {
    let mut dkim = DkimAuthResult::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"domain" => dkim.domain = read_string(reader, e)?,
            b"result" => dkim.result = read_string(reader, e)?,
            b"selector" => dkim.selector = read_string(reader, e)?,
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(dkim)
}

/// Parses the `<spf>` element of `<auth_results>`.
fn parse_spf(reader: &mut XmlReader<'_>) -> Result<SpfAuthResult> {
    let mut spf = SpfAuthResult::default();
    read_children(reader, |reader, e| {
        match e.local_name().as_ref() {
            b"domain" => spf.domain = read_string(reader, e)?,
            b"result" => spf.result = read_string(reader, e)?,
            b"scope" => spf.scope = Some(read_string(reader, e)?),
            _ => skip(reader, e)?,
        }
        Ok(())
    })?;
    Ok(spf)
}
