//! Policy Record Parser Module
//!
//! This module decodes a DMARC policy record (the `tag=value; ...` TXT string)
//! into a `Record`. Decoding is fail-fast: the first tag that does not validate
//! aborts the whole decode and no partial record is returned.

use crate::error::{DecodeError, Result};
use crate::models::{Record, DMARC_VERSION};
use crate::uri::decode_uri_list;
use crate::validators::{
    parse_alignment_mode, parse_failure_options, parse_percent, parse_policy,
    parse_report_formats, parse_report_interval,
};
use std::collections::HashMap;

/// Splits a record into its tags. Blank segments are skipped and a repeated tag
/// keeps its last value.
///
/// # Errors
///
/// Returns `MalformedParameter` carrying the trimmed segment if a non-blank
/// segment has no `=`.
pub fn tokenize(text: &str) -> Result<HashMap<&str, &str>> {
    let mut params = HashMap::new();
    for segment in text.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (tag, value) = segment
            .split_once('=')
            .ok_or_else(|| DecodeError::MalformedParameter(segment.to_string()))?;
        params.insert(tag.trim(), value.trim());
    }
    Ok(params)
}

/// Decodes a DMARC policy record.
///
/// `v` and `p` are mandatory. The version is kept as published; a value other
/// than `DMARC1` is logged but not rejected. Unrecognized tags are ignored.
pub fn decode_record(text: &str) -> Result<Record> {
    let params = tokenize(text)?;

    let version = *params
        .get("v")
        .ok_or_else(|| DecodeError::MissingParameter("v".to_string()))?;
    if version != DMARC_VERSION {
        log::warn!("DMARC record declares unexpected version '{}'", version);
    }
    let p = params
        .get("p")
        .ok_or_else(|| DecodeError::MissingParameter("p".to_string()))?;

    let mut record = Record::new(version, parse_policy(p, "p")?);

    if let Some(adkim) = params.get("adkim") {
        record.dkim_alignment = parse_alignment_mode(adkim, "adkim")?;
    }
    if let Some(aspf) = params.get("aspf") {
        record.spf_alignment = parse_alignment_mode(aspf, "aspf")?;
    }
    if let Some(fo) = params.get("fo") {
        record.failure_options = parse_failure_options(fo)?;
    }
    if let Some(pct) = params.get("pct") {
        record.percent = parse_percent(pct)?;
    }
    if let Some(rf) = params.get("rf") {
        record.report_formats = parse_report_formats(rf)?;
    }
    if let Some(ri) = params.get("ri") {
        record.report_interval = parse_report_interval(ri)?;
    }
    if let Some(rua) = params.get("rua") {
        record.aggregate_report_uris = decode_uri_list(rua, "rua")?;
    }
    if let Some(ruf) = params.get("ruf") {
        record.failure_report_uris = decode_uri_list(ruf, "ruf")?;
    }
    if let Some(sp) = params.get("sp") {
        record.subdomain_policy = Some(parse_policy(sp, "sp")?);
    }

    log::debug!("Decoded DMARC record with {} tags", params.len());
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlignmentMode, Policy};

    #[test]
    fn test_tokenize_trims_and_skips_blanks() {
        let params = tokenize(" v = DMARC1 ;; p=none ; ").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["v"], "DMARC1");
        assert_eq!(params["p"], "none");
    }

    #[test]
    fn test_tokenize_splits_on_first_equals() {
        let params = tokenize("rua=mailto:a@x.com?subject=dmarc").unwrap();
        assert_eq!(params["rua"], "mailto:a@x.com?subject=dmarc");
    }

    #[test]
    fn test_tokenize_duplicate_tag_last_wins() {
        let params = tokenize("p=none; p=reject").unwrap();
        assert_eq!(params["p"], "reject");
    }

    #[test]
    fn test_tokenize_malformed_segment() {
        assert_eq!(
            tokenize("v=DMARC1; p=none; sp"),
            Err(DecodeError::MalformedParameter("sp".into()))
        );
    }

    #[test]
    fn test_decode_minimal_record() {
        let record = decode_record("v=DMARC1; p=quarantine").unwrap();
        assert_eq!(record, Record::new("DMARC1", Policy::Quarantine));
    }

    #[test]
    fn test_decode_unknown_version_is_kept() {
        let record = decode_record("v=DMARC2; p=none").unwrap();
        assert_eq!(record.version, "DMARC2");
        assert!(!record.is_dmarc1());
    }

    #[test]
    fn test_decode_ignores_unknown_tags() {
        let record = decode_record("v=DMARC1; p=none; np=reject; t=y").unwrap();
        assert_eq!(record.policy, Policy::None);
    }

    #[test]
    fn test_first_failing_tag_is_reported() {
        assert_eq!(
            decode_record("v=DMARC1; p=none; adkim=x; pct=500"),
            Err(DecodeError::InvalidParameterValue("adkim".into()))
        );
    }

    #[test]
    fn test_missing_version_checked_before_policy() {
        assert_eq!(decode_record("adkim=s"), Err(DecodeError::MissingParameter("v".into())));
        assert_eq!(decode_record(""), Err(DecodeError::MissingParameter("v".into())));
    }

    #[test]
    fn test_subdomain_policy_override() {
        let record = decode_record("v=DMARC1; p=reject; sp=none; aspf=s").unwrap();
        assert_eq!(record.subdomain_policy, Some(Policy::None));
        assert_eq!(record.effective_subdomain_policy(), Policy::None);
        assert_eq!(record.spf_alignment, AlignmentMode::Strict);
    }
}
