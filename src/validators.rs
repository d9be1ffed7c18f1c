//! Field Validators Module
//!
//! One validator per policy-record tag. Each takes the trimmed tag value and the
//! tag name, and either returns the typed value or the error naming that tag.

use crate::error::{DecodeError, Result};
use crate::models::{AlignmentMode, FailureOption, Policy, ReportFormat};
use std::time::Duration;

/// Validates `p` and `sp`.
pub fn parse_policy(value: &str, tag: &str) -> Result<Policy> {
    value
        .parse()
        .map_err(|_| DecodeError::InvalidParameterValue(tag.to_string()))
}

/// Validates `adkim` and `aspf`.
pub fn parse_alignment_mode(value: &str, tag: &str) -> Result<AlignmentMode> {
    value
        .parse()
        .map_err(|_| DecodeError::InvalidParameterValue(tag.to_string()))
}

/// Validates `fo`. Order and duplicates are preserved; one bad token rejects the tag.
pub fn parse_failure_options(value: &str) -> Result<Vec<FailureOption>> {
    value
        .split(':')
        .map(|token| {
            token
                .trim()
                .parse()
                .map_err(|_| DecodeError::InvalidParameterValue("fo".to_string()))
        })
        .collect()
}

/// Validates `pct`: an integer in `0..=100`.
pub fn parse_percent(value: &str) -> Result<u8> {
    let pct: i64 = value
        .parse()
        .map_err(|_| DecodeError::InvalidParameterValue("pct".to_string()))?;
    u8::try_from(pct)
        .ok()
        .filter(|pct| *pct <= 100)
        .ok_or_else(|| DecodeError::OutOfBounds("pct".to_string()))
}

/// Validates `rf`.
pub fn parse_report_formats(value: &str) -> Result<Vec<ReportFormat>> {
    value
        .split(':')
        .map(|token| {
            token
                .trim()
                .parse()
                .map_err(|_| DecodeError::InvalidParameterValue("rf".to_string()))
        })
        .collect()
}

/// Validates `ri`: a strictly positive number of seconds.
pub fn parse_report_interval(value: &str) -> Result<Duration> {
    let secs: i64 = value
        .parse()
        .map_err(|_| DecodeError::InvalidParameterValue("ri".to_string()))?;
    if secs <= 0 {
        return Err(DecodeError::OutOfBounds("ri".to_string()));
    }
    Ok(Duration::from_secs(secs as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy() {
        assert_eq!(parse_policy("none", "p"), Ok(Policy::None));
        assert_eq!(parse_policy("quarantine", "sp"), Ok(Policy::Quarantine));
        assert_eq!(parse_policy("reject", "p"), Ok(Policy::Reject));
        assert_eq!(
            parse_policy("unknown", "sp"),
            Err(DecodeError::InvalidParameterValue("sp".into()))
        );
    }

    #[test]
    fn test_parse_alignment_mode() {
        assert_eq!(parse_alignment_mode("r", "adkim"), Ok(AlignmentMode::Relaxed));
        assert_eq!(parse_alignment_mode("s", "aspf"), Ok(AlignmentMode::Strict));
        assert_eq!(
            parse_alignment_mode("x", "aspf"),
            Err(DecodeError::InvalidParameterValue("aspf".into()))
        );
    }

    #[test]
    fn test_parse_failure_options() {
        assert_eq!(parse_failure_options("d:s"), Ok(vec![FailureOption::Dkim, FailureOption::Spf]));
        assert_eq!(
            parse_failure_options("1:1:0"),
            Ok(vec![FailureOption::Any, FailureOption::Any, FailureOption::All])
        );
        assert_eq!(
            parse_failure_options("0:x"),
            Err(DecodeError::InvalidParameterValue("fo".into()))
        );
        assert!(parse_failure_options("").is_err());
    }

    #[test]
    fn test_parse_percent_bounds() {
        assert_eq!(parse_percent("0"), Ok(0));
        assert_eq!(parse_percent("100"), Ok(100));
        assert_eq!(parse_percent("-1"), Err(DecodeError::OutOfBounds("pct".into())));
        assert_eq!(parse_percent("101"), Err(DecodeError::OutOfBounds("pct".into())));
        assert_eq!(parse_percent("1000"), Err(DecodeError::OutOfBounds("pct".into())));
        assert_eq!(parse_percent("half"), Err(DecodeError::InvalidParameterValue("pct".into())));
    }

    #[test]
    fn test_parse_report_formats() {
        assert_eq!(parse_report_formats("afrf"), Ok(vec![ReportFormat::Afrf]));
        assert_eq!(
            parse_report_formats("afrf:iodef"),
            Err(DecodeError::InvalidParameterValue("rf".into()))
        );
    }

    #[test]
    fn test_parse_report_interval() {
        assert_eq!(parse_report_interval("3600"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_report_interval("0"), Err(DecodeError::OutOfBounds("ri".into())));
        assert_eq!(parse_report_interval("-60"), Err(DecodeError::OutOfBounds("ri".into())));
        assert_eq!(
            parse_report_interval("daily"),
            Err(DecodeError::InvalidParameterValue("ri".into()))
        );
    }
}
