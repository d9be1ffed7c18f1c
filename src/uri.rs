//! Mailbox URI Module
//!
//! Validates the comma-separated `mailto:` destinations of the `rua` and `ruf`
//! tags and normalizes each one to `mailto:` followed by the bare address.

use crate::error::{DecodeError, Result};
use email_address::EmailAddress;
use mailparse::addrparse;

const MAILTO: &str = "mailto:";

/// Decodes a `rua`/`ruf` value. The output may differ from the input bytes:
/// display names and surrounding whitespace are dropped.
pub fn decode_uri_list(value: &str, tag: &str) -> Result<Vec<String>> {
    value
        .split(',')
        .enumerate()
        .map(|(index, entry)| decode_uri(entry.trim(), tag, index))
        .collect()
}

fn decode_uri(entry: &str, tag: &str, index: usize) -> Result<String> {
    let invalid = || DecodeError::InvalidUri {
        parameter: tag.to_string(),
        index,
    };
    let mailbox = entry.strip_prefix(MAILTO).ok_or_else(invalid)?;
    let address = addrparse(mailbox)
        .ok()
        .and_then(|list| list.extract_single_info())
        .map(|info| info.addr)
        .ok_or_else(invalid)?;
    if !EmailAddress::is_valid(&address) {
        log::debug!("{} entry {} is not a valid mailbox: {}", tag, index, address);
        return Err(invalid());
    }
    Ok(format!("{}{}", MAILTO, address))
}
