/// Security tests for dmarc-decoder.
///
/// This module verifies that report extraction and decoding are protected against common attacks:
/// - ZIP Bombs (by enforcing decompression and file count limits)
/// - XML External Entity (XXE) Injection
/// - Directory Traversal attacks in archive filenames
/// - Billion Laughs (recursive XML entity) attacks
use std::fs::File;
use std::io::Write;
use tempfile::tempdir;
use std::time::Instant;
use anyhow::Result;
use zip::write::SimpleFileOptions;
#[cfg(test)]
mod tests {
    use super::*;
    use dmarc_decoder::{decode_report, extract_reports, Config, DecodeError};
    const MAX_PROCESSING_TIME_MS: u128 = 2000; // 2 seconds for test
    const TEST_BOMB_SIZE: usize = 2 * 1024 * 1024; // 2MB bomb for test
    /// Test protection against a ZIP bomb attack.
    #[test]
    fn test_zip_bomb_protection() -> Result<()> {
        let dir = tempdir()?;
        let zip_path = dir.path().join("zipbomb.zip");
        let file = File::create(&zip_path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("large.xml", options)?;
        zip.write_all("A".repeat(TEST_BOMB_SIZE).as_bytes())?;
        zip.finish()?;
        let config = Config {
            max_decompressed_size: 1024 * 1024,
            ..Config::default()
        };
        let start = Instant::now();
        let result = extract_reports(&zip_path, &config);
        let duration = start.elapsed();
        assert!(
            duration.as_millis() < MAX_PROCESSING_TIME_MS,
            "ZIP bomb processing too slow: {:?}",
            duration
        );
        let err = result.expect_err("ZIP bomb should be blocked");
        assert!(
            err.to_string().contains("too large") || err.to_string().contains("Suspicious compression ratio"),
            "Unexpected error: {}",
            err
        );
        Ok(())
    }
    /// Test protection against directory traversal in ZIP file entries.
    #[test]
    fn test_directory_traversal_protection() -> Result<()> {
        let dir = tempdir()?;
        let zip_path = dir.path().join("traversal.zip");
        let file = File::create(&zip_path)?;
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("../../../etc/passwd", SimpleFileOptions::default())?;
        zip.write_all(b"fake passwd file")?;
        zip.finish()?;
        let result = extract_reports(&zip_path, &Config::default());
        assert!(result.is_err(), "Should block directory traversal attempt");
        Ok(())
    }
    /// Test protection against XXE (XML External Entity Injection).
    #[test]
    fn test_xxe_protection() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE foo [
            <!ENTITY xxe SYSTEM "file:///etc/passwd">
        ]>
        <feedback>
            <record>
                <row>
                    <source_ip>1.2.3.4</source_ip>
                    <count>1</count>
                </row>
                <identifiers>
                    <header_from>example.com</header_from>
                </identifiers>
            </record>
        </feedback>
        "#;
        let report = decode_report(xml.as_bytes()).expect("declared but unused entity is harmless");
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].identifiers.header_from, "example.com");
    }
    /// A reference to an external entity must not be resolved.
    #[test]
    fn test_xxe_reference_is_not_expanded() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE foo [
            <!ENTITY xxe SYSTEM "file:///etc/passwd">
        ]>
        <feedback>
            <report_metadata>
                <org_name>&xxe;</org_name>
            </report_metadata>
        </feedback>
        "#;
        let result = decode_report(xml.as_bytes());
        assert!(matches!(result, Err(DecodeError::InvalidDocument(_))), "{:?}", result);
    }
    /// Test protection against the Billion Laughs attack (recursive XML entities).
    #[test]
    fn test_billion_laughs_protection() {
        let xml = r#"<?xml version="1.0"?>
        <!DOCTYPE lolz [
            <!ENTITY lol "lol">
            <!ENTITY lol2 "&lol;&lol;">
            <!ENTITY lol3 "&lol2;&lol2;">
            <!ENTITY lol4 "&lol3;&lol3;">
            <!ENTITY lol5 "&lol4;&lol4;">
            <!ENTITY lol6 "&lol5;&lol5;">
            <!ENTITY lol7 "&lol6;&lol6;">
            <!ENTITY lol8 "&lol7;&lol7;">
            <!ENTITY lol9 "&lol8;&lol8;">
        ]>
        <feedback>
            <report_metadata>
                <org_name>&lol9;</org_name>
            </report_metadata>
        </feedback>
        "#;
        let start = Instant::now();
        let result = decode_report(xml.as_bytes());
        let duration = start.elapsed();
        assert!(
            duration.as_millis() < MAX_PROCESSING_TIME_MS,
            "XML Billion Laughs was not blocked in time"
        );
        assert_eq!(
            result,
            Err(DecodeError::InvalidDocument("recursive entities detected".into()))
        );
    }
}
