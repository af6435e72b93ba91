//! Source document sniffing.
//!
//! The extractor only accepts PDF input; this module checks the `%PDF-x.y`
//! header before the file is handed to the PDF reader.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3;

/// Read the header of `path` and return the declared PDF version (e.g. "1.7").
///
/// # Example
/// ```no_run
/// use transpdf::detect::pdf_version_from_path;
///
/// let version = pdf_version_from_path("paper.pdf").unwrap();
/// println!("PDF {}", version);
/// ```
pub fn pdf_version_from_path<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut header = Vec::with_capacity(16);
    File::open(path)?.take(16).read_to_end(&mut header)?;
    pdf_version_from_bytes(&header)
}

/// Return the declared PDF version from the first bytes of a file.
pub fn pdf_version_from_bytes(data: &[u8]) -> Result<String> {
    let Some(rest) = data.strip_prefix(PDF_MAGIC) else {
        return Err(Error::UnknownFormat);
    };
    if rest.len() < VERSION_LEN {
        return Err(Error::UnknownFormat);
    }

    let version = String::from_utf8_lossy(&rest[..VERSION_LEN]).to_string();
    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }
    Ok(version)
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check whether `path` looks like a PDF file.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    pdf_version_from_path(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_pdf() {
        let version = pdf_version_from_bytes(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3").unwrap();
        assert_eq!(version, "1.7");
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = pdf_version_from_bytes(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_too_short() {
        let result = pdf_version_from_bytes(b"%PDF-1");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_bad_version() {
        let result = pdf_version_from_bytes(b"%PDF-x.y\n");
        assert!(matches!(result, Err(Error::UnsupportedVersion(_))));
    }

    #[test]
    fn test_is_pdf_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        let txt = dir.path().join("a.txt");
        std::fs::write(&pdf, b"%PDF-1.4\n%%EOF\n").unwrap();
        std::fs::write(&txt, b"plain text").unwrap();

        assert!(is_pdf(&pdf));
        assert!(!is_pdf(&txt));
        assert!(!is_pdf(dir.path().join("missing.pdf")));
    }
}
