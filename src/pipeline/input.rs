//! Input resolution: turn a path, URL or byte buffer into a typed document.
//!
//! The AI service needs the raw bytes plus a MIME type. Browsers get the type
//! from the file picker; here it is sniffed from the content so a mislabelled
//! extension cannot smuggle an unsupported file through. Accepted: PDF, Word
//! (`.doc` and `.docx`) and the common raster image formats.

use crate::error::DocDeckError;
use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// A document ready for extraction.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File name (or URL) for logs and progress events.
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl SourceDocument {
    /// Wrap in-memory bytes, detecting and validating the type.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DocDeckError> {
        let name = name.into();
        match detect_mime(&bytes) {
            Some(mime_type) => {
                debug!("Detected {} for '{}' ({} bytes)", mime_type, name, bytes.len());
                Ok(Self {
                    name,
                    bytes,
                    mime_type,
                })
            }
            None => Err(DocDeckError::UnsupportedDocument {
                name,
                detected: describe_magic(&bytes),
            }),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP(S) URL to a [`SourceDocument`].
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceDocument, DocDeckError> {
    if input.trim().is_empty() {
        return Err(DocDeckError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input)).await
    }
}

/// Sniff the MIME type from magic bytes. `None` means unsupported.
pub fn detect_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF") {
        return Some(MIME_PDF);
    }
    if bytes.starts_with(&OLE2_MAGIC) {
        return Some(MIME_DOC);
    }
    if bytes.starts_with(b"PK\x03\x04") {
        return is_docx(bytes).then_some(MIME_DOCX);
    }
    match image::guess_format(bytes) {
        Ok(
            format @ (ImageFormat::Png
            | ImageFormat::Jpeg
            | ImageFormat::Gif
            | ImageFormat::WebP
            | ImageFormat::Bmp
            | ImageFormat::Tiff),
        ) => Some(format.to_mime_type()),
        _ => None,
    }
}

/// A ZIP is a Word document when it carries the main document part.
fn is_docx(bytes: &[u8]) -> bool {
    let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
        return false;
    };
    let found = archive.by_name("word/document.xml").is_ok();
    found
}

fn describe_magic(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "empty file".to_string();
    }
    if bytes.starts_with(b"PK\x03\x04") {
        return "zip archive".to_string();
    }
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) => {
            let head: Vec<String> = bytes.iter().take(4).map(|b| format!("{b:02X}")).collect();
            format!("unknown, first bytes {}", head.join(" "))
        }
    }
}

async fn resolve_local(path: &Path) -> Result<SourceDocument, DocDeckError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => DocDeckError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => DocDeckError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    SourceDocument::from_bytes(name, bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceDocument, DocDeckError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DocDeckError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DocDeckError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocDeckError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(DocDeckError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DocDeckError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    SourceDocument::from_bytes(filename_from_url(url), bytes.to_vec())
}

/// Last path segment of a URL, or a generic name.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_else(|| "downloaded-document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", opts).unwrap();
            zip.write_all(b"<w:document/>").unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/de-thi.pdf"));
        assert!(is_url("http://example.com/de-thi.pdf"));
        assert!(!is_url("/tmp/de-thi.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn detects_pdf_and_word() {
        assert_eq!(detect_mime(b"%PDF-1.7\n..."), Some(MIME_PDF));
        assert_eq!(detect_mime(&OLE2_MAGIC), Some(MIME_DOC));
        assert_eq!(detect_mime(&docx_bytes()), Some(MIME_DOCX));
    }

    #[test]
    fn detects_images() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(detect_mime(&png), Some("image/png"));
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];
        assert_eq!(detect_mime(&jpeg), Some("image/jpeg"));
    }

    #[test]
    fn rejects_plain_zip_and_text() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("notes.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
        }
        assert_eq!(detect_mime(&buf.into_inner()), None);
        assert_eq!(detect_mime(b"just some text"), None);
    }

    #[test]
    fn from_bytes_reports_unsupported() {
        let err = SourceDocument::from_bytes("notes.txt", b"hello".to_vec()).unwrap_err();
        match err {
            DocDeckError::UnsupportedDocument { name, detected } => {
                assert_eq!(name, "notes.txt");
                assert!(detected.contains("68 65 6C 6C"), "got: {detected}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://x.org/files/de-thi.pdf"), "de-thi.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "downloaded-document");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, DocDeckError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn resolves_local_pdf() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.4\n%%EOF").unwrap();
        let doc = resolve_input(tmp.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.mime_type, MIME_PDF);
        assert!(doc.name.ends_with(".pdf"));
    }
}
