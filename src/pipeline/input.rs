//! Input resolution: a user-supplied path or URL → bytes plus a mime type.
//!
//! The generation service receives every input inline, so inputs are read
//! fully into memory here. Size is checked before reading (from file metadata
//! or `Content-Length`) and again after, since a server may omit or misreport
//! the header.
//!
//! The mime type comes from the file extension first (`mime_guess`). When the
//! extension is missing or unhelpful, the leading bytes are sniffed: images
//! through `image::guess_format`, audio containers by their magic numbers.

use crate::error::GuideError;
use futures::{Stream, StreamExt, TryStreamExt};
use image::ImageFormat;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// Mime types the generation service is sent, with their aliases.
const ACCEPTED: &[(&str, &str)] = &[
    ("image/png", "image/png"),
    ("image/jpeg", "image/jpeg"),
    ("image/jpg", "image/jpeg"),
    ("image/pjpeg", "image/jpeg"),
    ("image/webp", "image/webp"),
    ("audio/mpeg", "audio/mpeg"),
    ("audio/mp3", "audio/mpeg"),
    ("audio/wav", "audio/wav"),
    ("audio/x-wav", "audio/wav"),
    ("audio/wave", "audio/wav"),
    ("audio/vnd.wave", "audio/wav"),
    ("audio/mp4", "audio/mp4"),
    ("audio/m4a", "audio/mp4"),
    ("audio/x-m4a", "audio/mp4"),
    ("audio/ogg", "audio/ogg"),
];

/// Broad category of an accepted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
}

/// One input after resolution.
#[derive(Clone)]
pub struct ResolvedMedia {
    /// Position in the caller's input list.
    pub index: usize,
    /// The path or URL as given.
    pub source: String,
    pub bytes: Vec<u8>,
    /// Canonical mime type, one of the accepted types.
    pub mime_type: String,
}

impl ResolvedMedia {
    pub fn kind(&self) -> MediaKind {
        if self.mime_type.starts_with("audio/") {
            MediaKind::Audio
        } else {
            MediaKind::Image
        }
    }
}

impl std::fmt::Debug for ResolvedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedMedia")
            .field("index", &self.index)
            .field("source", &self.source)
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve one input to its bytes and canonical mime type.
pub async fn resolve_media(
    index: usize,
    input: &str,
    download_timeout_secs: u64,
    max_bytes: u64,
) -> Result<ResolvedMedia, GuideError> {
    let (bytes, declared) = if is_url(input) {
        download_url(input, download_timeout_secs, max_bytes).await?
    } else {
        (read_local(input, max_bytes).await?, None)
    };

    let mime_type = detect_mime(input, &bytes, declared.as_deref())?;
    debug!("Input #{index} '{input}': {} bytes, {mime_type}", bytes.len());

    Ok(ResolvedMedia {
        index,
        source: input.to_string(),
        bytes,
        mime_type,
    })
}

/// Read a local file, checking existence, permission and size first.
async fn read_local(path_str: &str, max_bytes: u64) -> Result<Vec<u8>, GuideError> {
    if path_str.trim().is_empty() {
        return Err(GuideError::InvalidInput {
            input: path_str.to_string(),
        });
    }
    let path = PathBuf::from(path_str);

    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(GuideError::PermissionDenied { path });
        }
        Err(_) => return Err(GuideError::FileNotFound { path }),
    };
    if !meta.is_file() {
        return Err(GuideError::InvalidInput {
            input: path_str.to_string(),
        });
    }
    check_size(path_str, meta.len(), max_bytes)?;

    tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => GuideError::PermissionDenied { path },
        _ => GuideError::FileNotFound { path },
    })
}

/// Download a URL into memory. Returns the bytes and the declared
/// `Content-Type`, if any.
async fn download_url(
    url: &str,
    timeout_secs: u64,
    max_bytes: u64,
) -> Result<(Vec<u8>, Option<String>), GuideError> {
    info!("Downloading input from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GuideError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let to_error = |e: reqwest::Error| {
        if e.is_timeout() {
            GuideError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            GuideError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(to_error)?;

    if !response.status().is_success() {
        return Err(GuideError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }
    if let Some(len) = response.content_length() {
        check_size(url, len, max_bytes)?;
    }

    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

    let bytes = read_capped(url, response.bytes_stream().map_err(to_error), max_bytes).await?;

    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok((bytes, declared))
}

/// Collect a body stream, giving up as soon as it grows past `max_bytes`.
async fn read_capped<S, B>(source: &str, body: S, max_bytes: u64) -> Result<Vec<u8>, GuideError>
where
    S: Stream<Item = Result<B, GuideError>>,
    B: AsRef<[u8]>,
{
    let mut body = std::pin::pin!(body);
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(chunk?.as_ref());
        check_size(source, buf.len() as u64, max_bytes)?;
    }
    Ok(buf)
}

fn check_size(source: &str, size: u64, limit: u64) -> Result<(), GuideError> {
    if size > limit {
        return Err(GuideError::FileTooLarge {
            source_name: source.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

/// Work out the canonical mime type of an input, or reject it.
///
/// Order: a declared `Content-Type` that is accepted, then the extension of
/// the path (or URL path), then magic-byte sniffing.
pub fn detect_mime(
    source: &str,
    bytes: &[u8],
    declared: Option<&str>,
) -> Result<String, GuideError> {
    if let Some(mime) = declared.and_then(canonical) {
        return Ok(mime.to_string());
    }

    let guessed = mime_guess::from_path(source_path(source)).first();
    if let Some(mime) = guessed.as_ref().and_then(|m| canonical(m.essence_str())) {
        return Ok(mime.to_string());
    }

    if let Some(mime) = sniff(bytes) {
        return Ok(mime.to_string());
    }

    let reported = declared
        .map(str::to_string)
        .or_else(|| guessed.map(|m| m.essence_str().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Err(GuideError::UnsupportedMedia {
        source_name: source.to_string(),
        mime_type: reported,
    })
}

fn canonical(mime: &str) -> Option<&'static str> {
    let mime = mime.to_ascii_lowercase();
    ACCEPTED
        .iter()
        .find(|(alias, _)| *alias == mime)
        .map(|(_, canon)| *canon)
}

/// Path part of a URL, so query strings do not hide the extension.
fn source_path(source: &str) -> &str {
    if is_url(source) {
        let end = source.find(['?', '#']).unwrap_or(source.len());
        &source[..end]
    } else {
        source
    }
}

fn sniff(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => return Some("image/png"),
        Ok(ImageFormat::Jpeg) => return Some("image/jpeg"),
        Ok(ImageFormat::WebP) => return Some("image/webp"),
        _ => {}
    }
    if bytes.starts_with(b"ID3") || bytes.starts_with(&[0xFF, 0xFB]) || bytes.starts_with(&[0xFF, 0xF3]) {
        return Some("audio/mpeg");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        return Some("audio/wav");
    }
    if bytes.starts_with(b"OggS") {
        return Some("audio/ogg");
    }
    if bytes.len() >= 11 && &bytes[4..8] == b"ftyp" && &bytes[8..11] == b"M4A" {
        return Some("audio/mp4");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io::Write;

    #[tokio::test]
    async fn capped_read_stops_at_the_first_chunk_over_the_limit() {
        let pulled = std::cell::Cell::new(0);
        let chunks = stream::iter(0..100).map(|_| {
            pulled.set(pulled.get() + 1);
            Ok::<_, GuideError>(vec![0u8; 400])
        });
        let err = read_capped("https://cdn.example.com/clase.mp3", chunks, 1000)
            .await
            .unwrap_err();
        match err {
            GuideError::FileTooLarge { size, limit, .. } => {
                assert_eq!(limit, 1000);
                assert_eq!(size, 1200);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pulled.get(), 3);
    }

    #[tokio::test]
    async fn capped_read_collects_a_small_body() {
        let chunks = stream::iter(vec![Ok::<_, GuideError>(b"ab".to_vec()), Ok(b"cd".to_vec())]);
        let bytes = read_capped("u", chunks, 4).await.unwrap();
        assert_eq!(bytes, b"abcd");
    }

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/pizarra.jpg"));
        assert!(is_url("http://example.com/clase.mp3"));
        assert!(!is_url("/tmp/pizarra.jpg"));
        assert!(!is_url("pizarra.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(detect_mime("apuntes.PNG", b"", None).unwrap(), "image/png");
        assert_eq!(detect_mime("foto.jpg", b"", None).unwrap(), "image/jpeg");
        assert_eq!(detect_mime("foto.webp", b"", None).unwrap(), "image/webp");
        assert_eq!(detect_mime("clase.mp3", b"", None).unwrap(), "audio/mpeg");
        assert_eq!(detect_mime("clase.wav", b"", None).unwrap(), "audio/wav");
        assert_eq!(detect_mime("clase.ogg", b"", None).unwrap(), "audio/ogg");
    }

    #[test]
    fn mime_from_magic_bytes() {
        assert_eq!(detect_mime("scan", PNG_MAGIC, None).unwrap(), "image/png");
        assert_eq!(detect_mime("nota", b"ID3\x04\0\0", None).unwrap(), "audio/mpeg");
        assert_eq!(
            detect_mime("grabacion", b"RIFF\0\0\0\0WAVEfmt ", None).unwrap(),
            "audio/wav"
        );
    }

    #[test]
    fn declared_content_type_wins() {
        let mime = detect_mime("https://cdn.example.com/x?id=4", b"", Some("image/jpeg")).unwrap();
        assert_eq!(mime, "image/jpeg");
    }

    #[test]
    fn url_query_does_not_hide_extension() {
        let mime = detect_mime("https://cdn.example.com/a/pizarra.webp?sig=abc", b"", None).unwrap();
        assert_eq!(mime, "image/webp");
    }

    #[test]
    fn documents_are_rejected() {
        let err = detect_mime("tarea.docx", b"PK\x03\x04", None).unwrap_err();
        match err {
            GuideError::UnsupportedMedia { source_name, mime_type } => {
                assert_eq!(source_name, "tarea.docx");
                assert!(mime_type.contains("officedocument") || mime_type.contains("word"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(detect_mime("notas.txt", b"hola", None).is_err());
        assert!(detect_mime("animado.gif", b"GIF89a", None).is_err());
    }

    #[tokio::test]
    async fn resolves_local_file() {
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        tmp.write_all(PNG_MAGIC).unwrap();
        let path = tmp.path().to_string_lossy().to_string();

        let media = resolve_media(3, &path, 5, 1024).await.unwrap();
        assert_eq!(media.index, 3);
        assert_eq!(media.source, path);
        assert_eq!(media.bytes, PNG_MAGIC);
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.kind(), MediaKind::Image);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_media(0, "/no/such/dir/pizarra.png", 5, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, GuideError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn oversized_file_is_refused() {
        let mut tmp = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        tmp.write_all(&[0u8; 64]).unwrap();
        let path = tmp.path().to_string_lossy().to_string();

        let err = resolve_media(0, &path, 5, 16).await.unwrap_err();
        assert!(matches!(
            err,
            GuideError::FileTooLarge { size: 64, limit: 16, .. }
        ));
    }

    #[tokio::test]
    async fn directory_is_not_an_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_media(0, &dir.path().to_string_lossy(), 5, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, GuideError::InvalidInput { .. }));
    }
}
