//! Upload validation.
//!
//! Turns a raw transport request into an `UploadCandidate`, or a
//! validation error before anything is encrypted or persisted.

use tracing::{debug, warn};

use super::PipelineError;

/// Uploader recorded when anonymous uploads are explicitly allowed.
pub const UNKNOWN_UPLOADER: &str = "unknown";

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Filename used when the transport supplied none.
const FALLBACK_FILENAME: &str = "document";

/// Everything the transport layer collected for one upload.
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub payload: Option<Vec<u8>>,
    pub filename: Option<String>,
    pub declared_size: Option<u64>,
    pub declared_mime: Option<String>,
    pub case_id: Option<String>,
    pub uploader: Option<String>,
}

/// A validated upload, ready for the codec.
#[derive(Debug)]
pub struct UploadCandidate {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub filesize: i64,
    pub filetype: String,
    pub case_id: String,
    pub uploaded_by: String,
}

/// Validate an upload request.
///
/// Checks, in order: payload present, case id present, size ceiling,
/// uploader identity.
pub fn validate_upload(
    request: UploadRequest,
    max_bytes: usize,
    allow_anonymous: bool,
) -> Result<UploadCandidate, PipelineError> {
    let bytes = request
        .payload
        .filter(|b| !b.is_empty())
        .ok_or_else(|| PipelineError::Validation("No file uploaded".into()))?;

    let case_id = request
        .case_id
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| PipelineError::Validation("Case ID is required".into()))?;

    if bytes.len() > max_bytes {
        return Err(PipelineError::Validation(format!(
            "File too large: {} bytes exceeds the {max_bytes} byte limit",
            bytes.len()
        )));
    }

    let uploaded_by = resolve_uploader(request.uploader.as_deref(), allow_anonymous)?;

    if let Some(declared) = request.declared_size {
        if declared != bytes.len() as u64 {
            warn!(
                declared,
                actual = bytes.len(),
                case_id = %case_id,
                "Declared file size does not match payload; storing actual size"
            );
        }
    }

    let filename = request
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());
    let filetype = resolve_filetype(&bytes, request.declared_mime.as_deref(), &filename);

    debug!(
        case_id = %case_id,
        filetype = %filetype,
        size = bytes.len(),
        "Upload validated"
    );

    Ok(UploadCandidate {
        filesize: bytes.len() as i64,
        bytes,
        filename,
        filetype,
        case_id,
        uploaded_by,
    })
}

fn resolve_uploader(uploader: Option<&str>, allow_anonymous: bool) -> Result<String, PipelineError> {
    match uploader.map(str::trim).filter(|u| !u.is_empty()) {
        Some(user) => Ok(user.to_string()),
        None if allow_anonymous => {
            warn!("Upload without caller identity; recording uploader as \"{UNKNOWN_UPLOADER}\"");
            Ok(UNKNOWN_UPLOADER.to_string())
        }
        None => Err(PipelineError::Unauthenticated),
    }
}

/// Pick the stored MIME type: magic bytes first, then the declared type,
/// then a guess from the filename extension.
pub fn resolve_filetype(bytes: &[u8], declared: Option<&str>, filename: &str) -> String {
    if let Some(sniffed) = sniff_mime(bytes) {
        return sniffed.to_string();
    }
    if let Some(declared) = declared.map(str::trim).filter(|d| !d.is_empty() && *d != OCTET_STREAM) {
        return declared.to_string();
    }
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Detect a MIME type from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x25, 0x50, 0x44, 0x46, ..] => Some("application/pdf"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some("image/tiff"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [_, _, _, _, b'f', b't', b'y', b'p', b'h', b'e', b'i', b'c' | b'f' | b'x', ..] => {
            Some("image/heic")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_UPLOAD_BYTES;

    fn request(payload: Vec<u8>) -> UploadRequest {
        UploadRequest {
            payload: Some(payload),
            filename: Some("scan.pdf".into()),
            declared_size: None,
            declared_mime: Some("application/pdf".into()),
            case_id: Some("case-1".into()),
            uploader: Some("patient-1".into()),
        }
    }

    #[test]
    fn accepts_payload_at_exact_limit() {
        let candidate =
            validate_upload(request(vec![0u8; DEFAULT_MAX_UPLOAD_BYTES]), DEFAULT_MAX_UPLOAD_BYTES, false)
                .unwrap();
        assert_eq!(candidate.filesize, DEFAULT_MAX_UPLOAD_BYTES as i64);
    }

    #[test]
    fn rejects_one_byte_over_limit() {
        let err = validate_upload(
            request(vec![0u8; DEFAULT_MAX_UPLOAD_BYTES + 1]),
            DEFAULT_MAX_UPLOAD_BYTES,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(msg) if msg.contains("too large")));
    }

    #[test]
    fn missing_payload_is_validation_error() {
        let mut req = request(vec![]);
        req.payload = None;
        assert!(matches!(
            validate_upload(req, 1024, false),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn empty_payload_is_validation_error() {
        assert!(matches!(
            validate_upload(request(vec![]), 1024, false),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn blank_case_id_is_validation_error() {
        let mut req = request(b"%PDF-1.7".to_vec());
        req.case_id = Some("   ".into());
        let err = validate_upload(req, 1024, false).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(msg) if msg.contains("Case ID")));
    }

    #[test]
    fn missing_identity_rejected_by_default() {
        let mut req = request(b"%PDF-1.7".to_vec());
        req.uploader = None;
        assert!(matches!(
            validate_upload(req, 1024, false),
            Err(PipelineError::Unauthenticated)
        ));
    }

    #[test]
    fn missing_identity_recorded_as_unknown_when_allowed() {
        let mut req = request(b"%PDF-1.7".to_vec());
        req.uploader = Some("  ".into());
        let candidate = validate_upload(req, 1024, true).unwrap();
        assert_eq!(candidate.uploaded_by, UNKNOWN_UPLOADER);
    }

    #[test]
    fn filesize_is_actual_length_not_declared() {
        let mut req = request(b"%PDF-1.7 body".to_vec());
        req.declared_size = Some(999_999);
        let candidate = validate_upload(req, 1024, false).unwrap();
        assert_eq!(candidate.filesize, 13);
    }

    #[test]
    fn sniffed_type_wins_over_declared() {
        let mut req = request(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0]);
        req.declared_mime = Some("application/pdf".into());
        let candidate = validate_upload(req, 1024, false).unwrap();
        assert_eq!(candidate.filetype, "image/png");
    }

    #[test]
    fn declared_type_used_when_unsniffable() {
        assert_eq!(
            resolve_filetype(b"hello", Some("text/plain"), "notes.bin"),
            "text/plain"
        );
    }

    #[test]
    fn extension_guess_when_nothing_declared() {
        assert_eq!(resolve_filetype(b"hello", None, "notes.txt"), "text/plain");
        assert_eq!(resolve_filetype(b"hello", Some(OCTET_STREAM), "notes.txt"), "text/plain");
    }

    #[test]
    fn octet_stream_as_last_resort() {
        assert_eq!(resolve_filetype(b"\x00\x01", None, "blob"), OCTET_STREAM);
    }

    #[test]
    fn missing_filename_gets_fallback() {
        let mut req = request(b"%PDF-1.7".to_vec());
        req.filename = None;
        assert_eq!(validate_upload(req, 1024, false).unwrap().filename, "document");
    }

    #[test]
    fn sniffs_known_signatures() {
        assert_eq!(sniff_mime(b"%PDF-1.4"), Some("application/pdf"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_mime(&[0x49, 0x49, 0x2A, 0x00]), Some("image/tiff"));
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_mime(b"\x00\x00\x00\x18ftypheic"), Some("image/heic"));
        assert_eq!(sniff_mime(b"plain"), None);
        assert_eq!(sniff_mime(&[]), None);
    }
}
