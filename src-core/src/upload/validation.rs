//! Selection gate applied before a file is accepted into a session.

use crate::error::KaleError;

/// Largest accepted upload, in bytes (5 MiB).
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Lower-cased text after the last `.`, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// `image/*` check. Parameters after `;` are ignored.
pub fn is_image_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
    match essence.split_once('/') {
        Some((top, sub)) => top == "image" && !sub.is_empty(),
        None => false,
    }
}

/// Validate a picked or dropped file. Checks run in the order the user
/// would fix them: extension, MIME type, then size.
pub fn validate_selection(file_name: &str, mime: &str, size: u64) -> Result<(), KaleError> {
    let allowed = file_extension(file_name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if !allowed {
        return Err(KaleError::Validation(
            "Only PNG, JPG, and JPEG files are allowed.".to_string(),
        ));
    }

    if !is_image_mime(mime) {
        return Err(KaleError::Validation("Please select an image file".to_string()));
    }

    if size > MAX_FILE_BYTES {
        return Err(KaleError::Validation(
            "File size should be less than 5MB".to_string(),
        ));
    }

    Ok(())
}

/// Best-effort MIME type from a file name, for callers without one
/// (native paths, reconstructed handoff files).
pub fn mime_from_name(file_name: &str) -> &'static str {
    match file_extension(file_name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(file_extension("Kale.JPEG"), Some("jpeg".to_string()));
        assert_eq!(file_extension("archive.tar.png"), Some("png".to_string()));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_accepts_valid_files() {
        assert!(validate_selection("leaf.png", "image/png", 1024).is_ok());
        assert!(validate_selection("leaf.JPG", "image/jpeg", MAX_FILE_BYTES).is_ok());
    }

    #[test]
    fn test_rejects_bad_extension() {
        for name in ["leaf.gif", "leaf.webp", "leaf", "leaf.png.exe"] {
            let err = validate_selection(name, "image/png", 10).unwrap_err();
            assert!(err.to_string().contains("Only PNG, JPG, and JPEG"), "{}", name);
        }
    }

    #[test]
    fn test_rejects_non_image_mime() {
        let err = validate_selection("leaf.png", "text/plain", 10).unwrap_err();
        assert_eq!(err.to_string(), "Please select an image file");
        assert!(validate_selection("leaf.png", "", 10).is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let err = validate_selection("leaf.png", "image/png", MAX_FILE_BYTES + 1).unwrap_err();
        assert!(err.to_string().contains("5MB"));
    }

    #[test]
    fn test_mime_helpers() {
        assert!(is_image_mime("image/jpeg; charset=binary"));
        assert!(!is_image_mime("image/"));
        assert_eq!(mime_from_name("x.jpeg"), "image/jpeg");
        assert_eq!(mime_from_name("x.bin"), "application/octet-stream");
    }
}
