use rocket::fs::TempFile;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// Where a persisted upload landed and what it was called.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub url: String,
    pub file_name: String,
}

pub fn extension_from_filename(name: &str) -> Option<String> {
    if let Some(ext) = Path::new(name).extension() {
        return ext.to_str().map(|s| s.to_lowercase());
    }

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() >= 2 {
        let last = parts.last()?;
        return Some(last.to_lowercase());
    }

    None
}

pub fn extension_from_content_type(content_type: &str) -> Option<String> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg".to_string()),
        "image/png" => Some("png".to_string()),
        "image/webp" => Some("webp".to_string()),
        "application/pdf" => Some("pdf".to_string()),
        _ => None,
    }
}

pub fn is_valid_image_extension(ext: &str) -> bool {
    matches!(ext, "jpg" | "jpeg" | "png" | "webp")
}

pub fn is_valid_document_extension(ext: &str) -> bool {
    matches!(ext, "pdf" | "jpg" | "jpeg" | "png" | "webp")
}

fn resolve_extension(file: &TempFile<'_>) -> Option<String> {
    resolve_extension_parts(file.name(), file.content_type())
}

fn resolve_extension_parts(
    name: Option<&str>,
    content_type: Option<&rocket::http::ContentType>,
) -> Option<String> {
    if let Some(name) = name {
        if let Some(ext) = extension_from_filename(name) {
            return Some(ext);
        }
    }
    if let Some(ct) = content_type {
        let ct_str = ct.to_string();
        if let Some(ext) = extension_from_content_type(&ct_str) {
            return Some(ext);
        }
        if let Some(ext) = ct.extension() {
            return Some(ext.as_str().to_lowercase());
        }
    }
    None
}

/// Persist an application document (pdf or image) under `uploads/<dir>`.
pub async fn save_document_upload(file: &mut TempFile<'_>, dir: &str) -> Result<StoredFile, String> {
    let extension = resolve_extension(file)
        .ok_or_else(|| "Cannot determine file type from filename or content type".to_string())?;

    if !is_valid_document_extension(&extension) {
        return Err(format!("Unsupported document file type: .{}", extension));
    }

    persist(file, dir, &extension).await
}

/// Persist a catalog image under `uploads/<dir>`; pdf and friends are
/// rejected here, only image types are served on the listing pages.
pub async fn save_image_upload(file: &mut TempFile<'_>, dir: &str) -> Result<StoredFile, String> {
    let extension = resolve_extension(file)
        .ok_or_else(|| "Cannot determine file type from filename or content type".to_string())?;

    if !is_valid_image_extension(&extension) {
        return Err(format!("Unsupported image file type: .{}", extension));
    }

    persist(file, dir, &extension).await
}

/// Write the file under `uploads/<dir>` with a collision-proof name and
/// hand back the URL it will be served from.
async fn persist(file: &mut TempFile<'_>, dir: &str, extension: &str) -> Result<StoredFile, String> {
    let upload_dir = format!("uploads/{}", dir);
    fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| format!("Failed to create directory: {}", e))?;

    let original_name = file.name().map(|n| n.to_string()).unwrap_or_default();
    let filename = format!(
        "{}_{}.{}",
        Uuid::new_v4(),
        chrono::Utc::now().timestamp(),
        extension
    );
    let filepath = format!("{}/{}", upload_dir, filename);

    file.persist_to(&filepath)
        .await
        .map_err(|e| format!("Failed to save file: {}", e))?;

    debug!("Saved upload {} -> {}", original_name, filepath);

    Ok(StoredFile {
        url: format!("/{}", filepath),
        file_name: if original_name.is_empty() { filename } else { original_name },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_from_last_dot_segment() {
        assert_eq!(extension_from_filename("passport.PDF"), Some("pdf".to_string()));
        assert_eq!(extension_from_filename("a.b.jpeg"), Some("jpeg".to_string()));
        assert_eq!(extension_from_filename("noext"), None);
    }

    #[test]
    fn content_type_fallback_covers_common_types() {
        assert_eq!(extension_from_content_type("image/png"), Some("png".to_string()));
        assert_eq!(extension_from_content_type("application/pdf"), Some("pdf".to_string()));
        assert_eq!(extension_from_content_type("text/html"), None);
    }

    #[test]
    fn document_extensions_accept_pdf_images_only() {
        assert!(is_valid_document_extension("pdf"));
        assert!(is_valid_document_extension("jpg"));
        assert!(!is_valid_document_extension("exe"));
        assert!(is_valid_image_extension("webp"));
        assert!(!is_valid_image_extension("pdf"));
    }

    #[test]
    fn extension_resolution_falls_back_to_content_type() {
        use rocket::http::ContentType;

        assert_eq!(
            resolve_extension_parts(Some("scan"), Some(&ContentType::PDF)),
            Some("pdf".to_string())
        );
        assert_eq!(
            resolve_extension_parts(Some("photo.JPG"), None),
            Some("jpg".to_string())
        );
        assert_eq!(resolve_extension_parts(Some("blob"), None), None);
    }
}
