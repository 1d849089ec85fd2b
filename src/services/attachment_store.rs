//! Attachment storage.
//!
//! Persists uploaded file contents under a per-tenant, per-month directory
//! with a collision-resistant storage name:
//!
//! ```text
//! {root}/{api_key_id}/{YYYY-MM}/{YYYYmmdd_HHMMSS}_{16 hex chars}_{safe name}
//! ```
//!
//! The month bucket keeps directory sizes bounded and makes coarse lifecycle
//! cleanup (drop a whole month) possible. The random token guarantees
//! uniqueness even for same-second uploads from the same tenant; the
//! timestamp prefix keeps listings roughly chronological.
//!
//! Writes go to a `.part` name first and are renamed into place, so a crash
//! mid-write never leaves a truncated file visible under the final name.

use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::error::AppError;

/// Result of storing one attachment.
#[derive(Debug)]
pub struct StoredAttachment {
    /// Server-generated storage filename
    pub stored_filename: String,
    /// Absolute path of the stored file
    pub path: PathBuf,
    /// Bytes actually written (never the client-declared size)
    pub size: i64,
}

/// Check whether a filename carries an allowed extension.
///
/// A file with no extension is never allowed. Matching is case-insensitive.
pub fn allowed_file(filename: &str, allowed: &HashSet<String>) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| allowed.contains(&ext.to_ascii_lowercase()))
}

/// Derive a filesystem-safe base name from a client-supplied filename.
///
/// Strips any path components, maps everything outside
/// `[A-Za-z0-9._-]` to `_`, collapses runs of `_`, and drops leading dots
/// so the result can never be a hidden file or a `..` traversal. Falls back
/// to `file` when nothing safe remains.
pub fn safe_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let mut out = String::with_capacity(base.len());
    let mut last_was_underscore = false;
    for ch in base.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
            ch
        } else {
            '_'
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_start_matches(['.', '_']).trim_end_matches('_');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Store an uploaded file under the tenant's current month bucket.
///
/// Creates the bucket directory if absent (tolerating concurrent creation),
/// writes the contents to a temporary name, renames into place, and returns
/// the storage metadata. Any I/O failure maps to `AppError::StorageWrite`; a
/// failed write leaves no partial file under the final name.
pub async fn save_attachment(
    upload_root: &Path,
    api_key_id: Uuid,
    original_filename: &str,
    contents: &[u8],
) -> Result<StoredAttachment, AppError> {
    let now = Utc::now();
    // create_dir_all succeeds when the directory already exists, so two
    // requests racing to create the same month bucket are both fine.
    let dir = upload_root
        .join(api_key_id.to_string())
        .join(now.format("%Y-%m").to_string());
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::StorageWrite(format!("create {}: {e}", dir.display())))?;

    let stored_filename = format!(
        "{}_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        hex::encode(rand::random::<[u8; 8]>()),
        safe_filename(original_filename),
    );
    let final_path = dir.join(&stored_filename);
    let part_path = dir.join(format!("{stored_filename}.part"));

    if let Err(e) = fs::write(&part_path, contents).await {
        // Leave nothing behind on a failed write.
        let _ = fs::remove_file(&part_path).await;
        return Err(AppError::StorageWrite(format!(
            "write {}: {e}",
            part_path.display()
        )));
    }

    if let Err(e) = fs::rename(&part_path, &final_path).await {
        let _ = fs::remove_file(&part_path).await;
        return Err(AppError::StorageWrite(format!(
            "rename {}: {e}",
            final_path.display()
        )));
    }

    Ok(StoredAttachment {
        stored_filename,
        path: final_path,
        size: contents.len() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> HashSet<String> {
        ["pdf", "txt", "jpg"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(allowed_file("report.PDF", &allowed()));
        assert!(allowed_file("notes.txt", &allowed()));
    }

    #[test]
    fn extension_check_rejects_unlisted_and_missing() {
        assert!(!allowed_file("run.exe", &allowed()));
        assert!(!allowed_file("noextension", &allowed()));
        assert!(!allowed_file("", &allowed()));
    }

    #[test]
    fn extension_check_uses_last_segment() {
        // Only the final extension counts, matching the gate's intent.
        assert!(allowed_file("archive.tar.txt", &allowed()));
        assert!(!allowed_file("report.pdf.exe", &allowed()));
    }

    #[test]
    fn safe_filename_strips_path_components() {
        assert_eq!(safe_filename("/etc/passwd"), "passwd");
        assert_eq!(safe_filename("..\\..\\evil.txt"), "evil.txt");
    }

    #[test]
    fn safe_filename_collapses_unsafe_chars() {
        assert_eq!(safe_filename("my report (final).pdf"), "my_report_final_.pdf");
        assert_eq!(safe_filename("résumé.pdf"), "r_sum_.pdf");
    }

    #[test]
    fn safe_filename_preserves_extension() {
        assert!(safe_filename("weird name!!.tar.gz").ends_with(".tar.gz"));
    }

    #[test]
    fn safe_filename_never_hidden_or_empty() {
        assert_eq!(safe_filename("..."), "file");
        assert_eq!(safe_filename("???"), "file");
        assert_eq!(safe_filename(".hidden.txt"), "hidden.txt");
    }

    #[tokio::test]
    async fn stores_file_in_month_bucket() {
        let root = tempfile::tempdir().unwrap();
        let tenant = Uuid::new_v4();

        let stored = save_attachment(root.path(), tenant, "hello.txt", b"hello world")
            .await
            .unwrap();

        assert_eq!(stored.size, 11);
        assert!(stored.stored_filename.ends_with("_hello.txt"));
        let expected_dir = root
            .path()
            .join(tenant.to_string())
            .join(Utc::now().format("%Y-%m").to_string());
        assert_eq!(stored.path.parent().unwrap(), expected_dir);
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn storage_names_are_unique_for_identical_uploads() {
        let root = tempfile::tempdir().unwrap();
        let tenant = Uuid::new_v4();

        let a = save_attachment(root.path(), tenant, "same.txt", b"x")
            .await
            .unwrap();
        let b = save_attachment(root.path(), tenant, "same.txt", b"x")
            .await
            .unwrap();

        assert_ne!(a.stored_filename, b.stored_filename);
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn no_part_file_remains_after_store() {
        let root = tempfile::tempdir().unwrap();
        let tenant = Uuid::new_v4();

        let stored = save_attachment(root.path(), tenant, "data.txt", b"payload")
            .await
            .unwrap();

        let dir = stored.path.parent().unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|name| name.ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn reports_bytes_actually_written() {
        let root = tempfile::tempdir().unwrap();
        let contents = vec![0u8; 2048];
        let stored = save_attachment(root.path(), Uuid::new_v4(), "blob.pdf", &contents)
            .await
            .unwrap();
        assert_eq!(stored.size, 2048);
        assert_eq!(std::fs::metadata(&stored.path).unwrap().len(), 2048);
    }
}
