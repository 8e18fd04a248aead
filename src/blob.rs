use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ident;

/// Metadata for one stored file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    #[serde(rename = "_id")]
    pub id: String,
    pub filename: String,
    pub form_id: String,
    pub question_id: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_at: String,
}

/// Upload input: where the file belongs and what the client declared it as.
#[derive(Debug, Clone)]
pub struct NewStoredFile {
    pub form_id: String,
    pub question_id: String,
    pub original_name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open a blob store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(BlobStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Persist bytes and metadata as a unit and return the new file id.
    /// The stored filename disambiguates with a millisecond timestamp and a
    /// random token ahead of the original name. No size or type validation
    /// happens here; that is the caller's concern.
    pub fn store(
        &self,
        conn: &Connection,
        bytes: &[u8],
        meta: NewStoredFile,
    ) -> Result<StoredFile, AppError> {
        let id = ident::generate();
        let timestamp = chrono::Utc::now().timestamp_millis();
        let token = ident::generate();
        // Keep the original name readable but strip path separators.
        let safe_name = meta
            .original_name
            .replace(['/', '\\'], "_");
        let filename = format!("{timestamp}_{token}_{safe_name}");

        fs::write(self.path_for(&filename), bytes)?;

        let stored = StoredFile {
            id,
            filename,
            form_id: meta.form_id,
            question_id: meta.question_id,
            original_name: meta.original_name,
            mime_type: meta.mime_type,
            size: bytes.len() as u64,
            uploaded_at: chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };
        let inserted = conn.execute(
            "INSERT INTO files (id, filename, form_id, question_id, original_name, \
             mime_type, size, uploaded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id,
                stored.filename,
                stored.form_id,
                stored.question_id,
                stored.original_name,
                stored.mime_type,
                stored.size,
                stored.uploaded_at
            ],
        );
        if let Err(e) = inserted {
            // Metadata insert failed: don't leave orphan bytes behind.
            let _ = fs::remove_file(self.path_for(&stored.filename));
            return Err(e.into());
        }
        Ok(stored)
    }

    /// Look up a file's metadata and the on-disk path of its bytes. The
    /// caller streams the bytes from the path; nothing is buffered here.
    pub fn retrieve(
        &self,
        conn: &Connection,
        file_id: &str,
    ) -> Result<(StoredFile, PathBuf), AppError> {
        let meta = find_by_id(conn, file_id)?.ok_or(AppError::NotFound("File"))?;
        let path = self.path_for(&meta.filename);
        if !path.is_file() {
            return Err(AppError::NotFound("File"));
        }
        Ok((meta, path))
    }

    /// Remove a file's metadata and bytes. Idempotent: deleting an absent
    /// file is not an error.
    pub fn delete(&self, conn: &Connection, file_id: &str) -> Result<(), AppError> {
        let meta = find_by_id(conn, file_id)?;
        conn.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
        if let Some(meta) = meta {
            match fs::remove_file(self.path_for(&meta.filename)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn row_to_stored_file(row: &rusqlite::Row) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        id: row.get("id")?,
        filename: row.get("filename")?,
        form_id: row.get("form_id")?,
        question_id: row.get("question_id")?,
        original_name: row.get("original_name")?,
        mime_type: row.get("mime_type")?,
        size: row.get::<_, i64>("size")? as u64,
        uploaded_at: row.get("uploaded_at")?,
    })
}

/// Find one file's metadata by id.
pub fn find_by_id(conn: &Connection, file_id: &str) -> Result<Option<StoredFile>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, form_id, question_id, original_name, mime_type, size, \
         uploaded_at FROM files WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![file_id], row_to_stored_file)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// All stored-file metadata for a form/question pair, exact match only,
/// newest first.
pub fn find_by_owner(
    conn: &Connection,
    form_id: &str,
    question_id: &str,
) -> Result<Vec<StoredFile>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, form_id, question_id, original_name, mime_type, size, \
         uploaded_at FROM files WHERE form_id = ?1 AND question_id = ?2 \
         ORDER BY uploaded_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map(params![form_id, question_id], row_to_stored_file)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
