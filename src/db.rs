use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::id::generate_id;
use crate::model::{Book, Document};

/// JSON file backed store for the `books` collection.
///
/// The whole document is held in memory and rewritten to disk on every
/// mutation. Mutations hold the lock across the write, so requests within
/// one process never lose each other's updates. Nothing guards against a
/// second process writing the same file.
pub struct Database {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl Database {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let doc = Self::load(&path).await?;

        let db = Database {
            path,
            doc: Mutex::new(doc),
        };
        db.initialize().await?;
        Ok(db)
    }

    async fn load(path: &Path) -> Result<Document, StoreError> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("[db] no store file at {:?}, starting empty", path);
                return Ok(Document::default());
            }
            Err(e) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(Document::default());
        }

        serde_json::from_str(&raw).map_err(|e| StoreError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensures the `books` key exists. Safe to call on every boot.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        let mut doc = self.doc.lock().await;
        if doc.books.is_some() {
            tracing::debug!("[db] books collection present, nothing to initialize");
            return Ok(());
        }

        let mut next = doc.clone();
        next.books = Some(Vec::new());
        self.persist(&next).await?;
        *doc = next;
        tracing::info!("[db] initialized empty books collection at {:?}", self.path);
        Ok(())
    }

    pub async fn list_all(&self) -> Vec<Book> {
        let doc = self.doc.lock().await;
        doc.books.clone().unwrap_or_default()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<Book> {
        let doc = self.doc.lock().await;
        doc.books
            .as_ref()
            .and_then(|books| books.iter().find(|b| b.id == id))
            .cloned()
    }

    /// Appends without checking for an existing record with the same id.
    pub async fn append(&self, book: Book) -> Result<(), StoreError> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        next.books.get_or_insert_with(Vec::new).push(book);
        self.persist(&next).await?;
        *doc = next;
        Ok(())
    }

    /// Builds a record with a fresh id from client fields and appends it.
    pub async fn create(&self, fields: Map<String, Value>) -> Result<Book, StoreError> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        let books = next.books.get_or_insert_with(Vec::new);

        let mut id = generate_id();
        while books.iter().any(|b| b.id == id) {
            tracing::warn!("[db] generated id {} already taken, retrying", id);
            id = generate_id();
        }

        let book = Book::new(id, fields);
        books.push(book.clone());
        self.persist(&next).await?;
        *doc = next;
        Ok(book)
    }

    /// Returns the merged record, or `None` without touching disk when `id` is unknown.
    pub async fn merge_into(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Option<Book>, StoreError> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        let Some(book) = next
            .books
            .as_mut()
            .and_then(|books| books.iter_mut().find(|b| b.id == id))
        else {
            return Ok(None);
        };

        book.merge(fields);
        let merged = book.clone();
        self.persist(&next).await?;
        *doc = next;
        Ok(Some(merged))
    }

    /// Removes the first record with `id`. Absent ids are a no-op returning `None`.
    pub async fn remove_by_id(&self, id: &str) -> Result<Option<Book>, StoreError> {
        let mut doc = self.doc.lock().await;
        let position = doc
            .books
            .as_ref()
            .and_then(|books| books.iter().position(|b| b.id == id));
        let Some(position) = position else {
            return Ok(None);
        };

        let mut next = doc.clone();
        let removed = next
            .books
            .as_mut()
            .map(|books| books.remove(position));
        self.persist(&next).await?;
        *doc = next;
        Ok(removed)
    }

    // Written to a sibling file first so a failed write never truncates the store.
    async fn persist(&self, doc: &Document) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(doc).map_err(StoreError::Serialize)?;
        let tmp_path = self.tmp_path();

        fs::write(&tmp_path, json)
            .await
            .map_err(|e| StoreError::Write {
                path: tmp_path.clone(),
                source: e,
            })?;

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "db.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
