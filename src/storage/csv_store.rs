// src/storage/csv_store.rs
//! BOM-prefixed UTF-8 CSV storage (what spreadsheet tools expect for Hangul).
//!
//! Layout: `제목,작성일,본문내용,링크,사진`; image refs are `;`-joined.
//! English headers (`title,publishedDate,body,link,imageRefs`) are accepted
//! on read. The date column is stored verbatim.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CorpusStore, LoadedCorpus, StorageError};
use crate::record::{join_image_refs, split_image_refs, NoticeRecord};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const CORPUS_HEADERS: [&str; 5] = ["제목", "작성일", "본문내용", "링크", "사진"];

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "제목", alias = "title", default)]
    title: String,
    #[serde(
        rename = "작성일",
        alias = "publishedDate",
        alias = "published_date",
        default
    )]
    published: String,
    #[serde(rename = "본문내용", alias = "body", default)]
    body: String,
    #[serde(rename = "링크", alias = "link", default)]
    link: String,
    #[serde(rename = "사진", alias = "imageRefs", alias = "image_refs", default)]
    images: String,
}

impl From<CsvRow> for NoticeRecord {
    fn from(row: CsvRow) -> Self {
        NoticeRecord {
            title: row.title,
            published: row.published,
            body: row.body,
            link: row.link,
            image_refs: split_image_refs(&row.images),
        }
    }
}

impl From<&NoticeRecord> for CsvRow {
    fn from(r: &NoticeRecord) -> Self {
        CsvRow {
            title: r.title.clone(),
            published: r.published.clone(),
            body: r.body.clone(),
            link: r.link.clone(),
            images: join_image_refs(&r.image_refs),
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> StorageError + '_ {
    move |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Deserialize header-keyed rows from CSV bytes (BOM optional).
pub fn decode_rows<T: DeserializeOwned>(bytes: &[u8], path: &Path) -> Result<Vec<T>, StorageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(strip_bom(bytes));
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err(path))
}

/// Serialize rows to BOM-prefixed CSV bytes; the header comes from the row type.
pub fn encode_rows<T: Serialize>(rows: &[T], path: &Path) -> Result<Vec<u8>, StorageError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    for row in rows {
        writer.serialize(row).map_err(csv_err(path))?;
    }
    writer
        .into_inner()
        .map_err(|e| io_err(path)(e.into_error()))
}

/// Synchronous read for offline tools.
pub fn read_bom_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let bytes = std::fs::read(path).map_err(io_err(path))?;
    decode_rows(&bytes, path)
}

/// Synchronous write for offline tools.
pub fn write_bom_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StorageError> {
    let bytes = encode_rows(rows, path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    std::fs::write(path, bytes).map_err(io_err(path))
}

pub fn decode_corpus(bytes: &[u8], path: &Path) -> Result<Vec<NoticeRecord>, StorageError> {
    let rows: Vec<CsvRow> = decode_rows(bytes, path)?;
    Ok(rows.into_iter().map(NoticeRecord::from).collect())
}

/// Corpus bytes with the header always present, even for an empty corpus.
pub fn encode_corpus(records: &[NoticeRecord], path: &Path) -> Result<Vec<u8>, StorageError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(UTF8_BOM.to_vec());
    writer.write_record(CORPUS_HEADERS).map_err(csv_err(path))?;
    for r in records {
        writer.serialize(CsvRow::from(r)).map_err(csv_err(path))?;
    }
    writer
        .into_inner()
        .map_err(|e| io_err(path)(e.into_error()))
}

/// Read a corpus-layout file outside a store (candidate batches, one-shot dedup).
pub fn read_corpus_file(path: &Path) -> Result<Vec<NoticeRecord>, StorageError> {
    let bytes = std::fs::read(path).map_err(io_err(path))?;
    decode_corpus(&bytes, path)
}

pub fn write_corpus_file(path: &Path, records: &[NoticeRecord]) -> Result<(), StorageError> {
    let bytes = encode_corpus(records, path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    std::fs::write(path, bytes).map_err(io_err(path))
}

/// Corpus file plus a `<name>.session.csv` checkpoint next to it.
#[derive(Debug, Clone)]
pub struct CsvCorpusStore {
    path: PathBuf,
    checkpoint_path: PathBuf,
}

impl CsvCorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let checkpoint_path = path.with_extension("session.csv");
        Self {
            path,
            checkpoint_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    async fn read_optional(path: &Path) -> Result<Option<Vec<NoticeRecord>>, StorageError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => decode_corpus(&bytes, path).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(path)(e)),
        }
    }

    /// Write through a temp sibling and rename, so readers never see half a file.
    async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_err(&tmp))?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err(path))
    }
}

#[async_trait::async_trait]
impl CorpusStore for CsvCorpusStore {
    async fn load(&self) -> Result<LoadedCorpus, StorageError> {
        let persisted = match Self::read_optional(&self.path).await? {
            Some(r) => {
                info!(target: "dedup::storage", path = %self.path.display(), records = r.len(), "loaded corpus");
                r
            }
            None => {
                info!(target: "dedup::storage", path = %self.path.display(), "no corpus file yet; starting empty");
                Vec::new()
            }
        };

        let resumed = Self::read_optional(&self.checkpoint_path)
            .await?
            .unwrap_or_default();
        if !resumed.is_empty() {
            info!(
                target: "dedup::storage",
                path = %self.checkpoint_path.display(),
                records = resumed.len(),
                "resuming records from interrupted run"
            );
        }
        Ok(LoadedCorpus { persisted, resumed })
    }

    async fn checkpoint(&self, pending: &[NoticeRecord]) -> Result<(), StorageError> {
        let bytes = encode_corpus(pending, &self.checkpoint_path)?;
        Self::write_atomic(&self.checkpoint_path, bytes).await
    }

    async fn persist(&self, corpus: &[NoticeRecord]) -> Result<(), StorageError> {
        let bytes = encode_corpus(corpus, &self.path)?;
        Self::write_atomic(&self.path, bytes).await?;
        match tokio::fs::remove_file(&self.checkpoint_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&self.checkpoint_path)(e)),
        }
    }
}
