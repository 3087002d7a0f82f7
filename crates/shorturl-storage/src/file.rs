use crate::index::{correlate, MappingIndex};
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use shorturl_core::repository::Result;
use shorturl_core::{NewUrlMapping, Repository, ShortToken, StorageError, UrlMapping};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// One line of the storage file.
#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    correlation_id: String,
    original_url: String,
    short_url: ShortToken,
    #[serde(rename = "created_ad", alias = "created_at", default)]
    created_at: Option<Timestamp>,
    #[serde(default)]
    deleted: bool,
}

impl From<FileRecord> for UrlMapping {
    fn from(record: FileRecord) -> Self {
        UrlMapping {
            id: record.id,
            correlation_id: record.correlation_id,
            original_url: record.original_url,
            short_url: record.short_url,
            created_at: record.created_at.unwrap_or(Timestamp::UNIX_EPOCH),
            deleted: record.deleted,
        }
    }
}

impl From<&UrlMapping> for FileRecord {
    fn from(mapping: &UrlMapping) -> Self {
        FileRecord {
            id: mapping.id,
            correlation_id: mapping.correlation_id.clone(),
            original_url: mapping.original_url.clone(),
            short_url: mapping.short_url.clone(),
            created_at: Some(mapping.created_at),
            deleted: mapping.deleted,
        }
    }
}

#[derive(Debug)]
struct State {
    index: MappingIndex,
    sink: Option<Sink>,
}

#[derive(Debug)]
struct Sink {
    path: PathBuf,
    file: File,
    /// Set when a failed append could not be rolled back. The file may end in
    /// a partial line, so nothing more is written to it.
    poisoned: bool,
}

impl Sink {
    fn new(path: PathBuf, file: File) -> Self {
        Self {
            path,
            file,
            poisoned: false,
        }
    }

    /// Writes one record line. On failure the file is cut back to its previous
    /// length so no partial line is left behind.
    async fn append(&mut self, mapping: &UrlMapping) -> Result<()> {
        if self.poisoned {
            return Err(StorageError::Io(format!(
                "{} ends in a partial record, refusing to append",
                self.path.display()
            )));
        }

        let mut line = serde_json::to_vec(&FileRecord::from(mapping))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        line.push(b'\n');

        let len = self.file.metadata().await?.len();
        let written = match self.file.write_all(&line).await {
            Ok(()) => self.file.flush().await,
            Err(e) => Err(e),
        };

        let Err(e) = written else {
            return Ok(());
        };
        error!(path = %self.path.display(), original_url = %mapping.original_url, error = %e, "failed to append url record");
        self.truncate_to(len).await;
        Err(StorageError::from(e))
    }

    async fn truncate_to(&mut self, len: u64) {
        if let Err(e) = self.file.set_len(len).await {
            error!(path = %self.path.display(), error = %e, "failed to roll back partial url record, disabling appends");
            self.poisoned = true;
        }
    }
}

/// Append-only file repository with an in-memory read cache.
///
/// Every new mapping is written as one JSON object per line. On open the
/// cache is rebuilt by replaying the file from the top; a malformed line
/// fails the open. Without a path the repository keeps everything in memory.
///
/// The append happens while the write lock is held and the cache entry is
/// only inserted once the line is written, so readers never see a mapping
/// whose durable write failed.
#[derive(Debug)]
pub struct FileRepository {
    state: RwLock<State>,
}

impl FileRepository {
    /// Opens (creating if needed) the storage file and replays it into the
    /// cache. `None` disables durability.
    pub async fn open(path: Option<impl AsRef<Path>>) -> Result<Self> {
        let Some(path) = path else {
            info!("file storage path not set, urls will not be persisted");
            return Ok(Self::from_state(MappingIndex::new(), None));
        };

        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "failed to open storage file");
                StorageError::Initialization(format!("failed to open {}: {e}", path.display()))
            })?;

        let index = replay(&path).await?;
        info!(path = %path.display(), urls = index.len(), "loaded url storage file");

        Ok(Self::from_state(index, Some(Sink::new(path, file))))
    }

    /// Creates a repository that never touches the disk.
    pub fn in_memory() -> Self {
        Self::from_state(MappingIndex::new(), None)
    }

    fn from_state(index: MappingIndex, sink: Option<Sink>) -> Self {
        Self {
            state: RwLock::new(State { index, sink }),
        }
    }

    /// Whether new mappings are written to disk.
    pub async fn is_persistent(&self) -> bool {
        self.state.read().await.sink.is_some()
    }

    /// Number of cached mappings.
    pub async fn len(&self) -> usize {
        self.state.read().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns the cached mapping for an original URL.
    pub async fn get_by_original(&self, original_url: &str) -> Option<UrlMapping> {
        self.state.read().await.index.get_by_url(original_url).cloned()
    }
}

async fn replay(path: &Path) -> Result<MappingIndex> {
    let file = File::open(path).await.map_err(|e| {
        StorageError::Initialization(format!("failed to read {}: {e}", path.display()))
    })?;

    let mut index = MappingIndex::new();
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.map_err(|e| {
        StorageError::Initialization(format!("failed to read {}: {e}", path.display()))
    })? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: FileRecord = serde_json::from_str(line).map_err(|e| {
            error!(path = %path.display(), line = line_no, error = %e, "malformed url record");
            StorageError::Initialization(format!(
                "malformed record at {}:{line_no}: {e}",
                path.display()
            ))
        })?;
        index.put(record.into()).map_err(|e| {
            error!(path = %path.display(), line = line_no, error = %e, "invalid url record");
            StorageError::Initialization(format!(
                "invalid record at {}:{line_no}: {e}",
                path.display()
            ))
        })?;
    }

    Ok(index)
}

#[async_trait]
impl Repository for FileRepository {
    async fn add_url(&self, mapping: NewUrlMapping) -> Result<ShortToken> {
        let mut state = self.state.write().await;
        let State { index, sink } = &mut *state;

        if let Some(existing) = index.get_by_url(&mapping.original_url) {
            debug!(original_url = %existing.original_url, short_url = %existing.short_url, "cache hit");
            return Ok(existing.short_url.clone());
        }

        let created = index.prepare(mapping)?;
        if let Some(sink) = sink {
            sink.append(&created).await?;
        }

        let token = created.short_url.clone();
        index.put(created)?;
        Ok(token)
    }

    async fn add_batch(&self, mappings: Vec<NewUrlMapping>) -> Result<Vec<UrlMapping>> {
        let mut state = self.state.write().await;
        let State { index, sink } = &mut *state;
        let mut stored = Vec::with_capacity(mappings.len());

        for mapping in mappings {
            if let Some(existing) = index.get_by_url(&mapping.original_url) {
                stored.push(correlate(existing, mapping.correlation_id));
                continue;
            }

            let created = index.prepare(mapping)?;
            if let Some(sink) = sink.as_mut() {
                sink.append(&created).await?;
            }
            stored.push(created.clone());
            index.put(created)?;
        }

        Ok(stored)
    }

    async fn get_url(&self, token: &ShortToken) -> Result<Option<UrlMapping>> {
        Ok(self.state.read().await.index.find_by_token(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TWO_RECORDS: &str = r#"{"id": 1, "correlation_id":"5f2ee353-1946-4b78-8801-eebd5ca17aee","short_url":"4rSPg8ap","original_url":"http://yandex.ru"}
{"id": 2,  "correlation_id":"3d17d9d7-68a4-40b4-a525-47c64383f3e3","short_url":"edVPg3ks","original_url":"http://ya.ru"}
"#;

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn replays_existing_records() {
        let file = file_with(TWO_RECORDS);

        let repo = FileRepository::open(Some(file.path())).await.unwrap();

        assert_eq!(repo.len().await, 2);
        let yandex = repo.get_by_original("http://yandex.ru").await.unwrap();
        assert_eq!(yandex.short_url.as_str(), "4rSPg8ap");
        assert_eq!(yandex.id, 1);
        assert_eq!(yandex.correlation_id, "5f2ee353-1946-4b78-8801-eebd5ca17aee");
        let ya = repo.get_by_original("http://ya.ru").await.unwrap();
        assert_eq!(ya.short_url.as_str(), "edVPg3ks");
        assert_eq!(ya.id, 2);
    }

    #[tokio::test]
    async fn malformed_record_fails_open() {
        let file = file_with(r#"{"id":}"#);

        let err = FileRepository::open(Some(file.path())).await.err().unwrap();

        assert!(matches!(err, StorageError::Initialization(_)));
    }

    #[tokio::test]
    async fn malformed_record_after_valid_ones_fails_open() {
        let file = file_with(&format!("{TWO_RECORDS}not json\n"));

        let result = FileRepository::open(Some(file.path())).await;

        assert!(matches!(result, Err(StorageError::Initialization(_))));
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let file = file_with(&format!("\n{TWO_RECORDS}\n\n"));

        let repo = FileRepository::open(Some(file.path())).await.unwrap();

        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short-url-db.json");

        let repo = FileRepository::open(Some(&path)).await.unwrap();

        assert!(path.exists());
        assert!(repo.is_empty().await);
        assert!(repo.is_persistent().await);
    }

    #[tokio::test]
    async fn new_urls_are_appended_as_json_lines() {
        let file = file_with("");
        let repo = FileRepository::open(Some(file.path())).await.unwrap();

        repo.add_url(NewUrlMapping::new("c1", "http://example.com", "abc123"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 1);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["correlation_id"], "c1");
        assert_eq!(value["original_url"], "http://example.com");
        assert_eq!(value["short_url"], "abc123");
        assert_eq!(value["deleted"], false);
        assert!(value["created_ad"].is_string());
    }

    #[tokio::test]
    async fn known_url_is_not_written_again() {
        let file = file_with(TWO_RECORDS);
        let repo = FileRepository::open(Some(file.path())).await.unwrap();

        let token = repo
            .add_url(NewUrlMapping::new("c", "http://yandex.ru", "ignored123"))
            .await
            .unwrap();

        assert_eq!(token.as_str(), "4rSPg8ap");
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, TWO_RECORDS);
    }

    #[tokio::test]
    async fn mappings_survive_reopen() {
        let file = file_with(TWO_RECORDS);

        {
            let repo = FileRepository::open(Some(file.path())).await.unwrap();
            let stored = repo
                .add_batch(vec![
                    NewUrlMapping::new("a", "http://a.example", "aaaa"),
                    NewUrlMapping::new("b", "http://ya.ru", "bbbb"),
                ])
                .await
                .unwrap();
            assert_eq!(stored[0].id, 3);
            assert_eq!(stored[1].short_url.as_str(), "edVPg3ks");
            assert_eq!(stored[1].correlation_id, "b");
        }

        let reopened = FileRepository::open(Some(file.path())).await.unwrap();
        assert_eq!(reopened.len().await, 3);
        let got = reopened
            .get_url(&ShortToken::new("aaaa"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.original_url, "http://a.example");
        assert_eq!(got.id, 3);

        let next = reopened
            .add_url(NewUrlMapping::new("c", "http://c.example", "cccc"))
            .await
            .unwrap();
        assert_eq!(next.as_str(), "cccc");
        assert_eq!(reopened.get_by_original("http://c.example").await.unwrap().id, 4);
    }

    #[tokio::test]
    async fn without_path_nothing_is_persisted() {
        let repo = FileRepository::open(None::<&Path>).await.unwrap();

        repo.add_url(NewUrlMapping::new("c", "http://example.com", "abc123"))
            .await
            .unwrap();

        assert!(!repo.is_persistent().await);
        let got = repo
            .get_url(&ShortToken::new("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.original_url, "http://example.com");
    }

    #[tokio::test]
    async fn get_unknown_token_is_none() {
        let repo = FileRepository::in_memory();
        repo.add_url(NewUrlMapping::new("c", "http://example.com", "abc123"))
            .await
            .unwrap();

        assert!(repo
            .get_url(&ShortToken::new("not_found"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn out_of_range_id_fails_open() {
        let line = format!(
            r#"{{"id": {}, "short_url":"4rSPg8ap","original_url":"http://yandex.ru"}}"#,
            i64::MAX
        );
        let file = file_with(&format!("{line}\n"));

        let result = FileRepository::open(Some(file.path())).await;

        assert!(matches!(result, Err(StorageError::Initialization(_))));
    }

    #[tokio::test]
    async fn torn_tail_is_cut_before_next_append() {
        let file = file_with(TWO_RECORDS);
        let len = std::fs::metadata(file.path()).unwrap().len();
        let handle = OpenOptions::new()
            .append(true)
            .open(file.path())
            .await
            .unwrap();
        let mut sink = Sink::new(file.path().to_path_buf(), handle);

        // A write that died halfway through a record.
        std::fs::OpenOptions::new()
            .append(true)
            .open(file.path())
            .unwrap()
            .write_all(br#"{"id":3,"corr"#)
            .unwrap();

        sink.truncate_to(len).await;
        let next =
            NewUrlMapping::new("c", "http://a.example", "aaaa").into_mapping(3, Timestamp::now());
        sink.append(&next).await.unwrap();

        assert!(!sink.poisoned);
        let reopened = FileRepository::open(Some(file.path())).await.unwrap();
        assert_eq!(reopened.len().await, 3);
        assert_eq!(reopened.get_by_original("http://a.example").await.unwrap().id, 3);
    }

    /// Every write to `/dev/full` fails with ENOSPC, and the device cannot
    /// be truncated.
    #[cfg(target_os = "linux")]
    async fn full_disk(index: MappingIndex) -> FileRepository {
        let path = PathBuf::from("/dev/full");
        let file = OpenOptions::new().append(true).open(&path).await.unwrap();
        FileRepository::from_state(index, Some(Sink::new(path, file)))
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_write_leaves_cache_untouched() {
        let repo = full_disk(MappingIndex::new()).await;

        let err = repo
            .add_url(NewUrlMapping::new("c", "http://yandex.ru", "4rSPg8ap"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Io(_)));
        assert!(repo.is_empty().await);
        assert!(repo
            .get_url(&ShortToken::new("4rSPg8ap"))
            .await
            .unwrap()
            .is_none());

        // The failed record could not be rolled back, so later appends are refused.
        let err = repo
            .add_url(NewUrlMapping::new("c", "http://ya.ru", "edVPg3ks"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(repo.is_empty().await);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_write_stops_batch() {
        let mut index = MappingIndex::new();
        let known = index
            .prepare(NewUrlMapping::new("old", "http://ya.ru", "edVPg3ks"))
            .unwrap();
        index.put(known).unwrap();
        let repo = full_disk(index).await;

        let err = repo
            .add_batch(vec![
                NewUrlMapping::new("1", "http://ya.ru", "ignored"),
                NewUrlMapping::new("2", "http://a.example", "aaaa"),
                NewUrlMapping::new("3", "http://b.example", "bbbb"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(repo.len().await, 1);
        assert!(repo.get_by_original("http://ya.ru").await.is_some());
        for token in ["aaaa", "bbbb"] {
            assert!(repo
                .get_url(&ShortToken::new(token))
                .await
                .unwrap()
                .is_none());
        }
    }
}
