use crate::models::FetchedFile;
use crate::services::resolver::{FileResolver, RemotePath};
use futures::StreamExt;
use serde::Serialize;
use std::io::{Cursor, Write};
use std::sync::Arc;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A path of a batch that did not make it into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct ArchiveOutcome {
    pub bytes: Vec<u8>,
    /// Entry names in the order they were written.
    pub entries: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ArchiveOutcome {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to finalize archive: {0}")]
    Finalize(#[from] zip::result::ZipError),
}

/// Bundles the files of a share into one in-memory zip.
///
/// Every path gets exactly one attempt. Paths that cannot be fetched are
/// reported as [`Diagnostic`]s and skipped; the remaining files are still
/// written, in input order, with DEFLATE compression. Duplicate names are
/// written as separate entries.
pub struct ArchiveBuilder {
    resolver: Arc<FileResolver>,
    concurrency: usize,
}

impl ArchiveBuilder {
    pub fn new(resolver: Arc<FileResolver>, concurrency: usize) -> Self {
        Self {
            resolver,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn build(
        &self,
        public_key: &str,
        paths: &[String],
    ) -> Result<ArchiveOutcome, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut entries = Vec::with_capacity(paths.len());
        let mut diagnostics = Vec::new();

        // `buffered` yields in input order regardless of completion order.
        let mut fetches = std::pin::pin!(
            futures::stream::iter(paths.iter().cloned())
                .map(|raw| {
                    let resolver = self.resolver.clone();
                    let public_key = public_key.to_string();
                    async move {
                        let path = RemotePath::new(&raw);
                        let result = resolver.resolve(&public_key, &path).await;
                        (path, result)
                    }
                })
                .buffered(self.concurrency)
        );

        while let Some((path, result)) = fetches.next().await {
            let failure = match result {
                Ok(file) => match write_entry(&mut writer, &file, options) {
                    Ok(()) => {
                        entries.push(file.name);
                        None
                    }
                    Err(e) => Some(format!("failed to write zip entry: {}", e)),
                },
                Err(e) => Some(e.to_string()),
            };

            if let Some(reason) = failure {
                tracing::warn!("⚠️  Skipping {} in archive: {}", path.original(), reason);
                diagnostics.push(Diagnostic {
                    path: path.original().to_string(),
                    reason,
                });
            }
        }

        let bytes = writer.finish()?.into_inner();

        tracing::info!(
            "🗜️  Archive built: {} entries, {} skipped, {} bytes",
            entries.len(),
            diagnostics.len(),
            bytes.len()
        );

        Ok(ArchiveOutcome {
            bytes,
            entries,
            diagnostics,
        })
    }
}

fn write_entry(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    file: &FetchedFile,
    options: FileOptions,
) -> zip::result::ZipResult<()> {
    writer.start_file(file.name.as_str(), options)?;
    writer.write_all(&file.content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entry;
    use crate::services::disk::{DiskApi, DiskError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::io::Read;

    struct MapDisk {
        files: HashMap<String, Bytes>,
    }

    #[async_trait]
    impl DiskApi for MapDisk {
        async fn list(&self, _public_key: &str) -> Result<Vec<Entry>, DiskError> {
            Ok(Vec::new())
        }

        async fn download_link(
            &self,
            _public_key: &str,
            path: &RemotePath,
        ) -> Result<String, DiskError> {
            if self.files.contains_key(path.original()) {
                Ok(path.original().to_string())
            } else {
                Err(DiskError::download(path.original(), "not found"))
            }
        }

        async fn fetch(&self, href: &str, path: &RemotePath) -> Result<Bytes, DiskError> {
            self.files
                .get(href)
                .cloned()
                .ok_or_else(|| DiskError::download(path.original(), "gone"))
        }
    }

    fn builder(files: &[(&str, &[u8])], concurrency: usize) -> ArchiveBuilder {
        let disk = MapDisk {
            files: files
                .iter()
                .map(|(path, data)| (path.to_string(), Bytes::copy_from_slice(data)))
                .collect(),
        };
        let resolver = Arc::new(FileResolver::new(Arc::new(disk)));
        ArchiveBuilder::new(resolver, concurrency)
    }

    fn read_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                assert_eq!(file.compression(), CompressionMethod::Deflated);
                let mut content = Vec::new();
                file.read_to_end(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_failed_path_is_skipped() {
        let builder = builder(&[("/a.pdf", b"pdf bytes"), ("/b.png", b"png bytes")], 1);
        let paths = vec![
            "/a.pdf".to_string(),
            "/missing.pdf".to_string(),
            "/b.png".to_string(),
        ];

        let outcome = builder.build("tok123", &paths).await.unwrap();

        assert_eq!(outcome.entries, vec!["a.pdf", "b.png"]);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].path, "/missing.pdf");

        let entries = read_entries(&outcome.bytes);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("a.pdf".to_string(), b"pdf bytes".to_vec()));
        assert_eq!(entries[1], ("b.png".to_string(), b"png bytes".to_vec()));
    }

    #[tokio::test]
    async fn test_all_failed_gives_empty_archive() {
        let builder = builder(&[], 1);
        let paths = vec!["/x.pdf".to_string(), "/y.pdf".to_string()];

        let outcome = builder.build("tok", &paths).await.unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.diagnostics.len(), 2);
        assert!(read_entries(&outcome.bytes).is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_are_kept() {
        let builder = builder(&[("/one/report.pdf", b"first"), ("/two/report.pdf", b"second")], 1);
        let paths = vec!["/one/report.pdf".to_string(), "/two/report.pdf".to_string()];

        let outcome = builder.build("tok", &paths).await.unwrap();

        let entries = read_entries(&outcome.bytes);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "report.pdf");
        assert_eq!(entries[1].0, "report.pdf");
        assert_eq!(entries[0].1, b"first");
        assert_eq!(entries[1].1, b"second");
    }

    #[tokio::test]
    async fn test_concurrent_fetch_preserves_order() {
        let files: Vec<(String, Vec<u8>)> = (0..20)
            .map(|i| (format!("/f{:02}.txt", i), format!("content {}", i).into_bytes()))
            .collect();
        let borrowed: Vec<(&str, &[u8])> = files
            .iter()
            .map(|(p, d)| (p.as_str(), d.as_slice()))
            .collect();
        let builder = builder(&borrowed, 8);
        let paths: Vec<String> = files.iter().map(|(p, _)| p.clone()).collect();

        let outcome = builder.build("tok", &paths).await.unwrap();

        let names: Vec<String> = read_entries(&outcome.bytes)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let expected: Vec<String> = (0..20).map(|i| format!("f{:02}.txt", i)).collect();
        assert_eq!(names, expected);
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_build_future_is_send() {
        let builder = builder(&[], 2);
        let paths = vec!["/a.pdf".to_string()];
        assert_send(builder.build("tok", &paths));
    }

    #[tokio::test]
    async fn test_entries_are_deflated() {
        let content = vec![b'a'; 4096];
        let builder = builder(&[("/big.txt", content.as_slice())], 1);

        let outcome = builder.build("tok", &["/big.txt".to_string()]).await.unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(&outcome.bytes[..])).unwrap();
        let file = archive.by_index(0).unwrap();
        assert_eq!(file.compression(), CompressionMethod::Deflated);
        assert!(file.compressed_size() < file.size());
        assert_eq!(file.size(), 4096);
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let builder = builder(&[], 0);
        assert_eq!(builder.concurrency, 1);
    }
}
