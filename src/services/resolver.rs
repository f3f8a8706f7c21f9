use crate::models::FetchedFile;
use crate::services::disk::{DiskApi, DiskError};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::sync::Arc;

/// Everything except unreserved characters and `/` is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// A `/`-delimited path inside a share, kept in both its original and its
/// percent-encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    original: String,
    encoded: String,
}

impl RemotePath {
    pub fn new(path: &str) -> Self {
        Self {
            original: path.to_string(),
            encoded: encode_query_value(path),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Last segment of the original path.
    pub fn display_name(&self) -> &str {
        self.original.rsplit('/').next().unwrap_or_default()
    }
}

/// Resolves one path of a share to its bytes: link first, then content.
pub struct FileResolver {
    disk: Arc<dyn DiskApi>,
}

impl FileResolver {
    pub fn new(disk: Arc<dyn DiskApi>) -> Self {
        Self { disk }
    }

    pub async fn resolve(
        &self,
        public_key: &str,
        path: &RemotePath,
    ) -> Result<FetchedFile, DiskError> {
        let name = path.display_name();
        if name.is_empty() {
            return Err(DiskError::download(path.original(), "path has no file name"));
        }

        let href = self.disk.download_link(public_key, path).await?;
        let content = self.disk.fetch(&href, path).await?;

        if content.is_empty() {
            return Err(DiskError::download(path.original(), "empty payload"));
        }

        Ok(FetchedFile {
            path: path.original().to_string(),
            name: name.to_string(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entry;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[test]
    fn test_remote_path_keeps_original_name() {
        let path = RemotePath::new("/Отчёты/годовой отчёт.pdf");
        assert_eq!(path.display_name(), "годовой отчёт.pdf");
        assert!(path.encoded().starts_with("/%D0%9E"));
        assert!(!path.encoded().contains(' '));
    }

    #[test]
    fn test_remote_path_encoding() {
        let path = RemotePath::new("/dir/a&b=c?.txt");
        assert_eq!(path.encoded(), "/dir/a%26b%3Dc%3F.txt");
        assert_eq!(path.display_name(), "a&b=c?.txt");
        assert_eq!(RemotePath::new("plain.txt").display_name(), "plain.txt");
        assert_eq!(RemotePath::new("/dir/").display_name(), "");
    }

    struct RecordingDisk {
        payload: Bytes,
        links: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DiskApi for RecordingDisk {
        async fn list(&self, _public_key: &str) -> Result<Vec<Entry>, DiskError> {
            Ok(Vec::new())
        }

        async fn download_link(
            &self,
            _public_key: &str,
            path: &RemotePath,
        ) -> Result<String, DiskError> {
            self.links.lock().unwrap().push(path.encoded().to_string());
            Ok(format!("mem://{}", path.encoded()))
        }

        async fn fetch(&self, _href: &str, _path: &RemotePath) -> Result<Bytes, DiskError> {
            Ok(self.payload.clone())
        }
    }

    #[tokio::test]
    async fn test_resolve_uses_encoded_path() {
        let disk = Arc::new(RecordingDisk {
            payload: Bytes::from_static(b"hello"),
            links: Mutex::new(Vec::new()),
        });
        let resolver = FileResolver::new(disk.clone());

        let file = resolver
            .resolve("tok", &RemotePath::new("/my docs/a b.txt"))
            .await
            .unwrap();

        assert_eq!(file.name, "a b.txt");
        assert_eq!(file.path, "/my docs/a b.txt");
        assert_eq!(file.content, Bytes::from_static(b"hello"));
        assert_eq!(
            *disk.links.lock().unwrap(),
            vec!["/my%20docs/a%20b.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_payload() {
        let disk = Arc::new(RecordingDisk {
            payload: Bytes::new(),
            links: Mutex::new(Vec::new()),
        });
        let resolver = FileResolver::new(disk);

        let err = resolver
            .resolve("tok", &RemotePath::new("/empty.txt"))
            .await
            .unwrap_err();
        assert_eq!(err, DiskError::download("/empty.txt", "empty payload"));
    }

    #[tokio::test]
    async fn test_resolve_rejects_directory_like_path() {
        let disk = Arc::new(RecordingDisk {
            payload: Bytes::from_static(b"x"),
            links: Mutex::new(Vec::new()),
        });
        let resolver = FileResolver::new(disk.clone());

        assert!(resolver.resolve("tok", &RemotePath::new("/dir/")).await.is_err());
        assert!(disk.links.lock().unwrap().is_empty());
    }
}
