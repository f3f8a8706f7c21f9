use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

impl EntryKind {
    /// The provider reports `"file"` or `"dir"`; anything that is not a file is
    /// never offered for download.
    pub fn from_provider(raw: &str) -> Self {
        if raw == "file" {
            EntryKind::File
        } else {
            EntryKind::Dir
        }
    }
}

/// One item of a public folder listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Entry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub raw_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl Entry {
    pub fn file(name: &str, path: &str) -> Self {
        Self::bare(name, path, "file")
    }

    pub fn dir(name: &str, path: &str) -> Self {
        Self::bare(name, path, "dir")
    }

    fn bare(name: &str, path: &str, raw_type: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::from_provider(raw_type),
            raw_type: raw_type.to_string(),
            size: None,
            mime_type: None,
            media_type: None,
            modified: None,
            preview: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Document,
    Image,
    Other,
}

/// User-facing listing filter (`fileType` form field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileTypeFilter {
    #[default]
    All,
    Documents,
    Images,
}

impl FileTypeFilter {
    /// Unknown or missing values fall back to `All`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("documents") => FileTypeFilter::Documents,
            Some("images") => FileTypeFilter::Images,
            _ => FileTypeFilter::All,
        }
    }

    pub fn wanted(&self) -> Option<Category> {
        match self {
            FileTypeFilter::All => None,
            FileTypeFilter::Documents => Some(Category::Document),
            FileTypeFilter::Images => Some(Category::Image),
        }
    }
}

/// Bytes of one remote file together with the name it is offered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: String,
    pub name: String,
    pub content: Bytes,
}
