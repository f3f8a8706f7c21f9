use crate::models::{Category, Entry, FileTypeFilter};
use std::collections::HashMap;

const DOCUMENT_TYPES: [&str; 7] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

const IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// Fixed extension -> media type lookup.
///
/// Extensions are stored lower-cased without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTable {
    by_extension: HashMap<String, String>,
}

impl MimeTable {
    pub fn from_pairs<I, E, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (E, M)>,
        E: AsRef<str>,
        M: Into<String>,
    {
        let by_extension = pairs
            .into_iter()
            .map(|(ext, media)| {
                (
                    ext.as_ref().trim_start_matches('.').to_lowercase(),
                    media.into(),
                )
            })
            .collect();
        Self { by_extension }
    }

    /// Office documents, the three web image formats and a handful of
    /// common types used only for `Content-Type` on single downloads.
    pub fn standard() -> Self {
        Self::from_pairs([
            ("pdf", mime::APPLICATION_PDF.essence_str()),
            ("doc", "application/msword"),
            (
                "docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
            ("xls", "application/vnd.ms-excel"),
            (
                "xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            ("ppt", "application/vnd.ms-powerpoint"),
            (
                "pptx",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            ),
            ("jpg", mime::IMAGE_JPEG.essence_str()),
            ("jpeg", mime::IMAGE_JPEG.essence_str()),
            ("jpe", mime::IMAGE_JPEG.essence_str()),
            ("png", mime::IMAGE_PNG.essence_str()),
            ("gif", mime::IMAGE_GIF.essence_str()),
            ("webp", "image/webp"),
            ("svg", mime::IMAGE_SVG.essence_str()),
            ("txt", mime::TEXT_PLAIN.essence_str()),
            ("csv", mime::TEXT_CSV.essence_str()),
            ("html", mime::TEXT_HTML.essence_str()),
            ("htm", mime::TEXT_HTML.essence_str()),
            ("json", mime::APPLICATION_JSON.essence_str()),
            ("xml", mime::TEXT_XML.essence_str()),
            ("zip", "application/zip"),
            ("mp3", "audio/mpeg"),
            ("mp4", "video/mp4"),
        ])
    }

    /// Media type for a file name, or `None` when the name has no usable
    /// extension. Hidden files such as `.bashrc` have no extension.
    pub fn lookup(&self, file_name: &str) -> Option<&str> {
        let base = file_name.rsplit('/').next().unwrap_or(file_name);
        let (stem, ext) = base.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        self.by_extension
            .get(&ext.to_lowercase())
            .map(String::as_str)
    }
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: MimeTable,
}

impl Classifier {
    pub fn new(table: MimeTable) -> Self {
        Self { table }
    }

    pub fn classify(&self, file_name: &str) -> Category {
        match self.table.lookup(file_name) {
            Some(media) if DOCUMENT_TYPES.contains(&media) => Category::Document,
            Some(media) if IMAGE_TYPES.contains(&media) => Category::Image,
            _ => Category::Other,
        }
    }

    /// Keeps files only; directories never pass, whatever the filter.
    pub fn filter_by_category<'a>(
        &self,
        entries: &'a [Entry],
        wanted: FileTypeFilter,
    ) -> Vec<&'a Entry> {
        entries
            .iter()
            .filter(|entry| entry.is_file())
            .filter(|entry| match wanted.wanted() {
                None => true,
                Some(category) => self.classify(&entry.name) == category,
            })
            .collect()
    }

    pub fn content_type_for(&self, file_name: &str) -> String {
        self.table
            .lookup(file_name)
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.essence_str())
            .to_string()
    }
}
