use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// What kind of thing a renamed item was matched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Episode,
    Movie,
    Music,
    Subtitle,
    File,
}

const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "mkv", "mp4", "m4v", "mov", "mpg", "mpeg", "ogm", "wmv", "ts", "webm", "divx",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "ogg", "wav", "wma", "aac", "opus"];
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "sub", "ass", "ssa", "idx", "smi", "vtt"];

fn episode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\bs\d{1,2}[ ._-]?e\d{1,3}\b|\b\d{1,2}x\d{2,3}\b)")
            .expect("episode pattern is valid")
    })
}

impl ItemCategory {
    /// Best guess from a file name when the mapping does not say
    pub fn guess(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if SUBTITLE_EXTENSIONS.contains(&extension.as_str()) {
            Self::Subtitle
        } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            Self::Music
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            if episode_pattern().is_match(&name) {
                Self::Episode
            } else {
                Self::Movie
            }
        } else {
            Self::File
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episode => "episode",
            Self::Movie => "movie",
            Self::Music => "music",
            Self::Subtitle => "subtitle",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an item inside a catalog, valid until the next removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemId(pub usize);

/// The listing that owns the pending rename matches.
///
/// After a job ends, every renamed item is located and removed so the listing
/// only shows what is left to do.
pub trait ItemCatalog {
    fn locate(&self, source: &Path) -> Option<ItemId>;
    fn classify(&self, item: ItemId) -> ItemCategory;
    fn remove(&mut self, item: ItemId);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: ItemCategory,
}

/// In-memory catalog backed by an ordered list
#[derive(Debug, Clone, Default)]
pub struct VecCatalog {
    items: Vec<CatalogItem>,
}

impl VecCatalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<CatalogItem> {
        self.items
    }
}

impl ItemCatalog for VecCatalog {
    fn locate(&self, source: &Path) -> Option<ItemId> {
        self.items
            .iter()
            .position(|item| item.source == source)
            .map(ItemId)
    }

    fn classify(&self, item: ItemId) -> ItemCategory {
        self.items
            .get(item.0)
            .map_or(ItemCategory::File, |item| item.category)
    }

    fn remove(&mut self, item: ItemId) {
        if item.0 < self.items.len() {
            self.items.remove(item.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_categories() {
        assert_eq!(
            ItemCategory::guess(Path::new("/tv/Show.S01E02.720p.mkv")),
            ItemCategory::Episode
        );
        assert_eq!(
            ItemCategory::guess(Path::new("/tv/show 1x05.avi")),
            ItemCategory::Episode
        );
        assert_eq!(
            ItemCategory::guess(Path::new("/movies/Heat (1995).mkv")),
            ItemCategory::Movie
        );
        assert_eq!(
            ItemCategory::guess(Path::new("/music/01 - Track.FLAC")),
            ItemCategory::Music
        );
        assert_eq!(
            ItemCategory::guess(Path::new("/movies/Heat (1995).eng.srt")),
            ItemCategory::Subtitle
        );
        assert_eq!(
            ItemCategory::guess(Path::new("/docs/readme")),
            ItemCategory::File
        );
    }

    #[test]
    fn test_vec_catalog_locate_and_remove() {
        let mut catalog = VecCatalog::new(vec![
            CatalogItem {
                source: PathBuf::from("/a/1.mkv"),
                destination: PathBuf::from("one.mkv"),
                category: ItemCategory::Movie,
            },
            CatalogItem {
                source: PathBuf::from("/a/2.srt"),
                destination: PathBuf::from("two.srt"),
                category: ItemCategory::Subtitle,
            },
        ]);

        let second = catalog.locate(Path::new("/a/2.srt")).unwrap();
        assert_eq!(catalog.classify(second), ItemCategory::Subtitle);

        let first = catalog.locate(Path::new("/a/1.mkv")).unwrap();
        catalog.remove(first);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.locate(Path::new("/a/2.srt")), Some(ItemId(0)));
        assert_eq!(catalog.locate(Path::new("/a/1.mkv")), None);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ItemCategory::Episode).unwrap(),
            "\"episode\""
        );
        let parsed: ItemCategory = serde_json::from_str("\"subtitle\"").unwrap();
        assert_eq!(parsed, ItemCategory::Subtitle);
    }
}
