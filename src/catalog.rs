use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

pub const IMAGES_URL_PREFIX: &str = "/images";
pub const VIDEOS_URL_PREFIX: &str = "/videos";

static IMAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^p(\d{1,2})\.jpg$").expect("valid regex"));
static VIDEO_MEDIA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^video-(\d{1,2})\.mp4$").expect("valid regex"));
static VIDEO_LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^video-(\d{1,2})\.txt$").expect("valid regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Image,
}

/// One displayable image plus its optional video, as consumed by the front end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub src: String,
    pub alt: String,
    pub associated_video: Option<String>,
}

/// A file found in the videos directory. Link files carry their text so that
/// resolution stays free of I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoEntry {
    File(String),
    Link { file_name: String, contents: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoRef {
    /// Served from the videos directory.
    Local(String),
    /// Hosted elsewhere (e.g. a YouTube link).
    External(String),
}

impl VideoRef {
    pub fn as_str(&self) -> &str {
        match self {
            VideoRef::Local(s) | VideoRef::External(s) => s,
        }
    }
}

/// Page id -> playable reference for a single resolution.
#[derive(Debug, Default)]
pub struct VideoIndex {
    refs: HashMap<String, VideoRef>,
}

impl VideoIndex {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a VideoEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            match entry {
                VideoEntry::File(name) => {
                    if let Some(id) = page_id(&VIDEO_MEDIA_PATTERN, name) {
                        index.insert(
                            id.to_string(),
                            VideoRef::Local(format!("{VIDEOS_URL_PREFIX}/{name}")),
                        );
                    }
                }
                VideoEntry::Link {
                    file_name,
                    contents,
                } => {
                    let Some(id) = page_id(&VIDEO_LINK_PATTERN, file_name) else {
                        continue;
                    };
                    let url = contents.trim();
                    if !url.is_empty() {
                        index.insert(id.to_string(), VideoRef::External(url.to_string()));
                    }
                }
            }
        }
        index
    }

    /// Local media always takes precedence over an external link for the same
    /// page id, whatever order the entries arrive in.
    pub fn insert(&mut self, page_id: String, reference: VideoRef) {
        let shadowed = matches!(
            (self.refs.get(&page_id), &reference),
            (Some(VideoRef::Local(_)), VideoRef::External(_))
        );
        if !shadowed {
            self.refs.insert(page_id, reference);
        }
    }

    pub fn get(&self, page_id: &str) -> Option<&VideoRef> {
        self.refs.get(page_id)
    }
}

fn page_id<'a>(pattern: &Regex, file_name: &'a str) -> Option<&'a str> {
    pattern
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Pair every `p<NN>.jpg` with the video sharing its page id. Image order is
/// preserved; names that match no pattern are dropped.
pub fn resolve_items<S: AsRef<str>>(image_names: &[S], videos: &[VideoEntry]) -> Vec<PortfolioItem> {
    let index = VideoIndex::from_entries(videos);
    image_names
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|name| {
            let id = page_id(&IMAGE_PATTERN, name)?;
            Some(PortfolioItem {
                kind: ItemKind::Image,
                src: format!("{IMAGES_URL_PREFIX}/{name}"),
                alt: format!("Image: {name}"),
                associated_video: index.get(id).map(|r| r.as_str().to_string()),
            })
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read video link {}: {source}", path.display())]
    ReadLink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The pair of directories a resolution reads from.
#[derive(Clone, Debug)]
pub struct Catalog {
    images_dir: PathBuf,
    videos_dir: PathBuf,
}

impl Catalog {
    pub fn new(images_dir: impl Into<PathBuf>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            videos_dir: videos_dir.into(),
        }
    }

    /// `root/images` and `root/videos`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("images"), root.join("videos"))
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// Read both directories and resolve. Any read failure fails the whole
    /// resolution. Link files are decoded lossily, so only I/O errors fail on
    /// them, never their encoding.
    pub fn resolve(&self) -> Result<Vec<PortfolioItem>, CatalogError> {
        let videos = list_videos(&self.videos_dir)?;
        let images = list_file_names(&self.images_dir)?;
        Ok(resolve_items(images.as_slice(), &videos))
    }
}

fn list_videos(dir: &Path) -> Result<Vec<VideoEntry>, CatalogError> {
    let mut entries = Vec::new();
    for name in list_file_names(dir)? {
        if VIDEO_LINK_PATTERN.is_match(&name) {
            let path = dir.join(&name);
            let bytes =
                fs::read(&path).map_err(|source| CatalogError::ReadLink { path, source })?;
            entries.push(VideoEntry::Link {
                file_name: name,
                contents: String::from_utf8_lossy(&bytes).into_owned(),
            });
        } else {
            entries.push(VideoEntry::File(name));
        }
    }
    Ok(entries)
}

/// Regular files only, sorted by name so repeated scans agree across platforms.
fn list_file_names(dir: &Path) -> Result<Vec<String>, CatalogError> {
    let read_err = |source| CatalogError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
