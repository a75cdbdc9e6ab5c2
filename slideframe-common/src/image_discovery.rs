use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::error::{SlideframeError, ImageDiscoveryError};
use crate::Result;

/// Filesystem view of the playlists root. Called every tick, so it must stay cheap.
pub trait ImageSource: Send {
    fn root(&self) -> &Path;

    /// Names of all playlist directories.
    fn list_playlists(&self) -> Result<Vec<String>>;

    /// File names currently present in a playlist directory.
    fn list_images(&self, playlist: &str) -> Result<BTreeSet<String>>;

    fn image_path(&self, playlist: &str, image: &str) -> PathBuf;
}

/// Lists playlists as sub-directories of `root` and images as the regular
/// files directly inside each playlist directory.
#[derive(Debug, Clone)]
pub struct ImageDiscovery {
    root: PathBuf,
}

impl ImageDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entries(path: &Path) -> Result<Vec<walkdir::DirEntry>> {
        if !path.is_dir() {
            return Err(SlideframeError::ImageDiscovery(ImageDiscoveryError::DirectoryRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "Directory not found"),
            }));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) => entries.push(entry),
                // The directory itself could not be read
                Err(e) if e.depth() == 0 => {
                    return Err(SlideframeError::ImageDiscovery(ImageDiscoveryError::DirectoryRead {
                        path: path.to_path_buf(),
                        source: e.into(),
                    }));
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {:?}: {}", path, e);
                }
            }
        }

        Ok(entries)
    }

    fn utf8_name(entry: &walkdir::DirEntry) -> Option<String> {
        match entry.file_name().to_str() {
            Some(name) => Some(name.to_string()),
            None => {
                log::warn!("Skipping entry with non UTF-8 name: {:?}", entry.path());
                None
            }
        }
    }
}

impl ImageSource for ImageDiscovery {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_playlists(&self) -> Result<Vec<String>> {
        let playlists: Vec<String> = Self::entries(&self.root)?
            .iter()
            .filter(|entry| entry.file_type().is_dir())
            .filter_map(Self::utf8_name)
            .collect();

        log::debug!("Discovered {} playlists in {:?}", playlists.len(), self.root);
        Ok(playlists)
    }

    fn list_images(&self, playlist: &str) -> Result<BTreeSet<String>> {
        let images = Self::entries(&self.root.join(playlist))?
            .iter()
            .filter(|entry| entry.file_type().is_file())
            .filter_map(Self::utf8_name)
            .collect();

        Ok(images)
    }

    fn image_path(&self, playlist: &str, image: &str) -> PathBuf {
        self.root.join(playlist).join(image)
    }
}
