//! Texture name resolution for decoded materials
//!
//! SPM stores texture basenames only. Turning a name into something loadable
//! is the caller's business; the decoder just asks a [`TextureResolver`].

use std::path::{Path, PathBuf};

use tracing::debug;

/// Maps a stored texture name to a file on disk, if one exists.
pub trait TextureResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Resolves nothing; decoded materials keep names only
#[derive(Debug, Clone, Copy, Default)]
pub struct NameOnly;

impl TextureResolver for NameOnly {
    fn resolve(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Looks for the name in each directory in order; first existing file wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Search next to the asset itself
    pub fn beside(asset: &Path) -> Self {
        let dir = asset
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Self::new([dir])
    }

    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }
}

impl TextureResolver for SearchPaths {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let found = self
            .dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file());
        if found.is_none() {
            debug!("Texture '{}' not found in {} search paths", name, self.dirs.len());
        }
        found
    }
}

impl<F> TextureResolver for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self(name)
    }
}
