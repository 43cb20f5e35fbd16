use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const SOURCE_EXTENSION: &str = "flac";
pub const TARGET_EXTENSION: &str = "mp3";

/// Where sources are read from and where converted files are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    input_root: PathBuf,
    output_root: PathBuf,
}

impl Layout {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
        }
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
    }

    /// Maps `<input_root>/a/b.flac` to `<output_root>/a/b.mp3`.
    pub fn destination_for(&self, source: &Path) -> Result<PathBuf> {
        let relative = source.strip_prefix(&self.input_root).with_context(|| {
            format!(
                "{} is not under input root {}",
                source.display(),
                self.input_root.display()
            )
        })?;
        if relative.file_name().is_none() {
            anyhow::bail!("{} has no file name", source.display());
        }
        Ok(self
            .output_root
            .join(relative)
            .with_extension(TARGET_EXTENSION))
    }
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn destination_mirrors_tree_with_target_extension() -> Result<()> {
        let layout = Layout::new("/music/flac", "/music/mp3");
        let source = Path::new("/music/flac/Artist/Song.flac");
        let dest = layout.destination_for(source)?;
        assert_eq!(dest, PathBuf::from("/music/mp3/Artist/Song.mp3"));
        assert_eq!(layout.destination_for(source)?, dest);
        Ok(())
    }

    #[test]
    fn destination_only_replaces_last_extension() -> Result<()> {
        let layout = Layout::new("/in", "/out");
        let dest = layout.destination_for(Path::new("/in/Live.at.Home.FLAC"))?;
        assert_eq!(dest, PathBuf::from("/out/Live.at.Home.mp3"));
        Ok(())
    }

    #[test]
    fn destination_rejects_paths_outside_root() {
        let layout = Layout::new("/music/flac", "/music/mp3");
        assert!(layout.destination_for(Path::new("/other/Song.flac")).is_err());
        assert!(layout.destination_for(Path::new("/music/flac")).is_err());
    }

    #[test]
    fn source_extension_is_case_insensitive() {
        let layout = Layout::new("/in", "/out");
        assert!(layout.is_source(Path::new("/in/a.flac")));
        assert!(layout.is_source(Path::new("/in/a.FLAC")));
        assert!(!layout.is_source(Path::new("/in/a.mp3")));
        assert!(!layout.is_source(Path::new("/in/flac")));
    }

    #[test]
    fn ensure_parent_dir_creates_nested_dirs() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("a/b/c/song.mp3");
        ensure_parent_dir(&target)?;
        assert!(dir.path().join("a/b/c").is_dir());
        assert!(!target.exists());
        Ok(())
    }
}
