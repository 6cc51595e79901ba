//! Media URL resolution against the local media root.
//!
//! Stored records reference uploads as URLs such as `/media/vehicles/12.jpg`.
//! The resolver maps them to files under the media root and refuses anything
//! that would escape it (e.g., `../../../etc/passwd`).

use std::path::{Component, Path, PathBuf};

const MEDIA_PREFIX: &str = "/media/";

/// Resolves media URLs to existing files under a base directory.
#[derive(Debug, Clone)]
pub struct MediaResolver {
    root: PathBuf,
    /// Canonicalized root for containment checks
    canonical_root: Option<PathBuf>,
}

impl MediaResolver {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        // May fail if the root doesn't exist yet; resolution then falls back to component checks
        let canonical_root = root.canonicalize().ok();
        Self {
            root,
            canonical_root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file a media URL points to, or `None` when the URL is
    /// empty, escapes the root, or names a file that does not exist.
    pub fn resolve(&self, url: Option<&str>) -> Option<PathBuf> {
        let url = url?.trim();
        if url.is_empty() {
            return None;
        }
        let relative = url.strip_prefix(MEDIA_PREFIX).unwrap_or(url);
        let relative = relative.trim_start_matches('/');
        let candidate = self.resolve_path_safe(relative)?;
        candidate.is_file().then_some(candidate)
    }

    fn resolve_path_safe(&self, path: &str) -> Option<PathBuf> {
        if path.is_empty() || Path::new(path).is_absolute() {
            return None;
        }

        if Path::new(path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return None;
        }

        let full_path = self.root.join(path);

        if let Ok(canonical) = full_path.canonicalize()
            && let Some(ref base) = self.canonical_root
        {
            // Symlinks can still point outside the root
            return canonical.starts_with(base).then_some(canonical);
        }

        Some(full_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn strips_media_prefix() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("vehicles")).unwrap();
        fs::write(dir.path().join("vehicles/truck.jpg"), b"jpg").unwrap();

        let resolver = MediaResolver::new(dir.path());
        let resolved = resolver.resolve(Some("/media/vehicles/truck.jpg")).unwrap();
        assert!(resolved.ends_with("vehicles/truck.jpg"));
        assert!(resolver.resolve(Some("vehicles/truck.jpg")).is_some());
    }

    #[test]
    fn missing_files_do_not_resolve() {
        let dir = tempdir().unwrap();
        let resolver = MediaResolver::new(dir.path());
        assert_eq!(resolver.resolve(Some("/media/nope.jpg")), None);
        assert_eq!(resolver.resolve(Some("   ")), None);
        assert_eq!(resolver.resolve(None), None);
    }

    #[test]
    fn blocks_path_traversal() {
        let dir = tempdir().unwrap();
        let inner = dir.path().join("media");
        fs::create_dir(&inner).unwrap();
        fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        let resolver = MediaResolver::new(&inner);
        assert_eq!(resolver.resolve(Some("../secret.txt")), None);
        assert_eq!(resolver.resolve(Some("/media/../secret.txt")), None);
        assert_eq!(resolver.resolve(Some("./../secret.txt")), None);
    }

    #[test]
    fn directories_do_not_resolve() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("vehicles")).unwrap();
        let resolver = MediaResolver::new(dir.path());
        assert_eq!(resolver.resolve(Some("/media/vehicles")), None);
    }
}
