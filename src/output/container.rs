//! Path-keyed collection of generated files

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

fn discard(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_dir_all(staging) {
            warn!(dir = %staging.display(), error = %e, "Failed to remove staging directory");
        }
    }
}

/// Generated files keyed by project-relative POSIX path, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutputContainer {
    files: IndexMap<String, String>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim().replace('\\', "/");
    let mut rest = trimmed.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.trim_start_matches('/').to_string()
}

fn is_safe(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

impl OutputContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file, returning the previous content.
    pub fn add(&mut self, path: impl AsRef<str>, content: impl Into<String>) -> Option<String> {
        self.files.insert(normalize(path.as_ref()), content.into())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(&normalize(path)).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Moves every file of `other` into `self`; later writes win.
    pub fn merge(&mut self, other: OutputContainer) {
        self.files.extend(other.files);
    }

    /// Writes the tree under `target`, replacing anything already there.
    ///
    /// Files land in a sibling staging directory first, which is then
    /// renamed over `target`.
    pub fn write_to_dir(&self, target: &Path) -> Result<()> {
        for path in self.paths() {
            if !is_safe(path) {
                bail!("Refusing to write '{}' outside the project directory", path);
            }
        }

        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .context("Output directory must have a name")?;
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let staging = parent.join(format!(".{}.staging-{}", name, std::process::id()));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }

        if let Err(e) = self.write_tree(&staging) {
            discard(&staging);
            return Err(e);
        }

        let backup = parent.join(format!(".{}.previous-{}", name, std::process::id()));
        if target.exists() {
            fs::rename(target, &backup)
                .with_context(|| format!("Failed to move aside {}", target.display()))?;
        }
        if let Err(e) = fs::rename(&staging, target) {
            if backup.exists() {
                if let Err(restore) = fs::rename(&backup, target) {
                    warn!(
                        dir = %target.display(),
                        backup = %backup.display(),
                        error = %restore,
                        "Failed to restore previous project"
                    );
                }
            }
            discard(&staging);
            return Err(e).with_context(|| format!("Failed to replace {}", target.display()));
        }
        if backup.exists() {
            fs::remove_dir_all(&backup)
                .with_context(|| format!("Failed to remove {}", backup.display()))?;
        }

        info!(dir = %target.display(), files = self.len(), "Wrote project");
        Ok(())
    }

    fn write_tree(&self, root: &Path) -> Result<()> {
        for (path, content) in self.iter() {
            let dest = root.join(path);
            if let Some(dir) = dest.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            fs::write(&dest, content)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            #[cfg(unix)]
            if path.ends_with(".sh") {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&dest, fs::Permissions::from_mode(0o755))?;
            }
        }
        Ok(())
    }

    /// Gzipped tarball with every file under `root/`.
    pub fn to_archive(&self, root: &str) -> Result<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, content) in self.iter() {
            if !is_safe(path) {
                bail!("Refusing to archive '{}' outside the project directory", path);
            }
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(if path.ends_with(".sh") { 0o755 } else { 0o644 });
            header.set_mtime(0);
            header.set_cksum();
            builder
                .append_data(&mut header, format!("{}/{}", root, path), content.as_bytes())
                .with_context(|| format!("Failed to archive {}", path))?;
        }

        let encoder = builder.into_inner().context("Failed to finish archive")?;
        let bytes = encoder.finish().context("Failed to compress archive")?;
        debug!(bytes = bytes.len(), "Built archive");
        Ok(bytes)
    }

    pub fn write_archive(&self, root: &str, dest: &Path) -> Result<()> {
        let bytes = self.to_archive(root)?;
        if let Some(dir) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(dest, bytes).with_context(|| format!("Failed to write {}", dest.display()))?;
        info!(archive = %dest.display(), files = self.len(), "Wrote archive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn sample() -> OutputContainer {
        let mut out = OutputContainer::new();
        out.add("README.md", "# acme\n");
        out.add("./scripts/switch-env.sh", "#!/bin/bash\n");
        out.add("docker-compose.yml", "services: {}\n");
        out
    }

    #[test]
    fn test_paths_are_normalized_and_ordered() {
        let out = sample();
        let paths: Vec<&str> = out.paths().collect();
        assert_eq!(paths, vec!["README.md", "scripts/switch-env.sh", "docker-compose.yml"]);
        assert_eq!(out.get("./README.md"), Some("# acme\n"));
    }

    #[test]
    fn test_add_replaces_and_returns_previous() {
        let mut out = sample();
        assert_eq!(out.add("README.md", "new"), Some("# acme\n".to_string()));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_merge() {
        let mut out = sample();
        let mut other = OutputContainer::new();
        other.add("dbt/dbt_project.yml", "name: acme");
        other.add("README.md", "override");
        out.merge(other);
        assert_eq!(out.len(), 4);
        assert_eq!(out.get("README.md"), Some("override"));
    }

    #[test]
    fn test_write_to_dir_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("acme");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), "old").unwrap();

        sample().write_to_dir(&target).unwrap();

        assert!(!target.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "# acme\n");
        assert!(target.join("scripts/switch-env.sh").exists());
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_write_leaves_no_staging_and_keeps_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("acme");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("keep.txt"), "old").unwrap();

        let mut out = sample();
        out.add("conf", "file first");
        out.add("conf/nested.yml", "cannot live under a file");
        let err = out.write_to_dir(&target).unwrap_err();

        assert!(format!("{:#}", err).contains("conf"));
        assert_eq!(fs::read_to_string(target.join("keep.txt")).unwrap(), "old");
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".acme."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_rejects_parent_components() {
        let temp = TempDir::new().unwrap();
        let mut out = OutputContainer::new();
        out.add("../escape.txt", "x");
        assert!(out.write_to_dir(&temp.path().join("acme")).is_err());
    }

    #[test]
    fn test_archive_contains_every_file() {
        let bytes = sample().to_archive("acme").unwrap();
        let mut tar_data = Vec::new();
        GzDecoder::new(&bytes[..]).read_to_end(&mut tar_data).unwrap();

        let mut archive = tar::Archive::new(&tar_data[..]);
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["acme/README.md", "acme/scripts/switch-env.sh", "acme/docker-compose.yml"]
        );
    }
}
