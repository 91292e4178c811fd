//! Configuration storage for alignment sessions.
//!
//! Keeps the last measurement and the last guide placement so an operator
//! can pick up where they left off. Everything lives in ~/.mirror_align/ by
//! default.

use std::path::{Path, PathBuf};

use crate::guide::GuideSet;
use crate::mirror_alignment::{AlignmentError, AlignmentResult};

/// Configuration storage manager for alignment data.
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    /// Root directory for all stored data (e.g., ~/.mirror_align)
    root_path: PathBuf,
}

impl ConfigStorage {
    /// Create a new config storage with default path (~/.mirror_align)
    pub fn new() -> std::io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        let root_path = PathBuf::from(home).join(".mirror_align");
        Ok(Self { root_path })
    }

    /// Create a new config storage with custom root path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Get the root configuration path
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    // =========================================================================
    // Alignment result
    // =========================================================================

    fn alignment_path(&self) -> PathBuf {
        self.root_path.join("mirror_alignment.json")
    }

    /// Get the last saved alignment result.
    ///
    /// Returns None if nothing has been saved.
    /// Returns Some(Err) if the file exists but cannot be loaded.
    pub fn get_alignment(&self) -> Option<Result<AlignmentResult, AlignmentError>> {
        let path = self.alignment_path();

        if !path.exists() {
            return None;
        }

        Some(AlignmentResult::load_from_file(&path))
    }

    /// Save an alignment result, replacing any previous one.
    ///
    /// Creates the config directory if it doesn't exist.
    /// Returns the path where the result was saved.
    pub fn save_alignment(&self, result: &AlignmentResult) -> Result<PathBuf, AlignmentError> {
        std::fs::create_dir_all(&self.root_path)?;

        let path = self.alignment_path();
        result.save_to_file(&path)?;
        Ok(path)
    }

    /// Delete the saved alignment result.
    ///
    /// Returns Ok(true) if the file was deleted, Ok(false) if it didn't exist.
    pub fn delete_alignment(&self) -> std::io::Result<bool> {
        remove_if_exists(&self.alignment_path())
    }

    // =========================================================================
    // Guide preset
    // =========================================================================

    fn guide_preset_path(&self) -> PathBuf {
        self.root_path.join("guide_preset.json")
    }

    /// Get the last saved guide placement.
    ///
    /// Returns None if no preset exists.
    /// Returns Some(Err) if the file exists but cannot be loaded.
    pub fn get_guide_preset(&self) -> Option<Result<GuideSet, AlignmentError>> {
        let path = self.guide_preset_path();

        if !path.exists() {
            return None;
        }

        let load = || -> Result<GuideSet, AlignmentError> {
            let json = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&json)?)
        };
        Some(load())
    }

    /// Save a guide placement, replacing any previous one.
    pub fn save_guide_preset(&self, guides: &GuideSet) -> Result<PathBuf, AlignmentError> {
        std::fs::create_dir_all(&self.root_path)?;

        let path = self.guide_preset_path();
        let json = serde_json::to_string_pretty(guides)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Delete the saved guide placement.
    ///
    /// Returns Ok(true) if the file was deleted, Ok(false) if it didn't exist.
    pub fn delete_guide_preset(&self) -> std::io::Result<bool> {
        remove_if_exists(&self.guide_preset_path())
    }
}

impl Default for ConfigStorage {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_path(PathBuf::from(".mirror_align")))
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    std::fs::remove_file(path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guide::{Guide, GuideRole};
    use crate::mirror_alignment::compute_alignment;
    use approx::assert_relative_eq;

    fn create_test_storage() -> (tempfile::TempDir, ConfigStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::with_path(dir.path().join("mirror_align"));
        (dir, storage)
    }

    #[test]
    fn test_save_and_load_alignment() {
        let (_dir, storage) = create_test_storage();
        let result = compute_alignment(&GuideSet::default(), 10.0).unwrap();

        let path = storage.save_alignment(&result).unwrap();
        assert!(path.exists());
        assert!(path.ends_with("mirror_alignment.json"));

        let loaded = storage
            .get_alignment()
            .expect("Alignment should exist")
            .expect("Alignment should load successfully");

        assert_relative_eq!(loaded.pixels_per_mm, 20.0, epsilon = 1e-10);
        assert_relative_eq!(loaded.mirror_diameter_mm, 10.0, epsilon = 1e-10);
    }

    #[test]
    fn test_get_nonexistent_alignment() {
        let (_dir, storage) = create_test_storage();
        assert!(storage.get_alignment().is_none());
    }

    #[test]
    fn test_corrupt_alignment_reports_error() {
        let (_dir, storage) = create_test_storage();
        std::fs::create_dir_all(storage.root_path()).unwrap();
        std::fs::write(storage.alignment_path(), "not json").unwrap();

        let loaded = storage.get_alignment().expect("File exists");
        assert!(matches!(loaded, Err(AlignmentError::Json(_))));
    }

    #[test]
    fn test_delete_alignment() {
        let (_dir, storage) = create_test_storage();
        let result = compute_alignment(&GuideSet::default(), 5.0).unwrap();
        storage.save_alignment(&result).unwrap();

        assert!(storage.delete_alignment().unwrap());
        assert!(storage.get_alignment().is_none());
        assert!(!storage.delete_alignment().unwrap());
    }

    #[test]
    fn test_save_and_load_guide_preset() {
        let (_dir, storage) = create_test_storage();
        let mut guides = GuideSet::default();
        guides.mirror = Guide::for_role(GuideRole::Mirror, 700, 550, 100);

        storage.save_guide_preset(&guides).unwrap();

        let loaded = storage
            .get_guide_preset()
            .expect("Preset should exist")
            .expect("Preset should load successfully");
        assert_eq!(loaded, guides);

        assert!(storage.delete_guide_preset().unwrap());
        assert!(storage.get_guide_preset().is_none());
    }
}
