//! Screenshot evidence written next to the test report

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::error::CaptureError;
use crate::webdriver::ScreenshotSource;

/// A screenshot that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub file_name: String,

    /// Where the file was written
    pub path: PathBuf,

    /// Report-relative reference, always with forward slashes
    pub reference: String,
}

/// Directory of captured screenshots.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    dir: PathBuf,

    /// Prefix of report references (the directory name as seen from the report)
    reference_prefix: String,
}

impl EvidenceStore {
    /// Open the store, creating the directory if needed.
    pub fn new(
        dir: impl Into<PathBuf>,
        reference_prefix: impl Into<String>,
    ) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            reference_prefix: reference_prefix.into(),
        })
    }

    pub fn from_config(config: &HarnessConfig) -> std::io::Result<Self> {
        Self::new(config.screenshot_dir(), config.screenshots_subdir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{label}_{yyyyMMdd_HHmmss}_{6 hex}.png`
    pub fn file_name(label: &str, now: DateTime<Local>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}.png", label, now.format("%Y%m%d_%H%M%S"), &suffix[..6])
    }

    /// Report reference for a file in this store.
    pub fn reference(&self, file_name: &str) -> String {
        format!("{}/{}", self.reference_prefix, file_name).replace('\\', "/")
    }

    /// Take a full-page screenshot and store it under a fresh unique name.
    pub fn capture(
        &self,
        source: &dyn ScreenshotSource,
        label: &str,
    ) -> Result<Evidence, CaptureError> {
        let png = source.screenshot_png()?;
        let file_name = self.unused_file_name(label);
        self.write(file_name, &png)
    }

    /// Take a screenshot and store it under exactly `file_name`, replacing any previous file.
    pub fn capture_named(
        &self,
        source: &dyn ScreenshotSource,
        file_name: &str,
    ) -> Result<Evidence, CaptureError> {
        let png = source.screenshot_png()?;
        self.write(file_name.to_string(), &png)
    }

    /// Screenshots currently in the store.
    pub fn list(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "png").unwrap_or(false) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Delete every screenshot; returns how many were removed.
    pub fn clean(&self) -> std::io::Result<usize> {
        let files = self.list()?;
        for path in &files {
            std::fs::remove_file(path)?;
        }
        info!("Removed {} screenshot(s) from {}", files.len(), self.dir.display());
        Ok(files.len())
    }

    // Two failures within one second share the timestamp; the suffix tells them apart.
    fn unused_file_name(&self, label: &str) -> String {
        loop {
            let name = Self::file_name(label, Local::now());
            if !self.dir.join(&name).exists() {
                return name;
            }
        }
    }

    fn write(&self, file_name: String, png: &[u8]) -> Result<Evidence, CaptureError> {
        let path = self.dir.join(&file_name);
        std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(&path, png))
            .map_err(|source| CaptureError::Write {
                path: path.clone(),
                source,
            })?;

        debug!("Saved screenshot {}", path.display());
        Ok(Evidence {
            reference: self.reference(&file_name),
            file_name,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WebDriverError;
    use chrono::TimeZone;

    struct StaticPng;

    impl ScreenshotSource for StaticPng {
        fn screenshot_png(&self) -> Result<Vec<u8>, WebDriverError> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
    }

    struct Unreachable;

    impl ScreenshotSource for Unreachable {
        fn screenshot_png(&self) -> Result<Vec<u8>, WebDriverError> {
            Err(WebDriverError::Unavailable("session gone".to_string()))
        }
    }

    #[test]
    fn test_file_name_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let name = EvidenceStore::file_name("assert_equal_fail", now);

        let prefix = "assert_equal_fail_20240309_140507_";
        assert!(name.starts_with(prefix), "{}", name);
        assert!(name.ends_with(".png"));

        let suffix = &name[prefix.len()..name.len() - 4];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_new_tolerates_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("reports").join("screenshots");
        EvidenceStore::new(&dir, "screenshots").unwrap();
        EvidenceStore::new(&dir, "screenshots").unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_capture_writes_file_and_reference() {
        let tmp = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(tmp.path(), "screenshots").unwrap();

        let evidence = store.capture(&StaticPng, "assert_in_fail").unwrap();
        assert!(evidence.path.exists());
        assert_eq!(evidence.reference, format!("screenshots/{}", evidence.file_name));
        assert_eq!(std::fs::read(&evidence.path).unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_capture_names_are_unique_within_a_second() {
        let tmp = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(tmp.path(), "screenshots").unwrap();

        let names: std::collections::HashSet<String> = (0..20)
            .map(|_| store.capture(&StaticPng, "assert_false_fail").unwrap().file_name)
            .collect();
        assert_eq!(names.len(), 20);
    }

    #[test]
    fn test_reference_uses_forward_slashes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(tmp.path(), "reports\\screenshots").unwrap();
        assert_eq!(store.reference("a.png"), "reports/screenshots/a.png");
    }

    #[test]
    fn test_capture_failure_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(tmp.path(), "screenshots").unwrap();

        assert!(matches!(
            store.capture(&Unreachable, "assert_equal_fail"),
            Err(CaptureError::Driver(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_clean_removes_only_png() {
        let tmp = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(tmp.path(), "screenshots").unwrap();
        store.capture_named(&StaticPng, "tests_test_login.py_test_01.png").unwrap();
        store.capture(&StaticPng, "assert_in_fail").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(store.clean().unwrap(), 2);
        assert!(tmp.path().join("notes.txt").exists());
    }
}
