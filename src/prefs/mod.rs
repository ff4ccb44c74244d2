use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::clips::DEFAULT_SEGMENT_SECONDS;
use crate::Result;

/// Per-media-source segmentation preferences.
///
/// An explicit key-value store injected into the clip manager: each media
/// source remembers its own segment length, with a shared default fallback.
#[cfg_attr(test, mockall::automock)]
pub trait SegmentPrefs {
    /// Remembered segment length for a source, or the default
    fn segment_length(&self, media_source_id: &str) -> f64;

    /// Persist a segment length for a source
    fn set_segment_length(&mut self, media_source_id: &str, seconds: f64) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PrefsFile {
    #[serde(default)]
    segment_lengths: HashMap<String, f64>,
}

/// File-backed preference store kept under the user config directory
#[derive(Debug)]
pub struct FileSegmentPrefs {
    path: PathBuf,
    default_seconds: f64,
    entries: HashMap<String, f64>,
}

impl FileSegmentPrefs {
    /// Load preferences from the default location, creating nothing on disk
    /// until the first write
    pub fn load(default_seconds: f64) -> Result<Self> {
        let path = Self::prefs_path()?;
        Self::load_from(path, default_seconds)
    }

    /// Load preferences from an explicit path (used by tests)
    pub fn load_from(path: PathBuf, default_seconds: f64) -> Result<Self> {
        let entries = if path.exists() {
            let content =
                fs_err::read_to_string(&path).context("Failed to read segment preferences")?;
            let file: PrefsFile =
                serde_yaml::from_str(&content).context("Failed to parse segment preferences")?;
            file.segment_lengths
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            default_seconds,
            entries,
        })
    }

    fn prefs_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("reelfluent").join("segment-prefs.yaml"))
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        let file = PrefsFile {
            segment_lengths: self.entries.clone(),
        };
        let content =
            serde_yaml::to_string(&file).context("Failed to serialize segment preferences")?;
        fs_err::write(&self.path, content).context("Failed to write segment preferences")?;
        Ok(())
    }
}

impl Default for FileSegmentPrefs {
    fn default() -> Self {
        Self {
            path: Self::prefs_path().unwrap_or_else(|_| PathBuf::from("segment-prefs.yaml")),
            default_seconds: DEFAULT_SEGMENT_SECONDS,
            entries: HashMap::new(),
        }
    }
}

impl SegmentPrefs for FileSegmentPrefs {
    fn segment_length(&self, media_source_id: &str) -> f64 {
        self.entries
            .get(media_source_id)
            .copied()
            .unwrap_or(self.default_seconds)
    }

    fn set_segment_length(&mut self, media_source_id: &str, seconds: f64) -> Result<()> {
        self.entries.insert(media_source_id.to_string(), seconds);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fallback_for_unknown_source() {
        let dir = tempfile::tempdir().unwrap();
        let prefs =
            FileSegmentPrefs::load_from(dir.path().join("prefs.yaml"), 30.0).unwrap();
        assert_eq!(prefs.segment_length("never-seen"), 30.0);
    }

    #[test]
    fn test_set_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yaml");

        let mut prefs = FileSegmentPrefs::load_from(path.clone(), 30.0).unwrap();
        prefs.set_segment_length("src-a", 15.0).unwrap();
        assert_eq!(prefs.segment_length("src-a"), 15.0);

        let reloaded = FileSegmentPrefs::load_from(path, 30.0).unwrap();
        assert_eq!(reloaded.segment_length("src-a"), 15.0);
        assert_eq!(reloaded.segment_length("src-b"), 30.0);
    }
}
