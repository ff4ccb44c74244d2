use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::clips::{Clip, ComparisonResult, FlowOutcome};
use crate::ReelFluentError;
use crate::Result;

/// Aggregate duration cap for saved session clips, in seconds (30 minutes)
pub const MAX_SESSION_SECONDS: f64 = 1800.0;

/// Maximum number of concurrently loaded media sources
pub const MAX_MEDIA_SOURCES: usize = 3;

/// Kind of loaded media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSourceKind {
    Video,
    Audio,
    Url,
    Unknown,
}

impl MediaSourceKind {
    /// Uploaded sources (everything except URL-backed ones) are torn down
    /// entirely when their last clip is removed
    pub fn is_uploaded(&self) -> bool {
        !matches!(self, MediaSourceKind::Url)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSourceKind::Video => "video",
            MediaSourceKind::Audio => "audio",
            MediaSourceKind::Url => "url",
            MediaSourceKind::Unknown => "unknown",
        }
    }
}

/// One loaded video/audio file or URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub id: String,

    /// File path or URL the media was loaded from
    pub src: String,

    pub display_name: String,

    pub kind: MediaSourceKind,

    /// Duration in seconds
    pub duration: f64,

    /// Source-language tag for transcription
    pub language: String,
}

/// A clip saved to the session, surviving media-source switches.
///
/// Carries the same result fields as [`Clip`] plus a display name, a
/// back-reference to its media source, and the clip number it had in the
/// auto-generated list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClip {
    /// Stable id assigned at creation; upserts key on this
    pub id: String,

    pub media_source_id: String,

    pub display_name: String,

    /// 1-based number the clip had in the auto-generated list, if any
    pub original_clip_number: Option<u32>,

    pub start_time: f64,
    pub end_time: f64,
    pub language: String,

    pub user_transcription: Option<String>,
    pub automated_transcription: Option<FlowOutcome>,
    pub translation: Option<FlowOutcome>,
    pub translation_target_language: Option<String>,
    pub comparison_result: Option<ComparisonResult>,

    pub is_focused: bool,
}

impl SessionClip {
    /// Create a fresh session clip for a range of a source.
    ///
    /// The id is deterministic over `(source, start, end)` so re-saving the
    /// same range always lands on the same clip.
    pub fn new(
        source: &MediaSource,
        start_time: f64,
        end_time: f64,
        display_name: String,
        original_clip_number: Option<u32>,
    ) -> Self {
        let start_ms = (start_time * 1000.0).round() as u64;
        let end_ms = (end_time * 1000.0).round() as u64;
        Self {
            id: format!("clip-{}-{}-{}", start_ms, end_ms, source.id),
            media_source_id: source.id.clone(),
            display_name,
            original_clip_number,
            start_time,
            end_time,
            language: source.language.clone(),
            user_transcription: None,
            automated_transcription: None,
            translation: None,
            translation_target_language: None,
            comparison_result: None,
            is_focused: original_clip_number.is_none(),
        }
    }

    /// Build a session clip from a working clip
    pub fn from_clip(
        clip: &Clip,
        media_source_id: &str,
        display_name: &str,
        original_clip_number: Option<u32>,
    ) -> Self {
        Self {
            id: clip.id.clone(),
            media_source_id: media_source_id.to_string(),
            display_name: display_name.to_string(),
            original_clip_number,
            start_time: clip.start_time,
            end_time: clip.end_time,
            language: clip.language.clone(),
            user_transcription: clip.user_transcription.clone(),
            automated_transcription: clip.automated_transcription.clone(),
            translation: clip.translation.clone(),
            translation_target_language: clip.translation_target_language.clone(),
            comparison_result: clip.comparison_result.clone(),
            is_focused: clip.is_focused,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Merge another payload for the same clip: present fields overwrite,
    /// absent fields keep their existing value
    fn merge_from(&mut self, incoming: &SessionClip) {
        self.display_name = incoming.display_name.clone();
        if incoming.original_clip_number.is_some() {
            self.original_clip_number = incoming.original_clip_number;
        }
        if incoming.user_transcription.is_some() {
            self.user_transcription = incoming.user_transcription.clone();
        }
        if incoming.automated_transcription.is_some() {
            self.automated_transcription = incoming.automated_transcription.clone();
        }
        if incoming.translation.is_some() {
            self.translation = incoming.translation.clone();
        }
        if incoming.translation_target_language.is_some() {
            self.translation_target_language = incoming.translation_target_language.clone();
        }
        if incoming.comparison_result.is_some() {
            self.comparison_result = incoming.comparison_result.clone();
        }
    }
}

/// Partial update for a saved session clip; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct SessionClipPatch {
    pub display_name: Option<String>,
    pub user_transcription: Option<String>,
    pub automated_transcription: Option<FlowOutcome>,
    pub translation: Option<FlowOutcome>,
    pub translation_target_language: Option<String>,
    pub comparison_result: Option<ComparisonResult>,
}

/// Whether `add_session_clip` inserted a new clip or updated an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    Updated,
}

/// Bounded, persistent collection of media sources and user-curated clips.
///
/// Holds at most [`MAX_MEDIA_SOURCES`] sources and at most
/// [`MAX_SESSION_SECONDS`] of aggregate saved clip time. Every saved clip's
/// `media_source_id` always resolves to a live source; deleting a source
/// cascades to its clips first.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionStore {
    media_sources: Vec<MediaSource>,
    active_source: Option<String>,
    clips: Vec<SessionClip>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default on-disk location for the session snapshot
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join("reelfluent").join("session.json"))
    }

    /// Load a session snapshot, or start empty when none exists
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs_err::read_to_string(path).context("Failed to read session file")?;
        let store: SessionStore =
            serde_json::from_str(&content).context("Failed to parse session file")?;
        Ok(store)
    }

    /// Write the session snapshot to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        fs_err::write(path, content).context("Failed to write session file")?;
        Ok(())
    }

    pub fn media_sources(&self) -> &[MediaSource] {
        &self.media_sources
    }

    pub fn media_source(&self, id: &str) -> Option<&MediaSource> {
        self.media_sources.iter().find(|s| s.id == id)
    }

    /// The exclusively selected source, if any
    pub fn active_source(&self) -> Option<&MediaSource> {
        self.active_source
            .as_deref()
            .and_then(|id| self.media_source(id))
    }

    /// Register a media source and make it the active one.
    ///
    /// A source with a known id is replaced in place; otherwise the
    /// [`MAX_MEDIA_SOURCES`] cap applies.
    pub fn add_media_source(&mut self, source: MediaSource) -> std::result::Result<(), ReelFluentError> {
        if let Some(existing) = self.media_sources.iter_mut().find(|s| s.id == source.id) {
            *existing = source.clone();
        } else {
            if self.media_sources.len() >= MAX_MEDIA_SOURCES {
                return Err(ReelFluentError::SessionLimit(format!(
                    "at most {} media sources can be loaded; remove one first",
                    MAX_MEDIA_SOURCES
                )));
            }
            self.media_sources.push(source.clone());
        }
        self.active_source = Some(source.id);
        Ok(())
    }

    /// Select a registered source exclusively
    pub fn set_active_source(&mut self, id: &str) -> std::result::Result<(), ReelFluentError> {
        if self.media_source(id).is_none() {
            return Err(ReelFluentError::InvalidSelection(format!(
                "unknown media source {}",
                id
            )));
        }
        self.active_source = Some(id.to_string());
        Ok(())
    }

    /// Remove a media source, cascading deletion of its saved clips.
    ///
    /// Returns the number of clips removed with it.
    pub fn remove_media_source(&mut self, id: &str) -> std::result::Result<usize, ReelFluentError> {
        let index = self
            .media_sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| {
                ReelFluentError::InvalidSelection(format!("unknown media source {}", id))
            })?;

        // Clips go first so the back-reference invariant never breaks
        let before = self.clips.len();
        self.clips.retain(|c| c.media_source_id != id);
        let removed_clips = before - self.clips.len();

        self.media_sources.remove(index);
        if self.active_source.as_deref() == Some(id) {
            self.active_source = None;
        }

        tracing::info!(source = id, removed_clips, "removed media source");
        Ok(removed_clips)
    }

    pub fn clips(&self) -> &[SessionClip] {
        &self.clips
    }

    pub fn clip(&self, id: &str) -> Option<&SessionClip> {
        self.clips.iter().find(|c| c.id == id)
    }

    /// Aggregate duration of all saved clips in seconds
    pub fn total_saved_seconds(&self) -> f64 {
        self.clips.iter().map(|c| c.duration()).sum()
    }

    fn find_existing(&self, incoming: &SessionClip) -> Option<usize> {
        // Stable id first, then the time-range composite so a re-save of the
        // same range updates instead of duplicating.
        self.clips
            .iter()
            .position(|c| c.id == incoming.id)
            .or_else(|| {
                self.clips.iter().position(|c| {
                    c.media_source_id == incoming.media_source_id
                        && c.start_time == incoming.start_time
                        && c.end_time == incoming.end_time
                })
            })
    }

    /// Save a clip to the session.
    ///
    /// A clip matching an existing one (by id, or by its time range within the
    /// same source) is merged into it. Inserting past the 30-minute aggregate
    /// cap is rejected without touching the store.
    pub fn add_session_clip(&mut self, clip: SessionClip) -> std::result::Result<AddOutcome, ReelFluentError> {
        if self.media_source(&clip.media_source_id).is_none() {
            return Err(ReelFluentError::InvalidSelection(format!(
                "media source {} is not loaded",
                clip.media_source_id
            )));
        }

        let existing = self.find_existing(&clip);
        let replaced_seconds = existing
            .map(|i| self.clips[i].duration())
            .unwrap_or(0.0);
        let projected = self.total_saved_seconds() - replaced_seconds + clip.duration();
        if projected > MAX_SESSION_SECONDS {
            return Err(ReelFluentError::SessionLimit(format!(
                "saving this clip would hold {:.1} minutes of audio; the session is limited to {:.0} minutes",
                projected / 60.0,
                MAX_SESSION_SECONDS / 60.0
            )));
        }

        match existing {
            Some(index) => {
                self.clips[index].merge_from(&clip);
                Ok(AddOutcome::Updated)
            }
            None => {
                self.clips.push(clip);
                Ok(AddOutcome::Inserted)
            }
        }
    }

    /// Apply a partial update to a saved clip
    pub fn update_session_clip(
        &mut self,
        id: &str,
        patch: SessionClipPatch,
    ) -> std::result::Result<(), ReelFluentError> {
        let clip = self
            .clips
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| {
                ReelFluentError::InvalidSelection(format!("unknown session clip {}", id))
            })?;

        if let Some(display_name) = patch.display_name {
            clip.display_name = display_name;
        }
        if let Some(user_transcription) = patch.user_transcription {
            clip.user_transcription = Some(user_transcription);
        }
        if let Some(automated) = patch.automated_transcription {
            clip.automated_transcription = Some(automated);
        }
        if let Some(translation) = patch.translation {
            clip.translation = Some(translation);
        }
        if let Some(target) = patch.translation_target_language {
            clip.translation_target_language = Some(target);
        }
        if let Some(comparison) = patch.comparison_result {
            clip.comparison_result = Some(comparison);
        }
        Ok(())
    }

    /// Delete a saved clip
    pub fn remove_session_clip(&mut self, id: &str) -> std::result::Result<(), ReelFluentError> {
        let index = self.clips.iter().position(|c| c.id == id).ok_or_else(|| {
            ReelFluentError::InvalidSelection(format!("unknown session clip {}", id))
        })?;
        self.clips.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str) -> MediaSource {
        MediaSource {
            id: id.to_string(),
            src: format!("/media/{}.mp4", id),
            display_name: format!("{}.mp4", id),
            kind: MediaSourceKind::Video,
            duration: 3600.0,
            language: "english".to_string(),
        }
    }

    fn clip(id: &str, source_id: &str, start: f64, end: f64) -> SessionClip {
        SessionClip {
            id: id.to_string(),
            media_source_id: source_id.to_string(),
            display_name: format!("Clip {}", id),
            original_clip_number: None,
            start_time: start,
            end_time: end,
            language: "english".to_string(),
            user_transcription: None,
            automated_transcription: None,
            translation: None,
            translation_target_language: None,
            comparison_result: None,
            is_focused: false,
        }
    }

    fn store_with_source(id: &str) -> SessionStore {
        let mut store = SessionStore::new();
        store.add_media_source(source(id)).unwrap();
        store
    }

    #[test]
    fn test_media_source_cap() {
        let mut store = SessionStore::new();
        store.add_media_source(source("a")).unwrap();
        store.add_media_source(source("b")).unwrap();
        store.add_media_source(source("c")).unwrap();
        assert!(matches!(
            store.add_media_source(source("d")),
            Err(ReelFluentError::SessionLimit(_))
        ));
        // Replacing an existing source is not a new slot
        assert!(store.add_media_source(source("b")).is_ok());
        assert_eq!(store.media_sources().len(), 3);
    }

    #[test]
    fn test_newly_added_source_becomes_active() {
        let mut store = SessionStore::new();
        store.add_media_source(source("a")).unwrap();
        store.add_media_source(source("b")).unwrap();
        assert_eq!(store.active_source().unwrap().id, "b");
        store.set_active_source("a").unwrap();
        assert_eq!(store.active_source().unwrap().id, "a");
    }

    #[test]
    fn test_add_session_clip_enforces_cap() {
        let mut store = store_with_source("a");

        // 20 minutes fits
        store
            .add_session_clip(clip("c1", "a", 0.0, 1200.0))
            .unwrap();

        // A further 15 minutes would make 35 > 30
        let result = store.add_session_clip(clip("c2", "a", 1200.0, 2100.0));
        assert!(matches!(result, Err(ReelFluentError::SessionLimit(_))));

        // Store unchanged by the rejection
        assert_eq!(store.clips().len(), 1);
        assert_eq!(store.total_saved_seconds(), 1200.0);

        // 10 more minutes lands exactly on the cap
        store
            .add_session_clip(clip("c3", "a", 1200.0, 1800.0))
            .unwrap();
        assert_eq!(store.total_saved_seconds(), 1800.0);
    }

    #[test]
    fn test_add_rejects_unknown_source() {
        let mut store = store_with_source("a");
        assert!(store
            .add_session_clip(clip("c1", "ghost", 0.0, 30.0))
            .is_err());
    }

    #[test]
    fn test_resave_same_range_updates_instead_of_duplicating() {
        let mut store = store_with_source("a");
        store.add_session_clip(clip("c1", "a", 0.0, 30.0)).unwrap();

        // Different id, same (source, start, end): treated as an update
        let mut resave = clip("other-id", "a", 0.0, 30.0);
        resave.user_transcription = Some("my attempt".to_string());
        let outcome = store.add_session_clip(resave).unwrap();
        assert_eq!(outcome, AddOutcome::Updated);
        assert_eq!(store.clips().len(), 1);
        assert_eq!(
            store.clips()[0].user_transcription.as_deref(),
            Some("my attempt")
        );
    }

    #[test]
    fn test_merge_preserves_fields_absent_from_payload() {
        let mut store = store_with_source("a");
        let mut first = clip("c1", "a", 0.0, 30.0);
        first.automated_transcription = Some(FlowOutcome::Done("bonjour".to_string()));
        first.user_transcription = Some("bonjur".to_string());
        store.add_session_clip(first).unwrap();

        // Re-save with only a translation set; earlier results must survive
        let mut second = clip("c1", "a", 0.0, 30.0);
        second.translation = Some(FlowOutcome::Done("hello".to_string()));
        store.add_session_clip(second).unwrap();

        let saved = store.clip("c1").unwrap();
        assert_eq!(
            saved.automated_transcription,
            Some(FlowOutcome::Done("bonjour".to_string()))
        );
        assert_eq!(saved.user_transcription.as_deref(), Some("bonjur"));
        assert_eq!(
            saved.translation,
            Some(FlowOutcome::Done("hello".to_string()))
        );
    }

    #[test]
    fn test_update_session_clip_partial_patch() {
        let mut store = store_with_source("a");
        let mut saved = clip("c1", "a", 0.0, 30.0);
        saved.user_transcription = Some("hola".to_string());
        store.add_session_clip(saved).unwrap();

        store
            .update_session_clip(
                "c1",
                SessionClipPatch {
                    translation: Some(FlowOutcome::Done("hello".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();

        let updated = store.clip("c1").unwrap();
        assert_eq!(updated.user_transcription.as_deref(), Some("hola"));
        assert_eq!(
            updated.translation,
            Some(FlowOutcome::Done("hello".to_string()))
        );
    }

    #[test]
    fn test_update_unknown_clip_errors() {
        let mut store = store_with_source("a");
        assert!(store
            .update_session_clip("nope", SessionClipPatch::default())
            .is_err());
    }

    #[test]
    fn test_remove_media_source_cascades_only_its_clips() {
        let mut store = SessionStore::new();
        store.add_media_source(source("a")).unwrap();
        store.add_media_source(source("b")).unwrap();
        store.add_session_clip(clip("a1", "a", 0.0, 30.0)).unwrap();
        store.add_session_clip(clip("a2", "a", 30.0, 60.0)).unwrap();
        store.add_session_clip(clip("b1", "b", 0.0, 30.0)).unwrap();

        let removed = store.remove_media_source("a").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.media_sources().len(), 1);
        assert_eq!(store.clips().len(), 1);
        assert_eq!(store.clips()[0].id, "b1");

        // Back-reference invariant holds for survivors
        for clip in store.clips() {
            assert!(store.media_source(&clip.media_source_id).is_some());
        }
    }

    #[test]
    fn test_remove_active_source_clears_selection() {
        let mut store = store_with_source("a");
        store.remove_media_source("a").unwrap();
        assert!(store.active_source().is_none());
    }

    #[test]
    fn test_remove_session_clip() {
        let mut store = store_with_source("a");
        store.add_session_clip(clip("c1", "a", 0.0, 30.0)).unwrap();
        store.remove_session_clip("c1").unwrap();
        assert!(store.clips().is_empty());
        assert!(store.remove_session_clip("c1").is_err());
    }

    #[test]
    fn test_updating_existing_clip_charges_only_the_delta() {
        let mut store = store_with_source("a");
        // Fill the session to the cap exactly
        store
            .add_session_clip(clip("c1", "a", 0.0, 1800.0))
            .unwrap();

        // Re-saving the same clip must not count its duration twice
        let mut resave = clip("c1", "a", 0.0, 1800.0);
        resave.user_transcription = Some("...".to_string());
        assert!(store.add_session_clip(resave).is_ok());
    }

    #[test]
    fn test_session_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = store_with_source("a");
        let mut saved = clip("c1", "a", 0.0, 30.0);
        saved.automated_transcription = Some(FlowOutcome::Done("hello".to_string()));
        store.add_session_clip(saved).unwrap();
        store.save(&path).unwrap();

        let reloaded = SessionStore::load(&path).unwrap();
        assert_eq!(reloaded.media_sources().len(), 1);
        assert_eq!(reloaded.clips().len(), 1);
        assert_eq!(
            reloaded.clip("c1").unwrap().automated_transcription,
            Some(FlowOutcome::Done("hello".to_string()))
        );
    }

    #[test]
    fn test_load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(store.clips().is_empty());
        assert!(store.media_sources().is_empty());
    }
}
