use serde::{Deserialize, Serialize};

pub mod manager;

pub use manager::{ClipManager, ClipView, CommitStatus, Generation, LoadOutcome, RemoveOutcome};

use crate::ReelFluentError;

/// Minimum length of a user-trimmed clip in seconds
pub const MIN_FOCUSED_CLIP_SECONDS: f64 = 1.0;

/// Maximum length of a user-trimmed clip in seconds
pub const MAX_FOCUSED_CLIP_SECONDS: f64 = 300.0;

/// Default auto-segmentation length in seconds
pub const DEFAULT_SEGMENT_SECONDS: f64 = 30.0;

/// Outcome of an asynchronous AI flow attached to a clip.
///
/// A field of `Option<FlowOutcome>` distinguishes "never attempted" (`None`)
/// from pending, completed, and failed attempts. A failure on one clip never
/// affects any other clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FlowOutcome {
    /// Submitted, result not yet available
    Pending,
    /// Completed successfully with the produced text
    Done(String),
    /// Failed with a user-facing message
    Failed(String),
}

impl FlowOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, FlowOutcome::Pending)
    }

    /// Completed text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            FlowOutcome::Done(text) => Some(text),
            _ => None,
        }
    }
}

/// One token of a user-vs-automated transcription comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonToken {
    pub word: String,
    pub verdict: TokenVerdict,
    /// The expected word when the verdict is `Misspelled`
    pub expected: Option<String>,
}

/// Per-word verdict produced by the comparison flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenVerdict {
    Correct,
    Misspelled,
    Missing,
    Extra,
}

/// Structured comparison result for a clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub tokens: Vec<ComparisonToken>,
    /// Fraction of reference words matched exactly, 0.0 to 1.0
    pub accuracy: f64,
}

/// A time-bounded segment of a media source, the unit of transcription work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Stable identifier, deterministic per position and media source
    pub id: String,

    /// Start of the clip in seconds from the beginning of the media
    pub start_time: f64,

    /// End of the clip in seconds, exclusive
    pub end_time: f64,

    /// Source-language tag used for transcription
    pub language: String,

    /// Transcription typed by the user
    pub user_transcription: Option<String>,

    /// Machine transcription of the clip audio
    pub automated_transcription: Option<FlowOutcome>,

    /// Translation of the transcription
    pub translation: Option<FlowOutcome>,

    /// Language the translation targets
    pub translation_target_language: Option<String>,

    /// Token-level comparison of user vs automated transcription
    pub comparison_result: Option<ComparisonResult>,

    /// True for user-trimmed clips, false for auto-generated ones
    pub is_focused: bool,
}

impl Clip {
    /// Clip length in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    fn blank(id: String, start_time: f64, end_time: f64, language: &str, is_focused: bool) -> Self {
        Self {
            id,
            start_time,
            end_time,
            language: language.to_string(),
            user_transcription: None,
            automated_transcription: None,
            translation: None,
            translation_target_language: None,
            comparison_result: None,
            is_focused,
        }
    }
}

/// Deterministic id for an auto-generated clip
fn auto_clip_id(index: usize, media_source_id: Option<&str>) -> String {
    match media_source_id {
        Some(source) => format!("clip-{}-{}", index, source),
        None => format!("clip-{}", index),
    }
}

/// Deterministic id for a focused clip, keyed by its millisecond range
fn focused_clip_id(start_time: f64, end_time: f64, media_source_id: Option<&str>) -> String {
    let start_ms = (start_time * 1000.0).round() as u64;
    let end_ms = (end_time * 1000.0).round() as u64;
    match media_source_id {
        Some(source) => format!("focused-{}-{}-{}", start_ms, end_ms, source),
        None => format!("focused-{}-{}", start_ms, end_ms),
    }
}

/// Split a media duration into fixed-length, contiguous clips.
///
/// Clips partition `[0, duration)` with no gaps or overlaps; the final clip is
/// truncated to the exact duration when it is not a multiple of
/// `segment_length`. Invalid input (`NaN`, infinite, or non-positive duration
/// or segment length) yields an empty list rather than an error, so callers
/// surface a notice instead of unwinding.
pub fn generate_clips(
    duration: f64,
    segment_length: f64,
    language: &str,
    media_source_id: Option<&str>,
) -> Vec<Clip> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }
    if !segment_length.is_finite() || segment_length <= 0.0 {
        return Vec::new();
    }

    let mut clips = Vec::new();
    let mut start = 0.0;
    let mut index = 0;
    while start < duration {
        let end = (start + segment_length).min(duration);
        clips.push(Clip::blank(
            auto_clip_id(index, media_source_id),
            start,
            end,
            language,
            false,
        ));
        start += segment_length;
        index += 1;
    }

    clips
}

/// Create a user-trimmed clip covering `[start_time, end_time)`.
///
/// The 1-300 second length bound and range ordering are enforced here rather
/// than trusted to callers.
pub fn create_focused_clip(
    start_time: f64,
    end_time: f64,
    language: &str,
    media_source_id: Option<&str>,
) -> Result<Clip, ReelFluentError> {
    if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 {
        return Err(ReelFluentError::InvalidClipRange(format!(
            "times must be non-negative finite seconds, got {}..{}",
            start_time, end_time
        )));
    }
    if end_time <= start_time {
        return Err(ReelFluentError::InvalidClipRange(format!(
            "end time {} must be after start time {}",
            end_time, start_time
        )));
    }
    let length = end_time - start_time;
    if !(MIN_FOCUSED_CLIP_SECONDS..=MAX_FOCUSED_CLIP_SECONDS).contains(&length) {
        return Err(ReelFluentError::InvalidClipRange(format!(
            "clip length {:.1}s is outside the allowed {:.0}-{:.0}s range",
            length, MIN_FOCUSED_CLIP_SECONDS, MAX_FOCUSED_CLIP_SECONDS
        )));
    }

    Ok(Clip::blank(
        focused_clip_id(start_time, end_time, media_source_id),
        start_time,
        end_time,
        language,
        true,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_clips_partitions_duration() {
        let clips = generate_clips(95.0, 30.0, "english", None);
        assert_eq!(clips.len(), 4);

        let ranges: Vec<(f64, f64)> = clips.iter().map(|c| (c.start_time, c.end_time)).collect();
        assert_eq!(
            ranges,
            vec![(0.0, 30.0), (30.0, 60.0), (60.0, 90.0), (90.0, 95.0)]
        );

        // Contiguous, no gaps or overlaps
        for pair in clips.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        assert_eq!(clips.last().unwrap().end_time, 95.0);
    }

    #[test]
    fn test_generate_clips_exact_multiple() {
        let clips = generate_clips(60.0, 30.0, "english", None);
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[1].end_time, 60.0);
        assert_eq!(clips[1].duration(), 30.0);
    }

    #[test]
    fn test_generate_clips_invalid_duration() {
        assert!(generate_clips(0.0, 30.0, "english", None).is_empty());
        assert!(generate_clips(-5.0, 30.0, "english", None).is_empty());
        assert!(generate_clips(f64::NAN, 30.0, "english", None).is_empty());
        assert!(generate_clips(f64::INFINITY, 30.0, "english", None).is_empty());
    }

    #[test]
    fn test_generate_clips_invalid_segment_length() {
        assert!(generate_clips(95.0, 0.0, "english", None).is_empty());
        assert!(generate_clips(95.0, -1.0, "english", None).is_empty());
        assert!(generate_clips(95.0, f64::NAN, "english", None).is_empty());
    }

    #[test]
    fn test_generate_clips_short_media_single_clip() {
        let clips = generate_clips(12.5, 30.0, "spanish", None);
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].start_time, 0.0);
        assert_eq!(clips[0].end_time, 12.5);
    }

    #[test]
    fn test_generate_clips_idempotent() {
        let first = generate_clips(95.0, 30.0, "english", Some("src-a"));
        let second = generate_clips(95.0, 30.0, "english", Some("src-a"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_clip_ids_scoped_to_media_source() {
        let a = generate_clips(60.0, 30.0, "english", Some("src-a"));
        let b = generate_clips(60.0, 30.0, "english", Some("src-b"));
        assert_ne!(a[0].id, b[0].id);
        // Same time ranges regardless of source
        assert_eq!(a[0].start_time, b[0].start_time);
        assert_eq!(a[0].end_time, b[0].end_time);
    }

    #[test]
    fn test_generated_clips_have_blank_results() {
        let clips = generate_clips(30.0, 30.0, "french", None);
        let clip = &clips[0];
        assert_eq!(clip.language, "french");
        assert!(clip.user_transcription.is_none());
        assert!(clip.automated_transcription.is_none());
        assert!(clip.translation.is_none());
        assert!(clip.comparison_result.is_none());
        assert!(!clip.is_focused);
    }

    #[test]
    fn test_create_focused_clip_valid() {
        let clip = create_focused_clip(10.0, 40.0, "english", Some("src-a")).unwrap();
        assert!(clip.is_focused);
        assert_eq!(clip.duration(), 30.0);
    }

    #[test]
    fn test_create_focused_clip_rejects_out_of_range() {
        // Below the 1s minimum
        assert!(create_focused_clip(10.0, 10.5, "english", None).is_err());
        // Above the 300s maximum
        assert!(create_focused_clip(0.0, 301.0, "english", None).is_err());
        // Inverted range
        assert!(create_focused_clip(40.0, 10.0, "english", None).is_err());
        // Negative start
        assert!(create_focused_clip(-1.0, 10.0, "english", None).is_err());
        // Boundaries are inclusive
        assert!(create_focused_clip(0.0, 1.0, "english", None).is_ok());
        assert!(create_focused_clip(0.0, 300.0, "english", None).is_ok());
    }

    #[test]
    fn test_focused_clip_id_deterministic() {
        let a = create_focused_clip(1.5, 20.0, "english", Some("src")).unwrap();
        let b = create_focused_clip(1.5, 20.0, "english", Some("src")).unwrap();
        assert_eq!(a.id, b.id);
    }
}
