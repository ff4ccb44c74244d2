use crate::clips::{
    create_focused_clip, generate_clips, Clip, ComparisonResult, FlowOutcome,
};
use crate::prefs::SegmentPrefs;
use crate::session::MediaSource;
use crate::ReelFluentError;

/// Token identifying one media-load epoch.
///
/// Every media load or switch mints a new generation. Async results carry the
/// generation they were started under; a commit whose generation no longer
/// matches the manager's current one is discarded as stale instead of
/// clobbering state that belongs to a different source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// What the user is currently looking at for the loaded source
#[derive(Debug, Clone, PartialEq)]
pub enum ClipView {
    /// Media loaded but no clips could be generated
    Empty,
    /// Auto-generated clip list with one active index
    Auto { active: usize },
    /// User-trimmed clip overriding the auto list, which is retained hidden
    Focused { clip: Clip, previous: usize },
}

/// Result of loading or re-segmenting a media source
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded { clip_count: usize },
    /// No clips could be generated; `notice` is shown to the user
    Empty { notice: String },
}

/// Result of removing a clip from the auto list
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    /// Clip removed; `active` is the clamped active index, if any clips remain
    Removed { active: usize },
    /// The last clip of an uploaded source was removed, tearing the source down
    SourceReset,
}

/// Whether an async flow result was applied or discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Committed,
    /// The generation moved on (media switched) or the clip is gone
    Stale,
}

struct ActiveMedia {
    source: MediaSource,
    clips: Vec<Clip>,
    view: ClipView,
}

/// Per-source clip state machine.
///
/// Tracks the loaded media source, its auto-generated clips, the active clip
/// index, and an optional focused-clip override. Segment-length preferences
/// are read from and written to the injected [`SegmentPrefs`] store, keyed by
/// media source id.
pub struct ClipManager<P: SegmentPrefs> {
    prefs: P,
    media: Option<ActiveMedia>,
    generation: u64,
}

impl<P: SegmentPrefs> ClipManager<P> {
    pub fn new(prefs: P) -> Self {
        Self {
            prefs,
            media: None,
            generation: 0,
        }
    }

    /// Current generation token, captured by callers before starting async work
    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    /// Load a media source, replacing whatever was loaded before.
    ///
    /// Bumps the generation (invalidating in-flight results for the previous
    /// source), drops any focused/trim state, and regenerates auto-clips using
    /// the source's remembered segment length. A source that yields no clips
    /// (zero or unknown duration) reports `Empty` with a notice rather than
    /// erroring.
    pub fn load_media(&mut self, source: MediaSource) -> LoadOutcome {
        self.generation += 1;

        let segment_length = self.prefs.segment_length(&source.id);
        let clips = generate_clips(
            source.duration,
            segment_length,
            &source.language,
            Some(&source.id),
        );

        tracing::debug!(
            source = %source.id,
            clips = clips.len(),
            segment_length,
            "loaded media source"
        );

        if clips.is_empty() {
            let notice = format!(
                "Could not segment \"{}\": media has no usable duration",
                source.display_name
            );
            self.media = Some(ActiveMedia {
                source,
                clips,
                view: ClipView::Empty,
            });
            return LoadOutcome::Empty { notice };
        }

        let clip_count = clips.len();
        self.media = Some(ActiveMedia {
            source,
            clips,
            view: ClipView::Auto { active: 0 },
        });
        LoadOutcome::Loaded { clip_count }
    }

    /// The loaded media source, if any
    pub fn source(&self) -> Option<&MediaSource> {
        self.media.as_ref().map(|m| &m.source)
    }

    /// Auto-generated clips for the loaded source (empty when nothing loaded)
    pub fn clips(&self) -> &[Clip] {
        self.media.as_ref().map(|m| m.clips.as_slice()).unwrap_or(&[])
    }

    pub fn view(&self) -> Option<&ClipView> {
        self.media.as_ref().map(|m| &m.view)
    }

    /// The clip the user is working on: the focused clip when in focused mode,
    /// otherwise the active auto clip
    pub fn active_clip(&self) -> Option<&Clip> {
        let media = self.media.as_ref()?;
        match &media.view {
            ClipView::Empty => None,
            ClipView::Auto { active } => media.clips.get(*active),
            ClipView::Focused { clip, .. } => Some(clip),
        }
    }

    /// Select a clip by index. Only valid while showing auto clips.
    pub fn select_clip(&mut self, index: usize) -> Result<(), ReelFluentError> {
        let media = self.media.as_mut().ok_or(ReelFluentError::NoMediaLoaded)?;
        match &mut media.view {
            ClipView::Auto { active } => {
                if index >= media.clips.len() {
                    return Err(ReelFluentError::InvalidSelection(format!(
                        "clip {} of {}",
                        index + 1,
                        media.clips.len()
                    )));
                }
                *active = index;
                Ok(())
            }
            ClipView::Empty => Err(ReelFluentError::InvalidSelection(
                "no clips available".to_string(),
            )),
            ClipView::Focused { .. } => Err(ReelFluentError::InvalidSelection(
                "a focused clip is active; return to auto clips first".to_string(),
            )),
        }
    }

    /// Enter focused mode with a user-trimmed range.
    ///
    /// The range is validated (1-300 s, inside the media) and the previously
    /// active auto index is remembered for `back_to_auto_clips`.
    pub fn focus_clip(&mut self, start_time: f64, end_time: f64) -> Result<&Clip, ReelFluentError> {
        let media = self.media.as_mut().ok_or(ReelFluentError::NoMediaLoaded)?;
        if end_time > media.source.duration {
            return Err(ReelFluentError::InvalidClipRange(format!(
                "end time {:.1}s is past the media duration {:.1}s",
                end_time, media.source.duration
            )));
        }

        let clip = create_focused_clip(
            start_time,
            end_time,
            &media.source.language,
            Some(&media.source.id),
        )?;

        let previous = match &media.view {
            ClipView::Auto { active } => *active,
            ClipView::Focused { previous, .. } => *previous,
            ClipView::Empty => 0,
        };
        media.view = ClipView::Focused { clip, previous };

        match &media.view {
            ClipView::Focused { clip, .. } => Ok(clip),
            _ => unreachable!(),
        }
    }

    /// Leave focused mode, restoring the previously active auto clip index
    pub fn back_to_auto_clips(&mut self) -> Result<usize, ReelFluentError> {
        let media = self.media.as_mut().ok_or(ReelFluentError::NoMediaLoaded)?;
        match &media.view {
            ClipView::Focused { previous, .. } => {
                let active = (*previous).min(media.clips.len().saturating_sub(1));
                media.view = ClipView::Auto { active };
                Ok(active)
            }
            _ => Err(ReelFluentError::InvalidSelection(
                "not in focused-clip mode".to_string(),
            )),
        }
    }

    /// Remove a clip from the auto list.
    ///
    /// Removing the last remaining clip of an uploaded (non-URL) source resets
    /// the whole source; the caller is expected to cascade teardown. Otherwise
    /// the active index clamps into the shrunk list, preferring the successor
    /// of the removed clip.
    pub fn remove_clip(&mut self, index: usize) -> Result<RemoveOutcome, ReelFluentError> {
        let media = self.media.as_mut().ok_or(ReelFluentError::NoMediaLoaded)?;
        if index >= media.clips.len() {
            return Err(ReelFluentError::InvalidSelection(format!(
                "clip {} of {}",
                index + 1,
                media.clips.len()
            )));
        }

        if media.clips.len() == 1 && media.source.kind.is_uploaded() {
            tracing::info!(source = %media.source.id, "last clip removed, resetting source");
            self.media = None;
            self.generation += 1;
            return Ok(RemoveOutcome::SourceReset);
        }

        media.clips.remove(index);
        let active = match &mut media.view {
            ClipView::Auto { active } => {
                if index < *active {
                    *active -= 1;
                }
                // Removing the active clip leaves the index pointing at the
                // successor; clamp for a removal at the tail.
                *active = (*active).min(media.clips.len().saturating_sub(1));
                *active
            }
            _ => 0,
        };
        if media.clips.is_empty() {
            media.view = ClipView::Empty;
        }

        Ok(RemoveOutcome::Removed { active })
    }

    /// Change the segmentation length for the loaded source.
    ///
    /// Persists the preference for the source and regenerates the auto clips,
    /// dropping focused state and invalidating in-flight results.
    pub fn set_segment_length(&mut self, seconds: f64) -> Result<LoadOutcome, ReelFluentError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(ReelFluentError::InvalidClipRange(format!(
                "segment length must be positive, got {}",
                seconds
            )));
        }
        let media = self.media.as_ref().ok_or(ReelFluentError::NoMediaLoaded)?;
        let source = media.source.clone();

        if let Err(error) = self.prefs.set_segment_length(&source.id, seconds) {
            // Preference persistence is best-effort; segmentation still applies.
            tracing::warn!(source = %source.id, %error, "failed to persist segment length");
        }
        Ok(self.load_media(source))
    }

    fn find_clip_mut(&mut self, clip_id: &str) -> Option<&mut Clip> {
        let media = self.media.as_mut()?;
        if let ClipView::Focused { clip, .. } = &mut media.view {
            if clip.id == clip_id {
                return Some(clip);
            }
        }
        media.clips.iter_mut().find(|c| c.id == clip_id)
    }

    /// Record the user's own transcription attempt for a clip
    pub fn set_user_transcription(
        &mut self,
        clip_id: &str,
        text: String,
    ) -> Result<(), ReelFluentError> {
        let clip = self
            .find_clip_mut(clip_id)
            .ok_or_else(|| ReelFluentError::InvalidSelection(format!("unknown clip {}", clip_id)))?;
        clip.user_transcription = Some(text);
        Ok(())
    }

    /// Mark a clip's automated transcription as in flight.
    ///
    /// Returns the generation token to pass to `commit_transcription`. A clip
    /// already pending rejects the duplicate submission.
    pub fn begin_transcription(&mut self, clip_id: &str) -> Result<Generation, ReelFluentError> {
        let generation = self.generation;
        let clip = self
            .find_clip_mut(clip_id)
            .ok_or_else(|| ReelFluentError::InvalidSelection(format!("unknown clip {}", clip_id)))?;
        if matches!(clip.automated_transcription, Some(FlowOutcome::Pending)) {
            return Err(ReelFluentError::AlreadyPending);
        }
        clip.automated_transcription = Some(FlowOutcome::Pending);
        Ok(Generation(generation))
    }

    /// Apply a finished transcription, unless the result went stale
    pub fn commit_transcription(
        &mut self,
        generation: Generation,
        clip_id: &str,
        outcome: FlowOutcome,
    ) -> CommitStatus {
        if generation.0 != self.generation {
            tracing::debug!(clip = clip_id, "discarding stale transcription result");
            return CommitStatus::Stale;
        }
        match self.find_clip_mut(clip_id) {
            Some(clip) => {
                clip.automated_transcription = Some(outcome);
                CommitStatus::Committed
            }
            None => CommitStatus::Stale,
        }
    }

    /// Mark a clip's translation as in flight
    pub fn begin_translation(
        &mut self,
        clip_id: &str,
        target_language: &str,
    ) -> Result<Generation, ReelFluentError> {
        let generation = self.generation;
        let clip = self
            .find_clip_mut(clip_id)
            .ok_or_else(|| ReelFluentError::InvalidSelection(format!("unknown clip {}", clip_id)))?;
        if matches!(clip.translation, Some(FlowOutcome::Pending)) {
            return Err(ReelFluentError::AlreadyPending);
        }
        clip.translation = Some(FlowOutcome::Pending);
        clip.translation_target_language = Some(target_language.to_string());
        Ok(Generation(generation))
    }

    /// Apply a finished translation, unless the result went stale
    pub fn commit_translation(
        &mut self,
        generation: Generation,
        clip_id: &str,
        outcome: FlowOutcome,
    ) -> CommitStatus {
        if generation.0 != self.generation {
            tracing::debug!(clip = clip_id, "discarding stale translation result");
            return CommitStatus::Stale;
        }
        match self.find_clip_mut(clip_id) {
            Some(clip) => {
                clip.translation = Some(outcome);
                CommitStatus::Committed
            }
            None => CommitStatus::Stale,
        }
    }

    /// Store a comparison result on a clip (computed synchronously)
    pub fn set_comparison(
        &mut self,
        clip_id: &str,
        result: ComparisonResult,
    ) -> Result<(), ReelFluentError> {
        let clip = self
            .find_clip_mut(clip_id)
            .ok_or_else(|| ReelFluentError::InvalidSelection(format!("unknown clip {}", clip_id)))?;
        clip.comparison_result = Some(result);
        Ok(())
    }
}
