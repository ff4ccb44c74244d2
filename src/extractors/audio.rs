//! Clip-range audio extraction.
//!
//! Given an already-fetched media file and a time range, produces a trimmed
//! audio file suitable for transcription. This is the server-side counterpart
//! of in-browser capture: everything goes through ffmpeg here.

use anyhow::Context;
use std::path::Path;
use tokio::process::Command;

use crate::ReelFluentError;
use crate::Result;

/// Cut `[start_time, end_time)` out of a media file into an mp3.
///
/// The input may be audio or video; the video track is dropped. Returns an
/// error wrapped as [`ReelFluentError::AudioExtractionFailed`] on any ffmpeg
/// failure so callers can stamp it onto the clip instead of propagating.
pub async fn extract_clip_audio(
    input: &Path,
    start_time: f64,
    end_time: f64,
    output_path: &Path,
) -> Result<()> {
    if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 || end_time <= start_time
    {
        return Err(ReelFluentError::InvalidClipRange(format!(
            "cannot extract audio for range {}..{}",
            start_time, end_time
        ))
        .into());
    }

    let duration = end_time - start_time;
    tracing::debug!(
        input = %input.display(),
        start_time,
        duration,
        "extracting clip audio"
    );

    // -ss before -i seeks on the demuxer, keeping extraction fast on long files
    let output = Command::new("ffmpeg")
        .args([
            "-y",
            "-ss",
            &format!("{:.3}", start_time),
            "-i",
            &input.to_string_lossy(),
            "-t",
            &format!("{:.3}", duration),
            "-vn",
            "-acodec",
            "libmp3lame",
            "-q:a",
            "7",
            &output_path.to_string_lossy(),
        ])
        .output()
        .await
        .context("Failed to spawn ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReelFluentError::AudioExtractionFailed(
            stderr.trim().lines().last().unwrap_or("ffmpeg failed").to_string(),
        )
        .into());
    }

    Ok(())
}
