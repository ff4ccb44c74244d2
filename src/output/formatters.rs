use anyhow::Result;
use console::style;

use crate::clips::{Clip, ComparisonResult, FlowOutcome, TokenVerdict};
use crate::session::SessionStore;
use crate::transcribe::TranscriptionResult;
use crate::utils::{extract_domain, format_duration, format_time_range};

/// Plain-text transcript, optionally with per-segment timestamps
pub fn format_as_text(result: &TranscriptionResult, include_timestamps: bool) -> String {
    if !include_timestamps || result.segments.is_empty() {
        return result.transcript.clone();
    }

    let mut out = String::new();
    for segment in &result.segments {
        out.push_str(&format!(
            "[{}] {}\n",
            format_time_range(segment.start_time, segment.end_time),
            segment.text
        ));
    }
    out
}

pub fn format_as_json(result: &TranscriptionResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn format_as_srt(result: &TranscriptionResult) -> String {
    let mut out = String::new();
    for (i, segment) in result.segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            srt_timestamp(segment.start_time),
            srt_timestamp(segment.end_time),
            segment.text
        ));
    }
    out
}

pub fn format_as_vtt(result: &TranscriptionResult) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in &result.segments {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            vtt_timestamp(segment.start_time),
            vtt_timestamp(segment.end_time),
            segment.text
        ));
    }
    out
}

pub fn format_as_csv(result: &TranscriptionResult) -> String {
    let mut out = String::from("start_time,end_time,confidence,text\n");
    for segment in &result.segments {
        let escaped = segment.text.replace('"', "\"\"");
        out.push_str(&format!(
            "{:.3},{:.3},{},\"{}\"\n",
            segment.start_time,
            segment.end_time,
            segment
                .confidence
                .map(|c| format!("{:.3}", c))
                .unwrap_or_default(),
            escaped
        ));
    }
    out
}

fn srt_timestamp(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        millis / 3_600_000,
        (millis % 3_600_000) / 60_000,
        (millis % 60_000) / 1000,
        millis % 1000
    )
}

fn vtt_timestamp(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        (millis % 3_600_000) / 60_000,
        (millis % 60_000) / 1000,
        millis % 1000
    )
}

fn outcome_summary(outcome: &Option<FlowOutcome>) -> String {
    match outcome {
        None => "-".to_string(),
        Some(FlowOutcome::Pending) => "pending".to_string(),
        Some(FlowOutcome::Done(text)) => text.clone(),
        Some(FlowOutcome::Failed(message)) => format!("Error: {}", message),
    }
}

/// One line per clip: number, time range, length, transcription status
pub fn format_clips_text(clips: &[Clip]) -> String {
    if clips.is_empty() {
        return "No clips.".to_string();
    }
    let mut out = String::new();
    for (i, clip) in clips.iter().enumerate() {
        let marker = if clip.is_focused { "*" } else { " " };
        out.push_str(&format!(
            "{}{:>3}  {}  ({})  {}\n",
            marker,
            i + 1,
            format_time_range(clip.start_time, clip.end_time),
            format_duration(clip.duration()),
            outcome_summary(&clip.automated_transcription)
        ));
    }
    out
}

pub fn format_clips_json(clips: &[Clip]) -> Result<String> {
    Ok(serde_json::to_string_pretty(clips)?)
}

/// Human-readable session listing: sources, then saved clips with usage
pub fn format_session_text(store: &SessionStore) -> String {
    let mut out = String::new();

    out.push_str("Media sources:\n");
    if store.media_sources().is_empty() {
        out.push_str("  (none)\n");
    }
    for source in store.media_sources() {
        let active = store
            .active_source()
            .map(|a| a.id == source.id)
            .unwrap_or(false);
        let origin = extract_domain(&source.src).unwrap_or_else(|| source.kind.as_str().to_string());
        out.push_str(&format!(
            "  {} {}  [{}]  {}  ({})\n",
            if active { "*" } else { " " },
            source.display_name,
            source.id,
            origin,
            format_duration(source.duration),
        ));
    }

    out.push_str("\nSaved clips:\n");
    if store.clips().is_empty() {
        out.push_str("  (none)\n");
    }
    for clip in store.clips() {
        out.push_str(&format!(
            "  {}  [{}]  {}  {}\n",
            clip.display_name,
            clip.id,
            format_time_range(clip.start_time, clip.end_time),
            outcome_summary(&clip.automated_transcription)
        ));
    }

    out.push_str(&format!(
        "\nSession usage: {} of {}\n",
        format_duration(store.total_saved_seconds()),
        format_duration(crate::session::MAX_SESSION_SECONDS)
    ));
    out
}

pub fn format_session_json(store: &SessionStore) -> Result<String> {
    Ok(serde_json::to_string_pretty(store.clips())?)
}

/// Color-coded comparison: green correct, yellow misspellings (with the
/// expected word), red missing, strikethrough-ish dim for extra words
pub fn format_comparison_text(result: &ComparisonResult) -> String {
    let mut words = Vec::new();
    for token in &result.tokens {
        let rendered = match token.verdict {
            TokenVerdict::Correct => style(token.word.clone()).green().to_string(),
            TokenVerdict::Misspelled => {
                let expected = token.expected.as_deref().unwrap_or("?");
                format!(
                    "{}{}",
                    style(token.word.clone()).yellow(),
                    style(format!("({})", expected)).dim()
                )
            }
            TokenVerdict::Missing => style(format!("[{}]", token.word)).red().to_string(),
            TokenVerdict::Extra => style(token.word.clone()).dim().strikethrough().to_string(),
        };
        words.push(rendered);
    }

    format!(
        "{}\n\nAccuracy: {:.0}%\n",
        words.join(" "),
        result.accuracy * 100.0
    )
}

pub fn format_comparison_json(result: &ComparisonResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::{TranscriptSegment, TranscriptionMetadata};

    fn sample_result() -> TranscriptionResult {
        TranscriptionResult {
            transcript: "hello there. bye".to_string(),
            segments: vec![
                TranscriptSegment {
                    start_time: 0.0,
                    end_time: 1.5,
                    text: "hello there.".to_string(),
                    confidence: Some(0.95),
                },
                TranscriptSegment {
                    start_time: 2.0,
                    end_time: 2.5,
                    text: "bye".to_string(),
                    confidence: None,
                },
            ],
            audio_path: None,
            metadata: TranscriptionMetadata {
                job_id: "job".to_string(),
                language: "en-US".to_string(),
                processing_duration: Some(3.0),
                audio_duration: Some(2.5),
                confidence: Some(0.95),
                completed_at: chrono::Utc::now(),
            },
        }
    }

    #[test]
    fn test_text_without_timestamps_is_plain_transcript() {
        let rendered = format_as_text(&sample_result(), false);
        assert_eq!(rendered, "hello there. bye");
    }

    #[test]
    fn test_text_with_timestamps() {
        let rendered = format_as_text(&sample_result(), true);
        assert!(rendered.contains("[0:00-0:02] hello there."));
    }

    #[test]
    fn test_srt_format() {
        let rendered = format_as_srt(&sample_result());
        assert!(rendered.starts_with("1\n00:00:00,000 --> 00:00:01,500\nhello there.\n"));
    }

    #[test]
    fn test_vtt_format() {
        let rendered = format_as_vtt(&sample_result());
        assert!(rendered.starts_with("WEBVTT\n\n"));
        assert!(rendered.contains("00:00:00.000 --> 00:00:01.500"));
    }

    #[test]
    fn test_csv_escapes_quotes() {
        let mut result = sample_result();
        result.segments[0].text = "she said \"hi\"".to_string();
        let rendered = format_as_csv(&result);
        assert!(rendered.contains("\"she said \"\"hi\"\"\""));
    }

    #[test]
    fn test_clips_text_marks_focused() {
        let clips = vec![
            crate::clips::generate_clips(60.0, 30.0, "english", None).remove(0),
            crate::clips::create_focused_clip(5.0, 20.0, "english", None).unwrap(),
        ];
        let rendered = format_clips_text(&clips);
        assert!(rendered.contains("  1  0:00-0:30"));
        assert!(rendered.contains("*  2  0:05-0:20"));
    }
}
