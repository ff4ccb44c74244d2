use anyhow::{Context, Result};
use aws_sdk_transcribe::types::{TranscriptionJob, TranscriptionJobStatus};
use aws_sdk_transcribe::Client as TranscribeClient;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

use super::{TranscriptSegment, TranscriptionMetadata};

/// Segments are split at sentence ends or once they exceed this many seconds
const MAX_SEGMENT_SECONDS: f64 = 10.0;

/// Processed transcription result from AWS
#[derive(Debug, Clone)]
pub struct ProcessedTranscription {
    pub transcript: String,
    pub segments: Vec<TranscriptSegment>,
    pub metadata: TranscriptionMetadata,
}

/// AWS Transcribe transcript format
#[derive(Debug, Deserialize)]
struct AwsTranscript {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptText>,
    items: Vec<TranscriptItem>,
}

#[derive(Debug, Deserialize)]
struct TranscriptText {
    transcript: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptItem {
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(rename = "type")]
    item_type: String,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    confidence: Option<String>,
    content: String,
}

/// Transcription job processor
pub struct TranscriptionProcessor {
    client: TranscribeClient,
    job_id: String,
}

impl TranscriptionProcessor {
    pub fn new(client: TranscribeClient, job_id: String) -> Self {
        Self { client, job_id }
    }

    /// Wait for transcription job completion with progress tracking
    pub async fn wait_for_completion(&self) -> Result<ProcessedTranscription> {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        progress.set_message("Starting transcription job...");

        let start_time = std::time::Instant::now();
        let mut check_count = 0;

        loop {
            check_count += 1;

            let job = self.get_transcription_job().await?;

            match job.transcription_job_status() {
                Some(TranscriptionJobStatus::InProgress) => {
                    progress.set_message(format!(
                        "Transcribing... ({}s elapsed, check #{})",
                        start_time.elapsed().as_secs(),
                        check_count
                    ));

                    // Exponential backoff up to 30 seconds
                    let wait_time = std::cmp::min(5 + (check_count - 1) * 2, 30);
                    sleep(Duration::from_secs(wait_time)).await;
                }
                Some(TranscriptionJobStatus::Completed) => {
                    progress.finish_with_message("Transcription completed!");
                    break;
                }
                Some(TranscriptionJobStatus::Failed) => {
                    progress.finish_with_message("Transcription failed");

                    let failure_reason = job.failure_reason().unwrap_or("Unknown error");
                    anyhow::bail!("Transcription job failed: {}", failure_reason);
                }
                _ => {
                    progress.finish_with_message("Transcription status unknown");
                    anyhow::bail!("Unexpected transcription job status");
                }
            }
        }

        let job = self.get_transcription_job().await?;
        self.process_transcription_result(job, start_time.elapsed())
            .await
    }

    /// Get transcription job details
    async fn get_transcription_job(&self) -> Result<TranscriptionJob> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(&self.job_id)
            .send()
            .await
            .context("Failed to get transcription job status")?;

        response
            .transcription_job()
            .ok_or_else(|| anyhow::anyhow!("Transcription job not found"))
            .map(|job| job.clone())
    }

    /// Process completed transcription result
    async fn process_transcription_result(
        &self,
        job: TranscriptionJob,
        processing_duration: std::time::Duration,
    ) -> Result<ProcessedTranscription> {
        let transcript_uri = job
            .transcript()
            .and_then(|t| t.transcript_file_uri())
            .ok_or_else(|| anyhow::anyhow!("No transcript URI found"))?;

        let transcript_json = self.download_transcript(transcript_uri).await?;

        let aws_transcript: AwsTranscript =
            serde_json::from_str(&transcript_json).context("Failed to parse transcript JSON")?;

        let transcript = aws_transcript
            .results
            .transcripts
            .first()
            .map(|t| t.transcript.clone())
            .unwrap_or_default();

        let segments = build_segments(&aws_transcript.results);

        let metadata = TranscriptionMetadata {
            job_id: self.job_id.clone(),
            language: job
                .language_code()
                .map(|lc| lc.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            processing_duration: Some(processing_duration.as_secs_f64()),
            audio_duration: segments.last().map(|s| s.end_time),
            confidence: average_confidence(&segments.iter().filter_map(|s| s.confidence).collect::<Vec<_>>()),
            completed_at: chrono::Utc::now(),
        };

        Ok(ProcessedTranscription {
            transcript,
            segments,
            metadata,
        })
    }

    /// Download transcript from S3
    async fn download_transcript(&self, uri: &str) -> Result<String> {
        let response = reqwest::get(uri).await.context("Failed to download transcript")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download transcript: HTTP {}", response.status());
        }

        let content = response
            .text()
            .await
            .context("Failed to read transcript content")?;

        Ok(content)
    }
}

/// Group pronounced words into timed segments, splitting on sentence-final
/// punctuation, silences over a second, or overly long segments
fn build_segments(results: &TranscriptResults) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();

    let mut text = String::new();
    let mut seg_start: Option<f64> = None;
    let mut seg_end: Option<f64> = None;
    let mut confidences: Vec<f64> = Vec::new();

    let mut flush =
        |text: &mut String, seg_start: &mut Option<f64>, seg_end: &mut Option<f64>, confidences: &mut Vec<f64>| {
            if !text.is_empty() {
                if let (Some(start), Some(end)) = (*seg_start, *seg_end) {
                    segments.push(TranscriptSegment {
                        start_time: start,
                        end_time: end,
                        text: text.trim().to_string(),
                        confidence: average_confidence(confidences),
                    });
                }
            }
            text.clear();
            *seg_start = None;
            *seg_end = None;
            confidences.clear();
        };

    for item in &results.items {
        match item.item_type.as_str() {
            "pronunciation" => {
                let start = item.start_time.as_ref().and_then(|s| s.parse::<f64>().ok());
                let end = item.end_time.as_ref().and_then(|s| s.parse::<f64>().ok());
                let content = item
                    .alternatives
                    .first()
                    .map(|alt| alt.content.clone())
                    .unwrap_or_default();
                let confidence = item
                    .alternatives
                    .first()
                    .and_then(|alt| alt.confidence.as_ref())
                    .and_then(|c| c.parse::<f64>().ok());

                let gap = start
                    .zip(seg_end)
                    .map(|(s, e)| s - e > 1.0)
                    .unwrap_or(false);
                let too_long = seg_start
                    .zip(start)
                    .map(|(s0, s)| s - s0 > MAX_SEGMENT_SECONDS)
                    .unwrap_or(false);
                if gap || too_long {
                    flush(&mut text, &mut seg_start, &mut seg_end, &mut confidences);
                }

                if text.is_empty() {
                    seg_start = start;
                } else {
                    text.push(' ');
                }
                text.push_str(&content);
                seg_end = end.or(seg_end);
                if let Some(conf) = confidence {
                    confidences.push(conf);
                }
            }
            "punctuation" => {
                if let Some(alt) = item.alternatives.first() {
                    text.push_str(&alt.content);
                    if matches!(alt.content.as_str(), "." | "!" | "?") {
                        flush(&mut text, &mut seg_start, &mut seg_end, &mut confidences);
                    }
                }
            }
            _ => {}
        }
    }
    flush(&mut text, &mut seg_start, &mut seg_end, &mut confidences);

    segments
}

fn average_confidence(confidences: &[f64]) -> Option<f64> {
    if confidences.is_empty() {
        None
    } else {
        Some(confidences.iter().sum::<f64>() / confidences.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(content: &str, start: f64, end: f64) -> TranscriptItem {
        TranscriptItem {
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            item_type: "pronunciation".to_string(),
            alternatives: vec![Alternative {
                confidence: Some("0.9".to_string()),
                content: content.to_string(),
            }],
        }
    }

    fn punct(content: &str) -> TranscriptItem {
        TranscriptItem {
            start_time: None,
            end_time: None,
            item_type: "punctuation".to_string(),
            alternatives: vec![Alternative {
                confidence: None,
                content: content.to_string(),
            }],
        }
    }

    #[test]
    fn test_segments_split_on_sentence_end() {
        let results = TranscriptResults {
            transcripts: vec![],
            items: vec![
                word("hello", 0.0, 0.4),
                word("there", 0.5, 0.9),
                punct("."),
                word("bye", 1.2, 1.5),
            ],
        };
        let segments = build_segments(&results);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello there.");
        assert_eq!(segments[0].start_time, 0.0);
        assert_eq!(segments[0].end_time, 0.9);
        assert_eq!(segments[1].text, "bye");
    }

    #[test]
    fn test_segments_split_on_silence() {
        let results = TranscriptResults {
            transcripts: vec![],
            items: vec![word("one", 0.0, 0.4), word("two", 2.0, 2.4)],
        };
        let segments = build_segments(&results);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_average_confidence() {
        assert_eq!(average_confidence(&[]), None);
        assert_eq!(average_confidence(&[0.8, 1.0]), Some(0.9));
    }
}
