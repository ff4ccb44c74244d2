use anyhow::{Context, Result};
use aws_sdk_s3::Client as S3Client;
use aws_sdk_transcribe::Client as TranscribeClient;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::Config;
use crate::extractors::{audio, AudioFormat, ExtractorRegistry};
use crate::utils::normalize_language_code;

pub mod processor;

/// Transcription result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// The transcribed text
    pub transcript: String,

    /// Segments with timestamps (if available)
    pub segments: Vec<TranscriptSegment>,

    /// Path to the extracted audio file (if preserved)
    pub audio_path: Option<PathBuf>,

    /// Transcription metadata
    pub metadata: TranscriptionMetadata,
}

/// Individual transcript segment with timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds
    pub end_time: f64,

    /// Segment text
    pub text: String,

    /// Confidence score (0.0 to 1.0)
    pub confidence: Option<f64>,
}

/// Metadata about the transcription process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionMetadata {
    /// AWS Transcribe job ID
    pub job_id: String,

    /// Language detected/used
    pub language: String,

    /// Processing time in seconds
    pub processing_duration: Option<f64>,

    /// Audio duration in seconds
    pub audio_duration: Option<f64>,

    /// Overall confidence score
    pub confidence: Option<f64>,

    /// Timestamp when transcription completed
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Main transcription pipeline: acquire audio, trim to the clip range,
/// run an AWS Transcribe job, and collect the parsed result.
pub struct TranscriptionPipeline {
    config: Config,
    extractor_registry: ExtractorRegistry,
    s3_client: S3Client,
    transcribe_client: TranscribeClient,
    temp_dir: TempDir,
}

impl TranscriptionPipeline {
    /// Create a new transcription pipeline
    pub async fn new(config: Config) -> Result<Self> {
        config.require_bucket()?;

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(config.aws_region())
            .load()
            .await;

        let s3_client = S3Client::new(&aws_config);
        let transcribe_client = TranscribeClient::new(&aws_config);

        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;

        Ok(Self {
            config,
            extractor_registry: ExtractorRegistry::new(),
            s3_client,
            transcribe_client,
            temp_dir,
        })
    }

    /// Transcribe a clip of a media input.
    ///
    /// `clip_range` trims the fetched audio to `[start, end)` seconds before
    /// upload; `None` transcribes the whole input.
    pub async fn transcribe_clip(
        &self,
        input: &str,
        clip_range: Option<(f64, f64)>,
        language: Option<&str>,
        save_audio: bool,
    ) -> Result<TranscriptionResult> {
        tracing::info!("Fetching audio for: {}", input);

        let fetched_name = format!("audio_{}.mp3", &Uuid::new_v4().to_string()[..8]);
        let fetched_path = self.temp_dir.path().join(fetched_name);
        let format = self
            .extractor_registry
            .fetch_audio(input, &fetched_path)
            .await?;

        let (upload_path, format) = match clip_range {
            Some((start, end)) => {
                let clip_name = format!("clip_{}.mp3", &Uuid::new_v4().to_string()[..8]);
                let clip_path = self.temp_dir.path().join(clip_name);
                audio::extract_clip_audio(&fetched_path, start, end, &clip_path).await?;
                (clip_path, AudioFormat::Mp3)
            }
            None => (fetched_path.clone(), format),
        };

        let s3_key = self.upload_to_s3(&upload_path, format).await?;

        let job_id = self.start_transcription_job(&s3_key, format, language).await?;

        let result = self.wait_for_transcription(&job_id).await;

        // Clean up regardless of job outcome
        if let Err(error) = self.cleanup_s3(&s3_key).await {
            tracing::warn!(%error, "failed to clean up S3 object");
        }
        let result = result?;

        let preserved_audio_path = if save_audio || self.config.app.keep_audio {
            Some(self.preserve_audio_file(&upload_path, format).await?)
        } else {
            None
        };

        Ok(TranscriptionResult {
            transcript: result.transcript,
            segments: result.segments,
            audio_path: preserved_audio_path,
            metadata: result.metadata,
        })
    }

    /// Upload audio file to S3
    async fn upload_to_s3(&self, audio_path: &PathBuf, format: AudioFormat) -> Result<String> {
        let key = format!(
            "{}audio_{}_{}.{}",
            self.config.aws.s3_key_prefix.as_deref().unwrap_or(""),
            Uuid::new_v4(),
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            format.as_str()
        );

        tracing::info!(
            "Uploading audio to S3: s3://{}/{}",
            self.config.aws.s3_bucket,
            key
        );

        let content = fs_err::read(audio_path)?;

        self.s3_client
            .put_object()
            .bucket(&self.config.aws.s3_bucket)
            .key(&key)
            .body(content.into())
            .content_type(format.mime_type())
            .send()
            .await
            .context("Failed to upload audio to S3")?;

        Ok(key)
    }

    /// Start AWS Transcribe job with auto language detection fallback
    async fn start_transcription_job(
        &self,
        s3_key: &str,
        format: AudioFormat,
        language: Option<&str>,
    ) -> Result<String> {
        let job_name = format!("reelfluent_{}", Uuid::new_v4());
        let media_uri = format!("s3://{}/{}", self.config.aws.s3_bucket, s3_key);

        tracing::info!("Starting transcription job: {}", job_name);

        use aws_sdk_transcribe::types::{Media, MediaFormat};

        let media_format = match format {
            AudioFormat::Mp3 => MediaFormat::Mp3,
            AudioFormat::M4a => MediaFormat::Mp4,
            AudioFormat::Wav => MediaFormat::Wav,
            AudioFormat::Flac => MediaFormat::Flac,
            AudioFormat::Ogg => MediaFormat::Ogg,
            AudioFormat::Webm => MediaFormat::Webm,
        };

        let media = Media::builder().media_file_uri(media_uri).build();

        let mut job_builder = self
            .transcribe_client
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .media_format(media_format)
            .media(media);

        if let Some(lang) = language.or(self
            .config
            .aws
            .transcription
            .default_language
            .as_deref())
        {
            let code = normalize_language_code(lang);
            tracing::info!("Using specified language: {}", code);
            job_builder = job_builder.language_code(code.parse()?);
        } else {
            tracing::info!("Using automatic language detection");
            job_builder = job_builder.identify_language(true);
        }

        if let Some(sample_rate) = self.config.aws.transcription.sample_rate {
            job_builder = job_builder.media_sample_rate_hertz(sample_rate as i32);
        }

        job_builder
            .send()
            .await
            .context("Failed to start transcription job")?;

        Ok(job_name)
    }

    /// Wait for transcription job completion
    async fn wait_for_transcription(&self, job_id: &str) -> Result<processor::ProcessedTranscription> {
        processor::TranscriptionProcessor::new(self.transcribe_client.clone(), job_id.to_string())
            .wait_for_completion()
            .await
    }

    /// Clean up S3 object
    async fn cleanup_s3(&self, s3_key: &str) -> Result<()> {
        tracing::debug!("Cleaning up S3 object: {}", s3_key);

        self.s3_client
            .delete_object()
            .bucket(&self.config.aws.s3_bucket)
            .key(s3_key)
            .send()
            .await
            .context("Failed to clean up S3 object")?;

        Ok(())
    }

    /// Preserve the audio file in the current directory
    async fn preserve_audio_file(
        &self,
        temp_path: &PathBuf,
        format: AudioFormat,
    ) -> Result<PathBuf> {
        let filename = format!(
            "clip_{}.{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            format.as_str()
        );

        let output_path = std::env::current_dir()?.join(filename);
        fs_err::copy(temp_path, &output_path)?;

        Ok(output_path)
    }
}
