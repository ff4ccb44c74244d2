use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

use super::{AudioFormat, MediaProbe, MediaExtractor};
use crate::session::MediaSourceKind;
use crate::ReelFluentError;
use crate::Result;

/// Hard cap on downloadable video length, checked before any download starts
pub const MAX_DOWNLOAD_SECONDS: u32 = 1800;

/// Public Piped API mirror used when yt-dlp is blocked
const PIPED_API: &str = "https://pipedapi.kavin.rocks";

/// Public Invidious API mirror used when yt-dlp and Piped both fail
const INVIDIOUS_API: &str = "https://inv.nadeko.net";

/// Metadata carried alongside a completed download
#[derive(Debug, Clone)]
pub struct DownloadedAudio {
    pub format: AudioFormat,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration_seconds: Option<f64>,
}

/// YouTube audio extractor.
///
/// Tries a chain of independent providers in order: yt-dlp, a Piped API
/// mirror, an Invidious API mirror, and finally legacy youtube-dl. Each
/// failure is classified against known blocking signatures (bot checks,
/// region locks, age gates) to produce a readable message. The classification
/// is a best-effort substring heuristic over tool stderr, not a contract.
pub struct YoutubeExtractor {
    yt_dlp_path: String,
    youtube_dl_path: String,
    client: reqwest::Client,
}

impl YoutubeExtractor {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            youtube_dl_path: "youtube-dl".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> Result<bool> {
        let output = Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        Ok(matches!(output, Ok(out) if out.status.success()))
    }

    /// Extract the video id from any of the usual YouTube URL shapes
    pub fn video_id(url: &str) -> Result<String> {
        let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;
        let host = parsed.host_str().unwrap_or_default();

        if host.ends_with("youtu.be") {
            if let Some(mut segments) = parsed.path_segments() {
                if let Some(id) = segments.next() {
                    if !id.is_empty() {
                        return Ok(id.to_string());
                    }
                }
            }
        }

        if host.ends_with("youtube.com") {
            if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                return Ok(id.into_owned());
            }
            // /embed/<id>, /v/<id>, /shorts/<id>
            let segments: Vec<&str> = parsed
                .path_segments()
                .map(|s| s.collect())
                .unwrap_or_default();
            if segments.len() >= 2 && matches!(segments[0], "embed" | "v" | "shorts") {
                return Ok(segments[1].to_string());
            }
        }

        anyhow::bail!("Could not find a video id in URL: {}", url)
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, url: &str) -> Result<serde_json::Value> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", describe_tool_failure(&error));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let info: serde_json::Value = serde_json::from_str(&json_str)?;

        Ok(info)
    }

    /// Enforce the length cap before any bytes are fetched
    fn check_duration(duration_seconds: Option<f64>) -> Result<()> {
        if let Some(duration) = duration_seconds {
            if duration > MAX_DOWNLOAD_SECONDS as f64 {
                return Err(ReelFluentError::MediaTooLong {
                    actual_seconds: duration,
                    limit_seconds: MAX_DOWNLOAD_SECONDS,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Download the audio track, walking the provider fallback chain.
    ///
    /// Videos longer than [`MAX_DOWNLOAD_SECONDS`] are rejected up front.
    pub async fn download_audio(
        &self,
        url: &str,
        output_path: &Path,
    ) -> Result<DownloadedAudio> {
        let probe = match self.probe(url).await {
            Ok(probe) => probe,
            Err(error) => {
                tracing::warn!(%error, "yt-dlp probe failed, probing via Piped mirror");
                self.probe_with_piped(url).await?
            }
        };
        Self::check_duration(probe.duration_seconds)?;

        let mut failures: Vec<String> = Vec::new();

        match self.download_with_yt_dlp(url, output_path).await {
            Ok(format) => {
                return Ok(DownloadedAudio {
                    format,
                    title: probe.title,
                    uploader: probe.uploader,
                    duration_seconds: probe.duration_seconds,
                })
            }
            Err(error) => {
                tracing::warn!(%error, "yt-dlp download failed, trying Piped mirror");
                failures.push(format!("yt-dlp: {}", error));
            }
        }

        let video_id = Self::video_id(url)?;

        match self.download_with_piped(&video_id, output_path).await {
            Ok(format) => {
                return Ok(DownloadedAudio {
                    format,
                    title: probe.title,
                    uploader: probe.uploader,
                    duration_seconds: probe.duration_seconds,
                })
            }
            Err(error) => {
                tracing::warn!(%error, "Piped download failed, trying Invidious mirror");
                failures.push(format!("Piped: {}", error));
            }
        }

        match self.download_with_invidious(&video_id, output_path).await {
            Ok(format) => {
                return Ok(DownloadedAudio {
                    format,
                    title: probe.title,
                    uploader: probe.uploader,
                    duration_seconds: probe.duration_seconds,
                })
            }
            Err(error) => {
                tracing::warn!(%error, "Invidious download failed, trying youtube-dl");
                failures.push(format!("Invidious: {}", error));
            }
        }

        match self.download_with_youtube_dl(url, output_path).await {
            Ok(format) => {
                return Ok(DownloadedAudio {
                    format,
                    title: probe.title,
                    uploader: probe.uploader,
                    duration_seconds: probe.duration_seconds,
                })
            }
            Err(error) => {
                failures.push(format!("youtube-dl: {}", error));
            }
        }

        Err(ReelFluentError::AudioExtractionFailed(format!(
            "every provider failed for {}: {}",
            url,
            failures.join("; ")
        ))
        .into())
    }

    /// Primary path: yt-dlp extracting audio directly to the target file
    async fn download_with_yt_dlp(&self, url: &str, output_path: &Path) -> Result<AudioFormat> {
        tracing::debug!("Downloading audio with yt-dlp: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--output",
                &output_path.to_string_lossy(),
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "9",
                "--format",
                "worstaudio[acodec^=mp4a]/worstaudio[ext=m4a]/worstaudio[ext=mp3]/worstaudio",
                "--no-playlist",
                "--concurrent-fragments",
                "4",
                "--newline",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{}", describe_tool_failure(&error));
        }

        Ok(AudioFormat::Mp3)
    }

    /// Metadata probe via the Piped mirror, used when yt-dlp cannot run
    async fn probe_with_piped(&self, url: &str) -> Result<MediaProbe> {
        #[derive(Deserialize)]
        struct PipedMeta {
            #[serde(default)]
            title: Option<String>,
            #[serde(default)]
            uploader: Option<String>,
            #[serde(default)]
            duration: Option<f64>,
        }

        let video_id = Self::video_id(url)?;
        let api_url = format!("{}/streams/{}", PIPED_API, video_id);
        let response = self.client.get(&api_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Piped API returned HTTP {}", response.status());
        }
        let meta: PipedMeta = response.json().await?;

        Ok(MediaProbe {
            source: url.to_string(),
            title: meta.title,
            uploader: meta.uploader,
            duration_seconds: meta.duration,
            format: AudioFormat::Mp3,
            file_size: None,
            kind: MediaSourceKind::Url,
        })
    }

    /// Piped mirror: resolve a proxied audio stream URL and fetch it
    async fn download_with_piped(&self, video_id: &str, output_path: &Path) -> Result<AudioFormat> {
        #[derive(Deserialize)]
        struct PipedStreams {
            #[serde(rename = "audioStreams", default)]
            audio_streams: Vec<PipedStream>,
        }
        #[derive(Deserialize)]
        struct PipedStream {
            url: String,
            #[serde(rename = "mimeType", default)]
            mime_type: String,
        }

        let api_url = format!("{}/streams/{}", PIPED_API, video_id);
        let response = self.client.get(&api_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Piped API returned HTTP {}", response.status());
        }

        let streams: PipedStreams = response.json().await?;
        let stream = streams
            .audio_streams
            .first()
            .ok_or_else(|| anyhow::anyhow!("Piped returned no audio streams"))?;

        let format = if stream.mime_type.contains("webm") {
            AudioFormat::Webm
        } else {
            AudioFormat::M4a
        };
        self.fetch_stream(&stream.url, output_path).await?;
        Ok(format)
    }

    /// Invidious mirror: pick an audio-only adaptive format and fetch it
    async fn download_with_invidious(
        &self,
        video_id: &str,
        output_path: &Path,
    ) -> Result<AudioFormat> {
        #[derive(Deserialize)]
        struct InvidiousVideo {
            #[serde(rename = "adaptiveFormats", default)]
            adaptive_formats: Vec<InvidiousFormat>,
        }
        #[derive(Deserialize)]
        struct InvidiousFormat {
            url: String,
            #[serde(rename = "type", default)]
            format_type: String,
        }

        let api_url = format!(
            "{}/api/v1/videos/{}?fields=adaptiveFormats",
            INVIDIOUS_API, video_id
        );
        let response = self.client.get(&api_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Invidious API returned HTTP {}", response.status());
        }

        let video: InvidiousVideo = response.json().await?;
        let format = video
            .adaptive_formats
            .iter()
            .find(|f| f.format_type.starts_with("audio/"))
            .ok_or_else(|| anyhow::anyhow!("Invidious returned no audio formats"))?;

        let audio_format = if format.format_type.contains("webm") {
            AudioFormat::Webm
        } else {
            AudioFormat::M4a
        };
        self.fetch_stream(&format.url, output_path).await?;
        Ok(audio_format)
    }

    /// Last resort: legacy youtube-dl with the same audio-extraction flags
    async fn download_with_youtube_dl(&self, url: &str, output_path: &Path) -> Result<AudioFormat> {
        tracing::debug!("Downloading audio with youtube-dl: {}", url);

        let output = Command::new(&self.youtube_dl_path)
            .args([
                "--output",
                &output_path.to_string_lossy(),
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--no-playlist",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{}", describe_tool_failure(&error));
        }

        Ok(AudioFormat::Mp3)
    }

    /// Stream an HTTP response body to disk
    async fn fetch_stream(&self, url: &str, output_path: &Path) -> Result<()> {
        use futures_util::StreamExt;
        use std::io::Write;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to download audio: HTTP {}", response.status());
        }

        let mut file = fs_err::File::create(output_path)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
        }
        Ok(())
    }
}

/// Map known failure signatures in tool stderr to readable messages.
///
/// Substring matching against an adversarial third party is inherently
/// brittle; unmatched text passes through untouched.
fn describe_tool_failure(stderr: &str) -> String {
    let lower = stderr.to_lowercase();
    if lower.contains("sign in to confirm") || lower.contains("not a bot") {
        return "YouTube blocking detected (bot check); trying another provider may help".to_string();
    }
    if lower.contains("not available in your country") || lower.contains("geo restricted") {
        return "Video is region-locked".to_string();
    }
    if lower.contains("age") && lower.contains("confirm") {
        return "Video is age-gated and cannot be fetched anonymously".to_string();
    }
    if lower.contains("video unavailable") {
        return "Video is unavailable (removed or private)".to_string();
    }
    stderr.trim().lines().last().unwrap_or("unknown error").to_string()
}

#[async_trait]
impl MediaExtractor for YoutubeExtractor {
    async fn probe(&self, url: &str) -> Result<MediaProbe> {
        if !self.check_availability().await? {
            anyhow::bail!(
                "yt-dlp is not available. Please install it: https://github.com/yt-dlp/yt-dlp"
            );
        }

        let info = self.get_video_info(url).await?;

        let title = info["title"].as_str().map(|s| s.to_string());
        let uploader = info["uploader"].as_str().map(|s| s.to_string());
        let duration_seconds = info["duration"].as_f64();

        Ok(MediaProbe {
            source: url.to_string(),
            title,
            uploader,
            duration_seconds,
            format: AudioFormat::Mp3,
            file_size: None,
            kind: MediaSourceKind::Url,
        })
    }

    async fn fetch_audio(&self, url: &str, output_path: &Path) -> Result<AudioFormat> {
        Ok(self.download_audio(url, output_path).await?.format)
    }

    fn supports_url(&self, url: &str) -> bool {
        let url_lower = url.to_lowercase();
        url_lower.contains("youtube.com/watch")
            || url_lower.contains("youtu.be/")
            || url_lower.contains("youtube.com/embed/")
            || url_lower.contains("youtube.com/v/")
            || url_lower.contains("youtube.com/shorts/")
            || url_lower.contains("m.youtube.com/")
    }

    fn platform_name(&self) -> &'static str {
        "YouTube"
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_variants() {
        assert_eq!(
            YoutubeExtractor::video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            YoutubeExtractor::video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            YoutubeExtractor::video_id("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            YoutubeExtractor::video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert!(YoutubeExtractor::video_id("https://example.com/watch?v=x").is_err());
    }

    #[test]
    fn test_supports_url() {
        let extractor = YoutubeExtractor::new();
        assert!(extractor.supports_url("https://www.youtube.com/watch?v=abc"));
        assert!(extractor.supports_url("https://youtu.be/abc"));
        assert!(extractor.supports_url("https://m.youtube.com/watch?v=abc"));
        assert!(!extractor.supports_url("https://vimeo.com/12345"));
    }

    #[test]
    fn test_duration_cap() {
        assert!(YoutubeExtractor::check_duration(Some(1800.0)).is_ok());
        assert!(YoutubeExtractor::check_duration(None).is_ok());

        let error = YoutubeExtractor::check_duration(Some(1801.0)).unwrap_err();
        assert!(error.to_string().contains("1800"));
    }

    #[test]
    fn test_describe_tool_failure_signatures() {
        assert!(describe_tool_failure("ERROR: Sign in to confirm you're not a bot")
            .contains("bot check"));
        assert!(describe_tool_failure("ERROR: The uploader has not made this video available in your country")
            .contains("region-locked"));
        assert!(describe_tool_failure("ERROR: Video unavailable").contains("unavailable"));
        // Unrecognized errors pass through
        assert_eq!(
            describe_tool_failure("some\nmultiline\nodd failure"),
            "odd failure"
        );
    }
}
