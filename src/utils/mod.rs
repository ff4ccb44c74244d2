use anyhow::Result;
use url::Url;

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format a clip time range like `0:30-1:05`
pub fn format_time_range(start_seconds: f64, end_seconds: f64) -> String {
    fn mmss(seconds: f64) -> String {
        let total = seconds.round() as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }
    format!("{}-{}", mmss(start_seconds), mmss(end_seconds))
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            match c {
                // Keep alphanumeric characters, spaces, hyphens, underscores, and dots
                c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
                _ => '_',
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse language code and return normalized version for AWS Transcribe
pub fn normalize_language_code(lang: &str) -> String {
    let normalized = match lang.to_lowercase().as_str() {
        "en" | "english" => "en-US",
        "es" | "spanish" => "es-ES",
        "fr" | "french" => "fr-FR",
        "de" | "german" => "de-DE",
        "it" | "italian" => "it-IT",
        "pt" | "portuguese" => "pt-BR",
        "ja" | "japanese" => "ja-JP",
        "ko" | "korean" => "ko-KR",
        "zh" | "chinese" => "zh-CN",
        "ar" | "arabic" => "ar-SA",
        "hi" | "hindi" => "hi-IN",
        "ru" | "russian" => "ru-RU",
        _ => lang, // Return as-is if no mapping found
    };

    normalized.to_string()
}

/// Short language code for AWS Translate; `auto` passes through for
/// source-language detection
pub fn translate_language_code(lang: &str) -> String {
    let code = match lang.to_lowercase().as_str() {
        "auto" => "auto",
        "en" | "english" => "en",
        "es" | "spanish" => "es",
        "fr" | "french" => "fr",
        "de" | "german" => "de",
        "it" | "italian" => "it",
        "pt" | "portuguese" => "pt",
        "ja" | "japanese" => "ja",
        "ko" | "korean" => "ko",
        "zh" | "chinese" => "zh",
        "ar" | "arabic" => "ar",
        "hi" | "hindi" => "hi",
        "ru" | "russian" => "ru",
        other => {
            // Tags like en-US reduce to their primary subtag
            return other.split('-').next().unwrap_or(other).to_string();
        }
    };
    code.to_string()
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|host| {
        if let Some(stripped) = host.strip_prefix("www.") {
            stripped.to_string()
        } else {
            host.to_string()
        }
    })
}

/// External tools the extractors rely on, with availability
pub async fn tool_availability() -> Vec<(&'static str, bool)> {
    let tools = ["yt-dlp", "youtube-dl", "ffmpeg", "ffprobe"];
    let mut availability = Vec::with_capacity(tools.len());
    for tool in tools {
        availability.push((tool, check_command_available(tool).await));
    }
    availability
}

/// Check if the current environment has required tools
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("yt-dlp").await {
        missing.push("yt-dlp - required for YouTube extraction".to_string());
    }

    if !check_command_available("ffmpeg").await {
        missing.push("ffmpeg - required for clip audio extraction".to_string());
    }

    if !check_command_available("ffprobe").await {
        missing.push("ffprobe - required for probing local files".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_format_time_range() {
        assert_eq!(format_time_range(0.0, 30.0), "0:00-0:30");
        assert_eq!(format_time_range(90.0, 95.0), "1:30-1:35");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Hello World!"), "Hello World_");
        assert_eq!(sanitize_filename("test/file?name"), "test_file_name");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
    }

    #[test]
    fn test_normalize_language_code() {
        assert_eq!(normalize_language_code("en"), "en-US");
        assert_eq!(normalize_language_code("English"), "en-US");
        assert_eq!(normalize_language_code("es"), "es-ES");
        assert_eq!(normalize_language_code("zh-TW"), "zh-TW"); // Pass through
    }

    #[test]
    fn test_translate_language_code() {
        assert_eq!(translate_language_code("english"), "en");
        assert_eq!(translate_language_code("ES"), "es");
        assert_eq!(translate_language_code("auto"), "auto");
        assert_eq!(translate_language_code("en-US"), "en");
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.youtube.com/watch?v=123"),
            Some("youtube.com".to_string())
        );
        assert_eq!(extract_domain("invalid-url"), None);
    }

    #[test]
    fn test_validate_and_normalize_url() {
        assert!(validate_and_normalize_url("https://example.com").is_ok());
        assert!(validate_and_normalize_url("http://example.com").is_ok());
        assert!(validate_and_normalize_url("ftp://example.com").is_err());
        assert!(validate_and_normalize_url("not-a-url").is_err());
    }
}
