use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelfluent::cli::{Cli, Commands, ListFormat, SessionAction};
use reelfluent::clips::{self, generate_clips, Clip, ClipManager};
use reelfluent::config::Config;
use reelfluent::extractors::{self, ExtractorRegistry};
use reelfluent::prefs::FileSegmentPrefs;
use reelfluent::session::{self, SessionClip, SessionStore};
use reelfluent::transcribe::TranscriptionPipeline;
use reelfluent::{compare, output, translate, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "reelfluent=debug"
    } else if cli.quiet {
        "reelfluent=warn"
    } else {
        "reelfluent=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Clips {
            input,
            segment_length,
            language,
            format,
        } => {
            // A plain number previews segmentation without any media source;
            // real media goes through the manager so the source's remembered
            // segment length applies.
            if let Ok(duration) = input.parse::<f64>() {
                let segment_length = segment_length.unwrap_or(config.app.segment_seconds);
                let clips = generate_clips(duration, segment_length, &language, None);
                print_clips(&clips, format)?;
            } else {
                let manager =
                    manager_for(&input, &language, segment_length, config.app.segment_seconds)
                        .await?;
                print_clips(manager.clips(), format)?;
            }
        }
        Commands::Transcribe {
            input,
            clip,
            start,
            end,
            segment_length,
            language,
            output,
            format,
            timestamps,
            save_audio,
        } => {
            warn_missing_dependencies(cli.quiet).await;

            let clip_range = match (start, end, clip) {
                (Some(start), Some(end), _) => {
                    // Custom ranges obey the focused-clip bounds
                    clips::create_focused_clip(start, end, "", None)?;
                    Some((start, end))
                }
                (_, _, Some(number)) => Some(
                    auto_clip_range(&input, number, segment_length, config.app.segment_seconds)
                        .await?,
                ),
                _ => None,
            };

            let pipeline = TranscriptionPipeline::new(config).await?;
            let result = pipeline
                .transcribe_clip(&input, clip_range, language.as_deref(), save_audio)
                .await?;

            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &format, timestamps).await?;
                    println!("Transcription saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, &format, timestamps)?;
                }
            }

            if let Some(audio_path) = result.audio_path {
                println!("Audio saved to: {}", audio_path.display());
            }
        }
        Commands::Translate { text, from, to } => {
            let translator = translate::Translator::new(&config).await?;
            let translated = translator.translate(&text, &from, &to).await?;
            println!("{}", translated);
        }
        Commands::Compare {
            user,
            automated,
            format,
        } => {
            let result = compare::compare_transcriptions(&user, &automated);
            match format {
                ListFormat::Text => print!("{}", output::format_comparison_text(&result)),
                ListFormat::Json => println!("{}", output::format_comparison_json(&result)?),
            }
        }
        Commands::Download { url, output } => {
            warn_missing_dependencies(cli.quiet).await;

            let extractor = extractors::youtube::YoutubeExtractor::new();
            let output_path = match output {
                Some(path) => path,
                None => {
                    let video_id = extractors::youtube::YoutubeExtractor::video_id(&url)?;
                    std::path::PathBuf::from(format!(
                        "audio_{}.mp3",
                        utils::sanitize_filename(&video_id)
                    ))
                }
            };

            let downloaded = extractor.download_audio(&url, &output_path).await?;

            if let Some(title) = &downloaded.title {
                println!("Title:    {}", title);
            }
            if let Some(uploader) = &downloaded.uploader {
                println!("Uploader: {}", uploader);
            }
            if let Some(duration) = downloaded.duration_seconds {
                println!("Duration: {}", utils::format_duration(duration));
            }
            if let Ok(metadata) = fs_err::metadata(&output_path) {
                println!("Size:     {}", utils::format_file_size(metadata.len()));
            }
            println!("Audio saved to: {}", output_path.display());
        }
        Commands::Session { action } => {
            handle_session(action, &config).await?;
        }
        Commands::Doctor => {
            println!("External tool availability:");
            for (tool, available) in utils::tool_availability().await {
                println!("  {} {}", if available { "✓" } else { "✗" }, tool);
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Edit the config file to change settings:");
                println!("  {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}

/// Probe a media input and build a clip manager for it.
///
/// Clips are generated with the source's remembered segment length; an
/// explicit `segment_length` overrides it and is persisted for the source.
async fn manager_for(
    input: &str,
    language: &str,
    segment_length: Option<f64>,
    default_length: f64,
) -> Result<ClipManager<FileSegmentPrefs>> {
    let registry = ExtractorRegistry::new();
    let probe = registry.probe(input).await?;
    let source = probe.into_media_source(language);

    let mut manager = ClipManager::new(FileSegmentPrefs::load(default_length)?);
    manager.load_media(source);
    if let Some(seconds) = segment_length {
        manager.set_segment_length(seconds)?;
    }
    Ok(manager)
}

fn print_clips(clips: &[Clip], format: ListFormat) -> Result<()> {
    if clips.is_empty() {
        println!("No clips could be generated: media has no usable duration.");
        return Ok(());
    }
    match format {
        ListFormat::Text => print!("{}", output::format_clips_text(clips)),
        ListFormat::Json => println!("{}", output::format_clips_json(clips)?),
    }
    Ok(())
}

/// Compute the time range of the 1-based auto clip `number`
async fn auto_clip_range(
    input: &str,
    number: usize,
    segment_length: Option<f64>,
    default_length: f64,
) -> Result<(f64, f64)> {
    let manager = manager_for(input, "", segment_length, default_length).await?;
    let clips = manager.clips();
    if clips.is_empty() {
        anyhow::bail!("No clips could be generated: media has no usable duration");
    }
    let clip = clips.get(number.saturating_sub(1)).ok_or_else(|| {
        anyhow::anyhow!(
            "Clip {} does not exist; {} clips cover this media",
            number,
            clips.len()
        )
    })?;
    Ok((clip.start_time, clip.end_time))
}

async fn handle_session(action: SessionAction, config: &Config) -> Result<()> {
    let session_path = config.session_path()?;
    let mut store = SessionStore::load(&session_path)?;

    match action {
        SessionAction::AddSource { input, language } => {
            let registry = ExtractorRegistry::new();
            let probe = registry.probe(&input).await?;
            let source = probe.into_media_source(&language);
            let id = source.id.clone();
            let name = source.display_name.clone();
            store.add_media_source(source)?;
            store.save(&session_path)?;
            println!("Registered \"{}\" as source {}", name, id);
        }
        SessionAction::Add {
            source_id,
            start,
            end,
            name,
            clip_number,
        } => {
            let source = store
                .media_source(&source_id)
                .ok_or_else(|| anyhow::anyhow!("Unknown media source {}", source_id))?
                .clone();
            if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
                anyhow::bail!("Invalid clip range {}..{}", start, end);
            }
            if source.duration > 0.0 && end > source.duration {
                anyhow::bail!(
                    "Clip end {:.1}s is past the media duration {:.1}s",
                    end,
                    source.duration
                );
            }

            let display_name = name.unwrap_or_else(|| match clip_number {
                Some(n) => format!("{} - clip {}", source.display_name, n),
                None => format!(
                    "{} - {}",
                    source.display_name,
                    utils::format_time_range(start, end)
                ),
            });
            let clip = SessionClip::new(&source, start, end, display_name, clip_number);
            let id = clip.id.clone();

            let outcome = store.add_session_clip(clip)?;
            store.save(&session_path)?;
            match outcome {
                session::AddOutcome::Inserted => println!("Saved clip {}", id),
                session::AddOutcome::Updated => println!("Updated clip {}", id),
            }
        }
        SessionAction::List { format } => match format {
            ListFormat::Text => print!("{}", output::format_session_text(&store)),
            ListFormat::Json => println!("{}", output::format_session_json(&store)?),
        },
        SessionAction::Remove { clip_id } => {
            store.remove_session_clip(&clip_id)?;
            store.save(&session_path)?;
            println!("Removed clip {}", clip_id);
        }
        SessionAction::DropSource { source_id } => {
            let removed = store.remove_media_source(&source_id)?;
            store.save(&session_path)?;
            println!(
                "Removed source {} and {} saved clip(s)",
                source_id, removed
            );
        }
    }

    Ok(())
}

/// Check for required external dependencies (non-fatal)
async fn warn_missing_dependencies(quiet: bool) {
    if quiet {
        return;
    }
    let missing = utils::check_dependencies().await;
    if !missing.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}
