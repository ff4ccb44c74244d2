use anyhow::{Context, Result};
use aws_sdk_translate::Client as TranslateClient;

use crate::config::Config;
use crate::utils::translate_language_code;

/// Translation flow backed by AWS Translate
pub struct Translator {
    client: TranslateClient,
}

impl Translator {
    pub async fn new(config: &Config) -> Result<Self> {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(config.aws_region())
            .load()
            .await;

        Ok(Self {
            client: TranslateClient::new(&aws_config),
        })
    }

    /// Translate text between two languages.
    ///
    /// Language arguments accept names ("english") or tags ("en"); `auto`
    /// as the source lets the service detect the language.
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        let source = translate_language_code(source_language);
        let target = translate_language_code(target_language);

        tracing::info!("Translating {} -> {}", source, target);

        let response = self
            .client
            .translate_text()
            .text(text)
            .source_language_code(source)
            .target_language_code(target)
            .send()
            .await
            .context("Failed to translate text")?;

        Ok(response.translated_text().to_string())
    }
}
