//! Page translation.
//!
//! The browser collects visible text, posts it in batches to
//! `/api/translate`, and swaps each text node for its translation. The
//! server side keeps a cache of `(target, text)` pairs and sends only the
//! misses to the provider.

pub mod batch;
pub mod gemini;

use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::instrument;

use crate::config::TranslatorConfig;
use batch::PendingText;
pub use gemini::GeminiClient;

/// Most texts accepted in one request.
pub const MAX_TEXTS: usize = 200;

/// Cached translations kept at most.
const CACHE_CAPACITY: u64 = 20_000;

/// Cached translations expire after a day.
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors from the translation service.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The language code is empty, too long or has unexpected characters.
    #[error("invalid target language: {0:?}")]
    InvalidTarget(String),

    /// The request carries more texts than allowed.
    #[error("too many texts: {got} (max {max})")]
    TooManyTexts { max: usize, got: usize },

    /// The configured API key cannot be sent as a header.
    #[error("translation API key is not a valid header value")]
    InvalidApiKey,

    /// Talking to the provider failed.
    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status.
    #[error("translation provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

impl TranslateError {
    /// Whether the caller sent a bad request (as opposed to a provider failure).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidTarget(_) | Self::TooManyTexts { .. })
    }
}

/// Check a target language code: 2-16 characters of ASCII letters and `-`.
///
/// # Errors
///
/// Returns [`TranslateError::InvalidTarget`] otherwise.
pub fn validate_target(target: &str) -> Result<(), TranslateError> {
    let valid = (2..=16).contains(&target.len())
        && target.chars().all(|c| c.is_ascii_alphabetic() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(TranslateError::InvalidTarget(target.to_string()))
    }
}

/// Cached batch translator.
#[derive(Clone)]
pub struct Translator {
    provider: GeminiClient,
    cache: Cache<(String, String), String>,
}

impl Translator {
    /// # Errors
    ///
    /// Returns an error if the provider client cannot be built.
    pub fn new(config: &TranslatorConfig) -> Result<Self, TranslateError> {
        Ok(Self {
            provider: GeminiClient::new(config)?,
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        })
    }

    /// Translate `texts` into `target`, preserving order and length.
    ///
    /// Blank texts come back unchanged. A batch whose reply cannot be used
    /// falls back to the original texts.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid request or a failed provider call.
    #[instrument(skip(self, target, texts), fields(target_lang = %target, count = texts.len()))]
    pub async fn translate(
        &self,
        target: &str,
        texts: Vec<String>,
    ) -> Result<Vec<String>, TranslateError> {
        validate_target(target)?;
        if texts.len() > MAX_TEXTS {
            return Err(TranslateError::TooManyTexts {
                max: MAX_TEXTS,
                got: texts.len(),
            });
        }

        let mut results: Vec<Option<String>> = vec![None; texts.len()];
        let mut pending = Vec::new();

        for (index, text) in texts.iter().enumerate() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            let key = (target.to_string(), trimmed.to_string());
            match self.cache.get(&key).await {
                Some(hit) => set(&mut results, index, batch::rewrap(text, &hit)),
                None => pending.push(PendingText {
                    index,
                    text: trimmed.to_string(),
                }),
            }
        }

        let cached = texts.len() - pending.len();
        tracing::debug!(cached, pending = pending.len(), "Translating page text");

        for chunk in batch::chunk(pending) {
            let originals: Vec<&str> = chunk.iter().map(|p| p.text.as_str()).collect();
            let Some(translated) = self.provider.translate_batch(target, &originals).await? else {
                tracing::warn!(
                    target_lang = target,
                    count = chunk.len(),
                    "Unusable translation reply, keeping originals"
                );
                continue;
            };

            for (item, translation) in chunk.iter().zip(translated) {
                self.cache
                    .insert((target.to_string(), item.text.clone()), translation.clone())
                    .await;
                if let Some(original) = texts.get(item.index) {
                    set(&mut results, item.index, batch::rewrap(original, &translation));
                }
            }
        }

        Ok(results
            .into_iter()
            .zip(texts)
            .map(|(translated, original)| translated.unwrap_or(original))
            .collect())
    }
}

fn set(results: &mut [Option<String>], index: usize, value: String) {
    if let Some(slot) = results.get_mut(index) {
        *slot = Some(value);
    }
}
