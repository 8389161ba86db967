//! Batching and reply parsing for the translation provider.

/// Most texts sent in one provider call.
pub const MAX_BATCH_TEXTS: usize = 40;

/// Most characters sent in one provider call.
pub const MAX_BATCH_CHARS: usize = 6000;

/// A text waiting for translation and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingText {
    pub index: usize,
    pub text: String,
}

/// Split pending texts into provider-sized batches, keeping order.
///
/// A single text longer than [`MAX_BATCH_CHARS`] gets a batch of its own.
#[must_use]
pub fn chunk(pending: Vec<PendingText>) -> Vec<Vec<PendingText>> {
    let mut batches = Vec::new();
    let mut current: Vec<PendingText> = Vec::new();
    let mut current_chars = 0;

    for item in pending {
        let chars = item.text.chars().count();
        let full = current.len() >= MAX_BATCH_TEXTS || current_chars + chars > MAX_BATCH_CHARS;
        if full && !current.is_empty() {
            batches.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current_chars += chars;
        current.push(item);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// The instruction sent with each batch.
#[must_use]
pub fn prompt(target: &str, texts: &[&str]) -> String {
    let payload = serde_json::to_string(texts).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Translate every string in the JSON array below into the language with code \"{target}\". \
         Keep numbers, prices, product names and punctuation as they are. \
         Reply with only a JSON array of exactly {count} strings in the same order, \
         without commentary.\n\n{payload}",
        count = texts.len()
    )
}

/// Remove a Markdown code fence around the reply, if there is one.
#[must_use]
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the provider reply into exactly `expected` strings.
///
/// Returns `None` when the reply is not a JSON string array of that length.
#[must_use]
pub fn parse_reply(reply: &str, expected: usize) -> Option<Vec<String>> {
    let texts: Vec<String> = serde_json::from_str(strip_code_fence(reply)).ok()?;
    (texts.len() == expected).then_some(texts)
}

/// Put the original's surrounding whitespace back around a translation.
#[must_use]
pub fn rewrap(original: &str, translated: &str) -> String {
    let leading = original
        .get(..original.len() - original.trim_start().len())
        .unwrap_or_default();
    let trailing = original.get(original.trim_end().len()..).unwrap_or_default();
    format!("{leading}{}{trailing}", translated.trim())
}
