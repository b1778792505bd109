//! The tokenizer collaborator (`spec.md` §1: "a tokenizer
//! (`encode(text, model) -> token_ids)`)") and the truncator's token-budget
//! fast path (`spec.md` §4.6).

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// External collaborator interface. Real chat-model tokenizers (tiktoken,
/// sentencepiece, ...) are out of this crate's scope (`spec.md` §1); callers
/// supply their own implementation. `ApproxTokenizer` below is the
/// in-crate fallback used when none is configured.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str, model: &str) -> Vec<u32>;
}

/// Whitespace/punctuation approximate tokenizer, good enough for truncation
/// decisions when no real model tokenizer is wired in. Not meant to match
/// any specific model's vocabulary.
pub struct ApproxTokenizer;

impl Tokenizer for ApproxTokenizer {
    fn encode(&self, text: &str, _model: &str) -> Vec<u32> {
        let mut ids = Vec::new();
        let mut chars = text.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if c.is_whitespace() {
                continue;
            }
            let mut end = start + c.len_utf8();
            let is_word = c.is_alphanumeric();
            while let Some(&(i, next)) = chars.peek() {
                if is_word && next.is_alphanumeric() {
                    end = i + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            ids.push(end as u32);
        }
        ids
    }
}

/// Encoders are cached per model name, read-mostly after first use
/// (`spec.md` §5). Since `ApproxTokenizer`/externally-supplied tokenizers
/// are stateless here, the cache memoizes token counts rather than encoder
/// objects, but the idempotent-initialization contract is the same.
pub struct TokenizerInterface {
    tokenizer: Box<dyn Tokenizer>,
    count_cache: Mutex<HashMap<(String, String), usize>>,
}

impl TokenizerInterface {
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            count_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn default_gpt4o() -> Self {
        Self::new(Box::new(ApproxTokenizer))
    }

    /// Count tokens for `text` under `model`, skipping the tokenizer
    /// entirely when `text.len() <= limit` (the byte-count fast path from
    /// `spec.md` §4.6).
    pub fn count_within(&self, text: &str, model: &str, limit: usize) -> usize {
        if text.len() <= limit {
            return text.len().min(limit);
        }
        let key = (model.to_string(), text.to_string());
        if let Some(&count) = self.count_cache.lock().unwrap().get(&key) {
            return count;
        }
        let count = self.tokenizer.encode(text, model).len();
        self.count_cache.lock().unwrap().insert(key, count);
        count
    }

    pub fn count(&self, text: &str, model: &str) -> usize {
        self.tokenizer.encode(text, model).len()
    }
}

pub const DEFAULT_MODEL: &str = "gpt-4o";

static SHARED: OnceLock<TokenizerInterface> = OnceLock::new();

/// Process-wide encoder cache, read-mostly after first use (`spec.md` §5).
/// Unlike the error collection or buffer cache, the tokenizer is a shared
/// resource explicitly carved out from the "no singletons but the registry"
/// rule — it has no per-compile state to keep separate.
pub fn shared() -> &'static TokenizerInterface {
    SHARED.get_or_init(TokenizerInterface::default_gpt4o)
}
