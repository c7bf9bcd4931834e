//! Token counting for the context budget.
//!
//! The budget is a heuristic ceiling, not an exact subword count. The default
//! counter splits on whitespace; a character heuristic (~4 chars per token)
//! and, behind the `hf-tokenizer` feature, a HuggingFace tokenizer are also
//! available. Any `Fn(&str) -> usize` works as a counter too.

use stratadesk_core::error::Error;

/// Counts the "tokens" in a passage for budgeting purposes.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Short name shown in status output.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Whitespace-delimited words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// 1 token ≈ 4 bytes of text, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharHeuristicTokenCounter;

impl TokenCounter for CharHeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.len().div_ceil(4)
    }

    fn name(&self) -> &str {
        "chars"
    }
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Subword counts from a HuggingFace `tokenizer.json`.
#[cfg(feature = "hf-tokenizer")]
pub struct HfTokenCounter {
    tokenizer: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HfTokenCounter {
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let tokenizer = tokenizers::Tokenizer::from_file(path).map_err(|e| Error::Config {
            message: format!("failed to load tokenizer {}: {e}", path.display()),
        })?;
        Ok(Self { tokenizer })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                tracing::warn!(error = %e, "Tokenizer failed, falling back to word count");
                WhitespaceTokenCounter.count(text)
            }
        }
    }

    fn name(&self) -> &str {
        "hf"
    }
}

/// Resolve a `retrieval.token_counter` setting.
///
/// Accepts `whitespace`, `chars`, and with the `hf-tokenizer` feature
/// `hf:<path to tokenizer.json>`.
pub fn counter_from_name(name: &str) -> Result<Box<dyn TokenCounter>, Error> {
    match name {
        "whitespace" | "words" => Ok(Box::new(WhitespaceTokenCounter)),
        "chars" => Ok(Box::new(CharHeuristicTokenCounter)),
        #[cfg(feature = "hf-tokenizer")]
        other if other.starts_with("hf:") => {
            Ok(Box::new(HfTokenCounter::from_file(&other["hf:".len()..])?))
        }
        other => Err(Error::Config {
            message: format!("unknown token counter '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_counts_words() {
        let counter = WhitespaceTokenCounter;
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("   "), 0);
        assert_eq!(counter.count("Visitor parking  is\nlimited"), 4);
    }

    #[test]
    fn char_heuristic_rounds_up() {
        let counter = CharHeuristicTokenCounter;
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("test"), 1);
        assert_eq!(counter.count("hello"), 2);
        assert_eq!(counter.count(&"a".repeat(100)), 25);
    }

    #[test]
    fn closures_are_counters() {
        let counter = |text: &str| text.lines().count();
        assert_eq!(TokenCounter::count(&counter, "a\nb\nc"), 3);
        assert_eq!(TokenCounter::name(&counter), "custom");
    }

    #[test]
    fn counter_names_resolve() {
        assert_eq!(counter_from_name("whitespace").unwrap().name(), "whitespace");
        assert_eq!(counter_from_name("chars").unwrap().name(), "chars");
        assert!(counter_from_name("tiktoken").is_err());
    }
}
