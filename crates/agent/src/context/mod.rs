//! Context assembly: token counting, score normalisation, and the
//! budgeted assembler that turns retrieved passages into a context blob.

pub mod assembler;
pub mod normalize;
pub mod token;

pub use assembler::{AssembledContext, ContextAssembler, ContextEntry, SEPARATOR};
pub use normalize::ScoreNormalizer;
pub use token::{CharHeuristicTokenCounter, TokenCounter, WhitespaceTokenCounter, counter_from_name};

#[cfg(feature = "hf-tokenizer")]
pub use token::HfTokenCounter;
