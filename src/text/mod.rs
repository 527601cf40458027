//! Text adapter: vectorizes raw documents and searches them through a cluster index.

pub mod index;
pub mod vectorizer;

pub use index::{TextHit, TextIndex};
pub use vectorizer::{tokenize, BagOfWords, Vectorizer, Weighting};
