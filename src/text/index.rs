//! Text search: a fitted vectorizer, the cluster index over its output, and
//! the original documents.

use serde::{Deserialize, Serialize};

use crate::cluster::{CancellationToken, ClusterIndex};
use crate::config::BuildConfig;
use crate::error::{Result, TntError};
use crate::search::{QueryEngine, QueryResult};
use crate::text::vectorizer::{BagOfWords, Vectorizer, Weighting};

/// A text search hit borrowing the matched document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextHit<'a> {
    pub id: usize,
    pub score: f32,
    pub document: &'a str,
}

/// Cluster-pruned search over a document collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTextIndex")]
pub struct TextIndex {
    vectorizer: BagOfWords,
    index: ClusterIndex,
    documents: Vec<String>,
}

impl TextIndex {
    /// Fit a bag-of-words vectorizer on `documents` and index them.
    pub fn fit(documents: Vec<String>, weighting: Weighting, config: &BuildConfig) -> Result<Self> {
        Self::fit_with(
            documents,
            BagOfWords::new(weighting),
            config,
            &CancellationToken::new(),
        )
    }

    pub fn fit_with(
        documents: Vec<String>,
        mut vectorizer: BagOfWords,
        config: &BuildConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let (_, vectors) = vectorizer.fit_transform(&documents)?;
        let index = crate::build_with_cancel(vectors, config, cancel)?;
        Ok(Self {
            vectorizer,
            index,
            documents,
        })
    }

    /// Search and return matched ids with scores.
    pub fn query(&self, text: &str, k: usize, probe_count: usize) -> Result<QueryResult> {
        let query = self
            .vectorizer
            .transform(&[text])?
            .pop()
            .ok_or_else(|| TntError::argument("empty query"))?;
        QueryEngine::new(&self.index).search(&query, k, probe_count)
    }

    /// Search and return matched documents.
    pub fn search(&self, text: &str, k: usize, probe_count: usize) -> Result<Vec<TextHit<'_>>> {
        let result = self.query(text, k, probe_count)?;
        Ok(result
            .iter()
            .map(|hit| TextHit {
                id: hit.id,
                score: hit.score,
                document: &self.documents[hit.id],
            })
            .collect())
    }

    pub fn document(&self, id: usize) -> Option<&str> {
        self.documents.get(id).map(String::as_str)
    }

    pub fn index(&self) -> &ClusterIndex {
        &self.index
    }

    pub fn vectorizer(&self) -> &BagOfWords {
        &self.vectorizer
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[derive(Deserialize)]
struct RawTextIndex {
    vectorizer: BagOfWords,
    index: ClusterIndex,
    documents: Vec<String>,
}

impl TryFrom<RawTextIndex> for TextIndex {
    type Error = TntError;

    fn try_from(raw: RawTextIndex) -> Result<Self> {
        if raw.documents.len() != raw.index.len() {
            return Err(TntError::corrupt(format!(
                "{} documents for {} indexed vectors",
                raw.documents.len(),
                raw.index.len()
            )));
        }
        if raw.vectorizer.vocabulary_len() != raw.index.dimension() {
            return Err(TntError::corrupt(format!(
                "vocabulary of {} terms for a {}-dimensional index",
                raw.vectorizer.vocabulary_len(),
                raw.index.dimension()
            )));
        }
        Ok(Self {
            vectorizer: raw.vectorizer,
            index: raw.index,
            documents: raw.documents,
        })
    }
}
