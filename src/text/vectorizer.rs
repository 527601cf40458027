//! Bag-of-words vectorization: term counts or tf-idf, L2-normalized.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TntError};
use crate::space::{Representation, VectorSpace};
use crate::vector::{SparseVector, Vector};

/// Words of two or more word characters.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is a valid regex"));

/// Turns documents into unit vectors of a fixed dimensionality.
pub trait Vectorizer {
    /// Learn the vocabulary (and weights) from `documents`.
    fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<VectorSpace>;

    /// Map documents into the fitted space. Each output is unit-norm.
    fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<Vec<Vector>>;

    fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<(VectorSpace, Vec<Vector>)> {
        let space = self.fit(documents)?;
        Ok((space, self.transform(documents)?))
    }
}

/// Term weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Raw term counts.
    #[default]
    Count,
    /// Term counts scaled by smoothed inverse document frequency.
    Tfidf,
}

/// Lowercase and split into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Vocabulary-based vectorizer producing sparse vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagOfWords {
    weighting: Weighting,
    /// Term -> dimension, in alphabetical order.
    vocabulary: BTreeMap<String, u32>,
    /// Per-dimension idf; empty for count weighting.
    idf: Vec<f32>,
}

impl BagOfWords {
    pub fn new(weighting: Weighting) -> Self {
        Self {
            weighting,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    pub fn term_index(&self, term: &str) -> Option<u32> {
        self.vocabulary.get(term).copied()
    }

    pub fn space(&self) -> VectorSpace {
        VectorSpace::new(self.vocabulary.len(), Representation::Sparse)
    }

    fn vectorize(&self, position: usize, text: &str) -> Result<Vector> {
        let mut counts: BTreeMap<u32, f32> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&dim) = self.vocabulary.get(&token) {
                *counts.entry(dim).or_insert(0.0) += 1.0;
            }
        }

        let (indices, values): (Vec<u32>, Vec<f32>) = counts
            .into_iter()
            .map(|(dim, count)| match self.weighting {
                Weighting::Count => (dim, count),
                Weighting::Tfidf => (dim, count * self.idf[dim as usize]),
            })
            .unzip();

        let mut v = Vector::Sparse(SparseVector::new(self.vocabulary.len(), indices, values)?);
        v.normalize().map_err(|_| {
            TntError::degenerate(format!("document {} contains no known terms", position))
        })?;
        Ok(v)
    }
}

impl Vectorizer for BagOfWords {
    fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<VectorSpace> {
        if documents.is_empty() {
            return Err(TntError::EmptyCorpus);
        }

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let mut terms = tokenize(doc.as_ref());
            terms.sort_unstable();
            terms.dedup();
            for term in terms {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }
        if document_frequency.is_empty() {
            return Err(TntError::EmptyCorpus);
        }

        let n = documents.len() as f32;
        self.vocabulary = document_frequency
            .keys()
            .enumerate()
            .map(|(dim, term)| (term.clone(), dim as u32))
            .collect();
        self.idf = match self.weighting {
            Weighting::Count => Vec::new(),
            Weighting::Tfidf => document_frequency
                .values()
                .map(|&df| ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0)
                .collect(),
        };

        Ok(self.space())
    }

    fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<Vec<Vector>> {
        if !self.is_fitted() {
            return Err(TntError::config("vectorizer has not been fitted"));
        }
        documents
            .iter()
            .enumerate()
            .map(|(position, doc)| self.vectorize(position, doc.as_ref()))
            .collect()
    }
}
