//! The query orchestrator.
//!
//! Composes spell-correction, index selection, and per-hit hydration into
//! one search response. Constructed once at startup over shared handles;
//! request handlers call it concurrently by shared borrow.

use std::str::FromStr;
use std::sync::Arc;

use log::error;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::autocomplete::Autocompleter;
use crate::error::{Result, WikiSearchError};
use crate::lexical::InvertedIndex;
use crate::semantic::{ScoreStrategy, SemanticIndex};
use crate::snippet::{DEFAULT_SNIPPET_CHARS, SnippetService};
use crate::spelling::SpellChecker;
use crate::store::RelationalStore;
use crate::util::CancellationToken;

/// Hydrate hits in parallel once the page is larger than this.
const PARALLEL_HYDRATION_THRESHOLD: usize = 8;

/// Which index serves the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    #[default]
    Inverted,
    Semantic,
}

impl FromStr for IndexKind {
    type Err = WikiSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inverted" => Ok(IndexKind::Inverted),
            "semantic" => Ok(IndexKind::Semantic),
            other => Err(WikiSearchError::input(format!("unknown index: {other:?}"))),
        }
    }
}

/// A search request.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub q: String,
    pub index: IndexKind,
    pub limit: usize,
    pub offset: usize,
    pub spellcheck: bool,
    /// Aggregation for the semantic index; ignored by the inverted index.
    pub strategy: ScoreStrategy,
    pub cancel: Option<CancellationToken>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            index: IndexKind::default(),
            limit: 20,
            offset: 0,
            spellcheck: true,
            strategy: ScoreStrategy::default(),
            cancel: None,
        }
    }

    pub fn index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn spellcheck(mut self, spellcheck: bool) -> Self {
        self.spellcheck = spellcheck;
        self
    }

    pub fn strategy(mut self, strategy: ScoreStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// One hydrated search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document_id: u64,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub score: f64,
}

/// The full search response in the wire shape the HTTP layer returns.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub index: IndexKind,
    pub limit: usize,
    pub offset: usize,
    pub correction: bool,
    pub results: Vec<SearchHit>,
}

/// Immutable registry of the retrieval components, composed per request.
pub struct QueryOrchestrator {
    relational: Arc<dyn RelationalStore>,
    inverted: Arc<InvertedIndex>,
    semantic: Arc<SemanticIndex>,
    spell: Arc<SpellChecker>,
    autocompleter: Arc<Autocompleter>,
    snippets: Arc<SnippetService>,
}

impl QueryOrchestrator {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        inverted: Arc<InvertedIndex>,
        semantic: Arc<SemanticIndex>,
        spell: Arc<SpellChecker>,
        autocompleter: Arc<Autocompleter>,
        snippets: Arc<SnippetService>,
    ) -> Self {
        Self {
            relational,
            inverted,
            semantic,
            spell,
            autocompleter,
            snippets,
        }
    }

    /// Execute a search request end to end.
    ///
    /// Store or embedding failures in the selected index degrade to an
    /// empty result list; input errors and cancellation propagate.
    pub fn search(&self, request: &SearchQuery) -> Result<SearchResponse> {
        let original = request.q.to_lowercase();
        check_cancelled(request)?;

        let query = if request.spellcheck {
            self.spell.spellcheck(&original).to_lowercase()
        } else {
            original.clone()
        };
        check_cancelled(request)?;

        let ranked = match request.index {
            IndexKind::Inverted => self.inverted.search(&query, request.limit, request.offset),
            IndexKind::Semantic => self.semantic.search(
                &query,
                request.limit,
                request.offset,
                request.strategy,
            ),
        };
        let ranked = match ranked {
            Ok(ranked) => ranked,
            Err(e) if e.is_degradable() => {
                error!("search degraded to empty results for {query:?}: {e}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        check_cancelled(request)?;

        let results = self.hydrate(&ranked)?;
        Ok(SearchResponse {
            correction: query != original,
            query,
            index: request.index,
            limit: request.limit,
            offset: request.offset,
            results,
        })
    }

    /// Suggestions for a partial query.
    pub fn autocomplete(&self, input: &str) -> Vec<String> {
        self.autocompleter.suggest(input)
    }

    fn hydrate(&self, ranked: &[(u64, f64)]) -> Result<Vec<SearchHit>> {
        let hits: Vec<Option<SearchHit>> = if ranked.len() > PARALLEL_HYDRATION_THRESHOLD {
            ranked
                .par_iter()
                .map(|&(doc_id, score)| self.hydrate_one(doc_id, score))
                .collect::<Result<_>>()?
        } else {
            ranked
                .iter()
                .map(|&(doc_id, score)| self.hydrate_one(doc_id, score))
                .collect::<Result<_>>()?
        };
        Ok(hits.into_iter().flatten().collect())
    }

    fn hydrate_one(&self, doc_id: u64, score: f64) -> Result<Option<SearchHit>> {
        let Some(meta) = self.relational.document_meta(doc_id)? else {
            error!("ranked document {doc_id} has no metadata row; dropping hit");
            return Ok(None);
        };
        let summary = match self.snippets.summarize_static(doc_id, DEFAULT_SNIPPET_CHARS) {
            Ok(summary) => summary,
            Err(e) if e.is_degradable() => {
                error!("snippet generation failed for document {doc_id}: {e}");
                String::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Some(SearchHit {
            document_id: doc_id,
            title: meta.title,
            url: meta.url,
            summary,
            score,
        }))
    }
}

fn check_cancelled(request: &SearchQuery) -> Result<()> {
    match &request.cancel {
        Some(token) if token.is_cancelled() => Err(WikiSearchError::Cancelled),
        _ => Ok(()),
    }
}
