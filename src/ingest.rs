//! Offline ingest pipeline.
//!
//! Fans one article out to every store: the identity row into the
//! relational store, raw body bytes into the document store, terms into
//! the inverted index, and segment embeddings into the semantic index.

use std::sync::Arc;

use log::{error, info};

use crate::error::Result;
use crate::lexical::InvertedIndex;
use crate::semantic::SemanticIndex;
use crate::store::relational::DocumentMeta;
use crate::store::{DocumentStore, RelationalStore};

/// One article as delivered by the dump crawler.
#[derive(Debug, Clone)]
pub struct Article {
    pub doc_id: u64,
    pub title: String,
    pub url: String,
    pub body: String,
}

/// Coordinates ingest across the indices.
///
/// Ingest is single-writer per index; the lexical and semantic branches of
/// one document run in parallel because they touch disjoint stores.
pub struct IngestPipeline {
    relational: Arc<dyn RelationalStore>,
    documents: Arc<DocumentStore>,
    inverted: Arc<InvertedIndex>,
    semantic: Arc<SemanticIndex>,
}

impl IngestPipeline {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        documents: Arc<DocumentStore>,
        inverted: Arc<InvertedIndex>,
        semantic: Arc<SemanticIndex>,
    ) -> Self {
        Self {
            relational,
            documents,
            inverted,
            semantic,
        }
    }

    /// Ingest one article into every store.
    ///
    /// A semantic-branch failure is logged and does not fail the article:
    /// the lexical index can still serve it. Failures in the relational or
    /// document store abort the article and roll back its identity row, so
    /// a retry of the same id starts clean.
    pub fn ingest(&self, article: &Article) -> Result<()> {
        self.relational.insert_document(&DocumentMeta {
            doc_id: article.doc_id,
            title: article.title.clone(),
            url: article.url.clone(),
        })?;

        if let Err(e) = self.apply_stores(article) {
            if let Err(undo) = self.relational.remove_document(article.doc_id) {
                error!(
                    "rollback of document {} after failed ingest also failed: {undo}",
                    article.doc_id
                );
            }
            return Err(e);
        }
        Ok(())
    }

    fn apply_stores(&self, article: &Article) -> Result<()> {
        self.documents.put_article(article.doc_id, &article.body)?;

        let (lexical, semantic) = rayon::join(
            || {
                self.inverted
                    .store_document(article.doc_id, &article.title, &article.body)
            },
            || self.semantic.store(article.doc_id, &article.body),
        );
        lexical?;
        if let Err(e) = semantic {
            error!(
                "semantic indexing failed for document {}: {e}",
                article.doc_id
            );
        }
        Ok(())
    }

    /// Ingest a batch, skipping articles that fail. Returns the number of
    /// successfully ingested articles.
    pub fn ingest_all<'a, I>(&self, articles: I) -> usize
    where
        I: IntoIterator<Item = &'a Article>,
    {
        let mut ingested = 0;
        for article in articles {
            match self.ingest(article) {
                Ok(()) => ingested += 1,
                Err(e) => error!("skipping document {}: {e}", article.doc_id),
            }
        }
        info!("ingested {ingested} documents");
        ingested
    }
}
