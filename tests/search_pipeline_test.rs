use std::sync::Arc;

use tempfile::TempDir;

use wikisearch::analysis::{Analyzer, AnalyzerConfig, IdentityLemmatizer, StopwordSet};
use wikisearch::config::{AnnIndexConfig, Bm25Params, EmbeddingConfig};
use wikisearch::{
    Article, Autocompleter, CancellationToken, CompletionTrie, Dictionary, DocumentStore,
    IndexKind, IngestPipeline, InvertedIndex, MemoryByteStore, MemoryRelationalStore,
    NextWordTrie, PrecomputedEmbedder, QueryOrchestrator, RelationalStore, ScoreStrategy,
    SearchQuery, SemanticIndex, SnippetService, SpellChecker, WikiSearchError,
};

const DIMENSION: usize = 768;

fn vector(weights: &[(usize, f32)]) -> Vec<f32> {
    let mut v = vec![0.0; DIMENSION];
    for &(index, weight) in weights {
        v[index] = weight;
    }
    v
}

struct Fixture {
    orchestrator: QueryOrchestrator,
    _dir: TempDir,
}

fn build_fixture() -> Fixture {
    let dir = TempDir::new().unwrap();

    let relational: Arc<dyn RelationalStore> = Arc::new(MemoryRelationalStore::new());
    let documents = Arc::new(DocumentStore::new(Arc::new(MemoryByteStore::new())));

    let analyzer = Arc::new(Analyzer::new(
        AnalyzerConfig::default(),
        StopwordSet::from_words(["is", "the", "of", "an", "a"]),
        Arc::new(IdentityLemmatizer),
    ));
    let inverted = Arc::new(InvertedIndex::new(
        relational.clone(),
        analyzer,
        Bm25Params::default(),
    ));

    // Synthetic unit vectors: article A and the Bulgaria query share a
    // direction, article B points elsewhere.
    let embedder = PrecomputedEmbedder::new(DIMENSION);
    embedder
        .insert(
            "Sofia is the capital of Bulgaria.",
            vector(&[(0, 1.0), (1, 0.1)]),
        )
        .unwrap();
    embedder
        .insert(
            "Plovdiv is an ancient city.",
            vector(&[(2, 1.0), (1, 0.1)]),
        )
        .unwrap();
    embedder
        .insert("capital of bulgaria", vector(&[(0, 0.9), (1, 0.2)]))
        .unwrap();

    let semantic = Arc::new(
        SemanticIndex::open(
            &AnnIndexConfig {
                path: dir.path().join("semantic.index"),
                dimension: DIMENSION,
                save_threshold: 10,
            },
            &EmbeddingConfig::default(),
            Arc::new(embedder),
        )
        .unwrap(),
    );

    let spell = Arc::new(SpellChecker::new(Dictionary::from_words([
        "search", "sofia", "plovdiv", "capital", "bulgaria",
    ])));

    let completions = CompletionTrie::build(["search", "sea", "season"]).unwrap();
    let next_words = NextWordTrie::build([("to be", 100u64), ("to do", 40)]).unwrap();
    let autocompleter = Arc::new(Autocompleter::new(completions, next_words, 10));

    let snippets = Arc::new(SnippetService::new(documents.clone()));

    let pipeline = IngestPipeline::new(
        relational.clone(),
        documents,
        inverted.clone(),
        semantic.clone(),
    );
    let articles = [
        Article {
            doc_id: 1,
            title: "Sofia".to_string(),
            url: "https://wiki.example/sofia".to_string(),
            body: "Sofia is the capital of Bulgaria.".to_string(),
        },
        Article {
            doc_id: 2,
            title: "Plovdiv".to_string(),
            url: "https://wiki.example/plovdiv".to_string(),
            body: "Plovdiv is an ancient city.".to_string(),
        },
    ];
    assert_eq!(pipeline.ingest_all(&articles), 2);

    Fixture {
        orchestrator: QueryOrchestrator::new(
            relational,
            inverted,
            semantic,
            spell,
            autocompleter,
            snippets,
        ),
        _dir: dir,
    }
}

#[test]
fn test_inverted_search_ranks_matching_document_first() {
    let fixture = build_fixture();

    let response = fixture
        .orchestrator
        .search(&SearchQuery::new("sofia").spellcheck(false))
        .unwrap();
    assert!(!response.results.is_empty());
    assert_eq!(response.results[0].document_id, 1);
    let rank_of_b = response.results.iter().position(|hit| hit.document_id == 2);
    assert!(rank_of_b.is_none_or(|rank| rank > 0));

    let response = fixture
        .orchestrator
        .search(&SearchQuery::new("plovdiv").spellcheck(false))
        .unwrap();
    assert_eq!(response.results[0].document_id, 2);
}

#[test]
fn test_spellcheck_corrects_query_and_flags_response() {
    let fixture = build_fixture();

    let response = fixture
        .orchestrator
        .search(&SearchQuery::new("serch"))
        .unwrap();
    assert_eq!(response.query, "search");
    assert!(response.correction);

    // Already-correct queries are untouched.
    let response = fixture
        .orchestrator
        .search(&SearchQuery::new("sofia"))
        .unwrap();
    assert_eq!(response.query, "sofia");
    assert!(!response.correction);
}

#[test]
fn test_autocomplete_word_completions() {
    let fixture = build_fixture();
    let suggestions = fixture.orchestrator.autocomplete("sea");
    assert_eq!(&suggestions[..2], &["sea", "search"]);
}

#[test]
fn test_autocomplete_next_words() {
    let fixture = build_fixture();
    assert_eq!(fixture.orchestrator.autocomplete("to "), vec!["be", "do"]);
}

#[test]
fn test_semantic_search_with_avg_aggregation() {
    let fixture = build_fixture();

    let response = fixture
        .orchestrator
        .search(
            &SearchQuery::new("capital of Bulgaria")
                .index(IndexKind::Semantic)
                .strategy(ScoreStrategy::Avg)
                .spellcheck(false),
        )
        .unwrap();

    assert_eq!(response.results[0].document_id, 1);
    let score_a = response.results[0].score;
    let score_b = response
        .results
        .iter()
        .find(|hit| hit.document_id == 2)
        .map(|hit| hit.score)
        .unwrap();
    assert!(score_a > score_b);
    assert!((0.0..=1.0).contains(&score_a));
}

#[test]
fn test_hits_are_hydrated_with_metadata_and_summary() {
    let fixture = build_fixture();

    let response = fixture
        .orchestrator
        .search(&SearchQuery::new("plovdiv").spellcheck(false))
        .unwrap();
    let hit = &response.results[0];
    assert_eq!(hit.title, "Plovdiv");
    assert_eq!(hit.url, "https://wiki.example/plovdiv");
    assert_eq!(hit.summary, "Plovdiv is an ancient city.");
}

#[test]
fn test_response_serializes_to_wire_shape() {
    let fixture = build_fixture();
    let response = fixture
        .orchestrator
        .search(&SearchQuery::new("sofia").spellcheck(false))
        .unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["query"], "sofia");
    assert_eq!(json["index"], "inverted");
    assert_eq!(json["limit"], 20);
    assert_eq!(json["offset"], 0);
    assert_eq!(json["correction"], false);
    let first = &json["results"][0];
    assert_eq!(first["document_id"], 1);
    assert!(first["title"].is_string());
    assert!(first["url"].is_string());
    assert!(first["summary"].is_string());
    assert!(first["score"].is_number());
}

#[test]
fn test_unknown_query_returns_empty_results() {
    let fixture = build_fixture();
    let response = fixture
        .orchestrator
        .search(&SearchQuery::new("nonexistent").spellcheck(false))
        .unwrap();
    assert!(response.results.is_empty());

    let response = fixture
        .orchestrator
        .search(&SearchQuery::new("").spellcheck(false))
        .unwrap();
    assert!(response.results.is_empty());
}

#[test]
fn test_semantic_encoding_failure_degrades_to_empty() {
    let fixture = build_fixture();
    // This query has no precomputed vector, so the semantic branch fails
    // with an encoding error that the orchestrator absorbs.
    let response = fixture
        .orchestrator
        .search(
            &SearchQuery::new("query without a vector")
                .index(IndexKind::Semantic)
                .spellcheck(false),
        )
        .unwrap();
    assert!(response.results.is_empty());
}

#[test]
fn test_cancelled_request_is_aborted() {
    let fixture = build_fixture();
    let token = CancellationToken::new();
    token.cancel();

    let err = fixture
        .orchestrator
        .search(&SearchQuery::new("sofia").cancel_token(token))
        .unwrap_err();
    assert!(matches!(err, WikiSearchError::Cancelled));
}

#[test]
fn test_pagination_offsets_results() {
    let fixture = build_fixture();

    // The semantic index ranks both documents for this query, which gives
    // the pagination something to skip.
    let all = fixture
        .orchestrator
        .search(
            &SearchQuery::new("capital of Bulgaria")
                .index(IndexKind::Semantic)
                .strategy(ScoreStrategy::Avg)
                .spellcheck(false),
        )
        .unwrap();
    assert_eq!(all.results.len(), 2);

    let tail = fixture
        .orchestrator
        .search(
            &SearchQuery::new("capital of Bulgaria")
                .index(IndexKind::Semantic)
                .strategy(ScoreStrategy::Avg)
                .offset(1)
                .spellcheck(false),
        )
        .unwrap();
    assert_eq!(tail.results.len(), 1);
    assert_eq!(tail.results[0].document_id, all.results[1].document_id);
}
