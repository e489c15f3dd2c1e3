//! End-to-end pipeline tests against the in-memory store and a scripted
//! transport.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use webindex_core::error::IndexError;
use webindex_core::models::DocumentState;
use webindex_core::pipeline::{index_document, index_documents, IndexOptions};
use webindex_core::search::search;
use webindex_core::store::memory::InMemoryStore;
use webindex_core::store::{BatchMode, Store, Table};
use webindex_core::transport::{ProbeResponse, ProbeStatus, Transport, TransportError};

// ─── Fake transport ─────────────────────────────────────────────────

#[derive(Clone)]
struct Page {
    body: Vec<u8>,
    marker: String,
    probe_fails: bool,
}

#[derive(Default)]
struct FakeTransport {
    pages: Mutex<HashMap<String, Page>>,
    fetches: Mutex<usize>,
}

impl FakeTransport {
    fn serve(&self, url: &str, html: &str, marker: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            Page {
                body: html.as_bytes().to_vec(),
                marker: marker.to_string(),
                probe_fails: false,
            },
        );
    }

    fn break_probe(&self, url: &str) {
        if let Some(page) = self.pages.lock().unwrap().get_mut(url) {
            page.probe_fails = true;
        }
    }

    fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        *self.fetches.lock().unwrap() += 1;
        match self.pages.lock().unwrap().get(url) {
            Some(page) => Ok(page.body.clone()),
            None => Err(TransportError::UnexpectedStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn probe(
        &self,
        url: &str,
        marker: Option<&str>,
    ) -> Result<ProbeResponse, TransportError> {
        let pages = self.pages.lock().unwrap();
        let page = match pages.get(url) {
            Some(page) => page,
            None => {
                return Ok(ProbeResponse {
                    status: ProbeStatus::Other(404),
                    marker: None,
                    http_status: 404,
                })
            }
        };
        if page.probe_fails {
            return Err(TransportError::Request {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }
        let current = (!page.marker.is_empty()).then(|| page.marker.clone());
        if marker.is_some() && marker == current.as_deref() {
            return Ok(ProbeResponse {
                status: ProbeStatus::NotModified,
                marker: None,
                http_status: 304,
            });
        }
        Ok(ProbeResponse {
            status: ProbeStatus::Changed,
            marker: current,
            http_status: 200,
        })
    }
}

const M1: &str = "Mon, 02 Jan 2006 15:04:05 GMT";
const M2: &str = "Tue, 03 Jan 2006 15:04:05 GMT";

fn html(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><p>{}</p></body></html>",
        title, body
    )
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn new_document_writes_all_tables() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve(
        "http://a.test/",
        "<html><head><title>Rust, Web!</title></head><body>\
         <p>rust is fast, rust is safe</p><a href=\"/docs\">docs</a></body></html>",
        M1,
    );

    let outcome = index_document(&store, &transport, "http://a.test/", &IndexOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.state, DocumentState::New);
    assert_eq!(outcome.terms, 5);

    let doc = store.document_by_url("http://a.test/").unwrap();
    assert_eq!(doc.doc_id, outcome.doc_id);
    assert_eq!(doc.title, "Rust Web");
    assert_eq!(doc.last_updated, M1);
    assert_eq!(doc.links, vec!["/docs".to_string()]);
    assert_eq!(doc.total_tokens, 7);

    let id = doc.doc_id.as_str();
    assert_eq!(store.term_frequency("rust", id), Some(2));
    assert_eq!(store.term_frequency("docs", id), Some(1));
    assert_eq!(store.document_frequency("rust").await.unwrap(), Some(1));
    // N = 1, df = 1: idf = 1, so the score is the plain term frequency.
    assert!(close(store.tfidf_score("rust", id).unwrap(), 2.0 / 7.0));
}

#[tokio::test]
async fn shared_terms_count_distinct_documents() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve("http://a.test/", &html("A", "rust async"), M1);
    transport.serve("http://b.test/", &html("B", "rust tools"), M1);

    let reports = index_documents(
        &store,
        &transport,
        &["http://a.test/", "http://b.test/"],
        &IndexOptions::default(),
    )
    .await;
    let b = reports[1].result.as_ref().unwrap();

    assert_eq!(store.document_count().await.unwrap(), 2);
    assert_eq!(store.document_frequency("rust").await.unwrap(), Some(2));
    assert_eq!(store.document_frequency("tools").await.unwrap(), Some(1));
    // N = 2: shared term idf = 1 + log2(2/2) = 1, unique term idf = 2.
    assert!(close(store.tfidf_score("rust", &b.doc_id).unwrap(), 0.5));
    assert!(close(store.tfidf_score("tools", &b.doc_id).unwrap(), 1.0));
}

#[tokio::test]
async fn unchanged_document_costs_no_writes() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve("http://a.test/", &html("A", "stable words here"), M1);
    let options = IndexOptions::default();

    let first = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    let writes = store.write_count();
    let fetches = transport.fetch_count();

    let second = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    assert_eq!(second.state, DocumentState::UnchangedExisting);
    assert_eq!(second.doc_id, first.doc_id);
    assert_eq!(second.batches, 0);
    assert_eq!(store.write_count(), writes);
    assert_eq!(transport.fetch_count(), fetches);
    assert_eq!(store.document_frequency("stable").await.unwrap(), Some(1));
}

#[tokio::test]
async fn reindex_replaces_rows_and_corrects_document_frequency() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    let options = IndexOptions::default();
    transport.serve("http://a.test/", &html("Old", "alpha beta"), M1);
    transport.serve("http://b.test/", &html("B", "beta"), M1);
    index_documents(&store, &transport, &["http://a.test/", "http://b.test/"], &options).await;
    assert_eq!(store.document_frequency("beta").await.unwrap(), Some(2));

    transport.serve("http://a.test/", &html("New", "alpha alpha gamma"), M2);
    let outcome = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    assert_eq!(outcome.state, DocumentState::ChangedExisting);

    let id = outcome.doc_id.as_str();
    let doc = store.document_by_url("http://a.test/").unwrap();
    assert_eq!(doc.doc_id, id);
    assert_eq!(doc.title, "New");
    assert_eq!(doc.last_updated, M2);
    assert_eq!(doc.total_tokens, 3);

    assert_eq!(store.term_frequency("beta", id), None);
    assert_eq!(store.tfidf_score("beta", id), None);
    assert_eq!(store.term_frequency("alpha", id), Some(2));

    assert_eq!(store.document_frequency("alpha").await.unwrap(), Some(1));
    assert_eq!(store.document_frequency("beta").await.unwrap(), Some(1));
    assert_eq!(store.document_frequency("gamma").await.unwrap(), Some(1));

    let terms: Vec<String> = store.scores_for(id).into_iter().map(|(t, _)| t).collect();
    assert_eq!(terms, vec!["alpha".to_string(), "gamma".to_string()]);
    assert_eq!(store.document_count().await.unwrap(), 2);
}

#[tokio::test]
async fn cleared_title_is_written() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    let options = IndexOptions::default();
    transport.serve("http://a.test/", &html("Headline", "body text"), M1);
    index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();

    transport.serve("http://a.test/", "<html><body>body text</body></html>", M2);
    index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    assert_eq!(store.document_by_url("http://a.test/").unwrap().title, "");
}

#[tokio::test]
async fn missing_marker_on_change_keeps_previous_marker() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    let options = IndexOptions::default();
    transport.serve("http://a.test/", &html("A", "one"), M1);
    index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();

    transport.serve("http://a.test/", &html("A", "two"), "");
    let outcome = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    assert_eq!(outcome.state, DocumentState::ChangedExisting);
    let doc = store.document_by_url("http://a.test/").unwrap();
    assert_eq!(doc.last_updated, M1);
    assert_eq!(store.term_frequency("two", &doc.doc_id), Some(1));
}

#[tokio::test]
async fn twenty_three_terms_use_three_batches_per_phase() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    let words: Vec<String> = (0..23).map(|i| format!("w{:02}", i)).collect();
    transport.serve("http://a.test/", &html("", &words.join(" ")), M1);

    let outcome = index_document(&store, &transport, "http://a.test/", &IndexOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.terms, 23);
    // Term-frequency rows ride with their increments: 3 attribution + 3 score batches.
    assert_eq!(outcome.batches, 6);
    for table in [Table::TermFrequency, Table::DocumentFrequency, Table::TfIdfScores] {
        assert_eq!(store.batches_for(table), vec![10, 10, 3], "{}", table);
    }
    assert_eq!(store.scores_for(&outcome.doc_id).len(), 23);
    // document + 23 x 3 derived rows + marker
    assert_eq!(store.write_count(), 71);
}

#[tokio::test]
async fn unlogged_batches_produce_the_same_rows() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve("http://a.test/", &html("A", "one two three"), M1);
    let options = IndexOptions {
        batch_size: 2,
        batch_mode: BatchMode::Unlogged,
    };

    let outcome = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    assert_eq!(store.batches_for(Table::TermFrequency), vec![2, 1]);
    assert_eq!(store.scores_for(&outcome.doc_id).len(), 3);
}

#[tokio::test]
async fn probe_failure_skips_known_but_not_new_documents() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    let options = IndexOptions::default();
    transport.serve("http://known.test/", &html("K", "known"), M1);
    index_document(&store, &transport, "http://known.test/", &options)
        .await
        .unwrap();

    transport.serve("http://known.test/", &html("K", "changed"), M2);
    transport.break_probe("http://known.test/");
    transport.serve("http://new.test/", &html("N", "fresh"), M1);
    transport.break_probe("http://new.test/");
    let writes = store.write_count();

    let known = index_document(&store, &transport, "http://known.test/", &options)
        .await
        .unwrap();
    assert_eq!(known.state, DocumentState::UnchangedExisting);
    assert_eq!(store.write_count(), writes);

    let new = index_document(&store, &transport, "http://new.test/", &options)
        .await
        .unwrap();
    assert_eq!(new.state, DocumentState::New);
    assert_eq!(store.document_by_url("http://new.test/").unwrap().last_updated, "");
}

#[tokio::test]
async fn empty_body_is_a_parse_error_with_no_writes() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve("http://a.test/", "", M1);

    let err = index_document(&store, &transport, "http://a.test/", &IndexOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Parse(_)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn title_only_document_is_a_precondition_error() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve("http://a.test/", "<title>Only a title</title>", M1);

    let err = index_document(&store, &transport, "http://a.test/", &IndexOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Precondition(_)));
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.document_count().await.unwrap(), 0);
}

#[tokio::test]
async fn score_write_failure_names_the_table() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve("http://a.test/", &html("A", "partial write"), M1);
    store.fail_writes_to(Table::TfIdfScores);

    let err = index_document(&store, &transport, "http://a.test/", &IndexOptions::default())
        .await
        .unwrap_err();
    match &err {
        IndexError::StoreWrite { table, key, .. } => {
            assert_eq!(*table, Table::TfIdfScores);
            assert!(key.contains("term=partial"), "{}", key);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("tfidf_scores"));

    // Earlier tables stay written and the marker is withheld.
    let doc = store.document_by_url("http://a.test/").unwrap();
    assert_eq!(doc.last_updated, "");
    assert_eq!(store.term_frequency("partial", &doc.doc_id), Some(1));
    assert!(store.scores_for(&doc.doc_id).is_empty());

    // The source has not changed, yet the next run repairs the scores.
    store.clear_failures();
    let repaired = index_document(&store, &transport, "http://a.test/", &IndexOptions::default())
        .await
        .unwrap();
    assert_eq!(repaired.state, DocumentState::ChangedExisting);
    assert_eq!(store.scores_for(&doc.doc_id).len(), 2);
    assert_eq!(store.document_frequency("partial").await.unwrap(), Some(1));
    assert_eq!(store.document_by_url("http://a.test/").unwrap().last_updated, M1);
}

#[tokio::test]
async fn failed_term_write_is_retried_under_the_same_marker() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    let options = IndexOptions::default();
    transport.serve("http://a.test/", &html("A", "alpha beta"), M1);
    store.fail_writes_to(Table::TermFrequency);

    index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap_err();
    let id = store.document_by_url("http://a.test/").unwrap().doc_id;
    assert_eq!(store.term_frequency("alpha", &id), None);

    store.clear_failures();
    let rerun = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    assert_eq!(rerun.state, DocumentState::ChangedExisting);
    assert_eq!(rerun.doc_id, id);
    assert_eq!(store.term_frequency("alpha", &id), Some(1));
    assert_eq!(store.document_frequency("alpha").await.unwrap(), Some(1));
    assert_eq!(store.scores_for(&id).len(), 2);

    let settled = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    assert_eq!(settled.state, DocumentState::UnchangedExisting);
}

#[tokio::test]
async fn failed_document_frequency_write_is_healed_by_reindex() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    let options = IndexOptions::default();
    transport.serve("http://a.test/", &html("A", "alpha beta"), M1);
    transport.serve("http://b.test/", &html("B", "beta"), M1);
    index_document(&store, &transport, "http://b.test/", &options)
        .await
        .unwrap();
    store.fail_writes_to(Table::DocumentFrequency);

    let err = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IndexError::StoreWrite {
            table: Table::DocumentFrequency,
            ..
        }
    ));
    // No term is attributed without its increment.
    let id = store.document_by_url("http://a.test/").unwrap().doc_id;
    assert_eq!(store.term_frequency("alpha", &id), None);
    assert_eq!(store.document_frequency("alpha").await.unwrap(), None);
    assert_eq!(store.document_frequency("beta").await.unwrap(), Some(1));

    store.clear_failures();
    transport.serve("http://a.test/", &html("A", "alpha beta"), M2);
    let outcome = index_document(&store, &transport, "http://a.test/", &options)
        .await
        .unwrap();
    assert_eq!(outcome.state, DocumentState::ChangedExisting);
    assert_eq!(store.term_frequency("alpha", &id), Some(1));
    assert_eq!(store.document_frequency("alpha").await.unwrap(), Some(1));
    assert_eq!(store.document_frequency("beta").await.unwrap(), Some(2));
}

#[tokio::test]
async fn bare_less_than_in_text_keeps_following_words() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve(
        "http://a.test/",
        "<p>if a < b then stop</p><p>later paragraph words</p>",
        M1,
    );
    let outcome = index_document(&store, &transport, "http://a.test/", &IndexOptions::default())
        .await
        .unwrap();
    for term in ["b", "then", "stop", "later"] {
        assert_eq!(store.term_frequency(term, &outcome.doc_id), Some(1), "{}", term);
    }
}

#[tokio::test]
async fn run_continues_past_failures_in_order() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve("http://a.test/", &html("A", "first"), M1);
    transport.serve("http://c.test/", &html("C", "third"), M1);

    let urls = vec![
        "http://a.test/".to_string(),
        "http://missing.test/".to_string(),
        "http://c.test/".to_string(),
    ];
    let reports = index_documents(&store, &transport, &urls, &IndexOptions::default()).await;

    let order: Vec<&str> = reports.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(order, vec!["http://a.test/", "http://missing.test/", "http://c.test/"]);
    assert!(reports[0].result.is_ok());
    assert!(matches!(
        reports[1].result,
        Err(IndexError::Transport(TransportError::UnexpectedStatus { status: 404, .. }))
    ));
    assert!(reports[2].result.is_ok());
    assert_eq!(store.document_count().await.unwrap(), 2);
}

#[tokio::test]
async fn indexed_documents_are_searchable() {
    let store = InMemoryStore::new();
    let transport = FakeTransport::default();
    transport.serve("http://a.test/", &html("Tokio", "async runtime for rust"), M1);
    transport.serve("http://b.test/", &html("Serde", "serialization for rust"), M1);
    transport.serve("http://c.test/", &html("Axum", "web framework"), M1);
    index_documents(
        &store,
        &transport,
        &["http://a.test/", "http://b.test/", "http://c.test/"],
        &IndexOptions::default(),
    )
    .await;

    let hits = search(&store, "async rust", 10).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "http://a.test/");
    assert_eq!(hits[0].title, "Tokio");
    assert!(hits[0].score > hits[1].score);

    assert!(search(&store, "framework", 10).await.unwrap()[0].url == "http://c.test/");
}
