use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

mod common;

use common::{http_response, spawn_http};

use atlas_fetch::domain::TaxonId;
use atlas_fetch::error::ValidatorError;
use atlas_fetch::sink::{Level, RecordingSink};
use atlas_fetch::taxonomy::{EutilsHttpClient, TaxonomyResolver, TaxonomySearch};

#[derive(Default)]
struct CountingSearch {
    calls: AtomicUsize,
    terms: Mutex<Vec<String>>,
}

impl CountingSearch {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TaxonomySearch for &CountingSearch {
    fn search(&self, term: &str) -> Result<Vec<String>, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.terms.lock().unwrap().push(term.to_string());
        match term {
            "Homo sapiens" => Ok(vec!["9606".to_string()]),
            "Influenza A virus  H1N1 " => Ok(vec!["114727".to_string(), "11320".to_string()]),
            "nonsense" => Ok(Vec::new()),
            "garbled" => Ok(vec!["abc".to_string()]),
            _ => Err(ValidatorError::TaxonomyHttp("connection refused".to_string())),
        }
    }
}

#[test]
fn mixed_sample_never_hits_network() {
    let search = CountingSearch::default();
    let mut resolver = TaxonomyResolver::new(&search);
    let sink = RecordingSink::new();

    for _ in 0..3 {
        assert_eq!(
            resolver.resolve(Some("Homo sapiens and Mus musculus"), &sink),
            Some(TaxonId::MIXED_SAMPLE)
        );
        assert_eq!(
            resolver.resolve(Some("Homo sapiens + Mus musculus"), &sink),
            Some(TaxonId::new(1427524))
        );
    }
    assert_eq!(search.calls(), 0);
    assert_eq!(resolver.cache_len(), 0);
    assert!(sink.lines().is_empty());
}

#[test]
fn successful_lookup_is_cached() {
    let search = CountingSearch::default();
    let mut resolver = TaxonomyResolver::new(&search);
    let sink = RecordingSink::new();

    assert_eq!(resolver.resolve(Some("Homo sapiens"), &sink), Some(TaxonId::new(9606)));
    assert_eq!(resolver.resolve(Some("Homo sapiens"), &sink), Some(TaxonId::new(9606)));
    assert_eq!(search.calls(), 1);
    assert_eq!(resolver.cached("Homo sapiens"), Some(TaxonId::new(9606)));
    assert_eq!(sink.count(Level::Info), 1);
}

#[test]
fn failed_lookup_is_retried_every_call() {
    let search = CountingSearch::default();
    let mut resolver = TaxonomyResolver::new(&search);
    let sink = RecordingSink::new();

    assert_eq!(resolver.resolve(Some("Unknown beast"), &sink), None);
    assert_eq!(resolver.resolve(Some("Unknown beast"), &sink), None);
    assert_eq!(search.calls(), 2);
    assert_eq!(resolver.cache_len(), 0);

    let errors = sink
        .lines()
        .into_iter()
        .filter(|line| line.level == Level::Error)
        .collect::<Vec<_>>();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].message.contains("Unknown beast"));
    assert!(errors[0].message.contains("connection refused"));
}

#[test]
fn empty_idlist_and_bad_ids_resolve_to_none() {
    let search = CountingSearch::default();
    let mut resolver = TaxonomyResolver::new(&search);
    let sink = RecordingSink::new();

    assert_eq!(resolver.resolve(Some("nonsense"), &sink), None);
    assert_eq!(resolver.resolve(Some("garbled"), &sink), None);
    assert_eq!(sink.count(Level::Error), 2);
}

#[test]
fn parentheses_are_stripped_but_cache_uses_original_name() {
    let search = CountingSearch::default();
    let mut resolver = TaxonomyResolver::new(&search);
    let sink = RecordingSink::new();

    let name = "Influenza A virus (H1N1)";
    assert_eq!(resolver.resolve(Some(name), &sink), Some(TaxonId::new(114727)));
    assert_eq!(
        search.terms.lock().unwrap().as_slice(),
        ["Influenza A virus  H1N1 ".to_string()]
    );
    assert_eq!(resolver.cached(name), Some(TaxonId::new(114727)));
    assert_eq!(resolver.cached("Influenza A virus  H1N1 "), None);
}

#[test]
fn empty_or_missing_name_is_unknown() {
    let search = CountingSearch::default();
    let mut resolver = TaxonomyResolver::new(&search);
    let sink = RecordingSink::new();

    assert_eq!(resolver.resolve(None, &sink), None);
    assert_eq!(resolver.resolve(Some(""), &sink), None);
    assert_eq!(search.calls(), 0);
}

fn query_pairs(target: &str) -> Vec<String> {
    target
        .split_once('?')
        .map(|(_, query)| query.split('&').map(str::to_string).collect())
        .unwrap_or_default()
}

#[test]
fn esearch_request_carries_taxonomy_query() {
    let server = spawn_http(|_| {
        http_response(
            "200 OK",
            &[("Content-Type", "application/json")],
            r#"{"header":{"type":"esearch"},"esearchresult":{"count":"1","idlist":["9606"]}}"#,
        )
    });
    let client = EutilsHttpClient::with_base_url(&server.url("http", "/entrez/eutils/esearch.fcgi"))
        .unwrap()
        .with_api_key(Some("abc123".to_string()));
    let mut resolver = TaxonomyResolver::new(client);
    let sink = RecordingSink::new();

    assert_eq!(
        resolver.resolve(Some("Homo sapiens (human)"), &sink),
        Some(TaxonId::new(9606))
    );

    let seen = server.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("/entrez/eutils/esearch.fcgi?"));
    let pairs = query_pairs(&seen[0]);
    assert!(pairs.contains(&"db=taxonomy".to_string()));
    assert!(pairs.contains(&"term=Homo+sapiens++human+".to_string()));
    assert!(pairs.contains(&"retmode=json".to_string()));
    assert!(pairs.contains(&"api_key=abc123".to_string()));
}

#[test]
fn esearch_without_api_key_omits_parameter() {
    let server = spawn_http(|_| {
        http_response("200 OK", &[], r#"{"esearchresult":{"idlist":["10090"]}}"#)
    });
    let client = EutilsHttpClient::with_base_url(&server.url("http", "/esearch.fcgi"))
        .unwrap()
        .with_api_key(None);

    assert_eq!(client.search("Mus musculus").unwrap(), vec!["10090".to_string()]);
    let pairs = query_pairs(&server.seen()[0]);
    assert!(pairs.iter().all(|pair| !pair.starts_with("api_key=")));
}

#[test]
fn esearch_error_status_resolves_to_none() {
    let server = spawn_http(|_| http_response("400 Bad Request", &[], "Invalid db name"));
    let client = EutilsHttpClient::with_base_url(&server.url("http", "/esearch.fcgi"))
        .unwrap()
        .with_api_key(None);
    let mut resolver = TaxonomyResolver::new(client);
    let sink = RecordingSink::new();

    assert_eq!(resolver.resolve(Some("Homo sapiens"), &sink), None);
    assert_eq!(server.seen().len(), 1);
    let errors = sink
        .lines()
        .into_iter()
        .filter(|line| line.level == Level::Error)
        .collect::<Vec<_>>();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("400"));
}
