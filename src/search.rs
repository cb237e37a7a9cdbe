//! # Search Module
//!
//! Multi-source web search with sequential fallback:
//! DuckDuckGo Instant Answer → Wikipedia summary → optional Serper.
//!
//! Every provider normalizes its backend to `Option<String>`: network
//! errors, malformed payloads, non-success statuses and empty results all
//! degrade to `None`. A provider outage must never abort the pipeline, so
//! nothing in this module returns an error to the caller.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config;

/// Returned when every provider comes up empty.
pub const NO_RESULT: &str = "No useful web result found.";

const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";
const WIKIPEDIA_SEARCH_URL: &str = "https://en.wikipedia.org/w/api.php";
const WIKIPEDIA_SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const SERPER_URL: &str = "https://google.serper.dev/search";

// =============================================================================
// PROVIDER TRAIT
// =============================================================================
/// One external search backend, normalized to present/absent plaintext.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name, used for logging the winning source.
    fn name(&self) -> &'static str;

    /// Query the backend. `None` means "found nothing or failed" —
    /// implementations swallow their own errors.
    async fn search(&self, query: &str) -> Option<String>;
}

// =============================================================================
// DUCKDUCKGO INSTANT ANSWER
// =============================================================================
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "Abstract")]
    abstract_text: String,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedTopic {
    // Topic groups in the feed carry "Name"/"Topics" instead of "Text";
    // those deserialize with an empty text and are filtered out below.
    #[serde(rename = "Text")]
    text: String,
}

/// DuckDuckGo Instant Answer API.
pub struct DuckDuckGo {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGo {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DUCKDUCKGO_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGo {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str) -> Option<String> {
        debug!(query = %query, "Querying DuckDuckGo instant answers");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_redirect", "1"),
                ("no_html", "1"),
            ])
            .send()
            .await
            .ok()?;

        let data: InstantAnswer = response.json().await.ok()?;

        if !data.abstract_text.is_empty() {
            return Some(data.abstract_text);
        }

        // Fall back to the first 3 related-topic snippets. They are joined
        // verbatim with no separator; downstream output depends on this
        // exact form, so keep it even though unrelated snippets can run
        // together illegibly.
        let snippets: Vec<&str> = data
            .related_topics
            .iter()
            .take(3)
            .map(|topic| topic.text.as_str())
            .filter(|text| !text.is_empty())
            .collect();

        if snippets.is_empty() {
            None
        } else {
            Some(snippets.concat())
        }
    }
}

// =============================================================================
// WIKIPEDIA SUMMARY
// =============================================================================
#[derive(Debug, Deserialize)]
struct WikiSearchEnvelope {
    query: WikiSearchBody,
}

#[derive(Debug, Deserialize)]
struct WikiSearchBody {
    search: Vec<WikiSearchHit>,
}

#[derive(Debug, Deserialize)]
struct WikiSearchHit {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WikiSummary {
    extract: Option<String>,
}

/// Wikipedia, in two steps: resolve the query to the best-matching article
/// title, then fetch that article's summary extract.
pub struct Wikipedia {
    client: reqwest::Client,
    search_url: String,
    summary_url: String,
}

impl Wikipedia {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            search_url: WIKIPEDIA_SEARCH_URL.to_string(),
            summary_url: WIKIPEDIA_SUMMARY_URL.to_string(),
        }
    }

    pub fn with_urls(
        mut self,
        search_url: impl Into<String>,
        summary_url: impl Into<String>,
    ) -> Self {
        self.search_url = search_url.into();
        self.summary_url = summary_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for Wikipedia {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn search(&self, query: &str) -> Option<String> {
        debug!(query = %query, "Querying Wikipedia search API");

        // Step 1: top-1 title match, no tie-break beyond Wikipedia's ranking.
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await
            .ok()?;

        let data: WikiSearchEnvelope = response.json().await.ok()?;
        let title = &data.query.search.first()?.title;

        // Step 2: summary by title. The REST endpoint expects underscores.
        let slug = urlencoding::encode(&title.replace(' ', "_")).into_owned();
        let summary_response = self
            .client
            .get(format!("{}/{}", self.summary_url, slug))
            .send()
            .await
            .ok()?;

        if !summary_response.status().is_success() {
            return None;
        }

        let summary: WikiSummary = summary_response.json().await.ok()?;
        summary.extract
    }
}

// =============================================================================
// SERPER (OPTIONAL GOOGLE-STYLE SEARCH)
// =============================================================================
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SerperResponse {
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SerperOrganic {
    snippet: Option<String>,
}

/// Serper search, active only while its API key is present in the
/// environment. The key is read on every call so the provider can be
/// enabled or disabled between pipeline runs without a restart.
pub struct Serper {
    client: reqwest::Client,
    base_url: String,
    key_var: String,
}

impl Serper {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: SERPER_URL.to_string(),
            key_var: config::SERPER_API_KEY_VAR.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override which environment variable holds the key (test isolation).
    pub fn with_key_var(mut self, key_var: impl Into<String>) -> Self {
        self.key_var = key_var.into();
        self
    }
}

#[async_trait]
impl SearchProvider for Serper {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(&self, query: &str) -> Option<String> {
        // No key, no request.
        let api_key = config::serper_api_key_from(&self.key_var)?;

        debug!(query = %query, "Querying Serper");

        let response = self
            .client
            .post(&self.base_url)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({ "q": query, "num": 5 }))
            .send()
            .await
            .ok()?;

        let data: SerperResponse = response.json().await.ok()?;
        data.organic.first()?.snippet.clone()
    }
}

// =============================================================================
// FALLBACK COORDINATOR
// =============================================================================
/// Tries providers in a fixed priority order and returns the first
/// non-empty result. First hit wins regardless of quality; later providers
/// are never invoked. If everything misses, returns the [`NO_RESULT`]
/// sentinel so the pipeline always has research text to work with.
pub struct WebSearchTool {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl WebSearchTool {
    /// The production provider chain: DuckDuckGo → Wikipedia → Serper.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            providers: vec![
                Box::new(DuckDuckGo::new(client.clone())),
                Box::new(Wikipedia::new(client.clone())),
                Box::new(Serper::new(client)),
            ],
        }
    }

    /// Build a coordinator over an explicit provider chain.
    pub fn with_providers(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    /// Resolve a query to research text, falling back through the chain.
    pub async fn run(&self, query: &str) -> String {
        for provider in &self.providers {
            if let Some(text) = provider.search(query).await {
                if !text.is_empty() {
                    // Surface the winning provider's raw text for operators.
                    info!(provider = provider.name(), result = %text, "Search succeeded");
                    return text;
                }
            }
        }

        info!(query = %query, "All search providers came up empty");
        NO_RESULT.to_string()
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> reqwest::Client {
        reqwest::Client::new()
    }

    /// Stub provider that records how often it was invoked.
    struct StubProvider {
        name: &'static str,
        result: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn new(name: &'static str, result: Option<&str>) -> (Box<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let stub = Box::new(Self {
                name,
                result: result.map(String::from),
                calls: calls.clone(),
            });
            (stub, calls)
        }
    }

    #[async_trait]
    impl SearchProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(&self, _query: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    // -------------------------------------------------------------------------
    // Coordinator ordering
    // -------------------------------------------------------------------------
    #[tokio::test]
    async fn first_provider_hit_short_circuits_the_rest() {
        let (a, a_calls) = StubProvider::new("a", Some("alpha result"));
        let (b, b_calls) = StubProvider::new("b", Some("beta result"));
        let (c, c_calls) = StubProvider::new("c", Some("gamma result"));
        let tool = WebSearchTool::with_providers(vec![a, b, c]);

        let result = tool.run("anything").await;

        assert_eq!(result, "alpha result");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_through_to_second_provider() {
        let (a, _) = StubProvider::new("a", None);
        let (b, _) = StubProvider::new("b", Some("beta result"));
        let (c, c_calls) = StubProvider::new("c", Some("gamma result"));
        let tool = WebSearchTool::with_providers(vec![a, b, c]);

        assert_eq!(tool.run("anything").await, "beta result");
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_string_counts_as_a_miss() {
        let (a, _) = StubProvider::new("a", Some(""));
        let (b, _) = StubProvider::new("b", Some("beta result"));
        let tool = WebSearchTool::with_providers(vec![a, b]);

        assert_eq!(tool.run("anything").await, "beta result");
    }

    #[tokio::test]
    async fn sentinel_when_every_provider_misses() {
        let (a, _) = StubProvider::new("a", None);
        let (b, _) = StubProvider::new("b", None);
        let (c, _) = StubProvider::new("c", None);
        let tool = WebSearchTool::with_providers(vec![a, b, c]);

        assert_eq!(tool.run("anything").await, "No useful web result found.");
    }

    // -------------------------------------------------------------------------
    // DuckDuckGo adapter
    // -------------------------------------------------------------------------
    #[tokio::test]
    async fn duckduckgo_prefers_the_abstract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "rust"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Abstract": "Rust is a systems programming language.",
                "RelatedTopics": [{"Text": "ignored"}]
            })))
            .mount(&server)
            .await;

        let provider = DuckDuckGo::new(test_client()).with_base_url(server.uri());
        assert_eq!(
            provider.search("rust").await,
            Some("Rust is a systems programming language.".to_string())
        );
    }

    #[tokio::test]
    async fn duckduckgo_concatenates_snippets_without_separator() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Abstract": "",
                "RelatedTopics": [
                    {"Text": "A."},
                    {"Text": "B."},
                    {"Text": "C."},
                    {"Text": "never taken"}
                ]
            })))
            .mount(&server)
            .await;

        let provider = DuckDuckGo::new(test_client()).with_base_url(server.uri());
        assert_eq!(provider.search("abc").await, Some("A.B.C.".to_string()));
    }

    #[tokio::test]
    async fn duckduckgo_skips_topic_groups_without_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Abstract": "",
                "RelatedTopics": [
                    {"Name": "See also", "Topics": []},
                    {"Text": "Only snippet."}
                ]
            })))
            .mount(&server)
            .await;

        let provider = DuckDuckGo::new(test_client()).with_base_url(server.uri());
        assert_eq!(provider.search("abc").await, Some("Only snippet.".to_string()));
    }

    #[tokio::test]
    async fn duckduckgo_absent_on_empty_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Abstract": "",
                "RelatedTopics": []
            })))
            .mount(&server)
            .await;

        let provider = DuckDuckGo::new(test_client()).with_base_url(server.uri());
        assert_eq!(provider.search("abc").await, None);
    }

    #[tokio::test]
    async fn duckduckgo_absent_on_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = DuckDuckGo::new(test_client()).with_base_url(server.uri());
        assert_eq!(provider.search("abc").await, None);
    }

    #[tokio::test]
    async fn duckduckgo_absent_on_connection_failure() {
        // Nothing listens here.
        let provider =
            DuckDuckGo::new(test_client()).with_base_url("http://127.0.0.1:1/instant");
        assert_eq!(provider.search("abc").await, None);
    }

    // -------------------------------------------------------------------------
    // Wikipedia adapter
    // -------------------------------------------------------------------------
    fn wikipedia_at(server: &MockServer) -> Wikipedia {
        Wikipedia::new(test_client()).with_urls(
            format!("{}/w/api.php", server.uri()),
            format!("{}/api/rest_v1/page/summary", server.uri()),
        )
    }

    #[tokio::test]
    async fn wikipedia_resolves_title_then_fetches_extract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("srsearch", "quantum computing"))
            .and(query_param("srlimit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"search": [{"title": "Quantum computing"}]}
            })))
            .mount(&server)
            .await;
        // Spaces in the title become underscores in the summary path.
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Quantum_computing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "extract": "Quantum computing uses qubits."
            })))
            .mount(&server)
            .await;

        let provider = wikipedia_at(&server);
        assert_eq!(
            provider.search("quantum computing").await,
            Some("Quantum computing uses qubits.".to_string())
        );
    }

    #[tokio::test]
    async fn wikipedia_absent_when_search_has_no_matches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"search": []}
            })))
            .mount(&server)
            .await;

        let provider = wikipedia_at(&server);
        assert_eq!(provider.search("xyzzyplugh12345").await, None);
    }

    #[tokio::test]
    async fn wikipedia_absent_when_summary_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"search": [{"title": "Missing"}]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "title": "Not found."
            })))
            .mount(&server)
            .await;

        let provider = wikipedia_at(&server);
        assert_eq!(provider.search("missing").await, None);
    }

    // -------------------------------------------------------------------------
    // Serper adapter
    // -------------------------------------------------------------------------
    #[tokio::test]
    async fn serper_never_calls_out_without_a_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organic": []})))
            .expect(0)
            .mount(&server)
            .await;

        let provider = Serper::new(test_client())
            .with_base_url(server.uri())
            .with_key_var("SERPER_TEST_KEY_NEVER_SET");

        assert_eq!(provider.search("anything").await, None);
        // Mock expectation (zero requests) verified on drop.
    }

    #[tokio::test]
    async fn serper_returns_first_organic_snippet() {
        let var = "SERPER_TEST_KEY_FIRST_SNIPPET";
        std::env::set_var(var, "secret-key");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-API-KEY", "secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organic": [
                    {"snippet": "First snippet."},
                    {"snippet": "Second snippet."}
                ]
            })))
            .mount(&server)
            .await;

        let provider = Serper::new(test_client())
            .with_base_url(server.uri())
            .with_key_var(var);

        assert_eq!(
            provider.search("anything").await,
            Some("First snippet.".to_string())
        );
        std::env::remove_var(var);
    }

    #[tokio::test]
    async fn serper_absent_when_no_organic_results() {
        let var = "SERPER_TEST_KEY_NO_ORGANIC";
        std::env::set_var(var, "secret-key");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organic": []})))
            .mount(&server)
            .await;

        let provider = Serper::new(test_client())
            .with_base_url(server.uri())
            .with_key_var(var);

        assert_eq!(provider.search("anything").await, None);
        std::env::remove_var(var);
    }
}
