use std::sync::{Arc, LazyLock};

use react_agent_core::Language;
use react_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use regex::Regex;
use reqwest::{Client, Url, header};
use serde::Deserialize;

/// The search endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://pt.wikipedia.org/w/api.php";

const USER_AGENT: &str = concat!("react-agent/", env!("CARGO_PKG_VERSION"));

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup pattern"));

#[derive(Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    snippet: String,
}

/// A tool for looking up general knowledge on Wikipedia.
///
/// The argument is used as the full-text search term and the snippet of the
/// best match is returned.
#[derive(Clone)]
pub struct WikipediaTool {
    client: Client,
    endpoint: Arc<str>,
    language: Language,
}

impl WikipediaTool {
    /// Creates a new tool querying [`DEFAULT_ENDPOINT`].
    #[inline]
    pub fn new(language: Language) -> Self {
        Self {
            client: Client::new(),
            endpoint: Arc::from(DEFAULT_ENDPOINT),
            language,
        }
    }

    /// Queries another MediaWiki API endpoint, e.g. a different language
    /// edition.
    #[inline]
    pub fn with_endpoint<S: AsRef<str>>(mut self, endpoint: S) -> Self {
        self.endpoint = Arc::from(endpoint.as_ref());
        self
    }
}

impl Default for WikipediaTool {
    #[inline]
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        match self.language {
            Language::English => {
                r#"
Wikipedia has current information about general knowledge. Returns a summary after searching Wikipedia.
ex: wikipedia: Django"#
            }
            Language::Portuguese => {
                r#"
A wikipedia possui informações atuais sobre conhecimentos gerais. Retorna um sumário após pesquisar na Wikipedia.
ex: wikipedia: Django"#
            }
        }
    }

    fn execute(
        &self,
        argument: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let endpoint = Arc::clone(&self.endpoint);
        async move { search(&client, &endpoint, argument.trim()).await }
    }
}

async fn search(client: &Client, endpoint: &str, term: &str) -> ToolResult {
    if term.is_empty() {
        return Err(ToolError::invalid_input().with_reason("empty search term"));
    }
    let url = Url::parse_with_params(
        endpoint,
        &[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", term),
            ("format", "json"),
        ],
    )
    .map_err(|err| {
        ToolError::lookup().with_reason(format!("invalid endpoint: {err}"))
    })?;

    debug!("searching wikipedia: {term}");
    let lookup_error =
        |err: reqwest::Error| ToolError::lookup().with_reason(format!("{err}"));
    let body = client
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(lookup_error)?
        .error_for_status()
        .map_err(lookup_error)?
        .text()
        .await
        .map_err(lookup_error)?;

    first_snippet(&body)
}

/// Picks the snippet of the first search hit, without highlight markup.
fn first_snippet(body: &str) -> ToolResult {
    let response: SearchResponse = serde_json::from_str(body).map_err(|err| {
        ToolError::lookup().with_reason(format!("malformed response: {err}"))
    })?;
    let hit = response
        .query
        .and_then(|query| query.search.into_iter().next())
        .ok_or_else(|| ToolError::lookup().with_reason("no results"))?;
    Ok(strip_markup(&hit.snippet))
}

fn strip_markup(snippet: &str) -> String {
    MARKUP
        .replace_all(snippet, "")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use httpmock::{Method::GET, MockServer};
    use react_agent_core::tool::ErrorKind;

    use super::*;

    #[test]
    fn test_first_snippet() {
        let body = r#"{
            "batchcomplete": "",
            "query": {
                "searchinfo": {"totalhits": 2},
                "search": [
                    {"ns": 0, "title": "França", "snippet": "A <span class=\"searchmatch\">França</span> é um país. Sua capital é Paris."},
                    {"ns": 0, "title": "Paris", "snippet": "Paris é a capital"}
                ]
            }
        }"#;
        assert_eq!(
            first_snippet(body).unwrap(),
            "A França é um país. Sua capital é Paris."
        );
    }

    #[test]
    fn test_no_results() {
        let body = r#"{"query": {"searchinfo": {"totalhits": 0}, "search": []}}"#;
        let err = first_snippet(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_eq!(err.reason(), "no results");

        let err = first_snippet(r#"{"error": {"code": "badvalue"}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_malformed_response() {
        let err = first_snippet("<html>Service unavailable</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("&quot;<span class=\"searchmatch\">Arcane</span>&quot; &amp; Riot"),
            "\"Arcane\" & Riot"
        );
    }

    #[tokio::test]
    async fn test_empty_term() {
        let tool = WikipediaTool::default();
        let err = tool.execute("   ".to_owned()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let tool = WikipediaTool::default().with_endpoint("not a url");
        let err = tool.execute("França".to_owned()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[tokio::test]
    async fn test_search_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/w/api.php")
                    .query_param("action", "query")
                    .query_param("list", "search")
                    .query_param("srsearch", "França")
                    .query_param("format", "json")
                    .header("user-agent", USER_AGENT);
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "query": {
                                "search": [{
                                    "title": "França",
                                    "snippet": "<span class=\"searchmatch\">França</span>, capital Paris"
                                }]
                            }
                        })
                        .to_string(),
                    );
            })
            .await;

        let tool = WikipediaTool::new(Language::Portuguese)
            .with_endpoint(server.url("/w/api.php"));
        let snippet = tool.execute("  França ".to_owned()).await.unwrap();
        assert_eq!(snippet, "França, capital Paris");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/w/api.php");
                then.status(503).body("Service unavailable");
            })
            .await;

        let tool = WikipediaTool::default().with_endpoint(server.url("/w/api.php"));
        let err = tool.execute("França".to_owned()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert!(err.reason().contains("503"), "{}", err.reason());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Nothing listens on the port once the listener is dropped.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let tool = WikipediaTool::default()
            .with_endpoint(format!("http://{addr}/w/api.php"));
        let err = tool.execute("França".to_owned()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }
}
