use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::providers::retry::{Retryable, RetryPolicy, with_retry};

/// Integration failure against the upstream market data provider. Transport
/// failures (connect, timeout, non-2xx) are transient and eligible for
/// retry; an unusable payload is terminal. Callers only ever see this type,
/// never a raw transport error, and an empty result set is not an error.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("market data request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("market data response was not usable: {0}")]
    Decode(#[source] reqwest::Error),
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MarketDataError::Decode(err)
        } else {
            MarketDataError::Transport(err)
        }
    }
}

impl Retryable for MarketDataError {
    fn is_transient(&self) -> bool {
        matches!(self, MarketDataError::Transport(_))
    }
}

/// One sanitized search result. This is a deliberate whitelist boundary:
/// only these fields are ever forwarded from the upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub symbol: String,
    pub shortname: Option<String>,
    pub longname: Option<String>,
    pub exch: Option<String>,
    #[serde(rename = "exchDisp")]
    pub exch_disp: Option<String>,
    #[serde(rename = "typeDisp")]
    pub type_disp: Option<String>,
}

/// Typed subset of one upstream quote, keyed by normalized symbol in the
/// batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub symbol: String,
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,
    #[serde(rename = "longName")]
    pub long_name: Option<String>,
    pub currency: Option<String>,
    #[serde(rename = "regularMarketPrice")]
    pub regular_market_price: Option<f64>,
    #[serde(rename = "regularMarketChangePercent")]
    pub regular_market_change_percent: Option<f64>,
    #[serde(rename = "marketState")]
    pub market_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<RawSearchQuote>,
}

#[derive(Debug, Deserialize)]
struct RawSearchQuote {
    symbol: Option<String>,
    shortname: Option<String>,
    longname: Option<String>,
    exch: Option<String>,
    #[serde(rename = "exchDisp")]
    exch_disp: Option<String>,
    #[serde(rename = "typeDisp")]
    type_disp: Option<String>,
}

impl RawSearchQuote {
    /// Items without a symbol are dropped; symbols are upper-cased.
    fn sanitize(self) -> Option<SearchResult> {
        let symbol = self.symbol.as_deref().unwrap_or("").trim().to_uppercase();
        if symbol.is_empty() {
            return None;
        }
        Some(SearchResult {
            symbol,
            shortname: self.shortname,
            longname: self.longname,
            exch: self.exch,
            exch_disp: self.exch_disp,
            type_disp: self.type_disp,
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: Option<QuoteBody>,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(default)]
    result: Vec<RawQuote>,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    symbol: Option<String>,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
    #[serde(rename = "longName")]
    long_name: Option<String>,
    currency: Option<String>,
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "regularMarketChangePercent")]
    regular_market_change_percent: Option<f64>,
    #[serde(rename = "marketState")]
    market_state: Option<String>,
}

/// Normalizes, deduplicates and joins symbols for the batch quote request.
fn join_symbols(symbols: &[String]) -> String {
    let unique: BTreeSet<String> = symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    unique.into_iter().collect::<Vec<_>>().join(",")
}

/// Async client for the Yahoo Finance search and batch-quote endpoints.
///
/// Holds one persistent connection pool for its lifetime; the per-request
/// timeout and the retry policy come from configuration. The pool is
/// released when the client is dropped at shutdown.
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl YahooClient {
    pub fn new(base_url: &str, timeout: Duration, policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("invest-api/1.0")
            .timeout(timeout)
            .build()?;
        Ok(YahooClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            policy,
        })
    }

    /// Free-text search, capped upstream at `limit` results. A blank query
    /// returns an empty sequence without touching the network.
    #[instrument(name = "YahooSearch", skip(self, limit), fields(query = %query))]
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketDataError> {
        let q = query.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/finance/search", self.base_url);
        let limit_s = limit.to_string();
        debug!("Requesting asset search from {}", url);

        let response = with_retry(&self.policy, || async {
            let resp = self
                .client
                .get(&url)
                .query(&[("q", q), ("quotesCount", limit_s.as_str()), ("newsCount", "0")])
                .send()
                .await?
                .error_for_status()?;
            resp.json::<SearchResponse>()
                .await
                .map_err(MarketDataError::from)
        })
        .await?;

        Ok(response
            .quotes
            .into_iter()
            .filter_map(RawSearchQuote::sanitize)
            .collect())
    }

    /// Batch quotes for a set of symbols, keyed by normalized symbol.
    /// Empty input returns an empty mapping without a network call;
    /// upstream entries without a resolvable symbol are skipped.
    #[instrument(name = "YahooQuotes", skip(self, symbols))]
    pub async fn quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, QuoteRecord>, MarketDataError> {
        let joined = join_symbols(symbols);
        if joined.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/v7/finance/quote", self.base_url);
        debug!("Requesting quotes from {} for {}", url, joined);

        let envelope = with_retry(&self.policy, || async {
            let resp = self
                .client
                .get(&url)
                .query(&[("symbols", joined.as_str())])
                .send()
                .await?
                .error_for_status()?;
            resp.json::<QuoteEnvelope>()
                .await
                .map_err(MarketDataError::from)
        })
        .await?;

        let mut out = HashMap::new();
        let result = envelope.quote_response.map(|b| b.result).unwrap_or_default();
        for raw in result {
            let symbol = raw.symbol.as_deref().unwrap_or("").trim().to_uppercase();
            if symbol.is_empty() {
                continue;
            }
            out.insert(
                symbol.clone(),
                QuoteRecord {
                    symbol,
                    short_name: raw.short_name,
                    long_name: raw.long_name,
                    currency: raw.currency,
                    regular_market_price: raw.regular_market_price,
                    regular_market_change_percent: raw.regular_market_change_percent,
                    market_state: raw.market_state,
                },
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(4),
        )
    }

    fn client(base_url: &str) -> YahooClient {
        YahooClient::new(base_url, Duration::from_secs(2), fast_policy()).unwrap()
    }

    #[tokio::test]
    async fn search_sanitizes_and_uppercases_results() {
        let mock_server = MockServer::start().await;
        let body = r#"{
            "quotes": [
                {"symbol": "vale3.sa", "shortname": "Vale", "longname": "Vale S.A.",
                 "exch": "SAO", "exchDisp": "São Paulo", "typeDisp": "Equity",
                 "score": 99999, "isYahooFinance": true},
                {"shortname": "No symbol, dropped"},
                {"symbol": "  ", "shortname": "Blank symbol, dropped"},
                {"symbol": "VALE"}
            ]
        }"#;
        Mock::given(method("GET"))
            .and(path("/v1/finance/search"))
            .and(query_param("q", "vale"))
            .and(query_param("quotesCount", "5"))
            .and(query_param("newsCount", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let results = client(&mock_server.uri()).search("vale", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol, "VALE3.SA");
        assert_eq!(results[0].shortname.as_deref(), Some("Vale"));
        assert_eq!(results[0].exch_disp.as_deref(), Some("São Paulo"));
        assert_eq!(results[1].symbol, "VALE");
        assert!(results[1].shortname.is_none());
    }

    #[tokio::test]
    async fn blank_search_returns_empty_without_a_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&mock_server)
            .await;

        let results = client(&mock_server.uri()).search("   ", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_retries_transient_failures_then_surfaces_one_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/finance/search"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server.uri()).search("vale", 5).await;
        assert!(matches!(result, Err(MarketDataError::Transport(_))));
    }

    #[tokio::test]
    async fn search_does_not_retry_an_unusable_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/finance/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server.uri()).search("vale", 5).await;
        assert!(matches!(result, Err(MarketDataError::Decode(_))));
    }

    #[tokio::test]
    async fn quotes_normalizes_dedupes_and_batches_symbols() {
        let mock_server = MockServer::start().await;
        let body = r#"{
            "quoteResponse": {
                "result": [
                    {"symbol": "AAPL", "shortName": "Apple Inc.",
                     "currency": "USD", "regularMarketPrice": 190.5},
                    {"symbol": "msft", "regularMarketPrice": 420.0},
                    {"shortName": "No symbol, skipped"}
                ]
            }
        }"#;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .and(query_param("symbols", "AAPL,MSFT"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let symbols = vec![
            " aapl ".to_string(),
            "msft".to_string(),
            "AAPL".to_string(),
            "".to_string(),
        ];
        let out = client(&mock_server.uri()).quotes(&symbols).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out["AAPL"].regular_market_price, Some(190.5));
        assert_eq!(out["MSFT"].symbol, "MSFT");
    }

    #[tokio::test]
    async fn empty_quote_input_skips_the_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&mock_server)
            .await;

        let out = client(&mock_server.uri())
            .quotes(&[" ".to_string()])
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn join_symbols_sorts_and_dedupes() {
        let symbols = vec![
            "msft".to_string(),
            " AAPL ".to_string(),
            "aapl".to_string(),
        ];
        assert_eq!(join_symbols(&symbols), "AAPL,MSFT");
        assert_eq!(join_symbols(&[]), "");
    }
}
