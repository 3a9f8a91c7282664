pub mod retry;
pub mod yahoo;

pub use retry::{Retryable, RetryPolicy, with_retry};
pub use yahoo::{MarketDataError, QuoteRecord, SearchResult, YahooClient};
