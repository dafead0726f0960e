//! Default tools: web search, encyclopedia lookup, calculator, statistics.
//!
//! | Tool | Category | Priority | Fallbacks |
//! |------|----------|----------|-----------|
//! | [`WebSearch`] | search | 10 | encyclopedia |
//! | [`Encyclopedia`] | knowledge | 8 | web-search |
//! | [`Calculator`] | computation | 9 | (none) |
//! | [`Statistics`] | computation | 7 | calculator |

use std::time::Duration;

use tracing::debug;

use super::core::{
    DEFAULT_MAX_RESULT_BYTES, Tool, ToolCategory, ToolDescriptor, ToolFuture, truncate_result,
};
use super::expr;
use super::names::{CALCULATOR, ENCYCLOPEDIA, NO_RESULTS, STATISTICS, WEB_SEARCH};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Results requested per web search.
const SEARCH_RESULT_COUNT: u32 = 5;
const USER_AGENT: &str = concat!("routewise/", env!("CARGO_PKG_VERSION"), " (research bot)");

fn http_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| e.to_string())
}

// ── WebSearch ──────────────────────────────────────────────────────

/// Web search through the Brave Search API.
///
/// Returns [`NO_RESULTS`] when the provider answers with an empty result
/// list, so the caller can tell "nothing found" apart from a failure.
pub struct WebSearch {
    api_key: Option<String>,
    max_result_bytes: usize,
}

impl WebSearch {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
        }
    }
}

impl Tool for WebSearch {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            WEB_SEARCH,
            "Search the web for current information, news, and recent events",
            ToolCategory::Search,
        )
        .priority(10)
        .keywords(&["search", "web", "current", "news", "recent", "online", "internet"])
        .fallbacks(&[ENCYCLOPEDIA])
    }

    fn invoke(&self, input: &str) -> ToolFuture<'_> {
        let query = input.trim().to_string();
        Box::pin(async move {
            let api_key = self.api_key.as_deref().ok_or_else(|| {
                "BRAVE_SEARCH_KEY is not set. \
                 Get a free API key at https://brave.com/search/api/"
                    .to_string()
            })?;
            let results = brave_search(api_key, &query, SEARCH_RESULT_COUNT)
                .await
                .map_err(|e| format!("web search failed: {e}"))?;
            if results.is_empty() {
                debug!("Brave returned no results for '{query}'");
                return Ok(NO_RESULTS.to_string());
            }
            Ok(truncate_result(results, self.max_result_bytes))
        })
    }
}

async fn brave_search(api_key: &str, query: &str, count: u32) -> Result<String, String> {
    let client = http_client()?;
    let url = format!(
        "https://api.search.brave.com/res/v1/web/search?q={}&count={count}",
        urlencoded(query),
    );
    let resp = client
        .get(&url)
        .header("X-Subscription-Token", api_key)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("HTTP {status}: {body}"));
    }

    let body: serde_json::Value = resp
        .json()
        .await
        .map_err(|e: reqwest::Error| e.to_string())?;
    Ok(format_brave_results(&body))
}

/// Numbered list of title, URL, snippet. Empty when there are no results.
fn format_brave_results(body: &serde_json::Value) -> String {
    let Some(results) = body["web"]["results"].as_array() else {
        return String::new();
    };
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let title = r["title"].as_str().unwrap_or("");
            let url = r["url"].as_str().unwrap_or("");
            let snippet = r["description"].as_str().unwrap_or("");
            let mut entry = format!("{}. {title}\n   {url}", i + 1);
            if !snippet.is_empty() {
                entry.push_str(&format!("\n   {snippet}"));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── Encyclopedia ───────────────────────────────────────────────────

const WIKIPEDIA_REST: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";

/// Encyclopedic lookup against Wikipedia.
///
/// Tries the page summary for the query as a title first; if there is no
/// such page, runs a search and summarizes the first hit.
pub struct Encyclopedia {
    rest_base: String,
    api_base: String,
}

impl Default for Encyclopedia {
    fn default() -> Self {
        Self::new()
    }
}

impl Encyclopedia {
    pub fn new() -> Self {
        Self {
            rest_base: WIKIPEDIA_REST.to_string(),
            api_base: WIKIPEDIA_API.to_string(),
        }
    }

    async fn summary(&self, client: &reqwest::Client, title: &str) -> Result<Option<String>, String> {
        let url = format!("{}/{}", self.rest_base, encode_path_segment(title));
        let resp = client.get(&url).send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            debug!("No encyclopedia summary for '{title}' (HTTP {})", resp.status());
            return Ok(None);
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e: reqwest::Error| e.to_string())?;
        Ok(Some(format_summary(&body)))
    }

    async fn first_search_hit(&self, client: &reqwest::Client, query: &str) -> Result<Option<String>, String> {
        let url = format!(
            "{}?action=query&list=search&srsearch={}&format=json&srlimit=1",
            self.api_base,
            urlencoded(query)
        );
        let resp = client.get(&url).send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("search failed with HTTP {}", resp.status()));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e: reqwest::Error| e.to_string())?;
        Ok(body["query"]["search"][0]["title"]
            .as_str()
            .map(str::to_string))
    }
}

impl Tool for Encyclopedia {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            ENCYCLOPEDIA,
            "Look up structured, encyclopedic knowledge on Wikipedia",
            ToolCategory::Knowledge,
        )
        .priority(8)
        .keywords(&["wikipedia", "definition", "explain", "encyclopedia", "knowledge", "facts"])
        .fallbacks(&[WEB_SEARCH])
    }

    fn invoke(&self, input: &str) -> ToolFuture<'_> {
        let query = input.trim().to_string();
        Box::pin(async move {
            if query.is_empty() {
                return Err("encyclopedia lookup needs a topic".to_string());
            }
            let client = http_client()?;
            if let Some(summary) = self.summary(&client, &query).await? {
                return Ok(summary);
            }
            let title = self
                .first_search_hit(&client, &query)
                .await?
                .ok_or_else(|| format!("No encyclopedia articles found for '{query}'"))?;
            self.summary(&client, &title)
                .await?
                .ok_or_else(|| format!("Found article \"{title}\" but couldn't retrieve its content"))
        })
    }
}

/// Render a page summary as markdown, or a disambiguation notice.
fn format_summary(page: &serde_json::Value) -> String {
    let title = page["title"].as_str().unwrap_or("");
    let extract = page["extract"].as_str().unwrap_or("");
    if page["type"].as_str() == Some("disambiguation") {
        return format!(
            "\"{title}\" is a disambiguation page. Please be more specific. \
             Some options include: {extract}"
        );
    }
    let mut out = format!("**{title}**\n\n");
    if !extract.is_empty() {
        out.push_str(extract);
        out.push_str("\n\n");
    }
    if let Some(url) = page["content_urls"]["desktop"]["page"].as_str() {
        out.push_str(&format!("Source: {url}"));
    }
    out.trim_end().to_string()
}

// ── Calculator ─────────────────────────────────────────────────────

/// Arithmetic over `+ - * / ^ %`, parentheses, common functions, `pi`, `e`.
///
/// Prose around the expression is ignored, so "calculate 5 + 3" works.
pub struct Calculator;

impl Tool for Calculator {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            CALCULATOR,
            "Evaluate mathematical expressions and numerical computations",
            ToolCategory::Computation,
        )
        .priority(9)
        .keywords(&["calculate", "math", "compute", "arithmetic", "equation", "formula"])
    }

    fn invoke(&self, input: &str) -> ToolFuture<'_> {
        let expression = expr::strip_prose(input);
        Box::pin(async move {
            let value = expr::evaluate(&expression)
                .map_err(|e| format!("Invalid mathematical expression '{expression}': {e}"))?;
            Ok(format!("Result: {}", expr::format_number(value)))
        })
    }
}

// ── Statistics ─────────────────────────────────────────────────────

/// Descriptive statistics over a list of numbers.
///
/// Accepts comma-separated numbers or a JSON array.
pub struct Statistics;

impl Tool for Statistics {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            STATISTICS,
            "Calculate statistical measures (mean, median, standard deviation) for datasets",
            ToolCategory::Computation,
        )
        .priority(7)
        .keywords(&["statistics", "mean", "median", "average", "data", "analysis"])
        .fallbacks(&[CALCULATOR])
    }

    fn invoke(&self, input: &str) -> ToolFuture<'_> {
        let parsed = parse_numbers(input);
        Box::pin(async move {
            let numbers = parsed?;
            Ok(Summary::of(&numbers).to_string())
        })
    }
}

fn parse_numbers(input: &str) -> Result<Vec<f64>, String> {
    let input = input.trim();
    let numbers = if input.starts_with('[') && input.ends_with(']') {
        serde_json::from_str::<Vec<f64>>(input).map_err(|e| format!("invalid JSON array: {e}"))?
    } else {
        input
            .split(',')
            .map(|n| n.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                "Invalid input. Please provide numbers separated by commas or as a JSON array."
                    .to_string()
            })?
    };
    if numbers.is_empty() {
        return Err("no numbers to analyze".to_string());
    }
    if numbers.iter().any(|n| !n.is_finite()) {
        return Err("numbers must be finite".to_string());
    }
    Ok(numbers)
}

#[derive(Debug, Clone, PartialEq)]
struct Summary {
    count: usize,
    sum: f64,
    mean: f64,
    median: f64,
    variance: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl Summary {
    /// Population statistics. `numbers` must be non-empty.
    fn of(numbers: &[f64]) -> Self {
        let count = numbers.len();
        let n = count as f64;
        let sum: f64 = numbers.iter().sum();
        let mean = sum / n;

        let mut sorted = numbers.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        let variance = numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Self {
            count,
            sum,
            mean,
            median,
            variance,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[count - 1],
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Statistical Analysis:")?;
        writeln!(f, "Count: {}", self.count)?;
        writeln!(f, "Sum: {:.2}", self.sum)?;
        writeln!(f, "Mean: {:.2}", self.mean)?;
        writeln!(f, "Median: {:.2}", self.median)?;
        writeln!(f, "Standard Deviation: {:.2}", self.std_dev)?;
        writeln!(f, "Variance: {:.2}", self.variance)?;
        writeln!(f, "Min: {}", expr::format_number(self.min))?;
        writeln!(f, "Max: {}", expr::format_number(self.max))?;
        write!(f, "Range: {:.2}", self.max - self.min)
    }
}

// ── Shared helpers ─────────────────────────────────────────────────

/// Minimal percent-encoding for URL query parameters.
fn urlencoded(s: &str) -> String {
    encode(s, true)
}

/// Percent-encoding for a single URL path segment.
fn encode_path_segment(s: &str) -> String {
    encode(s, false)
}

fn encode(s: &str, space_as_plus: bool) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' if space_as_plus => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn calculator_strips_prose() {
        assert_eq!(Calculator.invoke("Calculate 5 + 3").await, Ok("Result: 8".into()));
        assert_eq!(
            Calculator.invoke("what is sqrt(16) * 2.5?").await,
            Ok("Result: 10".into())
        );
    }

    #[tokio::test]
    async fn calculator_rejects_non_math() {
        let err = Calculator.invoke("tell me about gravity").await.unwrap_err();
        assert!(err.starts_with("Invalid mathematical expression"), "{err}");
    }

    #[tokio::test]
    async fn calculator_rejects_deeply_nested_input() {
        let query = format!("calculate {}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = Calculator.invoke(&query).await.unwrap_err();
        assert!(err.ends_with("expression nested too deeply"));
    }

    #[tokio::test]
    async fn statistics_from_csv() {
        let out = Statistics.invoke("1, 2, 3, 4").await.unwrap();
        assert!(out.contains("Count: 4"));
        assert!(out.contains("Sum: 10.00"));
        assert!(out.contains("Mean: 2.50"));
        assert!(out.contains("Median: 2.50"));
        assert!(out.contains("Variance: 1.25"));
        assert!(out.contains("Min: 1"));
        assert!(out.contains("Max: 4"));
        assert!(out.contains("Range: 3.00"));
    }

    #[tokio::test]
    async fn statistics_from_json_array() {
        let out = Statistics.invoke("[2, 4, 4, 4, 5, 5, 7, 9]").await.unwrap();
        assert!(out.contains("Mean: 5.00"));
        assert!(out.contains("Standard Deviation: 2.00"));
        assert!(out.contains("Median: 4.50"));
    }

    #[tokio::test]
    async fn statistics_rejects_text() {
        assert!(Statistics.invoke("one, two").await.is_err());
        assert!(Statistics.invoke("[]").await.is_err());
    }

    #[tokio::test]
    async fn web_search_without_key_fails() {
        let err = WebSearch::new(None).invoke("rust").await.unwrap_err();
        assert!(err.contains("BRAVE_SEARCH_KEY"));
    }

    #[test]
    fn descriptors_match_default_metadata() {
        let search = WebSearch::new(None).descriptor();
        assert_eq!(search.priority, 10);
        assert_eq!(search.fallback_chain, vec![ENCYCLOPEDIA]);
        assert!(search.keywords.contains("news"));

        let stats = Statistics.descriptor();
        assert_eq!(stats.category, ToolCategory::Computation);
        assert_eq!(stats.fallback_chain, vec![CALCULATOR]);
        assert!(Calculator.descriptor().fallback_chain.is_empty());
        assert_eq!(Encyclopedia::new().descriptor().priority, 8);
    }

    #[test]
    fn brave_results_format() {
        let body = json!({"web": {"results": [
            {"title": "Rust", "url": "https://rust-lang.org", "description": "A language"},
            {"title": "Crates", "url": "https://crates.io"}
        ]}});
        let out = format_brave_results(&body);
        assert!(out.starts_with("1. Rust\n   https://rust-lang.org\n   A language"));
        assert!(out.contains("2. Crates\n   https://crates.io"));
        assert!(format_brave_results(&json!({"web": {"results": []}})).is_empty());
        assert!(format_brave_results(&json!({})).is_empty());
    }

    #[test]
    fn summary_format() {
        let page = json!({
            "title": "Gravity",
            "extract": "Gravity is a force.",
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Gravity"}}
        });
        assert_eq!(
            format_summary(&page),
            "**Gravity**\n\nGravity is a force.\n\nSource: https://en.wikipedia.org/wiki/Gravity"
        );

        let disamb = json!({"type": "disambiguation", "title": "Mercury", "extract": "planet, element"});
        assert!(format_summary(&disamb).contains("disambiguation page"));
    }

    #[test]
    fn encoding() {
        assert_eq!(urlencoded("a b&c"), "a+b%26c");
        assert_eq!(encode_path_segment("Albert Einstein"), "Albert%20Einstein");
        assert_eq!(encode_path_segment("C++"), "C%2B%2B");
    }
}
