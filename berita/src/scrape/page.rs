use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde::Serialize;
use tracing::debug;

use crate::error::ScrapeError;

/// Browser user agent sent with every request.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can turn a URL into page HTML.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("id-ID,id;q=0.9,en;q=0.8"));
    headers
}

fn read_body(response: reqwest::blocking::Response) -> Result<String, ScrapeError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Api {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("request failed").to_string(),
        });
    }
    Ok(response.text()?)
}

/// Plain GET with browser-like headers.
pub struct DirectSource {
    client: Client,
}

impl DirectSource {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .timeout(TIMEOUT)
            .build()?;
        Ok(DirectSource { client })
    }
}

impl PageSource for DirectSource {
    fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        debug!(url, "GET");
        read_body(self.client.get(url).send()?)
    }
}

#[derive(Serialize)]
struct ContentRequest<'a> {
    url: &'a str,
    #[serde(rename = "userAgent")]
    user_agent: &'a str,
}

/// Renders pages in a headless browser behind a Browserless endpoint
/// (`POST {base}/content`), for result pages that need JavaScript.
pub struct BrowserlessSource {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl BrowserlessSource {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ScrapeError> {
        let client = Client::builder().timeout(TIMEOUT * 2).build()?;
        Ok(BrowserlessSource {
            client,
            endpoint: format!("{}/content", base_url.trim_end_matches('/')),
            token,
        })
    }
}

impl PageSource for BrowserlessSource {
    fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        debug!(url, endpoint = %self.endpoint, "render");
        let mut request = self.client.post(&self.endpoint).json(&ContentRequest {
            url,
            user_agent: USER_AGENT,
        });
        if let Some(token) = &self.token {
            request = request.query(&[("token", token)]);
        }
        read_body(request.send()?)
    }
}

/// Picks the renderer when an endpoint is configured, plain HTTP otherwise.
pub fn page_source(browserless_url: Option<&str>, token: Option<String>) -> Result<Box<dyn PageSource>, ScrapeError> {
    match browserless_url {
        Some(base) => Ok(Box::new(BrowserlessSource::new(base, token)?)),
        None => Ok(Box::new(DirectSource::new()?)),
    }
}

impl<T: PageSource + ?Sized> PageSource for Box<T> {
    fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        (**self).fetch(url)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// Serves canned pages; each URL can queue several responses.
    #[derive(Default)]
    pub struct FakeSource {
        pages: RefCell<HashMap<String, Vec<String>>>,
        pub requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        pub fn with_page(self, url: &str, html: &str) -> Self {
            self.pages.borrow_mut().entry(url.to_string()).or_default().push(html.to_string());
            self
        }
    }

    impl PageSource for FakeSource {
        fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
            self.requests.borrow_mut().push(url.to_string());
            let mut pages = self.pages.borrow_mut();
            match pages.get_mut(url) {
                Some(queue) if queue.len() > 1 => Ok(queue.remove(0)),
                Some(queue) if !queue.is_empty() => Ok(queue[0].clone()),
                _ => Err(ScrapeError::Api { status: 404, message: "Not Found".into() }),
            }
        }
    }

    #[test]
    fn test_fake_source_serves_queue_then_repeats_last() {
        let source = FakeSource::default().with_page("u", "a").with_page("u", "b");
        assert_eq!(source.fetch("u").unwrap(), "a");
        assert_eq!(source.fetch("u").unwrap(), "b");
        assert_eq!(source.fetch("u").unwrap(), "b");
        assert!(source.fetch("other").is_err());
    }
}
