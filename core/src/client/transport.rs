/// HTTP exchange used by the session client
use crate::error::{Result, WatchError};
use reqwest::blocking::{Client, Response};
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub type Params = [(String, String)];

/// Blocking request/response seam between the client and the network.
///
/// Every method returns the response body of a 2xx exchange; transport
/// failures and other statuses are errors.
pub trait Transport {
    fn get(&mut self, url: &str) -> Result<String>;

    /// POST with `params` encoded in the query string
    fn post_query(&mut self, url: &str, params: &Params) -> Result<String>;

    /// POST with `params` as an urlencoded form body
    fn post_form(&mut self, url: &str, params: &Params) -> Result<String>;

    /// Value of a session cookie for `url`, as stored (still URL-encoded)
    fn cookie(&self, url: &str, name: &str) -> Option<String>;
}

/// reqwest-backed transport with a persistent cookie jar
pub struct HttpTransport {
    client: Client,
    jar: Arc<Jar>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(timeout)
            .user_agent(concat!("devwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WatchError::Http {
                context: "building HTTP client".to_string(),
                source: e,
            })?;
        Ok(Self { client, jar })
    }

    fn finish(context: String, sent: reqwest::Result<Response>) -> Result<String> {
        let response = sent
            .and_then(Response::error_for_status)
            .map_err(|e| WatchError::Http {
                context: context.clone(),
                source: e,
            })?;
        debug!("{} -> {}", context, response.status());
        response
            .text()
            .map_err(|e| WatchError::Http { context, source: e })
    }
}

impl Transport for HttpTransport {
    fn get(&mut self, url: &str) -> Result<String> {
        Self::finish(format!("GET {}", url), self.client.get(url).send())
    }

    fn post_query(&mut self, url: &str, params: &Params) -> Result<String> {
        Self::finish(
            format!("POST {}", url),
            self.client.post(url).query(params).send(),
        )
    }

    fn post_form(&mut self, url: &str, params: &Params) -> Result<String> {
        Self::finish(
            format!("POST {}", url),
            self.client.post(url).form(params).send(),
        )
    }

    fn cookie(&self, url: &str, name: &str) -> Option<String> {
        let url = url.parse::<reqwest::Url>().ok()?;
        let header = self.jar.cookies(&url)?;
        let header = header.to_str().ok()?;
        cookie_value(header, name).map(str::to_string)
    }
}

/// Find `name` in a `Cookie:` header value
pub(crate) fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value() {
        let header = "auth=abc; userinfo=__1a%3B%7B%22x%22%7D; other=1";
        assert_eq!(cookie_value(header, "userinfo"), Some("__1a%3B%7B%22x%22%7D"));
        assert_eq!(cookie_value(header, "missing"), None);
    }
}
