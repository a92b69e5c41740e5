// Transport layer: the blocking HTTP plumbing behind the API client.
// `HttpTransport` is the real implementation built on reqwest's blocking
// client with a shared cookie jar; tests swap in an in-memory fake.

use crate::config::Config;
use crate::error::{LanzouError, Result};
use indicatif::ProgressBar;
use reqwest::blocking::{multipart, Client};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::Url;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.39 (KHTML, like Gecko) Chrome/89.0.4389.111 Safari/537.39";

/// Status code and body of a finished request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    #[cfg(test)]
    pub(crate) fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A form-encoded POST.
#[derive(Debug, Clone)]
pub struct FormRequest<'a> {
    pub url: &'a str,
    pub fields: Vec<(&'static str, String)>,
    pub headers: Vec<(&'static str, String)>,
    pub follow_redirects: bool,
}

impl<'a> FormRequest<'a> {
    pub fn new(url: &'a str, fields: Vec<(&'static str, String)>) -> Self {
        Self {
            url,
            fields,
            headers: Vec::new(),
            follow_redirects: true,
        }
    }
}

/// A multipart POST carrying one local file plus text fields.
#[derive(Clone)]
pub struct UploadRequest<'a> {
    pub url: &'a str,
    pub fields: Vec<(&'static str, String)>,
    pub file_field: &'static str,
    pub path: &'a Path,
    pub file_name: String,
    /// Advanced as the file is read into the request body.
    pub progress: ProgressBar,
}

/// The HTTP operations the API client needs. All requests issued through
/// one transport share a single cookie jar.
pub trait Transport {
    fn post_form(&self, request: FormRequest<'_>) -> Result<HttpReply>;

    fn post_multipart(&self, request: UploadRequest<'_>) -> Result<HttpReply>;

    fn get(&self, url: &str) -> Result<HttpReply>;

    /// Snapshot of the cookie jar as a flat name → value map.
    fn export_cookies(&self) -> BTreeMap<String, String>;

    /// Merge `cookies` into the jar.
    fn import_cookies(&self, cookies: &BTreeMap<String, String>);
}

/// reqwest-backed transport.
///
/// Two clients share one jar: the login endpoint must not follow redirects,
/// every other call uses the default redirect policy.
pub struct HttpTransport {
    client: Client,
    no_redirect: Client,
    jar: Arc<Jar>,
    /// Origins whose cookies are persisted and restored.
    cookie_urls: Vec<Url>,
    upload_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| LanzouError::Config(format!("invalid URL {}: {}", raw, e)))
        };
        let cookie_urls = vec![parse(&config.base_url)?, parse(&config.login_url)?];

        let jar = Arc::new(Jar::default());
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        let no_redirect = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            no_redirect,
            jar,
            cookie_urls,
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
        })
    }
}

fn into_reply(response: reqwest::blocking::Response) -> Result<HttpReply> {
    let status = response.status().as_u16();
    let body = response.text()?;
    Ok(HttpReply { status, body })
}

impl Transport for HttpTransport {
    fn post_form(&self, request: FormRequest<'_>) -> Result<HttpReply> {
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect
        };
        let mut builder = client.post(request.url).form(&request.fields);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        debug!(url = request.url, "POST form");
        into_reply(builder.send()?)
    }

    fn post_multipart(&self, request: UploadRequest<'_>) -> Result<HttpReply> {
        let file = File::open(request.path)?;
        let len = file.metadata()?.len();
        request.progress.set_length(len);

        let reader = request.progress.wrap_read(file);
        let part = multipart::Part::reader_with_length(reader, len)
            .file_name(request.file_name)
            .mime_str("application/octet-stream")?;
        let form = request
            .fields
            .into_iter()
            .fold(multipart::Form::new(), |form, (name, value)| form.text(name, value))
            .part(request.file_field, part);

        debug!(url = request.url, bytes = len, "POST multipart");
        let response = self
            .client
            .post(request.url)
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()?;
        request.progress.finish_and_clear();
        into_reply(response)
    }

    fn get(&self, url: &str) -> Result<HttpReply> {
        debug!(url, "GET");
        into_reply(self.client.get(url).send()?)
    }

    fn export_cookies(&self) -> BTreeMap<String, String> {
        let mut cookies = BTreeMap::new();
        for url in &self.cookie_urls {
            let Some(header) = self.jar.cookies(url) else {
                continue;
            };
            let Ok(raw) = header.to_str() else {
                continue;
            };
            cookies.extend(parse_cookie_header(raw));
        }
        cookies
    }

    fn import_cookies(&self, cookies: &BTreeMap<String, String>) {
        for url in &self.cookie_urls {
            for (name, value) in cookies {
                self.jar.add_cookie_str(&format!("{}={}; Path=/", name, value), url);
            }
        }
    }
}

/// Split a `Cookie:` header value (`a=1; b=2`) into pairs.
pub fn parse_cookie_header(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_is_split_into_pairs() {
        let cookies = parse_cookie_header("phpdisk_info=abc%3D%3D; ylogin=1234;  uag=x=y");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies["phpdisk_info"], "abc%3D%3D");
        assert_eq!(cookies["ylogin"], "1234");
        assert_eq!(cookies["uag"], "x=y");
    }

    #[test]
    fn cookie_header_skips_garbage() {
        let cookies = parse_cookie_header("novalue; =orphan; ok=1");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies["ok"], "1");
    }

    #[test]
    fn jar_round_trips_through_http_transport() {
        let transport = HttpTransport::new(&Config::default()).unwrap();
        let mut cookies = BTreeMap::new();
        cookies.insert("phpdisk_info".to_string(), "token".to_string());
        cookies.insert("ylogin".to_string(), "42".to_string());

        transport.import_cookies(&cookies);

        assert_eq!(transport.export_cookies(), cookies);
    }
}
