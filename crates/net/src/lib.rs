use log::debug;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

const USER_AGENT: &str = "chips/0.1";
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct FetchResult {
    pub url: String,           // final URL after redirects
    pub requested_url: String, // what we asked for
    pub status: Option<u16>,
    pub body: String,
    pub duration_ms: u128,
    pub error: Option<String>,
}

impl FetchResult {
    fn failed(requested_url: &str, status: Option<u16>, start: Instant, error: String) -> Self {
        FetchResult {
            url: requested_url.to_string(),
            requested_url: requested_url.to_string(),
            status,
            body: String::new(),
            duration_ms: start.elapsed().as_millis(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Retrieve `url` as text on a worker thread and hand the result to `cb`.
///
/// `http(s)` goes through a shared rustls-backed agent; `file://` reads from disk. Any
/// status outside 2xx is reported as an error.
pub fn fetch_text(url: String, cb: Arc<dyn Fn(FetchResult) + Send + Sync>) {
    thread::spawn(move || cb(fetch_text_blocking(&url)));
}

pub fn fetch_text_blocking(url: &str) -> FetchResult {
    let start = Instant::now();
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return FetchResult::failed(url, None, start, format!("invalid url: {e}")),
    };

    let result = match parsed.scheme() {
        "http" | "https" => fetch_http(url, start),
        "file" => fetch_file(&parsed, url, start),
        other => FetchResult::failed(url, None, start, format!("unsupported scheme `{other}`")),
    };
    debug!(
        "fetched {url} in {}ms ({})",
        result.duration_ms,
        result.error.as_deref().unwrap_or("ok")
    );
    result
}

fn fetch_http(url: &str, start: Instant) -> FetchResult {
    let agent = match agent() {
        Ok(a) => a,
        Err(e) => return FetchResult::failed(url, None, start, e.clone()),
    };

    let resp = match agent.get(url).call() {
        Ok(r) => r,
        Err(ureq::Error::Status(code, _)) => {
            return FetchResult::failed(url, Some(code), start, format!("HTTP status {code}"));
        }
        Err(e) => return FetchResult::failed(url, None, start, e.to_string()),
    };

    let status = resp.status();
    let final_url = resp.get_url().to_string();
    if !(200..300).contains(&status) {
        return FetchResult::failed(url, Some(status), start, format!("HTTP status {status}"));
    }

    match resp.into_string() {
        Ok(body) => FetchResult {
            url: final_url,
            requested_url: url.to_string(),
            status: Some(status),
            body,
            duration_ms: start.elapsed().as_millis(),
            error: None,
        },
        Err(e) => FetchResult::failed(url, Some(status), start, format!("body read error: {e}")),
    }
}

fn fetch_file(parsed: &Url, url: &str, start: Instant) -> FetchResult {
    let Ok(path) = parsed.to_file_path() else {
        return FetchResult::failed(url, None, start, "not a local file path".to_string());
    };
    match std::fs::read_to_string(&path) {
        Ok(body) => FetchResult {
            url: url.to_string(),
            requested_url: url.to_string(),
            status: None,
            body,
            duration_ms: start.elapsed().as_millis(),
            error: None,
        },
        Err(e) => FetchResult::failed(url, None, start, format!("{}: {e}", path.display())),
    }
}

/// One agent per process; loading the native root store is not free.
fn agent() -> &'static Result<ureq::Agent, String> {
    static AGENT: OnceLock<Result<ureq::Agent, String>> = OnceLock::new();
    AGENT.get_or_init(build_agent)
}

fn build_agent() -> Result<ureq::Agent, String> {
    let mut roots = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        debug!("skipping native cert source: {e}");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!("loaded {added} native roots ({ignored} ignored)");

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("tls config error: {e}"))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(ureq::AgentBuilder::new()
        .timeout(TIMEOUT)
        .user_agent(USER_AGENT)
        .tls_config(Arc::new(tls))
        .build())
}
