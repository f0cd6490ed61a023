use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::ValidatorError;

pub fn user_agent() -> String {
    format!("atlas-fetch/{}", env!("CARGO_PKG_VERSION"))
}

pub fn build_client<E>(timeout: Duration, map_err: E) -> Result<Client, ValidatorError>
where
    E: Fn(String) -> ValidatorError,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent()).map_err(|err| map_err(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| map_err(err.to_string()))
}

pub fn send_with_retries<F, E>(mut make_req: F, map_err: E) -> Result<Response, ValidatorError>
where
    F: FnMut() -> RequestBuilder,
    E: Fn(String) -> ValidatorError,
{
    const MAX_RETRIES: usize = 3;
    const BASE_DELAY_MS: u64 = 200;
    let mut attempt = 0usize;
    loop {
        match make_req().send() {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if attempt < MAX_RETRIES && is_retryable_status(status) {
                    thread::sleep(backoff(BASE_DELAY_MS, attempt));
                    attempt += 1;
                    continue;
                }
                return Ok(resp);
            }
            Err(err) => {
                if attempt < MAX_RETRIES && is_retryable_error(&err) {
                    thread::sleep(backoff(BASE_DELAY_MS, attempt));
                    attempt += 1;
                    continue;
                }
                return Err(map_err(err.to_string()));
            }
        }
    }
}

fn backoff(base_ms: u64, attempt: usize) -> Duration {
    Duration::from_millis(base_ms * (attempt as u64 + 1))
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
