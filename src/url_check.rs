use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

use crate::error::ValidatorError;
use crate::http::build_client;
use crate::sink::LogSink;

pub const DEFAULT_RETRIES: u32 = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

const FTP_PORT: u16 = 21;
const FTP_USER: &str = "anonymous";
const FTP_PASSWORD: &str = "anonymous@";

/// Opens a URL without downloading it.
///
/// Failures the checker should retry are reported as
/// [`ValidatorError::Unreachable`]; anything else aborts the check.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), ValidatorError>;
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Clone)]
pub struct HttpUrlOpener {
    client: Client,
    timeout: Duration,
}

impl HttpUrlOpener {
    pub fn new() -> Result<Self, ValidatorError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ValidatorError> {
        let client = build_client(timeout, ValidatorError::HttpClient)?;
        Ok(Self { client, timeout })
    }

    fn open_http(&self, url: &Url) -> Result<(), ValidatorError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|err| unreachable(url, err.to_string()))?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(unreachable(url, format!("HTTP Error {}", status.as_u16())));
        }
        Ok(())
    }

    /// Logs in anonymously and asks for the path: `SIZE` for files, `CWD`
    /// for directories. Any negative reply makes the resource unreachable.
    fn open_ftp(&self, url: &Url) -> Result<(), ValidatorError> {
        let addrs = url
            .socket_addrs(|| Some(FTP_PORT))
            .map_err(|err| unreachable(url, err.to_string()))?;
        let addr = addrs
            .first()
            .ok_or_else(|| unreachable(url, "host did not resolve".to_string()))?;
        let path = urlencoding::decode(url.path())
            .map_err(|err| unreachable(url, err.to_string()))?
            .into_owned();

        let mut ftp = FtpStream::connect_timeout(*addr, self.timeout)
            .map_err(|err| unreachable(url, err.to_string()))?;
        ftp.get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|err| unreachable(url, err.to_string()))?;
        ftp.set_mode(Mode::ExtendedPassive);

        let result = ftp_check_path(&mut ftp, &path).map_err(|err| unreachable(url, err));
        let _ = ftp.quit();
        result
    }
}

fn ftp_check_path(ftp: &mut FtpStream, path: &str) -> Result<(), String> {
    ftp.login(FTP_USER, FTP_PASSWORD)
        .map_err(|err| format!("FTP login failed: {err}"))?;
    ftp.transfer_type(FileType::Binary)
        .map_err(|err| format!("FTP binary mode failed: {err}"))?;

    if path.is_empty() || path == "/" {
        return Ok(());
    }
    if !path.ends_with('/') && ftp.size(path).is_ok() {
        return Ok(());
    }
    ftp.cwd(path)
        .map(|_| ())
        .map_err(|err| format!("{path}: {err}"))
}

impl UrlOpener for HttpUrlOpener {
    fn open(&self, url: &str) -> Result<(), ValidatorError> {
        let parsed = Url::parse(url.trim()).map_err(|err| ValidatorError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => self.open_http(&parsed),
            "ftp" => self.open_ftp(&parsed),
            other => Err(unreachable(&parsed, format!("unknown url type: {other}"))),
        }
    }
}

fn unreachable(url: &Url, reason: String) -> ValidatorError {
    ValidatorError::Unreachable {
        url: url.to_string(),
        reason,
    }
}

/// Wait before the next attempt when `retries_remaining` attempts are left.
/// The wait grows as retries run out: 6s at 10 remaining, 60s at 1.
pub fn backoff(retries_remaining: u32) -> Duration {
    Duration::from_secs_f64(60.0 / f64::from(retries_remaining.max(1)))
}

pub struct UrlChecker<O: UrlOpener, Z: Sleeper = ThreadSleeper> {
    opener: O,
    sleeper: Z,
}

impl<O: UrlOpener> UrlChecker<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            sleeper: ThreadSleeper,
        }
    }
}

impl<O: UrlOpener, Z: Sleeper> UrlChecker<O, Z> {
    pub fn with_sleeper(opener: O, sleeper: Z) -> Self {
        Self { opener, sleeper }
    }

    /// Returns whether `url` could be opened, making at most `retries + 1`
    /// attempts. Exhausting the retries yields `Ok(false)`; errors other than
    /// an unreachable resource are returned without retrying.
    pub fn check(
        &self,
        url: &str,
        sink: &dyn LogSink,
        retries: u32,
    ) -> Result<bool, ValidatorError> {
        let mut remaining = retries;
        loop {
            match self.opener.open(url) {
                Ok(()) => {
                    sink.debug(&format!("Checking {url}... Done."));
                    return Ok(true);
                }
                Err(err) if err.is_url_error() => {
                    if remaining == 0 {
                        return Ok(false);
                    }
                    sink.debug(&format!(
                        "URI check failed for {url}. Retrying {remaining} more time(s)."
                    ));
                    self.sleeper.sleep(backoff(remaining));
                    remaining -= 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
