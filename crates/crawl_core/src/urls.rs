use url::Url;

use crate::ConfigError;

/// Parses a newline separated URL list.
///
/// Lines are trimmed; blank lines and `#` comments are skipped. Order and
/// duplicates are preserved.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
        .collect()
}

/// Checks that `raw` is an absolute http(s) URL.
pub fn check_url(raw: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(raw).map_err(|err| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}
