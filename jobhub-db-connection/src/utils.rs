use std::borrow::Cow;

use serde_json::json;

use crate::config::DbConnectionConfig;

/// Pool settings as a JSON object for structured logs, with credentials redacted.
pub fn config_metadata(config: &DbConnectionConfig) -> serde_json::Value {
    json!({
        "database_url": sanitize_database_url(&config.url).as_ref(),
        "max_connections": config.max_connections,
        "min_connections": config.min_connections,
        "connect_timeout_secs": config.connect_timeout_secs,
        "idle_timeout_secs": config.idle_timeout_secs,
        "test_before_acquire": config.test_before_acquire,
    })
}

/// Redact the `user:password@` portion of a database URL.
pub fn sanitize_database_url(raw: &str) -> Cow<'_, str> {
    // sqlite URLs carry no credentials
    let Some(scheme_end) = raw.find("://") else {
        return Cow::Borrowed(raw);
    };
    let rest = &raw[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    let authority = &rest[..host_end];

    match authority.rfind('@') {
        Some(at_pos) => Cow::Owned(format!(
            "{}****:****@{}",
            &raw[..scheme_end + 3],
            &rest[at_pos + 1..]
        )),
        None => Cow::Borrowed(raw),
    }
}
