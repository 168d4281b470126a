use serde::{Deserialize, Serialize};

/// Connection metadata with the password removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

/// Mask secrets in a URL-style connection string and keep the rest for logs.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let Some((engine, rest)) = conn.split_once("://") else {
        return RedactedConnection {
            redacted: "***".to_string(),
            ..RedactedConnection::default()
        };
    };

    let (location, query) = match rest.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (rest, None),
    };
    let (authority, path) = location.split_once('/').unwrap_or((location, ""));
    let (userinfo, hostport) = match authority.rsplit_once('@') {
        Some((userinfo, hostport)) => (Some(userinfo), hostport),
        None => (None, authority),
    };

    let (user, masked_userinfo) = match userinfo {
        Some(info) => match info.split_once(':') {
            Some((user, _)) => (Some(user.to_string()), Some(format!("{user}:***"))),
            None => (Some(info.to_string()), Some(info.to_string())),
        },
        None => (None, None),
    };

    let (host, port) = match hostport.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse::<u16>().ok()),
        None => (hostport.to_string(), None),
    };

    let mut redacted = format!("{engine}://");
    if let Some(info) = &masked_userinfo {
        redacted.push_str(info);
        redacted.push('@');
    }
    redacted.push_str(hostport);
    if !path.is_empty() {
        redacted.push('/');
        redacted.push_str(path);
    }
    if let Some(query) = query {
        redacted.push('?');
        redacted.push_str(&mask_query(query));
    }

    RedactedConnection {
        engine: Some(engine.to_string()),
        user,
        host: Some(host).filter(|value| !value.is_empty()),
        port,
        database: Some(path.to_string()).filter(|value| !value.is_empty()),
        redacted,
    }
}

fn mask_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "password" | "pass" | "pwd" | "sslpassword"
    )
}
