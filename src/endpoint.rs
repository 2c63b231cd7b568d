use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

use reqwest::Url;

use crate::config::ClickHouseConfig;
use crate::error::ConfigError;

/// Target of every request the sink makes: `http://host:port/` plus the
/// connection parameters sent with each query.
///
/// Built once from the config and only read afterwards, so it can be
/// shared freely between concurrent deliveries.
#[derive(Clone)]
pub struct Endpoint {
    base: Url,
    params: Vec<(&'static str, String)>,
}

impl Endpoint {
    /// Fails unless the parsed URL is exactly `http://host:port/`, so a host
    /// containing `/`, `@`, `?` or `#` cannot redirect requests elsewhere.
    pub fn from_config(config: &ClickHouseConfig) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            field: "host",
            reason,
        };

        let authority = match config.host.parse::<Ipv6Addr>() {
            Ok(addr) => format!("[{}]", addr),
            Err(_) => config.host.clone(),
        };
        let base = Url::parse(&format!("http://{}:{}/", authority, config.port))
            .map_err(|e| invalid(e.to_string()))?;

        if !host_matches(&base, &config.host)
            || base.port_or_known_default() != Some(config.port)
            || base.path() != "/"
            || base.query().is_some()
            || base.fragment().is_some()
            || !base.username().is_empty()
            || base.password().is_some()
        {
            return Err(invalid(format!(
                "{:?} with port {} does not form http://host:port/, got {}",
                config.host, config.port, base
            )));
        }

        let params = vec![
            ("database", config.database.clone()),
            ("user", config.user.clone()),
            ("password", config.password.clone()),
            ("input_format_skip_unknown_fields", "1".to_string()),
        ];

        Ok(Self { base, params })
    }

    /// `base` with the connection parameters and `query=<sql>` appended,
    /// form-encoded.
    pub fn url_for(&self, sql: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("query", sql);
        url
    }

    /// URL for inserting a `JSONEachRow` body into `table`.
    pub fn insert_url(&self, table: &str) -> Url {
        self.url_for(&insert_statement(table))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

fn host_matches(base: &Url, host: &str) -> bool {
    let strip = |h: &str| h.trim_start_matches('[').trim_end_matches(']').to_string();
    let parsed = strip(base.host_str().unwrap_or_default());
    let wanted = strip(host);

    if parsed.eq_ignore_ascii_case(&wanted) {
        return true;
    }
    match (parsed.parse::<IpAddr>(), wanted.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// The only statement the sink ever sends with a body. `table` is not
/// escaped.
pub fn insert_statement(table: &str) -> String {
    format!("INSERT INTO {} FORMAT JSONEachRow", table)
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("base", &self.base.as_str()).finish()
    }
}
