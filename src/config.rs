use gotham_derive::StateData;

/// Application wide settings defined in configuration file.
#[derive(Deserialize, StateData, Clone)]
pub struct Settings {
    /// IP address to bind to
    pub host_address: String,
    /// Database and connection pool settings
    pub database: Database,
    /// Cookie settings
    pub cookie: Cookie,
}

impl Settings {
    pub fn from_slice(data: &[u8]) -> Result<Self, toml::de::Error> {
        toml::from_slice(data)
    }
}

/// Database connection settings.
#[derive(Deserialize, Clone)]
pub struct Database {
    /// Postgres database url
    pub url: String,
    /// Maximum number of pooled connections
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// How long to wait for a free pooled connection, in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Per-statement timeout applied to every connection, in milliseconds
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_ms: u64,
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_statement_timeout() -> u64 {
    10_000
}

/// Cookie related settings
#[derive(Deserialize, Clone)]
pub struct Cookie {
    /// Require HTTPS for cookies
    pub secure: bool,
    /// Restrict cookies to given domain if set
    pub domain: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn parses_with_defaults() {
        let data = br#"
            host_address = "127.0.0.1:8000"

            [database]
            url = "postgres://quill@localhost/quill"

            [cookie]
            secure = false
        "#;
        let settings = Settings::from_slice(data).unwrap();
        assert_eq!(settings.database.pool_size, 10);
        assert_eq!(settings.database.connect_timeout_ms, 5_000);
        assert_eq!(settings.database.statement_timeout_ms, 10_000);
        assert!(settings.cookie.domain.is_none());
    }
}
