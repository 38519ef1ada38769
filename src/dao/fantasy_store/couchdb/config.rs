use std::env;

use super::error::{CouchDaoError, CouchResult};

const BASE_URL_ENV: &str = "COUCH_BASE_URL";
const DATABASE_ENV: &str = "COUCH_DB";
const USERNAME_ENV: &str = "COUCH_USERNAME";
const PASSWORD_ENV: &str = "COUCH_PASSWORD";

/// Database used when `COUCH_DB` is unset.
pub const DEFAULT_DATABASE: &str = "fantasy_cricket";

/// Where the CouchDB-backed fantasy store lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CouchConfig {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            username: None,
            password: None,
        }
    }

    /// Attach basic-auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` (defaults to [`DEFAULT_DATABASE`]) and the
    /// optional `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let read = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let base_url =
            read(BASE_URL_ENV).ok_or(CouchDaoError::MissingEnvVar { var: BASE_URL_ENV })?;
        let database = read(DATABASE_ENV).unwrap_or_else(|| DEFAULT_DATABASE.to_owned());
        if !is_valid_database_name(&database) {
            return Err(CouchDaoError::InvalidDatabaseName { database });
        }

        let config = Self::new(base_url, database);
        Ok(match (read(USERNAME_ENV), read(PASSWORD_ENV)) {
            (Some(username), Some(password)) => config.with_credentials(username, password),
            _ => config,
        })
    }
}

/// CouchDB accepts lowercase names starting with a letter, drawn from `a-z0-9_$()+-/`.
fn is_valid_database_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_lowercase())
        && chars.all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-/".contains(c)
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn database_defaults_to_fantasy_cricket() {
        let config = CouchConfig::from_lookup(lookup(&[(BASE_URL_ENV, "http://couch:5984")]))
            .unwrap();
        assert_eq!(config, CouchConfig::new("http://couch:5984", DEFAULT_DATABASE));
    }

    #[test]
    fn base_url_is_required() {
        let err =
            CouchConfig::from_lookup(lookup(&[(DATABASE_ENV, "league"), (BASE_URL_ENV, " ")]))
                .unwrap_err();
        assert!(matches!(err, CouchDaoError::MissingEnvVar { var: BASE_URL_ENV }));
    }

    #[test]
    fn credentials_need_both_halves() {
        let partial = CouchConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "http://couch:5984"),
            (USERNAME_ENV, "admin"),
        ]))
        .unwrap();
        assert_eq!(partial.username, None);

        let full = CouchConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "http://couch:5984"),
            (USERNAME_ENV, "admin"),
            (PASSWORD_ENV, "secret"),
        ]))
        .unwrap();
        assert_eq!(full.username.as_deref(), Some("admin"));
        assert_eq!(full.password.as_deref(), Some("secret"));
    }

    #[test]
    fn rejects_database_names_couch_would_refuse() {
        for name in ["League", "1st_league", "league!"] {
            let err = CouchConfig::from_lookup(lookup(&[
                (BASE_URL_ENV, "http://couch:5984"),
                (DATABASE_ENV, name),
            ]))
            .unwrap_err();
            assert!(matches!(err, CouchDaoError::InvalidDatabaseName { .. }), "{name}");
        }
        assert!(is_valid_database_name("fantasy_cricket-2025"));
    }
}
