//! Process configuration: API token, city list, cache window.
//!
//! Everything is read once at startup. The token is optional on purpose:
//! without it the collector reports an unconfigured state instead of
//! failing every city.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const TOKEN_ENV: &str = "AQI_API_TOKEN";
pub const CITIES_FILE_ENV: &str = "AQI_CITIES_FILE";
pub const CACHE_TTL_ENV: &str = "AQI_CACHE_TTL_SECS";
pub const API_URL_ENV: &str = "AQI_API_URL";
/// Where users request a WAQI token.
pub const TOKEN_URL: &str = "https://aqicn.org/data-platform/token/";

/// Default freshness window for a cached batch.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Cities shipped with the reference deployment, in display order.
const DEFAULT_CITIES: &[(&str, &str)] = &[
    ("Delhi", "delhi"),
    ("Mumbai", "mumbai"),
    ("Kolkata", "kolkata"),
    ("Chennai", "chennai"),
    ("Bengaluru", "bangalore"),
    ("Hyderabad", "hyderabad"),
    ("Pune", "pune"),
    ("Ahmedabad", "ahmedabad"),
    ("Jaipur", "jaipur"),
    ("Lucknow", "lucknow"),
    ("Bhopal", "bhopal"),
    ("Patna", "patna"),
];

/// WAQI API token. `Debug` does not print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Returns `None` for an empty or whitespace-only token.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// A display name and the identifier the API knows the city by.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct City {
    pub name: String,
    pub id: String,
}

/// Ordered, validated set of cities to fetch.
///
/// Stored as a JSON array on disk so the order survives:
/// ```json
/// [
///   { "name": "Delhi", "id": "delhi" },
///   { "name": "Bengaluru", "id": "bangalore" }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityConfig {
    cities: Vec<City>,
}

impl CityConfig {
    /// Validates that names are unique and non-empty and ids are non-empty.
    pub fn new(cities: Vec<City>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for city in &cities {
            if city.name.trim().is_empty() {
                return Err(ConfigError::InvalidCities("empty display name".into()));
            }
            if city.id.trim().is_empty() {
                return Err(ConfigError::InvalidCities(format!(
                    "'{}' has an empty API identifier",
                    city.name
                )));
            }
            if !seen.insert(city.name.as_str()) {
                return Err(ConfigError::InvalidCities(format!(
                    "duplicate display name '{}'",
                    city.name
                )));
            }
        }
        Ok(Self { cities })
    }

    /// The twelve Indian cities of the reference deployment.
    pub fn india() -> Self {
        Self {
            cities: DEFAULT_CITIES
                .iter()
                .map(|(name, id)| City {
                    name: name.to_string(),
                    id: id.to_string(),
                })
                .collect(),
        }
    }

    /// Loads the list from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let cities: Vec<City> = serde_json::from_str(content)?;
        Ok(Self::new(cities)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &City> {
        self.cities.iter()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Settings gathered from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: Option<ApiToken>,
    pub cities: CityConfig,
    pub cache_ttl: Duration,
    /// Overrides the public WAQI endpoint, e.g. for a mirror or a local stub.
    pub api_url: Option<String>,
}

impl Settings {
    /// Reads [`TOKEN_ENV`], [`CITIES_FILE_ENV`], [`CACHE_TTL_ENV`] and
    /// [`API_URL_ENV`].
    ///
    /// A missing token is not an error here; see [`Settings::require_token`].
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).ok().and_then(ApiToken::new);

        let cities = match std::env::var(CITIES_FILE_ENV) {
            Ok(path) => CityConfig::load(&path)?,
            Err(_) => CityConfig::india(),
        };

        let cache_ttl = match std::env::var(CACHE_TTL_ENV) {
            Ok(raw) => parse_ttl(&raw)?,
            Err(_) => DEFAULT_CACHE_TTL,
        };

        let api_url = std::env::var(API_URL_ENV)
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            token,
            cities,
            cache_ttl,
            api_url,
        })
    }

    pub fn require_token(&self) -> Result<&ApiToken, ConfigError> {
        self.token
            .as_ref()
            .ok_or(ConfigError::MissingToken { var: TOKEN_ENV })
    }
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidValue {
            var: CACHE_TTL_ENV,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(name: &str, id: &str) -> City {
        City {
            name: name.into(),
            id: id.into(),
        }
    }

    #[test]
    fn test_india_has_twelve_cities_in_order() {
        let cfg = CityConfig::india();
        assert_eq!(cfg.len(), 12);
        let first: Vec<_> = cfg.iter().take(3).map(|c| c.name.as_str()).collect();
        assert_eq!(first, ["Delhi", "Mumbai", "Kolkata"]);
        let bengaluru = cfg.iter().find(|c| c.name == "Bengaluru").unwrap();
        assert_eq!(bengaluru.id, "bangalore");
        // the built-in list passes its own validation
        assert!(CityConfig::new(cfg.iter().cloned().collect()).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = CityConfig::new(vec![city("Pune", "pune"), city("Pune", "pune2")]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_rejects_empty_id() {
        assert!(CityConfig::new(vec![city("Pune", " ")]).is_err());
        assert!(CityConfig::new(vec![city("", "pune")]).is_err());
    }

    #[test]
    fn test_from_json_keeps_order() {
        let cfg = CityConfig::from_json(
            r#"[{"name":"Zurich","id":"zurich"},{"name":"Athens","id":"athens"}]"#,
        )
        .unwrap();
        let names: Vec<_> = cfg.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Zurich", "Athens"]);
    }

    #[test]
    fn test_token_blank_is_absent() {
        assert!(ApiToken::new("").is_none());
        assert!(ApiToken::new("   ").is_none());
        assert_eq!(ApiToken::new(" abc ").unwrap().expose(), "abc");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let t = ApiToken::new("secret-value").unwrap();
        assert!(!format!("{t:?}").contains("secret"));
    }

    #[test]
    fn test_require_token() {
        let mut settings = Settings {
            token: None,
            cities: CityConfig::india(),
            cache_ttl: DEFAULT_CACHE_TTL,
            api_url: None,
        };
        assert!(matches!(
            settings.require_token(),
            Err(ConfigError::MissingToken { var: TOKEN_ENV })
        ));
        settings.token = ApiToken::new("t");
        assert!(settings.require_token().is_ok());
    }

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl("60").unwrap(), Duration::from_secs(60));
        assert!(parse_ttl("ten").is_err());
    }
}
