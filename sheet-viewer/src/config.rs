use url::Url;

use crate::error::ViewerError;

const DEFAULT_SHEET_STORE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub sheet_store_url: String,
}

impl ViewerConfig {
    pub fn from_env() -> Result<Self, ViewerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ViewerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sheet_store_url = lookup("SHEET_STORE_URL")
            .map(|raw| raw.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SHEET_STORE_URL.to_string());

        Url::parse(&sheet_store_url).map_err(|e| ViewerError::Config {
            message: format!("Invalid SHEET_STORE_URL '{}': {}", sheet_store_url, e),
        })?;

        Ok(Self { sheet_store_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_service() {
        let config = ViewerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.sheet_store_url, "http://localhost:3000");
    }

    #[test]
    fn reads_override() {
        let config = ViewerConfig::from_lookup(|key| {
            (key == "SHEET_STORE_URL").then(|| " http://sheets.internal:8080 ".to_string())
        })
        .unwrap();
        assert_eq!(config.sheet_store_url, "http://sheets.internal:8080");
    }

    #[test]
    fn rejects_garbage_url() {
        let err = ViewerConfig::from_lookup(|_| Some("::nope".to_string())).unwrap_err();
        assert!(matches!(err, ViewerError::Config { .. }));
    }
}
