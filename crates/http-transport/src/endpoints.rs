//! Endpoint resolution for MediaWiki hosts.

use fetcher::{EndpointResolver, ParameterError, Parameters};
use url::Url;

use crate::HttpConfig;

/// Resolves a host such as `en.wikipedia.org` to its `api.php` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaWikiEndpoints {
    scheme: String,
    api_path: String,
}

impl MediaWikiEndpoints {
    pub fn new(scheme: impl Into<String>, api_path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            api_path: api_path.into(),
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.scheme.clone(), config.api_path.clone())
    }
}

impl Default for MediaWikiEndpoints {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl EndpointResolver for MediaWikiEndpoints {
    fn resolve(&self, host: &str, query: Option<&Parameters>) -> Result<Url, ParameterError> {
        if host.is_empty() {
            return Err(ParameterError::MissingHost);
        }
        if host
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '@') || c.is_whitespace())
        {
            return Err(ParameterError::InvalidHost(host.to_string()));
        }

        let path = self.api_path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}://{}/{}", self.scheme, host, path))?;
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolves_the_default_api_path() {
        let url = MediaWikiEndpoints::default()
            .resolve("en.wikipedia.org", None)
            .unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/w/api.php");
    }

    #[test]
    fn encodes_query_parameters_in_name_order() {
        let url = MediaWikiEndpoints::default()
            .resolve(
                "en.wikipedia.org",
                Some(&params(&[("titles", "Main Page"), ("action", "query")])),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/w/api.php?action=query&titles=Main+Page"
        );
    }

    #[test]
    fn keeps_an_explicit_port() {
        let url = MediaWikiEndpoints::new("http", "/api.php")
            .resolve("127.0.0.1:8080", None)
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/api.php");
    }

    #[test]
    fn rejects_empty_and_malformed_hosts() {
        let endpoints = MediaWikiEndpoints::default();
        assert!(matches!(
            endpoints.resolve("", None),
            Err(ParameterError::MissingHost)
        ));
        for host in ["en.wikipedia.org/wiki", "a b", "host?x=1", "user@host"] {
            assert!(
                matches!(endpoints.resolve(host, None), Err(ParameterError::InvalidHost(_))),
                "{host} should be rejected"
            );
        }
        assert!(matches!(
            endpoints.resolve("exa[mple.org", None),
            Err(ParameterError::InvalidUrl(_))
        ));
    }
}
