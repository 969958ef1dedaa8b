//! Domain extraction from `LinkedDomains` service endpoints.

use gas_sponsor_types::identity::ServiceEndpoint;
use url::Url;

/// Origin the well-known configuration is fetched from.
///
/// Accepts full URLs and bare hosts. The host is lowercased and a leading `www.` removed;
/// the result always uses `https` and ends in `/`. Port, path, query and fragment are
/// dropped. `None` when no host can be found.
pub fn normalize_domain(endpoint: &str) -> Option<Url> {
    let endpoint = endpoint.trim();
    let parsed = Url::parse(endpoint)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("https://{endpoint}")).ok())?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        return None;
    }
    Url::parse(&format!("https://{host}/")).ok()
}

/// The endpoint's first URL together with its normalized domain.
pub fn linked_domain(endpoint: &ServiceEndpoint) -> Option<(&str, Url)> {
    let url = endpoint.first_url()?;
    normalize_domain(url).map(|domain| (url, domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let cases = [
            ("www.Example.com", "https://example.com/"),
            ("sub.example.com", "https://sub.example.com/"),
            ("https://www.example.com", "https://example.com/"),
            ("http://example.com/some/path?q=1", "https://example.com/"),
            ("https://example.com:8443/", "https://example.com/"),
            ("  https://Example.ORG/  ", "https://example.org/"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                normalize_domain(input).map(String::from).as_deref(),
                Some(expected),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_unusable_endpoints() {
        assert!(normalize_domain("").is_none());
        assert!(normalize_domain("not a domain").is_none());
    }

    #[test]
    fn test_all_endpoint_shapes_yield_the_same_domain() {
        let one: ServiceEndpoint = serde_json::from_str(r#""https://foo.example.com/""#).unwrap();
        let set: ServiceEndpoint =
            serde_json::from_str(r#"["https://foo.example.com/", "https://bar.example.com/"]"#)
                .unwrap();
        let map: ServiceEndpoint =
            serde_json::from_str(r#"{"origins": ["https://foo.example.com/"]}"#).unwrap();

        let expected = Url::parse("https://foo.example.com/").unwrap();
        for endpoint in [one, set, map] {
            let (raw, domain) = linked_domain(&endpoint).unwrap();
            assert_eq!(raw, "https://foo.example.com/");
            assert_eq!(domain, expected);
        }
    }

    #[test]
    fn test_empty_endpoint_has_no_domain() {
        assert!(linked_domain(&ServiceEndpoint::Set(vec![])).is_none());
        assert!(linked_domain(&ServiceEndpoint::Map(vec![("origins".into(), vec![])])).is_none());
    }

    #[test]
    fn test_unsupported_endpoint_has_no_domain() {
        let endpoint: ServiceEndpoint =
            serde_json::from_str(r#"{"uri": "https://m.example.com", "accept": ["didcomm/v2"]}"#)
                .unwrap();
        assert!(linked_domain(&endpoint).is_none());
    }
}
