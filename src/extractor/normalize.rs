use super::types::{ExtractError, PostReference};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub const CANONICAL_HOST: &str = "www.threads.net";

const ALLOWED_HOSTS: &[&str] = &[
    "threads.com",
    "www.threads.com",
    "m.threads.com",
    "threads.net",
    "www.threads.net",
    "m.threads.net",
];

static POST_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/@([\w.-]+)/post/([\w-]+)/?").unwrap());

/// Validate a Threads post URL and reduce it to its canonical form.
///
/// The host check is a case-insensitive substring match against the allow
/// list; the path must start with `/@handle/post/id`. The query string and
/// fragment are dropped.
pub fn normalize(input: &str) -> Result<PostReference, ExtractError> {
    let parsed = Url::parse(input.trim())
        .map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", input, e)))?;

    let host = parsed.host_str().unwrap_or("").to_lowercase();
    if !ALLOWED_HOSTS.iter().any(|domain| host.contains(domain)) {
        return Err(ExtractError::UntrustedDomain(input.to_string()));
    }

    let path = parsed.path();
    let caps = POST_PATH_REGEX
        .captures(path)
        .ok_or_else(|| ExtractError::MalformedPostPath(input.to_string()))?;

    Ok(PostReference {
        host,
        handle: caps[1].to_string(),
        post_id: caps[2].to_string(),
        path: path.to_string(),
    })
}

/// Convenience wrapper returning only the canonical URL string.
pub fn normalize_url(input: &str) -> Result<String, ExtractError> {
    normalize(input).map(|post| post.canonical_url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_query_and_canonicalizes_host() {
        let url = normalize_url("https://www.threads.net/@alice/post/Cabc123?hl=en").unwrap();
        assert_eq!(url, "https://www.threads.net/@alice/post/Cabc123");

        let url = normalize_url("https://m.threads.com/@bob.smith/post/X-y_z/?igshid=abc#frag").unwrap();
        assert_eq!(url, "https://www.threads.net/@bob.smith/post/X-y_z/");
    }

    #[test]
    fn test_extracts_handle_and_post_id() {
        let post = normalize("https://THREADS.com/@alice/post/Cabc123").unwrap();
        assert_eq!(post.host, "threads.com");
        assert_eq!(post.handle, "alice");
        assert_eq!(post.post_id, "Cabc123");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize_url("https://threads.net/@alice/post/Cabc123?x=1").unwrap();
        let twice = normalize_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_untrusted_domains_regardless_of_path() {
        for input in [
            "https://instagram.com/@alice/post/Cabc123",
            "https://example.com/notaposturl",
            "https://threads.org/@alice/post/Cabc123",
        ] {
            assert!(
                matches!(normalize(input), Err(ExtractError::UntrustedDomain(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_rejects_malformed_post_paths() {
        for input in [
            "https://threads.net/notaposturl",
            "https://www.threads.net/@alice",
            "https://www.threads.net/alice/post/Cabc123",
            "https://www.threads.net/@alice/post/",
            "https://www.threads.net/@alice/reply/Cabc123",
        ] {
            assert!(
                matches!(normalize(input), Err(ExtractError::MalformedPostPath(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_rejects_unparseable_input() {
        assert!(matches!(normalize("not a url"), Err(ExtractError::InvalidUrl(_))));
        assert!(matches!(normalize(""), Err(ExtractError::InvalidUrl(_))));
    }
}
