use crate::UrlError;
use url::Url;

/// Builds the canonical absolute URL of a listing from a (possibly relative) href
///
/// # Canonicalization Steps
///
/// 1. Resolve the href against the site base URL
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Lowercase the host
/// 4. Normalize the path (dot segments, duplicate and trailing slashes)
/// 5. Drop the query string and fragment
///
/// The canonical URL is the identity of a listing when a cache is merged with
/// freshly fetched records.
///
/// # Examples
///
/// ```
/// use slutpris::url::canonical_listing_url;
/// use url::Url;
///
/// let base = Url::parse("https://www.booli.se").unwrap();
/// let url = canonical_listing_url(&base, "/bostad/123/?ref=list#map").unwrap();
/// assert_eq!(url, "https://www.booli.se/bostad/123");
/// ```
pub fn canonical_listing_url(base: &Url, href: &str) -> Result<String, UrlError> {
    let mut url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            url.set_host(Some(&lowered))
                .map_err(|e| UrlError::Parse(e.to_string()))?;
        }
    }

    let path = normalize_path(url.path());
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.into())
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}
