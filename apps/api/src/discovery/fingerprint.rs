//! Posting identity.
//!
//! Neither the URL nor the title/company pair alone is a good key: the same
//! opening is cross-posted under different aggregator paths, and one company
//! can run two openings with the same title. The fingerprint hashes the
//! normalized URL together with the normalized title and company.

use reqwest::Url;
use uuid::Uuid;

use crate::models::job::Fingerprint;

/// UUIDv5 namespace for posting fingerprints. Changing it re-keys every job.
const FINGERPRINT_NAMESPACE: Uuid = Uuid::from_u128(0x6a0f_3c2e_9b1d_4e57_8c44_1f2a_7d90_b3e5);

/// Query parameters that carry tracking data rather than identity.
const TRACKING_PARAMS: &[&str] = &[
    "gclid", "fbclid", "msclkid", "mc_cid", "mc_eid", "_hsenc", "_hsmi", "trk", "trackingid",
    "refid", "ref", "src",
];
const TRACKING_PREFIXES: &[&str] = &["utm_"];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    TRACKING_PARAMS.contains(&key.as_str())
        || TRACKING_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Canonical URL form: lower-case host, no fragment, no tracking parameters,
/// remaining parameters sorted, no trailing slash.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    let Ok(url) = Url::parse(raw) else {
        return raw.trim_end_matches('/').to_lowercase();
    };

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    let host = url.host_str().unwrap_or_default().to_lowercase();
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let path = url.path().trim_end_matches('/');

    let mut normalized = format!("{}://{host}{port}{path}", url.scheme());
    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        normalized.push('?');
        normalized.push_str(&query);
    }
    normalized
}

/// Lower-case, punctuation folded to spaces, whitespace collapsed.
pub fn normalize_text(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn fingerprint(posting_url: &str, title: &str, company: &str) -> Fingerprint {
    let key = format!(
        "{}\n{}\n{}",
        normalize_url(posting_url),
        normalize_text(title),
        normalize_text(company)
    );
    Fingerprint::from_uuid(Uuid::new_v5(&FINGERPRINT_NAMESPACE, key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_params_do_not_change_fingerprint() {
        let a = fingerprint("https://boards.co/job?id=5&utm_src=x", "Senior PM", "Acme");
        let b = fingerprint("https://boards.co/job?id=5", "Senior PM", "Acme");
        assert_eq!(a, b);
    }

    #[test]
    fn test_host_case_and_trailing_slash_are_ignored() {
        let a = fingerprint("https://Boards.CO/jobs/42/", "PM", "Acme");
        let b = fingerprint("https://boards.co/jobs/42", "PM", "Acme");
        assert_eq!(a, b);
    }

    #[test]
    fn test_cosmetic_title_differences_are_ignored() {
        let a = fingerprint("https://boards.co/j/1", "Senior PM, AI Platform", "Acme Corp");
        let b = fingerprint("https://boards.co/j/1", "senior pm   ai platform", "ACME corp");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_titles_at_same_url_are_distinct() {
        let a = fingerprint("https://boards.co/j/1", "Senior PM", "Acme");
        let b = fingerprint("https://boards.co/j/1", "Staff PM", "Acme");
        assert_ne!(a, b);
    }

    #[test]
    fn test_meaningful_params_are_kept() {
        let a = fingerprint("https://boards.co/job?id=5", "PM", "Acme");
        let b = fingerprint("https://boards.co/job?id=6", "PM", "Acme");
        assert_ne!(a, b);
    }

    #[test]
    fn test_param_order_is_irrelevant() {
        assert_eq!(
            normalize_url("https://boards.co/job?b=2&a=1"),
            normalize_url("https://boards.co/job?a=1&b=2")
        );
    }

    #[test]
    fn test_normalize_url_drops_fragment_and_tracking() {
        assert_eq!(
            normalize_url("HTTPS://Boards.co/job/?id=5&UTM_Medium=email&gclid=abc#apply"),
            "https://boards.co/job?id=5"
        );
    }

    #[test]
    fn test_unparseable_url_is_still_normalized() {
        assert_eq!(normalize_url("  Not A Url/  "), "not a url");
    }
}
