//! Cheap rejections applied before a candidate is scored.

use crate::models::job::CandidatePosting;
use crate::models::profile::PreferenceProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    ExcludedKeyword(String),
    LocationDealbreaker(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::ExcludedKeyword(k) => write!(f, "title contains excluded keyword '{k}'"),
            Rejection::LocationDealbreaker(k) => write!(f, "location dealbreaker '{k}'"),
        }
    }
}

/// Returns the first reason to drop the candidate, if any.
///
/// Excluded keywords match whole words of the title. Location dealbreakers
/// match the location only and are waived when the posting advertises remote work.
pub fn check(posting: &CandidatePosting, profile: &PreferenceProfile) -> Option<Rejection> {
    let title = posting.title.to_lowercase();
    let title_words: Vec<&str> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    for keyword in &profile.discovery.exclude_keywords {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            continue;
        }
        let hit = if keyword.contains(' ') {
            title.contains(&keyword)
        } else {
            title_words.contains(&keyword.as_str())
        };
        if hit {
            return Some(Rejection::ExcludedKeyword(keyword));
        }
    }

    let location = posting
        .location
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let description = posting.description.to_lowercase();
    if location.contains("remote") || description.contains("remote") {
        return None;
    }
    profile
        .location
        .dealbreakers
        .iter()
        .map(|d| d.trim().to_lowercase())
        .find(|d| !d.is_empty() && location.contains(d.as_str()))
        .map(Rejection::LocationDealbreaker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    #[test]
    fn test_excluded_keyword_matches_whole_words() {
        let profile = testkit::preferences();
        let intern = testkit::candidate("https://a.co/1", "Product Intern", "Acme");
        let internal = testkit::candidate("https://a.co/2", "Senior PM, Internal Tools", "Acme");

        assert_eq!(
            check(&intern, &profile),
            Some(Rejection::ExcludedKeyword("intern".into()))
        );
        assert_eq!(check(&internal, &profile), None);
    }

    #[test]
    fn test_location_dealbreaker() {
        let profile = testkit::preferences();
        let mut posting = testkit::candidate("https://a.co/1", "Senior PM", "Acme");
        posting.location = Some("Austin, TX (On-site)".into());
        posting.description = "Own the payments roadmap.".into();

        assert_eq!(
            check(&posting, &profile),
            Some(Rejection::LocationDealbreaker("on-site".into()))
        );
    }

    #[test]
    fn test_dealbreaker_in_description_only_is_ignored() {
        let profile = testkit::preferences();
        let mut posting = testkit::candidate("https://a.co/1", "Senior PM", "Acme");
        posting.location = Some("United States".into());
        posting.description = "Quarterly on-site planning week in Denver.".into();

        assert_eq!(check(&posting, &profile), None);
    }

    #[test]
    fn test_remote_waives_dealbreaker() {
        let profile = testkit::preferences();
        let mut posting = testkit::candidate("https://a.co/1", "Senior PM", "Acme");
        posting.location = Some("Remote".into());
        posting.description = "Occasional on-site offsites.".into();

        assert_eq!(check(&posting, &profile), None);
    }
}
