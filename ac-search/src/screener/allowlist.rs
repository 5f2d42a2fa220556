//! Institutional report domains and their authority scores.

use url::Url;

/// Allowed report domains with base authority scores, in match order.
///
/// A host matches a domain if it equals it or ends with `"." + domain`.
pub const ALLOWED_REPORT_DOMAINS: &[(&str, i64)] = &[
    // Global institutions, central banks, research
    ("bis.org", 120),
    ("imf.org", 115),
    ("worldbank.org", 110),
    ("oecd.org", 105),
    ("ecb.europa.eu", 105),
    ("federalreserve.gov", 105),
    ("bankofengland.co.uk", 100),
    ("nber.org", 95),
    ("ssrn.com", 75),
    ("arxiv.org", 60),
    // Korean public institutes and think tanks
    ("bok.or.kr", 100),
    ("kdi.re.kr", 95),
    ("keei.re.kr", 90),
    ("ser.org", 90),
    ("lgbr.co.kr", 85),
    ("posri.re.kr", 85),
    // Korean brokerage research portals
    ("samsungpop.com", 95),
    ("koreainvestment.com", 90),
    ("nhqv.com", 90),
    ("shinhaninvest.com", 90),
    ("daishin.com", 85),
    ("kiwoom.com", 85),
    ("meritz.co.kr", 85),
    ("kbsec.com", 85),
    ("hanaw.com", 85),
    ("ibks.com", 80),
    ("sksecurities.co.kr", 80),
];

/// A matched allowlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainMatch {
    /// The allowlist domain (not the full host).
    pub domain: &'static str,
    /// Base authority score.
    pub authority: i64,
}

/// Lowercased host of `url`, or `None` if it does not parse or has no host.
///
/// The port is not part of the host.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Match `url` against the allowlist. The first matching entry wins.
///
/// Only the host is compared: userinfo and port are ignored, so
/// `https://user@www.bis.org:8443/r` matches `bis.org`.
pub fn match_domain(url: &str) -> Option<DomainMatch> {
    let host = host_of(url)?;
    match_host(&host)
}

/// Match an already-lowercased host against the allowlist.
pub fn match_host(host: &str) -> Option<DomainMatch> {
    ALLOWED_REPORT_DOMAINS
        .iter()
        .find(|(domain, _)| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|&(domain, authority)| DomainMatch { domain, authority })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_has_expected_size() {
        assert_eq!(ALLOWED_REPORT_DOMAINS.len(), 27);
    }

    #[test]
    fn exact_host_matches() {
        let m = match_domain("https://bis.org/publ/arpdf.pdf").expect("match");
        assert_eq!(m.domain, "bis.org");
        assert_eq!(m.authority, 120);
    }

    #[test]
    fn subdomain_matches() {
        let m = match_domain("https://www.imf.org/en/Publications").expect("match");
        assert_eq!(m.domain, "imf.org");
        assert_eq!(m.authority, 115);
    }

    #[test]
    fn host_match_is_case_insensitive() {
        let m = match_domain("https://WWW.NBER.ORG/papers/w1").expect("match");
        assert_eq!(m.domain, "nber.org");
    }

    #[test]
    fn suffix_without_dot_rejected() {
        assert!(match_domain("https://notbis.org/x").is_none());
        assert!(match_domain("https://evilssrn.com/x").is_none());
    }

    #[test]
    fn domain_as_path_rejected() {
        assert!(match_domain("https://example.com/bis.org").is_none());
    }

    #[test]
    fn unparseable_urls_rejected() {
        assert!(match_domain("www.bis.org/report").is_none());
        assert!(match_domain("").is_none());
        assert!(match_domain("not a url").is_none());
    }

    #[test]
    fn port_is_ignored() {
        let m = match_domain("https://www.kdi.re.kr:8443/research").expect("match");
        assert_eq!(m.domain, "kdi.re.kr");
    }

    #[test]
    fn userinfo_is_ignored() {
        let m = match_domain("https://user@www.bis.org/r").expect("match");
        assert_eq!(m.domain, "bis.org");
    }

    #[test]
    fn korean_broker_domain() {
        let m = match_domain("https://research.samsungpop.com/r/1.pdf").expect("match");
        assert_eq!(m.authority, 95);
    }

    #[test]
    fn filing_hosts_are_not_allowlisted() {
        assert!(match_domain("https://www.sec.gov/Archives/edgar/data/1/2/a.htm").is_none());
        assert!(match_domain("https://dart.fss.or.kr/dsaf001/main.do?rcpNo=1").is_none());
    }
}
