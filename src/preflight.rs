//! Preflight checks for batch runs.
//!
//! Before committing to a full multi-site run, each site's URL list is
//! validated cheaply: an empty list or an unresolvable host excludes that
//! site from the batch without failing the batch itself. Resolution uses the
//! first URL that yields a host; no validation beyond DNS is attempted.

use tracing::{debug, instrument};

use crate::sites::{Site, extract_host};

/// Result of checking one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightStatus {
    /// The site's URL list is empty.
    Empty,
    /// The site's host did not resolve.
    DnsFail {
        /// The host that failed to resolve.
        host: String,
    },
    /// The site looks runnable.
    Ok {
        /// Number of URLs in the list.
        url_count: usize,
    },
}

impl PreflightStatus {
    /// Whether the site should be included in a batch run.
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl std::fmt::Display for PreflightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "EMPTY list"),
            Self::DnsFail { host } => write!(f, "DNS FAIL for {host}"),
            Self::Ok { url_count } => write!(f, "OK ({url_count} URLs)"),
        }
    }
}

/// Checks one site: empty list, then host resolution on the first URL that
/// yields a host.
///
/// A list whose URLs yield no host at all is reported `Ok`: there is
/// nothing to resolve, and the external tool may still know what to do.
#[instrument(skip(site), fields(site = %site.name))]
pub async fn check_site(site: &Site) -> PreflightStatus {
    if site.urls.is_empty() {
        return PreflightStatus::Empty;
    }
    let Some(host) = site.urls.iter().find_map(|url| extract_host(url)) else {
        debug!("no URL yielded a host, skipping DNS check");
        return PreflightStatus::Ok {
            url_count: site.urls.len(),
        };
    };
    if resolves(&host).await {
        PreflightStatus::Ok {
            url_count: site.urls.len(),
        }
    } else {
        PreflightStatus::DnsFail { host }
    }
}

/// Checks every site, in order. One failed site never aborts the report.
pub async fn preflight_report(sites: &[Site]) -> Vec<(String, PreflightStatus)> {
    let mut report = Vec::with_capacity(sites.len());
    for site in sites {
        let status = check_site(site).await;
        report.push((site.name.clone(), status));
    }
    report
}

/// Attempts DNS resolution for `host`.
async fn resolves(host: &str) -> bool {
    tokio::net::lookup_host((host, 443))
        .await
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_list_reports_empty() {
        let site = Site::new("empty", vec![]);
        assert_eq!(check_site(&site).await, PreflightStatus::Empty);
    }

    #[tokio::test]
    async fn test_resolvable_host_reports_ok_with_count() {
        let site = Site::new(
            "local",
            vec![
                "http://localhost/a".to_string(),
                "http://localhost/b".to_string(),
            ],
        );
        assert_eq!(check_site(&site).await, PreflightStatus::Ok { url_count: 2 });
    }

    #[tokio::test]
    async fn test_unresolvable_host_reports_dns_fail() {
        // .invalid is reserved (RFC 2606) and never resolves
        let site = Site::new(
            "broken",
            vec!["https://no-such-host.invalid/gallery".to_string()],
        );
        assert_eq!(
            check_site(&site).await,
            PreflightStatus::DnsFail {
                host: "no-such-host.invalid".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_hostless_urls_report_ok() {
        let site = Site::new("odd", vec!["not a url".to_string()]);
        assert_eq!(check_site(&site).await, PreflightStatus::Ok { url_count: 1 });
    }

    #[tokio::test]
    async fn test_first_url_with_host_wins() {
        let site = Site::new(
            "mixed",
            vec![
                "garbage".to_string(),
                "http://localhost/x".to_string(),
                "https://no-such-host.invalid/y".to_string(),
            ],
        );
        // localhost is checked, the .invalid host never consulted
        assert_eq!(check_site(&site).await, PreflightStatus::Ok { url_count: 3 });
    }

    #[tokio::test]
    async fn test_report_covers_all_sites_independently() {
        let sites = vec![
            Site::new("empty", vec![]),
            Site::new("ok", vec!["http://localhost/".to_string()]),
        ];
        let report = preflight_report(&sites).await;
        assert_eq!(report.len(), 2);
        assert_eq!(report[0], ("empty".to_string(), PreflightStatus::Empty));
        assert!(report[1].1.is_runnable());
    }

    #[test]
    fn test_status_display_strings() {
        assert_eq!(PreflightStatus::Empty.to_string(), "EMPTY list");
        assert_eq!(
            PreflightStatus::DnsFail {
                host: "x.invalid".to_string()
            }
            .to_string(),
            "DNS FAIL for x.invalid"
        );
        assert_eq!(
            PreflightStatus::Ok { url_count: 3 }.to_string(),
            "OK (3 URLs)"
        );
    }
}
