//! URL Policy (C2): target URL validation and SSRF guard.
//!
//! Two independent checks happen here: the candidate URL must be a
//! scope-permitted prefix of the service's registered `base_url` (host +
//! path), and it must not resolve (as a literal) to a private, loopback,
//! or link-local address. DNS-time SSRF, a public hostname that resolves
//! to a private address at connect time, is an accepted residual risk and
//! is not addressed here.

use shared::errors::ApiError;
use url::Url;

/// Parses and validates `target_url` against `base_url`.
///
/// Returns the parsed `Url` on success so callers (the forwarder) don't
/// need to re-parse it.
pub fn check(target_url: &str, base_url: &str) -> Result<Url, ApiError> {
    let target = Url::parse(target_url)
        .map_err(|e| ApiError::TargetInvalid { message: format!("invalid target url: {e}") })?;
    let base = Url::parse(base_url)
        .map_err(|e| ApiError::TargetInvalid { message: format!("invalid base url: {e}") })?;

    if target.scheme() != "http" && target.scheme() != "https" {
        return Err(ApiError::TargetInvalid {
            message: format!("unsupported scheme: {}", target.scheme()),
        });
    }
    if target.scheme() != base.scheme() {
        return Err(ApiError::TargetInvalid {
            message: "target scheme does not match the service's registered scheme".to_string(),
        });
    }

    let target_host = target.host_str().ok_or_else(|| ApiError::TargetInvalid {
        message: "target url has no host".to_string(),
    })?;
    let base_host = base.host_str().ok_or_else(|| ApiError::TargetInvalid {
        message: "base url has no host".to_string(),
    })?;

    if is_blocked_host(target_host) {
        return Err(ApiError::TargetForbidden);
    }

    if !target_host.eq_ignore_ascii_case(base_host) {
        return Err(ApiError::TargetForbidden);
    }

    if !target.path().starts_with(base.path()) {
        return Err(ApiError::TargetForbidden);
    }

    Ok(target)
}

/// True if `host` is a literal loopback/private/link-local address (or the
/// `localhost` name). Matching is done on the lowercased literal form;
/// hostnames that merely *resolve* to a private address are not caught
/// here.
fn is_blocked_host(host: &str) -> bool {
    let lower = host.to_ascii_lowercase();

    if lower == "localhost" || lower == "::1" {
        return true;
    }

    if let Ok(ipv4) = lower.parse::<std::net::Ipv4Addr>() {
        let octets = ipv4.octets();
        return octets[0] == 127
            || octets[0] == 10
            || (octets[0] == 192 && octets[1] == 168)
            || (octets[0] == 169 && octets[1] == 254)
            || (octets[0] == 172 && (16..=31).contains(&octets[1]));
    }

    if let Ok(ipv6) = lower.parse::<std::net::Ipv6Addr>() {
        let segments = ipv6.segments();
        // fc00::/7 covers fc00:: through fdff::
        let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
        // fe80::/10 link-local
        let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
        return is_unique_local || is_link_local;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_path_prefixed_by_base() {
        let result = check("https://api.host.tld/v1/x", "https://api.host.tld/");
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_scheme_downgrade_from_https_base() {
        let err = check("http://api.host.tld/v1/x", "https://api.host.tld/").unwrap_err();
        assert!(matches!(err, ApiError::TargetInvalid { .. }));
    }

    #[test]
    fn rejects_mismatched_host() {
        let err = check("https://evil.tld/v1/x", "https://api.host.tld/v1/").unwrap_err();
        assert!(matches!(err, ApiError::TargetForbidden));
    }

    #[test]
    fn rejects_path_outside_prefix() {
        let err = check("https://api.host.tld/other/x", "https://api.host.tld/v1/").unwrap_err();
        assert!(matches!(err, ApiError::TargetForbidden));
    }

    #[test]
    fn blocks_literal_loopback_and_private_addresses() {
        for host in [
            "http://127.0.0.1/",
            "http://localhost/",
            "http://10.1.2.3/",
            "http://192.168.1.1/",
            "http://169.254.1.1/",
            "http://172.16.0.5/",
            "http://[::1]/",
            "http://[fc00::1]/",
            "http://[fe80::1]/",
        ] {
            let err = check(host, host).unwrap_err();
            assert!(matches!(err, ApiError::TargetForbidden), "{host} should be forbidden");
        }
    }

    #[test]
    fn allows_public_address_literal() {
        assert!(!is_blocked_host("8.8.8.8"));
        assert!(!is_blocked_host("172.32.0.1"));
        assert!(!is_blocked_host("172.15.255.255"));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = check("ftp://api.host.tld/v1/x", "https://api.host.tld/v1/").unwrap_err();
        assert!(matches!(err, ApiError::TargetInvalid { .. }));
    }
}
