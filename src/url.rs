//! Absolute URL parsing into the pieces the rest of the core needs:
//! scheme, host, port, path+query, and the origin triple that keys the
//! connection pool. Relative URLs are rejected here; redirect resolution
//! against a base origin is the executor's job (see `crate::executor`).

use crate::error::{HttpError, InvalidUrlKind};
use std::fmt;

/// A parsed absolute URL, reduced to exactly what request execution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlInfo {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path_and_query: String,
    pub userinfo: Option<String>,
}

/// The two schemes this core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    #[must_use]
    pub fn is_secure(self) -> bool {
        matches!(self, Scheme::Https)
    }

    fn parse(s: &str) -> Option<Scheme> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        })
    }
}

/// The (scheme, host, port) triple that partitions the connection pool.
/// `https://a:443`, `http://a:80`, and `https://a:8443` are three distinct
/// origins and never share idle connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl UrlInfo {
    #[must_use]
    pub fn origin(&self) -> Origin {
        Origin {
            scheme: self.scheme,
            host: self.host.clone(),
            port: self.port,
        }
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.scheme.is_secure()
    }

    /// Parse an absolute URL string. Fails with `HttpError::InvalidUrl` on
    /// an unsupported scheme, an empty host, or an unparseable port.
    pub fn parse(raw: &str) -> Result<UrlInfo, HttpError> {
        let (scheme_str, rest) = raw.split_once("://").ok_or_else(|| {
            HttpError::invalid_url(raw, InvalidUrlKind::ParseError, "missing '://' scheme separator")
        })?;

        let scheme = Scheme::parse(scheme_str).ok_or_else(|| {
            HttpError::invalid_url(
                raw,
                InvalidUrlKind::UnsupportedScheme,
                format!("scheme '{scheme_str}' is not http or https"),
            )
        })?;

        let (authority, path_and_query) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        if authority.is_empty() {
            return Err(HttpError::invalid_url(raw, InvalidUrlKind::MissingHost, "empty host"));
        }

        let (userinfo, host_port) = match authority.rsplit_once('@') {
            Some((info, rest)) => (Some(info.to_string()), rest),
            None => (None, authority),
        };

        if host_port.is_empty() {
            return Err(HttpError::invalid_url(raw, InvalidUrlKind::MissingHost, "empty host"));
        }

        let (host, port) = parse_host_port(host_port, raw)?;
        if host.is_empty() {
            return Err(HttpError::invalid_url(raw, InvalidUrlKind::MissingHost, "empty host"));
        }

        let port = port.unwrap_or_else(|| scheme.default_port());

        let path_and_query = if path_and_query.is_empty() {
            "/".to_string()
        } else {
            path_and_query.to_string()
        };

        Ok(UrlInfo {
            scheme,
            host,
            port,
            path_and_query,
            userinfo,
        })
    }
}

/// Splits `host[:port]`, with IPv6 literal support (`[::1]:8080`).
fn parse_host_port(host_port: &str, raw: &str) -> Result<(String, Option<u16>), HttpError> {
    if let Some(rest) = host_port.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(|| {
            HttpError::invalid_url(raw, InvalidUrlKind::ParseError, "unterminated IPv6 literal")
        })?;
        let port = match after.strip_prefix(':') {
            Some(p) if !p.is_empty() => Some(parse_port(p, raw)?),
            Some(_) => return Err(HttpError::invalid_url(raw, InvalidUrlKind::InvalidPort, "empty port")),
            None => None,
        };
        return Ok((host.to_string(), port));
    }

    match host_port.rsplit_once(':') {
        Some((host, port_str)) if !port_str.is_empty() => Ok((host.to_string(), Some(parse_port(port_str, raw)?))),
        Some((host, _)) => Ok((host.to_string(), None)),
        None => Ok((host_port.to_string(), None)),
    }
}

fn parse_port(port_str: &str, raw: &str) -> Result<u16, HttpError> {
    port_str
        .parse::<u16>()
        .map_err(|_| HttpError::invalid_url(raw, InvalidUrlKind::InvalidPort, format!("invalid port '{port_str}'")))
}

/// Resolve a `Location` header value against the current origin, per the
/// executor's redirect rules: path-only locations keep the current
/// scheme/host/port, everything else must already be absolute.
pub fn resolve_location(current: &UrlInfo, location: &str) -> Result<UrlInfo, HttpError> {
    if location.starts_with('/') {
        let absolute = format!("{}://{}:{}{}", current.scheme, current.host, current.port, location);
        UrlInfo::parse(&absolute)
    } else {
        UrlInfo::parse(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_http_url() {
        let u = UrlInfo::parse("http://example.com/path?x=1").unwrap();
        assert_eq!(u.scheme, Scheme::Http);
        assert_eq!(u.host, "example.com");
        assert_eq!(u.port, 80);
        assert_eq!(u.path_and_query, "/path?x=1");
    }

    #[test]
    fn defaults_path_to_slash() {
        let u = UrlInfo::parse("https://example.com").unwrap();
        assert_eq!(u.path_and_query, "/");
        assert_eq!(u.port, 443);
    }

    #[test]
    fn parses_explicit_port() {
        let u = UrlInfo::parse("https://example.com:8443/a").unwrap();
        assert_eq!(u.port, 8443);
    }

    #[test]
    fn parses_ipv6_literal_with_port() {
        let u = UrlInfo::parse("http://[::1]:9000/a").unwrap();
        assert_eq!(u.host, "::1");
        assert_eq!(u.port, 9000);
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err = UrlInfo::parse("ftp://example.com/").unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidUrl {
                kind: InvalidUrlKind::UnsupportedScheme,
                ..
            }
        ));
    }

    #[test]
    fn rejects_empty_host() {
        let err = UrlInfo::parse("http:///path").unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidUrl {
                kind: InvalidUrlKind::MissingHost,
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_port() {
        let err = UrlInfo::parse("http://example.com:notaport/").unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidUrl {
                kind: InvalidUrlKind::InvalidPort,
                ..
            }
        ));
    }

    #[test]
    fn distinct_origins_for_distinct_ports() {
        let a = UrlInfo::parse("https://a.example/").unwrap();
        let b = UrlInfo::parse("https://a.example:8443/").unwrap();
        let c = UrlInfo::parse("http://a.example/").unwrap();
        assert_ne!(a.origin(), b.origin());
        assert_ne!(a.origin(), c.origin());
    }

    #[test]
    fn resolves_path_only_redirect_against_current_origin() {
        let current = UrlInfo::parse("https://a.example/old").unwrap();
        let next = resolve_location(&current, "/new").unwrap();
        assert_eq!(next.host, "a.example");
        assert_eq!(next.scheme, Scheme::Https);
        assert_eq!(next.path_and_query, "/new");
    }

    #[test]
    fn resolves_absolute_redirect_ignoring_current_origin() {
        let current = UrlInfo::parse("https://a.example/old").unwrap();
        let next = resolve_location(&current, "http://b.example/new").unwrap();
        assert_eq!(next.host, "b.example");
        assert_eq!(next.scheme, Scheme::Http);
    }
}
