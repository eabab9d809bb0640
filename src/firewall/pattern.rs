//! Network identity patterns.
//!
//! # Grammar
//! - `203.0.113.7`, `2001:db8::1`: exact address
//! - `10.0.0.0/8`, `2001:db8::/32`: CIDR block
//! - `10.0.0.1-10.0.0.50`: inclusive range, same family on both ends
//! - `192.168.*.*`: IPv4 wildcard, at least one literal octet
//! - `example.com`, `*.example.com`: hostname, case-insensitive
//! - `*`: matches every client
//!
//! # Design Decisions
//! - Patterns are parsed once (boot or save time), never at request time
//! - IPv4-mapped IPv6 clients are matched as IPv4

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,

    #[error("invalid CIDR block '{0}'")]
    Cidr(String),

    #[error("invalid address range '{0}'")]
    Range(String),

    #[error("invalid wildcard address '{0}'")]
    Wildcard(String),

    #[error("invalid hostname pattern '{0}'")]
    Hostname(String),

    #[error("invalid email pattern '{0}'")]
    Email(String),
}

/// Case-insensitive glob where `*` matches any run of characters.
#[derive(Debug, Clone)]
pub struct Glob {
    source: String,
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let source = pattern.trim().to_ascii_lowercase();
        let body = source
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))?;
        Ok(Self { source, regex })
    }

    /// True when the glob contains no wildcard.
    pub fn is_literal(&self) -> bool {
        !self.source.contains('*')
    }

    /// Number of non-wildcard characters.
    pub fn literal_len(&self) -> usize {
        self.source.chars().filter(|c| *c != '*').count()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(&candidate.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Glob {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Glob {}

/// A parsed firewall/rule pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pattern {
    Any,
    Ip(IpAddr),
    Cidr(IpNet),
    Range { start: IpAddr, end: IpAddr },
    Wildcard([Option<u8>; 4]),
    Hostname(Glob),
}

impl Pattern {
    /// Returns true if the client identity matches this pattern.
    ///
    /// Address patterns need `ip`, hostname patterns need `host`.
    pub fn matches(&self, ip: Option<IpAddr>, host: Option<&str>) -> bool {
        let ip = ip.map(|ip| ip.to_canonical());
        match self {
            Pattern::Any => true,
            Pattern::Ip(addr) => ip == Some(addr.to_canonical()),
            Pattern::Cidr(net) => ip.is_some_and(|ip| net.contains(&ip)),
            Pattern::Range { start, end } => ip.is_some_and(|ip| {
                same_family(&ip, start) && *start <= ip && ip <= *end
            }),
            Pattern::Wildcard(octets) => match ip {
                Some(IpAddr::V4(v4)) => octets
                    .iter()
                    .zip(v4.octets())
                    .all(|(expected, actual)| expected.map_or(true, |e| e == actual)),
                _ => false,
            },
            Pattern::Hostname(glob) => host.is_some_and(|h| glob.matches(h)),
        }
    }

    /// Relative precision of the pattern. Higher wins when several match.
    pub fn specificity(&self) -> u32 {
        match self {
            Pattern::Any => 0,
            Pattern::Ip(_) => 256,
            Pattern::Cidr(net) => {
                let offset = if matches!(net, IpNet::V4(_)) { 96 } else { 0 };
                u32::from(net.prefix_len()) + offset
            }
            Pattern::Range { start, end } => {
                let span = to_u128(end).saturating_sub(to_u128(start)).saturating_add(1);
                128 - (128 - span.leading_zeros())
            }
            Pattern::Wildcard(octets) => {
                let literal = octets.iter().filter(|o| o.is_some()).count();
                96 + 8 * u32::try_from(literal).unwrap_or(4)
            }
            Pattern::Hostname(glob) if glob.is_literal() => 256,
            Pattern::Hostname(glob) => u32::try_from(glob.literal_len()).unwrap_or(255).min(255),
        }
    }
}

fn same_family(a: &IpAddr, b: &IpAddr) -> bool {
    a.is_ipv4() == b.is_ipv4()
}

fn to_u128(ip: &IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u128::from(u32::from(*v4)),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

fn parse_wildcard(raw: &str) -> Option<Result<[Option<u8>; 4], PatternError>> {
    if !raw.contains('*') {
        return None;
    }
    let parts: Vec<&str> = raw.split('.').collect();
    let shaped = parts.len() == 4
        && parts
            .iter()
            .all(|p| *p == "*" || (!p.is_empty() && p.chars().all(|c| c.is_ascii_digit())));
    if !shaped {
        return None;
    }

    let mut octets = [None; 4];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        if *part != "*" {
            match part.parse::<u8>() {
                Ok(v) => *slot = Some(v),
                Err(_) => return Some(Err(PatternError::Wildcard(raw.to_string()))),
            }
        }
    }
    if octets.iter().all(Option::is_none) {
        return Some(Err(PatternError::Wildcard(raw.to_string())));
    }
    Some(Ok(octets))
}

fn is_hostname_like(raw: &str) -> bool {
    raw.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '*' | '_'))
        && !raw.starts_with('.')
        && !raw.ends_with('.')
        && !raw.contains("..")
        // A string of digits and dots is a mistyped address, not a hostname.
        && !raw.chars().all(|c| c.is_ascii_digit() || c == '.')
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        if raw == "*" {
            return Ok(Pattern::Any);
        }
        if let Ok(ip) = raw.parse::<IpAddr>() {
            return Ok(Pattern::Ip(ip));
        }
        if raw.contains('/') {
            return raw
                .parse::<IpNet>()
                .map(|net| Pattern::Cidr(net.trunc()))
                .map_err(|_| PatternError::Cidr(raw.to_string()));
        }
        if let Some((left, right)) = raw.split_once('-') {
            let start = left.trim().parse::<IpAddr>();
            let end = right.trim().parse::<IpAddr>();
            match (start, end) {
                (Ok(start), Ok(end)) => {
                    if !same_family(&start, &end) || start > end {
                        return Err(PatternError::Range(raw.to_string()));
                    }
                    return Ok(Pattern::Range { start, end });
                }
                (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                    return Err(PatternError::Range(raw.to_string()));
                }
                // Both sides non-addresses: a hyphenated hostname.
                (Err(_), Err(_)) => {}
            }
        }
        if let Some(wildcard) = parse_wildcard(raw) {
            return wildcard.map(Pattern::Wildcard);
        }
        if !is_hostname_like(raw) {
            return Err(PatternError::Hostname(raw.to_string()));
        }
        Glob::new(raw)
            .map(Pattern::Hostname)
            .map_err(|_| PatternError::Hostname(raw.to_string()))
    }
}

impl TryFrom<String> for Pattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => write!(f, "*"),
            Pattern::Ip(ip) => write!(f, "{}", ip),
            Pattern::Cidr(net) => write!(f, "{}", net),
            Pattern::Range { start, end } => write!(f, "{}-{}", start, end),
            Pattern::Wildcard(octets) => {
                let parts: Vec<String> = octets
                    .iter()
                    .map(|o| o.map_or_else(|| "*".to_string(), |v| v.to_string()))
                    .collect();
                write!(f, "{}", parts.join("."))
            }
            Pattern::Hostname(glob) => write!(f, "{}", glob.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Option<IpAddr> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn test_parse_variants() {
        assert!(matches!("10.0.0.1".parse::<Pattern>(), Ok(Pattern::Ip(_))));
        assert!(matches!("10.0.0.0/8".parse::<Pattern>(), Ok(Pattern::Cidr(_))));
        assert!(matches!("10.0.0.1-10.0.0.9".parse::<Pattern>(), Ok(Pattern::Range { .. })));
        assert!(matches!("192.168.*.*".parse::<Pattern>(), Ok(Pattern::Wildcard(_))));
        assert!(matches!("*.example.com".parse::<Pattern>(), Ok(Pattern::Hostname(_))));
        assert!(matches!("my-host.example.com".parse::<Pattern>(), Ok(Pattern::Hostname(_))));
        assert_eq!("*".parse::<Pattern>(), Ok(Pattern::Any));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Pattern>(), Err(PatternError::Empty));
        assert!(matches!("10.0.0.0/40".parse::<Pattern>(), Err(PatternError::Cidr(_))));
        assert!(matches!("10.0.0.9-10.0.0.1".parse::<Pattern>(), Err(PatternError::Range(_))));
        assert!(matches!("10.0.0.1-::1".parse::<Pattern>(), Err(PatternError::Range(_))));
        assert!(matches!("10.0.0.1-host".parse::<Pattern>(), Err(PatternError::Range(_))));
        assert!(matches!("*.*.*.*".parse::<Pattern>(), Err(PatternError::Wildcard(_))));
        assert!(matches!("10.300.*.*".parse::<Pattern>(), Err(PatternError::Wildcard(_))));
        assert!(matches!("300.1.1.1".parse::<Pattern>(), Err(PatternError::Hostname(_))));
        assert!(matches!("bad host".parse::<Pattern>(), Err(PatternError::Hostname(_))));
    }

    #[test]
    fn test_address_matching() {
        let cidr: Pattern = "10.0.0.0/8".parse().unwrap();
        assert!(cidr.matches(ip("10.1.2.3"), None));
        assert!(!cidr.matches(ip("11.0.0.1"), None));
        assert!(cidr.matches(ip("::ffff:10.1.2.3"), None));

        let range: Pattern = "10.0.0.5-10.0.0.10".parse().unwrap();
        assert!(range.matches(ip("10.0.0.7"), None));
        assert!(!range.matches(ip("10.0.0.11"), None));
        assert!(!range.matches(ip("::1"), None));

        let wildcard: Pattern = "192.168.*.1".parse().unwrap();
        assert!(wildcard.matches(ip("192.168.44.1"), None));
        assert!(!wildcard.matches(ip("192.168.44.2"), None));
    }

    #[test]
    fn test_hostname_matching() {
        let glob: Pattern = "*.Example.com".parse().unwrap();
        assert!(glob.matches(None, Some("api.example.COM")));
        assert!(!glob.matches(None, Some("example.org")));
        assert!(!glob.matches(ip("10.0.0.1"), None));
    }

    #[test]
    fn test_specificity_ordering() {
        let exact: Pattern = "10.1.2.3".parse().unwrap();
        let narrow: Pattern = "10.1.0.0/16".parse().unwrap();
        let wide: Pattern = "10.0.0.0/8".parse().unwrap();
        assert!(exact.specificity() > narrow.specificity());
        assert!(narrow.specificity() > wide.specificity());
        assert!(wide.specificity() > Pattern::Any.specificity());
    }

    #[test]
    fn test_serde_as_string() {
        let pattern: Pattern = serde_json::from_str("\"10.0.0.0/8\"").unwrap();
        assert_eq!(serde_json::to_string(&pattern).unwrap(), "\"10.0.0.0/8\"");
        assert!(serde_json::from_str::<Pattern>("\"10.0.0.0/99\"").is_err());
    }
}
