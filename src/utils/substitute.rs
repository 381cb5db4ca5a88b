//! String substitution helpers for identity templating.
//!
//! Plain token replacement skips empty tokens: replacing `""` would otherwise
//! splice the replacement in front of every character. Port replacement is
//! anchored to a leading `:` and to a word boundary after the number, so
//! `8080` never matches inside `:80800` or in a bare numeric string. IP
//! replacement only matches whole addresses, so `10.0.0.5` never matches
//! inside `10.0.0.50` or `110.0.0.5`.
//!
//! # Examples
//!
//! ```
//! use ptx::utils::substitute::{replace_all, replace_first, IpSubstitution, PortSubstitution};
//!
//! # fn main() -> anyhow::Result<()> {
//! assert_eq!(replace_first("myapp-myapp", "myapp", "svc"), "svc-myapp");
//! assert_eq!(replace_all("myapp-myapp", "myapp", "svc"), "svc-svc");
//! assert_eq!(replace_all("unchanged", "", "svc"), "unchanged");
//!
//! let port = PortSubstitution::new("8080", "{{ .Values.port }}")?;
//! assert_eq!(port.apply("10.0.0.5:8080/health"), "10.0.0.5:{{ .Values.port }}/health");
//! assert_eq!(port.apply("id-8080"), "id-8080");
//!
//! let ip = IpSubstitution::new("10.0.0.5", "{{ .Values.ip }}")?;
//! assert_eq!(ip.apply("10.0.0.5:8080"), "{{ .Values.ip }}:8080");
//! assert_eq!(ip.apply("10.0.0.50:8080"), "10.0.0.50:8080");
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, Result};
use regex::{NoExpand, Regex};

/// Replaces the first occurrence of `token` in `haystack`.
///
/// Returns `haystack` unchanged when `token` is empty.
pub fn replace_first(haystack: &str, token: &str, replacement: &str) -> String {
    if token.is_empty() {
        return haystack.to_string();
    }
    haystack.replacen(token, replacement, 1)
}

/// Replaces every occurrence of `token` in `haystack`.
///
/// Returns `haystack` unchanged when `token` is empty.
pub fn replace_all(haystack: &str, token: &str, replacement: &str) -> String {
    if token.is_empty() {
        return haystack.to_string();
    }
    haystack.replace(token, replacement)
}

/// A compiled, colon-anchored port substitution.
#[derive(Debug, Clone)]
pub struct PortSubstitution {
    pattern: Regex,
    replacement: String,
}

impl PortSubstitution {
    /// Compiles a substitution of `:<port>` with `:<placeholder>`.
    ///
    /// # Errors
    ///
    /// Returns an error if `port` is empty or the pattern fails to compile.
    pub fn new(port: &str, placeholder: &str) -> Result<Self> {
        if port.is_empty() {
            return Err(anyhow!("Port cannot be empty"));
        }

        let pattern = Regex::new(&format!(r":{}\b", regex::escape(port)))
            .map_err(|e| anyhow!("Failed to compile port pattern for {}: {}", port, e))?;

        Ok(Self {
            pattern,
            replacement: format!(":{}", placeholder),
        })
    }

    /// Replaces every colon-anchored occurrence of the port in `haystack`.
    pub fn apply(&self, haystack: &str) -> String {
        self.pattern
            .replace_all(haystack, NoExpand(&self.replacement))
            .into_owned()
    }
}

/// A whole-address IP substitution.
///
/// An occurrence only counts when the characters on either side cannot
/// continue the address: digits and `.` for IPv4, additionally hex digits
/// and `:` for IPv6. A `:` after an IPv4 address is the port separator and
/// does not block the match.
#[derive(Debug, Clone)]
pub struct IpSubstitution {
    ip: String,
    replacement: String,
    ipv6: bool,
}

impl IpSubstitution {
    /// Prepares a substitution of the address `ip` with `placeholder`.
    ///
    /// # Errors
    ///
    /// Returns an error if `ip` is empty.
    pub fn new(ip: &str, placeholder: &str) -> Result<Self> {
        if ip.trim().is_empty() {
            return Err(anyhow!("IP cannot be empty"));
        }

        Ok(Self {
            ip: ip.to_string(),
            replacement: placeholder.to_string(),
            ipv6: ip.contains(':'),
        })
    }

    /// Replaces every whole-address occurrence of the IP in `haystack`.
    pub fn apply(&self, haystack: &str) -> String {
        let mut output = String::with_capacity(haystack.len());
        let mut copied = 0;

        for (start, _) in haystack.match_indices(self.ip.as_str()) {
            let end = start + self.ip.len();
            let before = haystack[..start].chars().next_back();
            let after = haystack[end..].chars().next();

            if before.is_some_and(|c| self.continues_address(c))
                || after.is_some_and(|c| self.continues_address(c))
            {
                continue;
            }

            output.push_str(&haystack[copied..start]);
            output.push_str(&self.replacement);
            copied = end;
        }

        output.push_str(&haystack[copied..]);
        output
    }

    fn continues_address(&self, c: char) -> bool {
        if self.ipv6 {
            c.is_ascii_hexdigit() || c == '.' || c == ':'
        } else {
            c.is_ascii_digit() || c == '.'
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_first_only_first() {
        assert_eq!(replace_first("a-a-a", "a", "b"), "b-a-a");
        assert_eq!(replace_first("xyz", "a", "b"), "xyz");
    }

    #[test]
    fn test_replace_all() {
        assert_eq!(replace_all("a-a-a", "a", "b"), "b-b-b");
    }

    #[test]
    fn test_empty_token_is_noop() {
        assert_eq!(replace_first("abc", "", "X"), "abc");
        assert_eq!(replace_all("abc", "", "X"), "abc");
    }

    #[test]
    fn test_port_requires_leading_colon() -> Result<()> {
        let port = PortSubstitution::new("8080", "P")?;
        assert_eq!(port.apply(":8080"), ":P");
        assert_eq!(port.apply("host:8080/path"), "host:P/path");
        assert_eq!(port.apply("8080"), "8080");
        assert_eq!(port.apply("/v1/items/8080"), "/v1/items/8080");
        Ok(())
    }

    #[test]
    fn test_port_requires_boundary_after_number() -> Result<()> {
        let port = PortSubstitution::new("80", "P")?;
        assert_eq!(port.apply("host:8080"), "host:8080");
        assert_eq!(port.apply("host:80"), "host:P");
        assert_eq!(port.apply("host:80/x"), "host:P/x");
        Ok(())
    }

    #[test]
    fn test_port_replaces_every_occurrence() -> Result<()> {
        let port = PortSubstitution::new("443", "P")?;
        assert_eq!(port.apply("a:443,b:443"), "a:P,b:P");
        assert_eq!(port.apply("a:443:443"), "a:P:P");
        Ok(())
    }

    #[test]
    fn test_placeholder_dollar_is_literal() -> Result<()> {
        let port = PortSubstitution::new("80", "${PORT}")?;
        assert_eq!(port.apply("host:80"), "host:${PORT}");
        Ok(())
    }

    #[test]
    fn test_ip_matches_whole_address_only() -> Result<()> {
        let ip = IpSubstitution::new("10.0.0.5", "IP")?;
        assert_eq!(ip.apply("10.0.0.5"), "IP");
        assert_eq!(ip.apply("10.0.0.5:8080"), "IP:8080");
        assert_eq!(ip.apply("http://10.0.0.5/x"), "http://IP/x");
        assert_eq!(ip.apply("10.0.0.50:80"), "10.0.0.50:80");
        assert_eq!(ip.apply("110.0.0.5:80"), "110.0.0.5:80");
        assert_eq!(ip.apply("10.0.0.5.1"), "10.0.0.5.1");
        Ok(())
    }

    #[test]
    fn test_ip_replaces_every_whole_occurrence() -> Result<()> {
        let ip = IpSubstitution::new("10.0.0.5", "IP")?;
        assert_eq!(ip.apply("10.0.0.5,10.0.0.50,10.0.0.5"), "IP,10.0.0.50,IP");
        Ok(())
    }

    #[test]
    fn test_ipv6_boundaries() -> Result<()> {
        let ip = IpSubstitution::new("fd00::1", "IP")?;
        assert_eq!(ip.apply("[fd00::1]:443"), "[IP]:443");
        assert_eq!(ip.apply("[fd00::1a]:443"), "[fd00::1a]:443");
        Ok(())
    }

    #[test]
    fn test_empty_ip_rejected() {
        assert!(IpSubstitution::new("", "IP").is_err());
    }

    #[test]
    fn test_empty_port_rejected() {
        assert!(PortSubstitution::new("", "P").is_err());
    }
}
