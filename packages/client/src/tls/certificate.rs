//! Subject name extraction and host matching for peer certificates

use std::net::IpAddr;

use x509_parser::extensions::GeneralName;
use x509_parser::parse_x509_certificate;

use super::errors::TlsError;

/// The DNS names and IP addresses a certificate was issued for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectNames {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl SubjectNames {
    /// Reads the subject alternative names of a DER encoded certificate.
    ///
    /// # Errors
    ///
    /// Returns `TlsError::Certificate` if the certificate cannot be parsed.
    pub fn from_der(der: &[u8]) -> Result<SubjectNames, TlsError> {
        let (_, cert) = parse_x509_certificate(der)
            .map_err(|e| TlsError::Certificate(format!("unparsable peer certificate: {e}")))?;

        let mut names = SubjectNames::default();
        let san = cert
            .subject_alternative_name()
            .map_err(|e| TlsError::Certificate(format!("malformed subjectAltName: {e}")))?;

        if let Some(san) = san {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => names.dns_names.push(dns.to_ascii_lowercase()),
                    GeneralName::IPAddress(bytes) => {
                        if let Some(ip) = ip_from_bytes(bytes) {
                            names.ip_addresses.push(ip);
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(names)
    }

    /// Whether the certificate covers `host`.
    ///
    /// IP literals match IP SANs exactly. Host names match DNS SANs
    /// case-insensitively, with `*.` wildcards covering exactly one label.
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            return self.ip_addresses.contains(&ip);
        }

        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.dns_names
            .iter()
            .any(|pattern| match_hostname(&host, pattern.trim_end_matches('.')))
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}

/// Match a lowercase host name against a certificate name pattern.
fn match_hostname(host: &str, pattern: &str) -> bool {
    if host.is_empty() || pattern.is_empty() {
        return false;
    }

    let Some(suffix) = pattern.strip_prefix("*.") else {
        return host == pattern;
    };

    // Wildcards never span labels and never match a bare suffix.
    if suffix.contains('*') || !suffix.contains('.') {
        return false;
    }
    match host.strip_suffix(suffix) {
        Some(prefix) => {
            prefix.len() > 1 && prefix.ends_with('.') && !prefix[..prefix.len() - 1].contains('.')
        }
        None => false,
    }
}
