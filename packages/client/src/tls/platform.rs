//! Trust-root selection for the host the client runs on

use once_cell::sync::OnceCell;
use rustls::RootCertStore;

use super::errors::TlsError;
use super::provider::RustlsProvider;

/// Where the default TLS provider gets its trust anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// The operating system's certificate store.
    NativeRoots,
    /// The Mozilla root program bundled at build time.
    WebpkiRoots,
}

static DETECTED: OnceCell<Platform> = OnceCell::new();

impl Platform {
    /// Inspects the host once per process; later calls return the cached answer.
    pub fn detect() -> Platform {
        *DETECTED.get_or_init(|| {
            let native = rustls_native_certs::load_native_certs();
            let platform = if native.certs.is_empty() {
                Platform::WebpkiRoots
            } else {
                Platform::NativeRoots
            };
            tracing::debug!(
                target: "hopwire::tls",
                ?platform,
                native_certs = native.certs.len(),
                native_errors = native.errors.len(),
                "detected TLS platform"
            );
            platform
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Platform::NativeRoots => "native",
            Platform::WebpkiRoots => "webpki",
        }
    }

    /// Builds the root store for this platform.
    #[must_use]
    pub fn root_store(&self) -> RootCertStore {
        let mut roots = RootCertStore::empty();
        match self {
            Platform::NativeRoots => {
                let native = rustls_native_certs::load_native_certs();
                let (added, ignored) = roots.add_parsable_certificates(native.certs);
                if ignored > 0 {
                    tracing::warn!(target: "hopwire::tls", added, ignored, "skipped unparsable native roots");
                }
                if roots.is_empty() {
                    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                }
            }
            Platform::WebpkiRoots => {
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            }
        }
        roots
    }

    /// The default TLS provider for this platform.
    ///
    /// # Errors
    ///
    /// Returns `TlsError::Configuration` if rustls cannot be configured.
    pub fn tls_provider(&self) -> Result<RustlsProvider, TlsError> {
        RustlsProvider::new(self.root_store())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_is_stable() {
        assert_eq!(Platform::detect(), Platform::detect());
    }

    #[test]
    fn webpki_roots_are_never_empty() {
        assert!(!Platform::WebpkiRoots.root_store().is_empty());
        assert!(Platform::WebpkiRoots.tls_provider().is_ok());
    }
}
