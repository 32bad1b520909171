use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("feedwatch/", env!("CARGO_PKG_VERSION"));

/// Errors loading the extra certificate authority. All are fatal at startup.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("Failed to read CA certificate '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid PEM in CA certificate: {0}")]
    InvalidPem(#[source] reqwest::Error),
    #[error("No certificates found in CA bundle")]
    Empty,
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Transport settings injected into [`build_client`].
#[derive(Debug, Clone)]
pub struct TrustConfig {
    /// PEM bundle appended to the built-in roots.
    pub ca_cert: Option<PathBuf>,
    pub timeout: Duration,
}

/// Parses every certificate in a PEM bundle.
pub fn load_certificates(pem: &[u8]) -> Result<Vec<reqwest::Certificate>, TrustError> {
    let certs = reqwest::Certificate::from_pem_bundle(pem).map_err(TrustError::InvalidPem)?;
    if certs.is_empty() {
        return Err(TrustError::Empty);
    }
    Ok(certs)
}

fn read_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>, TrustError> {
    let pem = std::fs::read(path).map_err(|source| TrustError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_certificates(&pem)
}

/// Builds the HTTP client used for the feed fetch.
///
/// The built-in roots stay enabled; certificates from `ca_cert` are added on
/// top of them so servers with an uncommon chain can still be reached.
pub fn build_client(config: &TrustConfig) -> Result<reqwest::Client, TrustError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.timeout);

    if let Some(path) = &config.ca_cert {
        let certs = read_bundle(path)?;
        tracing::debug!(path = %path.display(), count = certs.len(), "Loaded extra CA certificates");
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    builder.build().map_err(TrustError::Client)
}
