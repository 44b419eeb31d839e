//! TLS utilities for the HTTP client.
//!
//! This module provides cached loading of native root certificates to avoid
//! repeated OS certificate store lookups (which can be slow on some platforms),
//! plus assembly of the `tokio_rustls::TlsConnector` the connection pool
//! shares for every origin (read-only after client construction, safely
//! shared across concurrent requests).

use crate::config::ClientConfig;
use crate::error::HttpError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::verify_tls12_signature;
use rustls::crypto::verify_tls13_signature;
use rustls::DigitallySignedStruct;
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::fs;
use std::sync::{Arc, OnceLock};
use tokio_rustls::TlsConnector;

/// Cached native root certificates.
/// Always stores Ok; empty vec means no certs found (warned, not errored).
static NATIVE_ROOTS_CACHE: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

/// Counter for test verification that the loader only runs once.
#[cfg(test)]
static LOAD_COUNT: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

/// Load native root certificates from the OS certificate store.
///
/// This function is called once and the result is cached for subsequent calls.
/// Returns Ok with potentially empty vec; missing certs are warned, not errored.
fn load_native_certs_inner() -> Vec<CertificateDer<'static>> {
    #[cfg(test)]
    LOAD_COUNT.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    let result = rustls_native_certs::load_native_certs();

    // Log any errors encountered during loading
    if !result.errors.is_empty() {
        for err in &result.errors {
            tracing::warn!(error = %err, "error loading native root certificate");
        }
    }

    let certs: Vec<CertificateDer<'static>> = result.certs;

    if certs.is_empty() {
        tracing::warn!("no native root CA certificates found");
    } else {
        tracing::debug!(count = certs.len(), "loaded native root certificates");
    }

    certs
}

/// Get cached native root certificates.
///
/// Returns a reference to the cached certificates (may be empty).
/// The certificates are loaded lazily on first call and cached for all subsequent calls.
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS_CACHE
        .get_or_init(load_native_certs_inner)
        .as_slice()
}

/// Get the crypto provider for TLS connections.
///
/// This function follows the reqwest pattern:
/// 1. Check if a default provider is already installed globally
/// 2. If yes, use that (respects user configuration)
/// 3. If no, create a new aws-lc-rs provider without installing it globally
///
/// This avoids global state mutation and is safe to call from multiple threads.
pub fn get_crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Read extra trust material from `ca_cert_file` (a single PEM file) and
/// `ca_cert_path` (a directory of PEM files, one cert collection each).
fn load_extra_certs(config: &ClientConfig) -> Result<Vec<CertificateDer<'static>>, HttpError> {
    let mut certs = Vec::new();

    if let Some(path) = &config.ca_cert_file {
        certs.extend(parse_pem_file(path)?);
    }

    if let Some(dir) = &config.ca_cert_path {
        let entries = fs::read_dir(dir).map_err(|e| HttpError::TlsError {
            host: dir.clone(),
            source: Box::new(e),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| HttpError::TlsError {
                host: dir.clone(),
                source: Box::new(e),
            })?;
            certs.extend(parse_pem_file(&entry.path().to_string_lossy())?);
        }
    }

    Ok(certs)
}

fn parse_pem_file(path: &str) -> Result<Vec<CertificateDer<'static>>, HttpError> {
    let bytes = fs::read(path).map_err(|e| HttpError::TlsError {
        host: path.to_string(),
        source: Box::new(e),
    })?;
    let mut reader = std::io::Cursor::new(bytes);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| HttpError::TlsError {
            host: path.to_string(),
            source: Box::new(e),
        })
}

/// Build the rustls `ClientConfig` for `config`: native OS roots plus any
/// `ca_cert_file`/`ca_cert_path` material, or peer verification disabled
/// entirely when `verify_ssl` is false (insecure — intended for local
/// test servers with self-signed certs).
pub fn client_config_for(config: &ClientConfig) -> Result<rustls::ClientConfig, HttpError> {
    let provider = get_crypto_provider();

    if !config.verify_ssl {
        tracing::warn!("TLS peer verification disabled (verify_ssl = false); traffic is not authenticated");
        let builder = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| HttpError::TlsError {
                host: String::new(),
                source: Box::new(e),
            })?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerify));
        return Ok(builder.with_no_client_auth());
    }

    let mut root_store = rustls::RootCertStore::empty();
    let native = native_root_certs();
    if !native.is_empty() {
        root_store.add_parsable_certificates(native.iter().cloned());
    }

    let extra = load_extra_certs(config)?;
    if !extra.is_empty() {
        let (added, ignored) = root_store.add_parsable_certificates(extra);
        if ignored > 0 {
            tracing::warn!(added, ignored, "some configured CA certificates could not be parsed");
        }
    }

    if root_store.is_empty() {
        return Err(HttpError::TlsError {
            host: String::new(),
            source: Box::new(std::io::Error::other("no trusted CA certificates available")),
        });
    }

    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| HttpError::TlsError {
            host: String::new(),
            source: Box::new(e),
        })?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}

/// Build the shared `TlsConnector` the pool hands to every HTTPS origin.
pub fn connector_for(config: &ClientConfig) -> Result<TlsConnector, HttpError> {
    Ok(TlsConnector::from(Arc::new(client_config_for(config)?)))
}

/// A `ServerCertVerifier` that accepts any certificate chain, used only
/// when the caller has explicitly set `verify_ssl = false`.
#[derive(Debug)]
struct NoVerify;

impl ServerCertVerifier for NoVerify {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &rustls::crypto::aws_lc_rs::default_provider().signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &rustls::crypto::aws_lc_rs::default_provider().signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
