use crate::collectors::CollectError;
use crate::report::CertificateStatus;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::time;
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::parse_x509_certificate;

const SECS_PER_DAY: i64 = 86_400;

/// Reads the expiry of whatever certificate is served on each port. Ports
/// without a listener or with a failed handshake are skipped.
pub async fn certificate_expiry(
    host: &str,
    ports: &[u16],
    timeout: Duration,
) -> Vec<CertificateStatus> {
    let connector = match connector() {
        Ok(c) => c,
        Err(err) => {
            debug!(collector = "certificates", error = %err, "tls setup failed");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for &port in ports {
        let endpoint = format!("{host}:{port}");
        match time::timeout(timeout, probe(&connector, host, port)).await {
            Ok(Ok(not_after)) => out.push(status_at(endpoint, not_after, now_unix())),
            Ok(Err(err)) => {
                debug!(collector = "certificates", endpoint = %endpoint, error = %err, "probe failed")
            }
            Err(_elapsed) => {
                debug!(collector = "certificates", endpoint = %endpoint, "probe timed out")
            }
        }
    }
    out
}

async fn probe(connector: &TlsConnector, host: &str, port: u16) -> Result<i64, CollectError> {
    let tcp = TcpStream::connect((host, port)).await?;
    let server_name = ServerName::try_from(host)
        .map_err(|err| CollectError::Tls(err.to_string()))?
        .to_owned();
    let stream = connector.connect(server_name, tcp).await?;

    let (_, session) = stream.get_ref();
    let leaf = session
        .peer_certificates()
        .and_then(|chain| chain.first())
        .ok_or_else(|| CollectError::Tls("no peer certificate".to_string()))?;

    not_after_unix(leaf.as_ref())
}

/// `notAfter` of a DER certificate as unix seconds.
pub fn not_after_unix(der: &[u8]) -> Result<i64, CollectError> {
    let (_, cert) =
        parse_x509_certificate(der).map_err(|err| CollectError::Parse(err.to_string()))?;
    Ok(cert.validity().not_after.timestamp())
}

pub fn status_at(endpoint: String, not_after: i64, now: i64) -> CertificateStatus {
    let days_remaining = (not_after - now).div_euclid(SECS_PER_DAY);
    CertificateStatus {
        endpoint,
        expires_on: format_date(not_after),
        days_remaining,
    }
}

fn format_date(unix: i64) -> String {
    let at = if unix >= 0 {
        UNIX_EPOCH + Duration::from_secs(unix as u64)
    } else {
        UNIX_EPOCH
    };
    let stamp = humantime::format_rfc3339_seconds(at).to_string();
    stamp.get(..10).unwrap_or(&stamp).to_string()
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn connector() -> Result<TlsConnector, CollectError> {
    let provider = Arc::new(crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|err| CollectError::Tls(err.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(ExpiryOnlyVerifier(provider)))
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Accepts any chain so self-signed and expired certificates can still be
/// inspected. Handshake signatures are still checked.
#[derive(Debug)]
struct ExpiryOnlyVerifier(Arc<CryptoProvider>);

impl ServerCertVerifier for ExpiryOnlyVerifier {
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
        crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_remaining_rounds_down() {
        let now = 1_700_000_000;
        let s = status_at("h:443".to_string(), now + 10 * SECS_PER_DAY + 3_600, now);
        assert_eq!(s.days_remaining, 10);
        assert_eq!(s.endpoint, "h:443");

        let expired = status_at("h:443".to_string(), now - 3_600, now);
        assert_eq!(expired.days_remaining, -1);
    }

    #[test]
    fn expiry_date_is_utc_day() {
        // 2024-03-01T12:00:00Z
        let s = status_at("h:443".to_string(), 1_709_294_400, 1_709_294_400);
        assert_eq!(s.expires_on, "2024-03-01");
        assert_eq!(s.days_remaining, 0);
    }

    #[test]
    fn garbage_der_is_rejected() {
        assert!(not_after_unix(&[0x30, 0x03, 0x01, 0x02]).is_err());
    }

    #[test]
    fn connector_builds() {
        assert!(connector().is_ok());
    }

    #[tokio::test]
    async fn closed_ports_are_skipped() {
        let out = certificate_expiry("127.0.0.1", &[9, 1], Duration::from_millis(500)).await;
        assert!(out.is_empty());
    }
}
