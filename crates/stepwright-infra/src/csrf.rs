//! Anti-forgery tokens for mutating API requests.
//!
//! A token is `<nonce>.<mac>`, where `mac` is the lowercase hex HMAC-SHA256
//! of `"<namespace>:<nonce>"` under the server secret. Tokens are stateless:
//! any token minted with the current secret for the same namespace verifies.

use std::path::Path;

use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Namespace every workflow API mutation is checked against.
pub const WORKFLOW_API_NAMESPACE: &str = "workflow_api";

/// File (inside the data directory) holding the generated secret.
pub const KEY_FILE_NAME: &str = "csrf.key";

const NONCE_LEN: usize = 16;
const SECRET_LEN: usize = 32;

/// Errors from anti-forgery token handling.
#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("invalid signing key")]
    InvalidKey,

    #[error("key file error: {0}")]
    KeyFile(#[from] std::io::Error),
}

/// Issues and verifies anti-forgery tokens.
#[derive(Clone)]
pub struct CsrfTokenManager {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CsrfTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokenManager").finish_non_exhaustive()
    }
}

impl CsrfTokenManager {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Build a manager from the configured secret, or from the key file in
    /// `data_dir`, generating the file on first use.
    pub async fn load(configured: Option<&str>, data_dir: &Path) -> Result<Self, CsrfError> {
        if let Some(secret) = configured.filter(|s| !s.is_empty()) {
            return Ok(Self::new(secret.as_bytes()));
        }

        let key_path = data_dir.join(KEY_FILE_NAME);
        match tokio::fs::read_to_string(&key_path).await {
            Ok(content) => {
                let secret = hex_decode(content.trim()).ok_or(CsrfError::Malformed)?;
                Ok(Self::new(secret))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let mut secret = vec![0u8; SECRET_LEN];
                OsRng.fill_bytes(&mut secret);
                tokio::fs::create_dir_all(data_dir).await?;
                tokio::fs::write(&key_path, hex_encode(&secret)).await?;
                restrict_permissions(&key_path).await?;
                tracing::info!(path = %key_path.display(), "generated anti-forgery secret");
                Ok(Self::new(secret))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Mint a fresh token for `namespace`.
    pub fn issue(&self, namespace: &str) -> Result<String, CsrfError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let nonce = hex_encode(&nonce);
        let mac = self.mac(namespace, &nonce)?.finalize().into_bytes();
        Ok(format!("{nonce}.{}", hex_encode(&mac)))
    }

    /// Check `token` against `namespace`. Comparison is constant-time.
    pub fn verify(&self, namespace: &str, token: &str) -> Result<(), CsrfError> {
        let (nonce, signature) = token.trim().split_once('.').ok_or(CsrfError::Malformed)?;
        if nonce.is_empty() {
            return Err(CsrfError::Malformed);
        }
        let signature = hex_decode(signature).ok_or(CsrfError::Malformed)?;

        self.mac(namespace, nonce)?
            .verify_slice(&signature)
            .map_err(|_| CsrfError::BadSignature)
    }

    fn mac(&self, namespace: &str, nonce: &str) -> Result<HmacSha256, CsrfError> {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.secret).map_err(|_| CsrfError::InvalidKey)?;
        mac.update(namespace.as_bytes());
        mac.update(b":");
        mac.update(nonce.as_bytes());
        Ok(mac)
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
