use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::{Result, anyhow};
use base64::Engine;
use hmac::Mac;
use sha2::Sha256;

type HmacSha256 = hmac::Hmac<Sha256>;

const KEY_CONTEXT: &[u8] = b"pmcouncil-credentials-v1";
const NONCE_LEN: usize = 12;

/// Derive a 256-bit key from hostname and username. Stable across restarts,
/// tied to the local machine and account.
fn derive_key() -> Result<[u8; 32]> {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let username = whoami::username();

    let mut mac = <HmacSha256 as Mac>::new_from_slice(KEY_CONTEXT)
        .map_err(|e| anyhow!("Key derivation failed: {}", e))?;
    mac.update(hostname.as_bytes());
    mac.update(username.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}

/// Encrypts data-source tokens before they touch the database.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    pub fn for_local_machine() -> Result<Self> {
        Self::from_key(&derive_key()?)
    }

    pub fn from_key(key: &[u8; 32]) -> Result<Self> {
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| anyhow!("Invalid cipher key: {}", e))?;
        Ok(Self { cipher })
    }

    /// Returns base64(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(&combined))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let combined = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| anyhow!("Base64 decode failed: {}", e))?;

        if combined.len() <= NONCE_LEN {
            return Err(anyhow!("Encrypted value too short"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow!("Decryption failed: {}", e))?;

        String::from_utf8(plaintext).map_err(|e| anyhow!("UTF-8 decode failed: {}", e))
    }
}

#[cfg(test)]
pub(crate) fn test_cipher() -> CredentialCipher {
    CredentialCipher::from_key(&[7u8; 32]).unwrap()
}
