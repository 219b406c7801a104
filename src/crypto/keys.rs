use zeroize::Zeroize;

use super::CryptoError;
use super::encryption::EncryptedDocument;

pub const KEY_LENGTH: usize = 32; // AES-256

/// Process-wide document key: zeroed on drop.
///
/// One key protects every stored document. Replacing it without
/// re-encrypting existing records makes those records undecryptable.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct DocumentKey {
    key_bytes: [u8; KEY_LENGTH],
}

impl DocumentKey {
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key_bytes: bytes }
    }

    /// Parse a key from 64 hex characters.
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let mut decoded = hex::decode(hex_key)
            .map_err(|e| CryptoError::InvalidKey(format!("not valid hex: {e}")))?;
        if decoded.len() != KEY_LENGTH {
            let len = decoded.len();
            decoded.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "expected {KEY_LENGTH} bytes, got {len}"
            )));
        }
        let mut key_bytes = [0u8; KEY_LENGTH];
        key_bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { key_bytes })
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key_bytes
    }

    /// Encrypt a document body with a fresh IV.
    pub fn encrypt(&self, plaintext: impl AsRef<[u8]>) -> Result<EncryptedDocument, CryptoError> {
        EncryptedDocument::encrypt(&self.key_bytes, plaintext.as_ref())
    }

    /// Decrypt a stored body given its hex IV.
    pub fn decrypt(&self, ciphertext: &[u8], iv_hex: &str) -> Result<Vec<u8>, CryptoError> {
        EncryptedDocument::decrypt(&self.key_bytes, ciphertext, iv_hex)
    }
}

impl std::fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DocumentKey(..)")
    }
}

/// Generate a random key, hex-encoded (used by operators to provision
/// `CASEVAULT_ENCRYPTION_KEY`).
pub fn generate_key_hex() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; KEY_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let encoded = hex::encode(bytes);
    bytes.zeroize();
    encoded
}
