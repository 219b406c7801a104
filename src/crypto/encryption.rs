use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use super::CryptoError;
use super::keys::KEY_LENGTH;

pub const IV_LENGTH: usize = 16;
const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Ciphertext plus the hex IV it was produced with.
///
/// AES-256-CBC with PKCS#7 padding. There is no authentication tag:
/// the codec gives confidentiality only, and a modified ciphertext
/// decrypts to modified plaintext unless the padding check trips.
#[derive(Debug, Clone)]
pub struct EncryptedDocument {
    pub ciphertext: Vec<u8>,
    pub iv_hex: String,
}

impl EncryptedDocument {
    /// Encrypt with a fresh random IV from the OS RNG.
    pub(crate) fn encrypt(
        key_bytes: &[u8; KEY_LENGTH],
        plaintext: &[u8],
    ) -> Result<Self, CryptoError> {
        let mut iv = [0u8; IV_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let cipher = Aes256CbcEnc::new_from_slices(key_bytes, &iv)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(Self {
            ciphertext,
            iv_hex: hex::encode(iv),
        })
    }

    /// Reverse `encrypt`. Fails on bad IV, bad length, or a padding mismatch
    /// (the usual symptom of a wrong key).
    pub(crate) fn decrypt(
        key_bytes: &[u8; KEY_LENGTH],
        ciphertext: &[u8],
        iv_hex: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        let iv = hex::decode(iv_hex)
            .map_err(|e| CryptoError::DecryptionFailed(format!("IV is not valid hex: {e}")))?;
        if iv.len() != IV_LENGTH {
            return Err(CryptoError::DecryptionFailed(format!(
                "IV must be {IV_LENGTH} bytes, got {}",
                iv.len()
            )));
        }
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::DecryptionFailed(format!(
                "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
                ciphertext.len()
            )));
        }

        let cipher = Aes256CbcDec::new_from_slices(key_bytes, &iv)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed("bad padding (wrong key or corrupted data)".into()))
    }
}
