//! Key material and challenge signing for device authentication.
//!
//! Authentication uses a 2048-bit RSA key. The device sends a random token
//! and expects back a signature in a fixed legacy format: a SHA-1 digest of
//! the token wrapped in a hand-built PKCS#1 v1.5 block, run through the raw
//! private-key transformation. A standard "RSA with SHA-1" signing API is
//! incompatible here because it applies its own padding on top of the
//! digest, so the padding and the modular exponentiation are both done by
//! hand.
//!
//! The public half travels as the custom encoding the device's auth daemon
//! parses: a little-endian word dump of the modulus plus two Montgomery
//! parameters, base64-encoded, with a trailing identifying name.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use sha1::{Digest, Sha1};

use crate::error::{ProtocolError, Result};

/// RSA key size in bits.
pub const KEY_BITS: usize = 2048;

/// Signature length in bytes, equal to the modulus width.
pub const SIGNATURE_LENGTH: usize = 256;

/// Default identifying name appended to the public key blob.
pub const DEFAULT_KEY_NAME: &str = "wireless@adb";

/// Number of 32-bit words in the modulus.
const MODULUS_WORDS: usize = KEY_BITS / 32;

/// ASN.1 DigestInfo prefix identifying SHA-1, prepended to the digest
/// inside the padded block.
const SHA1_DIGEST_INFO: [u8; 15] = [
    0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14,
];

/// An RSA-2048 keypair plus the device-format public key blob.
///
/// Immutable once constructed. The blob is derived from the private key at
/// construction time, so the two halves can never disagree; a mismatched
/// pair would stall authentication with no error frame from the device.
#[derive(Clone)]
pub struct KeyMaterial {
    private_key: RsaPrivateKey,
    public_blob: Vec<u8>,
}

impl KeyMaterial {
    /// Generates a new keypair with the default identifying name.
    pub fn generate() -> Result<Self> {
        Self::generate_named(DEFAULT_KEY_NAME)
    }

    /// Generates a new keypair, naming the public blob `name`.
    pub fn generate_named(name: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
            .map_err(|e| ProtocolError::InvalidKey(format!("key generation failed: {e}")))?;
        Self::from_private_key(private_key, name)
    }

    /// Loads a keypair from a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str, name: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| ProtocolError::InvalidKey(format!("invalid PKCS#8 PEM: {e}")))?;
        Self::from_private_key(private_key, name)
    }

    fn from_private_key(private_key: RsaPrivateKey, name: &str) -> Result<Self> {
        if private_key.size() != SIGNATURE_LENGTH {
            return Err(ProtocolError::InvalidKey(format!(
                "expected a {KEY_BITS}-bit key, got {} bits",
                private_key.size() * 8
            )));
        }
        let public_blob = encode_public_key(&private_key, name)?;
        Ok(Self {
            private_key,
            public_blob,
        })
    }

    /// Serializes the private key as PKCS#8 PEM for persistence.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = self
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ProtocolError::InvalidKey(format!("PEM encoding failed: {e}")))?;
        Ok(pem.as_str().to_owned())
    }

    /// The public key blob sent in the AUTH public-key offer. Includes the
    /// trailing NUL the device expects on the wire.
    pub fn public_key_blob(&self) -> &[u8] {
        &self.public_blob
    }

    /// Signs a device challenge token.
    ///
    /// Always returns exactly [`SIGNATURE_LENGTH`] bytes regardless of the
    /// challenge length: the SHA-1 digest of the challenge is embedded in a
    /// hand-padded block and transformed with the private exponent directly.
    pub fn sign(&self, challenge: &[u8]) -> Result<Vec<u8>> {
        let digest: [u8; 20] = Sha1::digest(challenge).into();
        let block = padded_block(&digest);

        let m = BigUint::from_bytes_be(&block);
        let n = self.private_key.n();
        if &m >= n {
            // Unreachable with the leading zero byte; kept as a typed failure
            // instead of a wrong signature.
            return Err(ProtocolError::Signing(
                "padded block not reducible by the modulus".to_string(),
            ));
        }

        let s = m.modpow(self.private_key.d(), n);
        let bytes = s.to_bytes_be();
        let mut signature = vec![0u8; SIGNATURE_LENGTH];
        signature[SIGNATURE_LENGTH - bytes.len()..].copy_from_slice(&bytes);
        Ok(signature)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_key", &"[REDACTED]")
            .field("public_blob_len", &self.public_blob.len())
            .finish()
    }
}

/// Builds the 256-byte block that is exponentiated directly:
/// `00 01`, 218 bytes of `FF` filler, a `00` separator, the 15-byte SHA-1
/// DigestInfo prefix, then the 20-byte digest.
fn padded_block(digest: &[u8; 20]) -> [u8; SIGNATURE_LENGTH] {
    let mut block = [0xFFu8; SIGNATURE_LENGTH];
    block[0] = 0x00;
    block[1] = 0x01;

    let info_offset = SIGNATURE_LENGTH - SHA1_DIGEST_INFO.len() - digest.len();
    block[info_offset - 1] = 0x00;
    block[info_offset..info_offset + SHA1_DIGEST_INFO.len()].copy_from_slice(&SHA1_DIGEST_INFO);
    block[SIGNATURE_LENGTH - digest.len()..].copy_from_slice(digest);
    block
}

/// Encodes the public key in the device's custom format: little-endian
/// words of `{word count, n0inv, modulus, rr, exponent}` where
/// `n0inv = -1/n mod 2^32` and `rr = (2^2048)^2 mod n` (Montgomery
/// parameters the device precomputes into the blob), base64 without
/// wrapping, a space, the identifying name, and a trailing NUL.
fn encode_public_key(key: &RsaPrivateKey, name: &str) -> Result<Vec<u8>> {
    let n_words = to_le_words(key.n())?;

    // Modular inverse of the low modulus word by Newton iteration; five
    // doubling steps cover all 32 bits. The modulus is odd so the inverse
    // exists.
    let n0 = n_words[0];
    let mut inv: u32 = 1;
    for _ in 0..5 {
        inv = inv.wrapping_mul(2u32.wrapping_sub(n0.wrapping_mul(inv)));
    }
    let n0inv = inv.wrapping_neg();

    let rr = (BigUint::from(1u8) << (KEY_BITS * 2)) % key.n();
    let rr_words = to_le_words(&rr)?;
    let exponent = low_u32(key.e())?;

    let mut raw = Vec::with_capacity(4 * (3 + 2 * MODULUS_WORDS));
    raw.extend_from_slice(&(MODULUS_WORDS as u32).to_le_bytes());
    raw.extend_from_slice(&n0inv.to_le_bytes());
    for word in &n_words {
        raw.extend_from_slice(&word.to_le_bytes());
    }
    for word in &rr_words {
        raw.extend_from_slice(&word.to_le_bytes());
    }
    raw.extend_from_slice(&exponent.to_le_bytes());

    let mut blob = STANDARD.encode(&raw).into_bytes();
    blob.push(b' ');
    blob.extend_from_slice(name.as_bytes());
    blob.push(0);
    Ok(blob)
}

/// Splits a big integer into little-endian 32-bit words, zero-padded to the
/// modulus width.
fn to_le_words(value: &BigUint) -> Result<[u32; MODULUS_WORDS]> {
    let bytes = value.to_bytes_le();
    if bytes.len() > MODULUS_WORDS * 4 {
        return Err(ProtocolError::InvalidKey(format!(
            "value wider than {KEY_BITS} bits"
        )));
    }
    let mut words = [0u32; MODULUS_WORDS];
    for (i, chunk) in bytes.chunks(4).enumerate() {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        words[i] = u32::from_le_bytes(word);
    }
    Ok(words)
}

/// Narrows a big integer to u32, failing if it does not fit.
fn low_u32(value: &BigUint) -> Result<u32> {
    let bytes = value.to_bytes_le();
    if bytes.len() > 4 {
        return Err(ProtocolError::InvalidKey(
            "public exponent wider than 32 bits".to_string(),
        ));
    }
    let mut word = [0u8; 4];
    word[..bytes.len()].copy_from_slice(&bytes);
    Ok(u32::from_le_bytes(word))
}
