//! Client-side envelope encryption for object bodies.
//!
//! Every encrypted object gets a fresh 256-bit data key. The body is
//! encrypted with AES-256-GCM in fixed-size chunks under that key, and
//! the data key itself is wrapped under the caller's long-lived key
//! material: AES-256-GCM for a pre-shared symmetric key, RSA-OAEP-SHA256
//! for a public/private key pair. The wrapped key, the nonce prefix, and
//! the chunk size travel with the object as user metadata, so any client
//! holding the same key material can decrypt.
//!
//! # Chunk format
//!
//! Plaintext is split into chunks of `chunk_size` bytes; each chunk is
//! sealed independently and grows by the 16-byte GCM tag. The 12-byte
//! chunk nonce is `prefix(7) || counter(4, big-endian) || final-flag(1)`.
//! The final chunk carries flag 1 and is always present, possibly empty,
//! so a truncated stream is detected when the flag never appears.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, StoreError};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Default plaintext bytes per encrypted chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// AES-GCM nonce size in bytes.
const NONCE_SIZE: usize = 12;

/// Random per-object prefix of each chunk nonce.
const NONCE_PREFIX_SIZE: usize = 7;

/// Largest chunk size accepted from object metadata. Bounds the buffer
/// allocated per chunk when decrypting a foreign object.
const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Metadata entry holding the base64 wrapped data key.
pub const META_KEY: &str = "x-amz-key";

/// Metadata entry holding the base64 nonce prefix.
pub const META_IV: &str = "x-amz-iv";

/// Metadata entry naming the content encryption algorithm.
pub const META_CEK_ALG: &str = "x-amz-cek-alg";

/// Metadata entry naming the key wrap algorithm.
pub const META_WRAP_ALG: &str = "x-amz-wrap-alg";

/// Metadata entry holding the decimal plaintext chunk size.
pub const META_CHUNK_SIZE: &str = "x-amz-chunk-size";

const CEK_ALG_AES_GCM: &str = "AES/GCM/NoPadding";
const WRAP_ALG_AES_GCM: &str = "A256GCM";
const WRAP_ALG_RSA_OAEP: &str = "RSA-OAEP-SHA256";

/// Key material for client-side envelope encryption.
///
/// The context decides how per-object data keys are wrapped. Uploads
/// need the wrapping side (master key or public key); downloads need
/// the unwrapping side (master key or private key).
#[derive(Clone)]
pub enum EncryptionContext {
    /// Pre-shared 256-bit master key. Data keys are wrapped with
    /// AES-256-GCM under this key.
    Symmetric {
        /// The 32-byte master key.
        master_key: [u8; KEY_SIZE],
    },
    /// RSA key pair. Data keys are wrapped with RSA-OAEP-SHA256 under
    /// the public key; the private key is only required for download.
    Asymmetric {
        /// Public key that wraps data keys on upload.
        public_key: RsaPublicKey,
        /// Private key that unwraps data keys on download.
        private_key: Option<RsaPrivateKey>,
    },
}

impl EncryptionContext {
    /// Build a symmetric context from raw master key bytes.
    pub fn symmetric(master_key: &[u8]) -> Result<Self, StoreError> {
        if master_key.len() != KEY_SIZE {
            return Err(StoreError::Crypto(CryptoError::InvalidKey {
                message: format!(
                    "master key must be {} bytes, got {}",
                    KEY_SIZE,
                    master_key.len()
                ),
            }));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(master_key);
        Ok(Self::Symmetric { master_key: key })
    }

    /// Build an asymmetric context from an RSA key pair.
    ///
    /// Pass `None` for the private key when the context is only used
    /// for uploads.
    pub fn asymmetric(public_key: RsaPublicKey, private_key: Option<RsaPrivateKey>) -> Self {
        Self::Asymmetric {
            public_key,
            private_key,
        }
    }

    fn wrap_algorithm(&self) -> &'static str {
        match self {
            Self::Symmetric { .. } => WRAP_ALG_AES_GCM,
            Self::Asymmetric { .. } => WRAP_ALG_RSA_OAEP,
        }
    }

    /// Generate fresh materials for one object upload.
    ///
    /// Draws a new data key and nonce prefix and returns them together
    /// with the metadata entries the stored object must carry so a later
    /// download can recover the key.
    pub fn generate_materials(&self, chunk_size: usize) -> Result<EncryptionMaterials, StoreError> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(StoreError::Crypto(CryptoError::InvalidKey {
                message: format!("chunk size {} out of range", chunk_size),
            }));
        }

        let mut data_key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut data_key);
        let mut nonce_prefix = [0u8; NONCE_PREFIX_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_prefix);

        let wrapped = self.wrap_data_key(&data_key)?;

        let mut metadata = HashMap::new();
        metadata.insert(META_KEY.to_string(), BASE64.encode(&wrapped));
        metadata.insert(META_IV.to_string(), BASE64.encode(nonce_prefix));
        metadata.insert(META_CEK_ALG.to_string(), CEK_ALG_AES_GCM.to_string());
        metadata.insert(
            META_WRAP_ALG.to_string(),
            self.wrap_algorithm().to_string(),
        );
        metadata.insert(META_CHUNK_SIZE.to_string(), chunk_size.to_string());

        Ok(EncryptionMaterials {
            data_key,
            nonce_prefix,
            chunk_size,
            metadata,
        })
    }

    /// Recover materials from the metadata of a downloaded object.
    ///
    /// `metadata` holds the object's user metadata keyed without the
    /// `x-amz-meta-` prefix.
    pub fn unwrap_materials(
        &self,
        metadata: &HashMap<String, String>,
    ) -> Result<EncryptionMaterials, StoreError> {
        let cek_alg = required_field(metadata, META_CEK_ALG)?;
        if cek_alg != CEK_ALG_AES_GCM {
            return Err(StoreError::Crypto(CryptoError::UnsupportedAlgorithm {
                algorithm: cek_alg.to_string(),
            }));
        }

        let wrap_alg = required_field(metadata, META_WRAP_ALG)?;
        if wrap_alg != WRAP_ALG_AES_GCM && wrap_alg != WRAP_ALG_RSA_OAEP {
            return Err(StoreError::Crypto(CryptoError::UnsupportedAlgorithm {
                algorithm: wrap_alg.to_string(),
            }));
        }
        if wrap_alg != self.wrap_algorithm() {
            return Err(StoreError::Crypto(CryptoError::InvalidKey {
                message: format!(
                    "object data key is wrapped with {}, context unwraps {}",
                    wrap_alg,
                    self.wrap_algorithm()
                ),
            }));
        }

        let wrapped = BASE64
            .decode(required_field(metadata, META_KEY)?)
            .map_err(|_| {
                StoreError::Crypto(CryptoError::InvalidKey {
                    message: "wrapped data key is not valid base64".to_string(),
                })
            })?;
        let data_key = self.unwrap_data_key(&wrapped)?;

        let iv = BASE64
            .decode(required_field(metadata, META_IV)?)
            .map_err(|_| {
                StoreError::Crypto(CryptoError::InvalidKey {
                    message: "nonce prefix is not valid base64".to_string(),
                })
            })?;
        if iv.len() != NONCE_PREFIX_SIZE {
            return Err(StoreError::Crypto(CryptoError::InvalidKey {
                message: format!(
                    "nonce prefix must be {} bytes, got {}",
                    NONCE_PREFIX_SIZE,
                    iv.len()
                ),
            }));
        }
        let mut nonce_prefix = [0u8; NONCE_PREFIX_SIZE];
        nonce_prefix.copy_from_slice(&iv);

        let chunk_size: usize = required_field(metadata, META_CHUNK_SIZE)?
            .parse()
            .map_err(|_| {
                StoreError::Crypto(CryptoError::InvalidKey {
                    message: "chunk size metadata is not a number".to_string(),
                })
            })?;
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(StoreError::Crypto(CryptoError::InvalidKey {
                message: format!("chunk size {} out of range", chunk_size),
            }));
        }

        Ok(EncryptionMaterials {
            data_key,
            nonce_prefix,
            chunk_size,
            metadata: HashMap::new(),
        })
    }

    fn wrap_data_key(&self, data_key: &[u8; KEY_SIZE]) -> Result<Vec<u8>, StoreError> {
        match self {
            Self::Symmetric { master_key } => {
                let cipher = Aes256Gcm::new_from_slice(master_key).map_err(|e| {
                    StoreError::Crypto(CryptoError::InvalidKey {
                        message: e.to_string(),
                    })
                })?;

                let mut nonce = [0u8; NONCE_SIZE];
                rand::thread_rng().fill_bytes(&mut nonce);
                let sealed = cipher
                    .encrypt(Nonce::from_slice(&nonce), data_key.as_slice())
                    .map_err(|_| {
                        StoreError::Crypto(CryptoError::InvalidKey {
                            message: "data key wrap failed".to_string(),
                        })
                    })?;

                // Wrapped blob layout: nonce || ciphertext+tag.
                let mut wrapped = Vec::with_capacity(NONCE_SIZE + sealed.len());
                wrapped.extend_from_slice(&nonce);
                wrapped.extend_from_slice(&sealed);
                Ok(wrapped)
            }
            Self::Asymmetric { public_key, .. } => public_key
                .encrypt(
                    &mut rand::thread_rng(),
                    Oaep::new::<Sha256>(),
                    data_key.as_slice(),
                )
                .map_err(|e| {
                    StoreError::Crypto(CryptoError::InvalidKey {
                        message: format!("data key wrap failed: {}", e),
                    })
                }),
        }
    }

    fn unwrap_data_key(&self, wrapped: &[u8]) -> Result<[u8; KEY_SIZE], StoreError> {
        let mut recovered = match self {
            Self::Symmetric { master_key } => {
                if wrapped.len() < NONCE_SIZE + TAG_SIZE {
                    return Err(StoreError::Crypto(CryptoError::InvalidKey {
                        message: "wrapped data key too short".to_string(),
                    }));
                }

                let cipher = Aes256Gcm::new_from_slice(master_key).map_err(|e| {
                    StoreError::Crypto(CryptoError::InvalidKey {
                        message: e.to_string(),
                    })
                })?;

                let (nonce, sealed) = wrapped.split_at(NONCE_SIZE);
                cipher
                    .decrypt(Nonce::from_slice(nonce), sealed)
                    .map_err(|_| {
                        StoreError::Crypto(CryptoError::InvalidKey {
                            message: "data key unwrap failed".to_string(),
                        })
                    })?
            }
            Self::Asymmetric { private_key, .. } => {
                let private_key = private_key.as_ref().ok_or_else(|| {
                    StoreError::Crypto(CryptoError::InvalidKey {
                        message: "private key required for decryption".to_string(),
                    })
                })?;

                private_key
                    .decrypt(Oaep::new::<Sha256>(), wrapped)
                    .map_err(|_| {
                        StoreError::Crypto(CryptoError::InvalidKey {
                            message: "data key unwrap failed".to_string(),
                        })
                    })?
            }
        };

        if recovered.len() != KEY_SIZE {
            recovered.zeroize();
            return Err(StoreError::Crypto(CryptoError::InvalidKey {
                message: "unwrapped data key has the wrong size".to_string(),
            }));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&recovered);
        recovered.zeroize();
        Ok(key)
    }
}

impl fmt::Debug for EncryptionContext {
    // Key material must not appear in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symmetric { .. } => f.debug_struct("Symmetric").finish_non_exhaustive(),
            Self::Asymmetric { private_key, .. } => f
                .debug_struct("Asymmetric")
                .field("has_private_key", &private_key.is_some())
                .finish_non_exhaustive(),
        }
    }
}

impl Drop for EncryptionContext {
    fn drop(&mut self) {
        // RSA keys zeroize themselves on drop.
        if let Self::Symmetric { master_key } = self {
            master_key.zeroize();
        }
    }
}

/// Per-object encryption state: the data key, the nonce prefix, the
/// chunk size, and the metadata entries that let a later download
/// recover all three.
#[derive(Clone)]
pub struct EncryptionMaterials {
    data_key: [u8; KEY_SIZE],
    nonce_prefix: [u8; NONCE_PREFIX_SIZE],
    chunk_size: usize,
    metadata: HashMap<String, String>,
}

impl EncryptionMaterials {
    /// Metadata entries to store with the object, keyed without the
    /// `x-amz-meta-` prefix. Empty for materials recovered on download.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Plaintext bytes per encrypted chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn cipher(&self) -> Result<Aes256Gcm, StoreError> {
        Aes256Gcm::new_from_slice(&self.data_key).map_err(|e| {
            StoreError::Crypto(CryptoError::InvalidKey {
                message: e.to_string(),
            })
        })
    }
}

impl fmt::Debug for EncryptionMaterials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionMaterials")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl Drop for EncryptionMaterials {
    fn drop(&mut self) {
        self.data_key.zeroize();
    }
}

/// Ciphertext length for a plaintext of `plaintext_len` bytes.
///
/// Every chunk grows by the tag and the final chunk is always present
/// even when empty, so the mapping is exact and callers can size an
/// upload without buffering it.
pub fn ciphertext_length(plaintext_len: u64, chunk_size: usize) -> u64 {
    let full_chunks = plaintext_len / chunk_size as u64;
    plaintext_len + (full_chunks + 1) * TAG_SIZE as u64
}

fn required_field<'a>(
    metadata: &'a HashMap<String, String>,
    field: &str,
) -> Result<&'a str, StoreError> {
    metadata.get(field).map(String::as_str).ok_or_else(|| {
        StoreError::Crypto(CryptoError::MissingMetadata {
            field: field.to_string(),
        })
    })
}

fn build_nonce(prefix: &[u8; NONCE_PREFIX_SIZE], counter: u32, last: bool) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..NONCE_PREFIX_SIZE].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_SIZE..NONCE_SIZE - 1].copy_from_slice(&counter.to_be_bytes());
    nonce[NONCE_SIZE - 1] = u8::from(last);
    nonce
}

fn integrity_error(message: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        StoreError::Crypto(CryptoError::Integrity {
            message: message.to_string(),
        }),
    )
}

/// Wraps a plaintext source and yields the encrypted chunk stream.
///
/// Reads are served from a one-chunk internal buffer, so memory use is
/// bounded by the chunk size regardless of object size.
pub struct EncryptingReader<R> {
    inner: R,
    cipher: Aes256Gcm,
    nonce_prefix: [u8; NONCE_PREFIX_SIZE],
    chunk_size: usize,
    counter: u32,
    buffer: Vec<u8>,
    buffer_pos: usize,
    finished: bool,
}

impl<R: Read> EncryptingReader<R> {
    /// Create a reader that encrypts `inner` under `materials`.
    pub fn new(inner: R, materials: &EncryptionMaterials) -> Result<Self, StoreError> {
        Ok(Self {
            inner,
            cipher: materials.cipher()?,
            nonce_prefix: materials.nonce_prefix,
            chunk_size: materials.chunk_size,
            counter: 0,
            buffer: Vec::new(),
            buffer_pos: 0,
            finished: false,
        })
    }

    fn fill_buffer(&mut self) -> io::Result<()> {
        let mut plaintext = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            let n = self.inner.read(&mut plaintext[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        plaintext.truncate(filled);

        let last = filled < self.chunk_size;
        let nonce = build_nonce(&self.nonce_prefix, self.counter, last);
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "chunk encryption failed"))?;

        self.buffer = sealed;
        self.buffer_pos = 0;
        if last {
            self.finished = true;
        } else {
            // A repeated counter would repeat a nonce under the same key.
            self.counter = self.counter.checked_add(1).ok_or_else(|| {
                io::Error::new(io::ErrorKind::Other, "chunk counter overflow")
            })?;
        }
        Ok(())
    }
}

impl<R: Read> Read for EncryptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.buffer_pos == self.buffer.len() {
            if self.finished {
                return Ok(0);
            }
            self.fill_buffer()?;
        }

        let available = &self.buffer[self.buffer_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.buffer_pos += n;
        Ok(n)
    }
}

/// Wraps a ciphertext source and yields the decrypted plaintext.
///
/// Fails with an integrity error when a chunk's tag does not verify or
/// the stream ends before the final-flagged chunk.
pub struct DecryptingReader<R> {
    inner: R,
    cipher: Aes256Gcm,
    nonce_prefix: [u8; NONCE_PREFIX_SIZE],
    chunk_size: usize,
    counter: u32,
    buffer: Vec<u8>,
    buffer_pos: usize,
    finished: bool,
}

impl<R: Read> DecryptingReader<R> {
    /// Create a reader that decrypts `inner` under `materials`.
    pub fn new(inner: R, materials: &EncryptionMaterials) -> Result<Self, StoreError> {
        Ok(Self {
            inner,
            cipher: materials.cipher()?,
            nonce_prefix: materials.nonce_prefix,
            chunk_size: materials.chunk_size,
            counter: 0,
            buffer: Vec::new(),
            buffer_pos: 0,
            finished: false,
        })
    }

    fn fill_buffer(&mut self) -> io::Result<()> {
        let sealed_size = self.chunk_size + TAG_SIZE;
        let mut sealed = vec![0u8; sealed_size];
        let mut filled = 0;
        while filled < sealed_size {
            let n = self.inner.read(&mut sealed[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        sealed.truncate(filled);

        if filled == 0 {
            return Err(integrity_error("ciphertext ended before the final chunk"));
        }
        if filled < TAG_SIZE {
            return Err(integrity_error("ciphertext chunk shorter than its tag"));
        }

        // A short read marks the final chunk; full-size chunks are
        // interior ones. Either way the flag byte is authenticated, so a
        // mislabeled chunk fails tag verification.
        let last = filled < sealed_size;
        let nonce = build_nonce(&self.nonce_prefix, self.counter, last);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
            .map_err(|_| integrity_error("chunk authentication failed"))?;

        self.buffer = plaintext;
        self.buffer_pos = 0;
        if last {
            self.finished = true;
        } else {
            self.counter = self.counter.checked_add(1).ok_or_else(|| {
                io::Error::new(io::ErrorKind::Other, "chunk counter overflow")
            })?;
        }
        Ok(())
    }
}

impl<R: Read> Read for DecryptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.buffer_pos == self.buffer.len() {
            if self.finished {
                return Ok(0);
            }
            self.fill_buffer()?;
        }

        let available = &self.buffer[self.buffer_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.buffer_pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::io::Cursor;

    static TEST_RSA_KEY: Lazy<RsaPrivateKey> =
        Lazy::new(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap());

    fn test_master_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    fn symmetric_context() -> EncryptionContext {
        EncryptionContext::symmetric(&test_master_key()).unwrap()
    }

    fn asymmetric_context() -> EncryptionContext {
        let private = TEST_RSA_KEY.clone();
        let public = RsaPublicKey::from(&private);
        EncryptionContext::asymmetric(public, Some(private))
    }

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn encrypt_all(materials: &EncryptionMaterials, plaintext: &[u8]) -> Vec<u8> {
        let mut reader = EncryptingReader::new(Cursor::new(plaintext.to_vec()), materials).unwrap();
        let mut ciphertext = Vec::new();
        reader.read_to_end(&mut ciphertext).unwrap();
        ciphertext
    }

    fn decrypt_all(
        materials: &EncryptionMaterials,
        ciphertext: &[u8],
    ) -> io::Result<Vec<u8>> {
        let mut reader = DecryptingReader::new(Cursor::new(ciphertext.to_vec()), materials).unwrap();
        let mut plaintext = Vec::new();
        reader.read_to_end(&mut plaintext)?;
        Ok(plaintext)
    }

    #[test]
    fn test_round_trip_symmetric() {
        let context = symmetric_context();
        let materials = context.generate_materials(64).unwrap();
        let plaintext = patterned(5000);

        let ciphertext = encrypt_all(&materials, &plaintext);
        assert_eq!(ciphertext.len() as u64, ciphertext_length(5000, 64));

        let recovered = context.unwrap_materials(materials.metadata()).unwrap();
        let decrypted = decrypt_all(&recovered, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_round_trip_empty() {
        let context = symmetric_context();
        let materials = context.generate_materials(64).unwrap();

        let ciphertext = encrypt_all(&materials, b"");
        assert_eq!(ciphertext.len(), TAG_SIZE);

        let recovered = context.unwrap_materials(materials.metadata()).unwrap();
        let decrypted = decrypt_all(&recovered, &ciphertext).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_round_trip_exact_chunk_multiple() {
        let context = symmetric_context();
        let materials = context.generate_materials(64).unwrap();
        let plaintext = patterned(128);

        let ciphertext = encrypt_all(&materials, &plaintext);
        // Two full chunks plus the empty final chunk.
        assert_eq!(ciphertext.len(), 128 + 3 * TAG_SIZE);

        let recovered = context.unwrap_materials(materials.metadata()).unwrap();
        let decrypted = decrypt_all(&recovered, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_round_trip_asymmetric() {
        let context = asymmetric_context();
        let materials = context.generate_materials(64).unwrap();
        let plaintext = patterned(300);

        let ciphertext = encrypt_all(&materials, &plaintext);
        let recovered = context.unwrap_materials(materials.metadata()).unwrap();
        let decrypted = decrypt_all(&recovered, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_metadata_entries() {
        let context = symmetric_context();
        let materials = context.generate_materials(DEFAULT_CHUNK_SIZE).unwrap();
        let metadata = materials.metadata();

        assert!(metadata.contains_key(META_KEY));
        assert!(metadata.contains_key(META_IV));
        assert_eq!(metadata[META_CEK_ALG], "AES/GCM/NoPadding");
        assert_eq!(metadata[META_WRAP_ALG], "A256GCM");
        assert_eq!(metadata[META_CHUNK_SIZE], DEFAULT_CHUNK_SIZE.to_string());
    }

    #[test]
    fn test_fresh_materials_differ() {
        let context = symmetric_context();
        let first = context.generate_materials(64).unwrap();
        let second = context.generate_materials(64).unwrap();

        assert_ne!(first.metadata()[META_KEY], second.metadata()[META_KEY]);
        assert_ne!(first.metadata()[META_IV], second.metadata()[META_IV]);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let context = symmetric_context();
        let materials = context.generate_materials(64).unwrap();
        let mut ciphertext = encrypt_all(&materials, &patterned(200));

        let middle = ciphertext.len() / 2;
        ciphertext[middle] ^= 0xff;

        let error = decrypt_all(&materials, &ciphertext).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let context = symmetric_context();
        let materials = context.generate_materials(64).unwrap();
        let ciphertext = encrypt_all(&materials, &patterned(200));

        // Cut the stream at the first chunk boundary so the final chunk
        // never arrives.
        let truncated = &ciphertext[..64 + TAG_SIZE];
        let error = decrypt_all(&materials, truncated).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert!(error.to_string().contains("final chunk"));
    }

    #[test]
    fn test_reordered_chunks_fail() {
        let context = symmetric_context();
        let materials = context.generate_materials(64).unwrap();
        let ciphertext = encrypt_all(&materials, &patterned(200));

        let sealed = 64 + TAG_SIZE;
        let mut swapped = Vec::new();
        swapped.extend_from_slice(&ciphertext[sealed..2 * sealed]);
        swapped.extend_from_slice(&ciphertext[..sealed]);
        swapped.extend_from_slice(&ciphertext[2 * sealed..]);

        let error = decrypt_all(&materials, &swapped).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_wrong_master_key_fails() {
        let context = symmetric_context();
        let materials = context.generate_materials(64).unwrap();

        let other = EncryptionContext::symmetric(&[0x42u8; KEY_SIZE]).unwrap();
        let result = other.unwrap_materials(materials.metadata());
        assert!(matches!(
            result,
            Err(StoreError::Crypto(CryptoError::InvalidKey { .. }))
        ));
    }

    #[test]
    fn test_missing_metadata_fails() {
        let context = symmetric_context();
        let result = context.unwrap_materials(&HashMap::new());
        assert!(matches!(
            result,
            Err(StoreError::Crypto(CryptoError::MissingMetadata { .. }))
        ));
    }

    #[test]
    fn test_unsupported_cek_algorithm_fails() {
        let context = symmetric_context();
        let materials = context.generate_materials(64).unwrap();

        let mut metadata = materials.metadata().clone();
        metadata.insert(META_CEK_ALG.to_string(), "AES/CBC/PKCS5Padding".to_string());

        let result = context.unwrap_materials(&metadata);
        assert!(matches!(
            result,
            Err(StoreError::Crypto(CryptoError::UnsupportedAlgorithm { .. }))
        ));
    }

    #[test]
    fn test_wrap_algorithm_mismatch_fails() {
        let symmetric = symmetric_context();
        let materials = symmetric.generate_materials(64).unwrap();

        let asymmetric = asymmetric_context();
        let result = asymmetric.unwrap_materials(materials.metadata());
        assert!(matches!(
            result,
            Err(StoreError::Crypto(CryptoError::InvalidKey { .. }))
        ));
    }

    #[test]
    fn test_private_key_required_for_unwrap() {
        let private = TEST_RSA_KEY.clone();
        let public = RsaPublicKey::from(&private);

        let upload_only = EncryptionContext::asymmetric(public.clone(), None);
        let materials = upload_only.generate_materials(64).unwrap();

        let result = upload_only.unwrap_materials(materials.metadata());
        match result {
            Err(StoreError::Crypto(CryptoError::InvalidKey { message })) => {
                assert!(message.contains("private key"));
            }
            other => panic!("expected InvalidKey, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_master_key_length() {
        assert!(EncryptionContext::symmetric(&[0u8; 16]).is_err());
        assert!(EncryptionContext::symmetric(&[0u8; 64]).is_err());
        assert!(EncryptionContext::symmetric(&[0u8; 32]).is_ok());
    }

    #[test]
    fn test_ciphertext_length() {
        assert_eq!(ciphertext_length(0, 64), 16);
        assert_eq!(ciphertext_length(1, 64), 17);
        assert_eq!(ciphertext_length(63, 64), 79);
        assert_eq!(ciphertext_length(64, 64), 96);
        assert_eq!(ciphertext_length(160, 64), 208);
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let context = symmetric_context();
        let rendered = format!("{:?}", context);
        assert!(rendered.contains("Symmetric"));
        assert!(!rendered.contains("master_key"));

        let materials = context.generate_materials(64).unwrap();
        let rendered = format!("{:?}", materials);
        assert!(!rendered.contains("data_key"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Chunk sizes straddle the plaintext length so boundary
            // cases (empty tail, exact multiple, single short chunk)
            // all come up.
            #[test]
            fn round_trip_preserves_any_plaintext(
                plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
                chunk_size in prop_oneof![Just(16usize), Just(64), Just(256), Just(1024)],
            ) {
                let context = symmetric_context();
                let materials = context.generate_materials(chunk_size).unwrap();

                let ciphertext = encrypt_all(&materials, &plaintext);
                prop_assert_eq!(
                    ciphertext.len() as u64,
                    ciphertext_length(plaintext.len() as u64, chunk_size)
                );

                let recovered = context.unwrap_materials(materials.metadata()).unwrap();
                let decrypted = decrypt_all(&recovered, &ciphertext).unwrap();
                prop_assert_eq!(decrypted, plaintext);
            }

            #[test]
            fn any_single_flipped_bit_is_detected(
                plaintext in proptest::collection::vec(any::<u8>(), 1..512),
                position in any::<proptest::sample::Index>(),
            ) {
                let context = symmetric_context();
                let materials = context.generate_materials(64).unwrap();

                let mut ciphertext = encrypt_all(&materials, &plaintext);
                let target = position.index(ciphertext.len());
                ciphertext[target] ^= 0x01;

                prop_assert!(decrypt_all(&materials, &ciphertext).is_err());
            }
        }
    }
}
