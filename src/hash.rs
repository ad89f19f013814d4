// src/hash.rs

//! Content hashing for file integrity and change detection.
//!
//! SHA-256 is the sole supported algorithm: the content hasher (§4.8)
//! folds file digests, symlink targets and mode bits into a single
//! manifest-level digest, and SHA-256 gives that digest the same
//! collision resistance as the per-file hashes it's built from.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

/// Hash algorithm selection. A single variant today, kept as an enum
/// so a future algorithm can be added without breaking callers that
/// already match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
}

impl HashAlgorithm {
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
        }
    }

    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hash computation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    UnknownAlgorithm(String),
    InvalidLength { expected: usize, got: usize },
    InvalidHex(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm(name) => write!(f, "unknown hash algorithm: {}", name),
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid hash length: expected {}, got {}", expected, got)
            }
            Self::InvalidHex(s) => write!(f, "invalid hex in hash: {}", s),
        }
    }
}

impl std::error::Error for HashError {}

/// A hash value with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    pub algorithm: HashAlgorithm,
    pub value: String,
}

impl Hash {
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self, HashError> {
        let value = value.into();
        let expected_len = algorithm.hex_len();

        if value.len() != expected_len {
            return Err(HashError::InvalidLength {
                expected: expected_len,
                got: value.len(),
            });
        }

        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex(value));
        }

        Ok(Self {
            algorithm,
            value: value.to_lowercase(),
        })
    }

    fn new_unchecked(algorithm: HashAlgorithm, value: String) -> Self {
        Self { algorithm, value }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Parse a prefixed hash string (e.g. "sha256:abc123...")
    pub fn parse_prefixed(s: &str) -> Result<Self, HashError> {
        if let Some((algo, hash)) = s.split_once(':') {
            let algorithm = algo.parse()?;
            Self::new(algorithm, hash)
        } else {
            Self::new(HashAlgorithm::Sha256, s)
        }
    }

    pub fn to_prefixed_string(&self) -> String {
        format!("{}:{}", self.algorithm.name(), self.value)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Incremental hasher.
pub struct Hasher {
    algorithm: HashAlgorithm,
    inner: Sha256,
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let HashAlgorithm::Sha256 = algorithm;
        Self {
            algorithm,
            inner: Sha256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Hash {
        let value = format!("{:x}", self.inner.finalize());
        Hash::new_unchecked(self.algorithm, value)
    }

    #[inline]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Compute hash of a byte slice
pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Hash::new_unchecked(HashAlgorithm::Sha256, format!("{:x}", hasher.finalize()))
}

/// Compute hash of data from a reader
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<Hash> {
    let mut hasher = Hasher::new(HashAlgorithm::Sha256);
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Convenience wrapper returning the raw hex digest.
#[inline]
pub fn sha256(data: &[u8]) -> String {
    hash_bytes(data).value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash() {
        let data = b"Hello, World!";
        let hash = hash_bytes(data);

        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);
        assert_eq!(
            hash.value,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert_eq!(hash.value.len(), 64);
    }

    #[test]
    fn test_convenience_function() {
        let data = b"test data";
        assert_eq!(sha256(data).len(), 64);
    }

    #[test]
    fn test_hasher_incremental() {
        let data = b"Hello, World!";

        let full_hash = hash_bytes(data);

        let mut hasher = Hasher::new(HashAlgorithm::Sha256);
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        let incremental_hash = hasher.finalize();

        assert_eq!(full_hash, incremental_hash);
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert!("unknown".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_hash_validation() {
        let hash = Hash::new(
            HashAlgorithm::Sha256,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f",
        );
        assert!(hash.is_ok());

        let hash = Hash::new(HashAlgorithm::Sha256, "abc123");
        assert!(matches!(hash, Err(HashError::InvalidLength { .. })));

        let hash = Hash::new(
            HashAlgorithm::Sha256,
            "gggg6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f",
        );
        assert!(matches!(hash, Err(HashError::InvalidHex(_))));
    }

    #[test]
    fn test_prefixed_hash() {
        let hash = Hash::parse_prefixed(
            "sha256:dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f",
        )
        .unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);

        let hash = Hash::parse_prefixed(
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f",
        )
        .unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_hash_display() {
        let hash = hash_bytes(b"test");
        let display = format!("{}", hash);
        assert_eq!(display, hash.value);

        let prefixed = hash.to_prefixed_string();
        assert!(prefixed.starts_with("sha256:"));
    }

    #[test]
    fn test_hash_reader() {
        let data = b"Hello, World!";
        let mut cursor = std::io::Cursor::new(data);

        let hash = hash_reader(&mut cursor).unwrap();
        let expected = hash_bytes(data);

        assert_eq!(hash, expected);
    }

    #[test]
    fn test_default_algorithm() {
        let algo = HashAlgorithm::default();
        assert_eq!(algo, HashAlgorithm::Sha256);
    }
}
