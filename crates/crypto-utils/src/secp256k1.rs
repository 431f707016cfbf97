//! secp256k1 keys with the "compressed" flag Bitcoin carries alongside them.
//!
//! Signing is deterministic (RFC 6979) over a caller-supplied 32-byte digest
//! and always produces low-S DER signatures.

use std::fmt;

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, NonZeroScalar, ProjectivePoint, Scalar, SecretKey};
use zeroize::Zeroizing;

use crate::base58;
use crate::error::CryptoError;

/// Upper bound of a DER signature without the trailing hash type byte.
pub const SIGNATURE_MAX_SIZE: usize = 72;
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;
pub const PRIVATE_KEY_SIZE: usize = 32;

#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    secret: SecretKey,
    compressed: bool,
}

impl PrivateKey {
    /// Build from a big-endian scalar. Zero and values >= n are rejected.
    pub fn from_bytes(bytes: &[u8], compressed: bool) -> Result<Self, CryptoError> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(CryptoError::InvalidPrivateKey(format!(
                "expected {PRIVATE_KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let field = FieldBytes::clone_from_slice(bytes);
        let secret = SecretKey::from_bytes(&field)
            .map_err(|_| CryptoError::InvalidPrivateKey("scalar out of range".into()))?;
        Ok(Self { secret, compressed })
    }

    /// Import a wallet-import-format string, returning its version byte.
    pub fn from_wif(wif: &str) -> Result<(u8, Self), CryptoError> {
        let payload = Zeroizing::new(base58::decode_check(wif)?);
        let compressed = match payload.len() {
            33 => false,
            34 if payload[33] == 0x01 => true,
            len => {
                return Err(CryptoError::InvalidEncoding(format!(
                    "unexpected wif payload length {len}"
                )))
            }
        };
        let key = Self::from_bytes(&payload[1..33], compressed)?;
        Ok((payload[0], key))
    }

    pub fn to_wif(&self, version: u8) -> String {
        let mut payload = Zeroizing::new(Vec::with_capacity(34));
        payload.push(version);
        payload.extend_from_slice(&self.to_bytes()[..]);
        if self.compressed {
            payload.push(0x01);
        }
        base58::encode_check(&payload)
    }

    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes().into())
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            point: self.secret.public_key(),
            compressed: self.compressed,
        }
    }

    /// (self + tweak) mod n, the private half of BIP-32 child derivation.
    pub fn add_tweak(&self, tweak: &[u8; 32]) -> Result<Self, CryptoError> {
        let tweak = scalar_from_bytes(tweak)?;
        let sum = tweak + *self.secret.to_nonzero_scalar();
        let sum: Option<NonZeroScalar> = NonZeroScalar::new(sum).into();
        let sum = sum.ok_or_else(|| CryptoError::InvalidPrivateKey("tweak gives zero".into()))?;
        Ok(Self {
            secret: SecretKey::from(sum),
            compressed: self.compressed,
        })
    }

    /// Sign a 32-byte digest. Returns a low-S DER signature.
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
        let signing_key = SigningKey::from(&self.secret);
        let signature: Signature = signing_key
            .sign_prehash(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    point: k256::PublicKey,
    compressed: bool,
}

impl PublicKey {
    /// Parse SEC1 bytes. The compressed flag follows the encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let compressed = match bytes.len() {
            COMPRESSED_PUBLIC_KEY_SIZE => true,
            UNCOMPRESSED_PUBLIC_KEY_SIZE => false,
            len => {
                return Err(CryptoError::InvalidPublicKey(format!(
                    "unexpected length {len}"
                )))
            }
        };
        let point = k256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey("not on curve".into()))?;
        Ok(Self { point, compressed })
    }

    /// SEC1 serialization honoring the compressed flag.
    pub fn data(&self) -> Vec<u8> {
        self.point
            .to_encoded_point(self.compressed)
            .as_bytes()
            .to_vec()
    }

    /// Always the 33-byte form, as BIP-32 needs.
    pub fn compressed_data(&self) -> Vec<u8> {
        self.point.to_encoded_point(true).as_bytes().to_vec()
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn with_compressed(&self, compressed: bool) -> Self {
        Self {
            point: self.point.clone(),
            compressed,
        }
    }

    /// tweak·G + self, the public half of BIP-32 child derivation.
    pub fn add_tweak(&self, tweak: &[u8; 32]) -> Result<Self, CryptoError> {
        let tweak = scalar_from_bytes(tweak)?;
        let point = ProjectivePoint::GENERATOR * tweak + self.point.to_projective();
        let point = k256::PublicKey::from_affine(point.to_affine())
            .map_err(|_| CryptoError::InvalidPublicKey("tweak gives identity".into()))?;
        Ok(Self {
            point,
            compressed: self.compressed,
        })
    }

    pub(crate) fn verifying_key(&self) -> k256::ecdsa::VerifyingKey {
        k256::ecdsa::VerifyingKey::from(&self.point)
    }
}

fn scalar_from_bytes(bytes: &[u8; 32]) -> Result<Scalar, CryptoError> {
    let scalar: Option<Scalar> = Scalar::from_repr(FieldBytes::from(*bytes)).into();
    scalar.ok_or_else(|| CryptoError::InvalidPrivateKey("tweak exceeds group order".into()))
}

/// Check a DER signature against a digest.
pub fn verify(public_key: &PublicKey, digest: &[u8; 32], der: &[u8]) -> bool {
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    let Ok(signature) = Signature::from_der(der) else {
        return false;
    };
    public_key
        .verifying_key()
        .verify_prehash(digest, &signature)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_one(compressed: bool) -> PrivateKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        PrivateKey::from_bytes(&bytes, compressed).unwrap()
    }

    #[test]
    fn generator_public_key() {
        assert_eq!(
            hex::encode(key_one(true).public_key().data()),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        let uncompressed = key_one(false).public_key().data();
        assert_eq!(uncompressed.len(), UNCOMPRESSED_PUBLIC_KEY_SIZE);
        assert_eq!(uncompressed[0], 0x04);
    }

    #[test]
    fn zero_scalar_is_rejected() {
        assert!(PrivateKey::from_bytes(&[0u8; 32], true).is_err());
    }

    #[test]
    fn order_is_rejected() {
        let n = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
            .unwrap();
        assert!(PrivateKey::from_bytes(&n, true).is_err());
    }

    #[test]
    fn wif_known_vectors() {
        assert_eq!(
            key_one(true).to_wif(0x80),
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn"
        );
        assert_eq!(
            key_one(false).to_wif(0x80),
            "5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf"
        );
    }

    #[test]
    fn wif_import_keeps_flag_and_version() {
        let (version, key) =
            PrivateKey::from_wif("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn").unwrap();
        assert_eq!(version, 0x80);
        assert!(key.is_compressed());
        assert_eq!(key, key_one(true));
    }

    #[test]
    fn public_key_parse_round_trip() {
        let data = key_one(false).public_key().data();
        let parsed = PublicKey::from_bytes(&data).unwrap();
        assert!(!parsed.is_compressed());
        assert_eq!(parsed.data(), data);
        assert_eq!(parsed.compressed_data().len(), COMPRESSED_PUBLIC_KEY_SIZE);
    }

    #[test]
    fn tweaks_agree_between_private_and_public() {
        let tweak = [7u8; 32];
        let key = key_one(true);
        let private_child = key.add_tweak(&tweak).unwrap();
        let public_child = key.public_key().add_tweak(&tweak).unwrap();
        assert_eq!(private_child.public_key(), public_child);
    }

    #[test]
    fn signature_is_deterministic_low_s_and_verifies() {
        let key = key_one(true);
        let digest = crate::digest::sha256(b"message");
        let first = key.sign(&digest).unwrap();
        let second = key.sign(&digest).unwrap();
        assert_eq!(first, second);
        assert!(first.len() <= SIGNATURE_MAX_SIZE);
        assert_eq!(first[0], 0x30);

        let signature = Signature::from_der(&first).unwrap();
        assert!(signature.normalize_s().is_none());
        assert!(verify(&key.public_key(), &digest, &first));
        assert!(!verify(&key.public_key(), &[0u8; 32], &first));
    }
}
