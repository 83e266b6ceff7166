//! MSP-scoped signing identity and CA request tokens.
//!
//! Registrar calls are authenticated with a token of the form
//! `base64(cert) "." base64(signature)`, where the signature is
//! ECDSA-P256-SHA256 over
//! `METHOD "." base64(uri) "." base64(body) "." base64(cert)`.
//! The CA only accepts low-S signatures.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use simple_asn1::{ASN1Block, BigInt, BigUint};
use x509_parser::pem::parse_x509_pem;

use crate::errors::{ProvisionError, Result};
use crate::secrets::SecretString;

const P256_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xBC, 0xE6, 0xFA, 0xAD, 0xA7, 0x17, 0x9E, 0x84, 0xF3, 0xB9, 0xCA, 0xC2, 0xFC, 0x63, 0x25, 0x51,
];

fn curve_order() -> BigInt {
    BigInt::from(BigUint::from_bytes_be(&P256_ORDER))
}

/// An enrolled identity able to sign CA requests on behalf of its MSP.
pub struct SigningIdentity {
    enrollment_id: String,
    msp_id: String,
    certificate_pem: String,
    key_pair: EcdsaKeyPair,
    rng: SystemRandom,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("enrollment_id", &self.enrollment_id)
            .field("msp_id", &self.msp_id)
            .field("certificate", &format!("[{} bytes PEM]", self.certificate_pem.len()))
            .field("key_pair", &"[REDACTED]")
            .finish()
    }
}

impl SigningIdentity {
    /// Rebuilds an identity from a persisted PKCS#8 PEM key and PEM certificate.
    pub fn from_pem(
        enrollment_id: impl Into<String>,
        msp_id: impl Into<String>,
        certificate_pem: impl Into<String>,
        private_key_pem: &SecretString,
    ) -> Result<Self> {
        let (_, pem) = parse_x509_pem(private_key_pem.expose_secret().as_bytes())
            .map_err(|_| ProvisionError::crypto("Private key is not valid PEM"))?;
        if pem.label != "PRIVATE KEY" {
            return Err(ProvisionError::crypto(format!(
                "Unsupported private key encoding '{}', expected PKCS#8",
                pem.label
            )));
        }

        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &pem.contents, &rng)
            .map_err(|e| ProvisionError::crypto(format!("Private key rejected: {}", e)))?;

        Ok(Self {
            enrollment_id: enrollment_id.into(),
            msp_id: msp_id.into(),
            certificate_pem: certificate_pem.into(),
            key_pair,
            rng,
        })
    }

    pub fn enrollment_id(&self) -> &str {
        &self.enrollment_id
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// Low-S DER signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .key_pair
            .sign(&self.rng, message)
            .map_err(|_| ProvisionError::crypto("ECDSA signing failed"))?;
        normalize_low_s(signature.as_ref())
    }

    /// Authorization header value for a request to `uri` (path and query).
    pub fn auth_token(&self, method: &str, uri: &str, body: &[u8]) -> Result<String> {
        let encoded_cert = STANDARD.encode(self.certificate_pem.as_bytes());
        let payload = format!(
            "{}.{}.{}.{}",
            method,
            STANDARD.encode(uri.as_bytes()),
            STANDARD.encode(body),
            encoded_cert
        );
        let signature = self.sign(payload.as_bytes())?;
        Ok(format!("{}.{}", encoded_cert, STANDARD.encode(signature)))
    }
}

/// Rewrites a DER ECDSA signature so that `s <= n/2`.
pub fn normalize_low_s(der: &[u8]) -> Result<Vec<u8>> {
    let (r, s) = decode_signature(der)?;

    let order = curve_order();
    if s <= &order / BigInt::from(2) {
        return Ok(der.to_vec());
    }

    let flipped = ASN1Block::Sequence(
        0,
        vec![ASN1Block::Integer(0, r), ASN1Block::Integer(0, &order - &s)],
    );
    simple_asn1::to_der(&flipped)
        .map_err(|e| ProvisionError::crypto(format!("Failed to encode ECDSA signature: {}", e)))
}

fn decode_signature(der: &[u8]) -> Result<(BigInt, BigInt)> {
    let malformed = || ProvisionError::crypto("Malformed ECDSA signature");

    let blocks = simple_asn1::from_der(der).map_err(|_| malformed())?;
    let items = match blocks.as_slice() {
        [ASN1Block::Sequence(_, items)] => items,
        _ => return Err(malformed()),
    };

    match items.as_slice() {
        [ASN1Block::Integer(_, r), ASN1Block::Integer(_, s)]
            if *r > BigInt::from(0) && *s > BigInt::from(0) && *s < curve_order() =>
        {
            Ok((r.clone(), s.clone()))
        }
        _ => Err(malformed()),
    }
}
