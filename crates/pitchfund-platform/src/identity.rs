use base64::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use pitchfund_core::{IdentityVerifier, SettlementError, SettlementResult};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const EXPIRY_LEEWAY_SECS: i64 = 30;

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    #[serde(default)]
    iss: Option<String>,
}

/// Verifies HS256-signed JWTs issued by the auth service.
#[derive(Clone)]
pub struct Hs256Verifier {
    secret: Vec<u8>,
    issuer: Option<String>,
}

impl Hs256Verifier {
    pub fn new(secret: impl AsRef<[u8]>, issuer: Option<String>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            issuer,
        }
    }

    fn mac(&self) -> SettlementResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| unauthorized("verifier key is unusable"))
    }
}

impl IdentityVerifier for Hs256Verifier {
    fn verify(&self, token: &str) -> SettlementResult<Uuid> {
        let (signing_input, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| unauthorized("malformed token"))?;
        let (header, payload) = signing_input
            .split_once('.')
            .filter(|(_, payload)| !payload.contains('.'))
            .ok_or_else(|| unauthorized("malformed token"))?;

        let header: Header = decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(unauthorized("unsupported signing algorithm"));
        }

        let signature = base64::decode_config(signature, URL_SAFE_NO_PAD)
            .map_err(|_| unauthorized("malformed signature"))?;
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| unauthorized("invalid signature"))?;

        let claims: Claims = decode_segment(payload)?;
        if let Some(expected) = &self.issuer
            && claims.iss.as_deref() != Some(expected.as_str())
        {
            return Err(unauthorized("unexpected issuer"));
        }
        if claims.exp + EXPIRY_LEEWAY_SECS < Utc::now().timestamp() {
            return Err(unauthorized("token expired"));
        }

        Uuid::parse_str(&claims.sub).map_err(|_| unauthorized("subject is not a user id"))
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> SettlementResult<T> {
    let bytes = base64::decode_config(segment, URL_SAFE_NO_PAD)
        .map_err(|_| unauthorized("malformed token"))?;
    serde_json::from_slice(&bytes).map_err(|_| unauthorized("malformed token"))
}

fn unauthorized(reason: &str) -> SettlementError {
    SettlementError::Unauthorized(reason.to_string())
}
