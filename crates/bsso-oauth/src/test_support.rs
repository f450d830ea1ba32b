//! Signing helpers shared by the unit tests.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

const RSA_PRIVATE_PEM: &str = include_str!("testdata/rsa_private.pem");
const RSA_MODULUS: &str = "vl-hbwHefM8aThBVIafGIP01oUhia9KLfl6j8XkirqEyeq4-28UxtYmqSx9gDgwJp6gK-Kp0V-x_YB9gusNv571cjU9Sz89zYXUJ5x6l8r3T4i64d8_78gzEIOeMfdvNryXXY5D0XyAzRTLiFZB1PwIouSBHWIEeZeS8f3xv3U_urgP9aGDn7pb7mM1SO4MeDYq7M06T_mtXmiPNPs_TJGUtYehafCmqUf45UCBjUPhQIjqwUPP98KZfWQXHmk5YVSotUCpZhKIHgJe-xSbO_fxbaGm0Y11rVsymaHR3USDMIZUzerK9SMSNeFcZIvl_14OW-iBoIKdU165uEO4UcQ";
const RSA_EXPONENT: &str = "AQAB";

/// A JWKS document holding the test public key under `kid`.
pub fn jwks_body(kid: &str) -> String {
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": kid,
            "n": RSA_MODULUS,
            "e": RSA_EXPONENT,
        }]
    })
    .to_string()
}

/// ID token claims for a test user, valid for one hour.
pub fn standard_claims(issuer: &str, audience: &str) -> Value {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs();

    json!({
        "iss": issuer,
        "aud": audience,
        "sub": "1234567890",
        "iat": now,
        "exp": now + 3600,
        "email": "testuser@example.com",
        "name": "Test User",
        "given_name": "Test",
        "family_name": "User",
    })
}

/// Sign `claims` with the test private key, naming `kid` in the header.
pub fn sign_id_token(claims: &Value, kid: &str) -> String {
    let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM.as_bytes()).expect("test key should load");
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());

    jsonwebtoken::encode(&header, claims, &key).expect("test token should sign")
}
