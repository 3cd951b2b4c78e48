use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "supersecretjwtsecretforunittesting123";

fn make_token(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_validate_bearer_jwt_success() {
    let my_claims = Claims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        exp: 9999999999, // far future
    };

    let token = make_token(&my_claims, SECRET);

    let claims = validate_bearer_jwt(&token, SECRET).expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
}

#[test]
fn test_validate_bearer_jwt_expired() {
    let my_claims = Claims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        exp: 1, // past
    };

    let token = make_token(&my_claims, SECRET);

    let result = validate_bearer_jwt(&token, SECRET);
    assert!(result.is_err());
}

#[test]
fn test_validate_bearer_jwt_invalid_signature() {
    let my_claims = Claims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        exp: 9999999999,
    };

    let token = make_token(&my_claims, "wrongsecret");

    let result = validate_bearer_jwt(&token, SECRET);
    assert!(result.is_err());
}

#[test]
fn test_validate_bearer_jwt_garbage_token() {
    let result = validate_bearer_jwt("not-a-jwt", SECRET);
    assert!(result.is_err());
}
