use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Identity carried by an authenticated request.
///
/// Email and first name are optional in the token; operations that need them
/// fail with `MissingSessionData` rather than at authentication time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SessionIdentity {
    pub fn full_name(&self) -> Option<String> {
        let first = self.first_name.as_deref()?.trim();
        if first.is_empty() {
            return None;
        }
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => Some(format!("{first} {last}")),
            _ => Some(first.to_string()),
        }
    }
}

impl From<Claims> for SessionIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
        }
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
        }
    }

    /// Issues a session token. The checkout backend only verifies tokens in
    /// production; issuing is used by tooling and tests.
    pub fn generate_access_token(&self, identity: &SessionIdentity) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expires_in);

        let claims = Claims {
            sub: identity.user_id.clone(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_session(&self, token: &str) -> AppResult<SessionIdentity> {
        let claims = self.verify_token(token)?;
        if claims.sub.trim().is_empty() {
            return Err(AppError::AuthError("Token carries no user id".to_string()));
        }
        Ok(claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            user_id: "user-1".into(),
            email: Some("ana@example.com".into()),
            first_name: Some("Ana".into()),
            last_name: Some("Petrova".into()),
        }
    }

    #[test]
    fn test_token_round_trip_keeps_identity() {
        let jwt = JwtService::new("secret", 3600);
        let token = jwt.generate_access_token(&identity()).unwrap();
        assert_eq!(jwt.verify_session(&token).unwrap(), identity());
    }

    #[test]
    fn test_rejects_token_signed_with_other_secret() {
        let token = JwtService::new("a", 3600)
            .generate_access_token(&identity())
            .unwrap();
        assert!(JwtService::new("b", 3600).verify_session(&token).is_err());
    }

    #[test]
    fn test_full_name() {
        assert_eq!(identity().full_name().as_deref(), Some("Ana Petrova"));
        let mut id = identity();
        id.last_name = None;
        assert_eq!(id.full_name().as_deref(), Some("Ana"));
        id.first_name = Some("  ".into());
        assert_eq!(id.full_name(), None);
    }
}
