use axum::http::{HeaderMap, header};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::chat::{
    ChatError,
    store::{self, User},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

/// HS256 key pair derived from the configured secret. Token issuance lives
/// with the account system; `issue` exists for tooling and tests.
#[derive(Clone)]
pub struct AuthKeys {
    enc: EncodingKey,
    dec: DecodingKey,
}

impl AuthKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, user_id: Uuid, ttl: time::Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (time::OffsetDateTime::now_utc() + ttl).unix_timestamp() as usize;
        encode(&Header::default(), &Claims { sub: user_id, exp }, &self.enc)
    }

    fn verify(&self, token: &str) -> Option<Uuid> {
        decode::<Claims>(token, &self.dec, &Validation::default())
            .ok()
            .map(|data| data.claims.sub)
    }
}

/// Resolves the `Authorization: Bearer <token>` header to a known user.
/// A missing header, an undecodable token and an unknown subject are all
/// the same refusal; the handshake never learns which.
pub async fn resolve_bearer(pool: &SqlitePool, headers: &HeaderMap, keys: &AuthKeys) -> Result<User, ChatError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ChatError::Unauthorized)?;
    let user_id = keys.verify(token).ok_or(ChatError::Unauthorized)?;
    store::get_user(pool, user_id).await?.ok_or(ChatError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use crate::chat::store::Role;

    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = crate::db::connect_memory().await.unwrap();
        crate::db::init_schema(&pool).await.unwrap();
        pool
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn bearer_token_resolves_to_its_user() {
        let pool = test_pool().await;
        let keys = AuthKeys::new(b"secret");
        let user = store::create_user(&pool, "amira", Role::Artist).await.unwrap();

        let token = keys.issue(user.id, time::Duration::hours(1)).unwrap();
        let resolved = resolve_bearer(&pool, &bearer(&token), &keys).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.username, "amira");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let pool = test_pool().await;
        let keys = AuthKeys::new(b"secret");
        let result = resolve_bearer(&pool, &HeaderMap::new(), &keys).await;
        assert!(matches!(result, Err(ChatError::Unauthorized)));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let pool = test_pool().await;
        let keys = AuthKeys::new(b"secret");
        let result = resolve_bearer(&pool, &bearer("not-a-jwt"), &keys).await;
        assert!(matches!(result, Err(ChatError::Unauthorized)));
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_unauthorized() {
        let pool = test_pool().await;
        let keys = AuthKeys::new(b"secret");
        let user = store::create_user(&pool, "amira", Role::Artist).await.unwrap();

        let forged = AuthKeys::new(b"other").issue(user.id, time::Duration::hours(1)).unwrap();
        let result = resolve_bearer(&pool, &bearer(&forged), &keys).await;
        assert!(matches!(result, Err(ChatError::Unauthorized)));
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let pool = test_pool().await;
        let keys = AuthKeys::new(b"secret");
        let user = store::create_user(&pool, "amira", Role::Artist).await.unwrap();

        let stale = keys.issue(user.id, time::Duration::days(-2)).unwrap();
        let result = resolve_bearer(&pool, &bearer(&stale), &keys).await;
        assert!(matches!(result, Err(ChatError::Unauthorized)));
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_unauthorized() {
        let pool = test_pool().await;
        let keys = AuthKeys::new(b"secret");

        let token = keys.issue(Uuid::now_v7(), time::Duration::hours(1)).unwrap();
        let result = resolve_bearer(&pool, &bearer(&token), &keys).await;
        assert!(matches!(result, Err(ChatError::Unauthorized)));
    }
}
