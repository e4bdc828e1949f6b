use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{User, VerificationToken};
use crate::store::{self, Store};

const TOKEN_DURATION_HOURS: i64 = 24;

/// Create a verification token for a user. Replaces any existing tokens for
/// the user so only the latest one is live.
pub fn create_verification_token(store: &Store, user_id: &str) -> AppResult<String> {
    let mut tokens: Vec<VerificationToken> = store.load(store::VERIFICATION_TOKENS)?;
    tokens.retain(|t| t.user_id != user_id);

    let token = VerificationToken {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        token: generate_token(),
        expires_at: (Utc::now() + Duration::hours(TOKEN_DURATION_HOURS))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string(),
    };
    let value = token.token.clone();

    tokens.push(token);
    store.save(store::VERIFICATION_TOKENS, &tokens)?;

    Ok(value)
}

/// Validate a verification token. Marks the user as verified, consumes the
/// token, and sweeps expired tokens while the collection is loaded.
/// Returns the user id.
pub fn confirm_verification(store: &Store, token: &str) -> AppResult<String> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let mut tokens: Vec<VerificationToken> = store.load(store::VERIFICATION_TOKENS)?;

    let found = tokens
        .iter()
        .find(|t| t.token == token && t.expires_at > now)
        .cloned()
        .ok_or(AppError::VerificationInvalid)?;

    let mut users: Vec<User> = store.load(store::USERS)?;
    let user = users
        .iter_mut()
        .find(|u| u.id == found.user_id)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    user.is_verified = true;
    user.updated_at = now.clone();
    store.save(store::USERS, &users)?;

    tokens.retain(|t| t.user_id != found.user_id && t.expires_at > now);
    store.save(store::VERIFICATION_TOKENS, &tokens)?;

    Ok(found.user_id)
}

fn generate_token() -> String {
    use base64::Engine;
    let mut bytes = [0u8; 32];
    use rand::RngCore;
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{self, NewUser};

    fn registered_user(store: &Store) -> String {
        auth::register(
            store,
            NewUser {
                first_name: "Kofi".to_string(),
                last_name: "Adjei".to_string(),
                email: "kofi@example.com".to_string(),
                password: "a strong one".to_string(),
                referral_code: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn confirm_marks_user_verified_and_consumes_token() {
        let store = Store::in_memory().unwrap();
        let user_id = registered_user(&store);

        let token = create_verification_token(&store, &user_id).unwrap();
        let confirmed = confirm_verification(&store, &token).unwrap();
        assert_eq!(confirmed, user_id);

        let users: Vec<User> = store.load(store::USERS).unwrap();
        assert!(users[0].is_verified);

        // Consumed: a second confirmation fails.
        assert!(matches!(
            confirm_verification(&store, &token),
            Err(AppError::VerificationInvalid)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let store = Store::in_memory().unwrap();
        let user_id = registered_user(&store);
        let token = create_verification_token(&store, &user_id).unwrap();

        let mut tokens: Vec<VerificationToken> =
            store.load(store::VERIFICATION_TOKENS).unwrap();
        tokens[0].expires_at = "2000-01-01T00:00:00.000Z".to_string();
        store.save(store::VERIFICATION_TOKENS, &tokens).unwrap();

        assert!(matches!(
            confirm_verification(&store, &token),
            Err(AppError::VerificationInvalid)
        ));
    }

    #[test]
    fn issuing_again_replaces_the_previous_token() {
        let store = Store::in_memory().unwrap();
        let user_id = registered_user(&store);

        let first = create_verification_token(&store, &user_id).unwrap();
        let second = create_verification_token(&store, &user_id).unwrap();

        assert!(matches!(
            confirm_verification(&store, &first),
            Err(AppError::VerificationInvalid)
        ));
        assert_eq!(confirm_verification(&store, &second).unwrap(), user_id);
    }
}
