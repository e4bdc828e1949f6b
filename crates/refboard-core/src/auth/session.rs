use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Session;
use crate::store::{self, Store};

const SESSION_DURATION_DAYS: i64 = 7;

pub fn create_session(store: &Store, user_id: &str) -> AppResult<Session> {
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        token: generate_token(),
        expires_at: (now + Duration::days(SESSION_DURATION_DAYS))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string(),
        created_at: now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
    };

    let mut sessions: Vec<Session> = store.load(store::SESSIONS)?;
    sessions.push(session.clone());
    store.save(store::SESSIONS, &sessions)?;

    Ok(session)
}

/// Look up the live session for a token. An expired session reads as absent
/// but stays in the collection; expiry is only ever checked here.
pub fn find_live_session(store: &Store, token: &str) -> AppResult<Option<Session>> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let sessions: Vec<Session> = store.load(store::SESSIONS)?;

    Ok(sessions
        .into_iter()
        .find(|s| s.token == token && s.expires_at > now))
}

pub fn delete_session(store: &Store, token: &str) -> AppResult<()> {
    let mut sessions: Vec<Session> = store.load(store::SESSIONS)?;
    sessions.retain(|s| s.token != token);
    store.save(store::SESSIONS, &sessions)?;
    Ok(())
}

fn generate_token() -> String {
    use base64::Engine;
    let mut bytes = [0u8; 32];
    use rand::RngCore;
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
