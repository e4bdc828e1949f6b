pub mod password;
pub mod session;
pub mod verification;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{PaymentMethod, Session, User, UserPublic};
use crate::services::referrals;
use crate::store::{self, Store};

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Referral code of the user who invited this one, if any.
    pub referral_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: Option<f64>,
    pub total_earned: Option<f64>,
    pub referral_earnings: Option<f64>,
    pub status: Option<String>,
    pub last_login: Option<String>,
    pub payment_methods: Option<Vec<PaymentMethod>>,
}

pub fn register(store: &Store, data: NewUser) -> AppResult<UserPublic> {
    let mut users: Vec<User> = store.load(store::USERS)?;

    if users.iter().any(|u| u.email == data.email) {
        return Err(AppError::DuplicateEmail);
    }

    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let user = User {
        id: Uuid::new_v4().to_string(),
        first_name: data.first_name,
        last_name: data.last_name,
        email: data.email,
        password_hash: password::hash_password(&data.password)?,
        balance: 0.0,
        total_earned: 0.0,
        referral_count: 0,
        referral_earnings: 0.0,
        is_verified: false,
        referral_code: referrals::generate_referral_code(),
        status: "active".to_string(),
        last_login: None,
        payment_methods: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
    };

    // Referral processing mutates the loaded users so the referrer update
    // and the new account land in the same write.
    if let Some(code) = data.referral_code.as_deref() {
        referrals::process_referral_signup(store, &mut users, code, &user)?;
    }

    users.push(user.clone());
    store.save(store::USERS, &users)?;

    Ok(user.into())
}

pub fn login(store: &Store, email: &str, password: &str) -> AppResult<(UserPublic, Session)> {
    let mut users: Vec<User> = store.load(store::USERS)?;
    let idx = users
        .iter()
        .position(|u| u.email == email)
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify_password(password, &users[idx].password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    users[idx].last_login = Some(now.clone());
    users[idx].updated_at = now;
    let user = users[idx].clone();
    store.save(store::USERS, &users)?;

    let session = session::create_session(store, &user.id)?;

    Ok((user.into(), session))
}

/// Resolve the user behind a session token. Soft failure: a missing,
/// unknown, or expired token reads as `None`.
pub fn current_user(store: &Store, token: &str) -> AppResult<Option<UserPublic>> {
    let Some(live) = session::find_live_session(store, token)? else {
        return Ok(None);
    };

    let users: Vec<User> = store.load(store::USERS)?;
    Ok(users
        .into_iter()
        .find(|u| u.id == live.user_id)
        .map(UserPublic::from))
}

pub fn is_authenticated(store: &Store, token: &str) -> AppResult<bool> {
    Ok(current_user(store, token)?.is_some())
}

pub fn logout(store: &Store, token: &str) -> AppResult<()> {
    session::delete_session(store, token)
}

/// Merge the supplied fields over the stored user and bump `updated_at`.
pub fn update_user(store: &Store, user_id: &str, update: UserUpdate) -> AppResult<UserPublic> {
    let mut users: Vec<User> = store.load(store::USERS)?;
    let user = users
        .iter_mut()
        .find(|u| u.id == user_id)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(v) = update.first_name {
        user.first_name = v;
    }
    if let Some(v) = update.last_name {
        user.last_name = v;
    }
    if let Some(v) = update.balance {
        user.balance = v;
    }
    if let Some(v) = update.total_earned {
        user.total_earned = v;
    }
    if let Some(v) = update.referral_earnings {
        user.referral_earnings = v;
    }
    if let Some(v) = update.status {
        user.status = v;
    }
    if let Some(v) = update.last_login {
        user.last_login = Some(v);
    }
    if let Some(v) = update.payment_methods {
        user.payment_methods = v;
    }
    user.updated_at = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

    let updated = user.clone();
    store.save(store::USERS, &users)?;

    Ok(updated.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Ama".to_string(),
            last_name: "Mensah".to_string(),
            email: email.to_string(),
            password: "a strong one".to_string(),
            referral_code: None,
        }
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let store = Store::in_memory().unwrap();
        register(&store, new_user("ama@example.com")).unwrap();

        let err = register(&store, new_user("ama@example.com")).unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[test]
    fn register_zeroes_finances_and_issues_a_code() {
        let store = Store::in_memory().unwrap();
        let user = register(&store, new_user("ama@example.com")).unwrap();

        assert_eq!(user.balance, 0.0);
        assert_eq!(user.referral_count, 0);
        assert_eq!(user.referral_code.len(), 8);
        assert!(user
            .referral_code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(!user.is_verified);
        assert_eq!(user.status, "active");
    }

    #[test]
    fn login_rejects_wrong_password_and_unknown_email() {
        let store = Store::in_memory().unwrap();
        register(&store, new_user("ama@example.com")).unwrap();

        assert!(matches!(
            login(&store, "ama@example.com", "not it"),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&store, "nobody@example.com", "a strong one"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn login_session_expires_exactly_seven_days_out() {
        let store = Store::in_memory().unwrap();
        register(&store, new_user("ama@example.com")).unwrap();

        let (user, session) = login(&store, "ama@example.com", "a strong one").unwrap();
        assert!(user.last_login.is_some());

        let fmt = "%Y-%m-%dT%H:%M:%S%.3fZ";
        let created = NaiveDateTime::parse_from_str(&session.created_at, fmt).unwrap();
        let expires = NaiveDateTime::parse_from_str(&session.expires_at, fmt).unwrap();
        assert_eq!(expires - created, chrono::Duration::days(7));
    }

    #[test]
    fn expired_session_reads_as_none_but_is_kept() {
        let store = Store::in_memory().unwrap();
        register(&store, new_user("ama@example.com")).unwrap();
        let (_, session) = login(&store, "ama@example.com", "a strong one").unwrap();

        let mut sessions: Vec<Session> = store.load(store::SESSIONS).unwrap();
        sessions[0].expires_at = "2000-01-01T00:00:00.000Z".to_string();
        store.save(store::SESSIONS, &sessions).unwrap();

        assert!(current_user(&store, &session.token).unwrap().is_none());
        assert!(!is_authenticated(&store, &session.token).unwrap());

        // Lazy expiry: the dead session record is not swept.
        let sessions: Vec<Session> = store.load(store::SESSIONS).unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn logout_removes_the_session_record() {
        let store = Store::in_memory().unwrap();
        register(&store, new_user("ama@example.com")).unwrap();
        let (_, session) = login(&store, "ama@example.com", "a strong one").unwrap();

        logout(&store, &session.token).unwrap();

        assert!(current_user(&store, &session.token).unwrap().is_none());
        let sessions: Vec<Session> = store.load(store::SESSIONS).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn update_user_merges_fields_and_misses_are_not_found() {
        let store = Store::in_memory().unwrap();
        let user = register(&store, new_user("ama@example.com")).unwrap();

        let updated = update_user(
            &store,
            &user.id,
            UserUpdate {
                balance: Some(120.5),
                status: Some("suspended".to_string()),
                ..UserUpdate::default()
            },
        )
        .unwrap();

        assert_eq!(updated.balance, 120.5);
        assert_eq!(updated.status, "suspended");
        // Untouched fields survive the merge.
        assert_eq!(updated.email, "ama@example.com");
        assert!(updated.updated_at >= user.updated_at);

        assert!(matches!(
            update_user(&store, "missing", UserUpdate::default()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn register_with_referral_code_credits_the_referrer_count() {
        let store = Store::in_memory().unwrap();
        let referrer = register(&store, new_user("ama@example.com")).unwrap();

        let mut invited = new_user("kwame@example.com");
        invited.referral_code = Some(referrer.referral_code.clone());
        register(&store, invited).unwrap();

        let users: Vec<User> = store.load(store::USERS).unwrap();
        let referrer = users.iter().find(|u| u.id == referrer.id).unwrap();
        assert_eq!(referrer.referral_count, 1);

        let referrals = referrals::get_user_referrals(&store, &referrer.id).unwrap();
        assert_eq!(referrals.len(), 1);
        assert_eq!(referrals[0].referee_email, "kwame@example.com");
    }

    #[test]
    fn register_with_unknown_referral_code_still_succeeds() {
        let store = Store::in_memory().unwrap();

        let mut data = new_user("ama@example.com");
        data.referral_code = Some("NOSUCHCD".to_string());
        let user = register(&store, data).unwrap();

        assert_eq!(user.email, "ama@example.com");
        let referrals: Vec<crate::models::Referral> = store.load(store::REFERRALS).unwrap();
        assert!(referrals.is_empty());
    }
}
