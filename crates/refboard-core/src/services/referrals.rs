use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Referral, ReferralStatus, User};
use crate::store::{self, Store};

/// Standing bonus recorded against each referral signup.
pub const REFERRAL_BONUS: f64 = 50.0;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReferral {
    pub user_id: String,
    pub referee_email: String,
    pub referee_name: Option<String>,
    pub bonus_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ReferralStats {
    pub total: usize,
    pub completed: usize,
    pub total_earned: f64,
}

pub fn create_referral(store: &Store, data: NewReferral) -> AppResult<Referral> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let referral = Referral {
        id: Uuid::new_v4().to_string(),
        user_id: data.user_id,
        referee_email: data.referee_email,
        referee_name: data.referee_name,
        status: ReferralStatus::Pending,
        bonus_amount: data.bonus_amount.unwrap_or(REFERRAL_BONUS),
        created_at: now.clone(),
        updated_at: now,
    };

    let mut referrals: Vec<Referral> = store.load(store::REFERRALS)?;
    referrals.push(referral.clone());
    store.save(store::REFERRALS, &referrals)?;

    Ok(referral)
}

pub fn get_user_referrals(store: &Store, user_id: &str) -> AppResult<Vec<Referral>> {
    let referrals: Vec<Referral> = store.load(store::REFERRALS)?;
    Ok(referrals
        .into_iter()
        .filter(|r| r.user_id == user_id)
        .collect())
}

/// Update a referral's status. Transitioning into `completed` from any
/// other status credits the bonus to the referrer; re-completing an
/// already completed referral credits nothing.
pub fn update_referral_status(
    store: &Store,
    referral_id: &str,
    status: ReferralStatus,
) -> AppResult<Referral> {
    let mut referrals: Vec<Referral> = store.load(store::REFERRALS)?;
    let idx = referrals
        .iter()
        .position(|r| r.id == referral_id)
        .ok_or_else(|| AppError::NotFound("Referral not found".to_string()))?;

    let was_completed = referrals[idx].status == ReferralStatus::Completed;
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    referrals[idx].status = status;
    referrals[idx].updated_at = now.clone();
    let referral = referrals[idx].clone();
    store.save(store::REFERRALS, &referrals)?;

    if status == ReferralStatus::Completed && !was_completed {
        credit_referrer(store, &referral, &now)?;
    }

    Ok(referral)
}

fn credit_referrer(store: &Store, referral: &Referral, now: &str) -> AppResult<()> {
    let mut users: Vec<User> = store.load(store::USERS)?;
    let Some(user) = users.iter_mut().find(|u| u.id == referral.user_id) else {
        // Referrer ids are never validated on write, so they can dangle.
        tracing::warn!(referral = %referral.id, "referrer not found, bonus not credited");
        return Ok(());
    };

    user.balance += referral.bonus_amount;
    user.referral_earnings += referral.bonus_amount;
    user.total_earned += referral.bonus_amount;
    user.updated_at = now.to_string();
    store.save(store::USERS, &users)?;

    Ok(())
}

/// Resolve a referral code during registration: bump the referrer's count
/// in the loaded `users` (persisted by the caller) and record the pending
/// referral. An unknown code is ignored so a bad code never blocks a
/// signup.
pub fn process_referral_signup(
    store: &Store,
    users: &mut [User],
    code: &str,
    referee: &User,
) -> AppResult<Option<Referral>> {
    let Some(referrer) = users.iter_mut().find(|u| u.referral_code == code) else {
        tracing::warn!(%code, "referral code matched no user");
        return Ok(None);
    };

    referrer.referral_count += 1;
    referrer.updated_at = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let referrer_id = referrer.id.clone();

    let referral = create_referral(
        store,
        NewReferral {
            user_id: referrer_id,
            referee_email: referee.email.clone(),
            referee_name: Some(format!("{} {}", referee.first_name, referee.last_name)),
            bonus_amount: None,
        },
    )?;

    Ok(Some(referral))
}

pub fn get_referral_stats(store: &Store, user_id: &str) -> AppResult<ReferralStats> {
    let referrals = get_user_referrals(store, user_id)?;
    let completed: Vec<&Referral> = referrals
        .iter()
        .filter(|r| r.status == ReferralStatus::Completed)
        .collect();

    Ok(ReferralStats {
        total: referrals.len(),
        completed: completed.len(),
        total_earned: completed.iter().map(|r| r.bonus_amount).sum(),
    })
}

/// Shareable signup URL for a referral code.
pub fn referral_link(base_url: &str, code: &str) -> String {
    format!("{}/signup.html?ref={}", base_url.trim_end_matches('/'), code)
}

/// 8 characters, uppercase alphanumeric. Uniqueness is not enforced;
/// lookups resolve to the first match in insertion order.
pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
