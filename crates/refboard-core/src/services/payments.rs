use chrono::{Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{Payment, PaymentMethod, PaymentStatus, User};
use crate::store::{self, Store};

/// Smallest withdrawal the dashboard accepts.
pub const MIN_WITHDRAWAL: f64 = 10.0;

pub const PAYOUT_REQUEST: &str = "payout_request";

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub user_id: String,
    pub amount: f64,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
}

pub fn record_payment_request(store: &Store, data: NewPayment) -> AppResult<Payment> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        user_id: data.user_id,
        payment_type: PAYOUT_REQUEST.to_string(),
        amount: data.amount,
        status: PaymentStatus::Pending,
        payment_method: data.payment_method,
        reference: generate_reference(),
        description: data.description,
        notes: None,
        processed_at: None,
        created_at: now.clone(),
        updated_at: now,
    };

    let mut payments: Vec<Payment> = store.load(store::PAYMENTS)?;
    payments.push(payment.clone());
    store.save(store::PAYMENTS, &payments)?;

    Ok(payment)
}

/// A user's payment history, newest first.
pub fn get_user_payments(store: &Store, user_id: &str) -> AppResult<Vec<Payment>> {
    let mut payments: Vec<Payment> = store.load(store::PAYMENTS)?;
    payments.retain(|p| p.user_id == user_id);
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(payments)
}

/// Sum of completed payments only.
pub fn get_total_earnings(store: &Store, user_id: &str) -> AppResult<f64> {
    Ok(get_user_payments(store, user_id)?
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .map(|p| p.amount)
        .sum())
}

/// Completed payout volume over the trailing 30 days.
pub fn get_monthly_earnings(store: &Store, user_id: &str) -> AppResult<f64> {
    let cutoff = (Utc::now() - Duration::days(30))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();

    Ok(get_user_payments(store, user_id)?
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed && p.created_at >= cutoff)
        .map(|p| p.amount)
        .sum())
}

pub fn get_pending_requests(store: &Store, user_id: &str) -> AppResult<Vec<Payment>> {
    Ok(get_user_payments(store, user_id)?
        .into_iter()
        .filter(|p| p.status == PaymentStatus::Pending && p.payment_type == PAYOUT_REQUEST)
        .collect())
}

/// The oldest pending payout request: first submitted, first processed.
pub fn next_payout(store: &Store, user_id: &str) -> AppResult<Option<Payment>> {
    Ok(get_pending_requests(store, user_id)?
        .into_iter()
        .min_by(|a, b| a.created_at.cmp(&b.created_at)))
}

/// Update a payment's status. `processed_at` is stamped only on the
/// transition into `completed`; any other transition leaves it at its
/// previous value. Empty notes keep the existing notes.
pub fn update_payment_status(
    store: &Store,
    payment_id: &str,
    status: PaymentStatus,
    notes: Option<&str>,
) -> AppResult<Payment> {
    let mut payments: Vec<Payment> = store.load(store::PAYMENTS)?;
    let payment = payments
        .iter_mut()
        .find(|p| p.id == payment_id)
        .ok_or_else(|| AppError::NotFound("Payment request not found".to_string()))?;

    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    payment.status = status;
    if let Some(notes) = notes {
        if !notes.is_empty() {
            payment.notes = Some(notes.to_string());
        }
    }
    if status == PaymentStatus::Completed {
        payment.processed_at = Some(now.clone());
    }
    payment.updated_at = now;

    let updated = payment.clone();
    store.save(store::PAYMENTS, &payments)?;

    Ok(updated)
}

/// Record a payout request for the authenticated user. The amount arrives
/// in its form-field string shape and must parse to a positive number;
/// balance checks belong to `request_withdrawal`.
pub fn request_payout(
    store: &Store,
    token: &str,
    amount: &str,
    payment_method: PaymentMethod,
    description: Option<String>,
) -> AppResult<Payment> {
    let user = auth::current_user(store, token)?.ok_or(AppError::NotAuthenticated)?;

    let parsed: f64 = amount
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidAmount(format!("not a number: {amount}")))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(AppError::InvalidAmount(format!("must be positive: {amount}")));
    }

    record_payment_request(
        store,
        NewPayment {
            user_id: user.id,
            amount: parsed,
            payment_method,
            description: description
                .or_else(|| Some(format!("Payout request for ${parsed:.2}"))),
        },
    )
}

/// Withdrawal flow behind the dashboard dialog: enforces the minimum and
/// the available balance, debits the balance, then records the payout.
pub fn request_withdrawal(
    store: &Store,
    token: &str,
    amount: f64,
    payment_method: PaymentMethod,
) -> AppResult<Payment> {
    let user = auth::current_user(store, token)?.ok_or(AppError::NotAuthenticated)?;

    if !amount.is_finite() || amount < MIN_WITHDRAWAL {
        return Err(AppError::InvalidAmount(format!(
            "minimum withdrawal is ${MIN_WITHDRAWAL:.2}"
        )));
    }
    if amount > user.balance {
        return Err(AppError::InvalidAmount(format!(
            "exceeds available balance of ${:.2}",
            user.balance
        )));
    }

    let mut users: Vec<User> = store.load(store::USERS)?;
    let stored = users
        .iter_mut()
        .find(|u| u.id == user.id)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    stored.balance -= amount;
    stored.updated_at = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    store.save(store::USERS, &users)?;

    record_payment_request(
        store,
        NewPayment {
            user_id: user.id,
            amount,
            payment_method,
            description: Some(format!("Withdrawal request for ${amount:.2}")),
        },
    )
}

pub fn mark_as_paid(store: &Store, payment_id: &str, notes: Option<&str>) -> AppResult<Payment> {
    update_payment_status(store, payment_id, PaymentStatus::Completed, notes)
}

pub fn mark_as_failed(
    store: &Store,
    payment_id: &str,
    reason: Option<&str>,
) -> AppResult<Payment> {
    update_payment_status(store, payment_id, PaymentStatus::Failed, reason)
}

/// Seed a user's payout history with synthetic requests spread over the
/// past month. Every status shows up at least once when `count` >= 3.
pub fn generate_test_payments(
    store: &Store,
    user_id: &str,
    count: usize,
) -> AppResult<Vec<Payment>> {
    const STATUSES: [PaymentStatus; 3] = [
        PaymentStatus::Completed,
        PaymentStatus::Pending,
        PaymentStatus::Failed,
    ];

    let methods = [
        PaymentMethod {
            method_type: "mobile_money".to_string(),
            provider: "MTN".to_string(),
            account_number: "2567**123456".to_string(),
            account_name: "Demo Account".to_string(),
            currency: "USD".to_string(),
        },
        PaymentMethod {
            method_type: "mobile_money".to_string(),
            provider: "Airtel".to_string(),
            account_number: "2567**654321".to_string(),
            account_name: "Demo Account".to_string(),
            currency: "USD".to_string(),
        },
        PaymentMethod {
            method_type: "bank_transfer".to_string(),
            provider: "Chase Bank".to_string(),
            account_number: "****4567".to_string(),
            account_name: "Demo Account".to_string(),
            currency: "USD".to_string(),
        },
    ];

    let mut rng = rand::thread_rng();
    let now = Utc::now();
    let mut generated = Vec::with_capacity(count);

    for i in 0..count {
        let status = STATUSES[i.min(STATUSES.len() - 1)];
        let amount = (rng.gen_range(50.0..1050.0_f64) * 100.0).round() / 100.0;
        let created = now - Duration::days(rng.gen_range(0..30));

        generated.push(Payment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            payment_type: PAYOUT_REQUEST.to_string(),
            amount,
            status,
            payment_method: methods[rng.gen_range(0..methods.len())].clone(),
            reference: generate_reference(),
            description: Some(format!("Payment request #{}", i + 1)),
            notes: None,
            processed_at: (status == PaymentStatus::Completed)
                .then(|| (created + Duration::days(1)).format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
            created_at: created.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            updated_at: now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        });
    }

    let mut payments: Vec<Payment> = store.load(store::PAYMENTS)?;
    payments.extend(generated.iter().cloned());
    store.save(store::PAYMENTS, &payments)?;

    tracing::debug!(user = %user_id, count, "generated synthetic payments");

    Ok(generated)
}

fn generate_reference() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let tail: String = (0..8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("PAY-{tail}")
}
