use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{PaymentStatus, Transaction};
use crate::store::{self, Store};

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub user_id: String,
    pub amount: f64,
    pub transaction_type: String,
    pub description: Option<String>,
}

pub fn create_transaction(store: &Store, data: NewTransaction) -> AppResult<Transaction> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        user_id: data.user_id,
        amount: data.amount,
        transaction_type: data.transaction_type,
        status: PaymentStatus::Pending,
        description: data.description,
        created_at: now.clone(),
        updated_at: now,
    };

    let mut transactions: Vec<Transaction> = store.load(store::TRANSACTIONS)?;
    transactions.push(transaction.clone());
    store.save(store::TRANSACTIONS, &transactions)?;

    Ok(transaction)
}

pub fn get_user_transactions(store: &Store, user_id: &str) -> AppResult<Vec<Transaction>> {
    let transactions: Vec<Transaction> = store.load(store::TRANSACTIONS)?;
    Ok(transactions
        .into_iter()
        .filter(|t| t.user_id == user_id)
        .collect())
}
