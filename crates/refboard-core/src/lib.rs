//! Data layer for a referral/payout dashboard: accounts and sessions,
//! referrals, teams, transactions, and payout requests over a local
//! collection store.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
