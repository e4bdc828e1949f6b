pub mod payments;
pub mod referrals;
pub mod teams;
pub mod transactions;
