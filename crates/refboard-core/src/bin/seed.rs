//! Provision a demo dataset: a demo account, a referred signup, and a
//! month of synthetic payout history.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use refboard_core::auth::{self, NewUser};
use refboard_core::config::Config;
use refboard_core::error::AppError;
use refboard_core::services::{payments, referrals};
use refboard_core::store::Store;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("refboard_core=debug,seed=info")),
        )
        .init();

    let config = Config::from_env();
    let store = Store::open(&config.store_path).context("open store")?;
    tracing::info!("Store initialized at {}", config.store_path);

    let demo = match auth::register(
        &store,
        NewUser {
            first_name: "Ama".to_string(),
            last_name: "Mensah".to_string(),
            email: "demo@refboard.local".to_string(),
            password: "demo-password".to_string(),
            referral_code: None,
        },
    ) {
        Ok(user) => user,
        Err(AppError::DuplicateEmail) => {
            tracing::info!("demo account already present, nothing to do");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // One referred signup so the referral list isn't empty.
    auth::register(
        &store,
        NewUser {
            first_name: "Kwame".to_string(),
            last_name: "Boateng".to_string(),
            email: "friend@refboard.local".to_string(),
            password: "demo-password".to_string(),
            referral_code: Some(demo.referral_code.clone()),
        },
    )?;

    let seeded = payments::generate_test_payments(&store, &demo.id, 8)?;
    let stats = referrals::get_referral_stats(&store, &demo.id)?;

    tracing::info!(
        payments = seeded.len(),
        referrals = stats.total,
        "seeded demo data for {}",
        demo.email
    );
    tracing::info!(
        "share link: {}",
        referrals::referral_link(&config.app_url, &demo.referral_code)
    );

    Ok(())
}
