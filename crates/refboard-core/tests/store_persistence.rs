//! The store survives a close/reopen cycle: accounts, sessions, and
//! payments written through one handle are read back through a fresh one.

use refboard_core::auth::{self, NewUser};
use refboard_core::services::payments;
use refboard_core::store::Store;

#[test]
fn collections_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refboard.db");
    let path = path.to_str().unwrap();

    let user_id = {
        let store = Store::open(path).unwrap();
        let user = auth::register(
            &store,
            NewUser {
                first_name: "Ama".to_string(),
                last_name: "Mensah".to_string(),
                email: "ama@example.com".to_string(),
                password: "a strong one".to_string(),
                referral_code: None,
            },
        )
        .unwrap();
        payments::generate_test_payments(&store, &user.id, 5).unwrap();
        user.id
    };

    let store = Store::open(path).unwrap();

    // Reopening must not reset seeded collections.
    let history = payments::get_user_payments(&store, &user_id).unwrap();
    assert_eq!(history.len(), 5);

    // Credentials written before the reopen still authenticate.
    let (user, session) = auth::login(&store, "ama@example.com", "a strong one").unwrap();
    assert_eq!(user.id, user_id);
    assert!(auth::is_authenticated(&store, &session.token).unwrap());
}
