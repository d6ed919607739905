use portal_client::guard::NavigationDecision;
use portal_client::models::{ItemCreate, ItemUpdate, UserUpdateMe};
use portal_client::routes::Route;
use portal_client::{AppConfig, AppCore, MockApi, MutationIntent, TransportState};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

// --- Test Utilities ---

fn mock_core() -> (AppCore, Arc<MockApi>) {
    let mock = Arc::new(MockApi::new());
    let transport: TransportState = mock.clone();
    (AppCore::new(AppConfig::default(), transport), mock)
}

// --- End-to-End Scenarios ---

#[tokio::test]
async fn test_item_lifecycle() {
    let (core, _mock) = mock_core();

    // Anonymous visitors are bounced off the console.
    assert_eq!(
        core.guard.check(Route::Items),
        NavigationDecision::Redirect(Route::Login)
    );

    core.auth
        .login("admin@example.com", "changethis")
        .await
        .expect("login");
    assert_eq!(core.guard.check(Route::Items), NavigationDecision::Proceed);

    // Create an item; the list read that follows includes it.
    core.mutations
        .execute(MutationIntent::create_item(ItemCreate {
            title: "Milk".to_string(),
            description: Some("Whole".to_string()),
        }))
        .await
        .expect("create item");

    let page = core.items().await.expect("list items");
    assert_eq!(page.count, 1);
    assert!(page.data.iter().any(|item| item.title == "Milk"));

    // Update it; the refreshed list reflects the new title.
    let id = page.data[0].id;
    core.mutations
        .execute(MutationIntent::update_item(
            id,
            ItemUpdate {
                title: Some("Oat Milk".to_string()),
                description: None,
            },
        ))
        .await
        .expect("update item");

    let page = core.items().await.expect("list after update");
    assert_eq!(page.data[0].title, "Oat Milk");
    assert_eq!(page.data[0].description.as_deref(), Some("Whole"));

    // Delete it; the list drains.
    core.mutations
        .execute(MutationIntent::delete_item(id))
        .await
        .expect("delete item");
    let page = core.items().await.expect("list after delete");
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_profile_update_refreshes_current_user() {
    let (core, _mock) = mock_core();
    core.auth
        .login("admin@example.com", "changethis")
        .await
        .expect("login");

    let before = core.current_user().await.expect("initial profile");
    assert_eq!(before.email, "admin@example.com");

    core.mutations
        .execute(MutationIntent::update_me(UserUpdateMe {
            full_name: Some("New Name".to_string()),
            email: None,
        }))
        .await
        .expect("profile update");

    // The current-user entry was invalidated by the mutation; the next
    // read re-fetches.
    let after = core.current_user().await.expect("refreshed profile");
    assert_eq!(after.full_name.as_deref(), Some("New Name"));
    assert_eq!(after.email, "admin@example.com");
}

#[tokio::test]
async fn test_password_rotation_takes_effect() {
    let (core, _mock) = mock_core();
    core.auth
        .login("admin@example.com", "changethis")
        .await
        .expect("login");

    let ack = core
        .mutations
        .execute(MutationIntent::update_password(
            portal_client::models::UpdatePassword {
                current_password: "changethis".to_string(),
                new_password: "rotated-pass".to_string(),
            },
        ))
        .await
        .expect("password change");
    assert_eq!(ack["message"], json!("Password updated successfully"));

    core.auth.logout();

    // The old password no longer authenticates; the new one does.
    assert!(core.auth.login("admin@example.com", "changethis").await.is_err());
    core.auth
        .login("admin@example.com", "rotated-pass")
        .await
        .expect("login with rotated password");
    assert!(core.session.is_authenticated());
}

#[tokio::test]
async fn test_unknown_item_read_fails_cleanly() {
    let (core, _mock) = mock_core();
    core.auth
        .login("admin@example.com", "changethis")
        .await
        .expect("login");

    let missing = portal_client::ResourceKey::item(Uuid::new_v4());
    let err = core
        .cache
        .ensure_fresh(&missing)
        .await
        .expect_err("item does not exist");
    assert_eq!(err.user_message, "Item not found");
}
