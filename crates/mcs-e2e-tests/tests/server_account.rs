use mcs_e2e_tests::{api_client, launch_env, prepare_env, TestUser, USER_EMAIL};
use serde_json::json;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_account_create_and_login() {
    let (args, _config_guard) = prepare_env("test_account_create").await.unwrap();
    let base_url = args.base_url.clone();
    let (_admin, _server) = launch_env(args, TestUser::Admin).await.unwrap();

    let client = reqwest::Client::new();
    let create_url = base_url.join("api/account/create").unwrap();
    let login_url = base_url.join("api/account/login").unwrap();

    let response = client
        .post(create_url.clone())
        .json(&json!({"email": "carol@example.com", "password": "a-long-password"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.get("token").unwrap().as_str().is_some());
    assert!(body.get("valid_until").is_some());

    // duplicate registration is rejected
    let response = client
        .post(create_url.clone())
        .json(&json!({"email": "carol@example.com", "password": "another-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // short password never reaches the store
    let response = client
        .post(create_url)
        .json(&json!({"email": "dave@example.com", "password": "short"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    // fresh account can log in
    let response = client
        .post(login_url.clone())
        .json(&json!({"email": "carol@example.com", "password": "a-long-password"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // wrong password is a 400
    let response = client
        .post(login_url.clone())
        .json(&json!({"email": "carol@example.com", "password": "wrong-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // unknown user is indistinguishable from a wrong password
    let response = client
        .post(login_url)
        .json(&json!({"email": "nobody@example.com", "password": "whatever-pass"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[traced_test]
async fn test_account_admin_surface() {
    let (args, _config_guard) = prepare_env("test_account_admin").await.unwrap();
    let base_url = args.base_url.clone();
    let (admin, _server) = launch_env(args, TestUser::Admin).await.unwrap();
    let user = api_client(&base_url, TestUser::User).await.unwrap();

    let users_url = base_url.join("api/account/users").unwrap();
    let roles_url = base_url.join("api/account/roles").unwrap();

    // admin-only listing
    let response = admin.get(users_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());
    let page: serde_json::Value = response.json().await.unwrap();
    assert_eq!(page.get("total").unwrap().as_u64().unwrap(), 2);

    let response = user.get(users_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let response = reqwest::Client::new()
        .get(users_url.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let roles: Vec<String> = admin
        .get(roles_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(roles, ["admin", "user"]);

    // promote the plain user, then the new token carries the admin role
    let page: serde_json::Value = admin
        .get(users_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let user_id = page
        .get("rows")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u.get("email").unwrap().as_str() == Some(USER_EMAIL))
        .unwrap()
        .get("id")
        .unwrap()
        .as_i64()
        .unwrap();

    let assign_url = base_url.join("api/account/roles/assign").unwrap();
    let response = admin
        .post(assign_url)
        .json(&json!({"user_id": user_id, "role": "admin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // the old token still lacks the role; a new login picks it up
    let response = user.get(users_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let promoted = api_client(&base_url, TestUser::User).await.unwrap();
    let response = promoted.get(users_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());

    let remove_url = base_url.join("api/account/roles/remove").unwrap();
    let response = admin
        .post(remove_url)
        .json(&json!({"user_id": user_id, "role": "admin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // renew reflects current store roles, not the old token
    let renew_url = base_url.join("api/account/renew").unwrap();
    let response = promoted.post(renew_url).send().await.unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    let fresh_token = body.get("token").unwrap().as_str().unwrap();
    let response = reqwest::Client::new()
        .get(users_url)
        .bearer_auth(fresh_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
