use mcs_dal::genre::Genre;
use mcs_e2e_tests::{extend_url, launch_env, prepare_env, rest::create_genre, TestUser};
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_genre_crud() {
    let (args, _config_guard) = prepare_env("test_genre_crud").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _server) = launch_env(args, TestUser::Admin).await.unwrap();

    let api_url = base_url.join("api/genre").unwrap();

    let response = client
        .post(api_url.clone())
        .json(&json!({"name": "crime"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let genre: Genre = response.json().await.unwrap();
    assert_eq!(location, format!("/api/genre/{}", genre.id));
    assert_eq!(genre.name, "crime");

    for name in ["sci-fi", "fantasy"] {
        create_genre(&client, &base_url, name).await.unwrap();
    }

    let record_url = extend_url(&api_url, genre.id);
    let response = client.get(record_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());
    let fetched: Genre = response.json().await.unwrap();
    assert_eq!(fetched.name, "crime");

    // full update
    let response = client
        .put(record_url.clone())
        .json(&json!({"name": "noir"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // partial update
    let response = client
        .patch(record_url.clone())
        .json(&json!({"name": "neo-noir"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let fetched: Genre = client
        .get(record_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.name, "neo-noir");

    // patch violating the name length rule reports field errors
    let response = client
        .patch(record_url.clone())
        .json(&json!({"name": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let errors: serde_json::Value = response.json().await.unwrap();
    info!("Validation errors: {errors:#?}");
    assert!(errors.get("errors").is_some());

    let response = client.delete(record_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let response = client.get(record_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let response = client.delete(record_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let missing_url = extend_url(&api_url, 424242);
    let response = client.get(missing_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[traced_test]
async fn test_genre_paging_clamp() {
    let (args, _config_guard) = prepare_env("test_genre_paging").await.unwrap();
    let base_url = args.base_url.clone();

    // seed through the DAL before the server starts
    let conn = mcs_dal::new_pool(&args.database_url()).await.unwrap();
    for i in 0..60 {
        sqlx::query("INSERT INTO genre (name) VALUES (?)")
            .bind(format!("genre-{i:02}"))
            .execute(&conn)
            .await
            .unwrap();
    }
    conn.close().await;

    let (client, _server) = launch_env(args, TestUser::Anonymous).await.unwrap();
    let api_url = base_url.join("api/genre").unwrap();

    // requested size above the cap is clamped to 50, not rejected
    let mut page_url = api_url.clone();
    page_url.set_query(Some("page=1&records_per_page=500"));
    let response = client.get(page_url).send().await.unwrap();
    assert!(response.status().is_success());
    let page: serde_json::Value = response.json().await.unwrap();
    assert_eq!(page.get("page_size").unwrap().as_u64().unwrap(), 50);
    assert_eq!(page.get("rows").unwrap().as_array().unwrap().len(), 50);
    assert_eq!(page.get("total").unwrap().as_u64().unwrap(), 60);
    assert_eq!(page.get("total_pages").unwrap().as_u64().unwrap(), 2);

    // default page size
    let response = client.get(api_url.clone()).send().await.unwrap();
    let page: serde_json::Value = response.json().await.unwrap();
    assert_eq!(page.get("rows").unwrap().as_array().unwrap().len(), 10);
    assert_eq!(page.get("total_pages").unwrap().as_u64().unwrap(), 6);

    // sorted second page
    let mut page_url = api_url.clone();
    page_url.set_query(Some("page=2&records_per_page=20&sort=name"));
    let page: serde_json::Value = client
        .get(page_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = page.get("rows").unwrap().as_array().unwrap();
    assert_eq!(rows[0].get("name").unwrap().as_str().unwrap(), "genre-20");

    // page past the end is an empty success
    let mut page_url = api_url.clone();
    page_url.set_query(Some("page=100&records_per_page=50"));
    let response = client.get(page_url).send().await.unwrap();
    assert!(response.status().is_success());
    let page: serde_json::Value = response.json().await.unwrap();
    assert!(page.get("rows").unwrap().as_array().unwrap().is_empty());
    assert_eq!(page.get("total").unwrap().as_u64().unwrap(), 60);

    // unknown sort field on the generic listing is a client error
    let mut page_url = api_url.clone();
    page_url.set_query(Some("sort=popularity"));
    let response = client.get(page_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[traced_test]
async fn test_genre_write_requires_admin() {
    let (args, _config_guard) = prepare_env("test_genre_roles").await.unwrap();
    let base_url = args.base_url.clone();
    let (user_client, _server) = launch_env(args, TestUser::User).await.unwrap();
    let api_url = base_url.join("api/genre").unwrap();

    // plain user may read but not write
    let response = user_client.get(api_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());
    let response = user_client
        .post(api_url.clone())
        .json(&json!({"name": "crime"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // anonymous gets 401
    let anonymous = reqwest::Client::new();
    let response = anonymous
        .post(api_url)
        .json(&json!({"name": "crime"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}
