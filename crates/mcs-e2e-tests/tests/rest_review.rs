use mcs_e2e_tests::{
    api_client, launch_env, prepare_env,
    rest::{create_movie, movie_form},
    TestUser,
};
use serde_json::json;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_review_lifecycle() {
    let (args, _config_guard) = prepare_env("test_review_lifecycle").await.unwrap();
    let base_url = args.base_url.clone();
    let (admin, _server) = launch_env(args, TestUser::Admin).await.unwrap();
    let user = api_client(&base_url, TestUser::User).await.unwrap();

    let form = movie_form("Reviewed movie", true, "2024-01-01", &[], &json!([]), None).unwrap();
    let movie = create_movie(&admin, &base_url, form).await.unwrap();

    let review_url = base_url
        .join(&format!("api/movie/{}/review", movie.id))
        .unwrap();

    // reviews of an unknown movie are a 404
    let missing_url = base_url.join("api/movie/424242/review").unwrap();
    let response = user.get(missing_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // anonymous cannot review
    let response = reqwest::Client::new()
        .post(review_url.clone())
        .json(&json!({"comment": "Nice", "score": 4}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // first review succeeds
    let response = user
        .post(review_url.clone())
        .json(&json!({"comment": "Nice", "score": 4}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // second review by the same user for the same movie is a 400
    let response = user
        .post(review_url.clone())
        .json(&json!({"comment": "Again", "score": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // another user may still review
    let response = admin
        .post(review_url.clone())
        .json(&json!({"comment": "Meh", "score": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let page: serde_json::Value = user
        .get(review_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = page.get("rows").unwrap().as_array().unwrap().clone();
    assert_eq!(rows.len(), 2);
    let users_review = rows
        .iter()
        .find(|r| r.get("comment").unwrap().as_str() == Some("Nice"))
        .unwrap();
    let review_id = users_review.get("id").unwrap().as_i64().unwrap();

    let one_review_url = base_url
        .join(&format!("api/movie/{}/review/{}", movie.id, review_id))
        .unwrap();

    // a non-owner cannot update or delete
    let response = admin
        .put(one_review_url.clone())
        .json(&json!({"comment": "Hijacked", "score": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let response = admin.delete(one_review_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // the owner updates; untouched fields keep their values
    let response = user
        .put(one_review_url.clone())
        .json(&json!({"comment": "Even better on rewatch", "score": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let page: serde_json::Value = user
        .get(review_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let updated = page
        .get("rows")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r.get("id").unwrap().as_i64() == Some(review_id))
        .unwrap()
        .clone();
    assert_eq!(updated.get("score").unwrap().as_i64(), Some(5));
    assert_eq!(
        updated.get("movie_id").unwrap().as_i64(),
        Some(movie.id)
    );

    // score outside 1..=5 is a validation error
    let response = user
        .put(one_review_url.clone())
        .json(&json!({"comment": "x", "score": 9}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    // owner deletes
    let response = user.delete(one_review_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let response = user.delete(one_review_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
