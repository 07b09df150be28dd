use mcs_dal::movie::MovieDetail;
use mcs_e2e_tests::{
    extend_url, launch_env, prepare_env,
    rest::{create_genre, movie_form, create_movie},
    TestUser,
};
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

fn row_titles(page: &serde_json::Value) -> Vec<String> {
    page.get("rows")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.get("title").unwrap().as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
#[traced_test]
async fn test_movie_filter() {
    let (args, _config_guard) = prepare_env("test_movie_filter").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _server) = launch_env(args, TestUser::Admin).await.unwrap();

    let crime = create_genre(&client, &base_url, "crime").await.unwrap();

    let movies = [
        ("Movie 1", false, "2020-01-10", vec![crime.id]),
        ("Doesn't released movie", false, "2030-05-01", vec![]),
        ("Movie in theaters", true, "2024-05-20", vec![]),
    ];
    for (title, just_released, release_date, genre_ids) in movies {
        let form = movie_form(
            title,
            just_released,
            release_date,
            &genre_ids,
            &json!([]),
            None,
        )
        .unwrap();
        create_movie(&client, &base_url, form).await.unwrap();
    }

    let filter_url = base_url.join("api/movie/filter").unwrap();

    let get_filtered = |query: &str| {
        let mut url = filter_url.clone();
        url.set_query(Some(query));
        let client = client.clone();
        async move {
            let response = client.get(url).send().await.unwrap();
            assert!(response.status().is_success());
            response.json::<serde_json::Value>().await.unwrap()
        }
    };

    let page = get_filtered("just_released=true").await;
    assert_eq!(row_titles(&page), ["Movie in theaters"]);

    let page = get_filtered("coming_release=true").await;
    assert_eq!(row_titles(&page), ["Doesn't released movie"]);

    // AND composition: title alone is a superset of title + just_released
    let page = get_filtered("title=Movie").await;
    assert_eq!(page.get("total").unwrap().as_u64().unwrap(), 2);
    let page = get_filtered("title=Movie&just_released=true").await;
    assert_eq!(row_titles(&page), ["Movie in theaters"]);

    let page = get_filtered(&format!("genre_id={}", crime.id)).await;
    assert_eq!(row_titles(&page), ["Movie 1"]);

    // genre id 0 is treated as unset
    let page = get_filtered("genre_id=0").await;
    assert_eq!(page.get("total").unwrap().as_u64().unwrap(), 3);

    let page = get_filtered("order_field=title&descending=true").await;
    assert_eq!(
        row_titles(&page),
        ["Movie in theaters", "Movie 1", "Doesn't released movie"]
    );

    // unknown order field degrades to store order with a success status
    let page = get_filtered("order_field=box_office").await;
    assert_eq!(page.get("total").unwrap().as_u64().unwrap(), 3);
    assert_eq!(row_titles(&page).len(), 3);

    // no filters at all - plain first page
    let page = get_filtered("").await;
    assert_eq!(page.get("total").unwrap().as_u64().unwrap(), 3);
}

#[tokio::test]
#[traced_test]
async fn test_movie_detail_and_latest() {
    let (args, _config_guard) = prepare_env("test_movie_detail").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _server) = launch_env(args, TestUser::Admin).await.unwrap();

    let crime = create_genre(&client, &base_url, "crime").await.unwrap();
    let scifi = create_genre(&client, &base_url, "sci-fi").await.unwrap();

    // actors via multipart form
    let actor_url = base_url.join("api/actor").unwrap();
    let mut actor_ids = Vec::new();
    for name in ["John Doe", "Jane Roe"] {
        let form = mcs_e2e_tests::rest::actor_form(name, "1980-03-01", None).unwrap();
        let response = client
            .post(actor_url.clone())
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        let actor: mcs_dal::actor::Actor = response.json().await.unwrap();
        actor_ids.push(actor.id);
    }

    let cast = json!([
        {"actor_id": actor_ids[1], "character": "Lead"},
        {"actor_id": actor_ids[0], "character": null},
    ]);
    let form = movie_form(
        "Ensemble piece",
        true,
        "2024-02-02",
        &[crime.id, scifi.id],
        &cast,
        None,
    )
    .unwrap();
    let movie = create_movie(&client, &base_url, form).await.unwrap();
    info!("Created movie {movie:?}");

    let movie_url = extend_url(&base_url.join("api/movie").unwrap(), movie.id);
    let detail: MovieDetail = client
        .get(movie_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.genres.len(), 2);
    // cast order follows the submitted list
    assert_eq!(detail.actors[0].name, "Jane Roe");
    assert_eq!(detail.actors[0].character.as_deref(), Some("Lead"));
    assert_eq!(detail.actors[1].name, "John Doe");

    // full update replaces the join rows
    let form = movie_form("Ensemble piece", true, "2024-02-02", &[scifi.id], &json!([]), None)
        .unwrap();
    let response = client
        .put(movie_url.clone())
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let detail: MovieDetail = client
        .get(movie_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.genres.len(), 1);
    assert!(detail.actors.is_empty());

    // latest: one in theaters, nothing in the future
    let latest_url = base_url.join("api/movie/latest").unwrap();
    let latest: serde_json::Value = client
        .get(latest_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        latest.get("in_theaters").unwrap().as_array().unwrap().len(),
        1
    );
    assert!(latest
        .get("coming_releases")
        .unwrap()
        .as_array()
        .unwrap()
        .is_empty());
}
