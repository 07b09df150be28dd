use mcs_dal::actor::Actor;
use mcs_e2e_tests::{
    extend_url, launch_env, prepare_env,
    rest::{actor_form, fake_png},
    TestUser,
};
use reqwest::multipart::{Form, Part};
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_actor_photo_lifecycle() {
    let (args, _config_guard) = prepare_env("test_actor_photo").await.unwrap();
    let base_url = args.base_url.clone();
    let media_dir = args.media_dir();
    let (client, _server) = launch_env(args, TestUser::Admin).await.unwrap();

    let api_url = base_url.join("api/actor").unwrap();

    let form = actor_form("John Doe", "1970-01-05", Some((fake_png(), "image/png"))).unwrap();
    let response = client
        .post(api_url.clone())
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let actor: Actor = response.json().await.unwrap();
    let photo = actor.photo.clone().expect("photo path stored");
    assert!(photo.starts_with("actors/"));
    assert!(photo.ends_with(".png"));
    let photo_on_disk = media_dir.join(&photo);
    assert!(photo_on_disk.exists());

    // stored image is served under /media
    let media_url = base_url.join(&format!("media/{photo}")).unwrap();
    let response = reqwest::Client::new().get(media_url).send().await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.bytes().await.unwrap().as_ref(), fake_png());

    // update with a new photo replaces the old file
    let record_url = extend_url(&api_url, actor.id);
    let form = actor_form("John Doe", "1970-01-05", Some((fake_png(), "image/jpeg"))).unwrap();
    let response = client
        .put(record_url.clone())
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    assert!(!photo_on_disk.exists());
    let updated: Actor = client
        .get(record_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let new_photo = updated.photo.expect("photo path kept");
    assert_ne!(new_photo, photo);
    assert!(media_dir.join(&new_photo).exists());

    // update without a photo keeps the current file
    let form = actor_form("John D. Doe", "1970-01-05", None).unwrap();
    let response = client
        .put(record_url.clone())
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    assert!(media_dir.join(&new_photo).exists());

    // deleting the actor removes the stored file as well
    let response = client.delete(record_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);
    assert!(!media_dir.join(&new_photo).exists());
}

#[tokio::test]
#[traced_test]
async fn test_image_upload_limits() {
    let (args, _config_guard) = prepare_env("test_upload_limits").await.unwrap();
    let base_url = args.base_url.clone();
    let media_dir = args.media_dir();
    let (client, _server) = launch_env(args, TestUser::Admin).await.unwrap();

    let api_url = base_url.join("api/actor").unwrap();

    // disallowed content type
    let form = actor_form("John Doe", "1970-01-05", Some((b"%PDF-1.4", "application/pdf"))).unwrap();
    let response = client
        .post(api_url.clone())
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    // over the 4 MB image cap (but under the request body limit)
    let big = vec![0u8; 5 * 1024 * 1024];
    let part = Part::bytes(big).file_name("big.png").mime_str("image/png").unwrap();
    let form = Form::new()
        .text("name", "John Doe")
        .text("birth_date", "1970-01-05")
        .part("photo", part);
    let response = client
        .post(api_url.clone())
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    // nothing was written to the media dir
    let mut entries = tokio::fs::read_dir(media_dir.join("actors"))
        .await
        .ok();
    if let Some(entries) = entries.as_mut() {
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    // actor without a photo is perfectly fine
    let form = actor_form("John Doe", "1970-01-05", None).unwrap();
    let response = client.post(api_url).multipart(form).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let actor: Actor = response.json().await.unwrap();
    assert!(actor.photo.is_none());
}
