use anyhow::{anyhow, Result};
use mcs_dal::{
    cinema::Cinema,
    genre::Genre,
    movie::MovieDetail,
};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde_json::json;
use tracing::info;

pub async fn login(
    client: &reqwest::Client,
    base_url: &Url,
    email: &str,
    password: &str,
) -> Result<String> {
    let api_url = base_url.join("api/account/login")?;
    let response = client
        .post(api_url)
        .json(&json!({"email": email, "password": password}))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(anyhow!("Login failed with status {}", response.status()));
    }
    let body: serde_json::Value = response.json().await?;
    body.get("token")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow!("No token in login response"))
}

pub async fn create_genre(client: &reqwest::Client, base_url: &Url, name: &str) -> Result<Genre> {
    let payload = json!({"name": name});
    let api_url = base_url.join("api/genre")?;

    let response = client.post(api_url.clone()).json(&payload).send().await?;
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_genre: Genre = response.json().await?;
    Ok(new_genre)
}

pub async fn create_cinema(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    latitude: f64,
    longitude: f64,
) -> Result<Cinema> {
    let payload = json!({"name": name, "latitude": latitude, "longitude": longitude});
    let api_url = base_url.join("api/cinema")?;

    let response = client.post(api_url.clone()).json(&payload).send().await?;
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_cinema: Cinema = response.json().await?;
    Ok(new_cinema)
}

pub fn actor_form(name: &str, birth_date: &str, photo: Option<(&'static [u8], &str)>) -> Result<Form> {
    let mut form = Form::new()
        .text("name", name.to_string())
        .text("birth_date", birth_date.to_string());
    if let Some((data, mime)) = photo {
        let part = Part::bytes(data).file_name("photo.img").mime_str(mime)?;
        form = form.part("photo", part);
    }
    Ok(form)
}

#[allow(clippy::too_many_arguments)]
pub fn movie_form(
    title: &str,
    just_released: bool,
    release_date: &str,
    genre_ids: &[i64],
    actors: &serde_json::Value,
    poster: Option<(Vec<u8>, &str)>,
) -> Result<Form> {
    let mut form = Form::new()
        .text("title", title.to_string())
        .text("just_released", just_released.to_string())
        .text("release_date", release_date.to_string())
        .text("genre_ids", serde_json::to_string(genre_ids)?)
        .text("actors", actors.to_string());
    if let Some((data, mime)) = poster {
        let part = Part::bytes(data).file_name("poster.img").mime_str(mime)?;
        form = form.part("poster", part);
    }
    Ok(form)
}

pub async fn create_movie(
    client: &reqwest::Client,
    base_url: &Url,
    form: Form,
) -> Result<MovieDetail> {
    let api_url = base_url.join("api/movie")?;

    let response = client.post(api_url.clone()).multipart(form).send().await?;
    info!("Movie create response: {:#?}", response);
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let body = response.text().await?;
    info!("Movie create response body: {:#?}", body);
    let new_movie: MovieDetail = serde_json::from_str(&body)?;
    Ok(new_movie)
}

/// Tiny valid PNG header plus padding - enough for upload tests, the server
/// checks only the declared content type and size.
pub fn fake_png() -> &'static [u8] {
    b"\x89PNG\r\n\x1a\nfake image payload"
}
