#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pim_catalog::config::Config;
use pim_catalog::routes::AppState;
use pim_catalog::{api_router, build_state};
use reqwest::{multipart, Client, StatusCode};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestApp {
    pub base: String,
    pub client: Client,
    pub state: Arc<AppState>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn media_path(&self, relative: &str) -> PathBuf {
        self.dir.path().join("media").join(relative)
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    pub async fn patch_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self.client.patch(self.url(path)).json(&body).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    pub async fn put_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    pub async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.delete(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    pub async fn create_category(&self, title: &str, parent_id: Option<i64>) -> Value {
        let (status, body) = self
            .post_json(
                "/api/admin/categories",
                json!({ "title": title, "parent_id": parent_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    pub async fn create_product(&self, title: &str, category_id: i64, price: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/api/admin/products",
                json!({
                    "title": title,
                    "category_id": category_id,
                    "description": format!("{title} description"),
                    "price": price
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    pub async fn upload_image(
        &self,
        product_id: i64,
        filename: &str,
        is_main: bool,
        cropping: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut form = multipart::Form::new()
            .text("is_main", is_main.to_string())
            .part(
                "file",
                multipart::Part::bytes(png(64, 48))
                    .file_name(filename.to_string())
                    .mime_str("image/png")
                    .unwrap(),
            );
        if let Some(cropping) = cropping {
            form = form.text("cropping", cropping.to_string());
        }

        let response = self
            .client
            .post(self.url(&format!("/api/admin/products/{product_id}/images")))
            .multipart(form)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let database_url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("catalog.db").display()
    );
    let config = Config::local(database_url, dir.path().join("media"));
    let state = build_state(&config).await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base: format!("http://{addr}"),
        client: Client::new(),
        state,
        dir,
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png).unwrap();
    buffer
}
