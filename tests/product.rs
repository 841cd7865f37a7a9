mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::spawn_app;

fn id(value: &Value) -> i64 {
    value["id"].as_i64().unwrap()
}

fn titles(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_product_assigns_slug_and_sku() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;

    let product = app.create_product("Red Kettle", id(&category), "19.99").await;
    assert_eq!(product["slug"], "red-kettle");

    let sku = product["sku"].as_str().unwrap();
    assert_eq!(sku.len(), 8);
    assert!(sku.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_colliding_titles_get_numbered_slugs() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;

    let first = app.create_product("foo", id(&category), "1.00").await;
    let second = app.create_product("foo", id(&category), "1.00").await;
    let third = app.create_product("Foo!", id(&category), "1.00").await;

    assert_eq!(first["slug"], "foo");
    assert_eq!(second["slug"], "foo-2");
    assert_eq!(third["slug"], "foo-3");
    assert_ne!(first["sku"], second["sku"]);
}

#[tokio::test]
async fn test_resave_keeps_slug() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;
    let product = app.create_product("gamma", id(&category), "5.00").await;

    let (status, body) = app
        .patch_json(
            &format!("/api/admin/products/{}", id(&product)),
            json!({ "slug": "gamma", "title": "Gamma Deluxe" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["slug"], "gamma");
    assert_eq!(body["title"], "Gamma Deluxe");
    assert_eq!(body["sku"], product["sku"]);
}

#[tokio::test]
async fn test_empty_slug_is_regenerated_from_title() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;
    let product = app.create_product("Old name", id(&category), "5.00").await;

    let (status, body) = app
        .patch_json(
            &format!("/api/admin/products/{}", id(&product)),
            json!({ "title": "New name", "slug": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["slug"], "new-name");
}

#[tokio::test]
async fn test_identifier_conflicts() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;
    let taken = app.create_product("taken", id(&category), "5.00").await;
    let other = app.create_product("other", id(&category), "5.00").await;

    let (status, _) = app
        .patch_json(
            &format!("/api/admin/products/{}", id(&other)),
            json!({ "slug": "taken" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post_json(
            "/api/admin/products",
            json!({
                "title": "copy",
                "category_id": id(&category),
                "price": "1.00",
                "sku": taken["sku"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .patch_json(
            &format!("/api/admin/products/{}", id(&other)),
            json!({ "slug": "Not A Slug" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_product_validation() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;

    let (status, _) = app
        .post_json(
            "/api/admin/products",
            json!({ "title": "x", "category_id": 999, "price": "1.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post_json(
            "/api/admin/products",
            json!({ "title": "x", "category_id": id(&category), "price": "1.001" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_json(
            "/api/admin/products",
            json!({ "title": "", "category_id": id(&category), "price": "1.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_products_filters_and_ordering() {
    let app = spawn_app().await;
    let kitchen = app.create_category("Kitchen", None).await;
    let garden = app.create_category("Garden", None).await;

    let kettle = app.create_product("Kettle", id(&kitchen), "30.00").await;
    let toaster = app.create_product("Toaster", id(&kitchen), "45.50").await;
    app.create_product("Rake", id(&garden), "12.00").await;

    let (status, color) = app
        .post_json("/api/admin/attributes", json!({ "name": "Color" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{color}");
    assert_eq!(color["slug"], "color");
    assert_eq!(color["value_type"], "str");

    for (product, value) in [(&kettle, "Bright Red"), (&toaster, "Silver")] {
        let (status, body) = app
            .put_json(
                &format!("/api/admin/products/{}/attributes/{}", id(product), id(&color)),
                json!({ "value": value }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (_, page) = app.get_json("/api/products").await;
    assert_eq!(page["count"], 3);
    assert_eq!(titles(&page), ["Kettle", "Rake", "Toaster"]);

    let (_, page) = app.get_json("/api/products?category=kitchen&ordering=-price").await;
    assert_eq!(titles(&page), ["Toaster", "Kettle"]);

    let (_, page) = app.get_json("/api/products?price_gte=20&price_lte=40").await;
    assert_eq!(titles(&page), ["Kettle"]);

    let (_, page) = app.get_json("/api/products?search=RAKE").await;
    assert_eq!(titles(&page), ["Rake"]);

    let (_, page) = app.get_json("/api/products?attribute=color&value_icontains=red").await;
    assert_eq!(titles(&page), ["Kettle"]);

    let (_, page) = app.get_json("/api/products?value=Silver").await;
    assert_eq!(titles(&page), ["Toaster"]);

    let (status, _) = app.get_json("/api/products?price_gte=cheap").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_products_pagination() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;
    for title in ["A", "B", "C"] {
        app.create_product(title, id(&category), "1.00").await;
    }

    let (_, page) = app.get_json("/api/products?page_size=2").await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["next"], 2);
    assert_eq!(page["previous"], Value::Null);
    assert_eq!(titles(&page), ["A", "B"]);

    let (_, page) = app.get_json("/api/products?page_size=2&page=2").await;
    assert_eq!(page["next"], Value::Null);
    assert_eq!(page["previous"], 1);
    assert_eq!(titles(&page), ["C"]);

    let (status, _) = app.get_json("/api/products?page_size=2&page=3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_product_read_model() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;
    let product = app.create_product("Kettle", id(&category), "30.00").await;

    let (status, body) = app.get_json(&format!("/api/products/{}", id(&product))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "kettle");
    assert_eq!(body["category"]["title"], "Kitchen");
    assert_eq!(body["images"], json!([]));
    assert_eq!(body["attributes"], json!([]));
    assert_eq!(body["price"], "30.00");

    let (status, _) = app.get_json("/api/products/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prices_keep_two_fractional_digits() {
    let app = spawn_app().await;
    let category = app.create_category("Kitchen", None).await;

    let product = app.create_product("Mug", id(&category), "9.5").await;
    assert_eq!(product["price"], "9.50");

    let (status, body) = app
        .patch_json(
            &format!("/api/admin/products/{}", id(&product)),
            json!({ "price": "12" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["price"], "12.00");

    let (_, page) = app.get_json("/api/products").await;
    assert_eq!(page["results"][0]["price"], "12.00");
}

#[tokio::test]
async fn test_attribute_vocabulary_is_unique() {
    let app = spawn_app().await;
    let (_, size) = app
        .post_json("/api/admin/attributes", json!({ "name": "Size", "value_type": "int" }))
        .await;

    let path = format!("/api/admin/attributes/{}/values", id(&size));
    let (status, _) = app.post_json(&path, json!({ "value": "42" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post_json(&path, json!({ "value": "42" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post_json("/api/admin/attributes", json!({ "name": "Size" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
