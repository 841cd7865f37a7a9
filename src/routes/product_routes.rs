use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, Query as SqlQuery, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;

use crate::entities::{
    attribute, category, product,
    product::Entity as ProductEntity,
    product_attribute_value, product_image,
};
use crate::error::{CatalogError, CatalogResult};
use crate::middleware::logging::{error_response, to_response, ApiError};
use crate::routes::{AppState, SLUG_REGEX};
use crate::services::image_lifecycle::ImageLifecycle;
use crate::services::product::{self as product_service, NewProduct, ProductPatch};
use crate::thumbnails::Variant;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

//ROUTERS
pub fn product_routes() -> Router {
    Router::new()
        .route("/products", get(get_products))
        .route("/products/:id", get(get_product))
}

pub fn admin_product_routes() -> Router {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", patch(patch_product).delete(delete_product))
}

//ROUTES
async fn get_products(
    Query(params): Query<GetProductsQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    match list_products(&state, params).await {
        Ok(page) => to_response((StatusCode::OK, Json(page)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn get_product(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    let product = match ProductEntity::find_by_id(id).one(&state.db).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            let tmp = format!("No product with {} id was found.", id);
            return to_response(
                (StatusCode::NOT_FOUND, Json(json!({ "error": tmp }))),
                Err(ApiError::General(tmp)),
            );
        }
        Err(err) => return error_response(err.into()),
    };

    match load_details(&state, vec![product]).await {
        Ok(mut details) => match details.pop() {
            Some(detail) => to_response((StatusCode::OK, Json(detail)), Ok(())),
            None => error_response(CatalogError::NotFound(format!(
                "No product with {} id was found.",
                id
            ))),
        },
        Err(err) => error_response(err),
    }
}

async fn create_product(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateProduct>,
) -> Response {
    if let Err(err) = payload.validate() {
        return to_response(
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))),
            Err(ApiError::ValidationFail(err.to_string())),
        );
    }

    let new = NewProduct {
        title: payload.title,
        category_id: payload.category_id,
        description: payload.description,
        price: payload.price,
        slug: payload.slug,
        sku: payload.sku,
    };
    match product_service::create_product(&state.db, new).await {
        Ok(product) => to_response((StatusCode::CREATED, Json(product)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn patch_product(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PatchProductPayload>,
) -> Response {
    if let Err(err) = payload.validate() {
        return to_response(
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))),
            Err(ApiError::ValidationFail(err.to_string())),
        );
    }

    let patch = ProductPatch {
        title: payload.title,
        slug: payload.slug,
        category_id: payload.category_id,
        description: payload.description,
        price: payload.price,
        sku: payload.sku,
    };
    match product_service::update_product(&state.db, &state.lifecycle, id, patch).await {
        Ok(product) => to_response((StatusCode::OK, Json(product)), Ok(())),
        Err(err) => error_response(err),
    }
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    match product_service::delete_product(&state.db, &state.lifecycle, id).await {
        Ok(()) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource deleted successfully."
                })),
            ),
            Ok(()),
        ),
        Err(err) => error_response(err),
    }
}

//Query building
async fn list_products(state: &AppState, params: GetProductsQuery) -> CatalogResult<ProductPage> {
    let page = params.page.unwrap_or(1);
    if page == 0 {
        return Err(CatalogError::NotFound("Invalid page.".into()));
    }
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let condition = filter_condition(&params)?;
    let select = ordered(
        ProductEntity::find().filter(condition),
        params.ordering.as_deref(),
    );

    let paginator = select.paginate(&state.db, page_size);
    let count = paginator.num_items().await?;
    let products = paginator.fetch_page(page - 1).await?;
    if products.is_empty() && page > 1 {
        return Err(CatalogError::NotFound("Invalid page.".into()));
    }

    let num_pages = count.div_ceil(page_size);
    Ok(ProductPage {
        count,
        next: (page < num_pages).then_some(page + 1),
        previous: (page > 1).then_some(page - 1),
        results: load_details(state, products).await?,
    })
}

fn filter_condition(params: &GetProductsQuery) -> CatalogResult<Condition> {
    let mut condition = Condition::all();

    //Filter zone
    if let Some(slug) = &params.category {
        condition = condition.add(
            product::Column::CategoryId.in_subquery(
                SqlQuery::select()
                    .column(category::Column::Id)
                    .from(category::Entity)
                    .and_where(category::Column::Slug.eq(slug.as_str()))
                    .to_owned(),
            ),
        );
    }
    if let Some(price_gte) = &params.price_gte {
        condition = condition.add(product::Column::Price.gte(parse_price("price_gte", price_gte)?));
    }
    if let Some(price_lte) = &params.price_lte {
        condition = condition.add(product::Column::Price.lte(parse_price("price_lte", price_lte)?));
    }

    // attribute filters describe one line of the characteristic sheet
    if params.attribute.is_some() || params.value.is_some() || params.value_icontains.is_some() {
        let mut sheet = SqlQuery::select();
        sheet
            .column((product_attribute_value::Entity, product_attribute_value::Column::ProductId))
            .from(product_attribute_value::Entity);
        if let Some(slug) = &params.attribute {
            sheet
                .inner_join(
                    attribute::Entity,
                    Expr::col((attribute::Entity, attribute::Column::Id)).equals((
                        product_attribute_value::Entity,
                        product_attribute_value::Column::AttributeId,
                    )),
                )
                .and_where(Expr::col((attribute::Entity, attribute::Column::Slug)).eq(slug.as_str()));
        }
        if let Some(value) = &params.value {
            sheet.and_where(
                Expr::col((product_attribute_value::Entity, product_attribute_value::Column::Value))
                    .eq(value.as_str()),
            );
        }
        if let Some(fragment) = &params.value_icontains {
            sheet.and_where(icontains(
                (product_attribute_value::Entity, product_attribute_value::Column::Value),
                fragment,
            ));
        }
        condition = condition.add(product::Column::Id.in_subquery(sheet.to_owned()));
    }

    //Search zone
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(icontains((product::Entity, product::Column::Title), search))
                .add(icontains((product::Entity, product::Column::Description), search))
                .add(icontains((product::Entity, product::Column::Sku), search)),
        );
    }

    Ok(condition)
}

/// Applies `ordering` (`price`, `title`, `-` for descending, comma separated).
/// Unknown fields are ignored; without any, products are ordered by title.
fn ordered(mut select: Select<ProductEntity>, ordering: Option<&str>) -> Select<ProductEntity> {
    let mut applied = false;
    for field in ordering.unwrap_or_default().split(',').map(str::trim) {
        let (name, order) = match field.strip_prefix('-') {
            Some(name) => (name, Order::Desc),
            None => (field, Order::Asc),
        };
        let column = match name {
            "price" => product::Column::Price,
            "title" => product::Column::Title,
            _ => continue,
        };
        select = select.order_by(column, order);
        applied = true;
    }
    if !applied {
        select = select.order_by_asc(product::Column::Title);
    }
    select.order_by_asc(product::Column::Id)
}

/// Case-insensitive substring match, with `%` and `_` in `fragment` taken
/// literally.
fn icontains<C: IntoColumnRef>(column: C, fragment: &str) -> SimpleExpr {
    let escaped = fragment
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(format!("%{escaped}%")).escape('\\'))
}

fn parse_price(field: &str, value: &str) -> CatalogResult<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|_| CatalogError::Validation(format!("{field} must be a decimal number")))
}

//Read model
async fn load_details(
    state: &AppState,
    products: Vec<product::Model>,
) -> CatalogResult<Vec<ProductResponse>> {
    let ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    let category_ids: Vec<i32> = products.iter().map(|p| p.category_id).collect();

    let categories: HashMap<i32, category::Model> = category::Entity::find()
        .filter(category::Column::Id.is_in(category_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let mut images: HashMap<i32, Vec<ImageResponse>> = HashMap::new();
    for image in product_image::Entity::find()
        .filter(product_image::Column::ProductId.is_in(ids.clone()))
        .order_by_desc(product_image::Column::IsMain)
        .order_by_asc(product_image::Column::Id)
        .all(&state.db)
        .await?
    {
        let response = ImageResponse::new(&state.lifecycle, &image).await;
        images.entry(image.product_id).or_default().push(response);
    }

    let mut sheets: HashMap<i32, Vec<AttributeLine>> = HashMap::new();
    for (line, attribute) in product_attribute_value::Entity::find()
        .filter(product_attribute_value::Column::ProductId.is_in(ids))
        .find_also_related(attribute::Entity)
        .order_by_asc(product_attribute_value::Column::Id)
        .all(&state.db)
        .await?
    {
        sheets.entry(line.product_id).or_default().push(AttributeLine {
            attribute: attribute.map(|a| a.name).unwrap_or_default(),
            value: line.value,
        });
    }

    Ok(products
        .into_iter()
        .map(|p| ProductResponse {
            category: categories.get(&p.category_id).map(|c| CategoryRef {
                id: c.id,
                title: c.title.clone(),
            }),
            images: images.remove(&p.id).unwrap_or_default(),
            attributes: sheets.remove(&p.id).unwrap_or_default(),
            id: p.id,
            title: p.title,
            sku: p.sku,
            slug: p.slug,
            description: p.description,
            price: product_service::fixed_price(p.price),
        })
        .collect())
}

//Structs
#[derive(Deserialize, Validate)]
struct CreateProduct {
    #[validate(length(min = 1, max = 255))]
    title: String,
    category_id: i32,
    #[serde(default)]
    description: String,
    price: Decimal,
    #[validate(regex(path = *SLUG_REGEX), length(max = 50))]
    slug: Option<String>,
    #[validate(length(max = 100))]
    sku: Option<String>,
}

#[derive(Deserialize, Validate)]
struct PatchProductPayload {
    #[validate(length(min = 1, max = 255))]
    title: Option<String>,
    #[validate(regex(path = *SLUG_REGEX), length(max = 50))]
    slug: Option<String>,
    category_id: Option<i32>,
    description: Option<String>,
    price: Option<Decimal>,
    #[validate(length(max = 100))]
    sku: Option<String>,
}

#[derive(Deserialize, Default)]
struct GetProductsQuery {
    //filter zone
    category: Option<String>,
    price_gte: Option<String>,
    price_lte: Option<String>,
    attribute: Option<String>,
    value: Option<String>,
    value_icontains: Option<String>,
    //search zone
    search: Option<String>,
    //sort zone
    ordering: Option<String>,
    //pagination zone
    page: Option<u64>,
    page_size: Option<u64>,
}

#[derive(Serialize)]
struct ProductPage {
    count: u64,
    next: Option<u64>,
    previous: Option<u64>,
    results: Vec<ProductResponse>,
}

#[derive(Serialize)]
struct ProductResponse {
    id: i32,
    title: String,
    sku: String,
    slug: String,
    description: String,
    price: Decimal,
    category: Option<CategoryRef>,
    images: Vec<ImageResponse>,
    attributes: Vec<AttributeLine>,
}

#[derive(Serialize)]
struct CategoryRef {
    id: i32,
    title: String,
}

#[derive(Serialize)]
struct ImageResponse {
    id: i32,
    default_url: Option<String>,
    preview_url: Option<String>,
    is_main: bool,
}

impl ImageResponse {
    /// Variants are rendered here if warming has not happened yet. A broken
    /// source leaves the URL empty instead of failing the whole listing.
    async fn new(lifecycle: &ImageLifecycle, image: &product_image::Model) -> ImageResponse {
        let mut urls = Vec::with_capacity(Variant::ALL.len());
        for variant in Variant::ALL {
            match lifecycle.variant_url(image, variant).await {
                Ok(url) => urls.push(Some(url)),
                Err(err) => {
                    tracing::warn!(image_id = image.id, variant = variant.name(), error = %err, "Thumbnail unavailable");
                    urls.push(None);
                }
            }
        }
        let mut urls = urls.into_iter();
        ImageResponse {
            id: image.id,
            default_url: urls.next().flatten(),
            preview_url: urls.next().flatten(),
            is_main: image.is_main,
        }
    }
}

#[derive(Serialize)]
struct AttributeLine {
    attribute: String,
    value: String,
}
