use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::entities::product_image;

/// Keeps at most one main image per product.
///
/// Must run before the image with `is_main` is written, on the same
/// connection or transaction as that write. Clears the flag on every other
/// image of `product_id`; `exclude_id` is the image being written, if it
/// already exists. Returns how many siblings were demoted.
pub async fn enforce_single_main<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    is_main: bool,
    exclude_id: Option<i32>,
) -> Result<u64, DbErr> {
    if !is_main {
        return Ok(0);
    }

    let mut update = product_image::Entity::update_many()
        .col_expr(product_image::Column::IsMain, Expr::value(false))
        .filter(product_image::Column::ProductId.eq(product_id))
        .filter(product_image::Column::IsMain.eq(true));
    if let Some(id) = exclude_id {
        update = update.filter(product_image::Column::Id.ne(id));
    }

    let result = update.exec(db).await?;
    if result.rows_affected > 0 {
        tracing::debug!(product_id, demoted = result.rows_affected, "Cleared previous main image");
    }
    Ok(result.rows_affected)
}
