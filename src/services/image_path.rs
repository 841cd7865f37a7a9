use uuid::Uuid;

pub const PRODUCT_IMAGES_DIR: &str = "product_images";

const DISAMBIGUATOR_LEN: usize = 8;

/// Storage path for a new file of product `product_slug`:
/// `product_images/<slug>/<slug>-<8 hex>.<ext>`.
///
/// The disambiguator is random, not checked against existing files.
pub fn plan_path(product_slug: &str, original_filename: &str) -> String {
    let ext = extension(original_filename).to_lowercase();
    let disambiguator = &Uuid::new_v4().simple().to_string()[..DISAMBIGUATOR_LEN];
    format!("{PRODUCT_IMAGES_DIR}/{product_slug}/{product_slug}-{disambiguator}.{ext}")
}

/// Directory every image of `product_slug` lives under, with trailing `/`.
pub fn product_dir(product_slug: &str) -> String {
    format!("{PRODUCT_IMAGES_DIR}/{product_slug}/")
}

/// Text after the last `.`, or the whole name when there is none.
pub fn extension(filename: &str) -> &str {
    filename.rsplit('.').next().unwrap_or(filename)
}
