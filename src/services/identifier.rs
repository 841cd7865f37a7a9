use async_trait::async_trait;
use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use std::marker::PhantomData;

use crate::error::{CatalogError, CatalogResult};
use crate::services::slug::{slug, truncate};

pub const MAX_SLUG_ATTEMPTS: u32 = 1000;
pub const MAX_SKU_ATTEMPTS: u32 = 50;
pub const SKU_LEN: usize = 8;

/// Existence lookups over one unique column.
#[async_trait]
pub trait IdentifierIndex: Send + Sync {
    /// True if a record other than `exclude_id` already holds `value`.
    async fn is_taken(&self, value: &str, exclude_id: Option<i32>) -> Result<bool, DbErr>;
}

/// `IdentifierIndex` over a column of a sea-orm entity.
pub struct ColumnIndex<'a, C, E: EntityTrait> {
    db: &'a C,
    column: E::Column,
    pk: E::Column,
    entity: PhantomData<E>,
}

impl<'a, C, E> ColumnIndex<'a, C, E>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    pub fn new(db: &'a C, column: E::Column, pk: E::Column) -> Self {
        ColumnIndex {
            db,
            column,
            pk,
            entity: PhantomData,
        }
    }
}

#[async_trait]
impl<C, E> IdentifierIndex for ColumnIndex<'_, C, E>
where
    C: ConnectionTrait + Sync,
    E: EntityTrait,
{
    async fn is_taken(&self, value: &str, exclude_id: Option<i32>) -> Result<bool, DbErr> {
        let mut query = E::find().filter(self.column.eq(value));
        if let Some(id) = exclude_id {
            query = query.filter(self.pk.ne(id));
        }
        Ok(query.one(self.db).await?.is_some())
    }
}

/// Slug for `text` that no other record in `index` holds yet: the plain slug,
/// then `-2`, `-3`, ... The result never exceeds `max_len`.
pub async fn resolve_unique_slug<I>(
    index: &I,
    text: &str,
    max_len: usize,
    exclude_id: Option<i32>,
) -> CatalogResult<String>
where
    I: IdentifierIndex + ?Sized,
{
    let base = slug(text, max_len);
    let mut candidate = base.clone();

    for counter in 2..=MAX_SLUG_ATTEMPTS + 1 {
        if !index.is_taken(&candidate, exclude_id).await? {
            return Ok(candidate);
        }
        let suffix = format!("-{counter}");
        let room = max_len.saturating_sub(suffix.len());
        candidate = format!("{}{}", truncate(&base, room), suffix);
    }

    Err(CatalogError::NamespaceExhausted {
        field: "slug",
        attempts: MAX_SLUG_ATTEMPTS,
    })
}

/// Random 8-digit SKU not yet present in `index`.
///
/// `rng` only needs to spread values evenly; it is not a security boundary.
pub async fn generate_unique_sku<I, R>(index: &I, rng: &mut R) -> CatalogResult<String>
where
    I: IdentifierIndex + ?Sized,
    R: Rng + Send,
{
    for attempt in 1..=MAX_SKU_ATTEMPTS {
        let candidate = random_sku(rng);
        if !index.is_taken(&candidate, None).await? {
            return Ok(candidate);
        }
        tracing::debug!(attempt, sku = %candidate, "SKU collision, retrying");
    }

    Err(CatalogError::NamespaceExhausted {
        field: "sku",
        attempts: MAX_SKU_ATTEMPTS,
    })
}

pub fn random_sku<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:0width$}", rng.gen_range(0..100_000_000u32), width = SKU_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// value -> owning record id
    #[derive(Default)]
    struct MemoryIndex {
        values: Mutex<HashMap<String, i32>>,
    }

    impl MemoryIndex {
        fn with(values: &[(&str, i32)]) -> Self {
            MemoryIndex {
                values: Mutex::new(values.iter().map(|(v, id)| (v.to_string(), *id)).collect()),
            }
        }

        fn insert(&self, value: &str, id: i32) {
            self.values.lock().unwrap().insert(value.to_string(), id);
        }
    }

    #[async_trait]
    impl IdentifierIndex for MemoryIndex {
        async fn is_taken(&self, value: &str, exclude_id: Option<i32>) -> Result<bool, DbErr> {
            Ok(match self.values.lock().unwrap().get(value) {
                Some(owner) => Some(*owner) != exclude_id,
                None => false,
            })
        }
    }

    /// Claims every value.
    struct FullIndex;

    #[async_trait]
    impl IdentifierIndex for FullIndex {
        async fn is_taken(&self, _value: &str, _exclude_id: Option<i32>) -> Result<bool, DbErr> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn free_slug_is_used_as_is() {
        let index = MemoryIndex::default();
        assert_eq!(resolve_unique_slug(&index, "Foo", 50, None).await.unwrap(), "foo");
    }

    #[tokio::test]
    async fn collisions_get_numeric_suffixes() {
        let index = MemoryIndex::with(&[("foo", 1)]);
        assert_eq!(resolve_unique_slug(&index, "foo", 50, None).await.unwrap(), "foo-2");

        index.insert("foo-2", 2);
        assert_eq!(resolve_unique_slug(&index, "foo", 50, None).await.unwrap(), "foo-3");
    }

    #[tokio::test]
    async fn record_does_not_collide_with_itself() {
        let index = MemoryIndex::with(&[("gamma", 7)]);
        assert_eq!(resolve_unique_slug(&index, "gamma", 50, Some(7)).await.unwrap(), "gamma");
        assert_eq!(resolve_unique_slug(&index, "gamma", 50, Some(8)).await.unwrap(), "gamma-2");
    }

    #[tokio::test]
    async fn suffix_fits_within_max_len() {
        let index = MemoryIndex::with(&[("abcdef", 1)]);
        let resolved = resolve_unique_slug(&index, "abcdef", 6, None).await.unwrap();
        assert_eq!(resolved, "abcd-2");
    }

    #[tokio::test]
    async fn slug_resolution_is_bounded() {
        let err = resolve_unique_slug(&FullIndex, "foo", 50, None).await.unwrap_err();
        assert!(matches!(err, CatalogError::NamespaceExhausted { field: "slug", .. }));
    }

    #[tokio::test]
    async fn sku_is_eight_digits() {
        let mut rng = StdRng::seed_from_u64(1);
        let sku = generate_unique_sku(&MemoryIndex::default(), &mut rng).await.unwrap();
        assert_eq!(sku.len(), SKU_LEN);
        assert!(sku.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn sku_skips_taken_values() {
        let mut probe = StdRng::seed_from_u64(42);
        let first = random_sku(&mut probe);

        let index = MemoryIndex::with(&[(first.as_str(), 1)]);
        let mut rng = StdRng::seed_from_u64(42);
        let sku = generate_unique_sku(&index, &mut rng).await.unwrap();
        assert_ne!(sku, first);
    }

    #[tokio::test]
    async fn ten_thousand_skus_are_unique() {
        let index = MemoryIndex::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for id in 0..10_000 {
            let sku = generate_unique_sku(&index, &mut rng).await.unwrap();
            index.insert(&sku, id);
            assert!(seen.insert(sku));
        }
    }

    #[tokio::test]
    async fn sku_generation_fails_fast_when_exhausted() {
        let mut rng = StdRng::seed_from_u64(3);
        let err = generate_unique_sku(&FullIndex, &mut rng).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NamespaceExhausted { field: "sku", attempts: MAX_SKU_ATTEMPTS }
        ));
    }
}
