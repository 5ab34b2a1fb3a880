use farsight_store::StoreError;

use crate::EsiResult;

/// The cache-then-fetch-then-store contract every reference entity resolves
/// through: a cached row is returned as-is; a miss fetches over the network,
/// writes the normalized entity back, then returns it. Duplicate rows abort
/// inside `lookup`. Resolving the same key twice therefore performs at most
/// one fetch per process lifetime and always yields the same entity.
pub(crate) async fn resolve_cached<T, L, F, W>(lookup: L, fetch: F, write_back: W) -> EsiResult<T>
where
    T: Clone,
    L: AsyncFnOnce() -> Result<Option<T>, StoreError>,
    F: AsyncFnOnce() -> EsiResult<T>,
    W: AsyncFnOnce(T) -> Result<(), StoreError>,
{
    if let Some(cached) = lookup().await? {
        return Ok(cached);
    }

    let fetched = fetch().await?;
    write_back(fetched.clone()).await?;
    Ok(fetched)
}
