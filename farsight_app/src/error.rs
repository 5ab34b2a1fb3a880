#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("store error: {0}")]
    Store(#[from] farsight_store::StoreError),

    #[error("esi error: {0}")]
    Esi(#[from] farsight_esi::EsiError),
}
