mod error;
mod migrate;
mod store;
mod token;

pub use error::StoreError;
pub use migrate::CURRENT_VERSION;
pub use store::OverlayStore;
pub use token::TokenRecord;
