//! The API layer, containing web handlers and routing.

pub mod handlers;
pub mod router;

pub use handlers::{ApiDoc, FARMER_ORDER_PATHS, PRODUCT_PATHS};
pub use router::{MAX_BODY_BYTES, cors_layer, create_router};
