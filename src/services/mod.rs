pub mod catalog_service;
pub mod checkout_service;
pub mod promo_service;
pub mod reconcile_service;
pub mod room_service;

pub use catalog_service::*;
pub use checkout_service::*;
pub use promo_service::*;
pub use reconcile_service::*;
pub use room_service::*;
