pub mod payment;
pub mod plans;
pub mod promo;
pub mod register;
pub mod rooms;

pub use payment::payment_config;
pub use plans::plans_config;
pub use promo::promo_config;
pub use register::register_config;
pub use rooms::rooms_config;
