pub mod common;
pub mod payment;
pub mod plan;
pub mod promo;
pub mod room;

pub use common::*;
pub use payment::*;
pub use plan::*;
pub use promo::*;
pub use room::*;
