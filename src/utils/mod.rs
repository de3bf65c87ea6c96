pub mod installments;
pub mod jwt;
pub mod validation;

pub use installments::{InstallmentBreakdown, InstallmentError, calculate, to_minor_units};
pub use jwt::*;
pub use validation::*;

/// Generates a fresh client order number.
pub fn generate_order_number() -> String {
    uuid::Uuid::new_v4().to_string()
}
