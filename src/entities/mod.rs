pub mod payment_plans;
pub mod payment_records;
pub mod plan_subscriptions;
pub mod promo_codes;
pub mod promo_reservations;
pub mod room_types;

pub use payment_plans as payment_plan_entity;
pub use payment_records as payment_record_entity;
pub use plan_subscriptions as plan_subscription_entity;
pub use promo_codes as promo_code_entity;
pub use promo_reservations as promo_reservation_entity;
pub use room_types as room_type_entity;

pub use promo_reservations::ReservationState;
