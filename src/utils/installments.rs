//! Installment amount computation.
//!
//! All arithmetic is done in whole currency units with `Decimal`; conversion to
//! integer minor units happens once, via [`to_minor_units`], when a payment is
//! submitted to the gateway.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstallmentError {
    #[error("installment count must be at least 1")]
    ZeroInstallments,
    #[error("room price must not be negative")]
    NegativePrice,
    #[error("discount must be in [0, 1), got {0}")]
    DiscountOutOfRange(Decimal),
    #[error("payment number {number} is outside 1..={installments}")]
    PaymentNumberOutOfRange { number: u32, installments: u32 },
    #[error("amount {0} does not fit in minor units")]
    Overflow(Decimal),
}

/// Per-payment amounts for a room paid in `installments` parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentBreakdown {
    pub installments: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub promo_discount_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub per_installment_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub first_payment: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_charged: Decimal,
}

/// Splits `room_price` into `installments` payments with `discount` applied once
/// and amortized evenly across them.
pub fn calculate(
    room_price: Decimal,
    installments: u32,
    discount: Decimal,
) -> Result<InstallmentBreakdown, InstallmentError> {
    if installments == 0 {
        return Err(InstallmentError::ZeroInstallments);
    }
    if room_price.is_sign_negative() && !room_price.is_zero() {
        return Err(InstallmentError::NegativePrice);
    }
    if discount < Decimal::ZERO || discount >= Decimal::ONE {
        return Err(InstallmentError::DiscountOutOfRange(discount));
    }

    let n = Decimal::from(installments);
    let base_amount = room_price / n;
    let promo_discount_total = room_price * discount;
    let per_installment_discount = promo_discount_total / n;
    let regular = base_amount - per_installment_discount;

    // A discount larger than one installment's share clamps to zero, never negative.
    let first_payment = regular.max(Decimal::ZERO);
    let remaining_total = if installments > 1 {
        regular * (n - Decimal::ONE)
    } else {
        Decimal::ZERO
    };

    Ok(InstallmentBreakdown {
        installments,
        base_amount,
        promo_discount_total,
        per_installment_discount,
        first_payment,
        remaining_total,
        total_charged: first_payment + remaining_total,
    })
}

impl InstallmentBreakdown {
    /// Amount due for each installment after the first.
    pub fn regular_payment(&self) -> Decimal {
        (self.base_amount - self.per_installment_discount).max(Decimal::ZERO)
    }

    /// Amount due for the 1-based `payment_number`.
    pub fn installment_amount(&self, payment_number: u32) -> Result<Decimal, InstallmentError> {
        match payment_number {
            1 => Ok(self.first_payment),
            n @ 2.. if n <= self.installments => Ok(self.regular_payment()),
            number => Err(InstallmentError::PaymentNumberOutOfRange {
                number,
                installments: self.installments,
            }),
        }
    }
}

/// Converts whole currency units to integer minor units (x100, half-up).
pub fn to_minor_units(amount: Decimal) -> Result<i64, InstallmentError> {
    (amount * dec!(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(InstallmentError::Overflow(amount))
}
