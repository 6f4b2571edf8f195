//! Payment reference generation.
//!
//! The coordinator hands the purchase details to a [`PaymentLinkProvider`]
//! and returns whatever it produces without inspecting it.

use common::Money;

/// What a payment link is generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRequest<'a> {
    pub product_name: &'a str,
    pub quantity: u32,
    pub total: Money,
}

/// Formats a payment reference for a confirmed purchase.
pub trait PaymentLinkProvider: Send + Sync {
    fn payment_link(&self, request: &PaymentRequest<'_>) -> String;
}

/// Builds `paypal.me` links carrying the amount and a note naming the
/// product and quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayPalMeLink {
    user: String,
}

impl PayPalMeLink {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

impl PaymentLinkProvider for PayPalMeLink {
    fn payment_link(&self, request: &PaymentRequest<'_>) -> String {
        let note = format!("{} x{}", request.product_name, request.quantity).replace(' ', "+");
        format!(
            "https://www.paypal.com/paypalme/{}/{}?locale.x=fr_FR&note={}",
            self.user,
            request.total.to_decimal_string(),
            note
        )
    }
}
