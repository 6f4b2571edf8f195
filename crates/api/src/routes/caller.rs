//! Caller identity taken from request headers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::BuyerId;

/// Header granting administrative access when set to `true`.
pub const PRIVILEGED_HEADER: &str = "x-shop-privileged";

/// Header naming the buyer on whose behalf the request is made.
pub const BUYER_HEADER: &str = "x-shop-buyer";

/// Who is calling, as far as the headers say.
///
/// Authentication happens upstream; these headers are trusted as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    pub privileged: bool,
    pub buyer: Option<BuyerId>,
}

impl Caller {
    fn from_headers(headers: &HeaderMap) -> Self {
        let privileged = headers
            .get(PRIVILEGED_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let buyer = headers
            .get(BUYER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(BuyerId::new);
        Self { privileged, buyer }
    }

    /// Admins may act for anyone; buyers only for themselves.
    pub fn may_act_for(&self, buyer: BuyerId) -> bool {
        self.privileged || self.buyer == Some(buyer)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
