//! Validation of new catalog entries.

use common::Money;
use ledger_store::NewProduct;

use crate::error::ValidationError;

/// Minimum number of characters in a product name.
pub const MIN_NAME_LEN: usize = 3;

/// Minimum number of characters in a product description.
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Unvalidated product fields as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    pub stock: i64,
}

impl ProductDraft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit_price: Money,
        stock: i64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit_price,
            stock,
        }
    }

    /// Checks the catalog rules and converts into an insertable product.
    ///
    /// Lengths are counted in characters, not bytes.
    pub fn validate(self) -> Result<NewProduct, ValidationError> {
        if !self.unit_price.is_positive() {
            return Err(ValidationError::NonPositivePrice {
                cents: self.unit_price.cents(),
            });
        }
        if self.stock < 0 {
            return Err(ValidationError::NegativeStock { stock: self.stock });
        }
        let stock = u32::try_from(self.stock)
            .map_err(|_| ValidationError::StockTooLarge { stock: self.stock })?;

        let name_len = self.name.chars().count();
        if name_len < MIN_NAME_LEN {
            return Err(ValidationError::NameTooShort {
                min: MIN_NAME_LEN,
                actual: name_len,
            });
        }
        let description_len = self.description.chars().count();
        if description_len < MIN_DESCRIPTION_LEN {
            return Err(ValidationError::DescriptionTooShort {
                min: MIN_DESCRIPTION_LEN,
                actual: description_len,
            });
        }

        Ok(NewProduct::new(
            self.name,
            self.description,
            self.unit_price,
            stock,
        ))
    }
}
