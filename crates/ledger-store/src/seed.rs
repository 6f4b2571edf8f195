//! Starter catalog inserted on first initialisation.

use crate::{Money, NewProduct};

/// The five products every fresh shop starts with, in id order.
pub fn starter_products() -> Vec<NewProduct> {
    vec![
        NewProduct::new(
            "T-shirt Bessans",
            "T-shirt en coton avec le logo de Bessans",
            Money::from_euros(25),
            50,
        ),
        NewProduct::new(
            "Casquette Montagne",
            "Casquette de randonnée avec protection UV",
            Money::from_euros(15),
            30,
        ),
        NewProduct::new(
            "Mug Bessans",
            "Mug en céramique avec vue sur les montagnes",
            Money::from_euros(12),
            25,
        ),
        NewProduct::new(
            "Poster Panoramique",
            "Poster A3 des plus belles vues de Bessans",
            Money::from_euros(8),
            40,
        ),
        NewProduct::new(
            "Stickers Pack",
            "Pack de 5 stickers Bessans pour voiture",
            Money::from_euros(5),
            100,
        ),
    ]
}
