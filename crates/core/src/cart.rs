//! The visitor's cart.
//!
//! A [`Cart`] is an ordered list of product snapshots with quantities. Rows are
//! unique by product id: adding a product that is already present bumps its
//! quantity instead of appending a second row. Totals are always recomputed
//! from the rows and never stored.

use serde::{Deserialize, Serialize};

use crate::{Price, ProductId, Quantity};

/// The parts of a product the cart needs to render a line without refetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_url: Option<String>,
}

/// One row of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: ProductSnapshot,
    pub quantity: Quantity,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Ordered, product-unique list of cart rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add `quantity` units of `product`.
    ///
    /// If the product is already in the cart its quantity is increased
    /// (capped at [`Quantity::MAX`]) and its snapshot refreshed, so a price
    /// change since the first add is picked up.
    pub fn add(&mut self, product: ProductSnapshot, quantity: Quantity) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            item.quantity = item.quantity.saturating_add(quantity);
            item.product = product;
        } else {
            self.items.push(CartItem { product, quantity });
        }
    }

    /// Set the quantity of an existing row. A quantity of zero removes it and
    /// anything above [`Quantity::MAX`] is clamped.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn update(&mut self, id: &ProductId, quantity: u32) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        match Quantity::new(quantity) {
            Ok(quantity) => {
                if let Some(item) = self.items.get_mut(position) {
                    item.quantity = quantity;
                }
            }
            Err(_) if quantity == 0 => {
                self.items.remove(position);
            }
            Err(_) => {
                if let Some(item) = self.items.get_mut(position) {
                    item.quantity = Quantity::LARGEST;
                }
            }
        }
        true
    }

    /// Remove a row. Returns `false` if the product was not in the cart.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product.id != id);
        self.items.len() != before
    }

    /// Drop every row.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Rows in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up the row for a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product.id == id)
    }

    /// Whether the cart has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all rows.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity.get()).sum()
    }

    /// Sum of every line total.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.product.id == id)
    }
}
