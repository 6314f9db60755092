use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One purchased item as read off a receipt line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRecord {
    #[serde(rename = "Item")]
    pub item_name: String,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
    /// Line total, keeping the scale printed on the receipt (`3.50` stays `3.50`).
    #[serde(rename = "Total")]
    pub total: Decimal,
}

impl LineItemRecord {
    pub fn new(item_name: impl Into<String>, quantity: u32, total: Decimal) -> Self {
        Self { item_name: item_name.into(), quantity, total }
    }
}

impl fmt::Display for LineItemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{} = {}", self.item_name, self.quantity, self.total)
    }
}
