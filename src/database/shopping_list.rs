use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::schema::ShoppingListRow;
use crate::constants::SHOPPING_LIST_HEADER;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Ingredient totals across every recipe in a cart, one entry per (name, unit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn from_rows(rows: Vec<ShoppingListRow>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for row in rows {
            *totals.entry((row.name, row.measurement_unit)).or_default() += i64::from(row.amount);
        }

        Self {
            items: totals
                .into_iter()
                .map(|((name, measurement_unit), total)| ShoppingListItem {
                    name,
                    measurement_unit,
                    total,
                })
                .collect(),
        }
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    pub fn render(&self) -> String {
        let mut text = format!("{SHOPPING_LIST_HEADER}\n");
        for (n, item) in self.items.iter().enumerate() {
            // Writing into a String cannot fail.
            let _ = writeln!(
                text,
                "{}. {} ({}) - {}",
                n + 1,
                item.name,
                item.measurement_unit,
                item.total
            );
        }
        text
    }
}
