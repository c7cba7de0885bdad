use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warp::http::{header, Response};

use crate::{
    constants::{SHOPPING_LIST_FILENAME, SHOPPING_LIST_HEADER},
    error::Error,
    permissions::ActionType,
    schema::{RecipeIngredient, ShoppingListItem},
    session::Viewer,
    store::RecipeStore,
};

/// Groups composition lines by ingredient name and unit and sums the
/// amounts. Output is sorted by name, then unit.
pub fn sum_by_ingredient<I>(lines: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = RecipeIngredient>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals
            .entry((line.name, line.measurement_unit))
            .or_default() += i64::from(line.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn new(items: Vec<ShoppingListItem>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Header line followed by one `<name>, <unit>: <amount>` line per item.
    pub fn render(&self) -> String {
        let mut text = String::from(SHOPPING_LIST_HEADER);
        for item in &self.items {
            text.push('\n');
            text.push_str(&format!(
                "{}, {}: {}",
                item.name, item.measurement_unit, item.amount
            ));
        }
        text
    }

    /// The rendered list as a downloadable text file.
    pub fn into_attachment(self) -> Result<Response<String>, Error> {
        Response::builder()
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
            )
            .body(self.render())
            .map_err(Error::from)
    }
}

/// The viewer's cart, aggregated across every recipe in it.
pub async fn fetch_shopping_list<S: RecipeStore>(
    viewer: &Viewer,
    store: &S,
) -> Result<ShoppingList, Error> {
    let session = viewer.authorize(ActionType::ManageOwnInterests)?;
    let items = store.shopping_list_totals(session.user_id).await?;

    log::trace!(
        "Shopping list for user {} has {} items",
        session.user_id,
        items.len()
    );
    Ok(ShoppingList::new(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, name: &str, unit: &str, amount: i32) -> RecipeIngredient {
        RecipeIngredient {
            id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn item(name: &str, unit: &str, amount: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_matching_name_and_unit() {
        let items = sum_by_ingredient(vec![
            line(1, "Flour", "g", 200),
            line(5, "Flour", "g", 300),
            line(2, "Sugar", "g", 50),
        ]);

        assert_eq!(items, vec![item("Flour", "g", 500), item("Sugar", "g", 50)]);
    }

    #[test]
    fn different_units_stay_apart() {
        let items = sum_by_ingredient(vec![
            line(3, "Milk", "ml", 200),
            line(4, "Milk", "cup", 1),
            line(3, "Milk", "ml", 100),
        ]);

        assert_eq!(items, vec![item("Milk", "cup", 1), item("Milk", "ml", 300)]);
    }

    #[test]
    fn renders_header_then_lines() {
        let list = ShoppingList::new(vec![item("Flour", "g", 500), item("Sugar", "g", 50)]);
        assert_eq!(list.render(), "Shopping List\nFlour, g: 500\nSugar, g: 50");

        assert_eq!(ShoppingList::default().render(), "Shopping List");
    }

    #[test]
    fn attachment_headers() {
        let response = ShoppingList::new(vec![item("Eggs", "pcs", 3)])
            .into_attachment()
            .unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=shopping_cart.txt"
        );
        assert_eq!(response.body(), "Shopping List\nEggs, pcs: 3");
    }
}
