mod common;

use std::io::Write;

use common::*;
use foodgram_sdk::{actions, Error, TagForm, ValidationKind, Viewer};

#[tokio::test]
async fn ingredient_search_ignores_case() {
    let fx = Fixture::new().await;

    let found = actions::list_ingredients("FL", &fx.store).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Flour");

    let names: Vec<String> = actions::list_ingredients("", &fx.store)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, vec!["Eggs", "Flour", "Milk", "Sugar"]);

    assert!(actions::list_ingredients("saffron", &fx.store)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn ingredient_lookup() {
    let fx = Fixture::new().await;

    let milk = actions::get_ingredient(MILK, &fx.store).await.unwrap();
    assert_eq!(milk.measurement_unit, "ml");

    assert!(matches!(
        actions::get_ingredient(77, &fx.store).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn admins_import_fixture_files() {
    let fx = Fixture::new().await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"name": "Oats", "measurement_unit": "g"}}, {{"name": "Honey", "measurement_unit": "tbsp"}}]"#
    )
    .unwrap();

    let inserted = actions::import_ingredients(&viewer(&fx.admin), file.path(), &fx.store)
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let honey = actions::list_ingredients("honey", &fx.store).await.unwrap();
    assert_eq!(honey[0].measurement_unit, "tbsp");

    assert!(matches!(
        actions::import_ingredients(&viewer(&fx.author), file.path(), &fx.store).await,
        Err(Error::Forbidden)
    ));
}

#[tokio::test]
async fn bundled_fixture_loads() {
    let fx = Fixture::new().await;
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/ingredients.json");

    let inserted = actions::import_ingredients(&viewer(&fx.admin), path, &fx.store)
        .await
        .unwrap();
    assert_eq!(inserted, 6);
}

#[tokio::test]
async fn malformed_fixtures_are_type_errors() {
    let fx = Fixture::new().await;

    assert!(matches!(
        actions::import_ingredients_from_str(&viewer(&fx.admin), r#"{"name": "Oats"}"#, &fx.store)
            .await,
        Err(Error::Type(_))
    ));
    assert!(matches!(
        actions::import_ingredients(&viewer(&fx.admin), "/nonexistent/fixture.json", &fx.store)
            .await,
        Err(Error::Type(_))
    ));
}

#[tokio::test]
async fn tags_are_admin_managed() {
    let fx = Fixture::new().await;

    let lunch = actions::create_tag(&viewer(&fx.admin), tag("Lunch", "lunch"), &fx.store)
        .await
        .unwrap();
    assert_eq!(actions::get_tag(lunch.id, &fx.store).await.unwrap(), lunch);
    assert_eq!(actions::list_tags(&fx.store).await.unwrap().len(), 3);

    assert!(matches!(
        actions::create_tag(&viewer(&fx.admin), tag("Brunch", "lunch"), &fx.store).await,
        Err(Error::AlreadyExists(_))
    ));
    assert!(matches!(
        actions::create_tag(&viewer(&fx.author), tag("Snack", "snack"), &fx.store).await,
        Err(Error::Forbidden)
    ));
    assert!(matches!(
        actions::create_tag(&Viewer::Anonymous, tag("Snack", "snack"), &fx.store).await,
        Err(Error::Unauthorized)
    ));

    let bad_color = TagForm {
        color: String::from("green"),
        ..tag("Snack", "snack")
    };
    assert!(matches!(
        actions::create_tag(&viewer(&fx.admin), bad_color, &fx.store).await,
        Err(Error::Validation(ValidationKind::InvalidColor))
    ));

    assert!(matches!(
        actions::get_tag(99, &fx.store).await,
        Err(Error::NotFound(_))
    ));
}
