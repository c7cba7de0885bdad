use crate::{
    error::{Error, ValidationKind},
    permissions::ActionType,
    schema::{Tag, TagForm, Uuid},
    session::Viewer,
    store::RecipeStore,
};

fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn is_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

pub fn validate_tag_form(form: &TagForm) -> Result<(), ValidationKind> {
    if form.name.trim().is_empty() {
        return Err(ValidationKind::EmptyName);
    }
    if !is_hex_color(&form.color) {
        return Err(ValidationKind::InvalidColor);
    }
    if !is_slug(&form.slug) {
        return Err(ValidationKind::InvalidSlug);
    }

    Ok(())
}

pub async fn create_tag<S: RecipeStore>(
    viewer: &Viewer,
    form: TagForm,
    store: &S,
) -> Result<Tag, Error> {
    viewer.authorize(ActionType::ManageCatalog)?;
    validate_tag_form(&form)?;

    let tag = store
        .create_tag(form)
        .await?
        .ok_or_else(|| Error::already_exists("A tag with this name or slug already exists"))?;

    log::debug!("Created tag {} ({})", tag.slug, tag.id);
    Ok(tag)
}

pub async fn get_tag<S: RecipeStore>(id: Uuid, store: &S) -> Result<Tag, Error> {
    store
        .get_tags(&[id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found("No tag exists with specified id"))
}

pub async fn list_tags<S: RecipeStore>(store: &S) -> Result<Vec<Tag>, Error> {
    store.list_tags().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(color: &str, slug: &str) -> TagForm {
        TagForm {
            name: String::from("Breakfast"),
            color: color.to_string(),
            slug: slug.to_string(),
        }
    }

    #[test]
    fn validates_color_and_slug() {
        assert_eq!(validate_tag_form(&form("#E26C2D", "breakfast")), Ok(()));
        assert_eq!(validate_tag_form(&form("#e26c2d", "late_night-2")), Ok(()));

        assert_eq!(
            validate_tag_form(&form("E26C2D", "breakfast")),
            Err(ValidationKind::InvalidColor)
        );
        assert_eq!(
            validate_tag_form(&form("#E26C2", "breakfast")),
            Err(ValidationKind::InvalidColor)
        );
        assert_eq!(
            validate_tag_form(&form("#E26C2D", "Breakfast")),
            Err(ValidationKind::InvalidSlug)
        );
        assert_eq!(
            validate_tag_form(&form("#E26C2D", "")),
            Err(ValidationKind::InvalidSlug)
        );
    }
}
