use std::{collections::HashMap, str::FromStr};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    error::TypeError,
    schema::{IngredientAmount, RecipeFilter, RecipeForm, TagForm, Uuid},
};

pub type FormData = HashMap<String, Value>;

/// Loosely typed request body, converted into the typed forms actions take.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_json(body: &str) -> Result<Self, TypeError> {
        serde_json::from_str::<FormData>(body)
            .map(Self::from_data)
            .map_err(|_e| TypeError::new("Body must be a JSON object"))
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, TypeError>
    where
        T: DeserializeOwned,
    {
        match self.inner.get(key) {
            Some(value) => serde_json::from_value(value.to_owned())
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            None => Err(TypeError::new("Invalid key")),
        }
    }

    /// Accepts both JSON numbers and numeric strings, as HTML forms send the latter.
    pub fn get_number<T>(&self, key: &str) -> Result<T, TypeError>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(Value::Number(n)) => n
                .to_string()
                .parse()
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            Some(_) => Err(TypeError::new("Failed to parse value as number")),
            None => Err(TypeError::new("Invalid key")),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Failed to parse value as str")),
            },
            None => Err(TypeError::new("Invalid key")),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, TypeError> {
        match self.inner.get(key) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_i64() == Some(1)),
            Some(Value::String(s)) => Ok(matches!(s.as_str(), "1" | "true")),
            Some(_) => Err(TypeError::new("Failed to parse value as bool")),
            None => Ok(false),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

impl TryFrom<Form> for RecipeForm {
    type Error = TypeError;

    fn try_from(form: Form) -> Result<Self, Self::Error> {
        Ok(Self {
            name: form.get_str("name")?,
            image: form.get_str("image")?,
            text: form.get_str("text")?,
            cooking_time: form.get_number("cooking_time")?,
            tags: form.get_value::<Vec<Uuid>>("tags")?,
            ingredients: form.get_value::<Vec<IngredientAmount>>("ingredients")?,
        })
    }
}

impl TryFrom<Form> for TagForm {
    type Error = TypeError;

    fn try_from(form: Form) -> Result<Self, Self::Error> {
        Ok(Self {
            name: form.get_str("name")?,
            color: form.get_str("color")?,
            slug: form.get_str("slug")?,
        })
    }
}

impl TryFrom<Form> for RecipeFilter {
    type Error = TypeError;

    fn try_from(form: Form) -> Result<Self, Self::Error> {
        let author = if form.contains("author") {
            Some(form.get_number("author")?)
        } else {
            None
        };

        let tags = match form.inner.get("tags") {
            Some(Value::String(slug)) => vec![slug.to_owned()],
            Some(_) => form.get_value::<Vec<String>>("tags")?,
            None => vec![],
        };

        Ok(Self {
            author,
            tags,
            is_favorited: form.get_bool("is_favorited")?,
            is_in_shopping_cart: form.get_bool("is_in_shopping_cart")?,
        })
    }
}
