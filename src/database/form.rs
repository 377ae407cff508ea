use std::{collections::BTreeSet, str::FromStr};

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use super::{
    error::TypeError,
    schema::{AssociationKind, Recipe, RecipeFilter, Uuid, UserChanges},
};
use crate::constants::{
    MAX_LINK_LENGTH, MAX_NAME_LENGTH, MAX_PRICE, MAX_TITLE_LENGTH, MIN_PASSWORD_LENGTH,
};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

/// `{"name": "..."}` as found inside a recipe's `tags` or `ingredients` list.
#[derive(Debug, Clone, Deserialize)]
pub struct NameDescriptor {
    pub name: String,
}

/// Body of a recipe create, full update or partial update, sent as JSON or as
/// an urlencoded form.
///
/// A missing `tags`/`ingredients` key leaves the associations alone, an empty
/// list clears them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeWrite {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub time_minutes: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub price: Option<f64>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<NameDescriptor>>,
    pub ingredients: Option<Vec<NameDescriptor>>,
}

/// Validated recipe write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub ingredients: Option<BTreeSet<String>>,
}

impl RecipeWrite {
    /// Checks the payload. With `partial == false` the scalar fields a recipe
    /// cannot exist without must be present.
    pub fn validate(self, partial: bool) -> Result<RecipeChanges, TypeError> {
        if !partial {
            if self.title.is_none() {
                return Err(TypeError::field("title", REQUIRED));
            }
            if self.time_minutes.is_none() {
                return Err(TypeError::field("time_minutes", REQUIRED));
            }
            if self.price.is_none() {
                return Err(TypeError::field("price", REQUIRED));
            }
        }

        let title = self
            .title
            .map(|title| clean_text("title", &title, MAX_TITLE_LENGTH, false))
            .transpose()?;
        let description = self.description.map(|d| d.trim().to_string());
        let link = self
            .link
            .map(|link| clean_text("link", &link, MAX_LINK_LENGTH, true))
            .transpose()?;

        if let Some(time_minutes) = self.time_minutes {
            if time_minutes < 0 {
                return Err(TypeError::field(
                    "time_minutes",
                    "Ensure this value is greater than or equal to 0.",
                ));
            }
        }

        let price = self.price.map(validate_price).transpose()?;

        let tags = self
            .tags
            .map(|tags| requested_names(AssociationKind::Tag, tags))
            .transpose()?;
        let ingredients = self
            .ingredients
            .map(|ingredients| requested_names(AssociationKind::Ingredient, ingredients))
            .transpose()?;

        Ok(RecipeChanges {
            title,
            time_minutes: self.time_minutes,
            price,
            description,
            link,
            tags,
            ingredients,
        })
    }
}

impl RecipeChanges {
    /// Copies the present scalar fields onto `recipe`.
    pub fn apply(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.to_owned();
        }
        if let Some(time_minutes) = self.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = self.price {
            recipe.price = price;
        }
        if let Some(description) = &self.description {
            recipe.description = description.to_owned();
        }
        if let Some(link) = &self.link {
            recipe.link = link.to_owned();
        }
    }

    pub fn requested(&self, kind: AssociationKind) -> Option<&BTreeSet<String>> {
        match kind {
            AssociationKind::Tag => self.tags.as_ref(),
            AssociationKind::Ingredient => self.ingredients.as_ref(),
        }
    }
}

/// Body of a tag/ingredient create or update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameWrite {
    pub name: Option<String>,
}

impl NameWrite {
    pub fn validate(self, partial: bool) -> Result<Option<String>, TypeError> {
        match self.name {
            Some(name) => Ok(Some(clean_text("name", &name, MAX_NAME_LENGTH, false)?)),
            None if partial => Ok(None),
            None => Err(TypeError::field("name", REQUIRED)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

impl UserCreate {
    pub fn validate(self) -> Result<UserCreate, TypeError> {
        Ok(UserCreate {
            email: normalize_email(&self.email)?,
            password: validate_password(self.password)?,
            name: clean_text("name", &self.name, MAX_NAME_LENGTH, true)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body of `PATCH`/`PUT /api/user/me/`. `password` is still plain text here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl UserUpdate {
    pub fn validate(self, partial: bool) -> Result<UserChanges, TypeError> {
        if !partial {
            if self.email.is_none() {
                return Err(TypeError::field("email", REQUIRED));
            }
            if self.password.is_none() {
                return Err(TypeError::field("password", REQUIRED));
            }
            if self.name.is_none() {
                return Err(TypeError::field("name", REQUIRED));
            }
        }

        Ok(UserChanges {
            email: self.email.map(|e| normalize_email(&e)).transpose()?,
            name: self
                .name
                .map(|n| clean_text("name", &n, MAX_NAME_LENGTH, true))
                .transpose()?,
            password: self.password.map(validate_password).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

impl RecipeQuery {
    pub fn into_filter(self) -> Result<RecipeFilter, TypeError> {
        Ok(RecipeFilter {
            tags: parse_id_list("tags", self.tags.as_deref())?,
            ingredients: parse_id_list("ingredients", self.ingredients.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedQuery {
    pub assigned_only: Option<u8>,
}

impl NamedQuery {
    pub fn assigned_only(&self) -> bool {
        self.assigned_only.unwrap_or(0) != 0
    }
}

/// Collects the requested names of one association kind into a set.
/// Duplicates collapse; an empty list yields an empty set.
pub fn requested_names(
    kind: AssociationKind,
    descriptors: Vec<NameDescriptor>,
) -> Result<BTreeSet<String>, TypeError> {
    let field = kind.table();

    descriptors
        .into_iter()
        .map(|descriptor| clean_text(field, &descriptor.name, MAX_NAME_LENGTH, false))
        .collect()
}

/// Lower-cases the domain part, as the account store compares emails verbatim.
pub fn normalize_email(email: &str) -> Result<String, TypeError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(TypeError::field("email", BLANK));
    }

    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            if email.chars().count() > MAX_NAME_LENGTH {
                return Err(TypeError::field(
                    "email",
                    "Ensure this field has no more than 255 characters.",
                ));
            }
            Ok(format!("{local}@{}", domain.to_lowercase()))
        }
        _ => Err(TypeError::field("email", "Enter a valid email address.")),
    }
}

fn validate_password(password: String) -> Result<String, TypeError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(TypeError::field(
            "password",
            &format!("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."),
        ));
    }

    Ok(password)
}

fn validate_price(price: f64) -> Result<f64, TypeError> {
    if !price.is_finite() || price < 0. {
        return Err(TypeError::field("price", "A valid number is required."));
    }
    if price >= MAX_PRICE {
        return Err(TypeError::field(
            "price",
            "Ensure that there are no more than 3 digits before the decimal point.",
        ));
    }

    let cents = price * 100.;
    if (cents - cents.round()).abs() > 1e-6 {
        return Err(TypeError::field(
            "price",
            "Ensure that there are no more than 2 decimal places.",
        ));
    }

    Ok(cents.round() / 100.)
}

fn clean_text(
    field: &str,
    value: &str,
    max_length: usize,
    allow_blank: bool,
) -> Result<String, TypeError> {
    let value = value.trim();

    if value.is_empty() && !allow_blank {
        return Err(TypeError::field(field, BLANK));
    }
    if value.chars().count() > max_length {
        return Err(TypeError::field(
            field,
            &format!("Ensure this field has no more than {max_length} characters."),
        ));
    }

    Ok(value.to_string())
}

/// `None` when the parameter is missing or lists no ids, so `?tags=` filters
/// nothing.
fn parse_id_list(field: &str, value: Option<&str>) -> Result<Option<Vec<Uuid>>, TypeError> {
    let ids = value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<Uuid>()
                .map_err(|_| TypeError::field(field, "Expected a comma separated list of ids."))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((!ids.is_empty()).then_some(ids))
}

/// Accepts a JSON number or a numeric string. Form bodies carry every value as
/// a string.
fn deserialize_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;

    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(de::Error::custom("A valid number is required.")),
    };

    text.parse::<T>()
        .map(Some)
        .map_err(|_| de::Error::custom("A valid number is required."))
}
