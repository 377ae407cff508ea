use serde::{Deserialize, Serialize, Serializer};

pub type Uuid = i32;

/// The two many-to-many relations a recipe holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    Tag,
    Ingredient,
}

impl AssociationKind {
    pub const ALL: [AssociationKind; 2] = [AssociationKind::Tag, AssociationKind::Ingredient];

    pub fn table(&self) -> &'static str {
        match self {
            AssociationKind::Tag => "tags",
            AssociationKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(&self) -> &'static str {
        match self {
            AssociationKind::Tag => "recipe_tags",
            AssociationKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(&self) -> &'static str {
        match self {
            AssociationKind::Tag => "tag_id",
            AssociationKind::Ingredient => "ingredient_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssociationKind::Tag => "Tag",
            AssociationKind::Ingredient => "Ingredient",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    /// Argon2 hash, never the plain password.
    pub password: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

impl UserChanges {
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.to_owned();
        }
        if let Some(name) = &self.name {
            user.name = name.to_owned();
        }
        if let Some(password) = &self.password {
            user.password = password.to_owned();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

/// A tag or an ingredient. Both are a user-owned name.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedEntity {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub name: String,
}

/// A named entity together with the recipe it is linked to.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedEntity {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

impl From<LinkedEntity> for NamedEntity {
    fn from(value: LinkedEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    #[serde(serialize_with = "serialize_price")]
    pub price: f64,
    pub description: String,
    pub link: String,
    pub image: Option<String>,
}

impl Recipe {
    /// Blank row for `owner`, filled in from a validated write before insertion.
    pub fn empty(owner: Uuid) -> Self {
        Self {
            id: 0,
            user_id: owner,
            title: String::new(),
            time_minutes: 0,
            price: 0.,
            description: String::new(),
            link: String::new(),
            image: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub tags: Vec<NamedEntity>,
    pub ingredients: Vec<NamedEntity>,
}

/// List representation of a recipe; omits description and image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    #[serde(serialize_with = "serialize_price")]
    pub price: f64,
    pub link: String,
    pub tags: Vec<NamedEntity>,
    pub ingredients: Vec<NamedEntity>,
}

impl From<RecipeDetail> for RecipeSummary {
    fn from(detail: RecipeDetail) -> Self {
        Self {
            id: detail.recipe.id,
            title: detail.recipe.title,
            time_minutes: detail.recipe.time_minutes,
            price: detail.recipe.price,
            link: detail.recipe.link,
            tags: detail.tags,
            ingredients: detail.ingredients,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeImage {
    pub id: Uuid,
    pub image: Option<String>,
}

impl From<Recipe> for RecipeImage {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            image: recipe.image,
        }
    }
}

/// Recipe list filter. Each present list matches recipes linked to any of its ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<Uuid>>,
}

impl RecipeFilter {
    pub fn ids(&self, kind: AssociationKind) -> Option<&[Uuid]> {
        match kind {
            AssociationKind::Tag => self.tags.as_deref(),
            AssociationKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

/// Prices go over the wire as fixed two-decimal strings.
fn serialize_price<S>(price: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{price:.2}"))
}
