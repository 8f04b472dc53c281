use serde::{Deserialize, Serialize};

/// Kind of drink on a room's menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrinkType {
    #[default]
    Cocktail,
    Beer,
    Soda,
    Spirit,
    Wine,
}

/// A drink on a room's menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drink {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Storage path of the uploaded image (`bucket/path`).
    #[serde(default)]
    pub image_path: Option<String>,
    /// Public URL, filled in by [`MediaResolver`](crate::model::MediaResolver).
    #[serde(default)]
    pub image_url: Option<String>,
    pub room_id: String,
    #[serde(rename = "type", default)]
    pub kind: DrinkType,
}

impl Drink {
    /// Creates a menu entry with no description, ingredients or image.
    pub fn new(id: impl Into<String>, name: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            ingredients: Vec::new(),
            image_path: None,
            image_url: None,
            room_id: room_id.into(),
            kind: DrinkType::default(),
        }
    }
}
