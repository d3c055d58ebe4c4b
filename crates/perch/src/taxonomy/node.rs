use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// The identifier of a taxonomy node.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyId(pub String);

impl TaxonomyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxonomyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaxonomyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyType {
    /// A post category.
    Post,

    /// A tag. Tags are flat.
    Tag,

    /// A link category.
    Link,
}

impl TaxonomyType {
    /// Returns whether nodes of this type may have a parent.
    pub fn is_hierarchical(&self) -> bool {
        match self {
            Self::Post | Self::Link => true,
            Self::Tag => false,
        }
    }
}

impl fmt::Display for TaxonomyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post => write!(f, "category"),
            Self::Tag => write!(f, "tag"),
            Self::Link => write!(f, "link category"),
        }
    }
}

#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyStatus {
    #[default]
    Published,

    Hidden,

    /// System-reserved. Always visible, never deleted or re-parented.
    Required,
}

/// Who a taxonomy lookup is performed for.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum Visibility {
    /// Hidden nodes and everything beneath them are left out.
    #[default]
    Public,

    /// Everything is visible.
    Admin,
}

impl Visibility {
    pub fn for_admin(is_admin: bool) -> Self {
        if is_admin {
            Self::Admin
        } else {
            Self::Public
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// A category or tag.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub id: TaxonomyId,
    #[serde(rename = "type")]
    pub taxonomy_type: TaxonomyType,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "parent_id")]
    pub parent: Option<TaxonomyId>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub status: TaxonomyStatus,
    #[serde(default)]
    pub count: u64,
}

impl TaxonomyNode {
    pub fn new(
        id: impl Into<String>,
        taxonomy_type: TaxonomyType,
        slug: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: TaxonomyId(id.into()),
            taxonomy_type,
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            parent: None,
            order: 0,
            status: TaxonomyStatus::Published,
            count: 0,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(TaxonomyId(parent.into()));
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_status(mut self, status: TaxonomyStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_hidden(&self) -> bool {
        self.status == TaxonomyStatus::Hidden
    }

    pub fn is_required(&self) -> bool {
        self.status == TaxonomyStatus::Required
    }

    /// Returns whether this node, taken on its own, is visible.
    pub fn is_visible_to(&self, visibility: Visibility) -> bool {
        visibility.is_admin() || !self.is_hidden()
    }
}

/// Stores export the root sentinel as `null`, an empty string, or nothing at all.
fn parent_id<'de, D>(deserializer: D) -> Result<Option<TaxonomyId>, D::Error>
where
    D: Deserializer<'de>,
{
    let parent = Option::<String>::deserialize(deserializer)?;

    Ok(parent
        .filter(|parent| !parent.trim().is_empty())
        .map(TaxonomyId))
}
