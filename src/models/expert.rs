use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for experts
pub type ExpertId = u32;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpertStatus {
    #[default]
    Active,
    Inactive,
}

impl ExpertStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            ExpertStatus::Active => "●",
            ExpertStatus::Inactive => "○",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExpertStatus::Active => "Available for booking",
            ExpertStatus::Inactive => "Retired from the roster",
        }
    }
}

/// Field of expertise. Every expert belongs to exactly one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Computing,
    Acoustic,
    Anthropologist,
    Accounting,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Computing,
        Category::Acoustic,
        Category::Anthropologist,
        Category::Accounting,
    ];

    pub fn matches(&self, other: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Computing => "computing",
            Category::Acoustic => "acoustic",
            Category::Anthropologist => "anthropologist",
            Category::Accounting => "accounting",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.matches(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown category '{}' (expected one of: {})",
                    s,
                    Category::ALL.map(|c| c.as_str()).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expert {
    pub id: ExpertId,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub status: ExpertStatus,
    pub created_at: DateTime<Utc>,
}

impl Expert {
    pub fn new(id: ExpertId, name: String, category: Category) -> Self {
        Self {
            id,
            name,
            category,
            status: ExpertStatus::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ExpertStatus::Active)
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Expert fields supplied by the caller; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewExpert {
    pub name: String,
    pub category: Category,
}

impl NewExpert {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }
}
