//! Domain types shared by the visit store, the tab store and the resolvers.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Opaque visit identifier, minted as a ULID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(String);

impl VisitId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VisitId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("visit id must not be empty".into());
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl ToSql for VisitId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for VisitId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        String::column_result(value).map(Self)
    }
}

/// Host-assigned tab identifier. Not stable across host restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for TabId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for TabId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// Snapshot of a page at the moment a visit was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Page {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            icon: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationCause {
    Manual,
    Navigation,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndCause {
    Manual,
    Navigation,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                match value.as_str()? {
                    $($text => Ok(Self::$variant),)+
                    other => Err(FromSqlError::Other(
                        format!("unknown {} '{}'", stringify!($ty), other).into(),
                    )),
                }
            }
        }
    };
}

text_enum!(CreationCause {
    Manual => "manual",
    Navigation => "navigation",
    Import => "import",
});

text_enum!(EndCause {
    Manual => "manual",
    Navigation => "navigation",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creation {
    pub cause: CreationCause,
    /// None iff `cause` is `manual` or `import`.
    pub parent_id: Option<VisitId>,
    /// Only meaningful with a parent: true when this visit took over the
    /// parent's tab, false when it opened a new tab.
    pub replaced_parent: Option<bool>,
    pub time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct End {
    pub cause: EndCause,
    pub time: i64,
}

/// Input for a new visit; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
    pub page: Page,
    pub creation: Creation,
}

impl NewVisit {
    /// Root visit for a tab whose history is unknown.
    pub fn import(page: Page, time: i64) -> Self {
        Self {
            page,
            creation: Creation {
                cause: CreationCause::Import,
                parent_id: None,
                replaced_parent: None,
                time,
            },
        }
    }

    /// Visit created by a committed navigation. `parent` is the visit that
    /// caused it (with `replaced_parent`), or none for a manual navigation in a
    /// fresh tab.
    pub fn navigation(page: Page, parent: Option<(VisitId, bool)>, time: i64) -> Self {
        let creation = match parent {
            Some((parent_id, replaced_parent)) => Creation {
                cause: CreationCause::Navigation,
                parent_id: Some(parent_id),
                replaced_parent: Some(replaced_parent),
                time,
            },
            None => Creation {
                cause: CreationCause::Manual,
                parent_id: None,
                replaced_parent: None,
                time,
            },
        };
        Self { page, creation }
    }
}

/// A node in the navigation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub page: Page,
    pub creation: Creation,
    pub children: Vec<VisitId>,
    pub end: Option<End>,
}

impl Visit {
    /// Copy of this visit with `child` appended.
    pub fn with_child(mut self, child: VisitId) -> Self {
        self.children.push(child);
        self
    }

    /// Copy of this visit ended with `end`. An end that is already set wins.
    pub fn ended(mut self, end: End) -> Self {
        if self.end.is_none() {
            self.end = Some(end);
        }
        self
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// The persisted binding of a live tab to its current visit and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRecord {
    pub tab_id: TabId,
    pub current_visit: Option<VisitId>,
    pub created_by_visit: Option<VisitId>,
    pub tab_position: u32,
}

/// One position update inside a move chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabMove {
    pub tab_id: TabId,
    pub tab_position: u32,
}

impl TabMove {
    pub fn new(tab_id: TabId, tab_position: u32) -> Self {
        Self {
            tab_id,
            tab_position,
        }
    }
}

/// A tab as reported by the host in its startup snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealTab {
    pub tab_id: TabId,
    #[serde(default)]
    pub opener_tab_id: Option<TabId>,
    pub position: u32,
    #[serde(default)]
    pub page: Option<Page>,
}
