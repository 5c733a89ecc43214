//! Translation of list parameters (`name`, `gender`, `sort`) into a store-level
//! filter and sort directive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::users::repo_types::User;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("unknown sort field: {0}")]
    UnknownSortField(String),
    #[error("sort field is empty")]
    EmptySortField,
}

/// Record attributes a list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Id,
    Name,
    Email,
    Gender,
}

impl SortField {
    /// Column name in the `users` table. Only these values ever reach SQL.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Email => "email",
            SortField::Gender => "gender",
        }
    }

    /// Text columns; these are ordered bytewise so every store agrees.
    pub fn is_text(&self) -> bool {
        !matches!(self, SortField::Id)
    }
}

impl FromStr for SortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(QueryError::EmptySortField),
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "email" => Ok(SortField::Email),
            "gender" => Ok(SortField::Gender),
            other => Err(QueryError::UnknownSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A field plus direction, written on the wire as `field` or `-field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortDirective {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    pub fn is_descending(&self) -> bool {
        self.direction == SortDirection::Desc
    }

    /// Orders two users by the directive's field and direction.
    pub fn compare(&self, a: &User, b: &User) -> std::cmp::Ordering {
        let ord = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Email => a.email.cmp(&b.email),
            SortField::Gender => a.gender.as_str().cmp(b.gender.as_str()),
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

impl FromStr for SortDirective {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('-') {
            Some(rest) => Ok(Self::desc(rest.parse()?)),
            None => Ok(Self::asc(s.parse()?)),
        }
    }
}

impl fmt::Display for SortDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_descending() {
            f.write_str("-")?;
        }
        f.write_str(self.field.column())
    }
}

/// Filter predicate; all present conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive substring of `name`, matched literally.
    pub name_contains: Option<String>,
    /// Exact match on the gender text; unknown values simply match nothing.
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub filter: UserFilter,
    pub sort: Option<SortDirective>,
}

impl UserQuery {
    /// Builds a query from raw request parameters. Empty strings count as absent.
    pub fn build(
        name: Option<&str>,
        gender: Option<&str>,
        sort: Option<&str>,
    ) -> Result<Self, QueryError> {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
        let sort = match non_empty(sort) {
            Some(s) => Some(s.parse::<SortDirective>()?),
            None => None,
        };
        Ok(Self {
            filter: UserFilter {
                name_contains: non_empty(name),
                gender: non_empty(gender),
            },
            sort,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_sort_is_ascending() {
        let d: SortDirective = "name".parse().unwrap();
        assert_eq!(d, SortDirective::asc(SortField::Name));
    }

    #[test]
    fn dash_prefix_is_descending() {
        let d: SortDirective = "-email".parse().unwrap();
        assert_eq!(d, SortDirective::desc(SortField::Email));
        assert_eq!(d.to_string(), "-email");
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let err = "-age".parse::<SortDirective>().unwrap_err();
        assert_eq!(err, QueryError::UnknownSortField("age".into()));
        assert_eq!(err.to_string(), "unknown sort field: age");
    }

    #[test]
    fn lone_dash_is_rejected() {
        assert_eq!(
            "-".parse::<SortDirective>().unwrap_err(),
            QueryError::EmptySortField
        );
        assert_eq!(
            UserQuery::build(None, None, Some("-")).unwrap_err(),
            QueryError::EmptySortField
        );
    }

    #[test]
    fn empty_filters_are_absent() {
        let q = UserQuery::build(Some(""), Some(""), None).unwrap();
        assert_eq!(q, UserQuery::default());
    }

    #[test]
    fn empty_sort_is_absent() {
        let q = UserQuery::build(Some(""), Some(""), Some("")).unwrap();
        assert_eq!(q, UserQuery::default());
    }

    #[test]
    fn build_combines_all_parameters() {
        let q = UserQuery::build(Some("ali"), Some("Female"), Some("-name")).unwrap();
        assert_eq!(q.filter.name_contains.as_deref(), Some("ali"));
        assert_eq!(q.filter.gender.as_deref(), Some("Female"));
        assert_eq!(q.sort, Some(SortDirective::desc(SortField::Name)));
    }
}
