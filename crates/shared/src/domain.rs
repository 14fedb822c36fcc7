use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CursorParseError;

/// Ordering and identifying key of a catalog item.
///
/// Catalog services are not consistent about encoding lots, so both JSON
/// integers and numeric strings are accepted. Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLot", into = "i64")]
pub struct Lot(pub i64);

/// Cursor value rendered when nothing has been loaded yet.
pub const UNSET_CURSOR: Lot = Lot(-1);

impl Lot {
    /// The cursor that requests the page after this one.
    pub fn next(self) -> Result<Lot, CursorParseError> {
        self.0
            .checked_add(1)
            .map(Lot)
            .ok_or(CursorParseError::Overflow(self.0))
    }
}

impl fmt::Display for Lot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Lot {
    type Err = CursorParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<i64>()
            .map(Lot)
            .map_err(|_| CursorParseError::NotNumeric(raw.to_string()))
    }
}

impl From<Lot> for i64 {
    fn from(value: Lot) -> Self {
        value.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLot {
    Int(i64),
    Text(String),
}

impl TryFrom<RawLot> for Lot {
    type Error = CursorParseError;

    fn try_from(value: RawLot) -> Result<Self, Self::Error> {
        match value {
            RawLot::Int(v) => Ok(Lot(v)),
            RawLot::Text(v) => v.parse(),
        }
    }
}

/// A catalog record, or a partially populated search template.
///
/// In a template an unset `lot` or an empty text field means the field is
/// not filtered on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<Lot>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub description: String,
}

impl CatalogItem {
    pub fn new(
        lot: Lot,
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            lot: Some(lot),
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            description: description.into(),
        }
    }

    /// An empty template; it matches every item until fields are set.
    pub fn template() -> Self {
        Self::default()
    }

    pub fn with_lot(mut self, lot: Lot) -> Self {
        self.lot = Some(lot);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_empty_template(&self) -> bool {
        self.lot.is_none()
            && [&self.title, &self.author, &self.genre, &self.description]
                .iter()
                .all(|field| field.trim().is_empty())
    }

    /// Whether this item satisfies `template`.
    ///
    /// The lot must be equal when set. Text fields match on a
    /// case-insensitive substring of the trimmed template text.
    pub fn matches(&self, template: &CatalogItem) -> bool {
        if let Some(lot) = template.lot {
            if self.lot != Some(lot) {
                return false;
            }
        }

        field_matches(&self.title, &template.title)
            && field_matches(&self.author, &template.author)
            && field_matches(&self.genre, &template.genre)
            && field_matches(&self.description, &template.description)
    }
}

fn field_matches(value: &str, wanted: &str) -> bool {
    let wanted = wanted.trim();
    wanted.is_empty() || value.to_lowercase().contains(&wanted.to_lowercase())
}

/// A login attempt's user identifier and secret. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    secret: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn has_empty_field(&self) -> bool {
        self.user.is_empty() || self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStatus {
    pub logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_accepts_integers_and_numeric_strings() {
        let items: Vec<CatalogItem> =
            serde_json::from_str(r#"[{"lot": 5, "title": "a"}, {"lot": " 12 ", "title": "b"}]"#)
                .expect("items");
        assert_eq!(items[0].lot, Some(Lot(5)));
        assert_eq!(items[1].lot, Some(Lot(12)));
    }

    #[test]
    fn lot_rejects_non_numeric_strings() {
        let err = serde_json::from_str::<CatalogItem>(r#"{"lot": "abc"}"#).expect_err("reject");
        assert!(err.to_string().contains("not an integer"), "{err}");
        assert_eq!(
            "x1".parse::<Lot>(),
            Err(CursorParseError::NotNumeric("x1".into()))
        );
    }

    #[test]
    fn unset_cursor_advances_to_page_zero() {
        assert_eq!(UNSET_CURSOR.to_string(), "-1");
        assert_eq!(UNSET_CURSOR.next(), Ok(Lot(0)));
        assert_eq!(Lot(i64::MAX).next(), Err(CursorParseError::Overflow(i64::MAX)));
    }

    #[test]
    fn template_matching_ignores_unset_fields() {
        let item = CatalogItem::new(Lot(3), "Dune", "Frank Herbert", "Sci-Fi", "Desert planet");

        assert!(item.matches(&CatalogItem::template()));
        assert!(item.matches(&CatalogItem::template().with_author("herbert")));
        assert!(item.matches(&CatalogItem::template().with_lot(Lot(3)).with_genre(" sci ")));
        assert!(!item.matches(&CatalogItem::template().with_lot(Lot(4))));
        assert!(!item.matches(&CatalogItem::template().with_title("Emma")));
    }

    #[test]
    fn blank_template_is_empty() {
        assert!(CatalogItem::template().is_empty_template());
        assert!(CatalogItem::template().with_title("  ").is_empty_template());
        assert!(!CatalogItem::template().with_lot(Lot(0)).is_empty_template());
        assert!(!CatalogItem::template().with_genre("Sci-Fi").is_empty_template());
    }

    #[test]
    fn template_serialization_omits_unset_lot() {
        let json = serde_json::to_value(CatalogItem::template().with_title("Dune")).expect("json");
        assert!(json.get("lot").is_none());
        assert_eq!(json["title"], "Dune");
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = Credentials::new("alice", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
        assert!(Credentials::new("alice", "").has_empty_field());
        assert!(Credentials::new("", "pw").has_empty_field());
    }
}
