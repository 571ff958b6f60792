//! Structured representation of person name (PN) values.
use snafu::{ensure, Snafu};
use std::fmt::{Display, Formatter};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Person name has {} component groups, at most 3 are allowed", count))]
    TooManyGroups { count: usize },
    #[snafu(display("Person name group '{}' has more than 5 components", group))]
    TooManyComponents { group: String },
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One of the component groups of a person name:
/// up to five components separated by `^`,
/// in the order family, given, middle, prefix and suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentGroup {
    raw: String,
}

impl ComponentGroup {
    fn parse(text: &str) -> Result<Self> {
        let raw = text.trim_end_matches('^');
        ensure!(
            raw.split('^').count() <= 5,
            TooManyComponentsSnafu { group: text }
        );
        Ok(ComponentGroup {
            raw: raw.to_string(),
        })
    }

    /// The group in its textual form, without trailing separators.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the group has no content.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Iterate over the `^`-separated components of this group.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.raw.split('^')
    }

    fn component(&self, index: usize) -> Option<&str> {
        self.components().nth(index).filter(|c| !c.is_empty())
    }

    /// The family name complex.
    pub fn family(&self) -> Option<&str> {
        self.component(0)
    }

    /// The given name complex.
    pub fn given(&self) -> Option<&str> {
        self.component(1)
    }

    /// The middle name.
    pub fn middle(&self) -> Option<&str> {
        self.component(2)
    }

    /// The name prefix, such as a title.
    pub fn prefix(&self) -> Option<&str> {
        self.component(3)
    }

    /// The name suffix.
    pub fn suffix(&self) -> Option<&str> {
        self.component(4)
    }
}

/// Represents a DICOM person name.
///
/// The textual form is split by `=` into up to three component groups
/// (alphabetic, ideographic and phonetic),
/// each split by `^` into up to five components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PersonName {
    alphabetic: ComponentGroup,
    ideographic: Option<ComponentGroup>,
    phonetic: Option<ComponentGroup>,
}

impl PersonName {
    /// Parse a single person name value.
    ///
    /// The input should not contain value delimiters (`\`)
    /// and is expected to be already trimmed of padding.
    pub fn from_text(text: &str) -> Result<PersonName> {
        let groups: Vec<&str> = text.split('=').collect();
        ensure!(groups.len() <= 3, TooManyGroupsSnafu { count: groups.len() });
        let optional = |group: Option<&&str>| -> Result<Option<ComponentGroup>> {
            match group {
                Some(g) if !g.is_empty() => ComponentGroup::parse(g).map(Some),
                _ => Ok(None),
            }
        };
        Ok(PersonName {
            alphabetic: ComponentGroup::parse(groups[0])?,
            ideographic: optional(groups.get(1))?,
            phonetic: optional(groups.get(2))?,
        })
    }

    /// The alphabetic representation of the name.
    pub fn alphabetic(&self) -> &ComponentGroup {
        &self.alphabetic
    }

    /// The ideographic representation of the name, if present.
    pub fn ideographic(&self) -> Option<&ComponentGroup> {
        self.ideographic.as_ref()
    }

    /// The phonetic representation of the name, if present.
    pub fn phonetic(&self) -> Option<&ComponentGroup> {
        self.phonetic.as_ref()
    }

    /// The family name of the alphabetic group.
    pub fn family(&self) -> Option<&str> {
        self.alphabetic.family()
    }

    /// The given name of the alphabetic group.
    pub fn given(&self) -> Option<&str> {
        self.alphabetic.given()
    }
}

impl Display for PersonName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.alphabetic.as_str())?;
        match (&self.ideographic, &self.phonetic) {
            (None, None) => Ok(()),
            (Some(i), None) => write!(f, "={}", i.as_str()),
            (i, Some(p)) => write!(
                f,
                "={}={}",
                i.as_ref().map(ComponentGroup::as_str).unwrap_or(""),
                p.as_str()
            ),
        }
    }
}
