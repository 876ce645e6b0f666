//! Element id tokens
//!
//! An element id is a dot-separated list of tokens, each of the form
//! `pathpart[:slicename[/reslice]]`. A `[x]` suffix on the path part marks a
//! choice element. See <https://www.hl7.org/fhir/elementdefinition.html#id>.

use super::error::{Error, Result};

const CHOICE_SUFFIX: &str = "[x]";

/// One token of an element id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdToken<'a> {
    /// Path part with any `[x]` suffix removed
    pub path_part: &'a str,
    pub is_choice_type: bool,
    pub slice_name: Option<&'a str>,
    pub reslice: Option<&'a str>,
}

impl<'a> IdToken<'a> {
    /// Parse a single token
    pub fn parse(token: &'a str) -> Result<Self> {
        let mut colon_split = token.split(':');
        let raw_path_part = colon_split.next().unwrap_or_default();
        let slice_part = colon_split.next();
        if colon_split.next().is_some() {
            return Err(Error::InvalidIdToken(token.to_string()));
        }

        let (path_part, is_choice_type) = match raw_path_part.strip_suffix(CHOICE_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (raw_path_part, false),
        };

        let Some(slice_part) = slice_part else {
            return Ok(Self {
                path_part,
                is_choice_type,
                slice_name: None,
                reslice: None,
            });
        };

        let mut slash_split = slice_part.split('/');
        let slice_name = slash_split.next();
        let reslice = slash_split.next();
        if slash_split.next().is_some() {
            return Err(Error::InvalidIdToken(token.to_string()));
        }

        Ok(Self {
            path_part,
            is_choice_type,
            slice_name,
            reslice,
        })
    }

    /// Parse the last token of a full element id, which determines its local identity
    pub fn last(id: &'a str) -> Result<Self> {
        Self::parse(id.rsplit('.').next().unwrap_or(id))
    }
}

/// Number of tokens in an element id
pub fn token_count(id: &str) -> usize {
    id.split('.').count()
}

/// Everything before the last token, if the id has a parent
pub fn parent_id(id: &str) -> Option<&str> {
    id.rfind('.').map(|pos| &id[..pos])
}
