use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// A relay query. Absent fields are omitted from the wire form; tag filters
/// serialize as `"#<letter>": [...]` next to the fixed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u16>>,
    #[serde(flatten)]
    pub tags: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u16>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn kind(self, kind: u16) -> Self {
        self.kinds([kind])
    }

    /// Adds a `#<letter>` tag filter.
    pub fn tag<I, S>(mut self, letter: char, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.insert(
            format!("#{letter}"),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn events<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag('e', ids)
    }

    pub fn pubkeys<I, S>(self, pubkeys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag('p', pubkeys)
    }

    pub fn since(mut self, since: u64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: u64) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), ShapeError> {
        for key in self.tags.keys() {
            let mut chars = key.chars();
            let valid = matches!(
                (chars.next(), chars.next(), chars.next()),
                (Some('#'), Some(letter), None) if letter.is_ascii_alphabetic()
            );
            if !valid {
                return Err(ShapeError::InvalidFilter(format!(
                    "tag filter key '{key}' must be '#' followed by one letter"
                )));
            }
        }

        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(ShapeError::InvalidFilter(format!(
                    "since {since} is after until {until}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_omitted() {
        let filter = Filter::new().kinds([1, 6]).limit(20);
        assert_eq!(
            serde_json::to_string(&filter).unwrap(),
            r#"{"kinds":[1,6],"limit":20}"#
        );
        assert_eq!(serde_json::to_string(&Filter::new()).unwrap(), "{}");
    }

    #[test]
    fn tag_filters_serialize_inline() {
        let filter = Filter::new()
            .authors(["abc"])
            .pubkeys(["def"])
            .events(["123"])
            .since(10);
        assert_eq!(
            serde_json::to_string(&filter).unwrap(),
            r##"{"authors":["abc"],"#e":["123"],"#p":["def"],"since":10}"##
        );
    }

    #[test]
    fn wire_form_parses_back() {
        let json = r##"{"ids":["a"],"kinds":[7],"#t":["nostr"],"until":5}"##;
        let filter: Filter = serde_json::from_str(json).unwrap();
        assert_eq!(filter.ids.as_deref(), Some(&["a".to_string()][..]));
        assert_eq!(filter.tags.get("#t"), Some(&vec!["nostr".to_string()]));
        assert_eq!(filter.until, Some(5));
    }

    #[test]
    fn validate_rejects_bad_tag_keys() {
        assert!(Filter::new().tag('e', ["x"]).validate().is_ok());
        assert!(Filter::new().tag('1', ["x"]).validate().is_err());

        let mut filter = Filter::new();
        filter.tags.insert("#ee".to_string(), vec![]);
        assert!(matches!(filter.validate(), Err(ShapeError::InvalidFilter(_))));

        let mut filter = Filter::new();
        filter.tags.insert("e".to_string(), vec![]);
        assert!(filter.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_window() {
        assert!(Filter::new().since(10).until(5).validate().is_err());
        assert!(Filter::new().since(5).until(5).validate().is_ok());
    }
}
