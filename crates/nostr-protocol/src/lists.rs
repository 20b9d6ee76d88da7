//! Lists with a public section in tags and a private section encrypted to
//! the owner in `content`.

use tracing::debug;

use crate::cipher;
use crate::event::{Event, UnsignedEvent};
use crate::keys::Keys;
use crate::tags::Tag;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateList {
    pub kind: u16,
    pub public: Vec<Tag>,
    pub private: Vec<Tag>,
}

impl PrivateList {
    /// An empty list. Parameterized lists carry their `d` identifier as the
    /// first public tag.
    pub fn new(kind: u16, identifier: Option<&str>) -> Self {
        Self {
            kind,
            public: identifier.map(Tag::identifier).into_iter().collect(),
            private: Vec::new(),
        }
    }

    /// Opens an existing list. If the private section cannot be read the
    /// list is refused so an edit never overwrites entries it could not see.
    pub fn open(event: &Event, keys: &Keys) -> Result<Self, Error> {
        let owner = keys.public_key();
        if event.pubkey != owner {
            return Err(Error::KeyMismatch {
                event: event.pubkey.clone(),
                signer: owner,
            });
        }

        let private = if event.content.is_empty() {
            Vec::new()
        } else {
            let plaintext = cipher::decrypt(keys, &owner, &event.content).map_err(|err| {
                debug!(event_id = %event.id, error = %err, "Private list content unreadable");
                Error::UnreadablePrivateList(err.to_string())
            })?;
            serde_json::from_str::<Vec<Tag>>(&plaintext)
                .map_err(|err| Error::UnreadablePrivateList(err.to_string()))?
        };

        Ok(Self {
            kind: event.kind,
            public: event.tags.clone(),
            private,
        })
    }

    pub fn identifier(&self) -> Option<&str> {
        crate::tags::tag_value(&self.public, "d")
    }

    /// Returns false if the tag was already present.
    pub fn add_public(&mut self, tag: Tag) -> bool {
        push_unique(&mut self.public, tag)
    }

    pub fn add_private(&mut self, tag: Tag) -> bool {
        push_unique(&mut self.private, tag)
    }

    /// Removes every entry, public or private, whose value matches. The `d`
    /// identifier is kept.
    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.public.len() + self.private.len();
        self.public
            .retain(|tag| matches!(tag, Tag::Identifier(_)) || tag.value() != Some(value));
        self.private.retain(|tag| tag.value() != Some(value));
        before != self.public.len() + self.private.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.public
            .iter()
            .chain(&self.private)
            .any(|tag| !matches!(tag, Tag::Identifier(_)) && tag.value() == Some(value))
    }

    /// Builds the replacement event. The private section is re-encrypted
    /// with a fresh IV; an empty private section leaves `content` empty.
    pub fn to_unsigned(&self, keys: &Keys) -> Result<UnsignedEvent, Error> {
        let owner = keys.public_key();
        let content = if self.private.is_empty() {
            String::new()
        } else {
            let plaintext = serde_json::to_string(&self.private)?;
            cipher::encrypt(keys, &owner, &plaintext)?
        };
        Ok(UnsignedEvent::new(
            owner,
            self.kind,
            self.public.clone(),
            content,
        ))
    }
}

fn push_unique(tags: &mut Vec<Tag>, tag: Tag) -> bool {
    if tags.contains(&tag) {
        return false;
    }
    tags.push(tag);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KIND_BOOKMARK_LIST, KIND_PARAMETERIZED_LIST};

    fn owner() -> Keys {
        Keys::parse("2bd806c97f0e00af1a1fc3328fa763a9269723c8db8fac4f93af71db186d6e90").unwrap()
    }

    fn publish(list: &PrivateList, keys: &Keys) -> Event {
        list.to_unsigned(keys).unwrap().sign(keys).unwrap()
    }

    #[test]
    fn private_entries_survive_a_roundtrip() {
        let keys = owner();
        let mut list = PrivateList::new(KIND_BOOKMARK_LIST, None);
        assert!(list.add_public(Tag::event("public-note")));
        assert!(list.add_private(Tag::event("secret-note")));
        assert!(!list.add_private(Tag::event("secret-note")));

        let event = publish(&list, &keys);
        assert!(!event.content.contains("secret-note"));
        assert_eq!(event.tags, vec![Tag::event("public-note")]);

        let reopened = PrivateList::open(&event, &keys).unwrap();
        assert_eq!(reopened, list);
    }

    #[test]
    fn empty_private_section_means_empty_content() {
        let keys = owner();
        let mut list = PrivateList::new(KIND_PARAMETERIZED_LIST, Some("reading"));
        list.add_public(Tag::event("n1"));
        let event = publish(&list, &keys);
        assert_eq!(event.content, "");
        assert_eq!(event.tag_value("d"), Some("reading"));

        let reopened = PrivateList::open(&event, &keys).unwrap();
        assert!(reopened.private.is_empty());
        assert_eq!(reopened.identifier(), Some("reading"));
    }

    #[test]
    fn remove_clears_both_sections_but_keeps_identifier() {
        let mut list = PrivateList::new(KIND_PARAMETERIZED_LIST, Some("n1"));
        list.add_public(Tag::event("n1"));
        list.add_private(Tag::event("n1"));
        list.add_private(Tag::event("n2"));

        assert!(list.contains("n1"));
        assert!(list.remove("n1"));
        assert!(!list.contains("n1"));
        assert_eq!(list.identifier(), Some("n1"));
        assert_eq!(list.private, vec![Tag::event("n2")]);
        assert!(!list.remove("missing"));
    }

    #[test]
    fn unreadable_content_blocks_editing() {
        let keys = owner();
        let mut event = publish(&PrivateList::new(KIND_BOOKMARK_LIST, None), &keys);
        event.content = "garbage-without-iv".to_string();
        assert!(matches!(
            PrivateList::open(&event, &keys),
            Err(Error::UnreadablePrivateList(_))
        ));

        // Encrypted by someone else: decrypts to noise or fails padding.
        let stranger = Keys::generate();
        event.content = cipher::encrypt(&stranger, &keys.public_key(), "[]").unwrap();
        assert!(matches!(
            PrivateList::open(&event, &keys),
            Err(Error::UnreadablePrivateList(_))
        ));
    }

    #[test]
    fn non_json_plaintext_is_unreadable() {
        let keys = owner();
        let mut event = publish(&PrivateList::new(KIND_BOOKMARK_LIST, None), &keys);
        event.content = cipher::encrypt(&keys, &keys.public_key(), "not json").unwrap();
        assert!(matches!(
            PrivateList::open(&event, &keys),
            Err(Error::UnreadablePrivateList(_))
        ));
    }

    #[test]
    fn lists_of_other_authors_are_refused() {
        let stranger = Keys::generate();
        let event = publish(&PrivateList::new(KIND_BOOKMARK_LIST, None), &stranger);
        assert!(matches!(
            PrivateList::open(&event, &owner()),
            Err(Error::KeyMismatch { .. })
        ));
    }
}
