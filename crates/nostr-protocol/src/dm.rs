use crate::cipher;
use crate::event::{Event, UnsignedEvent, KIND_ENCRYPTED_DM};
use crate::keys::Keys;
use crate::tags::{self, Tag};
use crate::Error;

/// Builds an encrypted direct message addressed with a `p` tag.
pub fn direct_message(keys: &Keys, recipient: &str, text: &str) -> Result<UnsignedEvent, Error> {
    let content = cipher::encrypt(keys, recipient, text)?;
    Ok(UnsignedEvent::new(
        keys.public_key(),
        KIND_ENCRYPTED_DM,
        vec![Tag::pubkey(recipient)],
        content,
    ))
}

/// The other party of a direct message: the author, unless we wrote it.
pub fn counterpart<'a>(event: &'a Event, own_pubkey: &str) -> Result<&'a str, Error> {
    if event.pubkey != own_pubkey {
        return Ok(&event.pubkey);
    }
    tags::pubkeys(&event.tags)
        .into_iter()
        .next()
        .ok_or(Error::MissingRecipient)
}

pub fn open_direct_message(event: &Event, keys: &Keys) -> Result<String, Error> {
    let own = keys.public_key();
    let other = counterpart(event, &own)?;
    Ok(cipher::decrypt(keys, other, &event.content)?)
}
