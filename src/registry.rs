//! Fixed roster of known tags.
//!
//! Built once at startup from the configured addresses; size and addresses
//! never change afterwards. Lookups are linear, the roster is a handful of
//! entries.

use crate::error::Error;
use crate::tag::{Link, NotifyKey, Tag, TagAddress, TagId};

pub struct TagRegistry<L, const N: usize> {
    tags: [Tag<L>; N],
}

impl<L: Link, const N: usize> TagRegistry<L, N> {
    /// Build the roster. Rejects a list that names the same address twice.
    pub fn new(addresses: [TagAddress; N]) -> Result<Self, Error> {
        for (i, address) in addresses.iter().enumerate() {
            if addresses[..i].contains(address) {
                return Err(Error::DuplicateTag);
            }
        }
        Ok(Self {
            tags: addresses.map(Tag::new),
        })
    }

    pub fn len(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn lookup(&self, address: &TagAddress) -> Option<TagId> {
        self.tags
            .iter()
            .position(|tag| tag.address() == address)
            .map(TagId)
    }

    /// Tag ids are only handed out by this registry, so indexing cannot miss.
    pub fn tag(&self, id: TagId) -> &Tag<L> {
        &self.tags[id.0]
    }

    pub(crate) fn tag_mut(&mut self, id: TagId) -> &mut Tag<L> {
        &mut self.tags[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = TagId> {
        (0..N).map(TagId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TagId, &Tag<L>)> {
        self.tags.iter().enumerate().map(|(i, tag)| (TagId(i), tag))
    }

    /// Owner of a subscription, if that subscription is still current.
    pub fn owner_of(&self, key: NotifyKey) -> Option<TagId> {
        self.tags
            .get(key.tag.0)
            .filter(|tag| tag.notify_key() == Some(key))
            .map(|_| key.tag)
    }

    pub fn connected_count(&self) -> usize {
        self.tags.iter().filter(|tag| tag.is_open()).count()
    }

    pub fn all_reachable(&self) -> bool {
        self.tags.iter().all(Tag::is_reachable)
    }
}
