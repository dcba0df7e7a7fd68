//! Blocks and the local block store shared by exchange implementations.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::cid::ContentId;
use crate::constants::MAX_BLOCK_SIZE;
use crate::error::ExchangeError;
use crate::error::NotFoundSnafu;
use crate::error::Result;

/// An opaque payload and its content identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: ContentId,
    data: Bytes,
}

impl Block {
    /// Wrap `data`, computing its identifier.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            id: ContentId::for_bytes(&data),
            data,
        }
    }

    /// Content identifier.
    pub fn id(&self) -> &ContentId {
        &self.id
    }

    /// Payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Default)]
struct StoreInner {
    blocks: HashMap<ContentId, Bytes>,
    announced: HashSet<ContentId>,
}

/// Local block storage.
///
/// Blocks become servable to peers only after [`announce`](Self::announce).
/// Clones share the same storage.
#[derive(Clone, Default)]
pub struct BlockStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl BlockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a block. Returns `true` if it was not already present.
    pub fn put(&self, block: &Block) -> Result<bool> {
        let size = block.len() as u64;
        if size > MAX_BLOCK_SIZE {
            return Err(ExchangeError::TooLarge {
                size,
                max: MAX_BLOCK_SIZE,
            });
        }
        Ok(self.inner.write().blocks.insert(block.id, block.data.clone()).is_none())
    }

    /// Make a stored block servable to peers.
    pub fn announce(&self, id: &ContentId) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.blocks.contains_key(id) {
            return NotFoundSnafu { id: id.to_string() }.fail();
        }
        inner.announced.insert(*id);
        Ok(())
    }

    /// Whether the block is stored locally.
    pub fn has(&self, id: &ContentId) -> bool {
        self.inner.read().blocks.contains_key(id)
    }

    /// Local copy of a block, announced or not.
    pub fn get(&self, id: &ContentId) -> Option<Block> {
        self.inner.read().blocks.get(id).map(|data| Block {
            id: *id,
            data: data.clone(),
        })
    }

    /// Block as served to a peer: present only if announced.
    pub fn serve(&self, id: &ContentId) -> Option<Bytes> {
        let inner = self.inner.read();
        if inner.announced.contains(id) {
            inner.blocks.get(id).cloned()
        } else {
            None
        }
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.inner.read().blocks.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_announced_blocks_are_served() {
        let store = BlockStore::new();
        let block = Block::new(Bytes::from_static(b"hello"));

        assert!(store.put(&block).unwrap());
        assert!(!store.put(&block).unwrap());
        assert!(store.has(block.id()));
        assert!(store.serve(block.id()).is_none());

        store.announce(block.id()).unwrap();
        assert_eq!(store.serve(block.id()).unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_announce_requires_stored_block() {
        let store = BlockStore::new();
        let block = Block::new(Bytes::from_static(b"missing"));
        assert!(matches!(store.announce(block.id()), Err(ExchangeError::NotFound { .. })));
    }

    #[test]
    fn test_block_id_matches_content() {
        let block = Block::new(vec![1u8, 2, 3]);
        assert_eq!(*block.id(), ContentId::for_bytes(&[1, 2, 3]));
        assert_eq!(block.len(), 3);
    }
}
