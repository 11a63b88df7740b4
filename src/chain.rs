use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::algo::AlgoTag;
use crate::compact::CompactBits;
use crate::error::{ChainError, PowError};

/// One accepted block as seen by the difficulty engine.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct BlockIndexEntry {
    pub height: u32,
    pub timestamp: i64,
    pub bits: CompactBits,
    pub algo: AlgoTag,
}

impl BlockIndexEntry {
    pub fn new(height: u32, timestamp: i64, bits: CompactBits, algo: AlgoTag) -> Self {
        Self {
            height,
            timestamp,
            bits,
            algo,
        }
    }

    /// height of the parent entry, `None` for the genesis
    pub fn parent_height(&self) -> Option<u32> {
        self.height.checked_sub(1)
    }
}

/// Read-only access to a chain snapshot by height.
///
/// Only `entry` must be provided; the walks are derived from it. Parents are
/// found by looking up `height - 1`, entries never point at each other.
pub trait ChainIndexView {
    fn entry(&self, height: u32) -> Option<&BlockIndexEntry>;

    fn parent(&self, entry: &BlockIndexEntry) -> Option<&BlockIndexEntry> {
        entry.parent_height().and_then(|height| self.entry(height))
    }

    /// walk back from `from` (inclusive) to the closest block of `algo`
    fn last_block_of_algo<'a>(
        &'a self,
        from: &'a BlockIndexEntry,
        algo: AlgoTag,
    ) -> Option<&'a BlockIndexEntry> {
        let mut current = Some(from);
        while let Some(entry) = current {
            if entry.algo == algo {
                return Some(entry);
            }
            current = self.parent(entry);
        }
        None
    }

    /// Timestamp of the block of `algo` that opens the retarget window
    /// ending at `from`.
    ///
    /// Counting only blocks of `algo` and starting at `from` inclusive, the
    /// first `interval` matches are skipped and the next match is returned.
    fn first_block_of_retarget_window(
        &self,
        from: &BlockIndexEntry,
        algo: AlgoTag,
        interval: u32,
    ) -> Result<i64, PowError> {
        let mut skipped = 0u32;
        let mut current = self.last_block_of_algo(from, algo);

        while let Some(entry) = current {
            if skipped == interval {
                return Ok(entry.timestamp);
            }
            skipped += 1;
            current = self
                .parent(entry)
                .and_then(|parent| self.last_block_of_algo(parent, algo));
        }

        Err(PowError::InsufficientChainHistory {
            algo,
            required: interval + 1,
            found: skipped,
        })
    }
}

/// Append-only arena of block index entries; the position is the height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainIndex {
    blocks: Vec<BlockIndexEntry>,
}

impl ChainIndex {
    pub fn new(genesis: BlockIndexEntry) -> Self {
        Self {
            blocks: vec![BlockIndexEntry { height: 0, ..genesis }],
        }
    }

    /// build an index from entries ordered by height, starting at genesis
    pub fn from_entries(entries: Vec<BlockIndexEntry>) -> Result<Self, ChainError> {
        if entries.is_empty() {
            return Err(ChainError::Empty);
        }
        for (expected, entry) in entries.iter().enumerate() {
            if entry.height as usize != expected {
                return Err(ChainError::NonContiguous {
                    expected: expected as u32,
                    got: entry.height,
                });
            }
        }
        Ok(Self { blocks: entries })
    }

    /// read a JSON array of entries
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ChainError> {
        let entries: Vec<BlockIndexEntry> = serde_json::from_reader(reader)?;
        Self::from_entries(entries)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// append a block; its height must be one above the tip
    pub fn push(&mut self, entry: BlockIndexEntry) -> Result<(), ChainError> {
        let expected = self.tip().height + 1;
        if entry.height != expected {
            return Err(ChainError::NonContiguous {
                expected,
                got: entry.height,
            });
        }
        self.blocks.push(entry);
        Ok(())
    }

    /// drop every entry above `height`
    pub fn rollback_to(&mut self, height: u32) {
        // truncating at index 1 or above keeps the genesis
        self.blocks.truncate(height as usize + 1);
    }

    /// drop the tip entry
    pub fn pop(&mut self) -> Result<BlockIndexEntry, ChainError> {
        if self.blocks.len() == 1 {
            return Err(ChainError::CannotRemoveGenesis);
        }
        self.blocks.pop().ok_or(ChainError::Empty)
    }

    /// return the latest entry
    pub fn tip(&self) -> &BlockIndexEntry {
        // the genesis entry is never removed
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn genesis(&self) -> &BlockIndexEntry {
        &self.blocks[0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entries(&self) -> &[BlockIndexEntry] {
        &self.blocks
    }
}

impl ChainIndexView for ChainIndex {
    fn entry(&self, height: u32) -> Option<&BlockIndexEntry> {
        self.blocks.get(height as usize)
    }
}
