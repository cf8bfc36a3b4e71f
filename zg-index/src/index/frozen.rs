//! The frozen index segment: the blob layout and the handle that owns it.

use std::fs::File;
use std::path::Path;

use crate::automaton::Dfa;
use crate::error::{Error, Result};
use crate::frozen::blob::AlignedBytes;
use crate::frozen::{FrozenMap, FrozenSet, FrozenStringPool, FrozenVector, RelPtr, StringRef};
use crate::trie::frozen::FrozenNode;
use crate::types::{WordInfo, WordOff, ZgramId, ZgramInfo};

/// First eight bytes of every frozen index blob.
pub(crate) const FROZEN_MAGIC: u64 = 0x7a67_3031_6964_7866; // "zg01idxf"

/// The root structure of the mapped blob. All interior pointers are
/// self-relative, so the mapping address does not matter.
#[repr(C)]
pub struct FrozenIndex {
    pub(super) magic: u64,
    pub(super) logged_end: u64,
    pub(super) unlogged_end: u64,
    pub(super) zgram_infos: FrozenVector<ZgramInfo>,
    pub(super) word_infos: FrozenVector<WordInfo>,
    pub(super) trie_root: RelPtr<FrozenNode>,
    pub(super) string_pool: FrozenStringPool,
    pub(super) metadata: FrozenMetadata,
}

impl FrozenIndex {
    pub fn zgram_infos(&self) -> &[ZgramInfo] {
        self.zgram_infos.as_slice()
    }

    pub fn word_infos(&self) -> &[WordInfo] {
        self.word_infos.as_slice()
    }

    pub fn string_pool(&self) -> &FrozenStringPool {
        &self.string_pool
    }

    pub fn metadata(&self) -> &FrozenMetadata {
        &self.metadata
    }

    /// Log position at which the dynamic segment resumes (logged stream).
    pub fn logged_end(&self) -> u64 {
        self.logged_end
    }

    /// Log position at which the dynamic segment resumes (unlogged stream).
    pub fn unlogged_end(&self) -> u64 {
        self.unlogged_end
    }

    pub fn trie(&self) -> Option<&FrozenNode> {
        // Safety: builder invariant; the root pointer targets a node in this
        // blob (or is null for an index frozen before any words existed).
        unsafe { self.trie_root.deref() }
    }

    pub fn find_word(&self, probe: &[char]) -> Option<&[WordOff]> {
        self.trie()?.find(probe)
    }

    pub fn find_matching(&self, dfa: &Dfa, callback: &mut dyn FnMut(&[WordOff])) {
        if let Some(trie) = self.trie() {
            trie.find_matching(dfa, callback);
        }
    }

    pub fn last_zgram_id(&self) -> Option<ZgramId> {
        self.zgram_infos().last().map(ZgramInfo::zgram_id)
    }
}

/// A revision entry in the frozen revision table.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct FrozenRevision {
    pub instance: StringRef,
    pub body: StringRef,
    pub render_style: u32,
}

// Safety: `#[repr(C)]`, `Copy`, three `u32`s, no padding.
unsafe impl crate::frozen::blob::Pod for FrozenRevision {}

/// The frozen metadata tables. Each is a sorted map keyed by zgram id or by
/// pooled-string reference; string refs compare like the strings they name.
#[repr(C)]
pub struct FrozenMetadata {
    pub(super) reactions: FrozenMap<ZgramId, FrozenMap<StringRef, FrozenSet<StringRef>>>,
    pub(super) reaction_counts: FrozenMap<StringRef, FrozenMap<ZgramId, i64>>,
    pub(super) zgram_revisions: FrozenMap<ZgramId, FrozenVector<FrozenRevision>>,
    pub(super) zgram_refers_to: FrozenMap<ZgramId, FrozenSet<ZgramId>>,
    pub(super) zmojis: FrozenMap<StringRef, StringRef>,
    pub(super) plus_pluses: FrozenMap<StringRef, FrozenVector<ZgramId>>,
    pub(super) minus_minuses: FrozenMap<StringRef, FrozenVector<ZgramId>>,
    pub(super) plus_plus_keys: FrozenMap<ZgramId, FrozenVector<StringRef>>,
}

impl FrozenMetadata {
    pub fn reactions(&self) -> &FrozenMap<ZgramId, FrozenMap<StringRef, FrozenSet<StringRef>>> {
        &self.reactions
    }

    pub fn reaction_counts(&self) -> &FrozenMap<StringRef, FrozenMap<ZgramId, i64>> {
        &self.reaction_counts
    }

    pub fn zgram_revisions(&self) -> &FrozenMap<ZgramId, FrozenVector<FrozenRevision>> {
        &self.zgram_revisions
    }

    pub fn zgram_refers_to(&self) -> &FrozenMap<ZgramId, FrozenSet<ZgramId>> {
        &self.zgram_refers_to
    }

    pub fn zmojis(&self) -> &FrozenMap<StringRef, StringRef> {
        &self.zmojis
    }

    pub fn plus_pluses(&self) -> &FrozenMap<StringRef, FrozenVector<ZgramId>> {
        &self.plus_pluses
    }

    pub fn minus_minuses(&self) -> &FrozenMap<StringRef, FrozenVector<ZgramId>> {
        &self.minus_minuses
    }

    pub fn plus_plus_keys(&self) -> &FrozenMap<ZgramId, FrozenVector<StringRef>> {
        &self.plus_plus_keys
    }
}

enum Storage {
    Mapped(memmap2::Mmap),
    Owned(AlignedBytes),
}

/// Owns the frozen blob, a file mapping or an owned aligned buffer, for
/// the lifetime of the index. Mapped once per process; the mapping address
/// is irrelevant thanks to the relative pointers.
pub struct FrozenBlob {
    storage: Storage,
}

impl FrozenBlob {
    pub fn map_file(path: &Path) -> Result<FrozenBlob> {
        let file = File::open(path)?;
        // Safety: the file is an index blob produced by the offline builder;
        // it is not mutated while mapped.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let blob = FrozenBlob {
            storage: Storage::Mapped(mmap),
        };
        blob.validate()?;
        Ok(blob)
    }

    /// Adopts a blob from memory, copying it into aligned storage.
    pub fn from_bytes(bytes: &[u8]) -> Result<FrozenBlob> {
        let blob = FrozenBlob {
            storage: Storage::Owned(AlignedBytes::copy_from(bytes)),
        };
        blob.validate()?;
        Ok(blob)
    }

    fn bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Mapped(m) => m,
            Storage::Owned(o) => o.as_bytes(),
        }
    }

    fn validate(&self) -> Result<()> {
        let bytes = self.bytes();
        if bytes.len() < std::mem::size_of::<FrozenIndex>() {
            return Err(Error::BadBlob(format!("blob too small: {}", bytes.len())));
        }
        if bytes.as_ptr() as usize % 8 != 0 {
            return Err(Error::BadBlob("blob is not 8-aligned".to_owned()));
        }
        let magic = u64::from_ne_bytes(bytes[..8].try_into().unwrap());
        if magic != FROZEN_MAGIC {
            return Err(Error::BadBlob(format!("bad magic {magic:#x}")));
        }
        Ok(())
    }

    pub fn index(&self) -> &FrozenIndex {
        // Safety: validated at construction.
        unsafe { &*(self.bytes().as_ptr() as *const FrozenIndex) }
    }
}
