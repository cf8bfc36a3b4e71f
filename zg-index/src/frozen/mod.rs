/*!
Relocation-free data structures for the frozen index blob.

Every pointer inside the blob is a signed 64-bit offset *relative to its own
storage address*, so the blob can be mapped anywhere (or copied into an owned
buffer) without fixups. The distinguished null offset is `+1`: `0` cannot
serve because a structure may legitimately point at itself.

The containers here are read-side views. They are built by
[`blob::BlobBuilder`], which writes structures into a byte buffer and patches
the relative offsets once both ends of each pointer are placed.
*/

use std::cmp::Ordering;
use std::marker::PhantomData;

pub mod blob;

/// A self-relative pointer. Never `Copy`/`Clone`: its meaning depends on
/// where it is stored.
#[repr(C)]
pub struct RelPtr<T> {
    offset: i64,
    _marker: PhantomData<*const T>,
}

impl<T> RelPtr<T> {
    pub(crate) const NULL_OFFSET: i64 = 1;

    pub fn is_null(&self) -> bool {
        self.offset == Self::NULL_OFFSET
    }

    /// Resolves the pointer.
    ///
    /// # Safety
    /// `self` must live inside a blob produced by [`blob::BlobBuilder`] (or
    /// an equivalent external builder), with the target of the offset being
    /// a valid, aligned `T` inside the same blob.
    pub unsafe fn deref(&self) -> Option<&T> {
        if self.is_null() {
            return None;
        }
        let base = self as *const Self as *const u8;
        Some(&*(base.offset(self.offset as isize) as *const T))
    }
}

/// A `(pointer, length)` array inside the blob.
#[repr(C)]
pub struct FrozenVector<T> {
    data: RelPtr<T>,
    len: u64,
}

impl<T> FrozenVector<T> {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        // Safety: builder invariant: `data` points at `len` packed `T`s.
        match unsafe { self.data.deref() } {
            None => &[],
            Some(first) => unsafe {
                std::slice::from_raw_parts(first as *const T, self.len as usize)
            },
        }
    }
}

impl<T> std::ops::Deref for FrozenVector<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

/// `std::pair` stand-in with a guaranteed layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FrozenPair<K, V> {
    pub key: K,
    pub value: V,
}

/// A sorted association list with binary-search lookup.
#[repr(C)]
pub struct FrozenMap<K, V> {
    entries: FrozenVector<FrozenPair<K, V>>,
}

impl<K, V> FrozenMap<K, V> {
    pub fn entries(&self) -> &[FrozenPair<K, V>] {
        self.entries.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup under a caller-supplied ordering of the keys. Useful when the
    /// key is a [`StringRef`] that must be compared through the pool.
    pub fn get_with<F>(&self, mut cmp: F) -> Option<&V>
    where
        F: FnMut(&K) -> Ordering,
    {
        let entries = self.entries();
        entries
            .binary_search_by(|e| cmp(&e.key))
            .ok()
            .map(|i| &entries[i].value)
    }

    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: Ord,
    {
        self.get_with(|k| k.cmp(key))
    }
}

/// A sorted, unique sequence.
#[repr(C)]
pub struct FrozenSet<T> {
    items: FrozenVector<T>,
}

impl<T> FrozenSet<T> {
    pub fn as_slice(&self) -> &[T] {
        self.items.as_slice()
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: Ord,
    {
        self.as_slice().binary_search(item).is_ok()
    }
}

/// Index of an interned string inside a [`FrozenStringPool`].
///
/// The pool is sorted, so comparing refs compares the strings they denote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct StringRef(pub(crate) u32);

/// Interned, sorted string storage: `offsets` has one more entry than there
/// are strings; string `i` occupies `bytes[offsets[i]..offsets[i + 1]]`.
#[repr(C)]
pub struct FrozenStringPool {
    pub(crate) offsets: FrozenVector<u32>,
    pub(crate) bytes: FrozenVector<u8>,
}

impl FrozenStringPool {
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, r: StringRef) -> &str {
        let offsets = self.offsets.as_slice();
        let i = r.0 as usize;
        let bytes = &self.bytes.as_slice()[offsets[i] as usize..offsets[i + 1] as usize];
        // Safety: the pool is built from `str`s.
        unsafe { std::str::from_utf8_unchecked(bytes) }
    }

    pub fn find(&self, probe: &str) -> Option<StringRef> {
        let n = self.len();
        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = (lo + hi) / 2;
            match self.get(StringRef(mid as u32)).cmp(probe) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(StringRef(mid as u32)),
            }
        }
        None
    }

    /// Compares the string named by `r` against `probe`.
    pub fn cmp_ref(&self, r: StringRef, probe: &str) -> Ordering {
        self.get(r).cmp(probe)
    }
}
