//! Identifiers, offsets, and the fixed-size index descriptors.
//!
//! Three coordinate systems coexist:
//!
//! - [`ZgramId`]: the producer-assigned 64-bit identifier. Monotone but not
//!   dense (gaps are permitted).
//! - [`ZgramOff`] / [`WordOff`]: dense sequential indices into the zgram-info
//!   and word-info tables.
//! - [`ZgramRel`] / [`WordRel`]: direction-aware coordinates used by the
//!   iterator algebra. Equal to the offset in forward mode and to
//!   `u32::MAX - 1 - off` in reverse mode, so every iterator sees a strictly
//!   increasing stream regardless of query direction.

use std::fmt;

use crate::error::{Error, Result};
use crate::fields::FieldTag;

/// Producer-assigned message identifier. Monotonically non-decreasing,
/// mostly dense.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ZgramId(u64);

impl ZgramId {
    pub const fn new(raw: u64) -> ZgramId {
        ZgramId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> ZgramId {
        ZgramId(self.0 + 1)
    }
}

impl fmt::Display for ZgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

macro_rules! dense_offset {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(raw: u32) -> $name {
                $name(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }

            pub const fn add(self, n: u32) -> $name {
                $name(self.0 + n)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

dense_offset! {
    /// Dense index into the zgram-info table.
    ZgramOff
}
dense_offset! {
    /// Dense index into the word-info table.
    WordOff
}
dense_offset! {
    /// Direction-aware zgram coordinate (see module docs).
    ZgramRel
}
dense_offset! {
    /// Direction-aware word coordinate (see module docs).
    WordRel
}

impl WordRel {
    pub(crate) const fn sub(self, n: u32) -> WordRel {
        WordRel(self.0 - n)
    }
}

/// Where a record lives in the append-only log. Opaque to the search core;
/// carried so external collaborators (and the revision resolver) can fetch
/// record bodies.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct LogLocation {
    position: u64,
    length: u32,
    // Explicit padding: the descriptor must have no implicit padding bytes.
    _reserved: u32,
}

impl LogLocation {
    pub const fn new(position: u64, length: u32) -> LogLocation {
        LogLocation {
            position,
            length,
            _reserved: 0,
        }
    }

    pub const fn position(self) -> u64 {
        self.position
    }

    pub const fn length(self) -> u32 {
        self.length
    }
}

/// Fixed-size per-message descriptor. The four word lengths locate each
/// field's words inside the global word array: the concatenation
/// `sender ∥ signature ∥ instance ∥ body` starts at `starting_word_off`.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct ZgramInfo {
    timesecs: u64,
    zgram_id: ZgramId,
    location: LogLocation,
    starting_word_off: WordOff,
    sender_word_length: u16,
    signature_word_length: u16,
    instance_word_length: u16,
    body_word_length: u16,
    // Explicit padding: the descriptor must have no implicit padding bytes.
    _reserved: u32,
}

impl ZgramInfo {
    /// Fails if any per-field word count overflows its 16-bit slot.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timesecs: u64,
        location: LogLocation,
        starting_word_off: WordOff,
        zgram_id: ZgramId,
        sender_words: usize,
        signature_words: usize,
        instance_words: usize,
        body_words: usize,
    ) -> Result<ZgramInfo> {
        let check = |field, count: usize| -> Result<u16> {
            u16::try_from(count).map_err(|_| Error::FieldCountOverflow { field, count })
        };
        Ok(ZgramInfo {
            timesecs,
            zgram_id,
            location,
            starting_word_off,
            sender_word_length: check(FieldTag::Sender, sender_words)?,
            signature_word_length: check(FieldTag::Signature, signature_words)?,
            instance_word_length: check(FieldTag::Instance, instance_words)?,
            body_word_length: check(FieldTag::Body, body_words)?,
            _reserved: 0,
        })
    }

    pub fn timesecs(&self) -> u64 {
        self.timesecs
    }

    pub fn zgram_id(&self) -> ZgramId {
        self.zgram_id
    }

    pub fn location(&self) -> LogLocation {
        self.location
    }

    pub fn starting_word_off(&self) -> WordOff {
        self.starting_word_off
    }

    pub fn field_word_length(&self, tag: FieldTag) -> u32 {
        (match tag {
            FieldTag::Sender => self.sender_word_length,
            FieldTag::Signature => self.signature_word_length,
            FieldTag::Instance => self.instance_word_length,
            FieldTag::Body => self.body_word_length,
        }) as u32
    }

    pub fn total_word_length(&self) -> u32 {
        self.sender_word_length as u32
            + self.signature_word_length as u32
            + self.instance_word_length as u32
            + self.body_word_length as u32
    }
}

/// Per-word descriptor: the owning zgram offset and the field the word came
/// from, packed into one `u32` (30 + 2 bits). Ordering is
/// `(zgram_off, field_tag)`, which the packing gives for free.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct WordInfo(u32);

impl WordInfo {
    const TAG_BITS: u32 = 2;
    const MAX_ZGRAM_OFF: u32 = (1 << (32 - Self::TAG_BITS)) - 1;

    pub fn new(zgram_off: ZgramOff, field_tag: FieldTag) -> Result<WordInfo> {
        if zgram_off.raw() > Self::MAX_ZGRAM_OFF {
            return Err(Error::ZgramOffsetOverflow(zgram_off.raw()));
        }
        Ok(WordInfo(
            (zgram_off.raw() << Self::TAG_BITS) | field_tag as u32,
        ))
    }

    pub fn zgram_off(self) -> ZgramOff {
        ZgramOff::new(self.0 >> Self::TAG_BITS)
    }

    pub fn field_tag(self) -> FieldTag {
        FieldTag::from_raw((self.0 & ((1 << Self::TAG_BITS) - 1)) as u8)
    }
}

impl fmt::Display for WordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[zg={}/{}]", self.zgram_off(), self.field_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_info_packing() {
        let wi = WordInfo::new(ZgramOff::new(12345), FieldTag::Instance).unwrap();
        assert_eq!(wi.zgram_off(), ZgramOff::new(12345));
        assert_eq!(wi.field_tag(), FieldTag::Instance);
    }

    #[test]
    fn word_info_ordering() {
        let a = WordInfo::new(ZgramOff::new(1), FieldTag::Body).unwrap();
        let b = WordInfo::new(ZgramOff::new(2), FieldTag::Sender).unwrap();
        assert!(a < b);
        let c = WordInfo::new(ZgramOff::new(2), FieldTag::Body).unwrap();
        assert!(b < c);
    }

    #[test]
    fn word_info_overflow() {
        assert!(WordInfo::new(ZgramOff::new(u32::MAX), FieldTag::Body).is_err());
    }

    #[test]
    fn zgram_info_field_lengths() {
        let info = ZgramInfo::new(
            7,
            LogLocation::new(0, 10),
            WordOff::new(100),
            ZgramId::new(42),
            1,
            2,
            3,
            4,
        )
        .unwrap();
        assert_eq!(info.field_word_length(FieldTag::Sender), 1);
        assert_eq!(info.field_word_length(FieldTag::Body), 4);
        assert_eq!(info.total_word_length(), 10);
    }

    #[test]
    fn zgram_info_overflow() {
        let r = ZgramInfo::new(
            0,
            LogLocation::default(),
            WordOff::new(0),
            ZgramId::new(0),
            0,
            0,
            0,
            1 << 17,
        );
        assert!(matches!(
            r,
            Err(Error::FieldCountOverflow {
                field: FieldTag::Body,
                ..
            })
        ));
    }
}
