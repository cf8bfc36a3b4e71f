//! The four zgram fields and masks over them.

use std::fmt;

use bitflags::bitflags;

/// Which of a zgram's four fields a word came from. The numeric values are
/// load-bearing: they are the packing order inside a word descriptor and the
/// field order of the word array (`sender ∥ signature ∥ instance ∥ body`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FieldTag {
    Sender = 0,
    Signature = 1,
    Instance = 2,
    Body = 3,
}

impl FieldTag {
    pub const COUNT: usize = 4;

    /// All tags, in field order.
    pub const ALL: [FieldTag; 4] = [
        FieldTag::Sender,
        FieldTag::Signature,
        FieldTag::Instance,
        FieldTag::Body,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldTag::Sender => "sender",
            FieldTag::Signature => "signature",
            FieldTag::Instance => "instance",
            FieldTag::Body => "body",
        }
    }

    pub fn parse(text: &str) -> Option<FieldTag> {
        match text {
            "sender" => Some(FieldTag::Sender),
            "signature" => Some(FieldTag::Signature),
            "instance" => Some(FieldTag::Instance),
            "body" => Some(FieldTag::Body),
            _ => None,
        }
    }

    pub(crate) fn from_raw(raw: u8) -> FieldTag {
        match raw {
            0 => FieldTag::Sender,
            1 => FieldTag::Signature,
            2 => FieldTag::Instance,
            3 => FieldTag::Body,
            _ => unreachable!("field tag out of range: {raw}"),
        }
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// A set of [`FieldTag`]s.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FieldMask: u8 {
        const SENDER = 1 << 0;
        const SIGNATURE = 1 << 1;
        const INSTANCE = 1 << 2;
        const BODY = 1 << 3;
    }
}

impl FieldMask {
    /// The mask an unscoped query term searches: `sender|instance|body`.
    pub const DEFAULT: FieldMask = FieldMask::SENDER
        .union(FieldMask::INSTANCE)
        .union(FieldMask::BODY);

    pub fn of(tag: FieldTag) -> FieldMask {
        FieldMask::from_bits_retain(1 << tag as u8)
    }

    pub fn contains_tag(self, tag: FieldTag) -> bool {
        self.contains(FieldMask::of(tag))
    }
}

impl fmt::Display for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let mut sep = "";
        for tag in FieldTag::ALL {
            if self.contains_tag(tag) {
                write!(f, "{sep}{}", tag.name())?;
                sep = "|";
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_display() {
        assert_eq!(FieldMask::empty().to_string(), "(none)");
        assert_eq!(FieldMask::of(FieldTag::Body).to_string(), "body");
        assert_eq!(
            (FieldMask::INSTANCE | FieldMask::BODY).to_string(),
            "instance|body"
        );
        assert_eq!(
            FieldMask::all().to_string(),
            "sender|signature|instance|body"
        );
    }

    #[test]
    fn default_mask() {
        assert!(FieldMask::DEFAULT.contains_tag(FieldTag::Sender));
        assert!(!FieldMask::DEFAULT.contains_tag(FieldTag::Signature));
        assert!(FieldMask::DEFAULT.contains_tag(FieldTag::Instance));
        assert!(FieldMask::DEFAULT.contains_tag(FieldTag::Body));
    }

    #[test]
    fn tag_round_trip() {
        for tag in FieldTag::ALL {
            assert_eq!(FieldTag::parse(tag.name()), Some(tag));
            assert_eq!(FieldTag::from_raw(tag as u8), tag);
        }
        assert_eq!(FieldTag::parse("subject"), None);
    }
}
