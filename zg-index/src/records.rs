//! The in-memory shapes of log records the engine ingests.
//!
//! The wire encoding is an external concern; ingestion consumes these
//! pre-parsed structures only.

use crate::types::ZgramId;

/// How a zgram body should be rendered. Opaque to the search core but
/// preserved through revisions.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum RenderStyle {
    #[default]
    Default,
    MarkDeepMathJax,
}

impl RenderStyle {
    pub(crate) fn as_raw(self) -> u32 {
        match self {
            RenderStyle::Default => 0,
            RenderStyle::MarkDeepMathJax => 1,
        }
    }

    pub(crate) fn from_raw(raw: u32) -> RenderStyle {
        match raw {
            1 => RenderStyle::MarkDeepMathJax,
            _ => RenderStyle::Default,
        }
    }
}

/// The user-editable part of a zgram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZgramCore {
    /// The conversation instance, e.g. `help.cheese.shared`.
    pub instance: String,
    /// The message body.
    pub body: String,
    pub render_style: RenderStyle,
}

impl ZgramCore {
    pub fn new(
        instance: impl Into<String>,
        body: impl Into<String>,
        render_style: RenderStyle,
    ) -> ZgramCore {
        ZgramCore {
            instance: instance.into(),
            body: body.into(),
            render_style,
        }
    }

    /// A core with the default render style.
    pub fn plain(instance: impl Into<String>, body: impl Into<String>) -> ZgramCore {
        ZgramCore::new(instance, body, RenderStyle::Default)
    }
}

/// A complete message as it appears in the log.
#[derive(Clone, Debug)]
pub struct Zephyrgram {
    pub zgram_id: ZgramId,
    /// Seconds since the epoch; non-decreasing across the stream.
    pub timesecs: u64,
    pub sender: String,
    pub signature: String,
    /// Unlogged zgrams are not backed up and eventually expire.
    pub is_logged: bool,
    pub core: ZgramCore,
}

/// A reaction toggle: `creator` set (`value = true`) or cleared
/// (`value = false`) `reaction` on `zgram_id`.
#[derive(Clone, Debug)]
pub struct Reaction {
    pub zgram_id: ZgramId,
    pub reaction: String,
    pub creator: String,
    pub value: bool,
}

/// A replacement body/instance for an already-indexed zgram.
#[derive(Clone, Debug)]
pub struct ZgramRevision {
    pub zgram_id: ZgramId,
    pub core: ZgramCore,
}

/// A cross-reference from `zgram_id` to `refers_to`; `value = false` retracts
/// an earlier (possibly frozen) reference.
#[derive(Clone, Debug)]
pub struct ZgramRefersTo {
    pub zgram_id: ZgramId,
    pub refers_to: ZgramId,
    pub value: bool,
}

/// A user's string of frequently used emoji.
#[derive(Clone, Debug)]
pub struct Zmojis {
    pub user_id: String,
    pub zmojis: String,
}

#[derive(Clone, Debug)]
pub enum MetadataRecord {
    Reaction(Reaction),
    Revision(ZgramRevision),
    RefersTo(ZgramRefersTo),
    Zmojis(Zmojis),
}

impl MetadataRecord {
    /// The zgram this record is about, if it is about one.
    pub fn zgram_id(&self) -> Option<ZgramId> {
        match self {
            MetadataRecord::Reaction(r) => Some(r.zgram_id),
            MetadataRecord::Revision(r) => Some(r.zgram_id),
            MetadataRecord::RefersTo(r) => Some(r.zgram_id),
            MetadataRecord::Zmojis(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum LogRecord {
    Zgram(Zephyrgram),
    Metadata(MetadataRecord),
}
