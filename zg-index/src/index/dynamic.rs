//! The mutable index segment.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::fields::FieldTag;
use crate::records::{Reaction, Zephyrgram, ZgramCore, ZgramRefersTo, ZgramRevision, Zmojis};
use crate::syntax::words;
use crate::trie::DynamicTrie;
use crate::types::{LogLocation, WordInfo, WordOff, ZgramId, ZgramInfo, ZgramOff};

use super::frozen::FrozenIndex;

/// The mutable halves of the metadata tables. Same logical relations as the
/// frozen tables, held in ordinary ordered containers.
#[derive(Default)]
pub struct DynamicMetadata {
    /// zgram id → reaction → creator → toggled on/off. An explicit `false`
    /// suppresses a frozen `true`.
    reactions: BTreeMap<ZgramId, BTreeMap<String, BTreeMap<String, bool>>>,
    /// reaction → zgram id → net toggles applied since the freeze (a delta
    /// over the frozen count, possibly negative).
    reaction_counts: BTreeMap<String, BTreeMap<ZgramId, i64>>,
    /// zgram id → revisions, in arrival order.
    zgram_revisions: BTreeMap<ZgramId, Vec<ZgramCore>>,
    /// zgram id → target → valid. `false` hides a frozen reference.
    zgram_refers_to: BTreeMap<ZgramId, BTreeMap<ZgramId, bool>>,
    /// user id → zmojis.
    zmojis: BTreeMap<String, String>,
    /// key → sorted ids of `key++` events; the rank of an id gives the
    /// running total. Kept sorted on insertion; the dynamic segment is small
    /// enough that the shifting does not matter.
    plus_pluses: BTreeMap<String, Vec<ZgramId>>,
    minus_minuses: BTreeMap<String, Vec<ZgramId>>,
    /// Every key mentioned by a zgram, even when the mentions net to zero.
    plus_plus_keys: BTreeMap<ZgramId, BTreeSet<String>>,
}

impl DynamicMetadata {
    pub fn reactions(&self) -> &BTreeMap<ZgramId, BTreeMap<String, BTreeMap<String, bool>>> {
        &self.reactions
    }

    pub fn reaction_counts(&self) -> &BTreeMap<String, BTreeMap<ZgramId, i64>> {
        &self.reaction_counts
    }

    pub fn zgram_revisions(&self) -> &BTreeMap<ZgramId, Vec<ZgramCore>> {
        &self.zgram_revisions
    }

    pub fn zgram_refers_to(&self) -> &BTreeMap<ZgramId, BTreeMap<ZgramId, bool>> {
        &self.zgram_refers_to
    }

    pub fn zmojis(&self) -> &BTreeMap<String, String> {
        &self.zmojis
    }

    pub fn plus_pluses(&self) -> &BTreeMap<String, Vec<ZgramId>> {
        &self.plus_pluses
    }

    pub fn minus_minuses(&self) -> &BTreeMap<String, Vec<ZgramId>> {
        &self.minus_minuses
    }

    pub fn plus_plus_keys(&self) -> &BTreeMap<ZgramId, BTreeSet<String>> {
        &self.plus_plus_keys
    }

    /// The currently effective reaction state: dynamic overrides frozen.
    fn effective_reaction(&self, frozen: &FrozenIndex, r: &Reaction) -> bool {
        if let Some(value) = self
            .reactions
            .get(&r.zgram_id)
            .and_then(|inner| inner.get(&r.reaction))
            .and_then(|inner| inner.get(&r.creator))
        {
            return *value;
        }

        let pool = frozen.string_pool();
        let Some(inner) = frozen.metadata().reactions().get(&r.zgram_id) else {
            return false;
        };
        let Some(creators) = inner.get_with(|k| pool.cmp_ref(*k, &r.reaction)) else {
            return false;
        };
        pool.find(&r.creator)
            .is_some_and(|cr| creators.contains(&cr))
    }

    fn add_reaction(&mut self, frozen: &FrozenIndex, r: &Reaction) {
        if self.effective_reaction(frozen, r) == r.value {
            return;
        }
        self.reactions
            .entry(r.zgram_id)
            .or_default()
            .entry(r.reaction.clone())
            .or_default()
            .insert(r.creator.clone(), r.value);
        let delta = if r.value { 1 } else { -1 };
        *self
            .reaction_counts
            .entry(r.reaction.clone())
            .or_default()
            .entry(r.zgram_id)
            .or_insert(0) += delta;
    }
}

/// The mutable index segment: dynamic trie, table tails, and metadata.
/// Grows as log records arrive; reset when a checkpoint produces a new
/// frozen segment.
#[derive(Default)]
pub struct DynamicIndex {
    trie: DynamicTrie,
    zgram_infos: Vec<ZgramInfo>,
    word_infos: Vec<WordInfo>,
    metadata: DynamicMetadata,
}

impl DynamicIndex {
    pub fn trie(&self) -> &DynamicTrie {
        &self.trie
    }

    pub fn zgram_infos(&self) -> &[ZgramInfo] {
        &self.zgram_infos
    }

    pub fn word_infos(&self) -> &[WordInfo] {
        &self.word_infos
    }

    pub fn metadata(&self) -> &DynamicMetadata {
        &self.metadata
    }

    pub fn last_zgram_id(&self) -> Option<ZgramId> {
        self.zgram_infos.last().map(ZgramInfo::zgram_id)
    }

    /// Splits the four fields into words, appends their descriptors in field
    /// order, feeds the dynamic trie, and appends the zgram descriptor.
    pub(super) fn add_zgram(
        &mut self,
        frozen: &FrozenIndex,
        zg: &Zephyrgram,
        location: LogLocation,
    ) -> Result<()> {
        let previous = self.last_zgram_id().or_else(|| frozen.last_zgram_id());
        if let Some(previous) = previous {
            if zg.zgram_id <= previous {
                return Err(Error::NonMonotonicZgramId {
                    previous,
                    offered: zg.zgram_id,
                });
            }
        }

        let zgram_off = ZgramOff::new((frozen.zgram_infos().len() + self.zgram_infos.len()) as u32);
        let starting_word_off =
            WordOff::new((frozen.word_infos().len() + self.word_infos.len()) as u32);

        let fields: [(&str, FieldTag); 4] = [
            (&zg.sender, FieldTag::Sender),
            (&zg.signature, FieldTag::Signature),
            (&zg.core.instance, FieldTag::Instance),
            (&zg.core.body, FieldTag::Body),
        ];
        let tokens: Vec<Vec<&str>> = fields.iter().map(|(text, _)| words::split(text)).collect();

        // Validate everything before touching the trie or the tables, so a
        // rejected zgram leaves the index unchanged.
        let info = ZgramInfo::new(
            zg.timesecs,
            location,
            starting_word_off,
            zg.zgram_id,
            tokens[0].len(),
            tokens[1].len(),
            tokens[2].len(),
            tokens[3].len(),
        )?;
        let word_info_by_tag: [WordInfo; 4] = [
            WordInfo::new(zgram_off, FieldTag::Sender)?,
            WordInfo::new(zgram_off, FieldTag::Signature)?,
            WordInfo::new(zgram_off, FieldTag::Instance)?,
            WordInfo::new(zgram_off, FieldTag::Body)?,
        ];

        let mut scratch = Vec::new();
        let mut word_off = starting_word_off;
        for (field_tokens, word_info) in tokens.iter().zip(word_info_by_tag) {
            for token in field_tokens {
                scratch.clear();
                scratch.extend(token.chars());
                self.word_infos.push(word_info);
                self.trie.insert(&scratch, &[word_off]);
                word_off = word_off.add(1);
            }
        }
        self.zgram_infos.push(info);
        Ok(())
    }

    pub(super) fn add_reaction(&mut self, frozen: &FrozenIndex, r: &Reaction) {
        self.metadata.add_reaction(frozen, r);
    }

    pub(super) fn add_revision(&mut self, r: &ZgramRevision) {
        self.metadata
            .zgram_revisions
            .entry(r.zgram_id)
            .or_default()
            .push(r.core.clone());
    }

    pub(super) fn add_refers_to(&mut self, r: &ZgramRefersTo) {
        self.metadata
            .zgram_refers_to
            .entry(r.zgram_id)
            .or_default()
            .insert(r.refers_to, r.value);
    }

    pub(super) fn add_zmojis(&mut self, z: &Zmojis) {
        self.metadata
            .zmojis
            .insert(z.user_id.clone(), z.zmojis.clone());
    }

    /// Applies one batch's worth of `++`/`--` deltas. For `delta > 0`,
    /// `delta` copies of the id go into the plus vector; likewise for minus.
    /// A zero delta inserts one copy on each side so the mention is still
    /// visible to dependency tracking.
    pub(super) fn batch_update_plus_plus(
        &mut self,
        delta_map: &BTreeMap<ZgramId, BTreeMap<String, i64>>,
    ) {
        fn add_entries(
            which: &mut BTreeMap<String, Vec<ZgramId>>,
            key: &str,
            zgram_id: ZgramId,
            count: usize,
        ) {
            let vec = which.entry(key.to_owned()).or_default();
            let at = vec.partition_point(|&id| id <= zgram_id);
            vec.splice(at..at, std::iter::repeat_n(zgram_id, count));
        }

        for (&zgram_id, inner) in delta_map {
            for (key, &count) in inner {
                self.metadata
                    .plus_plus_keys
                    .entry(zgram_id)
                    .or_default()
                    .insert(key.clone());
                match count.cmp(&0) {
                    std::cmp::Ordering::Greater => {
                        add_entries(&mut self.metadata.plus_pluses, key, zgram_id, count as usize);
                    }
                    std::cmp::Ordering::Less => {
                        add_entries(
                            &mut self.metadata.minus_minuses,
                            key,
                            zgram_id,
                            (-count) as usize,
                        );
                    }
                    std::cmp::Ordering::Equal => {
                        add_entries(&mut self.metadata.plus_pluses, key, zgram_id, 1);
                        add_entries(&mut self.metadata.minus_minuses, key, zgram_id, 1);
                    }
                }
            }
        }
    }
}
