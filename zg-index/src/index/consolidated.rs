//! The façade over the frozen and dynamic segments.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use itertools::{merge_join_by, EitherOrBoth};
use tracing::debug;

use crate::automaton::Dfa;
use crate::error::{Error, Result};
use crate::frozen::{FrozenPair, FrozenSet, StringRef};
use crate::records::{
    LogRecord, MetadataRecord, Reaction, RenderStyle, Zephyrgram, ZgramCore, ZgramRefersTo,
    ZgramRevision,
};
use crate::types::{LogLocation, WordInfo, WordOff, ZgramId, ZgramInfo, ZgramOff};

use super::dynamic::DynamicIndex;
use super::freeze;
use super::frozen::{FrozenBlob, FrozenIndex};
use super::plusplus;

/// Per-batch `++`/`--` deltas, keyed by zgram id then key.
pub type PpDeltaMap = BTreeMap<ZgramId, BTreeMap<String, i64>>;

/// External collaborator that fetches a zgram's current core from the log.
/// Needed when a revision arrives for a zgram that has no prior revision:
/// the original body must be scanned so its `++`/`--` counts can be netted
/// out.
pub trait ZgramResolver {
    fn resolve(&self, id: ZgramId, location: LogLocation) -> Result<ZgramCore>;
}

impl<F> ZgramResolver for F
where
    F: Fn(ZgramId, LogLocation) -> Result<ZgramCore>,
{
    fn resolve(&self, id: ZgramId, location: LogLocation) -> Result<ZgramCore> {
        self(id, location)
    }
}

/// Collects a batch's `++`/`--` deltas. Revision lookups that need the
/// original body are deferred and resolved once at the end of the batch.
#[derive(Default)]
struct PlusPlusTracker {
    delta_map: PpDeltaMap,
    pending: Vec<(ZgramId, LogLocation)>,
}

impl PlusPlusTracker {
    fn add_zgram(&mut self, zg: &Zephyrgram) {
        let inner = self.delta_map.entry(zg.zgram_id).or_default();
        plusplus::scan(&zg.core.body, 1, inner);
    }

    /// Scans a revision's new body and nets out the body it replaces: the
    /// latest prior revision if there is one, otherwise the original zgram
    /// (deferred to the resolver).
    fn add_metadata(&mut self, ci: &ConsolidatedIndex, record: &MetadataRecord) -> Result<()> {
        if let Some(id) = record.zgram_id() {
            if ci.find(id).is_none() {
                return Err(Error::UnknownZgramId(id));
            }
        }
        let MetadataRecord::Revision(rev) = record else {
            return Ok(());
        };

        let inner = self.delta_map.entry(rev.zgram_id).or_default();
        plusplus::scan(&rev.core.body, 1, inner);

        let prior = ci.revisions_for(rev.zgram_id);
        match prior.last() {
            Some(last) => plusplus::scan(&last.core.body, -1, inner),
            None => {
                let off = ci.find(rev.zgram_id).expect("checked above");
                self.pending
                    .push((rev.zgram_id, ci.get_zgram_info(off).location()));
            }
        }
        Ok(())
    }

    fn finish(mut self, resolver: &dyn ZgramResolver) -> Result<PpDeltaMap> {
        for (id, location) in std::mem::take(&mut self.pending) {
            let core = resolver.resolve(id, location)?;
            let inner = self.delta_map.entry(id).or_default();
            plusplus::scan(&core.body, -1, inner);
        }
        Ok(self.delta_map)
    }
}

fn no_resolver(id: ZgramId, _location: LogLocation) -> Result<ZgramCore> {
    Err(Error::Resolve {
        id,
        message: "no resolver available".to_owned(),
    })
}

/// The two-segment index, unified. Reads see the merge of both sides;
/// writes go to the dynamic side only.
pub struct ConsolidatedIndex {
    frozen: FrozenBlob,
    dynamic: DynamicIndex,
}

impl ConsolidatedIndex {
    /// An index with an empty frozen segment; everything ingested afterwards
    /// lives on the dynamic side.
    pub fn new_empty() -> ConsolidatedIndex {
        let blob = freeze::freeze_dynamic(&DynamicIndex::default(), 0, 0);
        ConsolidatedIndex {
            frozen: FrozenBlob::from_bytes(&blob).expect("empty index blob is valid"),
            dynamic: DynamicIndex::default(),
        }
    }

    /// Maps the frozen blob at `path`. The mapping lives as long as `self`.
    pub fn open(path: &Path) -> Result<ConsolidatedIndex> {
        Ok(ConsolidatedIndex {
            frozen: FrozenBlob::map_file(path)?,
            dynamic: DynamicIndex::default(),
        })
    }

    /// Adopts a frozen blob from memory (copying it into aligned storage).
    pub fn from_frozen_bytes(bytes: &[u8]) -> Result<ConsolidatedIndex> {
        Ok(ConsolidatedIndex {
            frozen: FrozenBlob::from_bytes(bytes)?,
            dynamic: DynamicIndex::default(),
        })
    }

    pub fn frozen(&self) -> &FrozenIndex {
        self.frozen.index()
    }

    pub fn dynamic(&self) -> &DynamicIndex {
        &self.dynamic
    }

    pub fn zgram_info_size(&self) -> usize {
        self.frozen().zgram_infos().len() + self.dynamic.zgram_infos().len()
    }

    pub fn word_info_size(&self) -> usize {
        self.frozen().word_infos().len() + self.dynamic.word_infos().len()
    }

    /// One past the largest indexed id, or id 0 when the index is empty.
    pub fn zgram_end(&self) -> ZgramId {
        self.dynamic
            .last_zgram_id()
            .or_else(|| self.frozen().last_zgram_id())
            .map_or(ZgramId::new(0), |id| id.next())
    }

    pub fn get_zgram_info(&self, off: ZgramOff) -> &ZgramInfo {
        let index = off.raw() as usize;
        let frozen = self.frozen().zgram_infos();
        if index < frozen.len() {
            return &frozen[index];
        }
        &self.dynamic.zgram_infos()[index - frozen.len()]
    }

    pub fn get_word_info(&self, off: WordOff) -> WordInfo {
        let index = off.raw() as usize;
        let frozen = self.frozen().word_infos();
        if index < frozen.len() {
            return frozen[index];
        }
        self.dynamic.word_infos()[index - frozen.len()]
    }

    /// First offset whose id is `>= id`; `zgram_info_size()` when past the
    /// end. Both segments are id-sorted, so each side takes one binary
    /// search.
    pub fn lower_bound_id(&self, id: ZgramId) -> ZgramOff {
        let frozen = self.frozen().zgram_infos();
        let fpos = frozen.partition_point(|info| info.zgram_id() < id);
        if fpos != frozen.len() {
            return ZgramOff::new(fpos as u32);
        }
        let dpos = self
            .dynamic
            .zgram_infos()
            .partition_point(|info| info.zgram_id() < id);
        ZgramOff::new((fpos + dpos) as u32)
    }

    /// First offset whose timestamp is `>= timesecs`.
    pub fn lower_bound_timestamp(&self, timesecs: u64) -> ZgramOff {
        let frozen = self.frozen().zgram_infos();
        let fpos = frozen.partition_point(|info| info.timesecs() < timesecs);
        if fpos != frozen.len() {
            return ZgramOff::new(fpos as u32);
        }
        let dpos = self
            .dynamic
            .zgram_infos()
            .partition_point(|info| info.timesecs() < timesecs);
        ZgramOff::new((fpos + dpos) as u32)
    }

    pub fn find(&self, id: ZgramId) -> Option<ZgramOff> {
        let off = self.lower_bound_id(id);
        if off.raw() as usize == self.zgram_info_size() || self.get_zgram_info(off).zgram_id() != id
        {
            return None;
        }
        Some(off)
    }

    /// Pattern lookup over both tries.
    pub fn find_matching(&self, dfa: &Dfa, callback: &mut dyn FnMut(&[WordOff])) {
        self.frozen().find_matching(dfa, callback);
        self.dynamic.trie().find_matching(dfa, callback);
    }

    /// The effective reactions on `id`: frozen entries not overridden by
    /// dynamic ones, plus dynamic additions. Only `value = true` rows are
    /// returned; a dynamic `false` suppresses a frozen `true`.
    pub fn reactions_for(&self, id: ZgramId) -> Vec<Reaction> {
        let pool = self.frozen().string_pool();
        let empty_f: &[FrozenPair<StringRef, FrozenSet<StringRef>>] = &[];
        let f_inner = self
            .frozen()
            .metadata()
            .reactions()
            .get(&id)
            .map_or(empty_f, |m| m.entries());
        let empty_d = BTreeMap::new();
        let d_inner = self
            .dynamic
            .metadata()
            .reactions()
            .get(&id)
            .unwrap_or(&empty_d);

        let mut result = Vec::new();
        let mut push = |reaction: &str, creator: &str, value: bool| {
            if value {
                result.push(Reaction {
                    zgram_id: id,
                    reaction: reaction.to_owned(),
                    creator: creator.to_owned(),
                    value: true,
                });
            }
        };

        for by_reaction in merge_join_by(f_inner, d_inner, |f, (d_name, _)| {
            pool.cmp_ref(f.key, d_name)
        }) {
            match by_reaction {
                EitherOrBoth::Left(f) => {
                    for &creator in f.value.as_slice() {
                        push(pool.get(f.key), pool.get(creator), true);
                    }
                }
                EitherOrBoth::Right((reaction, creators)) => {
                    for (creator, &value) in creators {
                        push(reaction, creator, value);
                    }
                }
                EitherOrBoth::Both(f, (reaction, d_creators)) => {
                    for by_creator in
                        merge_join_by(f.value.as_slice(), d_creators, |&&fc, (dc, _)| {
                            pool.cmp_ref(fc, dc)
                        })
                    {
                        match by_creator {
                            EitherOrBoth::Left(&fc) => push(reaction, pool.get(fc), true),
                            EitherOrBoth::Right((dc, &value))
                            | EitherOrBoth::Both(_, (dc, &value)) => push(reaction, dc, value),
                        }
                    }
                }
            }
        }
        result
    }

    /// All revisions of `id`, frozen first, then dynamic, each side in
    /// arrival order.
    pub fn revisions_for(&self, id: ZgramId) -> Vec<ZgramRevision> {
        let pool = self.frozen().string_pool();
        let mut result = Vec::new();
        if let Some(frozen_revs) = self.frozen().metadata().zgram_revisions().get(&id) {
            for rev in frozen_revs.as_slice() {
                result.push(ZgramRevision {
                    zgram_id: id,
                    core: ZgramCore::new(
                        pool.get(rev.instance),
                        pool.get(rev.body),
                        RenderStyle::from_raw(rev.render_style),
                    ),
                });
            }
        }
        if let Some(dynamic_revs) = self.dynamic.metadata().zgram_revisions().get(&id) {
            for core in dynamic_revs {
                result.push(ZgramRevision {
                    zgram_id: id,
                    core: core.clone(),
                });
            }
        }
        result
    }

    /// The valid cross-references out of `id`; dynamic wins, and a dynamic
    /// `false` hides a frozen reference.
    pub fn refers_to_for(&self, id: ZgramId) -> Vec<ZgramRefersTo> {
        let empty_f: &[ZgramId] = &[];
        let f_inner = self
            .frozen()
            .metadata()
            .zgram_refers_to()
            .get(&id)
            .map_or(empty_f, FrozenSet::as_slice);
        let empty_d = BTreeMap::new();
        let d_inner = self
            .dynamic
            .metadata()
            .zgram_refers_to()
            .get(&id)
            .unwrap_or(&empty_d);

        let mut result = Vec::new();
        for eob in merge_join_by(f_inner, d_inner, |f, (d, _)| f.cmp(d)) {
            let (target, value) = match eob {
                EitherOrBoth::Left(&f) => (f, true),
                EitherOrBoth::Right((&d, &value)) | EitherOrBoth::Both(_, (&d, &value)) => {
                    (d, value)
                }
            };
            if value {
                result.push(ZgramRefersTo {
                    zgram_id: id,
                    refers_to: target,
                    value: true,
                });
            }
        }
        result
    }

    /// Dynamic first, frozen fallback.
    pub fn zmojis(&self, user_id: &str) -> Option<&str> {
        if let Some(z) = self.dynamic.metadata().zmojis().get(user_id) {
            return Some(z.as_str());
        }
        let pool = self.frozen().string_pool();
        self.frozen()
            .metadata()
            .zmojis()
            .get_with(|k| pool.cmp_ref(*k, user_id))
            .map(|&v| pool.get(v))
    }

    /// The reaction-count entry at the largest id `<= relative_to`, dynamic
    /// side first, frozen side as fallback, zero when neither has one.
    pub fn reaction_count(&self, reaction: &str, relative_to: ZgramId) -> i64 {
        if let Some(inner) = self.dynamic.metadata().reaction_counts().get(reaction) {
            if let Some((_, &count)) = inner.range(..=relative_to).next_back() {
                return count;
            }
        }
        let pool = self.frozen().string_pool();
        if let Some(inner) = self
            .frozen()
            .metadata()
            .reaction_counts()
            .get_with(|k| pool.cmp_ref(*k, reaction))
        {
            let entries = inner.entries();
            let pos = entries.partition_point(|e| e.key <= relative_to);
            if pos > 0 {
                return entries[pos - 1].value;
            }
        }
        0
    }

    /// Net `++` count for `key` through `id`: the rank of `id` in each of
    /// the four sorted vectors, combined as `(f+ − f−) + (d+ − d−)`.
    pub fn plus_plus_count_after(&self, id: ZgramId, key: &str) -> i64 {
        let pool = self.frozen().string_pool();
        let frozen_rank = |map: &crate::frozen::FrozenMap<StringRef, crate::frozen::FrozenVector<ZgramId>>| {
            let Some(r) = pool.find(key) else { return 0 };
            map.get(&r)
                .map_or(0, |vec| vec.partition_point(|&z| z <= id) as i64)
        };
        let dynamic_rank = |map: &BTreeMap<String, Vec<ZgramId>>| {
            map.get(key)
                .map_or(0, |vec| vec.partition_point(|&z| z <= id) as i64)
        };

        let frozen_md = self.frozen().metadata();
        let dynamic_md = self.dynamic.metadata();
        frozen_rank(frozen_md.plus_pluses()) - frozen_rank(frozen_md.minus_minuses())
            + dynamic_rank(dynamic_md.plus_pluses())
            - dynamic_rank(dynamic_md.minus_minuses())
    }

    /// Every key mentioned as `key++`/`key--` by `id`, even net-zero ones.
    pub fn plus_plus_keys(&self, id: ZgramId) -> BTreeSet<String> {
        let pool = self.frozen().string_pool();
        let mut result = BTreeSet::new();
        if let Some(refs) = self.frozen().metadata().plus_plus_keys().get(&id) {
            for &r in refs.as_slice() {
                result.insert(pool.get(r).to_owned());
            }
        }
        if let Some(keys) = self.dynamic.metadata().plus_plus_keys().get(&id) {
            result.extend(keys.iter().cloned());
        }
        result
    }

    /// Indexes a batch of zgrams. Ids must strictly increase; violations
    /// abort before anything is applied.
    pub fn add_zgrams(&mut self, zgrams: &[(Zephyrgram, LogLocation)]) -> Result<PpDeltaMap> {
        let mut previous = self.zgram_end().raw().checked_sub(1).map(ZgramId::new);
        for (zg, _) in zgrams {
            if let Some(previous) = previous {
                if zg.zgram_id <= previous {
                    return Err(Error::NonMonotonicZgramId {
                        previous,
                        offered: zg.zgram_id,
                    });
                }
            }
            previous = Some(zg.zgram_id);
        }

        let mut tracker = PlusPlusTracker::default();
        for (zg, location) in zgrams {
            tracker.add_zgram(zg);
            self.dynamic.add_zgram(self.frozen.index(), zg, *location)?;
        }
        let delta_map = tracker.finish(&no_resolver)?;
        self.dynamic.batch_update_plus_plus(&delta_map);
        debug!(count = zgrams.len(), "indexed zgram batch");
        Ok(delta_map)
    }

    /// Applies a batch of metadata records. Every record that names a zgram
    /// must name one the index already has; violations abort before anything
    /// is applied.
    pub fn add_metadata(
        &mut self,
        records: &[MetadataRecord],
        resolver: &dyn ZgramResolver,
    ) -> Result<PpDeltaMap> {
        let mut tracker = PlusPlusTracker::default();
        for record in records {
            tracker.add_metadata(self, record)?;
        }
        for record in records {
            self.apply_metadata(record);
        }
        let delta_map = tracker.finish(resolver)?;
        self.dynamic.batch_update_plus_plus(&delta_map);
        debug!(count = records.len(), "applied metadata batch");
        Ok(delta_map)
    }

    /// Bootstrap path: replays an interleaved stream of log records in
    /// order. Records are applied one at a time so that metadata may refer
    /// to zgrams earlier in the same stream.
    pub fn add_log_records(
        &mut self,
        records: &[(LogRecord, LogLocation)],
        resolver: &dyn ZgramResolver,
    ) -> Result<PpDeltaMap> {
        let mut tracker = PlusPlusTracker::default();
        for (record, location) in records {
            match record {
                LogRecord::Zgram(zg) => {
                    tracker.add_zgram(zg);
                    self.dynamic.add_zgram(self.frozen.index(), zg, *location)?;
                }
                LogRecord::Metadata(mr) => {
                    tracker.add_metadata(self, mr)?;
                    self.apply_metadata(mr);
                }
            }
        }
        let delta_map = tracker.finish(resolver)?;
        self.dynamic.batch_update_plus_plus(&delta_map);
        debug!(count = records.len(), "replayed log records");
        Ok(delta_map)
    }

    fn apply_metadata(&mut self, record: &MetadataRecord) {
        let frozen = self.frozen.index();
        match record {
            MetadataRecord::Reaction(r) => self.dynamic.add_reaction(frozen, r),
            MetadataRecord::Revision(r) => self.dynamic.add_revision(r),
            MetadataRecord::RefersTo(r) => self.dynamic.add_refers_to(r),
            MetadataRecord::Zmojis(z) => self.dynamic.add_zmojis(z),
        }
    }

    /// Serializes the whole index into a fresh frozen blob. Only defined
    /// when the frozen side is empty: merging two tiers is the offline
    /// builder's job.
    pub fn freeze(&self) -> Result<Vec<u8>> {
        let frozen = self.frozen();
        if !frozen.zgram_infos().is_empty()
            || !frozen.word_infos().is_empty()
            || !frozen.string_pool().is_empty()
        {
            return Err(Error::CannotRefreeze);
        }
        Ok(freeze::freeze_dynamic(
            &self.dynamic,
            frozen.logged_end(),
            frozen.unlogged_end(),
        ))
    }
}
