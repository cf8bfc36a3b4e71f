//! Serializing a fully-dynamic index into a frozen blob.
//!
//! This is the in-repo edition of what the offline builder does after a
//! checkpoint. It only handles an index whose frozen side is empty; merging
//! an existing frozen segment with the dynamic tail is the builder's job.

use std::collections::BTreeMap;
use std::mem::{align_of, offset_of, size_of};

use tracing::debug;

use crate::frozen::blob::BlobBuilder;
use crate::frozen::{FrozenMap, FrozenPair, FrozenSet, FrozenStringPool, StringRef};
use crate::trie;
use crate::types::ZgramId;

use super::dynamic::DynamicIndex;
use super::frozen::{FrozenIndex, FrozenMetadata, FrozenRevision, FROZEN_MAGIC};

trait PatchKey: Copy {
    fn patch(self, b: &mut BlobBuilder, pos: usize);
}

impl PatchKey for ZgramId {
    fn patch(self, b: &mut BlobBuilder, pos: usize) {
        b.patch_u64(pos, self.raw());
    }
}

impl PatchKey for StringRef {
    fn patch(self, b: &mut BlobBuilder, pos: usize) {
        b.patch_u32(pos, self.0);
    }
}

/// Writes a `FrozenMap<K, V>` whose values contain pointers: reserve the
/// entry array, patch each key, and let `write_value` fill in each value
/// slot (appending its payload after the array).
fn write_map_with<K: PatchKey, V, T>(
    b: &mut BlobBuilder,
    map_pos: usize,
    items: &[(K, T)],
    write_value: impl Fn(&mut BlobBuilder, usize, &T),
) {
    let entry_size = size_of::<FrozenPair<K, V>>();
    let key_off = offset_of!(FrozenPair<K, V>, key);
    let value_off = offset_of!(FrozenPair<K, V>, value);
    let base = b.reserve(entry_size * items.len(), align_of::<FrozenPair<K, V>>());
    for (i, (key, value)) in items.iter().enumerate() {
        let entry_pos = base + i * entry_size;
        key.patch(b, entry_pos + key_off);
        write_value(b, entry_pos + value_off, value);
    }
    b.set_vector(map_pos, base, items.len());
}

/// Sorted string interning for the pool. Refs are handed out in string
/// order, so ref comparison is string comparison.
struct PoolBuilder<'a> {
    refs: BTreeMap<&'a str, StringRef>,
}

impl<'a> PoolBuilder<'a> {
    fn new(mut strings: Vec<&'a str>) -> PoolBuilder<'a> {
        strings.sort_unstable();
        strings.dedup();
        PoolBuilder {
            refs: strings
                .into_iter()
                .enumerate()
                .map(|(i, s)| (s, StringRef(i as u32)))
                .collect(),
        }
    }

    fn r(&self, s: &str) -> StringRef {
        self.refs[s]
    }

    fn write(&self, b: &mut BlobBuilder, pool_pos: usize) {
        let mut offsets = Vec::with_capacity(self.refs.len() + 1);
        let mut bytes = Vec::new();
        offsets.push(0u32);
        for &s in self.refs.keys() {
            bytes.extend_from_slice(s.as_bytes());
            offsets.push(bytes.len() as u32);
        }
        b.write_vector(pool_pos + offset_of!(FrozenStringPool, offsets), &offsets);
        b.write_vector(pool_pos + offset_of!(FrozenStringPool, bytes), &bytes);
    }
}

pub(super) fn freeze_dynamic(dynamic: &DynamicIndex, logged_end: u64, unlogged_end: u64) -> Vec<u8> {
    let md = dynamic.metadata();

    // Filtered views of the metadata: only effective state survives a
    // freeze. Reactions keep `true` creators; refers-to keeps valid targets;
    // zero reaction-count entries are dropped.
    let reactions: Vec<(ZgramId, Vec<(&str, Vec<&str>)>)> = md
        .reactions()
        .iter()
        .filter_map(|(&id, by_reaction)| {
            let inner: Vec<(&str, Vec<&str>)> = by_reaction
                .iter()
                .filter_map(|(reaction, creators)| {
                    let on: Vec<&str> = creators
                        .iter()
                        .filter(|(_, &v)| v)
                        .map(|(c, _)| c.as_str())
                        .collect();
                    (!on.is_empty()).then_some((reaction.as_str(), on))
                })
                .collect();
            (!inner.is_empty()).then_some((id, inner))
        })
        .collect();

    let reaction_counts: Vec<(&str, Vec<(ZgramId, i64)>)> = md
        .reaction_counts()
        .iter()
        .filter_map(|(reaction, by_id)| {
            let inner: Vec<(ZgramId, i64)> = by_id
                .iter()
                .filter(|(_, &count)| count != 0)
                .map(|(&id, &count)| (id, count))
                .collect();
            (!inner.is_empty()).then_some((reaction.as_str(), inner))
        })
        .collect();

    let refers_to: Vec<(ZgramId, Vec<ZgramId>)> = md
        .zgram_refers_to()
        .iter()
        .filter_map(|(&id, targets)| {
            let on: Vec<ZgramId> = targets
                .iter()
                .filter(|(_, &v)| v)
                .map(|(&t, _)| t)
                .collect();
            (!on.is_empty()).then_some((id, on))
        })
        .collect();

    // Everything the frozen tables will reference goes through the pool.
    let mut strings: Vec<&str> = Vec::new();
    for (_, by_reaction) in &reactions {
        for (reaction, creators) in by_reaction {
            strings.push(reaction);
            strings.extend(creators.iter().copied());
        }
    }
    strings.extend(reaction_counts.iter().map(|(reaction, _)| *reaction));
    for revs in md.zgram_revisions().values() {
        for core in revs {
            strings.push(&core.instance);
            strings.push(&core.body);
        }
    }
    for (user, zmojis) in md.zmojis() {
        strings.push(user);
        strings.push(zmojis);
    }
    strings.extend(md.plus_pluses().keys().map(String::as_str));
    strings.extend(md.minus_minuses().keys().map(String::as_str));
    for keys in md.plus_plus_keys().values() {
        strings.extend(keys.iter().map(String::as_str));
    }
    let pool = PoolBuilder::new(strings);

    let mut b = BlobBuilder::new();
    let root = b.reserve(size_of::<FrozenIndex>(), 8);
    debug_assert_eq!(root, 0);
    b.patch_u64(root + offset_of!(FrozenIndex, magic), FROZEN_MAGIC);
    b.patch_u64(root + offset_of!(FrozenIndex, logged_end), logged_end);
    b.patch_u64(root + offset_of!(FrozenIndex, unlogged_end), unlogged_end);

    b.write_vector(
        root + offset_of!(FrozenIndex, zgram_infos),
        dynamic.zgram_infos(),
    );
    b.write_vector(
        root + offset_of!(FrozenIndex, word_infos),
        dynamic.word_infos(),
    );

    let trie_pos = trie::frozen::freeze_node(dynamic.trie().root(), &mut b);
    b.set_rel_ptr(root + offset_of!(FrozenIndex, trie_root), trie_pos);

    pool.write(&mut b, root + offset_of!(FrozenIndex, string_pool));

    let md_pos = root + offset_of!(FrozenIndex, metadata);

    let reaction_items: Vec<(ZgramId, Vec<(StringRef, Vec<StringRef>)>)> = reactions
        .iter()
        .map(|(id, by_reaction)| {
            (
                *id,
                by_reaction
                    .iter()
                    .map(|(reaction, creators)| {
                        (
                            pool.r(reaction),
                            creators.iter().map(|c| pool.r(c)).collect(),
                        )
                    })
                    .collect(),
            )
        })
        .collect();
    write_map_with::<ZgramId, FrozenMap<StringRef, FrozenSet<StringRef>>, _>(
        &mut b,
        md_pos + offset_of!(FrozenMetadata, reactions),
        &reaction_items,
        |b, value_pos, by_reaction| {
            write_map_with::<StringRef, FrozenSet<StringRef>, _>(
                b,
                value_pos,
                by_reaction,
                |b, set_pos, creators: &Vec<StringRef>| {
                    b.write_vector(set_pos, creators);
                },
            );
        },
    );

    let count_items: Vec<(StringRef, Vec<FrozenPair<ZgramId, i64>>)> = reaction_counts
        .iter()
        .map(|(reaction, by_id)| {
            (
                pool.r(reaction),
                by_id
                    .iter()
                    .map(|&(key, value)| FrozenPair { key, value })
                    .collect(),
            )
        })
        .collect();
    write_map_with::<StringRef, FrozenMap<ZgramId, i64>, _>(
        &mut b,
        md_pos + offset_of!(FrozenMetadata, reaction_counts),
        &count_items,
        |b, value_pos, entries: &Vec<FrozenPair<ZgramId, i64>>| {
            b.write_vector(value_pos, entries);
        },
    );

    let revision_items: Vec<(ZgramId, Vec<FrozenRevision>)> = md
        .zgram_revisions()
        .iter()
        .map(|(&id, revs)| {
            (
                id,
                revs.iter()
                    .map(|core| FrozenRevision {
                        instance: pool.r(&core.instance),
                        body: pool.r(&core.body),
                        render_style: core.render_style.as_raw(),
                    })
                    .collect(),
            )
        })
        .collect();
    write_map_with::<ZgramId, crate::frozen::FrozenVector<FrozenRevision>, _>(
        &mut b,
        md_pos + offset_of!(FrozenMetadata, zgram_revisions),
        &revision_items,
        |b, value_pos, revs: &Vec<FrozenRevision>| {
            b.write_vector(value_pos, revs);
        },
    );

    write_map_with::<ZgramId, FrozenSet<ZgramId>, _>(
        &mut b,
        md_pos + offset_of!(FrozenMetadata, zgram_refers_to),
        &refers_to,
        |b, set_pos, targets: &Vec<ZgramId>| {
            b.write_vector(set_pos, targets);
        },
    );

    let zmoji_pairs: Vec<FrozenPair<StringRef, StringRef>> = md
        .zmojis()
        .iter()
        .map(|(user, zmojis)| FrozenPair {
            key: pool.r(user),
            value: pool.r(zmojis),
        })
        .collect();
    b.write_vector(md_pos + offset_of!(FrozenMetadata, zmojis), &zmoji_pairs);

    let plus_items: Vec<(StringRef, Vec<ZgramId>)> = md
        .plus_pluses()
        .iter()
        .map(|(key, ids)| (pool.r(key), ids.clone()))
        .collect();
    write_map_with::<StringRef, crate::frozen::FrozenVector<ZgramId>, _>(
        &mut b,
        md_pos + offset_of!(FrozenMetadata, plus_pluses),
        &plus_items,
        |b, value_pos, ids: &Vec<ZgramId>| {
            b.write_vector(value_pos, ids);
        },
    );
    let minus_items: Vec<(StringRef, Vec<ZgramId>)> = md
        .minus_minuses()
        .iter()
        .map(|(key, ids)| (pool.r(key), ids.clone()))
        .collect();
    write_map_with::<StringRef, crate::frozen::FrozenVector<ZgramId>, _>(
        &mut b,
        md_pos + offset_of!(FrozenMetadata, minus_minuses),
        &minus_items,
        |b, value_pos, ids: &Vec<ZgramId>| {
            b.write_vector(value_pos, ids);
        },
    );

    let key_items: Vec<(ZgramId, Vec<StringRef>)> = md
        .plus_plus_keys()
        .iter()
        .map(|(&id, keys)| (id, keys.iter().map(|k| pool.r(k)).collect()))
        .collect();
    write_map_with::<ZgramId, crate::frozen::FrozenVector<StringRef>, _>(
        &mut b,
        md_pos + offset_of!(FrozenMetadata, plus_plus_keys),
        &key_items,
        |b, value_pos, keys: &Vec<StringRef>| {
            b.write_vector(value_pos, keys);
        },
    );

    let blob = b.finish();
    debug!(
        zgrams = dynamic.zgram_infos().len(),
        words = dynamic.word_infos().len(),
        bytes = blob.len(),
        "froze dynamic index"
    );
    blob
}
