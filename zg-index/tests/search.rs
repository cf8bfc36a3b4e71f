//! End-to-end search scenarios over a small corpus with known words,
//! exercised through the query parser, in both directions, against the
//! dynamic segment and against a freeze/reopen round trip of it.

use zg_index::error::{Error, Result};
use zg_index::fields::FieldMask;
use zg_index::index::ConsolidatedIndex;
use zg_index::iters::zgram::{And, Or, PopOrNot};
use zg_index::iters::{IteratorContext, ZgramIterator};
use zg_index::records::{
    MetadataRecord, Reaction, Zephyrgram, ZgramCore, ZgramRefersTo, ZgramRevision, Zmojis,
};
use zg_index::syntax::parse_query;
use zg_index::types::{LogLocation, ZgramId, ZgramOff, ZgramRel};

fn zgram(
    id: u64,
    sender: &str,
    signature: &str,
    instance: &str,
    body: &str,
) -> (Zephyrgram, LogLocation) {
    (
        Zephyrgram {
            zgram_id: ZgramId::new(id),
            timesecs: 1000 + id,
            sender: sender.to_owned(),
            signature: signature.to_owned(),
            is_logged: true,
            core: ZgramCore::plain(instance, body),
        },
        LogLocation::new(id * 100, 64),
    )
}

/// ~30 messages. Ids are intentionally sparse.
fn corpus() -> Vec<(Zephyrgram, LogLocation)> {
    vec![
        zgram(0, "kosak", "Corey Kosak", "help.cheese", "the pie is ready"),
        zgram(1, "kosak", "Corey Kosak", "food.pie", "foo++ for effort"),
        zgram(2, "simon", "Simon Says", "white.magic", "abracadabra presto"),
        zgram(4, "kosak", "Corey Kosak", "graphics.demo", "kosak drew a zamboni yesterday"),
        zgram(10, "kosak", "Corey Kosak", "cinnabon", "i love the cinnabon"),
        zgram(11, "kosak", "Corey Kosak", "food.court", "the Cinnabon was closed"),
        zgram(12, "kosak", "Corey Kosak", "food.court", "the Cιηηαвση has reopened ❤"),
        zgram(13, "kosak", "Corey Kosak", "random.stuff", "behold 🙀Cιηη🔥вση🙀 wow"),
        zgram(20, "kosak", "Corey Kosak", "zamboni", "the zamboni needs fuel"),
        zgram(21, "alice", "Alice A", "skiing", "fresh powder at dawn"),
        zgram(22, "kosak", "Corey Kosak", "help", "how do i quit vim"),
        zgram(23, "kosak", "Corey Kosak", "envy.dept", "are you by chance jealous of my zamboni"),
        zgram(30, "kosak", "Lord Cinnabon", "secret.lair", "the minions are restless"),
        zgram(40, "bob", "Bob B", "music.jazz", "miles davis album night"),
        zgram(41, "carol", "Carol C", "gardening", "the tomatoes are thriving"),
        zgram(42, "dave", "Dave D", "cooking", "the soup needs salt"),
        zgram(50, "kosak", "Corey Kosak", "zamboni", "kosak polished the zamboni"),
        zgram(51, "kosak", "Corey Kosak", "meta", "This thread is now about threads"),
        zgram(52, "erin", "Erin E", "status.report", "FAIL"),
        zgram(60, "kosak", "Corey Kosak", "hockey", "the the zamboni resurfaced"),
        zgram(61, "kosak", "Corey Kosak", "stutter", "the the the the the end"),
        zgram(62, "kosak", "Corey Kosak", "quiet", "nothing much happening here"),
        zgram(63, "kosak", "Corey Kosak", "shoutout", "thanks kosak for the help"),
        zgram(70, "kosak", "Corey Kosak", "ledger", "kosak++ owes me pie"),
        zgram(71, "kosak", "Corey Kosak", "thanks.dept", "kosak gets all the credit"),
        zgram(72, "kosak", "Corey Kosak", "farewell", "goodbye everyone see you tomorrow"),
    ]
}

fn unused_resolver(id: ZgramId, _location: LogLocation) -> Result<ZgramCore> {
    Err(Error::Resolve {
        id,
        message: "test did not expect a resolver call".to_owned(),
    })
}

fn reaction(id: u64, reaction: &str, creator: &str, value: bool) -> MetadataRecord {
    MetadataRecord::Reaction(Reaction {
        zgram_id: ZgramId::new(id),
        reaction: reaction.to_owned(),
        creator: creator.to_owned(),
        value,
    })
}

fn build_index() -> ConsolidatedIndex {
    let mut ci = ConsolidatedIndex::new_empty();
    ci.add_zgrams(&corpus()).unwrap();
    ci.add_metadata(
        &[
            reaction(1, "👍", "alice", true),
            reaction(42, "👍", "bob", true),
            reaction(60, "👍", "carol", true),
            reaction(60, "👍", "carol", false),
        ],
        &unused_resolver,
    )
    .unwrap();
    ci
}

/// Runs the iterator to completion, checking the monotonicity contract and
/// converting results back to zgram ids. A deliberately small buffer
/// exercises chunked delivery.
fn collect(
    ci: &ConsolidatedIndex,
    it: &dyn ZgramIterator,
    forward: bool,
    lower_bound: Option<ZgramRel>,
) -> Vec<u64> {
    let ctx = IteratorContext::new(ci, forward);
    let mut state = it.create_state(&ctx);
    let lb = lower_bound.unwrap_or_default();
    let mut out = [ZgramRel::default(); 7];
    let mut ids = Vec::new();
    let mut last_rel: Option<ZgramRel> = None;
    loop {
        let n = it.get_more(&ctx, &mut *state, lb, &mut out);
        if n == 0 {
            break;
        }
        for &rel in &out[..n] {
            assert!(last_rel.is_none_or(|prev| rel > prev), "stream not increasing");
            last_rel = Some(rel);
            ids.push(ci.get_zgram_info(ctx.zgram_rel_to_off(rel)).zgram_id().raw());
        }
    }
    ids
}

/// Four searches: full forward, full backward, forward from `start_id`, and
/// backward from just before `start_id`. `expected` is the full match set in
/// ascending order.
fn four_way(ci: &ConsolidatedIndex, it: &dyn ZgramIterator, start_id: u64, expected: &[u64]) {
    assert_eq!(collect(ci, it, true, None), expected, "full forward");

    let reversed: Vec<u64> = expected.iter().rev().copied().collect();
    assert_eq!(collect(ci, it, false, None), reversed, "full backward");

    let start = ZgramId::new(start_id);
    let split = ci.lower_bound_id(start);

    let fwd_ctx = IteratorContext::new(ci, true);
    let fwd_tail: Vec<u64> = if (split.raw() as usize) < ci.zgram_info_size() {
        collect(ci, it, true, Some(fwd_ctx.zgram_off_to_rel(split)))
    } else {
        Vec::new()
    };
    let expected_tail: Vec<u64> = expected.iter().copied().filter(|&id| id >= start_id).collect();
    assert_eq!(fwd_tail, expected_tail, "forward from {start_id}");

    let bwd_ctx = IteratorContext::new(ci, false);
    let bwd_head: Vec<u64> = if split.raw() == 0 {
        Vec::new()
    } else {
        let from = ZgramOff::new(split.raw() - 1);
        collect(ci, it, false, Some(bwd_ctx.zgram_off_to_rel(from)))
    };
    let expected_head: Vec<u64> = expected
        .iter()
        .copied()
        .filter(|&id| id < start_id)
        .rev()
        .collect();
    assert_eq!(bwd_head, expected_head, "backward from {start_id}");
}

fn query(text: &str) -> Box<dyn ZgramIterator> {
    parse_query().call(text).unwrap()
}

fn run_scenarios(ci: &ConsolidatedIndex) {
    // The six canonical scenarios.
    four_way(ci, &*query("kosak"), 5, &[4, 50, 63, 70, 71]);
    four_way(ci, &*query("body:^this"), 4, &[51]);
    four_way(
        ci,
        &*query("instance:^*$"),
        4,
        &[10, 20, 21, 22, 41, 42, 50, 51, 60, 61, 62, 63, 70, 72],
    );
    four_way(
        ci,
        &*query("not sender,signature,instance,body:kosak"),
        4,
        &[2, 21, 40, 41, 42, 52],
    );
    four_way(ci, &*query("sender:kosak and not signature:kosak"), 4, &[30]);
    for (margin, expected) in [(1usize, &[][..]), (2, &[]), (3, &[23]), (4, &[23])] {
        let it = parse_query()
            .near_margin(margin)
            .call("~you jealous~")
            .unwrap();
        four_way(ci, &*it, 4, expected);
    }

    // Anchored-at-both-ends single word.
    four_way(ci, &*query("body:^FAIL$"), 4, &[52]);

    // Runs of adjacent "the"s.
    let the_set = [0, 10, 11, 12, 20, 30, 41, 42, 50, 60, 61, 63, 71];
    four_way(ci, &*query("body:the"), 5, &the_set);
    four_way(ci, &*query(r#"body:"the the""#), 5, &[60, 61]);
    four_way(ci, &*query(r#"body:"the the the""#), 5, &[61]);
    four_way(ci, &*query(r#"body:"the the the the the""#), 5, &[61]);
    four_way(ci, &*query(r#"body:"the the the the the the""#), 5, &[]);
    four_way(ci, &*query(r#"body:"the the zamboni""#), 4, &[60]);

    // Unicode fuzzy equivalence.
    four_way(ci, &*query("body:cinnabon"), 3, &[10, 11, 12]);
    four_way(ci, &*query("body:cinn?bon"), 3, &[10, 11, 12]);
    four_way(ci, &*query("body:c*n"), 3, &[10, 11, 12]);
    four_way(ci, &*query("body:*c*b*n*"), 3, &[10, 11, 12, 13]);
    four_way(ci, &*query("body:cinnbon"), 2, &[]);
    four_way(ci, &*query("body:❤"), 2, &[12]);

    // Metadata predicates.
    four_way(ci, &*query(r#"hasreaction("👍")"#), 4, &[1, 42]);
    four_way(ci, &*query(r#"hasreaction("🎉")"#), 4, &[]);
    four_way(ci, &*query("zgramid(22)"), 4, &[22]);
    four_way(ci, &*query("zgramid(5)"), 4, &[]);

    // Booleans.
    four_way(ci, &*query("body:zamboni or body:❤"), 4, &[4, 12, 20, 23, 50, 60]);
    four_way(ci, &*query("instance:zamboni body:kosak"), 4, &[50]);
}

#[test]
fn scenarios_on_dynamic_index() {
    let ci = build_index();
    run_scenarios(&ci);
}

#[test]
fn scenarios_survive_freeze_round_trip() {
    let ci = build_index();
    let blob = ci.freeze().unwrap();
    let reopened = ConsolidatedIndex::from_frozen_bytes(&blob).unwrap();
    assert_eq!(reopened.zgram_info_size(), ci.zgram_info_size());
    assert_eq!(reopened.word_info_size(), ci.word_info_size());
    run_scenarios(&reopened);
}

#[test]
fn dynamic_overrides_frozen_after_reopen() {
    let ci = build_index();
    let blob = ci.freeze().unwrap();
    let mut reopened = ConsolidatedIndex::from_frozen_bytes(&blob).unwrap();

    // Erasing a frozen reaction from the dynamic side must net it to zero.
    reopened
        .add_metadata(&[reaction(1, "👍", "alice", false)], &unused_resolver)
        .unwrap();
    four_way(&reopened, &*query(r#"hasreaction("👍")"#), 4, &[42]);
    assert!(reopened.reactions_for(ZgramId::new(1)).is_empty());

    // New zgrams land in the dynamic trie and merge into pattern search.
    reopened
        .add_zgrams(&[zgram(100, "kosak", "Corey Kosak", "food.court", "cinnabon returns")])
        .unwrap();
    four_way(&reopened, &*query("body:cinnabon"), 3, &[10, 11, 12, 100]);
}

#[test]
fn algebraic_identities() {
    let ci = build_index();
    let base = collect(&ci, &*query("kosak"), true, None);

    let and_everything = And::create(vec![
        query("kosak"),
        PopOrNot::create(FieldMask::all(), FieldMask::all()),
    ]);
    assert_eq!(collect(&ci, &*and_everything, true, None), base);

    let or_nothing = Or::create(vec![
        query("kosak"),
        PopOrNot::create(FieldMask::empty(), FieldMask::empty()),
    ]);
    assert_eq!(collect(&ci, &*or_nothing, true, None), base);

    let not_not = query("not not kosak");
    assert_eq!(collect(&ci, &*not_not, true, None), base);
}

#[test]
fn empty_query_conventions() {
    let ci = build_index();
    let everything = parse_query().empty_means_everything(true).call("").unwrap();
    assert_eq!(collect(&ci, &*everything, true, None).len(), corpus().len());
    let nothing = parse_query().call("").unwrap();
    assert!(collect(&ci, &*nothing, true, None).is_empty());
}

#[test]
fn timestamp_lower_bound() {
    let ci = build_index();
    let off = ci.lower_bound_timestamp(1050);
    assert_eq!(ci.get_zgram_info(off).zgram_id(), ZgramId::new(50));
    let past_end = ci.lower_bound_timestamp(10_000);
    assert_eq!(past_end.raw() as usize, ci.zgram_info_size());
}

#[test]
fn ingestion_violations() {
    let mut ci = build_index();

    let err = ci
        .add_zgrams(&[zgram(40, "kosak", "Corey Kosak", "late", "too late")])
        .unwrap_err();
    assert!(matches!(err, Error::NonMonotonicZgramId { .. }));

    let err = ci
        .add_metadata(&[reaction(9999, "👍", "alice", true)], &unused_resolver)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownZgramId(id) if id == ZgramId::new(9999)));

    // Aborted batches leave no trace.
    four_way(&ci, &*query(r#"hasreaction("👍")"#), 4, &[1, 42]);
}

#[test]
fn plus_plus_accounting() {
    let mut ci = build_index();

    // Original bodies: "foo++" in zgram 1, "kosak++" in zgram 70.
    assert_eq!(ci.plus_plus_count_after(ZgramId::new(1), "foo"), 1);
    assert_eq!(ci.plus_plus_count_after(ZgramId::new(0), "foo"), 0);
    assert_eq!(ci.plus_plus_count_after(ZgramId::new(70), "kosak"), 1);
    assert!(ci.plus_plus_keys(ZgramId::new(1)).contains("foo"));

    // A revision replaces foo++ with foo--: net count through id 1 drops to
    // -1, and the original body is fetched through the resolver.
    let original = corpus();
    let resolver = move |id: ZgramId, _location: LogLocation| -> Result<ZgramCore> {
        original
            .iter()
            .find(|(zg, _)| zg.zgram_id == id)
            .map(|(zg, _)| zg.core.clone())
            .ok_or_else(|| Error::Resolve {
                id,
                message: "not in corpus".to_owned(),
            })
    };
    ci.add_metadata(
        &[MetadataRecord::Revision(ZgramRevision {
            zgram_id: ZgramId::new(1),
            core: ZgramCore::plain("food.pie", "foo-- for effort"),
        })],
        &resolver,
    )
    .unwrap();
    assert_eq!(ci.plus_plus_count_after(ZgramId::new(1), "foo"), -1);
    assert!(ci.plus_plus_keys(ZgramId::new(1)).contains("foo"));
    assert_eq!(ci.revisions_for(ZgramId::new(1)).len(), 1);

    // A second revision nets out the first one's foo--.
    ci.add_metadata(
        &[MetadataRecord::Revision(ZgramRevision {
            zgram_id: ZgramId::new(1),
            core: ZgramCore::plain("food.pie", "foo renamed"),
        })],
        &resolver,
    )
    .unwrap();
    assert_eq!(ci.plus_plus_count_after(ZgramId::new(1), "foo"), 0);
    assert_eq!(ci.revisions_for(ZgramId::new(1)).len(), 2);
}

#[test]
fn reaction_counts_and_refers_to() {
    let mut ci = build_index();

    // Count at the largest key <= the reference id, dynamic side first.
    assert_eq!(ci.reaction_count("👍", ZgramId::new(1)), 1);
    assert_eq!(ci.reaction_count("👍", ZgramId::new(45)), 1);
    assert_eq!(ci.reaction_count("👍", ZgramId::new(0)), 0);
    assert_eq!(ci.reaction_count("🎉", ZgramId::new(70)), 0);

    // Re-asserting an existing reaction is a no-op.
    ci.add_metadata(&[reaction(1, "👍", "alice", true)], &unused_resolver)
        .unwrap();
    assert_eq!(ci.reaction_count("👍", ZgramId::new(1)), 1);

    let refers = |ci: &ConsolidatedIndex, id: u64| -> Vec<u64> {
        ci.refers_to_for(ZgramId::new(id))
            .iter()
            .map(|r| r.refers_to.raw())
            .collect()
    };
    ci.add_metadata(
        &[
            MetadataRecord::RefersTo(ZgramRefersTo {
                zgram_id: ZgramId::new(50),
                refers_to: ZgramId::new(4),
                value: true,
            }),
            MetadataRecord::RefersTo(ZgramRefersTo {
                zgram_id: ZgramId::new(50),
                refers_to: ZgramId::new(2),
                value: true,
            }),
        ],
        &unused_resolver,
    )
    .unwrap();
    assert_eq!(refers(&ci, 50), vec![2, 4]);

    // A later retraction hides the reference, even across a freeze.
    let blob = ci.freeze().unwrap();
    let mut reopened = ConsolidatedIndex::from_frozen_bytes(&blob).unwrap();
    assert_eq!(refers(&reopened, 50), vec![2, 4]);
    reopened
        .add_metadata(
            &[MetadataRecord::RefersTo(ZgramRefersTo {
                zgram_id: ZgramId::new(50),
                refers_to: ZgramId::new(2),
                value: false,
            })],
            &unused_resolver,
        )
        .unwrap();
    assert_eq!(refers(&reopened, 50), vec![4]);
}

#[test]
fn zmojis_dynamic_first_frozen_fallback() {
    let mut ci = build_index();
    ci.add_metadata(
        &[MetadataRecord::Zmojis(Zmojis {
            user_id: "kosak".to_owned(),
            zmojis: "🔥❤🙀".to_owned(),
        })],
        &unused_resolver,
    )
    .unwrap();
    assert_eq!(ci.zmojis("kosak"), Some("🔥❤🙀"));
    assert_eq!(ci.zmojis("alice"), None);

    let blob = ci.freeze().unwrap();
    let mut reopened = ConsolidatedIndex::from_frozen_bytes(&blob).unwrap();
    assert_eq!(reopened.zmojis("kosak"), Some("🔥❤🙀"));
    reopened
        .add_metadata(
            &[MetadataRecord::Zmojis(Zmojis {
                user_id: "kosak".to_owned(),
                zmojis: "🎉".to_owned(),
            })],
            &unused_resolver,
        )
        .unwrap();
    assert_eq!(reopened.zmojis("kosak"), Some("🎉"));
}

#[test]
fn reactions_merge_rules() {
    let ci = build_index();
    let on_1 = ci.reactions_for(ZgramId::new(1));
    assert_eq!(on_1.len(), 1);
    assert_eq!(on_1[0].reaction, "👍");
    assert_eq!(on_1[0].creator, "alice");
    // The add/remove pair on zgram 60 nets out.
    assert!(ci.reactions_for(ZgramId::new(60)).is_empty());
}
