//! Property tests for aggregation and the reference graph.

use std::collections::BTreeSet;

use design_token_kernel::{
    aggregate, CanonicalToken, ColorValue, Edge, Provenance, RawCandidate, TokenAttributes,
    TokenId, TokenLibrary,
};
use proptest::prelude::*;

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// Spacing or color candidates, each from a distinct source so provenance
/// identifies members.
fn candidates() -> impl Strategy<Value = Vec<RawCandidate>> {
    prop::collection::vec(
        (
            prop_oneof![
                (1.0f64..64.0).prop_map(|px| TokenAttributes::Spacing { px }),
                (20.0f64..80.0, -20.0f64..20.0).prop_map(|(l, a)| TokenAttributes::Color(ColorValue::lab(l, a, 0.0))),
            ],
            0.0f64..=1.0,
        ),
        0..40,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (attributes, confidence))| RawCandidate::new(attributes, confidence, format!("c{i}")))
            .collect()
    })
}

/// Member sets of every token, as source ids.
fn partition(library: &TokenLibrary) -> BTreeSet<BTreeSet<String>> {
    library
        .all()
        .into_iter()
        .map(|t| t.provenance.sources().map(str::to_string).collect())
        .collect()
}

fn library_of(n: usize) -> TokenLibrary {
    let mut library = TokenLibrary::new();
    for i in 0..n {
        let mut provenance = Provenance::new();
        provenance.record("p", 0.5);
        library
            .insert_token(CanonicalToken::new(
                TokenId::new(format!("t{i}")).unwrap(),
                TokenAttributes::Spacing { px: i as f64 },
                provenance,
                0,
            ))
            .unwrap();
    }
    library
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_partition_and_confidence_ignore_order(
        batch in candidates(),
        seed in any::<u64>(),
        threshold in 0.0f64..10.0,
    ) {
        let mut shuffled = batch.clone();
        // Deterministic Fisher-Yates driven by the seed.
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            shuffled.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let a = aggregate(&batch, threshold).unwrap();
        let b = aggregate(&shuffled, threshold).unwrap();
        prop_assert_eq!(partition(&a), partition(&b));

        let confidence = |library: &TokenLibrary| {
            let mut by_members: Vec<(BTreeSet<String>, f64)> = library
                .all()
                .into_iter()
                .map(|t| (t.provenance.sources().map(str::to_string).collect(), t.confidence))
                .collect();
            by_members.sort_by(|x, y| x.0.cmp(&y.0));
            by_members
        };
        for ((ma, ca), (mb, cb)) in confidence(&a).into_iter().zip(confidence(&b)) {
            prop_assert_eq!(ma, mb);
            prop_assert!((ca - cb).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_no_candidate_is_lost(batch in candidates(), bad in 0usize..5, threshold in 0.0f64..10.0) {
        let mut all = batch.clone();
        for i in 0..bad {
            all.push(RawCandidate::new(TokenAttributes::Spacing { px: -1.0 }, 0.5, format!("bad{i}")));
        }
        let library = aggregate(&all, threshold).unwrap();
        let entries: usize = library.all().iter().map(|t| t.provenance.entry_count()).sum();
        prop_assert_eq!(entries, batch.len());
        library.validate().unwrap();
    }

    #[test]
    fn prop_threshold_monotonicity(batch in candidates(), t1 in 0.0f64..10.0, extra in 0.0f64..10.0) {
        let fine = aggregate(&batch, t1).unwrap();
        let coarse = aggregate(&batch, t1 + extra).unwrap();
        prop_assert!(coarse.len() <= fine.len());

        // Every fine cluster sits inside one coarse cluster.
        let coarse_sets = partition(&coarse);
        for members in partition(&fine) {
            prop_assert!(coarse_sets.iter().any(|c| members.is_subset(c)));
        }
    }

    #[test]
    fn prop_alias_graph_stays_acyclic(
        n in 2usize..12,
        attempts in prop::collection::vec((0usize..12, 0usize..12), 0..40),
    ) {
        let mut library = library_of(n);
        let tid = |i: usize| TokenId::new(format!("t{}", i % n)).unwrap();

        for (from, to) in attempts {
            let before = library.edge_count();
            match library.insert_edge(Edge::alias(tid(from), tid(to))) {
                Ok(()) => prop_assert_eq!(library.edge_count(), before + 1),
                Err(_) => prop_assert_eq!(library.edge_count(), before),
            }
        }

        library.validate().unwrap();
        for i in 0..n {
            let chain = library.alias_chain(&tid(i)).unwrap();
            prop_assert!(chain.len() <= n);
            let unique: BTreeSet<_> = chain.iter().collect();
            prop_assert_eq!(unique.len(), chain.len());
            prop_assert_eq!(&library.resolve_alias(&tid(i)).unwrap().id, chain.last().unwrap());
        }
    }
}
