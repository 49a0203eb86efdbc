use std::collections::HashSet;

use elsh_fmap::{
    subset_parity, BinaryVector, ConfusionCounters, DistanceBand, ElshFmap, FingerprintEngine,
    MatchEvaluator, ProtocolParams, TestData, VectorPairGenerator,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn stratified(n: usize, d: usize, delta: usize, seed: u64) -> TestData {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    VectorPairGenerator::new(d, delta)
        .unwrap()
        .generate(n, &mut rng)
        .unwrap()
}

#[test]
fn test_same_params_same_ids() {
    for tau in [0.5, 0.99] {
        let params = ProtocolParams::new(128, 10, 32).with_tau(tau).with_seed(42);
        let a = ElshFmap::new(params).unwrap();
        let b = ElshFmap::new(params).unwrap();
        assert_eq!(a.pool(), b.pool());
        assert_eq!(a.subsets(), b.subsets());

        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..20 {
            let v = VectorPairGenerator::random_vector(128, &mut rng);
            assert_eq!(a.compute_id(&v).unwrap(), b.compute_id(&v).unwrap());
        }
    }
}

fn valid_params() -> impl Strategy<Value = (usize, usize, usize, u64)> {
    (1usize..256).prop_flat_map(|d| (Just(d), 0..=d, 1usize..64, any::<u64>()))
}

fn vector_and_subset() -> impl Strategy<Value = (Vec<bool>, Vec<usize>)> {
    prop::collection::vec(any::<bool>(), 1..200).prop_flat_map(|bits| {
        let d = bits.len();
        let indices: Vec<usize> = (0..d).collect();
        (Just(bits), prop::sample::subsequence(indices, 0..=d))
    })
}

fn counters() -> impl Strategy<Value = ConfusionCounters> {
    let count = 0u64..1_000_000_000;
    (count.clone(), count.clone(), count.clone(), count).prop_map(|(tp, fn_, tn, fp)| {
        ConfusionCounters {
            true_positive: tp,
            false_negative: fn_,
            true_negative: tn,
            false_positive: fp,
        }
    })
}

proptest! {
    #[test]
    fn test_subset_size_invariant((d, delta, l, seed) in valid_params()) {
        let fmap = ElshFmap::new(ProtocolParams::new(d, delta, l).with_seed(seed)).unwrap();
        let k = d.div_ceil(delta + 1);
        prop_assert_eq!(fmap.k(), k);
        prop_assert_eq!(fmap.subsets().len(), l);
        for subset in fmap.subsets() {
            prop_assert_eq!(subset.len(), k);
            let distinct: HashSet<_> = subset.iter().collect();
            prop_assert_eq!(distinct.len(), k, "duplicate index in {:?}", subset);
            prop_assert!(subset.iter().all(|&i| fmap.pool().contains(i) && i < d));
        }
    }

    #[test]
    fn test_complement_flips_parity_iff_subset_is_odd((bits, subset) in vector_and_subset()) {
        let d = bits.len();
        let v = BinaryVector::new(bits);
        let v_bar = v.complement();
        let flipped = subset_parity(&v, &subset) != subset_parity(&v_bar, &subset);
        prop_assert_eq!(flipped, subset.len() % 2 == 1);

        let engine = FingerprintEngine::new(d, vec![subset.clone()]).unwrap();
        let tag = engine.compute_id(&v).unwrap().into_iter().next().unwrap();
        let tag_bar = engine.compute_id(&v_bar).unwrap().into_iter().next().unwrap();
        prop_assert_eq!(tag.subset_index, tag_bar.subset_index);
        prop_assert_eq!(tag.parity != tag_bar.parity, subset.len() % 2 == 1);
    }

    #[test]
    fn test_counter_merge_is_commutative_and_associative(
        a in counters(),
        b in counters(),
        c in counters(),
    ) {
        prop_assert_eq!(a + b, b + a);
        prop_assert_eq!((a + b) + c, a + (b + c));
        prop_assert_eq!((a + b).total(), a.total() + b.total());
        let mut acc = a;
        acc += b;
        prop_assert_eq!(acc, a + b);
    }
}

#[test]
fn test_parity_flips_under_complement_for_odd_subset() {
    let v = BinaryVector::from_bytes(&[1, 0, 1, 0, 0, 0, 0, 0]);
    let v_bar = v.complement();
    assert_eq!(v_bar, BinaryVector::from_bytes(&[0, 1, 0, 1, 1, 1, 1, 1]));

    let engine = FingerprintEngine::new(8, vec![vec![0, 2, 4], vec![1, 3]]).unwrap();
    let subsets = engine.subsets();
    assert!(!subset_parity(&v, &subsets[0]));
    assert!(subset_parity(&v_bar, &subsets[0]));
    // even subset: complement keeps the parity
    assert_eq!(subset_parity(&v, &subsets[1]), subset_parity(&v_bar, &subsets[1]));

    let ids = engine.compute_id(&v).unwrap();
    let ids_bar = engine.compute_id(&v_bar).unwrap();
    assert_eq!(
        ids.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
        vec!["0||0", "1||0"]
    );
    assert_eq!(
        ids_bar.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
        vec!["0||1", "1||0"]
    );
}

#[test]
fn test_detection_does_not_increase_with_distance() {
    let (n, d, delta, l) = (256, 128, 10, 32);
    let fmap = ElshFmap::new(ProtocolParams::new(d, delta, l)).unwrap();
    let data = stratified(n, d, delta, 2024);

    let sender_ids = fmap.compute_id_batch(&data.senders).unwrap();
    let receiver_ids = fmap.compute_id_batch(&data.receivers).unwrap();
    let eval = fmap
        .evaluator()
        .evaluate(&sender_ids, &receiver_ids, &data.distances)
        .unwrap();

    let (lo, hi) = DistanceBand::Beyond.flip_bounds(d, delta);
    let near = eval.band_rate(0, delta / 2).expect("pairs within delta/2");
    let far = eval.band_rate(lo, hi + 1).expect("pairs beyond 1.5 delta");
    assert!(
        near.rate() >= far.rate(),
        "near {} < far {}",
        near.rate(),
        far.rate()
    );
}

#[test]
fn test_collision_probability_matches_closed_form() {
    let (d, delta, l) = (128usize, 10usize, 32usize);
    let k = 12;
    let rho = delta as f64 / d as f64;
    let p = (1.0 + (1.0 - 2.0 * rho).powi(k)) / 2.0;
    let p_collision = 1.0 - (1.0 - p).powi(l as i32);

    let theory = MatchEvaluator::new(d, delta, l).unwrap().theory();
    assert_eq!(theory.k, 12);
    assert!((theory.rho - 0.078125).abs() < 1e-12);
    assert!((theory.p_single - p).abs() < 1e-9);
    assert!((theory.p_collision - p_collision).abs() < 1e-9);
    assert!(theory.p_single > 0.56 && theory.p_single < 0.57);

    let fmap = ElshFmap::new(ProtocolParams::new(d, delta, l)).unwrap();
    assert_eq!(fmap.theory(), theory);
}

#[test]
fn test_confusion_totals() {
    for (n, d, delta, l, seed) in [(40, 64, 6, 8, 1), (25, 32, 3, 4, 2), (10, 16, 16, 2, 3)] {
        let fmap = ElshFmap::new(ProtocolParams::new(d, delta, l)).unwrap();
        let data = stratified(n, d, delta, seed);
        let sender_ids = fmap.compute_id_batch(&data.senders).unwrap();
        let receiver_ids = fmap.compute_id_batch(&data.receivers).unwrap();
        let eval = fmap
            .evaluator()
            .evaluate(&sender_ids, &receiver_ids, &data.distances)
            .unwrap();

        let c = eval.counters;
        let close = eval.records.iter().filter(|r| r.hamming_distance <= delta).count() as u64;
        assert_eq!(c.true_positive + c.false_negative, c.total_close());
        assert_eq!(c.true_negative + c.false_positive, c.total_far());
        assert_eq!(c.total_close(), close);
        assert_eq!(c.total_close() + c.total_far(), (n * n) as u64);
        assert_eq!(eval.records.len(), n * n);

        for r in &eval.records {
            assert_eq!(r.hamming_distance, data.distances.get(r.sender_idx, r.receiver_idx));
            assert_eq!(r.has_intersection, r.intersection_size > 0);
        }
    }
}

#[test]
fn test_test_data_survives_bincode() {
    let data = stratified(8, 16, 2, 7);
    let bytes = bincode::serialize(&data).unwrap();
    let back: TestData = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, data);
}
