use chrono::{DateTime, Duration, TimeZone, Utc};
use ethernity_core::{WalletInfo, WalletTransaction};
use ethernity_surveillance::{
    AirdropFarmingEvidence, ClusterPattern, CoordinatedVotingEvidence, SybilDetector, VoteDirection,
    WalletSimilarity,
};
use ethereum_types::{Address, H256};
use std::collections::BTreeMap;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap() + Duration::seconds(secs)
}

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn wallet(n: u64, created: i64, balance: f64, tx_count: u64) -> WalletInfo {
    WalletInfo {
        address: addr(n),
        creation_time: at(created),
        balance,
        transaction_count: tx_count,
        last_activity: at(created + 2 * 86_400),
    }
}

fn farm(count: u64) -> Vec<WalletInfo> {
    (0..count).map(|i| wallet(i + 1, i as i64 * 60, 10.0, 5)).collect()
}

fn tx(n: u64, from: u64, gas_price: f64, amount: f64, secs: i64, nonce: u64) -> WalletTransaction {
    WalletTransaction {
        tx_hash: H256::from_low_u64_be(n),
        from_address: addr(from),
        to_address: addr(0xc0),
        amount,
        gas_price,
        timestamp: at(secs),
        nonce,
    }
}

#[test]
fn twelve_lookalike_wallets_form_a_cluster() {
    let mut wallets = farm(12);
    wallets.push(WalletInfo {
        address: addr(500),
        creation_time: at(10 * 86_400),
        balance: 1000.0,
        transaction_count: 500,
        last_activity: at(30 * 86_400),
    });

    let evidence = SybilDetector::detect_wallet_clustering(&wallets).expect("cluster");
    assert_eq!(evidence.cluster_size, 12);
    assert!(!evidence.wallet_addresses.contains(&addr(500)));
    assert!(evidence.average_similarity_score > 0.8 && evidence.average_similarity_score <= 1.0);
    assert_eq!(evidence.pattern_type, ClusterPattern::BalanceSimilarity);

    let confidence = SybilDetector::wallet_clustering_confidence(&evidence);
    assert!((60.0..=80.0).contains(&confidence), "{}", confidence);
}

#[test]
fn cluster_must_exceed_ten_members() {
    assert!(SybilDetector::detect_wallet_clustering(&farm(11)).is_some());
    assert!(SybilDetector::detect_wallet_clustering(&farm(10)).is_none());
}

#[test]
fn duplicate_addresses_are_counted_once() {
    let mut wallets = farm(10);
    wallets.push(wallet(1, 30, 10.0, 5));
    assert!(SybilDetector::detect_wallet_clustering(&wallets).is_none());
}

#[test]
fn invalid_wallets_are_skipped() {
    let mut wallets = farm(11);
    wallets.push(wallet(99, 0, -5.0, 5));
    let evidence = SybilDetector::detect_wallet_clustering(&wallets).expect("cluster");
    assert_eq!(evidence.cluster_size, 11);
}

#[test]
fn similarity_components_are_normalized() {
    let a = wallet(1, 0, 10.0, 5);
    let b = wallet(2, 43_200, 5.0, 10);
    let similarity = WalletSimilarity::between(&a, &b);
    assert!((similarity.creation - 0.5).abs() < 1e-9);
    assert!((similarity.balance - 0.5).abs() < 1e-9);
    assert!((similarity.activity - 0.5).abs() < 1e-9);
    assert!((similarity.score() - 0.5).abs() < 1e-9);

    let identical = WalletSimilarity::between(&a, &a);
    assert!((identical.score() - 1.0).abs() < 1e-9);
}

#[test]
fn wallets_with_identical_habits_share_behavior() {
    let mut histories = BTreeMap::new();
    for i in 0..3u64 {
        let offset = i as i64 * 10;
        histories.insert(
            addr(i + 1),
            vec![tx(i * 2 + 2, i + 1, 20.0, 1.0, offset + 60, 1), tx(i * 2 + 1, i + 1, 20.0, 1.0, offset, 0)],
        );
    }

    let evidence = SybilDetector::analyze_behavior_similarity(&histories).expect("similar");
    assert_eq!(evidence.wallet_addresses, vec![addr(1), addr(2), addr(3)]);
    assert!((evidence.similarity_score - 1.0).abs() < 1e-9);
    assert_eq!(evidence.matching_patterns, vec!["same_gas_price".to_string(), "same_nonce_pattern".to_string()]);
    assert_eq!(evidence.timeframe_secs, 80);
}

#[test]
fn different_habits_or_missing_history_are_not_similar() {
    let mut histories = BTreeMap::new();
    histories.insert(addr(1), vec![tx(1, 1, 20.0, 1.0, 0, 0)]);
    histories.insert(addr(2), vec![tx(2, 2, 100.0, 50.0, 0, 0)]);
    assert!(SybilDetector::analyze_behavior_similarity(&histories).is_none());

    let mut lonely = BTreeMap::new();
    lonely.insert(addr(1), vec![tx(1, 1, 20.0, 1.0, 0, 0)]);
    assert!(SybilDetector::analyze_behavior_similarity(&lonely).is_none());

    let mut sparse = BTreeMap::new();
    sparse.insert(addr(1), vec![tx(1, 1, 20.0, 1.0, 0, 0)]);
    sparse.insert(addr(2), vec![tx(2, 2, 20.0, 1.0, 0, 0)]);
    sparse.insert(addr(3), Vec::new());
    assert!(SybilDetector::analyze_behavior_similarity(&sparse).is_none());
}

#[test]
fn airdrop_farming_scores_by_claims_and_similarity() {
    let mut evidence = AirdropFarmingEvidence {
        wallet_addresses: (1..=20).map(addr).collect(),
        airdrop_contract: addr(0xa1),
        claim_count: 20,
        claim_timing_similarity: 0.9,
        claim_amount_similarity: 0.95,
    };
    let tight = SybilDetector::airdrop_farming_confidence(&evidence);
    assert!((60.0..=80.0).contains(&tight));

    evidence.claim_timing_similarity = 0.5;
    evidence.claim_amount_similarity = 0.5;
    assert!(SybilDetector::airdrop_farming_confidence(&evidence) < tight);
}

#[test]
fn voting_power_escalates_coordinated_votes() {
    let mut evidence = CoordinatedVotingEvidence {
        wallet_addresses: (1..=15).map(addr).collect(),
        proposal_id: "prop-42".to_string(),
        vote_direction: VoteDirection::For,
        vote_count: 15,
        voting_timing_similarity: 0.9,
        total_voting_power: 10_000.0,
    };
    let modest = SybilDetector::coordinated_voting_confidence(&evidence);
    evidence.total_voting_power = 5_000_000.0;
    let heavy = SybilDetector::coordinated_voting_confidence(&evidence);
    assert!(heavy > modest);
    assert!(heavy <= 100.0);
}
