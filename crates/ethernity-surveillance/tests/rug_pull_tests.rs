use chrono::{DateTime, Duration, TimeZone, Utc};
use ethernity_core::{ContractAction, ContractEvent, LiquidityPoint, Trade, TradeSide};
use ethernity_surveillance::{ContractManipulationEvidence, Evidence, RugPullDetector};
use ethereum_types::{Address, H256};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap() + Duration::seconds(secs)
}

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn hash(n: u64) -> H256 {
    H256::from_low_u64_be(n)
}

fn liquidity(secs: i64, usd: f64, actor: Option<u64>, tx: Option<u64>) -> LiquidityPoint {
    LiquidityPoint {
        timestamp: at(secs),
        liquidity_usd: usd,
        wallet_address: actor.map(addr),
        tx_hash: tx.map(hash),
    }
}

fn sell(n: u64, wallet: u64, amount: f64, price: f64, secs: i64) -> Trade {
    Trade {
        tx_hash: hash(n),
        wallet_address: addr(wallet),
        token_address: addr(0x70),
        amount,
        price,
        timestamp: at(secs),
        side: TradeSide::Sell,
    }
}

fn event(n: u64, action: ContractAction, secs: i64, delay: Option<u64>) -> ContractEvent {
    ContractEvent {
        tx_hash: hash(n),
        timestamp: at(secs),
        action,
        from_address: addr(0xde),
        to_address: Some(addr(0xad)),
        timelock_delay_secs: delay,
    }
}

#[test]
fn sudden_liquidity_drain_is_detected() {
    let points = vec![
        liquidity(1200, 100_000.0, Some(9), Some(3)),
        liquidity(0, 1_000_000.0, None, Some(1)),
        liquidity(600, 800_000.0, Some(8), Some(2)),
    ];
    let evidence = RugPullDetector::check_liquidity_removal(&points).expect("drain");
    assert!((evidence.percentage - 0.9).abs() < 1e-9);
    assert!((evidence.removed_amount_usd - 900_000.0).abs() < 1e-6);
    assert!((evidence.remaining_amount_usd - 100_000.0).abs() < 1e-6);
    assert_eq!(evidence.wallet_address, Some(addr(9)));
    assert_eq!(evidence.timeframe_secs, 1200);
    assert_eq!(evidence.tx_hashes, vec![hash(2), hash(3)]);

    let confidence = RugPullDetector::liquidity_removal_confidence(&evidence);
    assert!(confidence >= 90.0 && confidence <= 100.0);
}

#[test]
fn partial_or_slow_removal_is_not_a_rug() {
    let partial = vec![liquidity(0, 1_000_000.0, None, None), liquidity(600, 600_000.0, None, None)];
    assert!(RugPullDetector::check_liquidity_removal(&partial).is_none());

    let slow = vec![liquidity(0, 1_000_000.0, None, None), liquidity(4000, 50_000.0, None, None)];
    assert!(RugPullDetector::check_liquidity_removal(&slow).is_none());

    assert!(RugPullDetector::check_liquidity_removal(&[]).is_none());
}

#[test]
fn removal_confidence_follows_percentage_tiers() {
    let points = vec![liquidity(0, 1_000_000.0, None, None), liquidity(1800, 400_000.0, None, None)];
    let evidence = RugPullDetector::check_liquidity_removal(&points).expect("drain");
    let confidence = RugPullDetector::liquidity_removal_confidence(&evidence);
    assert!((60.0..=80.0).contains(&confidence), "{}", confidence);
}

#[test]
fn insider_selling_a_third_of_supply_is_a_dump() {
    let mut trades = vec![sell(1, 5, 200.0, 1.0, 0), sell(2, 5, 200.0, 0.6, 600)];
    trades.push(Trade { side: TradeSide::Buy, ..sell(3, 6, 10.0, 0.5, 300) });

    let evidence = RugPullDetector::check_token_dump(&trades, addr(0x70), 1000.0).expect("dump");
    assert_eq!(evidence.wallet_address, addr(5));
    assert!((evidence.percentage - 0.4).abs() < 1e-9);
    assert!((evidence.sold_amount - 400.0).abs() < 1e-9);
    assert!((evidence.price_impact - 0.5).abs() < 1e-9);
    assert_eq!(evidence.timeframe_secs, 600);
    assert_eq!(evidence.tx_hashes, vec![hash(1), hash(2)]);

    let loss = Evidence::TokenDump(evidence.clone()).estimated_loss_usd();
    assert!((loss - 200.0).abs() < 1e-9);

    let confidence = RugPullDetector::token_dump_confidence(&evidence);
    assert!(confidence > 30.0 && confidence < 60.0, "{}", confidence);
}

#[test]
fn small_sales_or_missing_supply_are_not_dumps() {
    let trades = vec![sell(1, 5, 150.0, 1.0, 0), sell(2, 5, 100.0, 0.9, 600)];
    assert!(RugPullDetector::check_token_dump(&trades, addr(0x70), 1000.0).is_none());
    assert!(RugPullDetector::check_token_dump(&trades, addr(0x70), 0.0).is_none());
    assert!(RugPullDetector::check_token_dump(&trades, addr(0x71), 100.0).is_none());
}

#[test]
fn no_contract_events_means_no_manipulation() {
    let evidence = RugPullDetector::check_contract_manipulation(&[]);
    assert!(!evidence.detected);
    assert_eq!(RugPullDetector::manipulation_confidence(&evidence), 0.0);
}

#[test]
fn ownership_transfer_takes_precedence() {
    let events = vec![
        event(1, ContractAction::MintFunctionCall, 0, None),
        event(2, ContractAction::ContractUpgrade, 60, Some(3600)),
        event(3, ContractAction::OwnershipTransfer, 120, None),
        event(4, ContractAction::OwnershipTransfer, 90, None),
    ];
    let evidence = RugPullDetector::check_contract_manipulation(&events);
    assert!(evidence.detected);
    assert_eq!(evidence.action, ContractAction::OwnershipTransfer);
    assert_eq!(evidence.tx_hashes, vec![hash(4)]);
    assert_eq!(evidence.from_address, Some(addr(0xde)));
    assert_eq!(evidence.to_address, Some(addr(0xad)));
    assert_eq!(RugPullDetector::manipulation_confidence(&evidence), 95.0);
}

#[test]
fn manipulation_scores_by_action() {
    let scored = |action, delay| {
        RugPullDetector::manipulation_confidence(&ContractManipulationEvidence {
            detected: true,
            action,
            timelock_delay_secs: delay,
            ..Default::default()
        })
    };
    assert_eq!(scored(ContractAction::EmergencyPause, None), 90.0);
    assert_eq!(scored(ContractAction::MintFunctionCall, None), 85.0);
    assert_eq!(scored(ContractAction::ContractUpgrade, None), 90.0);
    assert!((scored(ContractAction::ContractUpgrade, Some(86_400)) - 75.0).abs() < 1e-9);
    assert!(scored(ContractAction::ContractUpgrade, Some(7 * 86_400)) < 75.0);
    assert!(scored(ContractAction::ContractUpgrade, Some(u64::MAX)) >= 60.0);
}

#[test]
fn scanner_reports_dump_per_supplied_token() {
    use ethernity_surveillance::{MarketBatch, PatternScanner};

    let mut batch = MarketBatch {
        trades: vec![sell(1, 5, 400.0, 1.0, 0)],
        contract_events: vec![event(9, ContractAction::EmergencyPause, 0, None)],
        ..Default::default()
    };
    batch.token_supplies.insert(addr(0x70), 1000.0);

    let found = RugPullDetector::new().scan(&batch);
    assert_eq!(found.len(), 2);
    assert!(matches!(found[0], Evidence::TokenDump(_)));
    assert!(matches!(found[1], Evidence::ContractManipulation(_)));
}
