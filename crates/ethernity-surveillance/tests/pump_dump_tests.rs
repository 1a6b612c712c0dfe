use chrono::{DateTime, Duration, TimeZone, Utc};
use ethernity_core::{PricePoint, Trade, TradeSide};
use ethernity_surveillance::{Evidence, MarketBatch, PatternScanner, PumpDumpDetector};
use ethereum_types::{Address, H256};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 4, 16, 0, 0).unwrap() + Duration::seconds(secs)
}

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn order(n: u64, wallet: u64, side: TradeSide, price: f64, secs: i64) -> Trade {
    Trade {
        tx_hash: H256::from_low_u64_be(n),
        wallet_address: addr(wallet),
        token_address: addr(0x7),
        amount: 100.0,
        price,
        timestamp: at(secs),
        side,
    }
}

fn buys_from_distinct_wallets(count: u64, step: i64) -> Vec<Trade> {
    (0..count).map(|i| order(i + 1, 100 + i, TradeSide::Buy, 1.0, i as i64 * step)).collect()
}

fn point(secs: i64, price: f64) -> PricePoint {
    PricePoint { timestamp: at(secs), price, volume_usd: 1000.0 }
}

#[test]
fn fifteen_wallets_buying_ten_seconds_apart() {
    let trades = buys_from_distinct_wallets(15, 10);
    let evidence = PumpDumpDetector::detect_coordinated_buying(&trades).expect("coordinated");
    assert!(evidence.trade_count >= 10);
    assert_eq!(evidence.wallet_addresses.len(), 15);
    for i in 0..15 {
        assert!(evidence.wallet_addresses.contains(&addr(100 + i)));
    }
    assert_eq!(evidence.timeframe_secs, 140);
    assert_eq!(evidence.side, TradeSide::Buy);
    assert!((evidence.total_volume_usd - 1500.0).abs() < 1e-9);
}

#[test]
fn exactly_ten_wallets_is_the_threshold() {
    assert!(PumpDumpDetector::detect_coordinated_buying(&buys_from_distinct_wallets(10, 10)).is_some());
    assert!(PumpDumpDetector::detect_coordinated_buying(&buys_from_distinct_wallets(9, 10)).is_none());
}

#[test]
fn repeated_wallet_does_not_count_twice() {
    let trades: Vec<Trade> = (0..12u64).map(|i| order(i + 1, 100 + i % 3, TradeSide::Buy, 1.0, i as i64 * 5)).collect();
    assert!(PumpDumpDetector::detect_coordinated_buying(&trades).is_none());
}

#[test]
fn buys_spread_beyond_five_minutes_do_not_combine() {
    // 10 carteiras, uma por minuto: nenhuma janela de 5 min reúne todas
    let trades = buys_from_distinct_wallets(10, 60);
    assert!(PumpDumpDetector::detect_coordinated_buying(&trades).is_none());
}

#[test]
fn coordinated_selling_reports_price_impact() {
    let trades: Vec<Trade> = (0..10u64)
        .map(|i| order(i + 1, 200 + i, TradeSide::Sell, if i == 9 { 0.4 } else { 1.0 }, i as i64 * 10))
        .collect();
    let evidence = PumpDumpDetector::detect_coordinated_selling(&trades).expect("coordinated");
    assert_eq!(evidence.side, TradeSide::Sell);
    // média 0.94, mínimo 0.4
    assert!((evidence.price_impact - (0.94 - 0.4) / 0.94).abs() < 1e-9);
    assert!(PumpDumpDetector::detect_coordinated_buying(&trades).is_none());

    let loss = Evidence::CoordinatedSelling(evidence.clone()).estimated_loss_usd();
    assert!((loss - evidence.total_volume_usd * evidence.price_impact).abs() < 1e-9);
}

#[test]
fn fifty_percent_within_half_an_hour_is_a_spike() {
    let evidence = PumpDumpDetector::detect_price_spike(&[point(0, 1.0), point(1800, 1.5)]).expect("spike");
    assert!((evidence.percentage_increase - 0.5).abs() < 1e-9);
    assert_eq!(evidence.timeframe_secs, 1800);
    assert_eq!(evidence.start_price, 1.0);
    assert_eq!(evidence.end_price, 1.5);
    assert!((evidence.volume_during_spike_usd - 2000.0).abs() < 1e-9);
    assert!((evidence.volume_spike_ratio - 1.0).abs() < 1e-9);
}

#[test]
fn slow_rise_is_not_a_spike() {
    assert!(PumpDumpDetector::detect_price_spike(&[point(0, 1.0), point(7200, 1.6)]).is_none());
    assert!(PumpDumpDetector::detect_price_spike(&[point(0, 1.0)]).is_none());
    assert!(PumpDumpDetector::detect_price_spike(&[]).is_none());
}

#[test]
fn largest_increase_wins() {
    let history = vec![point(1200, 2.5), point(0, 1.0), point(600, 1.6)];
    let evidence = PumpDumpDetector::detect_price_spike(&history).expect("spike");
    assert!((evidence.percentage_increase - 1.5).abs() < 1e-9);
    assert_eq!(evidence.started_at, at(0));
    assert_eq!(evidence.peaked_at, at(1200));
}

#[test]
fn dump_after_spike_is_detected() {
    let history = vec![point(0, 1.0), point(1800, 2.0), point(3600, 0.9)];
    let evidence = PumpDumpDetector::detect_dump(&history, at(1800)).expect("dump");
    assert_eq!(evidence.peak_price, 2.0);
    assert_eq!(evidence.dump_price, 0.9);
    assert!((evidence.percentage_drop - 0.55).abs() < 1e-9);
    assert_eq!(evidence.timeframe_secs, 1800);
    assert_eq!(evidence.dumped_at, at(3600));
}

#[test]
fn dump_measures_from_last_point_before_the_spike() {
    let history = vec![point(0, 1.0), point(1000, 2.0), point(2500, 1.5), point(4000, 0.9)];
    let evidence = PumpDumpDetector::detect_dump(&history, at(1800)).expect("dump");
    assert_eq!(evidence.peak_price, 2.0);
    assert_eq!(evidence.peaked_at, at(1000));
    assert_eq!(evidence.dump_price, 0.9);
    assert_eq!(evidence.dumped_at, at(4000));
    assert!((evidence.percentage_drop - 0.55).abs() < 1e-9);
    assert_eq!(evidence.timeframe_secs, 3000);
    assert_eq!(evidence.volume_during_dump_usd, 2000.0);
}

#[test]
fn dump_requires_a_spike_reference_and_a_deep_drop() {
    let history = vec![point(0, 1.0), point(1800, 2.0), point(3600, 0.9)];
    assert!(PumpDumpDetector::detect_dump(&history, at(-100)).is_none());

    let shallow = vec![point(0, 2.0), point(1800, 1.2)];
    assert!(PumpDumpDetector::detect_dump(&shallow, at(0)).is_none());

    let late = vec![point(0, 2.0), point(7300, 0.5)];
    assert!(PumpDumpDetector::detect_dump(&late, at(0)).is_none());
}

#[test]
fn faster_and_heavier_moves_score_higher() {
    let quick = PumpDumpDetector::detect_price_spike(&[point(0, 1.0), point(300, 3.2)]).expect("spike");
    let slow = PumpDumpDetector::detect_price_spike(&[point(0, 1.0), point(3000, 3.2)]).expect("spike");
    let quick_score = PumpDumpDetector::price_spike_confidence(&quick);
    let slow_score = PumpDumpDetector::price_spike_confidence(&slow);
    assert!(quick_score > slow_score);
    assert!(quick_score >= 80.0 && quick_score <= 100.0);
}

#[test]
fn scanner_chains_spike_into_dump() {
    let batch = MarketBatch {
        price_history: vec![point(0, 1.0), point(1800, 2.0), point(3600, 0.9)],
        ..Default::default()
    };
    let found = PumpDumpDetector::new().scan(&batch);
    assert_eq!(found.len(), 2);
    match (&found[0], &found[1]) {
        (Evidence::PriceSpike(spike), Evidence::Dump(dump)) => {
            assert_eq!(spike.peaked_at, at(1800));
            assert_eq!(dump.peaked_at, spike.peaked_at);
        }
        other => panic!("esperado alta seguida de queda, obtido {:?}", other),
    }
}
