use chrono::{Duration, TimeZone, Utc};
use ethernity_core::ingest::{screen, trades_from_json, wallets_from_json, price_points_from_json};
use ethernity_core::utils::*;
use ethernity_core::*;
use ethereum_types::{Address, H256};
use serde_json::json;
use std::str::FromStr;

fn sample_trade() -> Trade {
    Trade {
        tx_hash: H256::repeat_byte(0x11),
        wallet_address: Address::repeat_byte(0x22),
        token_address: Address::repeat_byte(0x33),
        amount: 4.0,
        price: 2.5,
        timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        side: TradeSide::Buy,
    }
}

#[test]
fn trade_invariants() {
    let trade = sample_trade();
    assert!(trade.validate().is_ok());
    assert_eq!(trade.volume_usd(), 10.0);
    assert!(trade.is_buy() && !trade.is_sell());

    let zero_price = Trade { price: 0.0, ..sample_trade() };
    assert!(matches!(zero_price.validate(), Err(Error::ValidationError(_))));

    let nan_amount = Trade { amount: f64::NAN, ..sample_trade() };
    assert!(nan_amount.validate().is_err());
}

#[test]
fn trade_side_parsing() {
    assert_eq!(TradeSide::from_str("BUY").unwrap(), TradeSide::Buy);
    assert_eq!(TradeSide::from_str(" sell ").unwrap(), TradeSide::Sell);
    assert_eq!(TradeSide::Buy.opposite(), TradeSide::Sell);
    assert!(matches!(TradeSide::from_str("hold"), Err(Error::ValidationError(_))));
}

#[test]
fn price_and_wallet_invariants() {
    let t = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    assert!(PricePoint { timestamp: t, price: 1.0, volume_usd: 0.0 }.validate().is_ok());
    assert!(PricePoint { timestamp: t, price: -1.0, volume_usd: 0.0 }.validate().is_err());
    assert!(PricePoint { timestamp: t, price: 1.0, volume_usd: -0.5 }.validate().is_err());

    let wallet = WalletInfo {
        address: Address::repeat_byte(0x44),
        creation_time: t,
        balance: 0.0,
        transaction_count: 0,
        last_activity: t,
    };
    assert!(wallet.validate().is_ok());
    assert!(WalletInfo { balance: -1.0, ..wallet.clone() }.validate().is_err());
    assert_eq!(wallet.reference(), format!("wallet 0x{}", "44".repeat(20)));
}

#[test]
fn screening_keeps_valid_records() {
    let trades = vec![sample_trade(), Trade { amount: -1.0, ..sample_trade() }, sample_trade()];
    let screened = screen(&trades);
    assert_eq!(screened.accepted.len(), 2);
    assert_eq!(screened.rejected.len(), 1);
    assert!(screened.rejected[0].reference.starts_with("trade 0x1111"));
}

#[test]
fn json_ingest_rejects_single_bad_record() {
    let value = json!([
        {
            "tx_hash": format!("0x{}", "01".repeat(32)),
            "wallet_address": format!("0x{}", "aa".repeat(20)),
            "token_address": format!("0x{}", "bb".repeat(20)),
            "amount": 10.0,
            "price": 1.5,
            "timestamp": "2024-02-01T10:00:00Z",
            "side": "buy"
        },
        {
            "tx_hash": format!("0x{}", "02".repeat(32)),
            "wallet_address": format!("0x{}", "aa".repeat(20)),
            "token_address": format!("0x{}", "bb".repeat(20)),
            "amount": 10.0,
            "price": 1.5,
            "timestamp": "2024-02-01T10:01:00Z",
            "side": "hold"
        },
        {
            "tx_hash": format!("0x{}", "03".repeat(32)),
            "wallet_address": format!("0x{}", "aa".repeat(20)),
            "token_address": format!("0x{}", "bb".repeat(20)),
            "amount": 0.0,
            "price": 1.5,
            "timestamp": "2024-02-01T10:02:00Z",
            "side": "sell"
        }
    ]);

    let screened = trades_from_json(&value).unwrap();
    assert_eq!(screened.accepted.len(), 1);
    assert_eq!(screened.accepted[0].side, TradeSide::Buy);
    assert_eq!(screened.rejected.len(), 2);
    assert_eq!(screened.rejected[0].reference, "trade #1");
    assert!(screened.rejected[0].reason.starts_with("Erro de decodificação"));
    assert!(screened.rejected[1].reason.starts_with("Erro de validação"));
}

#[test]
fn json_ingest_requires_an_array() {
    assert!(matches!(price_points_from_json(&json!({"price": 1.0})), Err(Error::DecodeError(_))));

    let wallets = wallets_from_json(&json!([])).unwrap();
    assert!(wallets.accepted.is_empty() && wallets.rejected.is_empty());
}

#[test]
fn time_helpers() {
    let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let t1 = t0 + Duration::seconds(3600);
    assert!(within_window(t0, t1, 3600));
    assert!(!within_window(t0, t1 + Duration::milliseconds(1), 3600));
    assert!(!within_window(t1, t0, 3600));
    assert_eq!(span_secs(t0, t1), 3600);
    assert_eq!(span_secs(t1, t0), 0);
    assert_eq!(abs_diff_secs(t1, t0), 3600.0);

    let mut points = vec![
        PricePoint { timestamp: t1, price: 2.0, volume_usd: 0.0 },
        PricePoint { timestamp: t0, price: 1.0, volume_usd: 0.0 },
    ];
    sort_by_time(&mut points);
    assert_eq!(points[0].price, 1.0);
}

#[test]
fn address_helpers() {
    let address = Address::repeat_byte(0x22);
    assert_eq!(format_address(&address), format!("0x{}", "22".repeat(20)));
    assert_eq!(short_address(&address), "0x22222222");
}

#[test]
fn trade_side_decodes_case_insensitively() {
    let side: TradeSide = serde_json::from_value(json!("SELL")).unwrap();
    assert_eq!(side, TradeSide::Sell);
    assert_eq!(serde_json::to_value(TradeSide::Buy).unwrap(), json!("buy"));

    let err = serde_json::from_value::<TradeSide>(json!("hold")).unwrap_err();
    assert!(err.to_string().contains("lado de negociação desconhecido"));
}
