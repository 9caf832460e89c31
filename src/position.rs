//! Typed rows of `GET /position`.

use std::fmt;

use bon::Builder;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// 1 XBT = 100,000,000 XBt (satoshis).
pub const SATOSHIS_PER_XBT: Decimal = dec!(100000000);

/// Columns requested by default.
pub const COLUMNS: [&str; 15] = [
    "symbol",
    "leverage",
    "openingTimestamp",
    "openingQty",
    "currentQty",
    "realisedCost",
    "markPrice",
    "realisedGrossPnl",
    "unrealisedGrossPnl",
    "simplePnl",
    "liquidationPrice",
    "lastPrice",
    "breakEvenPrice",
    "avgEntryPrice",
    "prevClosePrice",
];

/// An open (or recently closed) position. Amounts suffixed `pnl`/`cost` are in XBt.
///
/// Fields the exchange omits or sends as `null`, or that were filtered out through
/// `columns`, decode as `None`. Quantity and PnL helpers read `None` as zero.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Position {
    pub account: Option<i64>,
    pub symbol: String,
    pub currency: Option<String>,
    pub leverage: Option<f64>,
    pub opening_timestamp: Option<DateTime<Utc>>,
    pub opening_qty: Option<i64>,
    pub current_qty: Option<i64>,
    pub realised_cost: Option<i64>,
    pub mark_price: Option<f64>,
    pub realised_gross_pnl: Option<i64>,
    pub unrealised_gross_pnl: Option<i64>,
    pub simple_pnl: Option<f64>,
    pub liquidation_price: Option<f64>,
    pub last_price: Option<f64>,
    pub break_even_price: Option<f64>,
    pub avg_entry_price: Option<f64>,
    pub prev_close_price: Option<f64>,
}

impl Position {
    #[must_use]
    pub fn realised_pnl_xbt(&self) -> Decimal {
        Decimal::from(self.realised_gross_pnl.unwrap_or_default()) / SATOSHIS_PER_XBT
    }

    #[must_use]
    pub fn unrealised_pnl_xbt(&self) -> Decimal {
        Decimal::from(self.unrealised_gross_pnl.unwrap_or_default()) / SATOSHIS_PER_XBT
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.current_qty.is_some_and(|qty| qty != 0)
    }

    /// Signed contract count, zero when the exchange reports none.
    #[must_use]
    pub fn quantity(&self) -> i64 {
        self.current_qty.unwrap_or_default()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}: {} Entry:{} Market:{} Liquid:{} rpnl: {} upnl: {}>",
            self.symbol,
            self.quantity(),
            Price(self.avg_entry_price),
            Price(self.mark_price),
            Price(self.liquidation_price),
            self.realised_pnl_xbt().normalize(),
            self.unrealised_pnl_xbt().normalize(),
        )
    }
}

/// Whole-unit price, `-` when absent.
struct Price(Option<f64>);

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(price) => write!(f, "{}", price.trunc()),
            None => f.write_str("-"),
        }
    }
}

/// Parameters for `GET /position`.
#[non_exhaustive]
#[derive(Clone, Debug, Builder, PartialEq)]
pub struct PositionQuery {
    #[builder(default = default_columns())]
    pub columns: Vec<String>,
    /// Restrict to a single contract.
    #[builder(into)]
    pub symbol: Option<String>,
}

impl Default for PositionQuery {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            symbol: None,
        }
    }
}

impl PositionQuery {
    #[must_use]
    pub fn params(&self) -> Value {
        let mut params = Map::new();
        if !self.columns.is_empty() {
            params.insert("columns".to_owned(), json!(self.columns));
        }
        if let Some(symbol) = &self.symbol {
            params.insert("filter".to_owned(), json!({ "symbol": symbol }));
        }
        Value::Object(params)
    }
}

fn default_columns() -> Vec<String> {
    COLUMNS.iter().map(|c| (*c).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn xbtusd() -> Value {
        json!({
            "account": 12345,
            "symbol": "XBTUSD",
            "currency": "XBt",
            "leverage": 10,
            "openingTimestamp": "2018-03-06T12:00:00.000Z",
            "openingQty": 0,
            "currentQty": 100,
            "realisedCost": -1500,
            "markPrice": 6510.37,
            "realisedGrossPnl": 150_000,
            "unrealisedGrossPnl": -2_500_000,
            "simplePnl": 0.01,
            "liquidationPrice": 5920.5,
            "lastPrice": 6510.37,
            "breakEvenPrice": 6500.5,
            "avgEntryPrice": 6500.5,
            "prevClosePrice": 6480.0,
            "riskLimit": 20_000_000_000_i64
        })
    }

    #[test]
    fn decodes_full_row_and_ignores_unknown_fields() {
        let position: Position = serde_json::from_value(xbtusd()).unwrap();

        assert_eq!(position.symbol, "XBTUSD");
        assert_eq!(position.account, Some(12345));
        assert_eq!(position.leverage, Some(10.0));
        assert_eq!(
            position.opening_timestamp,
            Some(Utc.with_ymd_and_hms(2018, 3, 6, 12, 0, 0).unwrap())
        );
        assert_eq!(position.current_qty, Some(100));
        assert_eq!(position.mark_price, Some(6510.37));
        assert!(position.is_open(), "current qty is non-zero");
    }

    #[test]
    fn missing_and_null_fields_take_defaults() {
        let position: Position = serde_json::from_value(json!({
            "symbol": "ETHUSD",
            "markPrice": null,
            "currentQty": null,
            "realisedGrossPnl": null
        }))
        .unwrap();

        assert_eq!(position.symbol, "ETHUSD");
        assert_eq!(position.mark_price, None);
        assert_eq!(position.current_qty, None);
        assert_eq!(position.realised_gross_pnl, None);
        assert_eq!(position.unrealised_gross_pnl, None);
        assert_eq!(position.opening_timestamp, None);
        assert_eq!(position.quantity(), 0);
        assert_eq!(position.realised_pnl_xbt(), Decimal::ZERO);
        assert!(!position.is_open(), "flat position");
    }

    #[test]
    fn never_traded_row_displays_zeroes() {
        let position: Position = serde_json::from_value(json!({
            "symbol": "XBTUSD",
            "openingQty": null,
            "currentQty": null,
            "realisedCost": null,
            "realisedGrossPnl": null,
            "unrealisedGrossPnl": null
        }))
        .unwrap();

        assert_eq!(
            position.to_string(),
            "<XBTUSD: 0 Entry:- Market:- Liquid:- rpnl: 0 upnl: 0>"
        );
    }

    #[test]
    fn pnl_converts_satoshis_to_xbt() {
        let position: Position = serde_json::from_value(xbtusd()).unwrap();

        assert_eq!(position.realised_pnl_xbt(), dec!(0.0015));
        assert_eq!(position.unrealised_pnl_xbt(), dec!(-0.025));
    }

    #[test]
    fn display_summarises_position() {
        let position: Position = serde_json::from_value(xbtusd()).unwrap();

        assert_eq!(
            position.to_string(),
            "<XBTUSD: 100 Entry:6500 Market:6510 Liquid:5920 rpnl: 0.0015 upnl: -0.025>"
        );
    }

    #[test]
    fn default_query_requests_all_columns() {
        let query = PositionQuery::default();

        assert_eq!(query.columns.len(), COLUMNS.len());
        assert_eq!(query.params()["columns"][0], "symbol");
        assert!(query.params().get("filter").is_none(), "no symbol filter");
    }

    #[test]
    fn builder_sets_symbol_filter() {
        let query = PositionQuery::builder()
            .columns(vec!["currentQty".to_owned()])
            .symbol("XBTUSD")
            .build();

        assert_eq!(
            query.params(),
            json!({"columns": ["currentQty"], "filter": {"symbol": "XBTUSD"}})
        );
        assert_eq!(PositionQuery::builder().build(), PositionQuery::default());
    }
}
