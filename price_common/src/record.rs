//! Price records and the feed notification payload.
//!
//! A `PriceRecord` is one instrument's current bid/ask price and quantity as
//! shown in the live view. A `PriceChanged` is what a feed delivers to its
//! subscribers; it carries the same five fields plus the emit time.
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Current bid/ask price and quantity for a single instrument.
///
/// Equality and hashing cover all five fields. The routing identity of a
/// record inside the live view is `symbol` alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Instrument symbol, the unique key of the live view.
    pub symbol: String,
    /// Best bid price.
    pub bid_price: Decimal,
    /// Best ask price.
    pub ask_price: Decimal,
    /// Quantity available at the bid.
    pub bid_qty: Decimal,
    /// Quantity available at the ask.
    pub ask_qty: Decimal,
}

impl PriceRecord {
    /// Creates a record from its five fields.
    pub fn new(
        symbol: impl Into<String>,
        bid_price: Decimal,
        ask_price: Decimal,
        bid_qty: Decimal,
        ask_qty: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            bid_price,
            ask_price,
            bid_qty,
            ask_qty,
        }
    }

    /// Returns `true` when the symbol is usable as a live view key.
    pub fn has_symbol(&self) -> bool {
        !self.symbol.trim().is_empty()
    }

    /// Replaces the price and quantity fields with those of `other`.
    ///
    /// The symbol is left untouched: callers only apply this to the entry that
    /// already carries `other.symbol`.
    pub fn assign_from(&mut self, other: &PriceRecord) {
        self.bid_price = other.bid_price;
        self.ask_price = other.ask_price;
        self.bid_qty = other.bid_qty;
        self.ask_qty = other.ask_qty;
    }

    /// Encode the record to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl fmt::Display for PriceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Symbol {} : BidPrice {} : AskPrice {} : BidQty {} : AskQty {}",
            self.symbol, self.bid_price, self.ask_price, self.bid_qty, self.ask_qty
        )
    }
}

/// Change notification delivered by a price feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChanged {
    /// Instrument symbol.
    pub symbol: String,
    /// Best bid price.
    pub bid_price: Decimal,
    /// Best ask price.
    pub ask_price: Decimal,
    /// Quantity available at the bid.
    pub bid_qty: Decimal,
    /// Quantity available at the ask.
    pub ask_qty: Decimal,
    /// Time the feed emitted the update.
    pub timestamp: DateTime<Utc>,
}

impl PriceChanged {
    /// Creates a notification stamped with the current UTC time.
    pub fn new(
        symbol: impl Into<String>,
        bid_price: Decimal,
        ask_price: Decimal,
        bid_qty: Decimal,
        ask_qty: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            bid_price,
            ask_price,
            bid_qty,
            ask_qty,
            timestamp: Utc::now(),
        }
    }

    /// Builds the live view record carried by this notification.
    pub fn to_record(&self) -> PriceRecord {
        PriceRecord::new(
            self.symbol.clone(),
            self.bid_price,
            self.ask_price,
            self.bid_qty,
            self.ask_qty,
        )
    }
}

impl From<PriceChanged> for PriceRecord {
    fn from(event: PriceChanged) -> Self {
        PriceRecord {
            symbol: event.symbol,
            bid_price: event.bid_price,
            ask_price: event.ask_price,
            bid_qty: event.bid_qty,
            ask_qty: event.ask_qty,
        }
    }
}

/// Parses `SYMBOL,bid,ask,bidQty,askQty`. Whitespace around fields is ignored.
impl FromStr for PriceChanged {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        if fields.len() != 5 {
            return Err(format!("expected 5 fields, found {}", fields.len()));
        }
        if fields[0].is_empty() {
            return Err("empty symbol".to_string());
        }
        let decimal = |name: &str, raw: &str| {
            Decimal::from_str(raw).map_err(|e| format!("invalid {name} '{raw}': {e}"))
        };
        Ok(PriceChanged::new(
            fields[0],
            decimal("bid price", fields[1])?,
            decimal("ask price", fields[2])?,
            decimal("bid quantity", fields[3])?,
            decimal("ask quantity", fields[4])?,
        ))
    }
}

/// Trait providing reader parsing for recorded price updates.
pub trait PriceParser {
    /// Parses updates from a buffered reader.
    ///
    /// Each non-empty line that does not start with `#` is parsed as a single
    /// update using `FromStr`. Returns an error if any line cannot be parsed.
    fn parse_from_reader<R: BufRead>(reader: R) -> Result<Vec<PriceChanged>, PipelineError>;
}

impl PriceParser for PriceChanged {
    fn parse_from_reader<R: BufRead>(reader: R) -> Result<Vec<Self>, PipelineError> {
        let mut updates = Vec::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(PipelineError::Io)?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
                continue;
            }

            match trimmed_line.parse::<Self>() {
                Ok(update) => updates.push(update),
                Err(reason) => {
                    return Err(PipelineError::ParsePrices {
                        line: index + 1,
                        reason,
                    });
                }
            }
        }
        Ok(updates)
    }
}
