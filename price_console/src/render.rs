//! Text rendering of the live view.
use chrono::{DateTime, Utc};
use price_common::PriceRecord;
use price_pipeline::{PipelineController, PipelineStats};

const HEADERS: [&str; 5] = ["Symbol", "BidQty", "BidPrice", "AskPrice", "AskQty"];

/// Render `records` as an aligned table headed by `now`.
pub fn price_table(records: &[PriceRecord], now: DateTime<Utc>) -> String {
    let rows: Vec<[String; 5]> = records
        .iter()
        .map(|r| {
            [
                r.symbol.clone(),
                r.bid_qty.to_string(),
                r.bid_price.to_string(),
                r.ask_price.to_string(),
                r.ask_qty.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = format!("Prices at {}\n", now.format("%H:%M:%S%.3f"));
    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths.iter())
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    out.push_str(header.join(" | ").trim_end());
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(i, (cell, w))| {
                if i == 0 {
                    format!("{:<w$}", cell, w = *w)
                } else {
                    format!("{:>w$}", cell, w = *w)
                }
            })
            .collect();
        out.push_str(&cells.join(" | "));
        out.push('\n');
    }
    out
}

/// One-line summary of the pipeline.
pub fn status_line(controller: &PipelineController) -> String {
    let PipelineStats {
        received,
        merged,
        dropped,
    } = controller.stats();
    format!(
        "state={} mode={} cycle={} queued={} workers={} received={} merged={} dropped={}",
        controller.state(),
        controller.mode(),
        controller.cycle(),
        controller.queue_len(),
        controller.live_workers(),
        received,
        merged,
        dropped
    )
}
