//! CSV export of signal sets, one row per signal.

use std::io::Write;
use std::path::Path;

use crate::domain::error::SignalForgeError;
use crate::domain::signal::Signal;

const HEADERS: [&str; 15] = [
    "id",
    "symbol",
    "created_at",
    "direction",
    "entry_price",
    "target_price",
    "stop_loss",
    "risk_reward_ratio",
    "confidence",
    "quality_score",
    "source_tag",
    "execution_status",
    "execution_price",
    "executed_at",
    "profit_loss_pct",
];

pub fn export_signals<W: Write>(signals: &[Signal], writer: W) -> Result<(), SignalForgeError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(HEADERS)
        .map_err(|e| SignalForgeError::Export {
            reason: e.to_string(),
        })?;

    for signal in signals {
        let (status, price, executed_at, pct) = match &signal.outcome {
            Some(o) => (
                o.status.as_str().to_string(),
                o.execution_price.map(|p| p.to_string()).unwrap_or_default(),
                o.executed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                o.profit_loss_pct.map(|p| p.to_string()).unwrap_or_default(),
            ),
            None => (String::new(), String::new(), String::new(), String::new()),
        };

        csv_writer
            .write_record([
                signal.id.clone(),
                signal.symbol.clone(),
                signal.created_at.format("%Y-%m-%d").to_string(),
                signal.direction.as_str().to_string(),
                signal.entry_price.to_string(),
                signal.target_price.to_string(),
                signal.stop_loss.to_string(),
                signal.risk_reward_ratio.to_string(),
                signal.confidence.to_string(),
                signal.quality_score.to_string(),
                signal.source_tag.as_str().to_string(),
                status,
                price,
                executed_at,
                pct,
            ])
            .map_err(|e| SignalForgeError::Export {
                reason: e.to_string(),
            })?;
    }

    csv_writer.flush().map_err(|e| SignalForgeError::Export {
        reason: e.to_string(),
    })?;
    Ok(())
}

pub fn export_to_file<P: AsRef<Path>>(
    signals: &[Signal],
    path: P,
) -> Result<(), SignalForgeError> {
    let file = std::fs::File::create(path)?;
    export_signals(signals, file)
}
