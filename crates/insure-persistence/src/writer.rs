//! JSON Lines file writers for claims payouts and hedge lifecycle events.
//!
//! JSON Lines format is used instead of a columnar format for robustness:
//! each line is a complete JSON object, so partial file corruption only
//! affects the lines it touches, and a reader can make progress even if the
//! writer was interrupted mid-flush.

use crate::error::PersistenceResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use tracing::{debug, info, warn};

/// One payout emitted by the claims monitor, per §4.4 step 6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub policy_id: u64,
    pub payout_cents: i64,
    pub beneficiary: String,
    pub trigger_price: f64,
    pub floor_price: f64,
    pub current_price: f64,
    pub interpolation_factor: f64,
    pub timestamp_ms: i64,
}

/// One hedge position lifecycle event (open or close), emitted by the hedge
/// orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeEventRecord {
    pub position_id: String,
    pub policy_id: u64,
    pub venue: String,
    pub event: String,
    pub hedge_amount_cents: i64,
    pub realized_pnl_cents: Option<i64>,
    pub timestamp_ms: i64,
}

/// Active writer state for one day's file.
struct ActiveWriter {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

/// Append-mode, date-rotated JSON Lines writer for [`PayoutRecord`]s.
pub struct PayoutWriter {
    base_dir: String,
    buffer: Vec<PayoutRecord>,
    max_buffer_size: usize,
    active_writer: Option<ActiveWriter>,
}

impl PayoutWriter {
    pub fn new(base_dir: &str, max_buffer_size: usize) -> Self {
        if let Err(e) = std::fs::create_dir_all(base_dir) {
            warn!(?e, "failed to create directory: {}", base_dir);
        }
        Self {
            base_dir: base_dir.to_string(),
            buffer: Vec::with_capacity(max_buffer_size),
            max_buffer_size,
            active_writer: None,
        }
    }

    pub fn add_record(&mut self, record: PayoutRecord) -> PersistenceResult<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    fn close_active_writer(&mut self) -> PersistenceResult<()> {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "failed to flush payout writer on close");
            }
            info!(date = %active.date, records = active.records_written, "closed payout writer");
        }
        Ok(())
    }

    fn create_new_writer(&mut self, date: &str) -> PersistenceResult<()> {
        let filename = format!("{}/payouts_{}.jsonl", self.base_dir, date);
        info!(filename = %filename, "opening payout writer (append mode)");
        let file = OpenOptions::new().create(true).append(true).open(&filename)?;
        self.active_writer = Some(ActiveWriter {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        });
        Ok(())
    }

    pub fn flush(&mut self) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let needs_rotation = self.active_writer.as_ref().map(|w| w.date != today).unwrap_or(false);
        if needs_rotation {
            self.close_active_writer()?;
        }
        if self.active_writer.is_none() {
            self.create_new_writer(&today)?;
        }

        let record_count = self.buffer.len();
        {
            let active = self.active_writer.as_mut().expect("active_writer should exist");
            for record in &self.buffer {
                let json = serde_json::to_string(record)?;
                writeln!(active.writer, "{}", json)?;
            }
            active.writer.flush()?;
            active.records_written += record_count;
        }

        debug!(date = %today, records = record_count, "flushed payouts");
        self.buffer.clear();
        Ok(())
    }

    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.close_active_writer()
    }
}

impl Drop for PayoutWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, "failed to flush payout buffer on drop");
        }
        if let Err(e) = self.close_active_writer() {
            warn!(?e, "failed to close payout writer on drop");
        }
    }
}

/// Append-mode, date-rotated JSON Lines writer for [`HedgeEventRecord`]s.
pub struct HedgeEventWriter {
    base_dir: String,
    buffer: Vec<HedgeEventRecord>,
    max_buffer_size: usize,
    active_writer: Option<ActiveWriter>,
}

impl HedgeEventWriter {
    pub fn new(base_dir: &str, max_buffer_size: usize) -> Self {
        if let Err(e) = std::fs::create_dir_all(base_dir) {
            warn!(?e, "failed to create directory: {}", base_dir);
        }
        Self {
            base_dir: base_dir.to_string(),
            buffer: Vec::with_capacity(max_buffer_size),
            max_buffer_size,
            active_writer: None,
        }
    }

    pub fn add_record(&mut self, record: HedgeEventRecord) -> PersistenceResult<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    fn close_active_writer(&mut self) -> PersistenceResult<()> {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "failed to flush hedge event writer on close");
            }
            info!(date = %active.date, records = active.records_written, "closed hedge event writer");
        }
        Ok(())
    }

    fn create_new_writer(&mut self, date: &str) -> PersistenceResult<()> {
        let filename = format!("{}/hedge_events_{}.jsonl", self.base_dir, date);
        info!(filename = %filename, "opening hedge event writer (append mode)");
        let file = OpenOptions::new().create(true).append(true).open(&filename)?;
        self.active_writer = Some(ActiveWriter {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        });
        Ok(())
    }

    pub fn flush(&mut self) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let needs_rotation = self.active_writer.as_ref().map(|w| w.date != today).unwrap_or(false);
        if needs_rotation {
            self.close_active_writer()?;
        }
        if self.active_writer.is_none() {
            self.create_new_writer(&today)?;
        }

        let record_count = self.buffer.len();
        {
            let active = self.active_writer.as_mut().expect("active_writer should exist");
            for record in &self.buffer {
                let json = serde_json::to_string(record)?;
                writeln!(active.writer, "{}", json)?;
            }
            active.writer.flush()?;
            active.records_written += record_count;
        }

        debug!(date = %today, records = record_count, "flushed hedge events");
        self.buffer.clear();
        Ok(())
    }

    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.close_active_writer()
    }
}

impl Drop for HedgeEventWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, "failed to flush hedge event buffer on drop");
        }
        if let Err(e) = self.close_active_writer() {
            warn!(?e, "failed to close hedge event writer on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use tempfile::TempDir;

    fn make_payout(id: u64) -> PayoutRecord {
        PayoutRecord {
            policy_id: id,
            payout_cents: 500_000,
            beneficiary: "0xabc".to_string(),
            trigger_price: 0.98,
            floor_price: 0.90,
            current_price: 0.94,
            interpolation_factor: 0.5,
            timestamp_ms: 1_700_000_000_000 + id as i64,
        }
    }

    #[test]
    fn write_and_read_payouts() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = PayoutWriter::new(temp_dir.path().to_str().unwrap(), 100);

        for i in 0..5 {
            writer.add_record(make_payout(i)).unwrap();
        }
        writer.close().unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);

        let file = File::open(entries[0].path()).unwrap();
        let reader = BufReader::new(file);
        let lines: Vec<_> = reader.lines().filter_map(|l| l.ok()).collect();
        assert_eq!(lines.len(), 5);

        let record: PayoutRecord = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(record.policy_id, 0);
        assert_eq!(record.payout_cents, 500_000);
    }

    #[test]
    fn append_mode_across_writer_lifetimes() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut writer = PayoutWriter::new(temp_dir.path().to_str().unwrap(), 100);
            for i in 0..3 {
                writer.add_record(make_payout(i)).unwrap();
            }
            writer.close().unwrap();
        }
        {
            let mut writer = PayoutWriter::new(temp_dir.path().to_str().unwrap(), 100);
            for i in 3..6 {
                writer.add_record(make_payout(i)).unwrap();
            }
            writer.close().unwrap();
        }

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        let file = File::open(entries[0].path()).unwrap();
        let reader = BufReader::new(file);
        let lines: Vec<_> = reader.lines().filter_map(|l| l.ok()).collect();
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn empty_flush_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = PayoutWriter::new(temp_dir.path().to_str().unwrap(), 100);
        writer.flush().unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn hedge_event_writer_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = HedgeEventWriter::new(temp_dir.path().to_str().unwrap(), 100);
        writer
            .add_record(HedgeEventRecord {
                position_id: "11111111-1111-1111-1111-111111111111".into(),
                policy_id: 1,
                venue: "polymarket".into(),
                event: "open".into(),
                hedge_amount_cents: 5_760,
                realized_pnl_cents: None,
                timestamp_ms: 0,
            })
            .unwrap();
        writer.close().unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);
    }
}
