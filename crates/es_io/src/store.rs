//! `EventStore`: the facade that ties layout, writer, dedup index, scanner,
//! checkpoint, and snapshot helpers together behind one handle per
//! workspace. Each envelope class gets its own lazily-built dedup index.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use es_core::model::{EmissionEnvelope, ReplayCheckpoint, SignalEnvelope};
use serde_json::Value;

use crate::checkpoint::{
    build_checkpoint, iter_from_checkpoint, iter_from_checkpoint_filtered, read_checkpoint,
    write_checkpoint,
};
use crate::dedup::DedupIndex;
use crate::error::{IoError, IoResult};
use crate::layout::{EnvelopeClass, StoreLayout};
use crate::scan::RangeScanner;
use crate::snapshot::{
    read_calibration_snapshot, read_daily_digest_snapshot, write_calibration_snapshot,
    write_daily_digest_snapshot, write_snapshot, DayKey,
};
use crate::writer::{AppendWriter, DuplicatePolicy};

pub struct EventStore {
    layout: StoreLayout,
    signal_index: RefCell<Option<DedupIndex>>,
    emission_index: RefCell<Option<DedupIndex>>,
}

impl EventStore {
    /// Opens (and, if needed, creates) the store rooted at `workspace`.
    /// Eagerly creates the four fixed subdirectories — idempotent, matching
    /// the layout's directory contract.
    pub fn open(workspace: impl AsRef<Path>) -> IoResult<Self> {
        let layout = StoreLayout::new(workspace);
        layout.ensure_dirs()?;
        Ok(Self {
            layout,
            signal_index: RefCell::new(None),
            emission_index: RefCell::new(None),
        })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    fn with_signal_index<R>(&self, f: impl FnOnce(&mut DedupIndex) -> IoResult<R>) -> IoResult<R> {
        let mut slot = self.signal_index.borrow_mut();
        if slot.is_none() {
            *slot = Some(DedupIndex::rebuild::<SignalEnvelope>(
                &self.layout,
                EnvelopeClass::Signal,
            )?);
        }
        f(slot.as_mut().unwrap())
    }

    fn with_emission_index<R>(&self, f: impl FnOnce(&mut DedupIndex) -> IoResult<R>) -> IoResult<R> {
        let mut slot = self.emission_index.borrow_mut();
        if slot.is_none() {
            *slot = Some(DedupIndex::rebuild::<EmissionEnvelope>(
                &self.layout,
                EnvelopeClass::Emission,
            )?);
        }
        f(slot.as_mut().unwrap())
    }

    pub fn write_signal(
        &self,
        envelope: &SignalEnvelope,
        policy: DuplicatePolicy,
    ) -> IoResult<PathBuf> {
        let writer = AppendWriter::new(&self.layout, EnvelopeClass::Signal);
        self.with_signal_index(|idx| writer.write(idx, envelope, policy))
    }

    pub fn write_emission(
        &self,
        envelope: &EmissionEnvelope,
        policy: DuplicatePolicy,
    ) -> IoResult<PathBuf> {
        let writer = AppendWriter::new(&self.layout, EnvelopeClass::Emission);
        self.with_emission_index(|idx| writer.write(idx, envelope, policy))
    }

    pub fn write_signals(
        &self,
        envelopes: &[SignalEnvelope],
        policy: DuplicatePolicy,
    ) -> IoResult<Vec<PathBuf>> {
        let writer = AppendWriter::new(&self.layout, EnvelopeClass::Signal);
        self.with_signal_index(|idx| writer.write_batch(idx, envelopes, policy))
    }

    pub fn write_emissions(
        &self,
        envelopes: &[EmissionEnvelope],
        policy: DuplicatePolicy,
    ) -> IoResult<Vec<PathBuf>> {
        let writer = AppendWriter::new(&self.layout, EnvelopeClass::Emission);
        self.with_emission_index(|idx| writer.write_batch(idx, envelopes, policy))
    }

    pub fn scan_signals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> IoResult<RangeScanner<SignalEnvelope>> {
        RangeScanner::new(&self.layout, EnvelopeClass::Signal, start, end)
    }

    pub fn scan_emissions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> IoResult<RangeScanner<EmissionEnvelope>> {
        RangeScanner::new(&self.layout, EnvelopeClass::Emission, start, end)
    }

    pub fn iter_signals_from_checkpoint(
        &self,
        checkpoint: &ReplayCheckpoint,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> IoResult<impl Iterator<Item = Result<SignalEnvelope, IoError>>> {
        iter_from_checkpoint::<SignalEnvelope>(
            &self.layout,
            EnvelopeClass::Signal,
            checkpoint,
            start,
            end,
        )
    }

    pub fn iter_signals_from_checkpoint_filtered(
        &self,
        checkpoint: &ReplayCheckpoint,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        predicate: impl FnMut(&SignalEnvelope) -> bool + 'static,
    ) -> IoResult<impl Iterator<Item = Result<SignalEnvelope, IoError>>> {
        iter_from_checkpoint_filtered::<SignalEnvelope>(
            &self.layout,
            EnvelopeClass::Signal,
            checkpoint,
            start,
            end,
            predicate,
        )
    }

    pub fn iter_emissions_from_checkpoint(
        &self,
        checkpoint: &ReplayCheckpoint,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> IoResult<impl Iterator<Item = Result<EmissionEnvelope, IoError>>> {
        iter_from_checkpoint::<EmissionEnvelope>(
            &self.layout,
            EnvelopeClass::Emission,
            checkpoint,
            start,
            end,
        )
    }

    pub fn iter_emissions_from_checkpoint_filtered(
        &self,
        checkpoint: &ReplayCheckpoint,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        predicate: impl FnMut(&EmissionEnvelope) -> bool + 'static,
    ) -> IoResult<impl Iterator<Item = Result<EmissionEnvelope, IoError>>> {
        iter_from_checkpoint_filtered::<EmissionEnvelope>(
            &self.layout,
            EnvelopeClass::Emission,
            checkpoint,
            start,
            end,
            predicate,
        )
    }

    pub fn build_signal_checkpoint(
        processed: &[SignalEnvelope],
    ) -> IoResult<Option<ReplayCheckpoint>> {
        build_checkpoint(processed)
    }

    pub fn build_emission_checkpoint(
        processed: &[EmissionEnvelope],
    ) -> IoResult<Option<ReplayCheckpoint>> {
        build_checkpoint(processed)
    }

    pub fn write_checkpoint(&self, name: &str, checkpoint: &ReplayCheckpoint) -> IoResult<()> {
        write_checkpoint(&self.layout, name, checkpoint)
    }

    pub fn read_checkpoint(&self, name: &str) -> IoResult<Option<ReplayCheckpoint>> {
        read_checkpoint(&self.layout, name)
    }

    pub fn write_snapshot<T: serde::Serialize>(
        &self,
        name: &str,
        at: DateTime<Utc>,
        payload: &T,
    ) -> IoResult<()> {
        write_snapshot(&self.layout, name, at, payload)
    }

    pub fn write_daily_digest_snapshot(
        &self,
        day: impl Into<DayKey>,
        digest: Value,
    ) -> IoResult<()> {
        write_daily_digest_snapshot(&self.layout, day, digest)
    }

    pub fn read_daily_digest_snapshot(&self, day: &str) -> IoResult<Option<Value>> {
        read_daily_digest_snapshot(&self.layout, day)
    }

    pub fn write_calibration_snapshot(
        &self,
        day: impl Into<DayKey>,
        report: Value,
    ) -> IoResult<()> {
        write_calibration_snapshot(&self.layout, day, report)
    }

    pub fn read_calibration_snapshot(&self, day: &str) -> IoResult<Option<Value>> {
        read_calibration_snapshot(&self.layout, day)
    }
}
