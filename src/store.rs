//! Hit Store: the append-only record stream connecting simulation to
//! reconstruction and analysis.
//!
//! On disk, a store is a `ZVTX` header followed by little-endian tagged
//! records. Records of one event are contiguous and events appear in
//! increasing id order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;

use binrw::{binrw, BinReaderExt, BinWriterExt};
use itertools::Itertools;

use geometry::Point;
use crate::Result;

const FORMAT_VERSION: u8 = 1;

#[binrw]
#[brw(little, magic = b"ZVTX")]
#[derive(Debug, Clone, Copy, PartialEq)]
struct Header {
    version: u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record {
    #[brw(magic = 1_u8)] PrimaryVertex      (PrimaryVertex),
    #[brw(magic = 2_u8)] DetectorHit        (DetectorHit),
    #[brw(magic = 3_u8)] ReconstructedVertex(ReconstructedVertex),
}

/// Generated collision point
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimaryVertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub multiplicity: u32,
    pub event_id: u64,
}

/// Detector-response-smeared hit on one of the sensitive shells
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorHit {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub event_id: u64,
    /// 0 for noise
    pub particle_id: u64,
    /// 1: inner, 2: outer
    pub detector_id: u8,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructedVertex {
    pub z: f64,
    pub event_id: u64,
}

impl DetectorHit {
    pub fn position(&self) -> Point { Point::new(self.x, self.y, self.z) }
}

impl Record {

    pub fn event_id(&self) -> u64 {
        match self {
            Record::PrimaryVertex      (r) => r.event_id,
            Record::DetectorHit        (r) => r.event_id,
            Record::ReconstructedVertex(r) => r.event_id,
        }
    }

    pub fn primary_vertex(&self) -> Option<&PrimaryVertex> {
        if let Record::PrimaryVertex(v) = self { Some(v) } else { None }
    }

    pub fn detector_hit(&self) -> Option<&DetectorHit> {
        if let Record::DetectorHit(h) = self { Some(h) } else { None }
    }

    pub fn reconstructed_vertex(&self) -> Option<&ReconstructedVertex> {
        if let Record::ReconstructedVertex(v) = self { Some(v) } else { None }
    }
}

impl From<PrimaryVertex>       for Record { fn from(r: PrimaryVertex      ) -> Self { Self::PrimaryVertex(r) } }
impl From<DetectorHit>         for Record { fn from(r: DetectorHit        ) -> Self { Self::DetectorHit(r) } }
impl From<ReconstructedVertex> for Record { fn from(r: ReconstructedVertex) -> Self { Self::ReconstructedVertex(r) } }

/// Destination for records, in memory or on disk
pub trait HitSink {
    fn append(&mut self, record: Record) -> Result<()>;

    fn append_all(&mut self, records: impl IntoIterator<Item = Record>) -> Result<()> where Self: Sized {
        for record in records { self.append(record)? }
        Ok(())
    }
}

/// In-memory Hit Store
impl HitSink for Vec<Record> {
    fn append(&mut self, record: Record) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

/// On-disk Hit Store, open for appending
pub struct HitWriter<W: Write + Seek = BufWriter<File>> {
    writer: W,
}

impl HitWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write + Seek> HitWriter<W> {

    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_le(&Header { version: FORMAT_VERSION })?;
        Ok(Self { writer })
    }

    /// Flush buffered records and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write + Seek> HitSink for HitWriter<W> {
    fn append(&mut self, record: Record) -> Result<()> {
        self.writer.write_le(&record)?;
        Ok(())
    }
}

/// Read every record in the store at `path`, in order
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let Header { version } = reader.read_le()?;
    if version != FORMAT_VERSION {
        return Err(crate::Error::StoreVersion { path: path.into(), found: version, expected: FORMAT_VERSION })
    }
    let mut records = vec![];
    while reader.stream_position()? < len {
        records.push(reader.read_le::<Record>()?);
    }
    Ok(records)
}

/// Write `records` to a new store at `path`
pub fn write_records<'r>(path: &Path, records: impl IntoIterator<Item = &'r Record>) -> Result<()> {
    let mut writer = HitWriter::create(path)?;
    writer.append_all(records.into_iter().copied())?;
    writer.finish()?;
    Ok(())
}

pub fn primary_vertices(records: &[Record]) -> Vec<PrimaryVertex> {
    records.iter().filter_map(Record::primary_vertex).copied().collect()
}

pub fn reconstructed_vertices(records: &[Record]) -> Vec<ReconstructedVertex> {
    records.iter().filter_map(Record::reconstructed_vertex).copied().collect()
}

/// Detector hits grouped by event, relying on each event's hits being contiguous
pub fn hits_by_event(records: &[Record]) -> Vec<(u64, Vec<DetectorHit>)> {
    records.iter()
        .filter_map(Record::detector_hit)
        .copied()
        .group_by(|h| h.event_id)
        .into_iter()
        .map(|(event_id, group)| (event_id, group.collect()))
        .collect()
}
