use std::fs::create_dir_all;
use std::ops::Range;
use std::path::PathBuf;

use crate::collect::gsv::gsv_collect::PanoramaRecord;
use crate::error::CollectError;

/// Half-open index range [start, end) over the input point sequence.
///
/// The range fully determines the name of the batch's output unit, so
/// the mapping from range to unit is stable across runs with the same
/// batch capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: usize,
    pub end: usize,
}

impl BatchRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Point indices covered by this batch, in ascending order.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Output unit name for this range.
    pub fn file_name(&self) -> String {
        format!("Pnt_start{}_end{}.txt", self.start, self.end)
    }
}

/// Partition `point_count` indices into capacity-sized ranges. The
/// final range may be smaller; together they cover every index exactly
/// once.
pub fn batch_ranges(point_count: usize, capacity: usize) -> Result<Vec<BatchRange>, CollectError> {
    if capacity == 0 {
        return Err(CollectError::Configuration(
            "batch capacity must be positive".to_string(),
        ));
    }

    let mut ranges = Vec::with_capacity(point_count.div_ceil(capacity));
    let mut start = 0;
    while start < point_count {
        let end = (start + capacity).min(point_count);
        ranges.push(BatchRange { start, end });
        start = end;
    }
    Ok(ranges)
}

/// Writes each batch's records to a write-once text unit in the output
/// directory. The existence of a unit is the sole marker that its
/// batch completed.
pub struct BatchWriter {
    output_dir: PathBuf,
}

impl BatchWriter {
    /// Creates the output directory if absent. Safe to call on every
    /// run.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, CollectError> {
        let output_dir = output_dir.into();
        create_dir_all(&output_dir)?;
        Ok(BatchWriter { output_dir })
    }

    pub fn unit_path(&self, range: &BatchRange) -> PathBuf {
        self.output_dir.join(range.file_name())
    }

    /// Whether the batch's output unit already exists from an earlier
    /// run.
    pub fn is_complete(&self, range: &BatchRange) -> bool {
        self.unit_path(range).exists()
    }

    /// Write all records for a batch to its output unit in one shot.
    ///
    /// An empty record set still produces a unit; a batch with no
    /// panoramas is complete and must not be retried on the next run.
    ///
    /// The contents go to a staging file first and are renamed into
    /// place, so an interrupted write can never leave a partial unit
    /// behind as a completion marker.
    pub fn write_batch(
        &self,
        range: &BatchRange,
        records: &[PanoramaRecord],
    ) -> Result<PathBuf, CollectError> {
        let path = self.unit_path(range);
        let mut contents = String::new();
        for record in records {
            contents.push_str(&record.to_line());
        }
        // Staging names end in .part and can never collide with a unit
        // name, so a stale one is overwritten on the next attempt.
        let staging = path.with_extension("txt.part");
        std::fs::write(&staging, contents)?;
        if let Err(e) = std::fs::rename(&staging, &path) {
            let _ = std::fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> PanoramaRecord {
        PanoramaRecord {
            pano_id: id.to_string(),
            pano_date: "2014-07".to_string(),
            longitude: -71.0944,
            latitude: 42.3459,
        }
    }

    #[test]
    fn test_batch_ranges_partition() {
        let ranges = batch_ranges(2507, 1000).unwrap();
        assert_eq!(
            ranges,
            vec![
                BatchRange { start: 0, end: 1000 },
                BatchRange {
                    start: 1000,
                    end: 2000
                },
                BatchRange {
                    start: 2000,
                    end: 2507
                },
            ]
        );
        // contiguous cover, no gap or overlap
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_batch_ranges_exact_multiple() {
        let ranges = batch_ranges(2000, 1000).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1], BatchRange { start: 1000, end: 2000 });
    }

    #[test]
    fn test_batch_ranges_small_input() {
        let ranges = batch_ranges(5, 1000).unwrap();
        assert_eq!(ranges, vec![BatchRange { start: 0, end: 5 }]);
        assert_eq!(ranges[0].len(), 5);
    }

    #[test]
    fn test_batch_ranges_empty_input() {
        assert!(batch_ranges(0, 1000).unwrap().is_empty());
    }

    #[test]
    fn test_batch_ranges_zero_capacity() {
        let err = batch_ranges(10, 0).unwrap_err();
        assert!(matches!(err, CollectError::Configuration(_)));
    }

    #[test]
    fn test_unit_file_name() {
        let range = BatchRange { start: 0, end: 1000 };
        assert_eq!(range.file_name(), "Pnt_start0_end1000.txt");
        let range = BatchRange {
            start: 2000,
            end: 2507,
        };
        assert_eq!(range.file_name(), "Pnt_start2000_end2507.txt");
    }

    #[test]
    fn test_writer_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("metadata_test");
        let _writer = BatchWriter::new(&output_dir).unwrap();
        assert!(output_dir.is_dir());
        // idempotent
        let _writer = BatchWriter::new(&output_dir).unwrap();
    }

    #[test]
    fn test_write_batch_and_completion_marker() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BatchWriter::new(dir.path()).unwrap();
        let range = BatchRange { start: 0, end: 2 };

        assert!(!writer.is_complete(&range));
        let path = writer
            .write_batch(&range, &[record("first"), record("second")])
            .unwrap();
        assert!(writer.is_complete(&range));

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            contents,
            "panoID: first panoDate: 2014-07 longitude: -71.0944 latitude: 42.3459\n\
             panoID: second panoDate: 2014-07 longitude: -71.0944 latitude: 42.3459\n"
        );
    }

    #[test]
    fn test_empty_batch_still_produces_unit() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BatchWriter::new(dir.path()).unwrap();
        let range = BatchRange { start: 0, end: 10 };

        writer.write_batch(&range, &[]).unwrap();
        assert!(writer.is_complete(&range));
        let contents = std::fs::read_to_string(writer.unit_path(&range)).unwrap();
        assert!(contents.is_empty());
    }

    #[test]
    fn test_interrupted_write_leaves_no_completion_marker() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BatchWriter::new(dir.path()).unwrap();
        let range = BatchRange { start: 0, end: 2 };
        let staging = dir.path().join("Pnt_start0_end2.txt.part");

        // A run killed mid-write leaves only the staging file behind.
        std::fs::write(&staging, "panoID: trunc").unwrap();
        assert!(!writer.is_complete(&range));

        // The next attempt overwrites the stale staging file and the
        // unit appears whole or not at all.
        writer.write_batch(&range, &[record("fresh")]).unwrap();
        assert!(writer.is_complete(&range));
        assert!(!staging.exists());
        let contents = std::fs::read_to_string(writer.unit_path(&range)).unwrap();
        assert_eq!(
            contents,
            "panoID: fresh panoDate: 2014-07 longitude: -71.0944 latitude: 42.3459\n"
        );
    }

    #[test]
    fn test_write_batch_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BatchWriter::new(dir.path()).unwrap();
        let range = BatchRange { start: 0, end: 1 };

        // A directory squatting on the unit path makes the rename fail.
        std::fs::create_dir(writer.unit_path(&range)).unwrap();
        let err = writer.write_batch(&range, &[record("blocked")]).unwrap_err();
        assert!(matches!(err, CollectError::Io(_)));
        assert!(!dir.path().join("Pnt_start0_end1.txt.part").exists());
    }
}
