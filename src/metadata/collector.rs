use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::collect::global_variables::{
    DEFAULT_BATCH_CAPACITY, DEFAULT_BATCH_DELAY_MS, DEFAULT_POINT_DELAY_MS,
};
use crate::collect::gsv::gsv_collect::{MetadataFetcher, MetadataResponse};
use crate::error::CollectError;
use crate::geo_core::WgsTransform;
use crate::metadata::batch::{batch_ranges, BatchWriter};
use crate::metadata::sample_points::PointSource;

#[cfg(feature = "indicatif")]
use indicatif::{ProgressBar, ProgressStyle};

#[cfg(feature = "indicatif")]
fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent} {msg}")
        .unwrap()
        .progress_chars("##-")
}

/// Counters for one collection run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_points: usize,
    pub batches_total: usize,
    pub batches_written: usize,
    pub batches_skipped: usize,
    pub records_written: usize,
    pub points_without_panorama: usize,
    pub points_failed: usize,
}

/// Drives a collection run: partitions the input points into batches,
/// transforms each point to WGS 84, fetches its panorama metadata and
/// writes each completed batch to its own output unit.
///
/// Batches whose output unit already exists are skipped whole, so an
/// interrupted run resumes at the first incomplete batch. A network or
/// parse failure on one point is logged and skipped; it never aborts
/// the batch.
pub struct MetadataCollector<S, F> {
    source: S,
    fetcher: F,
    output_dir: PathBuf,
    pub batch_capacity: usize,
    pub point_delay: Duration,
    pub batch_delay: Duration,
}

impl<S: PointSource, F: MetadataFetcher> MetadataCollector<S, F> {
    pub fn new(source: S, fetcher: F, output_dir: impl Into<PathBuf>) -> Self {
        MetadataCollector {
            source,
            fetcher,
            output_dir: output_dir.into(),
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            point_delay: Duration::from_millis(DEFAULT_POINT_DELAY_MS),
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
        }
    }

    /// Process every batch not already materialized in the output
    /// directory.
    ///
    /// Points are processed in ascending index order and a batch's
    /// unit is written only after its full range has been processed,
    /// so killing the process mid-batch leaves no partial unit behind.
    pub fn run(&self) -> Result<RunSummary, CollectError> {
        let total_points = self.source.len();
        let ranges = batch_ranges(total_points, self.batch_capacity)?;

        // Resolve the native reference system before touching the
        // output directory, so a bad dataset fails before any unit or
        // directory is created.
        if let Some(first) = ranges.first() {
            let sample = self.source.sample(first.start)?;
            WgsTransform::new(sample.epsg)?;
        }

        let writer = BatchWriter::new(&self.output_dir)?;

        let mut summary = RunSummary {
            total_points,
            batches_total: ranges.len(),
            ..RunSummary::default()
        };

        println!(
            "Collecting metadata for {} points in {} batches",
            total_points,
            ranges.len()
        );

        #[cfg(feature = "indicatif")]
        let bar = if ranges.len() > 1 {
            let pb = ProgressBar::new(ranges.len() as u64);
            pb.set_style(progress_style());
            pb.set_message("Batches");
            pb.tick();
            Some(pb)
        } else {
            None
        };

        for range in &ranges {
            if writer.is_complete(range) {
                println!(
                    "Output unit {} already exists, skipping batch",
                    range.file_name()
                );
                summary.batches_skipped += 1;
                #[cfg(feature = "indicatif")]
                if let Some(ref pb) = bar {
                    pb.inc(1);
                }
                continue;
            }

            thread::sleep(self.batch_delay);

            let mut records = Vec::new();
            for index in range.indices() {
                let sample = self.source.sample(index)?;
                let transform = WgsTransform::new(sample.epsg)?;
                let coordinate = transform.apply(&sample.geometry)?;

                thread::sleep(self.point_delay);

                match self.fetcher.fetch_metadata(&coordinate) {
                    Ok(MetadataResponse::Panorama(record)) => {
                        println!(
                            "The coordinate ({},{}), panoId is: {}, panoDate is: {}",
                            record.longitude, record.latitude, record.pano_id, record.pano_date
                        );
                        records.push(record);
                    }
                    Ok(MetadataResponse::NoPanorama) => {
                        summary.points_without_panorama += 1;
                    }
                    Err(error @ (CollectError::Network(_) | CollectError::Parse(_))) => {
                        eprintln!("point {}: {}", index, error);
                        summary.points_failed += 1;
                    }
                    Err(error) => return Err(error),
                }
            }

            let unit = writer.write_batch(range, &records)?;
            println!("Saved {} records to {}", records.len(), unit.display());
            summary.records_written += records.len();
            summary.batches_written += 1;

            #[cfg(feature = "indicatif")]
            if let Some(ref pb) = bar {
                pb.inc(1);
            }
        }

        #[cfg(feature = "indicatif")]
        if let Some(ref pb) = bar {
            pb.finish_with_message("All batches processed");
        }

        Ok(summary)
    }
}
