// Example: Collecting Street View panorama metadata along a GeoJSON
// sample grid
//
// IMPORTANT:
// - The metadata endpoint requires an internet connection
// - The service may rate limit aggressive clients; the collector
//   paces requests and batches for this reason
// - Re-running with the same output folder resumes after the last
//   completed batch
//
use anyhow::Result;
use rsgsv::collect::gsv::gsv_collect::GsvCollect;
use rsgsv::metadata::collector::MetadataCollector;
use rsgsv::metadata::sample_points::{PointSource, SamplePoints};

fn main() -> Result<()> {
    println!("=== Example: Collecting GSV metadata from a GeoJSON grid ===\n");

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .unwrap_or_else(|| "sample-spatialdata/Cambridge20m.geojson".to_string());
    let output = args.next().unwrap_or_else(|| "metadata_test".to_string());
    let capacity: usize = match args.next() {
        Some(raw) => raw.parse()?,
        None => 1000,
    };

    println!("Input dataset: {}", input);
    println!("Output folder: {}", output);
    println!("Batch capacity: {}\n", capacity);

    let source = SamplePoints::from_geojson_file(&input)?;
    println!(
        "Loaded {} sample points (native system EPSG:{})\n",
        source.len(),
        source.epsg()
    );

    let fetcher = GsvCollect::new()?;
    let mut collector = MetadataCollector::new(source, fetcher, &output);
    collector.batch_capacity = capacity;

    match collector.run() {
        Ok(summary) => {
            println!("\n✓ Collection run finished");
            println!("  - Batches written: {}", summary.batches_written);
            println!("  - Batches skipped (already done): {}", summary.batches_skipped);
            println!("  - Records written: {}", summary.records_written);
            println!(
                "  - Points without panorama: {}",
                summary.points_without_panorama
            );
            println!("  - Points failed: {}", summary.points_failed);
        }
        Err(e) => {
            eprintln!("✗ Collection run failed:");
            eprintln!("  {}", e);
            eprintln!("\nPossible checks:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Check that the input dataset is a point FeatureCollection");
            eprintln!("  - Re-run to resume; completed batches are never re-fetched");
            return Err(e.into());
        }
    }

    Ok(())
}
