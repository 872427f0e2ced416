// Example: Collecting Street View panorama metadata from a point
// shapefile
//
// IMPORTANT:
// - Shapefile loading shells out to ogr2ogr, so GDAL must be
//   installed and on PATH
// - The shapefile must carry a .prj sidecar naming its reference
//   system; points are transformed to WGS 84 before querying
// - The metadata endpoint requires an internet connection
//
use anyhow::Result;
use rsgsv::collect::gsv::gsv_collect::GsvCollect;
use rsgsv::metadata::collector::MetadataCollector;
use rsgsv::metadata::sample_points::{PointSource, SamplePoints};

fn main() -> Result<()> {
    println!("=== Example: Collecting GSV metadata from a shapefile ===\n");

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .unwrap_or_else(|| "sample-spatialdata/Cambridge20m.shp".to_string());
    let output = args.next().unwrap_or_else(|| "metadata_test".to_string());

    println!("Input shapefile: {}", input);
    println!("Output folder: {}\n", output);

    println!("Converting shapefile with ogr2ogr...");
    let source = SamplePoints::from_shapefile(&input)?;
    println!(
        "✓ Loaded {} sample points (native system EPSG:{})\n",
        source.len(),
        source.epsg()
    );

    let fetcher = GsvCollect::new()?;
    let collector = MetadataCollector::new(source, fetcher, &output);

    let summary = collector.run()?;
    println!("\n✓ Collection run finished");
    println!(
        "  - Batches: {} written, {} skipped",
        summary.batches_written, summary.batches_skipped
    );
    println!("  - Records written: {}", summary.records_written);

    Ok(())
}
