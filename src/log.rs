use crate::animate::AnimationArtifact;
use crate::extract::Extraction;
use crate::input::JobConfig;
use std::time::Duration;

pub fn show_greeting(source: &str) {
    println!("=== NetCDF Anomaly Animator ===");
    println!("Loading configuration from: {}", source);
}

pub fn config_echo(config: &JobConfig) {
    println!("\nConfiguration:");
    println!("  Input NetCDF: {}", config.nc_key);
    println!("  Output directory: {}", config.output_dir);
    println!("  Animation: {}", config.gif_path().display());
    println!("  Projection: {}", config.projection);
    println!("  Time resolution: every {} sample(s)", config.resolution);
    println!("  Frame duration: {}s", config.frame_duration);
    println!(
        "  Frame size: {}x{} px",
        config.render.width, config.render.height
    );
    println!(
        "  Variables: time={} lat={} lon={} depth={} anomaly={}",
        config.variables.time,
        config.variables.lat,
        config.variables.lon,
        config.variables.depth,
        config.variables.anomaly
    );
}

pub fn show_extraction_summary(extraction: &Extraction) {
    println!("\nDataset:");
    println!(
        "  Grid: {} lat x {} lon",
        extraction.lat.len(),
        extraction.lon.len()
    );
    match (extraction.years.first(), extraction.years.last()) {
        (Some(first), Some(last)) => println!(
            "  Samples: {} ({} to {}), {} complete years",
            extraction.years.len(),
            first,
            last,
            extraction.year_count()
        ),
        _ => println!("  Samples: none"),
    }
    println!("  Frames selected: {}", extraction.frame_selection.len());
}

pub fn show_animation(artifact: &AnimationArtifact) {
    println!(
        "\nAnimation: {} ({} frames, {}x{}, {:.2}s per frame)",
        artifact.path.display(),
        artifact.frame_count,
        artifact.width,
        artifact.height,
        artifact.frame_delay.as_secs_f64()
    );
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!(
        "\n=== Animation completed successfully in {:.2}s! ===",
        elapsed.as_secs_f64()
    );
}
