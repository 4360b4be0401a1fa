use crate::animate::*;
use crate::dataset::*;
use crate::error::Nc2GifError;
use crate::extract::*;
use crate::input::*;
use crate::output::*;
use crate::projection::ProjectionKind;
use chrono::NaiveDate;
use image::{Rgba, RgbaImage};
use ndarray::Array4;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const TIME_UNITS: &str = "days since 1800-1-1 00:00:00";

/// Offsets of the 15th of each month starting January 1880, in days since 1800-01-01
fn month_offsets(months: usize) -> Vec<f64> {
    let epoch = NaiveDate::from_ymd_opt(1800, 1, 1).unwrap();
    (0..months)
        .map(|m| {
            let date = NaiveDate::from_ymd_opt(1880 + (m / 12) as i32, (m % 12) as u32 + 1, 15)
                .unwrap();
            (date - epoch).num_days() as f64
        })
        .collect()
}

/// Seasonal cycle whose yearly range is 5.5 * (1 + lat_idx + lon_idx)
fn sample_value(t: usize, i: usize, j: usize) -> f32 {
    (t % 12) as f32 * 0.5 * (1.0 + i as f32 + j as f32)
}

fn synthetic_source(months: usize) -> MemorySource {
    let field = Array4::from_shape_fn((months, 1, 2, 2), |(t, _, i, j)| sample_value(t, i, j));
    MemorySource::new()
        .with_coordinate("time", month_offsets(months))
        .with_attribute("time", "units", TIME_UNITS)
        .with_coordinate("lat", vec![-45.0, 45.0])
        .with_coordinate("lon", vec![0.0, 180.0])
        .with_coordinate("z", vec![0.0])
        .with_field("anom", field)
}

/// Writes a NetCDF file shaped like the monthly anomaly product.
fn write_synthetic_netcdf(path: &Path, months: usize) -> Result<(), Box<dyn std::error::Error>> {
    let lat = [-45.0f64, 45.0];
    let lon = [0.0f64, 180.0];
    let mut file = netcdf::create(path)?;
    file.add_dimension("time", months)?;
    file.add_dimension("z", 1)?;
    file.add_dimension("lat", lat.len())?;
    file.add_dimension("lon", lon.len())?;

    let mut time = file.add_variable::<f64>("time", &["time"])?;
    time.put_attribute("units", TIME_UNITS)?;
    time.put_values(month_offsets(months).as_slice(), ..)?;

    let mut z = file.add_variable::<f64>("z", &["z"])?;
    z.put_values(&[0.0f64][..], ..)?;
    let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
    lat_var.put_values(&lat[..], ..)?;
    let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
    lon_var.put_values(&lon[..], ..)?;

    let mut values = Vec::with_capacity(months * 4);
    for t in 0..months {
        for i in 0..2 {
            for j in 0..2 {
                values.push(sample_value(t, i, j));
            }
        }
    }
    // One missing observation in the first year of the first cell
    values[5 * 4] = -999.9;
    let mut anom = file.add_variable::<f32>("anom", &["time", "z", "lat", "lon"])?;
    anom.put_attribute("missing_value", -999.9f32)?;
    anom.put_values(values.as_slice(), ..)?;
    Ok(())
}

fn small_render() -> RenderOptions {
    RenderOptions {
        width: 96,
        height: 96,
        ..RenderOptions::default()
    }
}

fn png_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".png"))
        .collect();
    names.sort();
    names
}

fn decode_gif(path: &Path) -> Result<Vec<image::Frame>, Box<dyn std::error::Error>> {
    use image::AnimationDecoder;
    use image::codecs::gif::GifDecoder;
    let reader = std::io::BufReader::new(fs::File::open(path)?);
    let decoder = GifDecoder::new(reader)?;
    Ok(decoder.into_frames().collect_frames()?)
}

fn delay_ms(frame: &image::Frame) -> f64 {
    let (numer, denom) = frame.delay().numer_denom_ms();
    numer as f64 / denom as f64
}

#[cfg(test)]
mod input_tests {
    use super::*;

    #[test]
    fn test_job_config_from_json_defaults() {
        let json = r#"{ "nc_key": "NOAAGlobalTemp.nc" }"#;
        let config = JobConfig::from_json(json).unwrap();
        assert_eq!(config.nc_key, "NOAAGlobalTemp.nc");
        assert_eq!(config.output_dir, "Fig");
        assert_eq!(config.gif_name, "map_1.gif");
        assert_eq!(config.resolution, 1);
        assert_eq!(config.projection, ProjectionKind::Orthographic);
        assert_eq!(config.frame_duration, 0.5);
        assert_eq!(config.variables.anomaly, "anom");
        assert_eq!(config.variables.depth, "z");
        assert_eq!((config.render.width, config.render.height), (600, 600));
        assert_eq!(config.gif_path(), PathBuf::from("Fig").join("map_1.gif"));
    }

    #[test]
    fn test_job_config_from_yaml() {
        let yaml = r#"
nc_key: data.nc
resolution: 12
projection: LambertConformal
variables:
  anomaly: tas
render:
  width: 300
  height: 200
  font_path: fonts/DejaVuSans.ttf
"#;
        let config = JobConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.resolution, 12);
        assert_eq!(config.projection, ProjectionKind::LambertConformal);
        assert_eq!(config.variables.anomaly, "tas");
        // Partially given sections keep their other defaults
        assert_eq!(config.variables.time, "time");
        assert_eq!(config.render.width, 300);
        assert_eq!(
            config.render.font_path,
            Some(PathBuf::from("fonts/DejaVuSans.ttf"))
        );
        assert!(config.render.coastline_path.is_none());
    }

    #[test]
    fn test_unknown_projection_in_config_falls_back() {
        let config = JobConfig::from_json(r#"{ "nc_key": "a.nc", "projection": "Robinson" }"#)
            .unwrap();
        assert_eq!(config.projection, ProjectionKind::Orthographic);
    }

    #[test]
    fn test_from_file_picks_format_by_extension() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let yaml = dir.path().join("job.yml");
        fs::write(&yaml, "nc_key: y.nc\n")?;
        let json = dir.path().join("job.json");
        fs::write(&json, r#"{"nc_key": "j.nc"}"#)?;

        assert_eq!(JobConfig::from_file(&yaml)?.nc_key, "y.nc");
        assert_eq!(JobConfig::from_file(&json)?.nc_key, "j.nc");
        assert!(JobConfig::from_file(dir.path().join("absent.json")).is_err());
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let good = JobConfig {
            nc_key: "a.nc".to_string(),
            ..JobConfig::default()
        };
        good.validate().unwrap();

        let cases = [
            JobConfig {
                nc_key: " ".to_string(),
                ..good.clone()
            },
            JobConfig {
                resolution: 0,
                ..good.clone()
            },
            JobConfig {
                frame_duration: 0.0,
                ..good.clone()
            },
            JobConfig {
                frame_duration: f64::INFINITY,
                ..good.clone()
            },
            JobConfig {
                frame_duration: 0.009,
                ..good.clone()
            },
            JobConfig {
                gif_name: String::new(),
                ..good.clone()
            },
            JobConfig {
                render: RenderOptions {
                    width: 32,
                    ..RenderOptions::default()
                },
                ..good.clone()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(Nc2GifError::Config(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_json_parsing_errors() {
        assert!(matches!(
            JobConfig::from_json("{ not json"),
            Err(Nc2GifError::Json(_))
        ));
        // nc_key has no default
        assert!(JobConfig::from_json("{}").is_err());
        assert!(matches!(
            JobConfig::from_yaml("resolution: [1"),
            Err(Nc2GifError::Yaml(_))
        ));
    }
}

#[cfg(test)]
mod extract_tests {
    use super::*;

    #[test]
    fn test_extract_yearly_ranges() -> Result<(), Box<dyn std::error::Error>> {
        let extraction = extract(&synthetic_source(24), &VariableNames::default(), 1)?;
        assert_eq!(extraction.yearly_range.shape(), &[2, 2, 2]);
        for year in 0..2 {
            for i in 0..2 {
                for j in 0..2 {
                    let expected = 5.5 * (1.0 + i as f32 + j as f32);
                    let got = extraction.yearly_range[[year, i, j]];
                    assert!((got - expected).abs() < 1e-5, "{} != {}", got, expected);
                }
            }
        }
        assert_eq!(extraction.years[0], "1880");
        assert_eq!(extraction.years[11], "1880");
        assert_eq!(extraction.years[12], "1881");
        assert_eq!(extraction.frame_selection, (0..24).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_sentinels_never_survive() {
        let mut field = Array4::from_elem((12, 1, 1, 3), 1.0f32);
        field[[0, 0, 0, 0]] = -999.9;
        field[[3, 0, 0, 1]] = -900.0;
        field[[4, 0, 0, 2]] = -899.9;
        let masked = mask_sentinels(field);
        assert!(masked.iter().all(|v| v.is_nan() || *v > SENTINEL_THRESHOLD));
        assert!(masked[[0, 0, 0, 0]].is_nan());
        // The threshold itself counts as missing
        assert!(masked[[3, 0, 0, 1]].is_nan());
        assert_eq!(masked[[4, 0, 0, 2]], -899.9);
    }

    #[test]
    fn test_missing_month_gives_missing_range() -> Result<(), Box<dyn std::error::Error>> {
        let mut field = Array4::from_shape_fn((24, 1, 1, 2), |(t, _, _, _)| t as f32);
        field[[3, 0, 0, 0]] = -999.0;
        let source = synthetic_source(24)
            .with_coordinate("lat", vec![0.0])
            .with_field("anom", field);
        let extraction = extract(&source, &VariableNames::default(), 1)?;
        assert!(extraction.yearly_range[[0, 0, 0]].is_nan());
        assert_eq!(extraction.yearly_range[[0, 0, 1]], 11.0);
        assert_eq!(extraction.yearly_range[[1, 0, 0]], 11.0);
        Ok(())
    }

    #[test]
    fn test_only_surface_level_is_reduced() {
        let field = Array4::from_shape_fn((12, 2, 1, 1), |(t, d, _, _)| {
            if d == 0 { t as f32 } else { 100.0 * t as f32 }
        });
        let ranges = yearly_peak_to_peak(&field);
        assert_eq!(ranges[[0, 0, 0]], 11.0);
    }

    #[test]
    fn test_trailing_partial_year_is_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let extraction = extract(&synthetic_source(30), &VariableNames::default(), 12)?;
        assert_eq!(extraction.year_count(), 2);
        assert_eq!(extraction.years.len(), 30);
        assert_eq!(extraction.frame_selection, vec![0, 12, 24]);
        assert_eq!(extraction.year_row(0), Some(0));
        assert_eq!(extraction.year_row(23), Some(1));
        assert_eq!(extraction.year_row(24), None);
        Ok(())
    }

    #[test]
    fn test_selection_count_is_ceiling() -> Result<(), Box<dyn std::error::Error>> {
        for (samples, res) in [(24, 1), (24, 5), (24, 24), (24, 25), (1, 3), (0, 4)] {
            let selection = frame_selection(samples, res)?;
            assert_eq!(selection.len(), samples.div_ceil(res));
            assert!(selection.windows(2).all(|w| w[1] - w[0] == res));
            assert!(selection.iter().all(|&i| i < samples));
        }
        assert!(matches!(frame_selection(24, 0), Err(Nc2GifError::Config(_))));
        Ok(())
    }

    #[test]
    fn test_peak_to_peak() {
        let values = ndarray::arr1(&[3.0f32, -1.5, 7.0, 2.0]);
        assert_eq!(peak_to_peak(values.view()), 8.5);
        let with_gap = ndarray::arr1(&[3.0f32, f32::NAN, 7.0]);
        assert!(peak_to_peak(with_gap.view()).is_nan());
        let empty = ndarray::Array1::<f32>::zeros(0);
        assert!(peak_to_peak(empty.view()).is_nan());
    }

    #[test]
    fn test_variables_are_read_in_order() {
        let names = VariableNames::default();
        let err = extract(&MemorySource::new(), &names, 1).unwrap_err();
        assert!(matches!(err, Nc2GifError::MissingVariable(ref v) if v == "time"));

        let no_depth = MemorySource::new()
            .with_coordinate("time", month_offsets(12))
            .with_attribute("time", "units", TIME_UNITS)
            .with_coordinate("lat", vec![0.0])
            .with_coordinate("lon", vec![0.0]);
        let err = extract(&no_depth, &names, 1).unwrap_err();
        assert!(matches!(err, Nc2GifError::MissingVariable(ref v) if v == "z"));
    }

    #[test]
    fn test_missing_units_attribute() {
        let source = MemorySource::new().with_coordinate("time", month_offsets(12));
        let err = extract(&source, &VariableNames::default(), 1).unwrap_err();
        assert!(matches!(
            err,
            Nc2GifError::MissingAttribute { ref variable, ref attribute }
                if variable == "time" && attribute == "units"
        ));
    }

    #[test]
    fn test_undecodable_units() {
        let source = synthetic_source(12).with_attribute("time", "units", "fortnights since 1800-1-1");
        let err = extract(&source, &VariableNames::default(), 1).unwrap_err();
        assert!(matches!(err, Nc2GifError::TimeUnits(_)));
    }

    #[test]
    fn test_field_shape_checks() -> Result<(), Box<dyn std::error::Error>> {
        let three_d = synthetic_source(12).with_raw_field("anom", &[12, 2, 2], vec![0.0; 48])?;
        let err = extract(&three_d, &VariableNames::default(), 1).unwrap_err();
        assert!(matches!(err, Nc2GifError::ShapeMismatch(_)));

        let wrong_grid =
            synthetic_source(12).with_field("anom", Array4::<f32>::zeros((12, 1, 3, 2)));
        let err = extract(&wrong_grid, &VariableNames::default(), 1).unwrap_err();
        assert!(matches!(err, Nc2GifError::ShapeMismatch(_)));
        Ok(())
    }

    #[test]
    fn test_custom_variable_names() -> Result<(), Box<dyn std::error::Error>> {
        let field = Array4::from_shape_fn((12, 1, 1, 1), |(t, _, _, _)| t as f32);
        let source = MemorySource::new()
            .with_coordinate("t", month_offsets(12))
            .with_attribute("t", "units", TIME_UNITS)
            .with_coordinate("latitude", vec![10.0])
            .with_coordinate("longitude", vec![20.0])
            .with_coordinate("lev", vec![0.0])
            .with_field("tas", field);
        let names = VariableNames {
            time: "t".to_string(),
            lat: "latitude".to_string(),
            lon: "longitude".to_string(),
            depth: "lev".to_string(),
            anomaly: "tas".to_string(),
        };
        let extraction = extract(&source, &names, 1)?;
        assert_eq!(extraction.yearly_range[[0, 0, 0]], 11.0);
        Ok(())
    }
}

#[cfg(test)]
mod dataset_tests {
    use super::*;

    #[test]
    fn test_netcdf_source_reads_synthetic_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("anom.nc");
        write_synthetic_netcdf(&path, 24)?;

        let source = NetCdfSource::open(&path)?;
        assert_eq!(source.read_coordinate("lat")?, vec![-45.0, 45.0]);
        assert_eq!(source.read_text_attribute("time", "units")?, TIME_UNITS);
        let field = source.read_field("anom")?;
        assert_eq!(field.shape(), &[24, 1, 2, 2]);
        assert!(field[[5, 0, 0, 0]] < SENTINEL_THRESHOLD);

        assert!(matches!(
            source.read_coordinate("salinity"),
            Err(Nc2GifError::MissingVariable(_))
        ));
        assert!(matches!(
            source.read_text_attribute("lat", "units"),
            Err(Nc2GifError::MissingAttribute { .. })
        ));
        assert!(matches!(
            source.read_field("lat"),
            Err(Nc2GifError::ShapeMismatch(_))
        ));
        source.close()?;
        Ok(())
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            NetCdfSource::open("/nonexistent/anom.nc"),
            Err(Nc2GifError::Netcdf(_))
        ));
    }

    #[test]
    fn test_memory_source_attribute_on_missing_variable() {
        let source = MemorySource::new().with_attribute("time", "units", TIME_UNITS);
        assert!(matches!(
            source.read_text_attribute("time", "units"),
            Err(Nc2GifError::MissingVariable(_))
        ));
    }
}

#[cfg(test)]
mod output_tests {
    use super::*;

    #[test]
    fn test_write_frames_names_and_count() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let extraction = extract(&synthetic_source(24), &VariableNames::default(), 12)?;
        let mut seen = Vec::new();
        let manifest = write_frames(
            &extraction,
            ProjectionKind::Mollweide,
            dir.path(),
            &small_render(),
            |frame| seen.push(frame.index),
        )?;

        assert_eq!(seen, vec![0, 12]);
        assert_eq!(manifest.len(), 2);
        assert!(manifest.skipped.is_empty());
        assert_eq!(
            png_names(dir.path()),
            vec!["1880Mollweide0.png", "1881Mollweide12.png"]
        );
        let img = image::open(&manifest.frames[0].path)?;
        assert_eq!((img.width(), img.height()), (96, 96));
        Ok(())
    }

    #[test]
    fn test_directory_is_cleared_between_runs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let extraction = extract(&synthetic_source(24), &VariableNames::default(), 12)?;
        fs::write(dir.path().join("notes.txt"), "keep me")?;

        write_frames(
            &extraction,
            ProjectionKind::Mercator,
            dir.path(),
            &small_render(),
            |_| {},
        )?;
        write_frames(
            &extraction,
            ProjectionKind::LambertConformal,
            dir.path(),
            &small_render(),
            |_| {},
        )?;

        assert_eq!(
            png_names(dir.path()),
            vec!["1880LambertConformal0.png", "1881LambertConformal12.png"]
        );
        assert!(dir.path().join("notes.txt").exists());
        Ok(())
    }

    #[test]
    fn test_unknown_projection_renders_orthographic() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let extraction = extract(&synthetic_source(12), &VariableNames::default(), 12)?;
        let manifest = write_frames(
            &extraction,
            ProjectionKind::parse("Robinson"),
            dir.path(),
            &small_render(),
            |_| {},
        )?;
        assert_eq!(manifest.frames[0].projection, ProjectionKind::Orthographic);
        assert_eq!(png_names(dir.path()), vec!["1880Orthographic0.png"]);
        Ok(())
    }

    #[test]
    fn test_incomplete_year_samples_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let extraction = extract(&synthetic_source(30), &VariableNames::default(), 12)?;
        let manifest = write_frames(
            &extraction,
            ProjectionKind::Orthographic,
            dir.path(),
            &small_render(),
            |_| {},
        )?;
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.skipped, vec![24]);
        Ok(())
    }

    #[test]
    fn test_output_directory_is_created() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("a").join("b");
        let extraction = extract(&synthetic_source(12), &VariableNames::default(), 12)?;
        write_frames(
            &extraction,
            ProjectionKind::Mercator,
            &nested,
            &small_render(),
            |_| {},
        )?;
        assert_eq!(png_names(&nested).len(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_font_file_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let extraction = extract(&synthetic_source(12), &VariableNames::default(), 12)?;
        let options = RenderOptions {
            font_path: Some(dir.path().join("absent.ttf")),
            ..small_render()
        };
        let result = write_frames(
            &extraction,
            ProjectionKind::Mercator,
            dir.path(),
            &options,
            |_| {},
        );
        assert!(matches!(result, Err(Nc2GifError::Io(_))));

        let garbage = dir.path().join("garbage.ttf");
        fs::write(&garbage, b"not a font")?;
        let options = RenderOptions {
            font_path: Some(garbage),
            ..small_render()
        };
        let result = write_frames(
            &extraction,
            ProjectionKind::Mercator,
            dir.path(),
            &options,
            |_| {},
        );
        assert!(matches!(result, Err(Nc2GifError::Font(_))));
        Ok(())
    }

    #[test]
    fn test_coastlines_are_drawn() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let coast = dir.path().join("coast.txt");
        fs::write(&coast, "> box\n-100 20\n-60 20\n-60 50\n-100 50\n-100 20\n")?;
        let extraction = extract(&synthetic_source(12), &VariableNames::default(), 12)?;

        let plain = write_frames(
            &extraction,
            ProjectionKind::Orthographic,
            dir.path().join("plain"),
            &small_render(),
            |_| {},
        )?;
        let options = RenderOptions {
            coastline_path: Some(coast),
            ..small_render()
        };
        let with_coast = write_frames(
            &extraction,
            ProjectionKind::Orthographic,
            dir.path().join("coast"),
            &options,
            |_| {},
        )?;

        let a = image::open(&plain.frames[0].path)?.to_rgba8();
        let b = image::open(&with_coast.frames[0].path)?.to_rgba8();
        assert_ne!(a, b);
        Ok(())
    }
}

#[cfg(test)]
mod animate_tests {
    use super::*;

    fn solid_frame(path: &Path, color: [u8; 4], size: u32) {
        RgbaImage::from_pixel(size, size, Rgba(color))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_animate_directory_two_frames() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        solid_frame(&dir.path().join("1880Mercator0.png"), [255, 0, 0, 255], 32);
        solid_frame(&dir.path().join("1881Mercator12.png"), [0, 0, 255, 255], 32);

        let artifact = animate_directory(dir.path(), "map_1.gif", 0.5)?;
        assert_eq!(artifact.frame_count, 2);
        assert_eq!(artifact.path, dir.path().join("map_1.gif"));
        assert_eq!(artifact.frame_delay, std::time::Duration::from_millis(500));
        assert_eq!((artifact.width, artifact.height), (32, 32));

        let frames = decode_gif(&artifact.path)?;
        assert_eq!(frames.len(), 2);
        for frame in &frames {
            assert!((delay_ms(frame) - 500.0).abs() < 1.0);
        }
        Ok(())
    }

    #[test]
    fn test_frames_are_ordered_numerically() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        solid_frame(&dir.path().join("1880Mercator10.png"), [0, 0, 255, 255], 16);
        solid_frame(&dir.path().join("1880Mercator2.png"), [255, 0, 0, 255], 16);

        let artifact = animate_directory(dir.path(), "order.gif", 0.25)?;
        let frames = decode_gif(&artifact.path)?;
        let first = frames[0].buffer().get_pixel(8, 8);
        let second = frames[1].buffer().get_pixel(8, 8);
        // Index 2 (red) plays before index 10 (blue)
        assert!(first[0] > first[2]);
        assert!(second[2] > second[0]);
        Ok(())
    }

    #[test]
    fn test_empty_directory_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("readme.txt"), "no frames here")?;
        assert!(matches!(
            animate_directory(dir.path(), "map_1.gif", 0.5),
            Err(Nc2GifError::NoFrames(_))
        ));
        assert!(!dir.path().join("map_1.gif").exists());
        Ok(())
    }

    #[test]
    fn test_mismatched_frame_sizes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        solid_frame(&dir.path().join("a0.png"), [255, 0, 0, 255], 16);
        solid_frame(&dir.path().join("a1.png"), [255, 0, 0, 255], 20);
        let err = animate_directory(dir.path(), "map_1.gif", 0.5).unwrap_err();
        assert!(matches!(
            err,
            Nc2GifError::FrameSize {
                actual_width: 20,
                width: 16,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_failed_animation_keeps_previous_gif() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        for i in 0..3 {
            solid_frame(&dir.path().join(format!("a{}.png", i)), [255, 0, 0, 255], 16);
        }
        let artifact = animate_directory(dir.path(), "map_1.gif", 0.5)?;
        let before = fs::read(&artifact.path)?;

        solid_frame(&dir.path().join("a3.png"), [0, 0, 255, 255], 20);
        assert!(matches!(
            animate_directory(dir.path(), "map_1.gif", 0.5),
            Err(Nc2GifError::FrameSize { .. })
        ));
        assert_eq!(fs::read(&artifact.path)?, before);
        assert_eq!(decode_gif(&artifact.path)?.len(), 3);

        // An undecodable frame also leaves the old animation and no staging file
        fs::remove_file(dir.path().join("a3.png"))?;
        fs::write(dir.path().join("a3.png"), b"not a png")?;
        assert!(animate_directory(dir.path(), "map_1.gif", 0.5).is_err());
        assert_eq!(fs::read(&artifact.path)?, before);
        let leftovers: Vec<_> = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_animation_is_world_readable() -> Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir()?;
        solid_frame(&dir.path().join("a0.png"), [255, 0, 0, 255], 16);
        let artifact = animate_directory(dir.path(), "map_1.gif", 0.5)?;
        let mode = fs::metadata(&artifact.path)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        Ok(())
    }

    #[test]
    fn test_invalid_frame_duration() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        solid_frame(&dir.path().join("a0.png"), [255, 0, 0, 255], 16);
        for seconds in [0.0, -1.0, f64::NAN, 0.004] {
            assert!(matches!(
                animate_directory(dir.path(), "map_1.gif", seconds),
                Err(Nc2GifError::Config(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn test_empty_manifest_is_an_error() {
        let dir = tempdir().unwrap();
        let result = animate_manifest(&FrameManifest::default(), dir.path().join("a.gif"), 0.5);
        assert!(matches!(result, Err(Nc2GifError::NoFrames(_))));
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::{JobEvent, process_job, run_job};

    fn job_for(nc: &Path, out: &Path, resolution: usize) -> JobConfig {
        JobConfig {
            nc_key: nc.to_string_lossy().into_owned(),
            output_dir: out.to_string_lossy().into_owned(),
            resolution,
            projection: ProjectionKind::Mercator,
            render: small_render(),
            ..JobConfig::default()
        }
    }

    #[test]
    fn test_full_pipeline_two_years_monthly() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nc = dir.path().join("anom.nc");
        write_synthetic_netcdf(&nc, 24)?;
        let out = dir.path().join("Fig");
        let config = job_for(&nc, &out, 1);

        let mut extracted = 0;
        let mut written = 0;
        let outcome = run_job(&config, |event| match event {
            JobEvent::Extracted(extraction) => {
                extracted += 1;
                // The sentinel month makes the first cell's first year missing
                assert!(extraction.yearly_range[[0, 0, 0]].is_nan());
                assert!((extraction.yearly_range[[1, 0, 0]] - 5.5).abs() < 1e-5);
            }
            JobEvent::FrameWritten(_) => written += 1,
        })?;

        assert_eq!(extracted, 1);
        assert_eq!(written, 24);
        assert_eq!(png_names(&out).len(), 24);
        assert_eq!(outcome.manifest.frames[0].year, "1880");
        assert_eq!(outcome.manifest.frames[23].year, "1881");
        assert!(out.join("1881Mercator23.png").exists());

        assert_eq!(outcome.animation.path, out.join("map_1.gif"));
        let frames = decode_gif(&outcome.animation.path)?;
        assert_eq!(frames.len(), 24);
        assert!((delay_ms(&frames[0]) - 500.0).abs() < 1.0);
        Ok(())
    }

    #[test]
    fn test_full_pipeline_yearly_resolution() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nc = dir.path().join("anom.nc");
        write_synthetic_netcdf(&nc, 24)?;
        let out = dir.path().join("Fig");

        let outcome = process_job(&job_for(&nc, &out, 12))?;
        assert_eq!(
            png_names(&out),
            vec!["1880Mercator0.png", "1881Mercator12.png"]
        );
        assert_eq!(outcome.animation.frame_count, 2);
        Ok(())
    }

    #[test]
    fn test_dataset_shorter_than_a_year() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nc = dir.path().join("anom.nc");
        write_synthetic_netcdf(&nc, 6)?;
        let out = dir.path().join("Fig");

        let result = process_job(&job_for(&nc, &out, 1));
        assert!(matches!(result, Err(Nc2GifError::NoFrames(_))));
        assert!(png_names(&out).is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempdir().unwrap();
        let config = job_for(&dir.path().join("absent.nc"), dir.path(), 1);
        assert!(matches!(process_job(&config), Err(Nc2GifError::Netcdf(_))));
    }

    #[test]
    fn test_directory_animation_matches_manifest() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nc = dir.path().join("anom.nc");
        write_synthetic_netcdf(&nc, 24)?;
        let out = dir.path().join("Fig");
        let config = job_for(&nc, &out, 5);

        let (_, manifest) = crate::render_job(&config, |_| {})?;
        assert_eq!(manifest.len(), 5);
        let ordered: Vec<PathBuf> = collect_frames(&out)?;
        assert_eq!(ordered, manifest.paths());

        let artifact = animate_directory(&out, "again.gif", 1.0)?;
        assert_eq!(artifact.frame_count, 5);
        Ok(())
    }
}

#[cfg(test)]
mod info_command_tests {
    use super::*;
    use crate::info::get_dataset_info;

    #[test]
    fn test_dataset_info_reports_coverage() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nc = dir.path().join("anom.nc");
        write_synthetic_netcdf(&nc, 30)?;
        let path = nc.to_string_lossy().into_owned();

        let info = get_dataset_info(&path, &VariableNames::default(), None, true)?;
        assert_eq!(info.dimensions.len(), 4);
        assert_eq!(info.variables.len(), 5);
        assert!(info.missing_variables.is_empty());
        assert!(info.is_ready());
        let coverage = info.time_coverage.as_ref().unwrap();
        assert_eq!(coverage.samples, 30);
        assert_eq!(coverage.first_year, "1880");
        assert_eq!(coverage.last_year, "1882");
        assert_eq!(coverage.complete_years, 2);

        let anom = info.variables.iter().find(|v| v.name == "anom").unwrap();
        assert_eq!(anom.shape, vec![30, 1, 2, 2]);
        assert_eq!(anom.dimensions, vec!["time", "z", "lat", "lon"]);
        Ok(())
    }

    #[test]
    fn test_dataset_info_flags_missing_variables() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nc = dir.path().join("anom.nc");
        write_synthetic_netcdf(&nc, 12)?;
        let names = VariableNames {
            anomaly: "tas".to_string(),
            ..VariableNames::default()
        };
        let info = get_dataset_info(&nc.to_string_lossy(), &names, Some("lat"), false)?;
        assert_eq!(info.missing_variables, vec!["tas"]);
        assert!(!info.is_ready());
        assert_eq!(info.variables.len(), 1);
        assert!(info.global_attributes.is_empty());
        Ok(())
    }

    #[test]
    fn test_info_serializes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nc = dir.path().join("anom.nc");
        write_synthetic_netcdf(&nc, 12)?;
        let info = get_dataset_info(&nc.to_string_lossy(), &VariableNames::default(), None, false)?;
        let json = serde_json::to_value(&info)?;
        assert_eq!(json["time_coverage"]["first_year"], "1880");
        assert!(serde_yaml::to_string(&info)?.contains("missing_variables"));
        Ok(())
    }
}
