//! # CLI Module
//!
//! This module provides the command-line interface for nc2gif, including:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML)
//! - Environment variable support with the NC2GIF_ prefix
//! - Merging of flags, environment, config file and defaults
//! - Configuration templates

use crate::error::{Nc2GifError, Result};
use crate::input::{JobConfig, MIN_FRAME_SIZE, RenderOptions, VariableNames, validate_frame_duration};
use crate::projection::ProjectionKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Render NetCDF temperature anomalies as projected map animations
#[derive(Parser, Debug)]
#[command(name = "nc2gif")]
#[command(about = "Render yearly temperature ranges from NetCDF anomalies as a looping GIF")]
#[command(version)]
#[command(long_about = "
nc2gif reads a monthly temperature-anomaly NetCDF dataset, reduces every
calendar year to its peak-to-peak range, draws one filled-contour map per
selected month on a chosen projection, and stitches the frames into a
looping GIF.

FEATURES:
  • Four projections: LambertConformal, Orthographic, Mollweide, Mercator
  • Strided time sampling (every n-th month)
  • Configuration files: JSON and YAML format support with templates
  • Progress indicators and timing
  • Shell completions: bash, zsh, fish, and PowerShell

EXAMPLES:
  # Full pipeline, one frame per year on a Mollweide map
  nc2gif run NOAAGlobalTemp.nc -r 12 -p Mollweide

  # Only render frames
  nc2gif frames NOAAGlobalTemp.nc -o Fig

  # Re-animate existing frames at 4 frames per second
  nc2gif animate Fig --frame-duration 0.25

  # Using config file
  nc2gif run --config globe.yaml

  # Generate templates
  nc2gif template world --format yaml > world.yaml

  # Dataset inspection
  nc2gif info NOAAGlobalTemp.nc --detailed
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "NC2GIF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract, render and animate in one go
    #[command(long_about = "
Run the full pipeline: read the dataset, compute yearly ranges, render one PNG
per selected sample into the output directory, then encode them as a GIF.

Existing PNG files in the output directory are removed before rendering.

EXAMPLES:
  nc2gif run NOAAGlobalTemp.nc
  nc2gif run NOAAGlobalTemp.nc -r 12 -p LambertConformal -o frames
  nc2gif run --config job.json --frame-duration 1.0
  nc2gif run data.nc --var anomaly=tas --var depth=lev --dry-run
")]
    Run {
        /// Input NetCDF file path
        #[arg(value_name = "INPUT", env = "NC2GIF_INPUT")]
        input: Option<String>,

        #[command(flatten)]
        job: JobArgs,

        /// Validate the resolved configuration without processing
        #[arg(long, env = "NC2GIF_DRY_RUN")]
        dry_run: bool,
    },

    /// Render PNG frames without building the animation
    #[command(long_about = "
Read the dataset and render one PNG per selected sample. The output directory
is cleared of PNG files first.

EXAMPLES:
  nc2gif frames NOAAGlobalTemp.nc -r 6 -p Mercator
  nc2gif frames data.nc --font DejaVuSans.ttf --coastlines coast.txt
")]
    Frames {
        /// Input NetCDF file path
        #[arg(value_name = "INPUT", env = "NC2GIF_INPUT")]
        input: Option<String>,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Build a GIF from the PNG frames in a directory
    #[command(long_about = "
Encode every PNG in a directory into a looping GIF, ordered by the frame index
at the end of each file name (so ...2.png comes before ...10.png).

EXAMPLES:
  nc2gif animate
  nc2gif animate Fig -g anomalies.gif --frame-duration 0.2
")]
    Animate {
        /// Directory holding the frames (default: Fig)
        #[arg(value_name = "DIR", env = "NC2GIF_OUTPUT_DIR")]
        dir: Option<PathBuf>,

        /// Animation file name inside DIR
        #[arg(short, long, env = "NC2GIF_GIF_NAME")]
        gif_name: Option<String>,

        /// Seconds per frame
        #[arg(short = 'd', long, env = "NC2GIF_FRAME_DURATION", value_parser = parse_frame_duration)]
        frame_duration: Option<f64>,
    },

    /// Validate configuration file or arguments
    #[command(long_about = "
Validate a configuration without rendering anything.

Checks syntax, value ranges, and that font and coastline files exist. With
--detailed the dataset is opened as well and the configured variables and
time units are checked.

EXAMPLES:
  nc2gif validate job.json
  nc2gif validate job.yaml --detailed
")]
    Validate {
        /// Configuration file to validate
        config_file: Option<PathBuf>,

        /// Also open the dataset and check its variables
        #[arg(long)]
        detailed: bool,
    },

    /// Show information about a NetCDF file
    #[command(long_about = "
Inspect a NetCDF file: dimensions, variables, attributes, the years covered by
the time axis, and whether the variables the animation needs are present.

EXAMPLES:
  nc2gif info NOAAGlobalTemp.nc
  nc2gif info NOAAGlobalTemp.nc --detailed
  nc2gif info NOAAGlobalTemp.nc -n anom --format json
")]
    Info {
        /// NetCDF file path
        file: String,

        /// Show global attributes
        #[arg(long)]
        detailed: bool,

        /// Show only specific variable info
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Generate configuration templates
    #[command(long_about = "
Generate configuration file templates.

Available templates:
• globe: Orthographic view, one frame per month
• world: Mollweide world map, one frame per year
• mercator: Mercator band between 70°S and 70°N, one frame per year
• regional: Lambert conformal view of North America, one frame per year

EXAMPLES:
  nc2gif template globe
  nc2gif template world --format yaml -o world.yaml
")]
    Template {
        /// Template type to generate
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish, and PowerShell.

EXAMPLES:
  nc2gif completions bash > ~/.bash_completion.d/nc2gif
  nc2gif completions zsh -o _nc2gif
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Job options shared by `run` and `frames`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct JobArgs {
    /// Directory for frames and animation
    #[arg(short, long, env = "NC2GIF_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Animation file name inside the output directory
    #[arg(short, long, env = "NC2GIF_GIF_NAME")]
    pub gif_name: Option<String>,

    /// Render every n-th monthly sample
    #[arg(short, long, env = "NC2GIF_RESOLUTION", value_parser = parse_resolution)]
    pub resolution: Option<usize>,

    /// Map projection (LambertConformal, Orthographic, Mollweide, Mercator)
    #[arg(short, long, env = "NC2GIF_PROJECTION")]
    pub projection: Option<String>,

    /// Seconds per animation frame
    #[arg(short = 'd', long, env = "NC2GIF_FRAME_DURATION", value_parser = parse_frame_duration)]
    pub frame_duration: Option<f64>,

    /// Frame size in pixels: WIDTHxHEIGHT
    #[arg(long, env = "NC2GIF_SIZE", value_parser = parse_frame_size)]
    pub size: Option<FrameSize>,

    /// TrueType font for titles and colorbar labels (default: bundled DejaVu Sans)
    #[arg(long, env = "NC2GIF_FONT")]
    pub font: Option<PathBuf>,

    /// Coastline file in GMT multi-segment text (default: bundled world outlines)
    #[arg(long, env = "NC2GIF_COASTLINES")]
    pub coastlines: Option<PathBuf>,

    /// Dataset variable name override: ROLE=NAME (roles: time, lat, lon, depth, anomaly)
    #[arg(long = "var", value_parser = parse_variable_override)]
    pub variables: Vec<VariableOverride>,
}

#[derive(ValueEnum, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
    /// CSV output (where applicable)
    Csv,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// Orthographic globe, monthly frames
    Globe,
    /// Mollweide world map, yearly frames
    World,
    /// Mercator band, yearly frames
    Mercator,
    /// Lambert conformal regional view, yearly frames
    Regional,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Frame size argument from command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Which dataset variable a `--var` override renames
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableRole {
    Time,
    Lat,
    Lon,
    Depth,
    Anomaly,
}

/// Variable rename argument from command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableOverride {
    pub role: VariableRole,
    pub name: String,
}

/// Parse time resolution: positive integer
fn parse_resolution(s: &str) -> std::result::Result<usize, String> {
    let value = s
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("Invalid resolution '{}'", s))?;
    if value == 0 {
        return Err("Resolution must be at least 1".to_string());
    }
    Ok(value)
}

/// Parse frame duration: positive seconds
fn parse_frame_duration(s: &str) -> std::result::Result<f64, String> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Invalid frame duration '{}'", s))?;
    validate_frame_duration(value).map_err(|e| e.to_string())?;
    Ok(value)
}

/// Parse frame size: WIDTHxHEIGHT, or a single number for a square frame
fn parse_frame_size(s: &str) -> std::result::Result<FrameSize, String> {
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid frame size '{}'", s))
    };
    let (width, height) = match s.split_once(['x', 'X']) {
        Some((w, h)) => (parse(w)?, parse(h)?),
        None => {
            let edge = parse(s)?;
            (edge, edge)
        }
    };
    if width < MIN_FRAME_SIZE || height < MIN_FRAME_SIZE {
        return Err(format!(
            "Frame size must be at least {}x{}",
            MIN_FRAME_SIZE, MIN_FRAME_SIZE
        ));
    }
    Ok(FrameSize { width, height })
}

/// Parse variable override: role=name
fn parse_variable_override(s: &str) -> std::result::Result<VariableOverride, String> {
    let (role, name) = s
        .split_once('=')
        .ok_or_else(|| "Variable override must be in format 'role=name'".to_string())?;
    let role = match role.trim() {
        "time" => VariableRole::Time,
        "lat" => VariableRole::Lat,
        "lon" => VariableRole::Lon,
        "depth" => VariableRole::Depth,
        "anomaly" => VariableRole::Anomaly,
        other => {
            return Err(format!(
                "Unknown variable role '{}' (expected time, lat, lon, depth or anomaly)",
                other
            ));
        }
    };
    let name = name.trim();
    if name.is_empty() {
        return Err("Variable name cannot be empty".to_string());
    }
    Ok(VariableOverride {
        role,
        name: name.to_string(),
    })
}

impl VariableOverride {
    fn apply(&self, names: &mut VariableNames) {
        let slot = match self.role {
            VariableRole::Time => &mut names.time,
            VariableRole::Lat => &mut names.lat,
            VariableRole::Lon => &mut names.lon,
            VariableRole::Depth => &mut names.depth,
            VariableRole::Anomaly => &mut names.anomaly,
        };
        *slot = self.name.clone();
    }
}

impl JobArgs {
    /// Overlays the values given on the command line or in the environment.
    pub fn apply(&self, config: &mut JobConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(name) = &self.gif_name {
            config.gif_name = name.clone();
        }
        if let Some(res) = self.resolution {
            config.resolution = res;
        }
        if let Some(name) = &self.projection {
            config.projection = resolve_projection(name);
        }
        if let Some(seconds) = self.frame_duration {
            config.frame_duration = seconds;
        }
        if let Some(size) = self.size {
            config.render.width = size.width;
            config.render.height = size.height;
        }
        if let Some(font) = &self.font {
            config.render.font_path = Some(font.clone());
        }
        if let Some(coast) = &self.coastlines {
            config.render.coastline_path = Some(coast.clone());
        }
        for var in &self.variables {
            var.apply(&mut config.variables);
        }
    }
}

/// Projection by name, warning when the name falls back to Orthographic.
pub fn resolve_projection(name: &str) -> ProjectionKind {
    ProjectionKind::recognise(name).unwrap_or_else(|| {
        warn!(
            "Unknown projection '{}', using {}",
            name,
            ProjectionKind::default()
        );
        ProjectionKind::default()
    })
}

/// Builds the job configuration from all sources.
///
/// Priority: command line / environment > config file > defaults.
pub fn resolve_job_config(
    config_path: Option<&Path>,
    input: Option<&str>,
    args: &JobArgs,
) -> Result<JobConfig> {
    let mut config = match config_path {
        Some(path) => JobConfig::from_file(path)?,
        None => JobConfig::default(),
    };
    if let Some(input) = input {
        config.nc_key = input.to_string();
    }
    args.apply(&mut config);
    if config.nc_key.trim().is_empty() {
        return Err(Nc2GifError::Config(
            "no input file given (pass INPUT, set NC2GIF_INPUT, or set nc_key in the config file)"
                .to_string(),
        ));
    }
    config.validate()?;
    Ok(config)
}

/// Checks that referenced local files exist. Returns one message per problem.
pub fn check_referenced_files(config: &JobConfig) -> Vec<String> {
    let mut problems = Vec::new();
    if !Path::new(&config.nc_key).is_file() {
        problems.push(format!("Input file not found: {}", config.nc_key));
    }
    let optional = [
        ("Font", &config.render.font_path),
        ("Coastline file", &config.render.coastline_path),
    ];
    for (label, path) in optional {
        if let Some(path) = path
            && !path.is_file()
        {
            problems.push(format!("{} not found: {}", label, path.display()));
        }
    }
    problems
}

/// Configuration for a template type.
pub fn template_config(template: TemplateType) -> JobConfig {
    let base = JobConfig {
        nc_key: "NOAAGlobalTemp.nc".to_string(),
        ..JobConfig::default()
    };
    match template {
        TemplateType::Globe => JobConfig {
            projection: ProjectionKind::Orthographic,
            resolution: 1,
            gif_name: "globe.gif".to_string(),
            ..base
        },
        TemplateType::World => JobConfig {
            projection: ProjectionKind::Mollweide,
            resolution: 12,
            gif_name: "world.gif".to_string(),
            render: RenderOptions {
                width: 800,
                height: 500,
                ..RenderOptions::default()
            },
            ..base
        },
        TemplateType::Mercator => JobConfig {
            projection: ProjectionKind::Mercator,
            resolution: 12,
            gif_name: "mercator.gif".to_string(),
            render: RenderOptions {
                width: 800,
                height: 600,
                ..RenderOptions::default()
            },
            ..base
        },
        TemplateType::Regional => JobConfig {
            projection: ProjectionKind::LambertConformal,
            resolution: 12,
            gif_name: "regional.gif".to_string(),
            frame_duration: 1.0,
            ..base
        },
    }
}

/// Serializes a template in the requested format.
pub fn render_template(template: TemplateType, format: ConfigFormat) -> Result<String> {
    let config = template_config(template);
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
    })
}

// Global mutex to ensure tests touching NC2GIF_ variables run sequentially
#[cfg(test)]
pub(crate) static ENV_TEST_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
