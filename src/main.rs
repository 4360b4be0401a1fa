use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use nc2gif::animate::animate_directory;
use nc2gif::cli::{
    Cli, Commands, JobArgs, OutputFormat, check_referenced_files, render_template,
    resolve_job_config,
};
use nc2gif::dataset::NetCdfSource;
use nc2gif::extract::extract;
use nc2gif::info::{
    get_dataset_info, print_file_info_csv, print_file_info_human, print_file_info_json,
    print_file_info_yaml,
};
use nc2gif::input::{DEFAULT_GIF_NAME, DEFAULT_OUTPUT_DIR, JobConfig};
use nc2gif::log::{
    config_echo, show_animation, show_extraction_summary, show_farewell_with_timing,
    show_greeting,
};
use nc2gif::{JobEvent, render_job, run_job};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match &cli.command {
        Commands::Run {
            input,
            job,
            dry_run,
        } => run(&cli, input.as_deref(), job, *dry_run),
        Commands::Frames { input, job } => frames(&cli, input.as_deref(), job),
        Commands::Animate {
            dir,
            gif_name,
            frame_duration,
        } => animate(&cli, dir.clone(), gif_name.clone(), *frame_duration),
        Commands::Validate {
            config_file,
            detailed,
        } => validate(&cli, config_file.as_deref(), *detailed),
        Commands::Info {
            file,
            detailed,
            variable,
            format,
        } => info_command(&cli, file, *detailed, variable.as_deref(), format.as_ref()),
        Commands::Template {
            template_type,
            output,
            format,
        } => {
            let text = render_template(*template_type, *format)?;
            write_or_print(output.as_deref(), &text)
        }
        Commands::Completions { shell, output } => {
            let mut cmd = Cli::command();
            let mut buffer = Vec::new();
            clap_complete::generate(*shell, &mut cmd, "nc2gif", &mut buffer);
            let text = String::from_utf8(buffer).context("Completion script is not UTF-8")?;
            write_or_print(output.as_deref(), &text)
        }
    }
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if cli.quiet {
        builder.filter_level(LevelFilter::Error);
    }
    builder.init();
}

fn load_job(cli: &Cli, input: Option<&str>, job: &JobArgs) -> Result<JobConfig> {
    let source = cli
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "command line".to_string());
    let human = !cli.quiet && cli.output_format == OutputFormat::Human;
    if human {
        show_greeting(&source);
    }
    let config = resolve_job_config(cli.config.as_deref(), input, job)
        .context("Failed to resolve job configuration")?;
    if human {
        config_echo(&config);
    }
    Ok(config)
}

fn progress_bar(cli: &Cli) -> ProgressBar {
    if cli.quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    bar
}

/// Progress callback shared by `run` and `frames`.
fn track<'a>(cli: &'a Cli, bar: &'a ProgressBar) -> impl FnMut(JobEvent<'_>) + 'a {
    move |event: JobEvent<'_>| match event {
        JobEvent::Extracted(extraction) => {
            if !cli.quiet && cli.output_format == OutputFormat::Human {
                bar.suspend(|| show_extraction_summary(extraction));
            }
            let drawable = extraction
                .frame_selection
                .iter()
                .filter(|&&i| extraction.year_row(i).is_some())
                .count();
            bar.set_length(drawable as u64);
        }
        JobEvent::FrameWritten(frame) => {
            bar.set_message(format!("{} {}", frame.year, frame.projection));
            bar.inc(1);
        }
    }
}

fn run(cli: &Cli, input: Option<&str>, job: &JobArgs, dry_run: bool) -> Result<()> {
    let start_time = Instant::now();
    let config = load_job(cli, input, job)?;

    if dry_run {
        let problems = check_referenced_files(&config);
        if !problems.is_empty() {
            bail!("Dry run failed:\n  {}", problems.join("\n  "));
        }
        info!("Dry run: configuration is valid, nothing rendered");
        return Ok(());
    }

    let bar = progress_bar(cli);
    let outcome = run_job(&config, track(cli, &bar))
        .with_context(|| format!("Failed to animate {}", config.nc_key))?;
    bar.finish_with_message("frames written");

    match cli.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&outcome)?),
        OutputFormat::Human | OutputFormat::Csv => {
            if !cli.quiet {
                show_animation(&outcome.animation);
                show_farewell_with_timing(start_time.elapsed());
            }
        }
    }
    Ok(())
}

fn frames(cli: &Cli, input: Option<&str>, job: &JobArgs) -> Result<()> {
    let start_time = Instant::now();
    let config = load_job(cli, input, job)?;

    let bar = progress_bar(cli);
    let (_, manifest) = render_job(&config, track(cli, &bar))
        .with_context(|| format!("Failed to render frames from {}", config.nc_key))?;
    bar.finish_with_message("frames written");

    match cli.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&manifest)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&manifest)?),
        OutputFormat::Csv => {
            println!("index,year,projection,path");
            for frame in &manifest.frames {
                println!(
                    "{},{},{},{}",
                    frame.index,
                    frame.year,
                    frame.projection,
                    frame.path.display()
                );
            }
        }
        OutputFormat::Human => {
            if !cli.quiet {
                println!(
                    "\nWrote {} frames to {}",
                    manifest.len(),
                    config.output_dir
                );
                show_farewell_with_timing(start_time.elapsed());
            }
        }
    }
    Ok(())
}

fn animate(
    cli: &Cli,
    dir: Option<PathBuf>,
    gif_name: Option<String>,
    frame_duration: Option<f64>,
) -> Result<()> {
    let base = match &cli.config {
        Some(path) => Some(
            JobConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
        ),
        None => None,
    };
    let dir = dir
        .or_else(|| base.as_ref().map(|c| PathBuf::from(&c.output_dir)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let gif_name = gif_name
        .or_else(|| base.as_ref().map(|c| c.gif_name.clone()))
        .unwrap_or_else(|| DEFAULT_GIF_NAME.to_string());
    let frame_duration = frame_duration
        .or_else(|| base.as_ref().map(|c| c.frame_duration))
        .unwrap_or(nc2gif::input::DEFAULT_FRAME_DURATION);

    debug!("Animating frames in {}", dir.display());
    let artifact = animate_directory(&dir, &gif_name, frame_duration)
        .with_context(|| format!("Failed to animate frames in {}", dir.display()))?;

    match cli.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&artifact)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&artifact)?),
        OutputFormat::Human | OutputFormat::Csv => {
            if !cli.quiet {
                show_animation(&artifact);
            }
        }
    }
    Ok(())
}

fn validate(cli: &Cli, config_file: Option<&Path>, detailed: bool) -> Result<()> {
    let path = config_file
        .or(cli.config.as_deref())
        .context("No configuration file given (pass CONFIG_FILE or --config)")?;
    let config = JobConfig::from_file(path)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut problems = Vec::new();
    if let Err(e) = config.validate() {
        problems.push(e.to_string());
    }
    problems.extend(check_referenced_files(&config));

    if detailed && Path::new(&config.nc_key).is_file() {
        let source = NetCdfSource::open(&config.nc_key)
            .with_context(|| format!("Failed to open {}", config.nc_key))?;
        match extract(&source, &config.variables, config.resolution.max(1)) {
            Ok(extraction) => {
                if !cli.quiet {
                    show_extraction_summary(&extraction);
                }
            }
            Err(e) => problems.push(format!("Dataset check failed: {}", e)),
        }
    }

    if problems.is_empty() {
        if !cli.quiet {
            println!("Configuration {} is valid", path.display());
        }
        Ok(())
    } else {
        bail!(
            "Configuration {} is invalid:\n  {}",
            path.display(),
            problems.join("\n  ")
        )
    }
}

fn info_command(
    cli: &Cli,
    file: &str,
    detailed: bool,
    variable: Option<&str>,
    format: Option<&OutputFormat>,
) -> Result<()> {
    let names = match &cli.config {
        Some(path) => JobConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?
            .variables,
        None => Default::default(),
    };
    let info = get_dataset_info(file, &names, variable, detailed)?;
    match format.unwrap_or(&cli.output_format) {
        OutputFormat::Human => print_file_info_human(&info),
        OutputFormat::Json => print_file_info_json(&info)?,
        OutputFormat::Yaml => print_file_info_yaml(&info)?,
        OutputFormat::Csv => print_file_info_csv(&info)?,
    }
    Ok(())
}

fn write_or_print(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            use io::Write;
            io::stdout()
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
