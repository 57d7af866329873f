mod configuration;
mod render;

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use layout_core::prelude::*;
use layout_core::templates;
use simplelog::{LevelFilter, WriteLogger};
use thiserror::Error;

use configuration::{ConfigError, DesignerConfiguration};

#[derive(Debug, Parser)]
#[command(name = "anno_layout")]
#[command(about = "Inspect building layout codes")]
struct Args {
    /// Configuration file, defaults to ./anno_layout.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Building type registry file, may be repeated
    #[arg(long = "catalog", global = true)]
    catalogs: Vec<PathBuf>,

    /// Write a debug log
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the placements of a code, with type names when a catalog is given
    Decode { code: String },
    /// Draw the layout of a code as text
    Render { code: String },
    /// Outline a footprint mask written as rows of `#` and `.` separated by `/`
    Trace { mask: String },
    /// Print one of the built-in layouts
    Template { index: usize },
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("could not create log file {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("there is no template {0}, pick one below {}", templates::TEMPLATES.len())]
    UnknownTemplate(usize),
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        AppError::Layout(err.into())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        AppError::Layout(err.into())
    }
}

impl From<MaskError> for AppError {
    fn from(err: MaskError) -> Self {
        AppError::Layout(err.into())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        },
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let configuration = DesignerConfiguration::load(args.config.as_deref())?;
    setup_logging(args.debug, &configuration)?;
    log::debug!("Running {:?} with {:?}", args.command, configuration);

    let catalog_files: Vec<PathBuf> = configuration
        .catalogs()
        .iter()
        .chain(args.catalogs.iter())
        .cloned()
        .collect();

    match args.command {
        Command::Decode { code } => {
            if catalog_files.is_empty() {
                for raw in CodecV0.decode_raw(&code)? {
                    println!(
                        "type {:>3} at {} {:?}",
                        raw.type_code, raw.at, raw.orientation
                    );
                }
            } else {
                let catalog = load_catalog(&catalog_files)?;
                for placement in CodecV0.decode(&code, &catalog)? {
                    println!(
                        "{} at {} {:?}",
                        placement.building_type().name(),
                        placement.at(),
                        placement.orientation()
                    );
                }
            }
        },
        Command::Render { code } => {
            let catalog = load_catalog(&catalog_files)?;
            let mut grid = Grid::new();
            grid.import(&code, &catalog)?;
            println!("{} buildings within {}", grid.len(), grid.bounds());
            print!("{}", render::render_ascii(&grid));
        },
        Command::Trace { mask } => {
            let rows: Vec<&str> = mask.split('/').collect();
            let mask = FootprintMask::from_rows(&rows)?;
            let contours = trace(&mask);
            for contour in contours.iter() {
                println!("{}", render::describe_contour(contour));
            }
            println!("{}", path_data(&contours, configuration.tile_side()));
        },
        Command::Template { index } => {
            let code = templates::template(index).ok_or(AppError::UnknownTemplate(index))?;
            println!("{}", code);
        },
    }
    Ok(())
}

/// Built-in types, overridden by each registry file in turn.
fn load_catalog(files: &[PathBuf]) -> Result<TypeCatalog, AppError> {
    let mut catalog = TypeCatalog::sample()?;
    for file in files {
        let count = catalog.load_registry_file(file)?;
        log::debug!("Loaded {} building types from {:?}", count, file);
    }
    Ok(catalog)
}

fn setup_logging(debug: bool, configuration: &DesignerConfiguration) -> Result<(), AppError> {
    let file = match (configuration.log_file(), debug) {
        (Some(file), _) => file.to_path_buf(),
        (None, true) => PathBuf::from("debug.log"),
        (None, false) => return Ok(()),
    };
    let target = File::create(&file).map_err(|source| AppError::LogFile {
        path: file.clone(),
        source,
    })?;
    WriteLogger::init(
        configuration.log_level()?,
        simplelog::ConfigBuilder::new()
            .set_target_level(LevelFilter::Error)
            .build(),
        target,
    )?;
    Ok(())
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;
    use test_log::test;

    use super::*;

    #[test]
    fn cli_definition() {
        Args::command().debug_assert();
        let args = Args::parse_from([
            "anno_layout",
            "render",
            "005H32",
            "--catalog",
            "a.reg.toml",
            "--catalog",
            "b.reg.toml",
        ]);
        assert_eq!(args.catalogs.len(), 2);
        assert!(!args.debug);
        assert!(matches!(args.command, Command::Render { code } if code == "005H32"));
    }

    #[test]
    fn missing_catalog_file() {
        assert!(matches!(
            load_catalog(&[PathBuf::from("/no/such/types.reg.toml")]),
            Err(AppError::Layout(LayoutError::Catalog(CatalogError::Io { .. })))
        ));
        assert_eq!(load_catalog(&[]).map(|catalog| catalog.len()).ok(), Some(9));
    }

    #[test]
    fn unknown_template() {
        let args = Args::parse_from(["anno_layout", "template", "7"]);
        assert!(matches!(run(args), Err(AppError::UnknownTemplate(7))));
    }
}
