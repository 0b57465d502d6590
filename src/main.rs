use clap::{crate_version, App, Arg};
use std::path::Path;
use xylem::build::Builder;
use xylem::config::Config;
use xylem::router::Router;

mod logger;

fn main() {
    let matches = App::new("xylem")
        .version(crate_version!())
        .about("Builds a static site from a directory of xyl posts")
        .arg(
            Arg::with_name("project")
                .short("p")
                .long("project")
                .value_name("DIR")
                .takes_value(true)
                .help("Directory to search (upwards) for `xylem.yaml`; defaults to the working directory"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("DIR")
                .takes_value(true)
                .help("Output directory; overrides the project file"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log every directory, directive, and render"),
        )
        .get_matches();

    if let Err(e) = logger::init(matches.is_present("verbose")) {
        eprintln!("{}", e);
    }

    let project = matches.value_of("project").map(Path::new);
    let output = matches.value_of("output").map(Path::new);
    if let Err(e) = run(project, output) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(project: Option<&Path>, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let project = match project {
        Some(dir) => dir.to_owned(),
        None => std::env::current_dir()?,
    };
    let config = Config::from_directory(&project, output)?;
    let router = Router::load(&config.router)?;
    Builder::new(&config, &router).build()?;
    Ok(())
}
