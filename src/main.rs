use log::LevelFilter;
use simple_logger::SimpleLogger;

use corona::config::Config;
use corona::driver;
use corona::error::Error;

fn run() -> Result<(), Error> {
    let config = Config::from_args(std::env::args().skip(1))?;
    driver::run(config)
}

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    if let Err(error) = run() {
        eprintln!("\nERROR: {}\n", error);
        std::process::exit(1);
    }
}
