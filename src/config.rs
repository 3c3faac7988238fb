//! Configuration and command-line argument parsing

use std::env;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Input file with AVR-format frames, '-' for stdin
    pub filename: Option<String>,

    // Output
    pub raw: bool,
    pub onlyaddr: bool,
    pub stats: bool,
    pub verbose: bool,
}

impl Config {
    pub fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut config = Config::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--ifile" => {
                    i += 1;
                    config.filename = args.get(i).cloned();
                }
                "--raw" => config.raw = true,
                "--onlyaddr" => config.onlyaddr = true,
                "--stats" => config.stats = true,
                "--verbose" => config.verbose = true,
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown option: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        config
    }
}

fn print_help() {
    println!(
        r#"commb-rs - Mode S Comm-B register decoder

Usage: commb-rs [OPTIONS]

Reads AVR-format lines (*<hex>;) and classifies the Comm-B payload of
every DF20/DF21 frame into its BDS register.

Options:
  --ifile <filename>     Read frames from file (use '-' for stdin)
  --raw                  Echo only the raw frame hex
  --onlyaddr             Show only recovered ICAO addresses
  --stats                Print classification statistics at exit
  --verbose              Log skipped input lines
  --help                 Show this help
"#
    );
}
