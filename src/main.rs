//! commb-rs: a Mode S Comm-B register decoder
//!
//! Reads recorded DF20/DF21 replies in AVR format and classifies each
//! 56-bit Comm-B payload into its BDS register.

mod bits;
mod commb;
mod config;
mod crc;
mod frame;
mod message;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::message::CommBFormat;

/// Classification tallies for one run
#[derive(Debug, Default)]
struct Stats {
    frames: u64,
    skipped: u64,
    not_decoded: u64,
    unknown: u64,
    ambiguous: u64,
    empty: u64,
    decoded: u64,
}

impl Stats {
    fn record(&mut self, format: CommBFormat) {
        self.frames += 1;
        match format {
            CommBFormat::NotDecoded => self.not_decoded += 1,
            CommBFormat::Unknown => self.unknown += 1,
            CommBFormat::Ambiguous => self.ambiguous += 1,
            CommBFormat::EmptyResponse => self.empty += 1,
            _ => self.decoded += 1,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_args();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if config.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let stats = Arc::new(Mutex::new(Stats::default()));

    let (line_tx, line_rx): (Sender<String>, Receiver<String>) = bounded(1024);

    let processor = {
        let stats = Arc::clone(&stats);
        let config = config.clone();
        thread::spawn(move || process_lines(line_rx, stats, config))
    };

    let reader: Box<dyn BufRead> = match config.filename.as_deref() {
        None | Some("-") => {
            info!("reading frames from stdin");
            Box::new(BufReader::new(io::stdin()))
        }
        Some(path) => {
            info!("reading frames from {}", path);
            Box::new(BufReader::new(File::open(path).map_err(|e| {
                error!("cannot open {}: {}", path, e);
                e
            })?))
        }
    };

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        if line_tx.send(line).is_err() {
            break;
        }
    }
    drop(line_tx);

    processor
        .join()
        .map_err(|_| "frame processing thread panicked")?;

    if config.stats {
        let stats = stats.lock();
        println!("{} frames processed", stats.frames);
        println!("  {} decoded to a register", stats.decoded);
        println!("  {} empty responses", stats.empty);
        println!("  {} ambiguous", stats.ambiguous);
        println!("  {} unknown", stats.unknown);
        println!("  {} refused (DR/UM set)", stats.not_decoded);
        println!("{} input lines skipped", stats.skipped);
    }

    Ok(())
}

fn process_lines(rx: Receiver<String>, stats: Arc<Mutex<Stats>>, config: Config) {
    while let Ok(line) = rx.recv() {
        let mut mm = match frame::parse_avr(&line) {
            Some(mm) => mm,
            None => {
                debug!("skipping input line: {}", line);
                stats.lock().skipped += 1;
                continue;
            }
        };

        commb::decode_commb(&mut mm);
        stats.lock().record(mm.commb_format);

        if config.onlyaddr {
            println!("{:06x}", mm.icao);
        } else if config.raw {
            println!("{}", mm.to_raw_string());
        } else {
            println!("{}", mm);
        }
    }
}
