//! partysim - Party Combat Decision Engine
//!
//! Runs one scripted encounter headlessly and writes its combat log.

use std::process::ExitCode;

use partysim::cli;
use partysim::headless::{run_headless_match, HeadlessConfig};

fn main() -> ExitCode {
    let args = cli::parse_args();

    let mut config = match HeadlessConfig::load_from_file(&args.headless) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    args.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run_headless_match(config) {
        Ok(result) => {
            println!(
                "Outcome: {:?} after {} ticks ({:.0}s)",
                result.outcome, result.ticks, result.match_time
            );
            for member in &result.party {
                println!(
                    "  {:<12} {:>6.0}/{:<6.0} dmg {:>7.0}  heal {:>7.0}  casts {}",
                    member.name,
                    member.final_health,
                    member.max_health,
                    member.damage_dealt,
                    member.healing_done,
                    member.casts
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
