//! A simple CLI tool for verifying a closed election's vote ledger.
//! This uses the server's own verification implementation, and is by
//! definition compatible with the output of our API endpoints.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use votechain::{error::Error as LedgerError, model::api::dump::LedgerDump};

const PROGRAM_NAME: &str = "verify-votechain";

const ABOUT_TEXT: &str = "Verify the integrity of an election's vote ledger and recount it.

EXIT CODES:
     0: Verification succeeded.
   255: Ran successfully, but verification failed.
 Other: Error.";

const DUMP_PATH: &str = "DUMP_PATH";

const DUMP_PATH_HELP: &str = "The path to a JSON dump of a closed election,\n\
as returned by `GET /elections/<election_id>/ledger`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(DUMP_PATH)
            .help(DUMP_PATH_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// Verification failed at the given record.
    Verification { sequence: u64, reason: String },
}

/// The verified count for a particular candidate.
#[derive(Debug, Eq, PartialEq)]
struct CandidateResult {
    pub candidate: String,
    pub votes: u64,
}

impl Display for CandidateResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} vote{}",
            self.candidate,
            self.votes,
            if self.votes != 1 { "s" } else { "" }
        )
    }
}

/// Run verification.
fn verify(path: &str) -> Result<Vec<CandidateResult>, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let dump: LedgerDump =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    // Verify and count.
    let tally = dump.tally().map_err(|e| match e {
        LedgerError::Integrity {
            sequence, reason, ..
        } => Error::Verification { sequence, reason },
        other => Error::Format(other.to_string()),
    })?;

    // Order by votes, then name.
    let mut results: Vec<_> = tally
        .counts
        .into_iter()
        .map(|(candidate, votes)| CandidateResult { candidate, votes })
        .collect();
    results.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.candidate.cmp(&b.candidate)));
    Ok(results)
}

/// Run verification, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(DUMP_PATH).unwrap(); // Required argument is guaranteed to be present.
    match verify(path) {
        Ok(results) => {
            println!("Verification succeeded.");
            for result in results {
                println!("{result}");
            }
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid ledger dump: {msg}");
            1
        }
        Err(Error::Verification { sequence, reason }) => {
            println!("Verification failed at record {sequence}: {reason}.");
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
