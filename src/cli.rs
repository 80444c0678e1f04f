//! Command-line parsing for the two benchmark modes.
//!
//! ```text
//! geobench -random <num-dataset> <num-lookups> <num-nearest>
//! geobench -cities <num-lookups> <num-nearest>
//! ```
//!
//! Counts are read like C `atoi` and then clamped to at least one, so
//! `-random 0 5 3` runs exactly like `-random 1 5 3`.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Random { size: usize },
    Cities,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub source: Source,
    pub lookups: usize,
    pub nearest: usize,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error(
        "Usage either\n{program} -random <num-dataset> <num-lookups> <num-nearest>\n\
         or\n{program} -cities <num-lookups> <num-nearest>"
    )]
    WrongArguments { program: String },

    #[error("Specify either '-random' or '-cities', not {0:?}")]
    UnknownMode(String),
}

/// Parse the full argument vector, program name included.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Invocation, UsageError> {
    let program = args
        .first()
        .map_or("geobench", |arg| arg.as_ref())
        .to_owned();
    let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
    let wrong = || UsageError::WrongArguments {
        program: program.clone(),
    };

    match args.as_slice() {
        [_, "-random", size, lookups, nearest] => Ok(Invocation {
            source: Source::Random { size: count(size) },
            lookups: count(lookups),
            nearest: count(nearest),
        }),
        [_, "-cities", lookups, nearest] => Ok(Invocation {
            source: Source::Cities,
            lookups: count(lookups),
            nearest: count(nearest),
        }),
        [_, "-random" | "-cities", ..] => Err(wrong()),
        [_, mode, _, _, ..] => Err(UsageError::UnknownMode((*mode).to_owned())),
        _ => Err(wrong()),
    }
}

/// `atoi` followed by the clamp to at least one.
fn count(raw: &str) -> usize {
    usize::try_from(atoi(raw).max(1)).unwrap_or(usize::MAX)
}

/// Leading whitespace, optional sign, then as many digits as present.
/// Anything unparsable reads as zero; overflow saturates.
fn atoi(raw: &str) -> i64 {
    let raw = raw.trim_start();
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let mut value: i64 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'));
    }
    if negative {
        -value
    } else {
        value
    }
}
