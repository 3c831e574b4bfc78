use std::fmt;
use std::path::PathBuf;

pub const USAGE: &str = "Usage: file-detection <file_path> <process_name>";

/// The two positional arguments, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub file_path: PathBuf,
    pub process_name: String,
}

/// Returned when the argument count is anything other than two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageError {
    pub got: usize,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected 2 arguments, got {}", self.got)
    }
}

impl std::error::Error for UsageError {}

/// Parses the arguments that follow the program name.
pub fn parse<I>(args: I) -> Result<Args, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    match <[String; 2]>::try_from(args) {
        Ok([file_path, process_name]) => Ok(Args {
            file_path: PathBuf::from(file_path),
            process_name,
        }),
        Err(rest) => Err(UsageError { got: rest.len() }),
    }
}
