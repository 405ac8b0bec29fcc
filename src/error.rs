//! CLI Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    /// Building an online client failed.
    #[display("could not set up online clients")]
    Setup,
    /// The content set file is missing or isn't a valid set.
    #[display("could not read content set")]
    Input,
    #[display("could not write output")]
    Output,
}
