use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not read from archive")]
    Library,
    #[display("could not write output file: {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
    #[display("could not encode output")]
    Encode,
}
