use std::{
    error::Error as StdError,
    fmt::{self, Display},
    result,
};

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Serenity(serenity::Error),
    Db(warden_db::Error),
    Url(url::ParseError),
    /// Missing or malformed setting, fatal at startup
    Config(String),
    /// A channel or message lookup against discord failed
    Lookup(String),
    /// A store write still failed after every retry
    Store {
        attempts: u32,
        source: warden_db::Error,
    },
    /// Malformed command, the text is sent back to the invoker
    Usage(&'static str),
    Internal(String),
    ConstStr(&'static str),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Serenity(inner) => fmt::Display::fmt(&inner, f),
            Error::Db(inner) => fmt::Display::fmt(&inner, f),
            Error::Url(inner) => fmt::Display::fmt(&inner, f),
            Error::Config(inner) => write!(f, "invalid configuration: {inner}"),
            Error::Lookup(inner) => write!(f, "lookup failed: {inner}"),
            Error::Store { attempts, source } => {
                write!(f, "store write failed after {attempts} attempts: {source}")
            }
            Error::Usage(inner) => f.write_str(inner),
            Error::Internal(inner) => f.write_str(inner),
            Error::ConstStr(inner) => f.write_str(inner),
        }
    }
}

impl StdError for Error {}

impl From<serenity::Error> for Error {
    fn from(e: serenity::Error) -> Error {
        Error::Serenity(e)
    }
}

impl From<warden_db::Error> for Error {
    fn from(e: warden_db::Error) -> Error {
        Error::Db(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Error {
        Error::Url(e)
    }
}
