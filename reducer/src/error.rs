use std::path::PathBuf;

use ir::IrError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReduceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to write '{}': {source}", path.display())]
    Dump {
        path: PathBuf,
        #[source]
        source: IrError,
    },

    #[error("unable to run '{cmd}': {source}")]
    Launch {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("initial run timed out")]
    GoldenTimeout,

    #[error("interrupted")]
    Interrupted,

    #[error("unable to reduce input file")]
    NoReduction,

    #[error("inconsistent state: {0}")]
    Inconsistent(#[from] IrError),
}
