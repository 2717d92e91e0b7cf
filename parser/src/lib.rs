//! SMT-LIB v2 front-end: reads a script into an `ir::Formula`.
//!
//! Parsing happens in two steps. The pest grammar only knows about
//! s-expressions; `builder` then interprets the commands, resolves symbols
//! and infers the sorts the reducer needs.

use std::fmt;
use std::path::Path;

use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

mod builder;
mod sorts;

pub use builder::build;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct SmtParser;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("syntax error: {0}")]
    Syntax(Box<pest::error::Error<Rule>>),

    #[error("invalid {what}: {msg}")]
    Invalid { what: String, msg: String },

    #[error("'pop' of {0} scope(s) exceeds the number of open scopes")]
    UnbalancedPop(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(a) => Some(a),
            SExpr::List(_) => None,
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Atom(s) => write!(f, "{}", s),
            SExpr::List(v) => {
                write!(f, "(")?;
                for (i, e) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Splits `source` into its top-level s-expressions.
pub fn parse_sexprs(source: &str) -> Result<Vec<SExpr>, ParseError> {
    let script = SmtParser::parse(Rule::script, source)
        .map_err(|e| ParseError::Syntax(Box::new(e)))?
        .next()
        .ok_or_else(|| ParseError::Invalid { what: "script".into(), msg: "empty parse".into() })?;
    Ok(script
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(to_sexpr)
        .collect())
}

fn to_sexpr(pair: pest::iterators::Pair<Rule>) -> SExpr {
    stacker::maybe_grow(32 * 1024, 1024 * 1024, || match pair.as_rule() {
        Rule::list => SExpr::List(pair.into_inner().map(to_sexpr).collect()),
        _ => SExpr::Atom(pair.as_str().to_string()),
    })
}

pub fn parse(source: &str) -> Result<ir::Formula, ParseError> {
    build(&parse_sexprs(source)?)
}

pub fn parse_file(path: &Path) -> Result<ir::Formula, ParseError> {
    let source = std::fs::read_to_string(path)?;
    parse(&source)
}
