use std::collections::HashMap;

use ir::{Op, Sort};

use crate::{ParseError, SExpr};

/// `(define-sort name (params) body)` definitions, expanded on use.
pub type SortDefs = HashMap<String, (Vec<String>, SExpr)>;

pub fn parse_sort(ast: &SExpr, defs: &SortDefs) -> Result<Sort, ParseError> {
    parse_sort_with(ast, defs, &HashMap::new())
}

fn parse_sort_with(
    ast: &SExpr,
    defs: &SortDefs,
    params: &HashMap<String, Sort>,
) -> Result<Sort, ParseError> {
    match ast {
        SExpr::Atom(a) => match a.as_str() {
            "Bool" => Ok(Sort::Bool),
            "Int" => Ok(Sort::Int),
            "Real" => Ok(Sort::Real),
            name => {
                if let Some(sort) = params.get(name) {
                    return Ok(sort.clone());
                }
                match defs.get(name) {
                    Some((formals, body)) if formals.is_empty() => parse_sort_with(body, defs, &HashMap::new()),
                    _ => Ok(Sort::Named(name.to_string(), Vec::new())),
                }
            }
        },
        SExpr::List(v) => match v.as_slice() {
            [SExpr::Atom(u), SExpr::Atom(bv), SExpr::Atom(w)] if u == "_" && bv == "BitVec" => {
                let width = w.parse().map_err(|_| invalid_sort(ast, "bad bit-vector width"))?;
                Ok(Sort::BitVec(width))
            }
            [SExpr::Atom(arr), index, element] if arr == "Array" => Ok(Sort::array(
                parse_sort_with(index, defs, params)?,
                parse_sort_with(element, defs, params)?,
            )),
            [SExpr::Atom(name), args @ ..] if !args.is_empty() => {
                let args = args
                    .iter()
                    .map(|a| parse_sort_with(a, defs, params))
                    .collect::<Result<Vec<_>, _>>()?;
                match defs.get(name) {
                    Some((formals, body)) if formals.len() == args.len() => {
                        let bound: HashMap<String, Sort> =
                            formals.iter().cloned().zip(args.into_iter()).collect();
                        parse_sort_with(body, defs, &bound)
                    }
                    _ => Ok(Sort::Named(name.clone(), args)),
                }
            }
            _ => Err(invalid_sort(ast, "unsupported sort")),
        },
    }
}

fn invalid_sort(ast: &SExpr, msg: &str) -> ParseError {
    ParseError::Invalid { what: format!("sort {}", ast), msg: msg.to_string() }
}

/// Result sort of a theory operator applied to arguments of the given sorts.
/// `None` when the operator is unknown or the arguments are ill-sorted.
pub fn builtin_sort(op: &Op, args: &[Option<Sort>]) -> Option<Sort> {
    let first = || args.first().cloned().flatten();
    let width = |i: usize| args.get(i).and_then(|s| s.as_ref()).and_then(Sort::bv_width);
    if !op.indices.is_empty() {
        return match op.name.as_str() {
            "extract" => Some(Sort::BitVec(op.index(0)?.checked_sub(op.index(1)?)?.checked_add(1)?)),
            "zero_extend" | "sign_extend" => Some(Sort::BitVec(width(0)?.checked_add(op.index(0)?)?)),
            "repeat" => Some(Sort::BitVec(width(0)?.checked_mul(op.index(0)?)?)),
            "rotate_left" | "rotate_right" => first(),
            "divisible" => Some(Sort::Bool),
            _ => None,
        };
    }
    match op.name.as_str() {
        "not" | "and" | "or" | "xor" | "=>" | "=" | "distinct" | "<" | "<=" | ">" | ">="
        | "is_int" | "bvult" | "bvule" | "bvugt" | "bvuge" | "bvslt" | "bvsle" | "bvsgt"
        | "bvsge" => Some(Sort::Bool),
        "+" | "-" | "*" | "abs" => first(),
        "div" | "mod" | "to_int" => Some(Sort::Int),
        "/" | "to_real" => Some(Sort::Real),
        "bvnot" | "bvand" | "bvor" | "bvxor" | "bvnand" | "bvnor" | "bvxnor" | "bvneg"
        | "bvadd" | "bvsub" | "bvmul" | "bvudiv" | "bvurem" | "bvsdiv" | "bvsrem" | "bvsmod"
        | "bvshl" | "bvlshr" | "bvashr" => first(),
        "bvcomp" => Some(Sort::BitVec(1)),
        "concat" => {
            let mut total: u32 = 0;
            for i in 0..args.len() {
                total = total.checked_add(width(i)?)?;
            }
            Some(Sort::BitVec(total))
        }
        "select" => first().and_then(|s| s.element().cloned()),
        "store" => first(),
        _ => None,
    }
}
