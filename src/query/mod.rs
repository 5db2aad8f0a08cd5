//! Query language and its SQL compiler
//!
//! A query is a tree of clauses `(selector, operator, args)` composed with
//! `and`/`or`. Selectors address values inside a record, e.g.
//! `["n", "CSQ", "*", "Gene"]` or `["s", 0, "GT", "t"]`.
//!
//! Compilation resolves selectors against the metadata graph and produces a
//! parameterized WHERE expression and ORDER BY list; the same selectors can
//! also be walked over in-memory values with [`select`].

mod ast;
mod compiler;
mod errors;
mod fragment;
mod order;
mod selector;

pub use ast::{
    Clause, CompareFn, Composition, Operator, Query, Selector, SelectorPart, SortDirection,
    SortOrder,
};
pub use compiler::{
    compile, from_clause, nested_alias, qualified, Column, CompiledQuery, QueryCompiler, Target,
    INFO_ALIAS, VCF_ALIAS,
};
pub use errors::{QueryError, QueryErrorCode, QueryResult, Severity};
pub use fragment::{quote_ident, SqlFragment, SqlParam};
pub use order::TEXT_KEY_FN;
pub use selector::{
    resolve, select, FixedColumn, GenotypePart, Resolved, Scope, GENOTYPE_FIELD,
};

