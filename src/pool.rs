//! Thread-local parser pooling for performance optimization.
//!
//! Eliminates redundant parser creation by maintaining thread-local reusable
//! parsers, one per dialect. Creates a parser on first use per thread, reuses
//! it for subsequent operations.

use crate::ts::{Dialect, ParseError, TsParser};
use std::cell::RefCell;

thread_local! {
    static TS_PARSER: RefCell<Option<TsParser>> = const { RefCell::new(None) };
    static TSX_PARSER: RefCell<Option<TsParser>> = const { RefCell::new(None) };
}

/// Execute function with a pooled parser for the given dialect.
///
/// On first call per thread, creates a new parser. Subsequent calls reuse
/// the same parser instance, avoiding allocation and initialization overhead.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use queryscope::pool::with_parser;
/// use queryscope::ts::Dialect;
///
/// let result = with_parser(Dialect::Ts, |parser| {
///     parser.parse_with_source("const x: number = 1")
/// })?;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(dialect: Dialect, f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut TsParser) -> R,
{
    let slot = match dialect {
        Dialect::Ts => &TS_PARSER,
        Dialect::Tsx => &TSX_PARSER,
    };

    slot.with(|cell| {
        let mut opt = cell.borrow_mut();
        if opt.is_none() {
            *opt = Some(TsParser::with_dialect(dialect)?);
        }
        Ok(f(opt.as_mut().expect("parser was just initialized above")))
    })
}
