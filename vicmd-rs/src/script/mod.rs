//! Expression language used by `:echo`, `:let`, `:execute` and conditions.
//!
//! - Integer and string values with Vim-style coercions
//! - `||`, `&&`, comparisons, arithmetic and `.` concatenation
//! - `$ENV`, `&option`, `v:`/`g:` variables and function calls
//! - Macro (`%c`, `%f`, `%d`) and environment expansion of arguments
//!
//! # Quick start
//!
//! ```rust
//! use vicmd::script::{expr, Value};
//!
//! let e = expr::parse_expr("1 + 2 * 3").unwrap();
//! assert_eq!(e, expr::parse_expr("1 + (2 * 3)").unwrap());
//! assert_eq!(Value::Int(7).to_string(), "7");
//! ```

pub mod builtins;
pub mod expand;
pub mod expr;
pub mod value;

pub use expr::{EvalContext, EvalOutcome, ParseError};
pub use value::Value;
