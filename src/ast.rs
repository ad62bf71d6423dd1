//! # Sift Selector Language - Abstract Syntax Tree
//!
//! Node model shared by the selector parser, the condition parser and the
//! compiler.
//!
//! - **[tokens]** - Lexical tokens of the condition language
//! - **[chain]** - Access steps and value chains (`x.prop[0]['key']`)
//! - **[operators]** - Comparison and logical operators
//! - **[spec]** - Multi-field projections, conditions and logical nodes
//!
//! ## Selectors
//!
//! ```text
//! prop                  field access
//! prop.inner.value      chained field access
//! prop[0]               integer index
//! prop['key'], prop[key] keyed access
//! a, b, c               named multi-field row
//! *                     every field of the element type
//! (object)x.payload.id  reinterpret the element before access
//! price as decimal      coerce the result
//! ```
//!
//! ## Conditions
//!
//! ```text
//! age >= 18
//! name =~ "^A"
//! active
//! ```
//!
//! Every node renders back to a canonical text through `Display`. That text
//! is what compiled artifacts are cached under.
pub mod chain;
pub mod operators;
pub mod spec;
pub mod tokens;

pub use chain::{AccessStep, ValueChain};
pub use operators::{CompareOp, LogicalOp};
pub use spec::{Condition, LogicalSpec, MultiFieldSpec, Spec};
pub use tokens::Token;
