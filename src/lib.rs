pub mod ast;
pub mod cache;
pub mod compiler;
pub mod convert;
pub mod engine;
pub mod introspect;
pub mod lexer;
pub mod mode;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod selector;
pub mod sequence;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{AccessStep, CompareOp, Condition, LogicalOp, MultiFieldSpec, Spec, Token, ValueChain};
pub use cache::{CacheKey, CompileCache};
pub use compiler::{CompileError, Compiler, EvalError, InvocationError, Projected, Row};
pub use engine::{Engine, Ordered, QueryError, SortDirection, Source};
pub use introspect::ElementType;
pub use lexer::{LexError, Lexer, Position};
pub use mode::CompileMode;
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser, parse_condition};
pub use selector::{parse_chain, parse_selector};
pub use sequence::Sequence;
pub use value::{Value, ValueKind};
