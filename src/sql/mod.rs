pub mod ast;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod typecheck;

pub use ast::{BinaryOp, Expr};
pub use eval::RowContext;
