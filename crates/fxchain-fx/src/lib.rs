//! The fxchain expression language: small per-pixel programs such as
//!
//! ```text
//! @effect pulse(speed: 1.0) {
//!     let wave = sin(time * speed) * 0.25
//!     source() -> brightness(1.0 + wave)
//! }
//! ```
//!
//! compiled once and evaluated on the CPU for every pixel of a frame.

pub mod ast;
pub mod check;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use check::{Program, ProgramParam};
pub use eval::{PixelEnv, Value};

use fxchain_core::FxResult;

/// Compile expression-language source into an executable [`Program`].
pub fn compile(src: &str) -> FxResult<Program> {
    let tokens = lexer::Lexer::new(src).tokenize()?;
    let ast = parser::Parser::new(tokens).parse()?;
    let program = check::Checker::new().check(&ast)?;
    tracing::debug!(
        name = program.name(),
        params = program.params().len(),
        "compiled effect program"
    );
    Ok(program)
}
