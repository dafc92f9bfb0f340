//! Emulated register file.
//!
//! Responsibilities:
//! - flat word storage addressed by a fixed register enumeration
//! - byte views of the three shader-constant windows for bulk snapshots
//!
//! The draw batcher only ever reads; the command-stream front end writes.

mod file;

pub use file::{
    Register, RegisterFile, BOOL_CONSTANT_WORDS, BOOL_WINDOW_BYTES, FLOAT_CONSTANT_VEC4S,
    FLOAT_CONSTANT_WORDS, FLOAT_WINDOW_BYTES, LOOP_CONSTANT_WORDS, LOOP_WINDOW_BYTES,
};
