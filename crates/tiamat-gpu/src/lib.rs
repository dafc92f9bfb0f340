//! Tiamat GPU draw batcher.
//!
//! This crate owns the draw-batching core of an emulated GPU command stream:
//! guest draws are accumulated into ring-resident indirect records and
//! submitted to the host rendering API in as few calls as possible.

pub mod draw;
pub mod host;
pub mod logging;
pub mod regs;
pub mod ring;
