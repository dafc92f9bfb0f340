use bytemuck::cast_slice;

/// Float-constant window, in vec4 units.
pub const FLOAT_CONSTANT_VEC4S: usize = 512;
/// Float-constant window, in 32-bit words.
pub const FLOAT_CONSTANT_WORDS: usize = FLOAT_CONSTANT_VEC4S * 4;
/// Bool-constant window, in 32-bit words (one flag per bit).
pub const BOOL_CONSTANT_WORDS: usize = 8;
/// Loop-constant window, in 32-bit words.
pub const LOOP_CONSTANT_WORDS: usize = 32;

pub const FLOAT_WINDOW_BYTES: usize = FLOAT_CONSTANT_WORDS * 4;
pub const BOOL_WINDOW_BYTES: usize = BOOL_CONSTANT_WORDS * 4;
pub const LOOP_WINDOW_BYTES: usize = LOOP_CONSTANT_WORDS * 4;

// Word layout of the register file. The three constant windows are
// contiguous runs; scalar registers sit below them.
const REG_INDEX_OFFSET: usize = 0;
const REG_FLOAT_BASE: usize = 8;
const REG_BOOL_BASE: usize = REG_FLOAT_BASE + FLOAT_CONSTANT_WORDS;
const REG_LOOP_BASE: usize = REG_BOOL_BASE + BOOL_CONSTANT_WORDS;
const REG_FILE_WORDS: usize = REG_LOOP_BASE + LOOP_CONSTANT_WORDS;

/// Registers the draw batcher consumes.
///
/// Only a small, fixed slice of the emulated register space matters here:
/// the index-offset register plus the three shader-constant windows.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Register {
    /// Offset added to the first vertex/index of every draw.
    IndexOffset,
    /// Word within the float-constant window.
    FloatConstant(u16),
    /// Word within the bool-constant window.
    BoolConstant(u8),
    /// Word within the loop-constant window.
    LoopConstant(u8),
}

impl Register {
    fn word_index(self) -> usize {
        match self {
            Register::IndexOffset => REG_INDEX_OFFSET,
            Register::FloatConstant(i) => {
                debug_assert!((i as usize) < FLOAT_CONSTANT_WORDS);
                REG_FLOAT_BASE + i as usize
            }
            Register::BoolConstant(i) => {
                debug_assert!((i as usize) < BOOL_CONSTANT_WORDS);
                REG_BOOL_BASE + i as usize
            }
            Register::LoopConstant(i) => {
                debug_assert!((i as usize) < LOOP_CONSTANT_WORDS);
                REG_LOOP_BASE + i as usize
            }
        }
    }
}

/// Flat register storage.
///
/// Handed to the batcher by reference at begin/commit time; never written
/// from inside the batcher.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    words: Box<[u32]>,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            words: vec![0u32; REG_FILE_WORDS].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn read(&self, reg: Register) -> u32 {
        self.words[reg.word_index()]
    }

    #[inline]
    pub fn write(&mut self, reg: Register, value: u32) {
        self.words[reg.word_index()] = value;
    }

    /// Value of the index-offset register.
    #[inline]
    pub fn index_offset(&self) -> u32 {
        self.words[REG_INDEX_OFFSET]
    }

    /// Raw bytes of the float-constant window, in register order.
    #[inline]
    pub fn float_window(&self) -> &[u8] {
        cast_slice(&self.words[REG_FLOAT_BASE..REG_FLOAT_BASE + FLOAT_CONSTANT_WORDS])
    }

    /// Raw bytes of the bool-constant window.
    #[inline]
    pub fn bool_window(&self) -> &[u8] {
        cast_slice(&self.words[REG_BOOL_BASE..REG_BOOL_BASE + BOOL_CONSTANT_WORDS])
    }

    /// Raw bytes of the loop-constant window.
    #[inline]
    pub fn loop_window(&self) -> &[u8] {
        cast_slice(&self.words[REG_LOOP_BASE..REG_LOOP_BASE + LOOP_CONSTANT_WORDS])
    }
}
