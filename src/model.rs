use core::fmt;

// Strongly typed bit ordering within a packed byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOrder {
    /// First sample occupies the most significant bits ("big").
    MsbFirst,
    /// First sample occupies the least significant bits ("little").
    LsbFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// A bit width other than 1, 2, or 4 was requested.
    UnsupportedBits(usize),
    /// A caller-supplied output buffer has the wrong length.
    OutputLength { expected: usize, actual: usize },
    /// An input length that does not divide into whole packed bytes.
    InputLength { len: usize, group: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnsupportedBits(nbits) => write!(
                f,
                "Invalid number of bits: {}. Supported values are 1, 2, and 4.",
                nbits
            ),
            CodecError::OutputLength { expected, actual } => write!(
                f,
                "Output buffer size is not correct. Expected {} bytes, got {}.",
                expected, actual
            ),
            CodecError::InputLength { len, group } => write!(
                f,
                "Input length {} is not a multiple of {} samples.",
                len, group
            ),
        }
    }
}

impl std::error::Error for CodecError {}

pub type CodecResult<T> = Result<T, CodecError>;
