use thiserror::Error;

/// Errors returned when a string can't be parsed into a typed Resource ID.
///
/// Every variant carries the original input and an example of a valid ID so
/// the message is actionable on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    #[error("parsing {description} ID: the input was empty, expected a Resource ID like {example:?}")]
    Empty {
        description: &'static str,
        example: String,
    },

    #[error(
        "parsing {input:?}: the number of segments didn't match - expected {expected} segments like {example:?} but got {actual}"
    )]
    SegmentCount {
        input: String,
        expected: usize,
        actual: usize,
        example: String,
    },

    #[error(
        "parsing {input:?}: the segment at position {position} didn't match - expected {expected:?} but got {actual:?}"
    )]
    SegmentMismatch {
        input: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("parsing {input:?}: the segment {segment:?} was empty, expected a value like {example:?}")]
    MissingValue {
        input: String,
        segment: &'static str,
        example: &'static str,
    },

    #[error("the segment {segment:?} was not found in the parse result")]
    MissingSegment { segment: String },
}
