use thiserror::Error;

/// Everything that can go wrong while decoding a C3D stream. All variants
/// are fatal to the read; no partial dataset is ever returned.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The stream does not look like a C3D file at all.
    #[error("not a C3D stream: {0}")]
    Format(&'static str),

    /// A declared extent runs past the end of the stream.
    #[error("truncated stream while reading {0}")]
    Truncated(&'static str),

    /// A numeric encoding variant this reader does not decode.
    #[error("unsupported encoding: {what} {value}")]
    UnsupportedEncoding { what: &'static str, value: i32 },

    /// POINT:LABELS disagrees with the header's point count.
    #[error("found {labels} point labels but the header declares {points} points")]
    LabelMismatch { labels: usize, points: usize },
}
