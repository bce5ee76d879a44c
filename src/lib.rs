pub mod error;
pub mod read;

pub use error::ReadError;

use std::fmt;

/// Fixed-size header block at the start of every C3D file.
///
/// Frame bounds are stored exactly as the file declares them (usually
/// 1-based). A negative `scale` means point coordinates are stored as native
/// floats; a positive one means scaled 16-bit integers with `scale` as the
/// multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureHeader {
    /// 1-based 512-byte block index of the parameter section.
    pub param_block: u8,
    pub point_count: u16,
    /// Analog samples stored per frame, in total across all channels.
    pub analog_per_frame: u16,
    pub first_frame: u16,
    pub last_frame: u16,
    pub max_gap: u16,
    pub scale: f32,
    /// 1-based 512-byte block index of the point data section.
    pub data_block: u16,
    pub rate: f32,
}

impl CaptureHeader {
    pub fn frame_count(&self) -> usize {
        (self.last_frame - self.first_frame) as usize + 1
    }

    pub fn uses_float_storage(&self) -> bool {
        self.scale < 0.0
    }
}

/// One record from the parameter section, payload still raw.
///
/// `elem_size` follows the format: -1 for characters, 1 for signed bytes,
/// 2 for 16-bit integers, 4 for 32-bit floats.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Id of the owning group (groups declare the negated id).
    pub group_id: i8,
    pub name: String,
    pub elem_size: i8,
    pub dimensions: Vec<u8>,
    pub payload: Vec<u8>,
}

/// Decoded parameter payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamData {
    /// Fixed-width strings; the first dimension is the string width.
    Char(Vec<u8>),
    Byte(Vec<i8>),
    Int(Vec<i16>),
    Float(Vec<f32>),
}

/// Everything read out of one C3D file. Immutable once constructed; the
/// reader hands it over by value and keeps nothing.
///
/// The point array is frame-major with logical shape
/// `(frame_count, point_count, 3)`. Occluded samples hold NaN in all three
/// coordinates and in the residual.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureDataset {
    /// Marker labels in file order; this order fixes the marker index used
    /// by `point` and `residual`.
    pub labels: Vec<String>,
    pub rate: f32,
    pub first_frame: u16,
    pub last_frame: u16,
    /// `frame_count * point_count` coordinate triples, frame-major.
    pub points: Vec<[f32; 3]>,
    /// One residual per triple, same ordering. NaN where occluded.
    pub residuals: Vec<f32>,
}

impl CaptureDataset {
    pub fn frame_count(&self) -> usize {
        (self.last_frame - self.first_frame) as usize + 1
    }

    pub fn point_count(&self) -> usize {
        self.labels.len()
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.frame_count(), self.point_count(), 3)
    }

    pub fn point(&self, frame: usize, marker: usize) -> [f32; 3] {
        self.points[frame * self.point_count() + marker]
    }

    pub fn residual(&self, frame: usize, marker: usize) -> f32 {
        self.residuals[frame * self.point_count() + marker]
    }

    pub fn marker_index(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l.eq_ignore_ascii_case(name))
    }

    /// Iterate frames as slices of `point_count` triples.
    pub fn frames(&self) -> impl Iterator<Item = &[[f32; 3]]> {
        self.points.chunks(self.point_count().max(1))
    }

    pub fn summary(&self) -> CaptureSummary {
        let preview_marker = self.labels.first().cloned().unwrap_or_default();
        let preview = self
            .frames()
            .take(5)
            .filter_map(|frame| frame.first().copied())
            .collect();
        CaptureSummary {
            point_count: self.point_count(),
            frame_count: self.frame_count(),
            rate: self.rate,
            first_frame: self.first_frame,
            last_frame: self.last_frame,
            labels: self.labels.clone(),
            shape: self.shape(),
            preview_marker,
            preview,
        }
    }
}

/// Diagnostic view of a dataset. The reader never prints; callers format,
/// log, or drop this as they see fit.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    pub point_count: usize,
    pub frame_count: usize,
    pub rate: f32,
    pub first_frame: u16,
    pub last_frame: u16,
    pub labels: Vec<String>,
    pub shape: (usize, usize, usize),
    /// First few frames of the first marker.
    pub preview_marker: String,
    pub preview: Vec<[f32; 3]>,
}

impl fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "point count: {}", self.point_count)?;
        writeln!(f, "frame count: {}", self.frame_count)?;
        writeln!(f, "frame rate: {}", self.rate)?;
        writeln!(f, "first frame: {}", self.first_frame)?;
        writeln!(f, "last frame: {}", self.last_frame)?;
        writeln!(f, "labels: {:?}", self.labels)?;
        writeln!(
            f,
            "point array shape: ({}, {}, 3)",
            self.shape.0, self.shape.1
        )?;
        if !self.preview.is_empty() {
            writeln!(f, "first frames of marker {:?}:", self.preview_marker)?;
            for (i, [x, y, z]) in self.preview.iter().enumerate() {
                writeln!(f, "  frame {}: x={:.2} y={:.2} z={:.2}", i, x, y, z)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dataset() -> CaptureDataset {
        CaptureDataset {
            labels: vec!["RHEE".into(), "LTOE".into()],
            rate: 120.0,
            first_frame: 1,
            last_frame: 3,
            points: vec![
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 1.0],
                [0.5, 0.5, 0.5],
                [1.5, 1.5, 1.5],
                [1.0, 1.0, 1.0],
                [2.0, 2.0, 2.0],
            ],
            residuals: vec![0.0; 6],
        }
    }

    #[test]
    fn shape_follows_frame_bounds() {
        let d = dataset();
        assert_eq!(d.frame_count(), 3);
        assert_eq!(d.shape(), (3, 2, 3));
        assert_eq!(d.point(1, 1), [1.5, 1.5, 1.5]);
    }

    #[test]
    fn marker_lookup_ignores_case() {
        let d = dataset();
        assert_eq!(d.marker_index("ltoe"), Some(1));
        assert_eq!(d.marker_index("C7"), None);
    }

    #[test]
    fn summary_previews_first_marker() {
        let s = dataset().summary();
        assert_eq!(s.preview_marker, "RHEE");
        assert_eq!(s.preview.len(), 3);
        assert_eq!(s.shape, (3, 2, 3));
        let text = s.to_string();
        assert!(text.contains("frame count: 3"));
        assert!(text.contains("frame rate: 120"));
    }
}
