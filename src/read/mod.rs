use log::{debug, trace};
use nom::bytes::complete::take;
use nom::multi::count;
use nom::number::complete::{le_f32, le_i16, le_i8, le_u16, le_u8};
use nom::IResult;

use super::*;

/// Signature byte shared by the header and the parameter section.
pub const MAGIC: u8 = 0x50;
/// Processor type written by Intel-ordered files. DEC (85) and SGI (86)
/// byte orders are not decoded.
pub const PROCESSOR_INTEL: u8 = 84;

const BLOCK_SIZE: usize = 512;

/// Maps a nom failure inside `section` onto the error taxonomy. Every
/// parser below runs over `complete` input, so the only way to fail is a
/// declared extent running past the end of the stream.
fn complete<'a, O>(
    section: &'static str,
    res: IResult<&'a [u8], O>,
) -> Result<(&'a [u8], O), ReadError> {
    res.map_err(|_| ReadError::Truncated(section))
}

impl CaptureHeader {
    fn parse(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, param_block) = le_u8(i)?;
        let (i, _magic) = le_u8(i)?;
        let (i, point_count) = le_u16(i)?;
        let (i, analog_per_frame) = le_u16(i)?;
        let (i, first_frame) = le_u16(i)?;
        let (i, last_frame) = le_u16(i)?;
        let (i, max_gap) = le_u16(i)?;
        let (i, scale) = le_f32(i)?;
        let (i, data_block) = le_u16(i)?;
        let (i, _analog_samples_per_channel) = le_u16(i)?;
        let (i, rate) = le_f32(i)?;
        Ok((
            i,
            CaptureHeader {
                param_block,
                point_count,
                analog_per_frame,
                first_frame,
                last_frame,
                max_gap,
                scale,
                data_block,
                rate,
            },
        ))
    }
}

/// Parameter section prologue: reserved byte, signature, block count,
/// processor type.
fn prologue(i: &[u8]) -> IResult<&[u8], (u8, u8)> {
    let (i, _reserved) = le_u8(i)?;
    let (i, signature) = le_u8(i)?;
    let (i, _blocks) = le_u8(i)?;
    let (i, processor) = le_u8(i)?;
    Ok((i, (signature, processor)))
}

enum Record {
    Group { id: i8, name: String },
    Param(Parameter),
}

/// One group or parameter record. `None` is the chain terminator (zero
/// group id or empty name). The second element is the advance from the
/// record's first byte to the next record, derived from the declared offset
/// (measured from the end of the offset field); `None` ends the chain.
///
/// Records are chain-linked, not necessarily adjacent, so the caller seeks
/// by the advance rather than by how many bytes the record parse consumed.
fn record(i: &[u8]) -> IResult<&[u8], Option<(Record, Option<usize>)>> {
    let (i, name_len) = le_i8(i)?;
    let (i, id) = le_i8(i)?;
    if id == 0 || name_len == 0 {
        return Ok((i, None));
    }
    let name_bytes = (name_len as i16).abs() as usize;
    let (i, name) = take(name_bytes)(i)?;
    let name = String::from_utf8_lossy(name).trim().to_string();
    let (i, next) = le_i16(i)?;
    let advance = if next > 0 {
        Some(2 + name_bytes + 2 + next as usize)
    } else {
        None
    };
    if id < 0 {
        let (i, desc_len) = le_u8(i)?;
        let (i, _desc) = take(desc_len as usize)(i)?;
        Ok((i, Some((Record::Group { id, name }, advance))))
    } else {
        let (i, elem_size) = le_i8(i)?;
        let (i, n_dims) = le_u8(i)?;
        let (i, dimensions) = count(le_u8, n_dims as usize)(i)?;
        if !matches!(elem_size, -1 | 1 | 2 | 4) {
            // don't size the payload with an unknown width; the caller
            // rejects the record before ever looking at the payload
            let param = Parameter {
                group_id: id,
                name,
                elem_size,
                dimensions,
                payload: vec![],
            };
            return Ok((i, Some((Record::Param(param), advance))));
        }
        let len = dimensions.iter().map(|&d| d as usize).product::<usize>()
            * (elem_size as i16).abs() as usize;
        let (i, payload) = take(len)(i)?;
        let (i, desc_len) = le_u8(i)?;
        let (i, _desc) = take(desc_len as usize)(i)?;
        let param = Parameter {
            group_id: id,
            name,
            elem_size,
            dimensions,
            payload: payload.to_vec(),
        };
        Ok((i, Some((Record::Param(param), advance))))
    }
}

impl Parameter {
    pub fn decode(&self) -> Result<ParamData, ReadError> {
        match self.elem_size {
            -1 => Ok(ParamData::Char(self.payload.clone())),
            1 => Ok(ParamData::Byte(
                self.payload.iter().map(|&b| b as i8).collect(),
            )),
            2 => {
                let n = self.payload.len() / 2;
                let (_, v) = complete("parameter payload", count(le_i16, n)(&self.payload[..]))?;
                Ok(ParamData::Int(v))
            }
            4 => {
                let n = self.payload.len() / 4;
                let (_, v) = complete("parameter payload", count(le_f32, n)(&self.payload[..]))?;
                Ok(ParamData::Float(v))
            }
            other => Err(ReadError::UnsupportedEncoding {
                what: "parameter element size",
                value: other as i32,
            }),
        }
    }

    /// Decode a character parameter as trimmed fixed-width strings. The
    /// first dimension is the string width.
    pub fn strings(&self) -> Result<Vec<String>, ReadError> {
        match self.decode()? {
            ParamData::Char(chars) => {
                let width = self
                    .dimensions
                    .first()
                    .copied()
                    .map(usize::from)
                    .unwrap_or_else(|| chars.len())
                    .max(1);
                Ok(chars
                    .chunks(width)
                    .map(|c| {
                        String::from_utf8_lossy(c)
                            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
                            .to_string()
                    })
                    .collect())
            }
            _ => Err(ReadError::UnsupportedEncoding {
                what: "parameter element size for strings",
                value: self.elem_size as i32,
            }),
        }
    }
}

/// A point record in floating-point storage: x, y, z, residual word. A
/// negative residual marks the marker occluded for the frame; the sample is
/// stored as NaN so no rescale can resurrect it.
fn point_f32(i: &[u8]) -> IResult<&[u8], ([f32; 3], f32)> {
    let (i, x) = le_f32(i)?;
    let (i, y) = le_f32(i)?;
    let (i, z) = le_f32(i)?;
    let (i, w) = le_f32(i)?;
    let rec = if w < 0.0 {
        ([f32::NAN; 3], f32::NAN)
    } else {
        ([x, y, z], w)
    };
    Ok((i, rec))
}

/// A point record in scaled-integer storage. A residual word of -1 is the
/// occlusion sentinel; otherwise its low byte times the scale magnitude is
/// the residual.
fn point_i16(scale: f32) -> impl Fn(&[u8]) -> IResult<&[u8], ([f32; 3], f32)> {
    move |i: &[u8]| {
        let (i, x) = le_i16(i)?;
        let (i, y) = le_i16(i)?;
        let (i, z) = le_i16(i)?;
        let (i, w) = le_i16(i)?;
        let rec = if w == -1 {
            ([f32::NAN; 3], f32::NAN)
        } else {
            (
                [x as f32 * scale, y as f32 * scale, z as f32 * scale],
                (w as u16 & 0xFF) as f32 * scale,
            )
        };
        Ok((i, rec))
    }
}

impl CaptureDataset {
    /// Decode one C3D byte stream in a single pass. Fatal on the first
    /// failed check; never returns a partial dataset.
    pub fn read(data: &[u8]) -> Result<Self, ReadError> {
        if data.len() < 2 {
            return Err(ReadError::Truncated("header block"));
        }
        if data[1] != MAGIC {
            return Err(ReadError::Format("header signature byte"));
        }
        let (_, header) = complete("header block", CaptureHeader::parse(data))?;
        debug!("header: {:?}", header);
        if header.param_block == 0 {
            return Err(ReadError::Format("parameter section pointer"));
        }
        if header.data_block == 0 {
            return Err(ReadError::Format("data section pointer"));
        }
        if header.last_frame < header.first_frame {
            return Err(ReadError::Format("frame bounds"));
        }
        if !(header.rate > 0.0) {
            return Err(ReadError::Format("sampling rate"));
        }

        let section = data
            .get((header.param_block as usize - 1) * BLOCK_SIZE..)
            .ok_or(ReadError::Truncated("parameter section"))?;
        let (_, (signature, processor)) = complete("parameter section", prologue(section))?;
        if signature != MAGIC {
            return Err(ReadError::Format("parameter section signature"));
        }
        if processor != PROCESSOR_INTEL {
            return Err(ReadError::UnsupportedEncoding {
                what: "processor type",
                value: processor as i32,
            });
        }

        let mut groups: Vec<(i8, String)> = vec![];
        let mut parameters: Vec<Parameter> = vec![];
        let mut pos = 4;
        loop {
            let rest = section
                .get(pos..)
                .ok_or(ReadError::Truncated("parameter record"))?;
            let (_, rec) = complete("parameter record", record(rest))?;
            let (rec, advance) = match rec {
                Some(r) => r,
                None => break,
            };
            match rec {
                Record::Group { id, name } => {
                    trace!("group {}: {}", -(id as i16), name);
                    groups.push((id, name));
                }
                Record::Param(p) => {
                    match p.elem_size {
                        -1 | 1 | 2 | 4 => {}
                        other => {
                            return Err(ReadError::UnsupportedEncoding {
                                what: "parameter element size",
                                value: other as i32,
                            })
                        }
                    }
                    trace!("parameter {} in group {}", p.name, p.group_id);
                    parameters.push(p);
                }
            }
            match advance {
                Some(step) => pos += step,
                None => break,
            }
        }
        debug!("{} group(s), {} parameter(s)", groups.len(), parameters.len());

        let point_group = groups
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case("POINT"))
            .map(|(id, _)| -(*id as i16));
        let labels = match point_group.and_then(|gid| {
            parameters
                .iter()
                .find(|p| p.group_id as i16 == gid && p.name.eq_ignore_ascii_case("LABELS"))
        }) {
            Some(p) => p.strings()?,
            None => vec![],
        };
        if labels.len() != header.point_count as usize {
            return Err(ReadError::LabelMismatch {
                labels: labels.len(),
                points: header.point_count as usize,
            });
        }

        // Data section location comes from the header, not from wherever the
        // parameter chain happened to end.
        let word = if header.uses_float_storage() { 4 } else { 2 };
        let point_count = header.point_count as usize;
        let analog_bytes = header.analog_per_frame as usize * word;
        let frame_bytes = point_count * 4 * word + analog_bytes;
        let frame_count = header.frame_count();
        let section = data
            .get((header.data_block as usize - 1) * BLOCK_SIZE..)
            .ok_or(ReadError::Truncated("data section"))?;
        let need = frame_bytes
            .checked_mul(frame_count)
            .ok_or(ReadError::Truncated("data section"))?;
        if section.len() < need {
            return Err(ReadError::Truncated("data section"));
        }

        let scale = header.scale.abs();
        let mut points = Vec::with_capacity(frame_count * point_count);
        let mut residuals = Vec::with_capacity(frame_count * point_count);
        let mut i = section;
        for _ in 0..frame_count {
            let (rest, records) = if header.uses_float_storage() {
                complete("point data", count(point_f32, point_count)(i))?
            } else {
                complete("point data", count(point_i16(scale), point_count)(i))?
            };
            // Analog samples are skipped, never decoded.
            let (rest, _) = complete("analog data", take(analog_bytes)(rest))?;
            i = rest;
            for (xyz, residual) in records {
                points.push(xyz);
                residuals.push(residual);
            }
        }

        Ok(CaptureDataset {
            labels,
            rate: header.rate,
            first_frame: header.first_frame,
            last_frame: header.last_frame,
            points,
            residuals,
        })
    }
}
