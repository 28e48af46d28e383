use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use regex::Regex;

use crate::array::{format_shape, Dtype, ImageArray};
use crate::consts::{NPY_HEADER_ALIGN, NPY_MAGIC};
use crate::error::{LenslessError, Result};

static DESCR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]descr['"]\s*:\s*['"]([^'"]+)['"]"#).unwrap());
static FORTRAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]fortran_order['"]\s*:\s*(True|False)"#).unwrap());
static SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]shape['"]\s*:\s*\(([^)]*)\)"#).unwrap());

/// Parsed NPY header dictionary.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyHeader {
    pub dtype: Dtype,
    pub big_endian: bool,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Number of elements; `InvalidNpy` when the shape product overflows.
    pub fn element_count(&self) -> Result<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                LenslessError::InvalidNpy(format!("shape {} overflows", format_shape(&self.shape)))
            })
    }

    pub fn payload_size(&self) -> Result<usize> {
        self.element_count()?
            .checked_mul(self.dtype.item_size())
            .ok_or_else(|| {
                LenslessError::InvalidNpy(format!("shape {} overflows", format_shape(&self.shape)))
            })
    }
}

/// Read a `.npy` file into an [`ImageArray`], preserving dtype and shape.
pub fn read_npy(path: &Path) -> Result<ImageArray> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    decode_npy(&mmap)
}

/// Decode an in-memory NPY buffer.
pub fn decode_npy(buf: &[u8]) -> Result<ImageArray> {
    let (header, offset) = parse_preamble(buf)?;
    let payload = &buf[offset..];
    let needed = header.payload_size()?;
    if payload.len() < needed {
        return Err(LenslessError::InvalidNpy(format!(
            "payload truncated: expected {} bytes, got {}",
            needed,
            payload.len()
        )));
    }
    let payload = &payload[..needed];

    if header.big_endian {
        decode_payload::<BigEndian>(&header, payload)
    } else {
        decode_payload::<LittleEndian>(&header, payload)
    }
}

/// Parse magic, version and header dict. Returns the header and payload offset.
pub fn parse_preamble(buf: &[u8]) -> Result<(NpyHeader, usize)> {
    if buf.len() < 10 {
        return Err(LenslessError::InvalidNpy("file too small for NPY header".into()));
    }
    if &buf[..6] != NPY_MAGIC {
        return Err(LenslessError::InvalidNpy("missing \\x93NUMPY magic".into()));
    }

    let major = buf[6];
    let mut cursor = std::io::Cursor::new(&buf[8..]);
    let (header_len, dict_start) = match major {
        1 => (cursor.read_u16::<LittleEndian>()? as usize, 10),
        2 | 3 => {
            if buf.len() < 12 {
                return Err(LenslessError::InvalidNpy("file too small for NPY header".into()));
            }
            (cursor.read_u32::<LittleEndian>()? as usize, 12)
        }
        v => {
            return Err(LenslessError::InvalidNpy(format!(
                "unsupported format version {v}.{}",
                buf[7]
            )))
        }
    };

    let dict_end = dict_start + header_len;
    if buf.len() < dict_end {
        return Err(LenslessError::InvalidNpy("header truncated".into()));
    }
    // Version 3.0 allows UTF-8; the dict itself is always ASCII for numeric dtypes.
    let text = std::str::from_utf8(&buf[dict_start..dict_end])
        .map_err(|e| LenslessError::InvalidNpy(format!("header is not valid text: {e}")))?;

    Ok((parse_header_dict(text)?, dict_end))
}

/// Parse the Python-literal header dict.
pub fn parse_header_dict(text: &str) -> Result<NpyHeader> {
    let descr = DESCR_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| LenslessError::InvalidNpy("header has no 'descr'".into()))?;
    let fortran_order = FORTRAN_RE
        .captures(text)
        .map(|c| &c[1] == "True")
        .ok_or_else(|| LenslessError::InvalidNpy("header has no 'fortran_order'".into()))?;
    let shape_text = SHAPE_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| LenslessError::InvalidNpy("header has no 'shape'".into()))?;

    let shape = shape_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            // Python 2 era writers emit `3L`.
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| LenslessError::InvalidNpy(format!("bad shape entry '{s}'")))
        })
        .collect::<Result<Vec<_>>>()?;

    let (dtype, big_endian) = parse_descr(&descr)?;

    Ok(NpyHeader {
        dtype,
        big_endian,
        fortran_order,
        shape,
    })
}

/// Split a descriptor such as `<f4` into dtype and byte order.
fn parse_descr(descr: &str) -> Result<(Dtype, bool)> {
    let mut chars = descr.chars().peekable();
    let big_endian = match chars.peek() {
        Some('>') => {
            chars.next();
            true
        }
        Some('<') | Some('|') => {
            chars.next();
            false
        }
        Some('=') => {
            chars.next();
            cfg!(target_endian = "big")
        }
        _ => false,
    };

    let kind = chars
        .next()
        .ok_or_else(|| LenslessError::UnsupportedDtype(descr.to_string()))?;
    let size: usize = chars
        .collect::<String>()
        .parse()
        .map_err(|_| LenslessError::UnsupportedDtype(descr.to_string()))?;

    let dtype = Dtype::from_kind(kind, size)
        .ok_or_else(|| LenslessError::UnsupportedDtype(descr.to_string()))?;
    Ok((dtype, big_endian))
}

fn decode_payload<B: ByteOrder>(header: &NpyHeader, payload: &[u8]) -> Result<ImageArray> {
    let n = header.element_count()?;
    let array = match header.dtype {
        Dtype::Bool => ImageArray::Bool(build(header, payload.iter().map(|&b| b != 0).collect())?),
        Dtype::U8 => ImageArray::U8(build(header, payload.to_vec())?),
        Dtype::I8 => ImageArray::I8(build(header, payload.iter().map(|&b| b as i8).collect())?),
        Dtype::U16 => {
            let mut v = vec![0u16; n];
            B::read_u16_into(payload, &mut v);
            ImageArray::U16(build(header, v)?)
        }
        Dtype::I16 => {
            let mut v = vec![0i16; n];
            B::read_i16_into(payload, &mut v);
            ImageArray::I16(build(header, v)?)
        }
        Dtype::U32 => {
            let mut v = vec![0u32; n];
            B::read_u32_into(payload, &mut v);
            ImageArray::U32(build(header, v)?)
        }
        Dtype::I32 => {
            let mut v = vec![0i32; n];
            B::read_i32_into(payload, &mut v);
            ImageArray::I32(build(header, v)?)
        }
        Dtype::U64 => {
            let mut v = vec![0u64; n];
            B::read_u64_into(payload, &mut v);
            ImageArray::U64(build(header, v)?)
        }
        Dtype::I64 => {
            let mut v = vec![0i64; n];
            B::read_i64_into(payload, &mut v);
            ImageArray::I64(build(header, v)?)
        }
        Dtype::F32 => {
            let mut v = vec![0f32; n];
            B::read_f32_into(payload, &mut v);
            ImageArray::F32(build(header, v)?)
        }
        Dtype::F64 => {
            let mut v = vec![0f64; n];
            B::read_f64_into(payload, &mut v);
            ImageArray::F64(build(header, v)?)
        }
    };
    Ok(array)
}

fn build<T: Clone>(header: &NpyHeader, values: Vec<T>) -> Result<ArrayD<T>> {
    let shape = IxDyn(&header.shape);
    let array = if header.fortran_order {
        ArrayD::from_shape_vec(shape.f(), values)
            .map(|a| a.as_standard_layout().into_owned())
    } else {
        ArrayD::from_shape_vec(shape, values)
    };
    array.map_err(|e| LenslessError::InvalidNpy(format!("shape/payload mismatch: {e}")))
}

/// Format the header dict for the given dtype and shape.
pub fn header_dict(dtype: Dtype, shape: &[usize]) -> String {
    format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        dtype.descr(),
        format_shape(shape)
    )
}

/// Encode an array as a complete NPY buffer (little-endian, C order).
pub fn encode_npy(array: &ImageArray) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(NPY_HEADER_ALIGN + array.len() * array.dtype().item_size());
    write_preamble(&mut buf, array.dtype(), array.shape())?;
    write_payload(&mut buf, array)?;
    Ok(buf)
}

/// Write an array to `path`, replacing any existing file.
pub fn write_npy(path: &Path, array: &ImageArray) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_preamble(&mut writer, array.dtype(), array.shape())?;
    write_payload(&mut writer, array)?;
    writer.flush()?;
    Ok(())
}

fn write_preamble(w: &mut impl Write, dtype: Dtype, shape: &[usize]) -> Result<()> {
    let dict = header_dict(dtype, shape);

    // magic + version + length field, then dict + padding + '\n'
    let unpadded_v1 = NPY_MAGIC.len() + 2 + 2 + dict.len() + 1;
    let pad_v1 = (NPY_HEADER_ALIGN - unpadded_v1 % NPY_HEADER_ALIGN) % NPY_HEADER_ALIGN;
    let header_len_v1 = dict.len() + pad_v1 + 1;

    w.write_all(NPY_MAGIC)?;
    if let Ok(len) = u16::try_from(header_len_v1) {
        w.write_all(&[1, 0])?;
        w.write_u16::<LittleEndian>(len)?;
        w.write_all(dict.as_bytes())?;
        w.write_all(" ".repeat(pad_v1).as_bytes())?;
    } else {
        let unpadded = NPY_MAGIC.len() + 2 + 4 + dict.len() + 1;
        let pad = (NPY_HEADER_ALIGN - unpadded % NPY_HEADER_ALIGN) % NPY_HEADER_ALIGN;
        let header_len = u32::try_from(dict.len() + pad + 1)
            .map_err(|_| LenslessError::InvalidNpy("header too large".into()))?;
        w.write_all(&[2, 0])?;
        w.write_u32::<LittleEndian>(header_len)?;
        w.write_all(dict.as_bytes())?;
        w.write_all(" ".repeat(pad).as_bytes())?;
    }
    w.write_all(b"\n")?;
    Ok(())
}

fn write_payload(w: &mut impl Write, array: &ImageArray) -> Result<()> {
    match array {
        ImageArray::Bool(a) => {
            let bytes: Vec<u8> = a.iter().map(|&v| v as u8).collect();
            w.write_all(&bytes)?;
        }
        ImageArray::U8(a) => {
            let bytes: Vec<u8> = a.iter().copied().collect();
            w.write_all(&bytes)?;
        }
        ImageArray::I8(a) => {
            let bytes: Vec<u8> = a.iter().map(|&v| v as u8).collect();
            w.write_all(&bytes)?;
        }
        ImageArray::U16(a) => {
            let src: Vec<u16> = a.iter().copied().collect();
            let mut bytes = vec![0u8; src.len() * 2];
            LittleEndian::write_u16_into(&src, &mut bytes);
            w.write_all(&bytes)?;
        }
        ImageArray::I16(a) => {
            let src: Vec<i16> = a.iter().copied().collect();
            let mut bytes = vec![0u8; src.len() * 2];
            LittleEndian::write_i16_into(&src, &mut bytes);
            w.write_all(&bytes)?;
        }
        ImageArray::U32(a) => {
            let src: Vec<u32> = a.iter().copied().collect();
            let mut bytes = vec![0u8; src.len() * 4];
            LittleEndian::write_u32_into(&src, &mut bytes);
            w.write_all(&bytes)?;
        }
        ImageArray::I32(a) => {
            let src: Vec<i32> = a.iter().copied().collect();
            let mut bytes = vec![0u8; src.len() * 4];
            LittleEndian::write_i32_into(&src, &mut bytes);
            w.write_all(&bytes)?;
        }
        ImageArray::U64(a) => {
            let src: Vec<u64> = a.iter().copied().collect();
            let mut bytes = vec![0u8; src.len() * 8];
            LittleEndian::write_u64_into(&src, &mut bytes);
            w.write_all(&bytes)?;
        }
        ImageArray::I64(a) => {
            let src: Vec<i64> = a.iter().copied().collect();
            let mut bytes = vec![0u8; src.len() * 8];
            LittleEndian::write_i64_into(&src, &mut bytes);
            w.write_all(&bytes)?;
        }
        ImageArray::F32(a) => {
            let src: Vec<f32> = a.iter().copied().collect();
            let mut bytes = vec![0u8; src.len() * 4];
            LittleEndian::write_f32_into(&src, &mut bytes);
            w.write_all(&bytes)?;
        }
        ImageArray::F64(a) => {
            let src: Vec<f64> = a.iter().copied().collect();
            let mut bytes = vec![0u8; src.len() * 8];
            LittleEndian::write_f64_into(&src, &mut bytes);
            w.write_all(&bytes)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_dict_numpy_style() {
        let h = parse_header_dict("{'descr': '<f4', 'fortran_order': False, 'shape': (100, 100, 3), }")
            .unwrap();
        assert_eq!(h.dtype, Dtype::F32);
        assert!(!h.big_endian);
        assert!(!h.fortran_order);
        assert_eq!(h.shape, vec![100, 100, 3]);
    }

    #[test]
    fn test_parse_header_dict_one_dim_and_scalar() {
        let h = parse_header_dict("{'descr': '|u1', 'fortran_order': False, 'shape': (7,), }").unwrap();
        assert_eq!(h.shape, vec![7]);
        let h = parse_header_dict("{'descr': '>i2', 'fortran_order': True, 'shape': (), }").unwrap();
        assert!(h.shape.is_empty());
        assert!(h.big_endian);
        assert!(h.fortran_order);
        assert_eq!(h.element_count().unwrap(), 1);
    }

    #[test]
    fn test_unknown_descr_is_unsupported_dtype() {
        let err = parse_header_dict("{'descr': '<c8', 'fortran_order': False, 'shape': (2,), }")
            .unwrap_err();
        assert!(matches!(err, LenslessError::UnsupportedDtype(_)));
    }

    #[test]
    fn test_encoded_payload_is_aligned() {
        let arr = ImageArray::from(ArrayD::<u16>::zeros(IxDyn(&[1, 5, 5, 1])));
        let buf = encode_npy(&arr).unwrap();
        let (header, offset) = parse_preamble(&buf).unwrap();
        assert_eq!(offset % NPY_HEADER_ALIGN, 0);
        assert_eq!(buf[offset - 1], b'\n');
        assert_eq!(buf.len() - offset, header.payload_size().unwrap());
    }

    #[test]
    fn test_big_endian_and_fortran_payload() {
        // shape (2, 3), Fortran order, big-endian u16: column-major values 0..6
        let dict = "{'descr': '>u2', 'fortran_order': True, 'shape': (2, 3), }";
        let mut buf = Vec::new();
        buf.extend_from_slice(NPY_MAGIC);
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&((dict.len() + 1) as u16).to_le_bytes());
        buf.extend_from_slice(dict.as_bytes());
        buf.push(b'\n');
        for v in 0u16..6 {
            buf.extend_from_slice(&v.to_be_bytes());
        }

        let arr = decode_npy(&buf).unwrap().into_u16().unwrap();
        assert_eq!(arr.shape(), &[2, 3]);
        // column-major: (0,0)=0 (1,0)=1 (0,1)=2 (1,1)=3 (0,2)=4 (1,2)=5
        assert_eq!(arr[[0, 1]], 2);
        assert_eq!(arr[[1, 2]], 5);
        assert_eq!(arr.iter().copied().collect::<Vec<_>>(), vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let arr = ImageArray::from(ArrayD::<f32>::zeros(IxDyn(&[4, 4])));
        let mut buf = encode_npy(&arr).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(matches!(decode_npy(&buf), Err(LenslessError::InvalidNpy(_))));
    }
}
