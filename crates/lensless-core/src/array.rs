use std::fmt;

use ndarray::{ArrayD, IxDyn};

/// Element type of an [`ImageArray`], named after the NumPy dtype it mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl Dtype {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Dtype::U8
                | Dtype::I8
                | Dtype::U16
                | Dtype::I16
                | Dtype::U32
                | Dtype::I32
                | Dtype::U64
                | Dtype::I64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Dtype::F32 | Dtype::F64)
    }

    /// Bytes per element.
    pub fn item_size(self) -> usize {
        match self {
            Dtype::Bool | Dtype::U8 | Dtype::I8 => 1,
            Dtype::U16 | Dtype::I16 => 2,
            Dtype::U32 | Dtype::I32 | Dtype::F32 => 4,
            Dtype::U64 | Dtype::I64 | Dtype::F64 => 8,
        }
    }

    /// Little-endian NumPy type descriptor, as written into NPY headers.
    pub fn descr(self) -> &'static str {
        match self {
            Dtype::Bool => "|b1",
            Dtype::U8 => "|u1",
            Dtype::I8 => "|i1",
            Dtype::U16 => "<u2",
            Dtype::I16 => "<i2",
            Dtype::U32 => "<u4",
            Dtype::I32 => "<i4",
            Dtype::U64 => "<u8",
            Dtype::I64 => "<i8",
            Dtype::F32 => "<f4",
            Dtype::F64 => "<f8",
        }
    }

    /// Resolve a descriptor kind character and byte width (`'u', 2` → `U16`).
    pub fn from_kind(kind: char, size: usize) -> Option<Dtype> {
        match (kind, size) {
            ('b', 1) => Some(Dtype::Bool),
            ('u', 1) => Some(Dtype::U8),
            ('i', 1) => Some(Dtype::I8),
            ('u', 2) => Some(Dtype::U16),
            ('i', 2) => Some(Dtype::I16),
            ('u', 4) => Some(Dtype::U32),
            ('i', 4) => Some(Dtype::I32),
            ('u', 8) => Some(Dtype::U64),
            ('i', 8) => Some(Dtype::I64),
            ('f', 4) => Some(Dtype::F32),
            ('f', 8) => Some(Dtype::F64),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dtype::Bool => "bool",
            Dtype::U8 => "uint8",
            Dtype::I8 => "int8",
            Dtype::U16 => "uint16",
            Dtype::I16 => "int16",
            Dtype::U32 => "uint32",
            Dtype::I32 => "int32",
            Dtype::U64 => "uint64",
            Dtype::I64 => "int64",
            Dtype::F32 => "float32",
            Dtype::F64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An n-dimensional captured image or PSF with its element type preserved.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageArray {
    Bool(ArrayD<bool>),
    U8(ArrayD<u8>),
    I8(ArrayD<i8>),
    U16(ArrayD<u16>),
    I16(ArrayD<i16>),
    U32(ArrayD<u32>),
    I32(ArrayD<i32>),
    U64(ArrayD<u64>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// Apply a type-generic expression to the inner array, yielding a plain value.
macro_rules! with_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            $crate::array::ImageArray::Bool($a) => $body,
            $crate::array::ImageArray::U8($a) => $body,
            $crate::array::ImageArray::I8($a) => $body,
            $crate::array::ImageArray::U16($a) => $body,
            $crate::array::ImageArray::I16($a) => $body,
            $crate::array::ImageArray::U32($a) => $body,
            $crate::array::ImageArray::I32($a) => $body,
            $crate::array::ImageArray::U64($a) => $body,
            $crate::array::ImageArray::I64($a) => $body,
            $crate::array::ImageArray::F32($a) => $body,
            $crate::array::ImageArray::F64($a) => $body,
        }
    };
}

/// Apply a type-generic array transform, keeping the variant.
macro_rules! map_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            $crate::array::ImageArray::Bool($a) => $crate::array::ImageArray::Bool($body),
            $crate::array::ImageArray::U8($a) => $crate::array::ImageArray::U8($body),
            $crate::array::ImageArray::I8($a) => $crate::array::ImageArray::I8($body),
            $crate::array::ImageArray::U16($a) => $crate::array::ImageArray::U16($body),
            $crate::array::ImageArray::I16($a) => $crate::array::ImageArray::I16($body),
            $crate::array::ImageArray::U32($a) => $crate::array::ImageArray::U32($body),
            $crate::array::ImageArray::I32($a) => $crate::array::ImageArray::I32($body),
            $crate::array::ImageArray::U64($a) => $crate::array::ImageArray::U64($body),
            $crate::array::ImageArray::I64($a) => $crate::array::ImageArray::I64($body),
            $crate::array::ImageArray::F32($a) => $crate::array::ImageArray::F32($body),
            $crate::array::ImageArray::F64($a) => $crate::array::ImageArray::F64($body),
        }
    };
}

pub(crate) use map_array;

impl ImageArray {
    pub fn dtype(&self) -> Dtype {
        match self {
            ImageArray::Bool(_) => Dtype::Bool,
            ImageArray::U8(_) => Dtype::U8,
            ImageArray::I8(_) => Dtype::I8,
            ImageArray::U16(_) => Dtype::U16,
            ImageArray::I16(_) => Dtype::I16,
            ImageArray::U32(_) => Dtype::U32,
            ImageArray::I32(_) => Dtype::I32,
            ImageArray::U64(_) => Dtype::U64,
            ImageArray::I64(_) => Dtype::I64,
            ImageArray::F32(_) => Dtype::F32,
            ImageArray::F64(_) => Dtype::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element-wise widening to f64 (`true` → 1.0), for statistics and analysis.
    pub fn to_f64(&self) -> ArrayD<f64> {
        match self {
            ImageArray::Bool(a) => a.mapv(|v| if v { 1.0 } else { 0.0 }),
            ImageArray::U8(a) => a.mapv(f64::from),
            ImageArray::I8(a) => a.mapv(f64::from),
            ImageArray::U16(a) => a.mapv(f64::from),
            ImageArray::I16(a) => a.mapv(f64::from),
            ImageArray::U32(a) => a.mapv(f64::from),
            ImageArray::I32(a) => a.mapv(f64::from),
            ImageArray::U64(a) => a.mapv(|v| v as f64),
            ImageArray::I64(a) => a.mapv(|v| v as f64),
            ImageArray::F32(a) => a.mapv(f64::from),
            ImageArray::F64(a) => a.clone(),
        }
    }

    /// Element-wise cast to f32.
    pub fn to_f32(&self) -> ArrayD<f32> {
        match self {
            ImageArray::F32(a) => a.clone(),
            other => other.to_f64().mapv(|v| v as f32),
        }
    }

    pub fn as_u16(&self) -> Option<&ArrayD<u16>> {
        match self {
            ImageArray::U16(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_u16(self) -> Option<ArrayD<u16>> {
        match self {
            ImageArray::U16(a) => Some(a),
            _ => None,
        }
    }

    /// All-zero array of the given dtype and shape.
    pub fn zeros(dtype: Dtype, shape: &[usize]) -> ImageArray {
        let dim = IxDyn(shape);
        match dtype {
            Dtype::Bool => ImageArray::Bool(ArrayD::from_elem(dim, false)),
            Dtype::U8 => ImageArray::U8(ArrayD::zeros(dim)),
            Dtype::I8 => ImageArray::I8(ArrayD::zeros(dim)),
            Dtype::U16 => ImageArray::U16(ArrayD::zeros(dim)),
            Dtype::I16 => ImageArray::I16(ArrayD::zeros(dim)),
            Dtype::U32 => ImageArray::U32(ArrayD::zeros(dim)),
            Dtype::I32 => ImageArray::I32(ArrayD::zeros(dim)),
            Dtype::U64 => ImageArray::U64(ArrayD::zeros(dim)),
            Dtype::I64 => ImageArray::I64(ArrayD::zeros(dim)),
            Dtype::F32 => ImageArray::F32(ArrayD::zeros(dim)),
            Dtype::F64 => ImageArray::F64(ArrayD::zeros(dim)),
        }
    }
}

macro_rules! impl_from_array {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<ArrayD<$t>> for ImageArray {
                fn from(a: ArrayD<$t>) -> Self {
                    ImageArray::$variant(a)
                }
            }
        )*
    };
}

impl_from_array!(
    bool => Bool,
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

/// Render a shape the way NumPy prints it: `(1, 50, 50, 1)` or `(7,)`.
pub fn format_shape(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({single},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
