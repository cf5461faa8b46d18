//! This module defines the canonical, type-safe representation of data types
//! and raw column values used throughout the tszip pipeline.
//!
//! `DType` is a closed set: every column the table schema can produce is one of
//! these, and dispatch over it is always exhaustive. An unrecognized dtype is a
//! hard `SchemaMismatch` at the policy layer, never a silent default path.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TszipError;
use crate::utils::{bytes_to_typed_vec, typed_slice_to_bytes};

/// The canonical, internal representation of a column's element type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub fn is_signed_int(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub fn is_unsigned_int(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// The unsigned integer type of the same width, for zigzag transforms.
    pub fn to_unsigned(&self) -> Result<DType, TszipError> {
        match self {
            Self::Int8 => Ok(Self::UInt8),
            Self::Int16 => Ok(Self::UInt16),
            Self::Int32 => Ok(Self::UInt32),
            Self::Int64 => Ok(Self::UInt64),
            dt if dt.is_unsigned_int() => Ok(*dt),
            dt => Err(TszipError::UnsupportedType(format!(
                "No unsigned counterpart for {dt}"
            ))),
        }
    }

    /// The unsigned integer type carrying this float type's bit pattern.
    pub fn bits_dtype(&self) -> Result<DType, TszipError> {
        match self {
            Self::Float32 => Ok(Self::UInt32),
            Self::Float64 => Ok(Self::UInt64),
            dt => Err(TszipError::UnsupportedType(format!(
                "Bit-cast requires a float type, got {dt}"
            ))),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // These string representations are part of the container metadata contract.
        write!(f, "{self:?}")
    }
}

/// An owned, typed column buffer: the raw (pre-codec) form of a named array.
///
/// Materialized transiently during encode from a table column, and during
/// decode before being folded back into a column. Never persisted directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl ColumnData {
    pub fn dtype(&self) -> DType {
        match self {
            Self::Int8(_) => DType::Int8,
            Self::Int16(_) => DType::Int16,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::UInt8(_) => DType::UInt8,
            Self::UInt16(_) => DType::UInt16,
            Self::UInt32(_) => DType::UInt32,
            Self::UInt64(_) => DType::UInt64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt8(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes the column's elements to native-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Int8(v) => typed_slice_to_bytes(v),
            Self::Int16(v) => typed_slice_to_bytes(v),
            Self::Int32(v) => typed_slice_to_bytes(v),
            Self::Int64(v) => typed_slice_to_bytes(v),
            Self::UInt8(v) => v.clone(),
            Self::UInt16(v) => typed_slice_to_bytes(v),
            Self::UInt32(v) => typed_slice_to_bytes(v),
            Self::UInt64(v) => typed_slice_to_bytes(v),
            Self::Float32(v) => typed_slice_to_bytes(v),
            Self::Float64(v) => typed_slice_to_bytes(v),
        }
    }

    /// Rebuilds a typed column from raw bytes produced by the decode pipeline.
    pub fn from_bytes(dtype: DType, bytes: &[u8]) -> Result<Self, TszipError> {
        Ok(match dtype {
            DType::Int8 => Self::Int8(bytes_to_typed_vec(bytes)?),
            DType::Int16 => Self::Int16(bytes_to_typed_vec(bytes)?),
            DType::Int32 => Self::Int32(bytes_to_typed_vec(bytes)?),
            DType::Int64 => Self::Int64(bytes_to_typed_vec(bytes)?),
            DType::UInt8 => Self::UInt8(bytes.to_vec()),
            DType::UInt16 => Self::UInt16(bytes_to_typed_vec(bytes)?),
            DType::UInt32 => Self::UInt32(bytes_to_typed_vec(bytes)?),
            DType::UInt64 => Self::UInt64(bytes_to_typed_vec(bytes)?),
            DType::Float32 => Self::Float32(bytes_to_typed_vec(bytes)?),
            DType::Float64 => Self::Float64(bytes_to_typed_vec(bytes)?),
        })
    }

    /// Returns the smallest dtype that can represent every value in this column.
    ///
    /// Only integer columns are narrowed; float columns keep their dtype (no
    /// precision loss is permitted anywhere in the pipeline). Empty columns
    /// keep their dtype so the round trip stays exact.
    pub fn minimal_dtype(&self) -> DType {
        if self.is_empty() {
            return self.dtype();
        }
        match self {
            Self::Int8(_) => DType::Int8,
            Self::Int16(v) => smallest_signed(iter_min_max(v.iter().map(|&x| x as i64))),
            Self::Int32(v) => smallest_signed(iter_min_max(v.iter().map(|&x| x as i64))),
            Self::Int64(v) => smallest_signed(iter_min_max(v.iter().copied())),
            Self::UInt8(_) => DType::UInt8,
            Self::UInt16(v) => smallest_unsigned(v.iter().map(|&x| x as u64).max().unwrap_or(0)),
            Self::UInt32(v) => smallest_unsigned(v.iter().map(|&x| x as u64).max().unwrap_or(0)),
            Self::UInt64(v) => smallest_unsigned(v.iter().copied().max().unwrap_or(0)),
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
        }
    }

    /// Losslessly converts this column to another integer width.
    ///
    /// Narrowing is only ever requested with a dtype computed by
    /// [`minimal_dtype`](Self::minimal_dtype), so an out-of-range value here is
    /// a logic error, not a user error.
    pub fn cast_to(&self, target: DType) -> Result<ColumnData, TszipError> {
        if target == self.dtype() {
            return Ok(self.clone());
        }
        if self.dtype().is_signed_int() && target.is_signed_int() {
            build_signed(target, self.signed_values()?)
        } else if self.dtype().is_unsigned_int() && target.is_unsigned_int() {
            build_unsigned(target, self.unsigned_values()?)
        } else {
            Err(TszipError::UnsupportedType(format!(
                "Cannot cast column from {} to {}",
                self.dtype(),
                target
            )))
        }
    }

    fn signed_values(&self) -> Result<Vec<i64>, TszipError> {
        Ok(match self {
            Self::Int8(v) => v.iter().map(|&x| x as i64).collect(),
            Self::Int16(v) => v.iter().map(|&x| x as i64).collect(),
            Self::Int32(v) => v.iter().map(|&x| x as i64).collect(),
            Self::Int64(v) => v.clone(),
            _ => {
                return Err(TszipError::UnsupportedType(format!(
                    "Expected a signed integer column, got {}",
                    self.dtype()
                )))
            }
        })
    }

    fn unsigned_values(&self) -> Result<Vec<u64>, TszipError> {
        Ok(match self {
            Self::UInt8(v) => v.iter().map(|&x| x as u64).collect(),
            Self::UInt16(v) => v.iter().map(|&x| x as u64).collect(),
            Self::UInt32(v) => v.iter().map(|&x| x as u64).collect(),
            Self::UInt64(v) => v.clone(),
            _ => {
                return Err(TszipError::UnsupportedType(format!(
                    "Expected an unsigned integer column, got {}",
                    self.dtype()
                )))
            }
        })
    }
}

fn iter_min_max(values: impl Iterator<Item = i64>) -> (i64, i64) {
    values.fold((i64::MAX, i64::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)))
}

fn smallest_signed((min, max): (i64, i64)) -> DType {
    if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        DType::Int8
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        DType::Int16
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        DType::Int32
    } else {
        DType::Int64
    }
}

fn smallest_unsigned(max: u64) -> DType {
    if max <= u8::MAX as u64 {
        DType::UInt8
    } else if max <= u16::MAX as u64 {
        DType::UInt16
    } else if max <= u32::MAX as u64 {
        DType::UInt32
    } else {
        DType::UInt64
    }
}

fn build_signed(target: DType, values: Vec<i64>) -> Result<ColumnData, TszipError> {
    let oob = |x: i64| TszipError::InternalError(format!("Value {x} out of range for {target}"));
    Ok(match target {
        DType::Int8 => ColumnData::Int8(
            values
                .into_iter()
                .map(|x| i8::try_from(x).map_err(|_| oob(x)))
                .collect::<Result<_, _>>()?,
        ),
        DType::Int16 => ColumnData::Int16(
            values
                .into_iter()
                .map(|x| i16::try_from(x).map_err(|_| oob(x)))
                .collect::<Result<_, _>>()?,
        ),
        DType::Int32 => ColumnData::Int32(
            values
                .into_iter()
                .map(|x| i32::try_from(x).map_err(|_| oob(x)))
                .collect::<Result<_, _>>()?,
        ),
        DType::Int64 => ColumnData::Int64(values),
        _ => {
            return Err(TszipError::UnsupportedType(format!(
                "Expected a signed integer target, got {target}"
            )))
        }
    })
}

fn build_unsigned(target: DType, values: Vec<u64>) -> Result<ColumnData, TszipError> {
    let oob = |x: u64| TszipError::InternalError(format!("Value {x} out of range for {target}"));
    Ok(match target {
        DType::UInt8 => ColumnData::UInt8(
            values
                .into_iter()
                .map(|x| u8::try_from(x).map_err(|_| oob(x)))
                .collect::<Result<_, _>>()?,
        ),
        DType::UInt16 => ColumnData::UInt16(
            values
                .into_iter()
                .map(|x| u16::try_from(x).map_err(|_| oob(x)))
                .collect::<Result<_, _>>()?,
        ),
        DType::UInt32 => ColumnData::UInt32(
            values
                .into_iter()
                .map(|x| u32::try_from(x).map_err(|_| oob(x)))
                .collect::<Result<_, _>>()?,
        ),
        DType::UInt64 => ColumnData::UInt64(values),
        _ => {
            return Err(TszipError::UnsupportedType(format!(
                "Expected an unsigned integer target, got {target}"
            )))
        }
    })
}

//==================================================================================
// Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_dtype_signed() {
        let col = ColumnData::Int64(vec![0, -1, 1, 127, -128]);
        assert_eq!(col.minimal_dtype(), DType::Int8);

        let col = ColumnData::Int32(vec![i16::MAX as i32 + 1]);
        assert_eq!(col.minimal_dtype(), DType::Int32);

        let col = ColumnData::Int64(vec![i64::MIN, i64::MAX]);
        assert_eq!(col.minimal_dtype(), DType::Int64);
    }

    #[test]
    fn test_minimal_dtype_unsigned() {
        let col = ColumnData::UInt64(vec![0, 255]);
        assert_eq!(col.minimal_dtype(), DType::UInt8);

        let col = ColumnData::UInt64(vec![256]);
        assert_eq!(col.minimal_dtype(), DType::UInt16);

        let col = ColumnData::UInt32(vec![u16::MAX as u32 + 1]);
        assert_eq!(col.minimal_dtype(), DType::UInt32);
    }

    #[test]
    fn test_minimal_dtype_empty_and_float() {
        let col = ColumnData::Int32(vec![]);
        assert_eq!(col.minimal_dtype(), DType::Int32);

        let col = ColumnData::Float64(vec![0.1, 1e-3]);
        assert_eq!(col.minimal_dtype(), DType::Float64);
    }

    #[test]
    fn test_cast_narrow_and_widen_roundtrip() {
        let original = ColumnData::Int32(vec![-1, 0, 1, 100, -100]);
        let narrowed = original.cast_to(DType::Int8).unwrap();
        assert_eq!(narrowed, ColumnData::Int8(vec![-1, 0, 1, 100, -100]));

        let widened = narrowed.cast_to(DType::Int32).unwrap();
        assert_eq!(widened, original);
    }

    #[test]
    fn test_cast_rejects_cross_signedness() {
        let col = ColumnData::Int32(vec![1, 2]);
        assert!(matches!(
            col.cast_to(DType::UInt32),
            Err(TszipError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let col = ColumnData::UInt64(vec![0, 1, u64::MAX]);
        let bytes = col.to_bytes();
        let back = ColumnData::from_bytes(DType::UInt64, &bytes).unwrap();
        assert_eq!(back, col);
    }
}
