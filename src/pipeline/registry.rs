//! The codec registry: an explicit, constructed mapping from codec ids to
//! implementations.
//!
//! The registry is passed into the executor rather than living in global
//! state, so tests can substitute a reduced or fake registry deterministically.
//! Each built-in codec dispatches over the closed `DType` set to the matching
//! generic kernel; an unrecognized dtype for a codec is a hard error, never a
//! silent pass-through.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::TszipError;
use crate::kernels::{bitcast, delta, leb128, rle, shuffle, zigzag, zstd};
use crate::types::DType;
use crate::utils::bytes_to_typed_vec;

/// A reversible byte-level transform or terminal entropy coder.
///
/// For filters, `decode`'s `dtype` argument is the dtype of the *decoded
/// output* (the dtype that entered `encode`); the implementation derives the
/// encoded-side type itself, mirroring the forward `transform_dtype`.
pub trait Codec: Send + Sync {
    fn id(&self) -> &'static str;

    /// The dtype of this codec's encoded output given its input dtype.
    fn transform_dtype(&self, dtype: DType, params: &Value) -> Result<DType, TszipError>;

    fn encode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        params: &Value,
    ) -> Result<(), TszipError>;

    fn decode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        num_values: usize,
        params: &Value,
    ) -> Result<(), TszipError>;
}

/// Registry of named codecs. Constructed explicitly and passed by reference
/// into the pipeline.
pub struct CodecRegistry {
    codecs: HashMap<&'static str, Box<dyn Codec>>,
}

impl CodecRegistry {
    /// An empty registry, for tests that need full control.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// The standard registry with all built-in filters and the zstd coder.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(DeltaCodec));
        registry.register(Box::new(ZigZagCodec));
        registry.register(Box::new(Leb128Codec));
        registry.register(Box::new(ShuffleCodec));
        registry.register(Box::new(RleCodec));
        registry.register(Box::new(BitCastCodec));
        registry.register(Box::new(ZstdCodec));
        registry
    }

    pub fn register(&mut self, codec: Box<dyn Codec>) {
        self.codecs.insert(codec.id(), codec);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.codecs.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<&dyn Codec, TszipError> {
        self.codecs
            .get(id)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| TszipError::UnsupportedCodec(id.to_string()))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

//==================================================================================
// Built-in Codecs
//==================================================================================

/// Order-k delta transform over any integer dtype.
pub struct DeltaCodec;

impl Codec for DeltaCodec {
    fn id(&self) -> &'static str {
        "delta"
    }

    fn transform_dtype(&self, dtype: DType, _params: &Value) -> Result<DType, TszipError> {
        if dtype.is_float() {
            return Err(TszipError::UnsupportedType(format!(
                "Delta requires an integer dtype, got {dtype}"
            )));
        }
        Ok(dtype)
    }

    fn encode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        params: &Value,
    ) -> Result<(), TszipError> {
        let order = CodecSpecParams(params).u64("order", 1) as usize;
        match dtype {
            DType::Int8 => delta::encode(&bytes_to_typed_vec::<i8>(input)?, output, order),
            DType::Int16 => delta::encode(&bytes_to_typed_vec::<i16>(input)?, output, order),
            DType::Int32 => delta::encode(&bytes_to_typed_vec::<i32>(input)?, output, order),
            DType::Int64 => delta::encode(&bytes_to_typed_vec::<i64>(input)?, output, order),
            DType::UInt8 => delta::encode(&bytes_to_typed_vec::<u8>(input)?, output, order),
            DType::UInt16 => delta::encode(&bytes_to_typed_vec::<u16>(input)?, output, order),
            DType::UInt32 => delta::encode(&bytes_to_typed_vec::<u32>(input)?, output, order),
            DType::UInt64 => delta::encode(&bytes_to_typed_vec::<u64>(input)?, output, order),
            dt => Err(TszipError::UnsupportedType(format!(
                "Delta requires an integer dtype, got {dt}"
            ))),
        }
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _num_values: usize,
        params: &Value,
    ) -> Result<(), TszipError> {
        let order = CodecSpecParams(params).u64("order", 1) as usize;
        match dtype {
            DType::Int8 => delta::decode(&bytes_to_typed_vec::<i8>(input)?, output, order),
            DType::Int16 => delta::decode(&bytes_to_typed_vec::<i16>(input)?, output, order),
            DType::Int32 => delta::decode(&bytes_to_typed_vec::<i32>(input)?, output, order),
            DType::Int64 => delta::decode(&bytes_to_typed_vec::<i64>(input)?, output, order),
            DType::UInt8 => delta::decode(&bytes_to_typed_vec::<u8>(input)?, output, order),
            DType::UInt16 => delta::decode(&bytes_to_typed_vec::<u16>(input)?, output, order),
            DType::UInt32 => delta::decode(&bytes_to_typed_vec::<u32>(input)?, output, order),
            DType::UInt64 => delta::decode(&bytes_to_typed_vec::<u64>(input)?, output, order),
            dt => Err(TszipError::UnsupportedType(format!(
                "Delta requires an integer dtype, got {dt}"
            ))),
        }
    }
}

/// Signed-to-unsigned zig-zag mapping.
pub struct ZigZagCodec;

impl Codec for ZigZagCodec {
    fn id(&self) -> &'static str {
        "zigzag"
    }

    fn transform_dtype(&self, dtype: DType, _params: &Value) -> Result<DType, TszipError> {
        if !dtype.is_signed_int() {
            return Err(TszipError::UnsupportedType(format!(
                "ZigZag requires a signed integer dtype, got {dtype}"
            )));
        }
        dtype.to_unsigned()
    }

    fn encode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _params: &Value,
    ) -> Result<(), TszipError> {
        match dtype {
            DType::Int8 => zigzag::encode(&bytes_to_typed_vec::<i8>(input)?, output),
            DType::Int16 => zigzag::encode(&bytes_to_typed_vec::<i16>(input)?, output),
            DType::Int32 => zigzag::encode(&bytes_to_typed_vec::<i32>(input)?, output),
            DType::Int64 => zigzag::encode(&bytes_to_typed_vec::<i64>(input)?, output),
            dt => Err(TszipError::UnsupportedType(format!(
                "ZigZag requires a signed integer dtype, got {dt}"
            ))),
        }
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _num_values: usize,
        _params: &Value,
    ) -> Result<(), TszipError> {
        // `dtype` is the original signed type; the encoded stream holds its
        // unsigned counterpart.
        match dtype {
            DType::Int8 => zigzag::decode(&bytes_to_typed_vec::<u8>(input)?, output),
            DType::Int16 => zigzag::decode(&bytes_to_typed_vec::<u16>(input)?, output),
            DType::Int32 => zigzag::decode(&bytes_to_typed_vec::<u32>(input)?, output),
            DType::Int64 => zigzag::decode(&bytes_to_typed_vec::<u64>(input)?, output),
            dt => Err(TszipError::UnsupportedType(format!(
                "ZigZag requires a signed integer dtype, got {dt}"
            ))),
        }
    }
}

/// LEB128 varint coding over unsigned dtypes.
pub struct Leb128Codec;

impl Codec for Leb128Codec {
    fn id(&self) -> &'static str {
        "leb128"
    }

    fn transform_dtype(&self, dtype: DType, _params: &Value) -> Result<DType, TszipError> {
        if !dtype.is_unsigned_int() {
            return Err(TszipError::UnsupportedType(format!(
                "LEB128 requires an unsigned integer dtype, got {dtype}"
            )));
        }
        Ok(dtype)
    }

    fn encode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _params: &Value,
    ) -> Result<(), TszipError> {
        match dtype {
            DType::UInt8 => leb128::encode(&bytes_to_typed_vec::<u8>(input)?, output),
            DType::UInt16 => leb128::encode(&bytes_to_typed_vec::<u16>(input)?, output),
            DType::UInt32 => leb128::encode(&bytes_to_typed_vec::<u32>(input)?, output),
            DType::UInt64 => leb128::encode(&bytes_to_typed_vec::<u64>(input)?, output),
            dt => Err(TszipError::UnsupportedType(format!(
                "LEB128 requires an unsigned integer dtype, got {dt}"
            ))),
        }
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        num_values: usize,
        _params: &Value,
    ) -> Result<(), TszipError> {
        match dtype {
            DType::UInt8 => leb128::decode::<u8>(input, output, num_values),
            DType::UInt16 => leb128::decode::<u16>(input, output, num_values),
            DType::UInt32 => leb128::decode::<u32>(input, output, num_values),
            DType::UInt64 => leb128::decode::<u64>(input, output, num_values),
            dt => Err(TszipError::UnsupportedType(format!(
                "LEB128 requires an unsigned integer dtype, got {dt}"
            ))),
        }
    }
}

/// Byte-plane shuffle over any fixed-width dtype.
pub struct ShuffleCodec;

impl Codec for ShuffleCodec {
    fn id(&self) -> &'static str {
        "shuffle"
    }

    fn transform_dtype(&self, dtype: DType, _params: &Value) -> Result<DType, TszipError> {
        Ok(dtype)
    }

    fn encode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _params: &Value,
    ) -> Result<(), TszipError> {
        match dtype {
            DType::Int8 => shuffle::encode(&bytes_to_typed_vec::<i8>(input)?, output),
            DType::Int16 => shuffle::encode(&bytes_to_typed_vec::<i16>(input)?, output),
            DType::Int32 => shuffle::encode(&bytes_to_typed_vec::<i32>(input)?, output),
            DType::Int64 => shuffle::encode(&bytes_to_typed_vec::<i64>(input)?, output),
            DType::UInt8 => shuffle::encode(&bytes_to_typed_vec::<u8>(input)?, output),
            DType::UInt16 => shuffle::encode(&bytes_to_typed_vec::<u16>(input)?, output),
            DType::UInt32 => shuffle::encode(&bytes_to_typed_vec::<u32>(input)?, output),
            DType::UInt64 => shuffle::encode(&bytes_to_typed_vec::<u64>(input)?, output),
            DType::Float32 => shuffle::encode(&bytes_to_typed_vec::<f32>(input)?, output),
            DType::Float64 => shuffle::encode(&bytes_to_typed_vec::<f64>(input)?, output),
        }
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _num_values: usize,
        _params: &Value,
    ) -> Result<(), TszipError> {
        shuffle::decode(input, output, dtype.size())
    }
}

/// Run-length coding over integer dtypes.
pub struct RleCodec;

impl Codec for RleCodec {
    fn id(&self) -> &'static str {
        "rle"
    }

    fn transform_dtype(&self, dtype: DType, _params: &Value) -> Result<DType, TszipError> {
        if dtype.is_float() {
            return Err(TszipError::UnsupportedType(format!(
                "RLE requires an integer dtype, got {dtype}"
            )));
        }
        Ok(dtype)
    }

    fn encode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _params: &Value,
    ) -> Result<(), TszipError> {
        match dtype {
            DType::Int8 => rle::encode(&bytes_to_typed_vec::<i8>(input)?, output),
            DType::Int16 => rle::encode(&bytes_to_typed_vec::<i16>(input)?, output),
            DType::Int32 => rle::encode(&bytes_to_typed_vec::<i32>(input)?, output),
            DType::Int64 => rle::encode(&bytes_to_typed_vec::<i64>(input)?, output),
            DType::UInt8 => rle::encode(&bytes_to_typed_vec::<u8>(input)?, output),
            DType::UInt16 => rle::encode(&bytes_to_typed_vec::<u16>(input)?, output),
            DType::UInt32 => rle::encode(&bytes_to_typed_vec::<u32>(input)?, output),
            DType::UInt64 => rle::encode(&bytes_to_typed_vec::<u64>(input)?, output),
            dt => Err(TszipError::UnsupportedType(format!(
                "RLE requires an integer dtype, got {dt}"
            ))),
        }
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        num_values: usize,
        _params: &Value,
    ) -> Result<(), TszipError> {
        match dtype {
            DType::Int8 => rle::decode::<i8>(input, output, num_values),
            DType::Int16 => rle::decode::<i16>(input, output, num_values),
            DType::Int32 => rle::decode::<i32>(input, output, num_values),
            DType::Int64 => rle::decode::<i64>(input, output, num_values),
            DType::UInt8 => rle::decode::<u8>(input, output, num_values),
            DType::UInt16 => rle::decode::<u16>(input, output, num_values),
            DType::UInt32 => rle::decode::<u32>(input, output, num_values),
            DType::UInt64 => rle::decode::<u64>(input, output, num_values),
            dt => Err(TszipError::UnsupportedType(format!(
                "RLE requires an integer dtype, got {dt}"
            ))),
        }
    }
}

/// IEEE-754 bits to unsigned integer reinterpretation.
pub struct BitCastCodec;

impl Codec for BitCastCodec {
    fn id(&self) -> &'static str {
        "bitcast"
    }

    fn transform_dtype(&self, dtype: DType, _params: &Value) -> Result<DType, TszipError> {
        dtype.bits_dtype()
    }

    fn encode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _params: &Value,
    ) -> Result<(), TszipError> {
        match dtype {
            DType::Float32 => bitcast::encode::<f32, u32>(input, output),
            DType::Float64 => bitcast::encode::<f64, u64>(input, output),
            dt => Err(TszipError::UnsupportedType(format!(
                "Bit-cast requires a float dtype, got {dt}"
            ))),
        }
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        dtype: DType,
        _num_values: usize,
        _params: &Value,
    ) -> Result<(), TszipError> {
        match dtype {
            DType::Float32 => bitcast::decode::<u32, f32>(input, output),
            DType::Float64 => bitcast::decode::<u64, f64>(input, output),
            dt => Err(TszipError::UnsupportedType(format!(
                "Bit-cast requires a float dtype, got {dt}"
            ))),
        }
    }
}

/// Terminal Zstandard entropy coder.
pub struct ZstdCodec;

impl Codec for ZstdCodec {
    fn id(&self) -> &'static str {
        "zstd"
    }

    fn transform_dtype(&self, dtype: DType, _params: &Value) -> Result<DType, TszipError> {
        Ok(dtype)
    }

    fn encode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        _dtype: DType,
        params: &Value,
    ) -> Result<(), TszipError> {
        let level = CodecSpecParams(params).i64("level", 3) as i32;
        zstd::encode(input, output, level)
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut Vec<u8>,
        _dtype: DType,
        _num_values: usize,
        _params: &Value,
    ) -> Result<(), TszipError> {
        zstd::decode(input, output)
    }
}

/// Thin accessor over a codec's JSON parameter object.
struct CodecSpecParams<'a>(&'a Value);

impl CodecSpecParams<'_> {
    fn u64(&self, key: &str, default: u64) -> u64 {
        self.0.get(key).and_then(Value::as_u64).unwrap_or(default)
    }

    fn i64(&self, key: &str, default: i64) -> i64 {
        self.0.get(key).and_then(Value::as_i64).unwrap_or(default)
    }
}

//==================================================================================
// Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::typed_slice_to_bytes;
    use serde_json::json;

    #[test]
    fn test_unknown_codec_id_is_unsupported() {
        let registry = CodecRegistry::builtin();
        assert!(matches!(
            registry.get("arithmetic"),
            Err(TszipError::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn test_zigzag_transform_and_roundtrip() {
        let registry = CodecRegistry::builtin();
        let codec = registry.get("zigzag").unwrap();
        assert_eq!(
            codec.transform_dtype(DType::Int32, &Value::Null).unwrap(),
            DType::UInt32
        );

        let original: Vec<i32> = vec![-1, 2, -3];
        let input = typed_slice_to_bytes(&original);

        let mut encoded = Vec::new();
        codec
            .encode(&input, &mut encoded, DType::Int32, &Value::Null)
            .unwrap();

        let mut decoded = Vec::new();
        codec
            .decode(&encoded, &mut decoded, DType::Int32, original.len(), &Value::Null)
            .unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_zigzag_rejects_unsigned() {
        let registry = CodecRegistry::builtin();
        let codec = registry.get("zigzag").unwrap();
        assert!(codec.transform_dtype(DType::UInt32, &Value::Null).is_err());
    }

    #[test]
    fn test_delta_param_dispatch() {
        let registry = CodecRegistry::builtin();
        let codec = registry.get("delta").unwrap();
        let params = json!({"order": 2});

        let original: Vec<u64> = vec![10, 20, 15, 28, 25];
        let input = typed_slice_to_bytes(&original);

        let mut encoded = Vec::new();
        codec
            .encode(&input, &mut encoded, DType::UInt64, &params)
            .unwrap();

        let mut decoded = Vec::new();
        codec
            .decode(&encoded, &mut decoded, DType::UInt64, original.len(), &params)
            .unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_bitcast_transform() {
        let registry = CodecRegistry::builtin();
        let codec = registry.get("bitcast").unwrap();
        assert_eq!(
            codec.transform_dtype(DType::Float64, &Value::Null).unwrap(),
            DType::UInt64
        );
        assert!(codec.transform_dtype(DType::Int32, &Value::Null).is_err());
    }

    #[test]
    fn test_substitute_registry() {
        // A registry without zstd reports chains using it as unsupported.
        let mut registry = CodecRegistry::empty();
        registry.register(Box::new(DeltaCodec));
        assert!(registry.contains("delta"));
        assert!(!registry.contains("zstd"));
    }
}
