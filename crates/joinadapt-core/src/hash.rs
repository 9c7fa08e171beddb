//! Join-key hashing and key equality.
//!
//! Both sides of a join hash their key columns through the same canonical
//! encoding, driven by the declared column types: integer widths share one
//! encoding, floats are widened to `f64` with NaN and `-0.0` canonicalised.
//! A row whose key contains a null is reported via `has_null` and never hashed.

use blake3::Hasher;

use crate::error::{Error, Result};
use crate::schema::DataType;
use crate::types::{Row, Scalar};

/// Hash context of one join side: column types plus the key column indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashContext {
    pub types: Vec<DataType>,
    pub key_cols: Vec<usize>,
}

impl HashContext {
    pub fn new(types: Vec<DataType>, key_cols: Vec<usize>) -> Self {
        Self { types, key_cols }
    }

    fn key_type(&self, col: usize) -> Result<DataType> {
        self.types.get(col).copied().ok_or_else(|| {
            Error::Schema(format!(
                "key column {} out of range for {} typed columns",
                col,
                self.types.len()
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHash {
    pub hash: u64,
    pub has_null: bool,
}

impl KeyHash {
    const NULL: KeyHash = KeyHash {
        hash: 0,
        has_null: true,
    };
}

/// Canonical form of one key value; equal canonical keys hash equally.
#[derive(Debug, PartialEq)]
enum CanonicalKey<'a> {
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(&'a str),
    Bin(&'a [u8]),
}

fn canonical_f64_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

fn canonicalize<'a>(value: &'a Scalar, data_type: DataType) -> Result<Option<CanonicalKey<'a>>> {
    let key = match (data_type, value) {
        (_, Scalar::Null) => return Ok(None),
        (DataType::Boolean, Scalar::Bool(b)) => CanonicalKey::Bool(*b),
        (DataType::Int32 | DataType::Int64, Scalar::I32(i)) => CanonicalKey::Int(*i as i64),
        (DataType::Int32 | DataType::Int64, Scalar::I64(i)) => CanonicalKey::Int(*i),
        (DataType::Float32 | DataType::Float64, Scalar::F32(f)) => {
            CanonicalKey::Float(canonical_f64_bits(*f as f64))
        }
        (DataType::Float32 | DataType::Float64, Scalar::F64(f)) => {
            CanonicalKey::Float(canonical_f64_bits(*f))
        }
        (DataType::Utf8, Scalar::Str(s)) => CanonicalKey::Str(s),
        (DataType::Binary, Scalar::Bin(b)) => CanonicalKey::Bin(b),
        (t, v) => {
            return Err(Error::Schema(format!(
                "key value {:?} does not match declared type {:?}",
                v, t
            )))
        }
    };
    Ok(Some(key))
}

fn write_key(key: &CanonicalKey<'_>, hasher: &mut Hasher) {
    match key {
        CanonicalKey::Bool(b) => {
            hasher.update(&[1, *b as u8]);
        }
        CanonicalKey::Int(i) => {
            hasher.update(&[2]);
            hasher.update(&i.to_le_bytes());
        }
        CanonicalKey::Float(bits) => {
            hasher.update(&[3]);
            hasher.update(&bits.to_le_bytes());
        }
        CanonicalKey::Str(s) => {
            hasher.update(&[4]);
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        CanonicalKey::Bin(b) => {
            hasher.update(&[5]);
            hasher.update(&(b.len() as u64).to_le_bytes());
            hasher.update(b);
        }
    }
}

/// Hash the key columns of `row`.
pub fn hash_row_keys(row: Row<'_>, ctx: &HashContext) -> Result<KeyHash> {
    let mut values = Vec::with_capacity(ctx.key_cols.len());
    for &col in &ctx.key_cols {
        let value = row
            .value(col)
            .ok_or_else(|| Error::Schema(format!("key column {} missing from row", col)))?;
        // A null key is excluded from the join and never hashed.
        if value.is_null() {
            return Ok(KeyHash::NULL);
        }
        values.push((value, col));
    }

    let mut hasher = Hasher::new();
    for (value, col) in values {
        match canonicalize(value, ctx.key_type(col)?)? {
            Some(key) => write_key(&key, &mut hasher),
            None => return Ok(KeyHash::NULL),
        }
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    Ok(KeyHash {
        hash: u64::from_le_bytes(head),
        has_null: false,
    })
}

/// Hash one value under its own type, with the key encoding used by
/// `hash_row_keys`. `None` for null.
pub fn hash_value(value: &Scalar) -> Option<u64> {
    let key = value
        .data_type()
        .and_then(|ty| canonicalize(value, ty).ok().flatten())?;
    let mut hasher = Hasher::new();
    write_key(&key, &mut hasher);
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    Some(u64::from_le_bytes(head))
}

/// Whether two non-null values are the same join key. `7i32 == 7i64` and
/// `0.0 == -0.0` hold here.
pub fn values_equal(a: &Scalar, b: &Scalar) -> bool {
    fn canon(v: &Scalar) -> Option<CanonicalKey<'_>> {
        v.data_type().and_then(|ty| canonicalize(v, ty).ok().flatten())
    }
    match (canon(a), canon(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Whether the join keys of `build` and `probe` are logically equal.
///
/// Nulls never compare equal.
pub fn keys_equal(
    build: Row<'_>,
    build_ctx: &HashContext,
    probe: Row<'_>,
    probe_ctx: &HashContext,
) -> Result<bool> {
    if build_ctx.key_cols.len() != probe_ctx.key_cols.len() {
        return Err(Error::Schema(format!(
            "build side has {} key columns but probe side has {}",
            build_ctx.key_cols.len(),
            probe_ctx.key_cols.len()
        )));
    }
    for (&bc, &pc) in build_ctx.key_cols.iter().zip(&probe_ctx.key_cols) {
        let (Some(bv), Some(pv)) = (build.value(bc), probe.value(pc)) else {
            return Ok(false);
        };
        let bk = canonicalize(bv, build_ctx.key_type(bc)?)?;
        let pk = canonicalize(pv, probe_ctx.key_type(pc)?)?;
        match (bk, pk) {
            (Some(a), Some(b)) if a == b => continue,
            _ => return Ok(false),
        }
    }
    Ok(true)
}

const FNV_OFFSET64: u64 = 14695981039346656037;
const FNV_PRIME64: u64 = 1099511628211;

/// FNV-1a over the big-endian bytes of `key`.
///
/// Xor-then-multiply, so the last byte still reaches the high bits used as
/// the bucket tag.
pub fn fnv64(key: u64) -> u64 {
    let mut hash = FNV_OFFSET64;
    for byte in key.to_be_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME64);
    }
    hash
}
