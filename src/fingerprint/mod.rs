//! Content fingerprints for heap records
//!
//! A fingerprint is the multiset key that makes two records with identical
//! content collide. Payloads of eight bytes or fewer are keyed by their
//! exact big-endian value; anything larger is keyed by a 64-bit content
//! hash, and hash collisions are accepted rather than re-verified against
//! the full payload. Every fingerprint also keeps enough of the original
//! bytes to render a human-readable preview in reports.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::AnalysisError;

/// Bytes of payload retained for report previews.
pub const PREVIEW_BYTES: usize = 32;

/// 64-bit content hash: the first eight bytes of the blake3 digest.
pub fn content_hash(bytes: &[u8]) -> u64 {
    let digest = blake3::hash(bytes);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_be_bytes(prefix)
}

/// Big-endian value of the first (up to eight) payload bytes.
pub fn prefix_value(bytes: &[u8]) -> u64 {
    let mut value = 0u64;
    for &b in bytes.iter().take(8) {
        value = (value << 8) | u64::from(b);
    }
    value
}

/// True when every payload byte is zero.
pub fn is_all_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}

/// Bytes one element occupies for a primitive component type.
///
/// Unknown component names are treated as references, which the dump
/// format stores as 4-byte values.
pub fn unit_size(component: &str) -> usize {
    match component {
        "boolean" | "byte" => 1,
        "short" | "char" => 2,
        "int" | "float" => 4,
        "long" | "double" => 8,
        _ => 4,
    }
}

/// Value widths a scalar wrapper class can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// 1-byte truth value, decoded like a byte.
    Boolean,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 16-bit unsigned code unit.
    Char,
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Double,
}

impl ScalarKind {
    /// Payload bytes the wrapper's value field occupies.
    pub fn width(self) -> usize {
        match self {
            ScalarKind::Boolean | ScalarKind::Byte => 1,
            ScalarKind::Short | ScalarKind::Char => 2,
            ScalarKind::Int | ScalarKind::Float => 4,
            ScalarKind::Long | ScalarKind::Double => 8,
        }
    }

    /// Whether a bounded value cache is worth projecting for this kind.
    /// Booleans and bytes have so few distinct values that the runtime
    /// caches them outright.
    pub fn cache_candidate(self) -> bool {
        !matches!(self, ScalarKind::Boolean | ScalarKind::Byte)
    }

    /// Decode the wrapper's value from the start of an instance payload,
    /// big-endian.
    pub fn decode(self, bytes: &[u8]) -> Result<ScalarValue, AnalysisError> {
        let width = self.width();
        if bytes.len() < width {
            return Err(AnalysisError::ScalarWidth {
                expected: width,
                actual: bytes.len(),
            });
        }
        let raw = prefix_value(&bytes[..width]);
        Ok(match self {
            ScalarKind::Boolean | ScalarKind::Byte => ScalarValue::Byte(raw as u8 as i8),
            ScalarKind::Short => ScalarValue::Short(raw as u16 as i16),
            ScalarKind::Char => ScalarValue::Char(raw as u16),
            ScalarKind::Int => ScalarValue::Int(raw as u32 as i32),
            ScalarKind::Float => ScalarValue::Float(raw as u32),
            ScalarKind::Long => ScalarValue::Long(raw as i64),
            ScalarKind::Double => ScalarValue::Double(raw),
        })
    }
}

/// Exact-value fingerprint for payloads of eight bytes or fewer.
///
/// Equality and hashing are bit-exact; no two distinct values ever share a
/// key. Floats are carried as their raw bits so the type stays `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarValue {
    /// Byte or boolean wrapper value.
    Byte(i8),
    /// Short wrapper value.
    Short(i16),
    /// Character wrapper code unit.
    Char(u16),
    /// Int wrapper value.
    Int(i32),
    /// Float wrapper value, as raw bits.
    Float(u32),
    /// Long wrapper value.
    Long(i64),
    /// Double wrapper value, as raw bits.
    Double(u64),
}

impl ScalarValue {
    /// Numeric value as a 64-bit integer, used for range checks and
    /// value-order sorting. Floats truncate toward zero.
    pub fn long_value(self) -> i64 {
        match self {
            ScalarValue::Byte(v) => i64::from(v),
            ScalarValue::Short(v) => i64::from(v),
            ScalarValue::Char(v) => i64::from(v),
            ScalarValue::Int(v) => i64::from(v),
            ScalarValue::Float(bits) => f32::from_bits(bits) as i64,
            ScalarValue::Long(v) => v,
            ScalarValue::Double(bits) => f64::from_bits(bits) as i64,
        }
    }

    /// Raw bit pattern, the secondary sort key that keeps count-order
    /// sorts deterministic for values with equal `long_value`.
    pub fn raw_bits(self) -> u64 {
        match self {
            ScalarValue::Byte(v) => v as u8 as u64,
            ScalarValue::Short(v) => v as u16 as u64,
            ScalarValue::Char(v) => u64::from(v),
            ScalarValue::Int(v) => v as u32 as u64,
            ScalarValue::Float(bits) => u64::from(bits),
            ScalarValue::Long(v) => v as u64,
            ScalarValue::Double(bits) => bits,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ScalarValue::Byte(v) => write!(f, "{v}"),
            ScalarValue::Short(v) => write!(f, "{v}"),
            ScalarValue::Char(v) => write!(f, "{v}"),
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::Float(bits) => write!(f, "{}", f32::from_bits(bits)),
            ScalarValue::Long(v) => write!(f, "{v}"),
            ScalarValue::Double(bits) => write!(f, "{}", f64::from_bits(bits)),
        }
    }
}

/// Fingerprint of an instance payload.
///
/// Payloads of eight bytes or fewer are keyed by their literal value,
/// larger ones by content hash. The all-zero flag distinguishes the
/// overwhelmingly common "freshly zeroed object" case in previews.
#[derive(Debug, Clone)]
pub struct BlockFingerprint {
    contents: u64,
    is_hash: bool,
    all_zero: bool,
    literal_len: u8,
}

impl BlockFingerprint {
    /// Fingerprint an instance payload.
    pub fn new(bytes: &[u8]) -> Self {
        if bytes.len() <= 8 {
            Self {
                contents: prefix_value(bytes),
                is_hash: false,
                all_zero: is_all_zero(bytes),
                literal_len: bytes.len() as u8,
            }
        } else {
            Self {
                contents: content_hash(bytes),
                is_hash: true,
                all_zero: is_all_zero(bytes),
                literal_len: 0,
            }
        }
    }

    /// Human-readable preview of the payload.
    pub fn value(&self) -> String {
        if self.is_hash {
            if self.all_zero {
                return "{ 0 }".to_string();
            }
            return format!("(hash: {:x})", self.contents);
        }
        if self.literal_len == 0 {
            return "{ }".to_string();
        }
        if self.literal_len == 8 {
            // Full-width payloads read naturally as signed.
            format!("{{ {} }}", self.contents as i64)
        } else {
            format!("{{ {} }}", self.contents)
        }
    }

    /// Total order used as a tie-break in count-sorted reports.
    pub fn order_key(&self) -> (bool, u64, u8) {
        (self.is_hash, self.contents, self.literal_len)
    }
}

impl PartialEq for BlockFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.contents == other.contents && self.is_hash == other.is_hash
    }
}

impl Eq for BlockFingerprint {}

impl Hash for BlockFingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.contents);
        state.write_u8(self.is_hash as u8);
    }
}

/// Fingerprint of a primitive-array payload.
///
/// The key is (element count, component type, content value-or-hash); the
/// retained preview bytes and zero flag only affect rendering.
#[derive(Debug, Clone)]
pub struct ArrayFingerprint {
    length: u32,
    component: Box<str>,
    contents: u64,
    is_hash: bool,
    all_zero: bool,
    preview: Box<[u8]>,
}

impl ArrayFingerprint {
    /// Fingerprint an array payload of `length` elements.
    pub fn new(length: u32, component: &str, bytes: &[u8]) -> Self {
        let (contents, is_hash) = if bytes.len() <= 8 {
            (prefix_value(bytes), false)
        } else {
            (content_hash(bytes), true)
        };
        let keep = bytes.len().min(PREVIEW_BYTES);
        Self {
            length,
            component: component.into(),
            contents,
            is_hash,
            all_zero: is_all_zero(bytes),
            preview: bytes[..keep].into(),
        }
    }

    /// Declared element count.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Component type name.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Human-readable preview of the array contents.
    pub fn value(&self) -> String {
        if self.is_hash && self.all_zero {
            return "{ 0, ..., 0 }".to_string();
        }
        let elements = render_elements(&self.preview, unit_size(&self.component));
        let truncated = self.preview.len() < self.length as usize * unit_size(&self.component);
        let body = if truncated {
            format!("{{ {elements}, ... }}")
        } else if elements.is_empty() {
            "{ }".to_string()
        } else {
            format!("{{ {elements} }}")
        };
        if self.is_hash {
            format!("{body} (hash: {:x})", self.contents)
        } else {
            body
        }
    }

    /// Total order used as a tie-break in count-sorted reports.
    pub fn order_key(&self) -> (u32, &str, u64) {
        (self.length, &self.component, self.contents)
    }
}

impl PartialEq for ArrayFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
            && self.contents == other.contents
            && self.is_hash == other.is_hash
            && self.component == other.component
    }
}

impl Eq for ArrayFingerprint {}

impl Hash for ArrayFingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.length);
        state.write_u64(self.contents);
        state.write_u8(self.is_hash as u8);
        self.component.hash(state);
    }
}

/// Fingerprint of a string-backing array, previewed as text.
///
/// Always content-hashed; the key is (element count, component type, hash).
/// The preview decodes as Latin-1 for `byte` components and UTF-16BE for
/// `char` components.
#[derive(Debug, Clone)]
pub struct StringFingerprint {
    length: u32,
    component: Box<str>,
    hash: u64,
    preview: Box<[u8]>,
    truncated: bool,
    wrapper_refs: u32,
}

impl StringFingerprint {
    /// Fingerprint a string-backing array of `length` elements that
    /// `wrapper_refs` wrapper objects point at.
    pub fn new(length: u32, component: &str, bytes: &[u8], wrapper_refs: u32) -> Self {
        let keep = bytes.len().min(PREVIEW_BYTES);
        Self {
            length,
            component: component.into(),
            hash: content_hash(bytes),
            preview: bytes[..keep].into(),
            truncated: bytes.len() > PREVIEW_BYTES,
            wrapper_refs,
        }
    }

    /// Declared element count.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Component type name.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Number of wrapper objects that referenced this array when the
    /// fingerprint was first built.
    pub fn wrapper_refs(&self) -> u32 {
        self.wrapper_refs
    }

    /// Whether the preview holds less than the full payload.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Decoded text preview of the retained prefix.
    pub fn text(&self) -> String {
        match &*self.component {
            // Latin-1: each byte is its own code point.
            "byte" => self.preview.iter().map(|&b| char::from(b)).collect(),
            "char" => {
                let units: Vec<u16> = self
                    .preview
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            _ => "N/A".to_string(),
        }
    }

    /// Total order used as a tie-break in count-sorted reports.
    pub fn order_key(&self) -> (u32, &str, u64) {
        (self.length, &self.component, self.hash)
    }
}

impl PartialEq for StringFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.hash == other.hash && self.component == other.component
    }
}

impl Eq for StringFingerprint {}

impl Hash for StringFingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.length);
        state.write_u64(self.hash);
        self.component.hash(state);
    }
}

fn render_elements(bytes: &[u8], unit: usize) -> String {
    let mut parts = Vec::new();
    match unit {
        1 => {
            for &b in bytes {
                parts.push(b.to_string());
            }
        }
        2 => {
            for pair in bytes.chunks_exact(2) {
                parts.push(u16::from_be_bytes([pair[0], pair[1]]).to_string());
            }
        }
        8 => {
            for chunk in bytes.chunks_exact(8) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                parts.push(i64::from_be_bytes(raw).to_string());
            }
        }
        _ => {
            for chunk in bytes.chunks_exact(4) {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(chunk);
                parts.push(u32::from_be_bytes(raw).to_string());
            }
        }
    }
    parts.join(", ")
}
