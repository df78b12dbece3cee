//! The compact binary cache (`spec.md` §4.H).
//!
//! Layout, little-endian throughout:
//!
//! ```text
//! [FileHeader]
//! [hash buckets]   bucket_count × u32 entry_index (0 = empty, else index+1)
//! [entries array]  entries_count × HashTableEntry
//! [data table]     (optionally deflate-compressed)
//! [strings table]  (optionally deflate-compressed)
//! ```
//!
//! Fixed-shape values (`nil`, `int`, `float`, `bool`, `string`, uniform
//! arrays of those, `Color`, `Coord`) get a native encoding in the data
//! table; every other value (nested/mixed arrays, `List`, `Tuple`, `Set`,
//! `Map`, `Path`, `Dyna`, unresolved `Reference`/`Env`) falls back to a
//! type-erased structured-JSON blob, which §4.H explicitly allows for
//! "unsupported value types."

use crate::structured;
use indexmap::IndexMap;
use memmap2::Mmap;
use rustc_hash::FxHasher;
use std::collections::HashMap;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::Write as _;
use std::path::Path;
use tracing::{debug, trace};
use yini_eval::{Color, Coord, Document, Section, Value};
use yini_util::{ErrorKind, PositionedError, Result};

const MAGIC: [u8; 4] = *b"YINI";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 48;
const ENTRY_SIZE: usize = 8 + 4 + 1 + 3 + 4 + 4; // key_hash, key_offset, value_type, pad, value_offset, next

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ValueTag {
    Nil = 0,
    Integer = 1,
    Float = 2,
    Bool = 3,
    Str = 4,
    ArrayInt = 5,
    ArrayFloat = 6,
    ArrayBool = 7,
    ArrayStr = 8,
    Color = 9,
    Coord = 10,
    Blob = 11,
}

impl ValueTag {
    fn from_u8(v: u8) -> Result<Self> {
        Ok(match v {
            0 => ValueTag::Nil,
            1 => ValueTag::Integer,
            2 => ValueTag::Float,
            3 => ValueTag::Bool,
            4 => ValueTag::Str,
            5 => ValueTag::ArrayInt,
            6 => ValueTag::ArrayFloat,
            7 => ValueTag::ArrayBool,
            8 => ValueTag::ArrayStr,
            9 => ValueTag::Color,
            10 => ValueTag::Coord,
            11 => ValueTag::Blob,
            other => return Err(corrupt(format!("unknown value type tag {other}"))),
        })
    }
}

fn corrupt(reason: impl Into<String>) -> PositionedError {
    PositionedError::without_position(ErrorKind::CorruptCache(reason.into()))
}

fn cannot_open_target(path: &Path, source: std::io::Error) -> PositionedError {
    PositionedError::without_position(ErrorKind::CannotOpenTarget(format!(
        "{}: {source}",
        path.display()
    )))
}

fn cannot_open_source(path: &Path, source: std::io::Error) -> PositionedError {
    PositionedError::without_position(ErrorKind::CannotOpenSource(format!(
        "{}: {source}",
        path.display()
    )))
}

#[derive(Clone, Copy, Debug)]
struct FileHeader {
    hash_offset: u32,
    hash_bucket_count: u32,
    entries_offset: u32,
    entries_count: u32,
    data_offset: u32,
    data_compressed_len: u32,
    data_raw_len: u32,
    strings_offset: u32,
    strings_compressed_len: u32,
    strings_raw_len: u32,
}

impl FileHeader {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.hash_offset.to_le_bytes());
        out.extend_from_slice(&self.hash_bucket_count.to_le_bytes());
        out.extend_from_slice(&self.entries_offset.to_le_bytes());
        out.extend_from_slice(&self.entries_count.to_le_bytes());
        out.extend_from_slice(&self.data_offset.to_le_bytes());
        out.extend_from_slice(&self.data_compressed_len.to_le_bytes());
        out.extend_from_slice(&self.data_raw_len.to_le_bytes());
        out.extend_from_slice(&self.strings_offset.to_le_bytes());
        out.extend_from_slice(&self.strings_compressed_len.to_le_bytes());
        out.extend_from_slice(&self.strings_raw_len.to_le_bytes());
    }

    fn read_from(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(corrupt("file shorter than a cache header"));
        }
        if bytes[0..4] != MAGIC {
            return Err(corrupt("bad magic, expected \"YINI\""));
        }
        let version = u32_at(bytes, 4)?;
        if version != VERSION {
            return Err(PositionedError::without_position(
                ErrorKind::UnsupportedCacheVersion(version),
            ));
        }
        Ok(Self {
            hash_offset: u32_at(bytes, 8)?,
            hash_bucket_count: u32_at(bytes, 12)?,
            entries_offset: u32_at(bytes, 16)?,
            entries_count: u32_at(bytes, 20)?,
            data_offset: u32_at(bytes, 24)?,
            data_compressed_len: u32_at(bytes, 28)?,
            data_raw_len: u32_at(bytes, 32)?,
            strings_offset: u32_at(bytes, 36)?,
            strings_compressed_len: u32_at(bytes, 40)?,
            strings_raw_len: u32_at(bytes, 44)?,
        })
    }
}

fn u32_at(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|s| u32::from_le_bytes(s.try_into().unwrap()))
        .ok_or_else(|| corrupt("header field out of file bounds"))
}

#[derive(Clone, Copy, Debug)]
struct HashTableEntryRaw {
    key_hash: u64,
    key_offset_in_strings: u32,
    value_type: u8,
    value_offset: u32,
    next_entry_index: u32,
}

impl HashTableEntryRaw {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.key_hash.to_le_bytes());
        out.extend_from_slice(&self.key_offset_in_strings.to_le_bytes());
        out.push(self.value_type);
        out.extend_from_slice(&[0u8; 3]);
        out.extend_from_slice(&self.value_offset.to_le_bytes());
        out.extend_from_slice(&self.next_entry_index.to_le_bytes());
    }

    fn read_from(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ENTRY_SIZE {
            return Err(corrupt("entry record out of file bounds"));
        }
        Ok(Self {
            key_hash: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            key_offset_in_strings: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            value_type: bytes[12],
            value_offset: u32::from_le_bytes(bytes[16..20].try_into().unwrap()),
            next_entry_index: u32::from_le_bytes(bytes[20..24].try_into().unwrap()),
        })
    }
}

fn hash_key(key: &str) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

struct StringsBuilder {
    buf: Vec<u8>,
    seen: HashMap<String, u32>,
}

impl StringsBuilder {
    fn new() -> Self {
        Self { buf: Vec::new(), seen: HashMap::new() }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&offset) = self.seen.get(s) {
            return offset;
        }
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self.seen.insert(s.to_string(), offset);
        offset
    }
}

fn read_cstr(strings: &[u8], offset: u32) -> Result<&str> {
    let start = offset as usize;
    let rest = strings
        .get(start..)
        .ok_or_else(|| corrupt("string offset out of bounds"))?;
    let end = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt("unterminated string in string pool"))?;
    std::str::from_utf8(&rest[..end]).map_err(|_| corrupt("string pool entry is not valid UTF-8"))
}

fn compress(raw: &[u8]) -> Vec<u8> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    if encoder.write_all(raw).is_ok() {
        if let Ok(compressed) = encoder.finish() {
            if compressed.len() < raw.len() {
                return compressed;
            }
        }
    }
    raw.to_vec()
}

fn decompress(bytes: &[u8], raw_len: u32, compressed_len: u32) -> Result<Vec<u8>> {
    if compressed_len == raw_len {
        return Ok(bytes.to_vec());
    }
    let mut decoder = flate2::read::DeflateDecoder::new(bytes);
    let mut out = Vec::with_capacity(raw_len as usize);
    std::io::Read::read_to_end(&mut decoder, &mut out)
        .map_err(|e| corrupt(format!("deflate decompression failed: {e}")))?;
    if out.len() as u32 != raw_len {
        return Err(corrupt("decompressed length does not match header"));
    }
    Ok(out)
}

fn align8(buf: &mut Vec<u8>) -> u32 {
    while buf.len() % 8 != 0 {
        buf.push(0);
    }
    buf.len() as u32
}

fn encode_value(value: &Value, data: &mut Vec<u8>, strings: &mut StringsBuilder) -> Result<(u8, u32)> {
    match value {
        Value::Nil => Ok((ValueTag::Nil as u8, 0)),
        Value::Integer(v) => {
            let offset = align8(data);
            data.extend_from_slice(&v.to_le_bytes());
            Ok((ValueTag::Integer as u8, offset))
        }
        Value::Float(v) => {
            let offset = align8(data);
            data.extend_from_slice(&v.to_le_bytes());
            Ok((ValueTag::Float as u8, offset))
        }
        Value::Bool(v) => {
            let offset = data.len() as u32;
            data.push(*v as u8);
            Ok((ValueTag::Bool as u8, offset))
        }
        Value::Str(s) => Ok((ValueTag::Str as u8, strings.intern(s))),
        Value::Array(items) if items.iter().all(|v| matches!(v, Value::Integer(_))) => {
            let offset = align8(data);
            data.extend_from_slice(&(items.len() as u32).to_le_bytes());
            data.extend_from_slice(&[0u8; 4]); // padding to keep elements 8-byte aligned
            for item in items {
                data.extend_from_slice(&item.as_i64().unwrap().to_le_bytes());
            }
            Ok((ValueTag::ArrayInt as u8, offset))
        }
        Value::Array(items) if items.iter().all(|v| matches!(v, Value::Float(_))) => {
            let offset = align8(data);
            data.extend_from_slice(&(items.len() as u32).to_le_bytes());
            data.extend_from_slice(&[0u8; 4]);
            for item in items {
                data.extend_from_slice(&item.as_f64().unwrap().to_le_bytes());
            }
            Ok((ValueTag::ArrayFloat as u8, offset))
        }
        Value::Array(items) if items.iter().all(|v| matches!(v, Value::Bool(_))) => {
            let offset = align8(data);
            data.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                data.push(matches!(item, Value::Bool(true)) as u8);
            }
            Ok((ValueTag::ArrayBool as u8, offset))
        }
        Value::Array(items) if items.iter().all(|v| matches!(v, Value::Str(_))) => {
            let offset = align8(data);
            data.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                let s = item.as_str().unwrap();
                let str_offset = strings.intern(s);
                data.extend_from_slice(&str_offset.to_le_bytes());
            }
            Ok((ValueTag::ArrayStr as u8, offset))
        }
        Value::Color(c) => {
            let offset = align8(data);
            data.push(c.r);
            data.push(c.g);
            data.push(c.b);
            data.push(c.a.is_some() as u8);
            data.push(c.a.unwrap_or(0));
            data.extend_from_slice(&[0u8; 3]);
            Ok((ValueTag::Color as u8, offset))
        }
        Value::Coord(c) => {
            let offset = align8(data);
            data.extend_from_slice(&c.x.to_le_bytes());
            data.extend_from_slice(&c.y.to_le_bytes());
            data.extend_from_slice(&c.z.to_le_bytes());
            data.push(c.is_3d as u8);
            data.extend_from_slice(&[0u8; 7]);
            Ok((ValueTag::Coord as u8, offset))
        }
        other => {
            let json = structured::to_structured(other);
            let bytes = serde_json::to_vec(&json)
                .map_err(|e| corrupt(format!("failed to encode fallback blob: {e}")))?;
            let offset = align8(data);
            data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            data.extend_from_slice(&bytes);
            Ok((ValueTag::Blob as u8, offset))
        }
    }
}

fn decode_value(tag: u8, offset: u32, data: &[u8], strings: &[u8]) -> Result<Value> {
    let at = offset as usize;
    let slice = |len: usize| -> Result<&[u8]> {
        data.get(at..at + len).ok_or_else(|| corrupt("data table read out of bounds"))
    };
    match ValueTag::from_u8(tag)? {
        ValueTag::Nil => Ok(Value::Nil),
        ValueTag::Integer => Ok(Value::Integer(i64::from_le_bytes(slice(8)?.try_into().unwrap()))),
        ValueTag::Float => Ok(Value::Float(f64::from_le_bytes(slice(8)?.try_into().unwrap()))),
        ValueTag::Bool => Ok(Value::Bool(slice(1)?[0] != 0)),
        ValueTag::Str => Ok(Value::Str(read_cstr(strings, offset)?.to_string())),
        ValueTag::ArrayInt => {
            let count = u32::from_le_bytes(slice(4)?.try_into().unwrap()) as usize;
            let body = data
                .get(at + 8..at + 8 + count * 8)
                .ok_or_else(|| corrupt("array body out of bounds"))?;
            Ok(Value::Array(
                body.chunks_exact(8)
                    .map(|c| Value::Integer(i64::from_le_bytes(c.try_into().unwrap())))
                    .collect(),
            ))
        }
        ValueTag::ArrayFloat => {
            let count = u32::from_le_bytes(slice(4)?.try_into().unwrap()) as usize;
            let body = data
                .get(at + 8..at + 8 + count * 8)
                .ok_or_else(|| corrupt("array body out of bounds"))?;
            Ok(Value::Array(
                body.chunks_exact(8)
                    .map(|c| Value::Float(f64::from_le_bytes(c.try_into().unwrap())))
                    .collect(),
            ))
        }
        ValueTag::ArrayBool => {
            let count = u32::from_le_bytes(slice(4)?.try_into().unwrap()) as usize;
            let body = data
                .get(at + 4..at + 4 + count)
                .ok_or_else(|| corrupt("array body out of bounds"))?;
            Ok(Value::Array(body.iter().map(|&b| Value::Bool(b != 0)).collect()))
        }
        ValueTag::ArrayStr => {
            let count = u32::from_le_bytes(slice(4)?.try_into().unwrap()) as usize;
            let body = data
                .get(at + 4..at + 4 + count * 4)
                .ok_or_else(|| corrupt("array body out of bounds"))?;
            let mut items = Vec::with_capacity(count);
            for chunk in body.chunks_exact(4) {
                let str_offset = u32::from_le_bytes(chunk.try_into().unwrap());
                items.push(Value::Str(read_cstr(strings, str_offset)?.to_string()));
            }
            Ok(Value::Array(items))
        }
        ValueTag::Color => {
            let bytes = slice(5)?;
            let (r, g, b, has_alpha, a) = (bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]);
            Ok(Value::Color(Color {
                r,
                g,
                b,
                a: if has_alpha != 0 { Some(a) } else { None },
            }))
        }
        ValueTag::Coord => {
            let bytes = slice(25)?;
            let x = f64::from_le_bytes(bytes[0..8].try_into().unwrap());
            let y = f64::from_le_bytes(bytes[8..16].try_into().unwrap());
            let z = f64::from_le_bytes(bytes[16..24].try_into().unwrap());
            let is_3d = bytes[24] != 0;
            Ok(Value::Coord(Coord { x, y, z, is_3d }))
        }
        ValueTag::Blob => {
            let len = u32::from_le_bytes(slice(4)?.try_into().unwrap()) as usize;
            let body = data
                .get(at + 4..at + 4 + len)
                .ok_or_else(|| corrupt("blob body out of bounds"))?;
            let json: serde_json::Value = serde_json::from_slice(body)
                .map_err(|e| corrupt(format!("malformed fallback blob JSON: {e}")))?;
            structured::from_structured(&json)
        }
    }
}

/// Encodes a document into the binary cache format described above.
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    let mut records: Vec<(String, Value)> = Vec::new();
    doc.with_sections(|sections| {
        for section in sections {
            records.push((section.name.clone(), Value::Nil));
            for (key, value) in &section.entries {
                records.push((format!("{}.{key}", section.name), value.clone()));
            }
        }
    });

    let mut strings = StringsBuilder::new();
    let mut data = Vec::new();
    let mut entries = Vec::with_capacity(records.len());

    for (key, value) in &records {
        let key_offset = strings.intern(key);
        let (value_type, value_offset) = encode_value(value, &mut data, &mut strings)?;
        entries.push(HashTableEntryRaw {
            key_hash: hash_key(key),
            key_offset_in_strings: key_offset,
            value_type,
            value_offset,
            next_entry_index: 0,
        });
    }

    let bucket_count = entries.len().max(1).next_power_of_two() as u32;
    let mut buckets = vec![0u32; bucket_count as usize];
    for (i, entry) in entries.iter_mut().enumerate() {
        let bucket = (entry.key_hash as usize) & (bucket_count as usize - 1);
        entry.next_entry_index = buckets[bucket];
        buckets[bucket] = (i as u32) + 1;
    }

    let strings_raw = strings.buf;
    let data_raw = data;
    let data_compressed = compress(&data_raw);
    let strings_compressed = compress(&strings_raw);

    let hash_offset = HEADER_SIZE as u32;
    let entries_offset = hash_offset + (bucket_count as usize * 4) as u32;
    let data_offset = entries_offset + (entries.len() * ENTRY_SIZE) as u32;
    let strings_offset = data_offset + data_compressed.len() as u32;

    let header = FileHeader {
        hash_offset,
        hash_bucket_count: bucket_count,
        entries_offset,
        entries_count: entries.len() as u32,
        data_offset,
        data_compressed_len: data_compressed.len() as u32,
        data_raw_len: data_raw.len() as u32,
        strings_offset,
        strings_compressed_len: strings_compressed.len() as u32,
        strings_raw_len: strings_raw.len() as u32,
    };

    let mut out = Vec::with_capacity(strings_offset as usize + strings_compressed.len());
    header.write_to(&mut out);
    for bucket in &buckets {
        out.extend_from_slice(&bucket.to_le_bytes());
    }
    for entry in &entries {
        entry.write_to(&mut out);
    }
    out.extend_from_slice(&data_compressed);
    out.extend_from_slice(&strings_compressed);
    debug!(
        entries = entries.len(),
        bytes = out.len(),
        data_raw_len = data_raw.len(),
        data_compressed_len = data_compressed.len(),
        "encoded binary cache"
    );
    Ok(out)
}

/// Decodes a cache image produced by [`encode`] back into a document.
/// Operates on an in-memory byte slice; [`load_binary`] is the
/// memory-mapped, file-backed entry point.
pub fn decode(bytes: &[u8]) -> Result<Document> {
    trace!(bytes = bytes.len(), "decoding binary cache");
    let header = FileHeader::read_from(bytes)?;
    let entries_region = bytes
        .get(header.entries_offset as usize..)
        .ok_or_else(|| corrupt("entries array out of file bounds"))?;

    let data_region = bytes
        .get(header.data_offset as usize..(header.data_offset as usize + header.data_compressed_len as usize))
        .ok_or_else(|| corrupt("data table out of file bounds"))?;
    let strings_region = bytes
        .get(
            header.strings_offset as usize
                ..(header.strings_offset as usize + header.strings_compressed_len as usize),
        )
        .ok_or_else(|| corrupt("strings table out of file bounds"))?;

    let data = decompress(data_region, header.data_raw_len, header.data_compressed_len)?;
    let strings = decompress(strings_region, header.strings_raw_len, header.strings_compressed_len)?;

    let mut sections: IndexMap<String, Section> = IndexMap::new();
    for i in 0..header.entries_count as usize {
        let start = i * ENTRY_SIZE;
        let record = entries_region
            .get(start..)
            .ok_or_else(|| corrupt("entry record out of file bounds"))?;
        let raw = HashTableEntryRaw::read_from(record)?;
        let key = read_cstr(&strings, raw.key_offset_in_strings)?;

        match key.split_once('.') {
            None => {
                sections.entry(key.to_string()).or_insert_with(|| Section::new(key));
            }
            Some((section_name, field)) => {
                let value = decode_value(raw.value_type, raw.value_offset, &data, &strings)?;
                sections
                    .entry(section_name.to_string())
                    .or_insert_with(|| Section::new(section_name))
                    .entries
                    .insert(field.to_string(), value);
            }
        }
    }

    let section_count = sections.len();
    let doc = Document::new();
    for (_, section) in sections {
        doc.push_section(section);
    }
    debug!(section_count, "decoded binary cache");
    Ok(doc)
}

/// Writes `doc` to `path` in the binary cache format.
pub fn save_binary(doc: &Document, path: &Path) -> Result<()> {
    let bytes = encode(doc)?;
    debug!(path = %path.display(), bytes = bytes.len(), "writing binary cache");
    std::fs::write(path, bytes).map_err(|e| cannot_open_target(path, e))
}

/// Memory-maps `path` and decodes it into a document. The mapping is
/// dropped once decoding completes; callers needing true zero-copy,
/// point-query access should use [`CacheReader`] instead.
pub fn load_binary(path: &Path) -> Result<Document> {
    trace!(path = %path.display(), "memory-mapping binary cache");
    let file = File::open(path).map_err(|e| cannot_open_source(path, e))?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| cannot_open_source(path, e))?;
    decode(&mmap)
}

/// A memory-mapped cache held open for repeated `O(1)` key lookups via the
/// on-disk hash table, without decoding the whole document up front.
pub struct CacheReader {
    mmap: Mmap,
    header: FileHeader,
    data: Vec<u8>,
    strings: Vec<u8>,
}

impl CacheReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| cannot_open_source(path, e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| cannot_open_source(path, e))?;
        let header = FileHeader::read_from(&mmap)?;
        let data_region = mmap
            .get(header.data_offset as usize..(header.data_offset as usize + header.data_compressed_len as usize))
            .ok_or_else(|| corrupt("data table out of file bounds"))?;
        let strings_region = mmap
            .get(
                header.strings_offset as usize
                    ..(header.strings_offset as usize + header.strings_compressed_len as usize),
            )
            .ok_or_else(|| corrupt("strings table out of file bounds"))?;
        let data = decompress(data_region, header.data_raw_len, header.data_compressed_len)?;
        let strings = decompress(strings_region, header.strings_raw_len, header.strings_compressed_len)?;
        trace!(path = %path.display(), entries = header.entries_count, "opened cache reader");
        Ok(Self { mmap, header, data, strings })
    }

    /// Looks up `"section.key"` via the on-disk hash table with open
    /// chaining, validating every offset against the mapped file's bounds.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let hash = hash_key(key);
        let bucket_count = self.header.hash_bucket_count as usize;
        if bucket_count == 0 {
            return Ok(None);
        }
        let bucket_index = (hash as usize) & (bucket_count - 1);
        let bucket_offset = self.header.hash_offset as usize + bucket_index * 4;
        let mut cursor = u32::from_le_bytes(
            self.mmap
                .get(bucket_offset..bucket_offset + 4)
                .ok_or_else(|| corrupt("hash bucket out of file bounds"))?
                .try_into()
                .unwrap(),
        );

        while cursor != 0 {
            let entry_index = (cursor - 1) as usize;
            if entry_index as u32 >= self.header.entries_count {
                return Err(corrupt("hash chain entry index out of bounds"));
            }
            let start = self.header.entries_offset as usize + entry_index * ENTRY_SIZE;
            let record = self
                .mmap
                .get(start..)
                .ok_or_else(|| corrupt("entry record out of file bounds"))?;
            let entry = HashTableEntryRaw::read_from(record)?;
            if entry.key_hash == hash {
                let candidate = read_cstr(&self.strings, entry.key_offset_in_strings)?;
                if candidate == key {
                    return Ok(Some(decode_value(
                        entry.value_type,
                        entry.value_offset,
                        &self.data,
                        &self.strings,
                    )?));
                }
            }
            cursor = entry.next_entry_index;
        }
        Ok(None)
    }

    pub fn to_document(&self) -> Result<Document> {
        decode(&self.mmap)
    }
}
