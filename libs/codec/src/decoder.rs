//! # TypeDecoder - Bounds-Checked Wire Type Cursor
//!
//! ## Purpose
//!
//! Cursor over an immutable byte buffer that extracts the CQL primitive and
//! composite notations (`[short]`, `[string]`, `[bytes]`, `[option]`, query
//! parameters, result metadata...). Input comes straight from a packet capture,
//! so every length and count is untrusted.
//!
//! ## Guarantees
//!
//! - No extraction reads past the end of the buffer.
//! - A successful extraction advances the cursor by exactly the bytes of the
//!   field, regardless of what follows it.
//! - A failed extraction leaves the cursor where it was, including composite
//!   extractions that fail halfway through (no partial consumption).
//! - Negative lengths on `[long string]` and `[bytes]` are the null convention:
//!   an empty value and a success, consuming only the length header.

use crate::error::{DecodeError, DecodeResult};
use crate::types::{
    metadata_flags, query_flags, ColSpec, DataType, QueryParameters, ResultMetadata, TypeOption,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tracing::trace;
use uuid::Uuid;

/// Nested `[option]` depth beyond which a column type is treated as malformed
pub const MAX_OPTION_DEPTH: usize = 32;

const UUID_SIZE: usize = 16;

/// Bounds-checked cursor over a borrowed byte buffer
#[derive(Debug, Clone)]
pub struct TypeDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TypeDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Unconsumed tail of the buffer
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// True once every byte of the buffer has been consumed
    pub fn eof(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Run a multi-field extraction, restoring the cursor if any step fails
    fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<T> {
        let start = self.pos;
        let result = f(self);
        if let Err(e) = &result {
            trace!(offset = start, error = %e, "Rolled back partial extraction");
            self.pos = start;
        }
        result
    }

    fn take(&mut self, len: usize, context: &'static str) -> DecodeResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(DecodeError::insufficient_data(len, self.remaining(), context));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, context: &'static str) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, context)?);
        Ok(out)
    }

    //------------------------
    // Primitives
    //------------------------

    pub fn extract_byte(&mut self) -> DecodeResult<u8> {
        Ok(self.take_array::<1>("byte")?[0])
    }

    pub fn extract_short(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.take_array("short")?))
    }

    pub fn extract_int(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.take_array("int")?))
    }

    pub fn extract_long(&mut self) -> DecodeResult<i64> {
        Ok(i64::from_be_bytes(self.take_array("long")?))
    }

    //------------------------
    // Length-prefixed values
    //------------------------

    pub fn extract_string(&mut self) -> DecodeResult<String> {
        self.atomically(|d| {
            let len = d.extract_short()? as usize;
            let body = d.take(len, "string body")?;
            Ok(String::from_utf8_lossy(body).into_owned())
        })
    }

    pub fn extract_long_string(&mut self) -> DecodeResult<String> {
        self.atomically(|d| {
            let len = d.extract_int()?;
            if len < 0 {
                return Ok(String::new());
            }
            let body = d.take(len as usize, "long string body")?;
            Ok(String::from_utf8_lossy(body).into_owned())
        })
    }

    /// Fails as a whole, without consuming anything, if any element fails
    pub fn extract_string_list(&mut self) -> DecodeResult<Vec<String>> {
        self.atomically(|d| {
            let count = d.extract_short()? as usize;
            // Each element needs at least its 2-byte length header.
            let mut list = Vec::with_capacity(count.min(d.remaining() / 2));
            for _ in 0..count {
                list.push(d.extract_string()?);
            }
            Ok(list)
        })
    }

    pub fn extract_bytes(&mut self) -> DecodeResult<Vec<u8>> {
        self.atomically(|d| {
            let len = d.extract_int()?;
            if len < 0 {
                return Ok(Vec::new());
            }
            Ok(d.take(len as usize, "bytes body")?.to_vec())
        })
    }

    pub fn extract_short_bytes(&mut self) -> DecodeResult<Vec<u8>> {
        self.atomically(|d| {
            let len = d.extract_short()? as usize;
            Ok(d.take(len, "short bytes body")?.to_vec())
        })
    }

    pub fn extract_string_map(&mut self) -> DecodeResult<HashMap<String, String>> {
        self.atomically(|d| {
            let count = d.extract_short()? as usize;
            let mut map = HashMap::with_capacity(count.min(d.remaining() / 4));
            for _ in 0..count {
                let key = d.extract_string()?;
                let value = d.extract_string()?;
                map.insert(key, value);
            }
            Ok(map)
        })
    }

    pub fn extract_string_multi_map(&mut self) -> DecodeResult<HashMap<String, Vec<String>>> {
        self.atomically(|d| {
            let count = d.extract_short()? as usize;
            let mut map = HashMap::with_capacity(count.min(d.remaining() / 4));
            for _ in 0..count {
                let key = d.extract_string()?;
                let values = d.extract_string_list()?;
                map.insert(key, values);
            }
            Ok(map)
        })
    }

    //------------------------
    // Fixed-size values
    //------------------------

    pub fn extract_uuid(&mut self) -> DecodeResult<Uuid> {
        let bytes = self.take_array::<UUID_SIZE>("uuid")?;
        Ok(Uuid::from_bytes(bytes))
    }

    /// `[inet]`: address size byte, 4 or 16 address bytes, then an int port
    pub fn extract_inet(&mut self) -> DecodeResult<SocketAddr> {
        self.atomically(|d| {
            let size_offset = d.pos;
            let size = d.extract_byte()?;
            let ip = match size {
                4 => IpAddr::V4(Ipv4Addr::from(d.take_array::<4>("inet v4 address")?)),
                16 => IpAddr::V6(Ipv6Addr::from(d.take_array::<16>("inet v6 address")?)),
                other => {
                    return Err(DecodeError::malformed(
                        size_offset,
                        format!("inet address size {other}, expected 4 or 16"),
                    ))
                }
            };
            let port_offset = d.pos;
            let port = d.extract_int()?;
            let port = u16::try_from(port).map_err(|_| {
                DecodeError::malformed(port_offset, format!("inet port {port} out of range"))
            })?;
            Ok(SocketAddr::new(ip, port))
        })
    }

    //------------------------
    // Composites
    //------------------------

    /// `[option]`, including the nested options of collection, tuple and UDT types
    pub fn extract_option(&mut self) -> DecodeResult<TypeOption> {
        self.atomically(|d| d.extract_option_at_depth(0))
    }

    fn extract_option_at_depth(&mut self, depth: usize) -> DecodeResult<TypeOption> {
        if depth > MAX_OPTION_DEPTH {
            return Err(DecodeError::malformed(
                self.pos,
                format!("option nesting deeper than {MAX_OPTION_DEPTH}"),
            ));
        }

        let code_offset = self.pos;
        let code = self.extract_short()?;
        let data_type = DataType::try_from(code).map_err(|_| {
            DecodeError::malformed(code_offset, format!("unknown option type {code:#06x}"))
        })?;

        let mut option = TypeOption::simple(data_type);
        match data_type {
            DataType::Custom => {
                option.value = self.extract_string()?;
            }
            DataType::List | DataType::Set => {
                option.params.push(self.extract_option_at_depth(depth + 1)?);
            }
            DataType::Map => {
                option.params.push(self.extract_option_at_depth(depth + 1)?);
                option.params.push(self.extract_option_at_depth(depth + 1)?);
            }
            DataType::Udt => {
                let keyspace = self.extract_string()?;
                let name = self.extract_string()?;
                option.value = format!("{keyspace}.{name}");
                let fields = self.extract_short()?;
                for _ in 0..fields {
                    option.field_names.push(self.extract_string()?);
                    option.params.push(self.extract_option_at_depth(depth + 1)?);
                }
            }
            DataType::Tuple => {
                let count = self.extract_short()?;
                for _ in 0..count {
                    option.params.push(self.extract_option_at_depth(depth + 1)?);
                }
            }
            _ => {}
        }
        Ok(option)
    }

    pub fn extract_query_parameters(&mut self) -> DecodeResult<QueryParameters> {
        self.atomically(|d| {
            let mut qp = QueryParameters {
                consistency: d.extract_short()?,
                flags: d.extract_byte()?,
                ..Default::default()
            };

            if qp.flags & query_flags::VALUES != 0 {
                let count = d.extract_short()?;
                let with_names = qp.flags & query_flags::WITH_NAMES_FOR_VALUES != 0;
                for _ in 0..count {
                    if with_names {
                        qp.names.push(d.extract_string()?);
                    }
                    qp.values.push(d.extract_bytes()?);
                }
            }
            if qp.flags & query_flags::PAGE_SIZE != 0 {
                qp.page_size = d.extract_int()?;
            }
            if qp.flags & query_flags::WITH_PAGING_STATE != 0 {
                qp.paging_state = d.extract_bytes()?;
            }
            if qp.flags & query_flags::WITH_SERIAL_CONSISTENCY != 0 {
                qp.serial_consistency = d.extract_short()?;
            }
            if qp.flags & query_flags::WITH_DEFAULT_TIMESTAMP != 0 {
                qp.timestamp = d.extract_long()?;
            }
            Ok(qp)
        })
    }

    pub fn extract_result_metadata(&mut self) -> DecodeResult<ResultMetadata> {
        self.atomically(|d| {
            let mut md = ResultMetadata {
                flags: d.extract_int()?,
                ..Default::default()
            };

            let count_offset = d.pos;
            md.columns_count = d.extract_int()?;
            if md.columns_count < 0 {
                return Err(DecodeError::malformed(
                    count_offset,
                    format!("negative column count {}", md.columns_count),
                ));
            }

            if md.flags & metadata_flags::HAS_MORE_PAGES != 0 {
                md.paging_state = d.extract_bytes()?;
            }
            if md.flags & metadata_flags::NO_METADATA != 0 {
                return Ok(md);
            }

            let global = md.has_global_table_spec();
            if global {
                md.gts_keyspace_name = d.extract_string()?;
                md.gts_table_name = d.extract_string()?;
            }

            // A column spec is at least a name header and a type code.
            let count = md.columns_count as usize;
            md.col_specs = Vec::with_capacity(count.min(d.remaining() / 4));
            for _ in 0..count {
                let (ks_name, table_name) = if global {
                    (String::new(), String::new())
                } else {
                    (d.extract_string()?, d.extract_string()?)
                };
                md.col_specs.push(ColSpec {
                    ks_name,
                    table_name,
                    name: d.extract_string()?,
                    col_type: d.extract_option_at_depth(0)?,
                });
            }
            Ok(md)
        })
    }
}
