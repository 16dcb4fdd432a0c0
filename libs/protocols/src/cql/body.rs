//! Rendering of CQL request and response bodies
//!
//! Bodies are decoded with [`TypeDecoder`] and rendered to text for export.
//! Row contents are not decoded; ROWS results report their columns and row
//! count. Auth tokens are reported by size only.

use super::frame::{flags, Frame, Opcode};
use super::types::PreparedCache;
use std::collections::BTreeMap;
use wiretap_codec::{
    metadata_flags, DecodeError, DecodeResult, QueryParameters, ResultMetadata, TypeDecoder,
};

mod result_kind {
    pub const VOID: i32 = 0x0001;
    pub const ROWS: i32 = 0x0002;
    pub const SET_KEYSPACE: i32 = 0x0003;
    pub const PREPARED: i32 = 0x0004;
    pub const SCHEMA_CHANGE: i32 = 0x0005;
}

mod batch_kind {
    pub const QUERY: u8 = 0;
    pub const PREPARED: u8 = 1;
}

const COMPRESSED_BODY: &str = "<compressed body>";

/// A rendered response, plus the statement id when it answers a PREPARE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResponse {
    pub msg: String,
    pub prepared_id: Option<Vec<u8>>,
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Skip the custom payload map that precedes a body when flagged
fn skip_custom_payload(decoder: &mut TypeDecoder<'_>) -> DecodeResult<()> {
    let count = decoder.extract_short()?;
    for _ in 0..count {
        decoder.extract_string()?;
        decoder.extract_bytes()?;
    }
    Ok(())
}

fn render_params(query: &str, params: &QueryParameters) -> String {
    if params.values.is_empty() {
        return query.to_string();
    }
    let values: Vec<String> = params
        .values
        .iter()
        .enumerate()
        .map(|(i, value)| match params.names.get(i) {
            Some(name) => format!("{name}=0x{}", hex::encode(value)),
            None => format!("0x{}", hex::encode(value)),
        })
        .collect();
    format!("{query}\nparams: [{}]", values.join(", "))
}

fn render_columns(md: &ResultMetadata) -> String {
    let columns: Vec<String> = md
        .col_specs
        .iter()
        .map(|col| format!("{} {}", col.name, col.col_type))
        .collect();
    columns.join(", ")
}

fn render_batch(decoder: &mut TypeDecoder<'_>, prepared: &PreparedCache) -> DecodeResult<String> {
    let batch_type = decoder.extract_byte()?;
    let count = decoder.extract_short()?;
    let mut statements = Vec::with_capacity(usize::from(count).min(decoder.remaining()));
    for _ in 0..count {
        let kind_offset = decoder.position();
        let statement = match decoder.extract_byte()? {
            batch_kind::QUERY => decoder.extract_long_string()?,
            batch_kind::PREPARED => {
                let id = decoder.extract_short_bytes()?;
                prepared
                    .get(&id)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("<prepared 0x{}>", hex::encode(&id)))
            }
            other => {
                return Err(DecodeError::malformed(
                    kind_offset,
                    format!("unknown batch statement kind {other}"),
                ))
            }
        };
        let values = decoder.extract_short()?;
        for _ in 0..values {
            decoder.extract_bytes()?;
        }
        statements.push(statement);
    }
    Ok(format!("BATCH type={batch_type} [{}]", statements.join("; ")))
}

pub fn decode_request_body(frame: &Frame, prepared: &PreparedCache) -> DecodeResult<String> {
    if frame.hdr.is_compressed() {
        return Ok(COMPRESSED_BODY.to_string());
    }

    let mut decoder = TypeDecoder::new(&frame.msg);
    if frame.hdr.flags & flags::CUSTOM_PAYLOAD != 0 {
        skip_custom_payload(&mut decoder)?;
    }

    match frame.hdr.opcode {
        Opcode::Startup => {
            let options: BTreeMap<_, _> = decoder.extract_string_map()?.into_iter().collect();
            Ok(to_json(&options))
        }
        Opcode::Options => Ok(String::new()),
        Opcode::Query => {
            let query = decoder.extract_long_string()?;
            let params = decoder.extract_query_parameters()?;
            Ok(render_params(&query, &params))
        }
        Opcode::Prepare => decoder.extract_long_string(),
        Opcode::Execute => {
            let id = decoder.extract_short_bytes()?;
            let params = decoder.extract_query_parameters()?;
            let query = prepared
                .get(&id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("<prepared 0x{}>", hex::encode(&id)));
            Ok(render_params(&query, &params))
        }
        Opcode::Register => Ok(to_json(&decoder.extract_string_list()?)),
        Opcode::Batch => render_batch(&mut decoder, prepared),
        Opcode::AuthResponse => {
            let token = decoder.extract_bytes()?;
            Ok(format!("<auth token, {} bytes>", token.len()))
        }
        other => Err(DecodeError::malformed(
            0,
            format!("{other:?} is not a request opcode"),
        )),
    }
}

fn render_schema_change(decoder: &mut TypeDecoder<'_>) -> DecodeResult<String> {
    let change_type = decoder.extract_string()?;
    let target = decoder.extract_string()?;
    let keyspace = decoder.extract_string()?;
    let detail = match target.as_str() {
        "KEYSPACE" => String::new(),
        "TABLE" | "TYPE" => format!(".{}", decoder.extract_string()?),
        "FUNCTION" | "AGGREGATE" => {
            let name = decoder.extract_string()?;
            let args = decoder.extract_string_list()?;
            format!(".{name}({})", args.join(", "))
        }
        other => {
            return Err(DecodeError::malformed(
                decoder.position(),
                format!("unknown schema change target {other}"),
            ))
        }
    };
    Ok(format!("{change_type} {target} {keyspace}{detail}"))
}

/// Protocol version that added partition key indices to prepared metadata
const PK_INDICES_VERSION: u8 = 4;

/// Prepared metadata: like result metadata, plus partition key indices from v4
fn render_bound_variables(decoder: &mut TypeDecoder<'_>, version: u8) -> DecodeResult<String> {
    let flags = decoder.extract_int()?;
    let count_offset = decoder.position();
    let columns_count = decoder.extract_int()?;
    let pk_count = if version >= PK_INDICES_VERSION {
        decoder.extract_int()?
    } else {
        0
    };
    if columns_count < 0 || pk_count < 0 {
        return Err(DecodeError::malformed(
            count_offset,
            format!("negative prepared metadata counts {columns_count}/{pk_count}"),
        ));
    }
    for _ in 0..pk_count {
        decoder.extract_short()?;
    }
    let global = flags & metadata_flags::GLOBAL_TABLES_SPEC != 0;
    if global {
        decoder.extract_string()?;
        decoder.extract_string()?;
    }
    let mut columns = Vec::with_capacity((columns_count as usize).min(decoder.remaining()));
    for _ in 0..columns_count {
        if !global {
            decoder.extract_string()?;
            decoder.extract_string()?;
        }
        let name = decoder.extract_string()?;
        let col_type = decoder.extract_option()?;
        columns.push(format!("{name} {col_type}"));
    }
    Ok(columns.join(", "))
}

fn render_result(decoder: &mut TypeDecoder<'_>, version: u8) -> DecodeResult<DecodedResponse> {
    let kind_offset = decoder.position();
    let kind = decoder.extract_int()?;
    let mut prepared_id = None;
    let msg = match kind {
        result_kind::VOID => "Response type = VOID".to_string(),
        result_kind::ROWS => {
            let md = decoder.extract_result_metadata()?;
            let rows = decoder.extract_int()?;
            format!(
                "Response type = ROWS\nNumber of columns = {}\n[{}]\nNumber of rows = {rows}",
                md.columns_count,
                render_columns(&md)
            )
        }
        result_kind::SET_KEYSPACE => {
            format!("Response type = SET_KEYSPACE\nKeyspace = {}", decoder.extract_string()?)
        }
        result_kind::PREPARED => {
            let id = decoder.extract_short_bytes()?;
            let bound = render_bound_variables(decoder, version)?;
            let msg = format!(
                "Response type = PREPARED\nId = 0x{}\nBound variables = [{bound}]",
                hex::encode(&id)
            );
            prepared_id = Some(id);
            msg
        }
        result_kind::SCHEMA_CHANGE => {
            format!("Response type = SCHEMA_CHANGE\n{}", render_schema_change(decoder)?)
        }
        other => {
            return Err(DecodeError::malformed(
                kind_offset,
                format!("unknown result kind {other}"),
            ))
        }
    };
    Ok(DecodedResponse { msg, prepared_id })
}

fn render_event(decoder: &mut TypeDecoder<'_>) -> DecodeResult<String> {
    let event_type = decoder.extract_string()?;
    match event_type.as_str() {
        "TOPOLOGY_CHANGE" | "STATUS_CHANGE" => {
            let change = decoder.extract_string()?;
            let addr = decoder.extract_inet()?;
            Ok(format!("{event_type} {change} {addr}"))
        }
        "SCHEMA_CHANGE" => Ok(format!("{event_type} {}", render_schema_change(decoder)?)),
        _ => Ok(event_type),
    }
}

pub fn decode_response_body(frame: &Frame) -> DecodeResult<DecodedResponse> {
    let plain = |msg: String| DecodedResponse {
        msg,
        prepared_id: None,
    };

    if frame.hdr.is_compressed() {
        return Ok(plain(COMPRESSED_BODY.to_string()));
    }

    let mut decoder = TypeDecoder::new(&frame.msg);
    if frame.hdr.flags & flags::TRACING != 0 {
        decoder.extract_uuid()?;
    }
    if frame.hdr.flags & flags::WARNING != 0 {
        decoder.extract_string_list()?;
    }
    if frame.hdr.flags & flags::CUSTOM_PAYLOAD != 0 {
        skip_custom_payload(&mut decoder)?;
    }

    match frame.hdr.opcode {
        Opcode::Error => {
            let code = decoder.extract_int()?;
            let message = decoder.extract_string()?;
            Ok(plain(format!("[{code:#06x}] {message}")))
        }
        Opcode::Ready => Ok(plain(String::new())),
        Opcode::Authenticate => Ok(plain(decoder.extract_string()?)),
        Opcode::Supported => {
            let options: BTreeMap<_, _> = decoder.extract_string_multi_map()?.into_iter().collect();
            Ok(plain(to_json(&options)))
        }
        Opcode::Result => render_result(&mut decoder, frame.hdr.protocol_version()),
        Opcode::Event => Ok(plain(render_event(&mut decoder)?)),
        Opcode::AuthChallenge | Opcode::AuthSuccess => {
            let token = decoder.extract_bytes()?;
            Ok(plain(format!("<auth token, {} bytes>", token.len())))
        }
        other => Err(DecodeError::malformed(
            0,
            format!("{other:?} is not a response opcode"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cql::frame::FrameHeader;

    fn frame(opcode: Opcode, version: u8, body: &[u8]) -> Frame {
        Frame {
            hdr: FrameHeader {
                version,
                flags: 0,
                stream: 1,
                opcode,
                length: body.len() as u32,
            },
            msg: body.to_vec(),
            timestamp_ns: 0,
        }
    }

    #[test]
    fn test_startup_renders_sorted_json() {
        let body = b"\x00\x02\x00\x0bCQL_VERSION\x00\x053.0.0\x00\x0bCOMPRESSION\x00\x04lz4a";
        let msg = decode_request_body(&frame(Opcode::Startup, 4, body), &PreparedCache::default())
            .unwrap();
        assert_eq!(msg, r#"{"COMPRESSION":"lz4a","CQL_VERSION":"3.0.0"}"#);
    }

    #[test]
    fn test_query_with_values() {
        let mut body = Vec::new();
        body.extend_from_slice(&(8i32).to_be_bytes());
        body.extend_from_slice(b"SELECT ?");
        // ONE, VALUES, one 1-byte value
        body.extend_from_slice(&[0x00, 0x01, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x2a]);
        let msg = decode_request_body(&frame(Opcode::Query, 4, &body), &PreparedCache::default())
            .unwrap();
        assert_eq!(msg, "SELECT ?\nparams: [0x2a]");
    }

    #[test]
    fn test_execute_resolves_prepared_query() {
        let mut cache = PreparedCache::default();
        cache.insert(vec![0xab, 0xcd], "SELECT * FROM t".into());
        let body = [0x00, 0x02, 0xab, 0xcd, 0x00, 0x01, 0x00];
        let msg = decode_request_body(&frame(Opcode::Execute, 4, &body), &cache).unwrap();
        assert_eq!(msg, "SELECT * FROM t");

        let unknown = [0x00, 0x01, 0xff, 0x00, 0x01, 0x00];
        let msg = decode_request_body(&frame(Opcode::Execute, 4, &unknown), &cache).unwrap();
        assert_eq!(msg, "<prepared 0xff>");
    }

    #[test]
    fn test_error_response() {
        let body = b"\x00\x00\x22\x00\x00\x0bbad request";
        let resp = decode_response_body(&frame(Opcode::Error, 0x84, body)).unwrap();
        assert_eq!(resp.msg, "[0x2200] bad request");
    }

    #[test]
    fn test_prepared_result_reports_id() {
        let mut body = vec![0x00, 0x00, 0x00, 0x04, 0x00, 0x02, 0xab, 0xcd];
        // Global table spec, one column, one partition key at index 0
        body.extend_from_slice(b"\x00\x00\x00\x01\x00\x00\x00\x01\x00\x00\x00\x01\x00\x00");
        body.extend_from_slice(b"\x00\x02ks\x00\x01t\x00\x02id\x00\x09");
        // Result metadata: NO_METADATA
        body.extend_from_slice(b"\x00\x00\x00\x04\x00\x00\x00\x00");
        let resp = decode_response_body(&frame(Opcode::Result, 0x84, &body)).unwrap();
        assert_eq!(resp.prepared_id, Some(vec![0xab, 0xcd]));
        assert_eq!(
            resp.msg,
            "Response type = PREPARED\nId = 0xabcd\nBound variables = [id int]"
        );
    }

    #[test]
    fn test_v3_prepared_result_has_no_pk_indices() {
        let mut body = vec![0x00, 0x00, 0x00, 0x04, 0x00, 0x02, 0xab, 0xcd];
        // Global table spec, one column; v3 carries no partition key count
        body.extend_from_slice(b"\x00\x00\x00\x01\x00\x00\x00\x01");
        body.extend_from_slice(b"\x00\x02ks\x00\x01t\x00\x02id\x00\x09");
        body.extend_from_slice(b"\x00\x00\x00\x04\x00\x00\x00\x00");
        let resp = decode_response_body(&frame(Opcode::Result, 0x83, &body)).unwrap();
        assert_eq!(resp.prepared_id, Some(vec![0xab, 0xcd]));
        assert_eq!(
            resp.msg,
            "Response type = PREPARED\nId = 0xabcd\nBound variables = [id int]"
        );
    }

    #[test]
    fn test_rows_result() {
        let mut body = vec![0x00, 0x00, 0x00, 0x02];
        body.extend_from_slice(b"\x00\x00\x00\x01\x00\x00\x00\x01\x00\x02ks\x00\x01t\x00\x02id\x00\x09");
        body.extend_from_slice(&3i32.to_be_bytes());
        let resp = decode_response_body(&frame(Opcode::Result, 0x84, &body)).unwrap();
        assert_eq!(
            resp.msg,
            "Response type = ROWS\nNumber of columns = 1\n[id int]\nNumber of rows = 3"
        );
    }

    #[test]
    fn test_schema_change_event() {
        let body = b"\x00\x0dSCHEMA_CHANGE\x00\x07CREATED\x00\x05TABLE\x00\x02ks\x00\x05users";
        let resp = decode_response_body(&frame(Opcode::Event, 0x84, body)).unwrap();
        assert_eq!(resp.msg, "SCHEMA_CHANGE CREATED TABLE ks.users");
    }

    #[test]
    fn test_truncated_body_is_error() {
        let body = [0x00, 0x00, 0x00, 0x02, 0x00];
        assert!(decode_response_body(&frame(Opcode::Result, 0x84, &body)).is_err());
    }

    #[test]
    fn test_compressed_body_not_decoded() {
        let mut f = frame(Opcode::Query, 4, &[0xff, 0xff]);
        f.hdr.flags = flags::COMPRESSION;
        assert_eq!(
            decode_request_body(&f, &PreparedCache::default()).unwrap(),
            COMPRESSED_BODY
        );
    }
}
