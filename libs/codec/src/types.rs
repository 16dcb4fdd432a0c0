//! # CQL Wire Types
//!
//! Value types produced by [`TypeDecoder`](crate::TypeDecoder) for the composite
//! CQL fields. Flag layouts are pinned to native protocol v4; fields that only
//! exist in v5 (integer query flags, keyspace/now_in_seconds, result metadata
//! id) are not decoded.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use std::fmt;

/// Column and value type codes carried by an `[option]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum DataType {
    Custom = 0x0000,
    Ascii = 0x0001,
    Bigint = 0x0002,
    Blob = 0x0003,
    Boolean = 0x0004,
    Counter = 0x0005,
    Decimal = 0x0006,
    Double = 0x0007,
    Float = 0x0008,
    Int = 0x0009,
    Timestamp = 0x000B,
    Uuid = 0x000C,
    Varchar = 0x000D,
    Varint = 0x000E,
    Timeuuid = 0x000F,
    Inet = 0x0010,
    Date = 0x0011,
    Time = 0x0012,
    Smallint = 0x0013,
    Tinyint = 0x0014,
    Duration = 0x0015,
    List = 0x0020,
    Map = 0x0021,
    Set = 0x0022,
    Udt = 0x0030,
    Tuple = 0x0031,
}

impl DataType {
    /// CQL spelling used when rendering column types
    pub fn cql_name(self) -> &'static str {
        match self {
            DataType::Custom => "custom",
            DataType::Ascii => "ascii",
            DataType::Bigint => "bigint",
            DataType::Blob => "blob",
            DataType::Boolean => "boolean",
            DataType::Counter => "counter",
            DataType::Decimal => "decimal",
            DataType::Double => "double",
            DataType::Float => "float",
            DataType::Int => "int",
            DataType::Timestamp => "timestamp",
            DataType::Uuid => "uuid",
            DataType::Varchar => "varchar",
            DataType::Varint => "varint",
            DataType::Timeuuid => "timeuuid",
            DataType::Inet => "inet",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::Smallint => "smallint",
            DataType::Tinyint => "tinyint",
            DataType::Duration => "duration",
            DataType::List => "list",
            DataType::Map => "map",
            DataType::Set => "set",
            DataType::Udt => "udt",
            DataType::Tuple => "tuple",
        }
    }
}

/// A decoded `[option]`: a type code plus whatever payload that code carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeOption {
    pub data_type: DataType,
    /// Custom class name for `Custom`, `keyspace.name` for `Udt`, empty otherwise
    pub value: String,
    /// Element types: one for list/set, key and value for map, one per field for tuple/udt
    pub params: Vec<TypeOption>,
    /// Field names of a user-defined type, parallel to `params`
    pub field_names: Vec<String>,
}

impl TypeOption {
    /// Option with no trailing payload
    pub fn simple(data_type: DataType) -> Self {
        Self {
            data_type,
            value: String::new(),
            params: Vec::new(),
            field_names: Vec::new(),
        }
    }
}

impl fmt::Display for TypeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data_type {
            DataType::Custom => write!(f, "'{}'", self.value),
            DataType::Udt => write!(f, "{}", self.value),
            DataType::List | DataType::Map | DataType::Set | DataType::Tuple => {
                write!(f, "{}<", self.data_type.cql_name())?;
                for (i, param) in self.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ">")
            }
            other => write!(f, "{}", other.cql_name()),
        }
    }
}

/// Query parameter flag bits (v4: one byte)
pub mod query_flags {
    pub const VALUES: u8 = 0x01;
    pub const SKIP_METADATA: u8 = 0x02;
    pub const PAGE_SIZE: u8 = 0x04;
    pub const WITH_PAGING_STATE: u8 = 0x08;
    pub const WITH_SERIAL_CONSISTENCY: u8 = 0x10;
    pub const WITH_DEFAULT_TIMESTAMP: u8 = 0x20;
    pub const WITH_NAMES_FOR_VALUES: u8 = 0x40;
}

/// Result metadata flag bits
pub mod metadata_flags {
    pub const GLOBAL_TABLES_SPEC: i32 = 0x0001;
    pub const HAS_MORE_PAGES: i32 = 0x0002;
    pub const NO_METADATA: i32 = 0x0004;
}

/// Parameters attached to QUERY and EXECUTE requests
///
/// Fields whose flag bit is clear keep their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryParameters {
    pub consistency: u16,
    pub flags: u8,
    /// Value names; only populated when `WITH_NAMES_FOR_VALUES` is set
    pub names: Vec<String>,
    pub values: Vec<Vec<u8>>,
    pub page_size: i32,
    pub paging_state: Vec<u8>,
    pub serial_consistency: u16,
    pub timestamp: i64,
}

/// One column of a result set or prepared statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColSpec {
    /// Empty when the metadata carries a global table spec
    pub ks_name: String,
    pub table_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: TypeOption,
}

/// Column description preceding rows and prepared statement results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultMetadata {
    pub flags: i32,
    pub columns_count: i32,
    pub paging_state: Vec<u8>,
    pub gts_keyspace_name: String,
    pub gts_table_name: String,
    pub col_specs: Vec<ColSpec>,
}

impl ResultMetadata {
    pub fn has_global_table_spec(&self) -> bool {
        self.flags & metadata_flags::GLOBAL_TABLES_SPEC != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_codes() {
        assert_eq!(DataType::try_from(0x000d).unwrap(), DataType::Varchar);
        assert_eq!(u16::from(DataType::Tuple), 0x0031);
        assert!(DataType::try_from(0x000a).is_err());
    }

    #[test]
    fn test_nested_option_display() {
        let map = TypeOption {
            data_type: DataType::Map,
            value: String::new(),
            params: vec![
                TypeOption::simple(DataType::Varchar),
                TypeOption {
                    data_type: DataType::List,
                    value: String::new(),
                    params: vec![TypeOption::simple(DataType::Int)],
                    field_names: Vec::new(),
                },
            ],
            field_names: Vec::new(),
        };
        assert_eq!(map.to_string(), "map<varchar, list<int>>");
    }
}
