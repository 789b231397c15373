//! TCLIService (HiveServer2) messages.
//!
//! Only the calls and fields a SQL client needs are modelled. Unknown fields
//! in responses are skipped, so newer servers decode cleanly.

use crate::protocol::{FieldHeader, ThriftReader, ThriftWriter, ttype};
use sparkwire_core::error::{Error, QueryError, QueryErrorKind, Result};
use sparkwire_core::row::ColumnDesc;
use sparkwire_core::value::Value;

/// `HIVE_CLI_SERVICE_PROTOCOL_V6`
pub const CLIENT_PROTOCOL_V6: i32 = 5;

/// `TFetchOrientation.FETCH_NEXT`
pub const FETCH_NEXT: i32 = 0;

/// `TStatusCode` values.
pub mod status_code {
    pub const SUCCESS: i32 = 0;
    pub const SUCCESS_WITH_INFO: i32 = 1;
    pub const STILL_EXECUTING: i32 = 2;
    pub const ERROR: i32 = 3;
    pub const INVALID_HANDLE: i32 = 4;
}

/// A value that can be encoded as a Thrift struct.
pub trait TWrite {
    fn write(&self, w: &mut ThriftWriter);
}

/// A value that can be decoded from a Thrift struct.
pub trait TRead: Sized {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self>;
}

/// A service call: request struct, method name and response type.
pub trait TcliRequest: TWrite {
    const METHOD: &'static str;
    type Response: TRead + HasStatus;
}

/// Responses that carry a `TStatus`.
pub trait HasStatus {
    fn status(&self) -> &TStatus;
}

/// Walk the fields of a struct, skipping the ones `on_field` does not claim.
fn read_struct<'a, F>(r: &mut ThriftReader<'a>, mut on_field: F) -> Result<()>
where
    F: FnMut(&mut ThriftReader<'a>, FieldHeader) -> Result<bool>,
{
    loop {
        let field = r.read_field_begin()?;
        if field.is_stop() {
            return Ok(());
        }
        if !on_field(r, field)? {
            r.skip(field.field_type)?;
        }
    }
}

fn required<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| Error::protocol(format!("Missing required field {}", what)))
}

fn write_struct_field<T: TWrite>(w: &mut ThriftWriter, id: i16, value: &T) {
    w.write_field_begin(ttype::STRUCT, id);
    value.write(w);
}

// ==================== Handles and status ====================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandleIdentifier {
    pub guid: Vec<u8>,
    pub secret: Vec<u8>,
}

impl TWrite for HandleIdentifier {
    fn write(&self, w: &mut ThriftWriter) {
        w.write_binary_field(1, &self.guid);
        w.write_binary_field(2, &self.secret);
        w.write_field_stop();
    }
}

impl TRead for HandleIdentifier {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut out = HandleIdentifier::default();
        read_struct(r, |r, f| match (f.id, f.field_type) {
            (1, ttype::STRING) => {
                out.guid = r.read_binary()?;
                Ok(true)
            }
            (2, ttype::STRING) => {
                out.secret = r.read_binary()?;
                Ok(true)
            }
            _ => Ok(false),
        })?;
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionHandle {
    pub session_id: HandleIdentifier,
}

impl TWrite for SessionHandle {
    fn write(&self, w: &mut ThriftWriter) {
        write_struct_field(w, 1, &self.session_id);
        w.write_field_stop();
    }
}

impl TRead for SessionHandle {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut session_id = None;
        read_struct(r, |r, f| match (f.id, f.field_type) {
            (1, ttype::STRUCT) => {
                session_id = Some(HandleIdentifier::read(r)?);
                Ok(true)
            }
            _ => Ok(false),
        })?;
        Ok(SessionHandle {
            session_id: required(session_id, "TSessionHandle.sessionId")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationHandle {
    pub operation_id: HandleIdentifier,
    pub operation_type: i32,
    pub has_result_set: bool,
    pub modified_row_count: Option<f64>,
}

impl TWrite for OperationHandle {
    fn write(&self, w: &mut ThriftWriter) {
        write_struct_field(w, 1, &self.operation_id);
        w.write_i32_field(2, self.operation_type);
        w.write_bool_field(3, self.has_result_set);
        if let Some(count) = self.modified_row_count {
            w.write_field_begin(ttype::DOUBLE, 4);
            w.write_double(count);
        }
        w.write_field_stop();
    }
}

impl TRead for OperationHandle {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut operation_id = None;
        let mut operation_type = 0;
        let mut has_result_set = false;
        let mut modified_row_count = None;
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::STRUCT) => operation_id = Some(HandleIdentifier::read(r)?),
                (2, ttype::I32) => operation_type = r.read_i32()?,
                (3, ttype::BOOL) => has_result_set = r.read_bool()?,
                (4, ttype::DOUBLE) => modified_row_count = Some(r.read_double()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(OperationHandle {
            operation_id: required(operation_id, "TOperationHandle.operationId")?,
            operation_type,
            has_result_set,
            modified_row_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TStatus {
    pub status_code: i32,
    pub info_messages: Vec<String>,
    pub sql_state: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl TStatus {
    pub fn is_error(&self) -> bool {
        matches!(
            self.status_code,
            status_code::ERROR | status_code::INVALID_HANDLE
        )
    }

    /// Turn an error status into a query error carrying the server's message.
    pub fn check(&self) -> Result<()> {
        if !self.is_error() {
            return Ok(());
        }
        let message = match &self.error_message {
            Some(message) if !message.is_empty() => message.clone(),
            _ => format!("Server returned status code {}", self.status_code),
        };
        Err(Error::Query(QueryError {
            kind: QueryErrorKind::Database,
            sql: None,
            sqlstate: self.sql_state.clone(),
            message,
        }))
    }
}

impl TRead for TStatus {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut out = TStatus::default();
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::I32) => out.status_code = r.read_i32()?,
                (2, ttype::LIST) => {
                    let (elem, len) = r.read_list_begin()?;
                    for _ in 0..len {
                        if elem == ttype::STRING {
                            out.info_messages.push(r.read_string()?);
                        } else {
                            r.skip(elem)?;
                        }
                    }
                }
                (3, ttype::STRING) => out.sql_state = Some(r.read_string()?),
                (4, ttype::I32) => out.error_code = Some(r.read_i32()?),
                (5, ttype::STRING) => out.error_message = Some(r.read_string()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(out)
    }
}

/// Read a response whose only interesting field is the status.
fn read_status_only(r: &mut ThriftReader<'_>) -> Result<TStatus> {
    let mut status = None;
    read_struct(r, |r, f| match (f.id, f.field_type) {
        (1, ttype::STRUCT) => {
            status = Some(TStatus::read(r)?);
            Ok(true)
        }
        _ => Ok(false),
    })?;
    required(status, "status")
}

macro_rules! status_response {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub status: TStatus,
        }

        impl TRead for $name {
            fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
                Ok(Self {
                    status: read_status_only(r)?,
                })
            }
        }

        impl HasStatus for $name {
            fn status(&self) -> &TStatus {
                &self.status
            }
        }
    };
}

// ==================== OpenSession / CloseSession ====================

#[derive(Debug, Clone)]
pub struct OpenSessionReq {
    pub client_protocol: i32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub configuration: Vec<(String, String)>,
}

impl TWrite for OpenSessionReq {
    fn write(&self, w: &mut ThriftWriter) {
        w.write_i32_field(1, self.client_protocol);
        if let Some(username) = &self.username {
            w.write_string_field(2, username);
        }
        if let Some(password) = &self.password {
            w.write_string_field(3, password);
        }
        if !self.configuration.is_empty() {
            w.write_field_begin(ttype::MAP, 4);
            w.write_map_begin(ttype::STRING, ttype::STRING, self.configuration.len());
            for (key, value) in &self.configuration {
                w.write_string(key);
                w.write_string(value);
            }
        }
        w.write_field_stop();
    }
}

#[derive(Debug, Clone)]
pub struct OpenSessionResp {
    pub status: TStatus,
    pub server_protocol_version: i32,
    pub session_handle: Option<SessionHandle>,
}

impl TRead for OpenSessionResp {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut status = None;
        let mut server_protocol_version = 0;
        let mut session_handle = None;
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::STRUCT) => status = Some(TStatus::read(r)?),
                (2, ttype::I32) => server_protocol_version = r.read_i32()?,
                (3, ttype::STRUCT) => session_handle = Some(SessionHandle::read(r)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(OpenSessionResp {
            status: required(status, "TOpenSessionResp.status")?,
            server_protocol_version,
            session_handle,
        })
    }
}

impl HasStatus for OpenSessionResp {
    fn status(&self) -> &TStatus {
        &self.status
    }
}

impl TcliRequest for OpenSessionReq {
    const METHOD: &'static str = "OpenSession";
    type Response = OpenSessionResp;
}

#[derive(Debug, Clone)]
pub struct CloseSessionReq {
    pub session_handle: SessionHandle,
}

impl TWrite for CloseSessionReq {
    fn write(&self, w: &mut ThriftWriter) {
        write_struct_field(w, 1, &self.session_handle);
        w.write_field_stop();
    }
}

status_response!(CloseSessionResp);

impl TcliRequest for CloseSessionReq {
    const METHOD: &'static str = "CloseSession";
    type Response = CloseSessionResp;
}

// ==================== ExecuteStatement ====================

#[derive(Debug, Clone)]
pub struct ExecuteStatementReq {
    pub session_handle: SessionHandle,
    pub statement: String,
    pub run_async: bool,
}

impl TWrite for ExecuteStatementReq {
    fn write(&self, w: &mut ThriftWriter) {
        write_struct_field(w, 1, &self.session_handle);
        w.write_string_field(2, &self.statement);
        w.write_bool_field(4, self.run_async);
        w.write_field_stop();
    }
}

#[derive(Debug, Clone)]
pub struct ExecuteStatementResp {
    pub status: TStatus,
    pub operation_handle: Option<OperationHandle>,
}

impl TRead for ExecuteStatementResp {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut status = None;
        let mut operation_handle = None;
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::STRUCT) => status = Some(TStatus::read(r)?),
                (2, ttype::STRUCT) => operation_handle = Some(OperationHandle::read(r)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(ExecuteStatementResp {
            status: required(status, "TExecuteStatementResp.status")?,
            operation_handle,
        })
    }
}

impl HasStatus for ExecuteStatementResp {
    fn status(&self) -> &TStatus {
        &self.status
    }
}

impl TcliRequest for ExecuteStatementReq {
    const METHOD: &'static str = "ExecuteStatement";
    type Response = ExecuteStatementResp;
}

// ==================== Operation calls ====================

macro_rules! operation_request {
    ($name:ident, $method:literal, $resp:ty) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            pub operation_handle: OperationHandle,
        }

        impl TWrite for $name {
            fn write(&self, w: &mut ThriftWriter) {
                write_struct_field(w, 1, &self.operation_handle);
                w.write_field_stop();
            }
        }

        impl TcliRequest for $name {
            const METHOD: &'static str = $method;
            type Response = $resp;
        }
    };
}

operation_request!(GetOperationStatusReq, "GetOperationStatus", GetOperationStatusResp);
operation_request!(CancelOperationReq, "CancelOperation", CancelOperationResp);
operation_request!(CloseOperationReq, "CloseOperation", CloseOperationResp);
operation_request!(
    GetResultSetMetadataReq,
    "GetResultSetMetadata",
    GetResultSetMetadataResp
);

status_response!(CancelOperationResp);
status_response!(CloseOperationResp);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOperationStatusResp {
    pub status: TStatus,
    pub operation_state: Option<i32>,
    pub sql_state: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl TRead for GetOperationStatusResp {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut status = None;
        let mut operation_state = None;
        let mut sql_state = None;
        let mut error_code = None;
        let mut error_message = None;
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::STRUCT) => status = Some(TStatus::read(r)?),
                (2, ttype::I32) => operation_state = Some(r.read_i32()?),
                (3, ttype::STRING) => sql_state = Some(r.read_string()?),
                (4, ttype::I32) => error_code = Some(r.read_i32()?),
                (5, ttype::STRING) => error_message = Some(r.read_string()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(GetOperationStatusResp {
            status: required(status, "TGetOperationStatusResp.status")?,
            operation_state,
            sql_state,
            error_code,
            error_message,
        })
    }
}

impl HasStatus for GetOperationStatusResp {
    fn status(&self) -> &TStatus {
        &self.status
    }
}

// ==================== Result metadata ====================

/// `TTypeId` names, indexed by wire value.
const TYPE_NAMES: [&str; 22] = [
    "BOOLEAN_TYPE",
    "TINYINT_TYPE",
    "SMALLINT_TYPE",
    "INT_TYPE",
    "BIGINT_TYPE",
    "FLOAT_TYPE",
    "DOUBLE_TYPE",
    "STRING_TYPE",
    "TIMESTAMP_TYPE",
    "BINARY_TYPE",
    "ARRAY_TYPE",
    "MAP_TYPE",
    "STRUCT_TYPE",
    "UNION_TYPE",
    "USER_DEFINED_TYPE",
    "DECIMAL_TYPE",
    "NULL_TYPE",
    "DATE_TYPE",
    "VARCHAR_TYPE",
    "CHAR_TYPE",
    "INTERVAL_YEAR_MONTH_TYPE",
    "INTERVAL_DAY_TIME_TYPE",
];

/// Name of a `TTypeId` wire value.
pub fn type_name(type_id: i32) -> String {
    usize::try_from(type_id)
        .ok()
        .and_then(|i| TYPE_NAMES.get(i))
        .map_or_else(|| format!("Unknown<{}>", type_id), |s| (*s).to_string())
}

/// Decode a `TTypeDesc` into the name of its top-level type.
fn read_type_desc(r: &mut ThriftReader<'_>) -> Result<String> {
    let mut name = None;
    read_struct(r, |r, f| {
        if (f.id, f.field_type) != (1, ttype::LIST) {
            return Ok(false);
        }
        let (elem, len) = r.read_list_begin()?;
        for _ in 0..len {
            if elem != ttype::STRUCT {
                r.skip(elem)?;
                continue;
            }
            // TTypeEntry union: only the first entry names the column type.
            let mut entry = None;
            read_struct(r, |r, f| {
                match (f.id, f.field_type) {
                    (1, ttype::STRUCT) => {
                        let mut type_id = None;
                        read_struct(r, |r, f| match (f.id, f.field_type) {
                            (1, ttype::I32) => {
                                type_id = Some(r.read_i32()?);
                                Ok(true)
                            }
                            _ => Ok(false),
                        })?;
                        entry = type_id.map(type_name);
                    }
                    (2, ttype::STRUCT) => {
                        r.skip(ttype::STRUCT)?;
                        entry = Some("ARRAY_TYPE".to_string());
                    }
                    (3, ttype::STRUCT) => {
                        r.skip(ttype::STRUCT)?;
                        entry = Some("MAP_TYPE".to_string());
                    }
                    (4, ttype::STRUCT) => {
                        r.skip(ttype::STRUCT)?;
                        entry = Some("STRUCT_TYPE".to_string());
                    }
                    (5, ttype::STRUCT) => {
                        r.skip(ttype::STRUCT)?;
                        entry = Some("UNION_TYPE".to_string());
                    }
                    (6, ttype::STRUCT) => {
                        r.skip(ttype::STRUCT)?;
                        entry = Some("USER_DEFINED_TYPE".to_string());
                    }
                    _ => return Ok(false),
                }
                Ok(true)
            })?;
            if name.is_none() {
                name = entry;
            }
        }
        Ok(true)
    })?;
    Ok(name.unwrap_or_else(|| "Unknown<None>".to_string()))
}

fn read_column_desc(r: &mut ThriftReader<'_>) -> Result<ColumnDesc> {
    let mut column_name = None;
    let mut type_name = None;
    let mut position = 0;
    let mut comment = None;
    read_struct(r, |r, f| {
        match (f.id, f.field_type) {
            (1, ttype::STRING) => column_name = Some(r.read_string()?),
            (2, ttype::STRUCT) => type_name = Some(read_type_desc(r)?),
            (3, ttype::I32) => position = r.read_i32()?,
            (4, ttype::STRING) => comment = Some(r.read_string()?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(ColumnDesc {
        name: required(column_name, "TColumnDesc.columnName")?,
        type_name: type_name.unwrap_or_else(|| "Unknown<None>".to_string()),
        position,
        comment,
    })
}

#[derive(Debug, Clone)]
pub struct GetResultSetMetadataResp {
    pub status: TStatus,
    pub columns: Vec<ColumnDesc>,
}

impl TRead for GetResultSetMetadataResp {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut status = None;
        let mut columns = Vec::new();
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::STRUCT) => status = Some(TStatus::read(r)?),
                (2, ttype::STRUCT) => {
                    read_struct(r, |r, f| {
                        if (f.id, f.field_type) != (1, ttype::LIST) {
                            return Ok(false);
                        }
                        let (elem, len) = r.read_list_begin()?;
                        for _ in 0..len {
                            if elem == ttype::STRUCT {
                                columns.push(read_column_desc(r)?);
                            } else {
                                r.skip(elem)?;
                            }
                        }
                        Ok(true)
                    })?;
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(GetResultSetMetadataResp {
            status: required(status, "TGetResultSetMetadataResp.status")?,
            columns,
        })
    }
}

impl HasStatus for GetResultSetMetadataResp {
    fn status(&self) -> &TStatus {
        &self.status
    }
}

// ==================== FetchResults ====================

#[derive(Debug, Clone)]
pub struct FetchResultsReq {
    pub operation_handle: OperationHandle,
    pub orientation: i32,
    pub max_rows: i64,
}

impl TWrite for FetchResultsReq {
    fn write(&self, w: &mut ThriftWriter) {
        write_struct_field(w, 1, &self.operation_handle);
        w.write_i32_field(2, self.orientation);
        w.write_i64_field(3, self.max_rows);
        w.write_field_stop();
    }
}

impl TcliRequest for FetchResultsReq {
    const METHOD: &'static str = "FetchResults";
    type Response = FetchResultsResp;
}

#[derive(Debug, Clone)]
pub struct FetchResultsResp {
    pub status: TStatus,
    pub has_more_rows: Option<bool>,
    pub results: Option<RowSet>,
}

impl TRead for FetchResultsResp {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut status = None;
        let mut has_more_rows = None;
        let mut results = None;
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::STRUCT) => status = Some(TStatus::read(r)?),
                (2, ttype::BOOL) => has_more_rows = Some(r.read_bool()?),
                (3, ttype::STRUCT) => results = Some(RowSet::read(r)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(FetchResultsResp {
            status: required(status, "TFetchResultsResp.status")?,
            has_more_rows,
            results,
        })
    }
}

impl HasStatus for FetchResultsResp {
    fn status(&self) -> &TStatus {
        &self.status
    }
}

/// A decoded `TRowSet`, either row-oriented or columnar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub start_row_offset: i64,
    /// Row-oriented values (servers older than protocol V6)
    pub rows: Vec<Vec<Value>>,
    /// Columnar values
    pub columns: Option<Vec<Vec<Value>>>,
}

impl RowSet {
    /// Convert to row-major values regardless of the wire orientation.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        let Some(columns) = self.columns else {
            return self.rows;
        };
        let height = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
        (0..height)
            .map(|_| {
                iters
                    .iter_mut()
                    .map(|it| it.next().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }
}

impl TRead for RowSet {
    fn read(r: &mut ThriftReader<'_>) -> Result<Self> {
        let mut out = RowSet::default();
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::I64) => out.start_row_offset = r.read_i64()?,
                (2, ttype::LIST) => {
                    let (elem, len) = r.read_list_begin()?;
                    for _ in 0..len {
                        if elem == ttype::STRUCT {
                            out.rows.push(read_row(r)?);
                        } else {
                            r.skip(elem)?;
                        }
                    }
                }
                (3, ttype::LIST) => {
                    let (elem, len) = r.read_list_begin()?;
                    // len comes off the wire; each column needs at least one byte
                    let mut columns = Vec::with_capacity(len.min(r.remaining()));
                    for _ in 0..len {
                        if elem == ttype::STRUCT {
                            columns.push(read_column(r)?);
                        } else {
                            r.skip(elem)?;
                        }
                    }
                    out.columns = Some(columns);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(out)
    }
}

/// Decode a `TRow`: a list of `TColumnValue` unions.
fn read_row(r: &mut ThriftReader<'_>) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    read_struct(r, |r, f| {
        if (f.id, f.field_type) != (1, ttype::LIST) {
            return Ok(false);
        }
        let (elem, len) = r.read_list_begin()?;
        for _ in 0..len {
            if elem == ttype::STRUCT {
                values.push(read_column_value(r)?);
            } else {
                r.skip(elem)?;
            }
        }
        Ok(true)
    })?;
    Ok(values)
}

fn read_column_value(r: &mut ThriftReader<'_>) -> Result<Value> {
    let mut value = Value::Null;
    read_struct(r, |r, f| {
        if f.field_type != ttype::STRUCT {
            return Ok(false);
        }
        // Each variant wraps an optional `value` field with id 1.
        let variant = f.id;
        read_struct(r, |r, f| {
            if f.id != 1 {
                return Ok(false);
            }
            value = match (variant, f.field_type) {
                (1, ttype::BOOL) => Value::Bool(r.read_bool()?),
                (2, ttype::BYTE) => Value::TinyInt(r.read_byte()?),
                (3, ttype::I16) => Value::SmallInt(r.read_i16()?),
                (4, ttype::I32) => Value::Int(r.read_i32()?),
                (5, ttype::I64) => Value::BigInt(r.read_i64()?),
                (6, ttype::DOUBLE) => Value::Double(r.read_double()?),
                (7, ttype::STRING) => Value::Text(r.read_string()?),
                _ => return Ok(false),
            };
            Ok(true)
        })?;
        Ok(true)
    })?;
    Ok(value)
}

/// Decode a `TColumn` union into values with nulls applied.
fn read_column(r: &mut ThriftReader<'_>) -> Result<Vec<Value>> {
    let mut column = Vec::new();
    read_struct(r, |r, f| {
        if f.field_type != ttype::STRUCT || !(1..=8).contains(&f.id) {
            return Ok(false);
        }
        let variant = f.id;
        let mut values = Vec::new();
        let mut nulls = Vec::new();
        read_struct(r, |r, f| {
            match (f.id, f.field_type) {
                (1, ttype::LIST) => {
                    let (elem, len) = r.read_list_begin()?;
                    values.reserve(len);
                    for _ in 0..len {
                        values.push(read_column_element(r, variant, elem)?);
                    }
                }
                (2, ttype::STRING) => nulls = r.read_binary()?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        for (i, value) in values.iter_mut().enumerate() {
            if is_null(&nulls, i) {
                *value = Value::Null;
            }
        }
        column = values;
        Ok(true)
    })?;
    Ok(column)
}

fn read_column_element(r: &mut ThriftReader<'_>, variant: i16, elem: u8) -> Result<Value> {
    Ok(match (variant, elem) {
        (1, ttype::BOOL) => Value::Bool(r.read_bool()?),
        (2, ttype::BYTE) => Value::TinyInt(r.read_byte()?),
        (3, ttype::I16) => Value::SmallInt(r.read_i16()?),
        (4, ttype::I32) => Value::Int(r.read_i32()?),
        (5, ttype::I64) => Value::BigInt(r.read_i64()?),
        (6, ttype::DOUBLE) => Value::Double(r.read_double()?),
        (7, ttype::STRING) => Value::Text(r.read_string()?),
        (8, ttype::STRING) => Value::Bytes(r.read_binary()?),
        _ => {
            return Err(Error::protocol(format!(
                "Column variant {} cannot hold element type {}",
                variant, elem
            )));
        }
    })
}

/// Bit `i` of the null bitmap, least significant bit first.
fn is_null(bitmap: &[u8], i: usize) -> bool {
    bitmap
        .get(i / 8)
        .is_some_and(|byte| byte & (1 << (i % 8)) != 0)
}
