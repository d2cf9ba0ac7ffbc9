use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use lazy_static::lazy_static;
use serde::Serialize;

use crate::config::QueryConfig;
use crate::entities::{with_field_map, EntityVisitor};
use crate::error::{FilterError, QueryError};
use crate::query::{check_filter, compile_query, QueryRequest};
use crate::schema::{FieldMap, Queryable};
use crate::sql::generate_sql;
use crate::validator::{describe_fields, invalid_filter, FieldDescription};

lazy_static! {
    static ref CONFIG: QueryConfig = QueryConfig::from_env();
}

/// Result code for FFI functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetQueryResult {
    Ok = 0,
    SyntaxError = 1,
    ValidationError = 2,
    UnknownEntity = 3,
    InternalError = 4,
}

/// Structured error for JSON output
#[derive(Debug, Serialize)]
struct ErrorJson {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl ErrorJson {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: "InternalError",
            message: message.into(),
            fragment: None,
            position: None,
            field: None,
        }
    }

    fn from_filter(error: &FilterError, message: String) -> Self {
        let (fragment, position) = match error {
            FilterError::Syntax {
                fragment, position, ..
            } => (Some(fragment.clone()), Some(*position)),
            _ => (None, None),
        };
        let field = match error {
            FilterError::Validation(v) => v.field().map(str::to_string),
            _ => None,
        };
        Self {
            kind: error.kind(),
            message,
            fragment,
            position,
            field,
        }
    }

    fn from_query(error: &QueryError) -> Self {
        match error {
            QueryError::InvalidFilter(invalid) => {
                Self::from_filter(&invalid.error, invalid.message.clone())
            }
            QueryError::UnknownEntity(_) => Self {
                kind: "UnknownEntity",
                message: error.to_string(),
                fragment: None,
                position: None,
                field: None,
            },
        }
    }

    fn result_code(&self) -> AssetQueryResult {
        match self.kind {
            "SyntaxError" => AssetQueryResult::SyntaxError,
            "ValidationError" | "BindError" => AssetQueryResult::ValidationError,
            "UnknownEntity" => AssetQueryResult::UnknownEntity,
            _ => AssetQueryResult::InternalError,
        }
    }
}

/// Compiled form of a request, as handed to a host
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompiledJson {
    entity: &'static str,
    filter: Option<String>,
    sql: crate::sql::GeneratedSql,
    document: crate::document::DocumentQuery,
    page: u32,
    page_size: u32,
    includes: Vec<String>,
}

/// Queryable surface of one entity
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescriptionJson {
    entity: &'static str,
    filterable: Vec<FieldDescription>,
    sortable: Vec<&'static str>,
    selectable: Vec<&'static str>,
    includes: Vec<&'static str>,
}

struct Compile<'a> {
    request: &'a QueryRequest,
    config: &'a QueryConfig,
}

impl EntityVisitor for Compile<'_> {
    type Output = Result<String, ErrorJson>;

    fn visit<E: Queryable + Serialize>(self, map: &'static FieldMap<E>) -> Self::Output {
        let compiled =
            compile_query(self.request, map, self.config).map_err(|e| ErrorJson::from_query(&e))?;
        let output = CompiledJson {
            entity: map.entity(),
            filter: compiled.filter.as_ref().map(|n| n.to_string()),
            sql: generate_sql(&compiled),
            document: compiled.document_query(),
            page: compiled.page.page,
            page_size: compiled.page.page_size,
            includes: compiled.includes.names().map(str::to_string).collect(),
        };
        serde_json::to_string_pretty(&output)
            .map_err(|e| ErrorJson::internal(format!("JSON serialization error: {}", e)))
    }
}

struct Describe;

impl EntityVisitor for Describe {
    type Output = Result<String, ErrorJson>;

    fn visit<E: Queryable + Serialize>(self, map: &'static FieldMap<E>) -> Self::Output {
        let output = DescriptionJson {
            entity: map.entity(),
            filterable: describe_fields(map),
            sortable: map.fields().filter(|f| f.can_sort).map(|f| f.name).collect(),
            selectable: map.fields().filter(|f| f.can_select).map(|f| f.name).collect(),
            includes: map.includes().map(|i| i.name).collect(),
        };
        serde_json::to_string_pretty(&output)
            .map_err(|e| ErrorJson::internal(format!("JSON serialization error: {}", e)))
    }
}

struct CheckFilter<'a> {
    filter: &'a str,
    config: &'a QueryConfig,
}

impl EntityVisitor for CheckFilter<'_> {
    type Output = Result<(), ErrorJson>;

    fn visit<E: Queryable + Serialize>(self, map: &'static FieldMap<E>) -> Self::Output {
        check_filter(self.filter, map, &self.config.limits)
            .map(|_| ())
            .map_err(|e| {
                let invalid = invalid_filter(e, map);
                ErrorJson::from_filter(&invalid.error, invalid.message)
            })
    }
}

/// Compile a query request for an entity and return its JSON rendering:
/// SQL statements with parameters, the document-store query, the normalized
/// page and the accepted includes.
///
/// # Safety
/// - `entity` and `request_json` must be valid null-terminated C strings
/// - Caller must free the returned string with `asset_query_free_string`
/// - Returns NULL on error, `error_out` then holds a JSON error object
#[no_mangle]
pub unsafe extern "C" fn asset_query_compile(
    entity: *const c_char,
    request_json: *const c_char,
    error_out: *mut *mut c_char,
) -> *mut c_char {
    let entity = match read_str(entity, "entity") {
        Ok(s) => s,
        Err(e) => {
            set_json_error(error_out, &e);
            return ptr::null_mut();
        }
    };
    let request_str = match read_str(request_json, "request") {
        Ok(s) => s,
        Err(e) => {
            set_json_error(error_out, &e);
            return ptr::null_mut();
        }
    };

    let request: QueryRequest = match serde_json::from_str(request_str) {
        Ok(r) => r,
        Err(e) => {
            set_json_error(
                error_out,
                &ErrorJson::internal(format!("Request deserialization error: {}", e)),
            );
            return ptr::null_mut();
        }
    };

    let visitor = Compile {
        request: &request,
        config: &CONFIG,
    };
    match with_field_map(entity, visitor).unwrap_or_else(|| Err(unknown_entity(entity))) {
        Ok(json) => into_c_string(json, error_out),
        Err(e) => {
            set_json_error(error_out, &e);
            ptr::null_mut()
        }
    }
}

/// Describe an entity's queryable surface as JSON
///
/// # Safety
/// - `entity` must be a valid null-terminated C string
/// - Caller must free the returned string with `asset_query_free_string`
/// - Returns NULL on error, check `error_out` for details
#[no_mangle]
pub unsafe extern "C" fn asset_query_describe(
    entity: *const c_char,
    error_out: *mut *mut c_char,
) -> *mut c_char {
    let entity = match read_str(entity, "entity") {
        Ok(s) => s,
        Err(e) => {
            set_json_error(error_out, &e);
            return ptr::null_mut();
        }
    };

    match with_field_map(entity, Describe).unwrap_or_else(|| Err(unknown_entity(entity))) {
        Ok(json) => into_c_string(json, error_out),
        Err(e) => {
            set_json_error(error_out, &e);
            ptr::null_mut()
        }
    }
}

/// Parse and validate a filter without compiling a whole request.
/// On failure `error_out` holds a JSON error object with the catalogue
/// message.
///
/// # Safety
/// - `entity` and `filter` must be valid null-terminated C strings
/// - Caller must free any string written to `error_out`
#[no_mangle]
pub unsafe extern "C" fn asset_query_check_filter(
    entity: *const c_char,
    filter: *const c_char,
    error_out: *mut *mut c_char,
) -> AssetQueryResult {
    let entity = match read_str(entity, "entity") {
        Ok(s) => s,
        Err(e) => {
            set_json_error(error_out, &e);
            return AssetQueryResult::InternalError;
        }
    };
    let filter = match read_str(filter, "filter") {
        Ok(s) => s,
        Err(e) => {
            set_json_error(error_out, &e);
            return AssetQueryResult::InternalError;
        }
    };

    let visitor = CheckFilter {
        filter,
        config: &CONFIG,
    };
    match with_field_map(entity, visitor).unwrap_or_else(|| Err(unknown_entity(entity))) {
        Ok(()) => AssetQueryResult::Ok,
        Err(e) => {
            set_json_error(error_out, &e);
            e.result_code()
        }
    }
}

/// Free a string allocated by Rust
///
/// # Safety
/// `s` must be NULL or a pointer previously returned by this library
#[no_mangle]
pub unsafe extern "C" fn asset_query_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the version of the library
#[no_mangle]
pub extern "C" fn asset_query_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

// ============================================================
// HELPERS
// ============================================================

fn unknown_entity(entity: &str) -> ErrorJson {
    ErrorJson::from_query(&QueryError::UnknownEntity(entity.to_string()))
}

unsafe fn read_str<'a>(input: *const c_char, what: &str) -> Result<&'a str, ErrorJson> {
    if input.is_null() {
        return Err(ErrorJson::internal(format!("{} is null", what)));
    }
    CStr::from_ptr(input)
        .to_str()
        .map_err(|e| ErrorJson::internal(format!("Invalid {} UTF-8: {}", what, e)))
}

unsafe fn into_c_string(json: String, error_out: *mut *mut c_char) -> *mut c_char {
    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            set_json_error(
                error_out,
                &ErrorJson::internal(format!("CString conversion error: {}", e)),
            );
            ptr::null_mut()
        }
    }
}

unsafe fn set_json_error(error_out: *mut *mut c_char, error: &ErrorJson) {
    tracing::debug!(kind = error.kind, "FFI call failed");
    let json = serde_json::to_string(error).unwrap_or_else(|_| {
        r#"{"kind":"InternalError","message":"Failed to serialize error"}"#.to_string()
    });
    set_error(error_out, &json);
}

unsafe fn set_error(error_out: *mut *mut c_char, message: &str) {
    if !error_out.is_null() {
        if let Ok(c_str) = CString::new(message) {
            *error_out = c_str.into_raw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe fn take(s: *mut c_char) -> serde_json::Value {
        let json = CStr::from_ptr(s).to_str().unwrap().to_string();
        asset_query_free_string(s);
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_compile_success() {
        let entity = CString::new("Asset").unwrap();
        let request = CString::new(r#"{"filter":"isActive == true","sort":"name","page":2}"#).unwrap();
        let mut error: *mut c_char = ptr::null_mut();

        unsafe {
            let result = asset_query_compile(entity.as_ptr(), request.as_ptr(), &mut error);
            assert!(!result.is_null(), "Compile should succeed");
            assert!(error.is_null(), "No error should be set");

            let json = take(result);
            assert_eq!(json["entity"], "Asset");
            assert_eq!(json["filter"], "isActive == true");
            assert_eq!(json["page"], 2);
            assert_eq!(json["sql"]["params"][0], true);
            assert_eq!(json["document"]["filter"]["isActive"]["$eq"], true);
        }
    }

    #[test]
    fn test_compile_syntax_error() {
        let entity = CString::new("asset").unwrap();
        let request = CString::new(r#"{"filter":"name == "}"#).unwrap();
        let mut error: *mut c_char = ptr::null_mut();

        unsafe {
            let result = asset_query_compile(entity.as_ptr(), request.as_ptr(), &mut error);
            assert!(result.is_null(), "Compile should fail");
            assert!(!error.is_null(), "Error should be set");

            let json = take(error);
            assert_eq!(json["kind"], "SyntaxError");
            assert!(json["position"].is_number());
            assert!(json["message"].as_str().unwrap().contains("Filterable fields for Asset:"));
        }
    }

    #[test]
    fn test_unknown_entity() {
        let entity = CString::new("Warehouse").unwrap();
        let mut error: *mut c_char = ptr::null_mut();

        unsafe {
            let result = asset_query_describe(entity.as_ptr(), &mut error);
            assert!(result.is_null());
            let json = take(error);
            assert_eq!(json["kind"], "UnknownEntity");
            assert_eq!(json["message"], "Unknown entity: Warehouse");
        }
    }

    #[test]
    fn test_check_filter_codes() {
        let entity = CString::new("Company").unwrap();
        let mut error: *mut c_char = ptr::null_mut();

        unsafe {
            let ok = CString::new("name @startswith 'Acme'").unwrap();
            assert_eq!(
                asset_query_check_filter(entity.as_ptr(), ok.as_ptr(), &mut error),
                AssetQueryResult::Ok
            );
            assert!(error.is_null());

            let bad = CString::new("secret == true").unwrap();
            assert_eq!(
                asset_query_check_filter(entity.as_ptr(), bad.as_ptr(), &mut error),
                AssetQueryResult::ValidationError
            );
            let json = take(error);
            assert_eq!(json["field"], "secret");
        }
    }

    #[test]
    fn test_null_input() {
        let mut error: *mut c_char = ptr::null_mut();
        unsafe {
            let result = asset_query_describe(ptr::null(), &mut error);
            assert!(result.is_null());
            assert_eq!(take(error)["kind"], "InternalError");
        }
    }

    #[test]
    fn test_version() {
        unsafe {
            let version = CStr::from_ptr(asset_query_version());
            assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
        }
    }

    #[test]
    fn test_free_null_is_safe() {
        unsafe {
            asset_query_free_string(ptr::null_mut());
        }
    }
}
