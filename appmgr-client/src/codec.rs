//! Payload encoding shared by launch, messaging and dispatch.
//!
//! Launch arguments travel to the AMS as one string, each argument preceded by byte 16.
//! `exec` and `Message` signals carry `(u32 count, array<string>)` where the
//! count always equals the array length.

use crate::bus::Value;
use crate::error::ClientError;

/// Separator between launch arguments in the `app_launch_call` blob.
pub const LAUNCH_ARG_DELIMITER: char = '\u{10}';

/// Frame launch arguments, each preceded by [`LAUNCH_ARG_DELIMITER`]:
/// `["a", "b"]` becomes `"\u{10}a\u{10}b"`.
///
/// An argument that itself contains the delimiter cannot be framed and is
/// rejected.
pub fn encode_launch_args<S: AsRef<str>>(args: &[S]) -> Result<String, ClientError> {
    let mut blob = String::new();
    for (index, arg) in args.iter().enumerate() {
        let arg = arg.as_ref();
        if arg.contains(LAUNCH_ARG_DELIMITER) {
            return Err(ClientError::InvalidParameter(format!(
                "launch argument {index} contains the byte-16 delimiter"
            )));
        }
        blob.push(LAUNCH_ARG_DELIMITER);
        blob.push_str(arg);
    }
    Ok(blob)
}

/// Split an argument blob. The empty blob means no arguments.
pub fn decode_launch_args(blob: &str) -> Vec<String> {
    let Some(framed) = blob.strip_prefix(LAUNCH_ARG_DELIMITER) else {
        return if blob.is_empty() {
            Vec::new()
        } else {
            vec![blob.to_owned()]
        };
    };
    framed.split(LAUNCH_ARG_DELIMITER).map(str::to_owned).collect()
}

/// `(count, params)` body for an `exec` or `Message` signal.
pub fn string_array_body(params: Vec<String>) -> Result<Vec<Value>, ClientError> {
    let count = u32::try_from(params.len())
        .map_err(|_| ClientError::InvalidParameter("too many parameters".to_string()))?;
    Ok(vec![Value::Uint32(count), Value::StrArray(params)])
}

/// Decode the `(count, array<string>)` body of `member`.
///
/// A zero count may omit the array. Any other shape, or a count that
/// disagrees with the array length, is malformed.
pub fn decode_string_array(member: &str, body: &[Value]) -> Result<Vec<String>, ClientError> {
    let count = match body.first() {
        Some(Value::Uint32(count)) => *count as usize,
        Some(Value::Int32(count)) if *count >= 0 => *count as usize,
        Some(other) => {
            return Err(ClientError::malformed(
                member,
                format!("expected parameter count, found {other:?}"),
            ))
        }
        None => return Err(ClientError::malformed(member, "missing parameter count")),
    };
    match body.get(1) {
        Some(Value::StrArray(params)) if params.len() == count => Ok(params.clone()),
        Some(Value::StrArray(params)) => Err(ClientError::malformed(
            member,
            format!("count {count} does not match {} parameters", params.len()),
        )),
        Some(other) => Err(ClientError::malformed(
            member,
            format!("expected string array, found {other:?}"),
        )),
        None if count == 0 => Ok(Vec::new()),
        None => Err(ClientError::malformed(
            member,
            format!("count {count} but no parameter array"),
        )),
    }
}

/// Decode a single pid argument.
pub fn decode_pid(member: &str, body: &[Value]) -> Result<u32, ClientError> {
    match body.first() {
        Some(Value::Uint32(pid)) => Ok(*pid),
        Some(Value::Int32(pid)) => u32::try_from(*pid)
            .map_err(|_| ClientError::malformed(member, format!("negative pid {pid}"))),
        Some(other) => Err(ClientError::malformed(
            member,
            format!("expected pid, found {other:?}"),
        )),
        None => Err(ClientError::malformed(member, "missing pid")),
    }
}

pub fn decode_i32(member: &str, body: &[Value]) -> Result<i32, ClientError> {
    match body.first() {
        Some(Value::Int32(value)) => Ok(*value),
        Some(other) => Err(ClientError::malformed(
            member,
            format!("expected int32, found {other:?}"),
        )),
        None => Err(ClientError::malformed(member, "missing argument")),
    }
}
