//! Decoding of the textual reports printed by dmsetup.

use super::SECTOR_SIZE;
use crate::{
    device::{DeviceInfo, DeviceStatus},
    error::Error,
};
use std::str::FromStr;

/// Fields requested from "dmsetup info", in this order.
pub(super) const INFO_COLUMNS: &str =
    "name,blkdevname,attr,major,minor,open,segments,events";

/// What "dmsetup info" prints when there is nothing to report.
const NO_DEVICES: &str = "No devices found";

fn parse_error(what: &str, input: &str, reason: impl ToString) -> Error {
    Error::Parse {
        what: what.to_string(),
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

fn number<T>(line: &str, field: Option<&str>) -> Result<T, Error>
where
    T: FromStr,
    T::Err: ToString,
{
    let field =
        field.ok_or_else(|| parse_error("line", line, "missing field"))?;
    field.parse::<T>().map_err(|error| parse_error("line", line, error))
}

/// Parse one row of "dmsetup info --columns --noheadings", e.g.
///     fedora-swap dm-1 L--w 253 1 2 1 0
/// Every one of the eight fields must be present; extra fields are ignored.
pub(crate) fn parse_info_line(line: &str) -> Result<DeviceInfo, Error> {
    let mut fields = line.split_whitespace();

    let name = fields
        .next()
        .ok_or_else(|| parse_error("line", line, "missing name"))?;
    let block_device_name = fields
        .next()
        .ok_or_else(|| parse_error("line", line, "missing block device"))?;
    let attr = fields
        .next()
        .ok_or_else(|| parse_error("line", line, "missing attributes"))?;

    let mut info = DeviceInfo {
        name: name.to_string(),
        block_device_name: block_device_name.to_string(),
        major: number(line, fields.next())?,
        minor: number(line, fields.next())?,
        open_count: number(line, fields.next())?,
        target_count: number(line, fields.next())?,
        event_number: number(line, fields.next())?,
        ..Default::default()
    };
    // see "man 8 dmsetup" for the attributes
    info.set_attributes(attr);

    Ok(info)
}

/// Parse the full "dmsetup info" report, one device per line. A line which
/// does not parse fails the whole report.
pub(crate) fn parse_info(output: &str) -> Result<Vec<DeviceInfo>, Error> {
    let output = output.trim();
    if output.is_empty() || output == NO_DEVICES {
        return Ok(Vec::new());
    }

    output.split('\n').map(parse_info_line).collect()
}

/// Parse the output of "dmsetup status <device>":
///     offset length target_type params...
pub(crate) fn parse_status(output: &str) -> Result<DeviceStatus, Error> {
    const MIN_PARSE_COUNT: usize = 4;

    let parts: Vec<&str> = output.split(' ').collect();
    if parts.len() < MIN_PARSE_COUNT {
        return Err(parse_error("output", output, "too few fields"));
    }

    let offset = parts[0]
        .parse::<i64>()
        .map_err(|error| parse_error("offset", parts[0], error))?;
    let length = parts[1]
        .parse::<i64>()
        .map_err(|error| parse_error("length", parts[1], error))?;

    Ok(DeviceStatus {
        offset,
        length,
        target: parts[2].to_string(),
        params: parts[3 ..].iter().map(|p| p.to_string()).collect(),
    })
}

/// Bytes used by a thin device, from the number of used sectors reported as
/// the first status parameter of the thin target, for instance 17280 in
///     0 204800 thin 17280 204799
pub(crate) fn used_bytes(status: &DeviceStatus) -> Result<u64, Error> {
    let used = status.params.first().ok_or_else(|| {
        parse_error(
            "status params",
            "",
            "failed to get the number of used blocks",
        )
    })?;
    let count = used
        .parse::<u64>()
        .map_err(|error| parse_error("status params", used, error))?;

    count
        .checked_mul(u64::from(SECTOR_SIZE))
        .ok_or_else(|| parse_error("status params", used, "too many blocks"))
}
