//! Parsers for vendor tool output and sysfs attributes

use crate::error::HostError;
use crate::models::{NvConfigQuery, PfcConfig, TrustMode, PRIORITY_COUNT};

/// Extracts (part number, serial number) from `mstvpd` output.
///
/// The serial number is lowercased so it can be used as a Kubernetes object name.
pub fn parse_vpd(output: &str) -> Result<(String, String), HostError> {
    let mut part_number = None;
    let mut serial_number = None;

    for line in output.lines() {
        if let Some((key, value)) = line.trim().split_once(':') {
            match key.trim() {
                "PN" => part_number = Some(value.trim().to_string()),
                "SN" => serial_number = Some(value.trim().to_lowercase()),
                _ => {}
            }
        }
    }

    match (part_number, serial_number) {
        (Some(pn), Some(sn)) if !pn.is_empty() && !sn.is_empty() => Ok((pn, sn)),
        _ => Err(HostError::Parse(
            "VPD does not contain part and serial numbers".to_string(),
        )),
    }
}

/// Extracts (firmware version, PSID) from `mstflint q` output.
pub fn parse_flint_query(output: &str) -> Result<(String, String), HostError> {
    let mut firmware_version = None;
    let mut psid = None;

    for line in output.lines() {
        if let Some((key, value)) = line.split_once(':') {
            match key.trim() {
                "FW Version" => firmware_version = Some(value.trim().to_string()),
                "PSID" => psid = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    firmware_version
        .zip(psid)
        .ok_or_else(|| HostError::Parse("flint query is missing FW Version or PSID".to_string()))
}

/// Reduces a tool value to its settable form: "ETH(2)" → "2", "True(1)" → "1".
/// Plain values are returned unchanged.
pub fn normalize_nv_value(value: &str) -> String {
    if let (Some(open), true) = (value.rfind('('), value.ends_with(')')) {
        let inner = &value[open + 1..value.len() - 1];
        if !inner.is_empty() {
            return inner.to_string();
        }
    }
    value.to_string()
}

/// Parses `mstconfig -e query` output into the three configuration maps.
///
/// Rows after the `Configurations:` header look like
/// `*        LINK_TYPE_P1     ETH(2)     IB(1)     IB(1)`
/// (name, default, current, next boot). Rows with a different shape, such as
/// array summaries, are skipped.
pub fn parse_nv_config_query(output: &str) -> Result<NvConfigQuery, HostError> {
    let mut query = NvConfigQuery::default();
    let mut in_table = false;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Configurations:") {
            in_table = true;
            continue;
        }
        if !in_table || trimmed.is_empty() || trimmed.starts_with("The '*'") {
            continue;
        }

        let row = trimmed.trim_start_matches('*').trim_start();
        let fields: Vec<&str> = row.split_whitespace().collect();
        if let &[name, default, current, next] = fields.as_slice() {
            query.default_config.insert(name.to_string(), normalize_nv_value(default));
            query.current_config.insert(name.to_string(), normalize_nv_value(current));
            query.next_boot_config.insert(name.to_string(), normalize_nv_value(next));
        }
    }

    if !in_table {
        return Err(HostError::Parse(
            "NV config query output has no configuration table".to_string(),
        ));
    }
    Ok(query)
}

/// Extracts the base class from a sysfs `class` attribute: "0x020000" → "02".
pub fn parse_class_id(raw: &str) -> Result<String, HostError> {
    let hex = strip_hex_prefix(raw);
    hex.get(..2)
        .map(str::to_string)
        .ok_or_else(|| HostError::Parse(format!("invalid PCI class: {}", raw.trim())))
}

/// "0x15b3\n" → "15b3"
pub fn strip_hex_prefix(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Parses a sysfs `max_link_speed` attribute: "16.0 GT/s PCIe" → 16.
pub fn parse_link_speed(raw: &str) -> Result<u32, HostError> {
    let number = raw
        .split_whitespace()
        .next()
        .ok_or_else(|| HostError::Parse("empty link speed".to_string()))?;
    let speed: f64 = number
        .parse()
        .map_err(|_| HostError::Parse(format!("invalid link speed: {}", raw.trim())))?;
    // Gen1/Gen2 report 2.5 and 5.0 GT/s
    Ok(speed as u32)
}

/// Decodes max read request size from the PCIe Device Control register value
/// printed by `setpci` (bits 14:12 encode 128 << n).
pub fn parse_max_read_request(devctl_hex: &str) -> Result<u32, HostError> {
    let register = u16::from_str_radix(devctl_hex.trim(), 16)
        .map_err(|_| HostError::Parse(format!("invalid device control value: {}", devctl_hex.trim())))?;
    let encoded = u32::from((register >> 12) & 0x7);
    if encoded > 5 {
        return Err(HostError::Parse(format!("reserved max read request encoding: {}", encoded)));
    }
    Ok(128 << encoded)
}

/// Encodes a max read request size (128..=4096, power of two) for `setpci`.
pub fn encode_max_read_request(size: u32) -> Result<u16, HostError> {
    if !(128..=4096).contains(&size) || !size.is_power_of_two() {
        return Err(HostError::InvalidArgument(format!(
            "max read request size must be a power of two between 128 and 4096, got {}",
            size
        )));
    }
    let encoded = (size / 128).trailing_zeros() as u16;
    Ok(encoded << 12)
}

/// Extracts trust mode and PFC flags from `mlnx_qos -i <iface>` output.
pub fn parse_mlnx_qos(output: &str) -> Result<(TrustMode, PfcConfig), HostError> {
    let mut trust = None;
    let mut pfc = None;
    let mut in_pfc_section = false;

    for line in output.lines() {
        let trimmed = line.trim();
        if let Some(value) = trimmed.strip_prefix("Priority trust state:") {
            trust = Some(value.parse::<TrustMode>()?);
        } else if trimmed.starts_with("PFC configuration:") {
            in_pfc_section = true;
        } else if in_pfc_section {
            if let Some(values) = trimmed.strip_prefix("enabled") {
                let flags: Vec<&str> = values.split_whitespace().collect();
                if flags.len() != PRIORITY_COUNT {
                    return Err(HostError::Parse(format!("unexpected PFC row: {}", trimmed)));
                }
                pfc = Some(flags.join(",").parse::<PfcConfig>()?);
                in_pfc_section = false;
            }
        }
    }

    match (trust, pfc) {
        (Some(trust), Some(pfc)) => Ok((trust, pfc)),
        _ => Err(HostError::Parse("mlnx_qos output is missing trust or PFC state".to_string())),
    }
}
