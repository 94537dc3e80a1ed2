//! Length-checked decoders for the information elements a probe request carries.
//!
//! Each decoder takes the element body (header already consumed) and either
//! returns a typed value or a reason the body does not fit the element's layout.

use nom::bytes::complete::take;
use nom::combinator::map;
use nom::number::complete::{le_u16, le_u32, u8};
use nom::sequence::tuple;
use nom::IResult;
use serde::{Deserialize, Serialize};

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_SUPPORTED_RATES_LEN: usize = 8;
pub const HT_MCS_SET_LEN: usize = 16;
pub const HT_CAPABILITIES_LEN: usize = 2 + 1 + HT_MCS_SET_LEN + 2 + 4 + 1;
/// 9 * 8 = 72 capability bits, which covers nearly all of them.
pub const EXT_CAPABILITIES_LEN: usize = 9;
pub const VHT_MCS_NSS_SET_LEN: usize = 8;
pub const VHT_CAPABILITIES_LEN: usize = 4 + VHT_MCS_NSS_SET_LEN;
/// control, band id, operating class, channel, bssid, beacon interval,
/// tsf offset, connection capability, fst session timeout
pub const MULTI_BAND_MIN_LEN: usize = 1 + 1 + 1 + 1 + 6 + 2 + 8 + 1 + 1;
pub const OUI_LEN: usize = 3;

pub type Oui = [u8; OUI_LEN];

/// HT Capabilities (§9.4.2.56).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HtCapabilities {
    pub capability_info: u16,
    pub ampdu_params: u8,
    pub mcs_set: [u8; HT_MCS_SET_LEN],
    pub extended_capabilities: u16,
    /// Transmit beamforming capabilities.
    pub beamforming: u32,
    pub asel: u8,
}

/// VHT Capabilities (§9.4.2.158).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VhtCapabilities {
    pub capability_info: u32,
    pub mcs_nss_set: [u8; VHT_MCS_NSS_SET_LEN],
}

/// The parts of a Multi-band element (§9.4.2.138) that describe the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MultiBand {
    pub band_id: u8,
    pub channel: u8,
}

fn array<const N: usize>(input: &[u8]) -> IResult<&[u8], [u8; N]> {
    map(take(N), |bytes: &[u8]| {
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        out
    })(input)
}

fn expect_len(data: &[u8], len: usize) -> Result<(), String> {
    if data.len() == len {
        Ok(())
    } else {
        Err(format!("expected {len} bytes, got {}", data.len()))
    }
}

fn expect_min_len(data: &[u8], len: usize) -> Result<(), String> {
    if data.len() >= len {
        Ok(())
    } else {
        Err(format!("expected at least {len} bytes, got {}", data.len()))
    }
}

fn run<'a, T>(
    data: &'a [u8],
    mut parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
) -> Result<T, String> {
    parser(data)
        .map(|(_, value)| value)
        .map_err(|e| e.to_string())
}

pub fn ssid(data: &[u8]) -> Result<String, String> {
    if data.len() > MAX_SSID_LEN {
        return Err(format!(
            "ssid is {} bytes, at most {MAX_SSID_LEN} allowed",
            data.len()
        ));
    }
    Ok(String::from_utf8_lossy(data).into_owned())
}

pub fn supported_rates(data: &[u8]) -> Result<&[u8], String> {
    if data.is_empty() || data.len() > MAX_SUPPORTED_RATES_LEN {
        return Err(format!(
            "expected 1 to {MAX_SUPPORTED_RATES_LEN} rates, got {}",
            data.len()
        ));
    }
    Ok(data)
}

pub fn extended_supported_rates(data: &[u8]) -> Result<&[u8], String> {
    if data.is_empty() {
        return Err("no rates listed".to_string());
    }
    Ok(data)
}

pub fn ht_capabilities(data: &[u8]) -> Result<HtCapabilities, String> {
    expect_len(data, HT_CAPABILITIES_LEN)?;
    run(
        data,
        map(
            tuple((le_u16, u8, array::<HT_MCS_SET_LEN>, le_u16, le_u32, u8)),
            |(capability_info, ampdu_params, mcs_set, extended_capabilities, beamforming, asel)| {
                HtCapabilities {
                    capability_info,
                    ampdu_params,
                    mcs_set,
                    extended_capabilities,
                    beamforming,
                    asel,
                }
            },
        ),
    )
}

/// Copies the first [`EXT_CAPABILITIES_LEN`] octets, zero-padding shorter elements.
pub fn extended_capabilities(data: &[u8]) -> Result<[u8; EXT_CAPABILITIES_LEN], String> {
    expect_min_len(data, 1)?;
    let mut window = [0u8; EXT_CAPABILITIES_LEN];
    let n = data.len().min(EXT_CAPABILITIES_LEN);
    window[..n].copy_from_slice(&data[..n]);
    Ok(window)
}

/// Access network options octet. Venue info (2) and HESSID (6) are optional.
pub fn interworking(data: &[u8]) -> Result<u8, String> {
    match data.len() {
        1 | 3 | 7 | 9 => run(data, u8),
        n => Err(format!("expected 1, 3, 7 or 9 bytes, got {n}")),
    }
}

pub fn multi_band(data: &[u8]) -> Result<MultiBand, String> {
    expect_min_len(data, MULTI_BAND_MIN_LEN)?;
    run(
        data,
        map(
            tuple((u8, u8, u8, u8)),
            |(_control, band_id, _operating_class, channel)| MultiBand { band_id, channel },
        ),
    )
}

pub fn vht_capabilities(data: &[u8]) -> Result<VhtCapabilities, String> {
    expect_len(data, VHT_CAPABILITIES_LEN)?;
    run(
        data,
        map(
            tuple((le_u32, array::<VHT_MCS_NSS_SET_LEN>)),
            |(capability_info, mcs_nss_set)| VhtCapabilities {
                capability_info,
                mcs_nss_set,
            },
        ),
    )
}

/// SSID List (§9.4.2.73): a run of nested SSID elements that must fill the body exactly.
pub fn ssid_list(data: &[u8]) -> Result<Vec<String>, String> {
    let mut ssids = Vec::new();
    let mut cursor = 0;
    while cursor < data.len() {
        let remaining = data.len() - cursor;
        if remaining < 2 {
            return Err(format!("{remaining} stray byte(s) after ssid {}", ssids.len()));
        }
        let (id, length) = (data[cursor], data[cursor + 1] as usize);
        if id != crate::tags::SSID {
            return Err(format!("sub-element {} has id {id}, expected ssid", ssids.len()));
        }
        let end = cursor + 2 + length;
        if end > data.len() {
            return Err(format!(
                "sub-element {} declares {length} bytes but only {} remain",
                ssids.len(),
                remaining - 2
            ));
        }
        ssids.push(ssid(&data[cursor + 2..end])?);
        cursor = end;
    }
    Ok(ssids)
}

pub fn vendor_oui(data: &[u8]) -> Result<Oui, String> {
    expect_min_len(data, OUI_LEN)?;
    run(data, array::<OUI_LEN>)
}

pub fn extension_id(data: &[u8]) -> Result<u8, String> {
    expect_min_len(data, 1)?;
    run(data, u8)
}
