use anyhow::Result;
use libwifi::Addresses;
use libwifi::parsers::{parse_frame_control, parse_management_header};
use libwifi::FrameSubType;
use radiotap::Radiotap;

use crate::config::FcsMode;

const FCS_LEN: usize = 4;

/// A probe request with its management header stripped.
#[derive(Debug)]
pub struct ProbeRequest<'a> {
    pub source: [u8; 6],
    /// Tagged parameters. Probe requests have no fixed fields.
    pub body: &'a [u8],
}

/// Locally administered addresses are what randomizing stations use.
pub fn is_randomized(mac: &[u8; 6]) -> bool {
    mac[0] & 0x02 != 0
}

pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

// modified from libwifi::parse_frame, keeping the element bytes undecoded
pub fn parse(input: &[u8]) -> Result<Option<ProbeRequest<'_>>, libwifi::error::Error> {
    let (input, frame_control) = parse_frame_control(input)?;

    match frame_control.frame_subtype {
        FrameSubType::ProbeRequest => (),
        _ => return Ok(None),
    };

    let (body, header) = parse_management_header(frame_control, input)?;
    let source = match header.src() {
        Some(x) => x.0,
        None => return Ok(None),
    };

    Ok(Some(ProbeRequest { source, body }))
}

/// Strips radiotap and, when there is one, the trailing FCS before parsing.
pub fn handle_packet(data: &[u8], fcs: FcsMode) -> Result<Option<ProbeRequest<'_>>> {
    let radiotap = Radiotap::from_bytes(data)?;
    let mut payload = &data[radiotap.header.length..];

    let has_fcs = match fcs {
        FcsMode::Auto => radiotap.flags.map_or(false, |flags| flags.fcs),
        FcsMode::Present => true,
        FcsMode::Absent => false,
    };
    if has_fcs && payload.len() >= FCS_LEN {
        payload = &payload[..payload.len() - FCS_LEN];
    }

    Ok(parse(payload)?)
}
