use std::collections::BTreeSet;

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use crate::elements::{
    HtCapabilities, MultiBand, Oui, VhtCapabilities, EXT_CAPABILITIES_LEN, HT_CAPABILITIES_LEN,
    VHT_CAPABILITIES_LEN,
};

/// Fixed part of [`Fingerprint::canonical_bytes`]: the two bitmaps, then every
/// optional block behind a one-byte presence marker.
pub const CANONICAL_LEN: usize = 4
    + 8
    + (1 + HT_CAPABILITIES_LEN)
    + (1 + EXT_CAPABILITIES_LEN)
    + (1 + 1)
    + (1 + 2)
    + (1 + VHT_CAPABILITIES_LEN);

/// Canonical capability record decoded from one probe request.
///
/// Every optional block is `None` when its element was absent or could not be
/// decoded; presence of the element itself is still reflected in `tag_presence`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub tag_presence: u32,
    pub supported_rates: u64,
    pub ht: Option<HtCapabilities>,
    pub extended_capabilities: Option<[u8; EXT_CAPABILITIES_LEN]>,
    /// Interworking access network options.
    pub interworking: Option<u8>,
    pub multi_band: Option<MultiBand>,
    pub vht: Option<VhtCapabilities>,
    pub vendor_ouis: BTreeSet<Oui>,
    /// Directed SSIDs in the order the frame carried them.
    pub ssid_list: Vec<String>,
    /// Set when the walk stopped before the end of the frame.
    pub incomplete: bool,
}

impl Fingerprint {
    /// Order-independent encoding of the capability fields. SSIDs and the
    /// `incomplete` flag are left out.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut fixed = [0u8; CANONICAL_LEN];
        BigEndian::write_u32(&mut fixed[0..4], self.tag_presence);
        BigEndian::write_u64(&mut fixed[4..12], self.supported_rates);
        let mut at = 12;

        let block = &mut fixed[at..at + 1 + HT_CAPABILITIES_LEN];
        if let Some(ht) = &self.ht {
            block[0] = 1;
            BigEndian::write_u16(&mut block[1..3], ht.capability_info);
            block[3] = ht.ampdu_params;
            block[4..20].copy_from_slice(&ht.mcs_set);
            BigEndian::write_u16(&mut block[20..22], ht.extended_capabilities);
            BigEndian::write_u32(&mut block[22..26], ht.beamforming);
            block[26] = ht.asel;
        }
        at += 1 + HT_CAPABILITIES_LEN;

        let block = &mut fixed[at..at + 1 + EXT_CAPABILITIES_LEN];
        if let Some(ext) = &self.extended_capabilities {
            block[0] = 1;
            block[1..].copy_from_slice(ext);
        }
        at += 1 + EXT_CAPABILITIES_LEN;

        if let Some(options) = self.interworking {
            fixed[at] = 1;
            fixed[at + 1] = options;
        }
        at += 2;

        if let Some(mb) = self.multi_band {
            fixed[at] = 1;
            fixed[at + 1] = mb.band_id;
            fixed[at + 2] = mb.channel;
        }
        at += 3;

        let block = &mut fixed[at..at + 1 + VHT_CAPABILITIES_LEN];
        if let Some(vht) = &self.vht {
            block[0] = 1;
            BigEndian::write_u32(&mut block[1..5], vht.capability_info);
            block[5..].copy_from_slice(&vht.mcs_nss_set);
        }

        let mut bytes = fixed.to_vec();
        for oui in &self.vendor_ouis {
            bytes.extend_from_slice(oui);
        }
        bytes
    }

    /// SHA-256 of [`Self::canonical_bytes`], hex encoded.
    pub fn digest(&self) -> String {
        sha256::digest(self.canonical_bytes())
    }
}

/// Scratch record the walker writes into while decoding one frame.
///
/// Each setter touches exactly one field, so the order elements arrive in does
/// not change the finished fingerprint.
#[derive(Debug, Default)]
pub struct FingerprintBuilder {
    scratch: Fingerprint,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presence(&self) -> u32 {
        self.scratch.tag_presence
    }

    pub fn set_presence(&mut self, presence: u32) {
        self.scratch.tag_presence = presence;
    }

    pub fn add_rate_flag(&mut self, flag: u64) {
        self.scratch.supported_rates |= flag;
    }

    pub fn ht(&mut self, ht: HtCapabilities) {
        self.scratch.ht = Some(ht);
    }

    pub fn extended_capabilities(&mut self, window: [u8; EXT_CAPABILITIES_LEN]) {
        self.scratch.extended_capabilities = Some(window);
    }

    pub fn interworking(&mut self, options: u8) {
        self.scratch.interworking = Some(options);
    }

    pub fn multi_band(&mut self, mb: MultiBand) {
        self.scratch.multi_band = Some(mb);
    }

    pub fn vht(&mut self, vht: VhtCapabilities) {
        self.scratch.vht = Some(vht);
    }

    pub fn vendor_oui(&mut self, oui: Oui) {
        self.scratch.vendor_ouis.insert(oui);
    }

    pub fn push_ssid(&mut self, ssid: String) {
        self.scratch.ssid_list.push(ssid);
    }

    pub fn mark_incomplete(&mut self) {
        self.scratch.incomplete = true;
    }

    pub fn finish(self) -> Fingerprint {
        self.scratch
    }
}
