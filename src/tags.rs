//! Tag registry: element ids and rate codes mapped onto compact bit flags.
//!
//! ref: IEEE Std. 802.11-2016, element ids from §9.4.2.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::RegistryMiss;

/// Identifies an information element. Extension elements (id 255) are keyed
/// by their extension id so they never collide with a plain element id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagId {
    Element(u8),
    Extension(u8),
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagId::Element(id) => write!(f, "{id}"),
            TagId::Extension(id) => write!(f, "255/{id}"),
        }
    }
}

impl From<u8> for TagId {
    fn from(id: u8) -> Self {
        TagId::Element(id)
    }
}

pub const SSID: u8 = 0; // §9.4.2.2
pub const SUPPORTED_RATES: u8 = 1; // §9.4.2.3
pub const DS_PARAMETER: u8 = 3; // §9.4.2.4
pub const REQUEST: u8 = 10; // §9.4.2.10
pub const HT_CAPABILITY: u8 = 45; // §9.4.2.56
pub const EXT_SUPPORTED_RATES: u8 = 50; // §9.4.2.13
pub const SUPPORTED_OPERATING_CLASSES: u8 = 59; // §9.4.2.54
pub const BSS_COEXISTENCE_20_40: u8 = 72; // §9.4.2.60
pub const SSID_LIST: u8 = 84; // §9.4.2.73
pub const CHANNEL_USAGE: u8 = 97; // §9.4.2.86
pub const INTERWORKING: u8 = 107; // §9.4.2.92
pub const MESH_ID: u8 = 114; // §9.4.2.99
pub const EXTENDED_CAPABILITIES: u8 = 127; // §9.4.2.27
pub const DMG_CAPABILITIES: u8 = 148; // §9.4.2.128
pub const MULTI_BAND: u8 = 158; // §9.4.2.138
pub const MULTIPLE_MAC_SUBLAYERS: u8 = 170; // §9.4.2.153
pub const VHT_CAPABILITY: u8 = 191; // §9.4.2.158
pub const VENDOR_SPECIFIC: u8 = 221; // §9.4.2.26
pub const ELEMENT_EXTENSION: u8 = 255;

/// Extension id of Estimated Service Parameters (§9.4.2.174).
pub const EXT_ESTIMATED_SERVICE_PARAMS: u8 = 11;

const TAGS: &[(TagId, u32, &str)] = &[
    (TagId::Element(SSID), 0x8000_0000, "SSID parameter set"),
    (TagId::Element(SUPPORTED_RATES), 0x4000_0000, "Supported Rates"),
    (TagId::Element(REQUEST), 0x2000_0000, "Request"),
    (TagId::Element(EXT_SUPPORTED_RATES), 0x1000_0000, "Extended Supported Rates"),
    (TagId::Element(DS_PARAMETER), 0x0800_0000, "DS Parameter set"),
    (
        TagId::Element(SUPPORTED_OPERATING_CLASSES),
        0x0400_0000,
        "Supported Operating Classes",
    ),
    (
        TagId::Element(HT_CAPABILITY),
        0x0200_0000,
        "HT Capabilities (802.11n D1.10)",
    ),
    (TagId::Element(BSS_COEXISTENCE_20_40), 0x0100_0000, "20/40 BSS Coexistence"),
    (TagId::Element(EXTENDED_CAPABILITIES), 0x0080_0000, "Extended Capabilities"),
    (TagId::Element(SSID_LIST), 0x0040_0000, "SSID List"),
    (TagId::Element(CHANNEL_USAGE), 0x0020_0000, "Channel Usage"),
    (TagId::Element(INTERWORKING), 0x0010_0000, "Interworking"),
    (TagId::Element(MESH_ID), 0x0008_0000, "Mesh ID"),
    (TagId::Element(MULTI_BAND), 0x0004_0000, "Multi-band"),
    (TagId::Element(DMG_CAPABILITIES), 0x0002_0000, "DMG Capabilities"),
    (TagId::Element(MULTIPLE_MAC_SUBLAYERS), 0x0001_0000, "Multiple MAC Sublayers"),
    (TagId::Element(VHT_CAPABILITY), 0x0000_8000, "VHT Capabilities"),
    (
        TagId::Extension(EXT_ESTIMATED_SERVICE_PARAMS),
        0x0000_4000,
        "Estimated Service Parameters",
    ),
    (TagId::Element(VENDOR_SPECIFIC), 0x0000_2000, "Vendor Specific"),
];

/// 0xFF is the "HT PHY required" membership selector and sets every bit.
const RATES: &[(u8, u64, &str)] = &[
    (0x02, 0x8000_0000_0000_0000, "1"),
    (0x03, 0x4000_0000_0000_0000, "1.5"),
    (0x04, 0x2000_0000_0000_0000, "2"),
    (0x05, 0x1000_0000_0000_0000, "2.5"),
    (0x06, 0x0800_0000_0000_0000, "3"),
    (0x09, 0x0400_0000_0000_0000, "4.5"),
    (0x0B, 0x0200_0000_0000_0000, "5.5"),
    (0x0C, 0x0100_0000_0000_0000, "6"),
    (0x12, 0x0080_0000_0000_0000, "9"),
    (0x16, 0x0040_0000_0000_0000, "11"),
    (0x18, 0x0020_0000_0000_0000, "12"),
    (0x1B, 0x0010_0000_0000_0000, "13.5"),
    (0x24, 0x0008_0000_0000_0000, "18"),
    (0x2C, 0x0004_0000_0000_0000, "22"),
    (0x30, 0x0002_0000_0000_0000, "24"),
    (0x36, 0x0001_0000_0000_0000, "27"),
    (0x42, 0x0000_8000_0000_0000, "33"),
    (0x48, 0x0000_4000_0000_0000, "36"),
    (0x60, 0x0000_2000_0000_0000, "48"),
    (0x6C, 0x0000_1000_0000_0000, "54"),
    (0x82, 0x0000_0800_0000_0000, "1(B)"),
    (0x83, 0x0000_0400_0000_0000, "1.5(B)"),
    (0x84, 0x0000_0200_0000_0000, "2(B)"),
    (0x85, 0x0000_0100_0000_0000, "2.5(B)"),
    (0x86, 0x0000_0080_0000_0000, "3(B)"),
    (0x89, 0x0000_0040_0000_0000, "4.5(B)"),
    (0x8B, 0x0000_0020_0000_0000, "5.5(B)"),
    (0x8C, 0x0000_0010_0000_0000, "6(B)"),
    (0x92, 0x0000_0008_0000_0000, "9(B)"),
    (0x96, 0x0000_0004_0000_0000, "11(B)"),
    (0x98, 0x0000_0002_0000_0000, "12(B)"),
    (0x9B, 0x0000_0001_0000_0000, "13.5(B)"),
    (0xA4, 0x0000_0000_8000_0000, "18(B)"),
    (0xAC, 0x0000_0000_4000_0000, "22(B)"),
    (0xB0, 0x0000_0000_2000_0000, "24(B)"),
    (0xB6, 0x0000_0000_1000_0000, "27(B)"),
    (0xC2, 0x0000_0000_0800_0000, "33(B)"),
    (0xC8, 0x0000_0000_0400_0000, "36(B)"),
    (0xE0, 0x0000_0000_0200_0000, "48(B)"),
    (0xEC, 0x0000_0000_0100_0000, "54(B)"),
    (
        0xFF,
        u64::MAX,
        "BSS requires support for mandatory features of HT PHY (IEEE 802.11 - Clause 20)",
    ),
    (0x00, 0, "NULL"),
];

#[derive(Debug, Clone, Copy)]
struct TagEntry {
    flag: u32,
    description: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct RateEntry {
    flag: u64,
    description: &'static str,
}

/// Immutable lookup tables, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    tags: BTreeMap<TagId, TagEntry>,
    rates: BTreeMap<u8, RateEntry>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TagRegistry {
    pub fn new() -> Self {
        let tags = TAGS
            .iter()
            .map(|&(id, flag, description)| (id, TagEntry { flag, description }))
            .collect();
        let rates = RATES
            .iter()
            .map(|&(code, flag, description)| (code, RateEntry { flag, description }))
            .collect();
        Self { tags, rates }
    }

    pub fn tag_flag(&self, tag: TagId) -> Result<u32, RegistryMiss> {
        self.tags
            .get(&tag)
            .map(|entry| entry.flag)
            .ok_or(RegistryMiss::UnknownTag(tag))
    }

    pub fn tag_description(&self, tag: TagId) -> Option<&'static str> {
        self.tags.get(&tag).map(|entry| entry.description)
    }

    /// Returns `presence` with the bit for `tag` set.
    pub fn mark_present(&self, tag: TagId, presence: u32) -> Result<u32, RegistryMiss> {
        Ok(presence | self.tag_flag(tag)?)
    }

    pub fn is_present(&self, tag: TagId, presence: u32) -> Result<bool, RegistryMiss> {
        Ok(presence & self.tag_flag(tag)? != 0)
    }

    pub fn rate_to_flag(&self, rate: u8) -> Result<u64, RegistryMiss> {
        self.rates
            .get(&rate)
            .map(|entry| entry.flag)
            .ok_or(RegistryMiss::UnknownRate(rate))
    }

    pub fn rate_description(&self, rate: u8) -> Option<&'static str> {
        self.rates.get(&rate).map(|entry| entry.description)
    }

    /// Every assigned tag, in bit order (most significant first).
    pub fn tags(&self) -> impl Iterator<Item = (TagId, u32)> + '_ {
        TAGS.iter().map(|&(id, flag, _)| (id, flag))
    }

    /// Tags whose bit is set in `presence`.
    pub fn present_tags(&self, presence: u32) -> Vec<TagId> {
        self.tags()
            .filter(|&(_, flag)| presence & flag != 0)
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn tag_flags_are_single_bits_and_disjoint() {
        let registry = TagRegistry::new();
        let mut seen = 0u32;
        for (id, flag) in registry.tags() {
            assert_eq!(flag.count_ones(), 1, "tag {id}");
            assert_eq!(seen & flag, 0, "tag {id} overlaps");
            seen |= flag;
        }
    }

    #[test]
    fn rate_flags_unique_except_sentinels() {
        let registry = TagRegistry::new();
        let mut seen = BTreeSet::new();
        for &(code, _, _) in RATES {
            let flag = registry.rate_to_flag(code).unwrap();
            match code {
                0x00 => assert_eq!(flag, 0),
                0xFF => assert_eq!(flag, u64::MAX),
                _ => {
                    assert_eq!(flag.count_ones(), 1, "rate {code:#04x}");
                    assert!(seen.insert(flag), "rate {code:#04x} reuses a bit");
                }
            }
        }
        assert_eq!(seen.len(), 40);
    }

    #[test]
    fn unknown_lookups() {
        let registry = TagRegistry::new();
        assert_eq!(
            registry.mark_present(TagId::Element(11), 0x10),
            Err(RegistryMiss::UnknownTag(TagId::Element(11)))
        );
        assert_eq!(
            registry.is_present(TagId::Element(200), u32::MAX),
            Err(RegistryMiss::UnknownTag(TagId::Element(200)))
        );
        assert_eq!(registry.rate_to_flag(0x07), Err(RegistryMiss::UnknownRate(0x07)));
    }

    #[test]
    fn marking_accumulates() {
        let registry = TagRegistry::new();
        let presence = registry.mark_present(SSID.into(), 0).unwrap();
        let presence = registry.mark_present(HT_CAPABILITY.into(), presence).unwrap();
        assert!(registry.is_present(SSID.into(), presence).unwrap());
        assert!(registry.is_present(HT_CAPABILITY.into(), presence).unwrap());
        assert!(!registry.is_present(VHT_CAPABILITY.into(), presence).unwrap());
        assert_eq!(
            registry.present_tags(presence),
            vec![TagId::Element(SSID), TagId::Element(HT_CAPABILITY)]
        );
    }

    #[test]
    fn extension_does_not_collide_with_element() {
        let registry = TagRegistry::new();
        let esp = TagId::Extension(EXT_ESTIMATED_SERVICE_PARAMS);
        assert_eq!(registry.tag_flag(esp), Ok(0x0000_4000));
        assert!(registry.tag_flag(TagId::Element(EXT_ESTIMATED_SERVICE_PARAMS)).is_err());
        assert_eq!(esp.to_string(), "255/11");
    }

    #[test]
    fn descriptions() {
        let registry = TagRegistry::new();
        assert_eq!(registry.rate_description(0x8B), Some("5.5(B)"));
        assert_eq!(registry.tag_description(SSID_LIST.into()), Some("SSID List"));
        assert_eq!(registry.tag_description(TagId::Element(42)), None);
    }

    proptest! {
        #[test]
        fn mark_then_test(id in any::<u8>(), start in any::<u32>()) {
            let registry = TagRegistry::new();
            let tag = TagId::Element(id);
            match registry.mark_present(tag, start) {
                Ok(presence) => {
                    prop_assert!(registry.is_present(tag, presence).unwrap());
                    prop_assert_eq!(presence & start, start);
                }
                Err(miss) => prop_assert_eq!(miss, RegistryMiss::UnknownTag(tag)),
            }
        }

        #[test]
        fn unmarked_tag_is_absent(id in any::<u8>()) {
            let registry = TagRegistry::new();
            if let Ok(present) = registry.is_present(TagId::Element(id), 0) {
                prop_assert!(!present);
            }
        }
    }
}
