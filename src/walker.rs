//! Walks the tagged parameters of a probe request body and folds every element
//! into a [`Fingerprint`].

use tracing::{debug, trace, warn};

use crate::elements;
use crate::error::DecodeError;
use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::tags::{self, TagId, TagRegistry};

const ELEMENT_HEADER_LEN: usize = 2;

/// Everything learned from one frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub fingerprint: Fingerprint,
    pub issues: Vec<DecodeError>,
    /// Element ids seen in the frame that have no presence bit.
    pub unknown_tags: Vec<TagId>,
}

impl Walk {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub struct FrameWalker<'r> {
    registry: &'r TagRegistry,
}

impl<'r> FrameWalker<'r> {
    pub fn new(registry: &'r TagRegistry) -> Self {
        Self { registry }
    }

    /// Decodes a management frame body with the fixed header already removed.
    ///
    /// Never reads past `body.len()`. A truncated element stops the walk and
    /// marks the fingerprint incomplete; a malformed known element only loses
    /// its own content.
    pub fn walk(&self, body: &[u8]) -> Walk {
        let mut state = WalkState {
            registry: self.registry,
            builder: FingerprintBuilder::new(),
            issues: Vec::new(),
            unknown_tags: Vec::new(),
        };

        let mut cursor = 0;
        while body.len() - cursor >= ELEMENT_HEADER_LEN {
            let id = body[cursor];
            let length = body[cursor + 1] as usize;
            let start = cursor + ELEMENT_HEADER_LEN;
            let available = body.len() - start;

            if length > available {
                state.mark(id, &body[start..]);
                let err = DecodeError::TruncatedElement {
                    id,
                    offset: cursor,
                    declared: length,
                    available,
                };
                warn!("{err}");
                state.issues.push(err);
                state.builder.mark_incomplete();
                return state.finish();
            }

            let data = &body[start..start + length];
            state.mark(id, data);
            if let Err(reason) = state.decode(id, data) {
                let err = DecodeError::MalformedKnownIe {
                    id,
                    offset: cursor,
                    reason,
                };
                debug!("{err}");
                state.issues.push(err);
            }
            cursor = start + length;
        }

        if cursor < body.len() {
            let err = DecodeError::TrailingGarbage {
                offset: cursor,
                remaining: body.len() - cursor,
            };
            debug!("{err}");
            state.issues.push(err);
        }
        state.finish()
    }
}

struct WalkState<'r> {
    registry: &'r TagRegistry,
    builder: FingerprintBuilder,
    issues: Vec<DecodeError>,
    unknown_tags: Vec<TagId>,
}

impl WalkState<'_> {
    fn finish(self) -> Walk {
        Walk {
            fingerprint: self.builder.finish(),
            issues: self.issues,
            unknown_tags: self.unknown_tags,
        }
    }

    /// Records presence for the element. `data` may be cut short when the
    /// element is truncated; extension ids are read from it when available.
    fn mark(&mut self, id: u8, data: &[u8]) {
        let tag = match (id, data.first()) {
            (tags::ELEMENT_EXTENSION, Some(&ext)) => TagId::Extension(ext),
            _ => TagId::Element(id),
        };
        match self.registry.mark_present(tag, self.builder.presence()) {
            Ok(presence) => self.builder.set_presence(presence),
            Err(miss) => {
                trace!("{miss}");
                if !self.unknown_tags.contains(&tag) {
                    self.unknown_tags.push(tag);
                }
            }
        }
    }

    fn add_rates(&mut self, rates: &[u8]) {
        for &rate in rates {
            match self.registry.rate_to_flag(rate) {
                Ok(flag) => self.builder.add_rate_flag(flag),
                Err(miss) => trace!("{miss}"),
            }
        }
    }

    fn decode(&mut self, id: u8, data: &[u8]) -> Result<(), String> {
        match id {
            tags::SSID => self.builder.push_ssid(elements::ssid(data)?),
            tags::SUPPORTED_RATES => self.add_rates(elements::supported_rates(data)?),
            tags::EXT_SUPPORTED_RATES => {
                self.add_rates(elements::extended_supported_rates(data)?)
            }
            tags::HT_CAPABILITY => self.builder.ht(elements::ht_capabilities(data)?),
            tags::EXTENDED_CAPABILITIES => self
                .builder
                .extended_capabilities(elements::extended_capabilities(data)?),
            tags::INTERWORKING => self.builder.interworking(elements::interworking(data)?),
            tags::MULTI_BAND => self.builder.multi_band(elements::multi_band(data)?),
            tags::VHT_CAPABILITY => self.builder.vht(elements::vht_capabilities(data)?),
            tags::SSID_LIST => {
                for ssid in elements::ssid_list(data)? {
                    self.builder.push_ssid(ssid);
                }
            }
            tags::VENDOR_SPECIFIC => self.builder.vendor_oui(elements::vendor_oui(data)?),
            tags::ELEMENT_EXTENSION => {
                elements::extension_id(data)?;
            }
            // presence only
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::HT_CAPABILITIES_LEN;
    use proptest::prelude::*;

    fn element(id: u8, data: &[u8]) -> Vec<u8> {
        let mut out = vec![id, data.len() as u8];
        out.extend_from_slice(data);
        out
    }

    fn ht_element() -> Vec<u8> {
        let mut data = vec![0u8; HT_CAPABILITIES_LEN];
        data[0] = 0xEF;
        data[1] = 0x01;
        data[2] = 0x17;
        element(tags::HT_CAPABILITY, &data)
    }

    fn walk(body: &[u8]) -> Walk {
        let registry = TagRegistry::new();
        FrameWalker::new(&registry).walk(body)
    }

    fn flag(registry: &TagRegistry, id: u8) -> u32 {
        registry.tag_flag(TagId::Element(id)).unwrap()
    }

    #[test]
    fn basic_probe() {
        let registry = TagRegistry::new();
        let mut body = element(tags::SSID, &[]);
        body.extend(element(tags::SUPPORTED_RATES, &[0x82, 0x84, 0x0C]));
        body.extend(ht_element());

        let walk = FrameWalker::new(&registry).walk(&body);
        let fp = &walk.fingerprint;
        assert!(walk.is_clean());
        assert_eq!(
            fp.tag_presence,
            flag(&registry, tags::SSID)
                | flag(&registry, tags::SUPPORTED_RATES)
                | flag(&registry, tags::HT_CAPABILITY)
        );
        assert_eq!(fp.supported_rates.count_ones(), 3);
        assert_eq!(fp.ssid_list, vec![String::new()]);
        assert_eq!(fp.ht.map(|ht| ht.ampdu_params), Some(0x17));
        assert!(!fp.incomplete);
    }

    #[test]
    fn truncated_ssid_list_halts() {
        let registry = TagRegistry::new();
        let walk = FrameWalker::new(&registry).walk(&[84, 10, 0x01, 0x02]);
        assert_eq!(
            walk.issues,
            vec![DecodeError::TruncatedElement {
                id: 84,
                offset: 0,
                declared: 10,
                available: 2
            }]
        );
        assert!(registry
            .is_present(TagId::Element(tags::SSID_LIST), walk.fingerprint.tag_presence)
            .unwrap());
        assert!(walk.fingerprint.incomplete);
        assert!(walk.fingerprint.ssid_list.is_empty());
    }

    #[test]
    fn truncation_keeps_prefix() {
        let mut body = element(tags::SUPPORTED_RATES, &[0x02, 0x04]);
        body.extend([tags::VHT_CAPABILITY, 12, 0x00]);
        let walk = walk(&body);
        assert_eq!(walk.fingerprint.supported_rates.count_ones(), 2);
        assert!(walk.fingerprint.vht.is_none());
        assert!(walk.fingerprint.incomplete);
    }

    #[test]
    fn malformed_known_ie_continues() {
        let registry = TagRegistry::new();
        let mut body = element(tags::HT_CAPABILITY, &[0x01, 0x02, 0x03]);
        body.extend(element(tags::INTERWORKING, &[0x1F]));

        let walk = FrameWalker::new(&registry).walk(&body);
        assert!(matches!(
            walk.issues.as_slice(),
            [DecodeError::MalformedKnownIe { id: 45, offset: 0, .. }]
        ));
        let fp = walk.fingerprint;
        assert!(fp.ht.is_none());
        assert_eq!(fp.interworking, Some(0x1F));
        assert!(registry
            .is_present(TagId::Element(tags::HT_CAPABILITY), fp.tag_presence)
            .unwrap());
        assert!(!fp.incomplete);
    }

    #[test]
    fn trailing_byte_is_reported() {
        let mut body = element(tags::SSID, b"cafe");
        body.push(0xDD);
        let walk = walk(&body);
        assert_eq!(
            walk.issues,
            vec![DecodeError::TrailingGarbage {
                offset: 6,
                remaining: 1
            }]
        );
        assert_eq!(walk.fingerprint.ssid_list, vec!["cafe".to_string()]);
        assert!(!walk.fingerprint.incomplete);
    }

    #[test]
    fn unknown_tags_are_tracked_without_bits() {
        let mut body = element(42, &[0x00]);
        body.extend(element(42, &[0x00]));
        body.extend(element(11, &[0, 0, 0, 0, 0]));
        let walk = walk(&body);
        assert_eq!(walk.fingerprint.tag_presence, 0);
        assert_eq!(
            walk.unknown_tags,
            vec![TagId::Element(42), TagId::Element(11)]
        );
        assert!(walk.is_clean());
    }

    #[test]
    fn estimated_service_params_extension() {
        let registry = TagRegistry::new();
        let walk = FrameWalker::new(&registry).walk(&element(255, &[11, 0x00, 0x00, 0x00]));
        let esp = TagId::Extension(tags::EXT_ESTIMATED_SERVICE_PARAMS);
        assert!(registry.is_present(esp, walk.fingerprint.tag_presence).unwrap());

        let walk = FrameWalker::new(&registry).walk(&element(255, &[35, 0x00]));
        assert_eq!(walk.fingerprint.tag_presence, 0);
        assert_eq!(walk.unknown_tags, vec![TagId::Extension(35)]);
    }

    #[test]
    fn zero_length_elements_advance() {
        let body: Vec<u8> = (0..50).flat_map(|_| [tags::REQUEST, 0]).collect();
        let walk = walk(&body);
        assert!(walk.is_clean());
        assert_ne!(walk.fingerprint.tag_presence, 0);
    }

    #[test]
    fn ssid_list_and_vendor() {
        let mut body = element(tags::SSID, b"a");
        body.extend(element(tags::SSID_LIST, &[0, 1, b'b', 0, 1, b'a']));
        body.extend(element(tags::VENDOR_SPECIFIC, &[0x00, 0x50, 0xF2, 0x08]));
        body.extend(element(tags::VENDOR_SPECIFIC, &[0x00, 0x17, 0xF2, 0x0A]));
        body.extend(element(tags::VENDOR_SPECIFIC, &[0x00, 0x50, 0xF2, 0x04]));
        let fp = walk(&body).fingerprint;
        assert_eq!(fp.ssid_list, vec!["a", "b", "a"]);
        assert_eq!(fp.vendor_ouis.len(), 2);
    }

    #[test]
    fn all_ones_rate_sets_every_bit() {
        let fp = walk(&element(tags::EXT_SUPPORTED_RATES, &[0xFF, 0x30])).fingerprint;
        assert_eq!(fp.supported_rates, u64::MAX);
    }

    fn reorderable_elements() -> Vec<Vec<u8>> {
        let mut multi_band = vec![0x00, 0x04, 0x80, 0x02];
        multi_band.resize(elements::MULTI_BAND_MIN_LEN, 0);
        vec![
            element(tags::SUPPORTED_RATES, &[0x02, 0x04, 0x0B, 0x16]),
            element(tags::EXT_SUPPORTED_RATES, &[0x0C, 0x12, 0x18, 0x24]),
            ht_element(),
            element(tags::EXTENDED_CAPABILITIES, &[0x00, 0x00, 0x08, 0x04]),
            element(tags::INTERWORKING, &[0x0F]),
            element(tags::MULTI_BAND, &multi_band),
            element(tags::VHT_CAPABILITY, &[0x91, 0x59, 0x82, 0x0F, 0xEA, 0xFF, 0, 0, 0xEA, 0xFF, 0, 0]),
            element(tags::VENDOR_SPECIFIC, &[0x00, 0x50, 0xF2, 0x08, 0x00]),
            element(tags::DS_PARAMETER, &[6]),
            element(42, &[1, 2, 3]),
        ]
    }

    proptest! {
        #[test]
        fn never_panics_and_terminates(body in proptest::collection::vec(any::<u8>(), 0..512)) {
            let walk = walk(&body);
            for issue in &walk.issues {
                match issue {
                    DecodeError::TruncatedElement { offset, .. }
                    | DecodeError::MalformedKnownIe { offset, .. }
                    | DecodeError::TrailingGarbage { offset, .. } => prop_assert!(*offset < body.len()),
                }
            }
        }

        #[test]
        fn order_independent(order in Just((0..10usize).collect::<Vec<_>>()).prop_shuffle()) {
            let parts = reorderable_elements();
            let forward: Vec<u8> = parts.concat();
            let shuffled: Vec<u8> = order.iter().flat_map(|&i| parts[i].clone()).collect();
            let a = walk(&forward).fingerprint;
            let b = walk(&shuffled).fingerprint;
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.digest(), b.digest());
        }
    }
}
