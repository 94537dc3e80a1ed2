use std::fmt::Write;

use probemark::{Aggregator, Field, TagRegistry};

use crate::config::ReportSettings;

pub fn render(aggregator: &Aggregator, registry: &TagRegistry, settings: &ReportSettings) -> String {
    let entropy = aggregator.entropy();
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "Fingerprints observed: {}", entropy.population_size());
    let _ = writeln!(out, "Distinct capability sets: {}", aggregator.distinct_count());
    let _ = writeln!(out, "Total field entropy: {:.3} bits", entropy.total_entropy());

    if settings.fields {
        let _ = writeln!(out, "\n{:<26} {:>10} {:>8}", "field", "entropy", "values");
        for field in Field::ALL {
            let _ = writeln!(
                out,
                "{:<26} {:>10.3} {:>8}",
                field.name(),
                entropy.field_entropy(field),
                entropy.distinct_values(field)
            );
        }
    }

    let ranked = aggregator.most_distinctive(settings.top);
    if !ranked.is_empty() {
        let _ = writeln!(out, "\nMost distinctive:");
    }
    for entry in ranked {
        let tags = registry
            .present_tags(entry.fingerprint.tag_presence)
            .into_iter()
            .map(|tag| registry.tag_description(tag).unwrap_or("?"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{} {:>7.2} bits  ~{:.1} devices  [{}]",
            &entry.digest[..16],
            entry.score,
            entry.anonymity_set,
            tags
        );
    }
    out
}
