//! Helpers over the HGVS-like canonical variant grammar.
//!
//! Canonical strings are either a sentinel (`_wt`, `_sy`) or a
//! comma-space-joined list of tokens such as `c.6A>C (p.Lys2Asn)`,
//! `n.4T>G`, or `c.3_4insTTT (p.Met1fs)`.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::{MUTATION_SEPARATOR, SYNONYMOUS_VARIANT, WILD_TYPE_VARIANT};

/// Errors from parsing canonical variant strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HgvsError {
    /// A coding operation was applied to a string without protein annotations.
    #[error("invalid coding variant string")]
    NotCoding,
}

fn re_protein_group() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((p\.[^)\s]+)\)").unwrap())
}

/// Whether the variant contains an unresolvable amino-acid change.
///
/// Unresolvable changes come from `N`/`X` bases or from frameshifts leaving
/// a partial codon; both render the `???` placeholder.
pub fn has_unresolvable(variant: &str) -> bool {
    variant.contains("???")
}

/// Collapse a coding variant string to its protein-level changes.
///
/// Returns the sentinels unchanged, the synonymous sentinel when every
/// change is `p.=`, and otherwise the deduplicated, order-preserving list of
/// protein tokens. Strings without any protein annotation are rejected.
pub fn protein_variant(variant: &str) -> Result<String, HgvsError> {
    if variant == WILD_TYPE_VARIANT || variant == SYNONYMOUS_VARIANT {
        return Ok(variant.to_string());
    }
    let mut seen = std::collections::BTreeSet::new();
    seen.insert("p.=".to_string());
    let mut unique = Vec::new();
    let mut any = false;
    for capture in re_protein_group().captures_iter(variant) {
        any = true;
        let token = capture[1].to_string();
        if seen.insert(token.clone()) {
            unique.push(token);
        }
    }
    if !any {
        return Err(HgvsError::NotCoding);
    }
    if unique.is_empty() {
        Ok(SYNONYMOUS_VARIANT.to_string())
    } else {
        Ok(unique.join(MUTATION_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolvable_detection() {
        assert!(has_unresolvable("c.6A>C (p.???2???)"));
        assert!(!has_unresolvable("c.6A>C (p.Lys2Asn)"));
    }

    #[test]
    fn protein_collapse() {
        assert_eq!(protein_variant("_wt").unwrap(), "_wt");
        assert_eq!(
            protein_variant("c.6A>C (p.Lys2Asn)").unwrap(),
            "p.Lys2Asn"
        );
        assert_eq!(protein_variant("c.6A>G (p.=)").unwrap(), "_sy");
        assert_eq!(
            protein_variant("c.3A>C (p.Lys1Asn), c.6A>G (p.=)").unwrap(),
            "p.Lys1Asn"
        );
        assert_eq!(protein_variant("n.6A>C"), Err(HgvsError::NotCoding));
    }

    #[test]
    fn protein_collapse_deduplicates() {
        let v = "c.1A>C (p.Lys1Gln), c.2A>C (p.Lys1Gln)";
        assert_eq!(protein_variant(v).unwrap(), "p.Lys1Gln");
    }
}
