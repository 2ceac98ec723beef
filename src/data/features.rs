use std::sync::LazyLock;

use regex::Regex;

use super::model::{EnrichedDataset, EnrichedRecord, RawRecord};

// ---------------------------------------------------------------------------
// Title extraction & canonicalization
// ---------------------------------------------------------------------------

/// Alphabetic token preceded by a space and directly followed by a period,
/// e.g. `"Braund, Mr. Owen Harris"` → `Mr`.
static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ([A-Za-z]+)\.").expect("title pattern is valid"));

/// Exact-match canonicalization table. Titles not listed pass through.
const TITLE_TABLE: &[(&str, &str)] = &[
    ("Lady", "Rare"),
    ("Countess", "Rare"),
    ("Capt", "Rare"),
    ("Col", "Rare"),
    ("Don", "Rare"),
    ("Dr", "Rare"),
    ("Major", "Rare"),
    ("Rev", "Rare"),
    ("Sir", "Rare"),
    ("Jonkheer", "Rare"),
    ("Dona", "Rare"),
    ("Mlle", "Miss"),
    ("Ms", "Miss"),
    ("Mme", "Mrs"),
];

/// First honorific token in a passenger name, if any.
pub fn extract_title(name: &str) -> Option<&str> {
    TITLE_PATTERN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Map rare and foreign honorifics onto the canonical set.
pub fn canonicalize_title(title: &str) -> &str {
    TITLE_TABLE
        .iter()
        .find(|(from, _)| *from == title)
        .map_or(title, |&(_, to)| to)
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Enrich a single record. Pure: reads only the raw source fields.
pub fn enrich(raw: &RawRecord) -> EnrichedRecord {
    // Counts come straight from the input file.
    let family_size = raw.sib_sp.saturating_add(raw.parch).saturating_add(1);
    let is_alone = u8::from(family_size == 1);
    let title = extract_title(&raw.name).map(|t| canonicalize_title(t).to_string());

    EnrichedRecord {
        raw: raw.clone(),
        family_size,
        is_alone,
        title,
    }
}

/// Derive `FamilySize`, `IsAlone` and `Title` for every record.
///
/// Accepts raw or already-enriched rows; derived fields are always recomputed
/// from the raw source fields, so re-deriving is a no-op.
pub fn derive<R: AsRef<RawRecord>>(records: &[R]) -> EnrichedDataset {
    EnrichedDataset::new(records.iter().map(|r| enrich(r.as_ref())).collect())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::model::Sex;
    use crate::data::model::fixtures::{passengers, raw};

    #[test]
    fn braund_is_mr_with_family_of_two() {
        let ds = derive(&[raw("Braund, Mr. Owen Harris", Sex::Male, 1, 0)]);
        let r = &ds.records()[0];
        assert_eq!(r.title.as_deref(), Some("Mr"));
        assert_eq!(r.family_size, 2);
        assert_eq!(r.is_alone, 0);
    }

    #[test]
    fn futrelle_is_mrs() {
        let ds = derive(&[raw(
            "Futrelle, Mrs. Jacques Heath (Lily May Peel)",
            Sex::Female,
            1,
            0,
        )]);
        let r = &ds.records()[0];
        assert_eq!(r.title.as_deref(), Some("Mrs"));
        assert_eq!(r.family_size, 2);
    }

    #[test]
    fn huge_counts_saturate() {
        let ds = derive(&[raw("Doe, Mr. John", Sex::Male, u32::MAX, 3)]);
        assert_eq!(ds.records()[0].family_size, u32::MAX);
        assert_eq!(ds.records()[0].is_alone, 0);
    }

    #[test]
    fn travelling_alone() {
        let ds = derive(&[raw("Heikkinen, Miss. Laina", Sex::Female, 0, 0)]);
        assert_eq!(ds.records()[0].family_size, 1);
        assert_eq!(ds.records()[0].is_alone, 1);
    }

    #[test]
    fn canonical_table() {
        assert_eq!(canonicalize_title("Mlle"), "Miss");
        assert_eq!(canonicalize_title("Ms"), "Miss");
        assert_eq!(canonicalize_title("Mme"), "Mrs");
        assert_eq!(canonicalize_title("Countess"), "Rare");
        assert_eq!(canonicalize_title("Jonkheer"), "Rare");
        assert_eq!(canonicalize_title("Master"), "Master");
        // exact matches only
        assert_eq!(canonicalize_title("dr"), "dr");
    }

    #[test]
    fn countess_in_name_becomes_rare() {
        let name = "Rothes, the Countess. of (Lucy Noel Martha Dyer-Edwards)";
        assert_eq!(extract_title(name), Some("Countess"));
        let ds = derive(&[raw(name, Sex::Female, 0, 0)]);
        assert_eq!(ds.records()[0].title.as_deref(), Some("Rare"));
    }

    #[test]
    fn missing_title_is_absent() {
        assert_eq!(extract_title("Nobody Without Honorific"), None);
        // a period without a preceding space-delimited token does not count
        assert_eq!(extract_title("Mr.Smith"), None);
        let ds = derive(&[raw("Plain Name", Sex::Male, 0, 0)]);
        assert_eq!(ds.records()[0].title, None);
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(extract_title("Doe, Mrs. John (Jane Dr. Who)"), Some("Mrs"));
    }

    #[test]
    fn derive_does_not_touch_input() {
        let input = passengers();
        let before = input.clone();
        let _ = derive(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn rederiving_is_a_no_op() {
        let once = derive(&passengers());
        let twice = derive(once.records());
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn family_size_and_is_alone_agree(sib_sp in any::<u32>(), parch in any::<u32>()) {
            let ds = derive(&[raw("Doe, Mr. John", Sex::Male, sib_sp, parch)]);
            let r = &ds.records()[0];
            prop_assert!(r.family_size >= 1);
            prop_assert!(r.is_alone <= 1);
            prop_assert_eq!(r.is_alone == 1, r.family_size == 1);
        }

        #[test]
        fn canonicalization_is_idempotent(title in "[A-Za-z]{1,10}") {
            let once = canonicalize_title(&title);
            prop_assert_eq!(canonicalize_title(once), once);
        }
    }

    #[test]
    fn canonicalization_is_idempotent_on_table() {
        for (from, _) in TITLE_TABLE {
            let once = canonicalize_title(from);
            assert_eq!(canonicalize_title(once), once);
        }
    }
}
