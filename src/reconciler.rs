//! Deduplication and normalization of the combined record stream
//!
//! Overlapping partitions (an employee named "Anna Berg" appears under both
//! "a" and "b" queries) mean the raw stream carries duplicates. The
//! reconciler reduces it to one canonical record per identity, in two
//! ordered passes:
//!
//! 1. records with a non-empty normalized email: one survivor per email
//! 2. records with an empty email: one survivor per profile URL
//!
//! First occurrence in input order wins within each pass. The passes never
//! cross-check: an emailless record sharing a profile URL with an emailed
//! record is retained as a distinct canonical record.

use crate::types::{CanonicalRecord, RawRecord};
use std::collections::HashSet;

/// Produces the canonical record set from raw harvested records
///
/// Reconciliation is deterministic and idempotent: the same input set yields
/// the same output set regardless of partition processing order, and the
/// output is stably ordered by (name, email, profile URL).
pub struct Reconciler {
    institution: String,
}

impl Reconciler {
    /// Create a reconciler stamping the given institution label onto every
    /// canonical record
    pub fn new(institution: impl Into<String>) -> Self {
        Self {
            institution: institution.into(),
        }
    }

    /// Reduce the raw stream to the canonical set
    pub fn reconcile(&self, records: Vec<RawRecord>) -> Vec<CanonicalRecord> {
        let input_len = records.len();

        let mut seen_emails: HashSet<String> = HashSet::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut with_email: Vec<CanonicalRecord> = Vec::new();
        let mut without_email: Vec<CanonicalRecord> = Vec::new();

        for raw in records {
            let email = normalize_email(&raw.email);
            let profile_url = raw.profile_url.trim().to_string();

            if email.is_empty() {
                // Pass 2 membership: emailless records dedup by profile URL
                if !seen_urls.insert(profile_url.clone()) {
                    continue;
                }
                without_email.push(self.canonical(raw, email, profile_url));
            } else {
                // Pass 1 membership: one survivor per distinct email
                if !seen_emails.insert(email.clone()) {
                    continue;
                }
                with_email.push(self.canonical(raw, email, profile_url));
            }
        }

        let mut canonical: Vec<CanonicalRecord> = with_email;
        canonical.extend(without_email);

        // Stable output order for reproducibility; first-seen already
        // decided which duplicate survived.
        canonical.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.email.cmp(&b.email))
                .then_with(|| a.profile_url.cmp(&b.profile_url))
        });

        tracing::info!(
            input = input_len,
            unique = canonical.len(),
            "reconciled raw records into canonical set"
        );

        canonical
    }

    fn canonical(&self, raw: RawRecord, email: String, profile_url: String) -> CanonicalRecord {
        CanonicalRecord {
            name: raw.name,
            email,
            position: raw.position,
            profile_url,
            institution: self.institution.clone(),
        }
    }
}

/// Trim and lowercase an email for identity comparison
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PartitionToken;

    fn raw(name: &str, email: &str, url: &str, partition: &str) -> RawRecord {
        RawRecord {
            name: name.to_string(),
            email: email.to_string(),
            position: "Researcher".to_string(),
            profile_url: url.to_string(),
            partition: PartitionToken::from(partition),
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new("NTNU")
    }

    #[test]
    fn duplicate_emails_keep_first_seen_record() {
        let records = vec![
            raw("Anna Berg", "anna.berg@example.edu", "https://x/anna1", "a"),
            raw("A. Berg", "anna.berg@example.edu", "https://x/anna2", "b"),
            raw("Carl Dahl", "carl.dahl@example.edu", "https://x/carl", "c"),
        ];

        let canonical = reconciler().reconcile(records);

        assert_eq!(canonical.len(), 2);
        let anna = canonical
            .iter()
            .find(|r| r.email == "anna.berg@example.edu")
            .expect("anna must survive");
        assert_eq!(
            anna.profile_url, "https://x/anna1",
            "first occurrence in input order wins"
        );
    }

    #[test]
    fn email_comparison_is_case_and_whitespace_insensitive() {
        let records = vec![
            raw("Anna Berg", "  Anna.Berg@Example.EDU ", "https://x/anna1", "a"),
            raw("Anna Berg", "anna.berg@example.edu", "https://x/anna2", "b"),
        ];

        let canonical = reconciler().reconcile(records);

        assert_eq!(canonical.len(), 1);
        assert_eq!(
            canonical[0].email, "anna.berg@example.edu",
            "surviving record carries the normalized email"
        );
    }

    #[test]
    fn emailless_records_dedup_by_profile_url() {
        let records = vec![
            raw("Eva Foss", "", "https://x/eva", "e"),
            raw("Eva Foss", "", "https://x/eva", "f"),
            raw("Gro Haug", "", "https://x/gro", "g"),
        ];

        let canonical = reconciler().reconcile(records);

        assert_eq!(canonical.len(), 2);
        assert!(canonical.iter().any(|r| r.profile_url == "https://x/eva"));
        assert!(canonical.iter().any(|r| r.profile_url == "https://x/gro"));
    }

    #[test]
    fn emailless_record_with_unique_url_is_retained_exactly_once() {
        let records = vec![raw("Ida Juul", "", "https://x/ida", "i")];

        let canonical = reconciler().reconcile(records);

        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical[0].name, "Ida Juul");
        assert_eq!(canonical[0].email, "");
    }

    #[test]
    fn url_duplicate_of_emailed_record_is_retained() {
        // The two passes never cross-check: the emailless record shares its
        // URL with an emailed one and still survives as its own record.
        let records = vec![
            raw("Kari Lund", "kari.lund@example.edu", "https://x/kari", "k"),
            raw("Kari Lund", "", "https://x/kari", "l"),
        ];

        let canonical = reconciler().reconcile(records);

        assert_eq!(
            canonical.len(),
            2,
            "email-keyed and URL-keyed passes are disjoint by design"
        );
    }

    #[test]
    fn reconcile_is_idempotent() {
        let records = vec![
            raw("Anna Berg", "anna@example.edu", "https://x/anna", "a"),
            raw("Anna Berg", "ANNA@example.edu", "https://x/anna-dup", "b"),
            raw("Eva Foss", "", "https://x/eva", "e"),
            raw("Eva Foss", "", "https://x/eva", "f"),
        ];

        let first = reconciler().reconcile(records.clone());

        // Feeding the canonical set back through (as raw records) must not
        // change it
        let as_raw: Vec<RawRecord> = first
            .iter()
            .map(|c| raw(&c.name, &c.email, &c.profile_url, "x"))
            .collect();
        let second = reconciler().reconcile(as_raw);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.email, b.email);
            assert_eq!(a.profile_url, b.profile_url);
        }
    }

    #[test]
    fn output_set_is_invariant_under_partition_permutation() {
        let from_a = vec![
            raw("Anna Berg", "anna@example.edu", "https://x/anna", "a"),
            raw("Arne Moe", "arne@example.edu", "https://x/arne", "a"),
        ];
        let from_b = vec![
            raw("Anna Berg", "anna@example.edu", "https://x/anna-b", "b"),
            raw("Berit Nes", "berit@example.edu", "https://x/berit", "b"),
        ];

        let mut order_ab = from_a.clone();
        order_ab.extend(from_b.clone());
        let mut order_ba = from_b;
        order_ba.extend(from_a);

        let result_ab = reconciler().reconcile(order_ab);
        let result_ba = reconciler().reconcile(order_ba);

        // Same identity set either way; only the duplicate's surviving
        // profile_url depends on which partition came first
        let emails_ab: Vec<&str> = result_ab.iter().map(|r| r.email.as_str()).collect();
        let emails_ba: Vec<&str> = result_ba.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails_ab, emails_ba);
        assert_eq!(result_ab.len(), 3);
    }

    #[test]
    fn output_is_sorted_by_name_then_email_then_url() {
        let records = vec![
            raw("Zoe Aas", "zoe@example.edu", "https://x/zoe", "z"),
            raw("Anna Berg", "anna@example.edu", "https://x/anna", "a"),
            raw("Anna Berg", "", "https://x/other-anna", "a"),
        ];

        let canonical = reconciler().reconcile(records);

        assert_eq!(canonical.len(), 3);
        assert_eq!(canonical[0].name, "Anna Berg");
        assert_eq!(canonical[1].name, "Anna Berg");
        assert_eq!(canonical[2].name, "Zoe Aas");
        // Empty email sorts before the non-empty one for the same name
        assert_eq!(canonical[0].email, "");
        assert_eq!(canonical[1].email, "anna@example.edu");
    }

    #[test]
    fn institution_label_is_stamped_on_every_record() {
        let records = vec![
            raw("Anna Berg", "anna@example.edu", "https://x/anna", "a"),
            raw("Eva Foss", "", "https://x/eva", "e"),
        ];

        let canonical = Reconciler::new("UiT").reconcile(records);

        assert!(canonical.iter().all(|r| r.institution == "UiT"));
    }

    #[test]
    fn scenario_two_unique_emails_and_one_duplicate_yield_two_records() {
        // Partition "a", one page, 3 docs: 2 unique emails, 1 duplicating
        // the second
        let records = vec![
            raw("Anna Berg", "anna@example.edu", "https://x/anna", "a"),
            raw("Arne Moe", "arne@example.edu", "https://x/arne", "a"),
            raw("Arne Moe jr.", "arne@example.edu", "https://x/arne-jr", "a"),
        ];

        let canonical = reconciler().reconcile(records);

        assert_eq!(canonical.len(), 2);
    }

    #[test]
    fn empty_input_reconciles_to_empty_output() {
        assert!(reconciler().reconcile(Vec::new()).is_empty());
    }
}
