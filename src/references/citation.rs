//! Citation key assignment.
//!
//! Keys are `<lastname><year>` built from the first author and publication
//! year, falling back to `untitled`. Collisions against the running set
//! (already persisted keys plus keys handed out earlier in the same call) are
//! resolved with a suffix:
//!
//! - bare `untitled` (no author, no year) gets a counter: `untitled`,
//!   `untitled1`, `untitled2`, ...
//! - every other key gets letters: `smith`, `smitha`, `smithb`, ...,
//!   `smithz`, `smithaa`, ...
//!
//! References are keyed in the order they are supplied, so the result is a
//! pure function of the input sequence and the baseline.

use std::collections::HashSet;

use crate::references::model::Reference;

/// Base key used when a reference has no usable author.
pub const UNTITLED: &str = "untitled";

/// Assign a citation key to every reference, in order.
///
/// `existing` is the baseline of already persisted keys; none of them is
/// ever returned and none is altered.
pub fn assign_citation_keys<S: AsRef<str>>(
    mut references: Vec<Reference>,
    existing: &[S],
) -> Vec<Reference> {
    let mut taken: HashSet<String> = existing.iter().map(|k| k.as_ref().to_string()).collect();

    for reference in &mut references {
        let key = next_key(reference, &taken);
        taken.insert(key.clone());
        reference.citation_key = Some(key);
    }

    references
}

/// Base key before disambiguation, and whether it is the bare `untitled` form.
pub fn base_key(reference: &Reference) -> (String, bool) {
    let author = reference.authors.first().and_then(|a| a.last_name_key());
    let year = reference.publication_year();

    let bare = author.is_none() && year.is_none();
    let mut key = author.unwrap_or_else(|| UNTITLED.to_string());
    if let Some(year) = year {
        key.push_str(&format!("{year:04}"));
    }
    (key, bare)
}

fn next_key(reference: &Reference, taken: &HashSet<String>) -> String {
    let (base, bare) = base_key(reference);
    if !taken.contains(&base) {
        return base;
    }

    (1usize..)
        .map(|n| {
            if bare {
                format!("{base}{n}")
            } else {
                format!("{base}{}", letter_suffix(n))
            }
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}

/// Bijective base-26 letters: 1 → `a`, 26 → `z`, 27 → `aa`.
fn letter_suffix(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::references::model::{Author, IngestStatus};

    fn reference(author: Option<&str>, year: Option<i32>) -> Reference {
        let mut r = Reference::new("test.pdf");
        r.status = IngestStatus::Complete;
        r.authors = author.map(|a| vec![Author::new(a)]).unwrap_or_default();
        r.published_date = year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
        r
    }

    fn keys(references: &[Reference]) -> Vec<&str> {
        references
            .iter()
            .map(|r| r.citation_key.as_deref().unwrap())
            .collect()
    }

    const NONE: &[&str] = &[];

    #[test]
    fn distinct_authors_get_plain_keys() {
        let refs = vec![
            reference(Some("John Smith"), None),
            reference(Some("Kathy Jones"), Some(2021)),
            reference(Some("Jane Doe"), Some(2022)),
        ];
        let keyed = assign_citation_keys(refs, NONE);
        assert_eq!(keys(&keyed), ["smith", "jones2021", "doe2022"]);
    }

    #[test]
    fn untitled_without_year_counts_up() {
        let refs = (0..5).map(|_| reference(None, None)).collect();
        let keyed = assign_citation_keys(refs, NONE);
        assert_eq!(
            keys(&keyed),
            ["untitled", "untitled1", "untitled2", "untitled3", "untitled4"]
        );
    }

    #[test]
    fn untitled_with_distinct_years() {
        let refs = (0..3).map(|i| reference(None, Some(2020 + i))).collect();
        let keyed = assign_citation_keys(refs, NONE);
        assert_eq!(keys(&keyed), ["untitled2020", "untitled2021", "untitled2022"]);
    }

    #[test]
    fn untitled_with_same_year_gets_letters() {
        let refs = (0..3).map(|_| reference(None, Some(2021))).collect();
        let keyed = assign_citation_keys(refs, NONE);
        assert_eq!(keys(&keyed), ["untitled2021", "untitled2021a", "untitled2021b"]);
    }

    #[test]
    fn same_author_gets_letters() {
        let refs = (0..3).map(|_| reference(Some("John Smith"), None)).collect();
        let keyed = assign_citation_keys(refs, NONE);
        assert_eq!(keys(&keyed), ["smith", "smitha", "smithb"]);

        let refs = (0..3).map(|_| reference(Some("John Smith"), Some(2021))).collect();
        let keyed = assign_citation_keys(refs, NONE);
        assert_eq!(keys(&keyed), ["smith2021", "smith2021a", "smith2021b"]);
    }

    #[test]
    fn existing_keys_are_skipped_and_never_reused() {
        let existing = ["jones2021", "jones2021a", "smith", "untitled", "untitled1"];
        let refs = vec![
            reference(Some("Kathy Jones"), Some(2021)),
            reference(Some("John Smith"), None),
            reference(None, None),
        ];
        let keyed = assign_citation_keys(refs, &existing);
        assert_eq!(keys(&keyed), ["jones2021b", "smitha", "untitled2"]);
        for key in keys(&keyed) {
            assert!(!existing.contains(&key));
        }
    }

    #[test]
    fn letters_roll_over_past_z() {
        assert_eq!(letter_suffix(1), "a");
        assert_eq!(letter_suffix(26), "z");
        assert_eq!(letter_suffix(27), "aa");
        assert_eq!(letter_suffix(28), "ab");

        let refs = (0..28).map(|_| reference(Some("Ann Lee"), None)).collect();
        let keyed = assign_citation_keys(refs, NONE);
        let keys = keys(&keyed);
        assert_eq!(keys[26], "leez");
        assert_eq!(keys[27], "leeaa");
    }

    #[test]
    fn keys_are_unique_and_deterministic() {
        let make = || {
            vec![
                reference(Some("John Smith"), None),
                reference(None, None),
                reference(Some("Jane Smith"), None),
                reference(None, Some(2019)),
                reference(None, None),
                reference(None, Some(2019)),
                reference(Some("John Smith"), Some(2019)),
            ]
        };
        let existing = ["smith", "untitled"];

        let first = assign_citation_keys(make(), &existing);
        let second = assign_citation_keys(make(), &existing);
        assert_eq!(keys(&first), keys(&second));

        let unique: HashSet<&str> = keys(&first).into_iter().collect();
        assert_eq!(unique.len(), first.len());
        assert!(unique.iter().all(|k| !existing.contains(k)));
        assert_eq!(
            keys(&first),
            [
                "smitha",
                "untitled1",
                "smithb",
                "untitled2019",
                "untitled2",
                "untitled2019a",
                "smith2019"
            ]
        );
    }

    #[test]
    fn empty_author_name_falls_back_to_untitled() {
        let keyed = assign_citation_keys(vec![reference(Some("  "), None)], NONE);
        assert_eq!(keys(&keyed), ["untitled"]);
    }
}
