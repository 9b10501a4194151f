//! Identity folding shared by every comparison site.
//!
//! All identity comparisons in the engine go through [`normalize`]. Introducing a
//! second folding scheme anywhere breaks key equality between adapters.

/// Lowercase the input and drop every character outside `[a-z0-9]`.
pub fn normalize(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Identity key for a candidate.
///
/// Album and track matches carry the artist they belong to, which prefixes the key
/// so that two albums with the same title by different artists stay apart.
pub fn identity_key(name: &str, associated_artist: Option<&str>) -> String {
    match associated_artist {
        Some(artist) if !artist.trim().is_empty() => normalize(&format!("{}-{}", artist, name)),
        _ => normalize(name),
    }
}

/// Fuzzy equality: one normalized form contains the other.
///
/// Empty normalized forms never match anything.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    normalized_match(&a, &b)
}

/// [`names_match`] for values that are already normalized.
pub fn normalized_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(b) || b.contains(a)
}

/// A user query together with its folded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub raw: String,
    pub normalized: String,
}

impl Query {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }

    /// True when nothing searchable is left after folding.
    pub fn is_blank(&self) -> bool {
        self.normalized.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("Radio-Head!"), normalize("RADIOHEAD"));
        assert_eq!(normalize("Godspeed You! Black Emperor"), "godspeedyoublackemperor");
        assert_eq!(normalize("  "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["Sigur Rós", "AC/DC", "µ-Ziq", "100 gecs", "", "!!!"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_normalize_drops_non_ascii_letters() {
        // Accented letters fold away rather than being transliterated.
        assert_eq!(normalize("Sigur Rós"), "sigurrs");
    }

    #[test]
    fn test_identity_key_with_associated_artist() {
        assert_eq!(identity_key("Kid A", Some("Radiohead")), "radioheadkida");
        assert_eq!(identity_key("Kid A", None), "kida");
        assert_eq!(identity_key("Kid A", Some("  ")), "kida");
    }

    #[test]
    fn test_names_match_containment_either_direction() {
        assert!(names_match("The Mountain Goats", "mountain goats"));
        assert!(names_match("goats", "The Mountain Goats"));
        assert!(!names_match("Radiohead", "Portishead"));
        assert!(!names_match("", "anything"));
        assert!(!names_match("!!!", "anything"));
    }

    #[test]
    fn test_query_blank() {
        assert!(Query::new("  -- ").is_blank());
        let q = Query::new("Big Thief");
        assert_eq!(q.normalized, "bigthief");
        assert!(!q.is_blank());
    }
}
