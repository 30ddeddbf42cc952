//! Name filtering for province and municipality listings.

/// Case-insensitive substring match.
///
/// Lower-casing is Unicode aware so `"coruña"` matches `"A CORUÑA"`.
/// An empty (or blank) filter matches every name.
pub fn name_matches(candidate: &str, filter: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() {
        return true;
    }
    candidate.to_lowercase().contains(&filter.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matches() {
        assert!(name_matches("A CORUÑA", "coruña"));
        assert!(name_matches("MADRID", "Mad"));
        assert!(name_matches("MADRID", ""));
        assert!(name_matches("MADRID", "  "));
        assert!(!name_matches("MADRID", "barcelona"));
    }
}
