use crate::report::Quote;
use std::time::{SystemTime, UNIX_EPOCH};

const QUOTES: &str = include_str!("../assets/quotes.txt");

/// Parsed `text|author` lines. Lines without an author are attributed to
/// "Unknown"; blank lines are skipped.
pub fn all() -> Vec<Quote> {
    QUOTES
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| match line.rsplit_once('|') {
            Some((text, author)) => Quote {
                text: text.trim().to_string(),
                author: author.trim().to_string(),
            },
            None => Quote {
                text: line.to_string(),
                author: "Unknown".to_string(),
            },
        })
        .collect()
}

pub fn pick(seed: u64) -> Option<Quote> {
    let mut quotes = all();
    if quotes.is_empty() {
        return None;
    }
    let idx = (seed % quotes.len() as u64) as usize;
    Some(quotes.swap_remove(idx))
}

/// Seed that changes between logins.
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() ^ u64::from(d.subsec_nanos()))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_list_is_well_formed() {
        let quotes = all();
        assert!(quotes.len() >= 20);
        assert!(quotes.iter().all(|q| !q.text.is_empty() && !q.author.is_empty()));
    }

    #[test]
    fn pick_is_deterministic_for_a_seed() {
        assert_eq!(pick(7), pick(7));
        let n = all().len() as u64;
        assert_eq!(pick(3), pick(3 + n));
    }
}
