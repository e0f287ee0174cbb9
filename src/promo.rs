use regex::Regex;

use crate::config::{ConfigError, Promo};
use crate::model::{Item, PromoCandidate};

/// Heuristic that flags an item as advertising a discount.
#[derive(Debug, Clone)]
pub enum PromoMarker {
    Contains(String),
    Pattern(Regex),
}

impl Default for PromoMarker {
    fn default() -> Self {
        PromoMarker::Contains("%".into())
    }
}

impl PromoMarker {
    pub fn from_config(promo: &Promo) -> Result<Self, ConfigError> {
        match promo.pattern.as_deref() {
            Some(pattern) => Ok(PromoMarker::Pattern(Regex::new(pattern)?)),
            None => Ok(PromoMarker::Contains(promo.marker.clone())),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            PromoMarker::Contains(needle) => text.contains(needle.as_str()),
            PromoMarker::Pattern(re) => re.is_match(text),
        }
    }
}

/// Public status URL for an item id.
pub fn status_url(url_base: &str, id: &str) -> String {
    format!("{}{}", url_base, id)
}

/// Matching items in input order (newest-first for a timeline page).
pub fn find_candidates(items: &[Item], marker: &PromoMarker, url_base: &str) -> Vec<PromoCandidate> {
    items
        .iter()
        .filter(|item| marker.matches(&item.text))
        .map(|item| PromoCandidate {
            id: item.id.clone(),
            text: item.text.clone(),
            url: status_url(url_base, &item.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://twitter.com/i/web/status/";

    #[test]
    fn default_marker_is_percent_sign() {
        let marker = PromoMarker::default();
        assert!(marker.matches("50% off!"));
        assert!(marker.matches("%"));
        assert!(!marker.matches("half price"));
        assert!(!marker.matches(""));
    }

    #[test]
    fn pattern_marker_from_config() {
        let promo = Promo {
            marker: "%".into(),
            pattern: Some(r"(?i)\bsale\b".into()),
        };
        let marker = PromoMarker::from_config(&promo).unwrap();
        assert!(marker.matches("Summer SALE today"));
        assert!(!marker.matches("20% off"));
    }

    #[test]
    fn candidates_keep_newest_first_order() {
        let items = vec![
            Item::new("9", "no deal"),
            Item::new("8", "30% off"),
            Item::new("7", "plain"),
            Item::new("6", "10% off"),
        ];
        let found = find_candidates(&items, &PromoMarker::default(), BASE);
        let ids: Vec<&str> = found.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["8", "6"]);
        assert_eq!(found[0].url, "https://twitter.com/i/web/status/8");
        assert_eq!(found[0].text, "30% off");
    }

    #[test]
    fn no_candidates_when_nothing_matches() {
        let items = vec![Item::new("1", "hello"), Item::new("2", "world")];
        assert!(find_candidates(&items, &PromoMarker::default(), BASE).is_empty());
    }
}
