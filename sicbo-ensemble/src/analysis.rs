use std::collections::HashMap;

use serde::Serialize;
use sicbo_db::models::{Category, Round, classify};

use crate::models::categories;

pub const MIN_ROUNDS: usize = 6;

/// Forme du "cầu" (la suite récente des catégories), telle qu'affichée aux joueurs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternKind {
    Insufficient,
    Run { category: Category },
    Alternating,
    TripleHead,
    TwoTwo,
    TwoOne,
    MarkovDominant { category: Category },
    FrequentTotal { score: i32, category: Category },
    Mixed,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKind::Insufficient => write!(f, "Chưa đủ dữ liệu"),
            PatternKind::Run { category } => write!(f, "Cầu {} liên tục", category.label()),
            PatternKind::Alternating => write!(f, "Cầu Đảo liên tục"),
            PatternKind::TripleHead => write!(f, "Cầu 3 đầu"),
            PatternKind::TwoTwo => write!(f, "Cầu 2-2"),
            PatternKind::TwoOne => write!(f, "Cầu 2-1"),
            PatternKind::MarkovDominant { category } => {
                write!(f, "Cầu Markov: {0}→{0} ưu thế", category.label())
            }
            PatternKind::FrequentTotal { score, category } => {
                write!(f, "Cầu tần suất: {} ({}) hay xuất hiện", score, category.label())
            }
            PatternKind::Mixed => write!(f, "Cầu hỗn hợp"),
        }
    }
}

/// Détecte la forme du cầu. `history[0]` = phiên la plus récente.
pub fn detect_pattern(history: &[Round]) -> PatternKind {
    if history.len() < MIN_ROUNDS {
        return PatternKind::Insufficient;
    }

    let all = categories(history);
    let seq = &all[..all.len().min(8)];

    if seq.iter().all(|&c| c == seq[0]) && seq[0].is_determined() {
        return PatternKind::Run { category: seq[0] };
    }
    if seq[..6].windows(2).all(|w| w[0] != w[1]) {
        return PatternKind::Alternating;
    }
    if seq[0] == seq[1] && seq[1] == seq[2] {
        return PatternKind::TripleHead;
    }
    if seq[0] == seq[1] && seq[2] == seq[3] && seq[0] != seq[2] {
        return PatternKind::TwoTwo;
    }
    if seq[0] == seq[1] && seq[2] != seq[1] {
        return PatternKind::TwoOne;
    }

    // Transitions chronologiques sur tout l'historique : all[t + 1] → all[t]
    let mut transitions: HashMap<(Category, Category), u32> = HashMap::new();
    for t in 0..all.len() - 1 {
        *transitions.entry((all[t + 1], all[t])).or_insert(0) += 1;
    }
    let count = |from: Category, to: Category| transitions.get(&(from, to)).copied().unwrap_or(0);
    for category in [Category::High, Category::Low] {
        let stay = count(category, category);
        if stay > 0 && stay > count(category, category.opposite()) + 1 {
            return PatternKind::MarkovDominant { category };
        }
    }

    let recent = &history[..history.len().min(15)];
    let mut freq: HashMap<i32, u32> = HashMap::new();
    for r in recent {
        *freq.entry(r.score).or_insert(0) += 1;
    }
    let mut top: Option<(i32, u32)> = None;
    for r in recent {
        let n = freq[&r.score];
        if top.map_or(true, |(_, best)| n > best) {
            top = Some((r.score, n));
        }
    }
    if let Some((score, n)) = top {
        if n >= 3 {
            return PatternKind::FrequentTotal { score, category: classify(score) };
        }
    }

    PatternKind::Mixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_test_rounds;

    #[test]
    fn test_insufficient() {
        assert_eq!(detect_pattern(&make_test_rounds(&[5, 14, 5])), PatternKind::Insufficient);
    }

    #[test]
    fn test_run() {
        let kind = detect_pattern(&make_test_rounds(&[12, 13, 14, 15, 16, 17]));
        assert_eq!(kind, PatternKind::Run { category: Category::High });
        assert_eq!(kind.to_string(), "Cầu Tài liên tục");
    }

    #[test]
    fn test_alternating() {
        let kind = detect_pattern(&make_test_rounds(&[5, 14, 5, 14, 5, 14, 14]));
        assert_eq!(kind, PatternKind::Alternating);
    }

    #[test]
    fn test_triple_head() {
        let kind = detect_pattern(&make_test_rounds(&[5, 6, 7, 14, 5, 14]));
        assert_eq!(kind, PatternKind::TripleHead);
    }

    #[test]
    fn test_two_two() {
        let kind = detect_pattern(&make_test_rounds(&[5, 6, 14, 15, 5, 14]));
        assert_eq!(kind, PatternKind::TwoTwo);
    }

    #[test]
    fn test_two_one() {
        let kind = detect_pattern(&make_test_rounds(&[5, 6, 14, 5, 14, 5]));
        assert_eq!(kind, PatternKind::TwoOne);
    }

    #[test]
    fn test_frequent_total() {
        // Ni série, ni alternance, ni motif de tête ; transitions équilibrées ; 9 trois fois
        let kind = detect_pattern(&make_test_rounds(&[9, 14, 14, 9, 14, 9, 5]));
        assert_eq!(kind, PatternKind::FrequentTotal { score: 9, category: Category::Low });
    }

    #[test]
    fn test_mixed() {
        let kind = detect_pattern(&make_test_rounds(&[9, 14, 15, 8, 13, 7, 4]));
        assert_eq!(kind, PatternKind::Mixed);
        assert_eq!(kind.to_string(), "Cầu hỗn hợp");
    }
}
