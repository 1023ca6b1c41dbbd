// -------------------------------------------------------------------------------------------------
// MatcherStats
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatcherStats {
    pub items_seen: u64,
    pub queries_run: u64,
    pub rows_seen: u64,
    pub candidates_scored: u64,
    pub candidates_rejected: u64,
    pub matches_found: u64,
}

impl MatcherStats {
    pub fn update(&mut self, other: &Self) {
        self.items_seen += other.items_seen;
        self.queries_run += other.queries_run;
        self.rows_seen += other.rows_seen;
        self.candidates_scored += other.candidates_scored;
        self.candidates_rejected += other.candidates_rejected;
        self.matches_found += other.matches_found;
    }
}
