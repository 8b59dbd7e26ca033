//! Transfer advice as returned by the advisor, and the board that groups it
//! by outgoing player for side-by-side comparison.

use crate::core::money::net_cost;
use crate::core::squad::{Position, Squad};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use tracing::debug;

/// Player record attached to advice. The service fills in what it knows, so
/// nearly everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub predicted_points: Option<f64>,
    #[serde(default)]
    pub form: Option<f64>,
    /// Next opponent, e.g. "ARS (H)".
    #[serde(default)]
    pub fixture: Option<String>,
    /// Fixture difficulty rating of the next match.
    #[serde(default)]
    pub fdr: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAdvice {
    pub out: PlayerSnapshot,
    #[serde(rename = "in")]
    pub incoming: PlayerSnapshot,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub points_gain: f64,
    #[serde(default)]
    pub priority_score: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub all_reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestAlternative {
    #[serde(default)]
    pub out: Option<PlayerSnapshot>,
    #[serde(default, rename = "in")]
    pub incoming: Option<PlayerSnapshot>,
    #[serde(default)]
    pub points_gain: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldAdvice {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub why: Vec<String>,
    #[serde(default)]
    pub best_alternative: Option<BestAlternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferSuggestion {
    Hold(HoldAdvice),
    Transfer(TransferAdvice),
}

/// Per-player outlook the advisor returns next to its suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAnalysis {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub predicted_points: Option<f64>,
    #[serde(default)]
    pub fixture: Option<String>,
    #[serde(default)]
    pub fdr: Option<u8>,
    #[serde(default)]
    pub risk: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    #[serde(default)]
    pub suggestions: Vec<TransferSuggestion>,
    #[serde(default)]
    pub squad_analysis: Vec<PlayerAnalysis>,
}

/// Identity of the outgoing player a group is built around.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Id(u32),
    Name(String),
}

impl GroupKey {
    fn of(player: &PlayerSnapshot) -> Self {
        match player.id {
            Some(id) => GroupKey::Id(id),
            None => GroupKey::Name(player.name.clone()),
        }
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Id(id) => write!(f, "#{id}"),
            GroupKey::Name(name) => write!(f, "{name}"),
        }
    }
}

/// One outgoing player and its ranked replacements.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionGroup {
    pub key: GroupKey,
    pub outgoing: PlayerSnapshot,
    /// Selling price of the outgoing player when it is in the squad.
    pub selling_price: Option<f64>,
    pub candidates: Vec<TransferAdvice>,
}

impl SuggestionGroup {
    /// Best candidate. Groups are never built empty.
    pub fn top(&self) -> &TransferAdvice {
        &self.candidates[0]
    }

    pub fn alternatives(&self) -> &[TransferAdvice] {
        &self.candidates[1..]
    }

    pub fn best_priority(&self) -> f64 {
        self.top().priority_score
    }

    /// Candidates to show given the expansion state.
    pub fn visible<'a>(&'a self, expanded: &ExpandedGroups) -> &'a [TransferAdvice] {
        if expanded.is_expanded(&self.key) {
            &self.candidates
        } else {
            &self.candidates[..1]
        }
    }

    /// Net spend for a candidate, using the selling price when known and the
    /// advisor's price delta otherwise.
    pub fn net_cost(&self, candidate: &TransferAdvice) -> f64 {
        match (candidate.incoming.price, self.selling_price) {
            (Some(buy), Some(sell)) => net_cost(buy, sell),
            _ => candidate.cost,
        }
    }

    pub fn is_affordable(&self, candidate: &TransferAdvice, bank: f64) -> bool {
        self.net_cost(candidate) <= bank + f64::EPSILON
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionBoard {
    pub holds: Vec<HoldAdvice>,
    pub groups: Vec<SuggestionGroup>,
}

impl SuggestionBoard {
    pub fn is_empty(&self) -> bool {
        self.holds.is_empty() && self.groups.is_empty()
    }

    pub fn group(&self, key: &GroupKey) -> Option<&SuggestionGroup> {
        self.groups.iter().find(|g| &g.key == key)
    }
}

/// Which groups currently show all their candidates. Owned by the view, not
/// by the board, so it survives re-aggregation.
#[derive(Debug, Clone, Default)]
pub struct ExpandedGroups {
    keys: HashSet<GroupKey>,
}

impl ExpandedGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, key: &GroupKey) -> bool {
        self.keys.contains(key)
    }

    /// Flips the state for `key` and returns the new state.
    pub fn toggle(&mut self, key: &GroupKey) -> bool {
        if self.keys.remove(key) {
            false
        } else {
            self.keys.insert(key.clone());
            true
        }
    }

    pub fn expand_all(&mut self, board: &SuggestionBoard) {
        self.keys.extend(board.groups.iter().map(|g| g.key.clone()));
    }

    pub fn collapse_all(&mut self) {
        self.keys.clear();
    }
}

fn compare_candidates(a: &TransferAdvice, b: &TransferAdvice) -> Ordering {
    b.priority_score
        .total_cmp(&a.priority_score)
        .then_with(|| b.points_gain.total_cmp(&a.points_gain))
        .then_with(|| a.cost.total_cmp(&b.cost))
}

/// Builds the comparison board for a batch of suggestions.
///
/// Holds keep their input order. Transfers are grouped by outgoing player
/// (id, else name), candidates within a group are ranked by priority, points
/// gain and then cost, and groups are ranked by their best candidate. All
/// sorts are stable, so equal keys keep first-appearance order and the
/// output is the same for the same input.
pub fn aggregate(suggestions: &[TransferSuggestion], squad: &Squad) -> SuggestionBoard {
    let mut holds = Vec::new();
    let mut groups: Vec<SuggestionGroup> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for suggestion in suggestions {
        match suggestion {
            TransferSuggestion::Hold(hold) => holds.push(hold.clone()),
            TransferSuggestion::Transfer(transfer) => {
                let key = GroupKey::of(&transfer.out);
                let slot = *index.entry(key.clone()).or_insert_with(|| {
                    let owned = match &key {
                        GroupKey::Id(id) => squad.player(*id),
                        GroupKey::Name(name) => squad.player_by_name(name),
                    };
                    groups.push(SuggestionGroup {
                        key,
                        outgoing: transfer.out.clone(),
                        selling_price: owned.map(|p| p.price),
                        candidates: Vec::new(),
                    });
                    groups.len() - 1
                });
                groups[slot].candidates.push(transfer.clone());
            }
        }
    }

    for group in &mut groups {
        group.candidates.sort_by(compare_candidates);
    }
    groups.sort_by(|a, b| b.best_priority().total_cmp(&a.best_priority()));

    debug!(
        holds = holds.len(),
        groups = groups.len(),
        "Aggregated transfer suggestions"
    );
    SuggestionBoard { holds, groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::squad::SquadPlayer;

    fn snapshot(id: Option<u32>, name: &str, price: Option<f64>) -> PlayerSnapshot {
        PlayerSnapshot {
            id,
            name: name.to_string(),
            price,
            ..PlayerSnapshot::default()
        }
    }

    fn transfer(
        out: (Option<u32>, &str),
        incoming: &str,
        priority: f64,
        gain: f64,
        cost: f64,
    ) -> TransferSuggestion {
        TransferSuggestion::Transfer(TransferAdvice {
            out: snapshot(out.0, out.1, None),
            incoming: snapshot(None, incoming, None),
            cost,
            points_gain: gain,
            priority_score: priority,
            reason: String::new(),
            all_reasons: vec![],
        })
    }

    fn names(group: &SuggestionGroup) -> Vec<&str> {
        group
            .candidates
            .iter()
            .map(|c| c.incoming.name.as_str())
            .collect()
    }

    fn sample() -> Vec<TransferSuggestion> {
        vec![
            transfer((Some(1), "Alpha"), "A1", 5.0, 2.0, 0.5),
            transfer((Some(2), "Beta"), "B1", 9.0, 3.0, 1.0),
            TransferSuggestion::Hold(HoldAdvice {
                reason: "Squad is in good shape".to_string(),
                why: vec!["No injuries".to_string()],
                best_alternative: None,
            }),
            transfer((Some(1), "Alpha"), "A2", 7.0, 1.0, 0.0),
            transfer((Some(2), "Beta"), "B2", 9.0, 4.0, 2.0),
            transfer((None, "Gamma"), "G1", 6.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_groups_and_ordering() {
        let board = aggregate(&sample(), &Squad::default());

        assert_eq!(board.holds.len(), 1);
        assert_eq!(board.groups.len(), 3);

        let keys: Vec<_> = board.groups.iter().map(|g| g.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                GroupKey::Id(2),
                GroupKey::Id(1),
                GroupKey::Name("Gamma".to_string())
            ]
        );

        // Equal priority, higher points gain first.
        assert_eq!(names(&board.groups[0]), vec!["B2", "B1"]);
        assert_eq!(names(&board.groups[1]), vec!["A2", "A1"]);
        assert_eq!(board.groups[1].top().incoming.name, "A2");
        assert_eq!(board.groups[1].alternatives().len(), 1);

        let gamma = board.group(&GroupKey::Name("Gamma".to_string())).unwrap();
        assert!(gamma.outgoing.id.is_none());
        assert!(board.group(&GroupKey::Id(99)).is_none());
    }

    #[test]
    fn test_cost_breaks_remaining_ties() {
        let suggestions = vec![
            transfer((Some(3), "Delta"), "Pricey", 4.0, 2.0, 1.5),
            transfer((Some(3), "Delta"), "Cheap", 4.0, 2.0, -0.5),
        ];
        let board = aggregate(&suggestions, &Squad::default());
        assert_eq!(names(&board.groups[0]), vec!["Cheap", "Pricey"]);
    }

    #[test]
    fn test_candidates_non_increasing_priority() {
        let board = aggregate(&sample(), &Squad::default());
        for group in &board.groups {
            for pair in group.candidates.windows(2) {
                assert!(pair[0].priority_score >= pair[1].priority_score);
                if pair[0].priority_score == pair[1].priority_score {
                    assert!(pair[0].points_gain >= pair[1].points_gain);
                }
            }
        }
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let input = sample();
        let first = aggregate(&input, &Squad::default());
        let second = aggregate(&input, &Squad::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_group_ties_keep_first_appearance() {
        let suggestions = vec![
            transfer((Some(5), "Late"), "L1", 3.0, 0.0, 0.0),
            transfer((Some(4), "Early"), "E1", 3.0, 0.0, 0.0),
        ];
        let board = aggregate(&suggestions, &Squad::default());
        assert_eq!(board.groups[0].key, GroupKey::Id(5));
        assert_eq!(board.groups[1].key, GroupKey::Id(4));
    }

    #[test]
    fn test_expansion_state() {
        let board = aggregate(&sample(), &Squad::default());
        let mut expanded = ExpandedGroups::new();
        let group = &board.groups[0];

        assert_eq!(group.visible(&expanded).len(), 1);
        assert!(expanded.toggle(&group.key));
        assert_eq!(group.visible(&expanded).len(), 2);

        // State is keyed by identity, so it applies to a rebuilt board too.
        let rebuilt = aggregate(&sample(), &Squad::default());
        assert_eq!(rebuilt.groups[0].visible(&expanded).len(), 2);

        assert!(!expanded.toggle(&group.key));
        assert_eq!(group.visible(&expanded).len(), 1);

        expanded.expand_all(&board);
        assert!(board.groups.iter().all(|g| expanded.is_expanded(&g.key)));
        expanded.collapse_all();
        assert!(!expanded.is_expanded(&group.key));
    }

    #[test]
    fn test_selling_price_drives_net_cost() {
        let squad = Squad {
            players: vec![SquadPlayer {
                id: 1,
                name: "Alpha".to_string(),
                position: Position::MID,
                price: 7.6,
                team: None,
                status: None,
                news: None,
            }],
            bank: 0.5,
            free_transfers: 1,
        };
        let suggestions = vec![TransferSuggestion::Transfer(TransferAdvice {
            out: snapshot(Some(1), "Alpha", Some(8.0)),
            incoming: snapshot(Some(9), "Omega", Some(8.0)),
            cost: 0.0,
            points_gain: 1.0,
            priority_score: 1.0,
            reason: String::new(),
            all_reasons: vec![],
        })];
        let board = aggregate(&suggestions, &squad);
        let group = &board.groups[0];

        assert_eq!(group.selling_price, Some(7.6));
        assert_eq!(group.net_cost(group.top()), 0.4);
        assert!(group.is_affordable(group.top(), squad.bank));
        assert!(!group.is_affordable(group.top(), 0.3));
    }

    #[test]
    fn test_deserialize_tagged_suggestions() {
        let json = r#"{
            "suggestions": [
                {
                    "type": "transfer",
                    "out": {"id": 10, "name": "Out", "price": 6.0},
                    "in": {"id": 11, "name": "In", "price": 6.5, "fixture": "ARS (H)", "fdr": 2},
                    "cost": 0.5,
                    "points_gain": 2.1,
                    "priority_score": 8.4,
                    "reason": "Better fixtures",
                    "all_reasons": ["Better fixtures", "In form"]
                },
                {
                    "type": "hold",
                    "reason": "Bank the transfer",
                    "why": ["Marginal gains"]
                }
            ],
            "squad_analysis": [{"name": "Out", "predicted_points": 3.2}]
        }"#;
        let response: SuggestionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.suggestions.len(), 2);
        assert_eq!(response.squad_analysis.len(), 1);
        match &response.suggestions[0] {
            TransferSuggestion::Transfer(t) => {
                assert_eq!(t.incoming.name, "In");
                assert_eq!(t.incoming.fdr, Some(2));
                assert_eq!(t.all_reasons.len(), 2);
            }
            other => panic!("Expected a transfer, got {other:?}"),
        }
        match &response.suggestions[1] {
            TransferSuggestion::Hold(h) => {
                assert_eq!(h.why, vec!["Marginal gains".to_string()]);
                assert!(h.best_alternative.is_none());
            }
            other => panic!("Expected a hold, got {other:?}"),
        }
    }
}
