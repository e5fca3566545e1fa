// Comment selection: which teams get to react to a pick.

use std::collections::BTreeMap;

use crate::draft::board::TeamState;
use crate::draft::pick::Pick;

/// No pick ever draws more reactions than this, whatever the policy says.
pub const MAX_COMMENTERS: usize = 2;

/// Picks this early are candidates for quieting.
const OBVIOUS_PICK_WINDOW: u32 = 3;

/// Decides which teams comment on a pick.
pub trait CommentPolicy: Send + Sync {
    /// Slots of the teams that should react to `pick`, in display order.
    fn select(&self, pick: &Pick, teams: &[TeamState]) -> Vec<u8>;

    /// Extra context handed to `slot`'s agent with every request.
    fn rival_context(&self, _slot: u8, _teams: &[TeamState]) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// Rival table
// ---------------------------------------------------------------------------

/// Static slot to rival-slots mapping. Rivals are listed in preference order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RivalTable {
    rivals: BTreeMap<u8, Vec<u8>>,
}

impl RivalTable {
    pub fn new(rivals: BTreeMap<u8, Vec<u8>>) -> Self {
        RivalTable { rivals }
    }

    /// The six-team table: 1 and 3 feud, 5 spars with 2 and 6.
    pub fn standard() -> Self {
        RivalTable::new(BTreeMap::from([
            (1, vec![3]),
            (2, vec![5]),
            (3, vec![1]),
            (5, vec![2, 6]),
            (6, vec![5]),
        ]))
    }

    pub fn rivals_of(&self, slot: u8) -> &[u8] {
        self.rivals.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// RivalryPolicy
// ---------------------------------------------------------------------------

/// Default policy: rivals first, then teams with an opposing strategy, then
/// the lowest remaining slots. Human-controlled teams never comment.
#[derive(Debug, Clone, Default)]
pub struct RivalryPolicy {
    rivals: RivalTable,
    quiet_obvious_picks: bool,
}

impl RivalryPolicy {
    pub fn new(rivals: RivalTable) -> Self {
        RivalryPolicy {
            rivals,
            quiet_obvious_picks: false,
        }
    }

    /// Let chalk picks at the very top of the draft pass without comment.
    pub fn quiet_obvious_picks(mut self, quiet: bool) -> Self {
        self.quiet_obvious_picks = quiet;
        self
    }

    /// An agent taking a consensus top player where he was expected to go.
    fn is_obvious(pick: &Pick) -> bool {
        pick.overall <= OBVIOUS_PICK_WINDOW && pick.player.adp <= f64::from(pick.overall) + 1.0
    }
}

impl CommentPolicy for RivalryPolicy {
    fn select(&self, pick: &Pick, teams: &[TeamState]) -> Vec<u8> {
        let Some(picker) = teams.iter().find(|t| t.slot == pick.team) else {
            return Vec::new();
        };

        if self.quiet_obvious_picks && picker.strategy.is_agent() && Self::is_obvious(pick) {
            return Vec::new();
        }

        let eligible = |slot: u8, chosen: &[u8]| {
            slot != picker.slot
                && !chosen.contains(&slot)
                && teams
                    .iter()
                    .any(|t| t.slot == slot && t.strategy.is_agent())
        };

        let mut chosen: Vec<u8> = Vec::with_capacity(MAX_COMMENTERS);

        let rivals = self.rivals.rivals_of(picker.slot).iter().copied();
        let opposed = teams
            .iter()
            .filter(|t| t.strategy.opposes(picker.strategy))
            .map(|t| t.slot);
        let rest = teams.iter().map(|t| t.slot);

        for slot in rivals.chain(opposed).chain(rest) {
            if chosen.len() == MAX_COMMENTERS {
                break;
            }
            if eligible(slot, &chosen) {
                chosen.push(slot);
            }
        }
        chosen
    }

    fn rival_context(&self, slot: u8, teams: &[TeamState]) -> Option<String> {
        let names: Vec<String> = self
            .rivals
            .rivals_of(slot)
            .iter()
            .filter_map(|r| teams.iter().find(|t| t.slot == *r))
            .map(|t| format!("{} ({})", t.name(), t.strategy.label()))
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(format!("Your rivals: {}", names.join(", ")))
        }
    }
}
