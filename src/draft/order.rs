// Snake draft order arithmetic.

/// Round containing overall pick `pick` (both 1-indexed).
pub fn round_of(pick: u32, num_teams: u32) -> u32 {
    (pick - 1) / num_teams + 1
}

/// Position of overall pick `pick` within its round (1..=num_teams).
pub fn pick_in_round(pick: u32, num_teams: u32) -> u32 {
    (pick - 1) % num_teams + 1
}

/// Team slot on the clock for overall pick `pick`. Odd rounds run
/// 1..=N, even rounds run N..=1.
pub fn slot_on_clock(pick: u32, num_teams: u32) -> u8 {
    let round = round_of(pick, num_teams);
    let in_round = pick_in_round(pick, num_teams);
    let slot = if round % 2 == 1 {
        in_round
    } else {
        num_teams + 1 - in_round
    };
    slot as u8
}

/// Full pick order for one round.
pub fn round_order(round: u32, num_teams: u32) -> Vec<u8> {
    let first = (round - 1) * num_teams + 1;
    (first..first + num_teams)
        .map(|pick| slot_on_clock(pick, num_teams))
        .collect()
}
