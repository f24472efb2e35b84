//! Possession simulator - one match, possession by possession
//!
//! State machine, outer to inner:
//! - Quarter: fixed length, team fouls reset, opening possession by convention
//! - Possession: clock advances by a random draw, then one outcome class resolves
//! - Event: every resolution appends to the match's play-by-play buffer
//!
//! Each outcome branch is its own method so tests can drive it with a chosen
//! value and a seeded generator.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::error::SimError;
use crate::event::{EventKind, GameEvent};
use crate::fixture::{MatchFixture, MatchResult, Side};
use crate::ids::{PersonId, TeamId};
use crate::lineup::Lineup;
use crate::outcome::{FoulKind, PossessionOutcome, Rebound, ShotKind, TurnoverKind, WeightedTable};
use crate::roster::{Roster, STARTERS};
use crate::rules::SimRules;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Quarters in regulation
pub const QUARTERS: u32 = 4;

/// Points credited per overtime scoring event
const OVERTIME_POINTS: u32 = 2;

// ============================================================================
// OUTPUT
// ============================================================================

/// Terminal output of one simulated match
#[derive(Clone, Debug)]
pub struct SimulatedMatch {
    pub result: MatchResult,
    /// Complete play-by-play, in order
    pub events: Vec<GameEvent>,
    /// Scoring events needed after regulation to break a tie
    pub overtime_credits: u32,
}

/// Simulate one match from tip-off to final score
pub fn simulate_match<R: Rng + ?Sized>(
    fixture: &MatchFixture,
    home: &Roster,
    away: &Roster,
    rules: &SimRules,
    rng: &mut R,
) -> Result<SimulatedMatch, SimError> {
    let mut sim = MatchSim::new(fixture, home, away, rules)?;
    sim.play_regulation(rng)?;
    sim.resolve_overtime(rng);
    Ok(sim.finish())
}

/// Side that inbounds to open a quarter: home for the 1st and 4th, away otherwise
pub fn opening_possession(quarter: u32) -> Side {
    if quarter == 1 || quarter == 4 {
        Side::Home
    } else {
        Side::Away
    }
}

// ============================================================================
// MATCH STATE
// ============================================================================

struct OutcomeTables {
    outcome: WeightedTable<PossessionOutcome>,
    turnover: WeightedTable<TurnoverKind>,
    foul: WeightedTable<FoulKind>,
}

impl OutcomeTables {
    fn new(rules: &SimRules) -> Result<Self, SimError> {
        let o = rules.outcome_weights;
        let f = rules.foul_weights;
        Ok(Self {
            outcome: WeightedTable::new(&[
                (PossessionOutcome::Turnover, o.turnover),
                (PossessionOutcome::Foul, o.foul),
                (PossessionOutcome::Shot, o.shot),
            ])?,
            turnover: WeightedTable::uniform(&[
                TurnoverKind::Steal,
                TurnoverKind::Unforced,
                TurnoverKind::ShotClock,
            ])?,
            foul: WeightedTable::new(&[
                (FoulKind::Personal, f.personal),
                (FoulKind::Offensive, f.offensive),
                (FoulKind::Technical, f.technical),
                (FoulKind::Flagrant, f.flagrant),
            ])?,
        })
    }
}

#[derive(Clone, Debug)]
struct SideState {
    lineup: Lineup,
    coaches: Vec<PersonId>,
    score: u32,
    team_fouls: u32,
}

impl SideState {
    fn new(team: TeamId, roster: &Roster) -> Result<Self, SimError> {
        let lineup = Lineup::from_roster(roster).ok_or(SimError::ShortRoster {
            team,
            players: roster.players.len(),
            required: STARTERS,
        })?;
        Ok(Self {
            lineup,
            coaches: roster.coaches.clone(),
            score: 0,
            team_fouls: 0,
        })
    }
}

/// In-progress match
pub struct MatchSim<'r> {
    fixture: MatchFixture,
    rules: &'r SimRules,
    tables: OutcomeTables,
    sides: [SideState; 2],
    player_fouls: FxHashMap<PersonId, u32>,
    possession: Side,
    clock: NaiveDateTime,
    events: Vec<GameEvent>,
    overtime_credits: u32,
}

impl<'r> MatchSim<'r> {
    pub fn new(
        fixture: &MatchFixture,
        home: &Roster,
        away: &Roster,
        rules: &'r SimRules,
    ) -> Result<Self, SimError> {
        let sides = [
            SideState::new(fixture.home, home)?,
            SideState::new(fixture.away, away)?,
        ];
        Ok(Self {
            fixture: fixture.clone(),
            rules,
            tables: OutcomeTables::new(rules)?,
            sides,
            player_fouls: FxHashMap::default(),
            possession: Side::Home,
            clock: fixture.scheduled,
            events: Vec::with_capacity(512),
            overtime_credits: 0,
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn score(&self, side: Side) -> u32 {
        self.sides[side.index()].score
    }

    pub fn team_fouls(&self, side: Side) -> u32 {
        self.sides[side.index()].team_fouls
    }

    pub fn fouls(&self, player: PersonId) -> u32 {
        self.player_fouls.get(&player).copied().unwrap_or(0)
    }

    pub fn lineup(&self, side: Side) -> &Lineup {
        &self.sides[side.index()].lineup
    }

    pub fn possession(&self) -> Side {
        self.possession
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn regulation_end(&self) -> NaiveDateTime {
        self.quarter_start(QUARTERS + 1)
    }

    // ========================================================================
    // QUARTERS
    // ========================================================================

    /// Play all four quarters
    pub fn play_regulation<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SimError> {
        let (lo, hi) = self.rules.possession_range();
        for quarter in 1..=QUARTERS {
            let end = self.start_quarter(quarter);
            loop {
                self.clock += Duration::seconds(rng.gen_range(lo..=hi));
                if self.clock >= end {
                    break;
                }
                self.play_possession(rng)?;
            }
        }
        Ok(())
    }

    /// Reset team fouls, clock and possession for a quarter; returns its end time
    pub fn start_quarter(&mut self, quarter: u32) -> NaiveDateTime {
        for side in &mut self.sides {
            side.team_fouls = 0;
        }
        self.clock = self.quarter_start(quarter);
        self.possession = opening_possession(quarter);
        self.clock + Duration::seconds(self.rules.quarter_seconds())
    }

    fn quarter_start(&self, quarter: u32) -> NaiveDateTime {
        let elapsed = self.rules.quarter_seconds() * i64::from(quarter.saturating_sub(1));
        self.fixture.scheduled + Duration::seconds(elapsed)
    }

    /// Break a level score by crediting baskets to a random side
    ///
    /// Not a simulated extra period: each credit is two points and one made
    /// basket stamped after the end of regulation.
    pub fn resolve_overtime<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.score(Side::Home) != self.score(Side::Away) {
            return;
        }
        let (lo, hi) = self.rules.possession_range();
        self.clock = self.regulation_end();
        while self.score(Side::Home) == self.score(Side::Away) {
            let side = if rng.gen_bool(0.5) { Side::Home } else { Side::Away };
            self.clock += Duration::seconds(rng.gen_range(lo..=hi));
            let scorer = self.pick(side, rng);
            self.log(scorer, EventKind::TwoPointMade);
            self.credit(side, OVERTIME_POINTS);
            self.overtime_credits += 1;
        }
    }

    /// Final result and event buffer
    pub fn finish(self) -> SimulatedMatch {
        let result = MatchResult::from_scores(
            &self.fixture,
            self.score(Side::Home),
            self.score(Side::Away),
        );
        SimulatedMatch {
            result,
            events: self.events,
            overtime_credits: self.overtime_credits,
        }
    }

    // ========================================================================
    // POSSESSIONS
    // ========================================================================

    /// One possession: draw an outcome class, resolve it, maybe rotate
    pub fn play_possession<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SimError> {
        let outcome = self.tables.outcome.draw(rng);
        self.resolve(outcome, rng)?;
        self.maybe_rotate(rng)
    }

    /// Resolve a possession with a given outcome class
    pub fn resolve<R: Rng + ?Sized>(
        &mut self,
        outcome: PossessionOutcome,
        rng: &mut R,
    ) -> Result<(), SimError> {
        match outcome {
            PossessionOutcome::Turnover => {
                let kind = self.tables.turnover.draw(rng);
                self.resolve_turnover(kind, rng);
                Ok(())
            }
            PossessionOutcome::Foul => {
                let kind = self.tables.foul.draw(rng);
                self.resolve_foul(kind, rng)
            }
            PossessionOutcome::Shot => {
                let kind = if chance(rng, self.rules.three_point_rate) {
                    ShotKind::ThreePointer
                } else {
                    ShotKind::TwoPointer
                };
                let made = chance(rng, self.rules.field_goal_rate);
                self.resolve_shot(kind, made, rng)
            }
        }
    }

    /// Ball lost; possession always flips
    pub fn resolve_turnover<R: Rng + ?Sized>(&mut self, kind: TurnoverKind, rng: &mut R) {
        let atk = self.possession;
        let dfn = atk.other();
        let attacker = self.pick(atk, rng);

        match kind {
            TurnoverKind::Steal => {
                let defender = self.pick(dfn, rng);
                self.log(defender, EventKind::Steal);
                self.log(attacker, EventKind::Turnover);
            }
            TurnoverKind::Unforced => self.log(attacker, EventKind::Turnover),
            TurnoverKind::ShotClock => self.log(attacker, EventKind::TimeRunningOut),
        }
        self.possession = dfn;
    }

    pub fn resolve_foul<R: Rng + ?Sized>(
        &mut self,
        kind: FoulKind,
        rng: &mut R,
    ) -> Result<(), SimError> {
        let atk = self.possession;
        let dfn = atk.other();
        let attacker = self.pick(atk, rng);

        match kind {
            FoulKind::Offensive => {
                self.charge_foul(atk, attacker, kind)?;
                self.possession = dfn;
            }
            FoulKind::Technical => self.technical_foul(rng)?,
            FoulKind::Personal | FoulKind::Flagrant => {
                let defender = self.pick(dfn, rng);
                self.charge_foul(dfn, defender, kind)?;

                let shots = self.free_throws_awarded(kind, dfn);
                if shots == 0 {
                    // Side out
                    self.possession = atk;
                } else if self.shoot_free_throws(atk, attacker, shots, rng) {
                    self.possession = dfn;
                } else {
                    self.rebound(atk, rng);
                }
            }
        }
        Ok(())
    }

    /// Technical: either side, player or coach; the other side shoots, then
    /// play resumes with the team that had the ball
    fn technical_foul<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SimError> {
        let offender = if rng.gen_bool(0.5) { Side::Home } else { Side::Away };

        let coach = {
            let coaches = &self.sides[offender.index()].coaches;
            if !coaches.is_empty() && chance(rng, self.rules.coach_technical_rate) {
                Some(coaches[rng.gen_range(0..coaches.len())])
            } else {
                None
            }
        };
        match coach {
            Some(coach) => self.log(coach, EventKind::TechnicalFoul),
            None => {
                let player = self.pick(offender, rng);
                self.charge_foul(offender, player, FoulKind::Technical)?;
            }
        }

        let shooting = offender.other();
        let shooter = self.pick(shooting, rng);
        self.shoot_free_throws(shooting, shooter, self.rules.technical_free_throws, rng);
        Ok(())
    }

    fn free_throws_awarded(&self, kind: FoulKind, fouling: Side) -> u32 {
        match kind {
            FoulKind::Flagrant => self.rules.flagrant_free_throws,
            FoulKind::Technical => self.rules.technical_free_throws,
            FoulKind::Personal if self.team_fouls(fouling) > self.rules.bonus_threshold => {
                self.rules.bonus_free_throws
            }
            _ => 0,
        }
    }

    /// Log a foul against a player and enforce the foul-out
    ///
    /// The substitution pair, when there is one, directly follows the foul event.
    pub fn charge_foul(
        &mut self,
        side: Side,
        player: PersonId,
        kind: FoulKind,
    ) -> Result<(), SimError> {
        self.log(player, kind.event());

        let fouls = {
            let count = self.player_fouls.entry(player).or_insert(0);
            *count += 1;
            *count
        };
        if kind.counts_for_team() {
            self.sides[side.index()].team_fouls += 1;
        }

        if fouls >= self.rules.foul_out && self.lineup(side).is_on_court(player) {
            if let Some(sub) = self.sides[side.index()].lineup.foul_out(player)? {
                self.log(player, EventKind::Substitution);
                self.log(sub, EventKind::Substitution);
            }
        }
        Ok(())
    }

    /// Shoot free throws; returns whether the last one went in
    fn shoot_free_throws<R: Rng + ?Sized>(
        &mut self,
        side: Side,
        shooter: PersonId,
        shots: u32,
        rng: &mut R,
    ) -> bool {
        let mut last_made = false;
        for _ in 0..shots {
            last_made = chance(rng, self.rules.free_throw_rate);
            if last_made {
                self.log(shooter, EventKind::FreeThrowMade);
                self.credit(side, 1);
            } else {
                self.log(shooter, EventKind::FreeThrowAttempt);
            }
        }
        last_made
    }

    pub fn resolve_shot<R: Rng + ?Sized>(
        &mut self,
        kind: ShotKind,
        made: bool,
        rng: &mut R,
    ) -> Result<(), SimError> {
        let atk = self.possession;
        let dfn = atk.other();
        let shooter = self.pick(atk, rng);
        let defender = self.pick(dfn, rng);

        if made {
            // Assist goes in before the basket it credits
            let passer = self.lineup(atk).pick_teammate(rng, shooter);
            self.log(passer, EventKind::Assist);
            self.log(shooter, kind.made_event());
            self.credit(atk, kind.points());

            if chance(rng, self.rules.and_one_rate) {
                self.charge_foul(dfn, defender, FoulKind::Personal)?;
                self.log(shooter, EventKind::FreeThrowMade);
                self.credit(atk, 1);
            }
            self.possession = dfn;
        } else {
            self.log(shooter, kind.attempt_event());
            if chance(rng, self.rules.block_rate) {
                self.log(defender, EventKind::Block);
                let rebounder = self.pick(dfn, rng);
                self.log(rebounder, EventKind::DefensiveRebound);
                self.possession = dfn;
            } else {
                self.rebound(atk, rng);
            }
        }
        Ok(())
    }

    /// Loose ball after a miss, weighted toward the defense
    fn rebound<R: Rng + ?Sized>(&mut self, atk: Side, rng: &mut R) -> Rebound {
        let dfn = atk.other();
        if chance(rng, self.rules.defensive_rebound_rate) {
            let player = self.pick(dfn, rng);
            self.log(player, EventKind::DefensiveRebound);
            self.possession = dfn;
            Rebound::Defensive
        } else {
            let player = self.pick(atk, rng);
            self.log(player, EventKind::OffensiveRebound);
            self.possession = atk;
            Rebound::Offensive
        }
    }

    /// Occasional rotation change on a random side
    fn maybe_rotate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SimError> {
        if !chance(rng, self.rules.rotation_rate) {
            return Ok(());
        }
        let side = if rng.gen_bool(0.5) { Side::Home } else { Side::Away };
        if !self.lineup(side).has_bench() {
            return Ok(());
        }
        let out = self.pick(side, rng);
        if let Some(incoming) = self.sides[side.index()].lineup.rotate(out)? {
            self.log(out, EventKind::Substitution);
            self.log(incoming, EventKind::Substitution);
        }
        Ok(())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn pick<R: Rng + ?Sized>(&self, side: Side, rng: &mut R) -> PersonId {
        self.sides[side.index()].lineup.pick(rng)
    }

    fn credit(&mut self, side: Side, points: u32) {
        self.sides[side.index()].score += points;
    }

    fn log(&mut self, actor: PersonId, kind: EventKind) {
        self.events.push(GameEvent {
            match_id: self.fixture.id,
            sequence: self.events.len() as u32,
            actor,
            kind,
            at: self.clock,
        });
    }
}

/// Bernoulli draw that tolerates out-of-range probabilities
fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen::<f64>() < p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{MatchId, VenueId};
    use crate::rules::{FoulWeights, OutcomeWeights};
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixture() -> MatchFixture {
        let at = NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        MatchFixture::new(MatchId(70000), TeamId(1000), TeamId(1001), at, 1, 1, VenueId(1))
    }

    fn roster(base: u32, players: u32) -> Roster {
        Roster::new(
            (1..=players).map(|i| PersonId(base + i)).collect(),
            vec![PersonId(base)],
        )
    }

    fn rosters() -> (Roster, Roster) {
        (roster(100, 12), roster(200, 12))
    }

    fn foul_heavy_rules() -> SimRules {
        SimRules::default().with_outcome_weights(OutcomeWeights {
            turnover: 0.1,
            foul: 0.6,
            shot: 0.3,
        })
    }

    fn side_of(home: &Roster, actor: PersonId) -> Side {
        if home.contains(actor) {
            Side::Home
        } else {
            Side::Away
        }
    }

    #[test]
    fn test_opening_possession_convention() {
        assert_eq!(opening_possession(1), Side::Home);
        assert_eq!(opening_possession(2), Side::Away);
        assert_eq!(opening_possession(3), Side::Away);
        assert_eq!(opening_possession(4), Side::Home);
    }

    #[test]
    fn test_short_roster_is_rejected() {
        let home = roster(100, 12);
        let away = roster(200, 4);
        let rules = SimRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let err = simulate_match(&fixture(), &home, &away, &rules, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            SimError::ShortRoster { team: TeamId(1001), players: 4, required: 5 }
        ));
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let (home, away) = rosters();
        let rules = SimRules::default().with_outcome_weights(OutcomeWeights {
            turnover: 0.0,
            foul: 0.0,
            shot: 0.0,
        });
        assert!(matches!(
            MatchSim::new(&fixture(), &home, &away, &rules),
            Err(SimError::Weights(_))
        ));
    }

    #[test]
    fn test_matches_never_tie() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sim = simulate_match(&fixture(), &home, &away, &rules, &mut rng).unwrap();
            assert_ne!(sim.result.home_score, sim.result.away_score, "seed {}", seed);
        }
    }

    #[test]
    fn test_score_matches_event_stream() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        for seed in 0..30 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sim = simulate_match(&fixture(), &home, &away, &rules, &mut rng).unwrap();

            let mut points = [0u32; 2];
            for e in &sim.events {
                points[side_of(&home, e.actor).index()] += e.kind.points();
            }
            assert_eq!(points[0], sim.result.home_score, "seed {}", seed);
            assert_eq!(points[1], sim.result.away_score, "seed {}", seed);
        }
    }

    #[test]
    fn test_events_ordered_and_inside_match() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let f = fixture();
        let regulation_end = f.scheduled + Duration::seconds(rules.quarter_seconds() * 4);

        for seed in 0..30 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sim = simulate_match(&f, &home, &away, &rules, &mut rng).unwrap();
            let overtime = Duration::seconds(24 * i64::from(sim.overtime_credits));

            assert!(!sim.events.is_empty());
            for pair in sim.events.windows(2) {
                assert!(pair[0].at <= pair[1].at);
                assert_eq!(pair[0].sequence + 1, pair[1].sequence);
            }
            for e in &sim.events {
                assert!(e.at >= f.scheduled);
                assert!(e.at <= regulation_end + overtime);
                assert_eq!(e.match_id, f.id);
            }
        }
    }

    #[test]
    fn test_assist_precedes_made_basket_by_teammate() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sim = simulate_match(&fixture(), &home, &away, &rules, &mut rng).unwrap();

            for (i, e) in sim.events.iter().enumerate() {
                if e.kind != EventKind::Assist {
                    continue;
                }
                let basket = &sim.events[i + 1];
                assert!(basket.kind.is_made_basket());
                assert_ne!(basket.actor, e.actor);
                assert_eq!(side_of(&home, basket.actor), side_of(&home, e.actor));
            }
        }
    }

    #[test]
    fn test_foul_out_substitution_follows_disqualifying_foul() {
        let (home, away) = rosters();
        let rules = foul_heavy_rules();
        let mut foul_outs = 0;

        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sim = simulate_match(&fixture(), &home, &away, &rules, &mut rng).unwrap();

            let mut fouls: FxHashMap<PersonId, u32> = FxHashMap::default();
            let mut bench = [home.bench().len(), away.bench().len()];
            let mut disqualified: Vec<PersonId> = Vec::new();

            for (i, e) in sim.events.iter().enumerate() {
                assert!(!disqualified.contains(&e.actor), "disqualified player acted");
                let side = side_of(&home, e.actor);
                let roster = if side == Side::Home { &home } else { &away };
                if !e.kind.is_foul() || !roster.has_player(e.actor) {
                    continue;
                }
                let count = fouls.entry(e.actor).or_insert(0);
                *count += 1;
                if *count == rules.foul_out && bench[side.index()] > 0 {
                    let out = &sim.events[i + 1];
                    let incoming = &sim.events[i + 2];
                    assert_eq!(out.kind, EventKind::Substitution);
                    assert_eq!(out.actor, e.actor);
                    assert_eq!(incoming.kind, EventKind::Substitution);
                    assert!(roster.has_player(incoming.actor));
                    bench[side.index()] -= 1;
                    disqualified.push(e.actor);
                    foul_outs += 1;
                }
            }
        }
        assert!(foul_outs > 0, "foul-heavy rules should disqualify someone");
    }

    #[test]
    fn test_fifth_foul_with_bench_substitutes_immediately() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        sim.start_quarter(1);

        let player = sim.lineup(Side::Away).on_court()[0];
        sim.player_fouls.insert(player, 4);
        sim.charge_foul(Side::Away, player, FoulKind::Personal).unwrap();

        let events = sim.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::PersonalFoul);
        assert_eq!(events[0].actor, player);
        assert_eq!(events[1].kind, EventKind::Substitution);
        assert_eq!(events[1].actor, player);
        assert_eq!(events[2].kind, EventKind::Substitution);
        assert_eq!(events[2].actor, away.players[5]);

        assert_eq!(sim.fouls(player), 5);
        assert!(!sim.lineup(Side::Away).is_on_court(player));
        assert!(sim.lineup(Side::Away).is_consistent());
    }

    #[test]
    fn test_foul_out_via_possession_branch() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        sim.start_quarter(1);

        let defenders: Vec<PersonId> = sim.lineup(Side::Away).on_court().to_vec();
        for &d in &defenders {
            sim.player_fouls.insert(d, 4);
        }
        sim.resolve_foul(FoulKind::Personal, &mut rng).unwrap();

        let events = sim.events();
        assert_eq!(events[0].kind, EventKind::PersonalFoul);
        assert!(defenders.contains(&events[0].actor));
        assert_eq!(events[1].kind, EventKind::Substitution);
        assert_eq!(events[1].actor, events[0].actor);
        assert_eq!(events[2].kind, EventKind::Substitution);
        // No bonus yet: side out, home keeps the ball
        assert_eq!(events.len(), 3);
        assert_eq!(sim.possession(), Side::Home);
    }

    #[test]
    fn test_foul_out_without_bench_keeps_player() {
        let home = roster(100, 5);
        let away = roster(200, 5);
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        sim.start_quarter(1);

        let player = away.players[2];
        sim.player_fouls.insert(player, 4);
        sim.charge_foul(Side::Away, player, FoulKind::Personal).unwrap();

        assert_eq!(sim.events().len(), 1);
        assert!(sim.lineup(Side::Away).is_on_court(player));
    }

    #[test]
    fn test_personal_foul_before_bonus_is_side_out() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        sim.start_quarter(1);

        sim.resolve_foul(FoulKind::Personal, &mut rng).unwrap();
        assert_eq!(sim.events().len(), 1);
        assert_eq!(sim.team_fouls(Side::Away), 1);
        assert_eq!(sim.possession(), Side::Home);
    }

    #[test]
    fn test_bonus_awards_two_free_throws() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        sim.start_quarter(1);
        sim.sides[Side::Away.index()].team_fouls = rules.bonus_threshold;

        sim.resolve_foul(FoulKind::Personal, &mut rng).unwrap();

        let events = sim.events();
        let free_throws: Vec<_> = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::FreeThrowMade | EventKind::FreeThrowAttempt))
            .collect();
        assert_eq!(free_throws.len(), 2);
        assert!(free_throws.iter().all(|e| home.has_player(e.actor)));
        assert_eq!(sim.score(Side::Home), events.iter().map(|e| e.kind.points()).sum::<u32>());

        let last = events.last().unwrap();
        match last.kind {
            EventKind::FreeThrowMade => assert_eq!(sim.possession(), Side::Away),
            EventKind::DefensiveRebound => assert_eq!(sim.possession(), Side::Away),
            EventKind::OffensiveRebound => assert_eq!(sim.possession(), Side::Home),
            other => panic!("unexpected final event {:?}", other),
        }
    }

    #[test]
    fn test_flagrant_always_two_free_throws() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..20 {
            let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
            sim.start_quarter(2);
            sim.resolve_foul(FoulKind::Flagrant, &mut rng).unwrap();

            let events = sim.events();
            assert_eq!(events[0].kind, EventKind::FlagrantFoul);
            assert!(home.has_player(events[0].actor));
            let shots = events
                .iter()
                .filter(|e| matches!(e.kind, EventKind::FreeThrowMade | EventKind::FreeThrowAttempt))
                .count();
            assert_eq!(shots, 2);
        }
    }

    #[test]
    fn test_offensive_foul_flips_possession() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        sim.start_quarter(1);

        sim.resolve_foul(FoulKind::Offensive, &mut rng).unwrap();
        let events = sim.events();
        assert_eq!(events[0].kind, EventKind::OffensiveFoul);
        assert!(home.has_player(events[0].actor));
        assert_eq!(sim.team_fouls(Side::Home), 1);
        assert_eq!(sim.possession(), Side::Away);
    }

    #[test]
    fn test_technical_free_throw_goes_to_other_side() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..40 {
            let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
            sim.start_quarter(1);
            sim.resolve_foul(FoulKind::Technical, &mut rng).unwrap();

            let events = sim.events();
            assert_eq!(events[0].kind, EventKind::TechnicalFoul);
            let offender = side_of(&home, events[0].actor);
            let shots: Vec<_> = events
                .iter()
                .filter(|e| matches!(e.kind, EventKind::FreeThrowMade | EventKind::FreeThrowAttempt))
                .collect();
            assert_eq!(shots.len(), 1);
            assert_eq!(side_of(&home, shots[0].actor), offender.other());
            assert_eq!(sim.team_fouls(offender), 0);
            assert_eq!(sim.possession(), Side::Home);
        }
    }

    #[test]
    fn test_steal_logs_steal_then_turnover() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        sim.start_quarter(1);

        sim.resolve_turnover(TurnoverKind::Steal, &mut rng);
        let events = sim.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Steal);
        assert!(away.has_player(events[0].actor));
        assert_eq!(events[1].kind, EventKind::Turnover);
        assert!(home.has_player(events[1].actor));
        assert_eq!(sim.possession(), Side::Away);

        sim.resolve_turnover(TurnoverKind::ShotClock, &mut rng);
        assert_eq!(sim.events()[2].kind, EventKind::TimeRunningOut);
        assert_eq!(sim.possession(), Side::Home);
    }

    #[test]
    fn test_made_three_logs_assist_first() {
        let (home, away) = rosters();
        let mut rules = SimRules::default();
        rules.and_one_rate = 0.0;
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        sim.start_quarter(1);

        sim.resolve_shot(ShotKind::ThreePointer, true, &mut rng).unwrap();
        let events = sim.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Assist);
        assert_eq!(events[1].kind, EventKind::ThreePointMade);
        assert_ne!(events[0].actor, events[1].actor);
        assert_eq!(sim.score(Side::Home), 3);
        assert_eq!(sim.possession(), Side::Away);
    }

    #[test]
    fn test_and_one_adds_foul_and_free_throw() {
        let (home, away) = rosters();
        let mut rules = SimRules::default();
        rules.and_one_rate = 1.0;
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        sim.start_quarter(1);

        sim.resolve_shot(ShotKind::TwoPointer, true, &mut rng).unwrap();
        let kinds: Vec<EventKind> = sim.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Assist,
                EventKind::TwoPointMade,
                EventKind::PersonalFoul,
                EventKind::FreeThrowMade,
            ]
        );
        assert_eq!(sim.score(Side::Home), 3);
    }

    #[test]
    fn test_missed_shot_block_and_rebound() {
        let (home, away) = rosters();
        let mut rules = SimRules::default();
        rules.block_rate = 1.0;
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        sim.start_quarter(1);

        sim.resolve_shot(ShotKind::TwoPointer, false, &mut rng).unwrap();
        let kinds: Vec<EventKind> = sim.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TwoPointAttempt,
                EventKind::Block,
                EventKind::DefensiveRebound,
            ]
        );
        assert_eq!(sim.possession(), Side::Away);
    }

    #[test]
    fn test_offensive_rebound_retains_possession() {
        let (home, away) = rosters();
        let mut rules = SimRules::default();
        rules.block_rate = 0.0;
        rules.defensive_rebound_rate = 0.0;
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        sim.start_quarter(1);

        sim.resolve_shot(ShotKind::ThreePointer, false, &mut rng).unwrap();
        let events = sim.events();
        assert_eq!(events[1].kind, EventKind::OffensiveRebound);
        assert!(home.has_player(events[1].actor));
        assert_eq!(sim.possession(), Side::Home);
    }

    #[test]
    fn test_team_fouls_reset_each_quarter() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        sim.start_quarter(1);
        for _ in 0..3 {
            sim.resolve_foul(FoulKind::Offensive, &mut rng).unwrap();
        }
        assert!(sim.team_fouls(Side::Home) + sim.team_fouls(Side::Away) == 3);

        sim.start_quarter(2);
        assert_eq!(sim.team_fouls(Side::Home), 0);
        assert_eq!(sim.team_fouls(Side::Away), 0);
        assert_eq!(sim.possession(), Side::Away);
    }

    #[test]
    fn test_overtime_breaks_tie() {
        let (home, away) = rosters();
        let rules = SimRules::default();
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(15);

        sim.resolve_overtime(&mut rng);
        assert_ne!(sim.score(Side::Home), sim.score(Side::Away));

        let end = sim.regulation_end();
        let result = sim.finish();
        assert_eq!(result.overtime_credits, 1);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].kind, EventKind::TwoPointMade);
        assert!(result.events[0].at > end);
        assert_eq!(result.result.home_score + result.result.away_score, 2);
    }

    #[test]
    fn test_lineups_stay_consistent() {
        let (home, away) = rosters();
        let rules = foul_heavy_rules();
        let mut rng = ChaCha8Rng::seed_from_u64(16);
        let mut sim = MatchSim::new(&fixture(), &home, &away, &rules).unwrap();
        sim.play_regulation(&mut rng).unwrap();

        assert!(sim.lineup(Side::Home).is_consistent());
        assert!(sim.lineup(Side::Away).is_consistent());
        for &p in sim.lineup(Side::Home).fouled_out() {
            assert!(sim.fouls(p) >= rules.foul_out);
        }
    }

    #[test]
    fn test_foul_weights_pick_foul_types() {
        let (home, away) = rosters();
        let rules = SimRules {
            foul_weights: FoulWeights {
                personal: 0.0,
                offensive: 0.0,
                technical: 1.0,
                flagrant: 0.0,
            },
            ..foul_heavy_rules()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let sim = simulate_match(&fixture(), &home, &away, &rules, &mut rng).unwrap();

        let count = |kind: EventKind| sim.events.iter().filter(|e| e.kind == kind).count();
        assert!(count(EventKind::TechnicalFoul) > 0);
        assert_eq!(count(EventKind::OffensiveFoul), 0);
        assert_eq!(count(EventKind::FlagrantFoul), 0);
    }
}
