//! Leaderboard ordering, derived fresh from combatant state on every read

use std::cmp::Ordering;

use super::combatant::Combatant;
use super::MAX_LIVES;

/// The bits of combatant state the ranking looks at
pub trait Standing {
    fn deaths(&self) -> u32;
    fn kills(&self) -> u32;
    fn is_eliminated(&self) -> bool;

    fn lives_remaining(&self) -> u32 {
        MAX_LIVES.saturating_sub(self.deaths())
    }
}

impl Standing for Combatant {
    fn deaths(&self) -> u32 {
        Combatant::deaths(self)
    }

    fn kills(&self) -> u32 {
        Combatant::kills(self)
    }

    fn is_eliminated(&self) -> bool {
        Combatant::is_eliminated(self)
    }

    fn lives_remaining(&self) -> u32 {
        Combatant::lives_remaining(self)
    }
}

/// Leaderboard comparison: survivors first, then lives left, then kills
pub fn compare<S: Standing + ?Sized>(a: &S, b: &S) -> Ordering {
    a.is_eliminated()
        .cmp(&b.is_eliminated())
        .then_with(|| b.lives_remaining().cmp(&a.lives_remaining()))
        .then_with(|| b.kills().cmp(&a.kills()))
}

/// Rank combatants. Stable, so ties keep their input (join) order.
pub fn rank<'a, S, I>(combatants: I) -> Vec<&'a S>
where
    S: Standing + 'a,
    I: IntoIterator<Item = &'a S>,
{
    let mut ranked: Vec<&S> = combatants.into_iter().collect();
    ranked.sort_by(|a, b| compare(*a, *b));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row {
        name: &'static str,
        deaths: u32,
        kills: u32,
        eliminated: bool,
    }

    impl Standing for Row {
        fn deaths(&self) -> u32 {
            self.deaths
        }

        fn kills(&self) -> u32 {
            self.kills
        }

        fn is_eliminated(&self) -> bool {
            self.eliminated
        }
    }

    fn row(name: &'static str, deaths: u32, kills: u32) -> Row {
        Row {
            name,
            deaths,
            kills,
            eliminated: deaths >= MAX_LIVES,
        }
    }

    fn names(rows: Vec<&Row>) -> Vec<&'static str> {
        rows.into_iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_lives_then_elimination() {
        let rows = [row("C", 3, 0), row("B", 1, 9), row("A", 0, 5)];
        assert_eq!(names(rank(&rows)), ["A", "B", "C"]);
    }

    #[test]
    fn test_eliminated_last_regardless_of_kills() {
        let rows = [row("killer", 3, 40), row("camper", 2, 0)];
        assert_eq!(names(rank(&rows)), ["camper", "killer"]);
    }

    #[test]
    fn test_kills_break_lives_tie() {
        let rows = [row("A", 1, 2), row("B", 1, 6)];
        assert_eq!(names(rank(&rows)), ["B", "A"]);
    }

    #[test]
    fn test_full_tie_keeps_join_order() {
        let rows = [row("first", 1, 1), row("second", 1, 1), row("third", 1, 1)];
        assert_eq!(names(rank(&rows)), ["first", "second", "third"]);
    }

    #[test]
    fn test_sole_survivor_ranks_first() {
        let rows = [row("x", 3, 2), row("y", 3, 1), row("winner", 2, 0), row("z", 3, 5)];
        let ranked = rank(&rows);
        assert_eq!(ranked[0].name, "winner");
        assert_eq!(ranked.iter().filter(|r| !r.is_eliminated()).count(), 1);
    }
}
