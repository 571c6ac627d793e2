//! Built-in dungeon vocabulary used when no registry file is supplied.

use super::modifier::{Modifier, WeightedTerm};
use super::registry::{RegistryError, TermRegistry};
use super::term::{Condition, RoomMeta, Rule, Term, TermId};

pub mod keys {
    pub const START: &str = "Start";
    pub const BLANK: &str = "Blank";
    pub const HALL: &str = "Hall";
    pub const WING: &str = "Wing";
    pub const TREASURE: &str = "Treasure";
    pub const TRAP: &str = "Trap";
    pub const SHRINE: &str = "Shrine";
    pub const BOSS: &str = "Boss";
    pub const EXIT: &str = "Exit";
}

pub fn default_start_phrase() -> Vec<TermId> {
    [keys::START, keys::HALL, keys::WING, keys::BOSS, keys::EXIT]
        .into_iter()
        .map(TermId::from)
        .collect()
}

pub fn default_registry() -> Result<TermRegistry, RegistryError> {
    use keys::*;

    TermRegistry::from_terms([
        Term::terminal(START, RoomMeta::sized("Entrance", "start", 0x0040_C040, 7, 7)),
        Term::terminal(BLANK, RoomMeta::sized("Chamber", "room", 0x00A0_A0A0, 6, 5)).with_modifier(
            Modifier::InjectBranch {
                terms: vec![WeightedTerm::new(TREASURE, 1), WeightedTerm::new(TRAP, 2)],
                chance: 0.2,
            },
        ),
        Term::terminal(HALL, RoomMeta::sized("Hall", "hall", 0x0080_8060, 9, 7))
            .with_rule(
                Rule::chain(&[BLANK, HALL]).weighted(2).when(Condition::DepthBelow { depth: 3 }),
            )
            .with_rule(Rule::chain(&[BLANK]))
            .with_rule(
                Rule::branch(&[BLANK, BLANK]).when(Condition::RoomCountBelow { count: 24 }),
            )
            .with_modifier(Modifier::Shortcut { chance: 0.15, max_hops: 3 }),
        Term::terminal(WING, RoomMeta::sized("Wing", "hall", 0x0070_7090, 7, 7))
            .with_rule(Rule::branch(&[HALL, TREASURE]))
            .with_rule(Rule::chain(&[BLANK, TRAP]).when(Condition::DepthAtLeast { depth: 1 })),
        Term::terminal(
            TREASURE,
            RoomMeta::sized("Vault", "treasure", 0x00E0_C020, 4, 4).with_data("loot", "chest"),
        ),
        Term::terminal(
            TRAP,
            RoomMeta::sized("Trap Room", "trap", 0x00C0_4020, 5, 5).with_data("trap", "arrows"),
        ),
        Term::terminal(SHRINE, RoomMeta::sized("Shrine", "shrine", 0x0060_A0E0, 5, 5)),
        Term::terminal(
            BOSS,
            RoomMeta::sized("Lair", "boss", 0x00A0_2020, 11, 9).with_data("spawner", "boss"),
        )
        .with_modifier(Modifier::InjectIntermediate {
            terms: vec![WeightedTerm::new(SHRINE, 1)],
            chance: 0.5,
        }),
        Term::terminal(EXIT, RoomMeta::sized("Exit", "exit", 0x00FF_FFFF, 5, 5)).as_exit(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::registry::TermLookup;

    #[test]
    fn default_registry_is_self_consistent() {
        let registry = default_registry().expect("built-in registry validates");
        for id in default_start_phrase() {
            assert!(registry.lookup(&id).is_some(), "start phrase term {id} is defined");
        }
        assert!(registry.get(keys::EXIT).expect("exit").exit);
        assert!(registry.terms().all(|term| term.meta.has_valid_footprint()));
    }
}
