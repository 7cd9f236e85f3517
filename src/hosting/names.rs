use rand::seq::IndexedRandom;

const ADJECTIVES: [&str; 19] = [
    "awesome",
    "amazing",
    "great",
    "fantastic",
    "super",
    "admirable",
    "famous",
    "fine",
    "gigantic",
    "grand",
    "marvelous",
    "mighty",
    "outstanding",
    "splendid",
    "wonderful",
    "big",
    "smashing",
    "sensational",
    "glorious",
];

const NOUNS: [&str; 18] = [
    "game",
    "adventure",
    "fun zone",
    "arena",
    "party",
    "tournament",
    "league",
    "gala",
    "gathering",
    "bunch",
    "fight",
    "battle",
    "conflict",
    "encounter",
    "clash",
    "combat",
    "confrontation",
    "challenge",
];

/// Random room name; the lobby retries on collision.
pub fn room_name() -> String {
    let ref mut rng = rand::rng();
    format!(
        "The {} {}",
        ADJECTIVES.as_slice().choose(rng).expect("non empty adjectives"),
        NOUNS.as_slice().choose(rng).expect("non empty nouns"),
    )
}
