//! Rules for which blocks may be locked.
//!
//! Only containers, doors, and a few valuable work blocks are protectable.
//! Block identifiers are matched by substring, so namespaced and variant ids
//! (`minecraft:oak_door`, `minecraft:trapped_chest`) are covered.

const PROTECTABLE: &[&str] = &[
    "chest",
    "door",
    "furnace",
    "brewing_stand",
    "hopper",
    "dropper",
    "dispenser",
    "barrel",
    "shulker_box",
    "anvil",
    "enchanting_table",
    "beacon",
];

/// Whether a block of this type may be locked.
pub fn is_protectable(block_id: &str) -> bool {
    let id = block_id.to_ascii_lowercase();
    PROTECTABLE.iter().any(|pattern| id.contains(pattern))
}

/// A friendly name for a block id: namespace stripped, words title-cased.
///
/// `minecraft:trapped_chest` becomes `Trapped Chest`.
pub fn display_name(block_id: &str) -> String {
    let name = match block_id.split_once(':') {
        Some((_, rest)) => rest,
        None => block_id,
    };
    let words: Vec<String> = name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Unknown".to_string()
    } else {
        words.join(" ")
    }
}
