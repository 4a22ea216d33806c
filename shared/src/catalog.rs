//! Static game content: prompts players react to, the reactions they can
//! pick from, and the modifiers handed out each round.

use crate::{ModifierKind, Reaction, ReactionKind};

pub const PROMPTS: [&str; 8] = [
    "When you see your ex at the grocery store",
    "Your boss says 'we need to talk'",
    "Group project and you did all the work",
    "When the WiFi goes down during an important video call",
    "Trying to look busy when your manager walks by",
    "When someone asks what you do for fun",
    "Your food delivery arrives 2 hours late",
    "When you realize you've been on mute the whole meeting",
];

const THIS_IS_FINE: &str = "https://media.giphy.com/media/3o7TKTDn976rzVgky4/giphy.gif";
const EYE_ROLL: &str = "https://media.giphy.com/media/13d2jHlSlxklVe/giphy.gif";
const AWKWARD: &str = "https://media.giphy.com/media/1X7lCRp8iE0yrdZvwd/giphy.gif";
const NOPE: &str = "https://media.giphy.com/media/l3q2K5jinAlChoCLS/giphy.gif";
const DRAMA: &str = "https://media.giphy.com/media/xT9IgG50Fb7Mi0prBC/giphy.gif";
const CONFUSED: &str = "https://media.giphy.com/media/3oz8xLd9DJq2l2VFtu/giphy.gif";

// (id, url, caption)
const REACTION_TABLE: [(u32, &str, &str); 12] = [
    (1, THIS_IS_FINE, "This is fine"),
    (2, EYE_ROLL, "Eye roll"),
    (3, AWKWARD, "Awkward"),
    (4, NOPE, "Nope"),
    (5, DRAMA, "Drama"),
    (6, CONFUSED, "Confused"),
    (7, NOPE, "Nope"),
    (8, DRAMA, "Drama"),
    (9, CONFUSED, "Confused"),
    (10, THIS_IS_FINE, "This is fine"),
    (11, EYE_ROLL, "Eye roll"),
    (12, AWKWARD, "Awkward"),
];

/// Display information for a modifier kind
pub struct ModifierInfo {
    pub kind: ModifierKind,
    pub name: &'static str,
    pub description: &'static str,
}

pub const MODIFIERS: [ModifierInfo; 2] = [
    ModifierInfo {
        kind: ModifierKind::DoublePoints,
        name: "Double Points",
        description: "Double your points for this round.",
    },
    ModifierInfo {
        kind: ModifierKind::AnonymousResponse,
        name: "Anonymous Response",
        description: "Submit your response anonymously.",
    },
];

fn to_reaction(&(id, url, caption): &(u32, &str, &str)) -> Reaction {
    Reaction {
        id,
        kind: ReactionKind::Gif,
        url: url.to_string(),
        caption: caption.to_string(),
    }
}

/// Returns the full reaction catalog in id order
pub fn reactions() -> Vec<Reaction> {
    REACTION_TABLE.iter().map(to_reaction).collect()
}

/// Looks up a single reaction by id
pub fn reaction(id: u32) -> Option<Reaction> {
    REACTION_TABLE
        .iter()
        .find(|(reaction_id, _, _)| *reaction_id == id)
        .map(to_reaction)
}

pub fn modifier_info(kind: ModifierKind) -> &'static ModifierInfo {
    // Every kind has exactly one entry in MODIFIERS
    match kind {
        ModifierKind::DoublePoints => &MODIFIERS[0],
        ModifierKind::AnonymousResponse => &MODIFIERS[1],
    }
}
