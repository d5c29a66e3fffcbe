//! Time-of-day progression across scenes.
//!
//! Precedence: jump phrases ("THREE DAYS LATER", "THE NEXT MORNING") beat
//! header markers (`EXT. ROAD - NIGHT`), which beat continuation from the
//! previous scene. Resolution is a pure function of its inputs.

use crate::models::{Setting, TimeContext, TimeOfDay, TimeProvenance};
use crate::utils::text::contains_term;

// ---------------------------------------------------------------------------
// Vocabulary tables
// ---------------------------------------------------------------------------

/// Header markers, longest first so "LATE NIGHT" wins over "NIGHT".
const HEADER_MARKERS: &[(&str, TimeOfDay)] = &[
    ("late night", TimeOfDay::DeepNight),
    ("early night", TimeOfDay::EarlyNight),
    ("golden hour", TimeOfDay::GoldenHour),
    ("early evening", TimeOfDay::Dusk),
    ("early morning", TimeOfDay::Dawn),
    ("deep night", TimeOfDay::DeepNight),
    ("midnight", TimeOfDay::DeepNight),
    ("afternoon", TimeOfDay::Afternoon),
    ("morning", TimeOfDay::Morning),
    ("sunrise", TimeOfDay::Dawn),
    ("sunset", TimeOfDay::GoldenHour),
    ("evening", TimeOfDay::Dusk),
    ("midday", TimeOfDay::Midday),
    ("twilight", TimeOfDay::EarlyNight),
    ("dawn", TimeOfDay::Dawn),
    ("dusk", TimeOfDay::Dusk),
    ("noon", TimeOfDay::Midday),
    ("night", TimeOfDay::Night),
    ("day", TimeOfDay::Midday),
];

/// Jump phrases that name the time they land on.
const NAMED_JUMPS: &[(&str, Option<TimeOfDay>)] = &[
    ("the next morning", Some(TimeOfDay::Morning)),
    ("the following morning", Some(TimeOfDay::Morning)),
    ("next morning", Some(TimeOfDay::Morning)),
    ("the next evening", Some(TimeOfDay::Dusk)),
    ("the following evening", Some(TimeOfDay::Dusk)),
    ("the next night", Some(TimeOfDay::Night)),
    ("the following night", Some(TimeOfDay::Night)),
    ("the next day", None),
    ("the following day", None),
    ("next day", None),
];

/// Units that turn "<n> <unit> later" into a jump.
const JUMP_UNITS: &[&str] = &[
    "hour", "hours", "day", "days", "week", "weeks", "month", "months", "year", "years",
];

/// Relative phrases implying a little elapsed time.
const ELAPSED_PHRASES: &[&str] = &[
    "moments later",
    "moments after",
    "minutes later",
    "shortly after",
    "soon after",
    "a while later",
    "some time later",
    "later",
];

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// A detected jump phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Jump {
    phrase: String,
    lands_on: Option<TimeOfDay>,
    hours_only: bool,
}

fn detect_jump(lower: &str) -> Option<Jump> {
    for (phrase, lands_on) in NAMED_JUMPS {
        if contains_term(lower, phrase) {
            return Some(Jump {
                phrase: phrase.to_uppercase(),
                lands_on: *lands_on,
                hours_only: false,
            });
        }
    }

    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    words.windows(2).enumerate().find_map(|(i, pair)| {
        if pair[1] != "later" || !JUMP_UNITS.contains(&pair[0]) {
            return None;
        }
        let quantity = i.checked_sub(1).map(|q| words[q]).filter(|q| {
            q.chars().all(|c| c.is_ascii_digit())
                || matches!(
                    *q,
                    "a" | "an"
                        | "one"
                        | "two"
                        | "three"
                        | "four"
                        | "five"
                        | "six"
                        | "seven"
                        | "eight"
                        | "nine"
                        | "ten"
                        | "few"
                        | "several"
                        | "many"
                )
        });
        let phrase = match quantity {
            Some(q) => format!("{} {} later", q, pair[0]),
            None => format!("{} later", pair[0]),
        };
        Some(Jump {
            phrase: phrase.to_uppercase(),
            lands_on: None,
            hours_only: pair[0].starts_with("hour"),
        })
    })
}

/// First screenplay slug line, e.g. `EXT. DESERT ROAD - NIGHT`.
fn header_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| {
        let upper = line.to_uppercase();
        ["INT.", "EXT.", "INT/EXT", "I/E", "INT ", "EXT "]
            .iter()
            .any(|marker| upper.starts_with(marker))
    })
}

/// Interior/exterior from a slug line. Mixed `INT./EXT.` counts as exterior.
pub fn header_setting(header: &str) -> Option<Setting> {
    let upper = header.trim().to_uppercase();
    if upper.starts_with("INT/EXT") || upper.starts_with("INT./EXT") || upper.starts_with("I/E")
    {
        Some(Setting::Exterior)
    } else if upper.starts_with("INT") {
        Some(Setting::Interior)
    } else if upper.starts_with("EXT") {
        Some(Setting::Exterior)
    } else {
        None
    }
}

/// Time marker named in a slug line.
pub fn header_time(header: &str) -> Option<TimeOfDay> {
    let lower = header.to_lowercase();
    HEADER_MARKERS
        .iter()
        .find(|(marker, _)| contains_term(&lower, marker))
        .map(|(_, time)| *time)
}

fn implies_elapsed(lower: &str) -> bool {
    ELAPSED_PHRASES.iter().any(|p| contains_term(lower, p))
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a scene's time context from its text and the previous scene's
/// ending time.
pub fn resolve(scene_text: &str, previous: Option<TimeOfDay>) -> TimeContext {
    let lower = scene_text.to_lowercase();
    let header = header_line(scene_text);
    let setting = header.and_then(header_setting);
    let marker = header.and_then(header_time);

    if let Some(jump) = detect_jump(&lower) {
        let time = jump.lands_on.or(marker).unwrap_or_else(|| {
            if jump.hours_only {
                previous
                    .map(|p| p.advance().advance())
                    .unwrap_or(TimeOfDay::Morning)
            } else {
                TimeOfDay::Morning
            }
        });
        tracing::debug!(phrase = %jump.phrase, %time, "Time jump");
        return TimeContext::new(time, setting, TimeProvenance::Jump, Some(jump.phrase));
    }

    if let Some(time) = marker {
        return TimeContext::new(time, setting, TimeProvenance::Detected, None);
    }

    let time = match previous {
        Some(prev) if implies_elapsed(&lower) => prev.advance(),
        Some(prev) => prev,
        None => TimeOfDay::Morning,
    };
    TimeContext::new(time, setting, TimeProvenance::Continued, None)
}

/// Resolve scenes in order, threading each ending time into the next scene.
pub fn resolve_sequence<'a>(
    scene_texts: impl IntoIterator<Item = &'a str>,
    starting_time: Option<TimeOfDay>,
) -> Vec<TimeContext> {
    let mut previous = starting_time;
    scene_texts
        .into_iter()
        .map(|text| {
            let ctx = resolve(text, previous);
            previous = Some(ctx.time());
            ctx
        })
        .collect()
}

/// Lighting tokens for a resolved time. Unknown settings light as exterior.
pub fn lighting_tokens(time: TimeOfDay, setting: Option<Setting>) -> Vec<&'static str> {
    let interior = setting == Some(Setting::Interior);
    match (time, interior) {
        (TimeOfDay::Dawn, false) => vec!["pale pre-dawn light", "cool blue ambient"],
        (TimeOfDay::Dawn, true) => vec!["faint dawn light through windows", "cool ambient fill"],
        (TimeOfDay::Morning, false) => vec!["soft morning sunlight", "long gentle shadows"],
        (TimeOfDay::Morning, true) => vec!["morning light through windows", "soft diffused fill"],
        (TimeOfDay::Midday, false) => vec!["harsh overhead sun", "hard short shadows"],
        (TimeOfDay::Midday, true) => vec!["bright diffused daylight", "even interior lighting"],
        (TimeOfDay::Afternoon, false) => vec!["warm afternoon sun", "angled shadows"],
        (TimeOfDay::Afternoon, true) => vec!["warm window light", "soft bounce light"],
        (TimeOfDay::GoldenHour, false) => vec!["golden hour sunlight", "long warm shadows"],
        (TimeOfDay::GoldenHour, true) => {
            vec!["low golden light through windows", "warm highlights"]
        }
        (TimeOfDay::Dusk, false) => vec!["fading dusk light", "purple-orange sky"],
        (TimeOfDay::Dusk, true) => vec!["dim dusk light", "practical lamps warming up"],
        (TimeOfDay::EarlyNight, false) => vec!["blue hour twilight", "first streetlights"],
        (TimeOfDay::EarlyNight, true) => vec!["warm practical lamps", "deepening shadows"],
        (TimeOfDay::Night, false) => vec!["cold moonlight", "deep blue shadows"],
        (TimeOfDay::Night, true) => vec!["low-key practical lighting", "pools of lamplight"],
        (TimeOfDay::DeepNight, false) => vec!["sparse moonlight", "near-total darkness"],
        (TimeOfDay::DeepNight, true) => vec!["single practical light source", "heavy shadows"],
    }
}
