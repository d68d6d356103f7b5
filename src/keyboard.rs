use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::quiz::ALLOWED_COUNTS;

pub(crate) fn action_keyboard() -> KeyboardMarkup {
    let keyboard = vec![vec![KeyboardButton::new("New quiz📝")]];

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn count_keyboard() -> KeyboardMarkup {
    let keyboard: Vec<Vec<KeyboardButton>> = ALLOWED_COUNTS
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|count| KeyboardButton::new(format!("{count} questions")))
                .collect()
        })
        .collect();

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn tier_keyboard() -> KeyboardMarkup {
    let keyboard = vec![vec![
        KeyboardButton::new("KS2 (age 10-11)"),
        KeyboardButton::new("KS3 (age 11-14)"),
    ]];

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn next_keyboard(is_last: bool) -> KeyboardMarkup {
    let label = if is_last { "Finish🎉" } else { "Next➡️" };
    let keyboard = vec![vec![KeyboardButton::new(label)]];

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn play_again_keyboard() -> KeyboardMarkup {
    let keyboard = vec![vec![KeyboardButton::new("New quiz📝")]];

    KeyboardMarkup::new(keyboard)
}
