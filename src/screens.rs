//! Text for the fixed screens: landing, start form, goal panel, help
//! overlay, chat lines, and the end screen.

use colored::*;

use crate::chat::{ChatEntry, Speaker};
use crate::protocol::QuickReply;

pub const TITLE: &str = "Creative Wand Experiment System";

pub const MISSING_MODE: &str =
    "Missing experiment parameters - please re-click the link in the survey, thank you.";

pub const GOAL_TITLE: &str = "Instructions and Your goals";

pub const HELP_TEXT: &str = "\
I'm your Creative Wand, here to work together on writing a story with you.
You will see a list of actions available to you.
Tell me what you wish to do by typing in the word in the bracket.
Once you selected an action, I will further guide you through each of it.
Enjoy the collaborative experience!";

pub const COMMANDS: &str = "\
Commands: /help toggle help, /doc show the document, /goal show your goals, /end end the session.
Type #1, #2, ... to pick a suggested reply, or anything else to chat.";

pub const CODE_PROMPT: &str = "Enter your session code to start:";

pub const EMPTY_CODE: &str = "The session code cannot be empty.";

pub fn landing(mode: Option<&str>) -> String {
    format!(
        "{}\n\n{}\n{}\nIf things don't work, please send a message to us reporting what is happening.\nDebug info: Mode {}",
        TITLE.bold(),
        "Type /help at any time if you need to check instructions.",
        "In case you accidentally closed the survey window, just reopen it - your progress is automatically saved.",
        mode.unwrap_or("")
    )
}

pub fn help_overlay() -> String {
    format!("{}\n{}\n\n{}", "Help Information".bold(), HELP_TEXT, COMMANDS.dimmed())
}

pub fn goal_panel(markdown: &str) -> String {
    format!("{}\n{}", GOAL_TITLE.bold().underline(), markdown.trim_end())
}

pub fn end_screen(pid: Option<&str>) -> String {
    format!(
        "{}\nYour participant ID is: {}\nPlease go back to the survey to continue. Thank you.\n(If you have accidentally closed it, you may be able to recover by revisiting the survey link.)",
        "Thanks for trying out Creative Wand!".bold(),
        pid.unwrap_or("")
    )
}

/// Shown when the backend drops the connection before the session ended.
pub fn connection_lost(pid: Option<&str>) -> String {
    format!(
        "{}\nYour progress is saved. Please re-open the link from the survey to continue.\nYour participant ID is: {}",
        "Lost connection to Creative Wand.".red().bold(),
        pid.unwrap_or("")
    )
}

pub fn chat_line(entry: &ChatEntry) -> String {
    match entry.speaker {
        Speaker::Wand => format!("{} {}", "wand>".bright_magenta().bold(), entry.text),
        Speaker::User => format!("{} {}", "you>".bright_cyan().bold(), entry.text),
    }
}

/// Numbered quick replies, one per line. Empty when none are offered.
pub fn quick_reply_menu(replies: &[QuickReply]) -> String {
    replies
        .iter()
        .enumerate()
        .map(|(i, r)| format!("  {} {}", format!("#{}", i + 1).yellow(), r.label))
        .collect::<Vec<_>>()
        .join("\n")
}
