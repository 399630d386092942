use serde::{Deserialize, Serialize};

/// Selectors for the Google Meet page (verified against the UI as of March 2025)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetSelectors {
    pub name_field: String,
    pub ask_to_join: String,
    pub leave_button: String,
    pub people_button: String,
    pub participants_panel: String,
    /// Present once the bot has been sent back to the home screen
    pub kicked_detector: String,
    pub removed_notice: String,
}

impl Default for MeetSelectors {
    fn default() -> Self {
        Self {
            name_field: r#"input[type="text"][aria-label="Your name"]"#.to_string(),
            ask_to_join: r#"//button[.//span[text()="Ask to join"]]"#.to_string(),
            leave_button: r#"//button[@aria-label="Leave call"]"#.to_string(),
            people_button: r#"//button[@aria-label="People"]"#.to_string(),
            participants_panel: r#"[aria-label="Participants"]"#.to_string(),
            kicked_detector: r#"//button[.//span[text()="Return to home screen"]]"#.to_string(),
            removed_notice: r#"text="You've been removed from the meeting""#.to_string(),
        }
    }
}
