//! Slack message rendering for milestone events
//!
//! Uses Slack mrkdwn: `<url|label>` links and backtick code spans.

use serde::Serialize;

use super::event::{ChangeProperty, MilestoneEvent};

/// Rendering of a value GitHub did not send
const MISSING: &str = "null";

/// A message ready to post to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub channel: String,
    pub text: String,
}

impl NotificationMessage {
    /// Build a message from an already formatted text
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
        }
    }

    /// Render `event` for `channel`.
    pub fn for_event(channel: impl Into<String>, event: &MilestoneEvent) -> Self {
        Self::new(channel, format(event))
    }
}

/// Render an event as a summary line followed by one line per changed property.
pub fn format(event: &MilestoneEvent) -> String {
    let milestone = &event.milestone;
    let mut lines = vec![format!(
        "`{}` milestone <{}|{}> was `{}`.",
        event.repository.full_name, milestone.html_url, milestone.title, event.action
    )];

    if let Some(changes) = &event.changes {
        let tracked = [
            ("title", &changes.title, Some(milestone.title.as_str())),
            (
                "description",
                &changes.description,
                milestone.description.as_deref(),
            ),
            ("Due On", &changes.due_on, milestone.due_on.as_deref()),
        ];

        for (name, property, current) in tracked {
            if let ChangeProperty::Changed { from } = property {
                lines.push(format!(
                    "The property `{}` has been changed from `{}` to `{}`",
                    name,
                    from.as_deref().unwrap_or(MISSING),
                    current.unwrap_or(MISSING)
                ));
            }
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::event::{Action, Changes, Milestone, Repository};

    fn event(action: Action, changes: Option<Changes>) -> MilestoneEvent {
        MilestoneEvent {
            action,
            milestone: Milestone {
                title: "v2".to_string(),
                html_url: "http://x/1".to_string(),
                description: Some("Second release".to_string()),
                due_on: None,
            },
            repository: Repository {
                full_name: "octo/repo".to_string(),
            },
            changes,
        }
    }

    #[test]
    fn test_summary_only() {
        let text = format(&event(Action::Created, None));
        assert_eq!(text, "`octo/repo` milestone <http://x/1|v2> was `CREATED`.");
    }

    #[test]
    fn test_title_change() {
        let changes = Changes {
            title: ChangeProperty::changed("v1"),
            ..Changes::default()
        };

        let text = format(&event(Action::Edited, Some(changes)));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "`octo/repo` milestone <http://x/1|v2> was `EDITED`.",
                "The property `title` has been changed from `v1` to `v2`",
            ]
        );
    }

    #[test]
    fn test_all_changes_in_declaration_order() {
        let changes = Changes {
            due_on: ChangeProperty::changed("2019-09-01T07:00:00Z"),
            description: ChangeProperty::changed("First"),
            title: ChangeProperty::changed("v1"),
        };

        let text = format(&event(Action::Edited, Some(changes)));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("The property `title`"));
        assert_eq!(
            lines[2],
            "The property `description` has been changed from `First` to `Second release`"
        );
        assert_eq!(
            lines[3],
            "The property `Due On` has been changed from `2019-09-01T07:00:00Z` to `null`"
        );
    }

    #[test]
    fn test_missing_previous_value() {
        let changes = Changes {
            description: ChangeProperty::Changed { from: None },
            ..Changes::default()
        };

        let text = format(&event(Action::Edited, Some(changes)));
        assert!(text.ends_with(
            "\nThe property `description` has been changed from `null` to `Second release`"
        ));
    }

    #[test]
    fn test_empty_changes_renders_summary_only() {
        let text = format(&event(Action::Edited, Some(Changes::default())));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_message_serializes_for_chat_post() {
        let message = NotificationMessage::for_event("C123", &event(Action::Closed, None));
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["channel"], "C123");
        assert_eq!(
            json["text"],
            "`octo/repo` milestone <http://x/1|v2> was `CLOSED`."
        );
    }
}
