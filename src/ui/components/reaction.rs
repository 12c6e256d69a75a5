use std::collections::HashMap;

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use tracing::{debug, warn};

use crate::{
    feedback::{Comment, CommentId, Reaction, ReactionSnapshot, format::format_compact},
    ui::{Action, components::Remote, theme::Theme},
};

#[derive(Debug, Clone, Default)]
struct ReactionEntry {
    snapshot: ReactionSnapshot,
    in_flight: bool,
    /// Set once the viewer changed the reaction; a late initial fetch must
    /// not overwrite the newer server answer.
    edited: bool,
    error: Option<String>,
}

/// Like/dislike state for every comment row the viewer has seen, keyed by id.
#[derive(Debug, Default)]
pub struct Reactions {
    entries: HashMap<CommentId, ReactionEntry>,
}

impl Reactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the entry from the comment's counters and fetches the viewer's
    /// reaction the first time a row is shown. Later calls do nothing.
    pub fn mount(&mut self, remote: &Remote, comment: &Comment) {
        if self.entries.contains_key(&comment.id) {
            return;
        }
        self.entries.insert(
            comment.id.clone(),
            ReactionEntry {
                snapshot: ReactionSnapshot::from_counts(comment),
                ..ReactionEntry::default()
            },
        );
        let comment_id = comment.id.clone();
        remote.spawn(move |api| async move {
            match api.reaction(&comment_id).await {
                Ok(snapshot) => Action::ReactionLoaded {
                    comment_id,
                    snapshot,
                },
                Err(err) => Action::ReactionLoadError {
                    comment_id,
                    message: err.status_message(),
                },
            }
        });
    }

    /// Sends the toggled reaction for `kind`. Returns `false` when the tap is
    /// rejected because a request for this comment is still in flight or the
    /// row was never mounted.
    pub fn set_reaction(&mut self, remote: &Remote, comment_id: &CommentId, kind: Reaction) -> bool {
        let Some(entry) = self.entries.get_mut(comment_id) else {
            return false;
        };
        if entry.in_flight {
            debug!(%comment_id, "reaction request already in flight");
            return false;
        }
        let next = entry.snapshot.reaction.toggled(kind);
        entry.in_flight = true;
        entry.edited = true;
        entry.error = None;
        let comment_id = comment_id.clone();
        remote.spawn(move |api| async move {
            match api.set_reaction(&comment_id, next).await {
                Ok(snapshot) => Action::ReactionUpdated {
                    comment_id,
                    snapshot,
                },
                Err(err) => Action::ReactionEditError {
                    comment_id,
                    message: err.status_message(),
                },
            }
        });
        true
    }

    pub fn handle_action(&mut self, action: &Action) -> bool {
        match action {
            Action::ReactionLoaded {
                comment_id,
                snapshot,
            } => {
                if let Some(entry) = self.entries.get_mut(comment_id)
                    && !entry.edited
                {
                    entry.snapshot = *snapshot;
                    return true;
                }
            }
            Action::ReactionLoadError {
                comment_id,
                message,
            } => {
                warn!(%comment_id, %message, "failed to load reaction");
            }
            Action::ReactionUpdated {
                comment_id,
                snapshot,
            } => {
                if let Some(entry) = self.entries.get_mut(comment_id) {
                    entry.in_flight = false;
                    entry.snapshot = *snapshot;
                    return true;
                }
            }
            Action::ReactionEditError {
                comment_id,
                message,
            } => {
                warn!(%comment_id, %message, "failed to update reaction");
                if let Some(entry) = self.entries.get_mut(comment_id) {
                    entry.in_flight = false;
                    entry.error = Some(message.clone());
                    return true;
                }
            }
            _ => {}
        }
        false
    }

    pub fn snapshot(&self, comment_id: &CommentId) -> Option<ReactionSnapshot> {
        self.entries.get(comment_id).map(|e| e.snapshot)
    }

    pub fn is_in_flight(&self, comment_id: &CommentId) -> bool {
        self.entries.get(comment_id).is_some_and(|e| e.in_flight)
    }

    pub fn forget(&mut self, comment_id: &CommentId) {
        self.entries.remove(comment_id);
    }

    pub fn line(&self, comment: &Comment, theme: &Theme, indent: usize) -> Line<'static> {
        let snapshot = self
            .snapshot(&comment.id)
            .unwrap_or_else(|| ReactionSnapshot::from_counts(comment));
        let held = |kind: Reaction| {
            if snapshot.reaction == kind {
                Modifier::BOLD | Modifier::REVERSED
            } else {
                Modifier::empty()
            }
        };
        let mut spans = vec![
            Span::raw(" ".repeat(indent)),
            Span::styled(
                format!(" ▲ {} ", format_compact(snapshot.likes)),
                Style::new().fg(theme.like).add_modifier(held(Reaction::Like)),
            ),
            Span::raw(" "),
            Span::styled(
                format!(" ▼ {} ", format_compact(snapshot.dislikes)),
                Style::new()
                    .fg(theme.dislike)
                    .add_modifier(held(Reaction::Dislike)),
            ),
        ];
        if let Some(entry) = self.entries.get(&comment.id) {
            if entry.in_flight {
                spans.push(Span::styled("  …", theme.muted()));
            } else if let Some(err) = &entry.error {
                spans.push(Span::styled(format!("  {err}"), theme.error()));
            }
        }
        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::fake::FakeApi,
        feedback::sample_comment,
        ui::components::testing::{next_action, remote},
    };

    async fn pump(reactions: &mut Reactions, rx: &mut tokio::sync::mpsc::Receiver<Action>) {
        let action = next_action(rx).await;
        reactions.handle_action(&action);
    }

    #[tokio::test]
    async fn mount_fetches_once() {
        let api = FakeApi::new();
        let (remote, mut rx) = remote(api.clone());
        let comment = sample_comment("c1", "amina", "hello");
        let mut reactions = Reactions::new();
        reactions.mount(&remote, &comment);
        reactions.mount(&remote, &comment);
        pump(&mut reactions, &mut rx).await;
        assert_eq!(api.count_calls("reaction c1"), 1);
    }

    #[tokio::test]
    async fn liking_twice_returns_to_initial_state() {
        let api = FakeApi::new();
        let comment_id = CommentId::new("c1");
        api.edit(|s| {
            s.reactions.insert(
                comment_id.clone(),
                ReactionSnapshot {
                    reaction: Reaction::None,
                    likes: 4,
                    dislikes: 1,
                },
            );
        });
        let (remote, mut rx) = remote(api.clone());
        let mut reactions = Reactions::new();
        reactions.mount(&remote, &sample_comment("c1", "amina", "hello"));
        pump(&mut reactions, &mut rx).await;
        let initial = reactions.snapshot(&comment_id).unwrap();

        assert!(reactions.set_reaction(&remote, &comment_id, Reaction::Like));
        pump(&mut reactions, &mut rx).await;
        let liked = reactions.snapshot(&comment_id).unwrap();
        assert_eq!(liked.reaction, Reaction::Like);
        assert_eq!(liked.likes, 5);

        assert!(reactions.set_reaction(&remote, &comment_id, Reaction::Like));
        pump(&mut reactions, &mut rx).await;
        assert_eq!(reactions.snapshot(&comment_id).unwrap(), initial);
        assert_eq!(api.count_calls("set_reaction c1 like"), 1);
        assert_eq!(api.count_calls("set_reaction c1 none"), 1);
    }

    #[tokio::test]
    async fn opposite_reaction_replaces_held_one() {
        let api = FakeApi::new();
        let comment_id = CommentId::new("c1");
        let (remote, mut rx) = remote(api.clone());
        let mut reactions = Reactions::new();
        reactions.mount(&remote, &sample_comment("c1", "amina", "hello"));
        pump(&mut reactions, &mut rx).await;

        reactions.set_reaction(&remote, &comment_id, Reaction::Like);
        pump(&mut reactions, &mut rx).await;
        reactions.set_reaction(&remote, &comment_id, Reaction::Dislike);
        pump(&mut reactions, &mut rx).await;
        let snapshot = reactions.snapshot(&comment_id).unwrap();
        assert_eq!(snapshot.reaction, Reaction::Dislike);
        assert_eq!((snapshot.likes, snapshot.dislikes), (0, 1));
    }

    #[tokio::test]
    async fn taps_while_in_flight_are_rejected() {
        let api = FakeApi::new();
        let comment_id = CommentId::new("c1");
        let (remote, mut rx) = remote(api.clone());
        let mut reactions = Reactions::new();
        reactions.mount(&remote, &sample_comment("c1", "amina", "hello"));
        pump(&mut reactions, &mut rx).await;

        assert!(reactions.set_reaction(&remote, &comment_id, Reaction::Like));
        assert!(reactions.is_in_flight(&comment_id));
        assert!(!reactions.set_reaction(&remote, &comment_id, Reaction::Dislike));
        pump(&mut reactions, &mut rx).await;
        assert!(!reactions.is_in_flight(&comment_id));
        assert_eq!(api.count_calls("set_reaction"), 1);
    }

    #[tokio::test]
    async fn failure_keeps_prior_state() {
        let api = FakeApi::new();
        let comment_id = CommentId::new("c1");
        let (remote, mut rx) = remote(api.clone());
        let mut reactions = Reactions::new();
        let mut comment = sample_comment("c1", "amina", "hello");
        comment.like_count = 2;
        api.fail("reaction");
        reactions.mount(&remote, &comment);
        pump(&mut reactions, &mut rx).await;
        let before = reactions.snapshot(&comment_id).unwrap();
        assert_eq!(before.likes, 2);

        api.fail("set_reaction");
        reactions.set_reaction(&remote, &comment_id, Reaction::Like);
        pump(&mut reactions, &mut rx).await;
        assert_eq!(reactions.snapshot(&comment_id).unwrap(), before);
        assert!(!reactions.is_in_flight(&comment_id));
    }

    #[tokio::test]
    async fn late_initial_fetch_does_not_override_edit() {
        let api = FakeApi::new();
        let comment_id = CommentId::new("c1");
        let (remote, _rx) = remote(api.clone());
        let mut reactions = Reactions::new();
        reactions.mount(&remote, &sample_comment("c1", "amina", "hello"));
        reactions.set_reaction(&remote, &comment_id, Reaction::Like);
        reactions.handle_action(&Action::ReactionUpdated {
            comment_id: comment_id.clone(),
            snapshot: ReactionSnapshot {
                reaction: Reaction::Like,
                likes: 1,
                dislikes: 0,
            },
        });
        reactions.handle_action(&Action::ReactionLoaded {
            comment_id: comment_id.clone(),
            snapshot: ReactionSnapshot::default(),
        });
        assert_eq!(reactions.snapshot(&comment_id).unwrap().reaction, Reaction::Like);
    }
}
