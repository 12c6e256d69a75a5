use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::{
    feedback::{Comment, CommentId, ContentRef, Draft, ThreadEntry},
    ui::{
        Action,
        components::Remote,
        transition::{Direction, Transition, revealed_rows},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    NotFetched,
    Loading,
    Loaded,
    Failed,
}

/// What the feed shows under a main comment.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadView<'a> {
    Hidden,
    Loading,
    Failed,
    Empty,
    Entries {
        entries: &'a [ThreadEntry],
        /// `1.0` once fully shown; lower while animating.
        visibility: f32,
    },
}

/// Replies below one main comment. Fetched lazily on first expansion and
/// cached for the life of the thread.
#[derive(Debug)]
pub struct ReplyThread {
    main_id: CommentId,
    expanded: bool,
    fetch: FetchState,
    entries: Vec<ThreadEntry>,
    transition: Option<Transition>,
    transition_duration: Duration,
    error: Option<String>,
}

impl ReplyThread {
    pub fn new(main_id: CommentId, transition_duration: Duration) -> Self {
        Self {
            main_id,
            expanded: false,
            fetch: FetchState::NotFetched,
            entries: Vec::new(),
            transition: None,
            transition_duration,
            error: None,
        }
    }

    pub fn main_id(&self) -> &CommentId {
        &self.main_id
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn fetch_state(&self) -> FetchState {
        self.fetch
    }

    pub fn entries(&self) -> &[ThreadEntry] {
        &self.entries
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn toggle(&mut self, remote: &Remote, now: Instant) {
        self.expanded = !self.expanded;
        let direction = if self.expanded {
            Direction::Enter
        } else {
            Direction::Exit
        };
        self.transition = Some(Transition::new(direction, now, self.transition_duration));
        if self.expanded && self.fetch == FetchState::NotFetched {
            self.fetch_replies(remote);
        }
    }

    fn expand(&mut self, remote: &Remote, now: Instant) {
        if !self.expanded {
            self.toggle(remote, now);
        }
    }

    pub fn fetch_replies(&mut self, remote: &Remote) {
        if self.fetch == FetchState::Loading {
            return;
        }
        self.fetch = FetchState::Loading;
        self.error = None;
        let main_id = self.main_id.clone();
        remote.spawn(move |api| async move {
            match api.replies(&main_id).await {
                Ok(replies) => Action::RepliesLoaded { main_id, replies },
                Err(err) => Action::RepliesError {
                    main_id,
                    message: err.status_message(),
                },
            }
        });
    }

    /// Inserts a pending entry at the top and posts it.
    pub fn submit_reply(&mut self, remote: &Remote, content: &ContentRef, draft: Draft) {
        let main_id = self.main_id.clone();
        let content = content.clone();
        let text = draft.text.clone();
        let draft_id = draft.local_id;
        self.entries.insert(0, ThreadEntry::Pending(draft));
        remote.spawn(move |api| async move {
            match api.post_reply(&content, &main_id, &text).await {
                Ok(reply) => Action::ReplyPosted {
                    main_id,
                    draft_id,
                    reply,
                },
                Err(err) => Action::ReplyPostError {
                    main_id,
                    draft_id,
                    message: err.status_message(),
                },
            }
        });
    }

    pub fn handle_action(&mut self, remote: &Remote, action: &Action, now: Instant) -> bool {
        match action {
            Action::RepliesLoaded { main_id, replies } if *main_id == self.main_id => {
                self.fetch = FetchState::Loaded;
                self.merge_fetched(replies);
                info!(main_id = %self.main_id, count = self.entries.len(), "replies loaded");
                true
            }
            Action::RepliesError { main_id, message } if *main_id == self.main_id => {
                warn!(%main_id, %message, "failed to load replies");
                self.fetch = FetchState::Failed;
                self.error = Some(message.clone());
                true
            }
            Action::ReplyPosted {
                main_id,
                draft_id,
                reply,
            } if *main_id == self.main_id => {
                self.confirm(*draft_id, reply.clone());
                self.expand(remote, now);
                true
            }
            Action::ReplyPostError {
                main_id,
                draft_id,
                message,
            } if *main_id == self.main_id => {
                warn!(%main_id, %message, "failed to post reply");
                self.entries
                    .retain(|e| !matches!(e, ThreadEntry::Pending(d) if d.local_id == *draft_id));
                true
            }
            _ => false,
        }
    }

    fn confirm(&mut self, draft_id: u64, reply: Comment) {
        // a fetch that raced the post may already carry the server copy
        if let Some(idx) = self
            .entries
            .iter()
            .position(|e| e.comment().is_some_and(|c| c.id == reply.id))
        {
            self.entries.remove(idx);
        }
        let pending = self
            .entries
            .iter()
            .position(|e| matches!(e, ThreadEntry::Pending(d) if d.local_id == draft_id));
        match pending {
            Some(idx) => self.entries[idx] = ThreadEntry::Confirmed(reply),
            None => self.entries.insert(0, ThreadEntry::Confirmed(reply)),
        }
    }

    /// Local entries stay on top in their order; server replies follow,
    /// without the ones already shown.
    fn merge_fetched(&mut self, replies: &[Comment]) {
        let local_ids = self
            .entries
            .iter()
            .filter_map(ThreadEntry::comment)
            .map(|c| c.id.clone())
            .collect::<HashSet<_>>();
        self.entries.extend(
            replies
                .iter()
                .filter(|r| !local_ids.contains(&r.id))
                .cloned()
                .map(ThreadEntry::Confirmed),
        );
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.transition.is_some_and(|t| !t.is_done(now))
    }

    /// Drops a finished transition.
    pub fn settle(&mut self, now: Instant) {
        if self.transition.is_some_and(|t| t.is_done(now)) {
            self.transition = None;
        }
    }

    pub fn view(&self, now: Instant) -> ThreadView<'_> {
        let visibility = match self.transition {
            Some(t) if !t.is_done(now) => t.visibility(now),
            _ if self.expanded => 1.0,
            _ => return ThreadView::Hidden,
        };
        if visibility <= 0.0 {
            return ThreadView::Hidden;
        }
        if !self.entries.is_empty() {
            return ThreadView::Entries {
                entries: &self.entries,
                visibility,
            };
        }
        match self.fetch {
            FetchState::NotFetched | FetchState::Loading => ThreadView::Loading,
            FetchState::Failed => ThreadView::Failed,
            FetchState::Loaded => ThreadView::Empty,
        }
    }

    /// Entries visible right now, honouring the reveal animation.
    pub fn visible_entries(&self, now: Instant) -> &[ThreadEntry] {
        match self.view(now) {
            ThreadView::Entries {
                entries,
                visibility,
            } => &entries[..revealed_rows(entries.len(), visibility)],
            _ => &[],
        }
    }
}

pub fn draft(local_id: u64, text: &str) -> Draft {
    Draft {
        local_id,
        text: Arc::from(text),
    }
}
