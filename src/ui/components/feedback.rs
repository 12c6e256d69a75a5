use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Local;
use rat_widget::{
    event::{HandleEvent, Outcome, Regular, ct_event},
    focus::{FocusBuilder, FocusFlag, HasFocus, Navigation},
    list::{ListState, selection::RowSelection},
};
use ratatui::{
    buffer::Buffer,
    crossterm::event::Event,
    layout::Rect,
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, ListItem, StatefulWidget},
};
use throbber_widgets_tui::{BRAILLE_SIX_DOUBLE, Throbber, ThrobberState, WhichUse};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::{
    errors::AppError,
    feedback::{
        Comment, CommentId, Reaction, ThreadEntry, Viewer,
        format::{relative_date, truncate_words},
    },
    ui::{
        Action, AppState,
        components::{
            Component, Remote,
            comment_feed::CommentFeed,
            composer::{self, CommentComposer, ComposerMode, ComposerOutcome},
            help::HelpElementKind,
            reaction::Reactions,
            reply_thread::{self, FetchState, ReplyThread, ThreadView},
        },
        layout::Layout,
        theme::Theme,
        utils::get_border_style,
    },
};

pub const HELP: &[HelpElementKind] = &[
    crate::help_text!("Comments Help"),
    crate::help_keybind!("Up/Down", "select comment"),
    crate::help_keybind!("Enter / Space", "show or hide replies"),
    crate::help_keybind!("l / d", "like / dislike"),
    crate::help_keybind!("r", "reply to selected comment"),
    crate::help_keybind!("c", "add a main comment"),
    crate::help_keybind!("x", "delete your own main comment"),
    crate::help_keybind!("y", "copy comment text"),
    crate::help_keybind!("n / End", "load more comments"),
    crate::help_keybind!("g", "refresh"),
    crate::help_keybind!("?", "toggle help"),
    crate::help_keybind!("q / Ctrl+C", "quit"),
];

const REPLY_INDENT: usize = 4;

/// Identity of one rendered list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKey {
    Main(CommentId),
    Reply { main: CommentId, index: usize },
    /// Loading, empty or failed marker under an expanded thread.
    Placeholder(CommentId),
    Footer,
}

/// The comment section of one article or video.
pub struct FeedbackView {
    remote: Remote,
    theme: Arc<Theme>,
    viewer: Viewer,
    upgrade_url: String,
    feed: CommentFeed,
    threads: HashMap<CommentId, ReplyThread>,
    reactions: Reactions,
    composer: CommentComposer,
    rows: Vec<RowKey>,
    list_state: ListState<RowSelection>,
    /// Bumped by every confirmed main comment; each bump restarts the feed.
    refresh_key: u64,
    next_draft: u64,
    pending_reply: Option<u64>,
    deleting: HashSet<CommentId>,
    throbber_state: ThrobberState,
    focus: FocusFlag,
    area: Rect,
}

impl FeedbackView {
    pub fn new(state: AppState, action_tx: Sender<Action>) -> Self {
        let remote = Remote::new(state.api.clone(), action_tx, CancellationToken::new());
        let mut feed = CommentFeed::new(state.content.clone(), state.config.api.page_size);
        feed.load(&remote);
        Self {
            composer: CommentComposer::new(state.theme.clone(), state.config.composer.word_limit),
            remote,
            theme: state.theme,
            viewer: state.viewer,
            upgrade_url: state.config.links.upgrade_url.clone(),
            feed,
            threads: HashMap::new(),
            reactions: Reactions::new(),
            rows: vec![RowKey::Footer],
            list_state: ListState::default(),
            refresh_key: 0,
            next_draft: 0,
            pending_reply: None,
            deleting: HashSet::new(),
            throbber_state: ThrobberState::default(),
            focus: FocusFlag::new().with_name("feedback"),
            area: Rect::default(),
        }
    }

    pub fn feed(&self) -> &CommentFeed {
        &self.feed
    }

    pub fn refresh_key(&self) -> u64 {
        self.refresh_key
    }

    pub fn composer(&self) -> &CommentComposer {
        &self.composer
    }

    pub fn thread(&self, main_id: &CommentId) -> Option<&ReplyThread> {
        self.threads.get(main_id)
    }

    pub fn rows(&self) -> &[RowKey] {
        &self.rows
    }

    fn notify(&self, message: impl Into<String>) {
        let _ = self.remote.action_tx.try_send(Action::Notice(message.into()));
    }

    fn report_count(&self) {
        let _ = self.remote.action_tx.try_send(Action::FeedCountChanged {
            loaded: self.feed.comments().len(),
            total: self.feed.total_count(),
        });
    }

    fn selected_index(&self) -> Option<usize> {
        self.list_state.selected().filter(|idx| *idx < self.rows.len())
    }

    fn selected_key(&self) -> Option<&RowKey> {
        self.selected_index().and_then(|idx| self.rows.get(idx))
    }

    fn select(&mut self, idx: usize) {
        let _ = self.list_state.select(Some(idx));
    }

    fn comment_for(&self, key: &RowKey) -> Option<&Comment> {
        match key {
            RowKey::Main(id) => self.feed.comments().iter().find(|c| &c.id == id),
            RowKey::Reply { main, index } => self
                .threads
                .get(main)
                .and_then(|t| t.entries().get(*index))
                .and_then(ThreadEntry::comment),
            RowKey::Placeholder(_) | RowKey::Footer => None,
        }
    }

    /// Rebuilds the row list from the feed and the visible part of each
    /// thread, keeping the selection on the same row where possible. Every
    /// comment that gets a row is mounted for reactions.
    fn sync_rows(&mut self, now: Instant) {
        let previous = self.selected_index();
        let selected = previous.and_then(|idx| self.rows.get(idx).cloned());
        let mut rows = Vec::with_capacity(self.rows.len());
        for comment in self.feed.comments() {
            rows.push(RowKey::Main(comment.id.clone()));
            self.reactions.mount(&self.remote, comment);
            let Some(thread) = self.threads.get_mut(&comment.id) else {
                continue;
            };
            thread.settle(now);
            match thread.view(now) {
                ThreadView::Hidden => {}
                ThreadView::Entries { .. } => {
                    for (index, entry) in thread.visible_entries(now).iter().enumerate() {
                        if let Some(reply) = entry.comment() {
                            self.reactions.mount(&self.remote, reply);
                        }
                        rows.push(RowKey::Reply {
                            main: comment.id.clone(),
                            index,
                        });
                    }
                }
                ThreadView::Loading | ThreadView::Failed | ThreadView::Empty => {
                    rows.push(RowKey::Placeholder(comment.id.clone()));
                }
            }
        }
        rows.push(RowKey::Footer);
        let target = selected
            .and_then(|key| rows.iter().position(|row| *row == key))
            .or_else(|| previous.map(|idx| idx.min(rows.len() - 1)))
            .unwrap_or(0);
        self.rows = rows;
        self.select(target);
    }

    fn toggle_selected(&mut self, now: Instant) {
        let Some(key) = self.selected_key().cloned() else {
            return;
        };
        match key {
            RowKey::Main(id) => {
                let duration = self.theme.transition;
                self.threads
                    .entry(id.clone())
                    .or_insert_with(|| ReplyThread::new(id, duration))
                    .toggle(&self.remote, now);
            }
            RowKey::Placeholder(id) => {
                if let Some(thread) = self.threads.get_mut(&id)
                    && thread.fetch_state() == FetchState::Failed
                {
                    thread.fetch_replies(&self.remote);
                }
            }
            RowKey::Reply { .. } => {}
            RowKey::Footer => {
                self.load_more();
            }
        }
    }

    fn load_more(&mut self) -> bool {
        let started = self.feed.load_more(&self.remote);
        if started {
            info!(page = self.feed.cursor().page + 1, "loading more comments");
        }
        started
    }

    fn react(&mut self, kind: Reaction) {
        let Some(comment_id) = self
            .selected_key()
            .and_then(|key| self.comment_for(key))
            .map(|c| c.id.clone())
        else {
            return;
        };
        if !self.reactions.set_reaction(&self.remote, &comment_id, kind) {
            info!(%comment_id, "reaction ignored");
        }
    }

    fn open_reply(&mut self, now: Instant) {
        let Some(key) = self.selected_key().cloned() else {
            return;
        };
        let main_id = match &key {
            RowKey::Main(id) => id.clone(),
            RowKey::Reply { main, .. } => main.clone(),
            RowKey::Placeholder(_) | RowKey::Footer => return,
        };
        let Some(recipient) = self
            .comment_for(&key)
            .map(|c| c.author_display_name.clone())
        else {
            return;
        };
        self.open_composer(ComposerMode::Reply { main_id, recipient }, now);
    }

    fn open_composer(&mut self, mode: ComposerMode, now: Instant) {
        let privileged = self.viewer.role.is_privileged();
        self.composer.open(&self.remote, mode, privileged, now);
        let _ = self.remote.action_tx.try_send(Action::SetHelp(composer::HELP));
    }

    fn submit(&mut self, mode: ComposerMode, text: String) {
        match mode {
            ComposerMode::Main => {
                let content = self.feed.content().clone();
                info!(%content, "posting main comment");
                self.remote.spawn(move |api| async move {
                    match api.post_main_comment(&content, &text).await {
                        Ok(comment) => Action::MainCommentPosted { comment },
                        Err(err) => Action::MainCommentPostError {
                            message: err.status_message(),
                        },
                    }
                });
            }
            ComposerMode::Reply { main_id, .. } => {
                self.next_draft += 1;
                let draft = reply_thread::draft(self.next_draft, &text);
                self.pending_reply = Some(draft.local_id);
                let duration = self.theme.transition;
                let content = self.feed.content().clone();
                info!(%main_id, "posting reply");
                self.threads
                    .entry(main_id.clone())
                    .or_insert_with(|| ReplyThread::new(main_id, duration))
                    .submit_reply(&self.remote, &content, draft);
            }
        }
    }

    fn unlock(&self) {
        info!("unlocking additional comments");
        self.remote.spawn(|api| async move {
            if let Err(err) = api.unlock_comments().await {
                return Action::QuotaUnlockError {
                    message: err.status_message(),
                };
            }
            match api.comment_quota().await {
                Ok(quota) => Action::QuotaLoaded { quota },
                Err(err) => Action::QuotaError {
                    message: err.status_message(),
                },
            }
        });
    }

    fn upgrade(&self) {
        info!(url = %self.upgrade_url, "membership upgrade requested");
        self.notify(format!("Upgrade your membership at {}", self.upgrade_url));
    }

    fn delete_selected(&mut self) {
        let Some(RowKey::Main(comment_id)) = self.selected_key().cloned() else {
            self.notify("Only main comments can be deleted");
            return;
        };
        let own = self
            .comment_for(&RowKey::Main(comment_id.clone()))
            .is_some_and(|c| c.is_authored_by(&self.viewer));
        if !own {
            self.notify("You can only delete your own comments");
            return;
        }
        if !self.deleting.insert(comment_id.clone()) {
            return;
        }
        self.remote.spawn(move |api| async move {
            match api.delete_comment(&comment_id).await {
                Ok(()) => Action::CommentDeleted { comment_id },
                Err(err) => Action::CommentDeleteError {
                    comment_id,
                    message: err.status_message(),
                },
            }
        });
    }

    fn copy_selected(&self) {
        let Some(comment) = self.selected_key().and_then(|key| self.comment_for(key)) else {
            return;
        };
        match cli_clipboard::set_contents(comment.content.to_string())
            .map_err(|_| anyhow!("Error copying comment to clipboard"))
        {
            Ok(()) => self.notify(format!("Copied \"{}\"", truncate_words(&comment.content, 8))),
            Err(err) => {
                error!(error = %err, "clipboard");
                self.notify(err.to_string());
            }
        }
    }

    fn refresh(&mut self) {
        self.feed.load(&self.remote);
    }

    #[instrument(skip(self))]
    fn handle_key_event(&mut self, event: &Event, now: Instant) {
        if self.composer.is_visible() {
            match self.composer.handle_event(event, now) {
                ComposerOutcome::Submit { mode, text } => self.submit(mode, text),
                ComposerOutcome::Unlock => self.unlock(),
                ComposerOutcome::Upgrade => self.upgrade(),
                ComposerOutcome::Close => {
                    let _ = self.remote.action_tx.try_send(Action::SetHelp(HELP));
                }
                ComposerOutcome::Changed | ComposerOutcome::None => {}
            }
            return;
        }
        if !self.list_state.is_focused() {
            return;
        }
        match event {
            ct_event!(keycode press Enter) | ct_event!(key press ' ') => self.toggle_selected(now),
            ct_event!(key press 'l') => self.react(Reaction::Like),
            ct_event!(key press 'd') => self.react(Reaction::Dislike),
            ct_event!(key press 'r') => self.open_reply(now),
            ct_event!(key press 'c') => self.open_composer(ComposerMode::Main, now),
            ct_event!(key press 'x') => self.delete_selected(),
            ct_event!(key press 'y') => self.copy_selected(),
            ct_event!(key press 'g') => self.refresh(),
            ct_event!(key press 'n') => {
                self.load_more();
            }
            ct_event!(keycode press End) => {
                self.select(self.rows.len().saturating_sub(1));
                self.load_more();
            }
            _ => {
                let outcome = self.list_state.handle(event, Regular);
                if outcome == Outcome::Changed && self.selected_key() == Some(&RowKey::Footer) {
                    self.load_more();
                }
            }
        }
    }

    fn handle_result(&mut self, action: &Action, now: Instant) {
        if self.feed.handle_action(action) {
            if let Action::FeedPageLoaded { .. } = action {
                let present = self
                    .feed
                    .comments()
                    .iter()
                    .map(|c| c.id.clone())
                    .collect::<HashSet<_>>();
                self.threads.retain(|id, _| present.contains(id));
                self.report_count();
            }
            if let Action::FeedLoadError { message, .. } = action {
                self.notify(format!("Couldn't load comments: {message}"));
            }
        }
        for thread in self.threads.values_mut() {
            thread.handle_action(&self.remote, action, now);
        }
        self.reactions.handle_action(action);
        self.composer.handle_action(action);

        match action {
            Action::Tick => {
                self.composer.tick(now);
                if self.feed.is_loading() {
                    self.throbber_state.calc_next();
                }
            }
            Action::ReplyPosted { draft_id, .. } if self.pending_reply == Some(*draft_id) => {
                self.pending_reply = None;
                self.composer.succeeded(now);
                let _ = self.remote.action_tx.try_send(Action::SetHelp(HELP));
            }
            Action::ReplyPostError {
                draft_id, message, ..
            } if self.pending_reply == Some(*draft_id) => {
                self.pending_reply = None;
                self.composer.failed(message.clone());
            }
            Action::MainCommentPosted { comment } => {
                info!(comment_id = %comment.id, "main comment posted");
                self.composer.succeeded(now);
                self.refresh_key += 1;
                self.feed.load(&self.remote);
                let _ = self.remote.action_tx.try_send(Action::SetHelp(HELP));
            }
            Action::MainCommentPostError { message } => {
                warn!(%message, "failed to post main comment");
                self.composer.failed(message.clone());
            }
            Action::CommentDeleted { comment_id } => {
                self.deleting.remove(comment_id);
                if self.feed.remove(comment_id) {
                    self.threads.remove(comment_id);
                    self.reactions.forget(comment_id);
                    self.report_count();
                    self.notify("Comment deleted");
                }
            }
            Action::CommentDeleteError {
                comment_id,
                message,
            } => {
                warn!(%comment_id, %message, "failed to delete comment");
                self.deleting.remove(comment_id);
                self.notify(format!("Couldn't delete comment: {message}"));
            }
            _ => {}
        }
    }

    fn build_items(&self, width: usize) -> Vec<ListItem<'static>> {
        let now = Local::now();
        let instant = Instant::now();
        self.rows
            .iter()
            .map(|row| match row {
                RowKey::Main(id) => {
                    let Some(comment) = self.comment_for(row) else {
                        return ListItem::new(Line::raw(""));
                    };
                    let thread = self.threads.get(id);
                    let hint = match thread {
                        Some(t) if t.is_expanded() => "▾ hide replies",
                        _ => "▸ replies",
                    };
                    let mut lines = comment_lines(comment, &self.viewer, width, &now, &self.theme);
                    let mut actions = self.reactions.line(comment, &self.theme, 0);
                    actions.push_span(Span::styled(format!("   {hint}"), self.theme.muted()));
                    if self.deleting.contains(id) {
                        actions.push_span(Span::styled("   deleting…", self.theme.muted()));
                    }
                    lines.push(actions);
                    ListItem::new(lines)
                }
                RowKey::Reply { main, index } => {
                    let entry = self.threads.get(main).and_then(|t| t.entries().get(*index));
                    match entry {
                        Some(ThreadEntry::Confirmed(reply)) => {
                            let mut lines = comment_lines(reply, &self.viewer, width, &now, &self.theme);
                            lines.push(self.reactions.line(reply, &self.theme, REPLY_INDENT));
                            ListItem::new(lines)
                        }
                        Some(ThreadEntry::Pending(draft)) => {
                            let name = self
                                .viewer
                                .display_name
                                .as_deref()
                                .unwrap_or("You")
                                .to_string();
                            let mut lines = vec![Line::from(vec![
                                Span::raw(" ".repeat(REPLY_INDENT)),
                                Span::styled(name, self.theme.author(true)),
                                Span::raw("  "),
                                Span::styled("Sending…", self.theme.muted()),
                            ])];
                            lines.extend(wrap_body(&draft.text, REPLY_INDENT, width));
                            ListItem::new(lines)
                        }
                        None => ListItem::new(Line::raw("")),
                    }
                }
                RowKey::Placeholder(main) => {
                    let line = match self.threads.get(main).map(|t| (t.view(instant), t.error())) {
                        Some((ThreadView::Failed, err)) => Line::from(vec![
                            Span::raw("    "),
                            Span::styled(
                                format!("Couldn't load replies: {}", err.unwrap_or("unknown error")),
                                self.theme.error(),
                            ),
                            Span::styled("  (Enter to retry)", self.theme.muted()),
                        ]),
                        Some((ThreadView::Empty, _)) => {
                            Line::styled("    No replies yet", self.theme.muted())
                        }
                        _ => Line::styled("    Loading replies…", self.theme.muted()),
                    };
                    ListItem::new(line)
                }
                RowKey::Footer => ListItem::new(self.footer_line()),
            })
            .collect()
    }

    fn footer_line(&self) -> Line<'static> {
        let loaded = self.feed.comments().len();
        if self.feed.is_loading() && loaded == 0 {
            return Line::styled("Loading comments…", self.theme.muted());
        }
        if loaded == 0 {
            return Line::styled("No comments yet. Press c to add one.", self.theme.muted());
        }
        if self.feed.is_loading() {
            return Line::styled("Loading more comments…", self.theme.muted());
        }
        if self.feed.has_more() {
            return Line::styled(
                format!(
                    "Load more comments ({loaded} of {})",
                    self.feed.total_count()
                ),
                Style::new().fg(self.theme.accent),
            );
        }
        Line::styled(format!("All {loaded} comments shown"), self.theme.muted())
    }
}

impl Drop for FeedbackView {
    fn drop(&mut self) {
        self.remote.cancel.cancel();
    }
}

fn wrap_body(text: &str, indent: usize, width: usize) -> Vec<Line<'static>> {
    let pad = " ".repeat(indent + 2);
    let wrap_width = width.saturating_sub(indent + 2).max(10);
    textwrap::wrap(text, wrap_width)
        .into_iter()
        .map(|line| Line::from(format!("{pad}{line}")))
        .collect()
}

fn comment_lines(
    comment: &Comment,
    viewer: &Viewer,
    width: usize,
    now: &chrono::DateTime<Local>,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let indent = if comment.is_reply() { REPLY_INDENT } else { 0 };
    let date = comment
        .created_at
        .map(|at| relative_date(&at.with_timezone(&Local), now))
        .unwrap_or_default();
    let header = Line::from(vec![
        Span::raw(" ".repeat(indent)),
        Span::styled(
            comment.author_display_name.to_string(),
            theme.author(comment.is_authored_by(viewer)),
        ),
        Span::raw("  "),
        Span::styled(date, Style::new().dim()),
    ]);
    let mut lines = vec![header];
    lines.extend(wrap_body(&comment.content, indent, width));
    lines
}

#[async_trait(?Send)]
impl Component for FeedbackView {
    fn render(&mut self, area: Layout, buf: &mut Buffer) {
        let now = Instant::now();
        self.sync_rows(now);
        self.area = area.main_content;
        let items = self.build_items(area.main_content.width.saturating_sub(2) as usize);

        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(get_border_style(&self.list_state, &self.theme));
        if !self.feed.is_loading() {
            block = block.title(format!(" {} ", self.feed.count_label()));
        }
        if let Some(err) = self.feed.error() {
            block = block.title_bottom(Line::styled(format!(" {err} "), self.theme.error()));
        }
        let list = rat_widget::list::List::<RowSelection>::new(items)
            .block(block)
            .style(Style::default())
            .focus_style(Style::default().bold().reversed())
            .select_style(Style::default().add_modifier(Modifier::BOLD));
        list.render(area.main_content, buf, &mut self.list_state);

        if self.feed.is_loading() {
            let title_area = Rect {
                x: area.main_content.x + 1,
                y: area.main_content.y,
                width: 10.min(area.main_content.width.saturating_sub(2)),
                height: 1,
            };
            let throbber = Throbber::default()
                .label("Loading")
                .style(Style::new().fg(self.theme.accent))
                .throbber_set(BRAILLE_SIX_DOUBLE)
                .use_type(WhichUse::Spin);
            StatefulWidget::render(throbber, title_area, buf, &mut self.throbber_state);
        }

        self.composer.render(area.composer, buf, now);
    }

    fn register_action_tx(&mut self, action_tx: Sender<Action>) {
        self.remote.action_tx = action_tx;
    }

    async fn handle_event(&mut self, event: Action) -> Result<(), AppError> {
        let now = Instant::now();
        match &event {
            Action::AppEvent(event) => self.handle_key_event(event, now),
            action => self.handle_result(action, now),
        }
        self.sync_rows(now);
        Ok(())
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        self.composer.cursor()
    }

    fn is_animating(&self) -> bool {
        let now = Instant::now();
        self.feed.is_loading()
            || self.composer.is_animating()
            || self.threads.values().any(|t| t.is_animating(now))
    }

    fn capture_focus_event(&self, _event: &Event) -> bool {
        self.composer.is_visible()
    }

    fn set_global_help(&self) {
        let help = if self.composer.is_visible() {
            composer::HELP
        } else {
            HELP
        };
        let _ = self.remote.action_tx.try_send(Action::SetHelp(help));
    }
}

impl HasFocus for FeedbackView {
    fn build(&self, builder: &mut FocusBuilder) {
        let tag = builder.start(self);
        if self.composer.is_visible() {
            builder.widget(&self.composer);
        } else {
            builder.widget(&self.list_state);
        }
        builder.end(tag);
    }

    fn focus(&self) -> FocusFlag {
        self.focus.clone()
    }

    fn area(&self) -> Rect {
        self.area
    }

    fn navigable(&self) -> Navigation {
        Navigation::Regular
    }
}
