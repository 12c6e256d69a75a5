use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rat_cursor::HasScreenCursor;
use rat_widget::{
    event::{HandleEvent, Regular, TextOutcome, ct_event},
    focus::{FocusBuilder, FocusFlag, HasFocus, Navigation},
    textarea::{TextArea, TextAreaState, TextWrap},
};
use ratatui::{
    buffer::Buffer,
    crossterm::event::Event,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Clear, Paragraph, StatefulWidget, Widget},
};
use ratatui_macros::vertical;
use tachyonfx::{Effect, Interpolation, fx};
use throbber_widgets_tui::{BRAILLE_SIX_DOUBLE, Throbber, ThrobberState, WhichUse};
use tracing::{debug, warn};

use crate::{
    feedback::{CommentId, format::count_words, quota::QuotaState},
    ui::{
        Action,
        components::{Remote, help::HelpElementKind},
        theme::Theme,
        transition::Transition,
        utils::get_border_style,
    },
};

pub const HELP: &[HelpElementKind] = &[
    crate::help_text!("Composer Help"),
    crate::help_keybind!("Ctrl+Enter / Alt+Enter", "send"),
    crate::help_keybind!("Esc", "close (not while sending)"),
    crate::help_keybind!("Ctrl+U", "watch ad to unlock more comments"),
    crate::help_keybind!("Ctrl+O", "upgrade membership"),
];

const OPEN_ANIMATION: Duration = Duration::from_millis(300);
const CLOSE_ANIMATION: Duration = Duration::from_millis(250);
/// Delays after opening at which input focus is requested again.
pub const FOCUS_RETRIES: [Duration; 3] = [
    Duration::from_millis(150),
    Duration::from_millis(350),
    Duration::from_millis(500),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerMode {
    Main,
    Reply {
        main_id: CommentId,
        recipient: Arc<str>,
    },
}

impl ComposerMode {
    pub fn header(&self) -> String {
        match self {
            ComposerMode::Main => "Add a comment".to_string(),
            ComposerMode::Reply { recipient, .. } => format!("Reply to {recipient}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Opening,
    Open,
    Closing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerOutcome {
    None,
    Changed,
    Submit { mode: ComposerMode, text: String },
    Close,
    Unlock,
    Upgrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    Send { enabled: bool },
    WatchAd,
    Upgrade,
}

/// An edit is kept while the text stays within `limit` words. Edits that
/// don't add words are always kept so an over-limit draft can be trimmed.
pub fn accept_edit(before: &str, after: &str, limit: usize) -> bool {
    count_words(after) <= limit || count_words(after) <= count_words(before)
}

pub struct CommentComposer {
    theme: Arc<Theme>,
    input: TextAreaState,
    mode: ComposerMode,
    visibility: Visibility,
    transition: Option<Transition>,
    effect: Option<Effect>,
    last_frame: Option<Instant>,
    word_limit: usize,
    privileged: bool,
    quota: Option<QuotaState>,
    quota_loading: bool,
    loading: bool,
    error: Option<String>,
    focus_generation: u64,
    throbber_state: ThrobberState,
    focus: FocusFlag,
    area: Rect,
}

impl CommentComposer {
    pub fn new(theme: Arc<Theme>, word_limit: usize) -> Self {
        Self {
            theme,
            input: TextAreaState::new(),
            mode: ComposerMode::Main,
            visibility: Visibility::Hidden,
            transition: None,
            effect: None,
            last_frame: None,
            word_limit: word_limit.max(1),
            privileged: false,
            quota: None,
            quota_loading: false,
            loading: false,
            error: None,
            focus_generation: 0,
            throbber_state: ThrobberState::default(),
            focus: FocusFlag::new().with_name("composer"),
            area: Rect::default(),
        }
    }

    pub fn mode(&self) -> &ComposerMode {
        &self.mode
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility != Visibility::Hidden
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn text(&self) -> String {
        self.input.text()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn quota(&self) -> Option<QuotaState> {
        self.quota
    }

    pub fn word_count(&self) -> usize {
        count_words(&self.input.text())
    }

    fn quota_gated(&self) -> bool {
        self.mode == ComposerMode::Main && !self.privileged
    }

    pub fn quota_exceeded(&self) -> bool {
        self.quota_gated() && self.quota.is_some_and(|q| q.is_exhausted())
    }

    pub fn can_send(&self) -> bool {
        !self.input.text().trim().is_empty()
            && !self.loading
            && self.word_count() <= self.word_limit
            && !self.quota_exceeded()
    }

    pub fn affordances(&self) -> Vec<Affordance> {
        if self.quota_exceeded() {
            vec![Affordance::WatchAd, Affordance::Upgrade]
        } else {
            vec![Affordance::Send {
                enabled: self.can_send(),
            }]
        }
    }

    /// Starts the enter transition. Quota is fetched on every open of a
    /// gated main comment composer.
    pub fn open(&mut self, remote: &Remote, mode: ComposerMode, privileged: bool, now: Instant) {
        if matches!(self.visibility, Visibility::Opening | Visibility::Open) {
            return;
        }
        self.mode = mode;
        self.privileged = privileged;
        self.error = None;
        self.loading = false;
        self.visibility = Visibility::Opening;
        self.transition = Some(Transition::enter(now, OPEN_ANIMATION));
        self.effect = Some(fx::fade_from_fg(
            self.theme.muted,
            (OPEN_ANIMATION.as_millis() as u32, Interpolation::QuadOut),
        ));
        self.last_frame = None;
        self.input.focus.set(true);
        self.schedule_focus(remote);
        if self.quota_gated() {
            self.fetch_quota(remote);
        } else {
            self.quota = None;
        }
    }

    pub fn fetch_quota(&mut self, remote: &Remote) {
        self.quota_loading = true;
        remote.spawn(|api| async move {
            match api.comment_quota().await {
                Ok(quota) => Action::QuotaLoaded { quota },
                Err(err) => Action::QuotaError {
                    message: err.status_message(),
                },
            }
        });
    }

    fn schedule_focus(&mut self, remote: &Remote) {
        self.focus_generation += 1;
        let generation = self.focus_generation;
        for delay in FOCUS_RETRIES {
            remote.spawn(move |_| async move {
                tokio::time::sleep(delay).await;
                Action::ComposerFocusAttempt { generation }
            });
        }
    }

    /// Begins closing. Refused while a submission is in flight.
    pub fn request_close(&mut self, now: Instant) -> bool {
        if self.loading || !matches!(self.visibility, Visibility::Opening | Visibility::Open) {
            return false;
        }
        self.visibility = Visibility::Closing;
        self.transition = Some(Transition::exit(now, CLOSE_ANIMATION));
        self.effect = Some(fx::fade_to_fg(
            self.theme.muted,
            (CLOSE_ANIMATION.as_millis() as u32, Interpolation::QuadIn),
        ));
        self.last_frame = None;
        self.input.focus.set(false);
        true
    }

    /// Advances the visibility state machine.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(transition) = self.transition else {
            return false;
        };
        if !transition.is_done(now) {
            return false;
        }
        self.transition = None;
        match self.visibility {
            Visibility::Opening => self.visibility = Visibility::Open,
            Visibility::Closing => self.reset(),
            Visibility::Open | Visibility::Hidden => {}
        }
        true
    }

    fn reset(&mut self) {
        self.visibility = Visibility::Hidden;
        self.input.set_text("");
        self.input.focus.set(false);
        self.error = None;
        self.quota = None;
        self.quota_loading = false;
        self.effect = None;
        self.focus_generation += 1;
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some() || self.effect.is_some() || self.loading
    }

    /// The post was confirmed: clear the draft and close.
    pub fn succeeded(&mut self, now: Instant) {
        self.loading = false;
        self.input.set_text("");
        self.request_close(now);
    }

    /// The post failed: stay open with the text intact.
    pub fn failed(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    pub fn handle_event(&mut self, event: &Event, now: Instant) -> ComposerOutcome {
        if !matches!(self.visibility, Visibility::Opening | Visibility::Open) {
            return ComposerOutcome::None;
        }
        match event {
            ct_event!(keycode press Esc) => {
                if self.request_close(now) {
                    return ComposerOutcome::Close;
                }
                ComposerOutcome::None
            }
            ct_event!(keycode press CONTROL-Enter) | ct_event!(keycode press ALT-Enter) => {
                if !self.can_send() {
                    debug!(words = self.word_count(), "send refused");
                    return ComposerOutcome::None;
                }
                self.loading = true;
                self.error = None;
                ComposerOutcome::Submit {
                    mode: self.mode.clone(),
                    text: self.input.text().trim().to_string(),
                }
            }
            ct_event!(key press CONTROL-'u') if self.quota_exceeded() && !self.quota_loading => {
                self.quota_loading = true;
                ComposerOutcome::Unlock
            }
            ct_event!(key press CONTROL-'o') if self.quota_exceeded() => ComposerOutcome::Upgrade,
            _ if self.loading => ComposerOutcome::None,
            Event::Paste(pasted) => self.guarded_edit(|input| {
                input.insert_str(pasted);
                true
            }),
            Event::Key(_) => self.guarded_edit(|input| {
                input.handle(event, Regular) == TextOutcome::TextChanged
            }),
            _ => ComposerOutcome::None,
        }
    }

    /// Applies `edit` and reverts it when the result breaks the word cap.
    fn guarded_edit(&mut self, edit: impl FnOnce(&mut TextAreaState) -> bool) -> ComposerOutcome {
        let before = self.input.text();
        let cursor = self.input.cursor();
        if !edit(&mut self.input) {
            return ComposerOutcome::None;
        }
        if accept_edit(&before, &self.input.text(), self.word_limit) {
            return ComposerOutcome::Changed;
        }
        self.input.set_text(before);
        self.input.set_cursor(cursor, false);
        ComposerOutcome::None
    }

    pub fn handle_action(&mut self, action: &Action) -> bool {
        match action {
            Action::QuotaLoaded { quota } => {
                self.quota_loading = false;
                if self.is_visible() && self.quota_gated() {
                    self.quota = Some(*quota);
                    return true;
                }
            }
            Action::QuotaError { message } => {
                warn!(%message, "failed to load comment quota");
                self.quota_loading = false;
                self.quota = None;
                return self.is_visible();
            }
            Action::QuotaUnlockError { message } => {
                warn!(%message, "failed to unlock comments");
                self.quota_loading = false;
                if self.is_visible() {
                    self.error = Some(message.clone());
                    return true;
                }
            }
            Action::ComposerFocusAttempt { generation } => {
                if *generation == self.focus_generation
                    && matches!(self.visibility, Visibility::Opening | Visibility::Open)
                    && !self.input.is_focused()
                {
                    debug!(generation, "refocusing composer input");
                    self.input.focus.set(true);
                    return true;
                }
            }
            Action::Tick => {
                if self.loading {
                    self.throbber_state.calc_next();
                }
            }
            _ => {}
        }
        false
    }

    pub fn cursor(&self) -> Option<(u16, u16)> {
        if self.visibility == Visibility::Open || self.visibility == Visibility::Opening {
            self.input.screen_cursor()
        } else {
            None
        }
    }

    pub fn render(&mut self, base: Rect, buf: &mut Buffer, now: Instant) {
        if self.visibility == Visibility::Hidden {
            return;
        }
        let visibility = self
            .transition
            .map(|t| t.visibility(now))
            .unwrap_or(1.0);
        // slides down into place while opening
        let offset = ((1.0 - visibility) * 2.0).round() as u16;
        let area = Rect {
            y: base.y.saturating_sub(offset),
            ..base
        };
        self.area = area;
        Clear.render(area, buf);

        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(get_border_style(&self.input, &self.theme))
            .title(self.mode.header());
        if !self.input.text().trim().is_empty() {
            block = block.title_bottom(
                Line::from(format!(" {}/{} words ", self.word_count(), self.word_limit))
                    .right_aligned(),
            );
        }
        let inner = block.inner(area);
        block.render(area, buf);

        let [note_area, input_area, status_area, actions_area] =
            vertical![==1, *=1, ==1, ==1].areas(inner);

        let note = match self.mode {
            ComposerMode::Main => "Only your own main comments can be deleted.",
            ComposerMode::Reply { .. } => "",
        };
        Paragraph::new(Span::styled(note, self.theme.muted())).render(note_area, buf);

        TextArea::new()
            .block(Block::bordered().border_type(BorderType::Plain))
            .text_wrap(TextWrap::Word(4))
            .render(input_area, buf, &mut self.input);

        let status = if let Some(err) = &self.error {
            Span::styled(err.clone(), self.theme.error())
        } else if let Some(quota) = self.quota.filter(|_| self.quota_gated()) {
            let text = if quota.is_exhausted() {
                "Daily comment limit reached".to_string()
            } else {
                format!("{} comments left today", quota.remaining())
            };
            Span::styled(text, self.theme.muted())
        } else {
            Span::raw("")
        };
        Paragraph::new(status).render(status_area, buf);

        let mut spans = Vec::new();
        for affordance in self.affordances() {
            if !spans.is_empty() {
                spans.push(Span::raw("  "));
            }
            spans.push(match affordance {
                Affordance::Send { enabled: true } => Span::styled(
                    "[Ctrl+Enter] Send",
                    Style::new()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Affordance::Send { enabled: false } => {
                    Span::styled("[Ctrl+Enter] Send", self.theme.muted())
                }
                Affordance::WatchAd => Span::styled(
                    "[Ctrl+U] Watch ad to unlock",
                    Style::new().fg(self.theme.accent),
                ),
                Affordance::Upgrade => {
                    Span::styled("[Ctrl+O] Upgrade", Style::new().fg(self.theme.like))
                }
            });
        }
        spans.push(Span::styled("  [Esc] Close", self.theme.muted()));
        Paragraph::new(Line::from(spans)).render(actions_area, buf);

        if self.loading {
            let throbber_area = Rect {
                x: area.x + 1,
                y: area.y + area.height.saturating_sub(1),
                width: 10.min(area.width.saturating_sub(2)),
                height: 1,
            };
            let throbber = Throbber::default()
                .label("Sending")
                .style(Style::new().fg(self.theme.accent))
                .throbber_set(BRAILLE_SIX_DOUBLE)
                .use_type(WhichUse::Spin);
            StatefulWidget::render(throbber, throbber_area, buf, &mut self.throbber_state);
        }

        if let Some(effect) = self.effect.as_mut() {
            let elapsed = self
                .last_frame
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or_default();
            effect.process(elapsed.into(), buf, area);
            if effect.done() {
                self.effect = None;
            }
        }
        self.last_frame = Some(now);
    }
}

impl HasFocus for CommentComposer {
    fn build(&self, builder: &mut FocusBuilder) {
        if self.is_visible() {
            let tag = builder.start(self);
            builder.widget(&self.input);
            builder.end(tag);
        }
    }

    fn focus(&self) -> FocusFlag {
        self.focus.clone()
    }

    fn area(&self) -> Rect {
        self.area
    }

    fn navigable(&self) -> Navigation {
        if self.is_visible() {
            Navigation::Regular
        } else {
            Navigation::None
        }
    }
}
