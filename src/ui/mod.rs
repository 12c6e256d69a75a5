pub mod components;
pub mod layout;
pub mod theme;
pub mod transition;
pub mod utils;

use crate::{
    api::FeedbackApi,
    config::Config,
    errors::AppError,
    feedback::{Comment, CommentId, ContentRef, ReactionSnapshot, Viewer},
    feedback::{pagination::CommentPage, quota::QuotaState},
    ui::components::{
        Component, DumbComponent, feedback::FeedbackView, help::HelpElementKind,
        status_bar::StatusBar,
    },
    ui::theme::Theme,
};
use crossterm::{
    event::{
        EventStream, KeyEvent, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
};
use futures::{StreamExt, future::FutureExt};
use rat_widget::{
    event::{HandleEvent, Outcome, Regular},
    focus::{Focus, FocusBuilder, FocusFlag},
};
use ratatui::{crossterm, prelude::*, widgets::Paragraph};
use ratatui_macros::line;
use std::{io::stdout, sync::Arc};
use tokio::{select, sync::mpsc::Sender};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

const TICK_RATE: std::time::Duration = std::time::Duration::from_millis(100);
const HELP: &[HelpElementKind] = &[
    crate::help_text!("Global Help"),
    crate::help_keybind!("Tab / Shift+Tab", "move focus"),
    crate::help_keybind!("? / Ctrl+H", "toggle this help"),
    crate::help_keybind!("Esc", "close help"),
    crate::help_keybind!("q / Ctrl+C", "quit"),
];

pub async fn run(state: AppState) -> Result<(), AppError> {
    let mut terminal = ratatui::init();
    let (action_tx, action_rx) = tokio::sync::mpsc::channel(100);
    let mut app = App::new(action_tx, action_rx, state);
    let result = app.run(&mut terminal).await;
    let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
    ratatui::restore();
    result
}

struct App {
    action_tx: tokio::sync::mpsc::Sender<Action>,
    action_rx: tokio::sync::mpsc::Receiver<Action>,
    focus: Option<Focus>,
    cancel_action: CancellationToken,
    components: Vec<Box<dyn Component>>,
    dumb_components: Vec<Box<dyn DumbComponent>>,
    theme: Arc<Theme>,
    title: String,
    help: Option<&'static [HelpElementKind]>,
    in_help: bool,
    last_focused: Option<FocusFlag>,
}

/// Everything a component needs to know about the session, fixed at startup.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn FeedbackApi>,
    pub content: ContentRef,
    pub viewer: Viewer,
    pub config: Arc<Config>,
    pub theme: Arc<Theme>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn FeedbackApi>,
        content: ContentRef,
        viewer: Viewer,
        config: Config,
        theme: Theme,
    ) -> Self {
        Self {
            api,
            content,
            viewer,
            config: Arc::new(config),
            theme: Arc::new(theme),
        }
    }
}

fn focus(state: &mut App) -> Option<&mut Focus> {
    focus_noret(state);
    state.focus.as_mut()
}

fn focus_noret(state: &mut App) {
    let mut f = FocusBuilder::new(state.focus.take());
    for component in state.components.iter() {
        if component.should_render() {
            f.widget(component.as_ref());
        }
    }
    state.focus = Some(f.build());
}

impl App {
    fn new(
        action_tx: Sender<Action>,
        action_rx: tokio::sync::mpsc::Receiver<Action>,
        state: AppState,
    ) -> Self {
        let status_bar = StatusBar::new(&state);
        let title = format!("Sikiya · {} comments", state.content);
        let theme = state.theme.clone();
        let feedback = FeedbackView::new(state, action_tx.clone());
        Self {
            focus: None,
            in_help: false,
            help: None,
            action_tx,
            action_rx,
            last_focused: None,
            cancel_action: Default::default(),
            components: vec![Box::new(feedback)],
            dumb_components: vec![Box::new(status_bar)],
            theme,
            title,
        }
    }

    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<impl std::io::Write>>,
    ) -> Result<(), AppError> {
        let ctok = self.cancel_action.clone();
        let action_tx = self.action_tx.clone();
        for component in self.components.iter_mut() {
            component.register_action_tx(action_tx.clone());
        }
        for component in self.dumb_components.iter_mut() {
            component.register_action_tx(action_tx.clone());
        }
        execute!(
            stdout(),
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
            )
        )?;
        tokio::spawn(async move {
            let mut tick_interval = tokio::time::interval(TICK_RATE);
            let mut event_stream = EventStream::new();

            loop {
                let event = select! {
                    _ = ctok.cancelled() => break,
                    _ = tick_interval.tick() => Action::Tick,
                    kevent = event_stream.next().fuse() => {
                        match kevent {
                            Some(Ok(kevent)) => Action::AppEvent(kevent),
                            Some(Err(..)) => Action::None,
                            None => break,
                        }
                    }
                };
                if action_tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        focus_noret(self);
        if let Some(ref mut focus) = self.focus
            && let Some(first) = self.components.first()
        {
            focus.focus(&**first);
        }
        self.draw(terminal)?;
        let ctok = self.cancel_action.clone();
        loop {
            let action = self.action_rx.recv().await;
            if let Some(ref action) = action {
                for component in self.components.iter_mut() {
                    component.handle_event(action.clone()).await?;
                    if component.gained_focus() && self.last_focused != Some(component.focus()) {
                        self.last_focused = Some(component.focus());
                        component.set_global_help();
                    }
                }
                for component in self.dumb_components.iter_mut() {
                    component.handle_event(action.clone()).await?;
                }
            }
            let should_draw = match &action {
                Some(Action::Tick) => self.has_animated_components(),
                Some(Action::None) => false,
                Some(Action::Quit) | None => false,
                _ => true,
            };
            match action {
                Some(Action::None) | Some(Action::Tick) => {}
                Some(Action::ForceFocusChange) => {
                    if let Some(focus) = focus(self) {
                        let r = focus.next_force();
                        info!(outcome = ?r, "Focus");
                    }
                }
                Some(Action::ForceFocusChangeRev) => {
                    if let Some(focus) = focus(self) {
                        let r = focus.prev_force();
                        info!(outcome = ?r, "Focus");
                    }
                }
                Some(Action::AppEvent(ref event)) => {
                    self.handle_event(event).await?;
                }
                Some(Action::SetHelp(help)) => {
                    self.help = Some(help);
                }
                Some(Action::Quit) | None => {
                    ctok.cancel();
                    break;
                }
                _ => {}
            }
            if should_draw || matches!(action, Some(Action::ForceRender)) {
                self.draw(terminal)?;
            }
            if self.cancel_action.is_cancelled() {
                break;
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn handle_event(&mut self, event: &crossterm::event::Event) -> Result<(), AppError> {
        use crossterm::event::Event::Key;
        use rat_widget::event::ct_event;
        if matches!(
            event,
            ct_event!(key press CONTROL-'c') | ct_event!(key press CONTROL-'q')
        ) {
            self.cancel_action.cancel();
            return Ok(());
        }
        if matches!(event, ct_event!(key press CONTROL-'h')) {
            self.in_help = !self.in_help;
            return Ok(());
        }
        if self.in_help && matches!(event, ct_event!(keycode press Esc)) {
            self.in_help = false;
            return Ok(());
        }

        let capture_focus = self
            .components
            .iter()
            .any(|c| c.should_render() && c.capture_focus_event(event));
        let Some(focus) = focus(self) else {
            return Ok(());
        };
        let outcome = focus.handle(event, Regular);
        if let Outcome::Continue = outcome
            && let Key(key) = event
            && !capture_focus
        {
            self.handle_key(key).await?;
        }
        Ok(())
    }

    async fn handle_key(&mut self, key: &KeyEvent) -> Result<(), AppError> {
        use crossterm::event::KeyCode::*;
        if matches!(key.code, Char('q')) {
            self.cancel_action.cancel();
        }
        if matches!(key.code, Char('?')) {
            self.in_help = !self.in_help;
        }
        Ok(())
    }

    fn has_animated_components(&self) -> bool {
        self.components
            .iter()
            .any(|component| component.should_render() && component.is_animating())
    }

    fn draw(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<impl std::io::Write>>,
    ) -> Result<(), AppError> {
        terminal.draw(|f| {
            let area = f.area();
            let layout = layout::Layout::new(area);
            let buf = f.buffer_mut();
            let title = Paragraph::new(line![self.title.as_str()].style(Style::new().bold()));
            title.render(layout.title_bar, buf);

            for component in self.components.iter_mut() {
                if component.should_render() {
                    component.render(layout, buf);
                }
            }
            for component in self.dumb_components.iter_mut() {
                component.render(layout, buf);
            }
            if self.in_help {
                let help = self.help.unwrap_or(HELP);
                components::help::HelpComponent::new(help)
                    .set_constraint(40)
                    .key_style(Style::new().fg(self.theme.accent).bold())
                    .block(
                        ratatui::widgets::Block::bordered()
                            .title("Help")
                            .border_type(ratatui::widgets::BorderType::Rounded),
                    )
                    .render(area, buf);
            }
            // cursors are only known after the components laid themselves out
            for component in self.components.iter() {
                if component.should_render()
                    && !self.in_help
                    && let Some(p) = component.cursor()
                {
                    f.set_cursor_position(p);
                }
            }
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Action {
    None,
    Tick,
    Quit,
    AppEvent(crossterm::event::Event),
    ForceRender,
    ForceFocusChange,
    ForceFocusChangeRev,
    SetHelp(&'static [HelpElementKind]),
    FeedPageLoaded {
        session: u64,
        page: CommentPage,
        strategy: MergeStrategy,
    },
    FeedLoadError {
        session: u64,
        message: String,
    },
    /// Sent after every feed fetch, success or not.
    FeedLoadFinished {
        session: u64,
    },
    FeedCountChanged {
        loaded: usize,
        total: u64,
    },
    RepliesLoaded {
        main_id: CommentId,
        replies: Vec<Comment>,
    },
    RepliesError {
        main_id: CommentId,
        message: String,
    },
    ReplyPosted {
        main_id: CommentId,
        draft_id: u64,
        reply: Comment,
    },
    ReplyPostError {
        main_id: CommentId,
        draft_id: u64,
        message: String,
    },
    MainCommentPosted {
        comment: Comment,
    },
    MainCommentPostError {
        message: String,
    },
    CommentDeleted {
        comment_id: CommentId,
    },
    CommentDeleteError {
        comment_id: CommentId,
        message: String,
    },
    ReactionLoaded {
        comment_id: CommentId,
        snapshot: ReactionSnapshot,
    },
    ReactionLoadError {
        comment_id: CommentId,
        message: String,
    },
    ReactionUpdated {
        comment_id: CommentId,
        snapshot: ReactionSnapshot,
    },
    ReactionEditError {
        comment_id: CommentId,
        message: String,
    },
    QuotaLoaded {
        quota: QuotaState,
    },
    QuotaError {
        message: String,
    },
    QuotaUnlockError {
        message: String,
    },
    ComposerFocusAttempt {
        generation: u64,
    },
    Notice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Append,
    Replace,
}
