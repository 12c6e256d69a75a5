use async_trait::async_trait;
use rat_widget::statusline_stacked::StatusLineStacked;
use ratatui::buffer::Buffer;
use ratatui::style::{Style, Stylize};
use ratatui::widgets::Widget;
use ratatui_macros::span;

use crate::errors::AppError;
use crate::feedback::format::format_comment_count;
use crate::ui::components::DumbComponent;
use crate::ui::{Action, AppState, layout::Layout};

pub struct StatusBar {
    content_label: String,
    viewer_label: String,
    loaded: usize,
    total: u64,
    notice: Option<String>,
}

impl StatusBar {
    pub fn new(app_state: &AppState) -> Self {
        let name = app_state
            .viewer
            .display_name
            .as_deref()
            .unwrap_or("guest");
        Self {
            content_label: format!(" {} ", app_state.content),
            viewer_label: format!(" {name} ({}) ", app_state.viewer.role),
            loaded: 0,
            total: 0,
            notice: None,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn count_text(&self) -> String {
        format!(
            " {} of {} comments ",
            self.loaded,
            format_comment_count(self.total)
        )
    }

    pub fn render(&mut self, area: Layout, buf: &mut Buffer) {
        let mut line = StatusLineStacked::new()
            .start(
                span!(self.viewer_label.as_str()).style(Style::new().black().on_green()),
                " ",
            )
            .start(span!(self.content_label.as_str()).style(Style::new()), " ");
        if let Some(notice) = &self.notice {
            line = line.start(span!(notice.as_str()).style(Style::new().italic()), " ");
        }
        line.end(span!(self.count_text()).style(Style::new().black().on_blue()), " ")
            .render(area.status_bar, buf);
    }
}

#[async_trait(?Send)]
impl DumbComponent for StatusBar {
    fn render(&mut self, area: Layout, buf: &mut Buffer) {
        self.render(area, buf);
    }

    async fn handle_event(&mut self, event: Action) -> Result<(), AppError> {
        match event {
            Action::FeedCountChanged { loaded, total } => {
                self.loaded = loaded;
                self.total = total;
            }
            Action::Notice(notice) => self.notice = Some(notice),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        api::fake::FakeApi,
        config::Config,
        feedback::{ContentRef, Viewer, ViewerRole},
        ui::theme::Theme,
    };

    fn app_state() -> AppState {
        AppState {
            api: FakeApi::new(),
            content: ContentRef::Video("v9".into()),
            viewer: Viewer {
                id: Some(Arc::from("u1")),
                display_name: Some(Arc::from("Neema")),
                role: ViewerRole::Journalist,
            },
            config: Arc::new(Config::default()),
            theme: Arc::new(Theme::default()),
        }
    }

    #[tokio::test]
    async fn tracks_counts_and_latest_notice() {
        let mut bar = StatusBar::new(&app_state());
        assert_eq!(bar.viewer_label, " Neema (journalist) ");
        assert_eq!(bar.content_label, " video v9 ");

        bar.handle_event(Action::FeedCountChanged {
            loaded: 10,
            total: 1234,
        })
        .await
        .unwrap();
        assert_eq!(bar.count_text(), " 10 of 1.2k comments ");

        bar.handle_event(Action::Notice("Copied".into())).await.unwrap();
        bar.handle_event(Action::Notice("Comment deleted".into()))
            .await
            .unwrap();
        assert_eq!(bar.notice(), Some("Comment deleted"));
    }
}
