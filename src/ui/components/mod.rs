use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use rat_widget::focus::HasFocus;
use ratatui::buffer::Buffer;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

use crate::api::FeedbackApi;
use crate::errors::AppError;
use crate::ui::{Action, layout::Layout};
use ratatui::crossterm::event::Event;

pub mod comment_feed;
pub mod composer;
pub mod feedback;
pub mod help;
pub mod reaction;
pub mod reply_thread;
pub mod status_bar;

#[async_trait(?Send)]
pub trait DumbComponent {
    fn render(&mut self, area: Layout, buf: &mut Buffer);
    fn register_action_tx(&mut self, action_tx: tokio::sync::mpsc::Sender<Action>) {
        let _ = action_tx;
    }
    async fn handle_event(&mut self, event: Action) -> Result<(), AppError> {
        let _ = event;
        Ok(())
    }
}

#[async_trait(?Send)]
pub trait Component: HasFocus {
    fn render(&mut self, area: Layout, buf: &mut Buffer);
    fn register_action_tx(&mut self, action_tx: tokio::sync::mpsc::Sender<Action>) {
        let _ = action_tx;
    }
    async fn handle_event(&mut self, event: Action) -> Result<(), AppError> {
        let _ = event;
        Ok(())
    }
    fn cursor(&self) -> Option<(u16, u16)> {
        None
    }
    fn should_render(&self) -> bool {
        true
    }
    fn is_animating(&self) -> bool {
        false
    }
    fn capture_focus_event(&self, _event: &Event) -> bool {
        false
    }
    fn set_global_help(&self) {}
}

/// Handle for running API calls off the UI task.
///
/// Every spawned task races its future against a child of the owner's
/// cancellation token, so results of a torn-down view are never delivered.
#[derive(Clone)]
pub struct Remote {
    pub api: Arc<dyn FeedbackApi>,
    pub action_tx: Sender<Action>,
    pub cancel: CancellationToken,
}

impl Remote {
    pub fn new(api: Arc<dyn FeedbackApi>, action_tx: Sender<Action>, cancel: CancellationToken) -> Self {
        Self {
            api,
            action_tx,
            cancel,
        }
    }

    pub fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(Arc<dyn FeedbackApi>) -> Fut,
        Fut: Future<Output = Action> + Send + 'static,
    {
        let fut = task(self.api.clone());
        self.spawn_all(|_| async move { vec![fut.await] });
    }

    /// Like [`Remote::spawn`] for tasks that report more than once, sent in
    /// order.
    pub fn spawn_all<F, Fut>(&self, task: F)
    where
        F: FnOnce(Arc<dyn FeedbackApi>) -> Fut,
        Fut: Future<Output = Vec<Action>> + Send + 'static,
    {
        let fut = task(self.api.clone());
        let action_tx = self.action_tx.clone();
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            let actions = tokio::select! {
                _ = cancel.cancelled() => return,
                actions = fut => actions,
            };
            for action in actions {
                if cancel.is_cancelled() || action_tx.send(action).await.is_err() {
                    return;
                }
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use tokio::sync::mpsc::{Receiver, channel};
    use tokio_util::sync::CancellationToken;

    use super::Remote;
    use crate::{api::fake::FakeApi, ui::Action};

    pub fn remote(api: Arc<FakeApi>) -> (Remote, Receiver<Action>) {
        let (tx, rx) = channel(256);
        (Remote::new(api, tx, CancellationToken::new()), rx)
    }

    /// Receives the next action, failing the test if none arrives in time.
    pub async fn next_action(rx: &mut Receiver<Action>) -> Action {
        tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for action")
            .expect("action channel closed")
    }
}
