use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::{
    feedback::{
        Comment, CommentId, ContentRef,
        format::format_comment_count,
        pagination::{CommentPage, PaginationCursor},
    },
    ui::{Action, MergeStrategy, components::Remote},
};

/// Main comments of one content item, paged from the server.
///
/// Every [`CommentFeed::load`] opens a new session; responses tagged with an
/// older session are ignored so a refresh can never be overwritten by the
/// page it replaced.
#[derive(Debug)]
pub struct CommentFeed {
    content: ContentRef,
    page_size: u32,
    comments: Vec<Comment>,
    cursor: PaginationCursor,
    session: u64,
    loading: bool,
    error: Option<String>,
}

impl CommentFeed {
    pub fn new(content: ContentRef, page_size: u32) -> Self {
        Self {
            content,
            page_size: page_size.max(1),
            comments: Vec::new(),
            cursor: PaginationCursor::default(),
            session: 0,
            loading: false,
            error: None,
        }
    }

    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.cursor.page > 0 && self.cursor.has_next_page
    }

    pub fn total_count(&self) -> u64 {
        self.cursor.total_count.max(self.comments.len() as u64)
    }

    pub fn count_label(&self) -> String {
        format!("{} Comments", format_comment_count(self.total_count()))
    }

    /// Starts a new session at page 1. The list stays visible until the
    /// response replaces it.
    pub fn load(&mut self, remote: &Remote) {
        self.session += 1;
        self.loading = true;
        self.error = None;
        info!(content = %self.content, session = self.session, "loading comments");
        self.fetch(remote, 1, MergeStrategy::Replace);
    }

    /// Requests the next page. Returns `false` without doing anything when a
    /// load is in flight or the server reported no further pages.
    pub fn load_more(&mut self, remote: &Remote) -> bool {
        if self.loading || !self.has_more() {
            return false;
        }
        let Some(page) = self.cursor.next_page() else {
            return false;
        };
        self.loading = true;
        self.error = None;
        self.fetch(remote, page, MergeStrategy::Append);
        true
    }

    fn fetch(&self, remote: &Remote, page: u32, strategy: MergeStrategy) {
        let session = self.session;
        let content = self.content.clone();
        let limit = self.page_size;
        remote.spawn_all(move |api| async move {
            let result = match api.main_comments(&content, page, limit).await {
                Ok(page) => Action::FeedPageLoaded {
                    session,
                    page,
                    strategy,
                },
                Err(err) => Action::FeedLoadError {
                    session,
                    message: err.status_message(),
                },
            };
            vec![result, Action::FeedLoadFinished { session }]
        });
    }

    /// Drops a main comment after the server confirmed its deletion.
    pub fn remove(&mut self, comment_id: &CommentId) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| &c.id != comment_id);
        let removed = self.comments.len() != before;
        if removed {
            self.cursor.total_count = self.cursor.total_count.saturating_sub(1);
        }
        removed
    }

    pub fn handle_action(&mut self, action: &Action) -> bool {
        match action {
            Action::FeedPageLoaded {
                session,
                page,
                strategy,
            } => {
                if *session != self.session {
                    debug!(session, current = self.session, "dropping stale page");
                    return false;
                }
                self.merge(page, *strategy)
            }
            Action::FeedLoadError { session, message } => {
                if *session != self.session {
                    return false;
                }
                warn!(content = %self.content, %message, "failed to load comments");
                self.error = Some(message.clone());
                true
            }
            Action::FeedLoadFinished { session } => {
                if *session != self.session {
                    return false;
                }
                self.loading = false;
                true
            }
            _ => false,
        }
    }

    fn merge(&mut self, page: &CommentPage, strategy: MergeStrategy) -> bool {
        match strategy {
            MergeStrategy::Replace => {
                self.comments = page.comments.clone();
            }
            MergeStrategy::Append => {
                if page.cursor.page <= self.cursor.page {
                    warn!(
                        page = page.cursor.page,
                        current = self.cursor.page,
                        "dropping out of order page"
                    );
                    return false;
                }
                let known = self
                    .comments
                    .iter()
                    .map(|c| c.id.clone())
                    .collect::<HashSet<_>>();
                self.comments.extend(
                    page.comments
                        .iter()
                        .filter(|c| !known.contains(&c.id))
                        .cloned(),
                );
            }
        }
        self.cursor = page.cursor;
        info!(
            loaded = self.comments.len(),
            total = self.cursor.total_count,
            page = self.cursor.page,
            "comments merged"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::fake::FakeApi,
        ui::components::testing::{next_action, remote},
    };
    use tokio::sync::mpsc::Receiver;

    async fn settle(feed: &mut CommentFeed, rx: &mut Receiver<Action>) {
        loop {
            let action = next_action(rx).await;
            let done = matches!(action, Action::FeedLoadFinished { .. });
            feed.handle_action(&action);
            if done {
                break;
            }
        }
    }

    fn article() -> ContentRef {
        ContentRef::Article("a1".into())
    }

    #[tokio::test]
    async fn load_more_appends_second_page() {
        let api = FakeApi::with_main_comments(8);
        let (remote, mut rx) = remote(api.clone());
        let mut feed = CommentFeed::new(article(), 5);

        feed.load(&remote);
        settle(&mut feed, &mut rx).await;
        assert_eq!(feed.comments().len(), 5);
        assert!(feed.cursor().has_next_page);
        assert_eq!(feed.cursor().page, 1);

        assert!(feed.load_more(&remote));
        assert!(!feed.load_more(&remote));
        settle(&mut feed, &mut rx).await;
        assert_eq!(feed.comments().len(), 8);
        assert_eq!(feed.cursor().page, 2);
        assert!(!feed.cursor().has_next_page);
        let ids = feed
            .comments()
            .iter()
            .map(|c| c.id.to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["m1", "m2", "m3", "m4", "m5", "m6", "m7", "m8"]);

        assert!(!feed.load_more(&remote));
        assert_eq!(api.count_calls("main_comments"), 2);
    }

    #[tokio::test]
    async fn load_more_before_first_page_does_nothing() {
        let (remote, _rx) = remote(FakeApi::with_main_comments(3));
        let mut feed = CommentFeed::new(article(), 5);
        assert!(!feed.load_more(&remote));
    }

    #[tokio::test]
    async fn failure_keeps_list_and_clears_loading() {
        let api = FakeApi::with_main_comments(8);
        let (remote, mut rx) = remote(api.clone());
        let mut feed = CommentFeed::new(article(), 5);
        feed.load(&remote);
        settle(&mut feed, &mut rx).await;

        api.fail("main_comments");
        assert!(feed.load_more(&remote));
        settle(&mut feed, &mut rx).await;
        assert_eq!(feed.comments().len(), 5);
        assert!(!feed.is_loading());
        assert!(feed.error().is_some());
        assert_eq!(feed.cursor().page, 1);

        api.recover("main_comments");
        assert!(feed.load_more(&remote));
        settle(&mut feed, &mut rx).await;
        assert_eq!(feed.comments().len(), 8);
        assert!(feed.error().is_none());
    }

    #[tokio::test]
    async fn stale_session_results_are_discarded() {
        let (remote, _rx) = remote(FakeApi::new());
        let mut feed = CommentFeed::new(article(), 5);
        feed.load(&remote);
        let stale = feed.session;
        feed.load(&remote);

        let page = CommentPage {
            comments: vec![crate::feedback::sample_comment("old", "amina", "x")],
            cursor: PaginationCursor {
                page: 1,
                has_next_page: false,
                total_count: 1,
            },
        };
        assert!(!feed.handle_action(&Action::FeedPageLoaded {
            session: stale,
            page,
            strategy: MergeStrategy::Replace,
        }));
        assert!(!feed.handle_action(&Action::FeedLoadFinished { session: stale }));
        assert!(feed.comments().is_empty());
        assert!(feed.is_loading());
    }

    #[test]
    fn out_of_order_append_is_dropped() {
        let mut feed = CommentFeed::new(article(), 5);
        feed.cursor = PaginationCursor {
            page: 2,
            has_next_page: true,
            total_count: 20,
        };
        let page = CommentPage {
            comments: vec![crate::feedback::sample_comment("x", "amina", "x")],
            cursor: PaginationCursor {
                page: 2,
                has_next_page: true,
                total_count: 20,
            },
        };
        assert!(!feed.merge(&page, MergeStrategy::Append));
        assert!(feed.comments().is_empty());
    }

    #[tokio::test]
    async fn refresh_replaces_list_and_resets_cursor() {
        let api = FakeApi::with_main_comments(8);
        let (remote, mut rx) = remote(api.clone());
        let mut feed = CommentFeed::new(article(), 5);
        feed.load(&remote);
        settle(&mut feed, &mut rx).await;
        feed.load_more(&remote);
        settle(&mut feed, &mut rx).await;

        api.edit(|s| s.main.truncate(2));
        feed.load(&remote);
        settle(&mut feed, &mut rx).await;
        assert_eq!(feed.comments().len(), 2);
        assert_eq!(feed.cursor().page, 1);
    }

    #[test]
    fn count_label_uses_server_total() {
        let mut feed = CommentFeed::new(article(), 5);
        assert_eq!(feed.count_label(), "0 Comments");
        feed.cursor.total_count = 1234;
        assert_eq!(feed.count_label(), "1.2k Comments");
    }

    #[test]
    fn remove_drops_comment_and_total() {
        let mut feed = CommentFeed::new(article(), 5);
        feed.comments = vec![
            crate::feedback::sample_comment("m1", "amina", "a"),
            crate::feedback::sample_comment("m2", "amina", "b"),
        ];
        feed.cursor.total_count = 2;
        assert!(feed.remove(&CommentId::new("m1")));
        assert!(!feed.remove(&CommentId::new("m1")));
        assert_eq!(feed.total_count(), 1);
    }
}
