use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    api::FeedbackApi,
    errors::{AppError, Result},
    feedback::{
        Comment, CommentId, ContentRef, Reaction, ReactionSnapshot, Viewer,
        pagination::{CommentPage, PaginationCursor},
        quota::QuotaState,
        sample_comment,
    },
};

/// In-memory server used by component tests.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

#[derive(Default)]
pub struct FakeState {
    pub viewer: Viewer,
    pub main: Vec<Comment>,
    pub replies: HashMap<CommentId, Vec<Comment>>,
    pub reactions: HashMap<CommentId, ReactionSnapshot>,
    pub quota: Option<QuotaState>,
    pub failing: HashSet<&'static str>,
    pub calls: Vec<String>,
    next_id: u64,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_main_comments(count: usize) -> Arc<Self> {
        let api = Self::new();
        api.edit(|s| {
            s.main = (1..=count)
                .map(|i| sample_comment(&format!("m{i}"), "amina", &format!("comment {i}")))
                .collect();
        });
        api
    }

    pub fn edit(&self, f: impl FnOnce(&mut FakeState)) {
        let mut state = self.state.lock().unwrap();
        f(&mut state);
    }

    pub fn fail(&self, op: &'static str) {
        self.edit(|s| {
            s.failing.insert(op);
        });
    }

    pub fn recover(&self, op: &'static str) {
        self.edit(|s| {
            s.failing.remove(op);
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String, op: &'static str) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(op) {
            return Err(AppError::server(500, format!("{op} failed")));
        }
        Ok(state)
    }
}

impl FakeState {
    fn fresh_comment(&mut self, text: &str, parent: Option<&CommentId>) -> Comment {
        self.next_id += 1;
        let mut comment = sample_comment(&format!("new{}", self.next_id), "viewer", text);
        comment.author_id = self.viewer.id.clone();
        comment.parent_id = parent.cloned();
        comment
    }
}

#[async_trait]
impl FeedbackApi for FakeApi {
    async fn viewer(&self) -> Result<Viewer> {
        let state = self.record("viewer".into(), "viewer")?;
        Ok(state.viewer.clone())
    }

    async fn main_comments(
        &self,
        content: &ContentRef,
        page: u32,
        limit: u32,
    ) -> Result<CommentPage> {
        let state = self.record(format!("main_comments {content} {page}"), "main_comments")?;
        let limit = limit.max(1) as usize;
        let start = (page.saturating_sub(1) as usize) * limit;
        let comments = state
            .main
            .iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect::<Vec<_>>();
        Ok(CommentPage {
            cursor: PaginationCursor {
                page,
                has_next_page: start + comments.len() < state.main.len(),
                total_count: state.main.len() as u64,
            },
            comments,
        })
    }

    async fn replies(&self, main_id: &CommentId) -> Result<Vec<Comment>> {
        let state = self.record(format!("replies {main_id}"), "replies")?;
        Ok(state.replies.get(main_id).cloned().unwrap_or_default())
    }

    async fn post_main_comment(&self, content: &ContentRef, text: &str) -> Result<Comment> {
        let mut state = self.record(format!("post_main {content}"), "post_main")?;
        if let Some(quota) = state.quota.as_ref()
            && !state.viewer.role.is_privileged()
            && quota.is_exhausted()
        {
            return Err(AppError::server(403, "Daily comment limit reached"));
        }
        let comment = state.fresh_comment(text, None);
        state.main.insert(0, comment.clone());
        if let Some(quota) = state.quota.as_mut() {
            quota.used += 1;
        }
        Ok(comment)
    }

    async fn post_reply(
        &self,
        content: &ContentRef,
        main_id: &CommentId,
        text: &str,
    ) -> Result<Comment> {
        let mut state = self.record(format!("post_reply {content} {main_id}"), "post_reply")?;
        let reply = state.fresh_comment(text, Some(main_id));
        state
            .replies
            .entry(main_id.clone())
            .or_default()
            .insert(0, reply.clone());
        Ok(reply)
    }

    async fn reaction(&self, comment_id: &CommentId) -> Result<ReactionSnapshot> {
        let state = self.record(format!("reaction {comment_id}"), "reaction")?;
        Ok(state
            .reactions
            .get(comment_id)
            .copied()
            .unwrap_or_default())
    }

    async fn set_reaction(
        &self,
        comment_id: &CommentId,
        reaction: Reaction,
    ) -> Result<ReactionSnapshot> {
        let mut state = self.record(
            format!("set_reaction {comment_id} {}", reaction.as_str()),
            "set_reaction",
        )?;
        let snapshot = state.reactions.entry(comment_id.clone()).or_default();
        match snapshot.reaction {
            Reaction::Like => snapshot.likes = snapshot.likes.saturating_sub(1),
            Reaction::Dislike => snapshot.dislikes = snapshot.dislikes.saturating_sub(1),
            Reaction::None => {}
        }
        match reaction {
            Reaction::Like => snapshot.likes += 1,
            Reaction::Dislike => snapshot.dislikes += 1,
            Reaction::None => {}
        }
        snapshot.reaction = reaction;
        Ok(*snapshot)
    }

    async fn comment_quota(&self) -> Result<QuotaState> {
        let state = self.record("quota".into(), "quota")?;
        state
            .quota
            .ok_or_else(|| AppError::server(404, "no quota"))
    }

    async fn unlock_comments(&self) -> Result<()> {
        let mut state = self.record("unlock".into(), "unlock")?;
        if let Some(quota) = state.quota.as_mut() {
            quota.unlocked += 1;
        }
        Ok(())
    }

    async fn delete_comment(&self, comment_id: &CommentId) -> Result<()> {
        let mut state = self.record(format!("delete {comment_id}"), "delete")?;
        state.main.retain(|c| &c.id != comment_id);
        Ok(())
    }
}
