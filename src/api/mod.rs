//! Remote feedback surface. Components only ever see [`FeedbackApi`], so the
//! production HTTP client and the test fake are interchangeable.

use async_trait::async_trait;

use crate::{
    errors::Result,
    feedback::{
        Comment, CommentId, ContentRef, Reaction, ReactionSnapshot, Viewer,
        pagination::CommentPage, quota::QuotaState,
    },
};

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod wire;

#[async_trait]
pub trait FeedbackApi: Send + Sync {
    async fn viewer(&self) -> Result<Viewer>;

    async fn main_comments(&self, content: &ContentRef, page: u32, limit: u32)
    -> Result<CommentPage>;

    async fn replies(&self, main_id: &CommentId) -> Result<Vec<Comment>>;

    /// Succeeds only on `201 Created`.
    async fn post_main_comment(&self, content: &ContentRef, text: &str) -> Result<Comment>;

    async fn post_reply(
        &self,
        content: &ContentRef,
        main_id: &CommentId,
        text: &str,
    ) -> Result<Comment>;

    async fn reaction(&self, comment_id: &CommentId) -> Result<ReactionSnapshot>;

    async fn set_reaction(
        &self,
        comment_id: &CommentId,
        reaction: Reaction,
    ) -> Result<ReactionSnapshot>;

    async fn comment_quota(&self) -> Result<QuotaState>;

    async fn unlock_comments(&self) -> Result<()>;

    async fn delete_comment(&self, comment_id: &CommentId) -> Result<()>;
}
