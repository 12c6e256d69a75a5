//! Client-side model of the comment thread: comments, reactions, the viewer
//! and the content item the thread hangs off.

use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod format;
pub mod pagination;
pub mod quota;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommentId(pub Arc<str>);

impl CommentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The article or video a thread belongs to. Exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentRef {
    Article(String),
    Video(String),
}

impl ContentRef {
    pub fn id(&self) -> &str {
        match self {
            ContentRef::Article(id) | ContentRef::Video(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContentRef::Article(_) => "article",
            ContentRef::Video(_) => "video",
        }
    }
}

impl Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: Option<Arc<str>>,
    pub author_display_name: Arc<str>,
    pub author_avatar: Option<Arc<str>>,
    pub content: Arc<str>,
    pub created_at: Option<DateTime<Utc>>,
    pub like_count: u64,
    pub dislike_count: u64,
    /// `None` for main comments, the main comment's id for replies.
    pub parent_id: Option<CommentId>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_authored_by(&self, viewer: &Viewer) -> bool {
        match (&self.author_id, &viewer.id) {
            (Some(author), Some(me)) => author.as_ref() == me.as_ref(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    #[default]
    None,
    Like,
    Dislike,
}

impl Reaction {
    /// The reaction to send when the viewer taps `kind`: tapping the one already
    /// held clears it, anything else replaces it.
    pub fn toggled(self, kind: Reaction) -> Reaction {
        if self == kind { Reaction::None } else { kind }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::None => "none",
            Reaction::Like => "like",
            Reaction::Dislike => "dislike",
        }
    }
}

/// The `{reaction, likes, dislikes}` triple the reaction endpoint returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSnapshot {
    #[serde(default)]
    pub reaction: Reaction,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub dislikes: u64,
}

impl ReactionSnapshot {
    pub fn from_counts(comment: &Comment) -> Self {
        Self {
            reaction: Reaction::None,
            likes: comment.like_count,
            dislikes: comment.dislike_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    #[default]
    General,
    Journalist,
    Admin,
    #[serde(other)]
    Other,
}

impl ViewerRole {
    /// General readers are the only role whose main comments are quota gated.
    pub fn is_privileged(&self) -> bool {
        !matches!(self, ViewerRole::General)
    }
}

impl Display for ViewerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ViewerRole::General => "general",
            ViewerRole::Journalist => "journalist",
            ViewerRole::Admin => "admin",
            ViewerRole::Other => "member",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub id: Option<Arc<str>>,
    pub display_name: Option<Arc<str>>,
    pub role: ViewerRole,
}

/// Text the viewer submitted that the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub local_id: u64,
    pub text: Arc<str>,
}

/// One row of a reply list. Local inserts start as `Pending` and are swapped
/// for the server's comment once the post succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadEntry {
    Confirmed(Comment),
    Pending(Draft),
}

impl ThreadEntry {
    pub fn comment(&self) -> Option<&Comment> {
        match self {
            ThreadEntry::Confirmed(comment) => Some(comment),
            ThreadEntry::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ThreadEntry::Pending(_))
    }
}

#[cfg(test)]
pub(crate) fn sample_comment(id: &str, author: &str, content: &str) -> Comment {
    Comment {
        id: CommentId::new(id),
        author_id: Some(Arc::from(format!("user-{author}"))),
        author_display_name: Arc::from(author),
        author_avatar: None,
        content: Arc::from(content),
        created_at: None,
        like_count: 0,
        dislike_count: 0,
        parent_id: None,
    }
}
