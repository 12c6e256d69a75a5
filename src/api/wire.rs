//! JSON shapes of the Sikiya API and their conversion into domain types.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feedback::{
    Comment, CommentId, Viewer, ViewerRole,
    pagination::{CommentPage, PaginationCursor},
};

pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, Deserialize)]
pub struct WireComment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub comment_author_id: Option<WireAuthor>,
    #[serde(default)]
    pub comment_content: String,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub number_of_likes: u64,
    #[serde(default)]
    pub number_of_dislikes: u64,
    #[serde(default)]
    pub reply_to_comment_id: Option<String>,
}

/// The author is populated on most endpoints but some return the bare id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireAuthor {
    Populated(WireUser),
    Id(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUser {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name_camel: Option<String>,
    #[serde(default)]
    pub displayname: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub role: ViewerRole,
}

impl WireUser {
    /// First non-blank of the display name spellings, then `first last`.
    pub fn name(&self) -> Option<String> {
        let explicit = [
            &self.display_name_camel,
            &self.displayname,
            &self.display_name,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty());
        if let Some(name) = explicit {
            return Some(name.to_string());
        }
        let full = format!(
            "{} {}",
            self.firstname.as_deref().unwrap_or_default(),
            self.lastname.as_deref().unwrap_or_default()
        );
        let full = full.trim();
        (!full.is_empty()).then(|| full.to_string())
    }
}

impl WireComment {
    pub fn into_comment(self, parent: Option<&CommentId>) -> Comment {
        let (author_id, name, avatar) = match self.comment_author_id {
            Some(WireAuthor::Populated(user)) => {
                let name = user.name();
                (user.id, name, user.profile_picture)
            }
            Some(WireAuthor::Id(id)) => (Some(id), None, None),
            None => (None, None, None),
        };
        let parent_id = self
            .reply_to_comment_id
            .filter(|id| !id.is_empty())
            .map(CommentId::new)
            .or_else(|| parent.cloned());
        Comment {
            id: CommentId::new(self.id),
            author_id: author_id.map(Arc::from),
            author_display_name: Arc::from(name.as_deref().unwrap_or(UNKNOWN_AUTHOR)),
            author_avatar: avatar.filter(|a| !a.is_empty()).map(Arc::from),
            content: Arc::from(self.comment_content),
            created_at: self.created_on.as_deref().and_then(parse_timestamp),
            like_count: self.number_of_likes,
            dislike_count: self.number_of_dislikes,
            parent_id,
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePagination {
    #[serde(default)]
    pub total_comments: u64,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireCommentList {
    Paged {
        comments: Vec<WireComment>,
        #[serde(default)]
        pagination: Option<WirePagination>,
    },
    Bare(Vec<WireComment>),
}

impl WireCommentList {
    /// A bare array is the complete list: there is never a next page.
    pub fn into_page(self, requested_page: u32) -> CommentPage {
        match self {
            WireCommentList::Paged {
                comments,
                pagination,
            } => {
                let comments = comments
                    .into_iter()
                    .map(|c| c.into_comment(None))
                    .collect::<Vec<_>>();
                let cursor = match pagination {
                    Some(p) => PaginationCursor {
                        page: p.current_page.unwrap_or(requested_page),
                        has_next_page: p.has_next_page,
                        total_count: p.total_comments,
                    },
                    None => PaginationCursor {
                        page: requested_page,
                        has_next_page: false,
                        total_count: comments.len() as u64,
                    },
                };
                CommentPage { comments, cursor }
            }
            WireCommentList::Bare(list) => {
                let comments = list
                    .into_iter()
                    .map(|c| c.into_comment(None))
                    .collect::<Vec<_>>();
                CommentPage {
                    cursor: PaginationCursor {
                        page: requested_page,
                        has_next_page: false,
                        total_count: comments.len() as u64,
                    },
                    comments,
                }
            }
        }
    }
}

impl From<WireUser> for Viewer {
    fn from(user: WireUser) -> Self {
        let display_name = user.name().map(Arc::from);
        Viewer {
            id: user.id.map(Arc::from),
            display_name,
            role: user.role,
        }
    }
}

/// `GET /me` wraps the user in `data` on some deployments.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireMe {
    Wrapped { data: WireUser },
    Plain(WireUser),
}

impl From<WireMe> for Viewer {
    fn from(me: WireMe) -> Self {
        match me {
            WireMe::Wrapped { data } => data.into(),
            WireMe::Plain(user) => user.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl WireErrorBody {
    /// `error` wins over `message`; blank strings count as absent.
    pub fn into_message(self) -> Option<String> {
        [self.error, self.message]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct NewMainArticleComment<'a> {
    pub comment_article_id: &'a str,
    pub comment_content: &'a str,
    #[serde(rename = "mainComment")]
    pub main_comment: bool,
}

#[derive(Debug, Serialize)]
pub struct NewArticleReply<'a> {
    pub comment_article_id: &'a str,
    pub comment_content: &'a str,
    pub reply_to_comment_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewVideoComment<'a> {
    pub comment_content: &'a str,
    #[serde(rename = "mainComment")]
    pub main_comment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_comment_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct SetReaction<'a> {
    pub reaction: &'a str,
}
