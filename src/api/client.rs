use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    api::{
        FeedbackApi,
        wire::{
            NewArticleReply, NewMainArticleComment, NewVideoComment, SetReaction, WireComment,
            WireCommentList, WireErrorBody, WireMe,
        },
    },
    errors::{AppError, Result},
    feedback::{
        Comment, CommentId, ContentRef, Reaction, ReactionSnapshot, Viewer,
        pagination::CommentPage, quota::QuotaState,
    },
};

pub struct HttpFeedbackClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpFeedbackClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| AppError::Validation(format!("invalid api url {base_url:?}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "api url {base_url} cannot take a path"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sikiya-tui/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let resp = self.authed(builder).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(resp)
    }

    async fn parse<R: DeserializeOwned>(resp: Response) -> Result<R> {
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<R: DeserializeOwned>(&self, segments: &[&str]) -> Result<R> {
        let resp = self.send(self.http.get(self.url(segments))).await?;
        Self::parse(resp).await
    }

    fn main_comments_request(&self, content: &ContentRef, page: u32, limit: u32) -> RequestBuilder {
        self.http
            .get(self.url(&["comments", content.kind(), content.id()]))
            .query(&[("page", page), ("limit", limit)])
    }

    fn post_main_request(&self, content: &ContentRef, text: &str) -> RequestBuilder {
        match content {
            ContentRef::Article(id) => self.http.post(self.url(&["comment", "main", "new"])).json(
                &NewMainArticleComment {
                    comment_article_id: id,
                    comment_content: text,
                    main_comment: true,
                },
            ),
            ContentRef::Video(id) => self
                .http
                .post(self.url(&["video", id.as_str(), "comment"]))
                .json(&NewVideoComment {
                    comment_content: text,
                    main_comment: true,
                    reply_to_comment_id: None,
                }),
        }
    }

    fn post_reply_request(
        &self,
        content: &ContentRef,
        main_id: &CommentId,
        text: &str,
    ) -> RequestBuilder {
        match content {
            ContentRef::Article(id) => {
                self.http
                    .post(self.url(&["comment", "reply"]))
                    .json(&NewArticleReply {
                        comment_article_id: id,
                        comment_content: text,
                        reply_to_comment_id: main_id.as_str(),
                    })
            }
            ContentRef::Video(id) => self
                .http
                .post(self.url(&["video", id.as_str(), "comment"]))
                .json(&NewVideoComment {
                    comment_content: text,
                    main_comment: false,
                    reply_to_comment_id: Some(main_id.as_str()),
                }),
        }
    }

    fn set_reaction_request(&self, comment_id: &CommentId, reaction: Reaction) -> RequestBuilder {
        self.http
            .post(self.url(&["comment", comment_id.as_str(), "reaction"]))
            .json(&SetReaction {
                reaction: reaction.as_str(),
            })
    }
}

/// Main comment creation only counts when the server answers 201.
fn ensure_created(status: StatusCode) -> Result<()> {
    if status == StatusCode::CREATED {
        Ok(())
    } else {
        Err(AppError::server(status.as_u16(), "comment was not created"))
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<WireErrorBody>(body)
        .ok()
        .and_then(WireErrorBody::into_message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.to_string()
            }
        })
}

async fn error_from_response(resp: Response) -> AppError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    AppError::server(status.as_u16(), error_message(status, &body))
}

#[async_trait]
impl FeedbackApi for HttpFeedbackClient {
    #[instrument(skip(self))]
    async fn viewer(&self) -> Result<Viewer> {
        let me: WireMe = self.get_json(&["me"]).await?;
        Ok(me.into())
    }

    #[instrument(skip(self))]
    async fn main_comments(
        &self,
        content: &ContentRef,
        page: u32,
        limit: u32,
    ) -> Result<CommentPage> {
        let req = self.main_comments_request(content, page, limit);
        let list: WireCommentList = Self::parse(self.send(req).await?).await?;
        let page = list.into_page(page);
        debug!(
            count = page.comments.len(),
            total = page.cursor.total_count,
            "main comments fetched"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn replies(&self, main_id: &CommentId) -> Result<Vec<Comment>> {
        let list: Vec<WireComment> = self
            .get_json(&["comments", "replies", main_id.as_str()])
            .await?;
        Ok(list
            .into_iter()
            .map(|c| c.into_comment(Some(main_id)))
            .collect())
    }

    #[instrument(skip(self, text))]
    async fn post_main_comment(&self, content: &ContentRef, text: &str) -> Result<Comment> {
        let req = self.post_main_request(content, text);
        let resp = self.send(req).await?;
        ensure_created(resp.status())?;
        let comment: WireComment = Self::parse(resp).await?;
        Ok(comment.into_comment(None))
    }

    #[instrument(skip(self, text))]
    async fn post_reply(
        &self,
        content: &ContentRef,
        main_id: &CommentId,
        text: &str,
    ) -> Result<Comment> {
        let req = self.post_reply_request(content, main_id, text);
        let comment: WireComment = Self::parse(self.send(req).await?).await?;
        Ok(comment.into_comment(Some(main_id)))
    }

    #[instrument(skip(self))]
    async fn reaction(&self, comment_id: &CommentId) -> Result<ReactionSnapshot> {
        self.get_json(&["comment", comment_id.as_str(), "reaction"])
            .await
    }

    #[instrument(skip(self))]
    async fn set_reaction(
        &self,
        comment_id: &CommentId,
        reaction: Reaction,
    ) -> Result<ReactionSnapshot> {
        let req = self.set_reaction_request(comment_id, reaction);
        Self::parse(self.send(req).await?).await
    }

    #[instrument(skip(self))]
    async fn comment_quota(&self) -> Result<QuotaState> {
        self.get_json(&["user", "comments", "quota"]).await
    }

    #[instrument(skip(self))]
    async fn unlock_comments(&self) -> Result<()> {
        self.send(self.http.post(self.url(&["user", "comments", "unlock"])))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_comment(&self, comment_id: &CommentId) -> Result<()> {
        self.send(self.http.delete(self.url(&["comment", comment_id.as_str()])))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, Request};
    use serde_json::{Value, json};

    use super::*;

    fn client() -> HttpFeedbackClient {
        HttpFeedbackClient::new(
            "https://api.example.test/v1/",
            Some("tok".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn built(builder: RequestBuilder) -> Request {
        builder.build().unwrap()
    }

    fn body(req: &Request) -> Value {
        let bytes = req.body().and_then(|b| b.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn trailing_slash_is_trimmed_and_blank_token_dropped() {
        let client = HttpFeedbackClient::new(
            "https://api.example.test/",
            Some("   ".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.url(&["comments", "replies", "m1"]).as_str(),
            "https://api.example.test/comments/replies/m1"
        );
        assert!(client.token.is_none());
    }

    #[test]
    fn unparseable_base_url_is_rejected() {
        let err = HttpFeedbackClient::new("not a url", None, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn ids_are_encoded_as_single_segments() {
        let url = client().url(&["comment", "a/b?c", "reaction"]);
        assert_eq!(
            url.as_str(),
            "https://api.example.test/v1/comment/a%2Fb%3Fc/reaction"
        );
    }

    #[test]
    fn main_comments_carry_page_and_limit() {
        let client = client();
        let req = built(client.main_comments_request(&ContentRef::Article("a1".into()), 2, 10));
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.url().path(), "/v1/comments/article/a1");
        assert_eq!(req.url().query(), Some("page=2&limit=10"));

        let req = built(client.main_comments_request(&ContentRef::Video("v9".into()), 1, 20));
        assert_eq!(req.url().path(), "/v1/comments/video/v9");
    }

    #[test]
    fn article_main_comment_body() {
        let req = built(client().post_main_request(&ContentRef::Article("a1".into()), "hi"));
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.url().path(), "/v1/comment/main/new");
        assert_eq!(
            body(&req),
            json!({"comment_article_id":"a1","comment_content":"hi","mainComment":true})
        );
    }

    #[test]
    fn video_main_comment_omits_reply_target() {
        let req = built(client().post_main_request(&ContentRef::Video("v9".into()), "hi"));
        assert_eq!(req.url().path(), "/v1/video/v9/comment");
        assert_eq!(body(&req), json!({"comment_content":"hi","mainComment":true}));
    }

    #[test]
    fn article_reply_body() {
        let req = built(client().post_reply_request(
            &ContentRef::Article("a1".into()),
            &CommentId::new("m1"),
            "thanks",
        ));
        assert_eq!(req.url().path(), "/v1/comment/reply");
        assert_eq!(
            body(&req),
            json!({"comment_article_id":"a1","comment_content":"thanks","reply_to_comment_id":"m1"})
        );
    }

    #[test]
    fn reaction_body_uses_lowercase_names() {
        let req = built(client().set_reaction_request(&CommentId::new("c1"), Reaction::None));
        assert_eq!(req.url().path(), "/v1/comment/c1/reaction");
        assert_eq!(body(&req), json!({"reaction":"none"}));
    }

    #[test]
    fn only_created_counts_as_posted() {
        assert!(ensure_created(StatusCode::CREATED).is_ok());
        let err = ensure_created(StatusCode::OK).unwrap_err();
        assert!(matches!(err, AppError::Server { status: 200, .. }));
    }

    #[test]
    fn error_body_prefers_error_then_message() {
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"too long","message":"ignored"}"#
            ),
            "too long"
        );
        assert_eq!(
            error_message(StatusCode::FORBIDDEN, r#"{"message":"limit reached"}"#),
            "limit reached"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, r#"{"error":"  "}"#),
            r#"{"error":"  "}"#
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
    }
}
