use serde::Deserialize;
use serde_json::Value;

use super::{join_tags, unwrap_seq, Normalizer, RawId, RawTags, Seq};
use crate::error::FetchError;
use crate::records::{Article, ArticleStatus, Blog};

#[derive(Deserialize)]
struct RawBlog {
    id: RawId,
    #[serde(alias = "adminGraphqlApiId")]
    admin_graphql_api_id: Option<String>,
    title: Option<String>,
    handle: Option<String>,
    commentable: Option<String>,
    tags: Option<RawTags>,
    #[serde(alias = "createdAt")]
    created_at: Option<String>,
    #[serde(alias = "updatedAt")]
    updated_at: Option<String>,
    /// Only GraphQL nests articles inside the blog node.
    articles: Option<Seq<RawArticle>>,
}

#[derive(Deserialize)]
struct RawArticle {
    id: RawId,
    blog_id: Option<RawId>,
    title: Option<String>,
    handle: Option<String>,
    author: Option<RawAuthor>,
    #[serde(alias = "summary_html")]
    summary: Option<String>,
    tags: Option<RawTags>,
    #[serde(alias = "publishedAt")]
    published_at: Option<String>,
    #[serde(alias = "createdAt")]
    created_at: Option<String>,
    #[serde(alias = "updatedAt")]
    updated_at: Option<String>,
    image: Option<RawArticleImage>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAuthor {
    Name(String),
    Object { name: Option<String> },
}

#[derive(Deserialize)]
struct RawArticleImage {
    #[serde(alias = "url")]
    src: Option<String>,
}

impl Normalizer {
    /// `fetched` are articles paged separately for this blog; they follow
    /// any articles nested in the node itself.
    pub fn blog(&self, node: Value, fetched: Vec<Article>) -> Result<Blog, FetchError> {
        let raw: RawBlog = serde_json::from_value(node)?;
        let id = raw.id.numeric();

        let mut articles: Vec<Article> = unwrap_seq(raw.articles)
            .into_iter()
            .map(|a| article(a, &id))
            .collect();
        articles.extend(fetched);

        Ok(Blog {
            admin_graphql_api_id: raw.id.global("Blog", raw.admin_graphql_api_id),
            title: raw.title,
            handle: raw.handle,
            commentable: raw.commentable,
            tags: join_tags(raw.tags),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            articles_count: articles.len(),
            articles,
            id,
        })
    }

    /// `blog_id` fills in when the article node does not name its blog.
    pub fn article(&self, node: Value, blog_id: &str) -> Result<Article, FetchError> {
        let raw: RawArticle = serde_json::from_value(node)?;
        Ok(article(raw, blog_id))
    }
}

fn article(raw: RawArticle, blog_id: &str) -> Article {
    let is_published = raw.published_at.is_some();
    Article {
        id: raw.id.numeric(),
        blog_id: raw
            .blog_id
            .map(|b| b.numeric())
            .unwrap_or_else(|| blog_id.to_string()),
        title: raw.title,
        handle: raw.handle,
        author: raw.author.and_then(|a| match a {
            RawAuthor::Name(n) => Some(n),
            RawAuthor::Object { name } => name,
        }),
        summary: raw.summary,
        tags: join_tags(raw.tags),
        status: if is_published {
            ArticleStatus::Published
        } else {
            ArticleStatus::Draft
        },
        is_published,
        published_at: raw.published_at,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        image_src: raw.image.and_then(|i| i.src),
    }
}
