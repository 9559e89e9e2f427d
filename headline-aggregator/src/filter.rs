use crate::types::ArticleView;

/// Keep articles whose title contains `search`, ignoring case. A missing or
/// empty query keeps everything.
pub fn filter_by_title(articles: Vec<ArticleView>, search: Option<&str>) -> Vec<ArticleView> {
    let needle = match search {
        Some(query) if !query.is_empty() => query.to_lowercase(),
        _ => return articles,
    };

    articles
        .into_iter()
        .filter(|article| article.title.to_lowercase().contains(&needle))
        .collect()
}
